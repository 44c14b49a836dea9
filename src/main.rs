//! Drishti - grid scan of the drone simulator into a colored point cloud.
//!
//! Usage:
//!   drishti [--config drishti.toml] [--host HOST] [--port PORT] [--output cloud.pcd]

use clap::Parser;
use drishti::{
    CaptureSession, DrishtiConfig, DrishtiError, FrameChannel, Result, ScanPlan, save_pcd,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "drishti.toml";

#[derive(Parser, Debug)]
#[command(name = "drishti", version, about = "Scan the drone simulator into a point cloud")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulator host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Simulator port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Output PCD path (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<DrishtiConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            DrishtiConfig::load(path)?
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG);
            DrishtiConfig::load(Path::new(DEFAULT_CONFIG))?
        }
        None => {
            info!("Using default configuration");
            DrishtiConfig::default()
        }
    };

    if let Some(host) = &args.host {
        config.connection.host = host.clone();
    }
    if let Some(port) = args.port {
        config.connection.port = port;
    }
    if let Some(output) = &args.output {
        config.output.cloud_path = output.to_string_lossy().into_owned();
    }
    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    info!("Drishti v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Simulator at {}, camera {}x{} fov {:.1}°",
        config.address(),
        config.camera.width,
        config.camera.height,
        config.camera.fov_deg
    );

    let channel = FrameChannel::from_config(&config.connection);
    let mut session = CaptureSession::new(channel, &config);
    let plan = ScanPlan::from_config(&config.scan);
    info!(
        "Scan plan: {} cells, {} captures",
        plan.cell_count(),
        plan.capture_count()
    );

    let summary = plan.run(&mut session)?;
    let cloud = session.into_cloud();
    if cloud.is_empty() {
        return Err(DrishtiError::NoData {
            command: "scan".to_string(),
        });
    }

    let path = Path::new(&config.output.cloud_path);
    save_pcd(path, &cloud, config.output.encoding)?;
    info!(
        "Saved {} points from {} captures to {:?}",
        cloud.len(),
        summary.captures,
        path
    );
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drishti=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
