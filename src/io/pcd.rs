//! PCD (Point Cloud Data) export for the accumulated cloud.
//!
//! Writes PCD v0.7 with fields `x y z rgb`, where `rgb` is the PCL-style
//! packed `0x00RRGGBB` stored as an unsigned 32-bit field.

use crate::error::Result;
use crate::vision::reconstruction::GlobalPointCloud;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// PCD data section encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PcdEncoding {
    Ascii,
    #[default]
    Binary,
}

impl PcdEncoding {
    fn keyword(&self) -> &'static str {
        match self {
            PcdEncoding::Ascii => "ascii",
            PcdEncoding::Binary => "binary",
        }
    }
}

#[inline]
fn pack_rgb(color: [u8; 3]) -> u32 {
    ((color[0] as u32) << 16) | ((color[1] as u32) << 8) | color[2] as u32
}

/// Write `cloud` as PCD to any writer.
pub fn write_pcd<W: Write>(
    writer: &mut W,
    cloud: &GlobalPointCloud,
    encoding: PcdEncoding,
) -> Result<()> {
    let num_points = cloud.len();

    writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(writer, "VERSION 0.7")?;
    writeln!(writer, "FIELDS x y z rgb")?;
    writeln!(writer, "SIZE 4 4 4 4")?;
    writeln!(writer, "TYPE F F F U")?;
    writeln!(writer, "COUNT 1 1 1 1")?;
    writeln!(writer, "WIDTH {}", num_points)?;
    writeln!(writer, "HEIGHT 1")?;
    writeln!(writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(writer, "POINTS {}", num_points)?;
    writeln!(writer, "DATA {}", encoding.keyword())?;

    match encoding {
        PcdEncoding::Ascii => {
            for point in cloud.iter() {
                let p = point.position;
                writeln!(writer, "{} {} {} {}", p.x, p.y, p.z, pack_rgb(point.color))?;
            }
        }
        PcdEncoding::Binary => {
            for point in cloud.iter() {
                let p = point.position;
                writer.write_all(&p.x.to_le_bytes())?;
                writer.write_all(&p.y.to_le_bytes())?;
                writer.write_all(&p.z.to_le_bytes())?;
                writer.write_all(&pack_rgb(point.color).to_le_bytes())?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// Save `cloud` to `path`, creating parent directories as needed.
pub fn save_pcd(path: &Path, cloud: &GlobalPointCloud, encoding: PcdEncoding) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_pcd(&mut writer, cloud, encoding)
}
