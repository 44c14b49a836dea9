//! Simulator TCP channel: one connection per command.
//!
//! # Wire Protocol
//!
//! Requests are raw UTF-8 command text with no length prefix and no
//! delimiter. Motion commands and `REQUEST` get no reply. Data commands are
//! answered with a little-endian length-prefixed frame:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────┐
//! │ Total (4 bytes)  │ Body (Total bytes)                           │
//! │ Little-endian u32│                                              │
//! └──────────────────┴──────────────────────────────────────────────┘
//!
//! CAPTURE body:
//! ┌──────────┬────────────┬─────────────────┬──────────────────────┐
//! │ RGB len  │ Depth len  │ RGB bytes       │ Depth bytes          │
//! │ LE u32   │ LE u32     │ encoded image   │ f32 LE, row-major    │
//! └──────────┴────────────┴─────────────────┴──────────────────────┘
//!
//! CHECK body: UTF-8 text (`READY` / `NOTREADY`)
//! ```
//!
//! A missing or zero total length is a valid empty response ("no data").
//! The server closes the connection after each reply, so connections are
//! never reused.

use crate::config::ConnectionConfig;
use crate::error::{DrishtiError, FramingError, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// Size of every length field on the wire
const LENGTH_FIELD: usize = 4;

/// Default receive chunk size hint
const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default limit for a declared payload (256 MiB)
const DEFAULT_MAX_PAYLOAD: usize = 256 * 1024 * 1024;

/// Raw RGB and depth segments of a CAPTURE response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbdPayload {
    /// Self-describing encoded still image
    pub rgb: Vec<u8>,
    /// Flat little-endian f32 depth grid, row-major
    pub depth: Vec<u8>,
}

/// Request/response link to the simulator.
///
/// Implemented by [`FrameChannel`] over TCP; the capture session only sees
/// this trait.
pub trait SimulatorLink {
    /// Send a fire-and-forget command.
    fn send_command(&mut self, command: &str) -> Result<()>;

    /// Send a data command and receive a combined RGB + depth payload.
    ///
    /// `Ok(None)` is the normal empty response.
    fn fetch_payload(&mut self, command: &str) -> Result<Option<RgbdPayload>>;

    /// Send a data command and receive a UTF-8 string payload.
    fn fetch_string(&mut self, command: &str) -> Result<Option<String>>;
}

/// TCP implementation of [`SimulatorLink`].
#[derive(Debug, Clone)]
pub struct FrameChannel {
    addr: String,
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
    chunk_size: usize,
    max_payload: usize,
}

impl FrameChannel {
    /// Channel to `addr` (`host:port`) with default limits.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            addr: format!("{}:{}", config.host, config.port),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            read_timeout: config.read_timeout(),
            chunk_size: config.chunk_size.max(1),
            max_payload: config.max_payload_bytes,
        }
    }

    /// Set the receive chunk size hint (clamped to at least 1 byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the largest accepted declared payload.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Set read timeout. Pass `None` for blocking reads.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Open a fresh connection, trying every resolved address.
    fn connect(&self) -> Result<TcpStream> {
        let connection_error = |source| DrishtiError::Connection {
            addr: self.addr.clone(),
            source,
        };

        let mut last_err = None;
        for sock_addr in self.addr.to_socket_addrs().map_err(connection_error)? {
            match TcpStream::connect_timeout(&sock_addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(self.read_timeout)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(connection_error(last_err.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, "address resolved to nothing")
        })))
    }

    /// Send `command` and return the framed reply body, if any.
    fn exchange(&self, command: &str) -> Result<Option<Vec<u8>>> {
        let mut stream = self.connect()?;
        stream.write_all(command.as_bytes())?;
        stream.flush()?;
        debug!("Sent data command {:?} to {}", command, self.addr);

        let body = read_frame(&mut stream, self.chunk_size, self.max_payload)?;
        match &body {
            Some(body) => debug!("Received {} byte frame for {:?}", body.len(), command),
            None => debug!("Empty response for {:?}", command),
        }
        Ok(body)
    }
}

impl SimulatorLink for FrameChannel {
    fn send_command(&mut self, command: &str) -> Result<()> {
        let mut stream = self.connect()?;
        stream.write_all(command.as_bytes())?;
        stream.flush()?;
        debug!("Sent command {:?} to {}", command, self.addr);
        Ok(())
    }

    fn fetch_payload(&mut self, command: &str) -> Result<Option<RgbdPayload>> {
        self.exchange(command)?
            .map(|body| parse_payload(&body))
            .transpose()
    }

    fn fetch_string(&mut self, command: &str) -> Result<Option<String>> {
        self.exchange(command)?
            .map(|body| {
                String::from_utf8(body)
                    .map_err(|e| DrishtiError::Parse(format!("string reply is not UTF-8: {}", e)))
            })
            .transpose()
    }
}

/// Read one length-prefixed frame.
///
/// Returns `Ok(None)` when the peer sends no prefix at all or declares a zero
/// length. Each receive asks for at most `min(chunk_size, remaining)` bytes.
/// End of stream before the declared total is a fatal framing error.
pub fn read_frame<R: Read>(
    reader: &mut R,
    chunk_size: usize,
    max_payload: usize,
) -> Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; LENGTH_FIELD];
    let got = read_up_to(reader, &mut prefix)?;
    if got == 0 {
        return Ok(None);
    }
    if got < LENGTH_FIELD {
        return Err(FramingError::TruncatedPrefix { received: got }.into());
    }

    let total = u32::from_le_bytes(prefix) as usize;
    if total == 0 {
        return Ok(None);
    }
    if total > max_payload {
        return Err(FramingError::Oversized {
            declared: total,
            limit: max_payload,
        }
        .into());
    }

    let chunk_size = chunk_size.max(1);
    let mut body = vec![0u8; total];
    let mut received = 0;
    while received < total {
        let remaining = total - received;
        let want = chunk_size.min(remaining);
        match reader.read(&mut body[received..received + want]) {
            Ok(0) => {
                return Err(FramingError::Disconnected {
                    received,
                    expected: total,
                }
                .into());
            }
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(DrishtiError::Io(e)),
        }
    }

    Ok(Some(body))
}

/// Fill `buf` until full or end of stream; returns bytes read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(DrishtiError::Io(e)),
        }
    }
    Ok(filled)
}

/// Split a CAPTURE body into its RGB and depth segments.
///
/// Bytes after the declared segments are ignored; segments that overrun the
/// body are a parse error rather than a silent truncation.
pub fn parse_payload(body: &[u8]) -> Result<RgbdPayload> {
    if body.len() < 2 * LENGTH_FIELD {
        return Err(DrishtiError::Parse(format!(
            "capture body of {} bytes is shorter than its segment header",
            body.len()
        )));
    }

    let rgb_len = read_u32_le(&body[0..4]) as usize;
    let depth_len = read_u32_le(&body[4..8]) as usize;
    let data = &body[2 * LENGTH_FIELD..];

    let declared = rgb_len.checked_add(depth_len);
    if declared.is_none_or(|declared| declared > data.len()) {
        return Err(DrishtiError::Parse(format!(
            "segments declare {} + {} bytes but body holds {}",
            rgb_len,
            depth_len,
            data.len()
        )));
    }

    let trailing = data.len() - rgb_len - depth_len;
    if trailing > 0 {
        debug!("Ignoring {} trailing bytes after depth segment", trailing);
    }

    Ok(RgbdPayload {
        rgb: data[..rgb_len].to_vec(),
        depth: data[rgb_len..rgb_len + depth_len].to_vec(),
    })
}

/// Encode a CAPTURE body: both segment lengths followed by the segments.
pub fn encode_payload(rgb: &[u8], depth: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 * LENGTH_FIELD + rgb.len() + depth.len());
    body.extend_from_slice(&(rgb.len() as u32).to_le_bytes());
    body.extend_from_slice(&(depth.len() as u32).to_le_bytes());
    body.extend_from_slice(rgb);
    body.extend_from_slice(depth);
    body
}

/// Prefix `body` with its little-endian length.
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(LENGTH_FIELD + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(body);
    frame
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
