//! Beacon wire protocol - cloud command lines, config fields and advertising formats
//!
//! The cloud link is line oriented: every message is a single `\r\n`
//! terminated line of `key=value` pairs joined by `&`.

use std::io::{self, Write};

pub mod ble;
pub mod config;
mod error;

pub use ble::{AdvPayload, MacAddress};
pub use config::{DeviceConfig, Field};
pub use error::ValidationError;

// Cloud endpoint
pub const CLOUD_HOST: &str = "bemfa.com";
pub const CLOUD_PORT: u16 = 8344;

/// Server drops a session after 60s of silence
pub const HEARTBEAT_INTERVAL_MS: u64 = 50_000;

// Command codes
pub const CMD_SUBSCRIBE: u8 = 1;
pub const CMD_PUBLISH: u8 = 2;

/// Heartbeat line (command 0), sent verbatim
pub const HEARTBEAT: &str = "cmd=0&msg=ping\r\n";

/// Longest inbound line we buffer before forcing a split
pub const MAX_LINE_LEN: usize = 512;

/// Subscribe line: `cmd=1&uid=<uid>&topic=<topic>\r\n`
pub fn subscribe_line(uid: &str, topic: &str) -> String {
    format!("cmd={CMD_SUBSCRIBE}&uid={uid}&topic={topic}\r\n")
}

/// Publish line: `cmd=2&uid=<uid>&topic=<topic>&msg=<msg>\r\n`
pub fn publish_line(uid: &str, topic: &str, msg: &str) -> String {
    format!("cmd={CMD_PUBLISH}&uid={uid}&topic={topic}&msg={msg}\r\n")
}

/// Command carried by an inbound line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TurnOn,
    TurnOff,
}

impl Command {
    /// Classify an inbound line by plain substring search.
    ///
    /// "on" is checked first, so any line containing "on" is `TurnOn` even
    /// if it also contains "off". There is no word-boundary check.
    pub fn classify(line: &str) -> Option<Self> {
        if line.contains("on") {
            Some(Command::TurnOn)
        } else if line.contains("off") {
            Some(Command::TurnOff)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::TurnOn => "on",
            Command::TurnOff => "off",
        }
    }
}

/// Accumulates raw bytes from a non-blocking stream and yields complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete line, without its `\r\n` terminator
    pub fn next_line(&mut self) -> Option<String> {
        let end = match self.buf.iter().position(|b| *b == b'\n') {
            Some(pos) => pos + 1,
            None if self.buf.len() >= MAX_LINE_LEN => MAX_LINE_LEN,
            None => return None,
        };

        let raw: Vec<u8> = self.buf.drain(..end).collect();
        let line = String::from_utf8_lossy(&raw);
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// True if [`LineBuffer::next_line`] would return a line
    pub fn has_line(&self) -> bool {
        self.buf.len() >= MAX_LINE_LEN || self.buf.contains(&b'\n')
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Write one already terminated line and flush
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.flush()
}

/// Async line operations for tokio
#[cfg(feature = "async")]
pub mod async_io {
    use super::*;
    use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

    pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read one line, `None` once the peer has closed the stream
    pub async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Option<String>> {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
