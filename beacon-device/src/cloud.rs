//! Cloud link: subscribe, heartbeat and inbound command polling
//!
//! The link is a plain non-blocking stream. Reads never wait; a tick with no
//! data simply returns nothing.

use std::io::{ErrorKind, Read};

use beacon_mcu::Connector;
use beacon_proto::{
    subscribe_line, write_line, Command, LineBuffer, CLOUD_HOST, CLOUD_PORT, HEARTBEAT,
    HEARTBEAT_INTERVAL_MS,
};
use log::*;

use crate::{Error, Result};

const READ_CHUNK: usize = 256;

pub struct CloudSession<C: Connector> {
    connector: C,
    host: String,
    port: u16,
    link: Option<C::Stream>,
    lines: LineBuffer,
    last_heartbeat: u64,
    interval_ms: u64,
}

impl<C: Connector> CloudSession<C> {
    pub fn new(connector: C) -> Self {
        Self::with_endpoint(connector, CLOUD_HOST, CLOUD_PORT)
    }

    pub fn with_endpoint(connector: C, host: &str, port: u16) -> Self {
        Self {
            connector,
            host: host.to_string(),
            port,
            link: None,
            lines: LineBuffer::new(),
            last_heartbeat: 0,
            interval_ms: HEARTBEAT_INTERVAL_MS,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn close(&mut self) {
        if self.link.take().is_some() {
            debug!("Cloud link closed");
        }
        self.lines.clear();
    }

    /// Open a fresh link and subscribe to `topic`
    pub fn subscribe(&mut self, uid: &str, topic: &str) -> Result<()> {
        self.close();

        info!("Connecting to {}:{}", self.host, self.port);
        let mut stream = self.connector.connect(&self.host, self.port).map_err(|e| {
            error!("Cloud connection failed: {}", e);
            Error::Transport(e)
        })?;

        write_line(&mut stream, &subscribe_line(uid, topic))?;
        info!("Subscribed to topic {}", topic);
        self.link = Some(stream);
        Ok(())
    }

    /// Send a heartbeat now
    pub fn heartbeat(&mut self) -> Result<()> {
        let stream = self.link.as_mut().ok_or(Error::NotConnected)?;
        if let Err(e) = write_line(stream, HEARTBEAT) {
            warn!("Heartbeat failed: {}", e);
            self.close();
            return Err(e.into());
        }
        debug!("Heartbeat sent");
        Ok(())
    }

    /// Send a heartbeat if the interval has elapsed.
    ///
    /// The timer advances whether or not a link is open.
    pub fn tick_heartbeat(&mut self, now: u64) {
        if now.saturating_sub(self.last_heartbeat) < self.interval_ms {
            return;
        }
        self.last_heartbeat = now;
        if self.link.is_some() {
            let _ = self.heartbeat();
        }
    }

    /// Read what is available and return the command of the next full line
    pub fn poll_inbound(&mut self) -> Option<Command> {
        if !self.lines.has_line() {
            self.fill();
        }

        let line = self.lines.next_line()?;
        info!("Received: {}", line);
        let command = Command::classify(&line);
        match command {
            Some(cmd) => info!("Command: {}", cmd.as_str()),
            None => debug!("Ignoring line without command"),
        }
        command
    }

    fn fill(&mut self) {
        let Some(stream) = self.link.as_mut() else {
            return;
        };

        let mut buf = [0u8; READ_CHUNK];
        match stream.read(&mut buf) {
            Ok(0) => {
                warn!("Cloud server closed the connection");
                self.close();
            }
            Ok(n) => self.lines.push(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("Cloud read failed: {}", e);
                self.close();
            }
        }
    }
}
