//! Line-oriented TCP bridge transport.
//!
//! Frames are `\n`-terminated text lines:
//!
//! ```text
//! client -> bridge   HELLO <client_id>
//!                    SUB <topic>
//!                    PUB <topic> <payload>
//! bridge -> client   MSG <topic> <payload>
//! ```
//!
//! The payload is the remainder of the line after the single space following
//! the topic, so it may itself contain spaces.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{BusError, BusMessage, BusResult, MessageBus};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const READ_POLL: Duration = Duration::from_millis(1);
/// Longest unterminated line kept while waiting for its `\n`.
const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Client identifier of the form `{prefix}-xxxx`.
pub fn client_id(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let mut hasher = blake3::Hasher::new();
    hasher.update(&std::process::id().to_le_bytes());
    hasher.update(&nanos.to_le_bytes());
    let hash = hasher.finalize();
    let bytes = hash.as_bytes();
    format!("{}-{:02x}{:02x}", prefix, bytes[0], bytes[1])
}

pub struct TcpLineBus {
    address: String,
    client_id: String,
    stream: Option<TcpStream>,
    pending: Vec<u8>,
}

impl TcpLineBus {
    pub fn new(address: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            client_id: client_id.into(),
            stream: None,
            pending: Vec::new(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn send_line(&mut self, line: &str) -> BusResult<()> {
        let stream = self.stream.as_mut().ok_or(BusError::Disconnected)?;
        let result = stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
            .and_then(|_| stream.flush());
        if let Err(err) = result {
            self.stream = None;
            return Err(err.into());
        }
        Ok(())
    }

    fn read_available(&mut self) -> BusResult<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(BusError::Disconnected);
        };
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    // Lines already buffered are still delivered by `drain`.
                    self.stream = None;
                    return Ok(());
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if let Err(err) = limit_partial_frame(&mut self.pending) {
                        self.stream = None;
                        return Err(err);
                    }
                }
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.stream = None;
                    return Err(err.into());
                }
            }
        }
    }
}

impl MessageBus for TcpLineBus {
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> BusResult<()> {
        let addr = self
            .address
            .to_socket_addrs()
            .map_err(|err| BusError::Connect(format!("{}: {}", self.address, err)))?
            .next()
            .ok_or_else(|| BusError::Connect(format!("{}: no address", self.address)))?;
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|err| BusError::Connect(format!("{}: {}", self.address, err)))?;
        stream.set_nodelay(true).ok();
        stream.set_read_timeout(Some(READ_POLL))?;
        self.stream = Some(stream);
        self.pending.clear();
        let hello = format!("HELLO {}", self.client_id);
        self.send_line(&hello)
    }

    fn subscribe(&mut self, topic: &str) -> BusResult<()> {
        self.send_line(&format!("SUB {topic}"))
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> BusResult<()> {
        let payload = String::from_utf8_lossy(payload);
        if payload.contains('\n') {
            return Err(BusError::Frame("payload contains a newline".to_string()));
        }
        self.send_line(&format!("PUB {topic} {payload}"))
    }

    fn drain(&mut self) -> BusResult<Vec<BusMessage>> {
        self.read_available()?;
        let mut messages = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if line.is_empty() {
                continue;
            }
            // Unknown frames from the bridge are skipped.
            if let Ok(message) = decode_frame(line) {
                messages.push(message);
            }
        }
        Ok(messages)
    }
}

/// Reject a buffer whose trailing unterminated line has outgrown
/// [`MAX_FRAME_BYTES`]. The buffer is cleared so the next connection starts
/// clean.
fn limit_partial_frame(pending: &mut Vec<u8>) -> BusResult<()> {
    let start = pending
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    let partial = pending.len() - start;
    if partial > MAX_FRAME_BYTES {
        pending.clear();
        return Err(BusError::Frame(format!(
            "unterminated frame exceeds {MAX_FRAME_BYTES} bytes"
        )));
    }
    Ok(())
}

fn decode_frame(line: &str) -> BusResult<BusMessage> {
    let body = line
        .strip_prefix("MSG ")
        .ok_or_else(|| BusError::Frame(line.to_string()))?;
    let (topic, payload) = body.split_once(' ').unwrap_or((body, ""));
    if topic.is_empty() {
        return Err(BusError::Frame(line.to_string()));
    }
    Ok(BusMessage::new(topic, payload))
}
