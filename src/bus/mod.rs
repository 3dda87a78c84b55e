//! Message-bus capability consumed by the panel.
//!
//! The panel only needs four operations: connect, subscribe, publish and a
//! non-blocking drain of inbound messages. Transports implement
//! [`MessageBus`]; the control loop owns reconnect pacing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

pub mod tcp;

pub use tcp::{TcpLineBus, client_id};

pub type BusResult<T> = std::result::Result<T, BusError>;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("not connected")]
    Disconnected,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("malformed frame: {0}")]
    Frame(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One inbound publish delivered by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

pub trait MessageBus {
    fn is_connected(&self) -> bool;

    /// Single connection attempt. Retrying is the caller's business.
    fn connect(&mut self) -> BusResult<()>;

    fn subscribe(&mut self, topic: &str) -> BusResult<()>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> BusResult<()>;

    /// Every message received since the last call, without blocking.
    fn drain(&mut self) -> BusResult<Vec<BusMessage>>;
}

#[derive(Debug, Default)]
struct MemoryBusState {
    connected: bool,
    refuse_connects: u32,
    fail_publishes: bool,
    echo_commands: bool,
    subscriptions: Vec<String>,
    inbox: VecDeque<BusMessage>,
    published: Vec<BusMessage>,
    connect_attempts: u32,
}

/// In-process bus used by tests, benchmarks and the `--demo` mode.
///
/// Clones share state, so a test can keep one handle while the runtime owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    state: Arc<Mutex<MemoryBusState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryBusState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a message as if the broker had delivered it.
    pub fn inject(&self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.state().inbox.push_back(BusMessage::new(topic, payload));
    }

    pub fn published(&self) -> Vec<BusMessage> {
        self.state().published.clone()
    }

    pub fn take_published(&self) -> Vec<BusMessage> {
        std::mem::take(&mut self.state().published)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.state().subscriptions.clone()
    }

    pub fn connect_attempts(&self) -> u32 {
        self.state().connect_attempts
    }

    /// Refuse the next `attempts` connection attempts.
    pub fn refuse_connects(&self, attempts: u32) {
        self.state().refuse_connects = attempts;
    }

    pub fn drop_connection(&self) {
        let mut state = self.state();
        state.connected = false;
        state.subscriptions.clear();
    }

    pub fn fail_publishes(&self, fail: bool) {
        self.state().fail_publishes = fail;
    }

    /// Answer every `<topic>/set` publish with a `<topic>/state` message
    /// carrying the same payload, like a controller acknowledging it.
    pub fn echo_commands(&self, echo: bool) {
        self.state().echo_commands = echo;
    }
}

impl MessageBus for MemoryBus {
    fn is_connected(&self) -> bool {
        self.state().connected
    }

    fn connect(&mut self) -> BusResult<()> {
        let mut state = self.state();
        state.connect_attempts += 1;
        if state.refuse_connects > 0 {
            state.refuse_connects -= 1;
            return Err(BusError::Connect("connection refused".to_string()));
        }
        state.connected = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> BusResult<()> {
        let mut state = self.state();
        if !state.connected {
            return Err(BusError::Disconnected);
        }
        state.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> BusResult<()> {
        let mut state = self.state();
        if !state.connected {
            return Err(BusError::Disconnected);
        }
        if state.fail_publishes {
            return Err(BusError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "publish rejected",
            )));
        }
        state.published.push(BusMessage::new(topic, payload));
        if state.echo_commands {
            if let Some(zone) = topic.strip_suffix("/set") {
                state
                    .inbox
                    .push_back(BusMessage::new(format!("{zone}/state"), payload));
            }
        }
        Ok(())
    }

    fn drain(&mut self) -> BusResult<Vec<BusMessage>> {
        let mut state = self.state();
        if !state.connected {
            return Err(BusError::Disconnected);
        }
        Ok(state.inbox.drain(..).collect())
    }
}
