//! Scripted transport for testing without a robot.
//!
//! Commands are answered from a script of output lines and exit statuses.
//! Every connect, exec and close is recorded so tests can check the
//! connection lifecycle.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use futures::{FutureExt, StreamExt, future};
use rio_core::traits::{ConnectRequest, RemoteProcess, Transport, TransportError};

/// Something the mock transport was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Connect { endpoint: String, username: String },
    Exec(String),
    Close,
}

#[derive(Debug, Clone)]
struct Script {
    lines: Vec<String>,
    exit_status: i32,
}

#[derive(Debug, Default)]
struct State {
    scripts: HashMap<String, Script>,
    refuse: bool,
    connected: bool,
    events: Vec<MockEvent>,
}

/// Mock transport.
///
/// Clones share state, so a test can keep one handle and give another to
/// the session under test.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `lines` and `exit_status`.
    #[must_use]
    pub fn respond(self, command: &str, lines: &[&str], exit_status: i32) -> Self {
        self.lock().scripts.insert(
            command.to_string(),
            Script {
                lines: lines.iter().map(ToString::to_string).collect(),
                exit_status,
            },
        );
        self
    }

    /// Refuse every connection attempt.
    #[must_use]
    pub fn refuse_connections(self) -> Self {
        self.lock().refuse = true;
        self
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self, request: &ConnectRequest) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.events.push(MockEvent::Connect {
            endpoint: request.endpoint(),
            username: request.username.clone(),
        });
        if state.refuse {
            return Err(TransportError::Connect {
                endpoint: request.endpoint(),
                source: std::io::ErrorKind::ConnectionRefused.into(),
            });
        }
        state.connected = true;
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<RemoteProcess, TransportError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state.events.push(MockEvent::Exec(command.to_string()));

        let script = state.scripts.get(command).cloned().unwrap_or_else(|| Script {
            lines: vec![format!("sh: {command}: not found")],
            exit_status: 127,
        });

        Ok(RemoteProcess {
            output: tokio_stream::iter(script.lines.into_iter().map(Ok)).boxed(),
            exit_status: future::ready(Ok(script.exit_status)).boxed(),
        })
    }

    async fn close(&mut self) {
        let mut state = self.lock();
        if state.connected {
            state.connected = false;
            state.events.push(MockEvent::Close);
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}
