//! Collaborator traits for probing and remote execution.

use std::time::Duration;

use async_trait::async_trait;
use futures::{future::BoxFuture, stream::BoxStream};
use secrecy::SecretString;
use thiserror::Error;

use crate::{Candidate, Credentials};

/// Probe error.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Lookup of {host} failed: {source}")]
    Lookup {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No address found for {0}")]
    NoAddress(String),
    #[error("Connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No answer from {address} within {after:?}")]
    TimedOut { address: String, after: Duration },
}

/// Trait for checking whether a candidate answers.
///
/// On success returns the address a session should connect to, which
/// for DNS candidates is the looked-up IP.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Probe a single candidate.
    async fn probe(&self, candidate: &Candidate) -> Result<String, ProbeError>;
}

/// Everything a transport needs to open a connection.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Resolved host address.
    pub host: String,
    /// Remote shell port.
    pub port: u16,
    pub username: String,
    pub password: Option<SecretString>,
    /// Bound on TCP connect and each blocking protocol call.
    pub timeout: Duration,
    /// Check the host key against `~/.ssh/known_hosts`.
    pub verify_host_identity: bool,
}

impl ConnectRequest {
    /// Build a request from a host and its credentials.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, credentials: &Credentials) -> Self {
        Self {
            host: host.into(),
            port,
            username: credentials.username().to_string(),
            password: credentials.password().cloned(),
            timeout: Duration::from_secs(10),
            verify_host_identity: false,
        }
    }

    /// `host:port` for messages.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Transport error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Handshake failed: {0}")]
    Handshake(String),
    #[error("Host key rejected: {0}")]
    HostKey(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Channel error: {0}")]
    Channel(String),
    #[error("Not connected")]
    NotConnected,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Transport task failed: {0}")]
    Task(String),
}

/// Lines of combined output, in the order the remote process wrote them.
pub type OutputStream = BoxStream<'static, Result<String, TransportError>>;

/// Resolves once the remote process has exited.
pub type ExitStatusFuture = BoxFuture<'static, Result<i32, TransportError>>;

/// A command started on the remote side.
pub struct RemoteProcess {
    /// Output lines without their terminators.
    pub output: OutputStream,
    /// Exit status, available after `output` ends.
    pub exit_status: ExitStatusFuture,
}

/// Trait for remote shell transports.
#[async_trait]
pub trait Transport: Send {
    /// Open and authenticate a connection.
    async fn connect(&mut self, request: &ConnectRequest) -> Result<(), TransportError>;

    /// Start a command on the open connection.
    async fn exec(&mut self, command: &str) -> Result<RemoteProcess, TransportError>;

    /// Release the connection. No-op when not connected.
    async fn close(&mut self);

    /// Whether a connection is currently held.
    fn is_connected(&self) -> bool;
}
