//! Command execution over a remote shell.

use std::time::Duration;

use futures::StreamExt;
use rio_core::{
    Credentials, OutputSink, ResolvedHost,
    traits::{ConnectRequest, RemoteProcess, Transport, TransportError},
};
use thiserror::Error;

/// Session error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not connect: {0}")]
    Connection(#[source] TransportError),
    #[error("Command {command} returned non-zero error status {exit_status}")]
    CommandFailed { command: String, exit_status: i32 },
    #[error("Session is not open")]
    NotConnected,
    #[error("Session is already open")]
    AlreadyOpen,
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Failed to deliver output: {0}")]
    Output(#[source] std::io::Error),
}

impl SessionError {
    /// Exit status of a failed command.
    #[must_use]
    pub const fn exit_status(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { exit_status, .. } => Some(*exit_status),
            _ => None,
        }
    }
}

/// Session options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Remote shell port.
    pub port: u16,
    /// Bound on connecting and authenticating.
    pub connect_timeout: Duration,
    /// Check the host key against `~/.ssh/known_hosts`.
    ///
    /// Off by default: a roboRIO regenerates its host key on reimage and
    /// has no durable identity, so trust comes from being on the robot's
    /// own network.
    pub verify_host_identity: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout: Duration::from_secs(10),
            verify_host_identity: false,
        }
    }
}

impl SessionOptions {
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_host_verification(mut self, verify: bool) -> Self {
        self.verify_host_identity = verify;
        self
    }
}

/// Remote shell session on one host.
///
/// Holds at most one live connection. Commands run one at a time.
pub struct RemoteSession<T: Transport> {
    host: ResolvedHost,
    credentials: Credentials,
    options: SessionOptions,
    transport: T,
}

impl<T: Transport> RemoteSession<T> {
    /// Create a session. Nothing is connected until `open` or `execute`.
    #[must_use]
    pub const fn new(
        host: ResolvedHost,
        credentials: Credentials,
        options: SessionOptions,
        transport: T,
    ) -> Self {
        Self {
            host,
            credentials,
            options,
            transport,
        }
    }

    #[must_use]
    pub const fn host(&self) -> &ResolvedHost {
        &self.host
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connect and authenticate.
    ///
    /// # Errors
    /// Returns error on network, authentication or timeout failure, or if
    /// the session is already open.
    pub async fn open(&mut self) -> Result<(), SessionError> {
        if self.transport.is_connected() {
            return Err(SessionError::AlreadyOpen);
        }

        let mut request =
            ConnectRequest::new(self.host.address(), self.options.port, &self.credentials);
        request.timeout = self.options.connect_timeout;
        request.verify_host_identity = self.options.verify_host_identity;

        tracing::info!("Connecting to robot via SSH at {}", self.host);
        self.transport
            .connect(&request)
            .await
            .map_err(SessionError::Connection)?;
        tracing::debug!(user = self.credentials.username(), "Authenticated");
        Ok(())
    }

    /// Release the connection. Does nothing when not open.
    pub async fn close(&mut self) {
        self.transport.close().await;
    }

    /// Run one command, streaming its output lines into `sink`.
    ///
    /// With `reuse_existing_connection` false a connection is opened for
    /// the command and closed afterwards, whether or not it succeeded.
    /// Otherwise the caller's open connection is used.
    ///
    /// # Errors
    /// Returns error if connecting fails, the transport fails mid-command,
    /// or the command exits non-zero.
    pub async fn execute(
        &mut self,
        command: &str,
        reuse_existing_connection: bool,
        sink: &dyn OutputSink,
    ) -> Result<(), SessionError> {
        if reuse_existing_connection {
            return self.run(command, sink).await;
        }

        self.open().await?;
        let result = self.run(command, sink).await;
        self.close().await;
        result
    }

    /// Run several commands on one connection, stopping at the first failure.
    ///
    /// # Errors
    /// Returns the first connect or command error.
    pub async fn execute_all<I, S>(
        &mut self,
        commands: I,
        sink: &dyn OutputSink,
    ) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.open().await?;
        let mut result = Ok(());
        for command in commands {
            result = self.run(command.as_ref(), sink).await;
            if result.is_err() {
                break;
            }
        }
        self.close().await;
        result
    }

    async fn run(&mut self, command: &str, sink: &dyn OutputSink) -> Result<(), SessionError> {
        if !self.transport.is_connected() {
            return Err(SessionError::NotConnected);
        }

        tracing::debug!(%command, "Executing");
        let RemoteProcess {
            mut output,
            exit_status,
        } = self.transport.exec(command).await?;

        while let Some(line) = output.next().await {
            sink.write_line(&line?).await.map_err(SessionError::Output)?;
        }

        let exit_status = exit_status.await?;
        if exit_status != 0 {
            return Err(SessionError::CommandFailed {
                command: command.to_string(),
                exit_status,
            });
        }
        Ok(())
    }
}
