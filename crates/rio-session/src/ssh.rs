//! SSH transport over libssh2.
//!
//! `ssh2` calls block, so every one of them runs on the blocking pool.
//! Command output is read line by line on a blocking task and forwarded
//! over a channel, so lines reach the caller as the robot produces them.

use std::{
    io::{self, BufRead, BufReader},
    net::{TcpStream, ToSocketAddrs},
};

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use rio_core::traits::{ConnectRequest, RemoteProcess, Transport, TransportError};
use secrecy::ExposeSecret;
use ssh2::{CheckResult, ExtendedData, KnownHostFileKind, Session};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_stream::wrappers::ReceiverStream;

/// Lines buffered between the blocking reader and the consumer.
const LINE_BUFFER: usize = 256;

/// How long a read may block before the reader checks for a departed consumer.
const READ_POLL_MS: u32 = 250;

type LineSender = mpsc::Sender<Result<String, TransportError>>;
type StatusSender = oneshot::Sender<Result<i32, TransportError>>;

/// Transport backed by the `ssh2` crate.
#[derive(Default)]
pub struct Ssh2Transport {
    session: Option<Session>,
    reader: Option<JoinHandle<()>>,
}

impl Ssh2Transport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session: None,
            reader: None,
        }
    }

    /// Wait for the last command's reader to let go of the session.
    async fn join_reader(&mut self) {
        let Some(reader) = self.reader.take() else {
            return;
        };
        if let Err(e) = reader.await {
            tracing::warn!("SSH reader task failed: {e}");
        }
    }
}

#[async_trait]
impl Transport for Ssh2Transport {
    async fn connect(&mut self, request: &ConnectRequest) -> Result<(), TransportError> {
        self.close().await;

        let request = request.clone();
        let session = tokio::task::spawn_blocking(move || connect_blocking(&request))
            .await
            .map_err(|e| TransportError::Task(e.to_string()))??;
        self.session = Some(session);
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<RemoteProcess, TransportError> {
        let session = self.session.clone().ok_or(TransportError::NotConnected)?;
        self.join_reader().await;
        let command = command.to_string();

        let (started_tx, started_rx) = oneshot::channel();
        let (line_tx, line_rx) = mpsc::channel(LINE_BUFFER);
        let (status_tx, status_rx) = oneshot::channel();

        self.reader = Some(tokio::task::spawn_blocking(move || {
            run_blocking(&session, &command, started_tx, &line_tx, status_tx);
        }));

        started_rx
            .await
            .map_err(|_| TransportError::Task("command task ended before starting".into()))??;

        let exit_status = async move {
            status_rx
                .await
                .map_err(|_| TransportError::Task("exit status was never reported".into()))?
        };

        Ok(RemoteProcess {
            output: ReceiverStream::new(line_rx).boxed(),
            exit_status: exit_status.boxed(),
        })
    }

    async fn close(&mut self) {
        // a reader still inside libssh2 would hold the session lock
        self.join_reader().await;
        let Some(session) = self.session.take() else {
            return;
        };
        let closed =
            tokio::task::spawn_blocking(move || session.disconnect(None, "closing", None)).await;
        match closed {
            Ok(Ok(())) => tracing::debug!("SSH session closed"),
            Ok(Err(e)) => tracing::debug!("SSH disconnect failed: {e}"),
            Err(e) => tracing::warn!("SSH disconnect task failed: {e}"),
        }
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

fn connect_blocking(request: &ConnectRequest) -> Result<Session, TransportError> {
    let endpoint = request.endpoint();
    let connect_error = |source| TransportError::Connect {
        endpoint: endpoint.clone(),
        source,
    };

    let addr = (request.host.as_str(), request.port)
        .to_socket_addrs()
        .map_err(connect_error)?
        .next()
        .ok_or_else(|| {
            connect_error(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no address for host",
            ))
        })?;
    let tcp = TcpStream::connect_timeout(&addr, request.timeout).map_err(connect_error)?;

    let mut session = Session::new().map_err(|e| TransportError::Handshake(e.to_string()))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(request.timeout.as_millis()).unwrap_or(u32::MAX));
    session
        .handshake()
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

    if request.verify_host_identity {
        verify_host_key(&session, &request.host, request.port)?;
    }

    let password = request
        .password
        .as_ref()
        .map_or("", |p| p.expose_secret());
    session
        .userauth_password(&request.username, password)
        .map_err(|e| TransportError::Authentication(e.to_string()))?;
    if !session.authenticated() {
        return Err(TransportError::Authentication(format!(
            "{} was rejected by {endpoint}",
            request.username
        )));
    }

    // commands may stay silent for longer than the connect bound
    session.set_timeout(0);
    Ok(session)
}

fn verify_host_key(session: &Session, host: &str, port: u16) -> Result<(), TransportError> {
    let path = dirs::home_dir()
        .map(|home| home.join(".ssh").join("known_hosts"))
        .ok_or_else(|| TransportError::HostKey("no home directory".into()))?;

    let mut known_hosts = session
        .known_hosts()
        .map_err(|e| TransportError::HostKey(e.to_string()))?;
    known_hosts
        .read_file(&path, KnownHostFileKind::OpenSSH)
        .map_err(|e| TransportError::HostKey(format!("{}: {e}", path.display())))?;

    let (key, _) = session
        .host_key()
        .ok_or_else(|| TransportError::HostKey("server sent no host key".into()))?;

    match known_hosts.check_port(host, port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::NotFound => Err(TransportError::HostKey(format!(
            "{host} is not in {}",
            path.display()
        ))),
        CheckResult::Mismatch => Err(TransportError::HostKey(format!(
            "host key for {host} does not match {}",
            path.display()
        ))),
        CheckResult::Failure => Err(TransportError::HostKey("known hosts check failed".into())),
    }
}

fn run_blocking(
    session: &Session,
    command: &str,
    started: oneshot::Sender<Result<(), TransportError>>,
    lines: &LineSender,
    status: StatusSender,
) {
    let channel_error = |e: ssh2::Error| TransportError::Channel(e.to_string());

    let started_channel = session.channel_session().and_then(|mut channel| {
        channel.handle_extended_data(ExtendedData::Merge)?;
        channel.exec(command)?;
        Ok(channel)
    });
    let mut channel = match started_channel {
        Ok(channel) => {
            let _ = started.send(Ok(()));
            channel
        }
        Err(e) => {
            let _ = started.send(Err(channel_error(e)));
            return;
        }
    };

    session.set_timeout(READ_POLL_MS);
    let consumer_gone = pump_lines(BufReader::new(&mut channel), lines);
    session.set_timeout(0);

    if consumer_gone {
        let _ = channel.close();
    }
    let exit_status = channel
        .wait_close()
        .and_then(|()| channel.exit_status())
        .map_err(channel_error);
    let _ = status.send(exit_status);
}

/// Forward lines from `reader` until end of output.
///
/// Read timeouts are polls: bytes already read stay in the line buffer and
/// the read is retried unless the consumer has hung up. Returns whether the
/// consumer left early.
fn pump_lines(mut reader: impl BufRead, lines: &LineSender) -> bool {
    let mut buf = Vec::new();
    loop {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                if !buf.is_empty() && lines.blocking_send(Ok(decode_line(&buf))).is_err() {
                    return true;
                }
                return false;
            }
            Ok(_) if buf.ends_with(b"\n") => {
                if lines.blocking_send(Ok(decode_line(&buf))).is_err() {
                    return true;
                }
                buf.clear();
            }
            // unterminated last line, sent once end of output is seen
            Ok(_) => {}
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                if lines.is_closed() {
                    return true;
                }
            }
            Err(e) => {
                let _ = lines.blocking_send(Err(e.into()));
                return false;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches('\n').trim_end_matches('\r').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"hi\n"), "hi");
        assert_eq!(decode_line(b"hi\r\n"), "hi");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"\xffok\n"), "\u{fffd}ok");
    }

    /// Replays reads, failing with a timeout between them.
    struct Chunked {
        chunks: std::collections::VecDeque<Option<&'static [u8]>>,
    }

    impl Chunked {
        fn new(chunks: &[Option<&'static [u8]>]) -> Self {
            Self {
                chunks: chunks.iter().copied().collect(),
            }
        }
    }

    impl io::Read for Chunked {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Some(chunk)) => {
                    out[..chunk.len()].copy_from_slice(chunk);
                    Ok(chunk.len())
                }
                Some(None) => Err(io::ErrorKind::TimedOut.into()),
                None => Ok(0),
            }
        }
    }

    fn collect(mut rx: mpsc::Receiver<Result<String, TransportError>>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line.unwrap());
        }
        lines
    }

    #[test]
    fn test_pump_lines_rejoins_line_split_by_timeout() {
        let (tx, rx) = mpsc::channel(8);
        let reader = Chunked::new(&[Some(&b"hel"[..]), None, Some(&b"lo\nbye"[..]), None]);
        assert!(!pump_lines(BufReader::new(reader), &tx));
        drop(tx);
        assert_eq!(collect(rx), vec!["hello", "bye"]);
    }

    /// A command that never prints again.
    struct Stalled;

    impl io::Read for Stalled {
        fn read(&mut self, _out: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::TimedOut.into())
        }
    }

    #[test]
    fn test_pump_lines_stops_when_consumer_leaves_silent_command() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        assert!(pump_lines(BufReader::new(io::Read::chain(&b"partial"[..], Stalled)), &tx));
    }

    #[tokio::test]
    async fn test_close_without_command_or_connection() {
        let mut transport = Ssh2Transport::new();
        transport.close().await;
        transport.close().await;
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_exec_without_connect() {
        let mut transport = Ssh2Transport::new();
        assert!(!transport.is_connected());
        let err = transport.exec("true").await.err().unwrap();
        assert!(matches!(err, TransportError::NotConnected));
        transport.close().await;
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let creds = rio_core::Credentials::without_password("admin");
        let request = ConnectRequest::new("127.0.0.1", port, &creds);
        let mut transport = Ssh2Transport::new();
        let err = transport.connect(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(!transport.is_connected());
    }
}
