//! Sinks for streamed command output.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Receives remote output one line at a time, in order.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Handle one line (without its terminator).
    ///
    /// # Errors
    /// Returns error if the line cannot be delivered.
    async fn write_line(&self, line: &str) -> std::io::Result<()>;
}

/// Line writer over any async writer.
#[derive(Clone)]
pub struct LineWriter {
    writer: Arc<tokio::sync::Mutex<BufWriter<Box<dyn AsyncWrite + Send + Unpin>>>>,
}

impl LineWriter {
    /// Create a new line writer.
    #[must_use]
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            writer: Arc::new(tokio::sync::Mutex::new(BufWriter::new(Box::new(writer)))),
        }
    }

    /// Line writer on the process's stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl OutputSink for LineWriter {
    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self.writer.lock().await;
        let written = async {
            guard.write_all(line.as_bytes()).await?;
            guard.write_all(b"\n").await?;
            guard.flush().await
        }
        .await;
        if let Err(e) = &written {
            tracing::debug!("Output writer failed: {e}");
        }
        written
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines received so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines joined back into text, each terminated by `\n`.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines()
            .into_iter()
            .fold(String::new(), |mut acc, line| {
                acc.push_str(&line);
                acc.push('\n');
                acc
            })
    }
}

#[async_trait]
impl OutputSink for CollectingSink {
    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test]
    async fn test_line_writer_terminates_lines() {
        let (client, mut server) = tokio::io::duplex(64);
        let writer = LineWriter::new(client);
        writer.write_line("hi").await.unwrap();
        drop(writer);

        let mut received = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut server, &mut received)
            .await
            .unwrap();
        assert_eq!(received, "hi\n");
    }

    #[tokio::test]
    async fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        assert_ok!(sink.write_line("one").await);
        assert_ok!(sink.write_line("two").await);
        assert_eq!(sink.lines(), vec!["one", "two"]);
        assert_eq!(sink.text(), "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_line_writer_reports_closed_reader() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let writer = LineWriter::new(client);
        let err = assert_err!(writer.write_line("lost").await);
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
