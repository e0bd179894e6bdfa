//! Run one command on the robot.
//!
//! Run with: cargo run -p remote-exec-demo -- uname -a
//!
//! The robot is taken from the stored config (asked for on first run) or
//! from `RIO_HOSTNAME`, which may be a team number or a hostname.

use anyhow::Context;
use rio_connect::{Connector, RobotConfig, StdinPrompt};
use rio_core::{Credentials, LineWriter};
use rio_session::Ssh2Transport;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let command = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    anyhow::ensure!(!command.is_empty(), "usage: remote-exec <command>");

    let hostname = std::env::var("RIO_HOSTNAME").ok();
    let username = std::env::var("RIO_USER").unwrap_or_else(|_| "admin".into());

    let connector = Connector::new(RobotConfig::default_path()?);
    let mut session = connector
        .session_from_config(
            hostname.as_deref(),
            &mut StdinPrompt,
            Credentials::without_password(username),
            Ssh2Transport::new(),
        )
        .await?;

    tracing::debug!(user = session.credentials().username(), %command, "Running");
    session
        .execute(&command, false, &LineWriter::stdout())
        .await
        .with_context(|| format!("running on {}", session.host()))?;
    tracing::info!("Command finished on {}", session.host());

    Ok(())
}
