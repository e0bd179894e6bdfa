//! Remote shell sessions on a resolved roboRIO.
//!
//! Provides:
//! - `RemoteSession` - Open, execute, stream output, close
//! - `Ssh2Transport` - Transport over libssh2 (`ssh2` feature)
//! - `MockTransport` - Scripted transport for tests and dry runs

pub mod mock;
pub mod session;
#[cfg(feature = "ssh2")]
pub mod ssh;

pub use mock::{MockEvent, MockTransport};
pub use session::{RemoteSession, SessionError, SessionOptions};
#[cfg(feature = "ssh2")]
pub use ssh::Ssh2Transport;
