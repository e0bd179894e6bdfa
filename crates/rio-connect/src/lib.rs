//! Configured robot connections.
//!
//! Provides:
//! - `RobotConfig` - The stored `[auth] hostname` target
//! - `Prompt` - First-run question for a team number or hostname
//! - `Connector` - Alias check, resolution and session setup in one place

pub mod config;
pub mod connector;
pub mod prompt;

pub use config::{ConfigError, ConfigFile, RobotConfig};
pub use connector::{ConnectError, Connector};
pub use prompt::{Prompt, StdinPrompt};
