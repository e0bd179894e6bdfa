//! Core types and collaborator traits for reaching a roboRIO.
//!
//! This crate provides the fundamental building blocks:
//! - `TeamNumber`, `Candidate`, `ResolvedHost` - Address values
//! - `Credentials` - Login for the remote shell
//! - `OutputSink` - Where streamed command output goes
//! - Probe and Transport traits

pub mod credentials;
pub mod host;
pub mod output;
pub mod traits;

pub use credentials::Credentials;
pub use host::{Candidate, ResolvedHost, TeamNumber};
pub use output::{CollectingSink, LineWriter, OutputSink};
pub use traits::{Probe, Transport};
