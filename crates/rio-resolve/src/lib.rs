//! Find a roboRIO by team number or hostname.
//!
//! Provides:
//! - `expand_team_number` - Conventional addresses for a team, by priority
//! - `classify_target` / `Target` - Recognise team numbers in raw targets
//! - `HostResolver` - Race candidates, lowest-priority-index responder wins
//! - `TcpProbe` - Default probe against the SSH port
//! - `SshAliases` - Host entries from `~/.ssh/config`

pub mod alias;
pub mod candidates;
pub mod classify;
pub mod probe;
pub mod resolver;

pub use alias::SshAliases;
pub use candidates::{USB_TETHER_ADDRESS, expand_team_number};
pub use classify::{Target, classify_target};
pub use probe::{SSH_PORT, TcpProbe, lookup_address};
pub use resolver::{HostResolver, ProbeStrategy, ResolveError, ResolverConfig};
