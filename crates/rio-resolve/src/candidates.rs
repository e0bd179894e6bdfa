//! Conventional roboRIO addresses for a team.

use rio_core::{Candidate, TeamNumber};

/// Fixed address of the roboRIO over a USB tether.
pub const USB_TETHER_ADDRESS: &str = "172.22.11.2";

/// Expand a team number into its candidate addresses, highest priority first.
///
/// Direct IPs come before names, and local network modes before
/// infrastructure DNS.
#[must_use]
pub fn expand_team_number(team: TeamNumber) -> Vec<Candidate> {
    vec![
        Candidate::direct(format!("10.{}.{}.2", team.high(), team.low())),
        Candidate::dns(format!("roboRIO-{team}-FRC.local")),
        Candidate::direct(USB_TETHER_ADDRESS),
        Candidate::dns(format!("roboRIO-{team}-FRC")),
        Candidate::dns(format!("roboRIO-{team}-FRC.lan")),
        // practice/competition field mDNS
        Candidate::dns(format!("roboRIO-{team}-FRC.frc-field.local")),
    ]
}
