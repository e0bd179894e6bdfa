//! Address values passed between resolution and sessions.

use std::{fmt, num::NonZeroU32};

/// FRC team number.
///
/// Always in `1..=TeamNumber::MAX`, so every team maps to a valid
/// `10.TE.AM.2` address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamNumber(NonZeroU32);

impl TeamNumber {
    /// Largest team whose static address fits in an octet.
    pub const MAX: u32 = 25_599;

    /// Create a team number, rejecting zero and numbers above `MAX`.
    #[must_use]
    pub const fn new(number: u32) -> Option<Self> {
        if number > Self::MAX {
            return None;
        }
        match NonZeroU32::new(number) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Parse a decimal team number, ignoring surrounding whitespace.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u32>().ok().and_then(Self::new)
    }

    /// The raw number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The second octet of the team's static `10.TE.AM.2` address.
    #[must_use]
    pub const fn high(self) -> u32 {
        self.get() / 100
    }

    /// The third octet of the team's static `10.TE.AM.2` address.
    #[must_use]
    pub const fn low(self) -> u32 {
        self.get() % 100
    }
}

impl fmt::Display for TeamNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One address at which the controller might be found.
///
/// A list of candidates is ordered by probe priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    address: String,
    requires_dns_resolution: bool,
}

impl Candidate {
    /// Create a candidate.
    #[must_use]
    pub fn new(address: impl Into<String>, requires_dns_resolution: bool) -> Self {
        Self {
            address: address.into(),
            requires_dns_resolution,
        }
    }

    /// A raw IP address, probed without name resolution.
    #[must_use]
    pub fn direct(address: impl Into<String>) -> Self {
        Self::new(address, false)
    }

    /// A hostname that must go through the system resolver first.
    #[must_use]
    pub fn dns(hostname: impl Into<String>) -> Self {
        Self::new(hostname, true)
    }

    /// Hostname or dotted IP.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether probing this candidate depends on DNS.
    #[must_use]
    pub const fn requires_dns_resolution(&self) -> bool {
        self.requires_dns_resolution
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// A concrete address ready to be handed to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    address: String,
}

impl ResolvedHost {
    /// Wrap an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// The resolved address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Consume into the address string.
    #[must_use]
    pub fn into_address(self) -> String {
        self.address
    }
}

impl fmt::Display for ResolvedHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_number_rejects_zero() {
        assert!(TeamNumber::new(0).is_none());
        assert_eq!(TeamNumber::new(118).map(TeamNumber::get), Some(118));
    }

    #[test]
    fn test_team_number_parse() {
        assert_eq!(TeamNumber::parse(" 254\n").map(TeamNumber::get), Some(254));
        assert!(TeamNumber::parse("-5").is_none());
        assert!(TeamNumber::parse("frc").is_none());
        assert!(TeamNumber::parse("0").is_none());
    }

    #[test]
    fn test_team_octets() {
        let team = TeamNumber::new(4567).unwrap();
        assert_eq!((team.high(), team.low()), (45, 67));

        let team = TeamNumber::new(9).unwrap();
        assert_eq!((team.high(), team.low()), (0, 9));
    }

    #[test]
    fn test_team_number_fits_address_octets() {
        let largest = TeamNumber::new(TeamNumber::MAX).unwrap();
        assert_eq!((largest.high(), largest.low()), (255, 99));
        assert!(TeamNumber::new(25_600).is_none());
        assert!(TeamNumber::parse("99999").is_none());
    }

    #[test]
    fn test_candidate_kinds() {
        assert!(!Candidate::direct("172.22.11.2").requires_dns_resolution());
        assert!(Candidate::dns("roboRIO-118-FRC.local").requires_dns_resolution());
        assert_eq!(Candidate::dns("roboRIO-118-FRC").to_string(), "roboRIO-118-FRC");
    }
}
