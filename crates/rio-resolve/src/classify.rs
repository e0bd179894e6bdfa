//! Recognise team numbers hiding in raw targets.
//!
//! A target may be a bare team number, the team's static IP, or one of
//! the legacy roboRIO hostnames. Recognising the latter two lets old
//! configurations benefit from candidate racing.

use rio_core::TeamNumber;

type Matcher = fn(&str) -> Option<TeamNumber>;

/// Matchers tried in order; the first hit wins.
const MATCHERS: [Matcher; 3] = [match_team_number, match_static_ip, match_robot_hostname];

/// Extract a team number from a raw target, if it names one.
#[must_use]
pub fn classify_target(raw: &str) -> Option<TeamNumber> {
    MATCHERS.iter().find_map(|matcher| matcher(raw))
}

/// `118`
fn match_team_number(raw: &str) -> Option<TeamNumber> {
    TeamNumber::parse(raw)
}

/// `10.1.18.2`
fn match_static_ip(raw: &str) -> Option<TeamNumber> {
    let mut octets = raw.trim().split('.');
    let (first, high, low, last) = (octets.next()?, octets.next()?, octets.next()?, octets.next()?);
    if octets.next().is_some() || first != "10" || last != "2" {
        return None;
    }
    let low = parse_digits(low).filter(|low| *low < 100)?;
    let team = parse_digits(high)?.checked_mul(100)?.checked_add(low)?;
    TeamNumber::new(team)
}

/// `roboRIO-118-FRC`, optionally with `.local` or `.lan`.
fn match_robot_hostname(raw: &str) -> Option<TeamNumber> {
    let host = raw.trim().to_ascii_lowercase();
    let rest = host.strip_prefix("roborio-")?;
    let rest = rest
        .strip_suffix(".local")
        .or_else(|| rest.strip_suffix(".lan"))
        .unwrap_or(rest);
    TeamNumber::new(parse_digits(rest.strip_suffix("-frc")?)?)
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// What a raw target turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Find the robot by racing the team's candidates.
    Team(TeamNumber),
    /// Hostname or address to look up with the system resolver.
    Host(String),
    /// Use verbatim, no resolution at all.
    Literal(String),
}

impl Target {
    /// Classify a raw target.
    ///
    /// With resolution disabled (for example when the name is an SSH
    /// alias) only bare team numbers are recognised and anything else is
    /// passed through untouched.
    #[must_use]
    pub fn parse(raw: &str, resolution_enabled: bool) -> Self {
        let team = if resolution_enabled {
            classify_target(raw)
        } else {
            match_team_number(raw)
        };

        match team {
            Some(team) => Self::Team(team),
            None if resolution_enabled => Self::Host(raw.trim().to_string()),
            None => Self::Literal(raw.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand_team_number;

    fn team(raw: &str) -> Option<u32> {
        classify_target(raw).map(TeamNumber::get)
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(team("118"), Some(118));
        assert_eq!(team(" 254 "), Some(254));
        assert_eq!(team("0"), None);
    }

    #[test]
    fn test_static_ip() {
        assert_eq!(team("10.1.18.2"), Some(118));
        assert_eq!(team("10.0.9.2"), Some(9));
        assert_eq!(team("10.99.99.2"), Some(9999));
        assert_eq!(team("10.255.99.2"), Some(25_599));
        assert_eq!(team("10.256.0.2"), None);
        assert_eq!(team("10.1.180.2"), None);
        assert_eq!(team("10.1.18.3"), None);
        assert_eq!(team("11.1.18.2"), None);
        assert_eq!(team("10.1.18.2.5"), None);
        assert_eq!(team("10.a.18.2"), None);
    }

    #[test]
    fn test_robot_hostnames() {
        assert_eq!(team("roborio-254-frc.local"), Some(254));
        assert_eq!(team("roboRIO-254-FRC"), Some(254));
        assert_eq!(team("ROBORIO-1678-FRC.LAN"), Some(1678));
        assert_eq!(team("roborio-254-frc.frc-field.local"), None);
        assert_eq!(team("roborio--frc"), None);
        assert_eq!(team("roborio-254-frc.com"), None);
    }

    #[test]
    fn test_unrelated_hosts() {
        assert_eq!(team("myrobot.example.com"), None);
        assert_eq!(team("172.22.11.2"), None);
        assert_eq!(team(""), None);
    }

    #[test]
    fn test_round_trip_through_candidates() {
        for n in [1, 9, 118, 254, 1678, 9999] {
            let candidates = expand_team_number(TeamNumber::new(n).unwrap());
            assert_eq!(team(candidates[0].address()), Some(n));
            assert_eq!(team(candidates[3].address()), Some(n));
        }
    }

    #[test]
    fn test_target_parse() {
        let t254 = TeamNumber::new(254).unwrap();
        assert_eq!(Target::parse("roborio-254-frc.local", true), Target::Team(t254));
        assert_eq!(Target::parse("254", false), Target::Team(t254));
        assert_eq!(
            Target::parse("roborio-254-frc.local", false),
            Target::Literal("roborio-254-frc.local".into())
        );
        assert_eq!(
            Target::parse(" robot.lan ", true),
            Target::Host("robot.lan".into())
        );
    }
}
