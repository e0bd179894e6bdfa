//! Candidate racing.

use std::{sync::Arc, time::Duration};

use rio_core::{
    Candidate, ResolvedHost, TeamNumber,
    traits::{Probe, ProbeError},
};
use thiserror::Error;
use tokio::{task::JoinSet, time::Instant};

use crate::{Target, TcpProbe, expand_team_number, lookup_address, probe::SSH_PORT};

/// Resolution error.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No candidate addresses to probe")]
    NoCandidates,
    #[error("No robot found at any of: {}", .candidates.join(", "))]
    Unreachable { candidates: Vec<String> },
    #[error("No robot found within {after:?}")]
    TimedOut { after: Duration },
    #[error("Could not resolve host: {0}")]
    Lookup(#[source] ProbeError),
}

/// How candidates are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeStrategy {
    /// Probe all candidates at once; the lowest-index responder wins.
    #[default]
    Parallel,
    /// Probe one candidate at a time, in priority order.
    Sequential,
}

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Bound on a single probe attempt.
    pub probe_timeout: Duration,
    /// Bound on the whole resolution. A sequential walk is widened to
    /// fit one full probe per candidate.
    pub overall_timeout: Duration,
    pub strategy: ProbeStrategy,
    /// Port probed and used for literal host lookups.
    pub port: u16,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            overall_timeout: Duration::from_secs(10),
            strategy: ProbeStrategy::Parallel,
            port: SSH_PORT,
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: ProbeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Turns targets into a single reachable address.
#[derive(Clone)]
pub struct HostResolver {
    probe: Arc<dyn Probe>,
    config: ResolverConfig,
}

impl HostResolver {
    /// Create a resolver probing over TCP.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        let probe = Arc::new(TcpProbe::new(config.port));
        Self { probe, config }
    }

    /// Create a resolver with a custom probe.
    #[must_use]
    pub fn with_probe(probe: Arc<dyn Probe>, config: ResolverConfig) -> Self {
        Self { probe, config }
    }

    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a classified target.
    ///
    /// # Errors
    /// Returns error if no address could be found.
    pub async fn resolve_target(&self, target: &Target) -> Result<ResolvedHost, ResolveError> {
        match target {
            Target::Team(team) => self.resolve_team(*team).await,
            Target::Host(host) => {
                let ip = lookup_address(host, self.config.port)
                    .await
                    .map_err(ResolveError::Lookup)?;
                tracing::debug!(%host, %ip, "Resolved host");
                Ok(ResolvedHost::new(ip.to_string()))
            }
            Target::Literal(address) => Ok(ResolvedHost::new(address.clone())),
        }
    }

    /// Find the robot for a team.
    ///
    /// # Errors
    /// Returns error if none of the team's candidates answer.
    pub async fn resolve_team(&self, team: TeamNumber) -> Result<ResolvedHost, ResolveError> {
        tracing::info!("Finding robot for team {team}");
        self.resolve(&expand_team_number(team)).await
    }

    /// Probe candidates and return the highest-priority one that answers.
    ///
    /// # Errors
    /// Returns error if the list is empty, nothing answers, or the search
    /// budget runs out before anything answers.
    pub async fn resolve(&self, candidates: &[Candidate]) -> Result<ResolvedHost, ResolveError> {
        if candidates.is_empty() {
            return Err(ResolveError::NoCandidates);
        }

        let budget = self.budget(candidates.len());
        let deadline = Instant::now() + budget;
        let search = match self.config.strategy {
            ProbeStrategy::Parallel => self.race(candidates, deadline).await,
            ProbeStrategy::Sequential => self.walk(candidates, deadline).await,
        };

        let address = match search {
            Search::Found(address) => address,
            Search::Exhausted => {
                return Err(ResolveError::Unreachable {
                    candidates: candidates.iter().map(|c| c.address().to_string()).collect(),
                });
            }
            Search::Expired => return Err(ResolveError::TimedOut { after: budget }),
        };

        tracing::info!("-> Robot is at {address}");
        Ok(ResolvedHost::new(address))
    }

    /// Time allowed for one resolution.
    ///
    /// A sequential walk always gets room for every candidate's probe.
    fn budget(&self, candidates: usize) -> Duration {
        match self.config.strategy {
            ProbeStrategy::Parallel => self.config.overall_timeout,
            ProbeStrategy::Sequential => {
                let walk = self
                    .config
                    .probe_timeout
                    .saturating_mul(u32::try_from(candidates).unwrap_or(u32::MAX));
                self.config.overall_timeout.max(walk)
            }
        }
    }

    async fn race(&self, candidates: &[Candidate], deadline: Instant) -> Search {
        let mut probes = JoinSet::new();
        for (index, candidate) in candidates.iter().cloned().enumerate() {
            let probe = Arc::clone(&self.probe);
            let timeout = self.config.probe_timeout;
            probes.spawn(async move { (index, probe_once(probe.as_ref(), &candidate, timeout).await) });
        }

        let mut outcomes: Vec<Option<Result<String, ()>>> = vec![None; candidates.len()];
        loop {
            let joined = match tokio::time::timeout_at(deadline, probes.join_next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    // out of time: settle for the best answer already in
                    return first_success(&outcomes).map_or(Search::Expired, Search::Found);
                }
            };
            let (index, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::warn!("Probe task failed: {e}");
                    continue;
                }
            };
            outcomes[index] = Some(outcome.map_err(|_| ()));

            if let Some(address) = decided_winner(&outcomes) {
                // dropping the set aborts the remaining probes
                return Search::Found(address);
            }
        }

        first_success(&outcomes).map_or(Search::Exhausted, Search::Found)
    }

    async fn walk(&self, candidates: &[Candidate], deadline: Instant) -> Search {
        for candidate in candidates {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Search::Expired;
            }
            let timeout = self.config.probe_timeout.min(remaining);
            if let Ok(address) = probe_once(self.probe.as_ref(), candidate, timeout).await {
                return Search::Found(address);
            }
        }
        if Instant::now() >= deadline {
            Search::Expired
        } else {
            Search::Exhausted
        }
    }
}

/// How a search over the candidate list ended.
enum Search {
    Found(String),
    /// Every candidate failed.
    Exhausted,
    /// The budget ran out with no answer.
    Expired,
}

fn first_success(outcomes: &[Option<Result<String, ()>>]) -> Option<String> {
    outcomes
        .iter()
        .find_map(|outcome| outcome.as_ref().and_then(|r| r.as_ref().ok()).cloned())
}

/// The winner once every higher-priority probe has failed.
fn decided_winner(outcomes: &[Option<Result<String, ()>>]) -> Option<String> {
    for outcome in outcomes {
        match outcome {
            None => return None,
            Some(Ok(address)) => return Some(address.clone()),
            Some(Err(())) => {}
        }
    }
    None
}

async fn probe_once(
    probe: &dyn Probe,
    candidate: &Candidate,
    timeout: Duration,
) -> Result<String, ProbeError> {
    tracing::debug!(candidate = %candidate, dns = candidate.requires_dns_resolution(), "Probing");
    let result = match tokio::time::timeout(timeout, probe.probe(candidate)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::TimedOut {
            address: candidate.address().to_string(),
            after: timeout,
        }),
    };
    if let Err(e) = &result {
        tracing::debug!(candidate = %candidate, "Skipping: {e}");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decided_winner_waits_for_higher_priority() {
        let pending = vec![None, Some(Ok("b".to_string()))];
        assert_eq!(decided_winner(&pending), None);

        let failed_first = vec![Some(Err(())), Some(Ok("b".to_string()))];
        assert_eq!(decided_winner(&failed_first).as_deref(), Some("b"));

        let first_wins = vec![Some(Ok("a".to_string())), None];
        assert_eq!(decided_winner(&first_wins).as_deref(), Some("a"));

        let all_failed = vec![Some(Err(())), Some(Err(()))];
        assert_eq!(decided_winner(&all_failed), None);
    }

    #[test]
    fn test_first_success_skips_undecided() {
        let outcomes = vec![None, Some(Err(())), Some(Ok("c".to_string()))];
        assert_eq!(first_success(&outcomes).as_deref(), Some("c"));
        assert_eq!(first_success(&[None, Some(Err(()))]), None);
    }

    #[test]
    fn test_sequential_budget_covers_every_probe() {
        let parallel = HostResolver::new(ResolverConfig::default());
        assert_eq!(parallel.budget(6), Duration::from_secs(10));

        let sequential = HostResolver::new(
            ResolverConfig::default().with_strategy(ProbeStrategy::Sequential),
        );
        assert_eq!(sequential.budget(6), Duration::from_secs(30));
        assert_eq!(sequential.budget(1), Duration::from_secs(10));
    }

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.port, 22);
        assert_eq!(config.strategy, ProbeStrategy::Parallel);
        assert!(config.probe_timeout <= config.overall_timeout);
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let resolver = HostResolver::new(ResolverConfig::default());
        let err = resolver.resolve(&[]).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoCandidates));
    }

    #[tokio::test]
    async fn test_literal_passes_through() {
        let resolver = HostResolver::new(ResolverConfig::default());
        let host = resolver
            .resolve_target(&Target::Literal("my-alias".into()))
            .await
            .unwrap();
        assert_eq!(host.address(), "my-alias");
    }

    #[tokio::test]
    async fn test_host_lookup_of_ip() {
        let resolver = HostResolver::new(ResolverConfig::default());
        let host = resolver
            .resolve_target(&Target::Host("127.0.0.1".into()))
            .await
            .unwrap();
        assert_eq!(host.address(), "127.0.0.1");
    }
}
