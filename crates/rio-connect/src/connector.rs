//! From a configured target to a ready session.

use std::path::PathBuf;

use rio_core::{Credentials, ResolvedHost, TeamNumber, Transport};
use rio_resolve::{HostResolver, ResolveError, ResolverConfig, SshAliases, Target};
use rio_session::{RemoteSession, SessionOptions};
use thiserror::Error;

use crate::{ConfigError, Prompt, RobotConfig};

/// Connect error.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Could not find team {team} robot: {source}")]
    RobotNotFound {
        team: TeamNumber,
        #[source]
        source: ResolveError,
    },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Builds sessions for a configured robot.
pub struct Connector {
    config_path: PathBuf,
    resolver: HostResolver,
    session_options: SessionOptions,
    aliases: SshAliases,
    resolution_enabled: bool,
}

impl Connector {
    /// Connector using the config at `config_path` and the user's ssh aliases.
    #[must_use]
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            resolver: HostResolver::new(ResolverConfig::default()),
            session_options: SessionOptions::default(),
            aliases: SshAliases::from_user_config(),
            resolution_enabled: true,
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: HostResolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.session_options = options;
        self
    }

    #[must_use]
    pub fn with_aliases(mut self, aliases: SshAliases) -> Self {
        self.aliases = aliases;
        self
    }

    /// Use hostnames as given instead of looking them up.
    ///
    /// Bare team numbers are still found by racing candidates.
    #[must_use]
    pub const fn without_resolution(mut self) -> Self {
        self.resolution_enabled = false;
        self
    }

    /// The configured target, asking for one on first run.
    ///
    /// # Errors
    /// Returns error if the config cannot be read, prompted for or saved.
    pub fn target(
        &self,
        hostname: Option<&str>,
        prompt: &mut dyn Prompt,
    ) -> Result<String, ConnectError> {
        let mut config = RobotConfig::load(&self.config_path)?;
        Ok(config.target(hostname, prompt)?)
    }

    /// Classify a raw target, honouring ssh aliases.
    #[must_use]
    pub fn classify(&self, raw: &str) -> Target {
        let aliased = self.aliases.contains(raw);
        if aliased {
            tracing::debug!(host = raw.trim(), "Host is an ssh alias, not resolving");
        }
        Target::parse(raw, self.resolution_enabled && !aliased)
    }

    /// Resolve a raw target to an address.
    ///
    /// # Errors
    /// Returns error if the robot or host cannot be found.
    pub async fn resolve(&self, raw: &str) -> Result<ResolvedHost, ConnectError> {
        match self.classify(raw) {
            Target::Team(team) => self
                .resolver
                .resolve_team(team)
                .await
                .map_err(|source| ConnectError::RobotNotFound { team, source }),
            target => Ok(self.resolver.resolve_target(&target).await?),
        }
    }

    /// Resolve `raw` and build an unopened session for it.
    ///
    /// # Errors
    /// Returns error if the target cannot be resolved.
    pub async fn session<T: Transport>(
        &self,
        raw: &str,
        credentials: Credentials,
        transport: T,
    ) -> Result<RemoteSession<T>, ConnectError> {
        let host = self.resolve(raw).await?;
        Ok(RemoteSession::new(
            host,
            credentials,
            self.session_options.clone(),
            transport,
        ))
    }

    /// Configured target to session in one step.
    ///
    /// # Errors
    /// Returns error if the config step or resolution fails.
    pub async fn session_from_config<T: Transport>(
        &self,
        hostname: Option<&str>,
        prompt: &mut dyn Prompt,
        credentials: Credentials,
        transport: T,
    ) -> Result<RemoteSession<T>, ConnectError> {
        let target = self.target(hostname, prompt)?;
        self.session(&target, credentials, transport).await
    }
}
