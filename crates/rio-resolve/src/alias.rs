//! Host aliases from the user's OpenSSH config.
//!
//! When the requested hostname is a `Host` entry in `~/.ssh/config`, the
//! user has told ssh how to reach it, so resolution is skipped and the
//! name is passed through as is.

use std::path::{Path, PathBuf};

/// `Host` patterns declared in an OpenSSH config file.
#[derive(Debug, Clone, Default)]
pub struct SshAliases {
    hosts: Vec<String>,
}

impl SshAliases {
    /// Parse config text.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let hosts = contents
            .lines()
            .filter_map(|line| {
                let mut words = line.split_whitespace();
                let keyword = words.next()?;
                keyword
                    .eq_ignore_ascii_case("host")
                    .then(|| words.map(str::to_ascii_lowercase).collect::<Vec<_>>())
            })
            .flatten()
            .collect();
        Self { hosts }
    }

    /// Load a config file. A missing or unreadable file has no aliases.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring unreadable ssh config: {e}");
                Self::default()
            }
        }
    }

    /// Load `~/.ssh/config`.
    #[must_use]
    pub fn from_user_config() -> Self {
        user_config_path().map_or_else(Self::default, |path| Self::load(&path))
    }

    /// Whether `hostname` is declared as a `Host` entry.
    #[must_use]
    pub fn contains(&self, hostname: &str) -> bool {
        let hostname = hostname.trim().to_ascii_lowercase();
        self.hosts.iter().any(|host| *host == hostname)
    }

    /// Declared host patterns, lowercased.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}

fn user_config_path() -> Option<PathBuf> {
    Some(dirs::home_dir()?.join(".ssh").join("config"))
}
