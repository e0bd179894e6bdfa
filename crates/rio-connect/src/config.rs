//! Stored robot target.
//!
//! The file is TOML with a single `[auth]` table:
//!
//! ```toml
//! [auth]
//! hostname = "118"
//! ```
//!
//! `hostname` may be a team number or any hostname/IP.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Prompt;

/// Config error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("No answer to setup prompt: {0}")]
    Prompt(#[source] std::io::Error),
    #[error("No config directory on this platform")]
    NoConfigDir,
}

/// On-disk layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub auth: AuthSection,
}

/// `[auth]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Robot config bound to its file.
#[derive(Debug)]
pub struct RobotConfig {
    path: PathBuf,
    file: ConfigFile,
    dirty: bool,
}

impl RobotConfig {
    /// `<config dir>/rio-link/config.toml`.
    ///
    /// # Errors
    /// Returns error if the platform has no config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("rio-link").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from `path`. A missing file is an empty config that still
    /// needs writing.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let file = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
                Ok(Self {
                    path,
                    file,
                    dirty: false,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self {
                path,
                file: ConfigFile::default(),
                dirty: true,
            }),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored target, if any.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.file
            .auth
            .hostname
            .as_deref()
            .filter(|h| !h.trim().is_empty())
    }

    pub fn set_hostname(&mut self, hostname: impl Into<String>) {
        self.file.auth.hostname = Some(hostname.into());
        self.dirty = true;
    }

    /// Whether there are unsaved changes.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the file if anything changed. Returns whether it was written.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn save_if_changed(&mut self) -> Result<bool, ConfigError> {
        if !self.dirty {
            return Ok(false);
        }

        let io_error = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let contents = toml::to_string_pretty(&self.file)?;
        std::fs::write(&self.path, contents).map_err(io_error)?;

        tracing::debug!(path = %self.path.display(), "Saved robot config");
        self.dirty = false;
        Ok(true)
    }

    /// The target to connect to.
    ///
    /// An explicit `hostname` replaces the stored one. With nothing stored
    /// the user is asked until they answer. Changes are saved.
    ///
    /// # Errors
    /// Returns error if prompting or saving fails.
    pub fn target(
        &mut self,
        hostname: Option<&str>,
        prompt: &mut dyn Prompt,
    ) -> Result<String, ConfigError> {
        if let Some(hostname) = hostname {
            self.set_hostname(hostname);
        }

        let target = if let Some(stored) = self.hostname() {
            stored.to_string()
        } else {
            prompt
                .notice("Robot setup (hit enter for default value):")
                .map_err(ConfigError::Prompt)?;
            let answer = loop {
                let answer = prompt
                    .ask("Team number or robot hostname: ")
                    .map_err(ConfigError::Prompt)?;
                if !answer.trim().is_empty() {
                    break answer.trim().to_string();
                }
            };
            self.set_hostname(answer.clone());
            answer
        };

        self.save_if_changed()?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    struct Scripted {
        answers: VecDeque<&'static str>,
        asked: usize,
    }

    impl Scripted {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                asked: 0,
            }
        }
    }

    impl Prompt for Scripted {
        fn notice(&mut self, _message: &str) -> std::io::Result<()> {
            Ok(())
        }

        fn ask(&mut self, _question: &str) -> std::io::Result<String> {
            self.asked += 1;
            self.answers
                .pop_front()
                .map(str::to_string)
                .ok_or_else(|| std::io::ErrorKind::UnexpectedEof.into())
        }
    }

    #[test]
    fn test_missing_file_prompts_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut prompt = Scripted::new(&["", "  ", "118"]);

        let mut config = RobotConfig::load(&path).unwrap();
        assert!(config.is_dirty());
        let target = config.target(None, &mut prompt).unwrap();

        assert_eq!(target, "118");
        assert_eq!(prompt.asked, 3);
        assert!(!config.is_dirty());

        let reloaded = RobotConfig::load(&path).unwrap();
        assert_eq!(reloaded.hostname(), Some("118"));
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn test_stored_hostname_is_used_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[auth]\nhostname = \"roborio-254-frc.local\"\n").unwrap();
        let mut prompt = Scripted::new(&[]);

        let mut config = RobotConfig::load(&path).unwrap();
        let target = config.target(None, &mut prompt).unwrap();
        assert_eq!(target, "roborio-254-frc.local");
        assert_eq!(prompt.asked, 0);
        assert!(!config.save_if_changed().unwrap());
    }

    #[test]
    fn test_explicit_hostname_overrides_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[auth]\nhostname = \"118\"\n").unwrap();

        let mut config = RobotConfig::load(&path).unwrap();
        let target = config.target(Some("254"), &mut Scripted::new(&[])).unwrap();
        assert_eq!(target, "254");
        assert_eq!(RobotConfig::load(&path).unwrap().hostname(), Some("254"));
    }

    #[test]
    fn test_prompt_eof_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RobotConfig::load(dir.path().join("config.toml")).unwrap();
        let err = config.target(None, &mut Scripted::new(&[""])).unwrap_err();
        assert!(matches!(err, ConfigError::Prompt(_)));
    }

    #[test]
    fn test_empty_auth_table() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(file, ConfigFile::default());
        let file: ConfigFile = toml::from_str("[auth]\n").unwrap();
        assert!(file.auth.hostname.is_none());
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[auth\nhostname = ").unwrap();
        assert!(matches!(
            RobotConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
