//! YAML process configuration with validation.
//!
//! Mirrors the shape consumed by the binary:
//!
//! ```yaml
//! scripts:
//!   folders: ["./scripts"]
//!   files: []
//!   default_channels: ["ops-telegram"]
//! scheduler:
//!   interval_secs: 60
//!   send_timeout_secs: 10
//! channels:
//!   telegram:
//!     - { name: ops-telegram, token: "${TG_TOKEN}", chat_id: "-100", parse_mode: MarkdownV2 }
//!   webhook:
//!     - { name: ops-hook, url: "https://example.com/hook" }
//!   email:
//!     - { name: ops-email, host: smtp.example.com, from: "vigil@example.com", to: ["oncall@example.com"] }
//! ```
//!
//! Malformed configuration is the only process-fatal condition in the
//! system; everything downstream of a validated [`Config`] degrades to
//! logged errors.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::script::{Script, ScriptError};

/// Errors from loading or validating the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Top-level process configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Where scripts are loaded from and which channels they default to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptsConfig {
    #[serde(default)]
    pub folders: Vec<PathBuf>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Channels used by scripts that declare none of their own.
    #[serde(default)]
    pub default_channels: Vec<String>,
}

/// Scheduling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between cycles. Must be > 0.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound on a single channel `send`, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_send_timeout_secs() -> u64 {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    /// Tick interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Per-send timeout as a [`Duration`].
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

/// Named notification channels, grouped by kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: Vec<TelegramChannelConfig>,
    #[serde(default)]
    pub webhook: Vec<WebhookChannelConfig>,
    #[serde(default)]
    pub email: Vec<EmailChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChannelConfig {
    pub name: String,
    /// Bot token; `${VAR}` references resolve from the environment.
    pub token: String,
    pub chat_id: String,
    #[serde(default)]
    pub parse_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChannelConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailChannelConfig {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub tls: Option<bool>,
    pub from: String,
    pub to: Vec<String>,
}

impl Config {
    /// Load and parse the YAML configuration file. Call
    /// [`validate`](Config::validate) before using the result.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Reject configurations the engine cannot safely run with:
    /// zero tick interval, empty or duplicate channel names, missing
    /// script sources.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.interval_secs must be > 0".to_string(),
            ));
        }
        if self.scripts.folders.is_empty() && self.scripts.files.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one script source (scripts.folders or scripts.files) is required"
                    .to_string(),
            ));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for name in self.channel_names() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "channel name must be not empty".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "duplicated channel name: '{name}'"
                )));
            }
        }

        for name in &self.scripts.default_channels {
            if !seen.contains(name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "default channel '{name}' is not defined"
                )));
            }
        }

        Ok(())
    }

    /// All configured channel names across kinds, in declaration order.
    pub fn channel_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        names.extend(self.channels.telegram.iter().map(|c| c.name.as_str()));
        names.extend(self.channels.webhook.iter().map(|c| c.name.as_str()));
        names.extend(self.channels.email.iter().map(|c| c.name.as_str()));
        names
    }

    /// Load every configured script, folders first, then explicit files.
    /// Scripts that declare no channels inherit `default_channels`;
    /// duplicate script names across all sources are rejected.
    pub fn load_scripts(&self) -> Result<Vec<Script>, ConfigError> {
        let mut scripts = Vec::new();
        for folder in &self.scripts.folders {
            scripts.extend(Script::from_folder(folder)?);
        }
        for file in &self.scripts.files {
            scripts.push(Script::from_file(file)?);
        }
        for script in &mut scripts {
            if script.channels.is_empty() {
                script.channels = self.scripts.default_channels.clone();
            }
        }

        // Names key the re-entrancy guard; duplicates would silently
        // skip each other's runs.
        let mut names: HashSet<&str> = HashSet::new();
        for script in &scripts {
            if !names.insert(script.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicated script name: '{}'",
                    script.name
                )));
            }
        }

        debug!(scripts = scripts.len(), "scripts loaded");
        Ok(scripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_yaml() -> &'static str {
        r#"
scripts:
  folders: ["./scripts"]
  default_channels: ["tg"]
scheduler:
  interval_secs: 30
channels:
  telegram:
    - name: tg
      token: "t"
      chat_id: "42"
"#
    }

    #[test]
    fn parses_minimal_config() {
        let cfg: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(cfg.scheduler.interval_secs, 30);
        assert_eq!(cfg.scheduler.send_timeout_secs, 10);
        assert_eq!(cfg.channels.telegram.len(), 1);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_zero_interval() {
        let mut cfg: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        cfg.scheduler.interval_secs = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("interval_secs"));
    }

    #[test]
    fn rejects_duplicate_channel_names_across_kinds() {
        let mut cfg: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        cfg.channels.webhook.push(WebhookChannelConfig {
            name: "tg".to_string(),
            url: "https://example.com".to_string(),
            method: None,
            headers: HashMap::new(),
        });
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("duplicated channel name"));
    }

    #[test]
    fn rejects_unknown_default_channel() {
        let mut cfg: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        cfg.scripts.default_channels = vec!["missing".to_string()];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn rejects_missing_script_sources() {
        let mut cfg: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        cfg.scripts.folders.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn scheduler_settings_convert_to_durations() {
        let cfg: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(cfg.scheduler.interval(), Duration::from_secs(30));
        assert_eq!(cfg.scheduler.send_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn rejects_duplicate_script_names() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["a.lua", "b.lua"] {
            let mut f = std::fs::File::create(dir.path().join(file)).unwrap();
            f.write_all(b"-- @name shared\n").unwrap();
        }

        let mut cfg: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        cfg.scripts.folders = vec![dir.path().to_path_buf()];

        let err = cfg.load_scripts().unwrap_err();
        assert!(err.to_string().contains("duplicated script name"));
    }

    #[test]
    fn load_scripts_applies_default_channels() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("check.lua")).unwrap();
        f.write_all(b"return 1\n").unwrap();
        let mut g = std::fs::File::create(dir.path().join("own.lua")).unwrap();
        g.write_all(b"-- @channels special\n").unwrap();

        let mut cfg: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        cfg.scripts.folders = vec![dir.path().to_path_buf()];

        let scripts = cfg.load_scripts().unwrap();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].name, "check");
        assert_eq!(scripts[0].channels, vec!["tg"]);
        assert_eq!(scripts[1].channels, vec!["special"]);
    }
}
