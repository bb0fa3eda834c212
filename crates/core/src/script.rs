//! Script model and filesystem loading.
//!
//! A script is an opaque body executed by an external sandbox. The engine
//! only cares about its name, its default notification channels, and
//! whether it is excluded from scheduling. Those are declared in header
//! comment lines at the top of the script body:
//!
//! ```text
//! -- @name disk-watcher
//! -- @channels ops-telegram,ops-email
//! -- @ignore
//! ```
//!
//! Header parsing stops at the first non-comment line.

use std::path::Path;

use serde::Serialize;

/// Errors produced while loading scripts from disk.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to read script '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read script folder '{path}': {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded script with its scheduling metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Script {
    /// Unique script name. Derived from the file stem unless overridden
    /// with `-- @name`.
    pub name: String,
    /// The full script body, handed verbatim to the sandbox.
    pub body: String,
    /// Default channel set for alerts raised by this script.
    pub channels: Vec<String>,
    /// Excluded from scheduling when true (`-- @ignore`).
    pub ignore: bool,
}

impl Script {
    /// Build a script from a name and body, parsing header directives.
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        let mut script = Self {
            name: name.into(),
            body: body.into(),
            channels: Vec::new(),
            ignore: false,
        };
        script.parse_meta();
        script
    }

    /// Load a single script file. The name defaults to the file stem.
    pub fn from_file(path: &Path) -> Result<Self, ScriptError> {
        let body = std::fs::read_to_string(path).map_err(|e| ScriptError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, body))
    }

    /// Load every `.lua` file in a folder, sorted by name for stable
    /// cycle ordering.
    pub fn from_folder(path: &Path) -> Result<Vec<Self>, ScriptError> {
        let entries = std::fs::read_dir(path).map_err(|e| ScriptError::ReadDir {
            path: path.display().to_string(),
            source: e,
        })?;

        let mut scripts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ScriptError::ReadDir {
                path: path.display().to_string(),
                source: e,
            })?;
            let file_path = entry.path();
            if file_path.extension().and_then(|e| e.to_str()) == Some("lua") {
                scripts.push(Self::from_file(&file_path)?);
            }
        }
        scripts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scripts)
    }

    /// Parse `-- @directive` header lines, mutating the script in place.
    fn parse_meta(&mut self) {
        for line in self.body.lines() {
            let line = line.trim();
            let Some(comment) = line.strip_prefix("--") else {
                // First non-comment line ends the header.
                if !line.is_empty() {
                    break;
                }
                continue;
            };
            let comment = comment.trim();

            if let Some(value) = comment.strip_prefix("@name") {
                let value = value.trim();
                if !value.is_empty() {
                    self.name = value.to_string();
                }
            } else if let Some(value) = comment.strip_prefix("@channels") {
                self.channels = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            } else if comment == "@ignore" {
                self.ignore = true;
            }
        }
    }
}
