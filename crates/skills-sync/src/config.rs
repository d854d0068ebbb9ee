//! Sync-compiler configuration file (§6): an opt-in allow-list of
//! qualified keys (or the literal `all`) plus optional per-client output
//! directory overrides.

use std::collections::BTreeMap;
use std::path::Path;

use resource_core::{ResourceError, ResourceResult};
use serde::{Deserialize, Serialize};

/// Deserialized shape of `exports:` — either every enabled resource, or an
/// explicit allow-list of qualified keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exports {
    All,
    List(Vec<String>),
}

impl Exports {
    /// Whether `qualified_key` passes this allow-list.
    pub fn allows(&self, qualified_key: &str) -> bool {
        match self {
            Self::All => true,
            Self::List(keys) => keys.iter().any(|k| k == qualified_key),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputDirOverride {
    #[serde(default, rename = "user")]
    pub user: Option<String>,
    #[serde(default, rename = "project")]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientOverride {
    #[serde(default, rename = "outputDir")]
    pub output_dir: Option<OutputDirOverride>,
}

/// Raw on-disk shape, deserialized directly then converted to
/// [`SyncConfig`] so the rest of the pipeline works with the richer
/// [`Exports`] enum rather than re-parsing the `all` sentinel everywhere.
#[derive(Debug, Clone, Deserialize)]
struct RawSyncConfig {
    exports: RawExports,
    #[serde(default)]
    overrides: BTreeMap<String, ClientOverride>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawExports {
    All(String),
    List(Vec<String>),
}

/// Parsed sync-compiler configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub exports: Exports,
    pub overrides: BTreeMap<String, ClientOverride>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            exports: Exports::All,
            overrides: BTreeMap::new(),
        }
    }
}

impl SyncConfig {
    /// Load a YAML sync configuration from `path`. A missing file is not
    /// an error — it resolves to the default "export everything, no
    /// overrides" configuration, matching the CLI's "config is optional"
    /// framing.
    pub fn load(path: &Path) -> ResourceResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ResourceError::io(path, err)),
        }
    }

    fn parse(path: &Path, content: &str) -> ResourceResult<Self> {
        let raw: RawSyncConfig = serde_yml::from_str(content).map_err(|err| ResourceError::ParseError {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let exports = match raw.exports {
            RawExports::All(tag) if tag == "all" => Exports::All,
            RawExports::All(other) => {
                return Err(ResourceError::ParseError {
                    path: path.to_path_buf(),
                    message: format!(
                        "exports must be \"all\" or a list of qualified keys, got string {other:?}"
                    ),
                })
            }
            RawExports::List(keys) => Exports::List(keys),
        };

        Ok(Self {
            exports,
            overrides: raw.overrides,
        })
    }

    /// Output directory override for `client_id`/`scope`, if configured.
    pub fn output_dir_override(&self, client_id: &str, scope: &str) -> Option<&str> {
        let dirs = self.overrides.get(client_id)?.output_dir.as_ref()?;
        match scope {
            "user" => dirs.user.as_deref(),
            _ => dirs.project.as_deref(),
        }
    }
}
