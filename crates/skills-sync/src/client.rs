//! Built-in client registry (§4.10 step 1): the supported export targets,
//! their adapter family, capability flags, and default output directories.

use std::collections::BTreeMap;

/// Which adapter family (§4.10 step 4) a client is rendered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterFamily {
    /// Single markdown file, positional `$0`/`$1` tokens.
    ProtocolNative,
    /// Broader frontmatter, `{name}` placeholders, optional scripts/refs.
    PortableSkills,
}

/// Auxiliary output capabilities a portable-skills client accepts, beyond
/// the rendered skill body itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Attached script-tool bodies may be written alongside the skill file.
    pub scripts: bool,
    /// A `references/` auxiliary directory may be written.
    pub references: bool,
    /// Binary/asset files may be written (unused by any built-in client
    /// today; declared so a future client can opt in without a schema
    /// change).
    pub assets: bool,
}

/// User-scope and project-scope default output directories for a client.
#[derive(Debug, Clone)]
pub struct Scope {
    pub user: String,
    pub project: String,
}

/// One entry in the built-in client registry.
#[derive(Debug, Clone)]
pub struct ClientSpec {
    pub id: String,
    pub family: AdapterFamily,
    /// Distinguishes clients sharing a family but differing in frontmatter
    /// shape (e.g. a `cursor`-style `alwaysApply` boolean).
    pub variant: String,
    pub capabilities: Capabilities,
    pub output_dir: Scope,
}

impl ClientSpec {
    /// The configured output root for `scope`.
    pub fn output_root(&self, scope: &str) -> &str {
        match scope {
            "user" => &self.output_dir.user,
            _ => &self.output_dir.project,
        }
    }
}

/// The built-in registry of supported export targets.
pub struct ClientRegistry {
    clients: BTreeMap<String, ClientSpec>,
}

impl ClientRegistry {
    /// Construct the registry with the shipped built-in clients.
    pub fn builtin() -> Self {
        let mut clients = BTreeMap::new();

        clients.insert(
            "claude-code".to_string(),
            ClientSpec {
                id: "claude-code".to_string(),
                family: AdapterFamily::ProtocolNative,
                variant: "default".to_string(),
                capabilities: Capabilities::default(),
                output_dir: Scope {
                    user: "~/.claude/commands".to_string(),
                    project: ".claude/commands".to_string(),
                },
            },
        );

        clients.insert(
            "cursor".to_string(),
            ClientSpec {
                id: "cursor".to_string(),
                family: AdapterFamily::PortableSkills,
                variant: "cursor".to_string(),
                capabilities: Capabilities {
                    scripts: false,
                    references: true,
                    assets: false,
                },
                output_dir: Scope {
                    user: "~/.cursor/rules".to_string(),
                    project: ".cursor/rules".to_string(),
                },
            },
        );

        clients.insert(
            "windsurf".to_string(),
            ClientSpec {
                id: "windsurf".to_string(),
                family: AdapterFamily::PortableSkills,
                variant: "windsurf".to_string(),
                capabilities: Capabilities {
                    scripts: true,
                    references: true,
                    assets: false,
                },
                output_dir: Scope {
                    user: "~/.windsurf/rules".to_string(),
                    project: ".windsurf/rules".to_string(),
                },
            },
        );

        Self { clients }
    }

    /// Look up one client by id.
    pub fn get(&self, id: &str) -> Option<&ClientSpec> {
        self.clients.get(id)
    }

    /// Every registered client, sorted by id.
    pub fn all(&self) -> Vec<&ClientSpec> {
        self.clients.values().collect()
    }

    /// Registered client ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }
}
