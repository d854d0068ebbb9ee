//! Protocol-native adapter family (§4.10 step 4): one markdown file per
//! resource, a compact YAML frontmatter block, and a body whose argument
//! references have been compiled to positional `$0`, `$1`, … tokens.

use super::{Adapter, OutputFile};
use crate::client::ClientSpec;
use crate::ir::ResourceIr;
use crate::template;

pub struct ProtocolNativeAdapter;

impl Adapter for ProtocolNativeAdapter {
    fn adapt(&self, resource: &ResourceIr, output_dir: &str, _client: &ClientSpec) -> Vec<OutputFile> {
        let body = template::compile_positional(&resource.template_body, &resource.arguments);
        let frontmatter = render_frontmatter(resource);

        vec![OutputFile {
            relative_path: format!("{output_dir}/SKILL.md"),
            content: format!("{frontmatter}\n{body}\n"),
        }]
    }
}

/// Renders the frontmatter block with a fixed key order (`name`,
/// `description`, then the optional `tools`/`argument-hint` lines only
/// when non-empty) so output is byte-identical across runs.
fn render_frontmatter(resource: &ResourceIr) -> String {
    let mut lines = vec!["---".to_string(), format!("name: {}", resource.name)];
    lines.push(format!("description: {}", yaml_scalar(&resource.description)));

    if !resource.tool_ids.is_empty() {
        lines.push(format!("tools: [{}]", resource.tool_ids.join(", ")));
    }
    if !resource.arguments.is_empty() {
        let hint: Vec<String> = resource
            .arguments
            .iter()
            .map(|arg| format!("<{}>", arg.name))
            .collect();
        lines.push(format!("argument-hint: {}", hint.join(" ")));
    }
    lines.push("---".to_string());
    lines.join("\n")
}

/// Quotes a scalar only when it contains a character YAML would otherwise
/// treat specially, keeping the common case (`description: Review code`)
/// unquoted the way hand-written frontmatter reads.
fn yaml_scalar(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value.contains(':')
        || value.contains('#')
        || value.starts_with(['-', '"', '\'', '[', '{']);
    if needs_quoting {
        format!("{:?}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AdapterFamily, ClientSpec, Scope};
    use crate::ir::ArgumentIr;

    fn client() -> ClientSpec {
        ClientSpec {
            id: "claude-code".to_string(),
            family: AdapterFamily::ProtocolNative,
            variant: "default".to_string(),
            capabilities: Default::default(),
            output_dir: Scope {
                user: "~/.claude/commands".into(),
                project: ".claude/commands".into(),
            },
        }
    }

    fn resource() -> ResourceIr {
        ResourceIr {
            qualified_key: "prompt:development/review".to_string(),
            resource_type: resource_core::ResourceType::Prompt,
            id: "review".to_string(),
            category: Some("development".to_string()),
            name: "review".to_string(),
            description: "Review code".to_string(),
            arguments: vec![ArgumentIr {
                name: "target".to_string(),
                required: false,
            }],
            tool_ids: Vec::new(),
            template_body: "{% if target %}Review {{target}}{% else %}Review the diff{% endif %}"
                .to_string(),
            source_hash: "hash".to_string(),
        }
    }

    #[test]
    fn single_file_with_positional_body_and_name_header() {
        let files = ProtocolNativeAdapter.adapt(&resource(), "review", &client());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, "review/SKILL.md");
        assert!(files[0].content.contains("name: review"));
        assert!(files[0].content.contains("Review $0"));
        assert!(!files[0].content.contains("Review the diff"));
    }

    #[test]
    fn adaptation_is_deterministic_across_runs() {
        let first = ProtocolNativeAdapter.adapt(&resource(), "review", &client());
        let second = ProtocolNativeAdapter.adapt(&resource(), "review", &client());
        assert_eq!(first, second);
    }
}
