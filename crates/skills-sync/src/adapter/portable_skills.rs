//! Portable-skills adapter family (§4.10 step 4): a broader frontmatter
//! block (name, description, license, compatibility map, a metadata block
//! carrying resource type and source hash, optional allowed-tools) plus a
//! body whose argument references become `{name}` placeholders. Per-variant
//! frontmatter differences (e.g. `cursor`'s `alwaysApply` boolean) live
//! entirely in this adapter so the pipeline stays variant-agnostic.

use super::{Adapter, OutputFile};
use crate::client::ClientSpec;
use crate::ir::ResourceIr;
use crate::template;

const LICENSE: &str = "MIT";

pub struct PortableSkillsAdapter;

impl Adapter for PortableSkillsAdapter {
    fn adapt(&self, resource: &ResourceIr, output_dir: &str, client: &ClientSpec) -> Vec<OutputFile> {
        let body = template::compile_named(&resource.template_body, &resource.arguments);
        let frontmatter = render_frontmatter(resource, client);

        let mut files = vec![OutputFile {
            relative_path: format!("{output_dir}/SKILL.md"),
            content: format!("{frontmatter}\n{body}\n"),
        }];

        if client.capabilities.scripts && !resource.tool_ids.is_empty() {
            let listing = resource.tool_ids.join("\n");
            files.push(OutputFile {
                relative_path: format!("{output_dir}/scripts/tools.txt"),
                content: format!("{listing}\n"),
            });
        }

        if client.capabilities.references {
            files.push(OutputFile {
                relative_path: format!("{output_dir}/references/source.md"),
                content: format!(
                    "Source: {}\nSource hash: {}\n",
                    resource.qualified_key, resource.source_hash
                ),
            });
        }

        files
    }
}

fn render_frontmatter(resource: &ResourceIr, client: &ClientSpec) -> String {
    let mut lines = vec![
        "---".to_string(),
        format!("name: {}", resource.name),
        format!("description: {}", yaml_scalar(&resource.description)),
        format!("license: {LICENSE}"),
        "compatibility:".to_string(),
        format!("  {}: true", client.id),
    ];

    lines.push("metadata:".to_string());
    lines.push(format!("  resourceType: {}", resource.resource_type));
    lines.push(format!("  sourceHash: {}", resource.source_hash));

    if !resource.tool_ids.is_empty() {
        lines.push(format!("allowedTools: [{}]", resource.tool_ids.join(", ")));
    }

    if client.variant == "cursor" {
        lines.push("alwaysApply: false".to_string());
    }

    lines.push("---".to_string());
    lines.join("\n")
}

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
    use crate::client::{AdapterFamily, Capabilities, ClientSpec, Scope};
    use crate::ir::ArgumentIr;

    fn cursor_client() -> ClientSpec {
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
                user: "~/.cursor/rules".into(),
                project: ".cursor/rules".into(),
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
            template_body: "Review {{target}}".to_string(),
            source_hash: "hash".to_string(),
        }
    }

    #[test]
    fn body_uses_named_placeholders() {
        let files = PortableSkillsAdapter.adapt(&resource(), "review", &cursor_client());
        assert!(files[0].content.contains("Review {target}"));
    }

    #[test]
    fn cursor_variant_carries_always_apply_flag() {
        let files = PortableSkillsAdapter.adapt(&resource(), "review", &cursor_client());
        assert!(files[0].content.contains("alwaysApply: false"));
    }

    #[test]
    fn references_capability_emits_auxiliary_file() {
        let files = PortableSkillsAdapter.adapt(&resource(), "review", &cursor_client());
        assert!(files.iter().any(|f| f.relative_path == "review/references/source.md"));
    }
}
