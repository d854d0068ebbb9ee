//! The shared intermediate representation every adapter (§4.10 step 4)
//! renders from. Built once per selected [`Resource`]; adapters never
//! touch a `Resource`/`Payload` directly so a new client only has to
//! implement [`crate::adapter::Adapter`] against this smaller surface.

use resource_core::{Payload, Resource, ResourceType};

/// One declared argument, reduced to what an adapter's header/body
/// rendering needs.
#[derive(Debug, Clone)]
pub struct ArgumentIr {
    /// Argument name, referenced in the template body as `{{name}}`.
    pub name: String,
    /// Whether the argument must be supplied at execution time.
    pub required: bool,
}

/// A [`Resource`] reduced to the fields every adapter renders from,
/// regardless of resource type.
#[derive(Debug, Clone)]
pub struct ResourceIr {
    /// The qualified key this resource was selected under.
    pub qualified_key: String,
    /// Resource type, for metadata blocks and filtering.
    pub resource_type: ResourceType,
    /// Lowercased id.
    pub id: String,
    /// Category, for prompts only.
    pub category: Option<String>,
    /// Display name shown in the adapter header.
    pub name: String,
    /// One-line description shown in the adapter header.
    pub description: String,
    /// Declared arguments, in declaration order — the order positional
    /// tokens (`$0`, `$1`, …) are assigned in.
    pub arguments: Vec<ArgumentIr>,
    /// Attached script-tool ids, for the optional tool-list header field.
    pub tool_ids: Vec<String>,
    /// Un-rendered template body (system + user message concatenated for
    /// prompts; guidance text for gates/styles; system-prompt text for
    /// methodologies).
    pub template_body: String,
    /// `source_hash` at IR-construction time, carried into the manifest.
    pub source_hash: String,
}

impl ResourceIr {
    /// Reduce a loaded [`Resource`] to its adapter-facing IR.
    pub fn from_resource(resource: &Resource) -> Self {
        let (name, description, arguments, tool_ids, template_body) = match &resource.payload {
            Payload::Prompt(prompt) => {
                let mut body = String::new();
                if let Some(system) = &prompt.system_message {
                    body.push_str(system.trim_end());
                    body.push('\n');
                }
                if let Some(user) = &prompt.user_message {
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body.push_str(user.trim_end());
                }
                let description = first_line(&body, &resource.id);
                let arguments = prompt
                    .arguments
                    .iter()
                    .map(|arg| ArgumentIr {
                        name: arg.name.clone(),
                        required: arg.required,
                    })
                    .collect();
                (
                    resource.id.clone(),
                    description,
                    arguments,
                    prompt.script_tool_ids.clone(),
                    body,
                )
            }
            Payload::Gate(gate) => (
                gate.name.clone(),
                gate.description.clone(),
                Vec::new(),
                Vec::new(),
                gate.guidance.clone().unwrap_or_default(),
            ),
            Payload::Methodology(methodology) => (
                resource.id.clone(),
                format!("{} methodology, v{}", methodology.methodology_type, methodology.version),
                Vec::new(),
                Vec::new(),
                methodology.system_prompt.clone(),
            ),
            Payload::Style(style) => (
                resource.id.clone(),
                format!("{:?} style", style.enhancement_mode).to_lowercase(),
                Vec::new(),
                Vec::new(),
                style.guidance.clone(),
            ),
            Payload::ScriptTool(tool) => (
                resource.id.clone(),
                format!("{} script tool", tool.runtime),
                Vec::new(),
                Vec::new(),
                tool.script_body.clone(),
            ),
        };

        Self {
            qualified_key: resource.qualified_key(),
            resource_type: resource.resource_type(),
            id: resource.id.clone(),
            category: resource.category.clone(),
            name,
            description,
            arguments,
            tool_ids,
            template_body,
            source_hash: resource.source_hash.clone(),
        }
    }
}

fn first_line(body: &str, fallback: &str) -> String {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_core::{Argument, ArgType, GateConfig, PromptPayload, RegisterPolicy, SourceRoot};

    fn prompt_resource() -> Resource {
        Resource {
            id: "review".to_string(),
            category: Some("development".to_string()),
            source_paths: Vec::new(),
            source_hash: "abc123".to_string(),
            payload: Payload::Prompt(PromptPayload {
                system_message: None,
                user_message: Some("Review {{code}} for {{target}}.".to_string()),
                arguments: vec![
                    Argument {
                        name: "code".to_string(),
                        arg_type: ArgType::String,
                        required: true,
                        validation: None,
                    },
                    Argument {
                        name: "target".to_string(),
                        arg_type: ArgType::String,
                        required: false,
                        validation: None,
                    },
                ],
                chain_steps: Vec::new(),
                gate_config: GateConfig::default(),
                script_tool_ids: Vec::new(),
            }),
            enabled: true,
            register_with_protocol: RegisterPolicy::default(),
            source_root: SourceRoot::Primary,
        }
    }

    #[test]
    fn prompt_ir_carries_arguments_in_declaration_order() {
        let ir = ResourceIr::from_resource(&prompt_resource());
        assert_eq!(ir.arguments.len(), 2);
        assert_eq!(ir.arguments[0].name, "code");
        assert_eq!(ir.arguments[1].name, "target");
        assert_eq!(ir.qualified_key, "prompt:development/review");
    }

    #[test]
    fn prompt_ir_description_is_first_nonempty_line() {
        let ir = ResourceIr::from_resource(&prompt_resource());
        assert_eq!(ir.description, "Review {{code}} for {{target}}.");
    }
}
