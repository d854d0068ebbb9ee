//! # Resource Core
//!
//! Shared data model, qualified-key scheme, and error taxonomy for the
//! prompt-orchestration server's resource subsystem. Every other
//! `resource-*` crate (and the skills-sync compiler) builds on the types
//! defined here; none of them re-declare the model independently.

mod error;
mod hash;
mod resource;

pub use error::{ResourceError, ResourceResult};
pub use hash::{content_hash, source_hash};
pub use resource::{
    ArgType, Argument, ChainStep, Criterion, EnhancementMode, GateConfig, GatePayload,
    GateScope, GateSeverity, GateType, MethodologyPayload, Payload, Phase, PromptPayload,
    RegisterPolicy, Resource, ResourceType, RetryPolicy, ScriptToolPayload, SourceRoot,
    StylePayload,
};

/// The deterministic string used to identify a resource across types:
/// `prompt:{category}/{id}` for prompts, `{type}:{id}` for everything else.
pub fn qualified_key(resource_type: ResourceType, category: Option<&str>, id: &str) -> String {
    match resource_type {
        ResourceType::Prompt => {
            let category = category.unwrap_or("uncategorized");
            format!("prompt:{category}/{id}")
        }
        other => format!("{}:{}", other.tag(), id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_key_includes_category() {
        assert_eq!(
            qualified_key(ResourceType::Prompt, Some("development"), "review"),
            "prompt:development/review"
        );
    }

    #[test]
    fn non_prompt_key_has_no_category() {
        assert_eq!(
            qualified_key(ResourceType::Gate, None, "code-quality"),
            "gate:code-quality"
        );
    }

    #[test]
    fn prompt_key_defaults_category_when_absent() {
        assert_eq!(
            qualified_key(ResourceType::Prompt, None, "standalone"),
            "prompt:uncategorized/standalone"
        );
    }
}
