//! Loads the full, current set of canonical resources directly from disk
//! (§4.10: "it consumes registry contents directly from disk"), without
//! the running server or its hot-reload machinery.

use std::sync::Arc;

use resource_core::{Resource, ResourceType};
use resource_loaders::{
    GateLoader, LoaderConfig, ListFilter, MethodologyLoader, PromptLoader, ResourceLoader,
    ResourceRegistry, ScriptToolLoader, StyleLoader,
};
use resource_paths::PathResolver;

/// Populate one registry per resource type from `config` and return every
/// enabled resource across all five types, in no particular order (callers
/// sort by qualified key where order matters).
pub fn load_all(config: &LoaderConfig) -> Vec<Arc<Resource>> {
    let resolver = PathResolver::new(config.package_manifest_dir.clone(), config.workspace_overlays.clone());

    let mut resources = Vec::new();

    let gate_loader = GateLoader::new(resolver.clone());
    resources.extend(populate(ResourceType::Gate, &gate_loader));

    let methodology_loader = MethodologyLoader::new(resolver.clone());
    resources.extend(populate(ResourceType::Methodology, &methodology_loader));

    let style_loader = StyleLoader::new(resolver.clone());
    resources.extend(populate(ResourceType::Style, &style_loader));

    let script_tool_loader = ScriptToolLoader::new(resolver.clone());
    resources.extend(populate(ResourceType::ScriptTool, &script_tool_loader));

    let prompt_loader = PromptLoader::new(resolver, config);
    resources.extend(populate(ResourceType::Prompt, &prompt_loader));

    resources
}

fn populate(resource_type: ResourceType, loader: &dyn ResourceLoader) -> Vec<Arc<Resource>> {
    let registry = ResourceRegistry::new(resource_type);
    registry.populate(loader);
    registry.list(&ListFilter::default())
}
