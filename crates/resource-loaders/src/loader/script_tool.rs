use std::path::{Path, PathBuf};

use resource_core::{Payload, Resource, ResourceError, ResourceResult, ResourceType, ScriptToolPayload};
use resource_paths::PathResolver;

use crate::cache::{LoaderStats, ResourceCache};

use super::{all_ids_across_roots, resolve_entry_dir, resolved_roots, ResourceLoader};

/// Loads standalone script-tools from `{root}/{id}/tool.yaml` (+ sibling
/// script body file named by `runtime`'s conventional extension).
///
/// Also exposes [`ScriptToolLoader::load_from_dir`], used by
/// [`super::PromptLoader`] to load the `tools/{tool_id}/` sub-trees attached
/// to a prompt without going through a resolved-roots lookup.
pub struct ScriptToolLoader {
    resolver: PathResolver,
    cache: ResourceCache,
}

impl ScriptToolLoader {
    /// Build a loader around an already-constructed [`PathResolver`].
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            cache: ResourceCache::new(),
        }
    }

    fn roots(&self) -> Vec<PathBuf> {
        resolved_roots(&self.resolver, ResourceType::ScriptTool)
    }

    /// Load a script-tool whose files live directly under `dir` (no root
    /// resolution, no cache). Used for prompt-attached tools, whose
    /// identity is scoped to the owning prompt rather than a global root.
    pub(crate) fn load_from_dir(
        dir: &Path,
        id: &str,
        source_root: resource_core::SourceRoot,
    ) -> ResourceResult<Resource> {
        let entry_path = dir.join("tool.yaml");
        let entry_text =
            std::fs::read_to_string(&entry_path).map_err(|err| ResourceError::io(&entry_path, err))?;
        let value: serde_json::Value = serde_yml::from_str(&entry_text)
            .map_err(|err| ResourceError::parse(&entry_path, err.to_string()))?;

        let outcome = resource_schema::validate_script_tool(&value, id);
        if !outcome.valid {
            return Err(ResourceError::schema(&entry_path, outcome.errors));
        }

        let runtime = value
            .get("runtime")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        let script_path = find_script_body(dir, &runtime);
        let script_body = match &script_path {
            Some(path) => resource_paths::load_text_file(path, true)?.unwrap_or_default(),
            None => String::new(),
        };

        let mut sources = vec![(entry_path.clone(), entry_text)];
        let mut source_paths = vec![entry_path.clone()];
        if let Some(path) = &script_path {
            sources.push((path.clone(), script_body.clone()));
            source_paths.push(path.clone());
        }

        let mut payload: ScriptToolPayload = serde_json::from_value(value)
            .map_err(|err| ResourceError::parse(&entry_path, err.to_string()))?;
        payload.script_body = script_body;

        let source_hash = resource_core::source_hash(&sources);

        Ok(Resource {
            id: id.to_string(),
            category: None,
            source_paths,
            source_hash,
            payload: Payload::ScriptTool(payload),
            enabled: true,
            register_with_protocol: resource_core::RegisterPolicy::default(),
            source_root,
        })
    }
}

/// Conventional script-body filename per runtime; falls back to scanning
/// for any file named `script.*` when the runtime is unrecognized.
fn find_script_body(dir: &Path, runtime: &str) -> Option<PathBuf> {
    let candidate = match runtime {
        "python3" | "python" => dir.join("script.py"),
        "node" | "javascript" => dir.join("script.js"),
        "bash" | "sh" => dir.join("script.sh"),
        _ => dir.join("script.txt"),
    };
    if candidate.is_file() {
        return Some(candidate);
    }

    let pattern = dir.join("script.*");
    glob::glob(&pattern.to_string_lossy())
        .ok()?
        .filter_map(Result::ok)
        .find(|path| path.is_file())
}

impl ResourceLoader for ScriptToolLoader {
    fn resource_type(&self) -> ResourceType {
        ResourceType::ScriptTool
    }

    fn discover(&self) -> Vec<String> {
        all_ids_across_roots(&self.roots(), "tool.yaml")
    }

    fn load(&self, id: &str) -> ResourceResult<Option<Resource>> {
        if let Some(resource) = self.cache.get(id) {
            return Ok(Some(resource));
        }

        let roots = self.roots();
        let Some((dir, source_root)) = resolve_entry_dir(&roots, id, "tool.yaml") else {
            return Ok(None);
        };

        match Self::load_from_dir(&dir, id, source_root) {
            Ok(resource) => {
                self.cache.insert(id.to_string(), resource.clone());
                Ok(Some(resource))
            }
            Err(err) => {
                self.cache.record_error();
                Err(err)
            }
        }
    }

    fn clear_cache(&self, id: Option<&str>) {
        self.cache.clear(id);
    }

    fn stats(&self) -> LoaderStats {
        self.cache.stats()
    }

    fn watch_dirs(&self) -> Vec<PathBuf> {
        self.roots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_standalone_script_tool() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/script-tools/lint/tool.yaml"),
            "id: lint\nruntime: python3\n",
        );
        write(
            &root.path().join("resources/script-tools/lint/script.py"),
            "print('lint')\n",
        );

        let loader = ScriptToolLoader::new(PathResolver::new(root.path(), Vec::new()));
        let resource = loader.load("lint").unwrap().unwrap();
        let Payload::ScriptTool(payload) = resource.payload else {
            panic!("expected script-tool payload");
        };
        assert_eq!(payload.script_body, "print('lint')\n");
    }

    #[test]
    fn unrecognized_runtime_falls_back_to_scanning_for_script_dot_anything() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/script-tools/transpile/tool.yaml"),
            "id: transpile\nruntime: deno\n",
        );
        write(
            &root.path().join("resources/script-tools/transpile/script.ts"),
            "console.log('ts')\n",
        );

        let loader = ScriptToolLoader::new(PathResolver::new(root.path(), Vec::new()));
        let resource = loader.load("transpile").unwrap().unwrap();
        let Payload::ScriptTool(payload) = resource.payload else {
            panic!("expected script-tool payload");
        };
        assert_eq!(payload.script_body, "console.log('ts')\n");
    }

    #[test]
    fn load_from_dir_is_usable_without_roots() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("prompt/tools/formatter");
        write(&dir.join("tool.yaml"), "id: formatter\nruntime: node\n");
        write(&dir.join("script.js"), "console.log('fmt')\n");

        let resource =
            ScriptToolLoader::load_from_dir(&dir, "formatter", resource_core::SourceRoot::Primary)
                .unwrap();
        let Payload::ScriptTool(payload) = resource.payload else {
            panic!("expected script-tool payload");
        };
        assert_eq!(payload.script_body, "console.log('fmt')\n");
    }
}
