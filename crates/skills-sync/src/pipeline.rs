//! §4.10 steps 2-6: filter, duplicate-disambiguate, adapt, write, and
//! record a manifest for one client's export. Step 1 (load the sync
//! config + client registry) and steps 7-8 (diff, pull) live in
//! [`crate::config`]/[`crate::client`] and [`crate::diff`]/[`crate::pull`]
//! respectively; this module is the part of the pipeline that actually
//! produces bytes on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use resource_core::{Resource, ResourceType};

use crate::adapter::{self, OutputFile};
use crate::client::ClientSpec;
use crate::config::SyncConfig;
use crate::ir::ResourceIr;
use crate::manifest::{Manifest, ManifestEntry};

/// Optional narrowing applied on top of the sync config's allow-list.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub resource_type: Option<ResourceType>,
    pub id: Option<String>,
}

/// One resource's resolved output directory (post-disambiguation) paired
/// with its reduced IR, ready to adapt.
struct Planned {
    qualified_key: String,
    output_dir: String,
    ir: ResourceIr,
    source_hash: String,
}

/// Applies the sync config's allow-list, the CLI's `--resource-type`/`--id`
/// filters, and then the duplicate-disambiguate rule (§4.10 step 3):
/// resources sharing a `(type, id)` pair are placed under
/// `{category}/{id}` instead of the bare `{id}`.
fn plan(resources: &[Arc<Resource>], config: &SyncConfig, filter: &ExportFilter) -> Vec<Planned> {
    let selected: Vec<&Arc<Resource>> = resources
        .iter()
        .filter(|r| r.enabled)
        .filter(|r| config.exports.allows(&r.qualified_key()))
        .filter(|r| match filter.resource_type {
            Some(t) => r.resource_type() == t,
            None => true,
        })
        .filter(|r| match filter.id.as_deref() {
            Some(id) => r.id == id,
            None => true,
        })
        .collect();

    let mut collisions: BTreeMap<(ResourceType, String), usize> = BTreeMap::new();
    for resource in &selected {
        *collisions
            .entry((resource.resource_type(), resource.id.clone()))
            .or_insert(0) += 1;
    }

    let mut planned: Vec<Planned> = selected
        .into_iter()
        .map(|resource| {
            let key = (resource.resource_type(), resource.id.clone());
            let collides = collisions.get(&key).copied().unwrap_or(0) > 1;
            let output_dir = match (&resource.category, collides) {
                (Some(category), true) => format!("{category}/{}", resource.id),
                _ => resource.id.clone(),
            };
            Planned {
                qualified_key: resource.qualified_key(),
                output_dir,
                ir: ResourceIr::from_resource(resource),
                source_hash: resource.source_hash.clone(),
            }
        })
        .collect();

    planned.sort_by(|a, b| a.qualified_key.cmp(&b.qualified_key));
    planned
}

/// One file actually written (or, in dry-run mode, that would have been
/// written), with its path relative to `client.output_root(scope)`.
#[derive(Debug, Clone)]
pub struct WrittenFile {
    pub relative_path: String,
    pub content: String,
}

/// Outcome of exporting one client.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub client_id: String,
    pub dry_run: bool,
    pub files: Vec<WrittenFile>,
    pub exported_keys: Vec<String>,
}

/// Run steps 2-6 of the pipeline for one client: filter, disambiguate,
/// adapt every selected resource, write the files (unless `dry_run`), and
/// — on a successful non-dry-run pass — rewrite that client's manifest.
#[allow(clippy::too_many_arguments)]
pub fn export_client(
    resources: &[Arc<Resource>],
    config: &SyncConfig,
    filter: &ExportFilter,
    client: &ClientSpec,
    output_root: &Path,
    manifest_path: &Path,
    dry_run: bool,
    exported_at: &str,
) -> std::io::Result<ExportReport> {
    let planned = plan(resources, config, filter);
    let adapter = adapter::for_client(client);

    let mut files = Vec::new();
    let mut manifest_entries: BTreeMap<String, ManifestEntry> = BTreeMap::new();
    let mut exported_keys = Vec::new();

    for item in &planned {
        let rendered: Vec<OutputFile> = adapter.adapt(&item.ir, &item.output_dir, client);
        let output_hash = adapter::output_hash(&rendered);
        let output_paths: Vec<String> = rendered.iter().map(|f| f.relative_path.clone()).collect();

        manifest_entries.insert(
            item.qualified_key.clone(),
            ManifestEntry {
                resource_id: item.ir.id.clone(),
                resource_type: item.ir.resource_type,
                source_hash: item.source_hash.clone(),
                output_hash,
                output_paths,
                exported_at: exported_at.to_string(),
            },
        );
        exported_keys.push(item.qualified_key.clone());

        for file in rendered {
            files.push(WrittenFile {
                relative_path: file.relative_path,
                content: file.content,
            });
        }
    }

    if dry_run {
        for file in &files {
            tracing::info!(path = %output_root.join(&file.relative_path).display(), "dry-run: would write");
        }
        return Ok(ExportReport {
            client_id: client.id.clone(),
            dry_run,
            files,
            exported_keys,
        });
    }

    for file in &files {
        let path: PathBuf = output_root.join(&file.relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &file.content)?;
        tracing::info!(path = %path.display(), "wrote export output");
    }

    let mut manifest = Manifest::default();
    manifest.replace_all(manifest_entries);
    manifest
        .save(manifest_path)
        .map_err(|err| std::io::Error::other(err.to_string()))?;

    Ok(ExportReport {
        client_id: client.id.clone(),
        dry_run,
        files,
        exported_keys,
    })
}
