//! §4.10 step 7: compare the current registry + adapter output against a
//! client's saved manifest, reporting source drift, output drift, new
//! resources, and orphans.

use std::path::Path;
use std::sync::Arc;

use resource_core::Resource;
use similar::TextDiff;

use crate::adapter::{self, OutputFile};
use crate::client::ClientSpec;
use crate::config::SyncConfig;
use crate::ir::ResourceIr;
use crate::manifest::Manifest;
use crate::pipeline::ExportFilter;

/// A generated output file whose on-disk content no longer matches what
/// the adapter would currently produce.
#[derive(Debug, Clone)]
pub struct OutputDriftEntry {
    pub relative_path: String,
    pub unified_diff: String,
}

/// Full drift report for one client.
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    /// Qualified keys whose canonical source changed since last export.
    pub source_drift: Vec<String>,
    /// Generated files edited downstream since last export.
    pub output_drift: Vec<OutputDriftEntry>,
    /// Qualified keys selected now but absent from the manifest.
    pub new_resources: Vec<String>,
    /// Qualified keys in the manifest but no longer selected.
    pub orphans: Vec<String>,
}

impl DiffReport {
    pub fn is_clean(&self) -> bool {
        self.source_drift.is_empty()
            && self.output_drift.is_empty()
            && self.new_resources.is_empty()
            && self.orphans.is_empty()
    }
}

fn selected_irs(
    resources: &[Arc<Resource>],
    config: &SyncConfig,
    filter: &ExportFilter,
) -> Vec<(String, ResourceIr, String)> {
    resources
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
        .map(|r| (r.qualified_key(), ResourceIr::from_resource(r), output_dir_for(r, resources)))
        .collect()
}

/// Reproduces the disambiguation rule used at export time (§4.10 step 3)
/// so the diff stage re-derives the same `{relative_path}` an export would
/// have used, without re-running the full planner.
fn output_dir_for(resource: &Resource, all: &[Arc<Resource>]) -> String {
    let collides = all
        .iter()
        .filter(|r| r.resource_type() == resource.resource_type() && r.id == resource.id)
        .count()
        > 1;
    match (&resource.category, collides) {
        (Some(category), true) => format!("{category}/{}", resource.id),
        _ => resource.id.clone(),
    }
}

/// Compute the drift report for `client` against its saved manifest.
pub fn compute(
    resources: &[Arc<Resource>],
    config: &SyncConfig,
    filter: &ExportFilter,
    client: &ClientSpec,
    output_root: &Path,
    manifest_path: &Path,
) -> DiffReport {
    let manifest = Manifest::load(manifest_path);
    let adapter = adapter::for_client(client);
    let current = selected_irs(resources, config, filter);

    let mut report = DiffReport::default();
    let mut seen = std::collections::BTreeSet::new();

    for (qualified_key, ir, output_dir) in &current {
        seen.insert(qualified_key.clone());
        match manifest.get(qualified_key) {
            None => report.new_resources.push(qualified_key.clone()),
            Some(entry) if entry.source_hash != ir.source_hash => {
                report.source_drift.push(qualified_key.clone());
            }
            Some(_) => {
                let rendered: Vec<OutputFile> = adapter.adapt(ir, output_dir, client);
                for file in rendered {
                    let on_disk_path = output_root.join(&file.relative_path);
                    let on_disk = std::fs::read_to_string(&on_disk_path).unwrap_or_default();
                    if on_disk != file.content {
                        let diff = TextDiff::from_lines(&file.content, &on_disk)
                            .unified_diff()
                            .header(&file.relative_path, &file.relative_path)
                            .to_string();
                        report.output_drift.push(OutputDriftEntry {
                            relative_path: file.relative_path,
                            unified_diff: diff,
                        });
                    }
                }
            }
        }
    }

    for key in manifest.keys() {
        if !seen.contains(key) {
            report.orphans.push(key.clone());
        }
    }
    report.orphans.sort();

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AdapterFamily, Capabilities, Scope};
    use resource_core::{Payload, PromptPayload, RegisterPolicy, SourceRoot};
    use tempfile::TempDir;

    fn prompt(id: &str, category: &str, hash: &str) -> Arc<Resource> {
        Arc::new(Resource {
            id: id.to_string(),
            category: Some(category.to_string()),
            source_paths: Vec::new(),
            source_hash: hash.to_string(),
            payload: Payload::Prompt(PromptPayload {
                system_message: None,
                user_message: Some("Review the change".to_string()),
                arguments: Vec::new(),
                chain_steps: Vec::new(),
                gate_config: Default::default(),
                script_tool_ids: Vec::new(),
            }),
            enabled: true,
            register_with_protocol: RegisterPolicy::default(),
            source_root: SourceRoot::Primary,
        })
    }

    fn client() -> ClientSpec {
        ClientSpec {
            id: "claude-code".to_string(),
            family: AdapterFamily::ProtocolNative,
            variant: "default".to_string(),
            capabilities: Capabilities::default(),
            output_dir: Scope {
                user: "~/.claude/commands".into(),
                project: ".claude/commands".into(),
            },
        }
    }

    #[test]
    fn unmodified_export_reports_clean() {
        let dir = TempDir::new().unwrap();
        let resources = vec![prompt("review", "development", "hash-1")];
        let manifest_path = dir.path().join("manifest.json");
        let out = dir.path().join("out");

        crate::pipeline::export_client(
            &resources,
            &SyncConfig::default(),
            &ExportFilter::default(),
            &client(),
            &out,
            &manifest_path,
            false,
            "2026-07-28T00:00:00Z",
        )
        .unwrap();

        let report = compute(&resources, &SyncConfig::default(), &ExportFilter::default(), &client(), &out, &manifest_path);
        assert!(report.is_clean());
    }

    #[test]
    fn source_change_is_reported_as_source_drift() {
        let dir = TempDir::new().unwrap();
        let resources = vec![prompt("review", "development", "hash-1")];
        let manifest_path = dir.path().join("manifest.json");
        let out = dir.path().join("out");

        crate::pipeline::export_client(
            &resources,
            &SyncConfig::default(),
            &ExportFilter::default(),
            &client(),
            &out,
            &manifest_path,
            false,
            "2026-07-28T00:00:00Z",
        )
        .unwrap();

        let changed = vec![prompt("review", "development", "hash-2")];
        let report = compute(&changed, &SyncConfig::default(), &ExportFilter::default(), &client(), &out, &manifest_path);
        assert_eq!(report.source_drift, vec!["prompt:development/review".to_string()]);
    }

    #[test]
    fn hand_edited_output_is_reported_as_output_drift() {
        let dir = TempDir::new().unwrap();
        let resources = vec![prompt("review", "development", "hash-1")];
        let manifest_path = dir.path().join("manifest.json");
        let out = dir.path().join("out");

        crate::pipeline::export_client(
            &resources,
            &SyncConfig::default(),
            &ExportFilter::default(),
            &client(),
            &out,
            &manifest_path,
            false,
            "2026-07-28T00:00:00Z",
        )
        .unwrap();

        std::fs::write(out.join("review/SKILL.md"), "hand-edited content\n").unwrap();

        let report = compute(&resources, &SyncConfig::default(), &ExportFilter::default(), &client(), &out, &manifest_path);
        assert_eq!(report.output_drift.len(), 1);
        assert_eq!(report.output_drift[0].relative_path, "review/SKILL.md");
        assert!(report.output_drift[0].unified_diff.contains("hand-edited content"));
    }

    #[test]
    fn orphan_is_reported_when_manifest_entry_no_longer_selected() {
        let dir = TempDir::new().unwrap();
        let resources = vec![prompt("review", "development", "hash-1")];
        let manifest_path = dir.path().join("manifest.json");
        let out = dir.path().join("out");

        crate::pipeline::export_client(
            &resources,
            &SyncConfig::default(),
            &ExportFilter::default(),
            &client(),
            &out,
            &manifest_path,
            false,
            "2026-07-28T00:00:00Z",
        )
        .unwrap();

        let report = compute(&[], &SyncConfig::default(), &ExportFilter::default(), &client(), &out, &manifest_path);
        assert_eq!(report.orphans, vec!["prompt:development/review".to_string()]);
    }
}
