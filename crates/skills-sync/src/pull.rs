//! §4.10 step 8: turn a [`DiffReport`] into the patch artifacts a user
//! reviews to accept or reject local downstream edits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use resource_core::Resource;

use crate::client::ClientSpec;
use crate::config::SyncConfig;
use crate::diff::{self, DiffReport};
use crate::pipeline::ExportFilter;

/// Where `pull` writes its two output files for `client_id`, under
/// `cache/patches/`.
pub fn patch_paths(cache_dir: &Path, client_id: &str) -> (PathBuf, PathBuf) {
    let patches_dir = cache_dir.join("patches");
    (
        patches_dir.join(format!("{client_id}.patch")),
        patches_dir.join(format!("{client_id}-summary.md")),
    )
}

/// Compute the drift for `client` and write its patch + summary files.
/// Returns the underlying [`DiffReport`] so callers can also print a CLI
/// summary without recomputing the diff.
pub fn pull(
    resources: &[Arc<Resource>],
    config: &SyncConfig,
    filter: &ExportFilter,
    client: &ClientSpec,
    output_root: &Path,
    manifest_path: &Path,
    cache_dir: &Path,
) -> std::io::Result<DiffReport> {
    let report = diff::compute(resources, config, filter, client, output_root, manifest_path);
    let (patch_path, summary_path) = patch_paths(cache_dir, &client.id);

    if let Some(parent) = patch_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&patch_path, render_patch(&report))?;
    std::fs::write(&summary_path, render_summary(client, &report))?;

    Ok(report)
}

fn render_patch(report: &DiffReport) -> String {
    report
        .output_drift
        .iter()
        .map(|entry| entry.unified_diff.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_summary(client: &ClientSpec, report: &DiffReport) -> String {
    let mut lines = vec![format!("# Pull summary: {}", client.id), String::new()];

    if report.is_clean() {
        lines.push("No drift detected.".to_string());
        return lines.join("\n");
    }

    for key in &report.source_drift {
        lines.push(format!("- SOURCE DRIFT: {key}"));
    }
    for entry in &report.output_drift {
        lines.push(format!("- OUTPUT DRIFT: {}", entry.relative_path));
    }
    for key in &report.new_resources {
        lines.push(format!("- NEW: {key}"));
    }
    for key in &report.orphans {
        lines.push(format!("- ORPHAN: {key}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AdapterFamily, Capabilities, Scope};
    use resource_core::{Payload, PromptPayload, RegisterPolicy, SourceRoot};
    use tempfile::TempDir;

    fn prompt(id: &str, category: &str) -> Arc<Resource> {
        Arc::new(Resource {
            id: id.to_string(),
            category: Some(category.to_string()),
            source_paths: Vec::new(),
            source_hash: "hash-1".to_string(),
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
    fn pull_writes_patch_and_summary_capturing_hand_edit() {
        let dir = TempDir::new().unwrap();
        let resources = vec![prompt("review", "development")];
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

        std::fs::write(out.join("review/SKILL.md"), "hand-edited\n").unwrap();

        let cache_dir = dir.path().join("cache");
        let report = pull(
            &resources,
            &SyncConfig::default(),
            &ExportFilter::default(),
            &client(),
            &out,
            &manifest_path,
            &cache_dir,
        )
        .unwrap();

        assert_eq!(report.output_drift.len(), 1);
        let (patch_path, summary_path) = patch_paths(&cache_dir, "claude-code");
        assert!(patch_path.exists());
        assert!(summary_path.exists());
        assert!(std::fs::read_to_string(&summary_path)
            .unwrap()
            .contains("OUTPUT DRIFT: review/SKILL.md"));
    }

    #[test]
    fn clean_pull_writes_no_drift_summary() {
        let dir = TempDir::new().unwrap();
        let resources = vec![prompt("review", "development")];
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

        let cache_dir = dir.path().join("cache");
        let report = pull(
            &resources,
            &SyncConfig::default(),
            &ExportFilter::default(),
            &client(),
            &out,
            &manifest_path,
            &cache_dir,
        )
        .unwrap();

        assert!(report.is_clean());
        let (_, summary_path) = patch_paths(&cache_dir, "claude-code");
        assert!(std::fs::read_to_string(&summary_path).unwrap().contains("No drift"));
    }
}
