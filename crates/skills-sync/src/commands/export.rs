use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use resource_loaders::LoaderConfig;

use crate::client::ClientRegistry;
use crate::config::SyncConfig;
use crate::manifest::manifest_path;
use crate::output::print_export_report;
use crate::pipeline::{self, ExportFilter};
use crate::resources;

use super::export_clients;

/// `skills-sync export`: render canonical resources into one or more
/// clients' native skill format and rewrite their manifests.
#[derive(Args)]
pub struct ExportArgs {
    /// Client id to export, or omit together with `--client all` to export
    /// every registered client.
    #[arg(long)]
    pub client: Option<String>,

    /// `user` or `project` output scope.
    #[arg(long, default_value = "project")]
    pub scope: String,

    /// Only export resources of this type (`prompt`, `gate`, `methodology`,
    /// `style`, `script-tool`).
    #[arg(long = "resource-type")]
    pub resource_type: Option<String>,

    /// Only export the resource with this id.
    #[arg(long)]
    pub id: Option<String>,

    /// Log intended writes without touching disk or the manifest.
    #[arg(long)]
    pub dry_run: bool,

    /// Reserved for forcing an export despite a concurrent-compilation
    /// guard (§5: "the CLI detects and refuses"); accepted for CLI surface
    /// parity, not yet enforced.
    #[arg(long)]
    pub force: bool,

    /// Workspace root the path resolver walks up from.
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Directory sync-compiler state (manifests, cache) lives under.
    #[arg(long, default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Sync configuration file (allow-list + output overrides).
    #[arg(long, default_value = "skills-sync.yaml")]
    pub config: PathBuf,
}

pub async fn run(args: ExportArgs) -> Result<i32> {
    let _ = args.force;
    let registry = ClientRegistry::builtin();
    let clients = export_clients(&registry, args.client.as_deref())?;
    let resource_type = parse_resource_type(args.resource_type.as_deref())?;
    let sync_config = SyncConfig::load(&args.config).context("loading sync configuration")?;
    let loader_config = LoaderConfig::new(&args.workspace);
    let resources = resources::load_all(&loader_config);
    let exported_at = chrono::Utc::now().to_rfc3339();

    let filter = ExportFilter {
        resource_type,
        id: args.id.clone(),
    };

    for client in clients {
        let output_root = sync_config
            .output_dir_override(&client.id, &args.scope)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(client.output_root(&args.scope)));
        let manifest = manifest_path(&args.cache_dir, &client.id);

        let report = pipeline::export_client(
            &resources,
            &sync_config,
            &filter,
            client,
            &output_root,
            &manifest,
            args.dry_run,
            &exported_at,
        )
        .with_context(|| format!("exporting client {}", client.id))?;

        print_export_report(&report);
    }

    Ok(0)
}

pub(crate) fn parse_resource_type(tag: Option<&str>) -> Result<Option<resource_core::ResourceType>> {
    use resource_core::ResourceType::*;
    let Some(tag) = tag else { return Ok(None) };
    Ok(Some(match tag {
        "prompt" => Prompt,
        "gate" => Gate,
        "methodology" => Methodology,
        "style" => Style,
        "script-tool" => ScriptTool,
        other => bail!("unknown resource type {other:?}"),
    }))
}
