use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use resource_loaders::LoaderConfig;

use crate::client::ClientRegistry;
use crate::config::SyncConfig;
use crate::diff;
use crate::manifest::manifest_path;
use crate::output::print_diff_report;
use crate::pipeline::ExportFilter;
use crate::resources;

use super::export::parse_resource_type;

/// `skills-sync diff`: compare current registry + adapter output against
/// each client's saved manifest. Exit code 2 when any client has drift.
#[derive(Args)]
pub struct DiffArgs {
    #[arg(long)]
    pub client: Option<String>,

    #[arg(long = "resource-type")]
    pub resource_type: Option<String>,

    #[arg(long, default_value = "project")]
    pub scope: String,

    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    #[arg(long, default_value = "cache")]
    pub cache_dir: PathBuf,

    #[arg(long, default_value = "skills-sync.yaml")]
    pub config: PathBuf,
}

pub async fn run(args: DiffArgs) -> Result<i32> {
    let registry = ClientRegistry::builtin();
    let clients = super::export_clients(&registry, args.client.as_deref())?;
    let resource_type = parse_resource_type(args.resource_type.as_deref())?;
    let sync_config = SyncConfig::load(&args.config).context("loading sync configuration")?;
    let loader_config = LoaderConfig::new(&args.workspace);
    let resources = resources::load_all(&loader_config);
    let filter = ExportFilter {
        resource_type,
        id: None,
    };

    let mut any_drift = false;
    for client in clients {
        let output_root = sync_config
            .output_dir_override(&client.id, &args.scope)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(client.output_root(&args.scope)));
        let manifest = manifest_path(&args.cache_dir, &client.id);

        let report = diff::compute(&resources, &sync_config, &filter, client, &output_root, &manifest);
        any_drift = any_drift || !report.is_clean();
        print_diff_report(&client.id, &report);
    }

    Ok(if any_drift { 2 } else { 0 })
}
