use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use resource_loaders::LoaderConfig;

use crate::client::ClientRegistry;
use crate::config::SyncConfig;
use crate::manifest::manifest_path;
use crate::output::print_pull_report;
use crate::pipeline::ExportFilter;
use crate::pull::{patch_paths, pull};
use crate::resources;

use super::export_clients;

/// `skills-sync pull`: write patch + summary artifacts capturing local
/// downstream edits the user would need to accept or reject.
#[derive(Args)]
pub struct PullArgs {
    #[arg(long)]
    pub client: Option<String>,

    #[arg(long, default_value = "project")]
    pub scope: String,

    /// Cache directory patches are written under (`{output}/patches/`).
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    #[arg(long, default_value = "cache")]
    pub cache_dir: PathBuf,

    #[arg(long, default_value = "skills-sync.yaml")]
    pub config: PathBuf,
}

pub async fn run(args: PullArgs) -> Result<i32> {
    let registry = ClientRegistry::builtin();
    let clients = export_clients(&registry, args.client.as_deref())?;
    let sync_config = SyncConfig::load(&args.config).context("loading sync configuration")?;
    let loader_config = LoaderConfig::new(&args.workspace);
    let resources = resources::load_all(&loader_config);
    let cache_dir = args.output.clone().unwrap_or_else(|| args.cache_dir.clone());
    let filter = ExportFilter::default();

    for client in clients {
        let output_root = sync_config
            .output_dir_override(&client.id, &args.scope)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(client.output_root(&args.scope)));
        let manifest = manifest_path(&args.cache_dir, &client.id);

        pull(&resources, &sync_config, &filter, client, &output_root, &manifest, &cache_dir)
            .with_context(|| format!("pulling drift for client {}", client.id))?;

        let (patch_path, summary_path) = patch_paths(&cache_dir, &client.id);
        print_pull_report(&client.id, &patch_path, &summary_path);
    }

    Ok(0)
}
