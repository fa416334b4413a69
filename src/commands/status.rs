use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::IndexRunManifest;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");

    info!(cache_root = %args.cache_root.display(), "status requested");

    let Some(path) = latest_index_manifest(&manifest_dir)? else {
        warn!(path = %manifest_dir.display(), "no index run manifest found");
        return Ok(());
    };

    let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: IndexRunManifest = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    info!(
        path = %path.display(),
        run_id = %manifest.run_id,
        status = %manifest.status,
        started_at = %manifest.started_at,
        updated_at = %manifest.updated_at,
        source = %manifest.source.path,
        sheet = %manifest.source.sheet.as_deref().unwrap_or_default(),
        sha256 = %manifest.source.sha256,
        dry_run = manifest.settings.dry_run,
        index = %manifest.settings.index,
        "loaded index run manifest"
    );
    info!(
        batches = manifest.counts.batches_read,
        unresolved_batches = manifest.counts.batches_unresolved,
        failed_batches = manifest.counts.batches_failed,
        rows = manifest.counts.rows_read,
        documents = manifest.counts.documents_built,
        uploaded = manifest.counts.documents_uploaded,
        complete_lineage = manifest.counts.documents_complete_lineage,
        orphans = manifest.counts.orphan_documents,
        "index run counts"
    );
    for warning in &manifest.warnings {
        warn!(warning = %warning, "recorded run warning");
    }

    Ok(())
}

/// Manifest names embed a compact UTC timestamp, so the greatest name is
/// the newest run.
fn latest_index_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to list {}", manifest_dir.display()))?
    {
        let path = entry?.path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("index_run_") && name.ends_with(".json"));
        if is_run_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
