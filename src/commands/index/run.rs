use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::info;

use crate::cli::{ColumnStrategy, IndexArgs};
use crate::commands::sheets;
use crate::model::{IndexCounts, IndexRunManifest, IndexSettings, SourceFileEntry};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

use super::pipeline::{PipelineOptions, PipelineSummary, run_pipeline};
use super::source::{SourceFormat, open_batches};
use super::upload::{DocumentSink, DryRunSink, SearchIndexClient, SearchIndexConfig};

pub fn run(args: IndexArgs) -> Result<()> {
    if args.list_sheets {
        return sheets::print_sheets(&args.file);
    }

    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("index-{}", utc_compact_string(started_ts));
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.cache_root.join("manifests").join(format!(
            "index_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });

    let mut source = open_batches(&args.file, args.batch_size, args.sheet.as_deref())?;
    let format = SourceFormat::detect(&args.file)?;
    let source_entry = SourceFileEntry {
        path: args.file.display().to_string(),
        format: format.as_str().to_string(),
        sheet: source.sheet().map(str::to_string),
        sha256: sha256_file(&args.file)?,
    };

    let sink: Box<dyn DocumentSink> = if args.dry_run {
        Box::new(DryRunSink)
    } else {
        Box::new(SearchIndexClient::new(&search_index_config(&args)?)?)
    };
    let options = PipelineOptions {
        column_strategy: args.column_strategy,
        batch_delay: if args.dry_run {
            Duration::ZERO
        } else {
            Duration::from_millis(args.batch_delay_ms)
        },
        upload_retries: args.upload_retries,
    };

    info!(
        run_id = %run_id,
        file = %args.file.display(),
        format = format.as_str(),
        columns = ?source.columns(),
        batch_size = args.batch_size.max(1),
        dry_run = args.dry_run,
        "starting index run"
    );

    let summary = run_pipeline(&mut source, sink.as_ref(), &options)?;
    let counts = index_counts(&summary, source.skipped_records());

    let mut notes = Vec::new();
    if args.dry_run {
        notes.push("Dry run: documents were built but not uploaded.".to_string());
    }
    if args.column_strategy == ColumnStrategy::PerBatch {
        notes.push("Columns were resolved independently for every batch.".to_string());
    }

    let manifest = IndexRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_index_command(&args),
        source: source_entry,
        settings: IndexSettings {
            batch_size: args.batch_size.max(1),
            host: args.host.clone(),
            index: args.index.clone(),
            dry_run: args.dry_run,
            column_strategy: args.column_strategy.as_str().to_string(),
            batch_delay_ms: args.batch_delay_ms,
            upload_timeout_secs: args.upload_timeout_secs,
            upload_retries: args.upload_retries,
        },
        counts,
        final_hierarchy: summary.state.clone(),
        warnings: summary.warnings.clone(),
        notes,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote index run manifest");
    info!(
        run_id = %run_id,
        batches = summary.batches_read,
        documents = summary.documents_built,
        uploaded = summary.documents_uploaded,
        failed_batches = summary.batches_failed,
        "completed processing"
    );

    Ok(())
}

fn search_index_config(args: &IndexArgs) -> Result<SearchIndexConfig> {
    let Some(host) = args.host.clone().filter(|host| !host.trim().is_empty()) else {
        bail!("--host is required unless --dry-run is set");
    };
    let api_key = args
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .context("--api-key (or SEARCH_API_KEY) is required unless --dry-run is set")?;

    Ok(SearchIndexConfig {
        host,
        index: args.index.clone(),
        api_key,
        timeout: Duration::from_secs(args.upload_timeout_secs.max(1)),
        accept_invalid_certs: args.insecure,
    })
}

pub(super) fn index_counts(summary: &PipelineSummary, records_undecodable: usize) -> IndexCounts {
    IndexCounts {
        batches_read: summary.batches_read,
        batches_unresolved: summary.batches_unresolved,
        batches_uploaded: summary.batches_uploaded,
        batches_failed: summary.batches_failed,
        rows_read: summary.rows_read,
        rows_classified_by_code: summary.rows_shape_classified,
        records_undecodable,
        rows_missing_code: summary.skips.missing_code,
        rows_missing_name: summary.skips.missing_name,
        rows_bad_code: summary.skips.bad_code,
        rows_unknown_level: summary.skips.unknown_level,
        documents_built: summary.documents_built,
        documents_uploaded: summary.documents_uploaded,
        documents_complete_lineage: summary.documents_complete_lineage,
        orphan_documents: summary.orphan_documents,
    }
}

/// Command line for the manifest. The api key is never echoed.
pub(super) fn render_index_command(args: &IndexArgs) -> String {
    let mut command = vec![
        "psgc-index".to_string(),
        "index".to_string(),
        "--file".to_string(),
        args.file.display().to_string(),
        "--batch".to_string(),
        args.batch_size.to_string(),
        "--index".to_string(),
        args.index.clone(),
    ];

    if let Some(host) = &args.host {
        command.push("--host".to_string());
        command.push(host.clone());
    }
    if let Some(sheet) = &args.sheet {
        command.push("--sheet".to_string());
        command.push(sheet.clone());
    }
    if args.dry_run {
        command.push("--dry-run".to_string());
    }
    if args.column_strategy != ColumnStrategy::FirstBatch {
        command.push("--column-strategy".to_string());
        command.push(args.column_strategy.as_str().to_string());
    }
    if args.upload_retries > 0 {
        command.push("--upload-retries".to_string());
        command.push(args.upload_retries.to_string());
    }
    if args.insecure {
        command.push("--insecure".to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}
