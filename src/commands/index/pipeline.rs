use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::ColumnStrategy;

use super::columns::{ColumnMapping, UnresolvedColumns, resolve_columns};
use super::document::{Document, build_document};
use super::hierarchy::HierarchyState;
use super::level::{AdminLevel, LevelMatch, LevelSource, classify_level, normalize_code};
use super::rows::{Row, RowBatch};
use super::upload::{DocumentSink, UploadError, UploadReceipt};

#[derive(Debug, Clone)]
pub(super) struct PipelineOptions {
    pub(super) column_strategy: ColumnStrategy,
    pub(super) batch_delay: Duration,
    pub(super) upload_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RowSkip {
    MissingCode,
    MissingName,
    BadCode,
    UnknownLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct SkipCounts {
    pub(super) missing_code: usize,
    pub(super) missing_name: usize,
    pub(super) bad_code: usize,
    pub(super) unknown_level: usize,
}

impl SkipCounts {
    fn record(&mut self, skip: RowSkip) {
        match skip {
            RowSkip::MissingCode => self.missing_code += 1,
            RowSkip::MissingName => self.missing_name += 1,
            RowSkip::BadCode => self.bad_code += 1,
            RowSkip::UnknownLevel => self.unknown_level += 1,
        }
    }

    fn absorb(&mut self, other: SkipCounts) {
        self.missing_code += other.missing_code;
        self.missing_name += other.missing_name;
        self.bad_code += other.bad_code;
        self.unknown_level += other.unknown_level;
    }

    pub(super) fn total(&self) -> usize {
        self.missing_code + self.missing_name + self.bad_code + self.unknown_level
    }
}

/// A row that survived normalization and level classification.
#[derive(Debug, Clone)]
pub(super) struct ClassifiedRow<'a> {
    pub(super) code: String,
    pub(super) name: String,
    pub(super) level: LevelMatch,
    pub(super) row: Row<'a>,
}

pub(super) fn classify_row<'a>(
    row: Row<'a>,
    mapping: &ColumnMapping,
) -> Result<ClassifiedRow<'a>, RowSkip> {
    let raw_code = row.at(mapping.code.index);
    if raw_code.is_empty() {
        return Err(RowSkip::MissingCode);
    }
    let name = row
        .at(mapping.name.index)
        .render()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or(RowSkip::MissingName)?;
    let code = normalize_code(raw_code).ok_or(RowSkip::BadCode)?;

    let marker = row.at(mapping.level.index).render().unwrap_or_default();
    let level = classify_level(&marker, &code, &name).ok_or(RowSkip::UnknownLevel)?;

    Ok(ClassifiedRow {
        code,
        name,
        level,
        row,
    })
}

#[derive(Debug, Clone)]
pub(super) struct BatchOutput {
    pub(super) documents: Vec<Document>,
    pub(super) state: HierarchyState,
    pub(super) hierarchy_updates: usize,
    pub(super) shape_classified: usize,
    pub(super) skips: SkipCounts,
}

/// Runs one batch through classification, the hierarchy state machine and
/// the document builder. The state goes in and comes back out advanced.
pub(super) fn process_batch(
    batch: &RowBatch,
    mapping: &ColumnMapping,
    mut state: HierarchyState,
) -> BatchOutput {
    let mut documents = Vec::new();
    let mut hierarchy_updates = 0usize;
    let mut shape_classified = 0usize;
    let mut skips = SkipCounts::default();

    for row in batch.rows() {
        let classified = match classify_row(row, mapping) {
            Ok(classified) => classified,
            Err(skip) => {
                skips.record(skip);
                continue;
            }
        };

        if classified.level.source == LevelSource::CodeShape {
            shape_classified += 1;
        }

        if state.advance(classified.level.level, &classified.name) {
            hierarchy_updates += 1;
            debug!(
                level = ?classified.level.level,
                city = classified.level.is_city,
                name = %classified.name,
                "hierarchy advanced"
            );
            continue;
        }

        let document =
            build_document(&classified.code, &classified.name, &state, classified.row);
        if !document.ancestors.has_any_ancestor() {
            warn!(code = %document.id, name = %document.name, "barangay without parent information");
        }
        documents.push(document);
    }

    BatchOutput {
        documents,
        state,
        hierarchy_updates,
        shape_classified,
        skips,
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct PipelineSummary {
    pub(super) batches_read: usize,
    pub(super) batches_unresolved: usize,
    pub(super) batches_uploaded: usize,
    pub(super) batches_failed: usize,
    pub(super) rows_read: usize,
    pub(super) rows_shape_classified: usize,
    pub(super) skips: SkipCounts,
    pub(super) documents_built: usize,
    pub(super) documents_uploaded: usize,
    pub(super) documents_complete_lineage: usize,
    pub(super) orphan_documents: usize,
    pub(super) state: HierarchyState,
    pub(super) warnings: Vec<String>,
}

/// Pulls batches in order, threads the hierarchy state across them and hands
/// each batch's documents to `sink`. Only reader errors abort the run.
pub(super) fn run_pipeline<I, S>(
    batches: I,
    sink: &S,
    options: &PipelineOptions,
) -> Result<PipelineSummary>
where
    I: IntoIterator<Item = Result<RowBatch>>,
    S: DocumentSink + ?Sized,
{
    let mut summary = PipelineSummary::default();
    let mut state = HierarchyState::default();
    let mut pinned: Option<ColumnMapping> = None;
    let mut uploaded_before = false;

    for batch in batches {
        let batch = batch?;
        summary.batches_read += 1;
        summary.rows_read += batch.len();
        let batch_number = summary.batches_read;

        let mapping = match select_columns(&batch, options.column_strategy, &mut pinned) {
            Ok(mapping) => mapping,
            Err(err) => {
                warn!(batch = batch_number, error = %err, "skipping batch with unresolvable columns");
                summary.batches_unresolved += 1;
                summary.warnings.push(format!("batch {batch_number}: {err}"));
                continue;
            }
        };
        debug!(
            batch = batch_number,
            code = %mapping.code.label,
            name = %mapping.name.label,
            level = %mapping.level.label,
            "using columns"
        );

        let output = process_batch(&batch, &mapping, state);
        state = output.state;
        let documents = output.documents;

        summary.skips.absorb(output.skips);
        summary.rows_shape_classified += output.shape_classified;
        summary.documents_built += documents.len();
        let complete = documents
            .iter()
            .filter(|document| document.has_complete_lineage())
            .count();
        let orphans = documents
            .iter()
            .filter(|document| !document.ancestors.has_any_ancestor())
            .count();
        summary.documents_complete_lineage += complete;
        summary.orphan_documents += orphans;

        info!(
            batch = batch_number,
            rows = batch.len(),
            hierarchy_updates = output.hierarchy_updates,
            skipped_rows = output.skips.total(),
            documents = documents.len(),
            complete_lineage = complete,
            "processed batch"
        );
        log_lineage_coverage(batch_number, &documents);

        if documents.is_empty() {
            info!(batch = batch_number, hierarchy = ?state, "no barangay documents in batch");
        } else {
            if uploaded_before && !options.batch_delay.is_zero() {
                thread::sleep(options.batch_delay);
            }
            uploaded_before = true;
        }

        match upload_with_retries(sink, &documents, options) {
            Ok(UploadReceipt::Accepted(response)) => {
                summary.batches_uploaded += 1;
                summary.documents_uploaded += documents.len();
                info!(batch = batch_number, response = %response, "upload accepted");
            }
            Ok(UploadReceipt::Skipped) => {}
            Err(err) => {
                summary.batches_failed += 1;
                warn!(batch = batch_number, documents = documents.len(), error = %err, "upload failed");
                summary.warnings.push(format!("batch {batch_number}: {err}"));
            }
        }

        debug!(batch = batch_number, hierarchy = ?state, "hierarchy carried forward");
    }

    summary.state = state;
    Ok(summary)
}

fn select_columns(
    batch: &RowBatch,
    strategy: ColumnStrategy,
    pinned: &mut Option<ColumnMapping>,
) -> Result<ColumnMapping, UnresolvedColumns> {
    match (strategy, pinned.as_ref()) {
        (ColumnStrategy::FirstBatch, Some(mapping)) => mapping.rebind(&batch.columns),
        (ColumnStrategy::FirstBatch, None) => {
            let mapping = resolve_columns(batch)?;
            info!(
                code = %mapping.code.label,
                name = %mapping.name.label,
                level = %mapping.level.label,
                "pinned column mapping"
            );
            *pinned = Some(mapping.clone());
            Ok(mapping)
        }
        (ColumnStrategy::PerBatch, _) => resolve_columns(batch),
    }
}

fn upload_with_retries<S>(
    sink: &S,
    documents: &[Document],
    options: &PipelineOptions,
) -> Result<UploadReceipt, UploadError>
where
    S: DocumentSink + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        match sink.upload(documents) {
            Err(err) if err.is_retryable() && attempt < options.upload_retries => {
                attempt += 1;
                warn!(attempt, error = %err, "retrying upload");
                if !options.batch_delay.is_zero() {
                    thread::sleep(options.batch_delay);
                }
            }
            result => return result,
        }
    }
}

fn log_lineage_coverage(batch_number: usize, documents: &[Document]) {
    if documents.is_empty() {
        return;
    }
    let with = |level: AdminLevel| {
        documents
            .iter()
            .filter(|document| document.ancestors.slot(level).is_some())
            .count()
    };
    debug!(
        batch = batch_number,
        documents = documents.len(),
        with_region = with(AdminLevel::Region),
        with_province = with(AdminLevel::Province),
        with_city_municipality = with(AdminLevel::CityOrMunicipality),
        with_submun = with(AdminLevel::SubMunicipality),
        "lineage coverage"
    );
}
