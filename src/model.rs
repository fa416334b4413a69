use serde::{Deserialize, Serialize};

use crate::commands::index::HierarchyState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFileEntry {
    pub path: String,
    pub format: String,
    pub sheet: Option<String>,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    pub batch_size: usize,
    pub host: Option<String>,
    pub index: String,
    pub dry_run: bool,
    pub column_strategy: String,
    pub batch_delay_ms: u64,
    pub upload_timeout_secs: u64,
    pub upload_retries: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexCounts {
    pub batches_read: usize,
    pub batches_unresolved: usize,
    pub batches_uploaded: usize,
    pub batches_failed: usize,
    pub rows_read: usize,
    pub rows_classified_by_code: usize,
    pub records_undecodable: usize,
    pub rows_missing_code: usize,
    pub rows_missing_name: usize,
    pub rows_bad_code: usize,
    pub rows_unknown_level: usize,
    pub documents_built: usize,
    pub documents_uploaded: usize,
    pub documents_complete_lineage: usize,
    pub orphan_documents: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub source: SourceFileEntry,
    pub settings: IndexSettings,
    pub counts: IndexCounts,
    pub final_hierarchy: HierarchyState,
    pub warnings: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}
