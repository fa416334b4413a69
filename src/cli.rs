use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "psgc-index",
    version,
    about = "Rebuild barangay lineage from PSGC sheets and push it to a search index"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Index(IndexArgs),
    Sheets(SheetsArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Spreadsheet (xls/xlsx/xlsm/xlsb/ods) or delimited (tsv/txt/csv) source.
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    #[arg(long = "batch", short = 'b', default_value_t = 200)]
    pub batch_size: usize,

    /// Search host, without scheme.
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long, default_value = "barangays")]
    pub index: String,

    #[arg(long, env = "SEARCH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub sheet: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_sheets: bool,

    #[arg(long, value_enum, default_value_t = ColumnStrategy::FirstBatch)]
    pub column_strategy: ColumnStrategy,

    #[arg(long, default_value_t = 1000)]
    pub batch_delay_ms: u64,

    #[arg(long, default_value_t = 30)]
    pub upload_timeout_secs: u64,

    #[arg(long, default_value_t = 0)]
    pub upload_retries: u32,

    /// Accept invalid TLS certificates from the search host.
    #[arg(long, default_value_t = false)]
    pub insecure: bool,

    #[arg(long, default_value = ".cache/psgc-index")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ColumnStrategy {
    /// Resolve once and pin the mapping by column label.
    FirstBatch,
    /// Resolve every batch from its own labels and samples.
    PerBatch,
}

impl ColumnStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstBatch => "first-batch",
            Self::PerBatch => "per-batch",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SheetsArgs {
    #[arg(long, short = 'f')]
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/psgc-index")]
    pub cache_root: PathBuf,
}
