use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::SheetsArgs;
use crate::commands::index::list_sheets;

pub fn run(args: SheetsArgs) -> Result<()> {
    print_sheets(&args.file)
}

/// Prints the numbered sheet list to stdout, one per line.
pub fn print_sheets(path: &Path) -> Result<()> {
    let sheets = list_sheets(path)?;
    if sheets.is_empty() {
        warn!(file = %path.display(), "file is not a spreadsheet, no sheets to list");
        return Ok(());
    }

    info!(file = %path.display(), sheets = sheets.len(), "available sheets");
    println!("Available sheets in {}:", path.display());
    for (idx, sheet) in sheets.iter().enumerate() {
        println!("  {}. {sheet}", idx + 1);
    }
    Ok(())
}
