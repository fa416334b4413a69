use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use thiserror::Error;
use tracing::{info, warn};

use super::rows::{CellValue, RowBatch};

#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("file {} does not exist", .0.display())]
    MissingFile(PathBuf),
    #[error("unsupported file format: {extension:?}")]
    UnsupportedFormat { extension: String },
    #[error("sheet '{sheet}' not found. Available sheets: {}", .available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceFormat {
    Spreadsheet,
    Delimited { delimiter: u8 },
}

impl SourceFormat {
    pub(crate) fn detect(path: &Path) -> Result<Self, SourceError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            "tsv" | "txt" => Ok(Self::Delimited { delimiter: b'\t' }),
            "csv" => Ok(Self::Delimited { delimiter: b',' }),
            _ => Err(SourceError::UnsupportedFormat { extension }),
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
            Self::Delimited { delimiter: b'\t' } => "tsv",
            Self::Delimited { .. } => "csv",
        }
    }
}

/// Lazily yields header-sharing batches of at most `batch_size` rows.
pub(super) struct BatchSource {
    columns: Vec<String>,
    batch_size: usize,
    sheet: Option<String>,
    rows: RowFeed,
    skipped_records: usize,
}

enum RowFeed {
    Sheet(std::vec::IntoIter<Vec<CellValue>>),
    Delimited(csv::StringRecordsIntoIter<File>),
}

pub(super) fn open_batches(
    path: &Path,
    batch_size: usize,
    sheet: Option<&str>,
) -> Result<BatchSource> {
    if !path.exists() {
        return Err(SourceError::MissingFile(path.to_path_buf()).into());
    }
    let batch_size = batch_size.max(1);

    match SourceFormat::detect(path)? {
        SourceFormat::Spreadsheet => open_sheet(path, batch_size, sheet),
        SourceFormat::Delimited { delimiter } => {
            if let Some(sheet) = sheet {
                warn!(sheet = %sheet, "sheet selector ignored for delimited input");
            }
            open_delimited(path, batch_size, delimiter)
        }
    }
}

/// Sheet names of a spreadsheet in workbook order; empty for delimited input.
pub(crate) fn list_sheets(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(SourceError::MissingFile(path.to_path_buf()).into());
    }
    match SourceFormat::detect(path)? {
        SourceFormat::Spreadsheet => {
            let workbook = open_workbook_auto(path)
                .with_context(|| format!("failed to open workbook {}", path.display()))?;
            Ok(workbook.sheet_names())
        }
        SourceFormat::Delimited { .. } => Ok(Vec::new()),
    }
}

fn open_sheet(path: &Path, batch_size: usize, sheet: Option<&str>) -> Result<BatchSource> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;
    let sheet_name = select_sheet(workbook.sheet_names(), sheet)
        .with_context(|| format!("failed to choose a sheet in {}", path.display()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("failed to read sheet '{sheet_name}'"))?;

    Ok(sheet_source(sheet_name, &range, batch_size))
}

/// The requested sheet, or the first one in workbook order.
fn select_sheet(available: Vec<String>, requested: Option<&str>) -> Result<String> {
    match requested {
        Some(requested) if available.iter().any(|name| name == requested) => {
            Ok(requested.to_string())
        }
        Some(requested) => Err(SourceError::SheetNotFound {
            sheet: requested.to_string(),
            available,
        }
        .into()),
        None => available.into_iter().next().context("workbook has no sheets"),
    }
}

fn sheet_source(sheet_name: String, range: &Range<Data>, batch_size: usize) -> BatchSource {
    let mut sheet_rows = range.rows();
    let columns = sheet_rows
        .next()
        .map(|header| label_columns(header.iter().map(|cell| cell.to_string())))
        .unwrap_or_default();
    let records = sheet_rows
        .map(|cells| cells.iter().map(cell_from_sheet).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    info!(
        sheet = %sheet_name,
        rows = records.len(),
        columns = columns.len(),
        "loaded spreadsheet"
    );

    BatchSource {
        columns,
        batch_size,
        sheet: Some(sheet_name),
        rows: RowFeed::Sheet(records.into_iter()),
        skipped_records: 0,
    }
}

fn open_delimited(path: &Path, batch_size: usize, delimiter: u8) -> Result<BatchSource> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let columns = label_columns(
        reader
            .headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?
            .iter()
            .map(str::to_string),
    );

    info!(path = %path.display(), columns = columns.len(), "streaming delimited file");

    Ok(BatchSource {
        columns,
        batch_size,
        sheet: None,
        rows: RowFeed::Delimited(reader.into_records()),
        skipped_records: 0,
    })
}

fn label_columns(labels: impl Iterator<Item = String>) -> Vec<String> {
    labels
        .enumerate()
        .map(|(idx, label)| {
            let label = label.trim();
            if label.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                label.to_string()
            }
        })
        .collect()
}

fn cell_from_sheet(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(value) => CellValue::Int(*value),
        Data::Float(value) => CellValue::Float(*value),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::String(value) => CellValue::text(value.trim()),
        other => CellValue::text(other.to_string()),
    }
}

impl BatchSource {
    pub(super) fn columns(&self) -> &[String] {
        &self.columns
    }

    pub(super) fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    /// Delimited records dropped because they could not be decoded.
    pub(super) fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    fn next_records(&mut self) -> Result<Vec<Vec<CellValue>>> {
        let mut records = Vec::with_capacity(self.batch_size);
        match &mut self.rows {
            RowFeed::Sheet(rows) => records.extend(rows.by_ref().take(self.batch_size)),
            RowFeed::Delimited(rows) => {
                while records.len() < self.batch_size {
                    let Some(next) = rows.next() else {
                        break;
                    };
                    match next {
                        Ok(record) => records.push(record.iter().map(CellValue::infer).collect()),
                        Err(err) if err.is_io_error() => {
                            return Err(err).context("failed to read delimited record");
                        }
                        Err(err) => {
                            self.skipped_records += 1;
                            warn!(error = %err, "skipping undecodable record");
                        }
                    }
                }
            }
        }
        Ok(records)
    }
}

impl Iterator for BatchSource {
    type Item = Result<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_records() {
            Ok(records) if records.is_empty() => None,
            Ok(records) => Some(Ok(RowBatch::new(self.columns.clone(), records))),
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use calamine::CellErrorType;

    use super::*;

    fn write_source(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file should be created");
        file.write_all(body.as_bytes())
            .expect("temp file should be writable");
        file
    }

    #[test]
    fn detect_maps_extensions_case_insensitively() {
        assert_eq!(
            SourceFormat::detect(Path::new("psgc.XLSX")).expect("xlsx is supported"),
            SourceFormat::Spreadsheet
        );
        assert_eq!(
            SourceFormat::detect(Path::new("psgc.tsv")).expect("tsv is supported"),
            SourceFormat::Delimited { delimiter: b'\t' }
        );
        assert!(matches!(
            SourceFormat::detect(Path::new("psgc.json")),
            Err(SourceError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn open_batches_reports_missing_file() {
        let err = open_batches(Path::new("/nonexistent/psgc.tsv"), 10, None)
            .err()
            .expect("missing file should fail");
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::MissingFile(_))
        ));
    }

    #[test]
    fn delimited_source_streams_fixed_size_batches() {
        let file = write_source(
            ".tsv",
            "10-digit PSGC\tName\t\tGeographic Level\n\
             0100000000\tRegion I\t\tReg\n\
             0102800000\tIlocos Norte\t\tProv\n\
             0102805000\tLaoag City\t\tCity\n",
        );

        let mut source = open_batches(file.path(), 2, None).expect("tsv should open");
        assert_eq!(
            source.columns(),
            ["10-digit PSGC", "Name", "column_3", "Geographic Level"]
        );

        let first = source
            .next()
            .expect("first batch")
            .expect("first batch reads");
        assert_eq!(first.len(), 2);
        assert_eq!(first.records[0][0], CellValue::Int(100000000));
        assert_eq!(first.records[0][1], CellValue::Text("Region I".to_string()));
        assert_eq!(first.records[0][2], CellValue::Empty);

        let second = source
            .next()
            .expect("second batch")
            .expect("second batch reads");
        assert_eq!(second.len(), 1);
        assert!(source.next().is_none());
    }

    #[test]
    fn delimited_source_has_no_sheets() {
        let file = write_source(".csv", "code,name\n1,A\n");
        let sheets = list_sheets(file.path()).expect("csv should be listable");
        assert!(sheets.is_empty());
    }

    #[test]
    fn sheet_cells_map_to_cell_values() {
        assert_eq!(cell_from_sheet(&Data::Empty), CellValue::Empty);
        assert_eq!(
            cell_from_sheet(&Data::Error(CellErrorType::NA)),
            CellValue::Empty
        );
        assert_eq!(cell_from_sheet(&Data::Int(42)), CellValue::Int(42));
        assert_eq!(
            cell_from_sheet(&Data::Float(102805001.0)),
            CellValue::Float(102805001.0)
        );
        assert_eq!(cell_from_sheet(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(
            cell_from_sheet(&Data::String("  Laoag City ".to_string())),
            CellValue::Text("Laoag City".to_string())
        );
        assert_eq!(
            cell_from_sheet(&Data::String("   ".to_string())),
            CellValue::Empty
        );
        assert_eq!(
            cell_from_sheet(&Data::DateTimeIso("2024-01-01".to_string())),
            CellValue::Text("2024-01-01".to_string())
        );
    }

    #[test]
    fn sheet_source_labels_header_and_batches_rows() {
        let mut range = Range::new((0, 0), (3, 2));
        range.set_value((0, 0), Data::String("10-digit PSGC".to_string()));
        range.set_value((0, 2), Data::String("Geographic Level".to_string()));
        range.set_value((1, 0), Data::Float(100000000.0));
        range.set_value((1, 1), Data::String("Region I".to_string()));
        range.set_value((1, 2), Data::String("Reg".to_string()));
        range.set_value((2, 0), Data::Float(102800000.0));
        range.set_value((2, 1), Data::String("Ilocos Norte".to_string()));
        range.set_value((3, 0), Data::Float(102805000.0));

        let mut source = sheet_source("PSGC".to_string(), &range, 2);
        assert_eq!(source.sheet(), Some("PSGC"));
        assert_eq!(
            source.columns(),
            ["10-digit PSGC", "column_2", "Geographic Level"]
        );

        let first = source
            .next()
            .expect("first batch")
            .expect("first batch reads");
        assert_eq!(first.len(), 2);
        assert_eq!(first.records[0][0], CellValue::Float(100000000.0));
        assert_eq!(first.records[1][2], CellValue::Empty);

        let second = source
            .next()
            .expect("second batch")
            .expect("second batch reads");
        assert_eq!(second.len(), 1);
        assert!(source.next().is_none());
    }

    #[test]
    fn select_sheet_defaults_to_first_and_rejects_unknown() {
        let available = || vec!["PSGC".to_string(), "Notes".to_string()];
        assert_eq!(select_sheet(available(), None).expect("first sheet"), "PSGC");
        assert_eq!(
            select_sheet(available(), Some("Notes")).expect("named sheet"),
            "Notes"
        );

        let err = select_sheet(available(), Some("Summary"))
            .err()
            .expect("unknown sheet should fail");
        match err.downcast_ref::<SourceError>() {
            Some(SourceError::SheetNotFound { sheet, available }) => {
                assert_eq!(sheet, "Summary");
                assert_eq!(available, &["PSGC", "Notes"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(select_sheet(Vec::new(), None).is_err());
    }
}
