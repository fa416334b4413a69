use std::fmt;

/// One raw cell as delivered by the reader.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    /// Types a delimited field the way a spreadsheet would have stored it.
    pub(super) fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() {
                return Self::Float(value);
            }
        }
        Self::Text(trimmed.to_string())
    }

    pub(super) fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub(super) fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// True for values made only of decimal digits. Floats count when they
    /// hold a non-negative whole number, since spreadsheets store codes that way.
    pub(super) fn is_digit_string(&self) -> bool {
        match self {
            Self::Int(value) => *value >= 0,
            Self::Float(value) => value.is_finite() && *value >= 0.0 && value.fract() == 0.0,
            Self::Text(value) => !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()),
            Self::Empty | Self::Bool(_) => false,
        }
    }

    /// `None` when the cell is absent.
    pub(super) fn render(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// A contiguous slice of input rows sharing one header.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct RowBatch {
    pub(super) columns: Vec<String>,
    pub(super) records: Vec<Vec<CellValue>>,
}

impl RowBatch {
    pub(super) fn new(columns: Vec<String>, records: Vec<Vec<CellValue>>) -> Self {
        Self { columns, records }
    }

    pub(super) fn len(&self) -> usize {
        self.records.len()
    }

    pub(super) fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Up to `limit` present values of one column, in row order.
    pub(super) fn sample(&self, column: usize, limit: usize) -> Vec<&CellValue> {
        self.records
            .iter()
            .filter_map(|values| values.get(column))
            .filter(|value| !value.is_empty())
            .take(limit)
            .collect()
    }
}

/// Borrowed view of one record together with its column labels.
#[derive(Debug, Clone, Copy)]
pub(super) struct Row<'a> {
    columns: &'a [String],
    values: &'a [CellValue],
}

impl<'a> Row<'a> {
    /// Short records read as absent in their missing trailing columns.
    pub(super) fn at(&self, column: usize) -> &'a CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.values.get(column).unwrap_or(EMPTY)
    }

    pub(super) fn find(
        &self,
        mut predicate: impl FnMut(&str) -> bool,
    ) -> Option<(&'a str, &'a CellValue)> {
        self.columns
            .iter()
            .position(|label| predicate(label.as_str()))
            .map(|idx| (self.columns[idx].as_str(), self.at(idx)))
    }
}
