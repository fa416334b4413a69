use serde::Serialize;

use super::hierarchy::HierarchyState;
use super::level::AdminLevel;
use super::rows::{CellValue, Row};

/// Search document for one barangay, carrying its own copy of the lineage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Document {
    pub(crate) id: String,
    #[serde(rename = "brgy")]
    pub(crate) name: String,
    #[serde(flatten)]
    pub(crate) ancestors: HierarchyState,
    #[serde(rename = "geographic_level")]
    pub(crate) level: AdminLevel,
    pub(crate) psgc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) population: Option<i64>,
}

impl Document {
    pub(super) fn has_complete_lineage(&self) -> bool {
        self.ancestors.region.is_some()
            && self.ancestors.province.is_some()
            && self.ancestors.city_municipality.is_some()
    }
}

pub(super) fn build_document(
    code: &str,
    name: &str,
    state: &HierarchyState,
    row: Row<'_>,
) -> Document {
    Document {
        id: code.to_string(),
        name: name.to_string(),
        ancestors: state.clone(),
        level: AdminLevel::Barangay,
        psgc: code.to_string(),
        population: population_of(row),
    }
}

fn population_of(row: Row<'_>) -> Option<i64> {
    let (_, value) = row.find(|label| label.to_lowercase().contains("population"))?;
    let number = match value {
        CellValue::Int(value) => return Some(*value),
        CellValue::Float(value) => *value,
        CellValue::Text(text) => text.trim().parse::<f64>().ok()?,
        CellValue::Empty | CellValue::Bool(_) => return None,
    };
    if !number.is_finite() || number.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(number.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::index::rows::RowBatch;

    fn lineage() -> HierarchyState {
        HierarchyState {
            region: Some("Region I".to_string()),
            province: Some("Ilocos Norte".to_string()),
            city_municipality: Some("Laoag City".to_string()),
            submun: None,
        }
    }

    fn single_row(columns: &[&str], values: Vec<CellValue>) -> RowBatch {
        RowBatch::new(
            columns.iter().map(|label| label.to_string()).collect(),
            vec![values],
        )
    }

    #[test]
    fn document_snapshots_lineage_by_value() {
        let batch = single_row(&["code", "name"], vec![CellValue::Int(1), CellValue::Empty]);
        let row = batch.rows().next().expect("one row");
        let mut state = lineage();

        let document = build_document("1010101001", "Barangay 1", &state, row);
        state.region = Some("Region II".to_string());

        assert_eq!(document.ancestors, lineage());
        assert_eq!(document.id, "1010101001");
        assert_eq!(document.psgc, "1010101001");
        assert_eq!(document.level, AdminLevel::Barangay);
        assert_eq!(document.population, None);
        assert!(document.has_complete_lineage());
    }

    #[test]
    fn population_is_truncated_and_tolerates_garbage() {
        let batch = single_row(
            &["code", "name", "2020 Population"],
            vec![
                CellValue::Int(1),
                CellValue::Empty,
                CellValue::Text("1234.9".to_string()),
            ],
        );
        let row = batch.rows().next().expect("one row");
        let document = build_document("0000000001", "A", &lineage(), row);
        assert_eq!(document.population, Some(1234));

        let batch = single_row(
            &["code", "POPULATION"],
            vec![CellValue::Int(1), CellValue::Text("n/a".to_string())],
        );
        let row = batch.rows().next().expect("one row");
        let document = build_document("0000000001", "A", &lineage(), row);
        assert_eq!(document.population, None);
    }

    #[test]
    fn document_serializes_with_index_field_names() {
        let batch = single_row(
            &["code", "Population"],
            vec![CellValue::Int(1), CellValue::Float(2500.0)],
        );
        let row = batch.rows().next().expect("one row");
        let document = build_document("1010101001", "Barangay 1", &lineage(), row);

        let value = serde_json::to_value(&document).expect("document serializes");
        assert_eq!(value["id"], "1010101001");
        assert_eq!(value["brgy"], "Barangay 1");
        assert_eq!(value["region"], "Region I");
        assert_eq!(value["city_municipality"], "Laoag City");
        assert!(value["submun"].is_null());
        assert_eq!(value["geographic_level"], "BGY");
        assert_eq!(value["psgc"], "1010101001");
        assert_eq!(value["population"], 2500);
    }
}
