use std::fmt;

use thiserror::Error;

use super::rows::{CellValue, RowBatch};

const CODE_LABEL: &str = "10-digit PSGC";
const NAME_LABEL: &str = "Name";
const LEVEL_LABEL: &str = "Geographic Level";

const CODE_KEYWORDS: &[&str] = &["psgc", "code", "id"];
const NAME_KEYWORDS: &[&str] = &["name", "description"];
const LEVEL_KEYWORDS: &[&str] = &["level", "geo", "type"];
const LEVEL_VALUE_FRAGMENTS: &[&str] = &["REG", "PROV", "MUN", "CITY", "BGY"];

const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnTarget {
    Code,
    Name,
    Level,
}

impl fmt::Display for ColumnTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Code => "code",
            Self::Name => "name",
            Self::Level => "level",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not identify {} column(s)", render_targets(.missing))]
pub(crate) struct UnresolvedColumns {
    pub(crate) missing: Vec<ColumnTarget>,
}

fn render_targets(targets: &[ColumnTarget]) -> String {
    targets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ColumnRef {
    pub(super) index: usize,
    pub(super) label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ColumnMapping {
    pub(super) code: ColumnRef,
    pub(super) name: ColumnRef,
    pub(super) level: ColumnRef,
}

impl ColumnMapping {
    /// Finds the same labels in another batch's header.
    pub(super) fn rebind(&self, columns: &[String]) -> Result<Self, UnresolvedColumns> {
        let locate = |column: &ColumnRef| {
            columns
                .iter()
                .position(|label| *label == column.label)
                .map(|index| ColumnRef {
                    index,
                    label: column.label.clone(),
                })
        };

        let mut missing = Vec::new();
        let code = locate(&self.code);
        let name = locate(&self.name);
        let level = locate(&self.level);
        if code.is_none() {
            missing.push(ColumnTarget::Code);
        }
        if name.is_none() {
            missing.push(ColumnTarget::Name);
        }
        if level.is_none() {
            missing.push(ColumnTarget::Level);
        }

        match (code, name, level) {
            (Some(code), Some(name), Some(level)) => Ok(Self { code, name, level }),
            _ => Err(UnresolvedColumns { missing }),
        }
    }
}

#[derive(Debug, Default)]
struct Candidates {
    code: Option<usize>,
    name: Option<usize>,
    level: Option<usize>,
}

impl Candidates {
    fn complete(&self) -> bool {
        self.code.is_some() && self.name.is_some() && self.level.is_some()
    }

    fn claimed(&self, index: usize) -> bool {
        [self.code, self.name, self.level].contains(&Some(index))
    }
}

/// Picks the code, name and level columns of one batch: exact labels, then
/// label keywords, then sampled content, then position.
pub(super) fn resolve_columns(batch: &RowBatch) -> Result<ColumnMapping, UnresolvedColumns> {
    let columns = &batch.columns;
    let mut found = Candidates {
        code: columns.iter().position(|label| label == CODE_LABEL),
        name: columns.iter().position(|label| label == NAME_LABEL),
        level: columns.iter().position(|label| label == LEVEL_LABEL),
    };

    if !found.complete() {
        match_label_keywords(columns, &mut found);
    }
    if !found.complete() {
        match_sampled_content(batch, &mut found);
    }

    if found.code.is_none() && !columns.is_empty() {
        found.code = Some(0);
    }
    if found.name.is_none() && columns.len() > 1 {
        found.name = Some(1);
    }
    if found.level.is_none() && columns.len() > 3 {
        found.level = Some(3);
    }

    let column_ref = |index: usize| ColumnRef {
        index,
        label: columns[index].clone(),
    };
    match (found.code, found.name, found.level) {
        (Some(code), Some(name), Some(level)) => Ok(ColumnMapping {
            code: column_ref(code),
            name: column_ref(name),
            level: column_ref(level),
        }),
        (code, name, level) => {
            let missing = [
                (code, ColumnTarget::Code),
                (name, ColumnTarget::Name),
                (level, ColumnTarget::Level),
            ]
            .into_iter()
            .filter(|(index, _)| index.is_none())
            .map(|(_, target)| target)
            .collect();
            Err(UnresolvedColumns { missing })
        }
    }
}

fn match_label_keywords(columns: &[String], found: &mut Candidates) {
    let has_keyword =
        |label: &str, keywords: &[&str]| keywords.iter().any(|keyword| label.contains(keyword));

    for (index, label) in columns.iter().enumerate() {
        if found.claimed(index) {
            continue;
        }
        let label = label.to_lowercase();
        if found.code.is_none() && has_keyword(&label, CODE_KEYWORDS) {
            found.code = Some(index);
        } else if found.name.is_none() && has_keyword(&label, NAME_KEYWORDS) {
            found.name = Some(index);
        } else if found.level.is_none() && has_keyword(&label, LEVEL_KEYWORDS) {
            found.level = Some(index);
        }
    }
}

fn match_sampled_content(batch: &RowBatch, found: &mut Candidates) {
    for index in 0..batch.columns.len() {
        if found.claimed(index) {
            continue;
        }
        let sample = batch.sample(index, SAMPLE_SIZE);
        if sample.is_empty() {
            continue;
        }

        if found.code.is_none() && sample.iter().all(|value| value.is_digit_string()) {
            found.code = Some(index);
        } else if found.level.is_none() && sample.iter().any(|value| names_a_level(value)) {
            found.level = Some(index);
        } else if found.name.is_none() && sample.iter().all(|value| value.is_text()) {
            found.name = Some(index);
        }
    }
}

fn names_a_level(value: &CellValue) -> bool {
    let text = value.to_string().to_uppercase();
    LEVEL_VALUE_FRAGMENTS
        .iter()
        .any(|fragment| text.contains(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn batch(columns: &[&str], records: Vec<Vec<CellValue>>) -> RowBatch {
        RowBatch::new(
            columns.iter().map(|label| label.to_string()).collect(),
            records,
        )
    }

    #[test]
    fn exact_source_labels_win() {
        let batch = batch(
            &["Correspondence Code", "10-digit PSGC", "Name", "Geographic Level"],
            vec![],
        );
        let mapping = resolve_columns(&batch).expect("columns resolve");
        assert_eq!(mapping.code.index, 1);
        assert_eq!(mapping.name.index, 2);
        assert_eq!(mapping.level.index, 3);
        assert_eq!(mapping.level.label, "Geographic Level");
    }

    #[test]
    fn label_keywords_resolve_unfamiliar_headers() {
        let batch = batch(&["Area Description", "PSGC Id", "Geo Type"], vec![]);
        let mapping = resolve_columns(&batch).expect("columns resolve");
        assert_eq!(mapping.name.index, 0);
        assert_eq!(mapping.code.index, 1);
        assert_eq!(mapping.level.index, 2);
    }

    #[test]
    fn sampled_content_resolves_unlabelled_columns() {
        let batch = batch(
            &["a", "b", "c"],
            vec![
                vec![text("Reg"), text("Region I"), CellValue::Int(100000000)],
                vec![text("Prov"), text("Ilocos Norte"), CellValue::Int(102800000)],
                vec![text("City"), text("Laoag City"), CellValue::Float(102805000.0)],
            ],
        );
        let mapping = resolve_columns(&batch).expect("columns resolve");
        assert_eq!(mapping.level.index, 0);
        assert_eq!(mapping.name.index, 1);
        assert_eq!(mapping.code.index, 2);
    }

    #[test]
    fn position_fills_remaining_targets() {
        let batch = batch(&["w", "x", "y", "z"], vec![]);
        let mapping = resolve_columns(&batch).expect("columns resolve");
        assert_eq!(
            (mapping.code.index, mapping.name.index, mapping.level.index),
            (0, 1, 3)
        );
    }

    #[test]
    fn unresolvable_targets_are_reported() {
        let batch = batch(&["x", "y"], vec![]);
        let err = resolve_columns(&batch).expect_err("level cannot resolve");
        assert_eq!(err.missing, vec![ColumnTarget::Level]);
        assert_eq!(err.to_string(), "could not identify level column(s)");
    }

    #[test]
    fn rebind_follows_labels_to_new_positions() {
        let original = batch(&["10-digit PSGC", "Name", "Geographic Level"], vec![]);
        let mapping = resolve_columns(&original).expect("columns resolve");

        let moved = vec![
            "Geographic Level".to_string(),
            "10-digit PSGC".to_string(),
            "Name".to_string(),
        ];
        let rebound = mapping.rebind(&moved).expect("labels present");
        assert_eq!(rebound.level.index, 0);
        assert_eq!(rebound.code.index, 1);

        let err = mapping
            .rebind(&["Name".to_string()])
            .expect_err("labels missing");
        assert_eq!(err.missing, vec![ColumnTarget::Code, ColumnTarget::Level]);
    }
}
