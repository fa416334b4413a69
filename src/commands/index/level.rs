use serde::Serialize;

use super::rows::CellValue;

pub(super) const CODE_WIDTH: usize = 10;

/// Administrative depth, shallowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub(super) enum AdminLevel {
    #[serde(rename = "REG")]
    Region,
    #[serde(rename = "PROV")]
    Province,
    #[serde(rename = "CITYMUN")]
    CityOrMunicipality,
    #[serde(rename = "SUBMUN")]
    SubMunicipality,
    #[serde(rename = "BGY")]
    Barangay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LevelSource {
    Keyword,
    CodeShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct LevelMatch {
    pub(super) level: AdminLevel,
    pub(super) source: LevelSource,
    /// Set for city/municipality rows: whether the row names a city.
    pub(super) is_city: bool,
}

// Checked in order; the first entry with any contained variant wins.
const LEVEL_KEYWORDS: &[(AdminLevel, bool, &[&str])] = &[
    (AdminLevel::Region, false, &["REG", "REGION", "RGN"]),
    (AdminLevel::Province, false, &["PROV", "PROVINCE", "PV"]),
    (AdminLevel::CityOrMunicipality, true, &["CITY", "CT"]),
    (
        AdminLevel::CityOrMunicipality,
        false,
        &["MUN", "MUNICIPAL", "MUNICIPALITY"],
    ),
    (
        AdminLevel::SubMunicipality,
        false,
        &["SUBMUN", "SUB-MUNIC", "SUBMUNICIPALITY"],
    ),
    (AdminLevel::Barangay, false, &["BGY", "BRGY", "BARANGAY"]),
];

/// Keyword lookup on the free-text level marker.
pub(super) fn level_from_marker(raw: &str) -> Option<LevelMatch> {
    let marker = raw.trim().to_uppercase();
    if marker.is_empty() {
        return None;
    }

    LEVEL_KEYWORDS
        .iter()
        .find(|(_, _, variants)| variants.iter().any(|variant| marker.contains(variant)))
        .map(|&(level, is_city, _)| LevelMatch {
            level,
            source: LevelSource::Keyword,
            is_city,
        })
}

/// Depth implied by how many digits lie between the first and last non-zero
/// digit of a normalized code.
pub(super) fn level_from_code(code: &str, name: &str) -> Option<LevelMatch> {
    if code.len() != CODE_WIDTH || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let significant = code.trim_matches('0').len();
    let level = match significant {
        0..=2 => AdminLevel::Region,
        3..=4 => AdminLevel::Province,
        5..=6 => AdminLevel::CityOrMunicipality,
        7..=8 => AdminLevel::SubMunicipality,
        _ => AdminLevel::Barangay,
    };

    Some(LevelMatch {
        level,
        source: LevelSource::CodeShape,
        is_city: level == AdminLevel::CityOrMunicipality && name.to_uppercase().contains("CITY"),
    })
}

pub(super) fn classify_level(raw_marker: &str, code: &str, name: &str) -> Option<LevelMatch> {
    level_from_marker(raw_marker).or_else(|| level_from_code(code, name))
}

/// Zero-padded 10-digit rendering of a raw code cell. Anything after a
/// decimal point is dropped before parsing.
pub(super) fn normalize_code(raw: &CellValue) -> Option<String> {
    let value = match raw {
        CellValue::Empty | CellValue::Bool(_) => return None,
        CellValue::Int(value) => u64::try_from(*value).ok()?,
        CellValue::Float(value) => {
            if !value.is_finite() || *value < 0.0 {
                return None;
            }
            value.trunc() as u64
        }
        CellValue::Text(text) => {
            let whole = text.trim().split('.').next().unwrap_or_default().trim();
            let whole = whole.strip_prefix('+').unwrap_or(whole);
            if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            whole.parse::<u64>().ok()?
        }
    };

    let code = format!("{value:0width$}", width = CODE_WIDTH);
    (code.len() == CODE_WIDTH).then_some(code)
}
