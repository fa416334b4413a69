use serde::{Deserialize, Serialize};

use super::level::AdminLevel;

/// Most recent ancestor name seen at each level above barangay.
///
/// Setting a level clears every deeper slot, so a slot is only ever filled
/// with a name that sits under the current shallower ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HierarchyState {
    pub(crate) region: Option<String>,
    pub(crate) province: Option<String>,
    pub(crate) city_municipality: Option<String>,
    pub(crate) submun: Option<String>,
}

impl HierarchyState {
    /// Applies one classified non-leaf row. Returns `false` for barangay rows,
    /// which leave the state untouched.
    pub(super) fn advance(&mut self, level: AdminLevel, name: &str) -> bool {
        match level {
            AdminLevel::Region => {
                self.region = Some(name.to_string());
                self.province = None;
                self.city_municipality = None;
                self.submun = None;
            }
            AdminLevel::Province => {
                self.province = Some(name.to_string());
                self.city_municipality = None;
                self.submun = None;
            }
            AdminLevel::CityOrMunicipality => {
                self.city_municipality = Some(name.to_string());
                self.submun = None;
            }
            AdminLevel::SubMunicipality => {
                self.submun = Some(name.to_string());
            }
            AdminLevel::Barangay => return false,
        }
        true
    }

    pub(super) fn has_any_ancestor(&self) -> bool {
        self.region.is_some() || self.province.is_some() || self.city_municipality.is_some()
    }

    pub(super) fn slot(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::Region => self.region.as_deref(),
            AdminLevel::Province => self.province.as_deref(),
            AdminLevel::CityOrMunicipality => self.city_municipality.as_deref(),
            AdminLevel::SubMunicipality => self.submun.as_deref(),
            AdminLevel::Barangay => None,
        }
    }
}
