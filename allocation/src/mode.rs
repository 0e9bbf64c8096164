use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{AllocationError, MagnitudeInput};

/// Which magnitude field callers supply when writing allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMode {
    #[strum(ascii_case_insensitive, serialize = "hours")]
    Hours,
    #[strum(ascii_case_insensitive, serialize = "percentage")]
    Percentage,
}

impl AllocationMode {
    /// Picks the authoritative value for this mode out of the supplied fields.
    pub fn authoritative_input(
        &self,
        hours: Option<u32>,
        percentage: Option<f64>,
    ) -> Result<MagnitudeInput, AllocationError> {
        match self {
            AllocationMode::Hours => hours
                .map(MagnitudeInput::Hours)
                .ok_or(AllocationError::MissingMagnitude(*self)),
            AllocationMode::Percentage => percentage
                .map(MagnitudeInput::Percentage)
                .ok_or(AllocationError::MissingMagnitude(*self)),
        }
    }
}

/// Decides whether the 100% ceiling is enforced on writes.
///
/// In hours mode the derived percentage is only recorded, unless
/// `enforce_in_hours_mode` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityPolicy {
    pub mode: AllocationMode,
    #[serde(default)]
    pub enforce_in_hours_mode: bool,
}

impl CapacityPolicy {
    pub fn new(mode: AllocationMode) -> Self {
        Self {
            mode,
            enforce_in_hours_mode: false,
        }
    }

    pub fn with_hours_mode_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_in_hours_mode = enforce;
        self
    }

    pub fn enforces_ceiling(&self) -> bool {
        match self.mode {
            AllocationMode::Percentage => true,
            AllocationMode::Hours => self.enforce_in_hours_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_mode_case_insensitively() {
        assert_eq!(AllocationMode::from_str("Hours").unwrap(), AllocationMode::Hours);
        assert_eq!(
            AllocationMode::from_str("PERCENTAGE").unwrap(),
            AllocationMode::Percentage
        );
        assert!(AllocationMode::from_str("days").is_err());
        assert_eq!(AllocationMode::Percentage.to_string(), "percentage");
    }

    #[test]
    fn authoritative_input_follows_mode() {
        assert_eq!(
            AllocationMode::Hours.authoritative_input(Some(12), Some(40.0)),
            Ok(MagnitudeInput::Hours(12))
        );
        assert_eq!(
            AllocationMode::Percentage.authoritative_input(Some(12), Some(40.0)),
            Ok(MagnitudeInput::Percentage(40.0))
        );
        assert_eq!(
            AllocationMode::Percentage.authoritative_input(Some(12), None),
            Err(AllocationError::MissingMagnitude(AllocationMode::Percentage))
        );
    }

    #[test]
    fn ceiling_enforcement_is_asymmetric_by_default() {
        assert!(CapacityPolicy::new(AllocationMode::Percentage).enforces_ceiling());
        assert!(!CapacityPolicy::new(AllocationMode::Hours).enforces_ceiling());
        assert!(CapacityPolicy::new(AllocationMode::Hours)
            .with_hours_mode_enforcement(true)
            .enforces_ceiling());
    }
}
