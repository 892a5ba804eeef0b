use serde::{Deserialize, Serialize};
use std::fmt;

/// What a synchronization does with the difference between the extracted and the target schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeMode {
    /// Extract the schema and stop.
    Skip,
    /// Clear the database, then upgrade it.
    Recreate,
    /// Upgrade the database.
    #[default]
    Perform,
    /// Upgrade the database, unless an action would lose data.
    PerformSafely,
    /// Fail unless the schemas are equal.
    ValidateExact,
    /// Fail unless the target schema is contained in the extracted schema.
    ValidateCompatible,
    /// Fail unless the comparer reports the schemas as compatible under the legacy rules.
    ValidateLegacy,
}

impl UpgradeMode {
    /// The mode may change the database.
    pub fn is_mutating(self) -> bool {
        matches!(self, UpgradeMode::Recreate | UpgradeMode::Perform | UpgradeMode::PerformSafely)
    }
}

impl fmt::Display for UpgradeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpgradeMode::Skip => "skip",
            UpgradeMode::Recreate => "recreate",
            UpgradeMode::Perform => "perform",
            UpgradeMode::PerformSafely => "performSafely",
            UpgradeMode::ValidateExact => "validateExact",
            UpgradeMode::ValidateCompatible => "validateCompatible",
            UpgradeMode::ValidateLegacy => "validateLegacy",
        };

        f.write_str(s)
    }
}
