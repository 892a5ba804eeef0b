use crate::{ComparisonResult, UpgradeMode};
use sql_schema_connector::{BoxError, ConnectorError};

/// The result type of core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The top-level error type of the schema engine core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The database schema does not satisfy the upgrade mode.
    #[error("Schema synchronization failed in {mode} mode: {reason}\n{comparison}")]
    SchemaSynchronizationFailed {
        mode: UpgradeMode,
        reason: String,
        comparison: Box<ComparisonResult>,
    },

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("Could not extract the database schema.")]
    Extraction(#[source] BoxError),
}

impl CoreError {
    pub(crate) fn synchronization_failed(
        mode: UpgradeMode,
        reason: impl Into<String>,
        comparison: ComparisonResult,
    ) -> Self {
        CoreError::SchemaSynchronizationFailed {
            mode,
            reason: reason.into(),
            comparison: Box::new(comparison),
        }
    }

    /// The comparison result carried by a synchronization failure.
    pub fn comparison(&self) -> Option<&ComparisonResult> {
        match self {
            CoreError::SchemaSynchronizationFailed { comparison, .. } => Some(comparison),
            _ => None,
        }
    }
}
