use crate::actions::UpgradeStage;

/// The result type.
pub type SchemaModelResult<T> = Result<T, SchemaModelError>;

/// An action sequence or node path that does not follow the schema model's contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaModelError {
    #[error("`{0}` is not a valid node path.")]
    MalformedPath(String),
    #[error("The action sequence contains more than one `{0:?}` grouping.")]
    DuplicateStage(UpgradeStage),
    #[error("Top-level actions must be stage groupings, found {0}.")]
    UngroupedAction(String),
}
