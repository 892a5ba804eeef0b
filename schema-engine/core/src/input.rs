use crate::{MigrationWarning, RenameHint, UpgradeMode};
use serde::{Deserialize, Serialize};
use sql_schema_connector::TranslatorOptions;

/// The parameters of a schema synchronization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaUpgradeInput {
    pub mode: UpgradeMode,
    #[serde(flatten)]
    pub options: TranslatorOptions,
    /// Passed on to the schema comparer.
    pub rename_hints: Vec<RenameHint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaUpgradeOutput {
    /// Statements (or batches of statements) sent to the database.
    pub executed_commands: usize,
    pub warnings: Vec<MigrationWarning>,
}
