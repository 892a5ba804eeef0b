//! The contract of the external schema comparison.

use crate::CoreResult;
use serde::{Deserialize, Serialize};
use sql_schema_model::{actions::ActionSequence, NodePath, SqlSchema};
use std::fmt;

/// Reads the schema of the live database.
pub trait SchemaExtractor {
    fn extract(&mut self) -> CoreResult<SqlSchema>;

    /// Forget any cached extraction: the database changed.
    fn invalidate_cache(&mut self);
}

/// Diffs two schema trees into an action sequence.
pub trait SchemaComparer {
    fn compare(&self, extracted: &SqlSchema, target: &SqlSchema, rename_hints: &[RenameHint]) -> ComparisonResult;
}

/// The node at `from` in the extracted schema is the node at `to` in the target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameHint {
    pub from: NodePath,
    pub to: NodePath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonStatus {
    Equal,
    /// Everything in the target schema exists in the extracted schema.
    TargetIsSubset,
    Different,
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonStatus::Equal => f.write_str("equal"),
            ComparisonStatus::TargetIsSubset => f.write_str("target is a subset"),
            ComparisonStatus::Different => f.write_str("different"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub status: ComparisonStatus,
    pub has_column_type_changes: bool,
    /// The outcome of the comparer's legacy compatibility rules.
    pub legacy_compatible: bool,
    pub actions: ActionSequence,
    /// Human-readable differences.
    pub mismatches: Vec<String>,
}

impl ComparisonResult {
    pub fn equal() -> Self {
        ComparisonResult {
            status: ComparisonStatus::Equal,
            has_column_type_changes: false,
            legacy_compatible: true,
            actions: ActionSequence::default(),
            mismatches: Vec::new(),
        }
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        write!(
            f,
            "Column type changes: {}",
            if self.has_column_type_changes { "yes" } else { "no" }
        )?;

        for mismatch in &self.mismatches {
            write!(f, "\n- {mismatch}")?;
        }

        Ok(())
    }
}
