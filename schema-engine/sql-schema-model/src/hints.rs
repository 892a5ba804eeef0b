//! Data hints: row-level operations that accompany the structural actions, so that data survives
//! (or is deliberately cleaned up during) an upgrade.

use crate::ScalarValue;
use std::fmt;

/// A column of a specific table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        ColumnRef {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// The right-hand side of an identity predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityValue {
    Column(ColumnRef),
    Constant(ScalarValue),
}

/// `column = value`, used to identify the rows a hint applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityPair {
    pub column: ColumnRef,
    pub value: IdentityValue,
}

impl IdentityPair {
    pub fn columns(column: ColumnRef, other: ColumnRef) -> Self {
        IdentityPair {
            column,
            value: IdentityValue::Column(other),
        }
    }

    pub fn constant(column: ColumnRef, value: impl Into<ScalarValue>) -> Self {
        IdentityPair {
            column,
            value: IdentityValue::Constant(value.into()),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.value, IdentityValue::Constant(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataHint {
    CopyData(CopyDataHint),
    DeleteData(DeleteDataHint),
    UpdateData(UpdateDataHint),
}

impl DataHint {
    pub fn identities(&self) -> &[IdentityPair] {
        match self {
            DataHint::CopyData(hint) => &hint.identities,
            DataHint::DeleteData(hint) => &hint.identities,
            DataHint::UpdateData(hint) => &hint.identities,
        }
    }
}

impl fmt::Display for DataHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataHint::CopyData(hint) => write!(f, "Copy data from {} to {}", hint.source_table, hint.target_table),
            DataHint::DeleteData(hint) => write!(f, "Delete data from {}", hint.source_table),
            DataHint::UpdateData(hint) => write!(f, "Update data in {}", hint.source_table),
        }
    }
}

/// Copy column values from rows of the source table into the matching rows of the target table.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyDataHint {
    pub source_table: String,
    pub target_table: String,
    /// `(source column, target column)`
    pub columns: Vec<(String, String)>,
    pub identities: Vec<IdentityPair>,
}

/// Delete the rows of the source table matching every identity.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteDataHint {
    pub source_table: String,
    pub identities: Vec<IdentityPair>,
    /// Run after data has been copied rather than before the upgrade.
    pub post_copy: bool,
}

impl DeleteDataHint {
    /// Every identity compares a column of the source table with a constant.
    pub fn is_constant_keyed(&self) -> bool {
        self.identities
            .iter()
            .all(|identity| identity.is_constant() && identity.column.table == self.source_table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    Literal(ScalarValue),
    /// The column's default value.
    Default,
}

/// Assign values to columns of the rows of the source table matching every identity.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDataHint {
    pub source_table: String,
    pub assignments: Vec<(String, UpdateValue)>,
    pub identities: Vec<IdentityPair>,
    pub post_copy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_keyed_deletes() {
        let by_type = DeleteDataHint {
            source_table: "Animal".into(),
            identities: vec![IdentityPair::constant(ColumnRef::new("Animal", "TypeId"), 7)],
            post_copy: false,
        };

        let by_join = DeleteDataHint {
            source_table: "AnimalToyLink".into(),
            identities: vec![
                IdentityPair::columns(ColumnRef::new("AnimalToyLink", "AnimalId"), ColumnRef::new("Animal", "Id")),
                IdentityPair::constant(ColumnRef::new("Animal", "TypeId"), 7),
            ],
            post_copy: false,
        };

        assert!(by_type.is_constant_keyed());
        assert!(!by_join.is_constant_keyed());
    }
}
