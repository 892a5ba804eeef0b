use crate::{SchemaModelError, SchemaModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The stable, name-based address of a node in a schema tree, e.g. `Tables/Cat/Columns/Name`.
/// The empty path is the catalog.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone, Default, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodePath(String);

const TABLES: &str = "Tables";
const COLUMNS: &str = "Columns";
const PRIMARY_KEY: &str = "PrimaryKey";
const INDEXES: &str = "Indexes";
const FOREIGN_KEYS: &str = "ForeignKeys";
const FULL_TEXT_INDEX: &str = "FullTextIndex";
const SEQUENCES: &str = "Sequences";

impl NodePath {
    pub fn new(path: impl Into<String>) -> Self {
        NodePath(path.into())
    }

    pub fn table(table: &str) -> Self {
        NodePath(format!("{TABLES}/{table}"))
    }

    pub fn column(table: &str, column: &str) -> Self {
        NodePath(format!("{TABLES}/{table}/{COLUMNS}/{column}"))
    }

    pub fn primary_key(table: &str) -> Self {
        NodePath(format!("{TABLES}/{table}/{PRIMARY_KEY}"))
    }

    pub fn index(table: &str, index: &str) -> Self {
        NodePath(format!("{TABLES}/{table}/{INDEXES}/{index}"))
    }

    pub fn foreign_key(table: &str, foreign_key: &str) -> Self {
        NodePath(format!("{TABLES}/{table}/{FOREIGN_KEYS}/{foreign_key}"))
    }

    pub fn full_text_index(table: &str) -> Self {
        NodePath(format!("{TABLES}/{table}/{FULL_TEXT_INDEX}"))
    }

    pub fn sequence(sequence: &str) -> Self {
        NodePath(format!("{SEQUENCES}/{sequence}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the path.
    pub fn address(&self) -> SchemaModelResult<NodeAddress> {
        let segments: Vec<&str> = if self.0.is_empty() {
            Vec::new()
        } else {
            self.0.split('/').collect()
        };

        if segments.iter().any(|s| s.is_empty()) {
            return Err(SchemaModelError::MalformedPath(self.0.clone()));
        }

        let address = match segments.as_slice() {
            [] => NodeAddress::Catalog,
            [TABLES, table] => NodeAddress::Table {
                table: table.to_string(),
            },
            [TABLES, table, COLUMNS, column] => NodeAddress::Column {
                table: table.to_string(),
                column: column.to_string(),
            },
            [TABLES, table, PRIMARY_KEY] => NodeAddress::PrimaryKey {
                table: table.to_string(),
            },
            [TABLES, table, INDEXES, index] => NodeAddress::SecondaryIndex {
                table: table.to_string(),
                index: index.to_string(),
            },
            [TABLES, table, FOREIGN_KEYS, foreign_key] => NodeAddress::ForeignKey {
                table: table.to_string(),
                foreign_key: foreign_key.to_string(),
            },
            [TABLES, table, FULL_TEXT_INDEX] => NodeAddress::FullTextIndex {
                table: table.to_string(),
            },
            [SEQUENCES, sequence] => NodeAddress::Sequence {
                sequence: sequence.to_string(),
            },
            _ => return Err(SchemaModelError::MalformedPath(self.0.clone())),
        };

        Ok(address)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodePath {
    fn from(path: &str) -> Self {
        NodePath(path.to_owned())
    }
}

/// A parsed [NodePath](struct.NodePath.html).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeAddress {
    Catalog,
    Table { table: String },
    Column { table: String, column: String },
    PrimaryKey { table: String },
    SecondaryIndex { table: String, index: String },
    ForeignKey { table: String, foreign_key: String },
    FullTextIndex { table: String },
    Sequence { sequence: String },
}

impl NodeAddress {
    /// The table containing the node, if the node lives in a table.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            NodeAddress::Table { table }
            | NodeAddress::Column { table, .. }
            | NodeAddress::PrimaryKey { table }
            | NodeAddress::SecondaryIndex { table, .. }
            | NodeAddress::ForeignKey { table, .. }
            | NodeAddress::FullTextIndex { table } => Some(table),
            NodeAddress::Catalog | NodeAddress::Sequence { .. } => None,
        }
    }
}
