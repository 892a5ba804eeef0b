//! The schema model the upgrade engine reasons about: a tree of tables, columns, indexes, keys and
//! sequences addressed by stable, name-based paths. The same types describe the schema extracted
//! from a live database and the target schema implied by the application's data model.

#![deny(rust_2018_idioms, unsafe_code)]
#![allow(clippy::derive_partial_eq_without_eq)]

pub mod actions;
pub mod hints;
pub mod walkers;

mod error;
mod path;
mod value;

pub use self::{
    error::{SchemaModelError, SchemaModelResult},
    path::{NodeAddress, NodePath},
    value::ScalarValue,
    walkers::*,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog: the root of the schema tree.
#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct SqlSchema {
    /// The schema's tables.
    pub tables: Vec<Table>,
    /// The schema's sequences.
    pub sequences: Vec<Sequence>,
}

impl SqlSchema {
    /// Add a table to the schema.
    pub fn push_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Add a sequence to the schema.
    pub fn push_sequence(&mut self, sequence: Sequence) {
        self.sequences.push(sequence);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    pub fn sequence(&self, name: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.name == name)
    }

    pub fn sequence_mut(&mut self, name: &str) -> Option<&mut Sequence> {
        self.sequences.iter_mut().find(|s| s.name == name)
    }

    /// Remove a table, returning it if it existed.
    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        let idx = self.tables.iter().position(|t| t.name == name)?;
        Some(self.tables.remove(idx))
    }

    pub fn remove_sequence(&mut self, name: &str) -> Option<Sequence> {
        let idx = self.sequences.iter().position(|s| s.name == name)?;
        Some(self.sequences.remove(idx))
    }

    /// Rename a table, and every foreign key pointing at it. Returns false when the table does not
    /// exist.
    pub fn rename_table(&mut self, previous: &str, next: &str) -> bool {
        let Some(table) = self.table_mut(previous) else {
            return false;
        };

        table.name = next.to_owned();

        for fk in self.tables.iter_mut().flat_map(|t| t.foreign_keys.iter_mut()) {
            if fk.referenced_table == previous {
                fk.referenced_table = next.to_owned();
            }
        }

        true
    }

    /// Rename a column, and every key, index and foreign key column referring to it.
    pub fn rename_column(&mut self, table_name: &str, previous: &str, next: &str) -> bool {
        let Some(table) = self.table_mut(table_name) else {
            return false;
        };

        if !table.rename_column(previous, next) {
            return false;
        }

        for fk in self.tables.iter_mut().flat_map(|t| t.foreign_keys.iter_mut()) {
            if fk.referenced_table == table_name {
                rename_in(&mut fk.referenced_columns, previous, next);
            }
        }

        true
    }

    /// No tables and no sequences.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.sequences.is_empty()
    }

    pub fn table_walker<'a>(&'a self, name: &str) -> Option<TableWalker<'a>> {
        let table = self.table(name)?;
        Some(TableWalker { schema: self, table })
    }

    pub fn table_walkers(&self) -> impl ExactSizeIterator<Item = TableWalker<'_>> {
        self.tables.iter().map(move |table| TableWalker { schema: self, table })
    }

    /// Locate the node at `address`.
    pub fn resolve(&self, address: &NodeAddress) -> Option<Node<'_>> {
        match address {
            NodeAddress::Catalog => Some(Node::Catalog(self)),
            NodeAddress::Table { table: name } => self.table_walker(name).map(Node::Table),
            NodeAddress::Column { table: name, column } => self.table_walker(name)?.column(column).map(Node::Column),
            NodeAddress::PrimaryKey { table: name } => {
                let table = self.table_walker(name)?;
                table.primary_key().map(|pk| Node::PrimaryKey(table, pk))
            }
            NodeAddress::SecondaryIndex { table: name, index } => {
                let table = self.table_walker(name)?;
                table.index(index).map(|idx| Node::SecondaryIndex(table, idx))
            }
            NodeAddress::ForeignKey { table: name, foreign_key } => {
                self.table_walker(name)?.foreign_key(foreign_key).map(Node::ForeignKey)
            }
            NodeAddress::FullTextIndex { table: name } => {
                let table = self.table_walker(name)?;
                table.full_text_index().map(|fti| Node::FullTextIndex(table, fti))
            }
            NodeAddress::Sequence { sequence } => self.sequence(sequence).map(Node::Sequence),
        }
    }
}

fn rename_in(columns: &mut [String], previous: &str, next: &str) {
    for column in columns.iter_mut().filter(|c| c.as_str() == previous) {
        *column = next.to_owned();
    }
}

/// A table found in a schema.
#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<PrimaryKey>,
    pub indexes: Vec<SecondaryIndex>,
    pub foreign_keys: Vec<ForeignKey>,
    pub full_text_index: Option<FullTextIndex>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, primary_key: PrimaryKey) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    pub fn with_index(mut self, index: SecondaryIndex) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_full_text_index(mut self, full_text_index: FullTextIndex) -> Self {
        self.full_text_index = Some(full_text_index);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    pub fn remove_index(&mut self, name: &str) -> Option<SecondaryIndex> {
        let idx = self.indexes.iter().position(|i| i.name == name)?;
        Some(self.indexes.remove(idx))
    }

    pub fn remove_foreign_key(&mut self, name: &str) -> Option<ForeignKey> {
        let idx = self.foreign_keys.iter().position(|fk| fk.name == name)?;
        Some(self.foreign_keys.remove(idx))
    }

    /// Is the column one of the primary key columns?
    pub fn is_primary_key_column(&self, column_name: &str) -> bool {
        self.primary_key
            .as_ref()
            .map(|pk| pk.columns.iter().any(|c| c.name == column_name))
            .unwrap_or(false)
    }

    fn rename_column(&mut self, previous: &str, next: &str) -> bool {
        let Some(column) = self.column_mut(previous) else {
            return false;
        };

        column.name = next.to_owned();

        let index_columns = self
            .primary_key
            .iter_mut()
            .flat_map(|pk| pk.columns.iter_mut())
            .chain(self.indexes.iter_mut().flat_map(|idx| idx.columns.iter_mut()));

        for column in index_columns.filter(|c| c.name == previous) {
            column.name = next.to_owned();
        }

        for fk in self.foreign_keys.iter_mut() {
            rename_in(&mut fk.columns, previous, next);
        }

        for column in self
            .full_text_index
            .iter_mut()
            .flat_map(|fti| fti.columns.iter_mut())
            .filter(|c| c.name == previous)
        {
            column.name = next.to_owned();
        }

        true
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column type.
    pub tpe: ColumnType,
    /// Column default.
    pub default: Option<DefaultValue>,
    /// Holds the type discriminator of rows in a hierarchy mapped to a single table.
    #[serde(default)]
    pub is_type_discriminator: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, family: ColumnTypeFamily, arity: ColumnArity) -> Self {
        Column {
            name: name.into(),
            tpe: ColumnType::pure(family, arity),
            default: None,
            is_type_discriminator: false,
        }
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn type_discriminator(mut self) -> Self {
        self.is_type_discriminator = true;
        self
    }

    pub fn is_nullable(&self) -> bool {
        self.tpe.arity.is_nullable()
    }
}

/// The type of a column.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct ColumnType {
    /// The family of the raw type.
    pub family: ColumnTypeFamily,
    /// The arity of the column.
    pub arity: ColumnArity,
}

impl ColumnType {
    pub fn pure(family: ColumnTypeFamily, arity: ColumnArity) -> Self {
        ColumnType { family, arity }
    }
}

/// Enumeration of column type families.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum ColumnTypeFamily {
    /// 32-bit integer types.
    Int,
    /// 64-bit integer types.
    BigInt,
    /// Floating point types.
    Float,
    /// Exact numeric types.
    Decimal { precision: u32, scale: u32 },
    Boolean,
    /// Character types. No length means unbounded.
    String { length: Option<u32> },
    DateTime,
    Uuid,
    /// Binary types. No length means unbounded.
    Binary { length: Option<u32> },
    Geometry,
    Geography,
}

impl ColumnTypeFamily {
    pub fn is_spatial(&self) -> bool {
        matches!(self, ColumnTypeFamily::Geometry | ColumnTypeFamily::Geography)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ColumnTypeFamily::String { .. })
    }

    /// How values of this family carry over to `next`.
    pub fn change_to(&self, next: &ColumnTypeFamily) -> ColumnTypeChange {
        use ColumnTypeFamily::*;

        if self == next {
            return ColumnTypeChange::SafeCast;
        }

        match (self, next) {
            (Int, BigInt | Float | Decimal { .. }) => ColumnTypeChange::SafeCast,
            (BigInt, Int) => ColumnTypeChange::RiskyCast,
            (BigInt, Float | Decimal { .. }) => ColumnTypeChange::SafeCast,
            (Float, Int | BigInt | Decimal { .. }) => ColumnTypeChange::RiskyCast,
            (Decimal { .. }, Int | BigInt | Float | Decimal { .. }) => ColumnTypeChange::RiskyCast,
            (Boolean, Int | BigInt) => ColumnTypeChange::SafeCast,
            (Int | BigInt, Boolean) => ColumnTypeChange::RiskyCast,
            (String { length: previous }, String { length: next }) => match (previous, next) {
                (_, None) => ColumnTypeChange::SafeCast,
                (Some(previous), Some(next)) if previous <= next => ColumnTypeChange::SafeCast,
                _ => ColumnTypeChange::RiskyCast,
            },
            (Binary { length: previous }, Binary { length: next }) => match (previous, next) {
                (_, None) => ColumnTypeChange::SafeCast,
                (Some(previous), Some(next)) if previous <= next => ColumnTypeChange::SafeCast,
                _ => ColumnTypeChange::RiskyCast,
            },
            (Int | BigInt | Float | Decimal { .. } | Boolean | DateTime | Uuid, String { length }) => match length {
                None => ColumnTypeChange::SafeCast,
                Some(_) => ColumnTypeChange::RiskyCast,
            },
            (String { .. }, Int | BigInt | Float | Decimal { .. } | Boolean | DateTime | Uuid) => {
                ColumnTypeChange::RiskyCast
            }
            _ => ColumnTypeChange::NotCastable,
        }
    }
}

/// The consequence of changing a column's type family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTypeChange {
    /// Every value converts.
    SafeCast,
    /// Values convert, but some may fail or lose precision.
    RiskyCast,
    /// Values cannot be carried over.
    NotCastable,
}

impl ColumnTypeChange {
    pub fn is_convertible(self) -> bool {
        !matches!(self, ColumnTypeChange::NotCastable)
    }
}

/// A column's arity.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ColumnArity {
    /// Required column.
    Required,
    /// Nullable column.
    Nullable,
}

impl ColumnArity {
    /// The arity is ColumnArity::Nullable.
    pub fn is_nullable(&self) -> bool {
        matches!(self, ColumnArity::Nullable)
    }

    /// The arity is ColumnArity::Required.
    pub fn is_required(&self) -> bool {
        matches!(self, ColumnArity::Required)
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct DefaultValue {
    kind: DefaultKind,
    constraint_name: Option<String>,
}

/// A DefaultValue
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub enum DefaultKind {
    /// A constant value.
    Value(ScalarValue),
    /// An expression generating a current timestamp.
    Now,
    /// The next value of the named sequence.
    Sequence(String),
}

impl DefaultValue {
    pub fn new(kind: DefaultKind) -> Self {
        Self {
            kind,
            constraint_name: None,
        }
    }

    pub fn value(val: impl Into<ScalarValue>) -> Self {
        Self::new(DefaultKind::Value(val.into()))
    }

    pub fn now() -> Self {
        Self::new(DefaultKind::Now)
    }

    pub fn sequence(name: impl ToString) -> Self {
        Self::new(DefaultKind::Sequence(name.to_string()))
    }

    pub fn kind(&self) -> &DefaultKind {
        &self.kind
    }

    pub fn constraint_name(&self) -> Option<&str> {
        self.constraint_name.as_deref()
    }

    pub fn with_constraint_name(mut self, constraint_name: Option<String>) -> Self {
        self.constraint_name = constraint_name;
        self
    }
}

/// The sort order of an index column.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Copy, Clone, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl AsRef<str> for SortOrder {
    fn as_ref(&self) -> &str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct IndexColumn {
    pub name: String,
    pub sort_order: Option<SortOrder>,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        IndexColumn {
            name: name.into(),
            sort_order: None,
        }
    }

    pub fn descending(mut self) -> Self {
        self.sort_order = Some(SortOrder::Desc);
        self
    }
}

/// The primary index of a table.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct PrimaryKey {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub clustered: bool,
}

impl PrimaryKey {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        PrimaryKey {
            name: name.into(),
            columns: columns.iter().map(|c| IndexColumn::new(*c)).collect(),
            clustered: true,
        }
    }
}

/// An index other than the primary index.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct SecondaryIndex {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    pub clustered: bool,
    /// Partial index predicate.
    pub filter: Option<String>,
}

impl SecondaryIndex {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        SecondaryIndex {
            name: name.into(),
            columns: columns.iter().map(|c| IndexColumn::new(*c)).collect(),
            unique: false,
            clustered: false,
            filter: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Foreign key action types (for ON DELETE|ON UPDATE).
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct ForeignKey {
    pub name: String,
    /// The referencing columns.
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    pub fn new(name: impl Into<String>, columns: &[&str], referenced_table: &str, referenced_columns: &[&str]) -> Self {
        ForeignKey {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_table: referenced_table.to_owned(),
            referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Sequence {
    pub name: String,
    pub seed: i64,
    pub increment: i64,
    /// The last value handed out, when known.
    pub current: Option<i64>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, seed: i64, increment: i64) -> Self {
        Sequence {
            name: name.into(),
            seed,
            increment,
            current: None,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct FullTextIndex {
    pub name: String,
    pub columns: Vec<FullTextColumn>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct FullTextColumn {
    pub name: String,
    /// The language (or text search configuration) of the column.
    pub language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cats_and_kittens() -> SqlSchema {
        let mut schema = SqlSchema::default();

        schema.push_table(
            Table::new("Cat")
                .with_column(Column::new("Id", ColumnTypeFamily::Int, ColumnArity::Required))
                .with_column(Column::new(
                    "Name",
                    ColumnTypeFamily::String { length: Some(100) },
                    ColumnArity::Nullable,
                ))
                .with_primary_key(PrimaryKey::new("PK_Cat", &["Id"]))
                .with_index(SecondaryIndex::new("IX_Cat_Name", &["Name"])),
        );

        schema.push_table(
            Table::new("Kitten")
                .with_column(Column::new("Id", ColumnTypeFamily::Int, ColumnArity::Required))
                .with_column(Column::new("MotherId", ColumnTypeFamily::Int, ColumnArity::Nullable))
                .with_foreign_key(ForeignKey::new("FK_Kitten_Cat", &["MotherId"], "Cat", &["Id"])),
        );

        schema
    }

    #[test]
    fn renaming_a_table_repoints_foreign_keys() {
        let mut schema = cats_and_kittens();

        assert!(schema.rename_table("Cat", "Feline"));
        assert!(!schema.rename_table("Dog", "Canine"));

        let fk = &schema.table("Kitten").unwrap().foreign_keys[0];
        assert_eq!(fk.referenced_table, "Feline");
        assert!(schema.table("Cat").is_none());
    }

    #[test]
    fn renaming_a_column_updates_keys_and_indexes() {
        let mut schema = cats_and_kittens();

        assert!(schema.rename_column("Cat", "Id", "CatId"));
        assert!(schema.rename_column("Cat", "Name", "Nickname"));

        let cat = schema.table("Cat").unwrap();
        assert_eq!(cat.primary_key.as_ref().unwrap().columns[0].name, "CatId");
        assert_eq!(cat.indexes[0].columns[0].name, "Nickname");
        assert_eq!(
            schema.table("Kitten").unwrap().foreign_keys[0].referenced_columns,
            vec!["CatId".to_owned()]
        );
    }

    #[test]
    fn resolving_paths() {
        let schema = cats_and_kittens();

        let column = schema
            .resolve(&NodePath::column("Cat", "Name").address().unwrap())
            .unwrap();
        assert!(matches!(column, Node::Column(c) if c.name() == "Name" && c.table().name() == "Cat"));

        let fk = schema
            .resolve(&NodePath::foreign_key("Kitten", "FK_Kitten_Cat").address().unwrap())
            .unwrap();
        assert!(matches!(fk, Node::ForeignKey(fk) if fk.referenced_table().unwrap().name() == "Cat"));

        assert!(schema
            .resolve(&NodePath::column("Cat", "Whiskers").address().unwrap())
            .is_none());
        assert!(schema.resolve(&NodePath::full_text_index("Cat").address().unwrap()).is_none());
    }

    #[test]
    fn type_family_changes() {
        use ColumnTypeFamily::*;

        assert_eq!(Int.change_to(&BigInt), ColumnTypeChange::SafeCast);
        assert_eq!(BigInt.change_to(&Int), ColumnTypeChange::RiskyCast);
        assert_eq!(
            String { length: Some(10) }.change_to(&String { length: Some(20) }),
            ColumnTypeChange::SafeCast
        );
        assert_eq!(
            String { length: None }.change_to(&String { length: Some(20) }),
            ColumnTypeChange::RiskyCast
        );
        assert_eq!(Geometry.change_to(&Int), ColumnTypeChange::NotCastable);
        assert!(!Binary { length: None }.change_to(&DateTime).is_convertible());
    }
}
