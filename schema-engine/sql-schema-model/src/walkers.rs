//! Read-only views over nodes of a schema, holding a reference back to their parent.

use crate::{
    Column, ColumnArity, ColumnTypeFamily, DefaultValue, ForeignKey, FullTextIndex, NodePath, PrimaryKey,
    SecondaryIndex, Sequence, SqlSchema, Table,
};

/// A located node of the schema tree.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Catalog(&'a SqlSchema),
    Table(TableWalker<'a>),
    Column(ColumnWalker<'a>),
    PrimaryKey(TableWalker<'a>, &'a PrimaryKey),
    SecondaryIndex(TableWalker<'a>, &'a SecondaryIndex),
    ForeignKey(ForeignKeyWalker<'a>),
    FullTextIndex(TableWalker<'a>, &'a FullTextIndex),
    Sequence(&'a Sequence),
}

impl<'a> Node<'a> {
    /// The table the node belongs to, for table children.
    pub fn table(&self) -> Option<TableWalker<'a>> {
        match self {
            Node::Table(table)
            | Node::PrimaryKey(table, _)
            | Node::SecondaryIndex(table, _)
            | Node::FullTextIndex(table, _) => Some(*table),
            Node::Column(column) => Some(column.table()),
            Node::ForeignKey(fk) => Some(fk.table()),
            Node::Catalog(_) | Node::Sequence(_) => None,
        }
    }

    /// A short description of the node, for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Node::Catalog(_) => "the catalog".to_owned(),
            Node::Table(table) => format!("table `{}`", table.name()),
            Node::Column(column) => format!("column `{}`.`{}`", column.table().name(), column.name()),
            Node::PrimaryKey(table, pk) => format!("primary key `{}` on `{}`", pk.name, table.name()),
            Node::SecondaryIndex(table, index) => format!("index `{}` on `{}`", index.name, table.name()),
            Node::ForeignKey(fk) => format!("foreign key `{}` on `{}`", fk.name(), fk.table().name()),
            Node::FullTextIndex(table, index) => format!("full-text index `{}` on `{}`", index.name, table.name()),
            Node::Sequence(sequence) => format!("sequence `{}`", sequence.name),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableWalker<'a> {
    pub schema: &'a SqlSchema,
    pub table: &'a Table,
}

impl<'a> TableWalker<'a> {
    pub fn new(schema: &'a SqlSchema, table: &'a Table) -> Self {
        Self { schema, table }
    }

    pub fn name(self) -> &'a str {
        &self.table.name
    }

    pub fn path(self) -> NodePath {
        NodePath::table(self.name())
    }

    pub fn column(self, column_name: &str) -> Option<ColumnWalker<'a>> {
        self.columns().find(|column| column.name() == column_name)
    }

    pub fn columns(self) -> impl ExactSizeIterator<Item = ColumnWalker<'a>> {
        self.table.columns.iter().map(move |column| ColumnWalker { table: self, column })
    }

    pub fn primary_key(self) -> Option<&'a PrimaryKey> {
        self.table.primary_key.as_ref()
    }

    pub fn index(self, name: &str) -> Option<&'a SecondaryIndex> {
        self.table.indexes.iter().find(|idx| idx.name == name)
    }

    pub fn foreign_key(self, name: &str) -> Option<ForeignKeyWalker<'a>> {
        self.foreign_keys().find(|fk| fk.name() == name)
    }

    pub fn foreign_keys(self) -> impl ExactSizeIterator<Item = ForeignKeyWalker<'a>> {
        self.table
            .foreign_keys
            .iter()
            .map(move |foreign_key| ForeignKeyWalker { table: self, foreign_key })
    }

    pub fn full_text_index(self) -> Option<&'a FullTextIndex> {
        self.table.full_text_index.as_ref()
    }

    /// The names of the tables this table references through its foreign keys.
    pub fn referenced_tables(self) -> impl Iterator<Item = &'a str> {
        self.table.foreign_keys.iter().map(|fk| fk.referenced_table.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnWalker<'a> {
    table: TableWalker<'a>,
    column: &'a Column,
}

impl<'a> ColumnWalker<'a> {
    pub fn name(self) -> &'a str {
        &self.column.name
    }

    pub fn path(self) -> NodePath {
        NodePath::column(self.table.name(), self.name())
    }

    pub fn arity(self) -> ColumnArity {
        self.column.tpe.arity
    }

    pub fn is_nullable(self) -> bool {
        self.arity().is_nullable()
    }

    pub fn column_type_family(self) -> &'a ColumnTypeFamily {
        &self.column.tpe.family
    }

    pub fn default(self) -> Option<&'a DefaultValue> {
        self.column.default.as_ref()
    }

    pub fn is_type_discriminator(self) -> bool {
        self.column.is_type_discriminator
    }

    /// Is the column part of the table's primary key?
    pub fn is_in_primary_key(self) -> bool {
        self.table.table.is_primary_key_column(self.name())
    }

    pub fn inner(self) -> &'a Column {
        self.column
    }

    pub fn table(self) -> TableWalker<'a> {
        self.table
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKeyWalker<'a> {
    table: TableWalker<'a>,
    foreign_key: &'a ForeignKey,
}

impl<'a> ForeignKeyWalker<'a> {
    pub fn name(self) -> &'a str {
        &self.foreign_key.name
    }

    pub fn inner(self) -> &'a ForeignKey {
        self.foreign_key
    }

    pub fn table(self) -> TableWalker<'a> {
        self.table
    }

    /// `None` when the referenced table is not part of the schema.
    pub fn referenced_table(self) -> Option<TableWalker<'a>> {
        self.table.schema.table_walker(&self.foreign_key.referenced_table)
    }

    pub fn constrained_columns(self) -> impl Iterator<Item = ColumnWalker<'a>> {
        self.foreign_key
            .columns
            .iter()
            .filter_map(move |name| self.table.column(name))
    }
}
