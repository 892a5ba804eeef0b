mod common;
mod mssql_renderer;
mod postgres_renderer;

pub use common::Quoted;

pub(crate) use common::{zero_value, IteratorJoin};

use sql_schema_model::{
    ColumnTypeFamily, ColumnWalker, DefaultValue, ForeignKey, FullTextIndex, PrimaryKey, ScalarValue,
    SecondaryIndex, Sequence, TableWalker,
};
use std::borrow::Cow;

/// Rendering of schema changes to the SQL of one dialect.
pub trait SqlRenderer {
    fn quote<'a>(&self, name: &'a str) -> Quoted<&'a str>;

    fn render_column_type(&self, family: &ColumnTypeFamily) -> Cow<'static, str>;

    fn render_literal(&self, value: &ScalarValue) -> String;

    fn render_default(&self, table: &str, column: &str, default: &DefaultValue) -> String;

    /// `CREATE TABLE` with all the columns of the table. The primary key is rendered inline when
    /// `with_primary_key` is set.
    fn render_create_table(&self, table: TableWalker<'_>, with_primary_key: bool) -> String;

    fn render_drop_table(&self, table_name: &str) -> String;

    fn render_rename_table(&self, previous: &str, next: &str) -> String;

    /// Add a column. When `transient_default` is set, the column is added with that default, which
    /// is dropped right after.
    fn render_add_column(&self, column: ColumnWalker<'_>, transient_default: Option<&str>) -> Vec<String>;

    fn render_drop_column(&self, column: ColumnWalker<'_>) -> Vec<String>;

    fn render_rename_column(&self, table_name: &str, previous: &str, next: &str) -> String;

    /// `None` when the column has no default.
    fn render_drop_default(&self, column: ColumnWalker<'_>) -> Option<String>;

    fn render_add_primary_key(&self, table_name: &str, primary_key: &PrimaryKey) -> String;

    /// Drop a primary or foreign key.
    fn render_drop_constraint(&self, table_name: &str, constraint_name: &str) -> String;

    fn render_create_index(&self, table_name: &str, index: &SecondaryIndex, filter: Option<&str>) -> String;

    fn render_create_spatial_index(&self, table_name: &str, index_name: &str, column_name: &str) -> String;

    fn render_drop_index(&self, table_name: &str, index_name: &str) -> String;

    fn render_add_foreign_key(&self, table_name: &str, foreign_key: &ForeignKey, deferrable: bool) -> String;

    fn render_create_full_text_index(&self, table_name: &str, index: &FullTextIndex, key_index: &str) -> String;

    fn render_drop_full_text_index(&self, table_name: &str, index: &FullTextIndex) -> String;

    fn render_create_sequence(&self, sequence: &Sequence) -> String;

    fn render_drop_sequence(&self, sequence_name: &str) -> String;

    fn render_restart_sequence(&self, sequence_name: &str, restart_with: i64, increment: i64) -> String;

    /// A table with a single identity column standing in for a sequence. The nullable filler column
    /// makes rows insertable without `DEFAULT VALUES`.
    fn render_create_generator_table(&self, sequence: &Sequence, with_filler: bool) -> String;

    /// The query returning the last value handed out by a sequence, or by its generator table.
    fn render_current_value_query(&self, sequence_name: &str, native: bool) -> String;

    /// The statement(s) producing the next value of a sequence, or of its generator table.
    fn render_next_value_query(&self, sequence_name: &str, native: bool, with_filler: bool) -> String;

    fn render_set_constraints(&self, deferred: bool) -> String {
        format!("SET CONSTRAINTS ALL {}", if deferred { "DEFERRED" } else { "IMMEDIATE" })
    }

    fn render_cast(&self, expression: &str, family: &ColumnTypeFamily) -> String {
        format!("CAST({} AS {})", expression, self.render_column_type(family))
    }

    /// Fill `column` from `source_column` of the same table. Null values are replaced with
    /// `fallback` when there is one.
    fn render_copy_column(&self, column: ColumnWalker<'_>, source_column: &str, fallback: Option<&str>) -> String {
        let source = self.quote(source_column).to_string();
        let cast = self.render_cast(&source, column.column_type_family());

        let value = match fallback {
            Some(fallback) => format!("CASE WHEN {source} IS NULL THEN {fallback} ELSE {cast} END"),
            None => cast,
        };

        format!(
            "UPDATE {} SET {} = {}",
            self.quote(column.table().name()),
            self.quote(column.name()),
            value
        )
    }

    /// `INSERT INTO .. SELECT ..`, copying every `(source, target)` column pair.
    fn render_insert_select(&self, source_table: &str, target_table: &str, columns: &[(&str, &str)]) -> String {
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            self.quote(target_table),
            columns.iter().map(|(_, target)| self.quote(target)).join(", "),
            columns.iter().map(|(source, _)| self.quote(source)).join(", "),
            self.quote(source_table),
        )
    }
}
