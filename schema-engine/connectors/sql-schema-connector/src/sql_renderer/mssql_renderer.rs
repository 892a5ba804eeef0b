use super::{
    common::{foreign_key_action, format_hex, sort_order, Quoted},
    SqlRenderer,
};
use crate::flavour::MssqlFlavour;
use sql_ddl::{mssql as ddl, IndexColumn};
use sql_schema_model::{
    ColumnTypeFamily, ColumnWalker, DefaultKind, DefaultValue, ForeignKey, FullTextIndex, PrimaryKey, ScalarValue,
    SecondaryIndex, Sequence, TableWalker,
};
use std::borrow::Cow;

const GENERATOR_COLUMN: &str = "ID";
const FILLER_COLUMN: &str = "Filler";

impl MssqlFlavour {
    fn render_column<'a>(&self, column: ColumnWalker<'a>) -> ddl::Column<'a> {
        let table_name = column.table().name();

        ddl::Column {
            name: column.name().into(),
            r#type: self.render_column_type(column.column_type_family()),
            not_null: !column.is_nullable(),
            default: column.default().map(|default| {
                (
                    Cow::Owned(default_constraint_name(table_name, column.name(), default)),
                    Cow::Owned(self.render_default(table_name, column.name(), default)),
                )
            }),
            identity: None,
        }
    }

    fn render_primary_key<'a>(&self, primary_key: &'a PrimaryKey) -> ddl::PrimaryKey<'a> {
        ddl::PrimaryKey {
            constraint_name: primary_key.name.as_str().into(),
            columns: primary_key
                .columns
                .iter()
                .map(|c| IndexColumn {
                    name: c.name.as_str().into(),
                    sort_order: sort_order(c.sort_order),
                })
                .collect(),
            clustered: primary_key.clustered,
        }
    }
}

/// The name of the constraint holding a column default. Defaults created without an explicit name
/// get `DF_<table>_<column>`.
fn default_constraint_name(table_name: &str, column_name: &str, default: &DefaultValue) -> String {
    default
        .constraint_name()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("DF_{table_name}_{column_name}"))
}

impl SqlRenderer for MssqlFlavour {
    fn quote<'a>(&self, name: &'a str) -> Quoted<&'a str> {
        Quoted::mssql_ident(name)
    }

    fn render_column_type(&self, family: &ColumnTypeFamily) -> Cow<'static, str> {
        match family {
            ColumnTypeFamily::Int => "int".into(),
            ColumnTypeFamily::BigInt => "bigint".into(),
            ColumnTypeFamily::Float => "float".into(),
            ColumnTypeFamily::Decimal { precision, scale } => format!("decimal({precision},{scale})").into(),
            ColumnTypeFamily::Boolean => "bit".into(),
            ColumnTypeFamily::String { length: Some(length) } => format!("nvarchar({length})").into(),
            ColumnTypeFamily::String { length: None } => "nvarchar(max)".into(),
            ColumnTypeFamily::DateTime => "datetime2".into(),
            ColumnTypeFamily::Uuid => "uniqueidentifier".into(),
            ColumnTypeFamily::Binary { length: Some(length) } => format!("varbinary({length})").into(),
            ColumnTypeFamily::Binary { length: None } => "varbinary(max)".into(),
            ColumnTypeFamily::Geometry => "geometry".into(),
            ColumnTypeFamily::Geography => "geography".into(),
        }
    }

    fn render_literal(&self, value: &ScalarValue) -> String {
        match value {
            ScalarValue::Null => "NULL".to_owned(),
            ScalarValue::Boolean(b) => (*b as u8).to_string(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Float(f) => f.to_string(),
            ScalarValue::String(s) => format!("N{}", Quoted::mssql_string(s)),
            ScalarValue::Bytes(bytes) => format!("0x{}", format_hex(bytes)),
        }
    }

    fn render_default(&self, _table: &str, _column: &str, default: &DefaultValue) -> String {
        match default.kind() {
            DefaultKind::Value(value) => self.render_literal(value),
            DefaultKind::Now => "CURRENT_TIMESTAMP".to_owned(),
            DefaultKind::Sequence(name) => format!("NEXT VALUE FOR {}", self.quote(name)),
        }
    }

    fn render_create_table(&self, table: TableWalker<'_>, with_primary_key: bool) -> String {
        ddl::CreateTable {
            table_name: table.name().into(),
            columns: table.columns().map(|column| self.render_column(column)).collect(),
            primary_key: table
                .primary_key()
                .filter(|_| with_primary_key)
                .map(|pk| self.render_primary_key(pk)),
        }
        .to_string()
    }

    fn render_drop_table(&self, table_name: &str) -> String {
        ddl::DropTable {
            table_name: table_name.into(),
        }
        .to_string()
    }

    fn render_rename_table(&self, previous: &str, next: &str) -> String {
        ddl::Rename::Table {
            previous: previous.into(),
            next: next.into(),
        }
        .to_string()
    }

    fn render_add_column(&self, column: ColumnWalker<'_>, transient_default: Option<&str>) -> Vec<String> {
        let table_name = column.table().name();
        let table = self.quote(table_name);
        let transient_constraint = format!("DF_{}_{}", table_name, column.name());
        let mut definition = self.render_column(column);

        if let Some(default) = transient_default {
            definition.default = Some((transient_constraint.as_str().into(), default.into()));
        }

        let mut statements = vec![ddl::AlterTable {
            table_name: &table,
            clause: ddl::AlterTableClause::AddColumn(definition),
        }
        .to_string()];

        if transient_default.is_some() {
            statements.push(self.render_drop_constraint(table_name, &transient_constraint));
        }

        statements
    }

    fn render_drop_column(&self, column: ColumnWalker<'_>) -> Vec<String> {
        let table_name = column.table().name();
        let mut statements = Vec::with_capacity(2);

        // Columns with a default constraint cannot be dropped.
        if let Some(default) = column.default() {
            let constraint_name = default_constraint_name(table_name, column.name(), default);
            statements.push(self.render_drop_constraint(table_name, &constraint_name));
        }

        statements.push(
            ddl::AlterTable {
                table_name: &self.quote(table_name),
                clause: ddl::AlterTableClause::DropColumn(column.name().into()),
            }
            .to_string(),
        );

        statements
    }

    fn render_rename_column(&self, table_name: &str, previous: &str, next: &str) -> String {
        ddl::Rename::Column {
            table: table_name.into(),
            previous: previous.into(),
            next: next.into(),
        }
        .to_string()
    }

    fn render_drop_default(&self, column: ColumnWalker<'_>) -> Option<String> {
        let table_name = column.table().name();
        let constraint_name = default_constraint_name(table_name, column.name(), column.default()?);

        Some(self.render_drop_constraint(table_name, &constraint_name))
    }

    fn render_add_primary_key(&self, table_name: &str, primary_key: &PrimaryKey) -> String {
        ddl::AlterTable {
            table_name: &self.quote(table_name),
            clause: ddl::AlterTableClause::AddPrimaryKey(self.render_primary_key(primary_key)),
        }
        .to_string()
    }

    fn render_drop_constraint(&self, table_name: &str, constraint_name: &str) -> String {
        ddl::AlterTable {
            table_name: &self.quote(table_name),
            clause: ddl::AlterTableClause::DropConstraint(constraint_name.into()),
        }
        .to_string()
    }

    fn render_create_index(&self, table_name: &str, index: &SecondaryIndex, filter: Option<&str>) -> String {
        ddl::CreateIndex {
            index_name: index.name.as_str().into(),
            table_reference: &self.quote(table_name),
            columns: index
                .columns
                .iter()
                .map(|c| IndexColumn {
                    name: c.name.as_str().into(),
                    sort_order: sort_order(c.sort_order),
                })
                .collect(),
            is_unique: index.unique,
            clustered: index.clustered,
            where_clause: filter,
        }
        .to_string()
    }

    fn render_create_spatial_index(&self, table_name: &str, index_name: &str, column_name: &str) -> String {
        ddl::CreateSpatialIndex {
            index_name: index_name.into(),
            table_reference: &self.quote(table_name),
            column: column_name.into(),
        }
        .to_string()
    }

    fn render_drop_index(&self, table_name: &str, index_name: &str) -> String {
        ddl::DropIndex {
            index_name: index_name.into(),
            table_reference: &self.quote(table_name),
        }
        .to_string()
    }

    fn render_add_foreign_key(&self, table_name: &str, foreign_key: &ForeignKey, _deferrable: bool) -> String {
        ddl::AlterTable {
            table_name: &self.quote(table_name),
            clause: ddl::AlterTableClause::AddForeignKey(ddl::ForeignKey {
                constraint_name: foreign_key.name.as_str().into(),
                constrained_columns: foreign_key.columns.iter().map(|c| c.as_str().into()).collect(),
                referenced_table: &self.quote(&foreign_key.referenced_table),
                referenced_columns: foreign_key.referenced_columns.iter().map(|c| c.as_str().into()).collect(),
                on_delete: foreign_key_action(foreign_key.on_delete),
                on_update: foreign_key_action(foreign_key.on_update),
            }),
        }
        .to_string()
    }

    fn render_create_full_text_index(&self, table_name: &str, index: &FullTextIndex, key_index: &str) -> String {
        ddl::CreateFullTextIndex {
            table_reference: &self.quote(table_name),
            columns: index
                .columns
                .iter()
                .map(|c| (c.name.as_str().into(), c.language.as_deref().map(Cow::from)))
                .collect(),
            key_index: key_index.into(),
        }
        .to_string()
    }

    fn render_drop_full_text_index(&self, table_name: &str, _index: &FullTextIndex) -> String {
        ddl::DropFullTextIndex {
            table_reference: &self.quote(table_name),
        }
        .to_string()
    }

    fn render_create_sequence(&self, sequence: &Sequence) -> String {
        ddl::CreateSequence {
            sequence_name: sequence.name.as_str().into(),
            start: sequence.seed,
            increment: sequence.increment,
        }
        .to_string()
    }

    fn render_drop_sequence(&self, sequence_name: &str) -> String {
        ddl::DropSequence {
            sequence_name: sequence_name.into(),
        }
        .to_string()
    }

    fn render_restart_sequence(&self, sequence_name: &str, restart_with: i64, increment: i64) -> String {
        ddl::AlterSequence {
            sequence_name: sequence_name.into(),
            restart_with: Some(restart_with),
            increment: Some(increment),
        }
        .to_string()
    }

    fn render_create_generator_table(&self, sequence: &Sequence, with_filler: bool) -> String {
        let mut columns = vec![ddl::Column {
            name: GENERATOR_COLUMN.into(),
            r#type: "bigint".into(),
            not_null: true,
            default: None,
            identity: Some((sequence.seed, sequence.increment)),
        }];

        if with_filler {
            columns.push(ddl::Column {
                name: FILLER_COLUMN.into(),
                r#type: "int".into(),
                ..Default::default()
            });
        }

        let constraint_name = format!("PK_{}", sequence.name);

        ddl::CreateTable {
            table_name: sequence.name.as_str().into(),
            columns,
            primary_key: Some(ddl::PrimaryKey {
                constraint_name: constraint_name.into(),
                columns: vec![IndexColumn::new(GENERATOR_COLUMN)],
                clustered: true,
            }),
        }
        .to_string()
    }

    fn render_current_value_query(&self, sequence_name: &str, native: bool) -> String {
        if native {
            format!(
                "SELECT CAST(current_value AS bigint) FROM sys.sequences WHERE name = {}",
                Quoted::mssql_string(sequence_name)
            )
        } else {
            format!(
                "SELECT MAX({}) FROM {}",
                self.quote(GENERATOR_COLUMN),
                self.quote(sequence_name)
            )
        }
    }

    fn render_next_value_query(&self, sequence_name: &str, native: bool, with_filler: bool) -> String {
        let table = self.quote(sequence_name);

        match (native, with_filler) {
            (true, _) => format!("SELECT NEXT VALUE FOR {table}"),
            (false, false) => {
                format!("INSERT INTO {table} DEFAULT VALUES; SELECT CAST(SCOPE_IDENTITY() AS bigint)")
            }
            (false, true) => format!(
                "INSERT INTO {table} ({}) VALUES (NULL); SELECT CAST(SCOPE_IDENTITY() AS bigint)",
                self.quote(FILLER_COLUMN)
            ),
        }
    }
}
