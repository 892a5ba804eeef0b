use super::{
    common::{foreign_key_action, format_hex, sort_order, Quoted},
    SqlRenderer,
};
use crate::flavour::PostgresFlavour;
use sql_ddl::{postgres as ddl, IndexColumn};
use sql_schema_model::{
    ColumnTypeFamily, ColumnWalker, DefaultKind, DefaultValue, ForeignKey, FullTextIndex, PrimaryKey, ScalarValue,
    SecondaryIndex, Sequence, TableWalker,
};
use std::borrow::Cow;

const GENERATOR_COLUMN: &str = "ID";
const FILLER_COLUMN: &str = "Filler";

impl PostgresFlavour {
    fn render_column<'a>(&self, column: ColumnWalker<'a>) -> ddl::Column<'a> {
        ddl::Column {
            name: column.name().into(),
            r#type: self.render_column_type(column.column_type_family()),
            not_null: !column.is_nullable(),
            default: column
                .default()
                .map(|default| Cow::Owned(self.render_default(column.table().name(), column.name(), default))),
            identity: None,
        }
    }
}

impl SqlRenderer for PostgresFlavour {
    fn quote<'a>(&self, name: &'a str) -> Quoted<&'a str> {
        Quoted::postgres_ident(name)
    }

    fn render_column_type(&self, family: &ColumnTypeFamily) -> Cow<'static, str> {
        match family {
            ColumnTypeFamily::Int => "integer".into(),
            ColumnTypeFamily::BigInt => "bigint".into(),
            ColumnTypeFamily::Float => "double precision".into(),
            ColumnTypeFamily::Decimal { precision, scale } => format!("decimal({precision},{scale})").into(),
            ColumnTypeFamily::Boolean => "boolean".into(),
            ColumnTypeFamily::String { length: Some(length) } => format!("varchar({length})").into(),
            ColumnTypeFamily::String { length: None } => "text".into(),
            ColumnTypeFamily::DateTime => "timestamp(3)".into(),
            ColumnTypeFamily::Uuid => "uuid".into(),
            ColumnTypeFamily::Binary { .. } => "bytea".into(),
            ColumnTypeFamily::Geometry => "geometry".into(),
            ColumnTypeFamily::Geography => "geography".into(),
        }
    }

    fn render_literal(&self, value: &ScalarValue) -> String {
        match value {
            ScalarValue::Null => "NULL".to_owned(),
            ScalarValue::Boolean(true) => "true".to_owned(),
            ScalarValue::Boolean(false) => "false".to_owned(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Float(f) => f.to_string(),
            ScalarValue::String(s) => Quoted::postgres_string(s).to_string(),
            ScalarValue::Bytes(bytes) => format!("'\\x{}'", format_hex(bytes)),
        }
    }

    fn render_default(&self, _table: &str, _column: &str, default: &DefaultValue) -> String {
        match default.kind() {
            DefaultKind::Value(value) => self.render_literal(value),
            DefaultKind::Now => "CURRENT_TIMESTAMP".to_owned(),
            DefaultKind::Sequence(name) => format!("nextval({})", Quoted::postgres_string(self.quote(name))),
        }
    }

    fn render_create_table(&self, table: TableWalker<'_>, with_primary_key: bool) -> String {
        let primary_key = table.primary_key().filter(|_| with_primary_key).map(|pk| ddl::PrimaryKey {
            constraint_name: Some(pk.name.as_str().into()),
            columns: pk.columns.iter().map(|c| c.name.as_str().into()).collect(),
        });

        ddl::CreateTable {
            table_name: table.name().into(),
            columns: table.columns().map(|column| self.render_column(column)).collect(),
            primary_key,
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
        ddl::AlterTable {
            table_name: &self.quote(previous),
            clauses: vec![ddl::AlterTableClause::RenameTo(next.into())],
        }
        .to_string()
    }

    fn render_add_column(&self, column: ColumnWalker<'_>, transient_default: Option<&str>) -> Vec<String> {
        let table_name = self.quote(column.table().name());
        let mut definition = self.render_column(column);

        if let Some(default) = transient_default {
            definition.default = Some(default.into());
        }

        let mut statements = vec![ddl::AlterTable {
            table_name: &table_name,
            clauses: vec![ddl::AlterTableClause::AddColumn(definition)],
        }
        .to_string()];

        if transient_default.is_some() {
            statements.push(
                ddl::AlterTable {
                    table_name: &table_name,
                    clauses: vec![ddl::AlterTableClause::AlterColumnDropDefault(column.name().into())],
                }
                .to_string(),
            );
        }

        statements
    }

    fn render_drop_column(&self, column: ColumnWalker<'_>) -> Vec<String> {
        vec![ddl::AlterTable {
            table_name: &self.quote(column.table().name()),
            clauses: vec![ddl::AlterTableClause::DropColumn(column.name().into())],
        }
        .to_string()]
    }

    fn render_rename_column(&self, table_name: &str, previous: &str, next: &str) -> String {
        ddl::AlterTable {
            table_name: &self.quote(table_name),
            clauses: vec![ddl::AlterTableClause::RenameColumn {
                previous: previous.into(),
                next: next.into(),
            }],
        }
        .to_string()
    }

    fn render_drop_default(&self, column: ColumnWalker<'_>) -> Option<String> {
        column.default()?;

        Some(
            ddl::AlterTable {
                table_name: &self.quote(column.table().name()),
                clauses: vec![ddl::AlterTableClause::AlterColumnDropDefault(column.name().into())],
            }
            .to_string(),
        )
    }

    fn render_add_primary_key(&self, table_name: &str, primary_key: &PrimaryKey) -> String {
        ddl::AlterTable {
            table_name: &self.quote(table_name),
            clauses: vec![ddl::AlterTableClause::AddPrimaryKey(ddl::PrimaryKey {
                constraint_name: Some(primary_key.name.as_str().into()),
                columns: primary_key.columns.iter().map(|c| c.name.as_str().into()).collect(),
            })],
        }
        .to_string()
    }

    fn render_drop_constraint(&self, table_name: &str, constraint_name: &str) -> String {
        ddl::AlterTable {
            table_name: &self.quote(table_name),
            clauses: vec![ddl::AlterTableClause::DropConstraint(constraint_name.into())],
        }
        .to_string()
    }

    fn render_create_index(&self, table_name: &str, index: &SecondaryIndex, filter: Option<&str>) -> String {
        ddl::CreateIndex {
            index_name: index.name.as_str().into(),
            is_unique: index.unique,
            table_reference: &self.quote(table_name),
            columns: index
                .columns
                .iter()
                .map(|c| IndexColumn {
                    name: c.name.as_str().into(),
                    sort_order: sort_order(c.sort_order),
                })
                .collect(),
            spatial: false,
            where_clause: filter,
        }
        .to_string()
    }

    fn render_create_spatial_index(&self, table_name: &str, index_name: &str, column_name: &str) -> String {
        ddl::CreateIndex {
            index_name: index_name.into(),
            is_unique: false,
            table_reference: &self.quote(table_name),
            columns: vec![IndexColumn::new(column_name)],
            spatial: true,
            where_clause: None,
        }
        .to_string()
    }

    fn render_drop_index(&self, _table_name: &str, index_name: &str) -> String {
        ddl::DropIndex {
            index_name: index_name.into(),
        }
        .to_string()
    }

    fn render_add_foreign_key(&self, table_name: &str, foreign_key: &ForeignKey, deferrable: bool) -> String {
        ddl::AlterTable {
            table_name: &self.quote(table_name),
            clauses: vec![ddl::AlterTableClause::AddForeignKey(ddl::ForeignKey {
                constraint_name: Some(foreign_key.name.as_str().into()),
                constrained_columns: foreign_key.columns.iter().map(|c| c.as_str().into()).collect(),
                referenced_table: &self.quote(&foreign_key.referenced_table),
                referenced_columns: foreign_key.referenced_columns.iter().map(|c| c.as_str().into()).collect(),
                on_delete: foreign_key_action(foreign_key.on_delete),
                on_update: foreign_key_action(foreign_key.on_update),
                deferrable,
            })],
        }
        .to_string()
    }

    fn render_create_full_text_index(&self, table_name: &str, index: &FullTextIndex, _key_index: &str) -> String {
        ddl::CreateFullTextIndex {
            index_name: index.name.as_str().into(),
            table_reference: &self.quote(table_name),
            columns: index
                .columns
                .iter()
                .map(|c| (c.name.as_str().into(), c.language.as_deref().unwrap_or("simple").into()))
                .collect(),
        }
        .to_string()
    }

    fn render_drop_full_text_index(&self, _table_name: &str, index: &FullTextIndex) -> String {
        ddl::DropIndex {
            index_name: index.name.as_str().into(),
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
                r#type: "integer".into(),
                ..Default::default()
            });
        }

        ddl::CreateTable {
            table_name: sequence.name.as_str().into(),
            columns,
            primary_key: Some(ddl::PrimaryKey {
                constraint_name: None,
                columns: vec![GENERATOR_COLUMN.into()],
            }),
        }
        .to_string()
    }

    fn render_current_value_query(&self, sequence_name: &str, native: bool) -> String {
        if native {
            format!("SELECT last_value FROM {}", self.quote(sequence_name))
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
        let id = self.quote(GENERATOR_COLUMN);

        match (native, with_filler) {
            (true, _) => format!("SELECT nextval({})", Quoted::postgres_string(&table)),
            (false, false) => format!("INSERT INTO {table} DEFAULT VALUES RETURNING {id}"),
            (false, true) => format!(
                "INSERT INTO {table} ({}) VALUES (NULL) RETURNING {id}",
                self.quote(FILLER_COLUMN)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sql_schema_model::{Column, ColumnArity, SqlSchema, Table};

    fn cats() -> SqlSchema {
        let mut schema = SqlSchema::default();
        schema.push_table(
            Table::new("Cat")
                .with_column(Column::new("Id", ColumnTypeFamily::Int, ColumnArity::Required))
                .with_column(
                    Column::new("Name", ColumnTypeFamily::String { length: Some(50) }, ColumnArity::Required)
                        .with_default(DefaultValue::value("Felix")),
                )
                .with_column(Column::new("Born", ColumnTypeFamily::DateTime, ColumnArity::Nullable))
                .with_primary_key(PrimaryKey::new("PK_Cat", &["Id"])),
        );
        schema
    }

    #[test]
    fn create_table_with_inline_primary_key() {
        let schema = cats();
        let table = schema.table_walker("Cat").unwrap();

        let expected = indoc!(
            r#"
            CREATE TABLE "Cat" (
                "Id" integer NOT NULL,
                "Name" varchar(50) NOT NULL DEFAULT 'Felix',
                "Born" timestamp(3),
                CONSTRAINT "PK_Cat" PRIMARY KEY ("Id")
            )"#
        );

        assert_eq!(PostgresFlavour.render_create_table(table, true), expected);
        assert!(!PostgresFlavour.render_create_table(table, false).contains("PRIMARY KEY"));
    }

    #[test]
    fn add_column_with_transient_default() {
        let schema = cats();
        let column = schema.table_walker("Cat").unwrap().column("Id").unwrap();

        let statements = PostgresFlavour.render_add_column(column, Some("0"));

        expect![[r#"
            [
                "ALTER TABLE \"Cat\" ADD COLUMN \"Id\" integer NOT NULL DEFAULT 0",
                "ALTER TABLE \"Cat\" ALTER COLUMN \"Id\" DROP DEFAULT",
            ]
        "#]]
        .assert_debug_eq(&statements);
    }

    #[test]
    fn generator_tables() {
        let sequence = Sequence::new("OrderNumbers", 1000, 10);

        let expected = indoc!(
            r#"
            CREATE TABLE "OrderNumbers" (
                "ID" bigint GENERATED BY DEFAULT AS IDENTITY (START WITH 1000 INCREMENT BY 10) NOT NULL,
                "Filler" integer,
                PRIMARY KEY ("ID")
            )"#
        );

        assert_eq!(PostgresFlavour.render_create_generator_table(&sequence, true), expected);
        assert_eq!(
            PostgresFlavour.render_next_value_query("OrderNumbers", false, false),
            r#"INSERT INTO "OrderNumbers" DEFAULT VALUES RETURNING "ID""#
        );
        assert_eq!(
            PostgresFlavour.render_next_value_query("OrderNumbers", true, false),
            r#"SELECT nextval('"OrderNumbers"')"#
        );
        assert_eq!(
            PostgresFlavour.render_current_value_query("OrderNumbers", false),
            r#"SELECT MAX("ID") FROM "OrderNumbers""#
        );
    }

    #[test]
    fn literals() {
        assert_eq!(PostgresFlavour.render_literal(&ScalarValue::Bytes(vec![0xde, 0xad])), r"'\xDEAD'");
        assert_eq!(PostgresFlavour.render_literal(&ScalarValue::from("O'Hara")), "'O''Hara'");
        assert_eq!(PostgresFlavour.render_literal(&ScalarValue::Boolean(false)), "false");
    }
}
