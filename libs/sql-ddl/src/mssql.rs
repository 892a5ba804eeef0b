//! SQL Server statements. Identifiers are bracket-quoted, and renames go through `sp_rename`.

use crate::common::{ForeignKeyAction, IndexColumn, IteratorJoin, StrLit};
use std::{
    borrow::Cow,
    fmt::{self, Display},
};

/// A bracket-quoted identifier, optionally qualified with a schema.
///
/// ```
/// # use sql_ddl::mssql::MssqlIdentifier;
///
/// assert_eq!(MssqlIdentifier::from(("dbo", "Cat")).to_string(), "[dbo].[Cat]");
/// assert_eq!(MssqlIdentifier::from("we]ird").to_string(), "[we]]ird]");
/// ```
#[derive(Debug)]
pub enum MssqlIdentifier<'a> {
    Simple(Cow<'a, str>),
    WithSchema(Cow<'a, str>, Cow<'a, str>),
}

impl<'a> MssqlIdentifier<'a> {
    pub fn new(schema: Option<&'a str>, name: &'a str) -> Self {
        match schema {
            Some(schema) => MssqlIdentifier::WithSchema(schema.into(), name.into()),
            None => MssqlIdentifier::Simple(name.into()),
        }
    }

    /// The unquoted, dot-separated form expected by `sp_rename`.
    fn unquoted(&self) -> String {
        match self {
            MssqlIdentifier::Simple(name) => name.to_string(),
            MssqlIdentifier::WithSchema(schema, name) => format!("{schema}.{name}"),
        }
    }
}

impl<'a> From<&'a str> for MssqlIdentifier<'a> {
    fn from(s: &'a str) -> Self {
        MssqlIdentifier::Simple(Cow::Borrowed(s))
    }
}

impl<'a> From<(&'a str, &'a str)> for MssqlIdentifier<'a> {
    fn from((schema, name): (&'a str, &'a str)) -> Self {
        MssqlIdentifier::WithSchema(Cow::Borrowed(schema), Cow::Borrowed(name))
    }
}

impl Display for MssqlIdentifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MssqlIdentifier::Simple(name) => Ident(name).fmt(f),
            MssqlIdentifier::WithSchema(schema, name) => {
                Ident(schema).fmt(f)?;
                f.write_str(".")?;
                Ident(name).fmt(f)
            }
        }
    }
}

pub struct Ident<'a>(pub &'a str);

impl Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.replace(']', "]]"))
    }
}

#[derive(Debug, Default)]
pub struct Column<'a> {
    pub name: Cow<'a, str>,
    pub r#type: Cow<'a, str>,
    pub not_null: bool,
    /// The default constraint name and expression.
    pub default: Option<(Cow<'a, str>, Cow<'a, str>)>,
    /// `IDENTITY(seed, increment)`
    pub identity: Option<(i64, i64)>,
}

impl Display for Column<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", Ident(&self.name), self.r#type)?;

        if let Some((seed, increment)) = self.identity {
            write!(f, " IDENTITY({seed}, {increment})")?;
        }

        f.write_str(if self.not_null { " NOT NULL" } else { " NULL" })?;

        if let Some((constraint_name, expression)) = &self.default {
            write!(f, " CONSTRAINT {} DEFAULT {}", Ident(constraint_name), expression)?;
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct PrimaryKey<'a> {
    pub constraint_name: Cow<'a, str>,
    pub columns: Vec<IndexColumn<'a>>,
    pub clustered: bool,
}

impl Display for PrimaryKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CONSTRAINT {} PRIMARY KEY {}(",
            Ident(&self.constraint_name),
            if self.clustered { "CLUSTERED " } else { "NONCLUSTERED " }
        )?;
        render_index_columns(&self.columns, f)?;
        f.write_str(")")
    }
}

pub struct CreateTable<'a> {
    pub table_name: MssqlIdentifier<'a>,
    pub columns: Vec<Column<'a>>,
    pub primary_key: Option<PrimaryKey<'a>>,
}

impl Display for CreateTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE TABLE {} (\n", self.table_name)?;

        let mut lines = self.columns.iter().map(|c| format!("    {c}")).collect::<Vec<_>>();

        if let Some(pk) = &self.primary_key {
            lines.push(format!("    {pk}"));
        }

        lines.iter().join(",\n", f)?;
        f.write_str("\n)")
    }
}

pub struct AlterTable<'a> {
    pub table_name: &'a dyn Display,
    pub clause: AlterTableClause<'a>,
}

impl Display for AlterTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER TABLE {} {}", self.table_name, self.clause)
    }
}

pub enum AlterTableClause<'a> {
    AddColumn(Column<'a>),
    AddPrimaryKey(PrimaryKey<'a>),
    AddForeignKey(ForeignKey<'a>),
    DropColumn(Cow<'a, str>),
    DropConstraint(Cow<'a, str>),
}

impl Display for AlterTableClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterTableClause::AddColumn(column) => write!(f, "ADD {column}"),
            AlterTableClause::AddPrimaryKey(pk) => write!(f, "ADD {pk}"),
            AlterTableClause::AddForeignKey(fk) => write!(f, "ADD {fk}"),
            AlterTableClause::DropColumn(name) => write!(f, "DROP COLUMN {}", Ident(name)),
            AlterTableClause::DropConstraint(name) => write!(f, "DROP CONSTRAINT {}", Ident(name)),
        }
    }
}

pub struct ForeignKey<'a> {
    pub constraint_name: Cow<'a, str>,
    pub constrained_columns: Vec<Cow<'a, str>>,
    pub referenced_table: &'a dyn Display,
    pub referenced_columns: Vec<Cow<'a, str>>,
    pub on_delete: Option<ForeignKeyAction>,
    pub on_update: Option<ForeignKeyAction>,
}

impl Display for ForeignKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CONSTRAINT {} FOREIGN KEY (", Ident(&self.constraint_name))?;
        self.constrained_columns.iter().map(|c| Ident(c)).join(", ", f)?;
        write!(f, ") REFERENCES {} (", self.referenced_table)?;
        self.referenced_columns.iter().map(|c| Ident(c)).join(", ", f)?;
        f.write_str(")")?;

        // SQL Server has no RESTRICT; NO ACTION is the closest equivalent.
        let render = |action: &ForeignKeyAction| match action {
            ForeignKeyAction::Restrict => ForeignKeyAction::NoAction,
            other => *other,
        };

        if let Some(on_delete) = &self.on_delete {
            write!(f, " ON DELETE {}", render(on_delete))?;
        }

        if let Some(on_update) = &self.on_update {
            write!(f, " ON UPDATE {}", render(on_update))?;
        }

        Ok(())
    }
}

pub struct CreateIndex<'a> {
    pub index_name: Cow<'a, str>,
    pub table_reference: &'a dyn Display,
    pub columns: Vec<IndexColumn<'a>>,
    pub is_unique: bool,
    pub clustered: bool,
    pub where_clause: Option<&'a str>,
}

impl Display for CreateIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CREATE {}{}INDEX {} ON {} (",
            if self.is_unique { "UNIQUE " } else { "" },
            if self.clustered { "CLUSTERED " } else { "NONCLUSTERED " },
            Ident(&self.index_name),
            self.table_reference
        )?;
        render_index_columns(&self.columns, f)?;
        f.write_str(")")?;

        if let Some(where_clause) = self.where_clause {
            write!(f, " WHERE {where_clause}")?;
        }

        Ok(())
    }
}

/// ```
/// # use sql_ddl::mssql::{CreateSpatialIndex, MssqlIdentifier};
///
/// let create = CreateSpatialIndex {
///     index_name: "IX_Shape".into(),
///     table_reference: &MssqlIdentifier::from("Map"),
///     column: "Shape".into(),
/// };
/// assert_eq!(create.to_string(), "CREATE SPATIAL INDEX [IX_Shape] ON [Map] ([Shape])");
/// ```
pub struct CreateSpatialIndex<'a> {
    pub index_name: Cow<'a, str>,
    pub table_reference: &'a dyn Display,
    pub column: Cow<'a, str>,
}

impl Display for CreateSpatialIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CREATE SPATIAL INDEX {} ON {} ({})",
            Ident(&self.index_name),
            self.table_reference,
            Ident(&self.column)
        )
    }
}

pub struct CreateFullTextIndex<'a> {
    pub table_reference: &'a dyn Display,
    /// Column name and optional language.
    pub columns: Vec<(Cow<'a, str>, Option<Cow<'a, str>>)>,
    pub key_index: Cow<'a, str>,
}

impl Display for CreateFullTextIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE FULLTEXT INDEX ON {} (", self.table_reference)?;

        self.columns
            .iter()
            .map(|(name, language)| match language {
                Some(language) => format!("{} LANGUAGE {}", Ident(name), StrLit(language)),
                None => Ident(name).to_string(),
            })
            .join(", ", f)?;

        write!(f, ") KEY INDEX {} WITH CHANGE_TRACKING AUTO", Ident(&self.key_index))
    }
}

pub struct DropFullTextIndex<'a> {
    pub table_reference: &'a dyn Display,
}

impl Display for DropFullTextIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP FULLTEXT INDEX ON {}", self.table_reference)
    }
}

pub struct DropIndex<'a> {
    pub index_name: Cow<'a, str>,
    pub table_reference: &'a dyn Display,
}

impl Display for DropIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP INDEX {} ON {}", Ident(&self.index_name), self.table_reference)
    }
}

pub struct DropTable<'a> {
    pub table_name: MssqlIdentifier<'a>,
}

impl Display for DropTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP TABLE {}", self.table_name)
    }
}

/// `EXEC sp_rename` for tables and columns.
///
/// ```
/// # use sql_ddl::mssql::{MssqlIdentifier, Rename};
///
/// let rename = Rename::Column {
///     table: MssqlIdentifier::from(("dbo", "Cat")),
///     previous: "name".into(),
///     next: "nickname".into(),
/// };
/// assert_eq!(rename.to_string(), "EXEC sp_rename 'dbo.Cat.name', 'nickname', 'COLUMN'");
/// ```
pub enum Rename<'a> {
    Table {
        previous: MssqlIdentifier<'a>,
        next: Cow<'a, str>,
    },
    Column {
        table: MssqlIdentifier<'a>,
        previous: Cow<'a, str>,
        next: Cow<'a, str>,
    },
}

impl Display for Rename<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rename::Table { previous, next } => {
                write!(f, "EXEC sp_rename {}, {}", StrLit(&previous.unquoted()), StrLit(next))
            }
            Rename::Column { table, previous, next } => write!(
                f,
                "EXEC sp_rename {}, {}, 'COLUMN'",
                StrLit(&format!("{}.{}", table.unquoted(), previous)),
                StrLit(next)
            ),
        }
    }
}

pub struct CreateSequence<'a> {
    pub sequence_name: MssqlIdentifier<'a>,
    pub start: i64,
    pub increment: i64,
}

impl Display for CreateSequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CREATE SEQUENCE {} AS bigint START WITH {} INCREMENT BY {}",
            self.sequence_name, self.start, self.increment
        )
    }
}

pub struct AlterSequence<'a> {
    pub sequence_name: MssqlIdentifier<'a>,
    pub restart_with: Option<i64>,
    pub increment: Option<i64>,
}

impl Display for AlterSequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER SEQUENCE {}", self.sequence_name)?;

        if let Some(restart_with) = self.restart_with {
            write!(f, " RESTART WITH {restart_with}")?;
        }

        if let Some(increment) = self.increment {
            write!(f, " INCREMENT BY {increment}")?;
        }

        Ok(())
    }
}

pub struct DropSequence<'a> {
    pub sequence_name: MssqlIdentifier<'a>,
}

impl Display for DropSequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP SEQUENCE {}", self.sequence_name)
    }
}

fn render_index_columns(columns: &[IndexColumn<'_>], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    columns
        .iter()
        .map(|c| match c.sort_order {
            Some(sort_order) => format!("{} {}", Ident(&c.name), sort_order.as_ref()),
            None => Ident(&c.name).to_string(),
        })
        .join(", ", f)
}
