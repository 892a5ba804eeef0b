use crate::common::{ForeignKeyAction, IndexColumn, IteratorJoin, StrLit};
use std::{
    borrow::Cow,
    fmt::{self, Display},
};

pub struct AlterTable<'a> {
    pub table_name: &'a dyn Display,
    pub clauses: Vec<AlterTableClause<'a>>,
}

impl Display for AlterTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ALTER TABLE ")?;
        self.table_name.fmt(f)?;
        f.write_str(" ")?;
        self.clauses.iter().join(", ", f)
    }
}

pub enum AlterTableClause<'a> {
    AddColumn(Column<'a>),
    AddForeignKey(ForeignKey<'a>),
    AddPrimaryKey(PrimaryKey<'a>),
    AlterColumnDropDefault(Cow<'a, str>),
    DropColumn(Cow<'a, str>),
    DropConstraint(Cow<'a, str>),
    RenameColumn { previous: Cow<'a, str>, next: Cow<'a, str> },
    RenameTo(Cow<'a, str>),
}

impl Display for AlterTableClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            AlterTableClause::AddColumn(col) => {
                f.write_str("ADD COLUMN ")?;
                Display::fmt(col, f)
            }
            AlterTableClause::AddForeignKey(fk) => {
                f.write_str("ADD ")?;
                Display::fmt(fk, f)
            }
            AlterTableClause::AddPrimaryKey(pk) => {
                f.write_str("ADD ")?;
                Display::fmt(pk, f)
            }
            AlterTableClause::AlterColumnDropDefault(colname) => {
                write!(f, "ALTER COLUMN {} DROP DEFAULT", Ident(colname))
            }
            AlterTableClause::DropColumn(colname) => {
                f.write_str("DROP COLUMN ")?;
                Display::fmt(&Ident(colname), f)
            }
            AlterTableClause::DropConstraint(constraint_name) => {
                f.write_str("DROP CONSTRAINT ")?;
                Display::fmt(&Ident(constraint_name), f)
            }
            AlterTableClause::RenameColumn { previous, next } => {
                write!(f, "RENAME COLUMN {} TO {}", Ident(previous), Ident(next))
            }
            AlterTableClause::RenameTo(to) => {
                f.write_str("RENAME TO ")?;
                Display::fmt(&Ident(to), f)
            }
        }
    }
}

/// A column definition, as it appears in `CREATE TABLE` and `ADD COLUMN`.
///
/// ```
/// # use sql_ddl::postgres::Column;
///
/// let column = Column { name: "age".into(), r#type: "integer".into(), not_null: true, ..Default::default() };
/// assert_eq!(column.to_string(), r#""age" integer NOT NULL"#);
/// ```
#[derive(Debug, Default)]
pub struct Column<'a> {
    pub name: Cow<'a, str>,
    pub r#type: Cow<'a, str>,
    pub not_null: bool,
    pub default: Option<Cow<'a, str>>,
    /// `GENERATED BY DEFAULT AS IDENTITY (START WITH .. INCREMENT BY ..)`
    pub identity: Option<(i64, i64)>,
}

impl Display for Column<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&Ident(&self.name), f)?;
        f.write_str(" ")?;
        f.write_str(self.r#type.as_ref())?;

        if let Some((start, increment)) = self.identity {
            write!(
                f,
                " GENERATED BY DEFAULT AS IDENTITY (START WITH {start} INCREMENT BY {increment})"
            )?;
        }

        if self.not_null {
            f.write_str(" NOT NULL")?;
        }

        if let Some(default) = &self.default {
            f.write_str(" DEFAULT ")?;
            f.write_str(default)?;
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct PrimaryKey<'a> {
    pub constraint_name: Option<Cow<'a, str>>,
    pub columns: Vec<Cow<'a, str>>,
}

impl Display for PrimaryKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(constraint_name) = &self.constraint_name {
            write!(f, "CONSTRAINT {} ", Ident(constraint_name))?;
        }

        f.write_str("PRIMARY KEY (")?;
        self.columns.iter().map(|c| Ident(c)).join(", ", f)?;
        f.write_str(")")
    }
}

/// Render a `CREATE TABLE` statement. The primary key, when present, is rendered inline.
pub struct CreateTable<'a> {
    pub table_name: Cow<'a, str>,
    pub columns: Vec<Column<'a>>,
    pub primary_key: Option<PrimaryKey<'a>>,
}

impl Display for CreateTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CREATE TABLE {} (", Ident(&self.table_name))?;

        let mut lines = self.columns.iter().map(|c| c.to_string()).collect::<Vec<_>>();

        if let Some(pk) = &self.primary_key {
            lines.push(pk.to_string());
        }

        lines.iter().map(|l| Indented(l)).join(",\n", f)?;
        f.write_str("\n)")
    }
}

/// ```
/// # use sql_ddl::postgres::DropIndex;
///
/// let drop_index = DropIndex { index_name: "IX_Invoice_Number".into() };
/// assert_eq!(drop_index.to_string(), r#"DROP INDEX "IX_Invoice_Number""#);
/// ```
#[derive(Debug)]
pub struct DropIndex<'a> {
    pub index_name: Cow<'a, str>,
}

impl Display for DropIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP INDEX {}", Ident(&self.index_name))
    }
}

/// ```
/// # use sql_ddl::postgres::DropTable;
///
/// let drop_table = DropTable { table_name: "Invoice".into() };
/// assert_eq!(drop_table.to_string(), r#"DROP TABLE "Invoice""#);
/// ```
#[derive(Debug)]
pub struct DropTable<'a> {
    pub table_name: Cow<'a, str>,
}

impl Display for DropTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP TABLE {}", Ident(&self.table_name))
    }
}

pub struct ForeignKey<'a> {
    pub constraint_name: Option<Cow<'a, str>>,
    pub constrained_columns: Vec<Cow<'a, str>>,
    pub referenced_table: &'a dyn Display,
    pub referenced_columns: Vec<Cow<'a, str>>,
    pub on_delete: Option<ForeignKeyAction>,
    pub on_update: Option<ForeignKeyAction>,
    /// `DEFERRABLE INITIALLY DEFERRED`
    pub deferrable: bool,
}

impl Display for ForeignKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(constraint_name) = &self.constraint_name {
            write!(f, "CONSTRAINT {} ", Ident(constraint_name))?;
        }

        f.write_str("FOREIGN KEY (")?;
        self.constrained_columns.iter().map(|s| Ident(s)).join(", ", f)?;
        write!(f, ") REFERENCES {}(", self.referenced_table)?;
        self.referenced_columns.iter().map(|s| Ident(s)).join(", ", f)?;
        f.write_str(")")?;

        if let Some(on_delete) = &self.on_delete {
            write!(f, " ON DELETE {on_delete}")?;
        }

        if let Some(on_update) = &self.on_update {
            write!(f, " ON UPDATE {on_update}")?;
        }

        if self.deferrable {
            f.write_str(" DEFERRABLE INITIALLY DEFERRED")?;
        }

        Ok(())
    }
}

/// A double-quoted identifier.
pub struct Ident<'a>(pub &'a str);

impl Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.replace('"', "\"\""))
    }
}

struct Indented<'a>(&'a str);

impl Display for Indented<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("    ")?;
        f.write_str(self.0)
    }
}

pub struct CreateIndex<'a> {
    pub index_name: Cow<'a, str>,
    pub is_unique: bool,
    pub table_reference: &'a dyn Display,
    pub columns: Vec<IndexColumn<'a>>,
    /// Build a GiST index, for geometry and geography columns.
    pub spatial: bool,
    pub where_clause: Option<&'a str>,
}

impl Display for CreateIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CREATE {uniqueness}INDEX {index_name} ON {table_reference}{using}(",
            uniqueness = if self.is_unique { "UNIQUE " } else { "" },
            index_name = Ident(&self.index_name),
            table_reference = self.table_reference,
            using = if self.spatial { " USING GIST " } else { "" },
        )?;

        self.columns
            .iter()
            .map(|c| match c.sort_order {
                Some(sort_order) => format!("{} {}", Ident(&c.name), sort_order.as_ref()),
                None => Ident(&c.name).to_string(),
            })
            .join(", ", f)?;

        f.write_str(")")?;

        if let Some(where_clause) = self.where_clause {
            write!(f, " WHERE {where_clause}")?;
        }

        Ok(())
    }
}

/// A GIN index over the concatenated text search vectors of the columns.
pub struct CreateFullTextIndex<'a> {
    pub index_name: Cow<'a, str>,
    pub table_reference: &'a dyn Display,
    /// Column name and text search configuration.
    pub columns: Vec<(Cow<'a, str>, Cow<'a, str>)>,
}

impl Display for CreateFullTextIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CREATE INDEX {} ON {} USING GIN ((",
            Ident(&self.index_name),
            self.table_reference
        )?;

        self.columns
            .iter()
            .map(|(name, config)| format!("to_tsvector({}, coalesce({}, ''))", StrLit(config), Ident(name)))
            .join(" || ", f)?;

        f.write_str("))")
    }
}

/// Render a `CREATE SEQUENCE` statement.
///
/// ```
/// # use sql_ddl::postgres::CreateSequence;
///
/// let create = CreateSequence { sequence_name: "Seq".into(), start: 1, increment: 128 };
/// assert_eq!(create.to_string(), r#"CREATE SEQUENCE "Seq" START WITH 1 INCREMENT BY 128"#);
/// ```
pub struct CreateSequence<'a> {
    pub sequence_name: Cow<'a, str>,
    pub start: i64,
    pub increment: i64,
}

impl Display for CreateSequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CREATE SEQUENCE {} START WITH {} INCREMENT BY {}",
            Ident(&self.sequence_name),
            self.start,
            self.increment
        )?;

        if self.start < 1 {
            write!(f, " MINVALUE {}", self.start)?;
        }

        Ok(())
    }
}

pub struct AlterSequence<'a> {
    pub sequence_name: Cow<'a, str>,
    pub restart_with: Option<i64>,
    pub increment: Option<i64>,
}

impl Display for AlterSequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER SEQUENCE {}", Ident(&self.sequence_name))?;

        if let Some(increment) = self.increment {
            write!(f, " INCREMENT BY {increment}")?;
        }

        if let Some(restart_with) = self.restart_with {
            write!(f, " RESTART WITH {restart_with}")?;
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct DropSequence<'a> {
    pub sequence_name: Cow<'a, str>,
}

impl Display for DropSequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP SEQUENCE {}", Ident(&self.sequence_name))
    }
}
