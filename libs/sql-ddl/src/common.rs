use std::{
    borrow::Cow,
    fmt::{self, Display},
};

#[derive(Debug, Default)]
pub struct IndexColumn<'a> {
    pub name: Cow<'a, str>,
    pub sort_order: Option<SortOrder>,
}

impl<'a> IndexColumn<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>) -> Self {
        IndexColumn {
            name: name.into(),
            sort_order: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyAction {
    Cascade,
    NoAction,
    Restrict,
    SetDefault,
    SetNull,
}

impl Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::Restrict => "RESTRICT",
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
        };

        f.write_str(s)
    }
}

pub(crate) trait IteratorJoin {
    fn join(self, sep: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T, I> IteratorJoin for T
where
    T: Iterator<Item = I>,
    I: Display,
{
    fn join(mut self, sep: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.next() {
            first.fmt(f)?;
        }

        for item in self {
            f.write_str(sep)?;
            item.fmt(f)?;
        }

        Ok(())
    }
}

/// A single-quoted SQL string literal, with embedded quotes doubled.
pub(crate) struct StrLit<'a>(pub(crate) &'a str);

impl Display for StrLit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("'")?;
        f.write_str(&self.0.replace('\'', "''"))?;
        f.write_str("'")
    }
}
