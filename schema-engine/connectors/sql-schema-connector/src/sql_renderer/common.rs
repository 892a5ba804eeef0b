use sql_schema_model::{ColumnTypeFamily, ForeignKeyAction, ScalarValue, SortOrder};
use std::fmt::{Display, Write as _};

#[derive(Debug)]
pub enum Quoted<T> {
    Double(T),
    Single(T),
    SquareBrackets(T),
}

impl<T> Quoted<T> {
    pub(crate) fn postgres_ident(name: T) -> Quoted<T> {
        Quoted::Double(name)
    }

    pub(crate) fn postgres_string(contents: T) -> Quoted<T> {
        Quoted::Single(contents)
    }

    pub(crate) fn mssql_ident(name: T) -> Quoted<T> {
        Quoted::SquareBrackets(name)
    }

    pub(crate) fn mssql_string(contents: T) -> Quoted<T> {
        Quoted::Single(contents)
    }
}

impl<T> Display for Quoted<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quoted::Double(inner) => write!(f, "\"{}\"", inner.to_string().replace('"', "\"\"")),
            Quoted::Single(inner) => write!(f, "'{}'", inner.to_string().replace('\'', "''")),
            Quoted::SquareBrackets(inner) => write!(f, "[{}]", inner.to_string().replace(']', "]]")),
        }
    }
}

pub(crate) trait IteratorJoin {
    fn join(self, sep: &str) -> String;
}

impl<T, I> IteratorJoin for T
where
    T: Iterator<Item = I>,
    I: Display,
{
    fn join(mut self, sep: &str) -> String {
        let (lower_bound, _) = self.size_hint();
        let mut out = String::with_capacity(sep.len() * lower_bound);

        if let Some(first_item) = self.next() {
            write!(out, "{first_item}").unwrap();
        }

        for item in self {
            out.push_str(sep);
            write!(out, "{item}").unwrap();
        }

        out
    }
}

pub(crate) fn format_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

pub(crate) fn sort_order(order: Option<SortOrder>) -> Option<sql_ddl::SortOrder> {
    order.map(|order| match order {
        SortOrder::Asc => sql_ddl::SortOrder::Asc,
        SortOrder::Desc => sql_ddl::SortOrder::Desc,
    })
}

/// `None` for the default action, which is left out of the DDL.
pub(crate) fn foreign_key_action(action: ForeignKeyAction) -> Option<sql_ddl::ForeignKeyAction> {
    match action {
        ForeignKeyAction::NoAction => None,
        ForeignKeyAction::Restrict => Some(sql_ddl::ForeignKeyAction::Restrict),
        ForeignKeyAction::Cascade => Some(sql_ddl::ForeignKeyAction::Cascade),
        ForeignKeyAction::SetNull => Some(sql_ddl::ForeignKeyAction::SetNull),
        ForeignKeyAction::SetDefault => Some(sql_ddl::ForeignKeyAction::SetDefault),
    }
}

/// A value every row can hold, for columns that need a default to be added to a populated table.
pub(crate) fn zero_value(family: &ColumnTypeFamily) -> Option<ScalarValue> {
    let value = match family {
        ColumnTypeFamily::Int | ColumnTypeFamily::BigInt => ScalarValue::Int(0),
        ColumnTypeFamily::Float | ColumnTypeFamily::Decimal { .. } => ScalarValue::Float(0.0),
        ColumnTypeFamily::Boolean => ScalarValue::Boolean(false),
        ColumnTypeFamily::String { .. } => ScalarValue::String(String::new()),
        ColumnTypeFamily::DateTime => ScalarValue::String("1970-01-01 00:00:00".to_owned()),
        ColumnTypeFamily::Uuid => ScalarValue::String("00000000-0000-0000-0000-000000000000".to_owned()),
        ColumnTypeFamily::Binary { .. } => ScalarValue::Bytes(Vec::new()),
        ColumnTypeFamily::Geometry | ColumnTypeFamily::Geography => return None,
    };

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_the_quote_character() {
        assert_eq!(Quoted::postgres_ident("my\"table").to_string(), r#""my""table""#);
        assert_eq!(Quoted::mssql_ident("a]b").to_string(), "[a]]b]");
        assert_eq!(Quoted::postgres_string("it's").to_string(), "'it''s'");
    }

    #[test]
    fn join_renders_separated_items() {
        assert_eq!(["a", "b", "c"].iter().join(", "), "a, b, c");
        assert_eq!(std::iter::empty::<&str>().join(", "), "");
    }
}
