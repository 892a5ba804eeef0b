//! SQL flavours implement behaviour specific to a given SQL implementation (PostgreSQL, SQL
//! Server), in order to avoid cluttering the translator with conditionals.

mod mssql;
mod postgres;

pub use mssql::MssqlFlavour;
pub use postgres::PostgresFlavour;

use crate::{sql_renderer::SqlRenderer, Capabilities};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// The SQL dialects the connector renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlFamily {
    Postgres,
    Mssql,
}

pub fn from_family(family: SqlFamily) -> Box<dyn SqlFlavour + Send + Sync + 'static> {
    match family {
        SqlFamily::Postgres => Box::new(PostgresFlavour),
        SqlFamily::Mssql => Box::new(MssqlFlavour),
    }
}

pub trait SqlFlavour: SqlRenderer + Debug {
    fn family(&self) -> SqlFamily;

    /// The capabilities of the backend, when the host does not override them.
    fn default_capabilities(&self) -> Capabilities;
}
