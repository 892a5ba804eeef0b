use crate::BoxError;
use sql_schema_model::ScalarValue;

/// The execution callbacks of a database connection. Implemented by the host, which owns the
/// actual driver.
pub trait SchemaConnection {
    /// Run a statement (or a batch of statements) that returns no rows.
    fn execute_non_query(&mut self, sql: &str) -> Result<(), BoxError>;

    /// Run a query returning a single value. `None` when the query returns no rows.
    fn execute_scalar(&mut self, sql: &str) -> Result<Option<ScalarValue>, BoxError>;

    fn begin_transaction(&mut self) -> Result<(), BoxError>;

    fn commit_transaction(&mut self) -> Result<(), BoxError>;
}
