//! The SQL schema connector error type.

use sql_schema_model::{NodePath, ScalarValue, SchemaModelError};
use std::{
    error::Error as StdError,
    fmt::{self, Debug, Display, Write},
};
use tracing_error::SpanTrace;

/// The error type of backend execution callbacks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shorthand for a Result where the error variant is a [ConnectorError].
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// The general error reporting type of the connector.
pub struct ConnectorError(Box<ConnectorErrorImpl>);

struct ConnectorErrorImpl {
    kind: ErrorKind,
    /// See the tracing-error docs.
    context: SpanTrace,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Could not find {path} in the {schema} schema.")]
    UnresolvedNode { path: NodePath, schema: &'static str },

    #[error("The translator was already used. Each action sequence needs a new translator.")]
    AlreadyTranslated,

    #[error("Cannot move {path} to {new_path}: only renames are supported.")]
    UnsupportedMovement { path: NodePath, new_path: NodePath },

    #[error("{0}")]
    NotSupported(String),

    #[error("Invalid data hint ({hint}): {reason}")]
    InvalidDataHint { hint: String, reason: &'static str },

    #[error(transparent)]
    InvalidActionSequence(#[from] SchemaModelError),

    #[error("Cannot order the deletions: the foreign keys of {0} form a cycle.")]
    ForeignKeyCycle(String),

    #[error("Expected an integer from `{statement}`, got {value:?}.")]
    UnexpectedScalar { statement: String, value: Option<ScalarValue> },

    #[error("Error running `{statement}`.")]
    Execution {
        statement: String,
        #[source]
        source: BoxError,
    },
}

impl ConnectorError {
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }

    /// A reference to the tracing-error context.
    pub fn context(&self) -> &SpanTrace {
        &self.0.context
    }

    /// The error was caused by malformed input rather than by the database.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Execution { .. } | ErrorKind::UnexpectedScalar { .. }
        )
    }

    pub(crate) fn not_supported(message: impl Into<String>) -> Self {
        ErrorKind::NotSupported(message.into()).into()
    }

    pub(crate) fn execution(statement: &str, source: BoxError) -> Self {
        ErrorKind::Execution {
            statement: statement.to_owned(),
            source,
        }
        .into()
    }
}

impl From<ErrorKind> for ConnectorError {
    fn from(kind: ErrorKind) -> Self {
        ConnectorError(Box::new(ConnectorErrorImpl {
            kind,
            context: SpanTrace::capture(),
        }))
    }
}

impl From<SchemaModelError> for ConnectorError {
    fn from(err: SchemaModelError) -> Self {
        ErrorKind::from(err).into()
    }
}

impl Debug for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0.kind, f)?;
        f.write_char('\n')?;
        Display::fmt(&self.0.context, f)
    }
}

impl Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0.kind, f)?;

        if let ErrorKind::Execution { source, .. } = &self.0.kind {
            f.write_char('\n')?;
            Display::fmt(source, f)?;
        }

        Ok(())
    }
}

impl StdError for ConnectorError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.kind.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_error_has_the_expected_size() {
        assert_eq!(std::mem::size_of::<ConnectorError>(), std::mem::size_of::<*mut ()>());
    }

    #[test]
    fn execution_errors_are_not_contract_violations() {
        let err = ConnectorError::execution("SELECT 1", "connection reset".into());

        assert!(!err.is_contract_violation());
        assert_eq!(err.to_string(), "Error running `SELECT 1`.\nconnection reset");
        assert!(ConnectorError::from(ErrorKind::AlreadyTranslated).is_contract_violation());
    }
}
