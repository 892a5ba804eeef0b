//! The SQL schema connector: translation of schema comparison results into staged SQL commands
//! for a given dialect, and their execution against a host-provided connection.

#![deny(rust_2018_idioms, unsafe_code)]

pub mod flavour;

mod capabilities;
mod connection;
mod error;
mod executor;
mod options;
mod sql_renderer;
mod staged_commands;
mod translator;

pub use capabilities::{Capabilities, Capability};
pub use connection::SchemaConnection;
pub use error::{BoxError, ConnectorError, ConnectorResult, ErrorKind};
pub use executor::execute;
pub use flavour::{MssqlFlavour, PostgresFlavour, SqlFamily, SqlFlavour};
pub use options::TranslatorOptions;
pub use sql_renderer::{Quoted, SqlRenderer};
pub use staged_commands::{CommandBucket, StagedCommands};
pub use translator::{temporary_name, UpgradeActionTranslator};
