//! Typed builders for the DDL statements emitted by the schema upgrade engine. Every builder
//! renders itself through `Display`, so statements can be composed without string surgery.

#![deny(rust_2018_idioms, unsafe_code)]

mod common;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{ForeignKeyAction, IndexColumn, SortOrder};
