#![deny(rust_2018_idioms, unsafe_code)]

//! The schema engine core: decides, per upgrade mode, whether the extracted schema is brought in
//! line with the target schema, only validated against it, or left alone.

mod comparison;
mod core_error;
mod destructive_change_checker;
mod input;
mod synchronize;
mod upgrade_mode;

pub use comparison::{ComparisonResult, ComparisonStatus, RenameHint, SchemaComparer, SchemaExtractor};
pub use core_error::{CoreError, CoreResult};
pub use destructive_change_checker::{DestructiveChangeChecker, DestructiveChangeDiagnostics, MigrationWarning};
pub use input::{SchemaUpgradeInput, SchemaUpgradeOutput};
pub use synchronize::SchemaSynchronizer;
pub use upgrade_mode::UpgradeMode;
