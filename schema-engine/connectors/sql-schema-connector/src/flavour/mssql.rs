use crate::{
    flavour::{SqlFamily, SqlFlavour},
    Capabilities, Capability,
};
use enumflags2::BitFlags;

// Some DDL statements must be alone in their batch, hence no DdlBatches.
const CAPABILITIES: BitFlags<Capability> = enumflags2::make_bitflags!(Capability::{
    Sequences |
    Batches |
    TableRename |
    ColumnRename |
    InsertDefaultValues |
    UpdateFrom |
    UpdateDefaultValues |
    PartialIndexes |
    FullText |
    FullTextDdlNotTransactional
});

const MAX_BATCH_LENGTH: usize = 4000;

#[derive(Debug, Default, Clone, Copy)]
pub struct MssqlFlavour;

impl SqlFlavour for MssqlFlavour {
    fn family(&self) -> SqlFamily {
        SqlFamily::Mssql
    }

    fn default_capabilities(&self) -> Capabilities {
        Capabilities::new(CAPABILITIES).with_max_batch_length(MAX_BATCH_LENGTH)
    }
}
