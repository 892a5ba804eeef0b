use crate::{
    flavour::{SqlFamily, SqlFlavour},
    Capabilities, Capability,
};
use enumflags2::BitFlags;

const CAPABILITIES: BitFlags<Capability> = enumflags2::make_bitflags!(Capability::{
    Sequences |
    Batches |
    DdlBatches |
    TableRename |
    ColumnRename |
    DeferrableConstraints |
    InsertDefaultValues |
    UpdateFrom |
    UpdateDefaultValues |
    PartialIndexes |
    FullText
});

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresFlavour;

impl SqlFlavour for PostgresFlavour {
    fn family(&self) -> SqlFamily {
        SqlFamily::Postgres
    }

    fn default_capabilities(&self) -> Capabilities {
        Capabilities::new(CAPABILITIES)
    }
}
