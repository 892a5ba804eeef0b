use enumflags2::{bitflags, BitFlags};

/// Features of a database backend the translator adapts its output to.
#[bitflags]
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Native sequence objects. Emulated with identity generator tables otherwise.
    Sequences,
    /// Several statements can be sent in one round-trip.
    Batches,
    /// DDL statements can be batched too.
    DdlBatches,
    TableRename,
    ColumnRename,
    /// Foreign keys can be created `DEFERRABLE` and checked at commit time.
    DeferrableConstraints,
    /// `INSERT INTO t DEFAULT VALUES` is supported.
    InsertDefaultValues,
    /// `UPDATE .. FROM ..` is supported.
    UpdateFrom,
    /// `SET c = DEFAULT` is supported.
    UpdateDefaultValues,
    /// Filtered (partial) indexes.
    PartialIndexes,
    FullText,
    /// Full-text DDL cannot run inside a transaction.
    FullTextDdlNotTransactional,
}

/// The capability set of a backend, plus its batch size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    flags: BitFlags<Capability>,
    /// The maximum length of a batch, in characters.
    max_batch_length: usize,
}

impl Capabilities {
    pub const DEFAULT_MAX_BATCH_LENGTH: usize = 64 * 1024;

    pub fn new(flags: impl Into<BitFlags<Capability>>) -> Self {
        Capabilities {
            flags: flags.into(),
            max_batch_length: Self::DEFAULT_MAX_BATCH_LENGTH,
        }
    }

    pub fn with_max_batch_length(mut self, max_batch_length: usize) -> Self {
        self.max_batch_length = max_batch_length;
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.flags.contains(capability)
    }

    pub fn flags(&self) -> BitFlags<Capability> {
        self.flags
    }

    pub fn max_batch_length(&self) -> usize {
        self.max_batch_length
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::new(BitFlags::empty())
    }
}
