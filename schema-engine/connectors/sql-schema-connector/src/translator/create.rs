use super::{unresolved_target, UpgradeActionTranslator};
use crate::{sql_renderer::zero_value, Capability, CommandBucket, ConnectorError, ConnectorResult};
use sql_schema_model::{
    ColumnWalker, ForeignKeyWalker, FullTextIndex, Node, NodePath, PrimaryKey, SecondaryIndex, Sequence, Table,
    TableWalker,
};

impl<'a> UpgradeActionTranslator<'a> {
    pub(super) fn create(&mut self, path: &NodePath) -> ConnectorResult<()> {
        let address = path.address()?;
        let target = self.target;
        let node = target.resolve(&address).ok_or_else(|| unresolved_target(path))?;

        match node {
            Node::Catalog(_) => Err(ConnectorError::not_supported("Creating a catalog is not supported.")),
            Node::Table(table) => self.create_table(table),
            Node::Column(column) => self.create_column(column),
            Node::PrimaryKey(table, primary_key) => self.create_primary_key(table, primary_key),
            Node::SecondaryIndex(table, index) => self.create_index(table, index),
            Node::ForeignKey(foreign_key) => self.create_foreign_key(foreign_key),
            Node::FullTextIndex(table, index) => self.create_full_text_index(table, index),
            Node::Sequence(sequence) => self.create_sequence(sequence),
        }
    }

    fn create_table(&mut self, table: TableWalker<'_>) -> ConnectorResult<()> {
        let command = self.flavour.render_create_table(table, true);
        self.push(command);

        // Indexes, foreign keys and full-text indexes come with their own create actions.
        self.native.push_table(Table {
            name: table.name().to_owned(),
            columns: table.table.columns.clone(),
            primary_key: table.table.primary_key.clone(),
            ..Default::default()
        });
        self.created_tables.insert(table.name().to_owned());

        Ok(())
    }

    fn create_column(&mut self, column: ColumnWalker<'_>) -> ConnectorResult<()> {
        let table_name = column.table().name();

        if self.is_created_table(table_name) {
            return Ok(());
        }

        self.native_table_mut(table_name)?;

        let transient_default = self.transient_default(column);
        let commands = self.flavour.render_add_column(column, transient_default.as_deref());
        self.push_all(commands);

        self.native_table_mut(table_name)?.columns.push(column.inner().clone());
        self.created_columns
            .insert((table_name.to_owned(), column.name().to_owned()));

        Ok(())
    }

    /// The default a column is added with, so that existing rows get a value. `None` when the
    /// column can be added as it is.
    pub(super) fn transient_default(&self, column: ColumnWalker<'_>) -> Option<String> {
        let needs_default = !column.is_nullable()
            && column.default().is_none()
            && !column.is_type_discriminator()
            && !column.is_in_primary_key();

        if !needs_default {
            return None;
        }

        zero_value(column.column_type_family()).map(|value| self.flavour.render_literal(&value))
    }

    fn create_primary_key(&mut self, table: TableWalker<'_>, primary_key: &PrimaryKey) -> ConnectorResult<()> {
        if self.is_created_table(table.name()) {
            return Ok(());
        }

        self.native_table_mut(table.name())?;

        let command = self.flavour.render_add_primary_key(table.name(), primary_key);
        self.push(command);

        self.native_table_mut(table.name())?.primary_key = Some(primary_key.clone());

        Ok(())
    }

    fn create_index(&mut self, table: TableWalker<'_>, index: &SecondaryIndex) -> ConnectorResult<()> {
        if index.unique && !self.options.allow_create_constraints {
            tracing::debug!(table = table.name(), index = %index.name, "Skipping unique index creation");
            return Ok(());
        }

        self.native_table_mut(table.name())?;

        let spatial_column = match index.columns.as_slice() {
            [column] => table
                .column(&column.name)
                .filter(|c| c.column_type_family().is_spatial())
                .map(|c| c.name()),
            _ => None,
        };

        let command = match spatial_column {
            Some(column_name) => self
                .flavour
                .render_create_spatial_index(table.name(), &index.name, column_name),
            None => {
                let filter = index
                    .filter
                    .as_deref()
                    .filter(|_| self.capabilities.contains(Capability::PartialIndexes));

                self.flavour.render_create_index(table.name(), index, filter)
            }
        };

        self.push(command);
        self.native_table_mut(table.name())?.indexes.push(index.clone());

        Ok(())
    }

    fn create_foreign_key(&mut self, foreign_key: ForeignKeyWalker<'_>) -> ConnectorResult<()> {
        let table_name = foreign_key.table().name();

        if !self.options.allow_create_constraints {
            tracing::debug!(table = table_name, foreign_key = foreign_key.name(), "Skipping foreign key creation");
            return Ok(());
        }

        self.native_table_mut(table_name)?;

        let deferrable = self.capabilities.contains(Capability::DeferrableConstraints);
        let command = self
            .flavour
            .render_add_foreign_key(table_name, foreign_key.inner(), deferrable);
        self.push(command);

        self.native_table_mut(table_name)?
            .foreign_keys
            .push(foreign_key.inner().clone());

        Ok(())
    }

    fn create_full_text_index(&mut self, table: TableWalker<'_>, index: &FullTextIndex) -> ConnectorResult<()> {
        if !self.capabilities.contains(Capability::FullText) {
            tracing::debug!(table = table.name(), "Skipping full-text index creation");
            return Ok(());
        }

        let Some(primary_key) = table.primary_key() else {
            return Err(ConnectorError::not_supported(format!(
                "The full-text index on `{}` needs a primary key.",
                table.name()
            )));
        };

        self.native_table_mut(table.name())?;

        let command = self
            .flavour
            .render_create_full_text_index(table.name(), index, &primary_key.name);
        let bucket = self.full_text_bucket(CommandBucket::NonTransactionalEpilog);
        self.commands.push(bucket, command);

        self.native_table_mut(table.name())?.full_text_index = Some(index.clone());

        Ok(())
    }

    /// Where full-text DDL goes: `non_transactional` when it cannot run in a transaction.
    pub(super) fn full_text_bucket(&self, non_transactional: CommandBucket) -> CommandBucket {
        if self.capabilities.contains(Capability::FullTextDdlNotTransactional) {
            non_transactional
        } else {
            self.bucket
        }
    }

    fn create_sequence(&mut self, sequence: &Sequence) -> ConnectorResult<()> {
        let command = if self.capabilities.contains(Capability::Sequences) {
            self.flavour.render_create_sequence(sequence)
        } else {
            let with_filler = !self.capabilities.contains(Capability::InsertDefaultValues);
            self.flavour.render_create_generator_table(sequence, with_filler)
        };

        self.push(command);
        self.native.push_sequence(sequence.clone());

        Ok(())
    }
}
