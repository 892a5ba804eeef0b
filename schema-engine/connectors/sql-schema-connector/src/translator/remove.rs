use super::{unresolved_native, UpgradeActionTranslator};
use crate::{Capability, CommandBucket, ConnectorError, ConnectorResult};
use sql_schema_model::{Node, NodeAddress, NodePath};

impl<'a> UpgradeActionTranslator<'a> {
    pub(super) fn remove(&mut self, path: &NodePath) -> ConnectorResult<()> {
        let address = path.address()?;

        if let Some(table) = address.table_name() {
            if self.removed_tables.contains(table) {
                tracing::debug!(%path, "The table was already removed");
                return Ok(());
            }
        }

        let (bucket, commands) = {
            let node = self.native.resolve(&address).ok_or_else(|| unresolved_native(path))?;
            let flavour = self.flavour;

            match node {
                Node::Catalog(_) => return Err(ConnectorError::not_supported("Removing the catalog is not supported.")),
                Node::Table(table) => (self.bucket, vec![flavour.render_drop_table(table.name())]),
                Node::Column(column) => (self.bucket, flavour.render_drop_column(column)),
                Node::PrimaryKey(table, primary_key) => (
                    self.bucket,
                    vec![flavour.render_drop_constraint(table.name(), &primary_key.name)],
                ),
                Node::SecondaryIndex(table, index) => (
                    CommandBucket::PreCleanupData,
                    vec![flavour.render_drop_index(table.name(), &index.name)],
                ),
                Node::ForeignKey(foreign_key) => (
                    CommandBucket::PreCleanupData,
                    vec![flavour.render_drop_constraint(foreign_key.table().name(), foreign_key.name())],
                ),
                Node::FullTextIndex(table, index) => {
                    if !self.capabilities.contains(Capability::FullText) {
                        tracing::debug!(%path, "Skipping full-text index removal");
                        return Ok(());
                    }

                    (
                        self.full_text_bucket(CommandBucket::NonTransactionalProlog),
                        vec![flavour.render_drop_full_text_index(table.name(), index)],
                    )
                }
                Node::Sequence(sequence) => {
                    let command = if self.capabilities.contains(Capability::Sequences) {
                        flavour.render_drop_sequence(&sequence.name)
                    } else {
                        flavour.render_drop_table(&sequence.name)
                    };

                    (self.bucket, vec![command])
                }
            }
        };

        for command in commands {
            self.commands.push(bucket, command);
        }

        self.remove_from_mirror(path, address)
    }

    fn remove_from_mirror(&mut self, path: &NodePath, address: NodeAddress) -> ConnectorResult<()> {
        match address {
            NodeAddress::Catalog => (),
            NodeAddress::Table { table } => {
                self.native.remove_table(&table);
                self.removed_tables.insert(table);
            }
            NodeAddress::Column { table, column } => {
                self.native_table_mut(&table)?.remove_column(&column);
            }
            NodeAddress::PrimaryKey { table } => self.native_table_mut(&table)?.primary_key = None,
            NodeAddress::SecondaryIndex { table, index } => {
                self.native_table_mut(&table)?.remove_index(&index);
            }
            NodeAddress::ForeignKey { table, foreign_key } => {
                self.native_table_mut(&table)?.remove_foreign_key(&foreign_key);
            }
            NodeAddress::FullTextIndex { table } => self.native_table_mut(&table)?.full_text_index = None,
            NodeAddress::Sequence { sequence } => {
                self.native
                    .remove_sequence(&sequence)
                    .ok_or_else(|| unresolved_native(path))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use crate::{Capabilities, CommandBucket, MssqlFlavour, PostgresFlavour};
    use expect_test::expect;
    use pretty_assertions::assert_eq;
    use sql_schema_model::{actions::UpgradeStage, NodePath};

    #[test]
    fn removes_inside_a_removed_table_are_no_ops() {
        let mut native = cats_schema();
        let target = Default::default();

        let commands = translate(
            &PostgresFlavour,
            Capabilities::default(),
            &mut native,
            &target,
            vec![(
                UpgradeStage::Cleanup,
                vec![
                    remove(NodePath::table("Cat")),
                    remove(NodePath::column("Cat", "Name")),
                    remove(NodePath::primary_key("Cat")),
                ],
            )],
        );

        assert_eq!(commands.get(CommandBucket::Cleanup), &[r#"DROP TABLE "Cat""#.to_owned()]);
        assert!(native.table("Cat").is_none());
    }

    #[test]
    fn index_and_foreign_key_removals_run_before_data_cleanup() {
        let mut native = cats_and_kittens_schema();
        let target = Default::default();

        let commands = translate(
            &MssqlFlavour,
            Capabilities::default(),
            &mut native,
            &target,
            vec![(
                UpgradeStage::Cleanup,
                vec![
                    remove(NodePath::foreign_key("Kitten", "FK_Kitten_Cat")),
                    remove(NodePath::index("Cat", "IX_Cat_Name")),
                    remove(NodePath::column("Kitten", "MotherId")),
                ],
            )],
        );

        expect![[r#"
            -- pre-cleanup-data
            ALTER TABLE [Kitten] DROP CONSTRAINT [FK_Kitten_Cat];
            DROP INDEX [IX_Cat_Name] ON [Cat];

            -- cleanup
            ALTER TABLE [Kitten] DROP COLUMN [MotherId];
        "#]]
        .assert_eq(&commands.render_script());
    }

    #[test]
    fn removing_an_unknown_node_fails() {
        let mut native = cats_schema();
        let err = translate_err(
            &PostgresFlavour,
            Capabilities::default(),
            &mut native,
            &Default::default(),
            vec![(UpgradeStage::Cleanup, vec![remove(NodePath::column("Cat", "Whiskers"))])],
        );

        assert_eq!(
            err.to_string(),
            "Could not find Tables/Cat/Columns/Whiskers in the extracted schema."
        );
        assert!(err.is_contract_violation());
    }
}
