use super::{temporary_name, unresolved_native, unresolved_target, UpgradeActionTranslator};
use crate::{Capability, CommandBucket, ConnectorError, ConnectorResult, ErrorKind};
use enumflags2::BitFlags;
use sql_schema_model::{
    actions::{ChangedProperty, MovementFlag},
    NodeAddress, NodePath, ScalarValue, Sequence, SqlSchema,
};

impl<'a> UpgradeActionTranslator<'a> {
    pub(super) fn move_node(
        &mut self,
        path: &NodePath,
        new_path: &NodePath,
        flags: BitFlags<MovementFlag>,
    ) -> ConnectorResult<()> {
        if flags != MovementFlag::Name {
            return Err(ErrorKind::UnsupportedMovement {
                path: path.clone(),
                new_path: new_path.clone(),
            }
            .into());
        }

        match (path.address()?, new_path.address()?) {
            (NodeAddress::Table { table }, NodeAddress::Table { table: next }) => self.rename_table(&table, &next),
            (NodeAddress::Column { table, column }, NodeAddress::Column { column: next, .. }) => {
                self.rename_column(&table, &column, &next)
            }
            _ => Err(ConnectorError::not_supported(format!(
                "Renaming {path} to {new_path} is not supported."
            ))),
        }
    }

    fn rename_table(&mut self, previous: &str, next: &str) -> ConnectorResult<()> {
        if self.native.table(previous).is_none() {
            return Err(unresolved_native(&NodePath::table(previous)));
        }

        if self.capabilities.contains(Capability::TableRename) {
            let command = self.flavour.render_rename_table(previous, next);
            self.push(command);
        } else {
            let (commands, full_text) = self.recreate_table(previous, next);
            self.push_all(commands);

            if let Some(command) = full_text {
                let bucket = self.full_text_bucket(CommandBucket::NonTransactionalEpilog);
                self.commands.push(bucket, command);
            }
        }

        self.native.rename_table(previous, next);

        Ok(())
    }

    /// Rename a table by creating the new table, copying the rows and dropping the old one. The
    /// foreign keys pointing at the table are dropped first and recreated last. The full-text
    /// index, when there is one, is returned on its own.
    fn recreate_table(&self, previous: &str, next: &str) -> (Vec<String>, Option<String>) {
        let flavour = self.flavour;

        // The table as it will be after the rename, in a schema of its own.
        let mut renamed = SqlSchema::default();
        renamed.tables = self.native.tables.clone();
        renamed.rename_table(previous, next);

        let Some(new_table) = renamed.table_walker(next) else {
            return (Vec::new(), None);
        };

        let incoming: Vec<_> = renamed
            .table_walkers()
            .filter(|table| table.name() != next)
            .flat_map(|table| table.foreign_keys())
            .filter(|fk| fk.inner().referenced_table == next)
            .collect();

        let mut commands = Vec::new();

        for fk in &incoming {
            commands.push(flavour.render_drop_constraint(fk.table().name(), fk.name()));
        }

        commands.push(flavour.render_create_table(new_table, false));

        let columns: Vec<(&str, &str)> = new_table.columns().map(|c| (c.name(), c.name())).collect();
        commands.push(flavour.render_insert_select(previous, next, &columns));
        commands.push(flavour.render_drop_table(previous));

        if let Some(primary_key) = new_table.primary_key() {
            commands.push(flavour.render_add_primary_key(next, primary_key));
        }

        let partial_indexes = self.capabilities.contains(Capability::PartialIndexes);

        for index in &new_table.table.indexes {
            let filter = index.filter.as_deref().filter(|_| partial_indexes);
            commands.push(flavour.render_create_index(next, index, filter));
        }

        let deferrable = self.capabilities.contains(Capability::DeferrableConstraints);

        for fk in new_table.foreign_keys().chain(incoming.iter().copied()) {
            commands.push(flavour.render_add_foreign_key(fk.table().name(), fk.inner(), deferrable));
        }

        let full_text = match (new_table.full_text_index(), new_table.primary_key()) {
            (Some(index), Some(primary_key)) if self.capabilities.contains(Capability::FullText) => {
                Some(flavour.render_create_full_text_index(next, index, &primary_key.name))
            }
            _ => None,
        };

        (commands, full_text)
    }

    pub(super) fn rename_column(&mut self, table: &str, previous: &str, next: &str) -> ConnectorResult<()> {
        let column = self
            .native
            .table_walker(table)
            .and_then(|t| t.column(previous))
            .ok_or_else(|| unresolved_native(&NodePath::column(table, previous)))?;

        if self.capabilities.contains(Capability::ColumnRename) {
            let command = self.flavour.render_rename_column(table, previous, next);
            self.push(command);
        } else {
            let mut renamed = SqlSchema::default();
            renamed.tables = vec![column.table().table.clone()];
            renamed.rename_column(table, previous, next);

            let Some(new_column) = renamed.table_walker(table).and_then(|t| t.column(next)) else {
                return Err(unresolved_native(&NodePath::column(table, next)));
            };

            let add = self
                .flavour
                .render_add_column(new_column, self.transient_default(new_column).as_deref());
            let copy = format!(
                "UPDATE {} SET {} = {}",
                self.flavour.quote(table),
                self.flavour.quote(next),
                self.flavour.quote(previous)
            );
            let drop = self.flavour.render_drop_column(column);

            self.push_all(add);
            self.commands.push_batch_boundary(self.bucket);
            self.push(copy);
            self.commands.push_batch_boundary(self.bucket);
            self.push_all(drop);
        }

        self.native.rename_column(table, previous, next);

        Ok(())
    }

    pub(super) fn change_property(&mut self, path: &NodePath, property: &ChangedProperty) -> ConnectorResult<()> {
        match (path.address()?, property) {
            (NodeAddress::Column { table, column }, ChangedProperty::Type | ChangedProperty::DefaultValue) => {
                self.swap_column(path, &table, &column)
            }
            (NodeAddress::Sequence { sequence }, ChangedProperty::Increment) => {
                self.alter_sequence_increment(path, &sequence)
            }
            (NodeAddress::PrimaryKey { table }, _) => Err(ConnectorError::not_supported(format!(
                "Altering the primary key of `{table}` in place is not supported."
            ))),
            _ => {
                tracing::debug!(%path, %property, "Ignoring property change");
                Ok(())
            }
        }
    }

    /// Rename the column out of the way, add it with its new definition, copy the values over and
    /// drop the old column during cleanup.
    fn swap_column(&mut self, path: &NodePath, table: &str, column: &str) -> ConnectorResult<()> {
        if self.is_created_table(table)
            || self
                .created_columns
                .contains(&(table.to_owned(), column.to_owned()))
        {
            return Ok(());
        }

        let target = self.target;
        let next = target
            .table_walker(table)
            .and_then(|t| t.column(column))
            .ok_or_else(|| unresolved_target(path))?;
        let previous = self
            .native
            .table_walker(table)
            .and_then(|t| t.column(column))
            .ok_or_else(|| unresolved_native(path))?;

        let convertible = previous.column_type_family().change_to(next.column_type_family()).is_convertible()
            || self.options.is_conversion_enforced(path);
        let drop_default = self.flavour.render_drop_default(previous);
        let temporary = temporary_name(column, |name| {
            previous.table().column(name).is_some() || next.table().column(name).is_some()
        });

        // (a) Move the old column out of the way. Its default goes first, the new column may need
        // the constraint name.
        if let Some(command) = drop_default {
            self.push(command);

            if let Some(column) = self.native_table_mut(table)?.column_mut(column) {
                column.default = None;
            }
        }

        self.rename_column(table, column, &temporary)?;

        // (b) The new column.
        let transient_default = if next.is_nullable() || next.default().is_some() {
            None
        } else {
            self.transient_default(next)
        };
        let add = self.flavour.render_add_column(next, transient_default.as_deref());
        self.push_all(add);
        self.native_table_mut(table)?.columns.push(next.inner().clone());

        // (c) Carry the values over, in a batch of its own: the new column must exist when the
        // statement is compiled.
        if convertible {
            let fallback = if next.is_nullable() {
                None
            } else {
                next.default()
                    .map(|default| self.flavour.render_default(table, column, default))
                    .or(transient_default)
            };

            let copy = self.flavour.render_copy_column(next, &temporary, fallback.as_deref());

            self.commands.push_batch_boundary(self.bucket);
            self.push(copy);
            self.commands.push_batch_boundary(self.bucket);
        } else {
            tracing::warn!(%path, "The values of the column cannot be converted and are dropped");
        }

        // (d) Drop the old column.
        let drop = self
            .native
            .table_walker(table)
            .and_then(|t| t.column(&temporary))
            .map(|c| self.flavour.render_drop_column(c))
            .unwrap_or_default();

        for command in drop {
            self.commands.push(CommandBucket::Cleanup, command);
        }

        self.native_table_mut(table)?.remove_column(&temporary);

        Ok(())
    }

    /// Restart the sequence at its current value plus the new increment. Generator tables are
    /// recreated with that seed.
    fn alter_sequence_increment(&mut self, path: &NodePath, name: &str) -> ConnectorResult<()> {
        let increment = self
            .target
            .sequence(name)
            .ok_or_else(|| unresolved_target(path))?
            .increment;
        let seed = self.native.sequence(name).ok_or_else(|| unresolved_native(path))?.seed;

        let native_sequences = self.capabilities.contains(Capability::Sequences);
        let query = self.flavour.render_current_value_query(name, native_sequences);

        let current = match self
            .connection
            .execute_scalar(&query)
            .map_err(|err| ConnectorError::execution(&query, err))?
        {
            Some(ScalarValue::Int(value)) => Some(value),
            None | Some(ScalarValue::Null) => None,
            Some(other) => {
                return Err(ErrorKind::UnexpectedScalar {
                    statement: query,
                    value: Some(other),
                }
                .into())
            }
        };

        let restart_with = match current {
            Some(value) => value.checked_add(increment).ok_or_else(|| {
                ConnectorError::not_supported(format!(
                    "Restarting `{name}` at {value} + {increment} overflows a 64-bit integer."
                ))
            })?,
            None => seed,
        };
        tracing::debug!(sequence = name, ?current, restart_with, increment);

        if native_sequences {
            let command = self.flavour.render_restart_sequence(name, restart_with, increment);
            self.push(command);
        } else {
            let with_filler = !self.capabilities.contains(Capability::InsertDefaultValues);
            let generator = Sequence::new(name, restart_with, increment);

            let drop = self.flavour.render_drop_table(name);
            let create = self.flavour.render_create_generator_table(&generator, with_filler);
            self.push(drop);
            self.push(create);
        }

        if let Some(sequence) = self.native.sequence_mut(name) {
            sequence.increment = increment;
            sequence.current = current;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use crate::{Capabilities, Capability, CommandBucket, MssqlFlavour, PostgresFlavour};
    use enumflags2::make_bitflags;
    use expect_test::expect;
    use pretty_assertions::assert_eq;
    use crate::UpgradeActionTranslator;
    use sql_schema_model::{
        actions::{ActionSequence, ChangedProperty, MovementFlag, NodeAction, UpgradeStage},
        ColumnArity, ColumnTypeFamily, DefaultValue, FullTextColumn, FullTextIndex, NodePath, ScalarValue, Sequence,
    };

    #[test]
    fn native_and_emulated_table_renames_agree_on_the_mirror() {
        let target = Default::default();
        let stages = || vec![(UpgradeStage::Upgrade, vec![rename(NodePath::table("Cat"), NodePath::table("Feline"))])];

        let mut native = cats_and_kittens_schema();
        let capabilities = Capabilities::new(Capability::TableRename);
        let commands = translate(&PostgresFlavour, capabilities, &mut native, &target, stages());

        let mut emulated = cats_and_kittens_schema();
        let emulated_commands = translate(&PostgresFlavour, Capabilities::default(), &mut emulated, &target, stages());

        assert_eq!(native, emulated);
        assert_eq!(native.table("Kitten").unwrap().foreign_keys[0].referenced_table, "Feline");

        expect![[r#"
            [
                "ALTER TABLE \"Cat\" RENAME TO \"Feline\"",
            ]
        "#]]
        .assert_debug_eq(&commands.get(CommandBucket::Upgrade));

        expect![[r#"
            -- upgrade
            ALTER TABLE "Kitten" DROP CONSTRAINT "FK_Kitten_Cat";
            CREATE TABLE "Feline" (
                "Id" integer NOT NULL,
                "Name" varchar(100)
            );
            INSERT INTO "Feline" ("Id", "Name") SELECT "Id", "Name" FROM "Cat";
            DROP TABLE "Cat";
            ALTER TABLE "Feline" ADD CONSTRAINT "PK_Cat" PRIMARY KEY ("Id");
            CREATE INDEX "IX_Cat_Name" ON "Feline"("Name");
            ALTER TABLE "Kitten" ADD CONSTRAINT "FK_Kitten_Cat" FOREIGN KEY ("MotherId") REFERENCES "Feline"("Id");
        "#]]
        .assert_eq(&emulated_commands.render_script());
    }

    #[test]
    fn emulated_table_renames_recreate_the_full_text_index_outside_the_transaction() {
        let mut native = cats_schema();
        native.table_mut("Cat").unwrap().full_text_index = Some(FullTextIndex {
            name: "FT_Cat".into(),
            columns: vec![FullTextColumn {
                name: "Name".into(),
                language: None,
            }],
        });

        let commands = translate(
            &MssqlFlavour,
            Capabilities::new(make_bitflags!(Capability::{FullText | FullTextDdlNotTransactional})),
            &mut native,
            &Default::default(),
            vec![(UpgradeStage::Upgrade, vec![rename(NodePath::table("Cat"), NodePath::table("Feline"))])],
        );

        assert!(commands.commands(CommandBucket::Upgrade).all(|c| !c.contains("FULLTEXT")));
        assert_eq!(
            commands.get(CommandBucket::NonTransactionalEpilog),
            &["CREATE FULLTEXT INDEX ON [Feline] ([Name]) KEY INDEX [PK_Cat] WITH CHANGE_TRACKING AUTO".to_owned()]
        );
        assert!(native.table("Feline").unwrap().full_text_index.is_some());

        let mut native = cats_schema();
        let commands = translate(
            &MssqlFlavour,
            Capabilities::new(make_bitflags!(Capability::{FullText | FullTextDdlNotTransactional})),
            &mut native,
            &Default::default(),
            vec![(UpgradeStage::Upgrade, vec![rename(NodePath::table("Cat"), NodePath::table("Feline"))])],
        );

        assert!(commands.get(CommandBucket::NonTransactionalEpilog).is_empty());
    }

    #[test]
    fn emulated_column_renames_copy_in_a_batch_of_their_own() {
        let mut native = cats_schema();
        let commands = translate(
            &PostgresFlavour,
            Capabilities::default(),
            &mut native,
            &Default::default(),
            vec![(
                UpgradeStage::Upgrade,
                vec![rename(NodePath::column("Cat", "Name"), NodePath::column("Cat", "Nickname"))],
            )],
        );

        expect![[r#"
            [
                "ALTER TABLE \"Cat\" ADD COLUMN \"Nickname\" varchar(100)",
                "",
                "UPDATE \"Cat\" SET \"Nickname\" = \"Name\"",
                "",
                "ALTER TABLE \"Cat\" DROP COLUMN \"Name\"",
            ]
        "#]]
        .assert_debug_eq(&commands.get(CommandBucket::Upgrade));
        assert!(native.table("Cat").unwrap().column("Nickname").is_some());
    }

    #[test]
    fn movements_other_than_renames_are_rejected() {
        let mut native = cats_schema();
        let err = translate_err(
            &PostgresFlavour,
            Capabilities::default(),
            &mut native,
            &Default::default(),
            vec![(
                UpgradeStage::Upgrade,
                vec![NodeAction::Move {
                    path: NodePath::column("Cat", "Name"),
                    new_path: NodePath::column("Cat", "Name"),
                    flags: make_bitflags!(MovementFlag::{Name | Parent}),
                }],
            )],
        );

        assert!(err.to_string().contains("only renames are supported"));
    }

    #[test]
    fn type_changes_swap_the_column() {
        let mut native = cats_schema();
        let mut target = cats_schema();
        {
            let name = target.table_mut("Cat").unwrap().column_mut("Name").unwrap();
            name.tpe.family = ColumnTypeFamily::String { length: Some(200) };
            name.tpe.arity = ColumnArity::Required;
            name.default = Some(DefaultValue::value("Kitty"));
        }

        let commands = translate(
            &MssqlFlavour,
            Capabilities::new(Capability::ColumnRename),
            &mut native,
            &target,
            vec![(
                UpgradeStage::Upgrade,
                vec![NodeAction::property_change(
                    NodePath::column("Cat", "Name"),
                    ChangedProperty::Type,
                )],
            )],
        );

        expect![[r#"
            -- upgrade
            EXEC sp_rename 'Cat.Name', 'TempName', 'COLUMN';
            ALTER TABLE [Cat] ADD [Name] nvarchar(200) NOT NULL CONSTRAINT [DF_Cat_Name] DEFAULT N'Kitty';
            UPDATE [Cat] SET [Name] = CASE WHEN [TempName] IS NULL THEN N'Kitty' ELSE CAST([TempName] AS nvarchar(200)) END;

            -- cleanup
            ALTER TABLE [Cat] DROP COLUMN [TempName];
        "#]]
        .assert_eq(&commands.render_script());

        assert_eq!(native.table("Cat").unwrap().column("Name"), target.table("Cat").unwrap().column("Name"));
        assert!(native.table("Cat").unwrap().column("TempName").is_none());
    }

    #[test]
    fn unconvertible_type_changes_drop_the_values() {
        let mut native = cats_schema();
        let mut target = cats_schema();
        target.table_mut("Cat").unwrap().column_mut("Name").unwrap().tpe.family = ColumnTypeFamily::Geometry;

        let commands = translate(
            &PostgresFlavour,
            Capabilities::new(Capability::ColumnRename),
            &mut native,
            &target,
            vec![(
                UpgradeStage::Upgrade,
                vec![NodeAction::property_change(NodePath::column("Cat", "Name"), ChangedProperty::Type)],
            )],
        );

        assert!(commands.commands(CommandBucket::Upgrade).all(|c| !c.starts_with("UPDATE")));
    }

    #[test]
    fn sequence_increments_restart_at_the_current_value() {
        let stages = || {
            vec![(
                UpgradeStage::Upgrade,
                vec![NodeAction::property_change(
                    NodePath::sequence("Tickets"),
                    ChangedProperty::Increment,
                )],
            )]
        };
        let schema = |increment| {
            let mut schema = sql_schema_model::SqlSchema::default();
            schema.push_sequence(Sequence::new("Tickets", 1, increment));
            schema
        };
        let target = schema(10);

        let mut connection = RecordingConnection::with_scalar(ScalarValue::Int(41));
        let mut native = schema(1);
        let commands = translate_with(
            &PostgresFlavour,
            Capabilities::new(Capability::Sequences),
            &mut native,
            &target,
            &mut connection,
            stages(),
        );

        assert_eq!(connection.queries, vec![r#"SELECT last_value FROM "Tickets""#]);
        assert_eq!(
            commands.get(CommandBucket::Upgrade),
            &[r#"ALTER SEQUENCE "Tickets" INCREMENT BY 10 RESTART WITH 51"#.to_owned()]
        );
        assert_eq!(native.sequence("Tickets").unwrap().increment, 10);

        let mut connection = RecordingConnection::with_scalar(ScalarValue::Int(41));
        let mut emulated = schema(1);
        let commands = translate_with(
            &MssqlFlavour,
            Capabilities::new(Capability::InsertDefaultValues),
            &mut emulated,
            &target,
            &mut connection,
            stages(),
        );

        assert_eq!(connection.queries, vec!["SELECT MAX([ID]) FROM [Tickets]"]);
        expect![[r#"
            -- upgrade
            DROP TABLE [Tickets];
            CREATE TABLE [Tickets] (
                [ID] bigint IDENTITY(51, 10) NOT NULL,
                CONSTRAINT [PK_Tickets] PRIMARY KEY CLUSTERED ([ID])
            );
        "#]]
        .assert_eq(&commands.render_script());
        assert_eq!(native, emulated);
    }

    #[test]
    fn sequence_restarts_past_the_integer_range_are_rejected() {
        let mut native = sql_schema_model::SqlSchema::default();
        native.push_sequence(Sequence::new("Tickets", 1, 1));
        let mut target = sql_schema_model::SqlSchema::default();
        target.push_sequence(Sequence::new("Tickets", 1, 10));

        let mut connection = RecordingConnection::with_scalar(ScalarValue::Int(i64::MAX - 5));
        let err = UpgradeActionTranslator::new(
            &PostgresFlavour,
            Capabilities::new(Capability::Sequences),
            &mut native,
            &target,
            &mut connection,
        )
        .translate(&{
            let mut sequence = ActionSequence::default();
            sequence.push_group(
                UpgradeStage::Upgrade,
                vec![NodeAction::property_change(
                    NodePath::sequence("Tickets"),
                    ChangedProperty::Increment,
                )],
            );
            sequence
        })
        .unwrap_err();

        assert!(err.to_string().contains("overflows"), "{err}");
        assert_eq!(native.sequence("Tickets").unwrap().increment, 1);
    }

    #[test]
    fn altering_a_primary_key_in_place_is_not_supported() {
        let mut native = cats_schema();
        let err = translate_err(
            &PostgresFlavour,
            Capabilities::default(),
            &mut native,
            &Default::default(),
            vec![(
                UpgradeStage::Upgrade,
                vec![NodeAction::property_change(
                    NodePath::primary_key("Cat"),
                    ChangedProperty::Other("Clustered".into()),
                )],
            )],
        );

        assert!(err.is_contract_violation());
    }
}
