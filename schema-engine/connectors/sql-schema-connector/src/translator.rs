//! Translation of an action sequence into staged SQL commands.
//!
//! The translator walks the stage groupings of the sequence in upgrade order and renders each
//! action with the flavour, adapting the output to the backend capabilities. The native schema
//! mirror is kept in sync with every emitted command, so that later actions see the effects of
//! earlier ones (renames in particular).

mod alter;
mod create;
mod data;
mod remove;
mod temporary_name;

pub use temporary_name::temporary_name;

use crate::{
    flavour::SqlFlavour, Capabilities, Capability, CommandBucket, ConnectorError, ConnectorResult, ErrorKind,
    SchemaConnection, StagedCommands, TranslatorOptions,
};
use sql_schema_model::{
    actions::{ActionSequence, NodeAction, UpgradeStage},
    hints::{DataHint, DeleteDataHint, UpdateDataHint},
    NodePath, SqlSchema, Table,
};
use std::collections::HashSet;

/// Translates one action sequence into a [StagedCommands]. A translator is good for a single
/// `translate` call.
pub struct UpgradeActionTranslator<'a> {
    flavour: &'a dyn SqlFlavour,
    capabilities: Capabilities,
    options: TranslatorOptions,
    /// The extracted schema, updated as commands are emitted.
    native: &'a mut SqlSchema,
    target: &'a SqlSchema,
    connection: &'a mut dyn SchemaConnection,
    translated: bool,

    commands: StagedCommands,
    bucket: CommandBucket,
    created_tables: HashSet<String>,
    created_columns: HashSet<(String, String)>,
    removed_tables: HashSet<String>,
    delete_hints: Vec<DeleteDataHint>,
    update_hints: Vec<UpdateDataHint>,
}

impl<'a> UpgradeActionTranslator<'a> {
    pub fn new(
        flavour: &'a dyn SqlFlavour,
        capabilities: Capabilities,
        native: &'a mut SqlSchema,
        target: &'a SqlSchema,
        connection: &'a mut dyn SchemaConnection,
    ) -> Self {
        UpgradeActionTranslator {
            flavour,
            capabilities,
            options: TranslatorOptions::default(),
            native,
            target,
            connection,
            translated: false,
            commands: StagedCommands::default(),
            bucket: CommandBucket::PreCleanupData,
            created_tables: HashSet::new(),
            created_columns: HashSet::new(),
            removed_tables: HashSet::new(),
            delete_hints: Vec::new(),
            update_hints: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: TranslatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn translate(&mut self, actions: &ActionSequence) -> ConnectorResult<StagedCommands> {
        if self.translated {
            return Err(ErrorKind::AlreadyTranslated.into());
        }

        self.translated = true;

        let span = tracing::info_span!("translate_actions", family = ?self.flavour.family());
        let _guard = span.enter();

        let stages = actions.stages()?;

        for hint in actions.data_hints() {
            data::validate_hint(hint)?;

            match hint {
                DataHint::DeleteData(hint) => self.delete_hints.push(hint.clone()),
                DataHint::UpdateData(hint) => self.update_hints.push(hint.clone()),
                DataHint::CopyData(_) => (),
            }
        }

        for stage in UpgradeStage::ALL {
            self.bucket = stage_bucket(stage);

            for action in stages.actions(stage) {
                self.visit(action)?;
            }

            match stage {
                UpgradeStage::DataCleanup => self.flush_hints(false)?,
                UpgradeStage::PostCopyData => self.flush_hints(true)?,
                _ => (),
            }
        }

        // Constraints are checked immediately during the upgrade, and deferred again after it. Both
        // statements stay in the transactional buckets: they only apply to the current transaction.
        if self.capabilities.contains(Capability::DeferrableConstraints) && !self.commands.is_empty() {
            let immediate = self.flavour.render_set_constraints(false);
            let deferred = self.flavour.render_set_constraints(true);
            self.commands.push_front(CommandBucket::PreCleanupData, immediate);
            self.commands.push(CommandBucket::Cleanup, deferred);
        }

        let commands = std::mem::take(&mut self.commands);
        tracing::info!(commands = commands.command_count(), "actions translated");

        Ok(commands)
    }

    fn visit(&mut self, action: &NodeAction) -> ConnectorResult<()> {
        match action {
            NodeAction::Create { path } => self.create(path),
            NodeAction::Remove { path } => self.remove(path),
            NodeAction::Move { path, new_path, flags } => self.move_node(path, new_path, *flags),
            NodeAction::PropertyChange { path, property } => self.change_property(path, property),
            NodeAction::Group(group) => {
                for action in &group.actions {
                    self.visit(action)?;
                }

                Ok(())
            }
            NodeAction::Data(DataHint::CopyData(hint)) => self.copy_data(hint),
            // Flushed at the end of the data-cleanup and post-copy-data stages.
            NodeAction::Data(_) => Ok(()),
        }
    }

    fn push(&mut self, command: String) {
        self.commands.push(self.bucket, command);
    }

    fn push_all(&mut self, commands: Vec<String>) {
        for command in commands {
            self.push(command);
        }
    }

    fn native_table_mut(&mut self, name: &str) -> ConnectorResult<&mut Table> {
        self.native
            .table_mut(name)
            .ok_or_else(|| unresolved_native(&NodePath::table(name)))
    }

    fn is_created_table(&self, table: &str) -> bool {
        self.created_tables.contains(table)
    }
}

fn stage_bucket(stage: UpgradeStage) -> CommandBucket {
    match stage {
        UpgradeStage::DataCleanup => CommandBucket::CleanupData,
        UpgradeStage::Prepare | UpgradeStage::TemporaryRename => CommandBucket::PreUpgrade,
        UpgradeStage::Upgrade => CommandBucket::Upgrade,
        UpgradeStage::CopyData => CommandBucket::CopyData,
        UpgradeStage::PostCopyData => CommandBucket::PostCopyData,
        UpgradeStage::Cleanup => CommandBucket::Cleanup,
    }
}

fn unresolved_native(path: &NodePath) -> ConnectorError {
    ErrorKind::UnresolvedNode {
        path: path.clone(),
        schema: "extracted",
    }
    .into()
}

fn unresolved_target(path: &NodePath) -> ConnectorError {
    ErrorKind::UnresolvedNode {
        path: path.clone(),
        schema: "target",
    }
    .into()
}
