//! Detection of the actions of a sequence that would lose data.

use serde::Serialize;
use sql_schema_connector::TranslatorOptions;
use sql_schema_model::{
    actions::{ActionSequence, ChangedProperty, NodeAction},
    hints::{CopyDataHint, DataHint},
    Node, NodeAddress, NodePath, SqlSchema,
};

/// A data loss warning about one action of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationWarning {
    pub description: String,
    /// The index of the action, counting the actions of the sequence depth first, groupings
    /// excluded.
    pub step_index: usize,
}

/// The warnings of a destructive change check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestructiveChangeDiagnostics {
    pub warnings: Vec<MigrationWarning>,
}

impl DestructiveChangeDiagnostics {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, step_index: usize, description: String) {
        self.warnings.push(MigrationWarning {
            description,
            step_index,
        });
    }
}

/// Classifies the actions of a sequence as safe or data-losing.
///
/// Removing a table, column, primary key, unique index or foreign key loses data. A table removal
/// is safe when a copy hint of the same sequence reads from the table, and a column removal when a
/// copy hint reads the column. Changing a column to a type its values cannot be converted to loses
/// them, unless the conversion is enforced.
pub struct DestructiveChangeChecker<'a> {
    extracted: &'a SqlSchema,
    target: &'a SqlSchema,
    options: &'a TranslatorOptions,
}

impl<'a> DestructiveChangeChecker<'a> {
    pub fn new(extracted: &'a SqlSchema, target: &'a SqlSchema, options: &'a TranslatorOptions) -> Self {
        DestructiveChangeChecker {
            extracted,
            target,
            options,
        }
    }

    pub fn check(&self, actions: &ActionSequence) -> DestructiveChangeDiagnostics {
        let copies: Vec<&CopyDataHint> = actions
            .data_hints()
            .filter_map(|hint| match hint {
                DataHint::CopyData(copy) => Some(copy),
                _ => None,
            })
            .collect();
        let mut diagnostics = DestructiveChangeDiagnostics::new();

        let steps = actions
            .walk()
            .filter(|action| !matches!(action, NodeAction::Group(_)))
            .enumerate();

        for (step_index, action) in steps {
            let warning = match action {
                NodeAction::Remove { path } => self.check_removal(path, &copies),
                NodeAction::PropertyChange {
                    path,
                    property: ChangedProperty::Type,
                } => self.check_type_change(path),
                _ => None,
            };

            if let Some(description) = warning {
                tracing::warn!(step_index, "{description}");
                diagnostics.add_warning(step_index, description);
            }
        }

        diagnostics
    }

    fn check_removal(&self, path: &NodePath, copies: &[&CopyDataHint]) -> Option<String> {
        let address = path.address().ok()?;

        let copied = match &address {
            NodeAddress::Table { table } => copies.iter().any(|copy| copy.source_table == *table),
            NodeAddress::Column { table, column } => copies.iter().any(|copy| {
                copy.source_table == *table && copy.columns.iter().any(|(source, _)| source == column)
            }),
            _ => false,
        };

        if copied {
            return None;
        }

        let node = self.extracted.resolve(&address)?;

        let destructive = match node {
            Node::Table(_) | Node::Column(_) | Node::PrimaryKey(..) | Node::ForeignKey(_) => true,
            Node::SecondaryIndex(_, index) => index.unique,
            Node::Catalog(_) | Node::FullTextIndex(..) | Node::Sequence(_) => false,
        };

        destructive.then(|| format!("You are about to drop {}. The data it holds will be lost.", node.describe()))
    }

    fn check_type_change(&self, path: &NodePath) -> Option<String> {
        let NodeAddress::Column { table, column } = path.address().ok()? else {
            return None;
        };

        let previous = self.extracted.table_walker(&table)?.column(&column)?;
        let next = self.target.table_walker(&table)?.column(&column)?;

        let convertible = previous
            .column_type_family()
            .change_to(next.column_type_family())
            .is_convertible();

        if convertible || self.options.is_conversion_enforced(path) {
            return None;
        }

        Some(format!(
            "The values of column `{table}`.`{column}` cannot be converted to the new type and will be lost."
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sql_schema_model::{
        actions::UpgradeStage,
        hints::{ColumnRef, DeleteDataHint, IdentityPair},
        Column, ColumnArity, ColumnTypeFamily, SecondaryIndex, Table,
    };

    fn dogs() -> SqlSchema {
        let mut schema = SqlSchema::default();
        schema.push_table(
            Table::new("Dog")
                .with_column(Column::new("Id", ColumnTypeFamily::Int, ColumnArity::Required))
                .with_column(Column::new("Tag", ColumnTypeFamily::Uuid, ColumnArity::Nullable))
                .with_index(SecondaryIndex::new("IX_Dog_Tag", &["Tag"]))
                .with_index(SecondaryIndex::new("UQ_Dog_Tag", &["Tag"]).unique()),
        );
        schema
    }

    fn copy_from_dogs(columns: &[&str]) -> NodeAction {
        NodeAction::Data(DataHint::CopyData(CopyDataHint {
            source_table: "Dog".into(),
            target_table: "Puppy".into(),
            columns: columns.iter().map(|c| (c.to_string(), c.to_string())).collect(),
            identities: vec![IdentityPair::columns(ColumnRef::new("Dog", "Id"), ColumnRef::new("Puppy", "Id"))],
        }))
    }

    #[test]
    fn removals_lose_data_unless_copied() {
        let extracted = dogs();
        let options = TranslatorOptions::default();
        let checker = DestructiveChangeChecker::new(&extracted, &extracted, &options);

        let mut actions = ActionSequence::default();
        actions.push_group(
            UpgradeStage::Cleanup,
            vec![
                NodeAction::remove(NodePath::index("Dog", "IX_Dog_Tag")),
                NodeAction::remove(NodePath::index("Dog", "UQ_Dog_Tag")),
                NodeAction::remove(NodePath::column("Dog", "Tag")),
            ],
        );

        let diagnostics = checker.check(&actions);
        let steps: Vec<_> = diagnostics.warnings.iter().map(|w| w.step_index).collect();
        assert_eq!(steps, vec![1, 2]);
        assert_eq!(
            diagnostics.warnings[1].description,
            "You are about to drop column `Dog`.`Tag`. The data it holds will be lost."
        );

        actions.push_group(
            UpgradeStage::DataCleanup,
            vec![NodeAction::Data(DataHint::DeleteData(DeleteDataHint {
                source_table: "Dog".into(),
                identities: vec![IdentityPair::constant(ColumnRef::new("Dog", "Id"), 1)],
                post_copy: false,
            }))],
        );

        let steps: Vec<_> = checker.check(&actions).warnings.iter().map(|w| w.step_index).collect();
        assert_eq!(steps, vec![1, 2]);

        actions.push_group(UpgradeStage::CopyData, vec![copy_from_dogs(&["Id"])]);
        let steps: Vec<_> = checker.check(&actions).warnings.iter().map(|w| w.step_index).collect();
        assert_eq!(steps, vec![1, 2]);

        actions.push_group(UpgradeStage::CopyData, vec![copy_from_dogs(&["Tag"])]);
        let steps: Vec<_> = checker.check(&actions).warnings.iter().map(|w| w.step_index).collect();
        assert_eq!(steps, vec![1]);
    }

    #[test]
    fn table_removals_are_safe_when_their_rows_are_copied() {
        let extracted = dogs();
        let options = TranslatorOptions::default();
        let checker = DestructiveChangeChecker::new(&extracted, &extracted, &options);

        let mut actions = ActionSequence::default();
        actions.push_group(UpgradeStage::Cleanup, vec![NodeAction::remove(NodePath::table("Dog"))]);
        assert_eq!(
            checker.check(&actions).warnings[0].description,
            "You are about to drop table `Dog`. The data it holds will be lost."
        );

        actions.push_group(UpgradeStage::CopyData, vec![copy_from_dogs(&["Id"])]);
        assert!(!checker.check(&actions).has_warnings());
    }

    #[test]
    fn unconvertible_type_changes_lose_data_unless_enforced() {
        let extracted = dogs();
        let mut target = dogs();
        target.table_mut("Dog").unwrap().column_mut("Tag").unwrap().tpe.family = ColumnTypeFamily::Int;

        let mut actions = ActionSequence::default();
        actions.push_group(
            UpgradeStage::Upgrade,
            vec![NodeAction::property_change(
                NodePath::column("Dog", "Tag"),
                ChangedProperty::Type,
            )],
        );

        let options = TranslatorOptions::default();
        let diagnostics = DestructiveChangeChecker::new(&extracted, &target, &options).check(&actions);
        assert_eq!(diagnostics.warnings.len(), 1);

        let options = TranslatorOptions {
            enforced_conversions: vec![NodePath::column("Dog", "Tag")],
            ..Default::default()
        };
        let diagnostics = DestructiveChangeChecker::new(&extracted, &target, &options).check(&actions);
        assert!(!diagnostics.has_warnings());
    }
}
