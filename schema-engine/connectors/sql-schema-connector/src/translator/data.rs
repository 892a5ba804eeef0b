//! Data hints: copies run where they are visited, deletes and updates are flushed at the end of
//! the data-cleanup and post-copy-data stages.

use super::{unresolved_native, UpgradeActionTranslator};
use crate::{sql_renderer::IteratorJoin, Capability, CommandBucket, ConnectorResult, ErrorKind};
use indexmap::{IndexMap, IndexSet};
use petgraph::{algo, graph::NodeIndex, Graph};
use sql_schema_model::{
    hints::{ColumnRef, CopyDataHint, DataHint, DeleteDataHint, IdentityPair, IdentityValue, UpdateValue},
    NodePath, ScalarValue,
};

pub(super) fn validate_hint(hint: &DataHint) -> ConnectorResult<()> {
    let reason = match hint {
        DataHint::CopyData(copy) if copy.columns.is_empty() => Some("no columns to copy"),
        DataHint::UpdateData(update) if update.assignments.is_empty() => Some("no columns to update"),
        _ if hint.identities().is_empty() => Some("no identity pairs"),
        _ => None,
    };

    match reason {
        Some(reason) => Err(ErrorKind::InvalidDataHint {
            hint: hint.to_string(),
            reason,
        }
        .into()),
        None => Ok(()),
    }
}

impl<'a> UpgradeActionTranslator<'a> {
    pub(super) fn copy_data(&mut self, hint: &CopyDataHint) -> ConnectorResult<()> {
        let flavour = self.flavour;
        let source = flavour.quote(&hint.source_table);
        let target = flavour.quote(&hint.target_table);
        let predicates = self.render_predicates(&hint.identities);

        let correlated = hint.identities.iter().any(|identity| {
            identity.column.table == hint.target_table
                || matches!(&identity.value, IdentityValue::Column(column) if column.table == hint.target_table)
        });

        let command = if !correlated {
            format!(
                "INSERT INTO {target} ({}) SELECT {} FROM {source} WHERE {predicates}",
                hint.columns.iter().map(|(_, to)| flavour.quote(to)).join(", "),
                hint.columns
                    .iter()
                    .map(|(from, _)| self.render_column_ref(&ColumnRef::new(&hint.source_table, from)))
                    .join(", "),
            )
        } else if self.capabilities.contains(Capability::UpdateFrom) {
            format!(
                "UPDATE {target} SET {} FROM {source} WHERE {predicates}",
                hint.columns
                    .iter()
                    .map(|(from, to)| format!(
                        "{} = {}",
                        flavour.quote(to),
                        self.render_column_ref(&ColumnRef::new(&hint.source_table, from))
                    ))
                    .join(", "),
            )
        } else {
            format!(
                "UPDATE {target} SET {} WHERE EXISTS (SELECT 1 FROM {source} WHERE {predicates})",
                hint.columns
                    .iter()
                    .map(|(from, to)| format!(
                        "{} = (SELECT {} FROM {source} WHERE {predicates})",
                        flavour.quote(to),
                        self.render_column_ref(&ColumnRef::new(&hint.source_table, from))
                    ))
                    .join(", "),
            )
        };

        tracing::debug!(%source, %target, "Copying data");
        self.push(command);

        Ok(())
    }

    /// Emit the pending delete and update hints with the given `post_copy` flag.
    pub(super) fn flush_hints(&mut self, post_copy: bool) -> ConnectorResult<()> {
        let bucket = if post_copy {
            CommandBucket::PostCopyData
        } else {
            CommandBucket::CleanupData
        };

        let (constant_keyed, junctions): (Vec<&DeleteDataHint>, Vec<&DeleteDataHint>) = self
            .delete_hints
            .iter()
            .filter(|hint| hint.post_copy == post_copy)
            .partition(|hint| hint.is_constant_keyed());

        let mut commands = Vec::new();

        for hint in junctions {
            commands.push(self.render_junction_delete(hint));
        }

        let mut merged: IndexMap<&str, Vec<String>> = IndexMap::new();

        for hint in constant_keyed {
            merged
                .entry(hint.source_table.as_str())
                .or_default()
                .push(self.render_predicates(&hint.identities));
        }

        for table in self.deletion_order(merged.keys().copied())? {
            let groups = &merged[table];
            let condition = match groups.as_slice() {
                [single] => single.clone(),
                _ => groups.iter().map(|group| format!("({group})")).join(" OR "),
            };

            commands.push(format!("DELETE FROM {} WHERE {condition}", self.flavour.quote(table)));
        }

        for hint in self.update_hints.iter().filter(|hint| hint.post_copy == post_copy) {
            let mut assignments = Vec::with_capacity(hint.assignments.len());

            for (column, value) in &hint.assignments {
                assignments.push(format!(
                    "{} = {}",
                    self.flavour.quote(column),
                    self.render_update_value(&hint.source_table, column, value)?
                ));
            }

            commands.push(format!(
                "UPDATE {} SET {} WHERE {}",
                self.flavour.quote(&hint.source_table),
                assignments.join(", "),
                self.render_predicates(&hint.identities)
            ));
        }

        for command in commands {
            self.commands.push(bucket, command);
        }

        Ok(())
    }

    /// The tables in deletion order: a table comes before the tables it references.
    fn deletion_order<'t>(&self, tables: impl Iterator<Item = &'t str>) -> ConnectorResult<Vec<&'t str>> {
        let mut graph: Graph<&'t str, ()> = Graph::new();
        let nodes: IndexMap<&'t str, NodeIndex> = tables.map(|table| (table, graph.add_node(table))).collect();

        for (table, index) in &nodes {
            let Some(walker) = self.native.table_walker(table) else {
                continue;
            };

            for referenced in walker.referenced_tables() {
                match nodes.get(referenced) {
                    Some(other) if other != index => {
                        graph.update_edge(*index, *other, ());
                    }
                    _ => (),
                }
            }
        }

        let sorted = algo::toposort(&graph, None)
            .map_err(|cycle| ErrorKind::ForeignKeyCycle(graph[cycle.node_id()].to_owned()))?;

        Ok(sorted.into_iter().map(|index| graph[index]).collect())
    }

    fn render_junction_delete(&self, hint: &DeleteDataHint) -> String {
        let source = self.flavour.quote(&hint.source_table);
        let predicates = self.render_predicates(&hint.identities);

        let others: IndexSet<&str> = hint
            .identities
            .iter()
            .flat_map(|identity| {
                let value_table = match &identity.value {
                    IdentityValue::Column(column) => Some(column.table.as_str()),
                    IdentityValue::Constant(_) => None,
                };

                std::iter::once(identity.column.table.as_str()).chain(value_table)
            })
            .filter(|table| *table != hint.source_table)
            .collect();

        if others.is_empty() {
            format!("DELETE FROM {source} WHERE {predicates}")
        } else {
            format!(
                "DELETE FROM {source} WHERE EXISTS (SELECT 1 FROM {} WHERE {predicates})",
                others.iter().map(|table| self.flavour.quote(table)).join(", ")
            )
        }
    }

    fn render_update_value(&self, table: &str, column: &str, value: &UpdateValue) -> ConnectorResult<String> {
        match value {
            UpdateValue::Literal(value) => Ok(self.flavour.render_literal(value)),
            UpdateValue::Default if self.capabilities.contains(Capability::UpdateDefaultValues) => {
                Ok("DEFAULT".to_owned())
            }
            UpdateValue::Default => {
                let column = self
                    .native
                    .table_walker(table)
                    .and_then(|t| t.column(column))
                    .ok_or_else(|| unresolved_native(&NodePath::column(table, column)))?;

                Ok(column
                    .default()
                    .map(|default| self.flavour.render_default(table, column.name(), default))
                    .unwrap_or_else(|| "NULL".to_owned()))
            }
        }
    }

    fn render_predicates(&self, identities: &[IdentityPair]) -> String {
        identities
            .iter()
            .map(|identity| {
                let column = self.render_column_ref(&identity.column);

                match &identity.value {
                    IdentityValue::Column(other) => format!("{column} = {}", self.render_column_ref(other)),
                    IdentityValue::Constant(ScalarValue::Null) => format!("{column} IS NULL"),
                    IdentityValue::Constant(value) => format!("{column} = {}", self.flavour.render_literal(value)),
                }
            })
            .join(" AND ")
    }

    fn render_column_ref(&self, column: &ColumnRef) -> String {
        format!("{}.{}", self.flavour.quote(&column.table), self.flavour.quote(&column.column))
    }
}
