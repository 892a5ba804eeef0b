use crate::{
    ComparisonResult, ComparisonStatus, CoreError, CoreResult, DestructiveChangeChecker, SchemaComparer,
    SchemaExtractor, SchemaUpgradeInput, SchemaUpgradeOutput, UpgradeMode,
};
use sql_schema_connector::{
    execute, Capabilities, SchemaConnection, SqlFlavour, TranslatorOptions, UpgradeActionTranslator,
};
use sql_schema_model::SqlSchema;
use std::time::Instant;

/// Brings a database in line with a target schema, according to an [UpgradeMode].
pub struct SchemaSynchronizer<'a> {
    flavour: &'a dyn SqlFlavour,
    capabilities: Capabilities,
    extractor: &'a mut dyn SchemaExtractor,
    comparer: &'a dyn SchemaComparer,
    connection: &'a mut dyn SchemaConnection,
}

impl<'a> SchemaSynchronizer<'a> {
    /// A synchronizer using the default capabilities of the flavour.
    pub fn new(
        flavour: &'a dyn SqlFlavour,
        extractor: &'a mut dyn SchemaExtractor,
        comparer: &'a dyn SchemaComparer,
        connection: &'a mut dyn SchemaConnection,
    ) -> Self {
        SchemaSynchronizer {
            flavour,
            capabilities: flavour.default_capabilities(),
            extractor,
            comparer,
            connection,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn synchronize(&mut self, input: &SchemaUpgradeInput, target: &SqlSchema) -> CoreResult<SchemaUpgradeOutput> {
        let mode = input.mode;
        let span = tracing::info_span!("synchronize_schema", %mode, family = ?self.flavour.family());
        let _guard = span.enter();
        let start = Instant::now();

        let mut output = SchemaUpgradeOutput::default();
        let mut extracted = self.extractor.extract()?;

        if mode == UpgradeMode::Recreate {
            let empty = SqlSchema::default();
            let clearing = self.comparer.compare(&extracted, &empty, &[]);

            if !extracted.is_empty() || clearing.has_column_type_changes {
                tracing::info!("Clearing the database");

                output.executed_commands +=
                    self.apply(&mut extracted, &empty, &clearing, &TranslatorOptions::default())?;
                self.extractor.invalidate_cache();
                extracted = self.extractor.extract()?;
            }
        }

        if mode == UpgradeMode::Skip {
            tracing::info!("Skipping the schema upgrade");
            return Ok(output);
        }

        let comparison = self.comparer.compare(&extracted, target, &input.rename_hints);
        tracing::debug!(status = %comparison.status, has_column_type_changes = comparison.has_column_type_changes);

        match mode {
            UpgradeMode::ValidateExact => {
                if comparison.status != ComparisonStatus::Equal || comparison.has_column_type_changes {
                    return Err(CoreError::synchronization_failed(
                        mode,
                        "the database schema is not equal to the target schema",
                        comparison,
                    ));
                }
            }
            UpgradeMode::ValidateCompatible => {
                if !matches!(
                    comparison.status,
                    ComparisonStatus::Equal | ComparisonStatus::TargetIsSubset
                ) {
                    return Err(CoreError::synchronization_failed(
                        mode,
                        "the database schema does not contain the target schema",
                        comparison,
                    ));
                }
            }
            UpgradeMode::ValidateLegacy => {
                if !comparison.legacy_compatible {
                    return Err(CoreError::synchronization_failed(
                        mode,
                        "the database schema is not compatible with the target schema",
                        comparison,
                    ));
                }
            }
            _ if mode.is_mutating() => {
                let diagnostics =
                    DestructiveChangeChecker::new(&extracted, target, &input.options).check(&comparison.actions);

                if mode == UpgradeMode::PerformSafely && diagnostics.has_warnings() {
                    let reason = diagnostics
                        .warnings
                        .iter()
                        .map(|warning| format!("\n  - {}", warning.description))
                        .collect::<String>();

                    return Err(CoreError::synchronization_failed(
                        mode,
                        format!("the upgrade would lose data:{reason}"),
                        comparison,
                    ));
                }

                let executed = self.apply(&mut extracted, target, &comparison, &input.options)?;
                if executed > 0 {
                    self.extractor.invalidate_cache();
                }

                output.executed_commands += executed;
                output.warnings = diagnostics.warnings;
            }
            _ => (),
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(elapsed_ms, executed_commands = output.executed_commands, "Schema synchronized");

        Ok(output)
    }

    /// Translate and execute the actions of `comparison`. Invalidating the extraction cache is left
    /// to the caller.
    fn apply(
        &mut self,
        extracted: &mut SqlSchema,
        target: &SqlSchema,
        comparison: &ComparisonResult,
        options: &TranslatorOptions,
    ) -> CoreResult<usize> {
        let commands = UpgradeActionTranslator::new(self.flavour, self.capabilities, extracted, target, self.connection)
            .with_options(options.clone())
            .translate(&comparison.actions)?;

        if commands.is_empty() {
            return Ok(0);
        }

        Ok(execute(commands, self.connection, &self.capabilities)?)
    }
}
