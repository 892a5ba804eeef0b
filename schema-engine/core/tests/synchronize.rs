use pretty_assertions::assert_eq;
use schema_core::{
    ComparisonResult, ComparisonStatus, CoreError, CoreResult, RenameHint, SchemaComparer, SchemaExtractor,
    SchemaSynchronizer, SchemaUpgradeInput, UpgradeMode,
};
use sql_schema_connector::{BoxError, Capabilities, Capability, PostgresFlavour, SchemaConnection};
use sql_schema_model::{
    actions::{ActionSequence, ChangedProperty, NodeAction, UpgradeStage},
    Column, ColumnArity, ColumnTypeFamily, NodePath, PrimaryKey, ScalarValue, SqlSchema, Table,
};
use std::{cell::RefCell, rc::Rc};

fn things() -> SqlSchema {
    let mut schema = SqlSchema::default();
    schema.push_table(
        Table::new("T")
            .with_column(Column::new("Id", ColumnTypeFamily::Int, ColumnArity::Required))
            .with_column(Column::new(
                "Name",
                ColumnTypeFamily::String { length: Some(50) },
                ColumnArity::Nullable,
            ))
            .with_primary_key(PrimaryKey::new("PK_T", &["Id"])),
    );
    schema
}

/// Serves the schemas in order, repeating the last one.
struct QueueExtractor {
    schemas: Vec<SqlSchema>,
    extractions: usize,
    invalidations: usize,
}

impl QueueExtractor {
    fn new(schemas: Vec<SqlSchema>) -> Self {
        QueueExtractor {
            schemas,
            extractions: 0,
            invalidations: 0,
        }
    }
}

impl SchemaExtractor for QueueExtractor {
    fn extract(&mut self) -> CoreResult<SqlSchema> {
        let index = self.extractions.min(self.schemas.len() - 1);
        self.extractions += 1;
        Ok(self.schemas[index].clone())
    }

    fn invalidate_cache(&mut self) {
        self.invalidations += 1;
    }
}

struct FailingExtractor;

impl SchemaExtractor for FailingExtractor {
    fn extract(&mut self) -> CoreResult<SqlSchema> {
        Err(CoreError::Extraction("connection refused".into()))
    }

    fn invalidate_cache(&mut self) {}
}

/// Creates what is missing from the extracted schema, removes what is extra, and otherwise returns
/// a canned result.
#[derive(Default)]
struct TableComparer {
    canned: Option<ComparisonResult>,
    seen_hints: RefCell<Vec<RenameHint>>,
}

impl SchemaComparer for TableComparer {
    fn compare(&self, extracted: &SqlSchema, target: &SqlSchema, rename_hints: &[RenameHint]) -> ComparisonResult {
        self.seen_hints.borrow_mut().extend_from_slice(rename_hints);

        if let Some(canned) = &self.canned {
            return canned.clone();
        }

        let mut actions = ActionSequence::default();
        let mut mismatches = Vec::new();

        let removed: Vec<_> = extracted
            .tables
            .iter()
            .filter(|t| target.table(&t.name).is_none())
            .map(|t| NodeAction::remove(NodePath::table(&t.name)))
            .collect();
        let created: Vec<_> = target
            .tables
            .iter()
            .filter(|t| extracted.table(&t.name).is_none())
            .map(|t| NodeAction::create(NodePath::table(&t.name)))
            .collect();

        mismatches.extend(removed.iter().chain(&created).map(|a| a.to_string()));

        let status = match (removed.is_empty(), created.is_empty()) {
            (true, true) => ComparisonStatus::Equal,
            (false, true) => ComparisonStatus::TargetIsSubset,
            _ => ComparisonStatus::Different,
        };

        if !created.is_empty() {
            actions.push_group(UpgradeStage::Upgrade, created);
        }

        if !removed.is_empty() {
            actions.push_group(UpgradeStage::Cleanup, removed);
        }

        ComparisonResult {
            status,
            has_column_type_changes: false,
            legacy_compatible: status != ComparisonStatus::Different,
            actions,
            mismatches,
        }
    }
}

#[derive(Default)]
struct RecordingConnection {
    statements: Vec<String>,
}

impl SchemaConnection for RecordingConnection {
    fn execute_non_query(&mut self, sql: &str) -> Result<(), BoxError> {
        self.statements.push(sql.to_owned());
        Ok(())
    }

    fn execute_scalar(&mut self, _sql: &str) -> Result<Option<ScalarValue>, BoxError> {
        Ok(None)
    }

    fn begin_transaction(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A catalog following the `CREATE TABLE` and `DROP TABLE` statements run against it. Created tables
/// are taken from `target`.
#[derive(Clone)]
struct Catalog {
    schema: Rc<RefCell<SqlSchema>>,
    target: SqlSchema,
    statements: Vec<String>,
}

impl Catalog {
    fn new(schema: SqlSchema, target: SqlSchema) -> Self {
        Catalog {
            schema: Rc::new(RefCell::new(schema)),
            target,
            statements: Vec::new(),
        }
    }
}

fn quoted_name<'a>(statement: &'a str, prefix: &str) -> Option<&'a str> {
    statement.strip_prefix(prefix)?.split('"').nth(1)
}

impl SchemaExtractor for Catalog {
    fn extract(&mut self) -> CoreResult<SqlSchema> {
        Ok(self.schema.borrow().clone())
    }

    fn invalidate_cache(&mut self) {}
}

impl SchemaConnection for Catalog {
    fn execute_non_query(&mut self, sql: &str) -> Result<(), BoxError> {
        let mut schema = self.schema.borrow_mut();

        if let Some(name) = quoted_name(sql, "DROP TABLE ") {
            schema.remove_table(name).ok_or("no such table")?;
        } else if let Some(name) = quoted_name(sql, "CREATE TABLE ") {
            let table = self.target.table(name).ok_or("unknown table")?;
            schema.push_table(table.clone());
        }

        self.statements.push(sql.to_owned());
        Ok(())
    }

    fn execute_scalar(&mut self, _sql: &str) -> Result<Option<ScalarValue>, BoxError> {
        Ok(None)
    }

    fn begin_transaction(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

fn input(mode: UpgradeMode) -> SchemaUpgradeInput {
    SchemaUpgradeInput {
        mode,
        ..Default::default()
    }
}

#[test]
fn perform_creates_a_table_in_one_command() {
    let mut extractor = QueueExtractor::new(vec![SqlSchema::default()]);
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();

    let output = SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .with_capabilities(Capabilities::new(Capability::Sequences | Capability::Batches))
        .synchronize(&input(UpgradeMode::Perform), &things())
        .unwrap();

    assert_eq!(output.executed_commands, 1);
    assert!(output.warnings.is_empty());
    assert_eq!(connection.statements.len(), 1);
    assert!(connection.statements[0].starts_with(r#"CREATE TABLE "T""#));
    assert_eq!(extractor.invalidations, 1);
}

#[test]
fn nothing_to_do_keeps_the_extraction_cache() {
    let mut extractor = QueueExtractor::new(vec![things()]);
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();

    let output = SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .synchronize(&input(UpgradeMode::Perform), &things())
        .unwrap();

    assert_eq!(output.executed_commands, 0);
    assert_eq!(extractor.invalidations, 0);
}

#[test]
fn skip_only_extracts() {
    let mut extractor = QueueExtractor::new(vec![SqlSchema::default()]);
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();

    let output = SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .synchronize(&input(UpgradeMode::Skip), &things())
        .unwrap();

    assert_eq!(output.executed_commands, 0);
    assert_eq!(extractor.extractions, 1);
    assert!(connection.statements.is_empty());
}

#[test]
fn recreate_clears_the_database_first() {
    let mut old = SqlSchema::default();
    old.push_table(Table::new("Old").with_column(Column::new("Id", ColumnTypeFamily::Int, ColumnArity::Required)));

    let mut extractor = QueueExtractor::new(vec![old, SqlSchema::default()]);
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();

    SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .with_capabilities(Capabilities::default())
        .synchronize(&input(UpgradeMode::Recreate), &things())
        .unwrap();

    assert_eq!(connection.statements[0], r#"DROP TABLE "Old""#);
    assert!(connection.statements[1].starts_with(r#"CREATE TABLE "T""#));
    assert_eq!(extractor.extractions, 2);
    assert_eq!(extractor.invalidations, 2);
}

#[test]
fn recreating_twice_ends_in_the_same_state() {
    let mut old = SqlSchema::default();
    old.push_table(Table::new("Old").with_column(Column::new("Id", ColumnTypeFamily::Int, ColumnArity::Required)));

    let catalog = Catalog::new(old, things());
    let comparer = TableComparer::default();
    let mut runs = Vec::new();

    for _ in 0..2 {
        let mut extractor = catalog.clone();
        let mut connection = catalog.clone();

        SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
            .with_capabilities(Capabilities::default())
            .synchronize(&input(UpgradeMode::Recreate), &things())
            .unwrap();

        assert_eq!(*catalog.schema.borrow(), things());
        runs.push(connection.statements);
    }

    assert_eq!(runs[0][0], r#"DROP TABLE "Old""#);
    assert!(runs[1].contains(&r#"DROP TABLE "T""#.to_owned()));
    assert!(runs[0].last().unwrap().starts_with(r#"CREATE TABLE "T""#));
    assert_eq!(runs[0].last(), runs[1].last());
}

#[test]
fn recreate_on_an_empty_database_does_not_clear_it() {
    let mut extractor = QueueExtractor::new(vec![SqlSchema::default()]);
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();

    SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .synchronize(&input(UpgradeMode::Recreate), &SqlSchema::default())
        .unwrap();

    assert_eq!(extractor.extractions, 1);
    assert!(connection.statements.is_empty());
}

#[test]
fn validate_exact_fails_on_column_type_changes() {
    let mut extractor = QueueExtractor::new(vec![things()]);
    let comparer = TableComparer {
        canned: Some(ComparisonResult {
            has_column_type_changes: true,
            mismatches: vec!["Column `T`.`Name` differs in type".to_owned()],
            ..ComparisonResult::equal()
        }),
        ..Default::default()
    };
    let mut connection = RecordingConnection::default();

    let err = SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .synchronize(&input(UpgradeMode::ValidateExact), &things())
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Schema synchronization failed in validateExact mode: the database schema is not equal to the target \
         schema\nStatus: equal\nColumn type changes: yes\n- Column `T`.`Name` differs in type"
    );
    assert!(err.comparison().unwrap().has_column_type_changes);
    assert!(connection.statements.is_empty());
}

#[test]
fn validate_compatible_accepts_extra_tables() {
    let mut extracted = things();
    extracted.push_table(Table::new("Extra").with_column(Column::new(
        "Id",
        ColumnTypeFamily::Int,
        ColumnArity::Required,
    )));

    let mut extractor = QueueExtractor::new(vec![extracted]);
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();
    let mut synchronizer = SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection);

    synchronizer
        .synchronize(&input(UpgradeMode::ValidateCompatible), &things())
        .unwrap();
    synchronizer
        .synchronize(&input(UpgradeMode::ValidateLegacy), &things())
        .unwrap();

    let err = synchronizer
        .synchronize(&input(UpgradeMode::ValidateExact), &things())
        .unwrap_err();
    assert!(matches!(err, CoreError::SchemaSynchronizationFailed { .. }));
}

#[test]
fn validate_compatible_rejects_missing_tables() {
    let mut extractor = QueueExtractor::new(vec![SqlSchema::default()]);
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();

    let err = SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .synchronize(&input(UpgradeMode::ValidateCompatible), &things())
        .unwrap_err();

    assert_eq!(
        err.comparison().unwrap().mismatches,
        vec!["Create Tables/T".to_owned()]
    );
}

#[test]
fn validate_legacy_follows_the_comparer() {
    let mut extractor = QueueExtractor::new(vec![things()]);
    let comparer = TableComparer {
        canned: Some(ComparisonResult {
            status: ComparisonStatus::Different,
            legacy_compatible: true,
            ..ComparisonResult::equal()
        }),
        ..Default::default()
    };
    let mut connection = RecordingConnection::default();

    SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .synchronize(&input(UpgradeMode::ValidateLegacy), &things())
        .unwrap();
}

#[test]
fn perform_safely_refuses_to_lose_data() {
    let mut extracted = things();
    extracted.push_table(
        Table::new("Old").with_column(Column::new("Id", ColumnTypeFamily::Int, ColumnArity::Required)),
    );

    let mut extractor = QueueExtractor::new(vec![extracted.clone()]);
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();

    let err = SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .synchronize(&input(UpgradeMode::PerformSafely), &things())
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("the upgrade would lose data:\n  - You are about to drop table `Old`."));
    assert!(connection.statements.is_empty());

    let mut extractor = QueueExtractor::new(vec![extracted]);
    let output = SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .with_capabilities(Capabilities::default())
        .synchronize(&input(UpgradeMode::Perform), &things())
        .unwrap();

    assert_eq!(output.warnings.len(), 1);
    assert_eq!(connection.statements, vec![r#"DROP TABLE "Old""#.to_owned()]);
}

#[test]
fn rename_hints_reach_the_comparer() {
    let mut extractor = QueueExtractor::new(vec![things()]);
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();
    let hint = RenameHint {
        from: NodePath::column("T", "Label"),
        to: NodePath::column("T", "Name"),
    };

    let input = SchemaUpgradeInput {
        rename_hints: vec![hint.clone()],
        ..input(UpgradeMode::ValidateExact)
    };

    SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .synchronize(&input, &things())
        .unwrap();

    assert_eq!(comparer.seen_hints.borrow().as_slice(), &[hint]);
}

#[test]
fn translation_errors_abort_before_execution() {
    let mut extractor = QueueExtractor::new(vec![things()]);
    let mut actions = ActionSequence::default();
    actions.push_group(
        UpgradeStage::Upgrade,
        vec![NodeAction::property_change(
            NodePath::primary_key("T"),
            ChangedProperty::Other("Clustered".to_owned()),
        )],
    );
    let comparer = TableComparer {
        canned: Some(ComparisonResult {
            status: ComparisonStatus::Different,
            actions,
            ..ComparisonResult::equal()
        }),
        ..Default::default()
    };
    let mut connection = RecordingConnection::default();

    let err = SchemaSynchronizer::new(&PostgresFlavour, &mut extractor, &comparer, &mut connection)
        .synchronize(&input(UpgradeMode::Perform), &things())
        .unwrap_err();

    assert!(matches!(err, CoreError::Connector(_)));
    assert!(connection.statements.is_empty());
}

#[test]
fn extraction_errors_are_propagated() {
    let comparer = TableComparer::default();
    let mut connection = RecordingConnection::default();

    let err = SchemaSynchronizer::new(&PostgresFlavour, &mut FailingExtractor, &comparer, &mut connection)
        .synchronize(&input(UpgradeMode::Skip), &things())
        .unwrap_err();

    assert_eq!(err.to_string(), "Could not extract the database schema.");
}
