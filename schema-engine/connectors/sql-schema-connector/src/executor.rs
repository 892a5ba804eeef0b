use crate::{
    Capabilities, Capability, CommandBucket, ConnectorError, ConnectorResult, SchemaConnection, StagedCommands,
};
use std::time::Instant;

const STATEMENT_SEPARATOR: &str = ";\n";

/// Run the commands bucket by bucket, in execution order, on a connection with an open
/// transaction. The non-transactional buckets commit it first and open a new one after.
///
/// Returns the number of round-trips to the database.
pub fn execute(
    commands: StagedCommands,
    connection: &mut dyn SchemaConnection,
    capabilities: &Capabilities,
) -> ConnectorResult<usize> {
    let mut round_trips = 0;

    for (bucket, bucket_commands) in commands.iter() {
        let batches = batches(bucket, bucket_commands, capabilities);

        if batches.is_empty() {
            continue;
        }

        let span = tracing::info_span!("execute_bucket", %bucket, batches = batches.len());
        let _guard = span.enter();
        let start = Instant::now();

        if bucket.is_non_transactional() {
            connection
                .commit_transaction()
                .map_err(|err| ConnectorError::execution("COMMIT", err))?;
        }

        for (index, batch) in batches.iter().enumerate() {
            tracing::debug!(index, sql = %batch);

            connection
                .execute_non_query(batch)
                .map_err(|err| ConnectorError::execution(batch, err))?;

            round_trips += 1;
        }

        if bucket.is_non_transactional() {
            connection
                .begin_transaction()
                .map_err(|err| ConnectorError::execution("BEGIN", err))?;
        }

        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "bucket executed");
    }

    Ok(round_trips)
}

/// Group the commands of a bucket into round-trips.
fn batches(bucket: CommandBucket, commands: &[String], capabilities: &Capabilities) -> Vec<String> {
    let batched = capabilities.contains(Capability::Batches)
        && (bucket.is_data() || capabilities.contains(Capability::DdlBatches));

    if !batched {
        return commands.iter().filter(|c| !c.is_empty()).cloned().collect();
    }

    let max_length = capabilities.max_batch_length();
    let mut batches = Vec::new();
    let mut current = String::new();

    for command in commands {
        let fits = current.len() + STATEMENT_SEPARATOR.len() + command.len() <= max_length;

        if command.is_empty() || !fits {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }

            if command.is_empty() {
                continue;
            }
        }

        if !current.is_empty() {
            current.push_str(STATEMENT_SEPARATOR);
        }

        current.push_str(command);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}
