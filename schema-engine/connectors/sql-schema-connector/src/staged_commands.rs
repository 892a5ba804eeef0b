//! The output of a translation: SQL commands sorted into buckets executed in a fixed order.

use std::fmt::{self, Write as _};

/// The buckets of a staged command set, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandBucket {
    /// Runs outside of the upgrade transaction, before everything else.
    NonTransactionalProlog,
    PreCleanupData,
    CleanupData,
    PreUpgrade,
    Upgrade,
    CopyData,
    PostCopyData,
    Cleanup,
    /// Runs outside of the upgrade transaction, after everything else.
    NonTransactionalEpilog,
}

impl CommandBucket {
    pub const COUNT: usize = 9;

    pub const ALL: [CommandBucket; Self::COUNT] = [
        CommandBucket::NonTransactionalProlog,
        CommandBucket::PreCleanupData,
        CommandBucket::CleanupData,
        CommandBucket::PreUpgrade,
        CommandBucket::Upgrade,
        CommandBucket::CopyData,
        CommandBucket::PostCopyData,
        CommandBucket::Cleanup,
        CommandBucket::NonTransactionalEpilog,
    ];

    /// The bucket runs outside of the upgrade transaction.
    pub fn is_non_transactional(self) -> bool {
        matches!(
            self,
            CommandBucket::NonTransactionalProlog | CommandBucket::NonTransactionalEpilog
        )
    }

    /// The bucket holds data manipulation rather than DDL.
    pub fn is_data(self) -> bool {
        matches!(
            self,
            CommandBucket::CleanupData | CommandBucket::CopyData | CommandBucket::PostCopyData
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CommandBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandBucket::NonTransactionalProlog => "non-transactional-prolog",
            CommandBucket::PreCleanupData => "pre-cleanup-data",
            CommandBucket::CleanupData => "cleanup-data",
            CommandBucket::PreUpgrade => "pre-upgrade",
            CommandBucket::Upgrade => "upgrade",
            CommandBucket::CopyData => "copy-data",
            CommandBucket::PostCopyData => "post-copy-data",
            CommandBucket::Cleanup => "cleanup",
            CommandBucket::NonTransactionalEpilog => "non-transactional-epilog",
        };

        f.write_str(s)
    }
}

/// Append-only command lists, one per bucket. An empty string is a batch boundary: the commands on
/// either side of it never share a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StagedCommands {
    buckets: [Vec<String>; CommandBucket::COUNT],
}

impl StagedCommands {
    pub fn push(&mut self, bucket: CommandBucket, command: impl Into<String>) {
        let command = command.into();
        tracing::debug!(%bucket, %command);
        self.buckets[bucket.index()].push(command);
    }

    /// Insert a command ahead of the commands already in the bucket.
    pub fn push_front(&mut self, bucket: CommandBucket, command: impl Into<String>) {
        let command = command.into();
        tracing::debug!(%bucket, %command);
        self.buckets[bucket.index()].insert(0, command);
    }

    pub fn push_batch_boundary(&mut self, bucket: CommandBucket) {
        self.buckets[bucket.index()].push(String::new());
    }

    /// The commands of a bucket, batch boundaries included.
    pub fn get(&self, bucket: CommandBucket) -> &[String] {
        &self.buckets[bucket.index()]
    }

    /// The actual commands of a bucket, without batch boundaries.
    pub fn commands(&self, bucket: CommandBucket) -> impl Iterator<Item = &str> + '_ {
        self.get(bucket).iter().map(String::as_str).filter(|c| !c.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        CommandBucket::ALL
            .iter()
            .all(|bucket| self.commands(*bucket).next().is_none())
    }

    /// The number of commands, batch boundaries excluded.
    pub fn command_count(&self) -> usize {
        CommandBucket::ALL
            .iter()
            .map(|bucket| self.commands(*bucket).count())
            .sum()
    }

    /// The buckets in execution order, with their commands.
    pub fn iter(&self) -> impl Iterator<Item = (CommandBucket, &[String])> + '_ {
        CommandBucket::ALL
            .iter()
            .map(move |bucket| (*bucket, self.get(*bucket)))
    }

    /// All commands as one script, in execution order, under a header per non-empty bucket.
    pub fn render_script(&self) -> String {
        let mut script = String::new();

        for (bucket, _) in self.iter() {
            let mut commands = self.commands(bucket).peekable();

            if commands.peek().is_none() {
                continue;
            }

            if !script.is_empty() {
                script.push('\n');
            }

            writeln!(script, "-- {bucket}").unwrap();

            for command in commands {
                script.push_str(command);
                script.push_str(";\n");
            }
        }

        script
    }
}
