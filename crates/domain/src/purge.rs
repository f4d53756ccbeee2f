use ddbtools_core::{AppError, AppResult};
use serde::Serialize;

/// Lifecycle of a single purge operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgePhase {
    /// Nothing has happened yet.
    Idle,
    /// Reading the table's key schema.
    ResolvingSchema,
    /// Enumerating every record key.
    Scanning,
    /// Issuing bulk-delete requests.
    Deleting,
    /// All batches have finished, successfully or not.
    Done,
    /// Schema resolution or scanning failed.
    Failed,
}

impl PurgePhase {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingSchema => "resolving_schema",
            Self::Scanning => "scanning",
            Self::Deleting => "deleting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns whether `next` is a legal successor of this phase.
    ///
    /// `Failed` is only reachable from schema resolution and scanning;
    /// deletion always ends in `Done`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::ResolvingSchema)
                | (Self::ResolvingSchema, Self::Scanning | Self::Failed)
                | (Self::Scanning, Self::Deleting | Self::Failed)
                | (Self::Deleting, Self::Done)
        )
    }

    /// Moves to `next`, rejecting illegal transitions.
    pub fn transition(self, next: Self) -> AppResult<Self> {
        if !self.can_transition_to(next) {
            return Err(AppError::Internal(format!(
                "illegal purge phase transition from '{}' to '{}'",
                self.as_str(),
                next.as_str()
            )));
        }

        Ok(next)
    }

    /// Returns whether the phase is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Result of processing one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    /// Zero-based batch index.
    pub batch_index: usize,
    /// Keys assigned to the batch.
    pub attempted: usize,
    /// Keys the provider acknowledged as deleted.
    pub deleted: usize,
    /// Keys dropped because they could not be marshalled.
    pub skipped: usize,
    /// Keys the provider returned as unprocessed.
    pub unprocessed: usize,
    /// Keys lost to a failed request or task.
    pub failed: usize,
    /// Request or task error, if any.
    pub error: Option<String>,
}

impl BatchOutcome {
    /// Creates an outcome for a batch whose task did not report back.
    #[must_use]
    pub fn lost(batch_index: usize, attempted: usize, error: impl Into<String>) -> Self {
        Self {
            batch_index,
            attempted,
            failed: attempted,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Returns whether every key in the batch was deleted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.deleted == self.attempted
    }
}

/// Aggregated outcome of the deletion phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeletionSummary {
    /// Batches processed.
    pub batches_total: usize,
    /// Batches whose keys were all deleted.
    pub batches_succeeded: usize,
    /// Batches with at least one key not deleted.
    pub batches_failed: usize,
    /// Keys confirmed deleted.
    pub items_deleted: usize,
    /// Keys skipped by marshal failures.
    pub items_skipped: usize,
    /// Keys returned unprocessed by the provider.
    pub items_unprocessed: usize,
    /// Keys lost to failed requests.
    pub items_failed: usize,
}

impl DeletionSummary {
    /// Folds one batch outcome into the summary.
    pub fn record(&mut self, outcome: &BatchOutcome) {
        self.batches_total += 1;
        if outcome.is_success() {
            self.batches_succeeded += 1;
        } else {
            self.batches_failed += 1;
        }

        self.items_deleted += outcome.deleted;
        self.items_skipped += outcome.skipped;
        self.items_unprocessed += outcome.unprocessed;
        self.items_failed += outcome.failed;
    }

    /// Returns the number of keys that may still be present in the table.
    #[must_use]
    pub fn items_remaining(&self) -> usize {
        self.items_skipped + self.items_unprocessed + self.items_failed
    }

    /// Returns whether every batch succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.batches_failed == 0
    }
}

impl<'a> FromIterator<&'a BatchOutcome> for DeletionSummary {
    fn from_iter<I: IntoIterator<Item = &'a BatchOutcome>>(outcomes: I) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }
}

/// Final report of a purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    table_name: String,
    observed_items: usize,
    deletion: DeletionSummary,
}

impl PurgeReport {
    /// Creates a purge report.
    #[must_use]
    pub fn new(
        table_name: impl Into<String>,
        observed_items: usize,
        deletion: DeletionSummary,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            observed_items,
            deletion,
        }
    }

    /// Returns the purged table's name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.table_name.as_str()
    }

    /// Returns the number of items counted by the scan.
    ///
    /// This is the figure reported to users. It is not a count of confirmed
    /// deletions; see [`PurgeReport::deletion`].
    #[must_use]
    pub fn observed_items(&self) -> usize {
        self.observed_items
    }

    /// Returns the deletion-phase summary.
    #[must_use]
    pub fn deletion(&self) -> &DeletionSummary {
        &self.deletion
    }
}
