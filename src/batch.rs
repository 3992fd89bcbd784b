//! Buffering of full-table replication.
//!
//! A full-table copy arrives framed as `begin`, one message per row, `end`.
//! Rows are held per relation until `end`, so interleaved copies of two
//! relations never land in the same batch.

use cdc_types::ChangeRow;
use tracing::{debug, warn};

use crate::registry::ReplicaRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Idle,
    Collecting,
}

/// Rows buffered for one relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationBatch {
    pub relation: String,
    pub rows: Vec<ChangeRow>,
}

/// What happened to a pushed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDisposition {
    Buffered,
    /// The relation has no replica
    Unreplicated,
    /// No `begin` was seen
    NotCollecting,
}

#[derive(Debug, Default)]
pub struct BatchAccumulator {
    state: BatchState,
    batches: Vec<RelationBatch>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Start a new full-table frame. Anything buffered by an unfinished
    /// frame is discarded.
    pub fn begin(&mut self) {
        let dropped: usize = self.batches.iter().map(|b| b.rows.len()).sum();
        if dropped > 0 {
            warn!("Full replication restarted, discarding {dropped} buffered rows");
        }
        self.batches.clear();
        self.state = BatchState::Collecting;
    }

    pub fn push(&mut self, row: ChangeRow, registry: &ReplicaRegistry) -> RowDisposition {
        if self.state != BatchState::Collecting {
            warn!(
                "Dropping full replication row for {} received without a begin",
                row.rel_name
            );
            return RowDisposition::NotCollecting;
        }
        if registry.lookup(&row.rel_name).is_none() {
            debug!("Skipping row of unreplicated relation {}", row.rel_name);
            return RowDisposition::Unreplicated;
        }

        match self.batches.iter_mut().find(|b| b.relation == row.rel_name) {
            Some(batch) => batch.rows.push(row),
            None => self.batches.push(RelationBatch {
                relation: row.rel_name.clone(),
                rows: vec![row],
            }),
        }
        RowDisposition::Buffered
    }

    /// End the frame: hand out every buffered relation in first-seen order
    /// and go back to idle.
    pub fn finish(&mut self) -> Vec<RelationBatch> {
        if self.state != BatchState::Collecting {
            debug!("Full replication end received without a begin");
        }
        self.state = BatchState::Idle;
        std::mem::take(&mut self.batches)
    }

    /// Number of rows currently buffered.
    pub fn buffered(&self) -> usize {
        self.batches.iter().map(|b| b.rows.len()).sum()
    }
}
