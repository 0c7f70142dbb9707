//! Per-item results of a traversal.
//!
//! Every traversal step returns an [`Outcome`] listing what it wrote and what
//! failed.  Whether an item failure ends the run or is recorded and skipped
//! is decided by [`FailurePolicy`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RepairError;

/// What happens when a single item cannot be read or decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and keep going.
    #[default]
    Skip,
    /// Return the first failure from `process`.
    Abort,
}

#[derive(Debug)]
pub enum ItemStatus {
    Written,
    Failed(RepairError),
}

/// The fate of one item, keyed by its destination path.
#[derive(Debug)]
pub struct ItemOutcome {
    pub path:   String,
    pub status: ItemStatus,
}

#[derive(Debug, Default)]
pub struct Outcome {
    pub items: Vec<ItemOutcome>,
}

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|i| match i.status {
            ItemStatus::Written   => Some(i.path.as_str()),
            ItemStatus::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &RepairError)> {
        self.items.iter().filter_map(|i| match &i.status {
            ItemStatus::Written     => None,
            ItemStatus::Failed(err) => Some((i.path.as_str(), err)),
        })
    }

    pub fn succeeded(&self) -> usize { self.written().count() }

    pub fn failed(&self) -> usize { self.failures().count() }

    pub fn merge(&mut self, other: Outcome) {
        self.items.extend(other.items);
    }

    pub(crate) fn record_written(&mut self, path: impl Into<String>) {
        self.items.push(ItemOutcome { path: path.into(), status: ItemStatus::Written });
    }

    /// Apply `policy` to an item result: propagate under `Abort`, record under `Skip`.
    pub(crate) fn settle(
        &mut self,
        policy: FailurePolicy,
        path:   &str,
        result: Result<(), RepairError>,
    ) -> Result<(), RepairError> {
        match result {
            Ok(()) => Ok(()),
            Err(err) if policy == FailurePolicy::Abort => Err(err),
            Err(err) => {
                warn!(path = %path, error = %err, "skipping item");
                self.items.push(ItemOutcome { path: path.to_owned(), status: ItemStatus::Failed(err) });
                Ok(())
            }
        }
    }
}
