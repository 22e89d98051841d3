//! Selection of candidate transactions for a pending bulk write
//!
//! The anchor transaction is always selected. Every operation re-establishes
//! that before returning, and toggling the anchor off is a no-op.

use std::collections::BTreeSet;

use crate::models::TransactionSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    anchor: i64,
    selected: BTreeSet<i64>,
}

impl SelectionState {
    /// Start with only the anchor selected
    pub fn new(anchor: i64) -> Self {
        Self {
            anchor,
            selected: BTreeSet::from([anchor]),
        }
    }

    pub fn anchor(&self) -> i64 {
        self.anchor
    }

    pub fn select_all(&mut self, candidates: &[TransactionSummary]) {
        self.selected = candidates.iter().map(|c| c.id).collect();
        self.selected.insert(self.anchor);
    }

    /// Reset to `{anchor}`
    pub fn select_none(&mut self) {
        self.selected.clear();
        self.selected.insert(self.anchor);
    }

    /// Reset to the anchor plus every candidate satisfying `predicate`
    pub fn select_matching<F>(&mut self, candidates: &[TransactionSummary], predicate: F)
    where
        F: Fn(&TransactionSummary) -> bool,
    {
        self.selected = candidates
            .iter()
            .filter(|c| predicate(c))
            .map(|c| c.id)
            .collect();
        self.selected.insert(self.anchor);
    }

    /// Flip membership of `id`. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: i64) -> bool {
        if id == self.anchor {
            return true;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
            return true;
        }
        false
    }

    pub fn contains(&self, id: i64) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Always false: the anchor is a member
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids with the anchor first, the rest ascending
    pub fn ids(&self) -> Vec<i64> {
        std::iter::once(self.anchor)
            .chain(self.selected.iter().copied().filter(|id| *id != self.anchor))
            .collect()
    }
}
