//! Branching revision history over [`Transaction`]s.
//!
//! `History` never touches a `Rope` directly — callers apply the
//! `Transaction`s `commit`/`undo`/`redo`/`earlier`/`later` return to their
//! own live buffer. The tree is a `HashMap` keyed by a monotonically
//! increasing revision id rather than a `Vec`, so evicting an abandoned
//! branch doesn't require reindexing every revision after it. Index `0` is
//! reserved as the root sentinel and is never returned to a caller as a
//! "current" transaction to apply.

pub mod savepoint;

use crate::changeset::{ChangeSet, Transaction};
use crate::constants::history::DEFAULT_MAX_SIZE;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Identifies a single commit in a `History`. `0` is always the root
/// sentinel that precedes the first real commit.
pub type RevisionId = u64;

struct Revision {
    parent: Option<RevisionId>,
    children: Vec<RevisionId>,
    /// The child most recently reached by `commit` or `redo`; the default
    /// branch `redo()` follows.
    last_child: Option<RevisionId>,
    /// `None` only for the root sentinel.
    transaction: Option<Transaction>,
    timestamp: SystemTime,
}

struct State {
    revisions: HashMap<RevisionId, Revision>,
    current: RevisionId,
    next_id: RevisionId,
    root: RevisionId,
    evicted_count: usize,
    eviction_skipped: usize,
}

impl State {
    fn ancestors_of(&self, start: RevisionId) -> HashSet<RevisionId> {
        let mut set = HashSet::new();
        let mut cur = start;
        loop {
            set.insert(cur);
            match self.revisions.get(&cur).and_then(|r| r.parent) {
                Some(p) => cur = p,
                None => break,
            }
        }
        set
    }

    /// Evicts abandoned leaf revisions, oldest first, until the collection
    /// is back under `max_size` or only ancestors of `current` remain
    /// beyond the cap. The latter case is reported via `eviction_skipped`
    /// rather than forced, since evicting an ancestor would require
    /// repointing `current`'s own parent chain.
    fn evict_if_needed(&mut self, max_size: usize) {
        while self.revisions.len() > max_size {
            let ancestors = self.ancestors_of(self.current);
            let victim = self
                .revisions
                .iter()
                .filter(|(id, rev)| **id != self.root && !ancestors.contains(*id) && rev.children.is_empty())
                .min_by_key(|(_, rev)| rev.timestamp)
                .map(|(id, _)| *id);

            match victim {
                Some(id) => {
                    let parent = self.revisions.get(&id).and_then(|r| r.parent);
                    self.revisions.remove(&id);
                    if let Some(p) = parent {
                        if let Some(parent_rev) = self.revisions.get_mut(&p) {
                            parent_rev.children.retain(|&c| c != id);
                            if parent_rev.last_child == Some(id) {
                                parent_rev.last_child = parent_rev.children.last().copied();
                            }
                        }
                    }
                    self.evicted_count += 1;
                }
                None => {
                    self.eviction_skipped += 1;
                    break;
                }
            }
        }
    }
}

/// Point-in-time counters exposed for monitoring; never affects behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub revision_count: usize,
    pub evicted_count: usize,
    /// Number of commits where the collection exceeded `max_size` but every
    /// revision past the cap was an ancestor of `current`, so eviction was
    /// skipped for that commit rather than forced.
    pub eviction_skipped: usize,
}

/// A reader-writer-locked tree of commits. Cheap to share across threads
/// behind an `Arc<History>`; every mutating method takes `&self`.
pub struct History {
    state: RwLock<State>,
    max_size: usize,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_SIZE)
    }

    #[must_use]
    pub fn with_max_size(max_size: usize) -> Self {
        let mut revisions = HashMap::new();
        revisions.insert(
            0,
            Revision {
                parent: None,
                children: Vec::new(),
                last_child: None,
                transaction: None,
                timestamp: SystemTime::now(),
            },
        );
        History {
            state: RwLock::new(State {
                revisions,
                current: 0,
                next_id: 1,
                root: 0,
                evicted_count: 0,
                eviction_skipped: 0,
            }),
            max_size,
        }
    }

    #[must_use]
    pub fn current_id(&self) -> RevisionId {
        self.state.read().unwrap().current
    }

    #[must_use]
    pub fn at_root(&self) -> bool {
        let state = self.state.read().unwrap();
        state.current == state.root
    }

    #[must_use]
    pub fn at_tip(&self) -> bool {
        let state = self.state.read().unwrap();
        state
            .revisions
            .get(&state.current)
            .map(|r| r.last_child.is_none())
            .unwrap_or(true)
    }

    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        let state = self.state.read().unwrap();
        HistoryStats {
            revision_count: state.revisions.len(),
            evicted_count: state.evicted_count,
            eviction_skipped: state.eviction_skipped,
        }
    }

    /// Records `transaction`, which was applied to `pre_image` to reach the
    /// new current state. A no-op (empty change-set) is rejected without
    /// creating a revision. If `current` already has a `last_child` that
    /// differs from the freshly created revision — i.e. this commit follows
    /// one or more `undo()` calls rather than a `redo()` — the old branch is
    /// kept, just no longer the default `redo()` target.
    pub fn commit(
        &self,
        mut transaction: Transaction,
        pre_image: &crate::rope::Rope,
    ) -> Result<Option<RevisionId>, crate::error::Error> {
        if transaction.is_empty() {
            return Ok(None);
        }
        transaction.invert(pre_image)?;

        let mut state = self.state.write().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        let parent = state.current;

        state.revisions.insert(
            id,
            Revision {
                parent: Some(parent),
                children: Vec::new(),
                last_child: None,
                transaction: Some(transaction),
                timestamp: SystemTime::now(),
            },
        );
        if let Some(parent_rev) = state.revisions.get_mut(&parent) {
            parent_rev.children.push(id);
            parent_rev.last_child = Some(id);
        }
        state.current = id;
        let max_size = self.max_size;
        state.evict_if_needed(max_size);
        Ok(Some(id))
    }

    /// Moves `current` to its parent and returns the transaction that
    /// undoes the commit being left, or `None` at the root.
    pub fn undo(&self) -> Option<Transaction> {
        let mut state = self.state.write().unwrap();
        if state.current == state.root {
            return None;
        }
        let cur = state.current;
        let rev = state.revisions.get(&cur)?;
        let parent = rev.parent?;
        let inverse = rev.transaction.as_ref()?.cached_inverse()?.clone();
        state.current = parent;
        Some(Transaction::new(inverse))
    }

    /// Moves `current` to its `last_child` and returns that child's forward
    /// transaction, or `None` if there is nothing to redo.
    pub fn redo(&self) -> Option<Transaction> {
        let mut state = self.state.write().unwrap();
        let child = state.revisions.get(&state.current)?.last_child?;
        state.current = child;
        state.revisions.get(&child)?.transaction.clone()
    }

    /// Degraded single-step `earlier`: regardless of `steps`, walks exactly
    /// one revision back and returns that step's inversion. Composing the
    /// full `steps`-wide interval is left to `earlier_by`, which covers the
    /// same use case via elapsed time instead of a step count.
    pub fn earlier(&self, steps: usize) -> Option<Transaction> {
        if steps == 0 {
            return None;
        }
        self.undo()
    }

    /// Degraded single-step `later`, symmetric to [`History::earlier`].
    pub fn later(&self, steps: usize) -> Option<Transaction> {
        if steps == 0 {
            return None;
        }
        self.redo()
    }

    /// Walks back along the ancestor chain from `current`, composing every
    /// step whose commit happened within `duration` of now into one
    /// transaction, and moves `current` to the oldest such ancestor.
    pub fn earlier_by(&self, duration: Duration) -> Option<Transaction> {
        let mut state = self.state.write().unwrap();
        let cutoff = SystemTime::now().checked_sub(duration)?;

        let mut chain = Vec::new();
        let mut cur = state.current;
        while cur != state.root {
            chain.push(cur);
            cur = state.revisions.get(&cur)?.parent?;
        }
        if chain.is_empty() {
            return None;
        }

        // `chain` runs newest-to-oldest; timestamps are monotonic along a
        // branch, so a binary search finds the newest-to-cutoff boundary.
        let idx = chain.partition_point(|id| {
            state
                .revisions
                .get(id)
                .map(|r| r.timestamp > cutoff)
                .unwrap_or(false)
        });
        if idx == 0 {
            return None;
        }

        let mut composed: Option<ChangeSet> = None;
        for id in &chain[..idx] {
            let inv = state.revisions.get(id)?.transaction.as_ref()?.cached_inverse()?.clone();
            composed = Some(match composed {
                None => inv,
                Some(acc) => acc.compose(&inv).ok()?,
            });
        }
        state.current = chain.get(idx).copied().unwrap_or(state.root);
        composed.map(Transaction::new)
    }

    /// Walks forward along the `last_child` chain from `current`, composing
    /// every step committed within `duration` of `current`'s own timestamp,
    /// symmetric to [`History::earlier_by`].
    pub fn later_by(&self, duration: Duration) -> Option<Transaction> {
        let mut state = self.state.write().unwrap();
        let start_time = state.revisions.get(&state.current)?.timestamp;
        let cutoff = start_time.checked_add(duration)?;

        let mut chain = Vec::new();
        let mut cur = state.current;
        loop {
            let next = state.revisions.get(&cur)?.last_child;
            let Some(child) = next else { break };
            if state.revisions.get(&child)?.timestamp > cutoff {
                break;
            }
            chain.push(child);
            cur = child;
        }
        if chain.is_empty() {
            return None;
        }

        let mut composed: Option<ChangeSet> = None;
        for id in &chain {
            let fwd = state.revisions.get(id)?.transaction.as_ref()?.changes.clone();
            composed = Some(match composed {
                None => fwd,
                Some(acc) => acc.compose(&fwd).ok()?,
            });
        }
        state.current = cur;
        composed.map(Transaction::new)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
