//! Named, ref-counted references to a buffer at a particular revision.
//!
//! A savepoint's `Buffer` clone is O(1) because `Buffer` is persistent — the
//! manager exists to give long-lived buffer snapshots stable ids, metadata,
//! and a lifetime independent of whatever `History` does to its own
//! revision tree afterward.

use super::RevisionId;
use crate::buffer::Buffer;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

pub type SavePointId = u64;

/// Caller-supplied context attached to a savepoint at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavePointMetadata {
    pub user_id: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
}

/// A savepoint as returned to callers: an owned snapshot, not a handle into
/// the manager's internal table.
#[derive(Clone)]
pub struct SavePoint {
    pub id: SavePointId,
    pub buffer: Buffer,
    pub revision_id: RevisionId,
    pub metadata: SavePointMetadata,
    pub created_at: SystemTime,
}

struct Entry {
    buffer: Buffer,
    revision_id: RevisionId,
    metadata: SavePointMetadata,
    created_at: SystemTime,
    ref_count: usize,
}

impl Entry {
    fn to_savepoint(&self, id: SavePointId) -> SavePoint {
        SavePoint {
            id,
            buffer: self.buffer.clone(),
            revision_id: self.revision_id,
            metadata: self.metadata.clone(),
            created_at: self.created_at,
        }
    }
}

/// A query over live savepoints. Every field is an optional filter;
/// omitted fields match everything.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub user_id: Option<String>,
    pub tags: Vec<String>,
    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
    pub description_substring: Option<String>,
    pub limit: Option<usize>,
}

impl QueryFilter {
    fn matches(&self, entry: &Entry) -> bool {
        if let Some(uid) = &self.user_id {
            if entry.metadata.user_id.as_deref() != Some(uid.as_str()) {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().all(|t| entry.metadata.tags.contains(t)) {
            return false;
        }
        if let Some(start) = self.start_time {
            if entry.created_at < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if entry.created_at > end {
                return false;
            }
        }
        if let Some(substr) = &self.description_substring {
            let matches = entry
                .metadata
                .description
                .as_ref()
                .map(|d| d.contains(substr.as_str()))
                .unwrap_or(false);
            if !matches {
                return false;
            }
        }
        true
    }
}

struct ManagerState {
    entries: HashMap<SavePointId, Entry>,
    next_id: SavePointId,
}

/// Reader-writer-locked table of savepoints, safe to share via
/// `Arc<SavePointManager>` the same way `History` is.
pub struct SavePointManager {
    state: RwLock<ManagerState>,
}

impl SavePointManager {
    #[must_use]
    pub fn new() -> Self {
        SavePointManager {
            state: RwLock::new(ManagerState {
                entries: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Stores a new savepoint with `ref_count = 1` and returns its id.
    pub fn create(
        &self,
        buffer: Buffer,
        revision_id: RevisionId,
        metadata: Option<SavePointMetadata>,
    ) -> SavePointId {
        let mut state = self.state.write().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.entries.insert(
            id,
            Entry {
                buffer,
                revision_id,
                metadata: metadata.unwrap_or_default(),
                created_at: SystemTime::now(),
                ref_count: 1,
            },
        );
        id
    }

    /// Looks up a savepoint and increments its reference count. Pair with
    /// [`SavePointManager::release`] once the caller is done holding it.
    pub fn get(&self, id: SavePointId) -> Option<SavePoint> {
        let mut state = self.state.write().unwrap();
        let entry = state.entries.get_mut(&id)?;
        entry.ref_count += 1;
        Some(entry.to_savepoint(id))
    }

    /// Decrements the reference count, removing the entry once it reaches
    /// zero. A release on an unknown id is a no-op.
    pub fn release(&self, id: SavePointId) {
        let mut state = self.state.write().unwrap();
        let remove = match state.entries.get_mut(&id) {
            Some(entry) => {
                entry.ref_count = entry.ref_count.saturating_sub(1);
                entry.ref_count == 0
            }
            None => false,
        };
        if remove {
            state.entries.remove(&id);
        }
    }

    /// Returns the stored buffer without touching the reference count —
    /// cloning a persistent buffer is O(1), so this is the cheap read path.
    pub fn restore(&self, id: SavePointId) -> Option<Buffer> {
        let state = self.state.read().unwrap();
        state.entries.get(&id).map(|e| e.buffer.clone())
    }

    /// Returns every live savepoint matching `filter`, oldest first, capped
    /// at `filter.limit` if set.
    #[must_use]
    pub fn query(&self, filter: &QueryFilter) -> Vec<SavePoint> {
        let state = self.state.read().unwrap();
        let mut matches: Vec<SavePoint> = state
            .entries
            .iter()
            .filter(|(_, entry)| filter.matches(entry))
            .map(|(id, entry)| entry.to_savepoint(*id))
            .collect();
        matches.sort_by_key(|s| s.created_at);
        if let Some(limit) = filter.limit {
            matches.truncate(limit);
        }
        matches
    }

    /// Removes every savepoint older than `duration`, independent of its
    /// reference count (live holders keep their own `Buffer` clone
    /// regardless). Returns the number removed.
    pub fn clean_older_than(&self, duration: Duration) -> usize {
        let Some(cutoff) = SystemTime::now().checked_sub(duration) else {
            return 0;
        };
        let mut state = self.state.write().unwrap();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.created_at >= cutoff);
        before - state.entries.len()
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap();
        state.entries.clear();
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.state.read().unwrap().entries.len()
    }
}

impl Default for SavePointManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "savepoint_tests.rs"]
mod tests;
