//! Cursor/selection positions expressed as character ranges, and how they
//! move across a [`ChangeSet`].
//!
//! Neither type touches a `Rope` — mapping a selection through an edit is
//! pure position algebra, exactly like `ChangeSet::map_position` itself.

use crate::changeset::{Association, ChangeSet};
use crate::error::Error;

/// One cursor or selection span. `anchor` is where the selection started,
/// `head` is the end the user is actively moving; for a plain cursor the
/// two are equal. Either may be the smaller position — direction matters
/// to callers doing shift-extend editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub anchor: usize,
    pub head: usize,
}

impl Range {
    #[must_use]
    pub fn new(anchor: usize, head: usize) -> Self {
        Range { anchor, head }
    }

    #[must_use]
    pub fn cursor(pos: usize) -> Self {
        Range { anchor: pos, head: pos }
    }

    #[must_use]
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    #[must_use]
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Maps both ends through `changes`, associating each with whichever
    /// side of an insertion at its own position the caller chooses. Text
    /// typed at a cursor conventionally pushes the cursor past it, so
    /// [`Range::map`] uses `Association::After` for both ends; use this
    /// directly for the rarer case of a cursor that should stay put.
    pub fn map_with(&self, changes: &ChangeSet, assoc: Association) -> Result<Range, Error> {
        Ok(Range {
            anchor: changes.map_position(self.anchor, assoc)?,
            head: changes.map_position(self.head, assoc)?,
        })
    }

    /// Maps both ends with `Association::After`, the usual "cursor follows
    /// what was typed at it" behavior.
    pub fn map(&self, changes: &ChangeSet) -> Result<Range, Error> {
        self.map_with(changes, Association::After)
    }
}

/// An ordered, non-overlapping set of ranges with one designated primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<Range>,
    primary: usize,
}

impl Selection {
    /// A selection with a single range.
    #[must_use]
    pub fn single(range: Range) -> Self {
        Selection {
            ranges: vec![range],
            primary: 0,
        }
    }

    /// Builds a selection from caller-ordered ranges. Rejects an empty list,
    /// an out-of-bounds primary index, or any two ranges whose `[start,
    /// end)` spans overlap.
    pub fn new(ranges: Vec<Range>, primary: usize) -> Result<Self, Error> {
        if ranges.is_empty() || primary >= ranges.len() {
            return Err(Error::OutOfBounds {
                pos: primary,
                len: ranges.len(),
            });
        }
        for w in ranges.windows(2) {
            if w[0].end() > w[1].start() {
                return Err(Error::CorruptTree(
                    "selection ranges must be ordered and non-overlapping".to_string(),
                ));
            }
        }
        Ok(Selection { ranges, primary })
    }

    #[must_use]
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    #[must_use]
    pub fn primary(&self) -> Range {
        self.ranges[self.primary]
    }

    #[must_use]
    pub fn primary_index(&self) -> usize {
        self.primary
    }

    /// Maps every range through `changes` with `Association::After`,
    /// preserving relative order (mapping is monotonic, so ranges that
    /// didn't overlap before the edit still don't after it).
    pub fn map(&self, changes: &ChangeSet) -> Result<Selection, Error> {
        let mapped = self
            .ranges
            .iter()
            .map(|r| r.map(changes))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Selection {
            ranges: mapped,
            primary: self.primary,
        })
    }
}
