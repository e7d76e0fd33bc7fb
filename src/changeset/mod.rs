//! Operational-transformation change-sets: fused retain/delete/insert scripts
//! that transform a buffer of a known length into one of a computed length.
//!
//! A `ChangeSet` never touches a buffer itself; `apply` is the only bridge
//! to [`crate::rope::Rope`]. Everything else (`invert`, `compose`,
//! `transform`, `split`, `map_position`) is pure op-list algebra, which is
//! what lets undo, redo, and OT transform reuse the same representation.

mod cursor;

use crate::error::Error;
use crate::rope::Rope;
use cursor::{Cursor, Kind};

/// One op in a change-set's script. `Insert` carries its own text rather
/// than a length, since composing and inverting need the actual characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Retain(usize),
    Delete(usize),
    Insert(String),
}

/// Which side of an edit a pre-image position maps to when the edit and
/// the position coincide exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    Before,
    After,
}

/// Resolves simultaneous insertions at the same position during
/// [`ChangeSet::transform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreaker {
    /// `self`'s insertion ends up before `other`'s.
    Left,
    /// `other`'s insertion ends up before `self`'s.
    Right,
}

/// A fused sequence of ops over a buffer of `len_before` chars, producing
/// one of `len_after` chars. Construction and the builder methods maintain
/// normal form: no two adjacent ops share a kind, and no op has zero
/// length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    len_before: usize,
    ops: Vec<Op>,
    len_after: usize,
}

impl ChangeSet {
    pub fn new(len_before: usize) -> Self {
        ChangeSet {
            len_before,
            ops: Vec::new(),
            len_after: len_before,
        }
    }

    pub fn len_before(&self) -> usize {
        self.len_before
    }

    pub fn len_after(&self) -> usize {
        self.len_after
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn push(&mut self, op: Op) {
        match &op {
            Op::Retain(0) | Op::Delete(0) => return,
            Op::Insert(s) if s.is_empty() => return,
            _ => {}
        }
        match (self.ops.last_mut(), &op) {
            (Some(Op::Retain(a)), Op::Retain(b)) => *a += b,
            (Some(Op::Delete(a)), Op::Delete(b)) => *a += b,
            (Some(Op::Insert(a)), Op::Insert(b)) => a.push_str(b),
            _ => self.ops.push(op),
        }
    }

    /// Retain the next `n` chars of the pre-image unchanged.
    #[must_use]
    pub fn retain(mut self, n: usize) -> Self {
        if n > 0 {
            self.push(Op::Retain(n));
            // A retain consumes pre-image chars that were already counted
            // in `len_after`'s `len_before` starting point; it doesn't
            // change the running total.
        }
        self
    }

    /// Skip the next `n` chars of the pre-image.
    #[must_use]
    pub fn delete(mut self, n: usize) -> Self {
        if n > 0 {
            self.push(Op::Delete(n));
            self.len_after -= n;
        }
        self
    }

    /// Emit `s` into the post-image without consuming any pre-image chars.
    #[must_use]
    pub fn insert(mut self, s: &str) -> Self {
        if !s.is_empty() {
            self.push(Op::Insert(s.to_string()));
            self.len_after += s.chars().count();
        }
        self
    }

    /// Apply this change-set to `rope`, producing the post-image.
    ///
    /// Retained runs are carved out of `rope` with `split`, so they share
    /// structure with the input instead of being recopied char-by-char.
    pub fn apply(&self, rope: &Rope) -> Result<Rope, Error> {
        if rope.len_chars() != self.len_before {
            return Err(Error::LengthMismatch {
                expected: self.len_before,
                found: rope.len_chars(),
            });
        }
        let mut result = Rope::empty();
        let mut pos = 0usize;
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    let (_, rest) = rope.split(pos)?;
                    let (mid, _) = rest.split(*n)?;
                    result = result.concat(&mid);
                    pos += n;
                }
                Op::Delete(n) => pos += n,
                Op::Insert(s) => result = result.concat(&Rope::from_str(s)),
            }
        }
        Ok(result)
    }

    /// Compute the change-set that undoes this one, given the buffer it was
    /// originally applied to.
    pub fn invert(&self, pre_image: &Rope) -> Result<ChangeSet, Error> {
        if pre_image.len_chars() != self.len_before {
            return Err(Error::LengthMismatch {
                expected: self.len_before,
                found: pre_image.len_chars(),
            });
        }
        let mut out = ChangeSet::new(self.len_after);
        let mut pre_pos = 0usize;
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    out = out.retain(*n);
                    pre_pos += n;
                }
                Op::Insert(s) => out = out.delete(s.chars().count()),
                Op::Delete(n) => {
                    let deleted = pre_image.slice(pre_pos, pre_pos + n)?;
                    out = out.insert(&deleted);
                    pre_pos += n;
                }
            }
        }
        Ok(out)
    }

    /// Compose with `other`, producing a change-set equivalent to applying
    /// `self` then `other` in one pass. Requires `self.len_after ==
    /// other.len_before`.
    pub fn compose(&self, other: &ChangeSet) -> Result<ChangeSet, Error> {
        if self.len_after != other.len_before {
            return Err(Error::LengthMismatch {
                expected: self.len_after,
                found: other.len_before,
            });
        }
        let mut out = ChangeSet::new(self.len_before);
        let mut a = Cursor::new(&self.ops);
        let mut b = Cursor::new(&other.ops);
        loop {
            match (a.kind(), b.kind()) {
                (Kind::Done, Kind::Done) => break,
                (_, Kind::Insert) => out = out.insert(&b.take_insert()),
                (Kind::Delete, _) => {
                    let n = a.len();
                    out = out.delete(n);
                    a.consume(n);
                }
                (Kind::Retain, Kind::Retain) => {
                    let m = a.len().min(b.len());
                    out = out.retain(m);
                    a.consume(m);
                    b.consume(m);
                }
                (Kind::Retain, Kind::Delete) => {
                    let m = a.len().min(b.len());
                    out = out.delete(m);
                    a.consume(m);
                    b.consume(m);
                }
                (Kind::Insert, Kind::Retain) => {
                    let m = a.insert_char_count().min(b.len());
                    out = out.insert(&a.take_insert_prefix(m));
                    b.consume(m);
                }
                (Kind::Insert, Kind::Delete) => {
                    let m = a.insert_char_count().min(b.len());
                    a.take_insert_prefix(m);
                    b.consume(m);
                }
                (Kind::Done, _) | (_, Kind::Done) => {
                    return Err(Error::LengthMismatch {
                        expected: self.len_after,
                        found: other.len_before,
                    });
                }
            }
        }
        Ok(out)
    }

    /// Transform this change-set against a concurrent one built on the same
    /// pre-image, producing a change-set that can be applied after `other`
    /// has already been applied.
    pub fn transform(&self, other: &ChangeSet, tie_breaker: TieBreaker) -> Result<ChangeSet, Error> {
        if self.len_before != other.len_before {
            return Err(Error::LengthMismatch {
                expected: self.len_before,
                found: other.len_before,
            });
        }
        let mut out = ChangeSet::new(other.len_after);
        let mut a = Cursor::new(&self.ops);
        let mut b = Cursor::new(&other.ops);
        loop {
            let (ak, bk) = (a.kind(), b.kind());
            if ak == Kind::Done && bk == Kind::Done {
                break;
            }
            let self_first = matches!(tie_breaker, TieBreaker::Left);
            if self_first && ak == Kind::Insert {
                out = out.insert(&a.take_insert());
                continue;
            }
            if bk == Kind::Insert {
                out = out.retain(b.insert_char_count());
                b.take_insert();
                continue;
            }
            if ak == Kind::Insert {
                out = out.insert(&a.take_insert());
                continue;
            }
            match (ak, bk) {
                (Kind::Retain, Kind::Retain) => {
                    let m = a.len().min(b.len());
                    out = out.retain(m);
                    a.consume(m);
                    b.consume(m);
                }
                (Kind::Delete, Kind::Delete) => {
                    let m = a.len().min(b.len());
                    a.consume(m);
                    b.consume(m);
                }
                (Kind::Delete, Kind::Retain) => {
                    let m = a.len().min(b.len());
                    out = out.delete(m);
                    a.consume(m);
                    b.consume(m);
                }
                (Kind::Retain, Kind::Delete) => {
                    let m = a.len().min(b.len());
                    a.consume(m);
                    b.consume(m);
                }
                _ => {
                    return Err(Error::LengthMismatch {
                        expected: self.len_before,
                        found: other.len_before,
                    });
                }
            }
        }
        Ok(out)
    }

    /// Split at pre-image position `char_pos` into two change-sets that
    /// both share `self.len_before`, such that applying either alone to
    /// the pre-image and then the other to the result reproduces `self`'s
    /// effect. An insert exactly at `char_pos` belongs to `before` if it
    /// precedes the op that reaches the boundary, else to `after`.
    pub fn split(&self, char_pos: usize) -> Result<(ChangeSet, ChangeSet), Error> {
        if char_pos > self.len_before {
            return Err(Error::OutOfBounds {
                pos: char_pos,
                len: self.len_before,
            });
        }
        let mut before = ChangeSet::new(self.len_before);
        let mut after = ChangeSet::new(self.len_before);
        let mut consumed = 0usize;
        let mut in_before = true;
        for op in &self.ops {
            match op {
                Op::Insert(s) => {
                    if in_before {
                        before = before.insert(s);
                    } else {
                        after = after.insert(s);
                    }
                }
                Op::Retain(n) => {
                    if in_before {
                        if consumed + n <= char_pos {
                            before = before.retain(*n);
                            consumed += n;
                            if consumed == char_pos {
                                in_before = false;
                            }
                        } else {
                            let left = char_pos - consumed;
                            let right = n - left;
                            before = before.retain(left);
                            consumed = char_pos;
                            in_before = false;
                            after = after.retain(right);
                        }
                    } else {
                        after = after.retain(*n);
                    }
                }
                Op::Delete(n) => {
                    if in_before {
                        if consumed + n <= char_pos {
                            before = before.delete(*n);
                            consumed += n;
                            if consumed == char_pos {
                                in_before = false;
                            }
                        } else {
                            let left = char_pos - consumed;
                            let right = n - left;
                            before = before.delete(left);
                            consumed = char_pos;
                            in_before = false;
                            after = after.delete(right);
                        }
                    } else {
                        after = after.delete(*n);
                    }
                }
            }
        }
        before = before.retain(self.len_before - consumed);
        Ok((before, prepend_retain(after, char_pos)))
    }

    /// Map a pre-image character position through this change-set.
    pub fn map_position(&self, p: usize, assoc: Association) -> Result<usize, Error> {
        if p > self.len_before {
            return Err(Error::OutOfBounds {
                pos: p,
                len: self.len_before,
            });
        }
        let (pre, post, op_i) = self.advance_to(0, 0, 0, p);
        Ok(self.resolve_at(pre, post, op_i, p, assoc))
    }

    /// Map several pre-image positions at once, in O(|ps| + |ops|) when
    /// `ps` is sorted ascending. Caller order of the output always matches
    /// `ps`, regardless of sort order.
    pub fn map_positions(&self, ps: &[usize], assoc: Association) -> Result<Vec<usize>, Error> {
        for &p in ps {
            if p > self.len_before {
                return Err(Error::OutOfBounds {
                    pos: p,
                    len: self.len_before,
                });
            }
        }
        let mut order: Vec<usize> = (0..ps.len()).collect();
        order.sort_by_key(|&i| ps[i]);
        let mut out = vec![0usize; ps.len()];
        let (mut pre, mut post, mut op_i) = (0usize, 0usize, 0usize);
        for &i in &order {
            let p = ps[i];
            let advanced = self.advance_to(pre, post, op_i, p);
            pre = advanced.0;
            post = advanced.1;
            op_i = advanced.2;
            out[i] = self.resolve_at(pre, post, op_i, p, assoc);
        }
        Ok(out)
    }

    /// Advance the (pre, post, op index) cursor as far as it can go
    /// without passing pre-image position `p`.
    fn advance_to(&self, mut pre: usize, mut post: usize, mut op_i: usize, p: usize) -> (usize, usize, usize) {
        while op_i < self.ops.len() {
            match &self.ops[op_i] {
                Op::Insert(_) if pre == p => break,
                Op::Insert(s) => {
                    post += s.chars().count();
                    op_i += 1;
                }
                Op::Retain(n) => {
                    if p <= pre + n {
                        break;
                    }
                    pre += n;
                    post += n;
                    op_i += 1;
                }
                Op::Delete(n) => {
                    if p < pre + n {
                        break;
                    }
                    pre += n;
                    op_i += 1;
                }
            }
        }
        (pre, post, op_i)
    }

    fn resolve_at(&self, pre: usize, post: usize, op_i: usize, p: usize, assoc: Association) -> usize {
        if op_i >= self.ops.len() {
            return post;
        }
        match &self.ops[op_i] {
            Op::Insert(s) => match assoc {
                Association::Before => post,
                Association::After => post + s.chars().count(),
            },
            Op::Retain(n) => {
                if p < pre + n {
                    post + (p - pre)
                } else {
                    self.resolve_after_boundary(post + n, assoc, op_i + 1)
                }
            }
            Op::Delete(_) => match assoc {
                Association::Before => post,
                Association::After => self.resolve_after_boundary(post, assoc, op_i + 1),
            },
        }
    }

    fn resolve_after_boundary(&self, post: usize, assoc: Association, next_idx: usize) -> usize {
        if matches!(assoc, Association::After) {
            if let Some(Op::Insert(s)) = self.ops.get(next_idx) {
                return post + s.chars().count();
            }
        }
        post
    }
}

/// Prepend a retain over `[0, prefix)` to a change-set built for the tail of
/// a larger document, so it shares its parent's `len_before` again.
fn prepend_retain(tail: ChangeSet, prefix: usize) -> ChangeSet {
    if prefix == 0 {
        return tail;
    }
    let mut out = ChangeSet::new(tail.len_before).retain(prefix);
    for op in tail.ops {
        out = match op {
            Op::Retain(n) => out.retain(n),
            Op::Delete(n) => out.delete(n),
            Op::Insert(s) => out.insert(&s),
        };
    }
    out
}

/// A change-set plus a lazily-computable inversion and commit timestamp.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub changes: ChangeSet,
    inverted: Option<ChangeSet>,
    pub timestamp: std::time::SystemTime,
}

impl Transaction {
    pub fn new(changes: ChangeSet) -> Self {
        Transaction {
            changes,
            inverted: None,
            timestamp: std::time::SystemTime::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn apply(&self, rope: &Rope) -> Result<Rope, Error> {
        self.changes.apply(rope)
    }

    /// Compute (and cache) the inverse, given the pre-image the forward
    /// change-set was originally applied to.
    pub fn invert(&mut self, pre_image: &Rope) -> Result<&ChangeSet, Error> {
        if self.inverted.is_none() {
            self.inverted = Some(self.changes.invert(pre_image)?);
        }
        Ok(self.inverted.as_ref().expect("just populated"))
    }

    pub fn cached_inverse(&self) -> Option<&ChangeSet> {
        self.inverted.as_ref()
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
