//! A cursor that walks an op list one "chunk" at a time, splitting a
//! `Retain`/`Delete` or slicing an `Insert`'s text as callers consume less
//! than its full length. Used by `compose` and `transform`, which both need
//! to advance through two op lists at independently varying rates.

use super::Op;

#[derive(Clone)]
enum Chunk {
    Retain(usize),
    Delete(usize),
    Insert(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Retain,
    Delete,
    Insert,
    Done,
}

pub struct Cursor<'a> {
    ops: &'a [Op],
    idx: usize,
    current: Option<Chunk>,
}

impl<'a> Cursor<'a> {
    pub fn new(ops: &'a [Op]) -> Self {
        let mut c = Cursor {
            ops,
            idx: 0,
            current: None,
        };
        c.pull();
        c
    }

    fn pull(&mut self) {
        self.current = self.ops.get(self.idx).map(|op| match op {
            Op::Retain(n) => Chunk::Retain(*n),
            Op::Delete(n) => Chunk::Delete(*n),
            Op::Insert(s) => Chunk::Insert(s.clone()),
        });
        if self.current.is_some() {
            self.idx += 1;
        }
    }

    pub fn kind(&self) -> Kind {
        match &self.current {
            None => Kind::Done,
            Some(Chunk::Retain(_)) => Kind::Retain,
            Some(Chunk::Delete(_)) => Kind::Delete,
            Some(Chunk::Insert(_)) => Kind::Insert,
        }
    }

    /// Remaining length of the current `Retain`/`Delete` chunk.
    pub fn len(&self) -> usize {
        match &self.current {
            Some(Chunk::Retain(n)) | Some(Chunk::Delete(n)) => *n,
            _ => 0,
        }
    }

    /// Char count of the current `Insert` chunk's remaining text.
    pub fn insert_char_count(&self) -> usize {
        match &self.current {
            Some(Chunk::Insert(s)) => s.chars().count(),
            _ => 0,
        }
    }

    /// Consume `n` units from a `Retain`/`Delete` chunk, advancing past it
    /// once exhausted.
    pub fn consume(&mut self, n: usize) {
        match &mut self.current {
            Some(Chunk::Retain(len)) | Some(Chunk::Delete(len)) => {
                *len -= n;
                if *len == 0 {
                    self.pull();
                }
            }
            _ => {}
        }
    }

    /// Take the whole remaining `Insert` text and advance.
    pub fn take_insert(&mut self) -> String {
        match self.current.take() {
            Some(Chunk::Insert(s)) => {
                self.pull();
                s
            }
            other => {
                self.current = other;
                String::new()
            }
        }
    }

    /// Take the first `n_chars` of the current `Insert` chunk, leaving the
    /// remainder in place.
    pub fn take_insert_prefix(&mut self, n_chars: usize) -> String {
        match &mut self.current {
            Some(Chunk::Insert(s)) => {
                let byte = s
                    .char_indices()
                    .nth(n_chars)
                    .map(|(b, _)| b)
                    .unwrap_or(s.len());
                let taken = s[..byte].to_string();
                let rest = s[byte..].to_string();
                if rest.is_empty() {
                    self.pull();
                } else {
                    *s = rest;
                }
                taken
            }
            _ => String::new(),
        }
    }
}
