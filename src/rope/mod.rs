//! Persistent rope (balanced binary tree of UTF-8 chunks).
//!
//! Every operation returns a new root; subtrees untouched by an edit are
//! shared by reference count with the tree(s) they came from. Leaves hold a
//! UTF-8 chunk directly — there is no separate "original"/"add" buffer, and
//! no node is ever mutated after it is reachable from a returned `Rope`.
//!
//! Internal nodes cache the LEFT subtree's character, byte, and line counts
//! so that position translation and slicing run in O(log n); the right
//! subtree's metrics are derived by subtraction from the node's own totals.

mod iter;

use crate::constants::leaf::{MAX_LEAF, MIN_LEAF};
use crate::error::Error;
use std::sync::{Arc, OnceLock};
use unicode_segmentation::UnicodeSegmentation;

pub use iter::{ByteIter, CharIter, ChunkIter, GraphemeIter, ReverseCharIter};

/// One leaf's immutable text chunk plus cached aggregates and a sparse
/// char→byte index filled in lazily on first use.
struct Leaf {
    text: Arc<str>,
    chars: usize,
    lines: usize,
    /// Every 8th char boundary, as `(char_index, byte_index)`. Built once,
    /// on demand, to amortise repeated position queries against one chunk.
    index: OnceLock<Vec<(usize, usize)>>,
}

impl Leaf {
    fn new(text: &str) -> Arc<Leaf> {
        let chars = text.chars().count();
        let lines = text.bytes().filter(|&b| b == b'\n').count();
        Arc::new(Leaf {
            text: Arc::from(text),
            chars,
            lines,
            index: OnceLock::new(),
        })
    }

    fn byte_index(&self) -> &[(usize, usize)] {
        self.index.get_or_init(|| {
            let mut out = Vec::with_capacity(self.chars / 8 + 1);
            for (i, (b, _)) in self.text.char_indices().enumerate() {
                if i % 8 == 0 {
                    out.push((i, b));
                }
            }
            out
        })
    }

    /// Byte offset of the `char_idx`-th character in this leaf.
    fn char_to_byte(&self, char_idx: usize) -> usize {
        if char_idx == 0 {
            return 0;
        }
        if char_idx >= self.chars {
            return self.text.len();
        }
        let index = self.byte_index();
        let anchor = match index.binary_search_by_key(&char_idx, |&(c, _)| c) {
            Ok(i) => index[i],
            Err(0) => (0, 0),
            Err(i) => index[i - 1],
        };
        let (mut c, mut b) = anchor;
        for ch in self.text[b..].chars() {
            if c == char_idx {
                return b;
            }
            b += ch.len_utf8();
            c += 1;
        }
        b
    }

    /// Character index of the character starting at or containing `byte_idx`.
    fn byte_to_char(&self, byte_idx: usize) -> usize {
        if byte_idx == 0 {
            return 0;
        }
        if byte_idx >= self.text.len() {
            return self.chars;
        }
        let index = self.byte_index();
        let anchor = match index.binary_search_by_key(&byte_idx, |&(_, b)| b) {
            Ok(i) => index[i],
            Err(0) => (0, 0),
            Err(i) => index[i - 1],
        };
        let (mut c, mut b) = anchor;
        for ch in self.text[b..].chars() {
            if b >= byte_idx {
                return c;
            }
            b += ch.len_utf8();
            c += 1;
        }
        c
    }
}

struct Internal {
    left: Node,
    right: Node,
    left_chars: usize,
    left_bytes: usize,
    left_lines: usize,
    chars: usize,
    bytes: usize,
    lines: usize,
    height: u32,
}

#[derive(Clone)]
enum Node {
    Leaf(Arc<Leaf>),
    Internal(Arc<Internal>),
}

impl Node {
    fn chars(&self) -> usize {
        match self {
            Node::Leaf(l) => l.chars,
            Node::Internal(i) => i.chars,
        }
    }

    fn bytes(&self) -> usize {
        match self {
            Node::Leaf(l) => l.text.len(),
            Node::Internal(i) => i.bytes,
        }
    }

    fn lines(&self) -> usize {
        match self {
            Node::Leaf(l) => l.lines,
            Node::Internal(i) => i.lines,
        }
    }

    fn height(&self) -> u32 {
        match self {
            Node::Leaf(_) => 1,
            Node::Internal(i) => i.height,
        }
    }

    fn is_empty(&self) -> bool {
        self.bytes() == 0
    }

    fn new_internal(left: Node, right: Node) -> Node {
        let left_chars = left.chars();
        let left_bytes = left.bytes();
        let left_lines = left.lines();
        let height = 1 + left.height().max(right.height());
        Node::Internal(Arc::new(Internal {
            chars: left_chars + right.chars(),
            bytes: left_bytes + right.bytes(),
            lines: left_lines + right.lines(),
            left,
            right,
            left_chars,
            left_bytes,
            left_lines,
            height,
        }))
    }
}

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

/// `depth ≤ 2·⌈log2(chars+1)⌉`, per the tree's balance invariant.
fn max_balanced_height(chars: usize) -> u32 {
    (2 * ceil_log2(chars + 1)).max(1)
}

fn is_balanced(node: &Node) -> bool {
    node.height() <= max_balanced_height(node.chars())
}

/// Concatenate, reusing either side directly if the other is empty, then
/// rebuild the resulting subtree if it fell outside the balance bound.
fn concat(left: Node, right: Node) -> Node {
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }
    let node = Node::new_internal(left, right);
    if is_balanced(&node) {
        node
    } else {
        rebuild(&node)
    }
}

fn collect_leaves(node: &Node, out: &mut Vec<Arc<Leaf>>) {
    match node {
        Node::Leaf(l) => {
            if !l.text.is_empty() {
                out.push(l.clone());
            }
        }
        Node::Internal(i) => {
            collect_leaves(&i.left, out);
            collect_leaves(&i.right, out);
        }
    }
}

/// Rebuild a subtree from scratch: collect its leaves, merge runs that are
/// too small, split any that are too large, and build a balanced tree from
/// the result. Never moves a char or line boundary.
fn rebuild(node: &Node) -> Node {
    let mut leaves = Vec::new();
    collect_leaves(node, &mut leaves);
    if leaves.is_empty() {
        return Node::Leaf(Leaf::new(""));
    }
    let mut resized: Vec<Arc<Leaf>> = Vec::with_capacity(leaves.len());
    let mut pending = String::new();
    for leaf in leaves {
        if leaf.text.len() >= MIN_LEAF {
            flush_pending(&mut pending, &mut resized);
            chunk_into(&leaf.text, &mut resized);
        } else {
            pending.push_str(&leaf.text);
            if pending.len() >= MAX_LEAF {
                chunk_into(&pending.clone(), &mut resized);
                pending.clear();
            }
        }
    }
    flush_pending(&mut pending, &mut resized);
    build_balanced(&resized)
}

fn flush_pending(pending: &mut String, out: &mut Vec<Arc<Leaf>>) {
    if !pending.is_empty() {
        chunk_into(pending, out);
        pending.clear();
    }
}

/// Split `text` into leaves of at most `MAX_LEAF` bytes, only at char
/// boundaries.
fn chunk_into(text: &str, out: &mut Vec<Arc<Leaf>>) {
    let mut rest = text;
    while !rest.is_empty() {
        let cut = floor_char_boundary(rest, MAX_LEAF.min(rest.len()).max(1));
        let cut = if cut == 0 { rest.len() } else { cut };
        let (chunk, remainder) = rest.split_at(cut);
        out.push(Leaf::new(chunk));
        rest = remainder;
    }
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn build_balanced(leaves: &[Arc<Leaf>]) -> Node {
    if leaves.is_empty() {
        return Node::Leaf(Leaf::new(""));
    }
    if leaves.len() == 1 {
        return Node::Leaf(leaves[0].clone());
    }
    let mid = leaves.len() / 2;
    let left = build_balanced(&leaves[..mid]);
    let right = build_balanced(&leaves[mid..]);
    Node::new_internal(left, right)
}

/// Split a subtree at character position `pos` into `(before, after)`.
fn split_node(node: &Node, pos: usize) -> (Node, Node) {
    match node {
        Node::Leaf(leaf) => {
            let byte = leaf.char_to_byte(pos);
            let (a, b) = leaf.text.split_at(byte);
            (Node::Leaf(Leaf::new(a)), Node::Leaf(Leaf::new(b)))
        }
        Node::Internal(i) => {
            if pos <= i.left_chars {
                let (l, r) = split_node(&i.left, pos);
                (l, concat(r, i.right.clone()))
            } else {
                let (l, r) = split_node(&i.right, pos - i.left_chars);
                (concat(i.left.clone(), l), r)
            }
        }
    }
}

fn char_at_node(node: &Node, pos: usize) -> char {
    match node {
        Node::Leaf(leaf) => {
            let byte = leaf.char_to_byte(pos);
            leaf.text[byte..].chars().next().expect("pos within leaf")
        }
        Node::Internal(i) => {
            if pos < i.left_chars {
                char_at_node(&i.left, pos)
            } else {
                char_at_node(&i.right, pos - i.left_chars)
            }
        }
    }
}

fn byte_at_node(node: &Node, pos: usize) -> u8 {
    match node {
        Node::Leaf(leaf) => leaf.text.as_bytes()[pos],
        Node::Internal(i) => {
            if pos < i.left_bytes {
                byte_at_node(&i.left, pos)
            } else {
                byte_at_node(&i.right, pos - i.left_bytes)
            }
        }
    }
}

fn char_to_byte_node(node: &Node, pos: usize) -> usize {
    match node {
        Node::Leaf(leaf) => leaf.char_to_byte(pos),
        Node::Internal(i) => {
            if pos <= i.left_chars {
                char_to_byte_node(&i.left, pos)
            } else {
                i.left_bytes + char_to_byte_node(&i.right, pos - i.left_chars)
            }
        }
    }
}

fn byte_to_char_node(node: &Node, pos: usize) -> usize {
    match node {
        Node::Leaf(leaf) => leaf.byte_to_char(pos),
        Node::Internal(i) => {
            if pos <= i.left_bytes {
                byte_to_char_node(&i.left, pos)
            } else {
                i.left_chars + byte_to_char_node(&i.right, pos - i.left_bytes)
            }
        }
    }
}

/// Index of the line containing character position `pos`. Line 0 is the
/// prefix up to (not including) the first LF.
fn line_at_char_node(node: &Node, pos: usize) -> usize {
    match node {
        Node::Leaf(leaf) => leaf.text[..leaf.char_to_byte(pos)]
            .bytes()
            .filter(|&b| b == b'\n')
            .count(),
        Node::Internal(i) => {
            if pos <= i.left_chars {
                line_at_char_node(&i.left, pos)
            } else {
                i.left_lines + line_at_char_node(&i.right, pos - i.left_chars)
            }
        }
    }
}

/// Character position of the first character on line `line` (`line` is
/// `target`-th LF, counting from 0 newlines seen).
fn line_start_char_node(node: &Node, target: usize) -> usize {
    if target == 0 {
        return 0;
    }
    fn find_nth_lf_end(node: &Node, target: usize) -> usize {
        match node {
            Node::Leaf(leaf) => {
                let mut seen = 0;
                for (i, b) in leaf.text.bytes().enumerate() {
                    if b == b'\n' {
                        seen += 1;
                        if seen == target {
                            return byte_to_char_node(node, i + 1);
                        }
                    }
                }
                unreachable!("leaf metadata promised {target} newlines")
            }
            Node::Internal(i) => {
                if target <= i.left_lines {
                    find_nth_lf_end(&i.left, target)
                } else {
                    i.left_chars + find_nth_lf_end(&i.right, target - i.left_lines)
                }
            }
        }
    }
    find_nth_lf_end(node, target)
}

fn collect_string(node: &Node, out: &mut String) {
    match node {
        Node::Leaf(leaf) => out.push_str(&leaf.text),
        Node::Internal(i) => {
            collect_string(&i.left, out);
            collect_string(&i.right, out);
        }
    }
}

fn validate_node(node: &Node) -> Result<(), Error> {
    match node {
        Node::Leaf(leaf) => {
            let chars = leaf.text.chars().count();
            if chars != leaf.chars {
                return Err(Error::CorruptTree(format!(
                    "leaf char cache {} != actual {chars}",
                    leaf.chars
                )));
            }
            let lines = leaf.text.bytes().filter(|&b| b == b'\n').count();
            if lines != leaf.lines {
                return Err(Error::CorruptTree(format!(
                    "leaf line cache {} != actual {lines}",
                    leaf.lines
                )));
            }
            Ok(())
        }
        Node::Internal(i) => {
            validate_node(&i.left)?;
            validate_node(&i.right)?;
            if i.left_chars != i.left.chars() || i.left_bytes != i.left.bytes() || i.left_lines != i.left.lines()
            {
                return Err(Error::CorruptTree(
                    "internal node's left-subtree cache disagrees with its child".into(),
                ));
            }
            if i.chars != i.left.chars() + i.right.chars() {
                return Err(Error::CorruptTree("internal char total mismatch".into()));
            }
            if i.bytes != i.left.bytes() + i.right.bytes() {
                return Err(Error::CorruptTree("internal byte total mismatch".into()));
            }
            if i.lines != i.left.lines() + i.right.lines() {
                return Err(Error::CorruptTree("internal line total mismatch".into()));
            }
            Ok(())
        }
    }
}

/// A persistent, immutable rope: a balanced tree of UTF-8 chunks.
#[derive(Clone)]
pub struct Rope {
    root: Node,
}

impl Rope {
    pub fn empty() -> Self {
        Rope {
            root: Node::Leaf(Leaf::new("")),
        }
    }

    pub fn from_str(text: &str) -> Self {
        if text.is_empty() {
            return Self::empty();
        }
        let mut leaves = Vec::new();
        chunk_into(text, &mut leaves);
        Rope {
            root: build_balanced(&leaves),
        }
    }

    pub fn len_chars(&self) -> usize {
        self.root.chars()
    }

    pub fn len_bytes(&self) -> usize {
        self.root.bytes()
    }

    /// Number of line feeds in the buffer, matching the length-consistency
    /// law (`length_lines == count(s, '\n')`). For the number of
    /// addressable lines a trailing partial line counts toward — the
    /// bound `line_at_char`/`line_start_char`/`line_end_char` need — see
    /// `addressable_lines`.
    pub fn len_lines(&self) -> usize {
        self.root.lines()
    }

    /// One more than `len_lines`: the count of addressable lines, since a
    /// trailing partial line (no terminating LF) is still line
    /// `len_lines()`. Internal only — `len_lines`/`line_count` stay pinned
    /// to the LF count itself.
    fn addressable_lines(&self) -> usize {
        self.root.lines() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    fn check_char_bound(&self, pos: usize) -> Result<(), Error> {
        if pos > self.len_chars() {
            Err(Error::OutOfBounds {
                pos,
                len: self.len_chars(),
            })
        } else {
            Ok(())
        }
    }

    fn check_byte_bound(&self, pos: usize) -> Result<(), Error> {
        if pos > self.len_bytes() {
            Err(Error::OutOfBounds {
                pos,
                len: self.len_bytes(),
            })
        } else {
            Ok(())
        }
    }

    pub fn char_at(&self, pos: usize) -> Result<char, Error> {
        if pos >= self.len_chars() {
            return Err(Error::OutOfBounds {
                pos,
                len: self.len_chars(),
            });
        }
        Ok(char_at_node(&self.root, pos))
    }

    pub fn byte_at(&self, pos: usize) -> Result<u8, Error> {
        if pos >= self.len_bytes() {
            return Err(Error::OutOfBounds {
                pos,
                len: self.len_bytes(),
            });
        }
        Ok(byte_at_node(&self.root, pos))
    }

    pub fn char_to_byte(&self, pos: usize) -> Result<usize, Error> {
        self.check_char_bound(pos)?;
        Ok(char_to_byte_node(&self.root, pos))
    }

    pub fn byte_to_char(&self, pos: usize) -> Result<usize, Error> {
        self.check_byte_bound(pos)?;
        Ok(byte_to_char_node(&self.root, pos))
    }

    pub fn line_count(&self) -> usize {
        self.len_lines()
    }

    pub fn line_at_char(&self, pos: usize) -> Result<usize, Error> {
        self.check_char_bound(pos)?;
        Ok(line_at_char_node(&self.root, pos))
    }

    pub fn line_start_char(&self, line: usize) -> Result<usize, Error> {
        if line >= self.addressable_lines() {
            return Err(Error::OutOfBounds {
                pos: line,
                len: self.addressable_lines(),
            });
        }
        Ok(line_start_char_node(&self.root, line))
    }

    pub fn line_end_char(&self, line: usize) -> Result<usize, Error> {
        if line >= self.addressable_lines() {
            return Err(Error::OutOfBounds {
                pos: line,
                len: self.addressable_lines(),
            });
        }
        if line + 1 < self.addressable_lines() {
            let next_start = line_start_char_node(&self.root, line + 1);
            Ok(next_start - 1)
        } else {
            Ok(self.len_chars())
        }
    }

    /// Split this rope at character position `pos` into `(before, after)`.
    pub fn split(&self, pos: usize) -> Result<(Rope, Rope), Error> {
        self.check_char_bound(pos)?;
        let (l, r) = split_node(&self.root, pos);
        Ok((Rope { root: l }, Rope { root: r }))
    }

    pub fn concat(&self, other: &Rope) -> Rope {
        Rope {
            root: concat(self.root.clone(), other.root.clone()),
        }
    }

    pub fn insert(&self, pos: usize, text: &str) -> Result<Rope, Error> {
        self.check_char_bound(pos)?;
        if text.is_empty() {
            return Ok(self.clone());
        }
        if let Node::Leaf(leaf) = &self.root {
            let byte = leaf.char_to_byte(pos);
            let mut combined = String::with_capacity(leaf.text.len() + text.len());
            combined.push_str(&leaf.text[..byte]);
            combined.push_str(text);
            combined.push_str(&leaf.text[byte..]);
            if combined.len() <= MAX_LEAF {
                return Ok(Rope {
                    root: Node::Leaf(Leaf::new(&combined)),
                });
            }
        }
        let (l, r) = split_node(&self.root, pos);
        Ok(Rope {
            root: concat(concat(l, Rope::from_str(text).root), r),
        })
    }

    pub fn delete(&self, start: usize, end: usize) -> Result<Rope, Error> {
        self.check_char_bound(end)?;
        if start > end {
            return Err(Error::OutOfBounds {
                pos: start,
                len: end,
            });
        }
        if start == end {
            return Ok(self.clone());
        }
        let (l, mid_right) = split_node(&self.root, start);
        let (_, r) = split_node(&mid_right, end - start);
        Ok(Rope {
            root: concat(l, r),
        })
    }

    pub fn replace(&self, start: usize, end: usize, text: &str) -> Result<Rope, Error> {
        self.delete(start, end)?.insert(start, text)
    }

    pub fn slice(&self, start: usize, end: usize) -> Result<String, Error> {
        self.check_char_bound(end)?;
        if start > end {
            return Err(Error::OutOfBounds {
                pos: start,
                len: end,
            });
        }
        let (_, rest) = split_node(&self.root, start);
        let (middle, _) = split_node(&rest, end - start);
        let mut out = String::new();
        collect_string(&middle, &mut out);
        Ok(out)
    }

    pub fn to_string_full(&self) -> String {
        let mut out = String::with_capacity(self.len_bytes());
        collect_string(&self.root, &mut out);
        out
    }

    pub fn is_balanced(&self) -> bool {
        is_balanced(&self.root)
    }

    pub fn depth(&self) -> u32 {
        self.root.height()
    }

    /// Rebuild the whole tree into balanced form without changing content.
    pub fn balance(&self) -> Rope {
        Rope {
            root: rebuild(&self.root),
        }
    }

    /// Rebalance only if the current tree violates the depth bound.
    pub fn auto_balance(&self) -> Rope {
        if self.is_balanced() {
            self.clone()
        } else {
            self.balance()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_node(&self.root)
    }

    pub fn char_iter(&self, start: usize) -> CharIter {
        CharIter::new(self.root.clone(), start)
    }

    pub fn reverse_char_iter(&self, start: usize) -> ReverseCharIter {
        ReverseCharIter::new(self.root.clone(), start)
    }

    pub fn byte_iter(&self, start: usize) -> ByteIter {
        ByteIter::new(self.root.clone(), start)
    }

    pub fn chunk_iter(&self, start: usize) -> ChunkIter {
        ChunkIter::new(self.root.clone(), start)
    }

    pub fn grapheme_iter(&self, start: usize) -> GraphemeIter {
        GraphemeIter::new(self.char_iter(start))
    }

    /// Char positions of every grapheme cluster boundary, built atop the
    /// same `unicode-segmentation` contract `grapheme_iter` uses. Starts
    /// with `0` and ends with `len_chars()`.
    fn grapheme_boundaries(&self) -> Vec<usize> {
        let text = self.to_string_full();
        let mut boundaries = vec![0];
        let mut char_pos = 0;
        for cluster in text.graphemes(true) {
            char_pos += cluster.chars().count();
            boundaries.push(char_pos);
        }
        boundaries
    }

    /// The char position of the grapheme boundary strictly after `pos`, or
    /// `len_chars()` if `pos` is already within the last cluster.
    pub fn next_grapheme_start(&self, pos: usize) -> Result<usize, Error> {
        self.check_char_bound(pos)?;
        Ok(self
            .grapheme_boundaries()
            .into_iter()
            .find(|&b| b > pos)
            .unwrap_or_else(|| self.len_chars()))
    }

    /// The char position of the grapheme boundary strictly before `pos`,
    /// or `0` if none exists.
    pub fn prev_grapheme_start(&self, pos: usize) -> Result<usize, Error> {
        self.check_char_bound(pos)?;
        Ok(self
            .grapheme_boundaries()
            .into_iter()
            .rev()
            .find(|&b| b < pos)
            .unwrap_or(0))
    }

    /// Whether `pos` falls exactly on a grapheme cluster boundary.
    pub fn is_grapheme_boundary(&self, pos: usize) -> Result<bool, Error> {
        self.check_char_bound(pos)?;
        Ok(self.grapheme_boundaries().contains(&pos))
    }

    /// Nudge a proposed char boundary away from splitting a CRLF pair,
    /// moving it before the CR. The tree itself has no CRLF awareness;
    /// this is a caller-opt-in convenience.
    pub fn crlf_safe_boundary(&self, pos: usize) -> usize {
        if pos == 0 || pos >= self.len_chars() {
            return pos;
        }
        let before = char_at_node(&self.root, pos - 1);
        let after = char_at_node(&self.root, pos);
        if before == '\r' && after == '\n' {
            pos - 1
        } else {
            pos
        }
    }
}

impl Default for Rope {
    fn default() -> Self {
        Rope::empty()
    }
}


#[cfg(test)]
#[path = "conversion_tests.rs"]
mod conversion_tests;
