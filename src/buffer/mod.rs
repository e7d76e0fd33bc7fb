//! `Buffer`: the public front door of the crate, wrapping a [`Rope`] with
//! the reader/writer convenience the tree itself has no need to know about.
//!
//! A `Buffer` is immutable like the `Rope` it wraps — every mutating method
//! returns a new `Buffer` and leaves `self` untouched. Application code that
//! wants undo/redo or savepoints layers `History` on top; `Buffer` itself
//! has no notion of revisions.

use crate::constants::reader::DEFAULT_CHUNK_SIZE;
use crate::error::{Error, Result};
use crate::rope::{ByteIter, CharIter, ChunkIter, GraphemeIter, ReverseCharIter, Rope};
use std::io::{Read, Write};

/// An immutable text buffer backed by a persistent rope.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
}

impl Buffer {
    /// An empty buffer.
    #[must_use]
    pub fn empty() -> Self {
        Buffer { rope: Rope::empty() }
    }

    /// Builds a buffer from an in-memory string.
    #[must_use]
    pub fn from_string(text: &str) -> Self {
        Buffer {
            rope: Rope::from_str(text),
        }
    }

    /// Streams bytes from `reader` in fixed-size chunks, validating UTF-8
    /// incrementally. A chunk boundary that splits a multi-byte sequence is
    /// carried over to the next read rather than rejected outright; only
    /// bytes that are not valid UTF-8 even after that carry-over are an
    /// error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Same as [`Buffer::from_reader`] with an explicit read chunk size.
    pub fn from_reader_with_chunk_size<R: Read>(mut reader: R, chunk_size: usize) -> Result<Self> {
        let mut rope = Rope::empty();
        let mut buf = vec![0u8; chunk_size];
        let mut carry: Vec<u8> = Vec::new();

        loop {
            let n = reader.read(&mut buf).map_err(|_| Error::InvalidEncoding)?;
            if n == 0 {
                break;
            }
            carry.extend_from_slice(&buf[..n]);

            let (valid_len, incomplete_tail) = match std::str::from_utf8(&carry) {
                Ok(s) => (s.len(), 0),
                Err(e) => match e.error_len() {
                    // A genuine invalid sequence, not just a truncated one.
                    Some(_) => return Err(Error::InvalidEncoding),
                    None => {
                        let valid = e.valid_up_to();
                        (valid, carry.len() - valid)
                    }
                },
            };

            let text = std::str::from_utf8(&carry[..valid_len]).map_err(|_| Error::InvalidEncoding)?;
            if !text.is_empty() {
                let chunk_rope = Rope::from_str(text);
                rope = rope.concat(&chunk_rope);
            }

            if incomplete_tail > 0 {
                carry = carry[valid_len..].to_vec();
            } else {
                carry.clear();
            }
        }

        if !carry.is_empty() {
            return Err(Error::InvalidEncoding);
        }

        Ok(Buffer { rope })
    }

    /// Number of Unicode scalar values in the buffer.
    #[must_use]
    pub fn length_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Number of UTF-8 bytes in the buffer.
    #[must_use]
    pub fn length_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    /// Number of line feeds (`\n`) in the buffer.
    #[must_use]
    pub fn length_lines(&self) -> usize {
        self.rope.len_lines()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.is_empty()
    }

    pub fn char_at(&self, pos: usize) -> Result<char> {
        self.rope.char_at(pos)
    }

    pub fn byte_at(&self, pos: usize) -> Result<u8> {
        self.rope.byte_at(pos)
    }

    /// Extracts `[start, end)` as an owned `String`.
    pub fn slice(&self, start: usize, end: usize) -> Result<String> {
        self.rope.slice(start, end)
    }

    /// Materialises the entire buffer as a `String`. Prefer `write_to` or
    /// `write_chunked` for large buffers headed to an I/O sink.
    #[must_use]
    pub fn string(&self) -> String {
        self.rope.to_string_full()
    }

    /// Writes the whole buffer to `writer` in one call, returning the
    /// number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let text = self.rope.to_string_full();
        writer
            .write_all(text.as_bytes())
            .map_err(|_| Error::InvalidEncoding)?;
        Ok(text.len())
    }

    /// Writes the buffer to `writer` one leaf-sized chunk at a time, never
    /// materialising the full text as a single `String`.
    pub fn write_chunked<W: Write>(&self, writer: &mut W, chunk_size: usize) -> Result<usize> {
        let _ = chunk_size; // chunk boundaries follow leaf boundaries, not a caller-chosen size
        let mut written = 0;
        for chunk in self.rope.chunk_iter(0) {
            let bytes = chunk.as_bytes();
            writer.write_all(bytes).map_err(|_| Error::InvalidEncoding)?;
            written += bytes.len();
        }
        Ok(written)
    }

    pub fn insert(&self, pos: usize, text: &str) -> Result<Self> {
        Ok(Buffer {
            rope: self.rope.insert(pos, text)?,
        })
    }

    pub fn delete(&self, start: usize, end: usize) -> Result<Self> {
        Ok(Buffer {
            rope: self.rope.delete(start, end)?,
        })
    }

    pub fn replace(&self, start: usize, end: usize, text: &str) -> Result<Self> {
        Ok(Buffer {
            rope: self.rope.replace(start, end, text)?,
        })
    }

    #[must_use]
    pub fn concat(&self, other: &Buffer) -> Self {
        Buffer {
            rope: self.rope.concat(&other.rope),
        }
    }

    #[must_use]
    pub fn append(&self, text: &str) -> Self {
        Buffer {
            rope: self.rope.concat(&Rope::from_str(text)),
        }
    }

    #[must_use]
    pub fn prepend(&self, text: &str) -> Self {
        Buffer {
            rope: Rope::from_str(text).concat(&self.rope),
        }
    }

    /// Splits the buffer at `pos` into two buffers covering `[0, pos)` and
    /// `[pos, len)`.
    pub fn split_at(&self, pos: usize) -> Result<(Self, Self)> {
        let (left, right) = self.rope.split(pos)?;
        Ok((Buffer { rope: left }, Buffer { rope: right }))
    }

    pub fn char_iter(&self, start: usize) -> CharIter {
        self.rope.char_iter(start)
    }

    pub fn reverse_char_iter(&self, start: usize) -> ReverseCharIter {
        self.rope.reverse_char_iter(start)
    }

    pub fn byte_iter(&self, start: usize) -> ByteIter {
        self.rope.byte_iter(start)
    }

    pub fn chunk_iter(&self, start: usize) -> ChunkIter {
        self.rope.chunk_iter(start)
    }

    pub fn grapheme_iter(&self, start: usize) -> GraphemeIter {
        self.rope.grapheme_iter(start)
    }

    pub fn next_grapheme_start(&self, pos: usize) -> Result<usize> {
        self.rope.next_grapheme_start(pos)
    }

    pub fn prev_grapheme_start(&self, pos: usize) -> Result<usize> {
        self.rope.prev_grapheme_start(pos)
    }

    pub fn is_grapheme_boundary(&self, pos: usize) -> Result<bool> {
        self.rope.is_grapheme_boundary(pos)
    }

    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.rope.is_balanced()
    }

    #[must_use]
    pub fn balance(&self) -> Self {
        Buffer {
            rope: self.rope.balance(),
        }
    }

    #[must_use]
    pub fn auto_balance(&self) -> Self {
        Buffer {
            rope: self.rope.auto_balance(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rope.validate()
    }

    /// Access to the underlying rope, for callers (such as `History`) that
    /// need to apply a `ChangeSet` directly.
    #[must_use]
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Wraps an existing rope without copying its text.
    #[must_use]
    pub fn from_rope(rope: Rope) -> Self {
        Buffer { rope }
    }
}
