//! Structured error values returned by the buffer, change-set, and history
//! layers.
//!
//! The library never logs and never panics on caller-supplied positions;
//! every fallible operation returns one of the variants below so the host
//! application decides how to surface it.

use std::fmt;

/// A position, range, or encoded payload supplied by a caller did not meet
/// an operation's documented contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A character, byte, or line position fell outside the valid range.
    OutOfBounds {
        /// The rejected position.
        pos: usize,
        /// One past the largest valid position.
        len: usize,
    },
    /// A constructor or reader was given bytes that are not valid UTF-8.
    InvalidEncoding,
    /// A change-set's `len_before` did not match the buffer it was applied
    /// to, or two change-sets could not be composed because the first's
    /// `len_after` did not equal the second's `len_before`.
    LengthMismatch {
        /// The length the operation expected.
        expected: usize,
        /// The length it was actually given.
        found: usize,
    },
    /// Self-validation found a cached aggregate that disagreed with the
    /// tree's actual content. Indicates a bug, not a caller error.
    CorruptTree(String),
    /// A savepoint id, history index, or time query had no matching entry.
    NotFound,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfBounds { pos, len } => {
                write!(f, "position {pos} out of bounds (len: {len})")
            }
            Error::InvalidEncoding => write!(f, "input is not valid UTF-8"),
            Error::LengthMismatch { expected, found } => {
                write!(f, "length mismatch: expected {expected}, found {found}")
            }
            Error::CorruptTree(detail) => write!(f, "corrupt tree: {detail}"),
            Error::NotFound => write!(f, "not found"),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            Error::OutOfBounds { pos: 5, len: 3 }.to_string(),
            "position 5 out of bounds (len: 3)"
        );
        assert_eq!(
            Error::LengthMismatch {
                expected: 3,
                found: 5
            }
            .to_string(),
            "length mismatch: expected 3, found 5"
        );
        assert_eq!(Error::NotFound.to_string(), "not found");
    }
}
