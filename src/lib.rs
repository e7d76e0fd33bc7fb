//! A persistent, immutable text buffer: a balanced rope, operational
//! transformation change-sets, and a branching undo/redo history.
//!
//! Every mutation across the crate returns a new value rather than
//! modifying one in place. That's what makes `History`'s branching undo
//! tree and `SavePointManager`'s ref-counted snapshots cheap: holding onto
//! an old `Rope` or `Buffer` costs nothing beyond the `Arc` clone, no
//! matter how much editing happens afterward.
//!
//! ```
//! use vellum::buffer::Buffer;
//!
//! let buf = Buffer::from_string("hello");
//! let greeting = buf.insert(5, ", world").unwrap();
//! assert_eq!(greeting.string(), "hello, world");
//! assert_eq!(buf.string(), "hello"); // untouched
//! ```

pub mod buffer;
pub mod changeset;
pub mod constants;
pub mod error;
pub mod history;
pub mod rope;
pub mod selection;

pub use buffer::Buffer;
pub use changeset::{Association, ChangeSet, Op, TieBreaker, Transaction};
pub use error::{Error, Result};
pub use history::savepoint::{QueryFilter, SavePoint, SavePointId, SavePointManager, SavePointMetadata};
pub use history::{History, HistoryStats, RevisionId};
pub use rope::Rope;
pub use selection::{Range, Selection};
