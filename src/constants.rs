//! Tunable defaults shared across the tree, history, and savepoint layers.

pub mod leaf {
    /// Leaves are rebuilt toward this size once they drop below it during
    /// balancing; never enforced transiently mid-edit.
    pub const MIN_LEAF: usize = 256;
    /// A leaf's chunk must never exceed this many bytes except transiently
    /// while a split or merge is in progress.
    pub const MAX_LEAF: usize = 1024;
}

pub mod history {
    /// Default cap on the number of revisions retained by a `History`
    /// before the oldest non-ancestor-of-current revisions are evicted.
    pub const DEFAULT_MAX_SIZE: usize = 10_000;
}

pub mod reader {
    /// Default chunk size used by `Buffer::from_reader` and
    /// `Buffer::write_chunked` when the caller doesn't specify one.
    pub const DEFAULT_CHUNK_SIZE: usize = 8192;
}

pub mod errors {
    pub const OUT_OF_BOUNDS: &str = "OUT_OF_BOUNDS";
    pub const INVALID_ENCODING: &str = "INVALID_ENCODING";
    pub const LENGTH_MISMATCH: &str = "LENGTH_MISMATCH";
    pub const CORRUPT_TREE: &str = "CORRUPT_TREE";
}
