//! Error types.
//!
//! Modeled on `otter-engine`'s `EngineError`: a `thiserror`-derived enum
//! with one variant per distinct failure mode the public API can report,
//! rather than bare `Option`/`bool` sentinels.

use thiserror::Error;

/// Everything that can go wrong calling into this crate's public API.
#[derive(Debug, Error)]
pub enum GcError {
    /// The backing allocator refused to grow the heap far enough to
    /// satisfy a request.
    #[error("out of memory")]
    OutOfMemory,

    /// A frame slot index was out of range for that frame's size.
    #[error("frame slot index {index} out of range for frame of size {size}")]
    InvalidFrameSlot {
        /// The index that was requested.
        index: usize,
        /// The frame's actual slot count.
        size: usize,
    },
}

/// Convenience alias for this crate's fallible return type.
pub type GcResult<T> = Result<T, GcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(GcError::OutOfMemory.to_string(), "out of memory");
        assert_eq!(
            GcError::InvalidFrameSlot { index: 5, size: 2 }.to_string(),
            "frame slot index 5 out of range for frame of size 2"
        );
    }
}
