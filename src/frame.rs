//! Root frame stack.
//!
//! The mutator exposes every live reference through slots of a root frame.
//! Frames are pushed and popped as the mutator enters and leaves scopes; a
//! permanent bottom frame exists for the lifetime of the collector and can
//! never be popped.
//!
//! The source this collector is modeled on links frames through a `prev`
//! pointer to avoid ever moving a live frame. A `Vec<Frame>` is the
//! idiomatic Rust equivalent: it gives the same externally observable
//! stack (push/pop/top/bottom, bottom never removed) without hand-rolled
//! pointer chasing, and frames themselves are never relocated once pushed
//! relative to their neighbors in a way that matters — the collector only
//! ever reads the top or bottom by position.

use crate::error::{GcError, GcResult};
use crate::tag::Tag;

/// A single root frame: a fixed-size array of tagged slots, each with a
/// flag saying whether it holds a pointer the collector must trace.
pub struct Frame {
    values: Vec<Tag>,
    is_nptr: Vec<bool>,
}

impl Frame {
    fn new(size: usize) -> Self {
        Self {
            values: vec![Tag::ZERO; size],
            is_nptr: vec![false; size],
        }
    }

    /// Number of slots in this frame.
    #[inline]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// True if slot `idx` is a non-pointer slot (never traced/forwarded).
    #[inline]
    pub fn is_nptr(&self, idx: usize) -> bool {
        self.is_nptr[idx]
    }

    /// Read slot `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> GcResult<Tag> {
        self.values.get(idx).copied().ok_or(GcError::InvalidFrameSlot {
            index: idx,
            size: self.size(),
        })
    }

    /// Overwrite slot `idx` and its pointerness flag.
    pub fn set(&mut self, idx: usize, value: Tag, is_nptr: bool) -> GcResult<()> {
        if idx >= self.values.len() {
            return Err(GcError::InvalidFrameSlot {
                index: idx,
                size: self.size(),
            });
        }
        self.values[idx] = value;
        self.is_nptr[idx] = is_nptr;
        Ok(())
    }

    /// Overwrite slot `idx`'s value only, preserving its pointerness flag.
    /// Used internally by the forwarder, which never changes a slot's
    /// shape — only the address a pointer slot refers to.
    pub(crate) fn forward(&mut self, idx: usize, value: Tag) {
        self.values[idx] = value;
    }
}

/// The root frame stack: a permanent bottom frame plus zero or more pushed
/// frames, newest last.
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    /// Create a stack with just the bottom frame, of `bottom_size` slots.
    pub fn new(bottom_size: usize) -> Self {
        Self {
            frames: vec![Frame::new(bottom_size)],
        }
    }

    /// Push a new top frame of `size` slots.
    pub fn push(&mut self, size: usize) {
        self.frames.push(Frame::new(size));
    }

    /// Pop the top frame. A no-op if the stack holds only the bottom frame.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames currently on the stack (at least 1).
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame at `idx`, where `0` is the bottom and `frame_count() - 1` is
    /// the top.
    #[inline]
    pub fn frame_at(&self, idx: usize) -> &Frame {
        &self.frames[idx]
    }

    /// Mutable access to the frame at `idx`.
    #[inline]
    pub fn frame_at_mut(&mut self, idx: usize) -> &mut Frame {
        &mut self.frames[idx]
    }

    /// The currently topmost frame.
    #[inline]
    pub fn top(&self) -> &Frame {
        self.frames.last().expect("bottom frame always present")
    }

    /// Mutable access to the topmost frame.
    #[inline]
    pub fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("bottom frame always present")
    }

    /// The permanent bottom frame.
    #[inline]
    pub fn bot(&self) -> &Frame {
        &self.frames[0]
    }

    /// Mutable access to the permanent bottom frame.
    #[inline]
    pub fn bot_mut(&mut self) -> &mut Frame {
        &mut self.frames[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_frame_survives_pop() {
        let mut stack = FrameStack::new(4);
        stack.pop();
        assert_eq!(stack.frame_count(), 1);
    }

    #[test]
    fn push_and_pop_track_depth() {
        let mut stack = FrameStack::new(4);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.frame_count(), 3);
        assert_eq!(stack.top().size(), 3);
        stack.pop();
        assert_eq!(stack.top().size(), 2);
        stack.pop();
        stack.pop(); // would pop bottom — no-op
        assert_eq!(stack.frame_count(), 1);
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut stack = FrameStack::new(4);
        let tag = Tag::from_usize(42);
        stack.top_mut().set(0, tag, true).unwrap();
        assert_eq!(stack.top().get(0).unwrap().as_usize(), 42);
        assert!(stack.top().is_nptr(0));
    }

    #[test]
    fn out_of_range_slot_is_an_error() {
        let stack = FrameStack::new(2);
        assert!(stack.top().get(5).is_err());
    }
}
