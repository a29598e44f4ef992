//! Mark stack: a growable stack of `(generation, cell)` pairs used during
//! the marking walk.
//!
//! The source this collector is modeled on chains raw, geometrically
//! doubling segments by hand so the stack can grow mid-cycle without ever
//! relocating entries already pushed, and shrinks back to a single bottom
//! segment once a cycle's marking completes. A `Vec<Vec<_>>` — a stack of
//! segments rather than one flat buffer — gives the identical shape in
//! safe Rust: pushing never moves an earlier segment's contents, popping
//! back past an empty segment discards it, and `clean` drops every
//! segment above the bottom one. Stack depth is bounded by the number of
//! objects marked so far, never by the pointer graph's recursion depth.

/// Capacity of the permanent bottom segment, in entries.
const BOTTOM_SEGMENT_CAPACITY: usize = 256;

/// A growable LIFO stack of `(generation index, cell index)` pairs.
pub struct MarkStack {
    segments: Vec<Vec<(u32, u32)>>,
}

impl MarkStack {
    /// Create an empty stack with just its bottom segment.
    pub fn new() -> Self {
        Self {
            segments: vec![Vec::with_capacity(BOTTOM_SEGMENT_CAPACITY)],
        }
    }

    /// Push a `(gen, idx)` pair, growing a new segment if the current one
    /// is full.
    pub fn push(&mut self, r#gen: u32, idx: u32) {
        let current_cap = self.segments.last().expect("bottom segment always present").capacity();
        if self.segments.last().unwrap().len() == current_cap {
            #[cfg(feature = "gc_logging")]
            tracing::debug!(
                target: "gencopy::gc",
                new_capacity = current_cap * 2,
                "mark stack segment growth"
            );
            self.segments.push(Vec::with_capacity(current_cap * 2));
        }
        self.segments.last_mut().unwrap().push((r#gen, idx));
    }

    /// Pop the most recently pushed pair, following back into the
    /// previous (smaller) segment once the current one empties out.
    pub fn pop(&mut self) -> Option<(u32, u32)> {
        loop {
            let seg = self.segments.last_mut()?;
            if let Some(pair) = seg.pop() {
                return Some(pair);
            }
            if self.segments.len() > 1 {
                self.segments.pop();
            } else {
                return None;
            }
        }
    }

    /// True if no entries remain in any segment.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|seg| seg.is_empty())
    }

    /// Rewind to a single, empty bottom segment, releasing every segment
    /// grown during the cycle just finished.
    pub fn clean(&mut self) {
        self.segments.truncate(1);
        self.segments[0].clear();
    }
}

impl Default for MarkStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo() {
        let mut s = MarkStack::new();
        s.push(0, 1);
        s.push(0, 2);
        assert_eq!(s.pop(), Some((0, 2)));
        assert_eq!(s.pop(), Some((0, 1)));
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn grows_past_bottom_segment_and_shrinks_back() {
        let mut s = MarkStack::new();
        let n = BOTTOM_SEGMENT_CAPACITY * 3;
        for i in 0..n {
            s.push(0, i as u32);
        }
        assert!(s.segments.len() > 1);
        let mut popped = Vec::new();
        while let Some(pair) = s.pop() {
            popped.push(pair);
        }
        assert_eq!(popped.len(), n);
        // After draining, only the (empty) bottom segment remains.
        assert_eq!(s.segments.len(), 1);
    }

    #[test]
    fn clean_rewinds_to_bottom_segment() {
        let mut s = MarkStack::new();
        for i in 0..(BOTTOM_SEGMENT_CAPACITY * 2) {
            s.push(0, i as u32);
        }
        s.clean();
        assert_eq!(s.segments.len(), 1);
        assert!(s.is_empty());
    }
}
