//! Tuple and byte-string allocation conveniences.
//!
//! Thin wrappers around [`Gc::alloc`] that lay out the two object shapes
//! the source this collector is modeled on provides out of the box
//! (`zAllocTup`/`zAllocStr`): a tagged fixed-arity tuple of pointers, and a
//! length-prefixed byte string.

use crate::collector::Gc;
use crate::error::GcResult;
use crate::tag::Tag;

/// A tuple: one non-pointer tag cell followed by `dim` pointer cells.
///
/// `head` is the address of the tag cell; slot `i` of the tuple lives at
/// `head + 1 + i`.
#[derive(Clone, Copy)]
pub struct TupleRef {
    head: *mut Tag,
    dim: usize,
}

impl TupleRef {
    /// Number of pointer slots.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The tuple's tag value.
    pub fn tag(&self) -> usize {
        unsafe { (*self.head).as_usize() }
    }

    /// Read slot `idx`.
    pub fn get(&self, idx: usize) -> Tag {
        debug_assert!(idx < self.dim);
        unsafe { *self.head.add(1 + idx) }
    }

    /// Write slot `idx`.
    pub fn set(&self, idx: usize, value: Tag) {
        debug_assert!(idx < self.dim);
        unsafe {
            *self.head.add(1 + idx) = value;
        }
    }

    /// Raw address of the tag cell, suitable for storing into a root slot.
    pub fn as_ptr(&self) -> *mut Tag {
        self.head
    }
}

/// A length-prefixed byte string: one non-pointer length cell followed by
/// the payload cells, NUL-terminated at both ends of the declared length
/// the way the source this is modeled on zeroes both `c[0]` and `c[len]`.
#[derive(Clone, Copy)]
pub struct StrRef {
    head: *mut Tag,
    len: usize,
}

impl StrRef {
    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the string is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte buffer view of the payload, `len + 1` bytes (the extra byte is
    /// the trailing NUL).
    pub fn bytes(&self) -> &[u8] {
        unsafe {
            let payload = self.head.add(1) as *const u8;
            std::slice::from_raw_parts(payload, self.len + 1)
        }
    }

    /// Mutable byte buffer view of the payload.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        unsafe {
            let payload = self.head.add(1) as *mut u8;
            std::slice::from_raw_parts_mut(payload, self.len + 1)
        }
    }

    /// Raw address of the length cell, suitable for storing into a root
    /// slot.
    pub fn as_ptr(&self) -> *mut Tag {
        self.head
    }
}

const CELL_BYTES: usize = std::mem::size_of::<Tag>();

/// Allocate a tuple of `dim` pointer slots tagged with `tag`.
pub fn alloc_tuple(gc: &mut Gc, tag: usize, dim: usize) -> GcResult<TupleRef> {
    let head = gc.alloc(1, dim)?;
    unsafe {
        (*head).u = tag;
    }
    Ok(TupleRef { head, dim })
}

/// Allocate a byte string of `len` bytes.
pub fn alloc_bytes(gc: &mut Gc, len: usize) -> GcResult<StrRef> {
    // One cell for the length, plus floor(len / CELL_BYTES) + 1 cells of
    // payload: always enough room for `len` data bytes and a trailing
    // NUL, no matter how `len` lines up with the cell stride.
    let total_cells = 2 + len / CELL_BYTES;
    let head = gc.alloc(total_cells, 0)?;
    unsafe {
        (*head).u = len;
        let bytes = head.add(1) as *mut u8;
        *bytes = 0;
        *bytes.add(len) = 0;
    }
    Ok(StrRef { head, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_round_trips_slots() {
        let mut gc = Gc::new(2);
        let t = alloc_tuple(&mut gc, 7, 3).unwrap();
        assert_eq!(t.tag(), 7);
        assert_eq!(t.dim(), 3);
        t.set(1, Tag::from_usize(99));
        assert_eq!(t.get(1).as_usize(), 99);
    }

    #[test]
    fn string_is_nul_terminated_and_writable() {
        let mut gc = Gc::new(1);
        let mut s = alloc_bytes(&mut gc, 5).unwrap();
        assert_eq!(s.len(), 5);
        let buf = s.bytes_mut();
        buf[..5].copy_from_slice(b"hello");
        assert_eq!(&s.bytes()[..5], b"hello");
        assert_eq!(s.bytes()[5], 0);
    }

    #[test]
    fn empty_string_has_single_terminator() {
        let mut gc = Gc::new(1);
        let s = alloc_bytes(&mut gc, 0).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.bytes(), &[0]);
    }
}
