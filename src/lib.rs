//! # gencopy
//!
//! An embeddable, precise, generational mark-and-copy garbage-collected
//! heap.
//!
//! ## Design
//!
//! - **Cells**: every allocation is a run of fixed-size, pointer-sized
//!   [`tag::Tag`] cells, a non-pointer prefix followed by a pointer suffix.
//! - **Generations**: a young [`generation::Generation`] filled directly by
//!   the mutator, plus zero or more older generations filled only by
//!   evacuation during a collection.
//! - **Roots**: the mutator exposes live references through a stack of
//!   [`frame::Frame`]s; a permanent bottom frame always exists.
//! - **Collection**: [`collector::Gc::run_gc`] copies survivors of the
//!   minor generation (and, if needed, enough majors to make room for
//!   them) into an older generation; [`collector::Gc::full_gc`] does the
//!   same for the whole heap at once.
//!
//! Single-threaded, stop-the-world, exact (no conservative scanning).

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod collector;
pub mod error;
pub mod frame;
pub mod generation;
pub mod helpers;
pub mod mark_stack;
pub mod tag;

pub use collector::{CyclicMode, Gc, GcOptions, RunGcOutcome};
pub use error::{GcError, GcResult};
pub use helpers::{alloc_bytes, alloc_tuple, StrRef, TupleRef};
pub use tag::Tag;
