//! The collector itself: generation array, allocation, and the
//! mark-and-copy cycle.
//!
//! Mirrors the source this crate is modeled on almost function-for-function
//! (`zAlloc`, `zRunGC`, `zFullGC`, `zMarkGC`/`zMarkPropagate`, `zMoveGC`,
//! `zReduceEmptyGC`), translated cell-index arithmetic into the safe
//! [`Generation`] API built for it.

use crate::error::{GcError, GcResult};
use crate::frame::FrameStack;
use crate::generation::Generation;
use crate::mark_stack::MarkStack;
use crate::tag::{Tag, mark, stat};

/// Default minor heap size, in cells.
pub const DEFAULT_MINOR_HEAP_SIZE: usize = 1 << 18;
/// Default minimum major heap size, in cells.
pub const DEFAULT_MAJOR_HEAP_SIZE: usize = 1 << 18;
/// Initial generation-array capacity hint.
pub const DEFAULT_N_GENS: usize = 8;
/// Below this, a requested heap size is replaced by the matching default.
pub const HEAP_MIN_SIZE: usize = 16;
/// A freshly created generation is sized at `request * NEW_HEAP_SIZE_FACTOR`.
pub const NEW_HEAP_SIZE_FACTOR: usize = 3;
/// Empty majors are dropped once `total > allocated * EMPTY_RATIO`.
pub const EMPTY_RATIO: usize = 5;

/// Constructor-time and mutable tuning knobs.
#[derive(Debug, Clone)]
pub struct GcOptions {
    /// Minor heap size in cells. Values `<= HEAP_MIN_SIZE` fall back to
    /// [`DEFAULT_MINOR_HEAP_SIZE`].
    pub minor_heap_size: usize,
    /// Minimum size, in cells, for a freshly created major generation.
    pub major_heap_min_size: usize,
}

impl Default for GcOptions {
    fn default() -> Self {
        Self {
            minor_heap_size: DEFAULT_MINOR_HEAP_SIZE,
            major_heap_min_size: DEFAULT_MAJOR_HEAP_SIZE,
        }
    }
}

/// The argument to [`Gc::set_cyclic_mode`].
///
/// Mirrors the tri-state `int` contract of the source this is modeled on:
/// positive enables, `0` disables after a precautionary full collection,
/// negative disables without one (the mutator vouches no cross-generation
/// cycles remain reachable from the roots).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclicMode {
    /// Assume cross-generation cycles may exist; scan the whole heap every
    /// cycle.
    Enable,
    /// Stop assuming cycles exist, but run a full collection first so any
    /// generation holding an elder-to-younger pointer gets reconciled
    /// before the classical generational assumption resumes.
    DisableWithFullGc,
    /// Stop assuming cycles exist without a reconciling collection. Unsafe
    /// if a cycle actually survives uncollected across generations.
    DisableUnsafe,
}

/// Outcome of [`Gc::run_gc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunGcOutcome {
    /// A collection ran.
    Collected,
    /// The minor generation already had room; nothing was done.
    NoWork,
}

/// The collector: a generation array, the root frame stack, and the
/// per-cycle mark stack.
pub struct Gc {
    major_heap_min_size: usize,
    cyclic_enabled: bool,
    generations: Vec<Generation>,
    frames: FrameStack,
    mark_stack: MarkStack,
    // Set at the start of a cycle, read throughout it.
    gc_target: usize,
    mark_top: usize,
    move_top: usize,
    n_collection: usize,
}

impl Gc {
    /// Create a collector with default options and a bottom root frame of
    /// `root_frame_size` slots.
    pub fn new(root_frame_size: usize) -> Self {
        Self::with_options(root_frame_size, GcOptions::default())
    }

    /// Create a collector with explicit options.
    pub fn with_options(root_frame_size: usize, opts: GcOptions) -> Self {
        let minor_size = if opts.minor_heap_size <= HEAP_MIN_SIZE {
            DEFAULT_MINOR_HEAP_SIZE
        } else {
            opts.minor_heap_size
        };
        let mut generations = Vec::with_capacity(DEFAULT_N_GENS);
        generations.push(Generation::new(minor_size));
        #[cfg(feature = "gc_logging")]
        tracing::debug!(target: "gencopy::gc", minor_size, "collector created");
        Self {
            major_heap_min_size: opts.major_heap_min_size.max(HEAP_MIN_SIZE),
            cyclic_enabled: false,
            generations,
            frames: FrameStack::new(root_frame_size),
            mark_stack: MarkStack::new(),
            gc_target: 0,
            mark_top: 0,
            move_top: 0,
            n_collection: 0,
        }
    }

    // -- Options -----------------------------------------------------

    /// Raise (never lower below [`HEAP_MIN_SIZE`]) the minimum size of a
    /// freshly created major generation.
    pub fn set_major_min_size(&mut self, size: usize) {
        if size >= HEAP_MIN_SIZE {
            self.major_heap_min_size = size;
        }
    }

    /// Switch the cyclic-reference scanning mode. See [`CyclicMode`].
    pub fn set_cyclic_mode(&mut self, mode: CyclicMode) -> GcResult<()> {
        match mode {
            CyclicMode::Enable => {
                self.cyclic_enabled = true;
                Ok(())
            }
            CyclicMode::DisableWithFullGc => {
                self.full_gc()?;
                self.cyclic_enabled = false;
                Ok(())
            }
            CyclicMode::DisableUnsafe => {
                self.cyclic_enabled = false;
                Ok(())
            }
        }
    }

    // -- Allocation ----------------------------------------------------

    /// Allocate `np` non-pointer cells followed by `p` pointer cells as a
    /// single object, running a collection first if needed.
    pub fn alloc(&mut self, np: usize, p: usize) -> GcResult<*mut Tag> {
        let sz = np + p;
        let minor_size = self.generations[0].size();
        if sz >= minor_size {
            return self.alloc_large(np, p, sz);
        }
        if self.generations[0].left() < sz {
            self.run_gc()?;
        }
        self.generations[0]
            .allocate(np, p)
            .ok_or(GcError::OutOfMemory)
    }

    /// Allocate an object too large for the minor heap.
    fn alloc_large(&mut self, np: usize, p: usize, sz: usize) -> GcResult<*mut Tag> {
        if !self.cyclic_enabled && p > 0 {
            self.run_gc()?;
        } else {
            for r#gen in self.generations.iter_mut().skip(1) {
                if let Some(ptr) = r#gen.allocate(np, p) {
                    return Ok(ptr);
                }
            }
        }
        let mut new_gen = Generation::new(sz * NEW_HEAP_SIZE_FACTOR);
        let ptr = new_gen.allocate(np, p).ok_or(GcError::OutOfMemory)?;
        #[cfg(feature = "gc_logging")]
        tracing::debug!(target: "gencopy::gc", size = sz * NEW_HEAP_SIZE_FACTOR, "new major generation for large object");
        self.generations.insert(1, new_gen);
        Ok(ptr)
    }

    // -- Collection ------------------------------------------------------

    /// Collect just enough to make room in the minor generation.
    pub fn run_gc(&mut self) -> GcResult<RunGcOutcome> {
        if self.generations[0].left() >= self.generations[0].size() {
            return Ok(RunGcOutcome::NoWork);
        }
        self.gc_target = 0;
        self.mark_top = if self.cyclic_enabled {
            self.generations.len()
        } else {
            self.find_mark_top_by_alloc()
        };
        self.mark();
        self.move_top = self.find_move_top_by_reachable();
        self.move_gc()?;
        self.reduce_empty();
        self.n_collection += 1;
        #[cfg(feature = "gc_logging")]
        tracing::info!(target: "gencopy::gc", n_collection = self.n_collection, "minor collection");
        Ok(RunGcOutcome::Collected)
    }

    /// Collect the entire heap into a single generation, ignoring the
    /// classical generational assumption for this cycle.
    pub fn full_gc(&mut self) -> GcResult<()> {
        self.gc_target = 0;
        self.mark_top = self.generations.len();
        self.move_top = self.generations.len();
        self.mark();
        self.move_gc()?;
        self.reduce_empty();
        self.n_collection += 1;
        #[cfg(feature = "gc_logging")]
        tracing::info!(target: "gencopy::gc", n_collection = self.n_collection, "full collection");
        Ok(())
    }

    fn find_mark_top_by_alloc(&self) -> usize {
        let mut k = self.gc_target;
        let mut acc = self.generations[k].allocated();
        k += 1;
        while k < self.generations.len() && acc > self.generations[k].left() {
            acc += self.generations[k].allocated();
            k += 1;
        }
        k
    }

    fn find_move_top_by_reachable(&self) -> usize {
        let mut k = self.gc_target;
        let mut acc = self.generations[k].n_reachables();
        k += 1;
        while k < self.generations.len() && acc > self.generations[k].left() {
            acc += self.generations[k].n_reachables();
            k += 1;
        }
        k
    }

    // -- Marking -----------------------------------------------------

    fn mark(&mut self) {
        for frame_idx in 0..self.frames.frame_count() {
            for slot in 0..self.frames.frame_at(frame_idx).size() {
                if self.frames.frame_at(frame_idx).is_nptr(slot) {
                    continue;
                }
                let ptr = self
                    .frames
                    .frame_at(frame_idx)
                    .get(slot)
                    .expect("slot in range")
                    .as_ptr();
                for j in 0..self.mark_top {
                    let Some(idy) = self.generations[j].ptr_index(ptr) else {
                        continue;
                    };
                    if self.generations[j].stat_byte(idy) & stat::SEP != 0
                        && self.generations[j].mark_byte(idy) == mark::WHITE
                    {
                        self.generations[j].set_mark_byte(idy, mark::BLACK);
                        self.propagate(j, idy);
                        while let Some((g, i)) = self.mark_stack.pop() {
                            self.propagate(g as usize, i as usize);
                        }
                    }
                    break;
                }
            }
        }
        self.mark_stack.clean();
    }

    fn propagate(&mut self, r#gen: usize, idx: usize) {
        let kf = if self.cyclic_enabled { 0 } else { r#gen };
        let end = self.generations[r#gen].object_extent(idx);
        for xoff in idx..end {
            if self.generations[r#gen].stat_byte(xoff) & stat::NPTR != 0 {
                continue;
            }
            let ptr = self.generations[r#gen].cell(xoff).as_ptr();
            for k in kf..self.mark_top {
                let Some(idy) = self.generations[k].ptr_index(ptr) else {
                    continue;
                };
                if self.generations[k].stat_byte(idy) & stat::SEP != 0
                    && self.generations[k].mark_byte(idy) == mark::WHITE
                {
                    self.generations[k].set_mark_byte(idy, mark::BLACK);
                    self.mark_stack.push(k as u32, idy as u32);
                }
                break;
            }
        }
        self.generations[r#gen].add_reachables(end - idx);
    }

    // -- Copying -----------------------------------------------------

    fn move_gc(&mut self) -> GcResult<()> {
        let bot = self.gc_target;
        let top = self.move_top;
        if top >= self.generations.len() {
            let mut sz: usize = (bot..top).map(|k| self.generations[k].n_reachables()).sum();
            sz *= NEW_HEAP_SIZE_FACTOR;
            if sz < self.major_heap_min_size {
                sz = self.major_heap_min_size;
            }
            self.generations.push(Generation::new(sz));
            #[cfg(feature = "gc_logging")]
            tracing::debug!(target: "gencopy::gc", size = sz, "new major generation for survivors");
        }

        for j in (bot..top).rev() {
            let (left, right) = self.generations.split_at_mut(top);
            Self::realloc_gen(&mut right[0], &mut left[j]);
        }

        let jt = if self.cyclic_enabled {
            self.generations.len()
        } else {
            top + 1
        };
        for j in 0..bot {
            self.update_pointers_in(j);
        }
        for j in top..jt {
            self.update_pointers_in(j);
        }
        self.update_root_pointers();

        for k in 0..bot {
            self.generations[k].clean_marks();
        }
        for k in bot..top {
            self.generations[k].clean_all();
        }
        for k in top..self.generations.len() {
            self.generations[k].clean_marks();
        }
        Ok(())
    }

    /// Move every reachable object out of `src` and into `dst`, leaving a
    /// forwarding address (the destination cell) behind in each moved
    /// object's head cell of `src`.
    fn realloc_gen(dst: &mut Generation, src: &mut Generation) {
        let mut off = src.left();
        let lim = src.size();
        while off < lim {
            if src.mark_byte(off) == mark::WHITE {
                off += 1;
                continue;
            }
            let mut p = off;
            while p < lim && (src.stat_byte(p) & stat::SEP == 0 || src.mark_byte(p) != mark::WHITE) {
                p += 1;
            }
            let len = p - off;
            let dst_off = dst.bulk_copy_from(src, off, len);
            for k in off..p {
                if src.stat_byte(k) & stat::SEP != 0 {
                    let dest_addr = dst.cell_addr(dst_off + (k - off));
                    src.set_cell(k, Tag::from_ptr(dest_addr));
                }
            }
            off = p;
        }
    }

    fn update_pointers_in(&mut self, gen_idx: usize) {
        let tgt = self.gc_target;
        let top = self.move_top;
        let size = self.generations[gen_idx].size();
        let mut off = self.generations[gen_idx].left();
        while off < size {
            if self.generations[gen_idx].stat_byte(off) & stat::NPTR == 0 {
                let ptr = self.generations[gen_idx].cell(off).as_ptr();
                for k in tgt..top {
                    if let Some(idx) = self.generations[k].ptr_index(ptr) {
                        let forwarded = self.generations[k].cell(idx);
                        self.generations[gen_idx].set_cell(off, forwarded);
                        break;
                    }
                }
            }
            off += 1;
        }
    }

    fn update_root_pointers(&mut self) {
        let tgt = self.gc_target;
        let top = self.move_top;
        for frame_idx in 0..self.frames.frame_count() {
            for slot in 0..self.frames.frame_at(frame_idx).size() {
                if self.frames.frame_at(frame_idx).is_nptr(slot) {
                    continue;
                }
                let ptr = self
                    .frames
                    .frame_at(frame_idx)
                    .get(slot)
                    .expect("slot in range")
                    .as_ptr();
                for k in tgt..top {
                    if let Some(idx) = self.generations[k].ptr_index(ptr) {
                        let forwarded = self.generations[k].cell(idx);
                        self.frames.frame_at_mut(frame_idx).forward(slot, forwarded);
                        break;
                    }
                }
            }
        }
    }

    fn reduce_empty(&mut self) {
        let mut total = 0usize;
        let mut allocated = 0usize;
        for g in &self.generations[1..] {
            total += g.size();
            allocated += g.allocated();
        }
        let mut k = self.generations.len();
        while k > 1 {
            k -= 1;
            if total <= allocated * EMPTY_RATIO {
                break;
            }
            if self.generations[k].left() == self.generations[k].size() {
                total -= self.generations[k].size();
                self.generations.remove(k);
            }
        }
    }

    // -- Root frames --------------------------------------------------

    /// Push a new top frame of `size` slots.
    pub fn push_frame(&mut self, size: usize) {
        self.frames.push(size);
    }

    /// Pop the top frame (a no-op on the permanent bottom frame).
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Slot count of the current top frame.
    pub fn top_frame_size(&self) -> usize {
        self.frames.top().size()
    }

    /// Slot count of the permanent bottom frame.
    pub fn bot_frame_size(&self) -> usize {
        self.frames.bot().size()
    }

    /// Read a slot of the top frame.
    pub fn get_top(&self, idx: usize) -> GcResult<Tag> {
        self.frames.top().get(idx)
    }

    /// Read a slot of the bottom frame.
    pub fn get_bot(&self, idx: usize) -> GcResult<Tag> {
        self.frames.bot().get(idx)
    }

    /// Write a slot of the top frame.
    pub fn set_top(&mut self, idx: usize, value: Tag, is_nptr: bool) -> GcResult<()> {
        self.frames.top_mut().set(idx, value, is_nptr)
    }

    /// Write a slot of the bottom frame.
    pub fn set_bot(&mut self, idx: usize, value: Tag, is_nptr: bool) -> GcResult<()> {
        self.frames.bot_mut().set(idx, value, is_nptr)
    }

    // -- Introspection --------------------------------------------------

    /// Number of generations currently in the array (minor plus majors).
    pub fn n_gens(&self) -> usize {
        self.generations.len()
    }

    /// Collections run so far (minor and full combined).
    pub fn n_collections(&self) -> usize {
        self.n_collection
    }

    /// Reserved cells of generation `idx`, or of the whole heap if `None`.
    /// An out-of-range `idx` reads as `0`.
    pub fn reserved_slots(&self, idx: Option<usize>) -> usize {
        match idx {
            Some(i) => self.generations.get(i).map_or(0, Generation::size),
            None => self.generations.iter().map(Generation::size).sum(),
        }
    }

    /// Free cells of generation `idx`, or of the whole heap if `None`.
    pub fn left_slots(&self, idx: Option<usize>) -> usize {
        match idx {
            Some(i) => self.generations.get(i).map_or(0, Generation::left),
            None => self.generations.iter().map(Generation::left).sum(),
        }
    }

    /// Allocated cells of generation `idx`, or of the whole heap if `None`.
    pub fn allocated_slots(&self, idx: Option<usize>) -> usize {
        self.reserved_slots(idx) - self.left_slots(idx)
    }
}
