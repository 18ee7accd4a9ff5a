//! Minibatch layout metadata
//!
//! `MbLayout` records, for every (parallel stream, time step) cell of a
//! packed minibatch, whether the cell holds real data and whether it sits
//! on a sequence boundary. Buffers and layout travel together: the
//! invariant `column_count == parallel_sequences * time_steps` is checked
//! before any operation that rewrites both.

use serde::{Deserialize, Serialize};

/// Per-cell flags
///
/// A cell can be a boundary and valid at the same time, so this is a small
/// bit set rather than an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellFlags(u8);

impl CellFlags {
    /// Plain interior cell with valid data
    pub const NONE: CellFlags = CellFlags(0);
    /// First time step of a sequence
    pub const SEQUENCE_START: CellFlags = CellFlags(1);
    /// Last time step of a sequence
    pub const SEQUENCE_END: CellFlags = CellFlags(2);
    /// Padding cell with no input data
    pub const NO_INPUT: CellFlags = CellFlags(4);

    pub fn contains(self, other: CellFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: CellFlags) {
        self.0 |= other.0;
    }

    pub fn union(self, other: CellFlags) -> CellFlags {
        CellFlags(self.0 | other.0)
    }

    /// True when the cell holds real input data
    pub fn is_valid(self) -> bool {
        !self.contains(CellFlags::NO_INPUT)
    }
}

/// Validity/boundary metadata for a parallel_sequences x time_steps grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MbLayout {
    parallel_sequences: usize,
    time_steps: usize,
    // Indexed stream-major within a time step: cell (s, t) at t * P + s,
    // matching the column order of the packed buffers.
    flags: Vec<CellFlags>,
}

impl MbLayout {
    /// Layout with every cell valid and unflagged
    pub fn new(parallel_sequences: usize, time_steps: usize) -> Self {
        Self {
            parallel_sequences,
            time_steps,
            flags: vec![CellFlags::NONE; parallel_sequences * time_steps],
        }
    }

    /// Reinitialize to the given shape with every cell unflagged
    pub fn init(&mut self, parallel_sequences: usize, time_steps: usize) {
        self.parallel_sequences = parallel_sequences;
        self.time_steps = time_steps;
        self.flags.clear();
        self.flags
            .resize(parallel_sequences * time_steps, CellFlags::NONE);
    }

    pub fn num_parallel_sequences(&self) -> usize {
        self.parallel_sequences
    }

    pub fn num_time_steps(&self) -> usize {
        self.time_steps
    }

    /// Expected column count of every buffer described by this layout
    pub fn column_count(&self) -> usize {
        self.parallel_sequences * self.time_steps
    }

    pub fn get(&self, stream: usize, time_step: usize) -> CellFlags {
        debug_assert!(stream < self.parallel_sequences && time_step < self.time_steps);
        self.flags[time_step * self.parallel_sequences + stream]
    }

    pub fn set(&mut self, stream: usize, time_step: usize, flags: CellFlags) {
        debug_assert!(stream < self.parallel_sequences && time_step < self.time_steps);
        self.flags[time_step * self.parallel_sequences + stream] = flags;
    }

    pub fn add_flags(&mut self, stream: usize, time_step: usize, flags: CellFlags) {
        debug_assert!(stream < self.parallel_sequences && time_step < self.time_steps);
        self.flags[time_step * self.parallel_sequences + stream].insert(flags);
    }

    /// True when no cell carries any flag
    pub fn is_all_none(&self) -> bool {
        self.flags.iter().all(|&f| f == CellFlags::NONE)
    }

    /// Count of cells holding real data
    pub fn num_valid_cells(&self) -> usize {
        self.flags.iter().filter(|f| f.is_valid()).count()
    }

    /// Replace this layout with another in place
    pub fn move_from(&mut self, other: MbLayout) {
        *self = other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_combine() {
        let mut flags = CellFlags::SEQUENCE_START;
        flags.insert(CellFlags::SEQUENCE_END);
        assert!(flags.contains(CellFlags::SEQUENCE_START));
        assert!(flags.contains(CellFlags::SEQUENCE_END));
        assert!(flags.is_valid());
        assert!(!flags.union(CellFlags::NO_INPUT).is_valid());
    }

    #[test]
    fn test_layout_shape() {
        let layout = MbLayout::new(3, 4);
        assert_eq!(layout.num_parallel_sequences(), 3);
        assert_eq!(layout.num_time_steps(), 4);
        assert_eq!(layout.column_count(), 12);
        assert!(layout.is_all_none());
        assert_eq!(layout.num_valid_cells(), 12);
    }

    #[test]
    fn test_layout_get_set() {
        let mut layout = MbLayout::new(2, 3);
        layout.set(1, 2, CellFlags::NO_INPUT);
        layout.add_flags(0, 0, CellFlags::SEQUENCE_START);
        assert!(layout.get(0, 0).contains(CellFlags::SEQUENCE_START));
        assert!(!layout.get(1, 2).is_valid());
        assert_eq!(layout.num_valid_cells(), 5);
        assert!(!layout.is_all_none());
    }

    #[test]
    fn test_layout_init_resets() {
        let mut layout = MbLayout::new(2, 2);
        layout.set(0, 0, CellFlags::NO_INPUT);
        layout.init(1, 3);
        assert_eq!(layout.column_count(), 3);
        assert!(layout.is_all_none());
    }
}
