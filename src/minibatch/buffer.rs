//! Packed column-major minibatch buffer
//!
//! The numeric buffer contract the decimator and packer rely on: a
//! resizable 2-D buffer stored column-major, with read-only column slices
//! and column-range writes. Generic over the element type so half, single
//! and double precision pipelines share one implementation.

use crate::error::FeedError;
use crate::Result;

/// Resizable 2-D buffer, column-major
#[derive(Debug, Clone, PartialEq)]
pub struct PackedBuffer<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> PackedBuffer<T> {
    /// Zero-filled buffer of the given shape
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.cols
    }

    /// Resize to the given shape, zeroing the contents
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, T::default());
    }

    /// Read view of columns [start, start+count)
    pub fn column_slice(&self, start: usize, count: usize) -> Result<&[T]> {
        if start + count > self.cols {
            return Err(FeedError::invariant(format!(
                "column slice [{}, {}) out of range for {} columns",
                start,
                start + count,
                self.cols
            ))
            .into());
        }
        Ok(&self.data[start * self.rows..(start + count) * self.rows])
    }

    /// Copy a column-major block into columns [dest_start, dest_start+count)
    ///
    /// The source must hold exactly `count` columns of this buffer's row
    /// count.
    pub fn set_column_slice(&mut self, source: &[T], dest_start: usize, count: usize) -> Result<()> {
        if source.len() != count * self.rows {
            return Err(FeedError::invariant(format!(
                "column write of {} elements does not match {} columns x {} rows",
                source.len(),
                count,
                self.rows
            ))
            .into());
        }
        if dest_start + count > self.cols {
            return Err(FeedError::invariant(format!(
                "column write [{}, {}) out of range for {} columns",
                dest_start,
                dest_start + count,
                self.cols
            ))
            .into());
        }
        self.data[dest_start * self.rows..(dest_start + count) * self.rows]
            .copy_from_slice(source);
        Ok(())
    }

    /// Replace contents and shape with another buffer's
    pub fn replace_with(&mut self, other: PackedBuffer<T>) {
        *self = other;
    }

    /// Element at (row, col)
    pub fn get(&self, row: usize, col: usize) -> T {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[col * self.rows + row]
    }

    /// Set element at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[col * self.rows + row] = value;
    }

    /// Raw column-major contents
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let buffer: PackedBuffer<f32> = PackedBuffer::new(2, 3);
        assert_eq!(buffer.row_count(), 2);
        assert_eq!(buffer.column_count(), 3);
        assert!(buffer.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_column_slice_roundtrip() {
        let mut buffer: PackedBuffer<f32> = PackedBuffer::new(2, 4);
        buffer.set_column_slice(&[1.0, 2.0, 3.0, 4.0], 1, 2).unwrap();
        assert_eq!(buffer.column_slice(1, 2).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.get(0, 1), 1.0);
        assert_eq!(buffer.get(1, 2), 4.0);
        assert_eq!(buffer.get(0, 0), 0.0);
    }

    #[test]
    fn test_out_of_range_slice_is_error() {
        let buffer: PackedBuffer<f64> = PackedBuffer::new(2, 3);
        assert!(buffer.column_slice(2, 2).is_err());
    }

    #[test]
    fn test_mismatched_write_is_error() {
        let mut buffer: PackedBuffer<f32> = PackedBuffer::new(2, 3);
        assert!(buffer.set_column_slice(&[1.0; 3], 0, 2).is_err());
        assert!(buffer.set_column_slice(&[1.0; 4], 2, 2).is_err());
    }

    #[test]
    fn test_resize_zeroes() {
        let mut buffer: PackedBuffer<f32> = PackedBuffer::new(1, 1);
        buffer.set(0, 0, 5.0);
        buffer.resize(2, 2);
        assert_eq!(buffer.column_count(), 2);
        assert!(buffer.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_replace_with() {
        let mut buffer: PackedBuffer<f32> = PackedBuffer::new(2, 5);
        let mut replacement = PackedBuffer::new(2, 1);
        replacement.set(1, 0, 9.0);
        buffer.replace_with(replacement);
        assert_eq!(buffer.column_count(), 1);
        assert_eq!(buffer.get(1, 0), 9.0);
    }
}
