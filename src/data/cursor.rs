//! Wrap-around cursor over the real-image dataset
//!
//! The cursor hands out contiguous batch-sized windows and resets to the
//! start whenever the next window would run past the end. A window never
//! indexes past `len - 1`; trailing images that cannot fill a batch are
//! skipped for that pass.

use std::ops::Range;

use crate::error::{Error, Result};

/// Position of the next real batch within the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetCursor {
    offset: usize,
    batch_size: usize,
    len: usize,
    wraps: usize,
}

impl DatasetCursor {
    /// Create a cursor at the start of a dataset of `len` images
    pub fn new(len: usize, batch_size: usize) -> Result<Self> {
        Self::with_offset(len, batch_size, 0)
    }

    /// Create a cursor at a given offset (used when resuming)
    pub fn with_offset(len: usize, batch_size: usize, offset: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config("batch size must be > 0".to_string()));
        }
        if batch_size > len {
            return Err(Error::Config(format!(
                "batch size {} exceeds dataset length {}",
                batch_size, len
            )));
        }

        let offset = if offset + batch_size > len { 0 } else { offset };

        Ok(Self {
            offset,
            batch_size,
            len,
            wraps: 0,
        })
    }

    /// Index range of the current window
    pub fn window(&self) -> Range<usize> {
        self.offset..self.offset + self.batch_size
    }

    /// Move to the next window, wrapping to 0 if it would not fit
    pub fn advance(&mut self) {
        self.offset += self.batch_size;
        if self.offset + self.batch_size > self.len {
            self.offset = 0;
            self.wraps += 1;
        }
    }

    /// Current offset
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of times the cursor wrapped back to the start
    pub fn wraps(&self) -> usize {
        self.wraps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_multiple_wraps_once() {
        let mut cursor = DatasetCursor::new(100, 20).unwrap();
        let mut starts = Vec::new();

        for _ in 0..5 {
            starts.push(cursor.window().start);
            cursor.advance();
        }

        assert_eq!(starts, vec![0, 20, 40, 60, 80]);
        assert_eq!(cursor.offset(), 0);
        assert_eq!(cursor.wraps(), 1);
    }

    #[test]
    fn test_uneven_length_never_reads_past_end() {
        let len = 50;
        let mut cursor = DatasetCursor::new(len, 20).unwrap();

        for _ in 0..20 {
            let window = cursor.window();
            assert!(window.end <= len);
            cursor.advance();
        }
    }

    #[test]
    fn test_wraps_after_last_full_window() {
        let mut cursor = DatasetCursor::new(50, 20).unwrap();
        assert_eq!(cursor.window(), 0..20);
        cursor.advance();
        assert_eq!(cursor.window(), 20..40);
        cursor.advance();
        // 40..60 would overflow a 50-image dataset
        assert_eq!(cursor.window(), 0..20);
        assert_eq!(cursor.wraps(), 1);
    }

    #[test]
    fn test_batch_equal_to_len() {
        let mut cursor = DatasetCursor::new(8, 8).unwrap();
        for _ in 0..3 {
            assert_eq!(cursor.window(), 0..8);
            cursor.advance();
        }
        assert_eq!(cursor.wraps(), 3);
    }

    #[test]
    fn test_invalid_batch_sizes() {
        assert!(DatasetCursor::new(10, 0).is_err());
        assert!(DatasetCursor::new(10, 11).is_err());
    }

    #[test]
    fn test_resume_offset_out_of_range_resets() {
        let cursor = DatasetCursor::with_offset(100, 20, 90).unwrap();
        assert_eq!(cursor.offset(), 0);

        let cursor = DatasetCursor::with_offset(100, 20, 40).unwrap();
        assert_eq!(cursor.window(), 40..60);
    }
}
