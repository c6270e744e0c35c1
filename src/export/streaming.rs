//! Offset pagination over the primary model
//!
//! The driver walks fixed-size windows `[0, n, 2n, ...]` in ascending id
//! order until the offset reaches the total counted up front. Windows are
//! computed, not fetched, so this module never holds records.

/// One window of the primary model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    /// 1-based batch number
    pub index: u64,
    pub offset: u64,
    /// Page size requested from the store
    pub limit: u64,
    /// Records expected in this window given the initial total
    pub expected: u64,
}

/// Iterator over the batch windows covering `total` records
#[derive(Debug, Clone)]
pub struct Paginator {
    total: u64,
    batch_size: u64,
    next_offset: u64,
    next_index: u64,
}

impl Paginator {
    /// Create a paginator
    ///
    /// # Arguments
    /// * `total` - Record count taken before the first fetch
    /// * `batch_size` - Window size, at least 1
    pub fn new(total: u64, batch_size: u64) -> Self {
        Self {
            total,
            batch_size: batch_size.max(1),
            next_offset: 0,
            next_index: 1,
        }
    }

    /// Number of windows needed to cover the total
    pub fn total_batches(&self) -> u64 {
        self.total.div_ceil(self.batch_size)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Iterator for Paginator {
    type Item = BatchWindow;

    fn next(&mut self) -> Option<BatchWindow> {
        if self.next_offset >= self.total {
            return None;
        }

        let window = BatchWindow {
            index: self.next_index,
            offset: self.next_offset,
            limit: self.batch_size,
            expected: self.batch_size.min(self.total - self.next_offset),
        };
        self.next_offset += self.batch_size;
        self.next_index += 1;
        Some(window)
    }
}
