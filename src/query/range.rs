//! Page cursor to row range arithmetic.

use std::fmt;

/// Index of a page within a paginated collection, starting at 0.
pub type PageCursor = usize;

/// Inclusive row range `[from, to]` in the backend's ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowRange {
    pub from: usize,
    pub to: usize,
}

impl RowRange {
    /// Number of rows the range covers.
    pub fn len(&self) -> usize {
        (self.to + 1).saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }

    /// `offset`/`limit` form used by query-string based backends.
    pub fn offset_limit(&self) -> (usize, usize) {
        (self.from, self.len())
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Row range covered by page `cursor` with `limit` rows per page.
///
/// `limit` must be positive. A zero limit trips a debug assertion and in
/// release builds yields a one-row range instead of underflowing.
pub fn range_for(cursor: PageCursor, limit: usize) -> RowRange {
    debug_assert!(limit > 0, "page size must be positive");
    let from = cursor * limit;
    RowRange {
        from,
        to: (from + limit).saturating_sub(1).max(from),
    }
}
