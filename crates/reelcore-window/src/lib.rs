//! Fixed-extent list windowing.
//!
//! Given a view length, a row extent, a viewport extent, an overscan margin and a
//! scroll offset, compute the contiguous index range that has to be materialized.
//! All operations are O(1) in the view length.

use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("row extent must be positive")]
    ZeroRowExtent,
    #[error("viewport extent must be positive")]
    ZeroViewportExtent,
}

/// Half-open index range `[start_index, end_index)` into a filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowRange {
    pub start_index: usize,
    pub end_index: usize,
}

impl WindowRange {
    pub const EMPTY: WindowRange = WindowRange::new(0, 0);

    pub const fn new(start_index: usize, end_index: usize) -> Self {
        Self {
            start_index,
            end_index,
        }
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }
}

/// Validated constants of a viewport: row extent, viewport extent and overscan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowGeometry {
    row_extent: u32,
    viewport_extent: u32,
    overscan: u32,
}

impl WindowGeometry {
    pub fn new(
        row_extent: u32,
        viewport_extent: u32,
        overscan: u32,
    ) -> Result<Self, GeometryError> {
        if row_extent == 0 {
            return Err(GeometryError::ZeroRowExtent);
        }
        if viewport_extent == 0 {
            return Err(GeometryError::ZeroViewportExtent);
        }

        Ok(Self {
            row_extent,
            viewport_extent,
            overscan,
        })
    }

    pub fn row_extent(&self) -> u32 {
        self.row_extent
    }

    pub fn viewport_extent(&self) -> u32 {
        self.viewport_extent
    }

    pub fn overscan(&self) -> u32 {
        self.overscan
    }

    /// Rows that fit in the viewport (rounded up) plus the overscan margin.
    pub fn visible_slot_count(&self) -> usize {
        self.viewport_extent.div_ceil(self.row_extent) as usize + self.overscan as usize
    }

    pub fn compute_range(&self, view_len: usize, scroll_offset: f64) -> WindowRange {
        compute_range(
            view_len,
            self.row_extent,
            self.viewport_extent,
            self.overscan,
            scroll_offset,
        )
    }

    /// Total scrollable extent of `view_len` rows.
    pub fn content_extent(&self, view_len: usize) -> f64 {
        view_len as f64 * f64::from(self.row_extent)
    }

    /// Largest offset at which the last row is still inside the viewport.
    pub fn max_scroll_offset(&self, view_len: usize) -> f64 {
        (self.content_extent(view_len) - f64::from(self.viewport_extent)).max(0.0)
    }

    /// Leading edge of the row at `index`, i.e. where the rendered block is placed.
    pub fn offset_of(&self, index: usize) -> f64 {
        index as f64 * f64::from(self.row_extent)
    }
}

/// Raw windowing arithmetic.
///
/// `row_extent` must be positive; a non-finite or negative offset counts as 0.
/// `start_index` is clamped to `view_len`, so an offset past the content yields an
/// empty range at the end of the view instead of an inverted one.
pub fn compute_range(
    view_len: usize,
    row_extent: u32,
    viewport_extent: u32,
    overscan: u32,
    scroll_offset: f64,
) -> WindowRange {
    assert!(row_extent > 0, "row extent must be positive");

    let visible_slot_count = viewport_extent.div_ceil(row_extent) as usize + overscan as usize;
    let offset = if scroll_offset.is_finite() {
        scroll_offset.max(0.0)
    } else {
        0.0
    };
    // Saturating float-to-int cast keeps huge offsets in range.
    let first_row = (offset / f64::from(row_extent)).floor() as usize;

    let start_index = first_row.min(view_len);
    let end_index = view_len.min(start_index.saturating_add(visible_slot_count));

    WindowRange::new(start_index, end_index)
}
