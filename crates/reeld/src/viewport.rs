use std::sync::Arc;

use reelcore_filter::{FilterEngine, FilteredView};
use reelcore_store::{Record, RecordStore};
use reelcore_window::{WindowGeometry, WindowRange};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewportError {
    #[error("scroll offset {0} must be finite and non-negative")]
    InvalidOffset(f64),
}

/// What the presentation layer needs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct VisibleSlice<'a> {
    pub range: WindowRange,
    /// Leading edge of the first rendered row.
    pub offset: f64,
    /// Total scrollable extent of the filtered view.
    pub content_extent: f64,
    pub filtered_count: usize,
    pub records: Vec<&'a Record>,
}

/// Owns query and scroll state and keeps the window range current.
///
/// Every scroll event recomputes the range (O(1)). Query changes refilter through
/// a memoizing [`FilterEngine`] and then clamp the scroll offset to the new content,
/// so a shrinking view never leaves the window past its end.
#[derive(Debug)]
pub struct ViewportController {
    engine: FilterEngine,
    geometry: WindowGeometry,
    query: String,
    view: FilteredView,
    scroll_offset: f64,
    range: WindowRange,
}

impl ViewportController {
    pub fn new(store: Arc<RecordStore>, geometry: WindowGeometry) -> Self {
        let mut engine = FilterEngine::new(store);
        let view = engine.apply("");
        let range = geometry.compute_range(view.len(), 0.0);

        Self {
            engine,
            geometry,
            query: String::new(),
            view,
            scroll_offset: 0.0,
            range,
        }
    }

    pub fn on_scroll(&mut self, offset: f64) -> Result<WindowRange, ViewportError> {
        if !offset.is_finite() || offset < 0.0 {
            return Err(ViewportError::InvalidOffset(offset));
        }

        self.scroll_offset = offset;
        self.recompute();
        Ok(self.range)
    }

    pub fn on_query_change(&mut self, text: &str) -> WindowRange {
        self.query.clear();
        self.query.push_str(text);
        self.view = self.engine.apply(text);

        let max_offset = self.geometry.max_scroll_offset(self.view.len());
        if self.scroll_offset > max_offset {
            debug!(
                from = self.scroll_offset,
                to = max_offset,
                "clamping scroll offset to filtered content"
            );
            self.scroll_offset = max_offset;
        }

        self.recompute();
        self.range
    }

    pub fn visible_slice(&self) -> VisibleSlice<'_> {
        VisibleSlice {
            range: self.range,
            offset: self.geometry.offset_of(self.range.start_index),
            content_extent: self.geometry.content_extent(self.view.len()),
            filtered_count: self.view.len(),
            records: self.view.slice(self.range.start_index, self.range.end_index),
        }
    }

    pub fn range(&self) -> WindowRange {
        self.range
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn filtered_len(&self) -> usize {
        self.view.len()
    }

    pub fn filtered_view(&self) -> &FilteredView {
        &self.view
    }

    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    fn recompute(&mut self) {
        self.range = self
            .geometry
            .compute_range(self.view.len(), self.scroll_offset);
        debug!(
            offset = self.scroll_offset,
            start = self.range.start_index,
            end = self.range.end_index,
            filtered = self.view.len(),
            "window recomputed"
        );
    }
}
