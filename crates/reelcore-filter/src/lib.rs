//! Query filtering over a [`RecordStore`].
//!
//! A [`FilteredView`] is a subsequence of the store that preserves store order.
//! Views are replaced wholesale on every query change and never mutated.

mod matcher;

use std::sync::Arc;

use reelcore_store::{Record, RecordStore};
use tracing::debug;

pub use matcher::{contains_case_insensitive, record_matches, NormalizedQuery};

/// Ordered view over a shared store.
///
/// Either the whole store (empty query) or the store positions that matched.
#[derive(Debug, Clone)]
pub struct FilteredView {
    store: Arc<RecordStore>,
    positions: Option<Arc<[usize]>>,
}

impl FilteredView {
    pub fn identity(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            positions: None,
        }
    }

    fn with_positions(store: Arc<RecordStore>, positions: Vec<usize>) -> Self {
        Self {
            store,
            positions: Some(positions.into()),
        }
    }

    pub fn len(&self) -> usize {
        match &self.positions {
            Some(positions) => positions.len(),
            None => self.store.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_identity(&self) -> bool {
        self.positions.is_none()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        match &self.positions {
            Some(positions) => positions.get(index).map(|&p| &self.store[p]),
            None => self.store.get(index),
        }
    }

    /// Records in `start..end`, clamped to the view length.
    pub fn slice(&self, start: usize, end: usize) -> Vec<&Record> {
        let end = end.min(self.len());
        let start = start.min(end);
        match &self.positions {
            Some(positions) => positions[start..end]
                .iter()
                .map(|&p| &self.store[p])
                .collect(),
            None => self.store.records()[start..end].iter().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// True when both views hold the same records in the same order.
    pub fn same_contents(&self, other: &FilteredView) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a.id == b.id)
    }
}

/// Pure filter: every record whose title or category contains the query.
pub fn filter(store: &Arc<RecordStore>, query: &str) -> FilteredView {
    filter_normalized(store, &NormalizedQuery::new(query))
}

fn filter_normalized(store: &Arc<RecordStore>, query: &NormalizedQuery) -> FilteredView {
    if query.is_empty() {
        return FilteredView::identity(Arc::clone(store));
    }

    let positions: Vec<usize> = store
        .iter()
        .enumerate()
        .filter(|(_, record)| record_matches(query, record))
        .map(|(position, _)| position)
        .collect();

    FilteredView::with_positions(Arc::clone(store), positions)
}

/// Memoizing front for [`filter`]. Holds the last normalized query and its view.
#[derive(Debug)]
pub struct FilterEngine {
    store: Arc<RecordStore>,
    last: Option<(NormalizedQuery, FilteredView)>,
}

impl FilterEngine {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store, last: None }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn apply(&mut self, query: &str) -> FilteredView {
        let normalized = NormalizedQuery::new(query);
        if let Some((cached_query, cached_view)) = &self.last {
            if *cached_query == normalized {
                debug!(query = normalized.as_str(), "filter cache hit");
                return cached_view.clone();
            }
        }

        let view = filter_normalized(&self.store, &normalized);
        debug!(
            query = normalized.as_str(),
            matched = view.len(),
            total = self.store.len(),
            "filter recomputed"
        );
        self.last = Some((normalized, view.clone()));
        view
    }
}
