use std::collections::HashSet;
use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

pub type RecordId = u32;

pub const MAX_RATING: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Action,
    Drama,
    Comedy,
    #[serde(rename = "Sci-Fi")]
    SciFi,
    Horror,
    Romance,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Action,
        Category::Drama,
        Category::Comedy,
        Category::SciFi,
        Category::Horror,
        Category::Romance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Action => "Action",
            Category::Drama => "Drama",
            Category::Comedy => "Comedy",
            Category::SciFi => "Sci-Fi",
            Category::Horror => "Horror",
            Category::Romance => "Romance",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Rating on a closed `[0, 5]` scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Rating(f32);

impl Rating {
    pub fn new(value: f32) -> Result<Self, StoreError> {
        if value.is_finite() && (0.0..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(StoreError::RatingOutOfRange(value))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Rating {
    type Error = StoreError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for f32 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub rating: Rating,
    pub category: Category,
}

impl Record {
    pub fn new(id: RecordId, title: impl Into<String>, rating: Rating, category: Category) -> Self {
        Self {
            id,
            title: title.into(),
            rating,
            category,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate record id {0}")]
    DuplicateId(RecordId),
    #[error("rating {0} is outside [0, 5]")]
    RatingOutOfRange(f32),
}

/// Immutable ordered record set. Positions are stable for the life of the store.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new(records: Vec<Record>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id) {
                return Err(StoreError::DuplicateId(record.id));
            }
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl Index<usize> for RecordStore {
    type Output = Record;

    fn index(&self, position: usize) -> &Record {
        &self.records[position]
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
