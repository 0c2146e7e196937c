//! Severity interval tables.
//!
//! Each monitored parameter owns an ordered table of half-open ranges
//! `[min, max)`. Tables are validated on construction: sorted by `min`,
//! contiguous, with no empty ranges and unique names, so any value inside
//! the table's span matches exactly one interval.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
    pub name: String,
    pub description: String,
}

impl Interval {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value < self.max
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("interval table is empty")]
    Empty,

    #[error("interval '{name}' has an empty range [{min}, {max})")]
    EmptyRange { name: String, min: f64, max: f64 },

    #[error("interval name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("gap between '{lower}' (max {max}) and '{upper}' (min {min})")]
    Gap {
        lower: String,
        upper: String,
        max: f64,
        min: f64,
    },

    #[error("'{lower}' (max {max}) overlaps '{upper}' (min {min})")]
    Overlap {
        lower: String,
        upper: String,
        max: f64,
        min: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTable {
    intervals: Vec<Interval>,
}

impl IntervalTable {
    pub fn new(mut intervals: Vec<Interval>) -> Result<Self, TableError> {
        if intervals.is_empty() {
            return Err(TableError::Empty);
        }

        let mut names = HashSet::new();
        for i in &intervals {
            // also rejects NaN bounds
            if !(i.min < i.max) {
                return Err(TableError::EmptyRange {
                    name: i.name.clone(),
                    min: i.min,
                    max: i.max,
                });
            }
            if !names.insert(i.name.as_str()) {
                return Err(TableError::DuplicateName(i.name.clone()));
            }
        }

        intervals.sort_by(|a, b| a.min.total_cmp(&b.min));

        for pair in intervals.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if lower.max < upper.min {
                return Err(TableError::Gap {
                    lower: lower.name.clone(),
                    upper: upper.name.clone(),
                    max: lower.max,
                    min: upper.min,
                });
            }
            if lower.max > upper.min {
                return Err(TableError::Overlap {
                    lower: lower.name.clone(),
                    upper: upper.name.clone(),
                    max: lower.max,
                    min: upper.min,
                });
            }
        }

        Ok(Self { intervals })
    }

    /// Returns the interval containing `value`, or `None` when the value lies
    /// outside the table's span or is NaN.
    pub fn find(&self, value: f64) -> Option<&Interval> {
        let idx = self.intervals.partition_point(|i| i.max <= value);
        self.intervals.get(idx).filter(|i| i.contains(value))
    }

    /// Intervals in ascending order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Lowest `min` and highest `max` of the table.
    pub fn span(&self) -> (f64, f64) {
        // non-empty by construction
        let first = &self.intervals[0];
        let last = &self.intervals[self.intervals.len() - 1];
        (first.min, last.max)
    }
}

/// Interval tables keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thresholds {
    tables: IndexMap<String, IntervalTable>,
}

impl Thresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parameter: impl Into<String>, table: IntervalTable) {
        self.tables.insert(parameter.into(), table);
    }

    pub fn get(&self, parameter: &str) -> Option<&IntervalTable> {
        self.tables.get(parameter)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
