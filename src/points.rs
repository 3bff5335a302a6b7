//! Points engine.
//!
//! Turns placements, junk and multipliers into points:
//!
//! ```text
//! (base + Σ junk) × Π multipliers
//! ```
//!
//! Placement points come from a [`PointsTable`] keyed by `(rank, tie_count)`.

use crate::error::ScoringError;
use serde::{Deserialize, Serialize};

/// Anything that contributes a numeric value to a points calculation.
///
/// Implemented by awarded junk, applied multipliers and plain `f64`s.
pub trait PointValue {
    fn point_value(&self) -> f64;
}

impl PointValue for f64 {
    fn point_value(&self) -> f64 {
        *self
    }
}

/// One `(rank, tie_count) → points` entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsTableEntry {
    pub rank: u32,
    pub tie_count: u32,
    pub points: f64,
}

/// Placement points lookup. Absent pairs are worth 0.
///
/// # Examples
///
/// ```rust
/// use golfjunk::points::{points_from_table, PointsTable};
///
/// let table = PointsTable::new()
///     .with_entry(1, 1, 5.0)
///     .with_entry(1, 2, 4.0);
///
/// assert_eq!(points_from_table(1, 2, &table), 4.0);
/// assert_eq!(points_from_table(3, 1, &table), 0.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointsTable {
    entries: Vec<PointsTableEntry>,
}

impl PointsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, rank: u32, tie_count: u32, points: f64) -> Self {
        self.entries.push(PointsTableEntry {
            rank,
            tie_count,
            points,
        });
        self
    }

    /// Parse a table from its persisted JSON form, a list of
    /// `{"rank", "tieCount", "points"}` objects.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        serde_json::from_str(json).map_err(|e| ScoringError::InvalidPointsTable(e.to_string()))
    }

    pub fn entries(&self) -> &[PointsTableEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exact-match table lookup; 0 when the pair is absent.
pub fn points_from_table(rank: u32, tie_count: u32, table: &PointsTable) -> f64 {
    table
        .entries
        .iter()
        .find(|e| e.rank == rank && e.tie_count == tie_count)
        .map(|e| e.points)
        .unwrap_or(0.0)
}

/// Combine base points, additive junk and multiplicative multipliers.
///
/// Junk is added before any multiplier is applied; multipliers stack
/// multiplicatively.
///
/// # Examples
///
/// ```rust
/// use golfjunk::points::calculate_points;
///
/// assert_eq!(calculate_points(3.0, &[1.0], &[2.0]), 8.0);
/// assert_eq!(calculate_points(3.0, &[] as &[f64], &[2.0, 2.0]), 12.0);
/// ```
pub fn calculate_points<J, M>(base_points: f64, junk: &[J], multipliers: &[M]) -> f64
where
    J: PointValue,
    M: PointValue,
{
    let junk_total: f64 = junk.iter().map(PointValue::point_value).sum();
    let multiplier: f64 = multipliers.iter().map(PointValue::point_value).product();
    (base_points + junk_total) * multiplier
}

/// Arithmetic mean of the points for a set of tied positions; 0 when empty.
pub fn split_points(points_to_split: &[f64]) -> f64 {
    if points_to_split.is_empty() {
        return 0.0;
    }
    points_to_split.iter().sum::<f64>() / points_to_split.len() as f64
}

/// Points for a finishing position, averaging every position a tie occupies.
///
/// A two-way tie for first receives the mean of first and second place.
///
/// # Examples
///
/// ```rust
/// use golfjunk::points::calculate_position_points;
///
/// let points = |rank: u32| match rank { 1 => 3.0, 2 => 2.0, _ => 1.0 };
/// assert_eq!(calculate_position_points(1, 1, points), 3.0);
/// assert_eq!(calculate_position_points(1, 2, points), 2.5);
/// ```
pub fn calculate_position_points<F>(rank: u32, tie_count: u32, points_per_rank: F) -> f64
where
    F: Fn(u32) -> f64,
{
    if tie_count <= 1 {
        return points_per_rank(rank);
    }
    let positions: Vec<f64> = (rank..rank + tie_count).map(&points_per_rank).collect();
    split_points(&positions)
}
