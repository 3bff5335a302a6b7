//! Error types for the scoring engine.
//!
//! Scoring itself is fail-closed: malformed junk conditions, unknown team
//! methods and unsupported logic operators never abort a hole. The
//! `ScoringError` enum covers the few boundaries where a caller hands the
//! engine something it cannot work with at all.

use crate::ids::HoleId;
use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[HoleId]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors raised at the engine's fallible boundaries.
///
/// # Examples
///
/// ```rust
/// use golfjunk::{HoleId, ScoringError};
///
/// let err = ScoringError::UnknownHole(HoleId::from_str("19"));
/// assert_eq!(err.to_string(), "Unknown hole: 19");
/// ```
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The game configuration document could not be deserialized.
    #[error("Invalid game configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The `points_table` game option is not a list of
    /// `{rank, tieCount, points}` entries.
    #[error("Invalid points table: {0}")]
    InvalidPointsTable(String),

    /// A change referenced a hole that is not part of the game.
    #[error("Unknown hole: {0}")]
    UnknownHole(HoleId),

    /// The hole dependency graph contains a cycle.
    ///
    /// Holes are recomputed in dependency order, so a cycle means the
    /// hole list itself is inconsistent (duplicated or out of order).
    #[error("Cycle detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<HoleId> },
}
