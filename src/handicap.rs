//! Handicap strokes and score-to-par helpers.

/// Strokes ("pops") a player receives on a hole.
///
/// A positive handicap receives one stroke on every hole whose allocation
/// is at most the handicap. A plus handicap (negative value) gives a stroke
/// back on the easiest holes: allocation greater than `18 - |handicap|`.
///
/// # Examples
///
/// ```rust
/// use golfjunk::handicap::calculate_pops;
///
/// assert_eq!(calculate_pops(10, 3), 1);
/// assert_eq!(calculate_pops(10, 11), 0);
/// assert_eq!(calculate_pops(-2, 17), -1);
/// assert_eq!(calculate_pops(0, 1), 0);
/// ```
pub fn calculate_pops(handicap: i32, allocation: u32) -> i32 {
    let allocation = allocation as i32;
    if handicap > 0 {
        if handicap >= allocation {
            1
        } else {
            0
        }
    } else if handicap < 0 {
        if allocation > 18 - handicap.abs() {
            -1
        } else {
            0
        }
    } else {
        0
    }
}

/// Net score for a gross score and pops.
pub fn net_score(gross: i32, pops: i32) -> i32 {
    gross - pops
}

/// Score relative to par.
pub fn score_to_par(score: i32, par: i32) -> i32 {
    score - par
}
