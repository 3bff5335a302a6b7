//! Team scoring.
//!
//! Aggregates the net scores of a team's players into a single team score.
//! Only players with `has_score` set take part; an empty or fully unscored
//! team scores 0 under every method.

use crate::ids::{PlayerId, TeamId};
use crate::scoreboard::{HoleResult, PlayerHoleResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a team score is derived from its players' nets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamMethod {
    /// Lowest qualifying net.
    BestBall,
    /// Highest qualifying net.
    WorstBall,
    /// Sum of qualifying nets.
    Sum,
    /// Same as `Sum`, under its other name.
    Aggregate,
    /// Mean of qualifying nets.
    Average,
    /// Anything else; scores all zeros.
    Unknown(String),
}

impl TeamMethod {
    /// Parse a method name. Unrecognised names are kept as `Unknown`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use golfjunk::team::TeamMethod;
    ///
    /// assert_eq!(TeamMethod::parse("best_ball"), TeamMethod::BestBall);
    /// assert_eq!(TeamMethod::parse("scramble"), TeamMethod::Unknown("scramble".into()));
    /// ```
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "best_ball" => TeamMethod::BestBall,
            "worst_ball" => TeamMethod::WorstBall,
            "sum" => TeamMethod::Sum,
            "aggregate" => TeamMethod::Aggregate,
            "average" => TeamMethod::Average,
            other => TeamMethod::Unknown(other.to_string()),
        }
    }
}

/// A team's aggregate score for one hole.
///
/// `low_ball` and `total` are always filled alongside `score`, since junk
/// such as low ball and low total is judged on them regardless of the
/// team scoring method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScore {
    pub score: f64,
    pub low_ball: f64,
    pub total: f64,
    pub average: f64,
}

fn qualifying_nets(player_ids: &[PlayerId], results: &BTreeMap<PlayerId, PlayerHoleResult>) -> Vec<f64> {
    player_ids
        .iter()
        .filter_map(|id| results.get(id))
        .filter(|p| p.has_score)
        .map(|p| p.net as f64)
        .collect()
}

/// Lowest net among scored players; 0 when none qualify.
///
/// # Examples
///
/// ```rust
/// use golfjunk::scoreboard::PlayerHoleResult;
/// use golfjunk::team::calculate_best_ball;
/// use golfjunk::PlayerId;
/// use std::collections::BTreeMap;
///
/// let mut results = BTreeMap::new();
/// for (id, net) in [("p1", 4), ("p2", 3), ("p3", 5)] {
///     let mut p = PlayerHoleResult::new(PlayerId::from_str(id));
///     p.has_score = true;
///     p.net = net;
///     results.insert(p.player_id.clone(), p);
/// }
///
/// let team = vec![PlayerId::from_str("p1"), PlayerId::from_str("p2")];
/// assert_eq!(calculate_best_ball(&team, &results), 3.0);
/// assert_eq!(calculate_best_ball(&[], &results), 0.0);
/// ```
pub fn calculate_best_ball(player_ids: &[PlayerId], results: &BTreeMap<PlayerId, PlayerHoleResult>) -> f64 {
    qualifying_nets(player_ids, results)
        .into_iter()
        .reduce(f64::min)
        .unwrap_or(0.0)
}

/// Highest net among scored players; 0 when none qualify.
pub fn calculate_worst_ball(player_ids: &[PlayerId], results: &BTreeMap<PlayerId, PlayerHoleResult>) -> f64 {
    qualifying_nets(player_ids, results)
        .into_iter()
        .reduce(f64::max)
        .unwrap_or(0.0)
}

/// Sum of scored players' nets.
pub fn calculate_aggregate(player_ids: &[PlayerId], results: &BTreeMap<PlayerId, PlayerHoleResult>) -> f64 {
    qualifying_nets(player_ids, results).into_iter().sum()
}

/// Mean of scored players' nets; 0 when none qualify.
pub fn calculate_average(player_ids: &[PlayerId], results: &BTreeMap<PlayerId, PlayerHoleResult>) -> f64 {
    let nets = qualifying_nets(player_ids, results);
    if nets.is_empty() {
        return 0.0;
    }
    nets.iter().sum::<f64>() / nets.len() as f64
}

/// Score a team under `method`.
///
/// An unknown method yields all zeros, including `low_ball` and `total`.
pub fn calculate_team_score(
    method: &TeamMethod,
    player_ids: &[PlayerId],
    results: &BTreeMap<PlayerId, PlayerHoleResult>,
) -> TeamScore {
    let low_ball = calculate_best_ball(player_ids, results);
    let total = calculate_aggregate(player_ids, results);
    let average = calculate_average(player_ids, results);

    let score = match method {
        TeamMethod::BestBall => low_ball,
        TeamMethod::WorstBall => calculate_worst_ball(player_ids, results),
        TeamMethod::Sum | TeamMethod::Aggregate => total,
        TeamMethod::Average => average,
        TeamMethod::Unknown(name) => {
            log::warn!("unknown team scoring method '{}'", name);
            return TeamScore::default();
        }
    };

    TeamScore {
        score,
        low_ball,
        total,
        average,
    }
}

/// Count awards of `junk_name` held by a team or any of its players.
pub fn count_team_junk(hole: &HoleResult, team_id: &TeamId, junk_name: &str) -> usize {
    let Some(team) = hole.teams.get(team_id) else {
        return 0;
    };
    let team_count = team.junk.iter().filter(|j| j.name == junk_name).count();
    let player_count: usize = team
        .player_ids
        .iter()
        .filter_map(|p| hole.players.get(p))
        .map(|p| p.junk.iter().filter(|j| j.name == junk_name).count())
        .sum();
    team_count + player_count
}
