//! Scoreboard result types.
//!
//! A [`Scoreboard`] is the complete, read-only output of one scoring pass:
//! per-hole player and team results, cumulative totals and game metadata.
//! All maps are ordered so that identical inputs serialize identically.

use crate::ids::{HoleId, PlayerId, TeamId};
use crate::options::OptionScope;
use crate::points::PointValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A junk awarded to a player or team on a hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardedJunk {
    pub name: String,
    pub value: f64,
    /// Player who earned it, for player-scope junk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
}

impl AwardedJunk {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            player_id: None,
        }
    }

    pub fn for_player(name: impl Into<String>, value: f64, player_id: PlayerId) -> Self {
        Self {
            name: name.into(),
            value,
            player_id: Some(player_id),
        }
    }
}

impl PointValue for AwardedJunk {
    fn point_value(&self) -> f64 {
        self.value
    }
}

/// A multiplier applied to a player or team on a hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMultiplier {
    pub name: String,
    pub value: f64,
    pub scope: OptionScope,
    /// Hole on which a press was activated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_hole: Option<HoleId>,
    /// Earned automatically from a junk rather than pressed.
    #[serde(default)]
    pub earned: bool,
    #[serde(default)]
    pub overrides: bool,
}

impl PointValue for AppliedMultiplier {
    fn point_value(&self) -> f64 {
        self.value
    }
}

/// Course data for a hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleInfo {
    pub hole: HoleId,
    pub par: i32,
    /// Handicap allocation, 1 = hardest.
    pub allocation: u32,
    pub yards: u32,
}

/// Per-hole result for a single player.
///
/// `gross`, `net` and the to-par values are only meaningful when
/// `has_score` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHoleResult {
    pub player_id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    pub has_score: bool,
    pub gross: i32,
    pub pops: i32,
    pub net: i32,
    pub score_to_par: i32,
    pub net_to_par: i32,
    pub rank: u32,
    pub tie_count: u32,
    pub junk: Vec<AwardedJunk>,
    pub multipliers: Vec<AppliedMultiplier>,
    pub points: f64,
}

impl PlayerHoleResult {
    /// An unscored player.
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            team_id: None,
            has_score: false,
            gross: 0,
            pops: 0,
            net: 0,
            score_to_par: 0,
            net_to_par: 0,
            rank: 0,
            tie_count: 0,
            junk: Vec::new(),
            multipliers: Vec::new(),
            points: 0.0,
        }
    }

    pub fn has_junk(&self, name: &str) -> bool {
        self.junk.iter().any(|j| j.name == name)
    }
}

/// Match play status of a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchDiff {
    /// Holes up (positive) or down (negative) while the match is live.
    Holes(f64),
    /// Final result such as `"3 & 2"`.
    Decided(String),
}

/// Per-hole result for a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamHoleResult {
    pub team_id: TeamId,
    pub score: f64,
    pub low_ball: f64,
    pub total: f64,
    pub average: f64,
    pub player_ids: Vec<PlayerId>,
    pub rank: u32,
    pub tie_count: u32,
    pub junk: Vec<AwardedJunk>,
    pub multipliers: Vec<AppliedMultiplier>,
    /// Placement plus junk, before multipliers.
    pub points: f64,
    /// `points` times the hole multiplier.
    pub hole_total: f64,
    /// Hole total minus the opponent's, in two-team games.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_net_total: Option<f64>,
    pub running_total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_diff: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_diff: Option<MatchDiff>,
    #[serde(default)]
    pub match_over: bool,
}

impl TeamHoleResult {
    pub fn new(team_id: TeamId, player_ids: Vec<PlayerId>) -> Self {
        Self {
            team_id,
            score: 0.0,
            low_ball: 0.0,
            total: 0.0,
            average: 0.0,
            player_ids,
            rank: 0,
            tie_count: 0,
            junk: Vec::new(),
            multipliers: Vec::new(),
            points: 0.0,
            hole_total: 0.0,
            hole_net_total: None,
            running_total: 0.0,
            running_diff: None,
            match_diff: None,
            match_over: false,
        }
    }

    pub fn has_multiplier(&self, name: &str) -> bool {
        self.multipliers.iter().any(|m| m.name == name)
    }
}

/// Results for a single hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleResult {
    pub hole: HoleId,
    pub hole_info: HoleInfo,
    pub players: BTreeMap<PlayerId, PlayerHoleResult>,
    pub teams: BTreeMap<TeamId, TeamHoleResult>,
    /// Points that could have been won on the hole.
    pub possible_points: f64,
    /// Product of every multiplier in play on the hole.
    pub hole_multiplier: f64,
    pub scores_entered: usize,
    /// Every player on the hole has a score.
    pub complete: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl HoleResult {
    pub fn new(hole_info: HoleInfo) -> Self {
        Self {
            hole: hole_info.hole.clone(),
            hole_info,
            players: BTreeMap::new(),
            teams: BTreeMap::new(),
            possible_points: 0.0,
            hole_multiplier: 1.0,
            scores_entered: 0,
            complete: false,
            warnings: Vec::new(),
        }
    }

    /// Teams other than `team_id`.
    pub fn other_teams<'a>(&'a self, team_id: &'a TeamId) -> impl Iterator<Item = &'a TeamHoleResult> {
        self.teams.values().filter(move |t| &t.team_id != team_id)
    }

    /// Whether the team or any of its players holds the named junk.
    pub fn team_has_junk(&self, team_id: &TeamId, junk_name: &str) -> bool {
        let Some(team) = self.teams.get(team_id) else {
            return false;
        };
        team.junk.iter().any(|j| j.name == junk_name)
            || team
                .player_ids
                .iter()
                .filter_map(|p| self.players.get(p))
                .any(|p| p.has_junk(junk_name))
    }
}

/// Cumulative totals for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCumulative {
    pub player_id: PlayerId,
    pub gross_total: i32,
    pub pops_total: i32,
    pub net_total: i32,
    pub points_total: f64,
    pub junk_total: f64,
    pub holes_played: u32,
    pub rank: u32,
    pub tie_count: u32,
}

impl PlayerCumulative {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            gross_total: 0,
            pops_total: 0,
            net_total: 0,
            points_total: 0.0,
            junk_total: 0.0,
            holes_played: 0,
            rank: 0,
            tie_count: 0,
        }
    }
}

/// Cumulative totals for a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCumulative {
    pub team_id: TeamId,
    pub score_total: f64,
    pub points_total: f64,
    pub junk_total: f64,
    pub rank: u32,
    pub tie_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_diff: Option<MatchDiff>,
    #[serde(default)]
    pub match_over: bool,
}

impl TeamCumulative {
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            score_total: 0.0,
            points_total: 0.0,
            junk_total: 0.0,
            rank: 0,
            tie_count: 0,
            match_diff: None,
            match_over: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cumulative {
    pub players: BTreeMap<PlayerId, PlayerCumulative>,
    pub teams: BTreeMap<TeamId, TeamCumulative>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardMeta {
    pub game_id: String,
    /// Holes in game order.
    pub holes_played: Vec<HoleId>,
    pub has_teams: bool,
    pub points_per_hole: f64,
}

/// Complete scoreboard for a game.
///
/// # Examples
///
/// ```rust
/// use golfjunk::{HoleId, Scoreboard};
///
/// let scoreboard = Scoreboard::new("game-1");
/// assert!(scoreboard.hole(&HoleId::from_str("1")).is_none());
/// assert_eq!(scoreboard.meta.game_id, "game-1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub holes: BTreeMap<HoleId, HoleResult>,
    pub cumulative: Cumulative,
    pub meta: ScoreboardMeta,
}

impl Scoreboard {
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            meta: ScoreboardMeta {
                game_id: game_id.into(),
                ..ScoreboardMeta::default()
            },
            ..Scoreboard::default()
        }
    }

    pub fn hole(&self, hole: &HoleId) -> Option<&HoleResult> {
        self.holes.get(hole)
    }

    /// The hole played immediately before `hole`, in game order.
    pub fn previous_hole(&self, hole: &HoleId) -> Option<&HoleResult> {
        let index = self.meta.holes_played.iter().position(|h| h == hole)?;
        let previous = self.meta.holes_played.get(index.checked_sub(1)?)?;
        self.holes.get(previous)
    }

    /// Holes in game order.
    pub fn holes_in_order(&self) -> impl Iterator<Item = &HoleResult> {
        self.meta
            .holes_played
            .iter()
            .filter_map(move |h| self.holes.get(h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hole(n: &str) -> HoleResult {
        HoleResult::new(HoleInfo {
            hole: HoleId::from_str(n),
            par: 4,
            allocation: 1,
            yards: 0,
        })
    }

    #[test]
    fn test_previous_hole_follows_game_order() {
        let mut scoreboard = Scoreboard::new("g");
        for n in ["10", "11", "1"] {
            scoreboard.holes.insert(HoleId::from_str(n), hole(n));
            scoreboard.meta.holes_played.push(HoleId::from_str(n));
        }
        assert!(scoreboard.previous_hole(&HoleId::from_str("10")).is_none());
        assert_eq!(
            scoreboard.previous_hole(&HoleId::from_str("1")).map(|h| h.hole.as_str()),
            Some("11")
        );
        let order: Vec<_> = scoreboard.holes_in_order().map(|h| h.hole.as_str()).collect();
        assert_eq!(order, vec!["10", "11", "1"]);
    }

    #[test]
    fn test_team_has_junk_through_players() {
        let mut result = hole("1");
        let p1 = PlayerId::from_str("p1");
        let t1 = TeamId::from_str("1");
        let mut player = PlayerHoleResult::new(p1.clone());
        player.junk.push(AwardedJunk::for_player("birdie", 1.0, p1.clone()));
        result.players.insert(p1.clone(), player);
        result.teams.insert(t1.clone(), TeamHoleResult::new(t1.clone(), vec![p1]));

        assert!(result.team_has_junk(&t1, "birdie"));
        assert!(!result.team_has_junk(&t1, "eagle"));
        assert!(!result.team_has_junk(&TeamId::from_str("2"), "birdie"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let team = TeamHoleResult::new(TeamId::from_str("1"), Vec::new());
        let json = serde_json::to_value(&team).unwrap();
        assert!(json.get("lowBall").is_some());
        assert!(json.get("runningTotal").is_some());
        assert!(json.get("holeNetTotal").is_none());
    }
}
