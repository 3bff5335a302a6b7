//! Scoring context.
//!
//! The `ScoringContext` is everything one scoring pass reads: the options
//! snapshot, the ordered game holes with their team assignments and press
//! activations, and every player's recorded round. It is assembled by the
//! caller (usually deserialized from the persistence layer) and never
//! mutated by the engine.

use crate::error::ScoringError;
use crate::ids::{HoleId, PlayerId, TeamId};
use crate::options::{OptionValue, Options};
use crate::points::PointsTable;
use crate::ranking::RankDirection;
use crate::scoreboard::HoleInfo;
use crate::team::TeamMethod;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Recorded values for one player on one hole, keyed by name.
///
/// Holds `"gross"`, optionally `"pops"`, and any hand-marked junk such as
/// `"prox"`. Values are kept as raw JSON since the persistence layer stores
/// most of them as strings.
///
/// # Examples
///
/// ```rust
/// use golfjunk::HoleScores;
///
/// let mut scores = HoleScores::new();
/// scores.set("gross", "5");
/// scores.set("prox", true);
///
/// assert_eq!(scores.number("gross"), Some(5));
/// assert!(scores.is_marked("prox"));
/// assert!(!scores.is_marked("sandie"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoleScores {
    data: BTreeMap<String, serde_json::Value>,
}

impl HoleScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a recorded value.
    ///
    /// The value must be serializable. If serialization fails, the value
    /// is silently not added.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.data.insert(key.into(), json_value);
        }
    }

    /// Builder form of [`HoleScores::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.set(key, value);
        self
    }

    /// Get a recorded value.
    ///
    /// Returns `None` if the key doesn't exist or if the value
    /// cannot be deserialized to the requested type.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Read an integer that may be stored as a number or a numeric string.
    pub fn number(&self, key: &str) -> Option<i32> {
        match self.data.get(key)? {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .map(|v| v as i32),
            serde_json::Value::String(s) => {
                let s = s.trim();
                s.parse::<i32>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i32))
            }
            _ => None,
        }
    }

    /// Whether a hand-marked value is set: `"1"`, `"true"`, `1` or `true`.
    pub fn is_marked(&self, key: &str) -> bool {
        match self.data.get(key) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s == "1" || s == "true",
            Some(serde_json::Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }
}

/// A team option recorded on a hole, such as a press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOptionActivation {
    pub option_name: String,
    #[serde(default)]
    pub value: serde_json::Value,
    /// Hole on which the option was first activated.
    #[serde(default)]
    pub first_hole: Option<HoleId>,
    /// Set for per-player options; presses are team-wide.
    #[serde(default)]
    pub player_id: Option<PlayerId>,
}

impl TeamOptionActivation {
    /// A team-wide activation of `option_name` first made on `first_hole`.
    pub fn new(option_name: impl Into<String>, first_hole: HoleId) -> Self {
        Self {
            option_name: option_name.into(),
            value: serde_json::Value::String("true".to_string()),
            first_hole: Some(first_hole),
            player_id: None,
        }
    }

    /// Whether the recorded value switches the option on.
    pub fn is_on(&self) -> bool {
        match &self.value {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => s == "true",
            _ => false,
        }
    }
}

/// A team and its players on one hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub team: TeamId,
    #[serde(default)]
    pub players: Vec<PlayerId>,
    #[serde(default)]
    pub options: Vec<TeamOptionActivation>,
}

impl TeamAssignment {
    pub fn new(team: impl Into<TeamId>, players: Vec<PlayerId>) -> Self {
        Self {
            team: team.into(),
            players,
            options: Vec::new(),
        }
    }

    pub fn with_activation(mut self, activation: TeamOptionActivation) -> Self {
        self.options.push(activation);
        self
    }
}

/// One hole of the game, with course data and team state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameHole {
    pub hole: HoleId,
    #[serde(default)]
    pub seq: Option<u32>,
    #[serde(default)]
    pub par: Option<i32>,
    #[serde(default)]
    pub allocation: Option<u32>,
    #[serde(default)]
    pub yards: Option<u32>,
    #[serde(default)]
    pub teams: Vec<TeamAssignment>,
    /// Per-hole overrides of game options.
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl GameHole {
    pub fn new(hole: impl Into<HoleId>) -> Self {
        Self {
            hole: hole.into(),
            seq: None,
            par: None,
            allocation: None,
            yards: None,
            teams: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_par(mut self, par: i32) -> Self {
        self.par = Some(par);
        self
    }

    pub fn with_allocation(mut self, allocation: u32) -> Self {
        self.allocation = Some(allocation);
        self
    }

    pub fn with_team(mut self, team: TeamAssignment) -> Self {
        self.teams.push(team);
        self
    }

    /// Course data with defaults: par 4, allocation equal to the hole number.
    pub fn hole_info(&self) -> HoleInfo {
        HoleInfo {
            hole: self.hole.clone(),
            par: self.par.unwrap_or(4),
            allocation: self
                .allocation
                .or_else(|| self.hole.number())
                .unwrap_or(18),
            yards: self.yards.unwrap_or(0),
        }
    }

    pub fn team(&self, team_id: &TeamId) -> Option<&TeamAssignment> {
        self.teams.iter().find(|t| &t.team == team_id)
    }
}

/// A player's round: handicaps and per-hole recorded scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub player_id: PlayerId,
    #[serde(default)]
    pub course_handicap: Option<f64>,
    /// Handicap override for this game.
    #[serde(default)]
    pub game_handicap: Option<f64>,
    #[serde(default)]
    pub scores: BTreeMap<HoleId, HoleScores>,
}

impl Round {
    pub fn new(player_id: impl Into<PlayerId>) -> Self {
        Self {
            player_id: player_id.into(),
            course_handicap: None,
            game_handicap: None,
            scores: BTreeMap::new(),
        }
    }

    pub fn with_course_handicap(mut self, handicap: f64) -> Self {
        self.course_handicap = Some(handicap);
        self
    }

    pub fn with_score(mut self, hole: impl Into<HoleId>, scores: HoleScores) -> Self {
        self.scores.insert(hole.into(), scores);
        self
    }

    /// Game handicap if set, otherwise course handicap, otherwise scratch.
    pub fn effective_handicap(&self) -> i32 {
        self.game_handicap
            .or(self.course_handicap)
            .map(|h| h.round() as i32)
            .unwrap_or(0)
    }

    pub fn hole_scores(&self, hole: &HoleId) -> Option<&HoleScores> {
        self.scores.get(hole)
    }
}

/// Everything one scoring pass reads.
///
/// # Examples
///
/// ```rust
/// use golfjunk::{GameHole, HoleScores, Round, ScoringContext, TeamAssignment};
/// use golfjunk::options::Options;
///
/// let context = ScoringContext::new("game-1", Options::new())
///     .with_hole(GameHole::new("1").with_team(TeamAssignment::new("1", vec!["p1".into()])))
///     .with_round(Round::new("p1").with_score("1", HoleScores::new().with("gross", 4)));
///
/// assert_eq!(context.hole_order().len(), 1);
/// assert_eq!(context.team_of(&"p1".into(), &"1".into()).map(|t| t.as_str()), Some("1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringContext {
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub holes: Vec<GameHole>,
    #[serde(default)]
    pub rounds: Vec<Round>,
}

impl ScoringContext {
    pub fn new(game_id: impl Into<String>, options: Options) -> Self {
        Self {
            game_id: game_id.into(),
            options,
            holes: Vec::new(),
            rounds: Vec::new(),
        }
    }

    /// Deserialize a context from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_hole(mut self, hole: GameHole) -> Self {
        self.holes.push(hole);
        self
    }

    pub fn with_round(mut self, round: Round) -> Self {
        self.rounds.push(round);
        self
    }

    /// Holes in play order: by `seq` when present, otherwise as given.
    pub fn hole_order(&self) -> Vec<HoleId> {
        let mut holes: Vec<(usize, &GameHole)> = self.holes.iter().enumerate().collect();
        holes.sort_by_key(|(i, h)| (h.seq.unwrap_or(*i as u32), *i));
        holes.into_iter().map(|(_, h)| h.hole.clone()).collect()
    }

    pub fn game_hole(&self, hole: &HoleId) -> Option<&GameHole> {
        self.holes.iter().find(|h| &h.hole == hole)
    }

    pub fn round(&self, player_id: &PlayerId) -> Option<&Round> {
        self.rounds.iter().find(|r| &r.player_id == player_id)
    }

    /// Every player with a round or a team seat, in id order.
    pub fn players(&self) -> BTreeSet<PlayerId> {
        let mut players: BTreeSet<PlayerId> =
            self.rounds.iter().map(|r| r.player_id.clone()).collect();
        for hole in &self.holes {
            for team in &hole.teams {
                players.extend(team.players.iter().cloned());
            }
        }
        players
    }

    /// Every team that appears on any hole.
    pub fn teams(&self) -> BTreeSet<TeamId> {
        self.holes
            .iter()
            .flat_map(|h| h.teams.iter().map(|t| t.team.clone()))
            .collect()
    }

    /// The team a player belongs to on a hole.
    pub fn team_of(&self, player_id: &PlayerId, hole: &HoleId) -> Option<&TeamId> {
        self.game_hole(hole)?
            .teams
            .iter()
            .find(|t| t.players.contains(player_id))
            .map(|t| &t.team)
    }

    /// Zero-based nine of a hole: from its number, or from its position in
    /// play order for non-numeric holes.
    pub fn nine_of(&self, hole: &HoleId) -> u32 {
        if let Some(nine) = hole.nine() {
            return nine;
        }
        self.hole_order()
            .iter()
            .position(|h| h == hole)
            .map(|i| i as u32 / 9)
            .unwrap_or(0)
    }

    /// A game option's value on a hole, honouring per-hole overrides.
    pub fn game_value(&self, name: &str, hole: Option<&HoleId>) -> Option<OptionValue> {
        let option = self.options.game_option(name)?;
        let overridden = hole
            .and_then(|h| self.game_hole(h))
            .and_then(|h| h.options.get(name))
            .and_then(|raw| OptionValue::from_raw(raw, option.value_type));
        overridden.or_else(|| option.effective_value())
    }

    /// Team scoring method (`team_scoring`), best ball by default.
    pub fn team_method(&self, hole: &HoleId) -> TeamMethod {
        self.game_value("team_scoring", Some(hole))
            .and_then(|v| v.as_str().map(TeamMethod::parse))
            .unwrap_or(TeamMethod::BestBall)
    }

    /// Whether lower or higher points win (`better_points`), higher by default.
    pub fn better_points(&self) -> RankDirection {
        self.game_value("better_points", None)
            .and_then(|v| v.as_str().and_then(RankDirection::parse))
            .unwrap_or(RankDirection::Higher)
    }

    /// Placement points (`points_table`); empty when not configured.
    pub fn points_table(&self) -> Result<PointsTable, ScoringError> {
        match self.game_value("points_table", None) {
            None => Ok(PointsTable::new()),
            Some(OptionValue::Text(json)) => PointsTable::from_json(&json),
            Some(other) => Err(ScoringError::InvalidPointsTable(format!(
                "expected JSON text, got {:?}",
                other
            ))),
        }
    }

    /// Whether the game is scored as match play (`match_play`).
    pub fn match_play(&self) -> bool {
        self.game_value("match_play", None)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Combined factor of every `pre_double` pressed on the front nine, by
    /// any team. Only records on their own activation hole count, so a
    /// press carried onto later holes is counted once.
    pub fn front_nine_pre_double_total(&self) -> f64 {
        let value = self
            .options
            .multiplier_option("pre_double")
            .map(|m| m.value)
            .unwrap_or(2.0);
        self.holes
            .iter()
            .filter(|h| self.nine_of(&h.hole) == 0)
            .flat_map(|h| {
                h.teams
                    .iter()
                    .flat_map(|t| t.options.iter())
                    .filter(move |a| {
                        a.option_name == "pre_double" && a.is_on() && a.first_hole.as_ref() == Some(&h.hole)
                    })
            })
            .fold(1.0, |total, _| total * value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{GameOption, MultiplierOption, OptionScope, ValueType};

    fn game_option(name: &str, value_type: ValueType, value: serde_json::Value) -> GameOption {
        GameOption {
            name: name.to_string(),
            disp: String::new(),
            value_type,
            value: Some(value),
            default_value: None,
        }
    }

    #[test]
    fn test_hole_scores_set_get() {
        let mut scores = HoleScores::new();
        scores.set("gross", 5);
        let gross: Option<i32> = scores.get("gross");
        assert_eq!(gross, Some(5));
        assert_eq!(scores.number("missing"), None);
    }

    #[test]
    fn test_hole_scores_number_forms() {
        let scores = HoleScores::new().with("a", "4").with("b", 3.0).with("c", "x");
        assert_eq!(scores.number("a"), Some(4));
        assert_eq!(scores.number("b"), Some(3));
        assert_eq!(scores.number("c"), None);
    }

    #[test]
    fn test_marked_values() {
        let scores = HoleScores::new()
            .with("a", "1")
            .with("b", "true")
            .with("c", "false")
            .with("d", 1);
        assert!(scores.is_marked("a"));
        assert!(scores.is_marked("b"));
        assert!(!scores.is_marked("c"));
        assert!(scores.is_marked("d"));
    }

    #[test]
    fn test_effective_handicap() {
        let mut round = Round::new("p1").with_course_handicap(12.4);
        assert_eq!(round.effective_handicap(), 12);
        round.game_handicap = Some(8.0);
        assert_eq!(round.effective_handicap(), 8);
        assert_eq!(Round::new("p2").effective_handicap(), 0);
    }

    #[test]
    fn test_hole_order_by_seq() {
        let mut a = GameHole::new("10");
        a.seq = Some(1);
        let mut b = GameHole::new("1");
        b.seq = Some(0);
        let context = ScoringContext::new("g", Options::new()).with_hole(a).with_hole(b);
        let order: Vec<_> = context.hole_order().iter().map(|h| h.to_string()).collect();
        assert_eq!(order, vec!["1", "10"]);
    }

    #[test]
    fn test_hole_info_defaults() {
        let info = GameHole::new("7").hole_info();
        assert_eq!(info.par, 4);
        assert_eq!(info.allocation, 7);
    }

    #[test]
    fn test_game_value_override() {
        let mut options = Options::new();
        options.insert(game_option("team_scoring", ValueType::Text, serde_json::json!("sum")));
        let mut hole2 = GameHole::new("2");
        hole2
            .options
            .insert("team_scoring".to_string(), serde_json::json!("worst_ball"));
        let context = ScoringContext::new("g", options)
            .with_hole(GameHole::new("1"))
            .with_hole(hole2);

        assert_eq!(context.team_method(&HoleId::from_str("1")), TeamMethod::Sum);
        assert_eq!(context.team_method(&HoleId::from_str("2")), TeamMethod::WorstBall);
    }

    #[test]
    fn test_defaults_without_options() {
        let context = ScoringContext::default();
        assert_eq!(context.better_points(), RankDirection::Higher);
        assert_eq!(context.team_method(&HoleId::from_str("1")), TeamMethod::BestBall);
        assert!(context.points_table().unwrap().is_empty());
        assert!(!context.match_play());
    }

    #[test]
    fn test_invalid_points_table() {
        let mut options = Options::new();
        options.insert(game_option("points_table", ValueType::Text, serde_json::json!("nope")));
        let context = ScoringContext::new("g", options);
        assert!(matches!(
            context.points_table(),
            Err(ScoringError::InvalidPointsTable(_))
        ));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "gameId": "g1",
            "options": {},
            "holes": [{"hole": 1, "par": 3, "teams": [{"team": 1, "players": ["p1"],
                "options": [{"optionName": "double", "value": "true", "firstHole": "1"}]}]}],
            "rounds": [{"playerId": "p1", "courseHandicap": 5, "scores": {"1": {"gross": "3"}}}]
        }"#;
        let context = ScoringContext::from_json(json).unwrap();
        let hole = context.game_hole(&HoleId::from_str("1")).unwrap();
        assert_eq!(hole.par, Some(3));
        assert!(hole.teams[0].options[0].is_on());
        assert_eq!(context.rounds[0].effective_handicap(), 5);

        assert!(matches!(
            ScoringContext::from_json("{\"holes\": 3}"),
            Err(ScoringError::Config(_))
        ));
    }

    #[test]
    fn test_front_nine_pre_double_total() {
        let mut options = Options::new();
        options.insert(MultiplierOption::press("pre_double", 2.0, OptionScope::RestOfNine));
        let press = |hole: &str, first: &str| {
            GameHole::new(hole).with_team(
                TeamAssignment::new("1", vec!["p1".into()])
                    .with_activation(TeamOptionActivation::new("pre_double", HoleId::from_str(first))),
            )
        };
        let context = ScoringContext::new("g", options.clone())
            .with_hole(press("1", "1"))
            .with_hole(press("2", "1"))
            .with_hole(press("5", "5"))
            .with_hole(press("10", "10"));
        assert_eq!(context.front_nine_pre_double_total(), 4.0);

        let empty = ScoringContext::new("g", options).with_hole(GameHole::new("10"));
        assert_eq!(empty.front_nine_pre_double_total(), 1.0);
    }
}
