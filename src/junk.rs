//! Junk conditions and awards.
//!
//! A junk option declares when it is won as data:
//!
//! - `score_to_par`: `"exactly -1"` (birdie), `"at_most -2"` (eagle or better)
//! - `logic`: `"{'rankWithTies': [1, 1]}"` (outright winner) or any logic expression
//! - `calculation`: `best_ball` / `sum` for low ball and low total team bets
//! - `based_on = user`: marked by hand on the player's round (prox, sandie)
//!
//! Malformed conditions never fail a hole; the junk is simply not awarded.

use crate::context::ScoringContext;
use crate::ids::{PlayerId, TeamId};
use crate::logic::{evaluate_logic, is_simple_rank_check, LogicContext, RankCondition};
use crate::options::{JunkBasis, JunkCalculation, JunkLimit, JunkOption, OptionScope};
use crate::ranking::RankDirection;
use crate::scoreboard::{AwardedJunk, HoleResult, PlayerHoleResult, Scoreboard, TeamHoleResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Comparison in a score-to-par condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOperator {
    Exactly,
    AtMost,
    AtLeast,
}

/// A parsed `<operator> <integer>` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreToParCondition {
    pub operator: ScoreOperator,
    pub value: i32,
}

impl ScoreToParCondition {
    pub fn matches(&self, to_par: i32) -> bool {
        match self.operator {
            ScoreOperator::Exactly => to_par == self.value,
            ScoreOperator::AtMost => to_par <= self.value,
            ScoreOperator::AtLeast => to_par >= self.value,
        }
    }
}

/// Parse a score-to-par condition.
///
/// The input must be exactly two whitespace-separated tokens: an operator
/// (`exactly`, `at_most`, `at_least`) and an integer.
///
/// # Examples
///
/// ```rust
/// use golfjunk::junk::{parse_score_to_par_condition, ScoreOperator};
///
/// let birdie = parse_score_to_par_condition("exactly -1").unwrap();
/// assert_eq!(birdie.operator, ScoreOperator::Exactly);
/// assert_eq!(birdie.value, -1);
///
/// assert!(parse_score_to_par_condition("equals -1").is_none());
/// assert!(parse_score_to_par_condition("-1").is_none());
/// ```
pub fn parse_score_to_par_condition(condition: &str) -> Option<ScoreToParCondition> {
    let mut tokens = condition.split_whitespace();
    let (operator, value) = (tokens.next()?, tokens.next()?);
    if tokens.next().is_some() {
        return None;
    }
    let operator = match operator {
        "exactly" => ScoreOperator::Exactly,
        "at_most" => ScoreOperator::AtMost,
        "at_least" => ScoreOperator::AtLeast,
        _ => return None,
    };
    let value = value.parse().ok()?;
    Some(ScoreToParCondition { operator, value })
}

/// Parse a `rankWithTies` logic condition, in either quote style.
///
/// Returns `None` for invalid JSON or any other shape.
pub fn parse_logic_condition(logic: &str) -> Option<RankCondition> {
    is_simple_rank_check(logic)
}

/// Award every configured junk on a hole.
///
/// Player junk is judged per player. Team junk is only judged once the
/// hole is complete, so a half-entered hole never hands out low ball.
/// Options are evaluated in `seq` order.
pub fn evaluate_junk_for_hole(hole: &mut HoleResult, context: &ScoringContext, scoreboard: &Scoreboard) {
    let better_points = context.better_points();
    let breaks_ties = context
        .game_value("next_ball_breaks_ties", Some(&hole.hole))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    for junk in context.options.junk() {
        match junk.scope {
            OptionScope::Player => {
                let view: &HoleResult = hole;
                let winners: Vec<PlayerId> = view
                    .players
                    .values()
                    .filter(|p| player_earns(junk, p, view, context, scoreboard, better_points))
                    .map(|p| p.player_id.clone())
                    .collect();
                for player_id in winners {
                    if let Some(player) = hole.players.get_mut(&player_id) {
                        log::debug!("hole {}: {} wins {}", hole.hole, player_id, junk.name);
                        player
                            .junk
                            .push(AwardedJunk::for_player(junk.name.clone(), junk.value, player_id.clone()));
                    }
                }
            }
            OptionScope::Team => {
                if !hole.complete || hole.teams.is_empty() {
                    continue;
                }
                let winners = team_winners(junk, &*hole, scoreboard, better_points, breaks_ties);
                for team_id in winners {
                    if let Some(team) = hole.teams.get_mut(&team_id) {
                        log::debug!("hole {}: team {} wins {}", hole.hole, team_id, junk.name);
                        team.junk.push(AwardedJunk::new(junk.name.clone(), junk.value));
                    }
                }
            }
            other => {
                log::debug!("junk '{}' has scope {:?}, not judged per hole", junk.name, other);
            }
        }
    }
}

fn player_earns(
    junk: &JunkOption,
    player: &PlayerHoleResult,
    hole: &HoleResult,
    context: &ScoringContext,
    scoreboard: &Scoreboard,
    better_points: RankDirection,
) -> bool {
    if junk.based_on == JunkBasis::User {
        return context
            .round(&player.player_id)
            .and_then(|r| r.hole_scores(&hole.hole))
            .map(|s| s.is_marked(&junk.name))
            .unwrap_or(false);
    }

    if let Some(condition) = junk.score_to_par.as_deref() {
        let Some(parsed) = parse_score_to_par_condition(condition) else {
            log::warn!("junk '{}' has malformed score_to_par '{}'", junk.name, condition);
            return false;
        };
        if !player.has_score {
            return false;
        }
        let to_par = match junk.based_on {
            JunkBasis::Net => player.net_to_par,
            _ => player.score_to_par,
        };
        return parsed.matches(to_par);
    }

    if let Some(logic) = junk.logic.as_deref() {
        if !player.has_score {
            return false;
        }
        if let Some(rank) = is_simple_rank_check(logic) {
            return rank.matches(player.rank, player.tie_count);
        }
        let mut ctx = LogicContext::new(scoreboard, hole)
            .for_player(&player.player_id)
            .with_better_points(better_points);
        if let Some(team_id) = player.team_id.as_ref() {
            ctx = ctx.for_team(team_id);
        }
        return evaluate_logic(logic, &ctx);
    }

    false
}

fn team_winners(
    junk: &JunkOption,
    hole: &HoleResult,
    scoreboard: &Scoreboard,
    better_points: RankDirection,
    breaks_ties: bool,
) -> Vec<TeamId> {
    let calculation = match (junk.calculation, junk.logic.as_deref()) {
        (Some(calculation), _) => calculation,
        (None, Some(_)) => JunkCalculation::Logic,
        (None, None) => return Vec::new(),
    };

    match calculation {
        JunkCalculation::Logic => {
            let Some(logic) = junk.logic.as_deref() else {
                return Vec::new();
            };
            let simple = is_simple_rank_check(logic);
            hole.teams
                .values()
                .filter(|team| match simple {
                    Some(rank) => rank.matches(team.rank, team.tie_count),
                    None => evaluate_logic(
                        logic,
                        &LogicContext::new(scoreboard, hole)
                            .for_team(&team.team_id)
                            .with_better_points(better_points),
                    ),
                })
                .map(|t| t.team_id.clone())
                .collect()
        }
        JunkCalculation::BestBall | JunkCalculation::Sum => {
            calculation_winners(junk, calculation, hole, breaks_ties)
        }
        JunkCalculation::Unsupported => {
            log::warn!("junk '{}' has an unsupported calculation", junk.name);
            Vec::new()
        }
    }
}

/// Teams holding the best low ball or total.
///
/// With `one_team_per_group` the bet needs an outright winner; a tie for
/// best awards nobody.
fn calculation_winners(
    junk: &JunkOption,
    calculation: JunkCalculation,
    hole: &HoleResult,
    breaks_ties: bool,
) -> Vec<TeamId> {
    let better = junk.better.unwrap_or(RankDirection::Lower);

    let keyed: Vec<(&TeamHoleResult, Vec<f64>)> = hole
        .teams
        .values()
        .filter_map(|team| {
            let mut nets: Vec<f64> = team
                .player_ids
                .iter()
                .filter_map(|p| hole.players.get(p))
                .filter(|p| p.has_score)
                .map(|p| p.net as f64)
                .collect();
            if nets.is_empty() {
                return None;
            }
            let key = match calculation {
                JunkCalculation::Sum => vec![team.total],
                _ if breaks_ties => {
                    nets.sort_by(|a, b| a.total_cmp(b));
                    nets
                }
                _ => vec![team.low_ball],
            };
            Some((team, key))
        })
        .collect();

    let depth = keyed.iter().map(|(_, k)| k.len()).min().unwrap_or(0);
    let compare = |a: &[f64], b: &[f64]| -> Ordering {
        let ordering = a[..depth]
            .iter()
            .zip(&b[..depth])
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal);
        match better {
            RankDirection::Lower => ordering,
            RankDirection::Higher => ordering.reverse(),
        }
    };

    let Some(best) = keyed.iter().map(|(_, k)| k).min_by(|a, b| compare(a.as_slice(), b.as_slice())) else {
        return Vec::new();
    };
    let winners: Vec<TeamId> = keyed
        .iter()
        .filter(|(_, k)| compare(k.as_slice(), best.as_slice()).is_eq())
        .map(|(t, _)| t.team_id.clone())
        .collect();

    if junk.limit == JunkLimit::OneTeamPerGroup && winners.len() > 1 {
        return Vec::new();
    }
    winners
}

/// Points that could be won on a hole.
///
/// Every limited junk is on offer whether or not anyone wins it; unlimited
/// player junk counts once per award; of the team logic junk only the
/// richest award counts, since placements are mutually exclusive.
pub fn possible_points(hole: &HoleResult, context: &ScoringContext) -> f64 {
    let options = &context.options;
    let is_team_logic = |j: &JunkOption| {
        j.scope == OptionScope::Team
            && (j.calculation == Some(JunkCalculation::Logic) || (j.calculation.is_none() && j.logic.is_some()))
    };

    let limited: f64 = options
        .junk()
        .filter(|j| j.limit.is_limited() && !is_team_logic(*j))
        .map(|j| j.value)
        .sum();

    let unlimited_player: f64 = hole
        .players
        .values()
        .flat_map(|p| p.junk.iter())
        .filter(|awarded| {
            options
                .junk_option(&awarded.name)
                .map(|j| !j.limit.is_limited())
                .unwrap_or(false)
        })
        .map(|awarded| awarded.value)
        .sum();

    let best_logic = hole
        .teams
        .values()
        .flat_map(|t| t.junk.iter())
        .filter(|awarded| options.junk_option(&awarded.name).map(is_team_logic).unwrap_or(false))
        .map(|awarded| awarded.value)
        .fold(0.0, f64::max);

    limited + unlimited_player + best_logic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{GameHole, HoleScores, Round, TeamAssignment};
    use crate::ids::HoleId;
    use crate::options::Options;
    use crate::scoreboard::HoleInfo;

    fn player(id: &str, team: &str, net: i32, to_par: i32) -> PlayerHoleResult {
        let mut p = PlayerHoleResult::new(PlayerId::from_str(id));
        p.team_id = Some(TeamId::from_str(team));
        p.has_score = true;
        p.gross = net;
        p.net = net;
        p.score_to_par = to_par;
        p.net_to_par = to_par;
        p
    }

    /// Two teams of two: team 1 nets (a, b), team 2 nets (c, d), par 4.
    fn two_team_hole(nets: [i32; 4]) -> HoleResult {
        let mut hole = HoleResult::new(HoleInfo {
            hole: HoleId::from_str("1"),
            par: 4,
            allocation: 1,
            yards: 0,
        });
        let ids = ["p1", "p2", "p3", "p4"];
        for (i, id) in ids.iter().enumerate() {
            let team = if i < 2 { "1" } else { "2" };
            hole.players.insert(PlayerId::from_str(id), player(id, team, nets[i], nets[i] - 4));
        }
        for (team, members) in [("1", &ids[..2]), ("2", &ids[2..])] {
            let members: Vec<PlayerId> = members.iter().map(|m| PlayerId::from_str(m)).collect();
            let mut t = TeamHoleResult::new(TeamId::from_str(team), members.clone());
            let nets: Vec<f64> = members.iter().map(|m| hole.players[m].net as f64).collect();
            t.low_ball = nets.iter().cloned().fold(f64::INFINITY, f64::min);
            t.total = nets.iter().sum();
            hole.teams.insert(TeamId::from_str(team), t);
        }
        hole.complete = true;
        hole
    }

    fn five_points_options() -> Options {
        let mut options = Options::new();
        options.insert(
            JunkOption::new("low_ball", 2.0, OptionScope::Team)
                .with_seq(1)
                .with_calculation(JunkCalculation::BestBall)
                .with_better(RankDirection::Lower)
                .with_limit(JunkLimit::OneTeamPerGroup),
        );
        options.insert(
            JunkOption::new("low_total", 2.0, OptionScope::Team)
                .with_seq(2)
                .with_calculation(JunkCalculation::Sum)
                .with_limit(JunkLimit::OneTeamPerGroup),
        );
        options.insert(
            JunkOption::new("prox", 1.0, OptionScope::Player)
                .with_seq(3)
                .with_based_on(JunkBasis::User)
                .with_limit(JunkLimit::OnePerGroup),
        );
        options.insert(JunkOption::new("birdie", 1.0, OptionScope::Player).with_seq(4).with_score_to_par("exactly -1"));
        options
    }

    fn context(options: Options, prox: &str) -> ScoringContext {
        let mut ctx = ScoringContext::new("g", options).with_hole(
            GameHole::new("1")
                .with_team(TeamAssignment::new("1", vec!["p1".into(), "p2".into()]))
                .with_team(TeamAssignment::new("2", vec!["p3".into(), "p4".into()])),
        );
        for id in ["p1", "p2", "p3", "p4"] {
            let mut scores = HoleScores::new();
            if id == prox {
                scores.set("prox", "true");
            }
            ctx = ctx.with_round(Round::new(id).with_score("1", scores));
        }
        ctx
    }

    fn team_junk(hole: &HoleResult, team: &str) -> Vec<String> {
        hole.teams[&TeamId::from_str(team)].junk.iter().map(|j| j.name.clone()).collect()
    }

    #[test]
    fn test_parse_score_to_par() {
        assert_eq!(
            parse_score_to_par_condition("  at_most   -2 "),
            Some(ScoreToParCondition {
                operator: ScoreOperator::AtMost,
                value: -2
            })
        );
        assert!(parse_score_to_par_condition("at_least x").is_none());
        assert!(parse_score_to_par_condition("exactly -1 extra").is_none());
        assert!(parse_score_to_par_condition("").is_none());
    }

    #[test]
    fn test_score_to_par_matches() {
        let eagle_or_better = parse_score_to_par_condition("at_most -2").unwrap();
        assert!(eagle_or_better.matches(-3));
        assert!(!eagle_or_better.matches(-1));
        let bogey_plus = parse_score_to_par_condition("at_least 1").unwrap();
        assert!(bogey_plus.matches(2));
    }

    #[test]
    fn test_parse_logic_condition() {
        let single = parse_logic_condition("{'rankWithTies': [1, 1]}");
        let double = parse_logic_condition(r#"{"rankWithTies": [1, 1]}"#);
        assert_eq!(single, double);
        assert!(single.is_some());
        assert!(parse_logic_condition("not valid json").is_none());
        assert!(parse_logic_condition("{'rank': [1, 1]}").is_none());
    }

    #[test]
    fn test_low_ball_and_total_split() {
        let ctx = context(five_points_options(), "p1");
        let mut hole = two_team_hole([4, 5, 4, 4]);
        evaluate_junk_for_hole(&mut hole, &ctx, &Scoreboard::new("g"));

        assert!(team_junk(&hole, "1").is_empty());
        assert_eq!(team_junk(&hole, "2"), vec!["low_total"]);
        assert!(hole.players[&PlayerId::from_str("p1")].has_junk("prox"));
    }

    #[test]
    fn test_one_team_per_group_tie_awards_nobody() {
        let ctx = context(five_points_options(), "");
        let mut hole = two_team_hole([4, 5, 4, 5]);
        evaluate_junk_for_hole(&mut hole, &ctx, &Scoreboard::new("g"));
        assert!(team_junk(&hole, "1").is_empty());
        assert!(team_junk(&hole, "2").is_empty());
    }

    #[test]
    fn test_next_ball_breaks_ties() {
        let mut options = five_points_options();
        options.insert(crate::options::GameOption {
            name: "next_ball_breaks_ties".into(),
            disp: String::new(),
            value_type: crate::options::ValueType::Bool,
            value: Some(serde_json::json!(true)),
            default_value: None,
        });
        let ctx = context(options, "");
        let mut hole = two_team_hole([4, 5, 4, 6]);
        evaluate_junk_for_hole(&mut hole, &ctx, &Scoreboard::new("g"));
        assert_eq!(team_junk(&hole, "1"), vec!["low_ball", "low_total"]);
    }

    #[test]
    fn test_team_junk_waits_for_complete_hole() {
        let ctx = context(five_points_options(), "");
        let mut hole = two_team_hole([3, 4, 5, 5]);
        hole.complete = false;
        evaluate_junk_for_hole(&mut hole, &ctx, &Scoreboard::new("g"));
        assert!(team_junk(&hole, "1").is_empty());
        assert!(hole.players[&PlayerId::from_str("p1")].has_junk("birdie"));
    }

    #[test]
    fn test_unscored_player_gets_no_score_junk() {
        let ctx = context(five_points_options(), "");
        let mut hole = two_team_hole([3, 4, 4, 4]);
        if let Some(p) = hole.players.get_mut(&PlayerId::from_str("p1")) {
            p.has_score = false;
        }
        evaluate_junk_for_hole(&mut hole, &ctx, &Scoreboard::new("g"));
        assert!(!hole.players[&PlayerId::from_str("p1")].has_junk("birdie"));
    }

    #[test]
    fn test_net_birdie_uses_net_to_par() {
        let mut options = Options::new();
        options.insert(
            JunkOption::new("net_birdie", 1.0, OptionScope::Player)
                .with_based_on(JunkBasis::Net)
                .with_score_to_par("exactly -1"),
        );
        let ctx = context(options, "");
        let mut hole = two_team_hole([4, 4, 4, 4]);
        if let Some(p) = hole.players.get_mut(&PlayerId::from_str("p2")) {
            p.net = 3;
            p.net_to_par = -1;
        }
        evaluate_junk_for_hole(&mut hole, &ctx, &Scoreboard::new("g"));
        assert!(hole.players[&PlayerId::from_str("p2")].has_junk("net_birdie"));
        assert!(!hole.players[&PlayerId::from_str("p1")].has_junk("net_birdie"));
    }

    #[test]
    fn test_possible_points() {
        let ctx = context(five_points_options(), "p1");
        let mut hole = two_team_hole([3, 4, 4, 4]);
        evaluate_junk_for_hole(&mut hole, &ctx, &Scoreboard::new("g"));
        // low_ball + low_total + prox, plus the birdie won
        assert_eq!(possible_points(&hole, &ctx), 6.0);
    }
}
