//! Logic engine.
//!
//! Junk `logic` and multiplier `availability` fields hold small JSON logic
//! expressions, persisted as text with single quotes:
//!
//! ```text
//! {'team_down_the_most': [{'getPrevHole': []}, {'var': 'team'}]}
//! {'===': [{'var': 'team.points'}, {'var': 'possiblePoints'}]}
//! ```
//!
//! Expressions are interpreted against a [`LogicContext`] by a fixed
//! dispatch over the supported operators. Nothing is ever compiled or
//! executed dynamically. Unsupported operators and malformed expressions
//! evaluate to `false` and are reported with `log::warn!`.

use crate::ids::{HoleId, PlayerId, TeamId};
use crate::ranking::{rank_lookup, rank_with_ties, RankDirection};
use crate::scoreboard::{HoleResult, Scoreboard, TeamHoleResult};
use crate::team::count_team_junk;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Expressions nested deeper than this evaluate to false.
const MAX_DEPTH: usize = 64;

/// A `{rankWithTies: [rank, tieCount]}` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankCondition {
    pub rank: u32,
    pub tie_count: u32,
}

impl RankCondition {
    pub fn matches(&self, rank: u32, tie_count: u32) -> bool {
        crate::ranking::matches_rank_condition(rank, tie_count, self.rank, self.tie_count)
    }
}

/// Parse a persisted expression, accepting single-quoted JSON.
pub fn parse_expression(expression: &str) -> Option<Value> {
    let normalized = expression.replace('\'', "\"");
    serde_json::from_str(&normalized).ok()
}

/// Recognise an expression that is nothing but a `rankWithTies` check.
///
/// Such expressions can be answered from a rank and tie count alone,
/// without running the interpreter.
///
/// # Examples
///
/// ```rust
/// use golfjunk::logic::is_simple_rank_check;
///
/// let outright = is_simple_rank_check("{'rankWithTies': [1, 1]}").unwrap();
/// assert_eq!((outright.rank, outright.tie_count), (1, 1));
///
/// assert!(is_simple_rank_check("{'and': [true]}").is_none());
/// assert!(is_simple_rank_check("not json").is_none());
/// ```
pub fn is_simple_rank_check(expression: &str) -> Option<RankCondition> {
    let parsed = parse_expression(expression)?;
    let map = parsed.as_object()?;
    if map.len() != 1 {
        return None;
    }
    let args = map.get("rankWithTies")?.as_array()?;
    if args.len() != 2 {
        return None;
    }
    let rank = to_number(&args[0])?;
    let tie_count = to_number(&args[1])?;
    if rank < 0.0 || tie_count < 0.0 || rank.fract() != 0.0 || tie_count.fract() != 0.0 {
        return None;
    }
    Some(RankCondition {
        rank: rank as u32,
        tie_count: tie_count as u32,
    })
}

/// What an expression can see while it is evaluated.
///
/// `scoreboard` holds the holes already scored; `hole` is the hole being
/// scored, including any junk and multipliers awarded so far.
#[derive(Debug, Clone, Copy)]
pub struct LogicContext<'a> {
    pub scoreboard: &'a Scoreboard,
    pub hole: &'a HoleResult,
    pub team_id: Option<&'a TeamId>,
    pub player_id: Option<&'a PlayerId>,
    pub possible_points: f64,
    pub better_points: RankDirection,
}

impl<'a> LogicContext<'a> {
    pub fn new(scoreboard: &'a Scoreboard, hole: &'a HoleResult) -> Self {
        Self {
            scoreboard,
            hole,
            team_id: None,
            player_id: None,
            possible_points: 0.0,
            better_points: RankDirection::Higher,
        }
    }

    pub fn for_team(mut self, team_id: &'a TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn for_player(mut self, player_id: &'a PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    pub fn with_possible_points(mut self, possible_points: f64) -> Self {
        self.possible_points = possible_points;
        self
    }

    pub fn with_better_points(mut self, better_points: RankDirection) -> Self {
        self.better_points = better_points;
        self
    }

    fn team(&self) -> Option<&'a TeamHoleResult> {
        self.team_id.and_then(|id| self.hole.teams.get(id))
    }

    /// The data object `var` paths are resolved against.
    fn data(&self) -> Value {
        let team = self
            .team()
            .and_then(|t| serde_json::to_value(t).ok())
            .unwrap_or(Value::Null);
        let teams = serde_json::to_value(self.hole.teams.values().collect::<Vec<_>>())
            .unwrap_or(Value::Null);
        let player = self
            .player_id
            .and_then(|id| self.hole.players.get(id))
            .and_then(|p| serde_json::to_value(p).ok())
            .unwrap_or(Value::Null);
        json!({
            "team": team,
            "teams": teams,
            "player": player,
            "possiblePoints": self.possible_points,
            "hole": { "id": self.hole.hole.as_str(), "par": self.hole.hole_info.par },
        })
    }
}

/// Evaluate a persisted expression to a boolean.
///
/// Empty and malformed expressions are false.
///
/// # Examples
///
/// ```rust
/// use golfjunk::logic::{evaluate_logic, LogicContext};
/// use golfjunk::scoreboard::{HoleInfo, HoleResult, Scoreboard};
///
/// let scoreboard = Scoreboard::new("g");
/// let hole = HoleResult::new(HoleInfo { hole: "1".into(), par: 3, allocation: 1, yards: 0 });
/// let ctx = LogicContext::new(&scoreboard, &hole).with_possible_points(5.0);
///
/// assert!(evaluate_logic("{'==': [{'var': 'possiblePoints'}, 5]}", &ctx));
/// assert!(evaluate_logic("{'<': [{'holePar': []}, 4]}", &ctx));
/// assert!(!evaluate_logic("{'no_such_op': [1]}", &ctx));
/// ```
pub fn evaluate_logic(expression: &str, ctx: &LogicContext<'_>) -> bool {
    if expression.trim().is_empty() {
        return false;
    }
    let Some(expr) = parse_expression(expression) else {
        log::warn!("malformed logic expression: {}", expression);
        return false;
    };
    let data = ctx.data();
    truthy(&Interpreter { ctx, data: &data }.apply(&expr, 0))
}

struct Interpreter<'c, 'a> {
    ctx: &'c LogicContext<'a>,
    data: &'c Value,
}

impl Interpreter<'_, '_> {
    fn apply(&self, expr: &Value, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            log::warn!("logic expression nested deeper than {}", MAX_DEPTH);
            return Value::Bool(false);
        }
        match expr {
            Value::Object(map) if map.len() == 1 => match map.iter().next() {
                Some((op, args)) => self.operation(op, args, depth + 1),
                None => Value::Null,
            },
            Value::Array(items) => {
                Value::Array(items.iter().map(|i| self.apply(i, depth + 1)).collect())
            }
            other => other.clone(),
        }
    }

    fn operation(&self, op: &str, raw: &Value, depth: usize) -> Value {
        let args: Vec<&Value> = match raw {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        let arg = |i: usize| {
            args.get(i)
                .map(|a| self.apply(a, depth))
                .unwrap_or(Value::Null)
        };
        let all = || args.iter().map(|a| self.apply(a, depth)).collect::<Vec<_>>();

        match op {
            "var" => self.var(&arg(0), arg(1)),
            "and" => {
                let mut last = Value::Null;
                for a in &args {
                    last = self.apply(a, depth);
                    if !truthy(&last) {
                        return last;
                    }
                }
                last
            }
            "or" => {
                let mut last = Value::Null;
                for a in &args {
                    last = self.apply(a, depth);
                    if truthy(&last) {
                        return last;
                    }
                }
                last
            }
            "!" => Value::Bool(!truthy(&arg(0))),
            "!!" => Value::Bool(truthy(&arg(0))),
            "==" => Value::Bool(loose_eq(&arg(0), &arg(1))),
            "!=" => Value::Bool(!loose_eq(&arg(0), &arg(1))),
            "===" => Value::Bool(strict_eq(&arg(0), &arg(1))),
            "!==" => Value::Bool(!strict_eq(&arg(0), &arg(1))),
            "<" | "<=" | ">" | ">=" => {
                let values = all();
                let ok = values
                    .windows(2)
                    .all(|pair| compare(op, &pair[0], &pair[1]));
                Value::Bool(values.len() >= 2 && ok)
            }
            "if" | "?:" => {
                let mut i = 0;
                while i + 1 < args.len() {
                    if truthy(&self.apply(args[i], depth)) {
                        return self.apply(args[i + 1], depth);
                    }
                    i += 2;
                }
                if i < args.len() {
                    self.apply(args[i], depth)
                } else {
                    Value::Null
                }
            }
            "+" => number(all().iter().filter_map(to_number).sum()),
            "*" => number(all().iter().filter_map(to_number).product()),
            "-" => match (to_number(&arg(0)), args.len()) {
                (Some(a), 1) => number(-a),
                (Some(a), _) => to_number(&arg(1)).map(|b| number(a - b)).unwrap_or(Value::Null),
                (None, _) => Value::Null,
            },
            "/" => match (to_number(&arg(0)), to_number(&arg(1))) {
                (Some(a), Some(b)) => number(a / b),
                _ => Value::Null,
            },
            "min" => all()
                .iter()
                .filter_map(to_number)
                .reduce(f64::min)
                .map(number)
                .unwrap_or(Value::Null),
            "max" => all()
                .iter()
                .filter_map(to_number)
                .reduce(f64::max)
                .map(number)
                .unwrap_or(Value::Null),
            "in" => {
                let needle = arg(0);
                let found = match arg(1) {
                    Value::String(haystack) => needle
                        .as_str()
                        .map(|n| haystack.contains(n))
                        .unwrap_or(false),
                    Value::Array(items) => items.iter().any(|i| loose_eq(i, &needle)),
                    _ => false,
                };
                Value::Bool(found)
            }

            "getPrevHole" => self
                .ctx
                .scoreboard
                .previous_hole(&self.ctx.hole.hole)
                .map(|h| Value::String(h.hole.to_string()))
                .unwrap_or(Value::Null),
            "getCurrHole" => Value::String(self.ctx.hole.hole.to_string()),
            "holePar" => json!(self.ctx.hole.hole_info.par),
            "team" => self
                .resolve_team(&arg(0))
                .and_then(|id| self.ctx.hole.teams.get(&id))
                .and_then(|t| serde_json::to_value(t).ok())
                .unwrap_or(Value::Null),
            "playersOnTeam" => {
                let count = self
                    .resolve_team(&arg(0))
                    .and_then(|id| self.ctx.hole.teams.get(&id))
                    .map(|t| t.player_ids.len())
                    .unwrap_or(0);
                json!(count)
            }
            "countJunk" => {
                let name = arg(1);
                let count = match (self.resolve_team(&arg(0)), name.as_str()) {
                    (Some(team), Some(name)) => count_team_junk(self.ctx.hole, &team, name),
                    _ => 0,
                };
                json!(count)
            }
            "rankWithTies" => {
                let (Some(rank), Some(tie)) = (to_number(&arg(0)), to_number(&arg(1))) else {
                    return Value::Bool(false);
                };
                let current = match self.ctx.player_id {
                    Some(pid) => self.ctx.hole.players.get(pid).map(|p| (p.rank, p.tie_count)),
                    None => self.ctx.team().map(|t| (t.rank, t.tie_count)),
                };
                let matched = current
                    .map(|(r, t)| r as f64 == rank && t as f64 == tie)
                    .unwrap_or(false);
                Value::Bool(matched)
            }
            "team_down_the_most" => {
                let hole = self.resolve_hole(&arg(0));
                let team = self.resolve_team(&arg(1));
                Value::Bool(team_down_the_most(hole, team.as_ref(), self.ctx.better_points))
            }
            "team_second_to_last" => {
                let hole = self.resolve_hole(&arg(0));
                let team = self.resolve_team(&arg(1));
                Value::Bool(team_second_to_last(hole, team.as_ref(), self.ctx.better_points))
            }
            "other_team_multiplied_with" => {
                let hole = self.resolve_hole(&arg(0)).unwrap_or(self.ctx.hole);
                let matched = match (self.resolve_team(&arg(1)), arg(2).as_str()) {
                    (Some(team), Some(name)) => other_team_multiplied_with(hole, &team, name),
                    _ => false,
                };
                Value::Bool(matched)
            }
            unsupported => {
                log::warn!("unsupported logic operator '{}'", unsupported);
                Value::Bool(false)
            }
        }
    }

    fn var(&self, path: &Value, default: Value) -> Value {
        let path = match path {
            Value::Null => return self.data.clone(),
            Value::String(s) if s.is_empty() => return self.data.clone(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return default,
        };
        let mut current = self.data;
        for segment in path.split('.') {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(v) => current = v,
                None => return default,
            }
        }
        current.clone()
    }

    /// A hole reference: a hole id, or null for "no such hole".
    fn resolve_hole(&self, value: &Value) -> Option<&HoleResult> {
        let id = match value {
            Value::String(s) => HoleId::from_str(s),
            Value::Number(n) => HoleId::from(n.to_string()),
            _ => return None,
        };
        if id == self.ctx.hole.hole {
            Some(self.ctx.hole)
        } else {
            self.ctx.scoreboard.hole(&id)
        }
    }

    /// A team reference: `"this"`, `"other"`, a team id, a team object, or
    /// null for the team being evaluated.
    fn resolve_team(&self, value: &Value) -> Option<TeamId> {
        let current = self.ctx.team_id;
        match value {
            Value::Null => current.cloned(),
            Value::String(s) if s == "this" => current.cloned(),
            Value::String(s) if s == "other" => {
                let current = current?;
                self.ctx
                    .hole
                    .other_teams(current)
                    .next()
                    .map(|t| t.team_id.clone())
            }
            Value::String(s) => Some(TeamId::from_str(s)),
            Value::Number(n) => Some(TeamId::from(n.to_string())),
            Value::Object(map) => match map.get("teamId") {
                Some(Value::String(s)) => Some(TeamId::from_str(s)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Worst-first competition ranks of teams by running total on a hole.
fn worst_first_ranks(hole: &HoleResult, better_points: RankDirection) -> std::collections::BTreeMap<TeamId, (u32, u32)> {
    let ranked = rank_with_ties(
        hole.teams.values(),
        |t| t.running_total,
        better_points.reversed(),
    );
    rank_lookup(&ranked, |t| t.team_id.clone())
}

/// Whether `team` is furthest behind on running total as of `hole`.
///
/// Every team qualifies when there is no hole, fewer than two teams, or
/// all teams are level.
pub fn team_down_the_most(hole: Option<&HoleResult>, team: Option<&TeamId>, better_points: RankDirection) -> bool {
    let Some(hole) = hole else {
        return true;
    };
    let Some(team) = team else {
        return true;
    };
    if hole.teams.len() < 2 {
        return true;
    }
    let mut totals = hole.teams.values().map(|t| t.running_total);
    let first = totals.next().unwrap_or(0.0);
    if totals.all(|t| t == first) {
        return true;
    }
    worst_first_ranks(hole, better_points)
        .get(team)
        .map(|(rank, _)| *rank == 1)
        .unwrap_or(false)
}

/// Whether `team` holds the second-worst running total as of `hole`.
pub fn team_second_to_last(hole: Option<&HoleResult>, team: Option<&TeamId>, better_points: RankDirection) -> bool {
    let (Some(hole), Some(team)) = (hole, team) else {
        return false;
    };
    if hole.teams.len() < 2 {
        return false;
    }
    worst_first_ranks(hole, better_points)
        .get(team)
        .map(|(rank, _)| *rank == 2)
        .unwrap_or(false)
}

/// Whether any team other than `team` has `multiplier` on `hole`.
pub fn other_team_multiplied_with(hole: &HoleResult, team: &TeamId, multiplier: &str) -> bool {
    hole.other_teams(team).any(|t| t.has_multiplier(multiplier))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        _ => None,
    }
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(_), _) | (_, Value::Array(_)) | (Value::Object(_), _) | (_, Value::Object(_)) => a == b,
        _ => match (to_number(a), to_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

fn compare(op: &str, a: &Value, b: &Value) -> bool {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return match op {
            "<" => x < y,
            "<=" => x <= y,
            ">" => x > y,
            _ => x >= y,
        };
    }
    let (Some(x), Some(y)) = (to_number(a), to_number(b)) else {
        return false;
    };
    match op {
        "<" => x < y,
        "<=" => x <= y,
        ">" => x > y,
        _ => x >= y,
    }
}
