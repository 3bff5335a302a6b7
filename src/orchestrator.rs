//! Hole and game orchestration.
//!
//! Walks the holes of a game in play order and fills a [`Scoreboard`]:
//!
//! ```text
//! players → teams → ranks → junk → possible points → points
//!         → multipliers → hole totals → running totals
//! ```
//!
//! then folds match play status and cumulative totals. Running totals are
//! threaded through the walk hole by hole, since press availability on a
//! hole reads the standings as of the hole before it.
//!
//! [`GameScorer`] keeps the last scoreboard and recomputes only the holes an
//! [`Invalidation`] names.

use crate::context::{GameHole, ScoringContext};
use crate::error::ScoringError;
use crate::handicap::{calculate_pops, net_score, score_to_par};
use crate::ids::{HoleId, PlayerId, TeamId};
use crate::invalidation::{detect_invalidations, Change, Invalidation};
use crate::junk::{evaluate_junk_for_hole, possible_points};
use crate::multiplier::{evaluate_multipliers_for_hole, hole_multiplier, ActiveMultiplier, ActiveMultiplierIndex};
use crate::options::{JunkCalculation, OptionScope};
use crate::points::{calculate_points, points_from_table, PointsTable};
use crate::ranking::{rank_lookup, rank_with_ties, RankDirection};
use crate::scoreboard::{
    HoleResult, MatchDiff, PlayerCumulative, PlayerHoleResult, Scoreboard, TeamCumulative, TeamHoleResult,
};
use crate::team::{calculate_team_score, TeamMethod};
use std::collections::BTreeMap;

const NO_MULTIPLIERS: &[f64] = &[];

/// Game-wide settings resolved once per scoring pass.
struct GameRules {
    table: PointsTable,
    table_warning: Option<String>,
    better_points: RankDirection,
}

impl GameRules {
    fn from_context(context: &ScoringContext) -> Self {
        let (table, table_warning) = match context.points_table() {
            Ok(table) => (table, None),
            Err(err) => {
                log::warn!("game {}: {}", context.game_id, err);
                (PointsTable::new(), Some(err.to_string()))
            }
        };
        Self {
            table,
            table_warning,
            better_points: context.better_points(),
        }
    }
}

/// Score a whole game.
///
/// Pure and deterministic: the same context always yields the same
/// scoreboard, down to its serialized form.
///
/// # Examples
///
/// ```rust
/// use golfjunk::options::{JunkOption, OptionScope, Options};
/// use golfjunk::orchestrator::score;
/// use golfjunk::{GameHole, HoleScores, PlayerId, Round, ScoringContext};
///
/// let mut options = Options::new();
/// options.insert(JunkOption::new("birdie", 1.0, OptionScope::Player).with_score_to_par("exactly -1"));
///
/// let context = ScoringContext::new("g", options)
///     .with_hole(GameHole::new("1").with_par(4))
///     .with_round(Round::new("p1").with_score("1", HoleScores::new().with("gross", 3)))
///     .with_round(Round::new("p2").with_score("1", HoleScores::new().with("gross", 5)));
///
/// let scoreboard = score(&context);
/// let hole = scoreboard.hole(&"1".into()).unwrap();
/// assert!(hole.complete);
/// assert_eq!(hole.players[&PlayerId::from_str("p1")].points, 1.0);
/// assert_eq!(scoreboard.cumulative.players[&PlayerId::from_str("p1")].rank, 1);
/// ```
pub fn score(context: &ScoringContext) -> Scoreboard {
    let rules = GameRules::from_context(context);
    let mut scoreboard = Scoreboard::new(context.game_id.clone());
    scoreboard.meta.holes_played = context.hole_order();
    scoreboard.meta.has_teams = !context.teams().is_empty();
    scoreboard.meta.points_per_hole = points_per_hole(context, &rules.table);

    let mut index = ActiveMultiplierIndex::new();
    let mut running: BTreeMap<TeamId, f64> = BTreeMap::new();
    let order = scoreboard.meta.holes_played.clone();
    for hole_id in &order {
        let result = score_hole(hole_id, context, &rules, &scoreboard, &mut index, &mut running);
        scoreboard.holes.insert(hole_id.clone(), result);
    }

    fold_match_play(&mut scoreboard, context);
    fold_cumulative(&mut scoreboard, context, rules.better_points);
    scoreboard
}

fn score_hole(
    hole_id: &HoleId,
    context: &ScoringContext,
    rules: &GameRules,
    scoreboard: &Scoreboard,
    index: &mut ActiveMultiplierIndex,
    running: &mut BTreeMap<TeamId, f64>,
) -> HoleResult {
    let Some(game_hole) = context.game_hole(hole_id) else {
        return HoleResult::new(GameHole::new(hole_id.clone()).hole_info());
    };
    let mut hole = HoleResult::new(game_hole.hole_info());
    if let Some(warning) = rules.table_warning.as_ref() {
        hole.warnings.push(format!("points_table ignored: {}", warning));
    }

    score_players(&mut hole, context);
    score_teams(&mut hole, context);
    rank_hole(&mut hole);

    evaluate_junk_for_hole(&mut hole, context, scoreboard);
    hole.possible_points = possible_points(&hole, context);
    assign_points(&mut hole, rules, scoreboard.meta.has_teams);

    evaluate_multipliers_for_hole(&mut hole, context, scoreboard, index);
    hole.hole_multiplier = hole_multiplier(&hole);
    apply_hole_multiplier(&mut hole, scoreboard.meta.has_teams);

    fold_running_totals(&mut hole, running, rules.better_points);

    log::debug!(
        "hole {}: {}/{} scores, possible {}, multiplier {}",
        hole.hole,
        hole.scores_entered,
        hole.players.len(),
        hole.possible_points,
        hole.hole_multiplier
    );
    hole
}

/// Gross, pops and net for every player in the game.
fn score_players(hole: &mut HoleResult, context: &ScoringContext) {
    let par = hole.hole_info.par;
    let allocation = hole.hole_info.allocation;

    for player_id in context.players() {
        let mut player = PlayerHoleResult::new(player_id.clone());
        player.team_id = context.team_of(&player_id, &hole.hole).cloned();

        let round = context.round(&player_id);
        let scores = round.and_then(|r| r.hole_scores(&hole.hole));
        let handicap = round.map(|r| r.effective_handicap()).unwrap_or(0);

        player.pops = scores
            .and_then(|s| s.number("pops"))
            .unwrap_or_else(|| calculate_pops(handicap, allocation));

        if let Some(gross) = scores.and_then(|s| s.number("gross")).filter(|g| *g > 0) {
            player.has_score = true;
            player.gross = gross;
            player.net = net_score(gross, player.pops);
            player.score_to_par = score_to_par(gross, par);
            player.net_to_par = score_to_par(player.net, par);
        }

        hole.players.insert(player_id, player);
    }

    hole.scores_entered = hole.players.values().filter(|p| p.has_score).count();
    hole.complete = !hole.players.is_empty() && hole.scores_entered == hole.players.len();
}

fn score_teams(hole: &mut HoleResult, context: &ScoringContext) {
    let Some(game_hole) = context.game_hole(&hole.hole) else {
        return;
    };
    let method = context.team_method(&hole.hole);
    if let TeamMethod::Unknown(name) = &method {
        if !game_hole.teams.is_empty() {
            hole.warnings.push(format!("unknown team scoring method '{}'", name));
        }
    }

    for assignment in &game_hole.teams {
        let mut team = TeamHoleResult::new(assignment.team.clone(), assignment.players.clone());
        let team_score = calculate_team_score(&method, &team.player_ids, &hole.players);
        team.score = team_score.score;
        team.low_ball = team_score.low_ball;
        team.total = team_score.total;
        team.average = team_score.average;
        hole.teams.insert(assignment.team.clone(), team);
    }
}

/// Rank scored players by net and teams with a scored player by team
/// score, lower winning in both cases.
fn rank_hole(hole: &mut HoleResult) {
    let players: Vec<(PlayerId, f64)> = hole
        .players
        .values()
        .filter(|p| p.has_score)
        .map(|p| (p.player_id.clone(), p.net as f64))
        .collect();
    let ranked = rank_with_ties(players, |p| p.1, RankDirection::Lower);
    for (player_id, (rank, tie_count)) in rank_lookup(&ranked, |p| p.0.clone()) {
        if let Some(player) = hole.players.get_mut(&player_id) {
            player.rank = rank;
            player.tie_count = tie_count;
        }
    }

    let teams: Vec<(TeamId, f64)> = hole
        .teams
        .values()
        .filter(|t| {
            t.player_ids
                .iter()
                .any(|p| hole.players.get(p).map(|p| p.has_score).unwrap_or(false))
        })
        .map(|t| (t.team_id.clone(), t.score))
        .collect();
    let ranked = rank_with_ties(teams, |t| t.1, RankDirection::Lower);
    for (team_id, (rank, tie_count)) in rank_lookup(&ranked, |t| t.0.clone()) {
        if let Some(team) = hole.teams.get_mut(&team_id) {
            team.rank = rank;
            team.tie_count = tie_count;
        }
    }
}

/// Points before multipliers: placement from the points table plus junk.
///
/// Teams are placed on team rank and carry their members' junk. Without
/// teams, players are placed on their own rank.
fn assign_points(hole: &mut HoleResult, rules: &GameRules, has_teams: bool) {
    let placement = |rank: u32, tie_count: u32| {
        if rank == 0 {
            0.0
        } else {
            points_from_table(rank, tie_count, &rules.table)
        }
    };

    for player in hole.players.values_mut() {
        let base = if has_teams {
            0.0
        } else {
            placement(player.rank, player.tie_count)
        };
        player.points = calculate_points(base, &player.junk, NO_MULTIPLIERS);
    }

    let players = &hole.players;
    for team in hole.teams.values_mut() {
        let mut junk = team.junk.clone();
        junk.extend(
            team.player_ids
                .iter()
                .filter_map(|p| players.get(p))
                .flat_map(|p| p.junk.iter().cloned()),
        );
        team.points = calculate_points(placement(team.rank, team.tie_count), &junk, NO_MULTIPLIERS);
    }
}

/// Hole totals. In team games every player carries their team's total.
fn apply_hole_multiplier(hole: &mut HoleResult, has_teams: bool) {
    let factor = hole.hole_multiplier;
    for team in hole.teams.values_mut() {
        team.hole_total = team.points * factor;
    }

    let teams = &hole.teams;
    for player in hole.players.values_mut() {
        player.points = match player.team_id.as_ref().and_then(|t| teams.get(t)) {
            Some(team) if has_teams => team.hole_total,
            _ => player.points * factor,
        };
    }
}

/// Advance running totals with a hole. Totals only move once every score
/// on the hole is in.
fn fold_running_totals(hole: &mut HoleResult, running: &mut BTreeMap<TeamId, f64>, better_points: RankDirection) {
    let sign = match better_points {
        RankDirection::Higher => 1.0,
        RankDirection::Lower => -1.0,
    };

    for team in hole.teams.values_mut() {
        let total = running.entry(team.team_id.clone()).or_insert(0.0);
        if hole.complete {
            *total += team.hole_total;
        }
        team.running_total = *total;
    }

    if hole.teams.len() != 2 {
        return;
    }
    let snapshot: Vec<(f64, f64)> = hole.teams.values().map(|t| (t.hole_total, t.running_total)).collect();
    for (i, team) in hole.teams.values_mut().enumerate() {
        let (mine, other) = (snapshot[i], snapshot[1 - i]);
        team.hole_net_total = Some(sign * (mine.0 - other.0));
        team.running_diff = Some(sign * (mine.1 - other.1));
    }
}

/// Match play status for two-team games: holes up, or "N & M" once the
/// lead exceeds the holes remaining.
fn fold_match_play(scoreboard: &mut Scoreboard, context: &ScoringContext) {
    if !context.match_play() {
        return;
    }
    let order = scoreboard.meta.holes_played.clone();
    let mut decided: Option<MatchDiff> = None;
    let mut all_scored = true;
    let mut last: BTreeMap<TeamId, MatchDiff> = BTreeMap::new();

    for (i, hole_id) in order.iter().enumerate() {
        let Some(hole) = scoreboard.holes.get_mut(hole_id) else {
            continue;
        };
        if hole.teams.len() != 2 {
            continue;
        }
        if !hole.complete {
            all_scored = false;
        }

        if let Some(result) = decided.as_ref() {
            for team in hole.teams.values_mut() {
                team.match_diff = Some(result.clone());
                team.match_over = true;
            }
            continue;
        }

        let totals: Vec<f64> = hole.teams.values().map(|t| t.running_total).collect();
        let diff = totals[0] - totals[1];
        let remaining = order.len() - i - 1;

        if diff.abs() > remaining as f64 && all_scored {
            let result = if remaining > 0 {
                MatchDiff::Decided(format!("{} & {}", diff.abs(), remaining))
            } else {
                MatchDiff::Holes(diff.abs())
            };
            for team in hole.teams.values_mut() {
                team.match_diff = Some(result.clone());
                team.match_over = true;
            }
            decided = Some(result);
        } else {
            for (j, team) in hole.teams.values_mut().enumerate() {
                team.match_diff = Some(MatchDiff::Holes(if j == 0 { diff } else { -diff }));
            }
        }

        for team in hole.teams.values() {
            if let Some(d) = team.match_diff.as_ref() {
                last.insert(team.team_id.clone(), d.clone());
            }
        }
    }

    for (team_id, diff) in last {
        let cumulative = scoreboard
            .cumulative
            .teams
            .entry(team_id.clone())
            .or_insert_with(|| TeamCumulative::new(team_id));
        cumulative.match_over = decided.is_some();
        cumulative.match_diff = Some(diff);
    }
}

/// Game totals and standings: players by net total (lower wins), teams by
/// points total in the game's `better_points` direction.
fn fold_cumulative(scoreboard: &mut Scoreboard, context: &ScoringContext, better_points: RankDirection) {
    let mut players: BTreeMap<PlayerId, PlayerCumulative> = context
        .players()
        .into_iter()
        .map(|p| (p.clone(), PlayerCumulative::new(p)))
        .collect();
    let mut teams: BTreeMap<TeamId, TeamCumulative> = context
        .teams()
        .into_iter()
        .map(|t| {
            let mut cumulative = TeamCumulative::new(t.clone());
            if let Some(existing) = scoreboard.cumulative.teams.get(&t) {
                cumulative.match_diff = existing.match_diff.clone();
                cumulative.match_over = existing.match_over;
            }
            (t, cumulative)
        })
        .collect();

    for hole in scoreboard.holes_in_order() {
        for player in hole.players.values().filter(|p| p.has_score) {
            let total = players
                .entry(player.player_id.clone())
                .or_insert_with(|| PlayerCumulative::new(player.player_id.clone()));
            total.gross_total += player.gross;
            total.pops_total += player.pops;
            total.net_total += player.net;
            total.points_total += player.points;
            total.junk_total += player.junk.iter().map(|j| j.value).sum::<f64>();
            total.holes_played += 1;
        }
        for team in hole.teams.values() {
            let total = teams
                .entry(team.team_id.clone())
                .or_insert_with(|| TeamCumulative::new(team.team_id.clone()));
            total.score_total += team.score;
            total.points_total += team.hole_total;
            total.junk_total += team.junk.iter().map(|j| j.value).sum::<f64>();
        }
    }

    let ranked = rank_with_ties(
        players.values().filter(|p| p.holes_played > 0).map(|p| (p.player_id.clone(), p.net_total as f64)),
        |p| p.1,
        RankDirection::Lower,
    );
    for (player_id, (rank, tie_count)) in rank_lookup(&ranked, |p| p.0.clone()) {
        if let Some(p) = players.get_mut(&player_id) {
            p.rank = rank;
            p.tie_count = tie_count;
        }
    }

    let ranked = rank_with_ties(
        teams.values().filter(|t| t.points_total != 0.0).map(|t| (t.team_id.clone(), t.points_total)),
        |t| t.1,
        better_points,
    );
    for (team_id, (rank, tie_count)) in rank_lookup(&ranked, |t| t.0.clone()) {
        if let Some(t) = teams.get_mut(&team_id) {
            t.rank = rank;
            t.tie_count = tie_count;
        }
    }

    scoreboard.cumulative.players = players;
    scoreboard.cumulative.teams = teams;
}

/// Points on offer on a hole before any unlimited junk is won: every
/// limited junk, the richest team placement junk and the best table entry.
pub fn points_per_hole(context: &ScoringContext, table: &PointsTable) -> f64 {
    let is_team_logic = |scope: OptionScope, calculation: Option<JunkCalculation>, has_logic: bool| {
        scope == OptionScope::Team
            && (calculation == Some(JunkCalculation::Logic) || (calculation.is_none() && has_logic))
    };
    let mut limited = 0.0;
    let mut placement: f64 = 0.0;
    for junk in context.options.junk() {
        if is_team_logic(junk.scope, junk.calculation, junk.logic.is_some()) {
            placement = placement.max(junk.value);
        } else if junk.limit.is_limited() {
            limited += junk.value;
        }
    }
    let table_best = table.entries().iter().map(|e| e.points).fold(0.0, f64::max);
    limited + placement + table_best
}

/// Team running totals as of the hole before `position`.
fn running_totals_before(scoreboard: &Scoreboard, position: usize) -> BTreeMap<TeamId, f64> {
    let mut running = BTreeMap::new();
    for hole in scoreboard.holes_in_order().take(position) {
        for team in hole.teams.values() {
            running.insert(team.team_id.clone(), team.running_total);
        }
    }
    running
}

/// Scores a game and keeps the result, recomputing only what a change
/// invalidates.
///
/// # Examples
///
/// ```rust
/// use golfjunk::invalidation::Change;
/// use golfjunk::orchestrator::GameScorer;
/// use golfjunk::{GameHole, HoleScores, PlayerId, Round, ScoringContext};
/// use golfjunk::options::Options;
///
/// let build = |gross: i32| {
///     ScoringContext::new("g", Options::new())
///         .with_hole(GameHole::new("1"))
///         .with_hole(GameHole::new("2"))
///         .with_round(Round::new("p1")
///             .with_score("1", HoleScores::new().with("gross", 5))
///             .with_score("2", HoleScores::new().with("gross", gross)))
/// };
///
/// let mut scorer = GameScorer::new(build(4));
/// assert_eq!(scorer.scoreboard().cumulative.players[&PlayerId::from_str("p1")].gross_total, 9);
///
/// let change = Change::Score { hole: "2".into(), player: "p1".into() };
/// let scoreboard = scorer.apply(build(6), &change).unwrap();
/// assert_eq!(scoreboard.cumulative.players[&PlayerId::from_str("p1")].gross_total, 11);
/// ```
#[derive(Debug, Clone)]
pub struct GameScorer {
    context: ScoringContext,
    cache: Option<Scoreboard>,
}

impl GameScorer {
    pub fn new(context: ScoringContext) -> Self {
        Self { context, cache: None }
    }

    pub fn context(&self) -> &ScoringContext {
        &self.context
    }

    /// The current scoreboard, scoring the game first if needed.
    pub fn scoreboard(&mut self) -> &Scoreboard {
        let context = &self.context;
        self.cache.get_or_insert_with(|| score(context))
    }

    /// Replace the context after `change` and rescore what it invalidates.
    pub fn apply(&mut self, context: ScoringContext, change: &Change) -> Result<&Scoreboard, ScoringError> {
        let invalidation = detect_invalidations(&context, change)?;
        self.context = context;
        Ok(self.rescore(&invalidation))
    }

    /// Recompute the invalidated holes and refold every total.
    ///
    /// Holes outside the invalidation keep their cached results apart from
    /// running totals, which are refolded from the first invalidated hole. If the
    /// hole order has changed since the last pass, the whole game is
    /// rescored.
    pub fn rescore(&mut self, invalidation: &Invalidation) -> &Scoreboard {
        let order = self.context.hole_order();
        let mut scoreboard = match self.cache.take() {
            Some(cached) if cached.meta.holes_played == order => cached,
            _ => {
                let context = &self.context;
                return self.cache.insert(score(context));
            }
        };

        let Some(first) = order.iter().position(|h| invalidation.holes.contains(h)) else {
            return self.cache.insert(scoreboard);
        };

        let rules = GameRules::from_context(&self.context);
        scoreboard.meta.has_teams = !self.context.teams().is_empty();
        scoreboard.meta.points_per_hole = points_per_hole(&self.context, &rules.table);

        let mut index = ActiveMultiplierIndex::from_scoreboard(&scoreboard, &self.context, first);
        let mut running = running_totals_before(&scoreboard, first);

        for (position, hole_id) in order.iter().enumerate().skip(first) {
            if invalidation.holes.contains(hole_id) {
                log::debug!("rescoring hole {}", hole_id);
                let result = score_hole(hole_id, &self.context, &rules, &scoreboard, &mut index, &mut running);
                scoreboard.holes.insert(hole_id.clone(), result);
            } else if let Some(hole) = scoreboard.holes.get_mut(hole_id) {
                fold_running_totals(hole, &mut running, rules.better_points);
                let nine = self.context.nine_of(hole_id);
                for team in hole.teams.values() {
                    record_presses(&mut index, hole_id, team, nine, position);
                }
            }
        }

        scoreboard.cumulative.teams.clear();
        fold_match_play(&mut scoreboard, &self.context);
        fold_cumulative(&mut scoreboard, &self.context, rules.better_points);
        self.cache.insert(scoreboard)
    }

    /// Drop the cached scoreboard.
    pub fn invalidate_all(&mut self) {
        self.cache = None;
    }
}

fn record_presses(index: &mut ActiveMultiplierIndex, hole_id: &HoleId, team: &TeamHoleResult, nine: u32, position: usize) {
    for m in &team.multipliers {
        if m.scope == OptionScope::RestOfNine && m.first_hole.as_ref() == Some(hole_id) {
            index.record(
                nine,
                ActiveMultiplier {
                    name: m.name.clone(),
                    team_id: team.team_id.clone(),
                    first_hole: hole_id.clone(),
                    first_position: position,
                    value: m.value,
                    overrides: m.overrides,
                },
            );
        }
    }
}
