//! Multiplier engine.
//!
//! Two kinds of multiplier reach a hole:
//!
//! - presses, activated by a team from its recorded hole options, either
//!   for one hole (`hole` scope) or through the end of the current nine
//!   (`rest_of_nine`)
//! - automatic multipliers ("BBQs"), earned when a team or player wins the
//!   junk named in `based_on`
//!
//! Rest-of-nine presses are served from an [`ActiveMultiplierIndex`] built
//! as holes are scored forward, so a lookup never crosses a nine boundary.

use crate::context::ScoringContext;
use crate::ids::{HoleId, TeamId};
use crate::logic::{evaluate_logic, LogicContext};
use crate::options::{MultiplierOption, OptionScope, ValueFrom};
use crate::scoreboard::{AppliedMultiplier, HoleResult, Scoreboard};
use std::collections::BTreeMap;

/// A rest-of-nine press recorded on its activation hole.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveMultiplier {
    pub name: String,
    pub team_id: TeamId,
    pub first_hole: HoleId,
    /// Position of `first_hole` in game order.
    pub first_position: usize,
    pub value: f64,
    pub overrides: bool,
}

impl ActiveMultiplier {
    fn applied(&self) -> AppliedMultiplier {
        AppliedMultiplier {
            name: self.name.clone(),
            value: self.value,
            scope: OptionScope::RestOfNine,
            first_hole: Some(self.first_hole.clone()),
            earned: false,
            overrides: self.overrides,
        }
    }
}

/// Rest-of-nine presses, grouped by nine.
///
/// # Examples
///
/// ```rust
/// use golfjunk::multiplier::{ActiveMultiplier, ActiveMultiplierIndex};
///
/// let mut index = ActiveMultiplierIndex::new();
/// index.record(0, ActiveMultiplier {
///     name: "pre_double".into(),
///     team_id: "1".into(),
///     first_hole: "1".into(),
///     first_position: 0,
///     value: 2.0,
///     overrides: false,
/// });
///
/// assert_eq!(index.active_on(0, 8, &"1".into()).count(), 1);
/// assert_eq!(index.active_on(1, 9, &"1".into()).count(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveMultiplierIndex {
    by_nine: BTreeMap<u32, Vec<ActiveMultiplier>>,
}

impl ActiveMultiplierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press. A press already recorded for the same team and
    /// activation hole is kept as is.
    pub fn record(&mut self, nine: u32, entry: ActiveMultiplier) {
        let entries = self.by_nine.entry(nine).or_default();
        let exists = entries.iter().any(|e| {
            e.name == entry.name && e.team_id == entry.team_id && e.first_hole == entry.first_hole
        });
        if !exists {
            entries.push(entry);
        }
    }

    /// Presses active for `team_id` on the hole at `position` in `nine`.
    pub fn active_on<'a>(
        &'a self,
        nine: u32,
        position: usize,
        team_id: &'a TeamId,
    ) -> impl Iterator<Item = &'a ActiveMultiplier> {
        self.by_nine
            .get(&nine)
            .into_iter()
            .flatten()
            .filter(move |e| &e.team_id == team_id && e.first_position <= position)
    }

    /// Drop every press activated at or after `position`.
    pub fn truncate_from(&mut self, position: usize) {
        for entries in self.by_nine.values_mut() {
            entries.retain(|e| e.first_position < position);
        }
    }

    /// Rebuild the index from the rest-of-nine presses of scored holes
    /// before `position`.
    pub fn from_scoreboard(scoreboard: &Scoreboard, context: &ScoringContext, position: usize) -> Self {
        let mut index = Self::new();
        for (i, hole_id) in scoreboard.meta.holes_played.iter().enumerate().take(position) {
            let Some(hole) = scoreboard.hole(hole_id) else {
                continue;
            };
            let nine = context.nine_of(hole_id);
            for team in hole.teams.values() {
                for m in &team.multipliers {
                    if m.scope != OptionScope::RestOfNine || m.first_hole.as_ref() != Some(hole_id) {
                        continue;
                    }
                    index.record(
                        nine,
                        ActiveMultiplier {
                            name: m.name.clone(),
                            team_id: team.team_id.clone(),
                            first_hole: hole_id.clone(),
                            first_position: i,
                            value: m.value,
                            overrides: m.overrides,
                        },
                    );
                }
            }
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.by_nine.values().all(|e| e.is_empty())
    }
}

/// Evaluate a multiplier's availability; blank availability always holds.
pub fn evaluate_availability(option: &MultiplierOption, ctx: &LogicContext<'_>) -> bool {
    match option.availability_expr() {
        None => true,
        Some(expr) => evaluate_logic(expr, ctx),
    }
}

/// The value a multiplier applies with: its static `value`, or the value
/// read from the game when `value_from` is set.
pub fn multiplier_value(option: &MultiplierOption, context: &ScoringContext) -> f64 {
    match option.value_from {
        None => option.value,
        Some(ValueFrom::FrontNinePreDoubleTotal) => context.front_nine_pre_double_total(),
        Some(ValueFrom::Unknown) => {
            log::warn!("multiplier {}: unknown value_from, using {}", option.name, option.value);
            option.value
        }
    }
}

/// Combined factor of a set of multipliers.
///
/// Multipliers stack multiplicatively, unless one of them overrides, in
/// which case its value alone applies.
///
/// # Examples
///
/// ```rust
/// use golfjunk::multiplier::calculate_total_multiplier;
/// use golfjunk::options::OptionScope;
/// use golfjunk::scoreboard::AppliedMultiplier;
///
/// let double = AppliedMultiplier {
///     name: "double".into(),
///     value: 2.0,
///     scope: OptionScope::Hole,
///     first_hole: None,
///     earned: false,
///     overrides: false,
/// };
/// assert_eq!(calculate_total_multiplier(&[]), 1.0);
/// assert_eq!(calculate_total_multiplier(&[double.clone(), double.clone()]), 4.0);
///
/// let custom = AppliedMultiplier { name: "custom".into(), value: 3.0, overrides: true, ..double.clone() };
/// assert_eq!(calculate_total_multiplier(&[double, custom]), 3.0);
/// ```
pub fn calculate_total_multiplier(multipliers: &[AppliedMultiplier]) -> f64 {
    if let Some(overriding) = multipliers.iter().find(|m| m.overrides) {
        return overriding.value;
    }
    multipliers.iter().map(|m| m.value).product()
}

/// The multiplier applied to every team's points on a hole: the combined
/// factor of every press and BBQ in play, whoever holds it.
pub fn hole_multiplier(hole: &HoleResult) -> f64 {
    let all: Vec<AppliedMultiplier> = hole
        .teams
        .values()
        .flat_map(|t| t.multipliers.iter())
        .chain(hole.players.values().flat_map(|p| p.multipliers.iter()))
        .cloned()
        .collect();
    calculate_total_multiplier(&all)
}

/// Apply every multiplier in play on a hole.
///
/// Presses come first, in `seq` order, so that a responsive press such as
/// a double back sees the presses already on the hole. Automatic
/// multipliers follow; they read `team.points` and the hole's possible
/// points, which must already be set.
pub fn evaluate_multipliers_for_hole(
    hole: &mut HoleResult,
    context: &ScoringContext,
    scoreboard: &Scoreboard,
    index: &mut ActiveMultiplierIndex,
) {
    let position = scoreboard
        .meta
        .holes_played
        .iter()
        .position(|h| h == &hole.hole)
        .unwrap_or(0);
    let nine = context.nine_of(&hole.hole);

    for option in context.options.multipliers() {
        if option.is_user_activated() {
            apply_press(option, hole, context, scoreboard, index, nine, position);
        } else if option.trigger_junk().is_some() {
            apply_automatic(option, hole, context, scoreboard);
        }
    }
}

fn apply_press(
    option: &MultiplierOption,
    hole: &mut HoleResult,
    context: &ScoringContext,
    scoreboard: &Scoreboard,
    index: &mut ActiveMultiplierIndex,
    nine: u32,
    position: usize,
) {
    let better_points = context.better_points();
    let game_hole = context.game_hole(&hole.hole);
    let value = multiplier_value(option, context);
    let mut awards: Vec<(TeamId, AppliedMultiplier)> = Vec::new();

    // A record carried over from an earlier hole only counts inside the
    // nine it was pressed in.
    let in_this_nine = |first_hole: Option<&HoleId>| match first_hole {
        Some(first) if first != &hole.hole => context.nine_of(first) == nine,
        _ => true,
    };

    for team_id in hole.teams.keys() {
        let activation = game_hole
            .and_then(|g| g.team(team_id))
            .and_then(|t| {
                t.options.iter().find(|a| {
                    a.option_name == option.name
                        && a.player_id.is_none()
                        && a.is_on()
                        && in_this_nine(a.first_hole.as_ref())
                })
            });

        if let Some(activation) = activation {
            let first_hole = activation.first_hole.clone().unwrap_or_else(|| hole.hole.clone());
            if first_hole == hole.hole {
                let ctx = LogicContext::new(scoreboard, hole)
                    .for_team(team_id)
                    .with_possible_points(hole.possible_points)
                    .with_better_points(better_points);
                if !evaluate_availability(option, &ctx) {
                    log::debug!(
                        "hole {}: team {} cannot press {}",
                        hole.hole,
                        team_id,
                        option.name
                    );
                    continue;
                }
            }
            if option.scope == OptionScope::RestOfNine && first_hole == hole.hole {
                index.record(
                    nine,
                    ActiveMultiplier {
                        name: option.name.clone(),
                        team_id: team_id.clone(),
                        first_hole: first_hole.clone(),
                        first_position: position,
                        value,
                        overrides: option.overrides,
                    },
                );
            }
            awards.push((
                team_id.clone(),
                AppliedMultiplier {
                    name: option.name.clone(),
                    value,
                    scope: option.scope,
                    first_hole: Some(first_hole),
                    earned: false,
                    overrides: option.overrides,
                },
            ));
            continue;
        }

        if option.scope == OptionScope::RestOfNine {
            if let Some(active) = index
                .active_on(nine, position, team_id)
                .find(|e| e.name == option.name)
            {
                awards.push((team_id.clone(), active.applied()));
            }
        }
    }

    for (team_id, applied) in awards {
        if let Some(team) = hole.teams.get_mut(&team_id) {
            if !team.has_multiplier(&applied.name) {
                log::debug!("hole {}: team {} has {}", hole.hole, team_id, applied.name);
                team.multipliers.push(applied);
            }
        }
    }
}

fn apply_automatic(option: &MultiplierOption, hole: &mut HoleResult, context: &ScoringContext, scoreboard: &Scoreboard) {
    let Some(junk_name) = option.trigger_junk() else {
        return;
    };
    let better_points = context.better_points();
    let earned = |scope: OptionScope| AppliedMultiplier {
        name: option.name.clone(),
        value: option.value,
        scope,
        first_hole: None,
        earned: true,
        overrides: option.overrides,
    };

    if option.scope == OptionScope::Player {
        let view: &HoleResult = hole;
        let winners: Vec<_> = view
            .players
            .values()
            .filter(|p| p.has_junk(junk_name))
            .filter(|p| {
                let mut ctx = LogicContext::new(scoreboard, view)
                    .for_player(&p.player_id)
                    .with_possible_points(view.possible_points)
                    .with_better_points(better_points);
                if let Some(team_id) = p.team_id.as_ref() {
                    ctx = ctx.for_team(team_id);
                }
                evaluate_availability(option, &ctx)
            })
            .map(|p| p.player_id.clone())
            .collect();
        for player_id in winners {
            if let Some(player) = hole.players.get_mut(&player_id) {
                player.multipliers.push(earned(OptionScope::Player));
            }
        }
        return;
    }

    let view: &HoleResult = hole;
    let winners: Vec<TeamId> = view
        .teams
        .keys()
        .filter(|team_id| view.team_has_junk(team_id, junk_name))
        .filter(|team_id| {
            let ctx = LogicContext::new(scoreboard, view)
                .for_team(team_id)
                .with_possible_points(view.possible_points)
                .with_better_points(better_points);
            evaluate_availability(option, &ctx)
        })
        .cloned()
        .collect();
    for team_id in winners {
        if let Some(team) = hole.teams.get_mut(&team_id) {
            log::debug!("hole {}: team {} earns {}", hole.hole, team_id, option.name);
            team.multipliers.push(earned(option.scope));
        }
    }
}
