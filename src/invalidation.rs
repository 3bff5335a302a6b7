//! Invalidation engine.
//!
//! Decides which holes must be recomputed after an input changes, and which
//! recorded presses a retroactive score edit has made stale.
//!
//! Holes form a dependency graph: each hole depends on the hole played
//! before it in the same nine, because rest-of-nine presses carry forward.
//! When any option reads standings from another hole, the last hole of
//! each nine also feeds the first hole of the next. Everything reachable
//! from the changed hole is recomputed; over-reporting is acceptable,
//! under-reporting is not.

use crate::context::ScoringContext;
use crate::error::ScoringError;
use crate::ids::{HoleId, PlayerId, TeamId};
use crate::logic::LogicContext;
use crate::multiplier::evaluate_availability;
use crate::options::{MultiplierOption, OptionScope};
use crate::scoreboard::Scoreboard;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Operators that read standings from a hole other than the current one.
const STANDINGS_OPERATORS: &[&str] = &["getPrevHole", "team_down_the_most", "team_second_to_last"];

const DEFAULT_REASON: &str = "Availability condition no longer met";

/// An input change reported by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// A player's recorded score or junk on a hole.
    Score { hole: HoleId, player: PlayerId },
    /// A team option toggled on a hole, such as a press.
    TeamOption { hole: HoleId, team: TeamId, option: String },
    /// Hole setup: par, allocation, team assignments or option overrides.
    Hole { hole: HoleId },
    /// The game's options snapshot.
    Options,
}

impl Change {
    pub fn hole(&self) -> Option<&HoleId> {
        match self {
            Change::Score { hole, .. } | Change::TeamOption { hole, .. } | Change::Hole { hole } => Some(hole),
            Change::Options => None,
        }
    }
}

/// What a change requires recomputing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invalidation {
    /// Holes to rescore, in play order.
    pub holes: Vec<HoleId>,
    /// First hole from which running and cumulative totals must be refolded.
    pub cumulative_from: Option<HoleId>,
}

impl Invalidation {
    pub fn contains(&self, hole: &HoleId) -> bool {
        self.holes.contains(hole)
    }

    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }
}

/// Dependency graph over holes. An edge `a → b` means `b` must be
/// recomputed whenever `a` is.
///
/// # Examples
///
/// ```rust
/// use golfjunk::invalidation::HoleGraph;
/// use golfjunk::HoleId;
///
/// let mut graph = HoleGraph::new();
/// graph.add_edge(HoleId::from_str("1"), HoleId::from_str("2"));
/// graph.add_edge(HoleId::from_str("2"), HoleId::from_str("3"));
///
/// let downstream = graph.downstream(&HoleId::from_str("2"));
/// assert_eq!(downstream.len(), 2);
/// assert!(!downstream.contains(&HoleId::from_str("1")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct HoleGraph {
    graph: DiGraph<HoleId, ()>,
    node_map: HashMap<HoleId, NodeIndex>,
}

impl HoleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a game.
    pub fn for_context(context: &ScoringContext) -> Self {
        let order = context.hole_order();
        let across_nines = reads_standings(context);

        let mut graph = Self::new();
        for hole in &order {
            graph.add_node(hole.clone());
        }
        for pair in order.windows(2) {
            let same_nine = context.nine_of(&pair[0]) == context.nine_of(&pair[1]);
            if same_nine || across_nines {
                graph.add_edge(pair[0].clone(), pair[1].clone());
            }
        }
        graph
    }

    /// Add a hole if it is not already present.
    pub fn add_node(&mut self, hole: HoleId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&hole) {
            idx
        } else {
            let idx = self.graph.add_node(hole.clone());
            self.node_map.insert(hole, idx);
            idx
        }
    }

    /// `to` depends on `from`.
    pub fn add_edge(&mut self, from: HoleId, to: HoleId) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    pub fn contains_node(&self, hole: &HoleId) -> bool {
        self.node_map.contains_key(hole)
    }

    pub fn nodes(&self) -> Vec<HoleId> {
        self.graph.node_indices().map(|idx| self.graph[idx].clone()).collect()
    }

    /// Holes reachable from `hole`, itself included.
    pub fn downstream(&self, hole: &HoleId) -> BTreeSet<HoleId> {
        let mut reached = BTreeSet::new();
        let Some(&start) = self.node_map.get(hole) else {
            return reached;
        };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            reached.insert(self.graph[idx].clone());
        }
        reached
    }

    /// Fail with the cycle path if the graph has a cycle.
    ///
    /// A cycle only appears when a hole list repeats a hole.
    pub fn detect_cycles(&self) -> Result<(), ScoringError> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        for node in self.graph.node_indices() {
            if !visited.contains(&node) {
                let mut path = Vec::new();
                if let Some(cycle) = self.dfs_cycle(node, &mut visited, &mut on_stack, &mut path) {
                    return Err(cycle);
                }
            }
        }
        Ok(())
    }

    fn dfs_cycle(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<HoleId>,
    ) -> Option<ScoringError> {
        visited.insert(node);
        on_stack.insert(node);
        path.push(self.graph[node].clone());

        for next in self.graph.neighbors_directed(node, petgraph::Direction::Outgoing) {
            if !visited.contains(&next) {
                if let Some(cycle) = self.dfs_cycle(next, visited, on_stack, path) {
                    return Some(cycle);
                }
            } else if on_stack.contains(&next) {
                let hole = self.graph[next].clone();
                let start = path.iter().position(|h| h == &hole).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(hole);
                return Some(ScoringError::Cycle { path: cycle });
            }
        }

        on_stack.remove(&node);
        path.pop();
        None
    }

    /// Holes in recompute order: every hole after the holes it depends on.
    pub fn topological_sort(&self) -> Result<Vec<HoleId>, ScoringError> {
        self.detect_cycles()?;
        toposort(&self.graph, None)
            .map(|indices| indices.into_iter().map(|idx| self.graph[idx].clone()).collect())
            .map_err(|cycle| ScoringError::Cycle {
                path: vec![self.graph[cycle.node_id()].clone()],
            })
    }
}

/// Whether any option reads state from earlier holes across a nine:
/// an expression over standings, or a multiplier whose value comes from
/// the front nine.
pub fn reads_standings(context: &ScoringContext) -> bool {
    context
        .options
        .expressions()
        .any(|expr| STANDINGS_OPERATORS.iter().any(|op| expr.contains(op)))
        || context.options.multipliers().any(|m| m.value_from.is_some())
}

/// Holes and totals to recompute after `change`.
///
/// # Examples
///
/// ```rust
/// use golfjunk::invalidation::{detect_invalidations, Change};
/// use golfjunk::options::Options;
/// use golfjunk::{GameHole, ScoringContext};
///
/// let mut context = ScoringContext::new("g", Options::new());
/// for n in 1..=18 {
///     context = context.with_hole(GameHole::new(n.to_string().as_str()));
/// }
///
/// let change = Change::Hole { hole: "3".into() };
/// let invalidation = detect_invalidations(&context, &change).unwrap();
/// assert_eq!(invalidation.holes.len(), 7);
/// assert!(!invalidation.contains(&"10".into()));
/// assert_eq!(invalidation.cumulative_from, Some("3".into()));
/// ```
pub fn detect_invalidations(context: &ScoringContext, change: &Change) -> Result<Invalidation, ScoringError> {
    let graph = HoleGraph::for_context(context);
    graph.detect_cycles()?;
    let order = context.hole_order();

    let Some(hole) = change.hole() else {
        return Ok(Invalidation {
            cumulative_from: order.first().cloned(),
            holes: order,
        });
    };
    if !graph.contains_node(hole) {
        return Err(ScoringError::UnknownHole(hole.clone()));
    }

    let reached = graph.downstream(hole);
    let holes: Vec<HoleId> = order.into_iter().filter(|h| reached.contains(h)).collect();
    log::debug!("change on hole {} invalidates {} holes", hole, holes.len());
    Ok(Invalidation {
        holes,
        cumulative_from: Some(hole.clone()),
    })
}

/// A recorded selection that no longer holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidatedItem {
    #[serde(rename_all = "camelCase")]
    Multiplier {
        hole: HoleId,
        team_id: TeamId,
        name: String,
        disp: String,
        reason: String,
    },
}

impl InvalidatedItem {
    fn key(&self) -> (&HoleId, &TeamId, &str) {
        match self {
            InvalidatedItem::Multiplier { hole, team_id, name, .. } => (hole, team_id, name.as_str()),
        }
    }
}

/// A team's points total before and after an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreImpact {
    pub team_id: TeamId,
    pub current: f64,
    pub projected: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationReport {
    pub items: Vec<InvalidatedItem>,
    pub score_impact: Vec<ScoreImpact>,
    pub has_invalidations: bool,
}

/// Find presses recorded after `edited_hole` whose availability fails
/// against the rescored game.
///
/// `before` and `after` are the scoreboards either side of the edit. A
/// rest-of-nine press is judged once, on its activation hole. Presses
/// whose availability names a stale press through
/// `other_team_multiplied_with` are reported as well.
pub fn detect_multiplier_invalidations(
    before: &Scoreboard,
    after: &Scoreboard,
    context: &ScoringContext,
    edited_hole: &HoleId,
) -> Result<InvalidationReport, ScoringError> {
    let order = context.hole_order();
    let Some(edited) = order.iter().position(|h| h == edited_hole) else {
        return Err(ScoringError::UnknownHole(edited_hole.clone()));
    };

    let presses: Vec<&MultiplierOption> = context
        .options
        .multipliers()
        .filter(|m| m.is_user_activated() && m.availability_expr().is_some())
        .collect();
    let better_points = context.better_points();

    let mut items: Vec<InvalidatedItem> = Vec::new();
    let mut judged: HashSet<(String, TeamId, HoleId)> = HashSet::new();

    for hole_id in order.iter().skip(edited + 1) {
        let Some(game_hole) = context.game_hole(hole_id) else {
            continue;
        };
        for assignment in &game_hole.teams {
            for activation in assignment.options.iter().filter(|a| a.player_id.is_none() && a.is_on()) {
                let Some(option) = presses.iter().find(|m| m.name == activation.option_name) else {
                    continue;
                };
                let Some(first_hole) = activation.first_hole.as_ref() else {
                    continue;
                };
                if option.scope == OptionScope::RestOfNine {
                    let key = (option.name.clone(), assignment.team.clone(), first_hole.clone());
                    if !judged.insert(key) {
                        continue;
                    }
                } else if first_hole != hole_id {
                    continue;
                }

                let Some(result) = after.hole(first_hole) else {
                    continue;
                };
                if !result.teams.contains_key(&assignment.team) {
                    continue;
                }
                let ctx = LogicContext::new(after, result)
                    .for_team(&assignment.team)
                    .with_possible_points(result.possible_points)
                    .with_better_points(better_points);
                if !evaluate_availability(option, &ctx) {
                    items.push(InvalidatedItem::Multiplier {
                        hole: first_hole.clone(),
                        team_id: assignment.team.clone(),
                        name: option.name.clone(),
                        disp: option.disp.clone(),
                        reason: option
                            .invalidation_reason
                            .clone()
                            .unwrap_or_else(|| DEFAULT_REASON.to_string()),
                    });
                }
            }
        }
    }

    for item in cascade(&items, context) {
        if !items.iter().any(|i| i.key() == item.key()) {
            items.push(item);
        }
    }

    let score_impact = after
        .cumulative
        .teams
        .values()
        .map(|t| ScoreImpact {
            team_id: t.team_id.clone(),
            current: before
                .cumulative
                .teams
                .get(&t.team_id)
                .map(|b| b.points_total)
                .unwrap_or(0.0),
            projected: t.points_total,
        })
        .collect();

    Ok(InvalidationReport {
        has_invalidations: !items.is_empty(),
        items,
        score_impact,
    })
}

/// Presses of other teams that were only available because of a stale one.
fn cascade(items: &[InvalidatedItem], context: &ScoringContext) -> Vec<InvalidatedItem> {
    let mut dependents = Vec::new();
    for item in items {
        let InvalidatedItem::Multiplier { hole, team_id, name, disp, .. } = item;
        let quoted = [format!("'{}'", name), format!("\"{}\"", name)];
        let Some(game_hole) = context.game_hole(hole) else {
            continue;
        };

        for option in context.options.multipliers() {
            let Some(expr) = option.availability_expr() else {
                continue;
            };
            if !expr.contains("other_team_multiplied_with") || !quoted.iter().any(|q| expr.contains(q.as_str())) {
                continue;
            }
            for assignment in game_hole.teams.iter().filter(|t| &t.team != team_id) {
                let activated = assignment.options.iter().any(|a| {
                    a.option_name == option.name && a.player_id.is_none() && a.first_hole.as_ref() == Some(hole)
                });
                if activated {
                    dependents.push(InvalidatedItem::Multiplier {
                        hole: hole.clone(),
                        team_id: assignment.team.clone(),
                        name: option.name.clone(),
                        disp: option.disp.clone(),
                        reason: format!("Depends on team {}'s {}", team_id, disp),
                    });
                }
            }
        }
    }
    dependents
}
