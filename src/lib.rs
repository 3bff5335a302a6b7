//! # golfjunk - Deterministic, Data-Driven Golf Side-Game Scoring
//!
//! A scoring engine for golf betting games played alongside a round:
//! - **Deterministic** scoring (same context → same scoreboard)
//! - **Data-driven** rules (no built-in junk or press names; everything
//!   comes from the options snapshot)
//! - **Incremental** rescoring (only holes an edit invalidates are redone)
//! - **Settlement** of the pot into player-to-player payments
//!
//! ## Core Concepts
//!
//! ### Hole Pipeline
//!
//! Each hole flows through a fixed pipeline:
//!
//! ```text
//! [gross/pops] → [team scores] → [ranks] → [junk] → [points]
//!              → [multipliers] → [hole totals] → [running totals]
//! ```
//!
//! 1. **Players** get pops from their handicap and a net score
//! 2. **Teams** combine their players by the configured method
//! 3. **Junk** awards additive points for score-to-par, ranks or marks
//! 4. **Multipliers** scale the hole: presses, and automatic ones such as BBQ
//!
//! ### Key Features
//!
//! - **Logic expressions**: JSON-logic conditions with golf operators
//!   (`rankWithTies`, `team_down_the_most`, `other_team_multiplied_with`)
//! - **Rest-of-nine presses**: stay active until the turn
//! - **Invalidation**: a hole graph decides which holes an edit touches
//! - **Match play**: holes-up status and "N & M" closeouts
//!
//! ## Example
//!
//! ```rust
//! use golfjunk::options::{JunkOption, OptionScope, Options};
//! use golfjunk::*;
//!
//! let mut options = Options::new();
//! options.insert(JunkOption::new("birdie", 1.0, OptionScope::Player).with_score_to_par("exactly -1"));
//!
//! let context = ScoringContext::new("game-1", options)
//!     .with_hole(
//!         GameHole::new("1")
//!             .with_par(4)
//!             .with_team(TeamAssignment::new("1", vec!["p1".into()]))
//!             .with_team(TeamAssignment::new("2", vec!["p2".into()])),
//!     )
//!     .with_round(Round::new("p1").with_score("1", HoleScores::new().with("gross", 3)))
//!     .with_round(Round::new("p2").with_score("1", HoleScores::new().with("gross", 4)));
//!
//! let mut scorer = GameScorer::new(context);
//! let scoreboard = scorer.scoreboard();
//! assert_eq!(scoreboard.cumulative.teams[&TeamId::from_str("1")].points_total, 1.0);
//! ```
//!
//! ## Modules
//!
//! - [`ids`] - Player, team and hole identifiers
//! - [`options`] - Game, junk and multiplier option records
//! - [`context`] - Everything one scoring pass reads
//! - [`ranking`] - Ranking with ties
//! - [`points`] - Points tables and point arithmetic
//! - [`handicap`] - Pops and net scores
//! - [`team`] - Team score methods
//! - [`logic`] - Logic expression evaluation
//! - [`junk`] - Junk evaluation
//! - [`multiplier`] - Press and automatic multipliers
//! - [`orchestrator`] - Hole and game scoring
//! - [`invalidation`] - Hole dependency graph and stale press detection
//! - [`scoreboard`] - Scoring results
//! - [`settlement`] - Pot payouts and debts
//! - [`error`] - Error types

pub mod context;
pub mod error;
pub mod handicap;
pub mod ids;
pub mod invalidation;
pub mod junk;
pub mod logic;
pub mod multiplier;
pub mod options;
pub mod orchestrator;
pub mod points;
pub mod ranking;
pub mod scoreboard;
pub mod settlement;
pub mod team;

// Re-export main types for convenience
pub use context::{GameHole, HoleScores, Round, ScoringContext, TeamAssignment, TeamOptionActivation};
pub use error::ScoringError;
pub use ids::{HoleId, PlayerId, TeamId};
pub use orchestrator::{score, GameScorer};
pub use scoreboard::{HoleResult, MatchDiff, Scoreboard};

// Re-export invalidation types
pub use invalidation::{
    detect_invalidations, detect_multiplier_invalidations, Change, Invalidation, InvalidationReport,
};

// Re-export settlement types
pub use settlement::{calculate_settlement, PlayerMetrics, PoolConfig, Settlement, SplitType};
