use golfjunk::options::{GameOption, MultiplierOption, OptionScope, Options, ValueType};
use golfjunk::*;

/// Eighteen holes of 1v1 with a rest-of-nine press available to both teams.
/// `gross` gives player 1's score per hole; player 2 always makes 5.
fn game(gross: impl Fn(usize) -> i32, presses: &[(&str, &str)]) -> ScoringContext {
    let mut options = Options::new();
    options.insert(MultiplierOption::press("pre_double", 2.0, OptionScope::RestOfNine));
    options.insert(GameOption {
        name: "points_table".into(),
        disp: String::new(),
        value_type: ValueType::Text,
        value: Some(serde_json::json!(r#"[{"rank": 1, "tieCount": 1, "points": 1}]"#)),
        default_value: None,
    });

    let mut context = ScoringContext::new("game", options);
    let mut p1 = Round::new("p1");
    let mut p2 = Round::new("p2");
    for n in 1..=18 {
        let id = n.to_string();
        let mut teams = vec![
            TeamAssignment::new("1", vec!["p1".into()]),
            TeamAssignment::new("2", vec!["p2".into()]),
        ];
        for (hole, team) in presses {
            if *hole == id {
                let i = if *team == "1" { 0 } else { 1 };
                teams[i]
                    .options
                    .push(TeamOptionActivation::new("pre_double", HoleId::from_str(hole)));
            }
        }
        let mut hole = GameHole::new(id.as_str()).with_par(4);
        for team in teams {
            hole = hole.with_team(team);
        }
        context = context.with_hole(hole);
        p1 = p1.with_score(id.as_str(), HoleScores::new().with("gross", gross(n)));
        p2 = p2.with_score(id.as_str(), HoleScores::new().with("gross", 5));
    }
    context.with_round(p1).with_round(p2)
}

fn hole_ids(invalidation: &Invalidation) -> Vec<&str> {
    invalidation.holes.iter().map(|h| h.as_str()).collect()
}

// ============================================================================
// Hole invalidation
// ============================================================================

/// A score edit on the back nine touches only the rest of the back nine.
#[test]
fn test_score_edit_stays_in_its_nine() {
    let context = game(|_| 4, &[]);
    let change = Change::Score {
        hole: "14".into(),
        player: "p1".into(),
    };
    let invalidation = detect_invalidations(&context, &change).unwrap();
    assert_eq!(hole_ids(&invalidation), vec!["14", "15", "16", "17", "18"]);
    assert_eq!(invalidation.cumulative_from, Some(HoleId::from_str("14")));
}

/// A press toggle on the front nine never reaches the back nine.
#[test]
fn test_press_toggle_stops_at_the_turn() {
    let context = game(|_| 4, &[("7", "2")]);
    let change = Change::TeamOption {
        hole: "7".into(),
        team: "2".into(),
        option: "pre_double".into(),
    };
    let invalidation = detect_invalidations(&context, &change).unwrap();
    assert_eq!(hole_ids(&invalidation), vec!["7", "8", "9"]);
}

/// Changing the options snapshot invalidates the whole game.
#[test]
fn test_options_change_invalidates_everything() {
    let context = game(|_| 4, &[]);
    let invalidation = detect_invalidations(&context, &Change::Options).unwrap();
    assert_eq!(invalidation.holes.len(), 18);
}

/// Edits to a hole the game does not have are rejected.
#[test]
fn test_unknown_hole() {
    let context = game(|_| 4, &[]);
    let change = Change::Hole { hole: "19".into() };
    assert!(matches!(
        detect_invalidations(&context, &change),
        Err(ScoringError::UnknownHole(_))
    ));
}

// ============================================================================
// Incremental rescoring
// ============================================================================

/// Rescoring only what a score edit invalidates matches a full pass.
#[test]
fn test_rescore_after_score_edit() {
    let before = game(|_| 4, &[("2", "2")]);
    let mut scorer = GameScorer::new(before);
    scorer.scoreboard();

    let after = game(|n| if n == 12 { 6 } else { 4 }, &[("2", "2")]);
    let change = Change::Score {
        hole: "12".into(),
        player: "p1".into(),
    };
    let expected = score(&after);
    let rescored = scorer.apply(after, &change).unwrap();

    assert_eq!(rescored, &expected);
    let twelfth = rescored.hole(&"12".into()).unwrap();
    assert_eq!(twelfth.teams[&TeamId::from_str("2")].hole_total, 1.0);
}

/// Adding a rest-of-nine press mid-nine rescored incrementally matches a full pass.
#[test]
fn test_rescore_after_press_toggle() {
    let mut scorer = GameScorer::new(game(|_| 4, &[]));
    scorer.scoreboard();

    let after = game(|_| 4, &[("4", "2")]);
    let change = Change::TeamOption {
        hole: "4".into(),
        team: "2".into(),
        option: "pre_double".into(),
    };
    let expected = score(&after);
    let rescored = scorer.apply(after, &change).unwrap();

    assert_eq!(rescored, &expected);
    let multipliers: Vec<f64> = rescored.holes_in_order().map(|h| h.hole_multiplier).collect();
    assert_eq!(&multipliers[..3], &[1.0, 1.0, 1.0]);
    assert!(multipliers[3..9].iter().all(|m| *m == 2.0));
    assert!(multipliers[9..].iter().all(|m| *m == 1.0));

    let team1 = &rescored.cumulative.teams[&TeamId::from_str("1")];
    assert_eq!(team1.points_total, 3.0 + 6.0 * 2.0 + 9.0);
}

// ============================================================================
// Stale presses
// ============================================================================

/// A press that no longer meets its availability after an edit is reported.
#[test]
fn test_stale_press_reported() {
    let mut options = Options::new();
    options.insert(
        MultiplierOption::press("double", 2.0, OptionScope::Hole)
            .with_availability("{'team_down_the_most': [{'getPrevHole': []}, {'var': 'team'}]}"),
    );
    let build = |p1_first: i32| {
        let mut context = game(|n| if n == 1 { p1_first } else { 4 }, &[]);
        context.options.insert(options.multiplier_option("double").unwrap().clone());
        context.holes[1].teams[0]
            .options
            .push(TeamOptionActivation::new("double", HoleId::from_str("2")));
        context
    };

    // Player 1 loses hole 1, so team 1 may press on hole 2.
    let before_ctx = build(6);
    let before = score(&before_ctx);
    assert!(before.hole(&"2".into()).unwrap().teams[&TeamId::from_str("1")].has_multiplier("double"));

    // After the edit player 1 won hole 1 and the press is no longer allowed.
    let after_ctx = build(4);
    let after = score(&after_ctx);
    let report = detect_multiplier_invalidations(&before, &after, &after_ctx, &"1".into()).unwrap();

    assert!(report.has_invalidations);
    assert_eq!(report.items.len(), 1);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["items"][0]["name"], "double");
    assert_eq!(json["items"][0]["teamId"], "1");
}
