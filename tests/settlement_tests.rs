use chrono::{TimeZone, Utc};
use golfjunk::options::{GameOption, JunkOption, OptionScope, Options, ValueType};
use golfjunk::settlement::{metrics_from_scoreboard, reconcile_debts};
use golfjunk::*;
use std::collections::BTreeMap;

/// Three players, two par 4s, stroke points 3/2/1 plus a birdie.
fn stroke_game() -> ScoringContext {
    let mut options = Options::new();
    options.insert(GameOption {
        name: "points_table".into(),
        disp: String::new(),
        value_type: ValueType::Text,
        value: Some(serde_json::json!(
            r#"[{"rank": 1, "tieCount": 1, "points": 3}, {"rank": 2, "tieCount": 1, "points": 2}, {"rank": 3, "tieCount": 1, "points": 1}]"#
        )),
        default_value: None,
    });
    options.insert(JunkOption::new("birdie", 1.0, OptionScope::Player).with_score_to_par("exactly -1"));

    let mut context = ScoringContext::new("settle", options)
        .with_hole(GameHole::new("1").with_par(4))
        .with_hole(GameHole::new("2").with_par(4));
    for (player, first, second) in [("p1", 3, 4), ("p2", 4, 5), ("p3", 5, 6)] {
        context = context.with_round(
            Round::new(player)
                .with_score("1", HoleScores::new().with("gross", first))
                .with_score("2", HoleScores::new().with("gross", second)),
        );
    }
    context
}

fn named_metrics(scoreboard: &Scoreboard) -> Vec<PlayerMetrics> {
    metrics_from_scoreboard(scoreboard)
        .into_iter()
        .map(|mut m| {
            m.player_name = m.player_id.as_str().to_uppercase();
            m
        })
        .collect()
}

// ============================================================================
// Scoreboard to settlement
// ============================================================================

/// Metrics come straight from the cumulative totals.
#[test]
fn test_metrics_from_scoreboard() {
    let metrics = metrics_from_scoreboard(&score(&stroke_game()));
    let p1 = metrics.iter().find(|m| m.player_id.as_str() == "p1").unwrap();
    assert_eq!(p1.metrics["points"], 7.0);
    assert_eq!(p1.metrics["junk"], 1.0);
    assert_eq!(p1.metrics["net_total"], 7.0);
    assert_eq!(p1.metrics["holes_played"], 2.0);
}

/// Places on points and a per-birdie pool settle into two payments.
#[test]
fn test_settle_scored_game() {
    let scoreboard = score(&stroke_game());
    let pools = vec![
        PoolConfig::new("points", 50.0, "points", SplitType::Places).with_places(2),
        PoolConfig::new("birdies", 50.0, "junk", SplitType::PerUnit),
    ];
    let at = Utc.with_ymd_and_hms(2026, 6, 14, 17, 30, 0).unwrap();
    let settlement = calculate_settlement(&pools, &named_metrics(&scoreboard), 90.0, at);

    assert_eq!(settlement.buy_in, 30.0);
    let paid: Vec<(&str, &str, f64)> = settlement
        .payouts
        .iter()
        .map(|p| (p.pool_name.as_str(), p.player_id.as_str(), p.amount))
        .collect();
    assert_eq!(
        paid,
        vec![("points", "p1", 27.0), ("points", "p2", 18.0), ("birdies", "p1", 45.0)]
    );

    assert_eq!(settlement.net_positions[&PlayerId::from_str("p1")], 42.0);
    assert_eq!(settlement.net_positions[&PlayerId::from_str("p2")], -12.0);
    assert_eq!(settlement.net_positions[&PlayerId::from_str("p3")], -30.0);

    let debts: Vec<(&str, &str, f64)> = settlement
        .debts
        .iter()
        .map(|d| (d.from_player_name.as_str(), d.to_player_name.as_str(), d.amount))
        .collect();
    assert_eq!(debts, vec![("P3", "P1", 30.0), ("P2", "P1", 12.0)]);
}

/// The settlement record carries the caller's timestamp and serializes in camelCase.
#[test]
fn test_settlement_json() {
    let at = Utc.with_ymd_and_hms(2026, 6, 14, 17, 30, 0).unwrap();
    let pools = vec![PoolConfig::new("overall", 100.0, "points", SplitType::WinnerTakeAll)];
    let settlement = calculate_settlement(&pools, &named_metrics(&score(&stroke_game())), 30.0, at);

    let json = serde_json::to_value(&settlement).unwrap();
    assert_eq!(json["potTotal"], 30.0);
    assert_eq!(json["payouts"][0]["poolName"], "overall");
    assert_eq!(json["calculatedAt"], "2026-06-14T17:30:00Z");

    let restored: Settlement = serde_json::from_value(json).unwrap();
    assert_eq!(restored, settlement);
}

/// Pools read from JSON use the persisted field names.
#[test]
fn test_pool_config_from_json() {
    let json = r#"{"name": "skins", "pct": 25, "metric": "skins", "splitType": "per_unit"}"#;
    let pool: PoolConfig = serde_json::from_str(json).unwrap();
    assert_eq!(pool.split_type, SplitType::PerUnit);
    assert_eq!(pool.places_paid, None);
}

// ============================================================================
// Debt reconciliation
// ============================================================================

/// Several winners and losers settle in at most n - 1 payments.
#[test]
fn test_reconcile_many_players() {
    let net: BTreeMap<PlayerId, f64> = [("a", 25.0), ("b", -10.0), ("c", 15.0), ("d", -20.0), ("e", -10.0)]
        .into_iter()
        .map(|(id, v)| (PlayerId::from_str(id), v))
        .collect();
    let debts = reconcile_debts(&net, &BTreeMap::new());

    assert!(debts.len() <= 4);
    let mut balance: BTreeMap<&str, f64> = BTreeMap::new();
    for debt in &debts {
        *balance.entry(debt.from_player_id.as_str()).or_default() -= debt.amount;
        *balance.entry(debt.to_player_id.as_str()).or_default() += debt.amount;
    }
    for (id, value) in &net {
        let settled = balance.get(id.as_str()).copied().unwrap_or(0.0);
        assert!((settled - value).abs() < 0.01, "{} settled {} of {}", id, settled, value);
    }
}
