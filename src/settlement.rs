//! Settlement engine.
//!
//! Splits a pot across payout pools, works out what each player is up or
//! down against an equal buy-in, and reduces that to a short list of
//! player-to-player payments.
//!
//! Amounts are rounded to cents. Within a pool the last recipient absorbs
//! the rounding remainder, and across pools the last pool does, so every
//! pool and the pot as a whole sum exactly.

use crate::ids::PlayerId;
use crate::points::calculate_position_points;
use crate::ranking::{rank_with_ties, RankDirection};
use crate::scoreboard::Scoreboard;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Net positions and payments below this are treated as settled.
const SETTLED: f64 = 0.01;

/// How a pool is divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    /// A percentage per finishing place.
    Places,
    /// In proportion to each player's metric, such as skins won.
    PerUnit,
    /// Everything to the top player.
    WinnerTakeAll,
}

/// One payout pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    pub name: String,
    #[serde(default)]
    pub disp: String,
    /// Share of the pot, in percent.
    pub pct: f64,
    /// Metric the pool is ranked on; higher is better.
    pub metric: String,
    pub split_type: SplitType,
    #[serde(default)]
    pub places_paid: Option<u32>,
    #[serde(default)]
    pub payout_pcts: Option<Vec<f64>>,
}

impl PoolConfig {
    pub fn new(name: impl Into<String>, pct: f64, metric: impl Into<String>, split_type: SplitType) -> Self {
        Self {
            name: name.into(),
            disp: String::new(),
            pct,
            metric: metric.into(),
            split_type,
            places_paid: None,
            payout_pcts: None,
        }
    }

    pub fn with_places(mut self, places_paid: u32) -> Self {
        self.places_paid = Some(places_paid);
        self
    }

    pub fn with_payout_pcts(mut self, pcts: Vec<f64>) -> Self {
        self.payout_pcts = Some(pcts);
        self
    }
}

/// A player's summary metrics for settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMetrics {
    pub player_id: PlayerId,
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl PlayerMetrics {
    pub fn new(player_id: impl Into<PlayerId>, player_name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            player_name: player_name.into(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }
}

/// Standard metrics for every player on a scoreboard: `points`, `junk`,
/// `gross_total`, `net_total` and `holes_played`. Names are left empty.
pub fn metrics_from_scoreboard(scoreboard: &Scoreboard) -> Vec<PlayerMetrics> {
    scoreboard
        .cumulative
        .players
        .values()
        .map(|c| {
            PlayerMetrics::new(c.player_id.clone(), "")
                .with_metric("points", c.points_total)
                .with_metric("junk", c.junk_total)
                .with_metric("gross_total", c.gross_total as f64)
                .with_metric("net_total", c.net_total as f64)
                .with_metric("holes_played", c.holes_played as f64)
        })
        .collect()
}

/// One player's winnings from one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPayout {
    pub player_id: PlayerId,
    pub player_name: String,
    pub pool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<u32>,
    pub metric_value: f64,
    pub amount: f64,
}

/// A payment from one player to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub from_player_id: PlayerId,
    pub from_player_name: String,
    pub to_player_id: PlayerId,
    pub to_player_name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub pot_total: f64,
    pub buy_in: f64,
    pub payouts: Vec<PlayerPayout>,
    pub net_positions: BTreeMap<PlayerId, f64>,
    pub debts: Vec<Debt>,
    pub calculated_at: DateTime<Utc>,
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Built-in place percentages for 1 to 5 places paid; anything else pays
/// three places.
///
/// # Examples
///
/// ```rust
/// use golfjunk::settlement::default_payout_pcts;
///
/// assert_eq!(default_payout_pcts(2), vec![60.0, 40.0]);
/// assert_eq!(default_payout_pcts(9), vec![50.0, 30.0, 20.0]);
/// ```
pub fn default_payout_pcts(places_paid: u32) -> Vec<f64> {
    match places_paid {
        1 => vec![100.0],
        2 => vec![60.0, 40.0],
        4 => vec![45.0, 27.0, 18.0, 10.0],
        5 => vec![40.0, 25.0, 17.0, 11.0, 7.0],
        _ => vec![50.0, 30.0, 20.0],
    }
}

fn payout_pcts(pool: &PoolConfig, places_paid: u32) -> Vec<f64> {
    match pool.payout_pcts.as_ref() {
        Some(custom) if custom.len() == places_paid as usize => custom.clone(),
        _ => default_payout_pcts(places_paid),
    }
}

/// Payouts from one pool, worth `pot_total × pool.pct / 100`.
///
/// # Examples
///
/// ```rust
/// use golfjunk::settlement::{calculate_pool_payouts, PlayerMetrics, PoolConfig, SplitType};
///
/// let players = vec![
///     PlayerMetrics::new("p1", "Ann").with_metric("skins", 3.0),
///     PlayerMetrics::new("p2", "Bob").with_metric("skins", 1.0),
///     PlayerMetrics::new("p3", "Cat").with_metric("skins", 0.0),
/// ];
/// let pool = PoolConfig::new("skins", 50.0, "skins", SplitType::PerUnit);
///
/// let payouts = calculate_pool_payouts(&pool, &players, 120.0);
/// let amounts: Vec<_> = payouts.iter().map(|p| (p.player_id.as_str(), p.amount)).collect();
/// assert_eq!(amounts, vec![("p1", 45.0), ("p2", 15.0)]);
/// ```
pub fn calculate_pool_payouts(pool: &PoolConfig, players: &[PlayerMetrics], pot_total: f64) -> Vec<PlayerPayout> {
    distribute_pool(pool, players, round_cents(pot_total * pool.pct / 100.0))
}

fn distribute_pool(pool: &PoolConfig, players: &[PlayerMetrics], amount: f64) -> Vec<PlayerPayout> {
    let mut candidates: Vec<(&PlayerMetrics, f64)> = players
        .iter()
        .map(|p| {
            let value = p.metrics.get(&pool.metric).copied().unwrap_or_else(|| {
                log::warn!("pool {}: no '{}' metric for player {}", pool.name, pool.metric, p.player_id);
                0.0
            });
            (p, value)
        })
        .filter(|(_, value)| *value != 0.0 || pool.split_type == SplitType::Places)
        .collect();
    candidates.sort_by(|a, b| a.0.player_id.cmp(&b.0.player_id));

    let payout = |player: &PlayerMetrics, place: Option<u32>, metric_value: f64, amount: f64| PlayerPayout {
        player_id: player.player_id.clone(),
        player_name: player.player_name.clone(),
        pool_name: pool.name.clone(),
        place,
        metric_value,
        amount,
    };

    let mut payouts: Vec<PlayerPayout> = match pool.split_type {
        SplitType::Places => {
            let ranked = rank_with_ties(candidates, |c| c.1, RankDirection::Higher);
            let places_paid = pool.places_paid.unwrap_or(3).min(ranked.len() as u32);
            let pcts = payout_pcts(pool, places_paid);
            let pct_for = |place: u32| pcts.get(place as usize - 1).copied().unwrap_or(0.0);
            ranked
                .iter()
                .filter(|r| r.rank <= places_paid)
                .map(|r| {
                    let share = calculate_position_points(r.rank, r.tie_count, pct_for);
                    payout(r.item.0, Some(r.rank), r.item.1, round_cents(amount * share / 100.0))
                })
                .collect()
        }
        SplitType::PerUnit => {
            let eligible: Vec<(&PlayerMetrics, f64)> = candidates.into_iter().filter(|c| c.1 > 0.0).collect();
            let units: f64 = eligible.iter().map(|c| c.1).sum();
            if units <= 0.0 {
                return Vec::new();
            }
            let mut ranked = rank_with_ties(eligible, |c| c.1, RankDirection::Higher);
            ranked.sort_by(|a, b| b.item.1.total_cmp(&a.item.1));
            ranked
                .iter()
                .map(|r| payout(r.item.0, None, r.item.1, round_cents(amount * r.item.1 / units)))
                .collect()
        }
        SplitType::WinnerTakeAll => rank_with_ties(candidates, |c| c.1, RankDirection::Higher)
            .first()
            .map(|r| vec![payout(r.item.0, Some(1), r.item.1, amount)])
            .unwrap_or_default(),
    };

    let paid: f64 = payouts.iter().map(|p| p.amount).sum();
    if let Some(last) = payouts.last_mut() {
        last.amount = round_cents(last.amount + amount - paid);
    }
    payouts
}

/// Payouts across every pool. Pool amounts are rounded to cents and the
/// last pool takes whatever the others leave of the pot.
pub fn calculate_all_payouts(pools: &[PoolConfig], players: &[PlayerMetrics], pot_total: f64) -> Vec<PlayerPayout> {
    let mut payouts = Vec::new();
    let mut allocated = 0.0;
    for (i, pool) in pools.iter().enumerate() {
        let amount = if i + 1 == pools.len() {
            round_cents(pot_total - allocated)
        } else {
            round_cents(pot_total * pool.pct / 100.0)
        };
        allocated += amount;
        payouts.extend(distribute_pool(pool, players, amount));
    }
    payouts
}

/// Each player's winnings less an equal share of the pot.
///
/// # Examples
///
/// ```rust
/// use golfjunk::settlement::{calculate_net_positions, PlayerMetrics, PlayerPayout};
/// use golfjunk::PlayerId;
///
/// let players = vec![PlayerMetrics::new("p1", ""), PlayerMetrics::new("p2", "")];
/// let payouts = vec![PlayerPayout {
///     player_id: "p1".into(),
///     player_name: String::new(),
///     pool_name: "overall".into(),
///     place: Some(1),
///     metric_value: 10.0,
///     amount: 40.0,
/// }];
///
/// let net = calculate_net_positions(&payouts, &players, 40.0);
/// assert_eq!(net[&PlayerId::from_str("p1")], 20.0);
/// assert_eq!(net[&PlayerId::from_str("p2")], -20.0);
/// ```
pub fn calculate_net_positions(
    payouts: &[PlayerPayout],
    players: &[PlayerMetrics],
    pot_total: f64,
) -> BTreeMap<PlayerId, f64> {
    if players.is_empty() {
        return BTreeMap::new();
    }
    let buy_in = pot_total / players.len() as f64;
    let mut net: BTreeMap<PlayerId, f64> = players.iter().map(|p| (p.player_id.clone(), -buy_in)).collect();
    for payout in payouts {
        *net.entry(payout.player_id.clone()).or_insert(-buy_in) += payout.amount;
    }
    for value in net.values_mut() {
        *value = round_cents(*value);
    }
    net
}

/// Settle net positions with as few payments as the greedy match allows.
///
/// The largest debtor pays the largest creditor until one of them is
/// square, then the next in line steps in. Equal amounts are matched in
/// ascending player id order. Positions within a cent of zero are
/// already settled.
///
/// # Examples
///
/// ```rust
/// use golfjunk::settlement::reconcile_debts;
/// use golfjunk::PlayerId;
/// use std::collections::BTreeMap;
///
/// let net: BTreeMap<PlayerId, f64> = [("a", -10.0), ("b", 10.0), ("c", 0.0)]
///     .into_iter()
///     .map(|(id, v)| (PlayerId::from_str(id), v))
///     .collect();
///
/// let debts = reconcile_debts(&net, &BTreeMap::new());
/// assert_eq!(debts.len(), 1);
/// assert_eq!(debts[0].from_player_id.as_str(), "a");
/// assert_eq!(debts[0].to_player_id.as_str(), "b");
/// assert_eq!(debts[0].amount, 10.0);
/// ```
pub fn reconcile_debts(net_positions: &BTreeMap<PlayerId, f64>, names: &BTreeMap<PlayerId, String>) -> Vec<Debt> {
    let mut creditors: Vec<(PlayerId, f64)> = Vec::new();
    let mut debtors: Vec<(PlayerId, f64)> = Vec::new();
    for (player_id, net) in net_positions {
        if *net > SETTLED {
            creditors.push((player_id.clone(), *net));
        } else if *net < -SETTLED {
            debtors.push((player_id.clone(), -net));
        }
    }
    // Stable sorts keep ascending id order among equal amounts.
    creditors.sort_by(|a, b| b.1.total_cmp(&a.1));
    debtors.sort_by(|a, b| b.1.total_cmp(&a.1));

    let name_of = |id: &PlayerId| names.get(id).cloned().unwrap_or_else(|| id.to_string());
    let mut debts = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < creditors.len() && j < debtors.len() {
        let payment = creditors[i].1.min(debtors[j].1);
        if payment > SETTLED {
            debts.push(Debt {
                from_player_id: debtors[j].0.clone(),
                from_player_name: name_of(&debtors[j].0),
                to_player_id: creditors[i].0.clone(),
                to_player_name: name_of(&creditors[i].0),
                amount: round_cents(payment),
            });
        }
        creditors[i].1 -= payment;
        debtors[j].1 -= payment;
        if creditors[i].1 < SETTLED {
            i += 1;
        }
        if debtors[j].1 < SETTLED {
            j += 1;
        }
    }
    debts
}

/// Full settlement of a pot.
///
/// `calculated_at` is stamped onto the record as given.
pub fn calculate_settlement(
    pools: &[PoolConfig],
    players: &[PlayerMetrics],
    pot_total: f64,
    calculated_at: DateTime<Utc>,
) -> Settlement {
    if players.is_empty() {
        return Settlement {
            pot_total,
            buy_in: 0.0,
            payouts: Vec::new(),
            net_positions: BTreeMap::new(),
            debts: Vec::new(),
            calculated_at,
        };
    }

    let payouts = calculate_all_payouts(pools, players, pot_total);
    let net_positions = calculate_net_positions(&payouts, players, pot_total);
    let names: BTreeMap<PlayerId, String> = players
        .iter()
        .map(|p| (p.player_id.clone(), p.player_name.clone()))
        .collect();
    let debts = reconcile_debts(&net_positions, &names);
    log::debug!(
        "settled pot {} across {} pools: {} payouts, {} debts",
        pot_total,
        pools.len(),
        payouts.len(),
        debts.len()
    );

    Settlement {
        pot_total,
        buy_in: pot_total / players.len() as f64,
        payouts,
        net_positions,
        debts,
        calculated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn players(metric: &str, values: &[f64]) -> Vec<PlayerMetrics> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| PlayerMetrics::new(format!("p{}", i + 1), format!("Player {}", i + 1)).with_metric(metric, *v))
            .collect()
    }

    fn amounts(payouts: &[PlayerPayout]) -> Vec<(&str, f64)> {
        payouts.iter().map(|p| (p.player_id.as_str(), p.amount)).collect()
    }

    #[test]
    fn test_places_default_pcts() {
        let pool = PoolConfig::new("overall", 100.0, "points", SplitType::Places);
        let payouts = calculate_pool_payouts(&pool, &players("points", &[10.0, 30.0, 20.0, 5.0]), 100.0);
        assert_eq!(amounts(&payouts), vec![("p2", 50.0), ("p3", 30.0), ("p1", 20.0)]);
        assert_eq!(payouts[0].place, Some(1));
    }

    #[test]
    fn test_places_capped_at_player_count() {
        let pool = PoolConfig::new("overall", 100.0, "points", SplitType::Places).with_places(5);
        let payouts = calculate_pool_payouts(&pool, &players("points", &[1.0, 2.0]), 100.0);
        assert_eq!(amounts(&payouts), vec![("p2", 60.0), ("p1", 40.0)]);
    }

    #[test]
    fn test_custom_pcts_need_matching_length() {
        let pool = PoolConfig::new("overall", 100.0, "points", SplitType::Places)
            .with_places(2)
            .with_payout_pcts(vec![70.0, 30.0]);
        let payouts = calculate_pool_payouts(&pool, &players("points", &[1.0, 2.0, 3.0]), 100.0);
        assert_eq!(amounts(&payouts), vec![("p3", 70.0), ("p2", 30.0)]);

        let mismatched = pool.with_payout_pcts(vec![100.0]);
        let payouts = calculate_pool_payouts(&mismatched, &players("points", &[1.0, 2.0, 3.0]), 100.0);
        assert_eq!(amounts(&payouts), vec![("p3", 60.0), ("p2", 40.0)]);
    }

    #[test]
    fn test_tie_splits_places() {
        let pool = PoolConfig::new("overall", 100.0, "points", SplitType::Places);
        let payouts = calculate_pool_payouts(&pool, &players("points", &[9.0, 9.0, 1.0]), 100.0);
        assert_eq!(amounts(&payouts), vec![("p1", 40.0), ("p2", 40.0), ("p3", 20.0)]);
    }

    #[test]
    fn test_per_unit_without_units_pays_nothing() {
        let pool = PoolConfig::new("skins", 100.0, "skins", SplitType::PerUnit);
        assert!(calculate_pool_payouts(&pool, &players("skins", &[0.0, 0.0]), 50.0).is_empty());
    }

    #[test]
    fn test_per_unit_remainder_goes_to_last() {
        let pool = PoolConfig::new("skins", 100.0, "skins", SplitType::PerUnit);
        let payouts = calculate_pool_payouts(&pool, &players("skins", &[1.0, 1.0, 1.0]), 100.0);
        let total: f64 = payouts.iter().map(|p| p.amount).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(payouts[2].amount, 33.34);
    }

    #[test]
    fn test_winner_take_all() {
        let pool = PoolConfig::new("low", 100.0, "points", SplitType::WinnerTakeAll);
        let payouts = calculate_pool_payouts(&pool, &players("points", &[3.0, 7.0, 7.0]), 90.0);
        assert_eq!(amounts(&payouts), vec![("p2", 90.0)]);
    }

    #[test]
    fn test_last_pool_absorbs_remainder() {
        let pools = vec![
            PoolConfig::new("a", 33.333, "points", SplitType::WinnerTakeAll),
            PoolConfig::new("b", 66.667, "points", SplitType::WinnerTakeAll),
        ];
        let payouts = calculate_all_payouts(&pools, &players("points", &[1.0, 2.0]), 10.0);
        assert_eq!(amounts(&payouts), vec![("p2", 3.33), ("p2", 6.67)]);
    }

    #[test]
    fn test_missing_metric_counts_as_zero() {
        let pool = PoolConfig::new("overall", 100.0, "quota", SplitType::Places).with_places(1);
        let payouts = calculate_pool_payouts(&pool, &players("points", &[4.0, 2.0]), 10.0);
        assert_eq!(amounts(&payouts), vec![("p1", 5.0), ("p2", 5.0)]);
        assert!(payouts.iter().all(|p| p.metric_value == 0.0));
    }

    #[test]
    fn test_reconcile_all_zero() {
        let net: BTreeMap<PlayerId, f64> = [("a", 0.0), ("b", 0.004)]
            .into_iter()
            .map(|(id, v)| (PlayerId::from_str(id), v))
            .collect();
        assert!(reconcile_debts(&net, &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_reconcile_tie_break_by_id() {
        let net: BTreeMap<PlayerId, f64> = [("d", -10.0), ("c", -10.0), ("a", 10.0), ("b", 10.0)]
            .into_iter()
            .map(|(id, v)| (PlayerId::from_str(id), v))
            .collect();
        let debts = reconcile_debts(&net, &BTreeMap::new());
        let pairs: Vec<_> = debts
            .iter()
            .map(|d| (d.from_player_id.as_str(), d.to_player_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("c", "a"), ("d", "b")]);
    }

    #[test]
    fn test_settlement_record() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        let pools = vec![PoolConfig::new("overall", 100.0, "points", SplitType::WinnerTakeAll)];
        let settlement = calculate_settlement(&pools, &players("points", &[5.0, 2.0, 1.0]), 60.0, at);

        assert_eq!(settlement.buy_in, 20.0);
        assert_eq!(settlement.calculated_at, at);
        assert_eq!(settlement.debts.len(), 2);
        assert!(settlement.debts.iter().all(|d| d.to_player_name == "Player 1"));

        let json = serde_json::to_value(&settlement).unwrap();
        assert!(json.get("netPositions").is_some());
        assert!(json.get("calculatedAt").is_some());
    }

    #[test]
    fn test_no_players() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        let pools = vec![PoolConfig::new("overall", 100.0, "points", SplitType::Places)];
        let settlement = calculate_settlement(&pools, &[], 100.0, at);
        assert_eq!(settlement.buy_in, 0.0);
        assert!(settlement.payouts.is_empty());
        assert!(settlement.net_positions.is_empty());
    }

    fn pool_strategy() -> impl Strategy<Value = Vec<PoolConfig>> {
        prop::collection::vec((1u32..6, 0usize..3), 1..4).prop_map(|specs| {
            let share = 100.0 / specs.len() as f64;
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (places, kind))| {
                    let split = match kind {
                        0 => SplitType::Places,
                        1 => SplitType::WinnerTakeAll,
                        _ => SplitType::PerUnit,
                    };
                    PoolConfig::new(format!("pool{}", i), share, "m", split).with_places(places)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_settlement_is_zero_sum(
            pools in pool_strategy(),
            metrics in prop::collection::vec(1u32..20, 1..8),
            pot in 1u32..2000,
        ) {
            let values: Vec<f64> = metrics.iter().map(|m| *m as f64).collect();
            let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            let settlement = calculate_settlement(&pools, &players("m", &values), pot as f64, at);

            let tolerance = 0.02 * values.len() as f64;
            let net_sum: f64 = settlement.net_positions.values().sum();
            prop_assert!(net_sum.abs() <= tolerance, "net positions sum to {}", net_sum);

            let owed: f64 = settlement.net_positions.values().filter(|v| **v < 0.0).map(|v| -v).sum();
            let paid: f64 = settlement.debts.iter().map(|d| d.amount).sum();
            prop_assert!((owed - paid).abs() <= tolerance, "owed {} paid {}", owed, paid);

            for debt in &settlement.debts {
                prop_assert_ne!(&debt.from_player_id, &debt.to_player_id);
            }
            let creditors = settlement.net_positions.values().filter(|v| **v > 0.01).count();
            let debtors = settlement.net_positions.values().filter(|v| **v < -0.01).count();
            prop_assert!(settlement.debts.len() <= (creditors + debtors).saturating_sub(1));
        }
    }
}
