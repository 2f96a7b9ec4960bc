//! Running stake totals keyed by bettor and by team.
//!
//! Every wager updates the total staked by its bettor and, unless it backs
//! a draw, the total staked on the team it backs. Each update emits a
//! changelog entry carrying the post-update total.

use betflow_core::events::{Bet, TotalUpdate};
use betflow_core::RecordError;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Keyed running totals with a changelog entry per update.
#[derive(Debug, Default)]
pub struct KeyedTotals {
    totals: HashMap<String, i64>,
}

impl KeyedTotals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` under `key` and returns the post-update entry.
    ///
    /// Totals saturate at the i64 limits rather than wrapping.
    pub fn add(&mut self, key: &str, amount: i64) -> TotalUpdate {
        let total = self
            .totals
            .entry(key.to_string())
            .and_modify(|total| *total = total.saturating_add(amount))
            .or_insert(amount);
        TotalUpdate::new(key, *total)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<i64> {
        self.totals.get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// One stake contribution, routed to the worker that owns its key.
///
/// Bettor and team keys live in separate namespaces, so a bettor named
/// like a team never shares a total with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeEvent {
    Bettor { key: String, amount: i64 },
    Team { key: String, amount: i64 },
}

impl StakeEvent {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Bettor { key, .. } | Self::Team { key, .. } => key,
        }
    }

    #[must_use]
    pub fn amount(&self) -> i64 {
        match self {
            Self::Bettor { amount, .. } | Self::Team { amount, .. } => *amount,
        }
    }
}

/// Splits one wager into its routed stake contributions.
///
/// Always one bettor contribution; a team contribution unless the wager
/// backs a draw. A malformed match identifier fails the whole wager, so
/// it contributes to neither total.
pub fn stake_events(bet: &Bet) -> Result<Vec<StakeEvent>, RecordError> {
    let team = bet.backed_team()?;
    let mut events = Vec::with_capacity(2);
    events.push(StakeEvent::Bettor {
        key: bet.bettor.clone(),
        amount: bet.amount,
    });
    if let Some(team) = team {
        events.push(StakeEvent::Team {
            key: team.to_string(),
            amount: bet.amount,
        });
    }
    Ok(events)
}

/// Changelog entries produced by folding one wager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulateOutput {
    pub bettor_update: TotalUpdate,
    /// Absent for draw wagers, which back no team.
    pub team_update: Option<TotalUpdate>,
}

/// Single-partition fold of both keyed totals.
///
/// Useful when the whole wager stream is processed in one place. The
/// partitioned runtime splits wagers with [`stake_events`] instead and
/// lets each [`TotalsWorker`] own a slice of the key space.
#[derive(Debug, Default)]
pub struct StakeAggregator {
    bettor_totals: KeyedTotals,
    team_totals: KeyedTotals,
}

impl StakeAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one wager into both totals.
    pub fn accumulate(&mut self, bet: &Bet) -> Result<AccumulateOutput, RecordError> {
        let team = bet.backed_team()?;
        let bettor_update = self.bettor_totals.add(&bet.bettor, bet.amount);
        let team_update = team.map(|team| self.team_totals.add(team, bet.amount));
        Ok(AccumulateOutput {
            bettor_update,
            team_update,
        })
    }

    #[must_use]
    pub fn bettor_total(&self, bettor: &str) -> Option<i64> {
        self.bettor_totals.get(bettor)
    }

    #[must_use]
    pub fn team_total(&self, team: &str) -> Option<i64> {
        self.team_totals.get(team)
    }
}

/// One partition of the totals stage.
///
/// Owns every bettor and team key hashed to it, so no key is ever
/// updated from two tasks. Changelog entries go out on the shared
/// bettor and team channels in per-key order.
pub struct TotalsWorker {
    rx: mpsc::Receiver<StakeEvent>,
    bettor_totals: KeyedTotals,
    team_totals: KeyedTotals,
    bettor_tx: mpsc::Sender<TotalUpdate>,
    team_tx: mpsc::Sender<TotalUpdate>,
}

impl TotalsWorker {
    #[must_use]
    pub fn new(
        rx: mpsc::Receiver<StakeEvent>,
        bettor_tx: mpsc::Sender<TotalUpdate>,
        team_tx: mpsc::Sender<TotalUpdate>,
    ) -> Self {
        Self {
            rx,
            bettor_totals: KeyedTotals::new(),
            team_totals: KeyedTotals::new(),
            bettor_tx,
            team_tx,
        }
    }

    /// Drains the partition channel until every routing sender is dropped,
    /// then returns the number of contributions folded.
    pub async fn run(mut self) -> u64 {
        let mut processed = 0u64;
        while let Some(event) = self.rx.recv().await {
            processed += 1;
            let (update, tx) = match event {
                StakeEvent::Bettor { key, amount } => {
                    (self.bettor_totals.add(&key, amount), &self.bettor_tx)
                }
                StakeEvent::Team { key, amount } => {
                    (self.team_totals.add(&key, amount), &self.team_tx)
                }
            };
            if tx.send(update).await.is_err() {
                tracing::debug!("changelog channel closed, totals worker exiting");
                break;
            }
        }
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use betflow_core::events::Outcome;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn make_bet(bettor: &str, match_id: &str, outcome: Outcome, amount: i64) -> Bet {
        Bet {
            bettor: bettor.to_string(),
            match_id: match_id.to_string(),
            outcome,
            amount,
            odds: dec!(2.0),
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        }
    }

    // =========================================================================
    // KeyedTotals Tests
    // =========================================================================

    #[test]
    fn test_totals_emit_running_sum_per_key() {
        let mut totals = KeyedTotals::new();

        assert_eq!(totals.add("alice", 10), TotalUpdate::new("alice", 10));
        assert_eq!(totals.add("alice", 5), TotalUpdate::new("alice", 15));
        assert_eq!(totals.add("bob", 7), TotalUpdate::new("bob", 7));

        assert_eq!(totals.get("alice"), Some(15));
        assert_eq!(totals.get("bob"), Some(7));
        assert_eq!(totals.get("carol"), None);
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn test_totals_saturate_instead_of_wrapping() {
        let mut totals = KeyedTotals::new();
        totals.add("whale", i64::MAX - 1);
        let update = totals.add("whale", 10);
        assert_eq!(update.total, i64::MAX);
    }

    // =========================================================================
    // StakeAggregator Tests
    // =========================================================================

    #[test]
    fn test_accumulate_updates_bettor_and_team() {
        let mut agg = StakeAggregator::new();

        let out = agg
            .accumulate(&make_bet("alice", "x-y", Outcome::Home, 10))
            .unwrap();
        assert_eq!(out.bettor_update, TotalUpdate::new("alice", 10));
        assert_eq!(out.team_update, Some(TotalUpdate::new("x", 10)));

        let out = agg
            .accumulate(&make_bet("bob", "x-y", Outcome::Away, 5))
            .unwrap();
        assert_eq!(out.bettor_update, TotalUpdate::new("bob", 5));
        assert_eq!(out.team_update, Some(TotalUpdate::new("y", 5)));

        assert_eq!(agg.bettor_total("alice"), Some(10));
        assert_eq!(agg.team_total("x"), Some(10));
        assert_eq!(agg.team_total("y"), Some(5));
    }

    #[test]
    fn test_draw_wager_updates_bettor_only() {
        let mut agg = StakeAggregator::new();

        let out = agg
            .accumulate(&make_bet("alice", "x-y", Outcome::Draw, 20))
            .unwrap();
        assert_eq!(out.bettor_update, TotalUpdate::new("alice", 20));
        assert_eq!(out.team_update, None);
        assert_eq!(agg.team_total("x"), None);
        assert_eq!(agg.team_total("y"), None);
    }

    #[test]
    fn test_same_bettor_across_matches_shares_one_total() {
        let mut agg = StakeAggregator::new();
        agg.accumulate(&make_bet("alice", "x-y", Outcome::Home, 10))
            .unwrap();
        agg.accumulate(&make_bet("alice", "p-q", Outcome::Away, 3))
            .unwrap();
        assert_eq!(agg.bettor_total("alice"), Some(13));
    }

    #[test]
    fn test_malformed_match_contributes_nowhere() {
        let mut agg = StakeAggregator::new();
        let result = agg.accumulate(&make_bet("alice", "nodash", Outcome::Home, 10));
        assert!(result.is_err());
        assert_eq!(agg.bettor_total("alice"), None);
    }

    // =========================================================================
    // StakeEvent Tests
    // =========================================================================

    #[test]
    fn test_stake_events_split_by_key_namespace() {
        let events = stake_events(&make_bet("alice", "x-y", Outcome::Away, 10)).unwrap();
        assert_eq!(
            events,
            vec![
                StakeEvent::Bettor {
                    key: "alice".to_string(),
                    amount: 10
                },
                StakeEvent::Team {
                    key: "y".to_string(),
                    amount: 10
                },
            ]
        );
    }

    #[test]
    fn test_stake_events_for_draw_have_no_team_part() {
        let events = stake_events(&make_bet("alice", "x-y", Outcome::Draw, 10)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key(), "alice");
        assert_eq!(events[0].amount(), 10);
    }

    // =========================================================================
    // TotalsWorker Tests
    // =========================================================================

    #[tokio::test]
    async fn test_worker_folds_both_namespaces_until_drained() {
        let (tx, rx) = mpsc::channel(8);
        let (bettor_tx, mut bettor_rx) = mpsc::channel(8);
        let (team_tx, mut team_rx) = mpsc::channel(8);
        let worker = tokio::spawn(TotalsWorker::new(rx, bettor_tx, team_tx).run());

        for event in stake_events(&make_bet("alice", "x-y", Outcome::Home, 10)).unwrap() {
            tx.send(event).await.unwrap();
        }
        for event in stake_events(&make_bet("alice", "x-y", Outcome::Home, 5)).unwrap() {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        assert_eq!(worker.await.unwrap(), 4);
        assert_eq!(bettor_rx.recv().await, Some(TotalUpdate::new("alice", 10)));
        assert_eq!(bettor_rx.recv().await, Some(TotalUpdate::new("alice", 15)));
        assert_eq!(bettor_rx.recv().await, None);
        assert_eq!(team_rx.recv().await, Some(TotalUpdate::new("x", 10)));
        assert_eq!(team_rx.recv().await, Some(TotalUpdate::new("x", 15)));
        assert_eq!(team_rx.recv().await, None);
    }
}
