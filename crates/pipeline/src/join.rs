//! Windowed correlation of wagers with the goals they anticipated.
//!
//! A wager is suspicious when the team it backed scores within the
//! suspicion window after the wager's event time. The window is right
//! open: a goal exactly `window_ms` after the wager does not count, a
//! goal at the same millisecond does.
//!
//! Both feeds arrive in any order, so each side is buffered in a
//! time-indexed map and probed by the other side on arrival. A pair is
//! emitted exactly once, when the later of its two events arrives.

use betflow_core::config::JoinConfig;
use betflow_core::events::{Bet, Fraud, GoalEvent};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc;

/// Sweep cadence, counted in processed events. Retirement happens only
/// at sweeps, so idle keys are cleaned up without per-event scans.
const SWEEP_INTERVAL: u32 = 256;

/// Buffer keyed by event time with an arrival sequence as tie-breaker.
type TimeIndex<T> = BTreeMap<(i64, u64), T>;

/// Counters for one correlation partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub bets_seen: u64,
    pub goals_seen: u64,
    pub frauds_emitted: u64,
    pub bets_retired: u64,
    pub goals_retired: u64,
    pub bets_evicted: u64,
    pub goals_evicted: u64,
}

impl JoinStats {
    pub fn merge(&mut self, other: Self) {
        self.bets_seen += other.bets_seen;
        self.goals_seen += other.goals_seen;
        self.frauds_emitted += other.frauds_emitted;
        self.bets_retired += other.bets_retired;
        self.goals_retired += other.goals_retired;
        self.bets_evicted += other.bets_evicted;
        self.goals_evicted += other.goals_evicted;
    }
}

/// One input to the correlation stage, from either feed.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinEvent {
    Wager(Bet),
    Goal(GoalEvent),
}

impl JoinEvent {
    /// Routing key. Both feeds partition on `"{match}:{outcome}"`, so a
    /// wager and the goal it anticipated always meet in one partition.
    #[must_use]
    pub fn correlation_key(&self) -> String {
        match self {
            Self::Wager(bet) => bet.correlation_key(),
            Self::Goal(goal) => goal.correlation_key(),
        }
    }
}

/// Look-back correlation state for one partition of the key space.
///
/// The watermark is the maximum event time seen on either input and
/// never regresses. Buffered entries more than
/// `window_ms * retention_multiple` behind it are retired; until then a
/// late event on either side still correlates.
pub struct CorrelationJoin {
    window_ms: i64,
    retention_ms: i64,
    max_buffered_per_key: usize,
    watermark: Option<i64>,
    seq: u64,
    events_since_sweep: u32,
    bets: HashMap<String, TimeIndex<Bet>>,
    goals: HashMap<String, TimeIndex<GoalEvent>>,
    stats: JoinStats,
}

impl CorrelationJoin {
    #[must_use]
    pub fn new(config: &JoinConfig) -> Self {
        let window_ms = config.window_ms.max(0);
        Self {
            window_ms,
            retention_ms: window_ms.saturating_mul(config.retention_multiple.max(1)),
            max_buffered_per_key: config.max_buffered_per_key.max(1),
            watermark: None,
            seq: 0,
            events_since_sweep: 0,
            bets: HashMap::new(),
            goals: HashMap::new(),
            stats: JoinStats::default(),
        }
    }

    pub fn on_event(&mut self, event: JoinEvent) -> Vec<Fraud> {
        match event {
            JoinEvent::Wager(bet) => self.on_bet(bet),
            JoinEvent::Goal(goal) => self.on_goal(goal),
        }
    }

    /// Probes buffered goals in `[t, t + window)` for a wager at `t`,
    /// then buffers the wager for goals still to come.
    pub fn on_bet(&mut self, bet: Bet) -> Vec<Fraud> {
        self.stats.bets_seen += 1;
        let ts = bet.timestamp_ms();
        self.advance_watermark(ts);
        let key = bet.correlation_key();

        let mut frauds = Vec::new();
        if let Some(goals) = self.goals.get(&key) {
            let start = (ts, u64::MIN);
            let end = (ts.saturating_add(self.window_ms), u64::MIN);
            for (_, goal) in goals.range(start..end) {
                frauds.push(Fraud::from_correlated(&bet, goal));
            }
        }
        self.stats.frauds_emitted += frauds.len() as u64;

        let buffer = self.bets.entry(key).or_default();
        if buffer.len() >= self.max_buffered_per_key {
            buffer.pop_first();
            self.stats.bets_evicted += 1;
            if self.stats.bets_evicted == 1 || self.stats.bets_evicted.is_multiple_of(1_000) {
                tracing::warn!(
                    "wager buffer for {} at cap {}: {} oldest entries evicted",
                    bet.match_id,
                    self.max_buffered_per_key,
                    self.stats.bets_evicted
                );
            }
        }
        self.seq += 1;
        buffer.insert((ts, self.seq), bet);

        self.maintain();
        frauds
    }

    /// Probes buffered wagers in `(t - window, t]` for a goal at `t`,
    /// then buffers the goal for wagers arriving late.
    pub fn on_goal(&mut self, goal: GoalEvent) -> Vec<Fraud> {
        self.stats.goals_seen += 1;
        let ts = goal.timestamp_ms();
        self.advance_watermark(ts);
        let key = goal.correlation_key();

        let mut frauds = Vec::new();
        if let Some(bets) = self.bets.get(&key) {
            let start = (
                ts.saturating_sub(self.window_ms).saturating_add(1),
                u64::MIN,
            );
            let end = (ts.saturating_add(1), u64::MIN);
            for (_, bet) in bets.range(start..end) {
                frauds.push(Fraud::from_correlated(bet, &goal));
            }
        }
        self.stats.frauds_emitted += frauds.len() as u64;

        let buffer = self.goals.entry(key).or_default();
        if buffer.len() >= self.max_buffered_per_key {
            buffer.pop_first();
            self.stats.goals_evicted += 1;
            if self.stats.goals_evicted == 1 || self.stats.goals_evicted.is_multiple_of(1_000) {
                tracing::warn!(
                    "goal buffer for {} at cap {}: {} oldest entries evicted",
                    goal.match_id,
                    self.max_buffered_per_key,
                    self.stats.goals_evicted
                );
            }
        }
        self.seq += 1;
        buffer.insert((ts, self.seq), goal);

        self.maintain();
        frauds
    }

    /// Retires every buffered entry behind the retention horizon.
    pub fn sweep(&mut self) {
        self.events_since_sweep = 0;
        let Some(watermark) = self.watermark else {
            return;
        };
        let horizon = watermark.saturating_sub(self.retention_ms);
        self.stats.bets_retired += Self::retire(&mut self.bets, horizon);
        self.stats.goals_retired += Self::retire(&mut self.goals, horizon);
    }

    #[must_use]
    pub fn watermark(&self) -> Option<i64> {
        self.watermark
    }

    #[must_use]
    pub fn stats(&self) -> &JoinStats {
        &self.stats
    }

    #[must_use]
    pub fn buffered_bets(&self) -> usize {
        self.bets.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn buffered_goals(&self) -> usize {
        self.goals.values().map(BTreeMap::len).sum()
    }

    fn advance_watermark(&mut self, ts: i64) {
        self.watermark = Some(self.watermark.map_or(ts, |w| w.max(ts)));
    }

    fn maintain(&mut self) {
        self.events_since_sweep += 1;
        if self.events_since_sweep >= SWEEP_INTERVAL {
            self.sweep();
        }
    }

    /// Drops entries with event time before `horizon`, removing emptied keys.
    fn retire<T>(buffers: &mut HashMap<String, TimeIndex<T>>, horizon: i64) -> u64 {
        let mut dropped = 0;
        buffers.retain(|_, index| {
            let kept = index.split_off(&(horizon, u64::MIN));
            dropped += index.len() as u64;
            *index = kept;
            !index.is_empty()
        });
        dropped
    }
}

/// One partition of the correlation stage.
pub struct JoinWorker {
    rx: mpsc::Receiver<JoinEvent>,
    join: CorrelationJoin,
    fraud_tx: mpsc::Sender<Fraud>,
}

impl JoinWorker {
    #[must_use]
    pub fn new(
        rx: mpsc::Receiver<JoinEvent>,
        config: &JoinConfig,
        fraud_tx: mpsc::Sender<Fraud>,
    ) -> Self {
        Self {
            rx,
            join: CorrelationJoin::new(config),
            fraud_tx,
        }
    }

    /// Drains the partition channel until every routing sender is dropped,
    /// then returns the partition's final counters.
    pub async fn run(mut self) -> JoinStats {
        while let Some(event) = self.rx.recv().await {
            for fraud in self.join.on_event(event) {
                if self.fraud_tx.send(fraud).await.is_err() {
                    tracing::debug!("fraud channel closed, join worker exiting");
                    return *self.join.stats();
                }
            }
        }
        *self.join.stats()
    }
}
