//! End-to-end wiring: feed intake, partitioned workers, and sink writers.
//!
//! Both feeds are pumped concurrently. Wagers fan out to the totals
//! stage (partitioned by changelog key) and the correlation stage
//! (partitioned by match and outcome); score snapshots become goals
//! before entering the correlation stage. Shutdown is by drain: when a
//! feed ends its routers drop, worker channels close, workers finish,
//! and the sink writers flush behind them.

use crate::aggregation::{stake_events, StakeEvent, TotalsWorker};
use crate::join::{JoinEvent, JoinStats, JoinWorker};
use crate::router::Router;
use crate::transformer::ScoreTransformer;
use anyhow::{Context, Result};
use betflow_core::config::{AppConfig, JoinConfig, PipelineConfig};
use betflow_core::events::{Fraud, TotalUpdate};
use betflow_core::traits::{BetSource, ChangelogSink, FraudSink, ScoreSource};
use betflow_core::RecordError;
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Counters for one pipeline run, reported once every feed has drained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub wagers: u64,
    pub malformed_wagers: u64,
    pub score_snapshots: u64,
    pub malformed_scores: u64,
    pub score_corrections: u64,
    pub goals: u64,
    pub stake_contributions: u64,
    pub bettor_updates: u64,
    pub team_updates: u64,
    pub frauds: u64,
    pub join: JoinStats,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wagers={} (malformed {}), snapshots={} (malformed {}, corrections {}), \
             goals={}, bettor updates={}, team updates={}, frauds={}",
            self.wagers,
            self.malformed_wagers,
            self.score_snapshots,
            self.malformed_scores,
            self.score_corrections,
            self.goals,
            self.bettor_updates,
            self.team_updates,
            self.frauds
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct IntakeStats {
    records: u64,
    malformed: u64,
    corrections: u64,
    goals: u64,
}

/// Wires the two feeds through partitioned workers into the three sinks.
pub struct Pipeline {
    bet_source: Box<dyn BetSource>,
    score_source: Box<dyn ScoreSource>,
    bettor_sink: Box<dyn ChangelogSink>,
    team_sink: Box<dyn ChangelogSink>,
    fraud_sink: Box<dyn FraudSink>,
    pipeline: PipelineConfig,
    join: JoinConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        config: &AppConfig,
        bet_source: Box<dyn BetSource>,
        score_source: Box<dyn ScoreSource>,
        bettor_sink: Box<dyn ChangelogSink>,
        team_sink: Box<dyn ChangelogSink>,
        fraud_sink: Box<dyn FraudSink>,
    ) -> Self {
        Self {
            bet_source,
            score_source,
            bettor_sink,
            team_sink,
            fraud_sink,
            pipeline: config.pipeline.clone(),
            join: config.join.clone(),
        }
    }

    /// Runs until both feeds are exhausted and every stage has drained.
    ///
    /// # Errors
    ///
    /// Returns an error if a feed fails, a sink write fails, or a stage
    /// task panics.
    pub async fn run(self) -> Result<PipelineReport> {
        let capacity = self.pipeline.channel_capacity.max(1);
        let totals_workers = self.pipeline.aggregation_workers.max(1);
        let join_workers = self.pipeline.join_workers.max(1);
        tracing::info!(
            "starting pipeline: {} totals workers, {} join workers, channel capacity {}",
            totals_workers,
            join_workers,
            capacity
        );

        let (bettor_tx, bettor_rx) = mpsc::channel(capacity);
        let (team_tx, team_rx) = mpsc::channel(capacity);
        let (fraud_tx, fraud_rx) = mpsc::channel(capacity);

        let mut stake_txs = Vec::with_capacity(totals_workers);
        let mut totals_handles: Vec<JoinHandle<u64>> = Vec::with_capacity(totals_workers);
        for _ in 0..totals_workers {
            let (tx, rx) = mpsc::channel(capacity);
            stake_txs.push(tx);
            totals_handles.push(tokio::spawn(
                TotalsWorker::new(rx, bettor_tx.clone(), team_tx.clone()).run(),
            ));
        }
        drop(bettor_tx);
        drop(team_tx);

        let mut join_txs = Vec::with_capacity(join_workers);
        let mut join_handles: Vec<JoinHandle<JoinStats>> = Vec::with_capacity(join_workers);
        for _ in 0..join_workers {
            let (tx, rx) = mpsc::channel(capacity);
            join_txs.push(tx);
            join_handles.push(tokio::spawn(
                JoinWorker::new(rx, &self.join, fraud_tx.clone()).run(),
            ));
        }
        drop(fraud_tx);

        let bettor_writer = tokio::spawn(write_totals(bettor_rx, self.bettor_sink, "bettor"));
        let team_writer = tokio::spawn(write_totals(team_rx, self.team_sink, "team"));
        let fraud_writer = tokio::spawn(write_frauds(fraud_rx, self.fraud_sink));

        let stake_router = Router::new(stake_txs);
        let join_router = Router::new(join_txs);
        let bet_pump = tokio::spawn(pump_bets(
            self.bet_source,
            stake_router,
            join_router.clone(),
        ));
        let score_pump = tokio::spawn(pump_scores(self.score_source, join_router));

        let bet_result = bet_pump.await.context("wager intake task panicked")?;
        let score_result = score_pump.await.context("score intake task panicked")?;

        // Intake routers are gone, so worker channels drain and close.
        let mut stake_contributions = 0;
        for handle in totals_handles {
            stake_contributions += handle.await.context("totals worker panicked")?;
        }
        let mut join_stats = JoinStats::default();
        for handle in join_handles {
            join_stats.merge(handle.await.context("join worker panicked")?);
        }

        // Worker-held senders are gone, so the writers drain and close.
        let bettor_updates = bettor_writer.await.context("bettor writer panicked")??;
        let team_updates = team_writer.await.context("team writer panicked")??;
        let frauds = fraud_writer.await.context("fraud writer panicked")??;

        // Intake errors surface last: a partition closed by a failed
        // downstream stage is a symptom, not the cause.
        let bet_stats = bet_result?;
        let score_stats = score_result?;

        let report = PipelineReport {
            wagers: bet_stats.records,
            malformed_wagers: bet_stats.malformed,
            score_snapshots: score_stats.records,
            malformed_scores: score_stats.malformed,
            score_corrections: score_stats.corrections,
            goals: score_stats.goals,
            stake_contributions,
            bettor_updates,
            team_updates,
            frauds,
            join: join_stats,
        };
        tracing::info!("pipeline drained: {}", report);
        Ok(report)
    }
}

async fn pump_bets(
    mut source: Box<dyn BetSource>,
    stake_router: Router<StakeEvent>,
    join_router: Router<JoinEvent>,
) -> Result<IntakeStats> {
    let mut stats = IntakeStats::default();
    while let Some(bet) = source.next_bet().await? {
        stats.records += 1;
        let events = match stake_events(&bet) {
            Ok(events) => events,
            Err(err) => {
                stats.malformed += 1;
                tracing::warn!("dropping wager from {}: {}", bet.bettor, err);
                continue;
            }
        };
        for event in events {
            let partition = stake_router.partition_of(event.key());
            stake_router.send_to(partition, event).await?;
        }
        let key = bet.correlation_key();
        let partition = join_router.partition_of(&key);
        join_router
            .send_to(partition, JoinEvent::Wager(bet))
            .await?;
    }
    tracing::info!("wager feed exhausted after {} records", stats.records);
    Ok(stats)
}

async fn pump_scores(
    mut source: Box<dyn ScoreSource>,
    join_router: Router<JoinEvent>,
) -> Result<IntakeStats> {
    let mut stats = IntakeStats::default();
    let mut transformer = ScoreTransformer::new();
    while let Some(snapshot) = source.next_score().await? {
        stats.records += 1;
        match transformer.transform(&snapshot) {
            Ok(goals) => {
                for goal in goals {
                    stats.goals += 1;
                    let key = goal.correlation_key();
                    let partition = join_router.partition_of(&key);
                    join_router.send_to(partition, JoinEvent::Goal(goal)).await?;
                }
            }
            Err(err @ RecordError::ScoreRegression { .. }) => {
                stats.corrections += 1;
                tracing::warn!("dropping score snapshot: {}", err);
            }
            Err(err) => {
                stats.malformed += 1;
                tracing::warn!("dropping score snapshot: {}", err);
            }
        }
    }
    tracing::info!(
        "score feed exhausted after {} snapshots, {} goals derived",
        stats.records,
        stats.goals
    );
    Ok(stats)
}

async fn write_totals(
    mut rx: mpsc::Receiver<TotalUpdate>,
    mut sink: Box<dyn ChangelogSink>,
    stream: &'static str,
) -> Result<u64> {
    let mut written = 0u64;
    while let Some(update) = rx.recv().await {
        sink.publish_total(&update)
            .await
            .with_context(|| format!("writing {stream} changelog"))?;
        written += 1;
    }
    Ok(written)
}

async fn write_frauds(mut rx: mpsc::Receiver<Fraud>, mut sink: Box<dyn FraudSink>) -> Result<u64> {
    let mut written = 0u64;
    while let Some(fraud) = rx.recv().await {
        sink.publish_fraud(&fraud)
            .await
            .context("writing fraud stream")?;
        written += 1;
    }
    Ok(written)
}
