//! Channel-backed sources and sinks for wiring the pipeline in memory.
//!
//! A channel source ends when its feeding sender is dropped, which is
//! how a live feed signals exhaustion. The sinks are unbounded so a
//! collector that only reads after the run cannot stall the writers.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use betflow_core::events::{Bet, EventScore, Fraud, TotalUpdate};
use betflow_core::traits::{BetSource, ChangelogSink, FraudSink, ScoreSource};
use tokio::sync::mpsc;

/// Wager feed fed through an in-memory channel.
pub struct ChannelBetSource {
    rx: mpsc::UnboundedReceiver<Bet>,
}

impl ChannelBetSource {
    /// Returns the feeding half and the source.
    #[must_use]
    pub fn new() -> (mpsc::UnboundedSender<Bet>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl BetSource for ChannelBetSource {
    async fn next_bet(&mut self) -> Result<Option<Bet>> {
        Ok(self.rx.recv().await)
    }
}

/// Score feed fed through an in-memory channel.
pub struct ChannelScoreSource {
    rx: mpsc::UnboundedReceiver<EventScore>,
}

impl ChannelScoreSource {
    /// Returns the feeding half and the source.
    #[must_use]
    pub fn new() -> (mpsc::UnboundedSender<EventScore>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl ScoreSource for ChannelScoreSource {
    async fn next_score(&mut self) -> Result<Option<EventScore>> {
        Ok(self.rx.recv().await)
    }
}

/// Changelog sink that hands updates to an in-memory collector.
pub struct ChannelChangelogSink {
    tx: mpsc::UnboundedSender<TotalUpdate>,
}

impl ChannelChangelogSink {
    /// Returns the sink and the collecting half.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TotalUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ChangelogSink for ChannelChangelogSink {
    async fn publish_total(&mut self, update: &TotalUpdate) -> Result<()> {
        self.tx
            .send(update.clone())
            .map_err(|_| anyhow!("changelog collector dropped"))
    }
}

/// Fraud sink that hands signals to an in-memory collector.
pub struct ChannelFraudSink {
    tx: mpsc::UnboundedSender<Fraud>,
}

impl ChannelFraudSink {
    /// Returns the sink and the collecting half.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Fraud>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FraudSink for ChannelFraudSink {
    async fn publish_fraud(&mut self, fraud: &Fraud) -> Result<()> {
        self.tx
            .send(fraud.clone())
            .map_err(|_| anyhow!("fraud collector dropped"))
    }
}
