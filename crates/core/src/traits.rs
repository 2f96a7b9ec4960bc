use crate::events::{Bet, EventScore, Fraud, TotalUpdate};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BetSource: Send {
    /// Next wager from the feed, or `None` once the feed is exhausted.
    async fn next_bet(&mut self) -> Result<Option<Bet>>;
}

#[async_trait]
pub trait ScoreSource: Send {
    /// Next score snapshot from the feed, or `None` once the feed is exhausted.
    async fn next_score(&mut self) -> Result<Option<EventScore>>;
}

#[async_trait]
pub trait ChangelogSink: Send {
    async fn publish_total(&mut self, update: &TotalUpdate) -> Result<()>;
}

#[async_trait]
pub trait FraudSink: Send {
    async fn publish_fraud(&mut self, fraud: &Fraud) -> Result<()>;
}
