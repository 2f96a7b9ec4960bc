//! Feed adapters for the wager pipeline: JSONL replay and sinks,
//! in-memory channels, and a deterministic synthetic generator.

pub mod channel;
pub mod generator;
pub mod jsonl;

pub use channel::{ChannelBetSource, ChannelChangelogSink, ChannelFraudSink, ChannelScoreSource};
pub use generator::{generate, write_feeds, GeneratedFeeds, GeneratorConfig};
pub use jsonl::{JsonlBetSource, JsonlScoreSource, JsonlSink};
