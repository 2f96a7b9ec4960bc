pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod traits;

pub use config::{AppConfig, FeedConfig, JoinConfig, PipelineConfig};
pub use config_loader::ConfigLoader;
pub use error::RecordError;
pub use events::{
    match_teams, Bet, EventScore, Fraud, GoalEvent, Outcome, Score, Side, TotalUpdate,
};
pub use traits::{BetSource, ChangelogSink, FraudSink, ScoreSource};
