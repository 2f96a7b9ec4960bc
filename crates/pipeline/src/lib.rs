//! Streaming stages over the wager and score feeds: keyed stake totals,
//! score-to-goal transformation, and the windowed correlation that flags
//! wagers placed just before the backed team scored.

pub mod aggregation;
pub mod join;
pub mod router;
pub mod runtime;
pub mod transformer;

pub use aggregation::{
    stake_events, AccumulateOutput, KeyedTotals, StakeAggregator, StakeEvent, TotalsWorker,
};
pub use join::{CorrelationJoin, JoinEvent, JoinStats, JoinWorker};
pub use router::{partition_for, Router};
pub use runtime::{Pipeline, PipelineReport};
pub use transformer::ScoreTransformer;
