use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub join: JoinConfig,
    #[serde(default)]
    pub feeds: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub aggregation_workers: usize,
    pub join_workers: usize,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Width of the suspicion window in milliseconds, right-open.
    pub window_ms: i64,
    /// Buffered events older than `window_ms * retention_multiple` behind
    /// the watermark are retired.
    pub retention_multiple: i64,
    pub max_buffered_per_key: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub bets: String,
    pub scores: String,
    pub bettor_totals: String,
    pub team_totals: String,
    pub frauds: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregation_workers: 4,
            join_workers: 4,
            channel_capacity: 1024,
        }
    }
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            window_ms: 1_000,
            retention_multiple: 60,
            max_buffered_per_key: 10_000,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bets: "data/bets.jsonl".to_string(),
            scores: "data/scores.jsonl".to_string(),
            bettor_totals: "out/bettor-amounts.jsonl".to_string(),
            team_totals: "out/team-amounts.jsonl".to_string(),
            frauds: "out/possible-frauds.jsonl".to_string(),
        }
    }
}
