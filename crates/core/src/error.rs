//! Record-level errors raised while interpreting feed payloads.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Match identifier does not contain two non-empty `-`-separated teams.
    #[error("malformed match identifier {value:?}, expected \"home-away\"")]
    MalformedMatch { value: String },

    /// A score snapshot went backwards relative to the last one seen.
    #[error("score for {match_id} regressed from {prev_home}:{prev_away} to {home}:{away}")]
    ScoreRegression {
        match_id: String,
        prev_home: u32,
        prev_away: u32,
        home: u32,
        away: u32,
    },
}
