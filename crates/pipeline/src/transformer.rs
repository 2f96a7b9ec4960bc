//! Derives per-goal events from running score snapshots.

use betflow_core::events::{match_teams, EventScore, GoalEvent, Score, Side};
use betflow_core::RecordError;
use std::collections::HashMap;

/// Turns consecutive score snapshots into one event per goal.
///
/// Tracks the last snapshot per match, starting from 0:0 so the first
/// snapshot of a match already yields goals. A snapshot that regresses
/// on either side is treated as a feed correction and rejected without
/// touching the tracked score.
#[derive(Debug, Default)]
pub struct ScoreTransformer {
    last_scores: HashMap<String, Score>,
}

impl ScoreTransformer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits one [`GoalEvent`] per increment over the previous snapshot.
    ///
    /// Every goal inherits the snapshot's event time, so a two-goal jump
    /// produces two events with the same timestamp. An unchanged snapshot
    /// emits nothing.
    pub fn transform(&mut self, snapshot: &EventScore) -> Result<Vec<GoalEvent>, RecordError> {
        let (home, away) = match_teams(&snapshot.match_id)?;
        let prev = self
            .last_scores
            .get(&snapshot.match_id)
            .copied()
            .unwrap_or_default();
        let next = snapshot.score;

        if next.home < prev.home || next.away < prev.away {
            return Err(RecordError::ScoreRegression {
                match_id: snapshot.match_id.clone(),
                prev_home: prev.home,
                prev_away: prev.away,
                home: next.home,
                away: next.away,
            });
        }

        let mut goals = Vec::new();
        for _ in prev.home..next.home {
            goals.push(GoalEvent {
                match_id: snapshot.match_id.clone(),
                team: home.to_string(),
                side: Side::Home,
                timestamp: snapshot.timestamp,
            });
        }
        for _ in prev.away..next.away {
            goals.push(GoalEvent {
                match_id: snapshot.match_id.clone(),
                team: away.to_string(),
                side: Side::Away,
                timestamp: snapshot.timestamp,
            });
        }
        self.last_scores.insert(snapshot.match_id.clone(), next);
        Ok(goals)
    }

    /// Number of matches with a tracked score.
    #[must_use]
    pub fn tracked_matches(&self) -> usize {
        self.last_scores.len()
    }
}
