use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Outcome a wager backs: home win, away win, or draw.
///
/// Serialized as the single-letter codes `"H"`, `"A"`, `"D"` used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "A")]
    Away,
    #[serde(rename = "D")]
    Draw,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "H",
            Self::Away => "A",
            Self::Draw => "D",
        }
    }

    /// Side of the pitch this outcome backs. Draws back neither side.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::Home => Some(Side::Home),
            Self::Away => Some(Side::Away),
            Self::Draw => None,
        }
    }
}

/// One of the two teams in a match. Unlike [`Outcome`] there is no draw
/// variant, so goal events can never carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "A")]
    Away,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "H",
            Self::Away => "A",
        }
    }

    #[must_use]
    pub const fn to_outcome(self) -> Outcome {
        match self {
            Self::Home => Outcome::Home,
            Self::Away => Outcome::Away,
        }
    }
}

/// Splits a `"home-away"` match identifier into its team names.
///
/// The first token is the home team and the second the away team. Any
/// further tokens are ignored. Errors if either of the first two tokens
/// is empty or missing.
pub fn match_teams(match_id: &str) -> Result<(&str, &str), RecordError> {
    let mut tokens = match_id.split('-');
    let home = tokens.next().unwrap_or_default();
    let away = tokens.next().unwrap_or_default();
    if home.is_empty() || away.is_empty() {
        return Err(RecordError::MalformedMatch {
            value: match_id.to_string(),
        });
    }
    Ok((home, away))
}

/// A single wager as it arrives on the bet feed.
///
/// `timestamp` is event time assigned at the source, not arrival time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub bettor: String,
    #[serde(rename = "match")]
    pub match_id: String,
    pub outcome: Outcome,
    /// Stake in minor currency units.
    pub amount: i64,
    pub odds: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Bet {
    /// Team this wager backs, or `None` for a draw wager.
    ///
    /// The match identifier is validated even for draws, so a malformed
    /// record is rejected before it contributes anywhere.
    pub fn backed_team(&self) -> Result<Option<&str>, RecordError> {
        let (home, away) = match_teams(&self.match_id)?;
        Ok(match self.outcome.side() {
            Some(Side::Home) => Some(home),
            Some(Side::Away) => Some(away),
            None => None,
        })
    }

    /// Key the correlation join buckets by: `"{match}:{outcome}"`.
    #[must_use]
    pub fn correlation_key(&self) -> String {
        format!("{}:{}", self.match_id, self.outcome.as_str())
    }

    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Running score of a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

/// A score snapshot as it arrives on the score feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventScore {
    #[serde(rename = "match")]
    pub match_id: String,
    pub score: Score,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl EventScore {
    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// One goal, derived from consecutive score snapshots of the same match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalEvent {
    #[serde(rename = "match")]
    pub match_id: String,
    /// Name of the scoring team, taken from the match identifier.
    pub team: String,
    pub side: Side,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl GoalEvent {
    /// Same key shape as [`Bet::correlation_key`], so a goal lands in the
    /// bucket of the wagers that backed it.
    #[must_use]
    pub fn correlation_key(&self) -> String {
        format!("{}:{}", self.match_id, self.side.as_str())
    }

    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// A wager flagged because the team it backed scored within the suspicion
/// window after the wager was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fraud {
    pub bettor: String,
    pub outcome: Outcome,
    pub amount: i64,
    #[serde(rename = "match")]
    pub match_id: String,
    pub odds: Decimal,
    /// Milliseconds from wager to goal. Always in `[0, window)`.
    pub lag: i64,
}

impl Fraud {
    #[must_use]
    pub fn from_correlated(bet: &Bet, goal: &GoalEvent) -> Self {
        Self {
            bettor: bet.bettor.clone(),
            outcome: bet.outcome,
            amount: bet.amount,
            match_id: bet.match_id.clone(),
            odds: bet.odds,
            lag: goal.timestamp_ms() - bet.timestamp_ms(),
        }
    }
}

/// One changelog entry of a keyed running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalUpdate {
    pub key: String,
    pub total: i64,
}

impl TotalUpdate {
    #[must_use]
    pub fn new(key: impl Into<String>, total: i64) -> Self {
        Self {
            key: key.into(),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn make_bet(outcome: Outcome) -> Bet {
        Bet {
            bettor: "alice".to_string(),
            match_id: "arsenal-chelsea".to_string(),
            outcome,
            amount: 100,
            odds: dec!(1.85),
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        }
    }

    #[test]
    fn bet_round_trips_wire_format() {
        let bet = make_bet(Outcome::Home);
        let json = serde_json::to_value(&bet).unwrap();
        assert_eq!(json["match"], "arsenal-chelsea");
        assert_eq!(json["outcome"], "H");
        assert_eq!(json["timestamp"], 1_700_000_000_000_i64);
        let back: Bet = serde_json::from_value(json).unwrap();
        assert_eq!(back, bet);
    }

    #[test]
    fn outcome_codes_round_trip() {
        for (outcome, code) in [
            (Outcome::Home, "\"H\""),
            (Outcome::Away, "\"A\""),
            (Outcome::Draw, "\"D\""),
        ] {
            assert_eq!(serde_json::to_string(&outcome).unwrap(), code);
            let back: Outcome = serde_json::from_str(code).unwrap();
            assert_eq!(back, outcome);
        }
    }

    #[test]
    fn backed_team_picks_side_from_match_id() {
        assert_eq!(
            make_bet(Outcome::Home).backed_team().unwrap(),
            Some("arsenal")
        );
        assert_eq!(
            make_bet(Outcome::Away).backed_team().unwrap(),
            Some("chelsea")
        );
        assert_eq!(make_bet(Outcome::Draw).backed_team().unwrap(), None);
    }

    #[test]
    fn backed_team_rejects_malformed_match_even_for_draws() {
        let mut bet = make_bet(Outcome::Draw);
        bet.match_id = "nothyphenated".to_string();
        assert!(bet.backed_team().is_err());
    }

    #[test]
    fn match_teams_takes_first_two_tokens() {
        assert_eq!(match_teams("a-b").unwrap(), ("a", "b"));
        assert_eq!(match_teams("a-b-c").unwrap(), ("a", "b"));
    }

    #[test]
    fn match_teams_rejects_missing_or_empty_tokens() {
        assert!(match_teams("arsenal").is_err());
        assert!(match_teams("-chelsea").is_err());
        assert!(match_teams("arsenal-").is_err());
        assert!(match_teams("").is_err());
    }

    #[test]
    fn correlation_keys_line_up_for_bet_and_goal() {
        let bet = make_bet(Outcome::Away);
        let goal = GoalEvent {
            match_id: "arsenal-chelsea".to_string(),
            team: "chelsea".to_string(),
            side: Side::Away,
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_500).unwrap(),
        };
        assert_eq!(bet.correlation_key(), goal.correlation_key());
        assert_eq!(bet.correlation_key(), "arsenal-chelsea:A");
    }

    #[test]
    fn fraud_captures_wager_fields_and_lag() {
        let bet = make_bet(Outcome::Home);
        let goal = GoalEvent {
            match_id: "arsenal-chelsea".to_string(),
            team: "arsenal".to_string(),
            side: Side::Home,
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_750).unwrap(),
        };
        let fraud = Fraud::from_correlated(&bet, &goal);
        assert_eq!(fraud.bettor, "alice");
        assert_eq!(fraud.outcome, Outcome::Home);
        assert_eq!(fraud.amount, 100);
        assert_eq!(fraud.odds, dec!(1.85));
        assert_eq!(fraud.lag, 750);
    }

    #[test]
    fn event_score_deserializes_nested_score() {
        let json = r#"{"match":"x-y","score":{"home":1,"away":0},"timestamp":1700000000500}"#;
        let event: EventScore = serde_json::from_str(json).unwrap();
        assert_eq!(event.match_id, "x-y");
        assert_eq!(event.score, Score { home: 1, away: 0 });
        assert_eq!(event.timestamp_ms(), 1_700_000_000_500);
    }
}
