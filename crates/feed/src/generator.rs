//! Deterministic synthetic feeds for demos and end-to-end runs.
//!
//! The same seed always yields the same feeds. A configurable share of
//! wagers is written as insiders: placed on an outcome within the second
//! before a goal by that team, so downstream correlation has something
//! to find.

use anyhow::{Context, Result};
use betflow_core::events::{Bet, EventScore, Outcome, Score, Side};
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const TEAMS: [&str; 24] = [
    "ajax", "arsenal", "bayern", "benfica", "celtic", "chelsea", "dortmund", "espanyol", "fulham",
    "genoa", "girona", "inter", "juventus", "lazio", "leeds", "lyon", "milan", "monaco", "napoli",
    "porto", "rennes", "sevilla", "valencia", "villarreal",
];

const BETTORS: [&str; 20] = [
    "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy", "mallory",
    "niaj", "olivia", "peggy", "rupert", "sybil", "trent", "victor", "walter", "wendy",
];

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub wagers: usize,
    pub matches: usize,
    pub bettors: usize,
    /// Share of wagers placed within the second before a goal they back.
    pub insider_rate: f64,
    pub kickoff_ms: i64,
    pub match_duration_ms: i64,
    pub max_goals_per_match: u32,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            wagers: 1_000,
            matches: 8,
            bettors: 40,
            insider_rate: 0.02,
            kickoff_ms: 1_700_000_000_000,
            match_duration_ms: 90 * 60 * 1_000,
            max_goals_per_match: 5,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFeeds {
    pub bets: Vec<Bet>,
    pub scores: Vec<EventScore>,
}

struct PlannedGoal {
    match_id: String,
    side: Side,
    ts_ms: i64,
}

/// Generates both feeds from the config's seed.
///
/// Score snapshots are emitted in event-time order. Wagers are emitted
/// in generation order, which is unrelated to their event times, so a
/// replay exercises out-of-order arrival.
#[must_use]
pub fn generate(config: &GeneratorConfig) -> GeneratedFeeds {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let duration = config.match_duration_ms.max(1);
    let matches: Vec<String> = (0..config.matches.max(1)).map(match_name).collect();

    let mut goals: Vec<PlannedGoal> = Vec::new();
    let mut scores = Vec::new();
    for match_id in &matches {
        scores.push(EventScore {
            match_id: match_id.clone(),
            score: Score::default(),
            timestamp: ms(config.kickoff_ms),
        });
        let count = rng.gen_range(0..=config.max_goals_per_match);
        let mut times: Vec<i64> = (0..count)
            .map(|_| config.kickoff_ms + rng.gen_range(0..duration))
            .collect();
        times.sort_unstable();
        let mut score = Score::default();
        for ts_ms in times {
            let side = if rng.gen_bool(0.5) {
                Side::Home
            } else {
                Side::Away
            };
            match side {
                Side::Home => score.home += 1,
                Side::Away => score.away += 1,
            }
            goals.push(PlannedGoal {
                match_id: match_id.clone(),
                side,
                ts_ms,
            });
            scores.push(EventScore {
                match_id: match_id.clone(),
                score,
                timestamp: ms(ts_ms),
            });
        }
    }
    scores.sort_by_key(EventScore::timestamp_ms);

    let insider_rate = if config.insider_rate.is_finite() {
        config.insider_rate.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let bettors = config.bettors.max(1);

    let mut bets = Vec::with_capacity(config.wagers);
    for _ in 0..config.wagers {
        let insider = !goals.is_empty() && rng.gen_bool(insider_rate);
        let bet = if insider {
            let goal = &goals[rng.gen_range(0..goals.len())];
            Bet {
                bettor: bettor_name(rng.gen_range(0..bettors)),
                match_id: goal.match_id.clone(),
                outcome: goal.side.to_outcome(),
                amount: rng.gen_range(1..=500) * 10,
                odds: Decimal::new(rng.gen_range(110..=900), 2),
                timestamp: ms(goal.ts_ms - rng.gen_range(0..1_000)),
            }
        } else {
            Bet {
                bettor: bettor_name(rng.gen_range(0..bettors)),
                match_id: matches[rng.gen_range(0..matches.len())].clone(),
                outcome: match rng.gen_range(0..5) {
                    0 | 1 => Outcome::Home,
                    2 | 3 => Outcome::Away,
                    _ => Outcome::Draw,
                },
                amount: rng.gen_range(1..=500) * 10,
                odds: Decimal::new(rng.gen_range(110..=900), 2),
                timestamp: ms(config.kickoff_ms + rng.gen_range(-60_000..duration)),
            }
        };
        bets.push(bet);
    }

    GeneratedFeeds { bets, scores }
}

/// Generates both feeds and writes them as JSONL.
///
/// # Errors
///
/// Returns an error if either file cannot be written.
pub fn write_feeds(
    config: &GeneratorConfig,
    bets_path: impl AsRef<Path>,
    scores_path: impl AsRef<Path>,
) -> Result<GeneratedFeeds> {
    let feeds = generate(config);
    write_jsonl(bets_path.as_ref(), &feeds.bets)?;
    write_jsonl(scores_path.as_ref(), &feeds.scores)?;
    Ok(feeds)
}

fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn ms(ts_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts_ms).unwrap_or_default()
}

fn match_name(i: usize) -> String {
    let home = TEAMS[i % TEAMS.len()];
    let mut away_idx = (i + 1 + i / TEAMS.len()) % TEAMS.len();
    if TEAMS[away_idx] == home {
        away_idx = (away_idx + 1) % TEAMS.len();
    }
    format!("{}-{}", home, TEAMS[away_idx])
}

fn bettor_name(i: usize) -> String {
    let base = BETTORS[i % BETTORS.len()];
    if i < BETTORS.len() {
        base.to_string()
    } else {
        format!("{}{}", base, i / BETTORS.len())
    }
}
