use clap::{Parser, Subcommand};

use betflow_feed::generator::{write_feeds, GeneratorConfig};
use betflow_feed::{JsonlBetSource, JsonlScoreSource, JsonlSink};
use betflow_pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "betflow")]
#[command(about = "Streaming wager totals and insider fraud detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the wager and score feeds through the pipeline
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
        /// Wager feed path (overrides the config)
        #[arg(long)]
        bets: Option<String>,
        /// Score feed path (overrides the config)
        #[arg(long)]
        scores: Option<String>,
    },
    /// Write synthetic wager and score feeds
    Generate {
        /// Number of wagers to synthesize
        #[arg(long, default_value_t = 10_000)]
        wagers: usize,
        /// Number of matches the wagers are spread across
        #[arg(long, default_value_t = 16)]
        matches: usize,
        /// Number of distinct bettors
        #[arg(long, default_value_t = 40)]
        bettors: usize,
        /// Fraction of wagers placed just before a goal they back
        #[arg(long, default_value_t = 0.02)]
        insider_rate: f64,
        /// Seed for deterministic output
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Output path for the wager feed
        #[arg(long, default_value = "data/bets.jsonl")]
        out_bets: String,
        /// Output path for the score feed
        #[arg(long, default_value = "data/scores.jsonl")]
        out_scores: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run {
            config,
            bets,
            scores,
        } => {
            run_pipeline(&config, bets.as_deref(), scores.as_deref()).await?;
        }
        Commands::Generate {
            wagers,
            matches,
            bettors,
            insider_rate,
            seed,
            out_bets,
            out_scores,
        } => {
            run_generate(wagers, matches, bettors, insider_rate, seed, &out_bets, &out_scores)?;
        }
    }

    Ok(())
}

async fn run_pipeline(
    config_path: &str,
    bets_override: Option<&str>,
    scores_override: Option<&str>,
) -> anyhow::Result<()> {
    tracing::info!("Starting pipeline with config: {}", config_path);

    let config = betflow_core::ConfigLoader::load_from(config_path)?;

    let bets_path = bets_override.unwrap_or(&config.feeds.bets);
    let scores_path = scores_override.unwrap_or(&config.feeds.scores);

    let bet_source = JsonlBetSource::open(bets_path)?;
    let score_source = JsonlScoreSource::open(scores_path)?;
    tracing::info!(
        "Replaying {} wagers from {} and {} score snapshots from {}",
        bet_source.len(),
        bets_path,
        score_source.len(),
        scores_path
    );

    let pipeline = Pipeline::new(
        &config,
        Box::new(bet_source),
        Box::new(score_source),
        Box::new(JsonlSink::create(&config.feeds.bettor_totals)?),
        Box::new(JsonlSink::create(&config.feeds.team_totals)?),
        Box::new(JsonlSink::create(&config.feeds.frauds)?),
    );

    let report = pipeline.run().await?;

    println!("{report}");
    println!("Bettor totals -> {}", config.feeds.bettor_totals);
    println!("Team totals   -> {}", config.feeds.team_totals);
    println!("Frauds        -> {}", config.feeds.frauds);

    Ok(())
}

fn run_generate(
    wagers: usize,
    matches: usize,
    bettors: usize,
    insider_rate: f64,
    seed: u64,
    out_bets: &str,
    out_scores: &str,
) -> anyhow::Result<()> {
    tracing::info!(
        "Generating {} wagers across {} matches (seed {})",
        wagers,
        matches,
        seed
    );

    let config = GeneratorConfig {
        wagers,
        matches,
        bettors,
        insider_rate,
        seed,
        ..GeneratorConfig::default()
    };
    let feeds = write_feeds(&config, out_bets, out_scores)?;

    println!("Wrote {} wagers to {}", feeds.bets.len(), out_bets);
    println!("Wrote {} score snapshots to {}", feeds.scores.len(), out_scores);

    Ok(())
}
