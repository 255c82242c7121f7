use anyhow::Result;
use clap::{Parser, Subcommand};
use jobscout::store::JobFilter;
use jobscout::{AppConfig, JobStore, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Scrape, score and track job postings against a candidate profile")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one full pipeline pass: harvest, score, persist, notify
    Run,
    /// Serve the dashboard JSON API
    Serve {
        #[arg(long, default_value_t = 8800)]
        port: u16,
    },
    /// Print store statistics
    Stats,
    /// List the best stored matches
    Top {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Remove old, low-score, unapplied postings
    Prune {
        #[arg(long, default_value_t = 40.0)]
        max_score: f64,
        #[arg(long, default_value_t = 30)]
        older_than_days: u32,
    },
    /// Write an annotated sample configuration file
    InitConfig {
        #[arg(default_value = "jobscout.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jobscout=info,rocket::server=off")),
        )
        .init();

    let cli = Cli::parse();

    if let Command::InitConfig { path } = &cli.command {
        return AppConfig::write_sample(path);
    }

    let config = AppConfig::load(cli.config.as_deref())?;
    let store = JobStore::connect(&config.database_path).await?;

    match cli.command {
        Command::Run => {
            let pipeline = Pipeline::new(config, store);
            let summary = pipeline.run().await?;
            // Individual source failures are soft; reaching this point is
            // a successful run and the process exits zero.
            println!("Run summary");
            println!("  scraped:        {}", summary.scraped);
            println!("  unique:         {}", summary.unique);
            println!("  relevant:       {}", summary.relevant);
            println!("  newly saved:    {}", summary.saved);
            println!("  high priority:  {}", summary.high_priority);
            for report in &summary.sources {
                println!("  source {:<50} {:?}", report.source, report.outcome);
            }
        }
        Command::Serve { port } => {
            let pipeline = Arc::new(Pipeline::new(config, store));
            jobscout::web::serve(pipeline, port).await?;
        }
        Command::Stats => {
            let stats = store.stats(config.matching.high_priority_score).await?;
            println!("Total jobs:     {}", stats.total);
            println!("Not applied:    {}", stats.not_applied);
            println!("High priority:  {}", stats.high_priority);
            println!("Applications:   {}", stats.applied);
        }
        Command::Top { limit } => {
            let filter = JobFilter {
                not_applied: true,
                ..JobFilter::default()
            };
            for job in store.query(&filter, limit).await? {
                println!(
                    "{:>5.1}  {} at {} ({}) [{}]",
                    job.relevance_score, job.title, job.company, job.location, job.source_platform
                );
            }
        }
        Command::Prune {
            max_score,
            older_than_days,
        } => {
            let removed = store.prune(max_score, older_than_days).await?;
            println!("Removed {} stale postings", removed);
        }
        Command::InitConfig { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}
