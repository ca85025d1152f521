use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use uuid::Uuid;
use workflow_coach::{CoachConfig, CoachService, Database, HttpInsightAugmenter};
use workflow_coach_sdk::{ActivityEvent, Feedback, InsightAugmenter};

#[derive(Parser, Debug)]
#[command(name = "workflow-coach", about = "Workflow analysis and coaching insights")]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record JSON-lines activity events read from stdin
    Ingest {
        #[arg(long)]
        user: String,
        #[arg(long)]
        session: String,
    },
    /// Record a single activity event
    Record {
        #[arg(long)]
        user: String,
        #[arg(long)]
        session: String,
        /// Event as JSON, e.g. '{"type":"command","command":"cargo test"}'
        #[arg(long)]
        event: String,
    },
    /// Analyze a workflow now and print the result
    Analyze { workflow_id: Uuid },
    /// Mark a workflow completed
    Complete { workflow_id: Uuid },
    /// List pending insights for a user
    Insights {
        #[arg(long)]
        user: String,
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
    /// Mark an insight as shown
    Shown { insight_id: Uuid },
    /// Record feedback on an insight
    Feedback {
        insight_id: Uuid,
        /// positive, negative or neutral
        #[arg(value_parser = parse_feedback)]
        feedback: Feedback,
        #[arg(long)]
        details: Option<String>,
    },
    /// Show workflow statistics for a user
    Stats {
        #[arg(long)]
        user: String,
    },
    /// Record an occurrence of a workflow pattern
    Pattern {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
    },
    /// Delete expired insights
    Purge,
}

fn parse_feedback(s: &str) -> Result<Feedback, String> {
    Feedback::parse(&s.to_lowercase())
        .ok_or_else(|| format!("expected positive, negative or neutral, got '{}'", s))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CoachConfig::load(cli.config.as_deref())?;

    let db = Arc::new(Database::new(config.database_path.clone())?);
    db.initialize_schema()?;

    let augmenter: Option<Arc<dyn InsightAugmenter>> = match &config.augmentation {
        Some(aug) => {
            info!(endpoint = %aug.endpoint, model = %aug.model, "Insight augmentation enabled");
            Some(Arc::new(HttpInsightAugmenter::new(aug.clone())?))
        }
        None => None,
    };

    let service = CoachService::new(db.clone(), augmenter, &config);
    let result = run(cli.command, &service, &db).await;
    service.shutdown().await;
    result
}

async fn run(command: Commands, service: &CoachService, db: &Database) -> Result<()> {
    match command {
        Commands::Ingest { user, session } => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut recorded = 0usize;
            let mut line_no = 0usize;

            while let Some(line) = lines.next_line().await? {
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                let event: ActivityEvent = match serde_json::from_str(&line) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(line = line_no, error = %e, "Skipping invalid event");
                        continue;
                    }
                };
                if service.record_activity(&user, &session, event).await.is_some() {
                    recorded += 1;
                }
            }

            info!(recorded, "Ingest finished");
        }
        Commands::Record {
            user,
            session,
            event,
        } => {
            let event: ActivityEvent =
                serde_json::from_str(&event).context("Invalid activity event JSON")?;
            let workflow_id = service
                .record_activity(&user, &session, event)
                .await
                .ok_or_else(|| anyhow!("Activity was not recorded, see log for details"))?;
            println!("{}", workflow_id);
        }
        Commands::Analyze { workflow_id } => {
            let outcome = service.analyze_now(workflow_id).await?;
            print_json(&outcome)?;
        }
        Commands::Complete { workflow_id } => {
            service.complete_workflow(workflow_id).await?;
            println!("Completed {}", workflow_id);
        }
        Commands::Insights { user, limit } => {
            let insights = service.list_pending(&user, limit).await?;
            print_json(&insights)?;
        }
        Commands::Shown { insight_id } => {
            service.mark_shown(insight_id).await?;
        }
        Commands::Feedback {
            insight_id,
            feedback,
            details,
        } => {
            service
                .record_feedback(insight_id, feedback, details.as_deref())
                .await?;
        }
        Commands::Stats { user } => {
            let stats = service.get_user_stats(&user).await?;
            print_json(&stats)?;
        }
        Commands::Pattern { user, name } => {
            let frequency = db.record_pattern(&user, &name)?;
            println!("{}: {}", name, frequency);
        }
        Commands::Purge => {
            let deleted = service.purge_expired().await?;
            println!("Deleted {} expired insights", deleted);
        }
    }

    Ok(())
}
