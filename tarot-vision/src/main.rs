//! tarot-vision command-line tool
//!
//! Inspects and maintains the annotation data folder: batch tasks, the
//! review queue, stored annotation records, and ad-hoc comparison of two
//! raw model responses.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use tarot_common::config::{
    default_config_path, load_toml_config_or_default, resolve_root_folder, ConfigOrigin, DataLayout,
    TomlConfig,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tarot_vision::models::{AnnotationRecord, DifferenceStats};
use tarot_vision::services::{card_reference, parse_recognition};
use tarot_vision::store::{open_stores, task_max_age, LabelStore, TaskStore};

/// Command-line arguments for tarot-vision
#[derive(Parser, Debug)]
#[command(name = "tarot-vision")]
#[command(about = "Dual-recognition annotation tools for tarot spread photos")]
#[command(version)]
struct Cli {
    /// Root folder holding images, labels and task records
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Batch annotation tasks
    #[command(subcommand)]
    Tasks(TaskCommand),

    /// Human review queue
    #[command(subcommand)]
    Review(ReviewCommand),

    /// Recompute differences and provisional labels of every stored record
    Reconcile,

    /// List the standard deck, or cards matching a name fragment
    Cards {
        query: Option<String>,
    },

    /// Compare two raw model responses
    Compare {
        /// File holding the first response text
        first: PathBuf,
        /// File holding the second response text
        second: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// List tasks, newest first
    List,
    /// Print one task as JSON
    Show { task_id: String },
    /// Mark a pending or running task cancelled
    Cancel { task_id: String },
    /// Delete a finished task
    Delete { task_id: String },
    /// Delete old task records
    Clean {
        /// Overrides `annotation.task_max_age_days`
        #[arg(long)]
        max_age_days: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum ReviewCommand {
    /// Review queue summary
    List,
    /// Next image awaiting review
    Next {
        /// Start after this image
        #[arg(long)]
        after: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(|| default_config_path().ok());
    let (config, origin) = match config_path.as_deref() {
        Some(path) => load_toml_config_or_default(path),
        None => (TomlConfig::default(), ConfigOrigin::Missing),
    };

    init_tracing(&config.logging.level);

    match (&config_path, origin) {
        (Some(path), ConfigOrigin::File) => info!("Loaded config from {}", path.display()),
        (Some(path), ConfigOrigin::Invalid(e)) => {
            warn!("Ignoring config file {}: {}", path.display(), e)
        }
        _ => info!("No config file found, using defaults"),
    }

    let root = resolve_root_folder(cli.root_folder.as_deref(), &config);
    let layout = DataLayout::new(&root);
    layout
        .ensure_directories()
        .with_context(|| format!("Failed to prepare data folder {}", root.display()))?;
    info!("Root folder: {}", root.display());

    let (tasks, labels) = open_stores(&layout);

    match cli.command {
        Command::Tasks(command) => run_tasks(command, &tasks, &config),
        Command::Review(command) => run_review(command, &labels),
        Command::Reconcile => {
            let report = labels.reconcile_all().context("Reconcile failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Cards { query } => {
            for card in card_reference::lookup(query.as_deref().unwrap_or_default()) {
                println!("{:<14} {:<22} {}", card.key, card.name_canonical, card.name_local);
            }
            Ok(())
        }
        Command::Compare { first, second } => run_compare(&first, &second),
    }
}

/// RUST_LOG wins over the configured level
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tarot_vision={0},tarot_common={0}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_tasks(command: TaskCommand, tasks: &TaskStore, config: &TomlConfig) -> Result<()> {
    match command {
        TaskCommand::List => {
            for task in tasks.list_tasks().context("Failed to list tasks")? {
                println!(
                    "{}  {:<9}  {}/{} ({:.0}%)  {}  {}",
                    task.task_id,
                    task.status.as_str(),
                    task.processed_images,
                    task.total_images,
                    task.percentage(),
                    task.start_time.format("%Y-%m-%d %H:%M:%S"),
                    task.model_id
                );
            }
        }
        TaskCommand::Show { task_id } => match tasks.load_task(&task_id)? {
            Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
            None => bail!("Task not found: {}", task_id),
        },
        TaskCommand::Cancel { task_id } => {
            let Some(task) = tasks.load_task(&task_id)? else {
                bail!("Task not found: {}", task_id);
            };
            if task.status.is_terminal() {
                bail!("Task {} is already {}", task_id, task.status.as_str());
            }
            tasks.cancel_task(&task_id)?;
            println!("Cancelled {}", task_id);
        }
        TaskCommand::Delete { task_id } => {
            if tasks.delete_task(&task_id)? {
                println!("Deleted {}", task_id);
            } else {
                bail!("Task not found: {}", task_id);
            }
        }
        TaskCommand::Clean { max_age_days } => {
            let days = max_age_days.unwrap_or(config.annotation.task_max_age_days);
            let deleted = tasks.clean_old_tasks(task_max_age(days))?;
            println!("Deleted {} task(s) older than {} day(s)", deleted, days);
        }
    }
    Ok(())
}

fn run_review(command: ReviewCommand, labels: &LabelStore) -> Result<()> {
    match command {
        ReviewCommand::List => {
            let queue = labels.review_list().context("Failed to build review list")?;
            for image in &queue.images {
                println!(
                    "{:<9} {:<32} {} card(s), {} difference(s){}",
                    format!("{:?}", image.status).to_lowercase(),
                    image.filename,
                    image.total_cards,
                    image.difference_count,
                    if image.requires_attention { "  [attention]" } else { "" }
                );
            }
            println!(
                "{} image(s): {} reviewed, {} pending",
                queue.total_images, queue.reviewed_images, queue.pending_images
            );
        }
        ReviewCommand::Next { after } => {
            match labels.next_pending_after(after.as_deref().unwrap_or_default())? {
                Some(filename) => println!("{}", filename),
                None => println!("Nothing left to review"),
            }
        }
    }
    Ok(())
}

fn run_compare(first: &Path, second: &Path) -> Result<()> {
    let first_text = std::fs::read_to_string(first)
        .with_context(|| format!("Failed to read {}", first.display()))?;
    let second_text = std::fs::read_to_string(second)
        .with_context(|| format!("Failed to read {}", second.display()))?;

    let filename = first
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let record = AnnotationRecord::from_recognitions(
        filename,
        "compare",
        parse_recognition(&first_text),
        parse_recognition(&second_text),
        Utc::now(),
    );

    let report = json!({
        "hasDifference": record.has_difference,
        "stats": DifferenceStats::from_differences(&record.differences),
        "differences": record.differences,
        "finalLabel": record.final_label,
        "status": record.status,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
