//! rustarxiv - arXiv Paper Feed Pipeline
//!
//! Fetches the newest papers for a set of arXiv categories concurrently,
//! merges them into one deduplicated feed, and optionally enriches papers
//! with AI-generated summaries.
//!
//! ## Usage
//!
//! ```bash
//! rustarxiv latest cs.AI cs.LG
//! rustarxiv latest --summarize
//! rustarxiv prefs toggle cs cs.AI
//! rustarxiv taxonomy
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rustarxiv::aggregator::{Aggregator, LoadPhase};
use rustarxiv::client::ArxivClient;
use rustarxiv::paper::Paper;
use rustarxiv::prefs::{CategorySelections, SavedPapers};
use rustarxiv::summary::SummaryTracker;
use rustarxiv::{extract, taxonomy};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// arXiv Paper Feed Pipeline - Rust Microservice
#[derive(Parser)]
#[command(name = "rustarxiv")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the newest papers for the given (or stored) categories
    Latest {
        /// Category ids (e.g. cs.AI); defaults to the stored selections
        categories: Vec<String>,

        /// Generate AI summaries of the fetched abstracts
        #[arg(long)]
        summarize: bool,

        /// Summarize the full PDF text of the paper with this id
        #[arg(long)]
        full_summary: Option<String>,

        /// Toggle the paper with this id on the saved list
        #[arg(long)]
        save: Option<String>,
    },

    /// Print the category taxonomy
    Taxonomy,

    /// Manage stored category selections
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// List saved papers
    Saved,
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Show current selections
    Show,
    /// Toggle a subcategory within a field (max 3 per field)
    Toggle { field: String, subcategory: String },
    /// Clear all selections
    Clear,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Latest {
            categories,
            summarize,
            full_summary,
            save,
        } => run_latest(categories, summarize, full_summary, save).await,
        Commands::Taxonomy => run_taxonomy().await,
        Commands::Prefs { action } => handle_prefs(action),
        Commands::Saved => list_saved(),
    }
}

// ============================================================================
// Latest Papers
// ============================================================================

async fn run_latest(
    categories: Vec<String>,
    summarize: bool,
    full_summary: Option<String>,
    save: Option<String>,
) -> Result<()> {
    let categories = if categories.is_empty() {
        let selections = CategorySelections::new().context("Failed to open selections store")?;
        selections.all_selected()
    } else {
        categories
    };

    if categories.is_empty() {
        bail!("No categories given and no stored selections; try `rustarxiv prefs toggle cs cs.AI`");
    }

    let client = Arc::new(ArxivClient::new().context("Failed to build arXiv client")?);
    let aggregator = Aggregator::new(client);

    // Report progress as batches land, before the slowest category finishes.
    let mut updates = aggregator.subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.phase == LoadPhase::Loading && !snapshot.papers.is_empty() {
                println!("... {} papers so far", snapshot.papers.len());
            }
        }
    });

    aggregator
        .load(&categories)
        .await
        .context("Load failed for every category")?;
    progress.abort();

    let papers = aggregator.papers();
    println!(
        "\nFound {} papers for {}:\n",
        papers.len(),
        categories.join(", ")
    );
    for paper in papers.iter() {
        println!(
            "  {}  {}  {}",
            paper.published.format("%Y-%m-%d"),
            paper.id,
            paper.title
        );
        if !paper.authors.is_empty() {
            println!("              {}", paper.authors.join(", "));
        }
    }

    if let Some(id) = save {
        let Some(paper) = papers.iter().find(|p| p.id == id) else {
            bail!("Paper {id} is not in the fetched results");
        };
        let mut saved = SavedPapers::new().context("Failed to open saved-papers store")?;
        saved.toggle(paper)?;
        if saved.is_saved(&id) {
            println!("\nAdded to the saved list: {id}");
        } else {
            println!("\nRemoved from the saved list: {id}");
        }
    }

    if summarize {
        summarize_abstracts(&papers).await;
    }

    if let Some(id) = full_summary {
        let Some(paper) = papers.iter().find(|p| p.id == id) else {
            bail!("Paper {id} is not in the fetched results");
        };
        summarize_full_text(paper).await?;
    }

    Ok(())
}

async fn summarize_abstracts(papers: &[Paper]) {
    let tracker = SummaryTracker::from_env();
    for paper in papers {
        tracker.request_summary(paper);
    }

    // Generations are fire-and-forget; poll until they settle.
    while tracker.has_pending() {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    println!();
    for paper in papers {
        match tracker.summary(&paper.id) {
            Some(summary) => println!("== {} ==\n{}\n", paper.title, summary),
            None => println!("== {} ==\n(no summary available)\n", paper.title),
        }
    }
}

async fn summarize_full_text(paper: &Paper) -> Result<()> {
    let client = reqwest::Client::builder()
        .user_agent("rustarxiv/1.0")
        .build()
        .context("Failed to build HTTP client")?;

    println!("\nExtracting full text of {}...", paper.id);
    let text = extract::extract_text_for(&client, paper)
        .await
        .context("Failed to extract PDF text")?;

    let tracker = SummaryTracker::from_env();
    tracker.request(&paper.id, text);
    while tracker.has_pending() {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    match tracker.summary(&paper.id) {
        Some(summary) => println!("\n== {} (full text) ==\n{}", paper.title, summary),
        None => println!("\n(no summary available)"),
    }
    Ok(())
}

// ============================================================================
// Taxonomy
// ============================================================================

async fn run_taxonomy() -> Result<()> {
    let client = reqwest::Client::builder()
        .user_agent("rustarxiv/1.0")
        .timeout(Duration::from_secs(20))
        .build()
        .context("Failed to build HTTP client")?;

    let fields = taxonomy::fetch_taxonomy(&client)
        .await
        .context("Failed to load category taxonomy")?;

    for field in fields {
        println!("{} ({})", field.name, field.id);
        for sub in field.subcategories {
            println!("  {:12} {}", sub.id, sub.name);
        }
    }
    Ok(())
}

// ============================================================================
// Preferences & Saved Papers
// ============================================================================

fn handle_prefs(action: PrefsAction) -> Result<()> {
    match action {
        PrefsAction::Show => {
            let selections =
                CategorySelections::new().context("Failed to open selections store")?;
            let all = selections.all_selected();
            if all.is_empty() {
                println!("No selections stored.");
            } else {
                for category in all {
                    println!("{category}");
                }
            }
        }
        PrefsAction::Toggle { field, subcategory } => {
            let mut selections =
                CategorySelections::new().context("Failed to open selections store")?;
            selections.toggle(&field, &subcategory)?;
            let selected: Vec<String> = selections.selected_in(&field).into_iter().collect();
            println!("Selections in {}: {}", field, selected.join(", "));
        }
        PrefsAction::Clear => {
            let mut selections =
                CategorySelections::new().context("Failed to open selections store")?;
            selections.clear()?;
            println!("Cleared selections.");
        }
    }
    Ok(())
}

fn list_saved() -> Result<()> {
    let saved = SavedPapers::new().context("Failed to open saved-papers store")?;
    if saved.papers().is_empty() {
        println!("No saved papers.");
        return Ok(());
    }
    for paper in saved.papers() {
        println!(
            "  {}  {}  {}",
            paper.published.format("%Y-%m-%d"),
            paper.id,
            paper.title
        );
    }
    Ok(())
}
