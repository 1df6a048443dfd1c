//! draft-status: inspect a local store snapshot from the command line.
//!
//! Prints every document with its scenes' traffic-light statuses, the state
//! of both document gates, and the outstanding sync queue. Read-only: the
//! snapshot is never written back.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use draft_core::gates::{review_ready, sensory_coverage_met};
use draft_core::model::ValidationStatus;
use draft_sync::LocalStore;

#[derive(Parser, Debug)]
#[command(name = "draft-status")]
#[command(about = "Inspect a manuscript store snapshot")]
struct Args {
    /// Path to the store snapshot file
    #[arg(short, long)]
    state: PathBuf,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

fn status_glyph(status: ValidationStatus) -> &'static str {
    match status {
        ValidationStatus::Red => "red",
        ValidationStatus::Yellow => "yellow",
        ValidationStatus::Green => "green",
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = LocalStore::load(&args.state)
        .with_context(|| format!("Failed to load snapshot {}", args.state.display()))?;
    debug!("Loaded snapshot from {}", args.state.display());

    let documents = store.documents();
    if documents.is_empty() {
        println!("No documents in {}", args.state.display());
        return Ok(());
    }

    for document in &documents {
        let display_title = if document.mask_title {
            &document.title
        } else {
            &document.real_name
        };
        println!(
            "{} ({:?}, {} words)",
            display_title, document.current_section, document.word_count
        );

        for scene in store.scenes_of(&document.id) {
            let checked = scene.checklist.iter().filter(|i| i.checked).count();
            println!(
                "  [{}] {:>2}. {} ({}/{} checked, {} words)",
                status_glyph(scene.validation),
                scene.position,
                scene.title,
                checked,
                scene.checklist.len(),
                scene.word_count
            );
        }

        let annotations = store.annotations_of(&document.id);
        let coverage = sensory_coverage_met(&document.palette);
        let review = review_ready(document, &annotations);
        println!(
            "  gates: sensory coverage {}, final review {}",
            if coverage { "met" } else { "not met" },
            if review { "ready" } else { "not ready" }
        );
    }

    println!();
    println!(
        "{} documents, {} pending sync operations",
        documents.len(),
        store.queue_len()
    );

    Ok(())
}
