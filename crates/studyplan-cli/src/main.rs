//! CLI entry point for the study planner backend.
//!
//! This binary provides the `studyplan` command with subcommands for
//! serving the HTTP API and inspecting the store.

mod cli;
mod helpers;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use studyplan_store::model::timestamp;
use studyplan_store::{ProgressStore, PublicStudent, StoreConfig, StudentStore};
use studyplan_web::{AppState, WebConfig, WebServer};

use crate::cli::{Cli, Commands};
use crate::helpers::init_tracing;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; explicit environment variables still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let store = cli.store.to_config();

    match cli.command {
        Commands::Serve { bind, port } => {
            cmd_serve(store, WebConfig { bind_addr: bind, port }).await
        }
        Commands::Status => cmd_status(store).await,
        Commands::Students { json } => cmd_students(store, json).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(store: StoreConfig, web: WebConfig) -> Result<()> {
    info!(
        data_path = %store.data_path.display(),
        hash_iterations = store.hash_iterations,
        "starting study planner backend"
    );

    let db = store.database();
    // Touch the store so a bad path or corrupt file fails at startup.
    let stats = ProgressStore::new(db.clone())
        .stats()
        .await
        .context("failed to open student store")?;
    info!(
        students = stats.total_students,
        records = stats.total_student_data,
        "store ready"
    );

    let state = AppState::new(db, store.hasher(), web);
    WebServer::new(state)
        .start()
        .await
        .context("web server failed")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

async fn cmd_status(store: StoreConfig) -> Result<()> {
    println!();
    println!("  Study planner v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if !store.data_path.exists() {
        println!("  Store:            MISSING ({})", store.data_path.display());
        println!();
        return Ok(());
    }

    let stats = ProgressStore::new(store.database())
        .stats()
        .await
        .context("failed to read student store")?;

    println!("  Store:            OK ({})", store.data_path.display());
    println!("  Students:         {}", stats.total_students);
    println!("  Saved records:    {}", stats.total_student_data);
    println!("  Hash iterations:  {}", store.hash_iterations);
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: students
// ---------------------------------------------------------------------------

async fn cmd_students(store: StoreConfig, json: bool) -> Result<()> {
    let students: Vec<PublicStudent> = StudentStore::new(store.database())
        .list_students()
        .await
        .context("failed to read student store")?
        .iter()
        .map(|s| s.to_public())
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&students)?);
        return Ok(());
    }

    if students.is_empty() {
        println!("  No students registered.");
        return Ok(());
    }

    println!("  {:<15} {:<20} {:<28} CREATED", "ID", "USERNAME", "EMAIL");
    for s in &students {
        println!(
            "  {:<15} {:<20} {:<28} {}",
            s.id,
            s.username,
            s.email.as_deref().unwrap_or("-"),
            timestamp::format(&s.created_at),
        );
    }

    Ok(())
}
