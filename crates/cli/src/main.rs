//! Buildboard CLI - a twelve-project product-building board.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use buildboard_core::{Catalog, Project, ProjectId, ProjectStatus, User, UserId};
use buildboard_progress::{ProgressEngine, SyncError};
use buildboard_storage::JsonStore;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::FileConfig;

#[derive(Parser)]
#[command(name = "buildboard")]
#[command(about = "Track progress through the twelve-project build board", long_about = None)]
struct Cli {
    /// Config file (defaults to ./buildboard.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(long, global = true, env = "BUILDBOARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Signed-in user id or email
    #[arg(long, global = true, env = "BUILDBOARD_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every project with its status
    Board,
    /// Show project details
    Show {
        /// Project ID
        id: String,
    },
    /// Find projects by title, skill or tool
    Search {
        /// Search text
        query: String,
    },
    /// Start a project
    Start {
        /// Project ID
        id: String,
    },
    /// Complete a project
    Complete {
        /// Project ID
        id: String,
    },
    /// Replace a project's notes
    Notes {
        /// Project ID
        id: String,
        /// Note text
        text: String,
    },
    /// Manage artifact links
    Artifact {
        #[command(subcommand)]
        command: ArtifactCommands,
    },
    /// Show progress statistics
    Dashboard,
    /// Show recent activity
    Activity {
        /// Number of events to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ArtifactCommands {
    /// Attach a link
    Add {
        /// Project ID
        id: String,
        /// Link
        url: String,
    },
    /// Remove a link by position
    Remove {
        /// Project ID
        id: String,
        /// Position as listed by `show` (0-based)
        index: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file = FileConfig::load(cli.config.as_deref())?;

    let data_dir = cli
        .data_dir
        .or(file.data_dir)
        .unwrap_or_else(|| PathBuf::from(".buildboard"));
    let store = Arc::new(JsonStore::new(&data_dir).await?);
    let catalog = Arc::new(Catalog::builtin()?);
    let engine = ProgressEngine::new(catalog, store, file.engine);
    let mut errors = engine.subscribe_errors();

    if let Some(user) = cli.user.as_deref() {
        engine.sign_in(local_user(user)).await;
        info!(user = %user, data_dir = %data_dir.display(), "session loaded");
    }

    let result = run(&engine, cli.command).await;
    engine.flush().await;
    let failed_writes = report_sync_errors(&mut errors);
    result?;
    if failed_writes > 0 {
        bail!("{} change(s) could not be saved to {}", failed_writes, data_dir.display());
    }
    Ok(())
}

async fn run(engine: &ProgressEngine, command: Commands) -> Result<()> {
    match command {
        Commands::Board => {
            if engine.user().is_none() {
                println!("(signed out, showing the board as a visitor)");
            }
            for project in engine.catalog() {
                println!(
                    "  {:>2}. {:<12} {} [{}]",
                    project.step_index,
                    format_status(engine.status(&project.id)),
                    project.title,
                    project.id,
                );
            }
        }
        Commands::Show { id } => {
            let project = find(engine, &id)?;
            print_project(engine, project);
        }
        Commands::Search { query } => {
            let hits = engine.catalog().search(&query);
            println!("Matches ({})", hits.len());
            for project in hits {
                println!("  {} - {} ({})", project.id, project.title, project.level);
            }
        }
        Commands::Start { id } => {
            require_user(engine)?;
            let id = find(engine, &id)?.id.clone();
            let entry = engine.start_project(&id)?;
            println!("{}: {}", id, entry.status.as_str());
        }
        Commands::Complete { id } => {
            require_user(engine)?;
            let id = find(engine, &id)?.id.clone();
            engine.complete_project(&id)?;
            println!("{}: completed", id);
            if let Some(next) = engine.next_unlocked_project() {
                println!("Next up: {} - {}", next.id, next.title);
            } else {
                println!("Every project is complete.");
            }
        }
        Commands::Notes { id, text } => {
            require_user(engine)?;
            let id = find(engine, &id)?.id.clone();
            engine.save_notes(&id, text)?;
            println!("Notes saved for {}", id);
        }
        Commands::Artifact { command } => {
            require_user(engine)?;
            match command {
                ArtifactCommands::Add { id, url } => {
                    let id = find(engine, &id)?.id.clone();
                    match engine.add_artifact(&id, &url)? {
                        Some(index) => println!("Added artifact #{} to {}", index, id),
                        None => bail!("artifact link is empty"),
                    }
                }
                ArtifactCommands::Remove { id, index } => {
                    let id = find(engine, &id)?.id.clone();
                    match engine.remove_artifact(&id, index)? {
                        Some(artifact) => println!("Removed {}", artifact.url),
                        None => println!("No artifact #{} on {}", index, id),
                    }
                }
            }
        }
        Commands::Dashboard => {
            require_user(engine)?;
            let summary = engine.summary();

            println!("Progress: {}/{} ({}%)", summary.completed_count, summary.total, summary.percent_complete);
            match &summary.next_project {
                Some(next) => println!("Next up: {}", next),
                None if summary.is_journey_complete() => println!("Journey complete"),
                None => {}
            }

            println!("Skills");
            for coverage in &summary.skill_coverage {
                println!("  {:<28} {}/{} ({}%)", coverage.skill, coverage.done, coverage.total, coverage.percent);
            }
            if !summary.tool_usage.is_empty() {
                println!("Tools");
                for usage in &summary.tool_usage {
                    println!("  {:<28} {}", usage.tool, usage.count);
                }
            }
            if !summary.completed_projects.is_empty() {
                println!("Completed");
                for id in &summary.completed_projects {
                    println!("  {}", id);
                }
            }
        }
        Commands::Activity { limit } => {
            require_user(engine)?;
            let activity = engine.activity();
            if activity.is_empty() {
                println!("No activity yet");
            }
            for event in activity.iter().take(limit) {
                println!(
                    "  {} {:<9} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M"),
                    event.kind.as_str(),
                    event.project_id,
                );
            }
        }
    }

    Ok(())
}

fn local_user(user: &str) -> User {
    let email = user.contains('@').then_some(user);
    User::from_identity(UserId::new(user), email, None)
}

fn require_user(engine: &ProgressEngine) -> Result<()> {
    if engine.user().is_none() {
        bail!("this command needs --user (or BUILDBOARD_USER)");
    }
    Ok(())
}

fn find<'a>(engine: &'a ProgressEngine, id: &str) -> Result<&'a Project> {
    match engine.catalog().get(&ProjectId::from(id)) {
        Some(project) => Ok(project),
        None => bail!("no project with id {:?}", id),
    }
}

fn print_project(engine: &ProgressEngine, project: &Project) {
    println!("{}. {} [{}]", project.step_index, project.title, project.id);
    println!("  Level: {}", project.level);
    println!("  Status: {}", format_status(engine.status(&project.id)));
    println!("  Problem: {}", project.problem);
    println!("  Task: {}", project.task);
    println!("  Tools: {}", project.tools.join(", "));
    println!("  Skills: {}", project.skills.join(", "));
    print_list("Deliverables", &project.deliverables);
    print_list("Try", &project.try_steps);
    for resource in &project.resources {
        println!("  Resource: {} <{}>", resource.label, resource.url);
    }

    if let Some(entry) = engine.entry(&project.id) {
        if let Some(started) = entry.started_at {
            println!("  Started: {}", started);
        }
        if let Some(completed) = entry.completed_at {
            println!("  Completed: {}", completed);
        }
        if !entry.notes.is_empty() {
            println!("  Notes: {}", entry.notes);
        }
        for (index, artifact) in entry.artifacts.iter().enumerate() {
            println!("  Artifact #{}: {}", index, artifact.url);
        }
    }
}

fn print_list(label: &str, items: &[String]) {
    for (n, item) in items.iter().enumerate() {
        println!("  {} {}: {}", label, n + 1, item);
    }
}

/// Log every pending sync error and return how many were failed writes.
fn report_sync_errors(errors: &mut broadcast::Receiver<SyncError>) -> usize {
    let mut failed_writes = 0;
    loop {
        match errors.try_recv() {
            Ok(error) => {
                warn!(%error, "sync failed");
                if matches!(error, SyncError::Write { .. }) {
                    failed_writes += 1;
                }
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "sync errors dropped");
                failed_writes += 1;
            }
            Err(_) => return failed_writes,
        }
    }
}

fn format_status(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Locked => "locked",
        ProjectStatus::Unlocked => "unlocked",
        ProjectStatus::InProgress => "in progress",
        ProjectStatus::Completed => "completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildboard_storage::Table;
    use std::time::Duration;

    #[test]
    fn test_only_write_errors_count_as_failures() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(SyncError::LoadTimeout(Duration::from_secs(1))).unwrap();
        tx.send(SyncError::Write {
            table: Table::Progress,
            project_id: ProjectId::from("launch"),
            attempts: 3,
            message: "down".to_string(),
        })
        .unwrap();
        tx.send(SyncError::Load {
            table: Table::Activity,
            message: "down".to_string(),
        })
        .unwrap();

        assert_eq!(report_sync_errors(&mut rx), 1);
        assert_eq!(report_sync_errors(&mut rx), 0);
    }

    #[test]
    fn test_no_errors_is_clean() {
        let (_tx, mut rx) = broadcast::channel::<SyncError>(8);
        assert_eq!(report_sync_errors(&mut rx), 0);
    }
}
