// src/scan_cli.rs
use crate::cache::{CacheDecision, JobCache};
use crate::core::{ConfigManager, Database, FsOps};
use crate::metrics::CacheStats;
use crate::service::{UNKNOWN_COMPANY, UNKNOWN_POSITION};
use crate::store::{ScanStore, SqliteScanStore};
use crate::types::ScanRecord;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "scan-admin")]
#[command(about = "Inspect and maintain the ghost-scan database")]
pub struct ScanCli {
    #[command(subcommand)]
    pub command: ScanCommand,

    /// Overrides DATABASE_PATH and config.yaml
    #[arg(long)]
    pub database_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ScanCommand {
    /// Create the database and run migrations
    Init,
    /// Cache statistics over the most recent scans
    Stats {
        #[arg(long, default_value_t = 100)]
        window: usize,
    },
    /// List the most recent scans
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Run a cache lookup for a job description stored in a file
    Lookup {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = UNKNOWN_POSITION)]
        title: String,
        #[arg(long, default_value = UNKNOWN_COMPANY)]
        company: String,
    },
    /// Export recent scans as CSV
    Export {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: i64,
    created_at: String,
    job_title: &'a str,
    company: &'a str,
    ghost_likelihood_score: u8,
    ghost_likelihood_level: &'a str,
    analysis_source: &'a str,
    red_flags: usize,
    shared_to_archive: bool,
    cache_expires_at: String,
    original_url: &'a str,
}

impl<'a> From<&'a ScanRecord> for ExportRow<'a> {
    fn from(scan: &'a ScanRecord) -> Self {
        Self {
            id: scan.id,
            created_at: scan.created_at.to_rfc3339(),
            job_title: &scan.job_title,
            company: &scan.company,
            ghost_likelihood_score: scan.ghost_likelihood_score,
            ghost_likelihood_level: scan.ghost_likelihood_level.as_str(),
            analysis_source: scan.analysis_source.as_str(),
            red_flags: scan.red_flags.len(),
            shared_to_archive: scan.is_shared_to_archive,
            cache_expires_at: scan.cache_expires_at.to_rfc3339(),
            original_url: scan.original_url.as_deref().unwrap_or_default(),
        }
    }
}

/// Render scans as CSV with a header row.
pub fn scans_to_csv(scans: &[ScanRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for scan in scans {
        writer
            .serialize(ExportRow::from(scan))
            .with_context(|| format!("Failed to write scan {} as CSV", scan.id))?;
    }
    writer.into_inner().context("Failed to flush CSV output")
}

fn describe(scan: &ScanRecord) -> String {
    format!(
        "#{:<5} {}  {:<13} {:>3} ({})  {} @ {}",
        scan.id,
        scan.created_at.format("%Y-%m-%d %H:%M"),
        scan.analysis_source.as_str(),
        scan.ghost_likelihood_score,
        scan.ghost_likelihood_level.as_str(),
        scan.job_title,
        scan.company
    )
}

pub async fn handle_scan_command(cli: ScanCli) -> Result<()> {
    let config = ConfigManager::load()?;
    let database_path = cli
        .database_path
        .unwrap_or_else(|| config.environment.database_path.clone());

    let db = Database::new(&database_path).await?;
    let store: Arc<dyn ScanStore> = Arc::new(SqliteScanStore::new(db.pool().clone()));

    match cli.command {
        ScanCommand::Init => {
            db.health_check().await?;
            info!("Database ready: {}", database_path.display());
        }

        ScanCommand::Stats { window } => {
            let scans = store.find_recent(window).await?;
            let stats = CacheStats::from_scans(&scans);
            let archived = store.count_archived().await?;

            println!("Scans considered:     {}", stats.total_scans);
            println!("Fresh analyses:       {}", stats.fresh_analyses);
            println!("Exact cache hits:     {}", stats.exact_cache_hits);
            println!("Similar cache hits:   {}", stats.similar_cache_hits);
            println!("Cache hit rate:       {:.1}%", stats.cache_hit_rate);
            println!("Estimated savings:    ${:.3}", stats.estimated_cost_savings);
            println!("Archived scans:       {}", archived);
        }

        ScanCommand::Recent { limit } => {
            let scans = store.find_recent(limit).await?;
            if scans.is_empty() {
                info!("No scans stored yet");
            }
            for scan in &scans {
                println!("{}", describe(scan));
            }
        }

        ScanCommand::Lookup {
            file,
            title,
            company,
        } => {
            let text = FsOps::read_file_safe(&file).await?;
            if text.trim().is_empty() {
                anyhow::bail!("{} is empty", file.display());
            }

            let cache = JobCache::new(store, config.cache.clone());
            let decision = cache.lookup(&text, &title, &company).await;
            match &decision {
                CacheDecision::None => println!("No reusable analysis: a fresh analysis would run"),
                _ => {
                    if let Some(message) = decision.message() {
                        println!("{}", message);
                    }
                    if let Some(scan) = decision.record() {
                        println!("{}", describe(scan));
                    }
                }
            }
        }

        ScanCommand::Export { output, limit } => {
            let scans = store.find_recent(limit).await?;
            if scans.is_empty() {
                warn!("No scans to export");
            }
            let csv = scans_to_csv(&scans)?;
            FsOps::write_file_safe(&output, &csv).await?;
            info!("Exported {} scans to {}", scans.len(), output.display());
        }
    }

    Ok(())
}
