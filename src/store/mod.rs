// src/store/mod.rs
//! Persistence boundary for scans and their outreach messages.
//!
//! The cache and the submission pipeline only see [`ScanStore`]; the
//! in-memory store backs tests and local runs, the SQLite store backs the
//! server.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryScanStore;
pub use sqlite::SqliteScanStore;

use crate::types::{NewOutreach, NewScan, OutreachMessage, ScanRecord};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Only scans at or above this score are listed in the public archive.
pub const ARCHIVE_MIN_SCORE: u8 = 70;

#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Most recently created scan with this content hash.
    async fn find_by_content_hash(&self, hash: &str) -> Result<Option<ScanRecord>>;

    /// Up to `limit` scans, most recent first.
    async fn find_recent(&self, limit: usize) -> Result<Vec<ScanRecord>>;

    /// Persist a scan, assigning `id` and `created_at`.
    async fn create(&self, scan: NewScan) -> Result<ScanRecord>;

    async fn get(&self, id: i64) -> Result<Option<ScanRecord>>;

    /// Set the archive flag. Returns false when the scan does not exist.
    async fn share_to_archive(&self, id: i64) -> Result<bool>;

    /// Shared scans scoring at least [`ARCHIVE_MIN_SCORE`], most recent first.
    async fn find_archived(&self, limit: usize, offset: usize) -> Result<Vec<ScanRecord>>;

    async fn count_archived(&self) -> Result<usize>;

    /// Scans created at or after `since`, most recent first.
    async fn find_created_after(&self, since: DateTime<Utc>) -> Result<Vec<ScanRecord>>;

    /// Persist an outreach message, assigning `id` and `created_at`.
    async fn create_outreach(&self, message: NewOutreach) -> Result<OutreachMessage>;

    /// Messages generated for a scan, oldest first.
    async fn find_outreach_by_scan(&self, scan_id: i64) -> Result<Vec<OutreachMessage>>;

    /// Number of outreach messages created at or after `since`.
    async fn count_outreach_since(&self, since: DateTime<Utc>) -> Result<usize>;
}
