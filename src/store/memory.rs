// src/store/memory.rs
use super::{ScanStore, ARCHIVE_MIN_SCORE};
use crate::types::{NewOutreach, NewScan, OutreachMessage, ScanRecord};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    scans: BTreeMap<i64, ScanRecord>,
    next_id: i64,
    outreach: Vec<OutreachMessage>,
}

/// Map-backed store with auto-incrementing ids, for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryScanStore {
    inner: RwLock<Inner>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with an explicit creation time.
    pub async fn create_at(&self, scan: NewScan, created_at: DateTime<Utc>) -> ScanRecord {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let record = scan.into_record(inner.next_id, created_at);
        inner.scans.insert(record.id, record.clone());
        debug!(id = record.id, source = %record.analysis_source, "Stored scan in memory");
        record
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.scans.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn newest_first(mut scans: Vec<ScanRecord>) -> Vec<ScanRecord> {
        scans.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        scans
    }

    fn is_archived(scan: &ScanRecord) -> bool {
        scan.is_shared_to_archive && scan.ghost_likelihood_score >= ARCHIVE_MIN_SCORE
    }
}

#[async_trait]
impl ScanStore for MemoryScanStore {
    async fn find_by_content_hash(&self, hash: &str) -> Result<Option<ScanRecord>> {
        let inner = self.inner.read().await;
        let matches = inner
            .scans
            .values()
            .filter(|scan| scan.content_hash == hash)
            .cloned()
            .collect();
        Ok(Self::newest_first(matches).into_iter().next())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let inner = self.inner.read().await;
        let mut scans = Self::newest_first(inner.scans.values().cloned().collect());
        scans.truncate(limit);
        Ok(scans)
    }

    async fn create(&self, scan: NewScan) -> Result<ScanRecord> {
        Ok(self.create_at(scan, Utc::now()).await)
    }

    async fn get(&self, id: i64) -> Result<Option<ScanRecord>> {
        Ok(self.inner.read().await.scans.get(&id).cloned())
    }

    async fn share_to_archive(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.scans.get_mut(&id) {
            Some(scan) => {
                scan.is_shared_to_archive = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_archived(&self, limit: usize, offset: usize) -> Result<Vec<ScanRecord>> {
        let inner = self.inner.read().await;
        let archived = inner
            .scans
            .values()
            .filter(|scan| Self::is_archived(scan))
            .cloned()
            .collect();
        Ok(Self::newest_first(archived)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count_archived(&self) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner.scans.values().filter(|scan| Self::is_archived(scan)).count())
    }

    async fn find_created_after(&self, since: DateTime<Utc>) -> Result<Vec<ScanRecord>> {
        let inner = self.inner.read().await;
        let scans = inner
            .scans
            .values()
            .filter(|scan| scan.created_at >= since)
            .cloned()
            .collect();
        Ok(Self::newest_first(scans))
    }

    async fn create_outreach(&self, message: NewOutreach) -> Result<OutreachMessage> {
        let mut inner = self.inner.write().await;
        let id = inner.outreach.len() as i64 + 1;
        let message = message.into_message(id, Utc::now());
        inner.outreach.push(message.clone());
        debug!(id, scan_id = message.scan_id, "Stored outreach message in memory");
        Ok(message)
    }

    async fn find_outreach_by_scan(&self, scan_id: i64) -> Result<Vec<OutreachMessage>> {
        let inner = self.inner.read().await;
        Ok(inner
            .outreach
            .iter()
            .filter(|message| message.scan_id == scan_id)
            .cloned()
            .collect())
    }

    async fn count_outreach_since(&self, since: DateTime<Utc>) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .outreach
            .iter()
            .filter(|message| message.created_at >= since)
            .count())
    }
}
