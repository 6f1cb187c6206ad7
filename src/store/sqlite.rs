// src/store/sqlite.rs
use super::{ScanStore, ARCHIVE_MIN_SCORE};
use crate::types::{NewOutreach, NewScan, OutreachMessage, RedFlag, ScanRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

const SCAN_COLUMNS: &str = "id, job_title, company, original_url, original_description, \
     content_hash, content_fingerprint, ghost_likelihood_score, ghost_likelihood_level, \
     red_flags, ai_summary, confidence_explanation, is_shared_to_archive, analysis_source, \
     cache_expires_at, created_at";

/// Rows read per hash lookup; undecodable ones are skipped in favour of older duplicates.
const HASH_MATCH_CANDIDATES: i64 = 5;

#[derive(Debug, sqlx::FromRow)]
struct ScanRow {
    id: i64,
    job_title: String,
    company: String,
    original_url: Option<String>,
    original_description: String,
    content_hash: String,
    content_fingerprint: Option<String>,
    ghost_likelihood_score: i64,
    ghost_likelihood_level: String,
    red_flags: String,
    ai_summary: String,
    confidence_explanation: Option<String>,
    is_shared_to_archive: bool,
    analysis_source: String,
    cache_expires_at: i64,
    created_at: i64,
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| anyhow::anyhow!("Timestamp out of range: {}", millis))
}

impl TryFrom<ScanRow> for ScanRecord {
    type Error = anyhow::Error;

    fn try_from(row: ScanRow) -> Result<Self> {
        let red_flags: Vec<RedFlag> = serde_json::from_str(&row.red_flags)
            .with_context(|| format!("Invalid red_flags JSON for scan {}", row.id))?;
        let ghost_likelihood_score = u8::try_from(row.ghost_likelihood_score)
            .ok()
            .filter(|score| *score <= 100)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Score {} out of range for scan {}",
                    row.ghost_likelihood_score,
                    row.id
                )
            })?;

        Ok(ScanRecord {
            id: row.id,
            job_title: row.job_title,
            company: row.company,
            original_url: row.original_url,
            original_description: row.original_description,
            content_hash: row.content_hash,
            content_fingerprint: row.content_fingerprint,
            ghost_likelihood_score,
            ghost_likelihood_level: row.ghost_likelihood_level.parse()?,
            red_flags,
            ai_summary: row.ai_summary,
            confidence_explanation: row.confidence_explanation,
            is_shared_to_archive: row.is_shared_to_archive,
            analysis_source: row.analysis_source.parse()?,
            cache_expires_at: from_millis(row.cache_expires_at)?,
            created_at: from_millis(row.created_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OutreachRow {
    id: i64,
    scan_id: i64,
    message: String,
    message_type: String,
    ai_cost: f64,
    created_at: i64,
}

impl TryFrom<OutreachRow> for OutreachMessage {
    type Error = anyhow::Error;

    fn try_from(row: OutreachRow) -> Result<Self> {
        Ok(OutreachMessage {
            id: row.id,
            scan_id: row.scan_id,
            message: row.message,
            message_type: row.message_type.parse()?,
            ai_cost: row.ai_cost,
            created_at: from_millis(row.created_at)?,
        })
    }
}

/// Decode a batch of rows, dropping the ones that no longer decode.
fn decode_rows(rows: Vec<ScanRow>) -> Vec<ScanRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match ScanRecord::try_from(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(scan_id = id, "Skipping malformed scan row: {:#}", e);
                    None
                }
            }
        })
        .collect()
}

pub struct SqliteScanStore {
    pool: SqlitePool,
}

impl SqliteScanStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanStore for SqliteScanStore {
    async fn find_by_content_hash(&self, hash: &str) -> Result<Option<ScanRecord>> {
        let rows = sqlx::query_as::<_, ScanRow>(&format!(
            "SELECT {} FROM job_scans WHERE content_hash = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
            SCAN_COLUMNS
        ))
        .bind(hash)
        .bind(HASH_MATCH_CANDIDATES)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query scan by content hash")?;

        Ok(decode_rows(rows).into_iter().next())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let rows = sqlx::query_as::<_, ScanRow>(&format!(
            "SELECT {} FROM job_scans ORDER BY created_at DESC, id DESC LIMIT ?",
            SCAN_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query recent scans")?;

        Ok(decode_rows(rows))
    }

    async fn create(&self, scan: NewScan) -> Result<ScanRecord> {
        // Millisecond precision so the returned record equals what a later read yields.
        let created_at = from_millis(Utc::now().timestamp_millis())?;
        let cache_expires_at = created_at + scan.cache_ttl;
        let red_flags = serde_json::to_string(&scan.analysis.red_flags)
            .context("Failed to serialize red flags")?;

        let result = sqlx::query(
            r#"
            INSERT INTO job_scans (
                job_title, company, original_url, original_description, content_hash,
                content_fingerprint, ghost_likelihood_score, ghost_likelihood_level, red_flags,
                ai_summary, confidence_explanation, is_shared_to_archive, analysis_source,
                cache_expires_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, FALSE, ?, ?, ?)
            "#,
        )
        .bind(&scan.analysis.job_title)
        .bind(&scan.analysis.company)
        .bind(&scan.original_url)
        .bind(&scan.original_description)
        .bind(&scan.content_hash)
        .bind(&scan.content_fingerprint)
        .bind(i64::from(scan.analysis.ghost_likelihood_score))
        .bind(scan.analysis.ghost_likelihood_level.as_str())
        .bind(&red_flags)
        .bind(&scan.analysis.ai_summary)
        .bind(&scan.analysis.confidence_explanation)
        .bind(scan.analysis_source.as_str())
        .bind(cache_expires_at.timestamp_millis())
        .bind(created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to insert scan")?;

        let record = scan.into_record(result.last_insert_rowid(), created_at);

        info!(
            "Created scan {} ({}) for {} at {}",
            record.id, record.analysis_source, record.job_title, record.company
        );
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<ScanRecord>> {
        let row = sqlx::query_as::<_, ScanRow>(&format!(
            "SELECT {} FROM job_scans WHERE id = ?",
            SCAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to query scan {}", id))?;

        row.map(ScanRecord::try_from).transpose()
    }

    async fn share_to_archive(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE job_scans SET is_shared_to_archive = TRUE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to share scan {}", id))?;

        let updated = result.rows_affected() > 0;
        if updated {
            info!("Shared scan {} to archive", id);
        }
        Ok(updated)
    }

    async fn find_archived(&self, limit: usize, offset: usize) -> Result<Vec<ScanRecord>> {
        let rows = sqlx::query_as::<_, ScanRow>(&format!(
            "SELECT {} FROM job_scans \
             WHERE is_shared_to_archive = TRUE AND ghost_likelihood_score >= ? \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            SCAN_COLUMNS
        ))
        .bind(i64::from(ARCHIVE_MIN_SCORE))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query archived scans")?;

        Ok(decode_rows(rows))
    }

    async fn count_archived(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM job_scans \
             WHERE is_shared_to_archive = TRUE AND ghost_likelihood_score >= ?",
        )
        .bind(i64::from(ARCHIVE_MIN_SCORE))
        .fetch_one(&self.pool)
        .await
        .context("Failed to count archived scans")?;

        Ok(count.max(0) as usize)
    }

    async fn find_created_after(&self, since: DateTime<Utc>) -> Result<Vec<ScanRecord>> {
        let rows = sqlx::query_as::<_, ScanRow>(&format!(
            "SELECT {} FROM job_scans WHERE created_at >= ? ORDER BY created_at DESC, id DESC",
            SCAN_COLUMNS
        ))
        .bind(since.timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .context("Failed to query scans by creation date")?;

        Ok(decode_rows(rows))
    }

    async fn create_outreach(&self, message: NewOutreach) -> Result<OutreachMessage> {
        let created_at = from_millis(Utc::now().timestamp_millis())?;

        let result = sqlx::query(
            "INSERT INTO outreach_messages (scan_id, message, message_type, ai_cost, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message.scan_id)
        .bind(&message.message)
        .bind(message.message_type.as_str())
        .bind(message.ai_cost)
        .bind(created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert outreach message for scan {}", message.scan_id))?;

        let message = message.into_message(result.last_insert_rowid(), created_at);
        info!(
            "Created {} outreach message {} for scan {}",
            message.message_type, message.id, message.scan_id
        );
        Ok(message)
    }

    async fn find_outreach_by_scan(&self, scan_id: i64) -> Result<Vec<OutreachMessage>> {
        let rows = sqlx::query_as::<_, OutreachRow>(
            "SELECT id, scan_id, message, message_type, ai_cost, created_at \
             FROM outreach_messages WHERE scan_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(scan_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to query outreach messages for scan {}", scan_id))?;

        rows.into_iter().map(OutreachMessage::try_from).collect()
    }

    async fn count_outreach_since(&self, since: DateTime<Utc>) -> Result<usize> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM outreach_messages WHERE created_at >= ?")
                .bind(since.timestamp_millis())
                .fetch_one(&self.pool)
                .await
                .context("Failed to count outreach messages")?;

        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use crate::testing::new_scan;
    use crate::types::{AnalysisSource, MessageType, RedFlag, Severity};

    async fn store() -> (Database, SqliteScanStore) {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteScanStore::new(db.pool().clone());
        (db, store)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_db, store) = store().await;
        let mut scan = new_scan("Backend Engineer", "Acme", "We need a backend engineer");
        scan.analysis.red_flags = vec![RedFlag {
            flag: "Vague".to_string(),
            explanation: "No duties listed".to_string(),
            severity: Severity::Medium,
        }];
        scan.analysis_source = AnalysisSource::SimilarCache;

        let created = store.create(scan).await.unwrap();
        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(
            fetched.cache_expires_at - fetched.created_at,
            chrono::Duration::days(7)
        );
        assert!(store.get(created.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_hash_and_recent_order() {
        let (_db, store) = store().await;
        let first = store.create(new_scan("A", "Acme", "first text")).await.unwrap();
        let second = store.create(new_scan("B", "Acme", "second text")).await.unwrap();

        let found = store
            .find_by_content_hash(&first.content_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);

        let recent = store.find_recent(50).await.unwrap();
        assert_eq!(
            recent.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert_eq!(store.find_recent(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped_in_batches() {
        let (db, store) = store().await;
        let good = store.create(new_scan("A", "Acme", "good text")).await.unwrap();
        store.create(new_scan("B", "Acme", "bad text")).await.unwrap();

        sqlx::query("UPDATE job_scans SET red_flags = 'not json' WHERE id != ?")
            .bind(good.id)
            .execute(db.pool())
            .await
            .unwrap();

        let recent = store.find_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, good.id);
    }

    #[tokio::test]
    async fn test_malformed_newest_duplicate_falls_back_to_older() {
        let (db, store) = store().await;
        let older = store.create(new_scan("A", "Acme", "same posting")).await.unwrap();
        let newer = store.create(new_scan("A", "Acme", "SAME posting")).await.unwrap();
        assert_eq!(older.content_hash, newer.content_hash);

        sqlx::query("UPDATE job_scans SET ghost_likelihood_score = 400 WHERE id = ?")
            .bind(newer.id)
            .execute(db.pool())
            .await
            .unwrap();

        let found = store.find_by_content_hash(&older.content_hash).await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(older.id));

        sqlx::query("UPDATE job_scans SET red_flags = 'not json' WHERE id = ?")
            .bind(older.id)
            .execute(db.pool())
            .await
            .unwrap();
        assert!(store
            .find_by_content_hash(&older.content_hash)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_archive() {
        let (_db, store) = store().await;
        let mut scan = new_scan("A", "Acme", "risky posting");
        scan.analysis.ghost_likelihood_score = 90;
        let created = store.create(scan).await.unwrap();

        assert_eq!(store.count_archived().await.unwrap(), 0);
        assert!(store.share_to_archive(created.id).await.unwrap());
        assert!(!store.share_to_archive(created.id + 10).await.unwrap());
        assert_eq!(store.count_archived().await.unwrap(), 1);

        let archived = store.find_archived(20, 0).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert!(archived[0].is_shared_to_archive);
    }

    #[tokio::test]
    async fn test_outreach_round_trip() {
        let (_db, store) = store().await;
        let scan = store.create(new_scan("A", "Acme", "posting")).await.unwrap();

        let created = store
            .create_outreach(NewOutreach {
                scan_id: scan.id,
                message: "Hello Acme team".to_string(),
                message_type: MessageType::General,
                ai_cost: 0.003,
            })
            .await
            .unwrap();

        let messages = store.find_outreach_by_scan(scan.id).await.unwrap();
        assert_eq!(messages, vec![created]);
        assert!(store.find_outreach_by_scan(scan.id + 1).await.unwrap().is_empty());

        let before = Utc::now() - chrono::Duration::minutes(1);
        assert_eq!(store.count_outreach_since(before).await.unwrap(), 1);
        let later = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(store.count_outreach_since(later).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_created_after() {
        let (_db, store) = store().await;
        let before = Utc::now() - chrono::Duration::seconds(5);
        store.create(new_scan("A", "Acme", "text")).await.unwrap();

        assert_eq!(store.find_created_after(before).await.unwrap().len(), 1);
        let later = Utc::now() + chrono::Duration::hours(1);
        assert!(store.find_created_after(later).await.unwrap().is_empty());
    }
}
