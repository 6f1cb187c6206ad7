use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ghost_scan::cache::{content_hash, CacheConfig, CacheDecision, Fingerprint, JobCache};
use ghost_scan::core::Database;
use ghost_scan::store::{MemoryScanStore, ScanStore, SqliteScanStore};
use ghost_scan::testing::{new_scan, FailingStore};
use ghost_scan::types::{AnalysisSource, NewOutreach, NewScan, OutreachMessage, ScanRecord};
use std::sync::Arc;

const TITLE: &str = "Warehouse Associate";
const COMPANY: &str = "Globex Logistics";
const POSTING: &str = "Warehouse associate wanted at our Leeds distribution centre. \
    Duties: picking orders, packing parcels, loading trucks, scanning inventory. \
    Forklift licence preferred.";
const FILLER: &str = " Join us. Apply now. Good pay.";

fn cache(store: Arc<dyn ScanStore>) -> JobCache {
    JobCache::new(store, CacheConfig::default())
}

#[tokio::test]
async fn exact_resubmission_hits_regardless_of_formatting() {
    let store = Arc::new(MemoryScanStore::new());
    let stored = store.create(new_scan(TITLE, COMPANY, POSTING)).await.unwrap();

    let resubmitted = format!("\n\n   {}   \n", POSTING.to_uppercase().replace(". ", ".\n\t"));
    assert_eq!(content_hash(&resubmitted), stored.content_hash);

    let decision = cache(store).lookup(&resubmitted, TITLE, COMPANY).await;
    assert_eq!(decision.kind(), "exact");
    assert_eq!(decision.record().unwrap().id, stored.id);
    assert_eq!(decision.analysis_source(), AnalysisSource::ExactCache);
}

#[tokio::test]
async fn byte_identical_resubmission_returns_the_stored_hash() {
    let text = "We need a Senior Backend Engineer. 5 years experience. Remote OK.";
    let store = Arc::new(MemoryScanStore::new());
    let stored = store
        .create(new_scan("Senior Backend Engineer", "Acme", text))
        .await
        .unwrap();

    match cache(store).lookup(text, "Senior Backend Engineer", "Acme").await {
        CacheDecision::Exact { record } => assert_eq!(record.content_hash, stored.content_hash),
        other => panic!("expected exact hit, got {:?}", other),
    }
}

#[tokio::test]
async fn filler_sentences_give_a_similar_hit() {
    let store = Arc::new(MemoryScanStore::new());
    let stored = store.create(new_scan(TITLE, COMPANY, POSTING)).await.unwrap();

    let decision = cache(store)
        .lookup(&format!("{}{}", POSTING, FILLER), TITLE, COMPANY)
        .await;

    match &decision {
        CacheDecision::Similar { record, score } => {
            assert_eq!(record.id, stored.id);
            assert!((score - 0.9).abs() < 1e-9, "score was {}", score);
        }
        other => panic!("expected similar hit, got {:?}", other),
    }
    assert_eq!(
        decision.message().unwrap(),
        "Found similar job posting (90% match) analyzed recently"
    );
}

#[tokio::test]
async fn slightly_different_title_and_company_still_match() {
    let store = Arc::new(MemoryScanStore::new());
    store.create(new_scan(TITLE, COMPANY, POSTING)).await.unwrap();

    let decision = cache(store)
        .lookup(
            &format!("{}{}", POSTING, FILLER),
            "warehouse associate (nights)",
            "Globex Logistic",
        )
        .await;
    assert_eq!(decision.kind(), "similar");
}

#[tokio::test]
async fn expired_similar_record_is_ignored() {
    let store = Arc::new(MemoryScanStore::new());
    let mut scan = new_scan(TITLE, COMPANY, POSTING);
    scan.cache_ttl = -Duration::minutes(1);
    store.create(scan).await.unwrap();

    let decision = cache(store)
        .lookup(&format!("{}{}", POSTING, FILLER), TITLE, COMPANY)
        .await;
    assert_eq!(decision, CacheDecision::None);
}

#[tokio::test]
async fn same_vocabulary_at_unrelated_company_is_a_miss() {
    let store = Arc::new(MemoryScanStore::new());
    store.create(new_scan(TITLE, COMPANY, POSTING)).await.unwrap();

    let decision = cache(store)
        .lookup(&format!("{}{}", POSTING, FILLER), TITLE, "Initech")
        .await;
    assert_eq!(decision, CacheDecision::None);
}

#[tokio::test]
async fn exact_match_takes_precedence_over_similar() {
    let store = Arc::new(MemoryScanStore::new());
    let now = Utc::now();
    let identical = store
        .create_at(new_scan(TITLE, COMPANY, POSTING), now - Duration::hours(3))
        .await;
    store
        .create_at(
            new_scan(TITLE, COMPANY, &format!("{}{}", POSTING, FILLER)),
            now - Duration::hours(1),
        )
        .await;

    let decision = cache(store).lookup_at(POSTING, TITLE, COMPANY, now).await;
    match decision {
        CacheDecision::Exact { record } => assert_eq!(record.id, identical.id),
        other => panic!("expected exact hit, got {:?}", other),
    }
}

#[tokio::test]
async fn only_the_recent_window_is_searched() {
    let store = Arc::new(MemoryScanStore::new());
    let now = Utc::now();
    store
        .create_at(new_scan(TITLE, COMPANY, POSTING), now - Duration::hours(2))
        .await;
    for i in 0..3 {
        store
            .create_at(
                new_scan("Barista", "Coffee Co", &format!("Pour espresso shift {}", i)),
                now - Duration::minutes(30 - i),
            )
            .await;
    }

    let narrow = JobCache::new(
        store.clone(),
        CacheConfig {
            recent_window: 3,
            ..CacheConfig::default()
        },
    );
    let resubmitted = format!("{}{}", POSTING, FILLER);
    assert_eq!(
        narrow.lookup_at(&resubmitted, TITLE, COMPANY, now).await,
        CacheDecision::None
    );
    assert_eq!(
        cache(store).lookup_at(&resubmitted, TITLE, COMPANY, now).await.kind(),
        "similar"
    );
}

#[tokio::test]
async fn malformed_exact_row_still_allows_a_similar_hit() {
    let db = Database::in_memory().await.unwrap();
    let store = Arc::new(SqliteScanStore::new(db.pool().clone()));
    let good = store.create(new_scan(TITLE, COMPANY, POSTING)).await.unwrap();
    let resubmitted = format!("{}{}", POSTING, FILLER);
    let broken = store
        .create(new_scan(TITLE, COMPANY, &resubmitted))
        .await
        .unwrap();

    sqlx::query("UPDATE job_scans SET red_flags = 'not json' WHERE id = ?")
        .bind(broken.id)
        .execute(db.pool())
        .await
        .unwrap();

    let decision = cache(store).lookup(&resubmitted, TITLE, COMPANY).await;
    assert_eq!(decision.kind(), "similar");
    assert_eq!(decision.record().map(|r| r.id), Some(good.id));
}

/// Store whose hash index is broken while the rest keeps working.
struct BrokenHashIndex(MemoryScanStore);

#[async_trait]
impl ScanStore for BrokenHashIndex {
    async fn find_by_content_hash(&self, _hash: &str) -> Result<Option<ScanRecord>> {
        anyhow::bail!("index corrupted")
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        self.0.find_recent(limit).await
    }

    async fn create(&self, scan: NewScan) -> Result<ScanRecord> {
        self.0.create(scan).await
    }

    async fn get(&self, id: i64) -> Result<Option<ScanRecord>> {
        self.0.get(id).await
    }

    async fn share_to_archive(&self, id: i64) -> Result<bool> {
        self.0.share_to_archive(id).await
    }

    async fn find_archived(&self, limit: usize, offset: usize) -> Result<Vec<ScanRecord>> {
        self.0.find_archived(limit, offset).await
    }

    async fn count_archived(&self) -> Result<usize> {
        self.0.count_archived().await
    }

    async fn find_created_after(&self, since: DateTime<Utc>) -> Result<Vec<ScanRecord>> {
        self.0.find_created_after(since).await
    }

    async fn create_outreach(&self, message: NewOutreach) -> Result<OutreachMessage> {
        self.0.create_outreach(message).await
    }

    async fn find_outreach_by_scan(&self, scan_id: i64) -> Result<Vec<OutreachMessage>> {
        self.0.find_outreach_by_scan(scan_id).await
    }

    async fn count_outreach_since(&self, since: DateTime<Utc>) -> Result<usize> {
        self.0.count_outreach_since(since).await
    }
}

#[tokio::test]
async fn failed_exact_lookup_falls_through_to_similar_pass() {
    let store = Arc::new(BrokenHashIndex(MemoryScanStore::new()));
    let stored = store.create(new_scan(TITLE, COMPANY, POSTING)).await.unwrap();

    let decision = cache(store)
        .lookup(&format!("{}{}", POSTING, FILLER), TITLE, COMPANY)
        .await;
    assert_eq!(decision.kind(), "similar");
    assert_eq!(decision.record().map(|r| r.id), Some(stored.id));
}

#[tokio::test]
async fn unreachable_store_degrades_to_fresh_analysis() {
    let decision = cache(Arc::new(FailingStore)).lookup(POSTING, TITLE, COMPANY).await;
    assert_eq!(decision, CacheDecision::None);
    assert_eq!(decision.analysis_source(), AnalysisSource::Fresh);
}

#[test]
fn fingerprint_properties() {
    let fingerprint = Fingerprint::from_text(POSTING);
    assert!(fingerprint.len() <= 20);
    assert_eq!(fingerprint, Fingerprint::from_text(&POSTING.to_lowercase()));
    assert_eq!(fingerprint.similarity(&fingerprint), 1.0);

    let other = Fingerprint::from_text("Pour espresso and steam milk for morning customers");
    let score = fingerprint.similarity(&other);
    assert!((0.0..=1.0).contains(&score));
    assert_eq!(score, other.similarity(&fingerprint));
}
