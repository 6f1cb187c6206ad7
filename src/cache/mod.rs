// src/cache/mod.rs
//! Two-tier analysis cache in front of the paid LLM call.
//!
//! A submission first looks for a scan with the same normalized-content hash.
//! Without one, the most recent scans are compared by lexical fingerprint,
//! restricted to scans whose title and company look like the submission's.
//! `lookup` only reads; creating the resulting scan is the caller's job.

pub mod error;
pub mod expiration;
pub mod fingerprint;
pub mod inflight;
pub mod normalize;
pub mod text_similarity;

pub use error::CacheError;
pub use expiration::ExpirationPolicy;
pub use fingerprint::Fingerprint;
pub use inflight::{InFlightGuards, InFlightPermit};
pub use normalize::{content_hash, normalize};
pub use text_similarity::is_text_similar;

use crate::store::ScanStore;
use crate::types::{AnalysisSource, ScanRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime stamped on every new scan.
    pub ttl_days: i64,
    /// How many recent scans the similarity pass looks at.
    pub recent_window: usize,
    /// Minimum fingerprint similarity for a similar hit.
    pub similarity_threshold: f64,
    /// Edit similarity above which two titles (or companies) count as alike.
    pub text_similarity_threshold: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_days: expiration::DEFAULT_TTL_DAYS,
            recent_window: 50,
            similarity_threshold: 0.75,
            text_similarity_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheDecision {
    Exact { record: ScanRecord },
    Similar { record: ScanRecord, score: f64 },
    None,
}

impl CacheDecision {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheDecision::Exact { .. } => "exact",
            CacheDecision::Similar { .. } => "similar",
            CacheDecision::None => "none",
        }
    }

    pub fn record(&self) -> Option<&ScanRecord> {
        match self {
            CacheDecision::Exact { record } | CacheDecision::Similar { record, .. } => Some(record),
            CacheDecision::None => None,
        }
    }

    /// Source to stamp on the scan created from this decision.
    pub fn analysis_source(&self) -> AnalysisSource {
        match self {
            CacheDecision::Exact { .. } => AnalysisSource::ExactCache,
            CacheDecision::Similar { .. } => AnalysisSource::SimilarCache,
            CacheDecision::None => AnalysisSource::Fresh,
        }
    }

    pub fn message(&self) -> Option<String> {
        match self {
            CacheDecision::Exact { .. } => {
                Some("Found identical job posting analyzed recently".to_string())
            }
            CacheDecision::Similar { score, .. } => Some(format!(
                "Found similar job posting ({}% match) analyzed recently",
                (score * 100.0).round() as u32
            )),
            CacheDecision::None => None,
        }
    }
}

pub struct JobCache {
    store: Arc<dyn ScanStore>,
    config: CacheConfig,
    policy: ExpirationPolicy,
}

impl JobCache {
    pub fn new(store: Arc<dyn ScanStore>, config: CacheConfig) -> Self {
        let policy = ExpirationPolicy::from_days(config.ttl_days);
        Self {
            store,
            config,
            policy,
        }
    }

    pub fn policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    /// Find a reusable analysis for a submission. Never fails: any error is a miss.
    pub async fn lookup(&self, raw_text: &str, title: &str, company: &str) -> CacheDecision {
        self.lookup_at(raw_text, title, company, Utc::now()).await
    }

    pub async fn lookup_at(
        &self,
        raw_text: &str,
        title: &str,
        company: &str,
        now: DateTime<Utc>,
    ) -> CacheDecision {
        match self.try_lookup(raw_text, title, company, now).await {
            Ok(decision) => {
                debug!(kind = decision.kind(), "Cache lookup finished");
                decision
            }
            Err(e) => {
                warn!("Cache check failed, falling back to fresh analysis: {}", e);
                CacheDecision::None
            }
        }
    }

    async fn try_lookup(
        &self,
        raw_text: &str,
        title: &str,
        company: &str,
        now: DateTime<Utc>,
    ) -> Result<CacheDecision, CacheError> {
        let hash = content_hash(raw_text);

        match self.store.find_by_content_hash(&hash).await {
            Ok(Some(record)) if self.policy.is_valid_at(&record, now) => {
                return Ok(CacheDecision::Exact { record });
            }
            Ok(Some(record)) => debug!(scan_id = record.id, "Exact match expired"),
            Ok(None) => {}
            // The similar pass may still find a usable record.
            Err(e) => warn!("Exact-match lookup failed: {}", CacheError::store(e)),
        }

        let fingerprint = Fingerprint::from_text(raw_text);
        let candidates = self
            .store
            .find_recent(self.config.recent_window)
            .await
            .map_err(CacheError::store)?;

        let mut best: Option<(ScanRecord, f64)> = None;
        for candidate in candidates {
            if !self.policy.is_valid_at(&candidate, now) {
                continue;
            }

            let threshold = self.config.text_similarity_threshold;
            if !is_text_similar(title, &candidate.job_title, threshold)
                || !is_text_similar(company, &candidate.company, threshold)
            {
                continue;
            }

            let candidate_fingerprint = match candidate_fingerprint(&candidate) {
                Ok(fp) => fp,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            let score = fingerprint.similarity(&candidate_fingerprint);
            // Strict comparison: on ties the most recent candidate wins.
            if best.as_ref().map_or(true, |(_, top)| score > *top) {
                best = Some((candidate, score));
            }
        }

        match best {
            Some((record, score)) if score >= self.config.similarity_threshold => {
                Ok(CacheDecision::Similar { record, score })
            }
            _ => Ok(CacheDecision::None),
        }
    }
}

/// Stored fingerprint when it decodes, otherwise one rebuilt from the description.
fn candidate_fingerprint(record: &ScanRecord) -> Result<Fingerprint, CacheError> {
    if let Some(encoded) = record.content_fingerprint.as_deref() {
        match encoded.parse::<Fingerprint>() {
            Ok(fp) => return Ok(fp),
            Err(e) => debug!(scan_id = record.id, "Stored fingerprint unusable: {}", e),
        }
    }

    if record.original_description.trim().is_empty() {
        return Err(CacheError::MalformedRecord {
            id: record.id,
            reason: "no usable fingerprint and no description".to_string(),
        });
    }

    Ok(Fingerprint::from_text(&record.original_description))
}
