// src/testing.rs
//! Fixtures shared by unit and integration tests: scan builders, a store that
//! always fails and a deterministic analyzer.

use crate::analysis::{JobAnalyzer, JobPosting};
use crate::cache::{content_hash, ExpirationPolicy, Fingerprint};
use crate::store::ScanStore;
use crate::types::{
    AnalysisSource, GhostLikelihoodLevel, JobAnalysis, NewOutreach, NewScan, OutreachMessage,
    RedFlag, ScanRecord, Severity,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn analysis(title: &str, company: &str, score: u8) -> JobAnalysis {
    JobAnalysis {
        job_title: title.to_string(),
        company: company.to_string(),
        ghost_likelihood_score: score,
        ghost_likelihood_level: GhostLikelihoodLevel::from_score(score),
        red_flags: vec![RedFlag {
            flag: "Vague responsibilities".to_string(),
            explanation: "The posting does not describe concrete work".to_string(),
            severity: Severity::Medium,
        }],
        ai_summary: format!("Analysis of {} at {}", title, company),
        confidence_explanation: Some("Confidence: 80%.".to_string()),
    }
}

/// A fresh scan of `description`, valid for the default lifetime from now.
pub fn new_scan(title: &str, company: &str, description: &str) -> NewScan {
    NewScan {
        original_url: None,
        original_description: description.to_string(),
        content_hash: content_hash(description),
        content_fingerprint: Fingerprint::from_text(description).to_string(),
        analysis: analysis(title, company, 50),
        analysis_source: AnalysisSource::Fresh,
        cache_ttl: ExpirationPolicy::default().ttl(),
    }
}

pub fn sample_record(id: i64, title: &str, company: &str, description: &str) -> ScanRecord {
    new_scan(title, company, description).into_record(id, Utc::now())
}

/// Store whose every call fails, standing in for an unreachable database.
pub struct FailingStore;

#[async_trait]
impl ScanStore for FailingStore {
    async fn find_by_content_hash(&self, _hash: &str) -> Result<Option<ScanRecord>> {
        anyhow::bail!("connection refused")
    }

    async fn find_recent(&self, _limit: usize) -> Result<Vec<ScanRecord>> {
        anyhow::bail!("connection refused")
    }

    async fn create(&self, _scan: NewScan) -> Result<ScanRecord> {
        anyhow::bail!("connection refused")
    }

    async fn get(&self, _id: i64) -> Result<Option<ScanRecord>> {
        anyhow::bail!("connection refused")
    }

    async fn share_to_archive(&self, _id: i64) -> Result<bool> {
        anyhow::bail!("connection refused")
    }

    async fn find_archived(&self, _limit: usize, _offset: usize) -> Result<Vec<ScanRecord>> {
        anyhow::bail!("connection refused")
    }

    async fn count_archived(&self) -> Result<usize> {
        anyhow::bail!("connection refused")
    }

    async fn find_created_after(&self, _since: DateTime<Utc>) -> Result<Vec<ScanRecord>> {
        anyhow::bail!("connection refused")
    }

    async fn create_outreach(&self, _message: NewOutreach) -> Result<OutreachMessage> {
        anyhow::bail!("connection refused")
    }

    async fn find_outreach_by_scan(&self, _scan_id: i64) -> Result<Vec<OutreachMessage>> {
        anyhow::bail!("connection refused")
    }

    async fn count_outreach_since(&self, _since: DateTime<Utc>) -> Result<usize> {
        anyhow::bail!("connection refused")
    }
}

/// Deterministic analyzer that records every posting it is asked about.
#[derive(Clone)]
pub struct MockAnalyzer {
    score: u8,
    available: bool,
    fail: bool,
    latency: Duration,
    calls: Arc<AtomicUsize>,
    call_log: Arc<Mutex<Vec<JobPosting>>>,
    outreach_calls: Arc<AtomicUsize>,
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self {
            score: 55,
            available: true,
            fail: false,
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            call_log: Arc::new(Mutex::new(Vec::new())),
            outreach_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.score = score;
        self
    }

    /// Every call fails, as if the provider were down.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Report no API key.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn outreach_calls(&self) -> usize {
        self.outreach_calls.load(Ordering::SeqCst)
    }

    pub fn postings(&self) -> Vec<JobPosting> {
        self.call_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl JobAnalyzer for MockAnalyzer {
    async fn analyze(&self, posting: &JobPosting) -> Result<JobAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(posting.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail {
            anyhow::bail!("Operation failed after 3 attempts: mock provider down");
        }

        Ok(analysis(&posting.title, &posting.company, self.score))
    }

    async fn generate_outreach(
        &self,
        _posting: &str,
        analysis: &JobAnalysis,
        profile: Option<&str>,
    ) -> Result<String> {
        self.outreach_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("Operation failed after 3 attempts: mock provider down");
        }

        let mut message = format!(
            "Hello {} team, I am interested in the {} role ({} risk).",
            analysis.company,
            analysis.job_title,
            analysis.ghost_likelihood_level.as_str()
        );
        if let Some(profile) = profile {
            message.push_str(&format!(" {}", profile));
        }
        Ok(message)
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
