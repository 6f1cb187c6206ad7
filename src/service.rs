// src/service.rs
//! Submission pipeline: resolve the posting text, consult the cache, call the
//! analyzer on a miss and persist the resulting scan. Also drafts outreach
//! messages for stored scans.

use crate::analysis::{JobAnalyzer, JobPosting, JobUrlParser};
use crate::cache::{content_hash, CacheDecision, Fingerprint, InFlightGuards, JobCache};
use crate::metrics::{UsageTracker, OUTREACH_COST_USD};
use crate::store::{ScanStore, ARCHIVE_MIN_SCORE};
use crate::types::{JobAnalysis, MessageType, NewOutreach, NewScan, OutreachMessage, ScanRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const UNKNOWN_POSITION: &str = "Unknown Position";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";
pub const SIMILAR_ANALYSIS_NOTE: &str =
    "\n\n[Note: This analysis is based on a similar job posting analyzed recently]";

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Job description or URL is required")]
    MissingInput,
    #[error("Job posting is empty")]
    EmptyInput,
    #[error("Fresh analysis unavailable: {0}")]
    FreshAnalysisUnavailable(String),
    #[error("Failed to analyze job posting: {0}")]
    AnalysisFailed(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Scan {0} not found")]
    NotFound(i64),
    #[error("Only high-risk job postings (score {min} or above) can be shared to archive")]
    BelowThreshold { min: u8 },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("Scan {0} not found")]
    NotFound(i64),
    #[error("AI outreach generation is currently unavailable. Use manual templates from the archive.")]
    Unavailable,
    #[error("Outreach generation failed: {0}")]
    GenerationFailed(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub job_description: Option<String>,
    pub job_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub scan: ScanRecord,
    pub cache_message: Option<String>,
}

pub struct ScanService {
    store: Arc<dyn ScanStore>,
    cache: JobCache,
    analyzer: Arc<dyn JobAnalyzer>,
    url_parser: JobUrlParser,
    usage: Arc<UsageTracker>,
    inflight: InFlightGuards,
}

impl ScanService {
    pub fn new(
        store: Arc<dyn ScanStore>,
        cache: JobCache,
        analyzer: Arc<dyn JobAnalyzer>,
        url_parser: JobUrlParser,
        usage: Arc<UsageTracker>,
    ) -> Self {
        Self {
            store,
            cache,
            analyzer,
            url_parser,
            usage,
            inflight: InFlightGuards::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ScanStore> {
        &self.store
    }

    pub fn analyzer(&self) -> &Arc<dyn JobAnalyzer> {
        &self.analyzer
    }

    pub fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    pub async fn submit(&self, submission: Submission) -> Result<ScanOutcome, SubmissionError> {
        let posting = self.resolve_posting(&submission).await?;
        let hash = content_hash(&posting.text);

        // Identical submissions queue here; the first one pays, the rest hit the exact cache.
        let _permit = self.inflight.acquire(&hash).await;

        let decision = self
            .cache
            .lookup(&posting.text, &posting.title, &posting.company)
            .await;
        let cache_message = decision.message();
        let analysis_source = decision.analysis_source();

        let analysis = match decision {
            CacheDecision::Exact { record } => {
                info!(scan_id = record.id, "Cache hit (exact)");
                JobAnalysis::from_record(&record)
            }
            CacheDecision::Similar { record, score } => {
                info!(scan_id = record.id, score, "Cache hit (similar)");
                let mut analysis = JobAnalysis::from_record(&record);
                analysis.ai_summary.push_str(SIMILAR_ANALYSIS_NOTE);
                analysis
            }
            CacheDecision::None => self.analyze_fresh(&posting).await?,
        };

        let scan = NewScan {
            original_url: submission.job_url.clone().filter(|url| !url.trim().is_empty()),
            original_description: posting.text.clone(),
            content_hash: hash,
            content_fingerprint: Fingerprint::from_text(&posting.text).to_string(),
            analysis,
            analysis_source,
            cache_ttl: self.cache.policy().ttl(),
        };

        let scan = self.store.create(scan).await?;
        info!(
            scan_id = scan.id,
            source = scan.analysis_source.as_str(),
            "Scan stored"
        );

        Ok(ScanOutcome {
            scan,
            cache_message,
        })
    }

    async fn analyze_fresh(&self, posting: &JobPosting) -> Result<JobAnalysis, SubmissionError> {
        let mode = self.usage.service_mode(self.analyzer.is_available());
        if !mode.allows_fresh_analysis() {
            warn!("Cache miss while fresh analysis is disabled");
            return Err(SubmissionError::FreshAnalysisUnavailable(
                mode.message().to_string(),
            ));
        }

        match self.analyzer.analyze(posting).await {
            Ok(analysis) => {
                self.usage.record_success();
                info!(
                    "Cache miss, fresh analysis performed with {}",
                    self.analyzer.provider_name()
                );
                Ok(analysis)
            }
            Err(e) => {
                self.usage.record_failure();
                warn!("Fresh analysis failed: {:#}", e);
                Err(SubmissionError::AnalysisFailed(format!("{:#}", e)))
            }
        }
    }

    /// Text, title and company for a submission. A URL is only fetched when no
    /// description was given.
    async fn resolve_posting(&self, submission: &Submission) -> Result<JobPosting, SubmissionError> {
        let description = submission.job_description.as_deref();
        let url = submission
            .job_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());

        let (text, title, company) = match (description, url) {
            (Some(description), _) => (description.to_string(), None, None),
            (None, Some(url)) => match self.url_parser.extract(url).await {
                Ok(Some(job)) => (job.to_analysis_text(), Some(job.title), Some(job.company)),
                Ok(None) => (url.to_string(), None, None),
                Err(e) => {
                    info!("URL parsing failed, using URL as input: {:#}", e);
                    (url.to_string(), None, None)
                }
            },
            (None, None) => return Err(SubmissionError::MissingInput),
        };

        if text.trim().is_empty() {
            return Err(SubmissionError::EmptyInput);
        }

        Ok(JobPosting {
            title: title.unwrap_or_else(|| UNKNOWN_POSITION.to_string()),
            company: company.unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            text,
        })
    }

    /// Draft and store an outreach message for a stored scan. Counts against
    /// the same provider limits as fresh analyses.
    pub async fn generate_outreach(
        &self,
        scan_id: i64,
        message_type: MessageType,
        profile: Option<&str>,
    ) -> Result<OutreachMessage, OutreachError> {
        let scan = self
            .store
            .get(scan_id)
            .await?
            .ok_or(OutreachError::NotFound(scan_id))?;

        let mode = self.usage.service_mode(self.analyzer.is_available());
        if !mode.allows_fresh_analysis() {
            warn!(scan_id, "Outreach requested while the provider is unavailable");
            return Err(OutreachError::Unavailable);
        }

        let analysis = JobAnalysis::from_record(&scan);
        let message = match self
            .analyzer
            .generate_outreach(&scan.original_description, &analysis, profile)
            .await
        {
            Ok(message) => {
                self.usage.record_success();
                message
            }
            Err(e) => {
                self.usage.record_failure();
                warn!(scan_id, "Outreach generation failed: {:#}", e);
                return Err(OutreachError::GenerationFailed(format!("{:#}", e)));
            }
        };

        let message = self
            .store
            .create_outreach(NewOutreach {
                scan_id,
                message,
                message_type,
                ai_cost: OUTREACH_COST_USD,
            })
            .await?;
        info!(
            scan_id,
            message_id = message.id,
            "Outreach generated with {}",
            self.analyzer.provider_name()
        );
        Ok(message)
    }

    /// Publish a high-risk scan to the public archive.
    pub async fn share_to_archive(&self, id: i64) -> Result<(), ShareError> {
        let scan = self.store.get(id).await?.ok_or(ShareError::NotFound(id))?;
        if scan.ghost_likelihood_score < ARCHIVE_MIN_SCORE {
            return Err(ShareError::BelowThreshold {
                min: ARCHIVE_MIN_SCORE,
            });
        }

        if !self.store.share_to_archive(id).await? {
            return Err(ShareError::NotFound(id));
        }
        info!(scan_id = id, "Scan shared to archive");
        Ok(())
    }
}
