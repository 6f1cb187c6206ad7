// src/types/scan.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Lenient parse for provider output ("HIGH", "High", "high").
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" => Severity::High,
            "medium" | "moderate" => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlag {
    pub flag: String,
    pub explanation: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GhostLikelihoodLevel {
    Low,
    Medium,
    High,
}

impl GhostLikelihoodLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            70.. => GhostLikelihoodLevel::High,
            40..=69 => GhostLikelihoodLevel::Medium,
            _ => GhostLikelihoodLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GhostLikelihoodLevel::Low => "low",
            GhostLikelihoodLevel::Medium => "medium",
            GhostLikelihoodLevel::High => "high",
        }
    }
}

impl FromStr for GhostLikelihoodLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(GhostLikelihoodLevel::Low),
            "medium" => Ok(GhostLikelihoodLevel::Medium),
            "high" => Ok(GhostLikelihoodLevel::High),
            other => anyhow::bail!("Unknown ghost likelihood level: {}", other),
        }
    }
}

/// How the analysis payload of a record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Fresh,
    ExactCache,
    SimilarCache,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::Fresh => "fresh",
            AnalysisSource::ExactCache => "exact_cache",
            AnalysisSource::SimilarCache => "similar_cache",
        }
    }

    pub fn is_cached(&self) -> bool {
        !matches!(self, AnalysisSource::Fresh)
    }
}

impl fmt::Display for AnalysisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fresh" => Ok(AnalysisSource::Fresh),
            "exact_cache" => Ok(AnalysisSource::ExactCache),
            "similar_cache" => Ok(AnalysisSource::SimilarCache),
            other => anyhow::bail!("Unknown analysis source: {}", other),
        }
    }
}

/// Analysis payload produced by the provider. The cache stores and returns it unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub job_title: String,
    pub company: String,
    pub ghost_likelihood_score: u8,
    pub ghost_likelihood_level: GhostLikelihoodLevel,
    pub red_flags: Vec<RedFlag>,
    pub ai_summary: String,
    pub confidence_explanation: Option<String>,
}

impl JobAnalysis {
    /// Copy the payload of a stored scan.
    pub fn from_record(record: &ScanRecord) -> Self {
        Self {
            job_title: record.job_title.clone(),
            company: record.company.clone(),
            ghost_likelihood_score: record.ghost_likelihood_score,
            ghost_likelihood_level: record.ghost_likelihood_level,
            red_flags: record.red_flags.clone(),
            ai_summary: record.ai_summary.clone(),
            confidence_explanation: record.confidence_explanation.clone(),
        }
    }
}

/// A stored analysis of one submitted job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub job_title: String,
    pub company: String,
    pub original_url: Option<String>,
    pub original_description: String,
    pub content_hash: String,
    pub content_fingerprint: Option<String>,
    pub ghost_likelihood_score: u8,
    pub ghost_likelihood_level: GhostLikelihoodLevel,
    pub red_flags: Vec<RedFlag>,
    pub ai_summary: String,
    pub confidence_explanation: Option<String>,
    pub is_shared_to_archive: bool,
    pub analysis_source: AnalysisSource,
    pub cache_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a scan before the store assigns `id` and `created_at`.
/// The expiry is stamped from the assigned `created_at` plus `cache_ttl`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScan {
    pub original_url: Option<String>,
    pub original_description: String,
    pub content_hash: String,
    pub content_fingerprint: String,
    pub analysis: JobAnalysis,
    pub analysis_source: AnalysisSource,
    pub cache_ttl: Duration,
}

impl NewScan {
    pub fn into_record(self, id: i64, created_at: DateTime<Utc>) -> ScanRecord {
        let analysis = self.analysis;
        ScanRecord {
            id,
            job_title: analysis.job_title,
            company: analysis.company,
            original_url: self.original_url,
            original_description: self.original_description,
            content_hash: self.content_hash,
            content_fingerprint: Some(self.content_fingerprint),
            ghost_likelihood_score: analysis.ghost_likelihood_score,
            ghost_likelihood_level: analysis.ghost_likelihood_level,
            red_flags: analysis.red_flags,
            ai_summary: analysis.ai_summary,
            confidence_explanation: analysis.confidence_explanation,
            is_shared_to_archive: false,
            analysis_source: self.analysis_source,
            cache_expires_at: created_at + self.cache_ttl,
            created_at,
        }
    }
}
