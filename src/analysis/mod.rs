// src/analysis/mod.rs
//! Everything that calls the paid provider: the LLM client, its retry
//! policy and the job-page extractor that feeds it.

pub mod llm_client;
pub mod retry;
pub mod url_parser;

pub use llm_client::LlmAnalyzer;
pub use retry::RetryPolicy;
pub use url_parser::{ExtractedJob, JobUrlParser};

use crate::types::JobAnalysis;
use anyhow::Result;
use async_trait::async_trait;

/// A submission resolved to the text that gets analyzed.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub text: String,
}

/// Produces a ghost-job analysis for a posting. Implementations are paid
/// calls; the cache exists to avoid them.
#[async_trait]
pub trait JobAnalyzer: Send + Sync {
    async fn analyze(&self, posting: &JobPosting) -> Result<JobAnalysis>;

    /// Draft a message to the employer whose tone follows the analysis' risk level.
    /// `profile` is an optional candidate summary to personalise the message.
    async fn generate_outreach(
        &self,
        posting: &str,
        analysis: &JobAnalysis,
        profile: Option<&str>,
    ) -> Result<String>;

    /// False when the provider cannot be called at all (e.g. no API key).
    fn is_available(&self) -> bool;

    fn provider_name(&self) -> &str;
}
