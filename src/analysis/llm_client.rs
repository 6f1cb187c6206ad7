// src/analysis/llm_client.rs
use super::{JobAnalyzer, JobPosting, RetryPolicy};
use crate::core::config_manager::LlmConfig;
use crate::types::{GhostLikelihoodLevel, JobAnalysis, RedFlag, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const SYSTEM_PROMPT: &str = r#"You are a job market analyst specializing in identifying ghost jobs and employment risks. Protect job seekers from postings with no intent to hire and from predatory hiring practices.

ANALYSIS FRAMEWORK:
1. Ghost Job Likelihood (0-100): probability this posting is not a real opening
2. Risk Level: LOW/MEDIUM/HIGH based on the warning signs found
3. Red Flags: specific concerning elements with explanations
4. Recommendations: actionable advice for the job seeker

RESPONSE FORMAT: Always respond with valid JSON matching this structure:
{
  "ghostLikelihood": number (0-100),
  "riskLevel": "LOW" | "MEDIUM" | "HIGH",
  "confidence": number (0-1),
  "redFlags": [
    {
      "category": string,
      "description": string,
      "severity": "LOW" | "MEDIUM" | "HIGH"
    }
  ],
  "positiveSignals": [string],
  "recommendations": [string],
  "summary": string
}

FACTORS TO WEIGH:
- Vague job descriptions or responsibilities
- Unrealistic salary ranges or compensation
- Urgency language ("immediate start", "apply now")
- Generic company descriptions
- Excessive requirements compared to compensation
- Poor grammar or formatting
- Lack of specific company information
- MLM or commission-only structures
- Unprofessional contact methods"#;

const OUTREACH_SYSTEM_PROMPT: &str = "You are a professional career coach helping job seekers craft effective outreach messages. Create personalized, professional messages that:

1. Show genuine interest in the role
2. Highlight relevant qualifications
3. Request specific next steps
4. Maintain appropriate tone based on risk assessment
5. Protect the candidate from potential red flags";

/// Sampling settings for one chat-completions call.
struct Completion<'a> {
    system: &'a str,
    user: &'a str,
    temperature: f32,
    max_tokens: u32,
    json_reply: bool,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// JSON document the model is asked to produce.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ModelVerdict {
    ghost_likelihood: f64,
    risk_level: Option<String>,
    confidence: Option<f64>,
    red_flags: Vec<ModelRedFlag>,
    positive_signals: Vec<String>,
    recommendations: Vec<String>,
    summary: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelRedFlag {
    category: String,
    description: String,
    severity: String,
}

/// OpenAI-compatible chat-completions client (Together AI by default).
pub struct LlmAnalyzer {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
    retry: RetryPolicy,
}

impl LlmAnalyzer {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .context("LLM provider is not configured: TOGETHER_API_KEY is missing")
    }

    async fn complete(&self, api_key: &str, completion: &Completion<'_>) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            temperature: completion.temperature,
            max_tokens: completion.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: completion.system,
                },
                ChatMessage {
                    role: "user",
                    content: completion.user,
                },
            ],
            response_format: completion.json_reply.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to LLM provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("LLM provider error {}: {}", status, error_text);
            anyhow::bail!("LLM provider returned error {}: {}", status, error_text);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse LLM provider response")?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .context("LLM provider returned no content")
    }
}

#[async_trait]
impl JobAnalyzer for LlmAnalyzer {
    async fn analyze(&self, posting: &JobPosting) -> Result<JobAnalysis> {
        let api_key = self.api_key()?;

        let user_prompt = format!(
            "Analyze this job posting for ghost job indicators and employment risks:\n\n{}",
            posting.text
        );
        let completion = Completion {
            system: SYSTEM_PROMPT,
            user: &user_prompt,
            temperature: 0.1,
            max_tokens: 2000,
            json_reply: true,
        };

        info!("Requesting analysis from {}", self.model);
        let content = self
            .retry
            .run("LLM analysis", || self.complete(api_key, &completion))
            .await?;

        let analysis = parse_verdict(&content, posting)?;
        info!(
            "Analysis complete: {} at {} scored {}",
            analysis.job_title, analysis.company, analysis.ghost_likelihood_score
        );
        Ok(analysis)
    }

    async fn generate_outreach(
        &self,
        posting: &str,
        analysis: &JobAnalysis,
        profile: Option<&str>,
    ) -> Result<String> {
        let api_key = self.api_key()?;
        let (system, user) = outreach_prompts(posting, analysis, profile);
        let completion = Completion {
            system: &system,
            user: &user,
            temperature: 0.3,
            max_tokens: 500,
            json_reply: false,
        };

        info!(
            "Requesting {}-risk outreach message from {}",
            analysis.ghost_likelihood_level.as_str(),
            self.model
        );
        let message = self
            .retry
            .run("LLM outreach generation", || {
                self.complete(api_key, &completion)
            })
            .await?;
        Ok(message.trim().to_string())
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn provider_name(&self) -> &str {
        &self.model
    }
}

/// Map the model's JSON reply onto a `JobAnalysis` for the given posting.
fn parse_verdict(content: &str, posting: &JobPosting) -> Result<JobAnalysis> {
    let verdict: ModelVerdict =
        serde_json::from_str(content).context("LLM reply is not a valid analysis document")?;

    let score = verdict.ghost_likelihood.round().clamp(0.0, 100.0) as u8;
    let level = GhostLikelihoodLevel::from_score(score);
    if let Some(risk) = verdict.risk_level.as_deref() {
        if !risk.eq_ignore_ascii_case(level.as_str()) {
            debug!("Model risk level {} disagrees with score {}", risk, score);
        }
    }

    let red_flags = verdict
        .red_flags
        .into_iter()
        .filter(|flag| !flag.category.trim().is_empty() || !flag.description.trim().is_empty())
        .map(|flag| RedFlag {
            flag: flag.category,
            explanation: flag.description,
            severity: Severity::from_label(&flag.severity),
        })
        .collect();

    let mut summary = verdict.summary.trim().to_string();
    if !verdict.recommendations.is_empty() {
        if !summary.is_empty() {
            summary.push_str("\n\n");
        }
        summary.push_str("Recommendations: ");
        summary.push_str(&verdict.recommendations.join("; "));
    }

    Ok(JobAnalysis {
        job_title: posting.title.clone(),
        company: posting.company.clone(),
        ghost_likelihood_score: score,
        ghost_likelihood_level: level,
        red_flags,
        ai_summary: summary,
        confidence_explanation: confidence_explanation(
            verdict.confidence,
            &verdict.positive_signals,
        ),
    })
}

/// System and user prompts for an outreach message.
fn outreach_prompts(
    posting: &str,
    analysis: &JobAnalysis,
    profile: Option<&str>,
) -> (String, String) {
    let risk_context = match analysis.ghost_likelihood_level {
        GhostLikelihoodLevel::High => "Given the high risk level of this posting, craft a cautious message that protects the candidate while still showing interest.",
        GhostLikelihoodLevel::Medium => "This posting has some red flags. Create a professional message that addresses potential concerns diplomatically.",
        GhostLikelihoodLevel::Low => "This appears to be a legitimate opportunity. Create an enthusiastic but professional outreach message.",
    };
    let system = format!(
        "{}\n\n{}\n\nKeep messages concise (150-250 words), professional, and action-oriented.",
        OUTREACH_SYSTEM_PROMPT, risk_context
    );

    let red_flags = analysis
        .red_flags
        .iter()
        .map(|flag| flag.explanation.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut user = format!(
        "Create an outreach message for this job opportunity:\n\nJOB POSTING:\n{}\n\n\
         ANALYSIS RESULTS:\nRisk Level: {}\nGhost Likelihood: {}%\nKey Red Flags: {}\n\n",
        posting,
        analysis.ghost_likelihood_level.as_str().to_uppercase(),
        analysis.ghost_likelihood_score,
        red_flags
    );
    if let Some(profile) = profile.map(str::trim).filter(|p| !p.is_empty()) {
        user.push_str(&format!("CANDIDATE PROFILE: {}\n\n", profile));
    }
    user.push_str(
        "Generate a professional outreach message that addresses the opportunity while being mindful of the identified risks.",
    );

    (system, user)
}

fn confidence_explanation(confidence: Option<f64>, positive_signals: &[String]) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(confidence) = confidence {
        let percent = (confidence.clamp(0.0, 1.0) * 100.0).round() as u32;
        parts.push(format!("Confidence: {}%.", percent));
    }
    if !positive_signals.is_empty() {
        parts.push(format!("Positive signals: {}.", positive_signals.join("; ")));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
