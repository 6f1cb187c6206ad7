// src/analysis/url_parser.rs
use anyhow::{Context, Result};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedJob {
    pub title: String,
    pub company: String,
    pub description: String,
}

impl ExtractedJob {
    /// Text submitted for analysis when a posting came from a URL.
    pub fn to_analysis_text(&self) -> String {
        format!(
            "Job Title: {}\nCompany: {}\n\nDescription:\n{}",
            self.title, self.company, self.description
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobBoard {
    LinkedIn,
    Indeed,
    Glassdoor,
    Generic,
}

impl JobBoard {
    fn detect(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default().to_lowercase();
        if host.ends_with("linkedin.com") && url.path().starts_with("/jobs") {
            JobBoard::LinkedIn
        } else if host.ends_with("indeed.com") {
            JobBoard::Indeed
        } else if host.ends_with("glassdoor.com") {
            JobBoard::Glassdoor
        } else {
            JobBoard::Generic
        }
    }

    fn selectors(&self) -> BoardSelectors {
        match self {
            JobBoard::LinkedIn => BoardSelectors {
                title: &[
                    "h1.top-card-layout__title",
                    ".job-details-jobs-unified-top-card__job-title",
                    "h1",
                ],
                company: &[
                    ".topcard__org-name-link",
                    ".job-details-jobs-unified-top-card__company-name",
                    ".jobs-unified-top-card__company-name",
                ],
                description: &[
                    ".description__text",
                    ".jobs-description-content__text",
                    ".jobs-box__html-content",
                ],
            },
            JobBoard::Indeed => BoardSelectors {
                title: &[
                    "[data-testid='jobsearch-JobInfoHeader-title']",
                    "h1.jobsearch-JobInfoHeader-title",
                ],
                company: &["[data-testid='inlineHeader-companyName']", ".icl-u-lg-mr--sm"],
                description: &["#jobDescriptionText", ".jobsearch-jobDescriptionText"],
            },
            JobBoard::Glassdoor => BoardSelectors {
                title: &["[data-test='job-title']", ".job-title"],
                company: &["[data-test='employer-name']", ".employer-name"],
                description: &["[data-test='job-description']", ".job-description"],
            },
            JobBoard::Generic => BoardSelectors {
                title: &["h1", "[class*='title']", "[class*='job-title']", "[id*='title']"],
                company: &["[class*='company']", "[class*='employer']", "[class*='org']"],
                description: &["[class*='description']", "[class*='content']", "main", "article"],
            },
        }
    }
}

struct BoardSelectors {
    title: &'static [&'static str],
    company: &'static [&'static str],
    description: &'static [&'static str],
}

/// Fetches a job page and pulls title, company and description out of it.
pub struct JobUrlParser {
    client: Client,
}

impl JobUrlParser {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// `Ok(None)` when the page was fetched but no title and company were found.
    pub async fn extract(&self, url: &str) -> Result<Option<ExtractedJob>> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid job URL: {}", url))?;
        info!("Fetching job post: {}", parsed);

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .context("Failed to fetch job post")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let html = response
            .text()
            .await
            .context("Failed to read response body")?;

        let extracted = Self::parse_page(&parsed, &html);
        match &extracted {
            Some(job) => info!("Extracted job: {} at {}", job.title, job.company),
            None => warn!("No job title and company found at {}", parsed),
        }
        Ok(extracted)
    }

    /// Parse an already fetched page. The board-specific selectors are tried
    /// first, then the generic ones.
    pub fn parse_page(url: &Url, html: &str) -> Option<ExtractedJob> {
        let document = Html::parse_document(html);
        let board = JobBoard::detect(url);

        Self::parse_with(&document, &board.selectors()).or_else(|| {
            if board == JobBoard::Generic {
                None
            } else {
                warn!("Falling back to generic job parsing");
                Self::parse_with(&document, &JobBoard::Generic.selectors())
            }
        })
    }

    fn parse_with(document: &Html, selectors: &BoardSelectors) -> Option<ExtractedJob> {
        let title = Self::find_text_by_selectors(document, selectors.title)?;
        let company = Self::find_text_by_selectors(document, selectors.company)?;
        let description =
            Self::find_text_by_selectors(document, selectors.description).unwrap_or_default();

        Some(ExtractedJob {
            title,
            company,
            description,
        })
    }

    fn find_text_by_selectors(document: &Html, selectors: &[&str]) -> Option<String> {
        for selector_str in selectors {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(element) = document.select(&selector).next() {
                    let text = Self::clean_text(&element.text().collect::<Vec<_>>().join(" "));
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }
        None
    }

    fn clean_text(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_detect_board() {
        assert_eq!(
            JobBoard::detect(&url("https://www.linkedin.com/jobs/view/123")),
            JobBoard::LinkedIn
        );
        assert_eq!(
            JobBoard::detect(&url("https://uk.indeed.com/viewjob?jk=1")),
            JobBoard::Indeed
        );
        assert_eq!(
            JobBoard::detect(&url("https://www.glassdoor.com/job-listing/x")),
            JobBoard::Glassdoor
        );
        assert_eq!(
            JobBoard::detect(&url("https://www.linkedin.com/in/someone")),
            JobBoard::Generic
        );
    }

    #[test]
    fn test_parse_indeed_page() {
        let html = r#"
            <html><body>
              <h1 data-testid="jobsearch-JobInfoHeader-title">  Warehouse
                  Associate </h1>
              <div data-testid="inlineHeader-companyName">Globex</div>
              <div id="jobDescriptionText"><p>Pick and pack orders.</p><p>Night shift.</p></div>
            </body></html>"#;

        let job = JobUrlParser::parse_page(&url("https://www.indeed.com/viewjob?jk=1"), html).unwrap();
        assert_eq!(job.title, "Warehouse Associate");
        assert_eq!(job.company, "Globex");
        assert_eq!(job.description, "Pick and pack orders. Night shift.");
    }

    #[test]
    fn test_board_page_falls_back_to_generic_selectors() {
        let html = r#"
            <html><body>
              <h1>Site Reliability Engineer</h1>
              <span class="company-name">Hooli</span>
              <main>Keep the lights on.</main>
            </body></html>"#;

        let job = JobUrlParser::parse_page(&url("https://www.glassdoor.com/job/1"), html).unwrap();
        assert_eq!(job.title, "Site Reliability Engineer");
        assert_eq!(job.company, "Hooli");
        assert_eq!(job.description, "Keep the lights on.");
    }

    #[test]
    fn test_missing_company_is_not_a_parse() {
        let html = "<html><body><h1>Engineer</h1><main>Text</main></body></html>";
        assert_eq!(JobUrlParser::parse_page(&url("https://jobs.example.com/1"), html), None);
    }

    #[test]
    fn test_analysis_text_layout() {
        let job = ExtractedJob {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            description: "Build things".to_string(),
        };
        assert_eq!(
            job.to_analysis_text(),
            "Job Title: Engineer\nCompany: Acme\n\nDescription:\nBuild things"
        );
    }
}
