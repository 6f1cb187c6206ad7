// src/metrics.rs
//! Provider usage counters, service mode and cache statistics.

use crate::types::{AnalysisSource, ScanRecord};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{info, warn};

/// Estimated provider cost of one fresh analysis, in USD.
pub const ANALYSIS_COST_USD: f64 = 0.006;
/// Estimated provider cost of one outreach message, in USD.
pub const OUTREACH_COST_USD: f64 = 0.003;
pub const DAILY_REQUEST_LIMIT: u32 = 500;
pub const HOURLY_REQUEST_LIMIT: u32 = 100;
/// More consecutive failures than this marks the provider as degraded.
const DEGRADED_AFTER_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    Full,
    CacheOnly,
    Minimal,
}

impl ServiceMode {
    pub fn allows_fresh_analysis(&self) -> bool {
        matches!(self, ServiceMode::Full)
    }

    pub fn message(&self) -> &'static str {
        match self {
            ServiceMode::Full => "All features available",
            ServiceMode::CacheOnly => {
                "Request limit reached - using cached analyses only until the limit resets"
            }
            ServiceMode::Minimal => {
                "AI analysis unavailable - configure TOGETHER_API_KEY. Cached analyses and the archive remain available"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Operational,
    Degraded,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub daily_requests: u32,
    pub hourly_requests: u32,
    pub daily_remaining: u32,
    pub hourly_remaining: u32,
    pub consecutive_failures: u32,
    pub last_successful_request: Option<DateTime<Utc>>,
}

impl UsageSnapshot {
    pub fn within_limits(&self) -> bool {
        self.daily_remaining > 0 && self.hourly_remaining > 0
    }
}

#[derive(Debug)]
struct UsageState {
    daily_requests: u32,
    hourly_requests: u32,
    consecutive_failures: u32,
    last_success: Option<DateTime<Utc>>,
    day: NaiveDate,
    hour: u32,
}

impl UsageState {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            daily_requests: 0,
            hourly_requests: 0,
            consecutive_failures: 0,
            last_success: None,
            day: now.date_naive(),
            hour: now.hour(),
        }
    }

    fn roll(&mut self, now: DateTime<Utc>) {
        let day = now.date_naive();
        if day != self.day {
            self.daily_requests = 0;
            self.hourly_requests = 0;
            self.day = day;
            self.hour = now.hour();
        } else if now.hour() != self.hour {
            self.hourly_requests = 0;
            self.hour = now.hour();
        }
    }
}

/// Counts paid provider calls. One instance is shared by the service and the API.
#[derive(Debug)]
pub struct UsageTracker {
    state: Mutex<UsageState>,
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(UsageState::fresh(Utc::now())),
        }
    }

    fn with_state<T>(&self, now: DateTime<Utc>, f: impl FnOnce(&mut UsageState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.roll(now);
        f(&mut state)
    }

    pub fn record_success(&self) {
        self.record_success_at(Utc::now());
    }

    pub fn record_success_at(&self, now: DateTime<Utc>) {
        self.with_state(now, |state| {
            state.daily_requests += 1;
            state.hourly_requests += 1;
            state.consecutive_failures = 0;
            state.last_success = Some(now);
        });
    }

    pub fn record_failure(&self) {
        self.record_failure_at(Utc::now());
    }

    pub fn record_failure_at(&self, now: DateTime<Utc>) {
        let failures = self.with_state(now, |state| {
            state.consecutive_failures += 1;
            state.consecutive_failures
        });
        if failures > DEGRADED_AFTER_FAILURES {
            warn!("Analysis provider degraded: {} consecutive failures", failures);
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> UsageSnapshot {
        self.with_state(now, |state| UsageSnapshot {
            daily_requests: state.daily_requests,
            hourly_requests: state.hourly_requests,
            daily_remaining: DAILY_REQUEST_LIMIT.saturating_sub(state.daily_requests),
            hourly_remaining: HOURLY_REQUEST_LIMIT.saturating_sub(state.hourly_requests),
            consecutive_failures: state.consecutive_failures,
            last_successful_request: state.last_success,
        })
    }

    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = UsageState::fresh(Utc::now());
        info!("Usage counters reset");
    }

    pub fn service_mode(&self, has_api_key: bool) -> ServiceMode {
        self.service_mode_at(has_api_key, Utc::now())
    }

    pub fn service_mode_at(&self, has_api_key: bool, now: DateTime<Utc>) -> ServiceMode {
        if !has_api_key {
            return ServiceMode::Minimal;
        }
        if self.snapshot_at(now).within_limits() {
            ServiceMode::Full
        } else {
            ServiceMode::CacheOnly
        }
    }

    pub fn provider_status(&self, has_api_key: bool) -> ProviderStatus {
        if !has_api_key {
            return ProviderStatus::Offline;
        }
        let failures = self.snapshot().consecutive_failures;
        if failures > DEGRADED_AFTER_FAILURES {
            ProviderStatus::Degraded
        } else {
            ProviderStatus::Operational
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_scans: usize,
    pub exact_cache_hits: usize,
    pub similar_cache_hits: usize,
    pub fresh_analyses: usize,
    /// Percentage of scans served from the cache.
    pub cache_hit_rate: f64,
    pub estimated_cost_savings: f64,
}

impl CacheStats {
    pub fn from_scans(scans: &[ScanRecord]) -> Self {
        let count = |source: AnalysisSource| {
            scans
                .iter()
                .filter(|scan| scan.analysis_source == source)
                .count()
        };

        let exact = count(AnalysisSource::ExactCache);
        let similar = count(AnalysisSource::SimilarCache);
        let hits = exact + similar;
        let cache_hit_rate = if scans.is_empty() {
            0.0
        } else {
            hits as f64 / scans.len() as f64 * 100.0
        };

        Self {
            total_scans: scans.len(),
            exact_cache_hits: exact,
            similar_cache_hits: similar,
            fresh_analyses: count(AnalysisSource::Fresh),
            cache_hit_rate,
            estimated_cost_savings: hits as f64 * ANALYSIS_COST_USD,
        }
    }
}

/// Usage report served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub daily_analyses: usize,
    pub weekly_analyses: usize,
    pub daily_outreach: usize,
    pub cache_hit_rate: f64,
    pub estimated_daily_cost: f64,
    pub estimated_weekly_cost: f64,
    pub analysis_cost: f64,
    pub outreach_cost: f64,
    pub provider: String,
    pub provider_status: ProviderStatus,
    pub service_mode: ServiceMode,
    pub message: String,
    pub usage: UsageSnapshot,
}

impl UsageReport {
    /// `day_scans` and `week_scans` are the scans created in the last 24 hours and 7 days,
    /// `day_outreach` the outreach messages of the last 24 hours.
    pub fn build(
        tracker: &UsageTracker,
        provider: &str,
        has_api_key: bool,
        day_scans: &[ScanRecord],
        week_scans: &[ScanRecord],
        day_outreach: usize,
    ) -> Self {
        let day = CacheStats::from_scans(day_scans);
        let week = CacheStats::from_scans(week_scans);
        let provider_status = tracker.provider_status(has_api_key);
        let usage = tracker.snapshot();

        let message = match provider_status {
            ProviderStatus::Offline => {
                format!("{} unavailable - TOGETHER_API_KEY required for AI analysis", provider)
            }
            ProviderStatus::Degraded => format!(
                "Service experiencing issues. {} recent failures detected",
                usage.consecutive_failures
            ),
            ProviderStatus::Operational => format!(
                "Service operational. {} analyses and {} outreach messages processed today",
                day.total_scans, day_outreach
            ),
        };

        Self {
            daily_analyses: day.total_scans,
            weekly_analyses: week.total_scans,
            daily_outreach: day_outreach,
            cache_hit_rate: day.cache_hit_rate,
            estimated_daily_cost: day.fresh_analyses as f64 * ANALYSIS_COST_USD
                + day_outreach as f64 * OUTREACH_COST_USD,
            estimated_weekly_cost: week.fresh_analyses as f64 * ANALYSIS_COST_USD,
            analysis_cost: ANALYSIS_COST_USD,
            outreach_cost: OUTREACH_COST_USD,
            provider: provider.to_string(),
            provider_status,
            service_mode: tracker.service_mode(has_api_key),
            message,
            usage,
        }
    }
}
