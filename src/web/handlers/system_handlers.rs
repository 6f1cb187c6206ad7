// src/web/handlers/system_handlers.rs
use crate::metrics::{CacheStats, UsageReport};
use crate::service::ScanService;
use crate::web::types::{api_error, ApiError, DataResponse, HealthData};

use chrono::{Duration, Utc};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

/// Scans considered by the cache statistics.
const CACHE_STATS_WINDOW: usize = 100;

pub async fn cache_stats_handler(
    service: &State<ScanService>,
) -> Result<Json<DataResponse<CacheStats>>, ApiError> {
    let scans = service
        .store()
        .find_recent(CACHE_STATS_WINDOW)
        .await
        .map_err(|e| {
            error!("Failed to fetch cache statistics: {:#}", e);
            api_error(
                Status::InternalServerError,
                "Failed to fetch cache statistics",
                "DATABASE_ERROR",
                &["Try again in a few moments"],
            )
        })?;

    Ok(Json(DataResponse::success(
        "Cache statistics",
        CacheStats::from_scans(&scans),
    )))
}

pub async fn usage_status_handler(
    service: &State<ScanService>,
) -> Result<Json<DataResponse<UsageReport>>, ApiError> {
    let now = Utc::now();
    let store = service.store();

    let (day_scans, week_scans, day_outreach) = tokio::try_join!(
        store.find_created_after(now - Duration::days(1)),
        store.find_created_after(now - Duration::days(7)),
        store.count_outreach_since(now - Duration::days(1))
    )
    .map_err(|e| {
        error!("Failed to calculate usage status: {:#}", e);
        api_error(
            Status::InternalServerError,
            "Failed to calculate usage status",
            "DATABASE_ERROR",
            &["Try again in a few moments"],
        )
    })?;

    let analyzer = service.analyzer();
    let report = UsageReport::build(
        service.usage(),
        analyzer.provider_name(),
        analyzer.is_available(),
        &day_scans,
        &week_scans,
        day_outreach,
    );

    Ok(Json(DataResponse::success(report.message.clone(), report)))
}

pub async fn health_handler(service: &State<ScanService>) -> Json<DataResponse<HealthData>> {
    let database = match service.store().find_recent(1).await {
        Ok(_) => "ok",
        Err(e) => {
            error!("Health check could not reach the scan store: {:#}", e);
            "unavailable"
        }
    };
    info!("Health check (database: {})", database);

    Json(DataResponse::success(
        "Service is running",
        HealthData {
            status: "ok".to_string(),
            database: database.to_string(),
            provider_available: service.analyzer().is_available(),
            timestamp: Utc::now().to_rfc3339(),
        },
    ))
}
