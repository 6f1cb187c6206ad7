// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use types::*;

use crate::analysis::{JobAnalyzer, JobUrlParser, LlmAnalyzer};
use crate::cache::JobCache;
use crate::core::{ConfigManager, Database};
use crate::metrics::{CacheStats, UsageReport, UsageTracker};
use crate::service::ScanService;
use crate::store::{ScanStore, SqliteScanStore};
use crate::types::{OutreachMessage, ScanRecord};
use anyhow::{Context, Result};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use tracing::{error, info};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[post("/analyze-job", data = "<request>")]
pub async fn analyze_job(
    request: Json<AnalyzeJobRequest>,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<ScanResult>>, ApiError> {
    handlers::analyze_job_handler(request, service).await
}

#[get("/scans?<limit>")]
pub async fn get_scans(
    limit: Option<usize>,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<Vec<ScanRecord>>>, ApiError> {
    handlers::get_scans_handler(limit, service).await
}

#[get("/scans/<id>")]
pub async fn get_scan(
    id: i64,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<ScanRecord>>, ApiError> {
    handlers::get_scan_handler(id, service).await
}

#[post("/scans/<id>/share")]
pub async fn share_scan(
    id: i64,
    service: &State<ScanService>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::share_scan_handler(id, service).await
}

#[post("/generate-outreach", data = "<request>")]
pub async fn generate_outreach(
    request: Json<GenerateOutreachRequest>,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<OutreachMessage>>, ApiError> {
    handlers::generate_outreach_handler(request, service).await
}

#[get("/scans/<id>/outreach")]
pub async fn get_outreach(
    id: i64,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<Vec<OutreachMessage>>>, ApiError> {
    handlers::get_outreach_handler(id, service).await
}

#[get("/archive?<limit>&<offset>")]
pub async fn get_archive(
    limit: Option<usize>,
    offset: Option<usize>,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<ArchivePage>>, ApiError> {
    handlers::get_archive_handler(limit, offset, service).await
}

#[get("/cache-stats")]
pub async fn cache_stats(
    service: &State<ScanService>,
) -> Result<Json<DataResponse<CacheStats>>, ApiError> {
    handlers::cache_stats_handler(service).await
}

#[get("/usage-status")]
pub async fn usage_status(
    service: &State<ScanService>,
) -> Result<Json<DataResponse<UsageReport>>, ApiError> {
    handlers::usage_status_handler(service).await
}

#[get("/health")]
pub async fn health(service: &State<ScanService>) -> Json<DataResponse<HealthData>> {
    handlers::health_handler(service).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the request path".to_string()],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body could not be parsed".to_string(),
        "INVALID_BODY".to_string(),
        vec![
            "Send a JSON object with job_description or job_url".to_string(),
            "Outreach requests need a numeric scan_id".to_string(),
        ],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    ))
}

/// Mount the API on a rocket instance built from `figment`.
pub fn build_rocket(service: ScanService, figment: rocket::figment::Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(Cors)
        .manage(service)
        .register(
            "/api",
            catchers![bad_request, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                analyze_job,
                get_scans,
                get_scan,
                share_scan,
                generate_outreach,
                get_outreach,
                get_archive,
                cache_stats,
                usage_status,
                health,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    let db = match Database::new(&config.environment.database_path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database: {:#}", e);
            return Err(e);
        }
    };

    let store: Arc<dyn ScanStore> = Arc::new(SqliteScanStore::new(db.pool().clone()));
    let analyzer: Arc<dyn JobAnalyzer> = Arc::new(LlmAnalyzer::new(&config.llm)?);
    if !analyzer.is_available() {
        info!("TOGETHER_API_KEY not set: serving cached analyses only");
    }

    let service = ScanService::new(
        store.clone(),
        JobCache::new(store, config.cache.clone()),
        analyzer,
        JobUrlParser::new()?,
        Arc::new(UsageTracker::new()),
    );

    info!("Starting ghost-scan API server");
    info!("Environment: {}", config.environment.name);
    info!("Database: {}", config.environment.database_path.display());
    info!("Model: {} via {}", config.llm.model, config.llm.api_url);
    info!("Server: http://0.0.0.0:{}", config.environment.port);

    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", config.environment.port));

    build_rocket(service, figment)
        .launch()
        .await
        .context("Rocket server failed")?;

    Ok(())
}
