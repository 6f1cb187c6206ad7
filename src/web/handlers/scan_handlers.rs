// src/web/handlers/scan_handlers.rs
use crate::service::{ScanService, ShareError, Submission, SubmissionError};
use crate::types::ScanRecord;
use crate::web::types::{
    api_error, ActionResponse, AnalyzeJobRequest, ApiError, ArchivePage, DataResponse, Pagination,
    ScanResult,
};

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

const DEFAULT_SCANS_LIMIT: usize = 50;
const MAX_SCANS_LIMIT: usize = 100;
const DEFAULT_ARCHIVE_LIMIT: usize = 20;
const MAX_ARCHIVE_LIMIT: usize = 50;

fn store_error(context: &str, e: anyhow::Error) -> ApiError {
    error!("{}: {:#}", context, e);
    api_error(
        Status::InternalServerError,
        context,
        "DATABASE_ERROR",
        &["Try again in a few moments"],
    )
}

fn submission_error(e: SubmissionError) -> ApiError {
    let message = e.to_string();
    match e {
        SubmissionError::MissingInput => api_error(
            Status::BadRequest,
            message,
            "MISSING_INPUT",
            &["Provide job_description or job_url"],
        ),
        SubmissionError::EmptyInput => api_error(
            Status::BadRequest,
            message,
            "EMPTY_INPUT",
            &["Paste the full text of the job posting"],
        ),
        SubmissionError::FreshAnalysisUnavailable(_) => {
            warn!("{}", message);
            api_error(
                Status::ServiceUnavailable,
                message,
                "ANALYSIS_UNAVAILABLE",
                &[
                    "Browse the archive for similar job postings",
                    "Try again later",
                ],
            )
        }
        SubmissionError::AnalysisFailed(_) => {
            error!("{}", message);
            api_error(
                Status::BadGateway,
                message,
                "ANALYSIS_FAILED",
                &["Try again in a few moments"],
            )
        }
        SubmissionError::Internal(e) => store_error("Failed to analyze job posting", e),
    }
}

fn scan_not_found(id: i64) -> ApiError {
    api_error(
        Status::NotFound,
        format!("Scan {} not found", id),
        "SCAN_NOT_FOUND",
        &["Check the scan id"],
    )
}

pub async fn analyze_job_handler(
    request: Json<AnalyzeJobRequest>,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<ScanResult>>, ApiError> {
    let request = request.into_inner();
    info!(
        "Analyze request (description: {}, url: {})",
        request.job_description.is_some(),
        request.job_url.is_some()
    );

    let outcome = service
        .submit(Submission {
            job_description: request.job_description,
            job_url: request.job_url,
        })
        .await
        .map_err(submission_error)?;

    let message = outcome
        .cache_message
        .clone()
        .unwrap_or_else(|| "Job posting analyzed".to_string());

    Ok(Json(DataResponse::success(
        message,
        ScanResult {
            scan: outcome.scan,
            cache_message: outcome.cache_message,
        },
    )))
}

pub async fn get_scans_handler(
    limit: Option<usize>,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<Vec<ScanRecord>>>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_SCANS_LIMIT).clamp(1, MAX_SCANS_LIMIT);

    let scans = service
        .store()
        .find_recent(limit)
        .await
        .map_err(|e| store_error("Failed to fetch scans", e))?;

    Ok(Json(DataResponse::success(
        format!("{} recent scans", scans.len()),
        scans,
    )))
}

pub async fn get_scan_handler(
    id: i64,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<ScanRecord>>, ApiError> {
    let scan = service
        .store()
        .get(id)
        .await
        .map_err(|e| store_error("Failed to fetch scan", e))?
        .ok_or_else(|| scan_not_found(id))?;

    Ok(Json(DataResponse::success("Scan found", scan)))
}

pub async fn share_scan_handler(
    id: i64,
    service: &State<ScanService>,
) -> Result<Json<ActionResponse>, ApiError> {
    match service.share_to_archive(id).await {
        Ok(()) => Ok(Json(ActionResponse::success(
            "Scan shared to archive successfully",
            "shared",
        ))),
        Err(ShareError::NotFound(id)) => Err(scan_not_found(id)),
        Err(e @ ShareError::BelowThreshold { .. }) => Err(api_error(
            Status::BadRequest,
            e.to_string(),
            "SCORE_TOO_LOW",
            &["Only postings with a high ghost likelihood are archived"],
        )),
        Err(ShareError::Internal(e)) => Err(store_error("Failed to share scan to archive", e)),
    }
}

pub async fn get_archive_handler(
    limit: Option<usize>,
    offset: Option<usize>,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<ArchivePage>>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_ARCHIVE_LIMIT).clamp(1, MAX_ARCHIVE_LIMIT);
    let offset = offset.unwrap_or(0);
    let store = service.store();

    let (scans, total) = tokio::try_join!(
        store.find_archived(limit, offset),
        store.count_archived()
    )
    .map_err(|e| store_error("Failed to fetch archive", e))?;

    Ok(Json(DataResponse::success(
        format!("{} archived scans", total),
        ArchivePage {
            scans,
            pagination: Pagination::new(total, limit, offset),
        },
    )))
}
