use crate::service::{OutreachError, ScanService};
use crate::types::OutreachMessage;
use crate::web::types::{api_error, ApiError, DataResponse, GenerateOutreachRequest};

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

fn outreach_error(e: OutreachError) -> ApiError {
    let message = e.to_string();
    match e {
        OutreachError::NotFound(_) => api_error(
            Status::NotFound,
            message,
            "SCAN_NOT_FOUND",
            &["Analyze the job posting first"],
        ),
        OutreachError::Unavailable => {
            warn!("{}", message);
            api_error(
                Status::ServiceUnavailable,
                message,
                "OUTREACH_UNAVAILABLE",
                &["Try again later"],
            )
        }
        OutreachError::GenerationFailed(_) => {
            error!("{}", message);
            api_error(
                Status::BadGateway,
                message,
                "OUTREACH_FAILED",
                &["Try again in a few moments"],
            )
        }
        OutreachError::Internal(e) => {
            error!("Failed to generate outreach message: {:#}", e);
            api_error(
                Status::InternalServerError,
                "Failed to generate outreach message",
                "DATABASE_ERROR",
                &["Try again in a few moments"],
            )
        }
    }
}

pub async fn generate_outreach_handler(
    request: Json<GenerateOutreachRequest>,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<OutreachMessage>>, ApiError> {
    let request = request.into_inner();
    info!(
        "Outreach request for scan {} ({})",
        request.scan_id, request.message_type
    );

    let message = service
        .generate_outreach(
            request.scan_id,
            request.message_type,
            request.user_profile.as_deref(),
        )
        .await
        .map_err(outreach_error)?;

    Ok(Json(DataResponse::success("Outreach message generated", message)))
}

pub async fn get_outreach_handler(
    scan_id: i64,
    service: &State<ScanService>,
) -> Result<Json<DataResponse<Vec<OutreachMessage>>>, ApiError> {
    let messages = service
        .store()
        .find_outreach_by_scan(scan_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch outreach messages: {:#}", e);
            api_error(
                Status::InternalServerError,
                "Failed to fetch outreach messages",
                "DATABASE_ERROR",
                &["Try again in a few moments"],
            )
        })?;

    Ok(Json(DataResponse::success(
        format!("{} outreach messages", messages.len()),
        messages,
    )))
}
