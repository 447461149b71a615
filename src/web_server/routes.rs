use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, Query, State};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, info};
use snafu::{OptionExt, ResultExt};

use crate::cups_client::models::JobQuery;

use super::gateway::{ApiError, CupsSnafu, Gateway, InvalidUploadSnafu, MissingFileSnafu, UploadedFile};
use super::models::{
    CancelRequest, ErrorResponseBody, HistoryResponse, JobsParams, JobsResponse, MessageResponse, PrintResponse,
    PrintersResponse,
};

/// Header carrying the name of the authenticated caller, set by the reverse proxy in front of us.
pub const CALLER_HEADER: &str = "x-remote-user";
const ANONYMOUS: &str = "anonymous";

/// Room for the multipart framing and the small form fields next to the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let body = ErrorResponseBody { success: false, message: self.to_string(), error: self.cause() };
        (self.status(), Json(body)).into_response()
    }
}

/// The caller's identity as forwarded by the reverse proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANONYMOUS);
        Ok(Caller(user.to_string()))
    }
}

pub fn make_router(gateway: Arc<Gateway>) -> Router {
    let body_limit = gateway.max_upload_size().saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/health", get(health))
        .route("/api/printers", get(printers))
        .route("/api/status", get(status))
        .route("/api/jobs", get(jobs))
        .route("/api/jobs/{id}/cancel", post(cancel_job))
        .route("/api/history", get(history))
        .route("/api/print", post(print))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(gateway)
}

async fn health() -> Json<MessageResponse> {
    Json(MessageResponse { success: true, message: "ok".to_string() })
}

async fn printers(State(gateway): State<Arc<Gateway>>, Caller(user): Caller) -> Result<Json<PrintersResponse>, ApiError> {
    debug!("{} lists printers", user);
    let printers = gateway.cups.discover_printers().await.context(CupsSnafu { message: "Could not list printers" })?;
    Ok(Json(PrintersResponse::new(&printers)))
}

async fn status(State(gateway): State<Arc<Gateway>>, Caller(user): Caller) -> Result<Json<PrintersResponse>, ApiError> {
    debug!("{} requests printer status", user);
    let printers = gateway.cups.printer_status().await.context(CupsSnafu { message: "Could not fetch printer status" })?;
    Ok(Json(PrintersResponse::new(&printers)))
}

async fn jobs(
    State(gateway): State<Arc<Gateway>>,
    Caller(user): Caller,
    Query(params): Query<JobsParams>,
) -> Result<Json<JobsResponse>, ApiError> {
    debug!("{} lists jobs with {:?}", user, params);
    let query = JobQuery {
        scope: params.scope(),
        printer: params.printer.clone().filter(|printer| !printer.trim().is_empty()),
        shared_endpoint: false,
    };
    let jobs = gateway.cups.list_jobs(&query).await.context(CupsSnafu { message: "Could not list jobs" })?;
    Ok(Json(JobsResponse::new(&jobs)))
}

async fn cancel_job(
    State(gateway): State<Arc<Gateway>>,
    Caller(user): Caller,
    Path(id): Path<i32>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    gateway.cancel(&request.printer, id, &user).await?;
    info!("{} cancelled job {} on {}", user, id, request.printer);
    Ok(Json(MessageResponse { success: true, message: format!("Job {} cancelled", id) }))
}

async fn history(State(gateway): State<Arc<Gateway>>) -> Json<HistoryResponse> {
    Json(HistoryResponse { success: true, history: gateway.history.recent().await })
}

async fn print(
    State(gateway): State<Arc<Gateway>>,
    Caller(user): Caller,
    mut multipart: Multipart,
) -> Result<Json<PrintResponse>, ApiError> {
    let mut file = None;
    let mut printer = String::new();
    let mut copies = 1;

    while let Some(field) = multipart.next_field().await.context(InvalidUploadSnafu)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.context(InvalidUploadSnafu)?;
                file = Some(UploadedFile { filename, data: data.to_vec() });
            }
            "printer" => printer = field.text().await.context(InvalidUploadSnafu)?.trim().to_string(),
            "copies" => copies = field.text().await.context(InvalidUploadSnafu)?.trim().parse().unwrap_or(1),
            other => debug!("Ignoring upload field {}", other),
        }
    }

    let file = file.context(MissingFileSnafu)?;
    let receipt = gateway.print(file, &printer, copies, &user).await?;
    Ok(Json(PrintResponse {
        success: true,
        message: format!("{} sent to {}", receipt.job_name, printer),
        job_id: receipt.job_id,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, Request, StatusCode};

    use super::*;
    use crate::cups_client::error::Error as CupsError;

    async fn caller(header: Option<&str>) -> Caller {
        let mut request = Request::builder().uri("/api/printers");
        if let Some(value) = header {
            request = request.header(CALLER_HEADER, HeaderValue::from_str(value).unwrap());
        }
        let (mut parts, _) = request.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn caller_comes_from_the_proxy_header() {
        assert_eq!(caller(Some("alice")).await, Caller("alice".to_string()));
        assert_eq!(caller(Some("  ")).await, Caller(ANONYMOUS.to_string()));
        assert_eq!(caller(None).await, Caller(ANONYMOUS.to_string()));
    }

    #[test]
    fn errors_map_to_status_codes() {
        let rejected = ApiError::Cups { message: "Could not list printers", source: CupsError::NoPrinters };
        assert_eq!(rejected.into_response().status(), StatusCode::BAD_GATEWAY);

        let missing = ApiError::Cups { message: "Print failed", source: CupsError::MissingPrinter };
        assert_eq!(missing.into_response().status(), StatusCode::BAD_REQUEST);

        assert_eq!(ApiError::MissingFile.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_body_names_the_cause() {
        let error = ApiError::Cups { message: "Could not list printers", source: CupsError::NoPrinters };
        let body = ErrorResponseBody { success: false, message: error.to_string(), error: error.cause() };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Could not list printers");
        assert_eq!(json["error"], "No printers found on the print server");
    }
}
