use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use meterflux_core::{
    DispatchError, DispatchPhase, FileSelection, ImportResult, MemoryFile, UtilityType,
    ValidationError,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

use crate::state::ImportState;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Multipart(MultipartError),
    Validation(ValidationError),
    Dispatch(DispatchError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(err) => err.status(),
            ApiError::Dispatch(DispatchError::Busy) => StatusCode::CONFLICT,
            ApiError::Dispatch(DispatchError::Backend(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Dispatch(DispatchError::Transport(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Multipart(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                "payload_too_large"
            }
            ApiError::Multipart(_) => "bad_request",
            ApiError::Validation(_) => "invalid_input",
            ApiError::Dispatch(DispatchError::Busy) => "busy",
            ApiError::Dispatch(DispatchError::Backend(_)) => "backend_rejected",
            ApiError::Dispatch(DispatchError::Transport(_)) => "transport_failed",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Multipart(err) => err.body_text(),
            ApiError::Validation(err) => err.to_string(),
            ApiError::Dispatch(err) => err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::Dispatch(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.message(), "import request failed");
        } else {
            warn!(error = %self.message(), kind = self.kind(), "import request rejected");
        }
        let body = json!({ "error": self.message(), "kind": self.kind() });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ImportStatus {
    pub phase: DispatchPhase,
    pub endpoint: String,
}

/// `POST /api/import`: multipart form with one or more `file` parts,
/// a `type` and a `meterName`. Only the last file part is imported.
pub async fn import_csv(
    State(state): State<Arc<ImportState>>,
    mut multipart: Multipart,
) -> Result<Json<ImportResult>, ApiError> {
    let mut selection = FileSelection::new();
    let mut utility_type = None;
    let mut meter_name = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field.bytes().await?;
                selection.select([MemoryFile::new(file_name, bytes.to_vec())]);
            }
            "type" => {
                let text = field.text().await?;
                utility_type = Some(text.parse::<UtilityType>().map_err(ApiError::BadRequest)?);
            }
            "meterName" => {
                meter_name = field.text().await?;
            }
            _ => {}
        }
    }

    let utility_type =
        utility_type.ok_or_else(|| ApiError::BadRequest("type is required".to_string()))?;

    let flight = state.dispatcher.begin()?;
    let file = selection.active().ok_or(ValidationError::MissingFile)?;
    let request = state
        .builder
        .build(file.as_ref(), utility_type, &meter_name)
        .await?;
    let result = flight.send(request).await?;

    Ok(Json(result))
}

/// `GET /api/import/status`
pub async fn import_status(State(state): State<Arc<ImportState>>) -> Json<ImportStatus> {
    Json(ImportStatus {
        phase: state.dispatcher.phase(),
        endpoint: state.dispatcher.endpoint().to_string(),
    })
}
