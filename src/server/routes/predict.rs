//! Prediction endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::classifier::ClassificationResult;
use crate::error::{Error, Result};
use crate::server::state::{AppState, SharedState};

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

/// POST /predict - classify the image in the `file` form field
///
/// Classification failures (bad image, label mismatch) answer 200 with an
/// `error` body; timeouts and crashed inference tasks answer 500.
pub async fn predict(
    State(state): State<SharedState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let upload = match multipart {
        Ok(mut multipart) => read_upload(&mut multipart).await,
        Err(rejection) => {
            warn!("rejected non-multipart upload: {}", rejection.body_text());
            Ok(None)
        }
    };

    let bytes = match upload {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, Error::MissingInput),
        Err(e) => {
            warn!("malformed multipart body: {}", e.body_text());
            return error_response(StatusCode::BAD_REQUEST, e.body_text());
        }
    };

    match run_inference(&state, bytes).await {
        Ok(Ok(result)) => {
            info!(raw_class = %result.raw_label, confidence = result.confidence_percent, "prediction");
            (StatusCode::OK, Json(result)).into_response()
        }
        Ok(Err(e)) => {
            warn!("prediction failed: {e}");
            error_response(StatusCode::OK, e)
        }
        Err(e) => {
            error!("prediction aborted: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn read_upload(multipart: &mut Multipart) -> std::result::Result<Option<Bytes>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return Ok(Some(field.bytes().await?));
        }
    }
    Ok(None)
}

/// Outer error: the handler could not get an answer at all.
/// Inner error: the classifier answered with a failure.
async fn run_inference(state: &AppState, bytes: Bytes) -> Result<Result<ClassificationResult>> {
    let slots = Arc::clone(&state.inference_slots);
    let context = Arc::clone(&state.context);

    let work = async move {
        let permit = slots
            .acquire_owned()
            .await
            .map_err(|e| Error::Inference(format!("inference pool closed: {e}")))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            context.classify_bytes(&bytes)
        })
        .await
        .map_err(|e| Error::Inference(format!("inference task failed: {e}")))
    };

    tokio::time::timeout(state.request_timeout, work)
        .await
        .map_err(|_| Error::Timeout(state.request_timeout))?
}
