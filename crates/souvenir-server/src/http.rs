use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use souvenir_runtime::{
    format, Failure, FailureKind, Field, ImageUpload, InferencePipeline, InferenceRequest,
    InferenceResponse, Outcome,
};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub struct AppState {
    pub pipeline: InferencePipeline,
    /// Name of the backend serving the model, reported by `/health`.
    pub backend: &'static str,
}

pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

/// 400 for client input problems, 401 for credentials, 413 for oversized
/// bodies, 500 otherwise.
pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::MissingField | FailureKind::BadImage => StatusCode::BAD_REQUEST,
        FailureKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        FailureKind::Unauthorized => StatusCode::UNAUTHORIZED,
        FailureKind::InferenceFailure | FailureKind::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let outcome = match read_form(multipart).await {
        Ok(request) => state.pipeline.run(request).await,
        Err(failure) => Err(failure),
    };
    respond(&outcome)
}

fn respond(outcome: &Outcome) -> Response {
    let status = match outcome {
        Ok(_) => StatusCode::OK,
        Err(failure) => status_for(failure.kind()),
    };
    (status, Json(format(outcome))).into_response()
}

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<InferenceRequest, Failure> {
    let mut multipart =
        multipart.map_err(|rejection| unreadable_form("body", rejection.status(), rejection))?;

    let mut request = InferenceRequest::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| unreadable_form("field", err.status(), err))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("token") => {
                let token = field
                    .text()
                    .await
                    .map_err(|err| unreadable_form("token", err.status(), err))?;
                request.token = Some(token);
            }
            Some("image") => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| unreadable_form("image", err.status(), err))?;
                request.image = Some(ImageUpload { file_name, bytes });
            }
            _ => {}
        }
    }
    Ok(request)
}

// axum reports the body limit as a 413 multipart error.
fn unreadable_form(
    part: &'static str,
    status: StatusCode,
    err: impl std::fmt::Display,
) -> Failure {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(part, error = %err, "predict body over upload limit");
        return Failure::TooLarge;
    }
    warn!(part, error = %err, "unreadable predict form");
    Failure::MissingField(Field::Form)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "success": "true",
        "message": "Service is healthy",
        "data": {
            "backend": state.backend,
            "classes": state.pipeline.labels().len(),
            "workers": state.pipeline.classifier().workers(),
        },
    }))
}

async fn handle_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(InferenceResponse::rejected("Not found")))
}

async fn handle_405() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(InferenceResponse::rejected("Method not allowed")),
    )
}
