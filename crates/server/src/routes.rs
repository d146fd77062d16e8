//! HTTP routes.
//!
//! | Route                 | Purpose                                  |
//! |-----------------------|------------------------------------------|
//! | `GET /`               | blank form with default values           |
//! | `POST /recommend`     | form submit, page with result or error   |
//! | `GET /reset`          | back to the blank form                   |
//! | `POST /api/recommend` | same pipeline over JSON                  |
//! | `GET /images/:file`   | crop image from the image directory      |
//! | `GET /health`         | liveness and label count                 |

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Form, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use artifact_loader::ClassifierKind;
use pipeline::validation::check_value;
use pipeline::{
    FieldViolation, ImageCatalog, RecommendError, SoilWeatherSample, ValidationError,
    ViolationKind, IMAGE_EXTENSION,
};

use crate::orchestrator::{CropRecommendation, RecommendationOrchestrator};
use crate::render::{self, Outcome};

pub type AppState = Arc<RecommendationOrchestrator>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/recommend", post(submit))
        .route("/reset", get(reset))
        .route("/api/recommend", post(api_recommend))
        .route("/images/:file", get(image))
        .route("/health", get(health))
        .with_state(state)
}

fn status_for(err: &RecommendError) -> StatusCode {
    if err.is_validation() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub async fn index() -> Html<String> {
    Html(render::page(&render::default_values(), None))
}

/// Submitted values are echoed back into the form either way
pub async fn submit(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    match state.recommend_form(&form) {
        Ok(rec) => (
            StatusCode::OK,
            Html(render::page(&form, Some(Outcome::Recommended(&rec)))),
        ),
        Err(err) => (
            status_for(&err),
            Html(render::page(&form, Some(Outcome::Failed(&err)))),
        ),
    }
}

pub async fn reset() -> Redirect {
    Redirect::to("/")
}

/// Error body of the JSON API
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
}

/// Everything the JSON API can answer with instead of a recommendation
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Recommend(#[from] RecommendError),

    /// Request body could not be read as JSON at all
    #[error("{message}")]
    Body { status: StatusCode, message: String },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Recommend(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Recommend(err) => status_for(err),
            ApiError::Body { status, .. } => *status,
        }
    }

    /// Status code and JSON body sent to the client
    pub fn into_parts(self) -> (StatusCode, ErrorBody) {
        let status = self.status();
        let body = match self {
            ApiError::Recommend(err) => ErrorBody {
                error: err.user_message(),
                violations: match err {
                    RecommendError::Validation(v) => v.violations,
                    _ => Vec::new(),
                },
            },
            ApiError::Body { message, .. } => ErrorBody {
                error: message,
                violations: Vec::new(),
            },
        };
        (status, body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_parts();
        (status, Json(body)).into_response()
    }
}

/// Read a sample from a JSON object
///
/// An absent or `null` field is `Missing`; a field that is not a JSON
/// number is `NotANumber` with the offending JSON text. Every field is
/// checked, so one response lists every problem.
pub fn sample_from_json(body: &Value) -> Result<SoilWeatherSample, ValidationError> {
    SoilWeatherSample::from_fields(|field| match body.get(field.key()) {
        None | Some(Value::Null) => Err(FieldViolation {
            field,
            kind: ViolationKind::Missing,
        }),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(value) => check_value(field, value),
            None => Err(FieldViolation {
                field,
                kind: ViolationKind::NotFinite,
            }),
        },
        Some(other) => Err(FieldViolation {
            field,
            kind: ViolationKind::NotANumber {
                raw: other.to_string(),
            },
        }),
    })
}

/// The body is taken as untyped JSON so that a wrongly typed field is
/// reported like any other field violation
pub async fn api_recommend(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CropRecommendation>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        info!("Rejected JSON body: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;
    let sample = sample_from_json(&body)?;
    Ok(Json(state.recommend(sample)?))
}

/// Only plain lowercase `<name>.jpg` file names are served
fn is_servable(file: &str) -> bool {
    file.strip_suffix(&format!(".{}", IMAGE_EXTENSION))
        .and_then(ImageCatalog::file_name)
        .is_some_and(|expected| expected == file)
}

pub async fn image(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    if !is_servable(&file) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.images().dir().join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response(),
        Err(e) if e.kind() == ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!("Couldn't read image {}: {}", path.display(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub classifier: ClassifierKind,
    pub crops: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        classifier: state.classifier_kind(),
        crops: state.labels().len(),
    })
}
