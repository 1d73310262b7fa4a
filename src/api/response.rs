//! JSend envelopes and the error type every handler returns.
//!
//! Client errors render as `{"status": "fail", "data": {"message": ..}}`,
//! server errors as `{"status": "error", "message": ..}`.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::catalog::DatabaseError;
use crate::upload::CoordinatorError;
use crate::validation::ValidationError;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JSend<T> {
    Success { data: T },
    Fail { data: FailData },
    Error { message: String },
}

#[derive(Debug, Serialize)]
pub struct FailData {
    pub message: String,
}

/// One page of a listing plus where it sits in the whole.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

impl<T: Serialize> JSend<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(JSend::Success { data })
    }
}

impl<T: Serialize> JSend<Page<T>> {
    pub fn page(items: Vec<T>, pagination: Pagination) -> Json<Self> {
        Json(JSend::Success {
            data: Page { items, pagination },
        })
    }
}

// ============================================================================
// ApiError
// ============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let Self { status, message } = self;
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
            (status, Json(JSend::<()>::Error { message })).into_response()
        } else {
            let body = JSend::<()>::Fail {
                data: FailData { message },
            };
            (status, Json(body)).into_response()
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        ApiError::internal(format!("Catalog store failure: {e}"))
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        let status = match e {
            CoordinatorError::NoFiles => StatusCode::BAD_REQUEST,
            CoordinatorError::AlreadyUploading => StatusCode::CONFLICT,
        };
        ApiError::new(status, e.to_string())
    }
}

/// Every failing form field, reported together.
impl From<Vec<ValidationError>> for ApiError {
    fn from(errors: Vec<ValidationError>) -> Self {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, messages.join("; "))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::new(e.status(), format!("Invalid multipart data: {}", e.body_text()))
    }
}

// ============================================================================
// Extractors that reject with JSend bodies
// ============================================================================

pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| match rejection {
                JsonRejection::JsonDataError(err) => {
                    ApiError::bad_request(format!("Invalid request body: {}", err.body_text()))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::bad_request("Missing Content-Type: application/json header")
                }
                other => ApiError::new(other.status(), other.body_text()),
            })?;
        Ok(AppJson(value))
    }
}

pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
        serde_qs::from_str(parts.uri.query().unwrap_or_default())
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(format!("Invalid query parameter: {e}")))
    }
}
