use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pagination::PageRequestError;
use crate::store::{Entity, StoreError};
use crate::validation::FieldErrors;

pub type ApiResult<T> = Result<T, ApiError>;

const INTERNAL_DETAIL: &str = "An error occurred while processing your request.";
const DATABASE_DETAIL: &str = "A database error occurred. The operation could not be completed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Validation,
    BadRequest,
    NotFound,
    Conflict,
    InvalidOperation,
    Duplicate,
    Database,
    Internal,
}

impl ErrorCode {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCode::Validation | ErrorCode::BadRequest | ErrorCode::InvalidOperation => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict | ErrorCode::Duplicate | ErrorCode::Database => StatusCode::CONFLICT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ErrorCode::Validation => "Validation Error",
            ErrorCode::BadRequest => "Bad Request",
            ErrorCode::NotFound => "Not Found",
            ErrorCode::Conflict => "Concurrency Conflict",
            ErrorCode::InvalidOperation => "Invalid Operation",
            ErrorCode::Duplicate => "Duplicate Record",
            ErrorCode::Database => "Database Error",
            ErrorCode::Internal => "Internal Server Error",
        }
    }

    fn type_uri(self) -> &'static str {
        match self {
            ErrorCode::Validation | ErrorCode::BadRequest | ErrorCode::InvalidOperation => {
                "https://tools.ietf.org/html/rfc9110#section-15.5.1"
            }
            ErrorCode::NotFound => "https://tools.ietf.org/html/rfc9110#section-15.5.5",
            ErrorCode::Conflict | ErrorCode::Duplicate | ErrorCode::Database => {
                "https://tools.ietf.org/html/rfc9110#section-15.5.10"
            }
            ErrorCode::Internal => "https://tools.ietf.org/html/rfc9110#section-15.6.1",
        }
    }

    /// Replacement detail used outside development mode.
    fn masked_detail(self) -> Option<&'static str> {
        match self {
            ErrorCode::Internal => Some(INTERNAL_DETAIL),
            ErrorCode::Database => Some(DATABASE_DETAIL),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub errors: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            errors: None,
        }
    }

    pub fn validation(errors: FieldErrors) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: errors.summary(),
            errors: Some(errors),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn not_found(entity: Entity, id: i64) -> Self {
        StoreError::NotFound { entity, id }.into()
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    fn problem(&self) -> ProblemDetails {
        ProblemDetails {
            kind: self.code.type_uri().to_string(),
            title: self.code.title().to_string(),
            status: self.code.status_code().as_u16(),
            detail: self.message.clone(),
            instance: None,
            errors: self.errors.clone().map(FieldErrors::into_map),
            masked_detail: self.code.masked_detail(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.title(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound { .. } | StoreError::Deleted { .. } => {
                ApiError::new(ErrorCode::NotFound, message)
            }
            StoreError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, message),
            StoreError::HasDependents { .. } => ApiError::new(ErrorCode::InvalidOperation, message),
            StoreError::Duplicate(_) => ApiError::new(ErrorCode::Duplicate, message),
            StoreError::Validation(errors) => ApiError::validation(errors),
            StoreError::Sqlite(e) => match e.sqlite_error_code() {
                Some(rusqlite::ErrorCode::ConstraintViolation) => {
                    ApiError::new(ErrorCode::Database, e.to_string())
                }
                _ => ApiError::internal(e.to_string()),
            },
        }
    }
}

impl From<PageRequestError> for ApiError {
    fn from(err: PageRequestError) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(err.field(), err.to_string());
        ApiError::validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// RFC 7807 body. A copy rides in the response extensions so the
/// problem-details middleware can fill in `instance` and mask server faults.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip)]
    masked_detail: Option<&'static str>,
}

impl ProblemDetails {
    pub fn at(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn masked(mut self) -> Self {
        if let Some(detail) = self.masked_detail {
            self.detail = detail.to_string();
        }
        self
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.clone())).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response.extensions_mut().insert(self);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, error = %self.message, "request failed");
        } else {
            tracing::warn!(code = ?self.code, error = %self.message, "request rejected");
        }
        self.problem().into_response()
    }
}
