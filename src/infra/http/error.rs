use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{AccessError, ErrorKind, ErrorReport};
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const VERSION_CONFLICT: &str = "version_conflict";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const DB_UNAVAILABLE: &str = "db_unavailable";
    pub const CACHE_UNAVAILABLE: &str = "cache_unavailable";
    pub const REPO: &str = "repo_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            report: None,
        }
    }

    /// Log `report` instead of the public message when this error is rendered.
    pub fn with_report(mut self, report: ErrorReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: codes::RATE_LIMITED.to_string(),
                message: "Rate limit exceeded".to_string(),
                hint: Some(format!("Retry after {retry_after} seconds")),
            },
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        )
        .attach(&mut response);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| {
            ErrorReport::from_message(
                "infra::http",
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(self.message)
                ),
            )
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

/// Render a resource access failure. The status follows the error's
/// [`ErrorKind`]; server-side failures carry the full error chain for the
/// response logger but expose no detail to the client.
pub fn access_to_api(source: &'static str, err: AccessError) -> ApiError {
    let status = kind_status(err.kind());
    let (code, message, hint) = match &err {
        AccessError::NotFound => (codes::NOT_FOUND, "Resource not found", None),
        AccessError::Conflict {
            current_version: Some(version),
        } => (
            codes::VERSION_CONFLICT,
            "Resource was modified concurrently",
            Some(format!("current version is {version}; reload and retry")),
        ),
        AccessError::Conflict {
            current_version: None,
        } => (
            codes::CONFLICT,
            "Request conflicts with current state",
            None,
        ),
        AccessError::Domain(DomainError::Validation { message }) => {
            (codes::INVALID_INPUT, "Invalid input", Some(message.clone()))
        }
        AccessError::Cache(_) => (
            codes::CACHE_UNAVAILABLE,
            "Service temporarily unavailable",
            None,
        ),
        AccessError::Repo(repo) => repo_details(repo),
    };

    let report = ErrorReport::from_error(source, status, &err);
    ApiError::new(status, code, message, hint).with_report(report)
}

fn kind_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Invalid => StatusCode::BAD_REQUEST,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn repo_details(err: &RepoError) -> (&'static str, &'static str, Option<String>) {
    match err {
        RepoError::NotFound => (codes::NOT_FOUND, "Resource not found", None),
        RepoError::Duplicate { constraint } => {
            (codes::DUPLICATE, "Duplicate record", Some(constraint.clone()))
        }
        RepoError::InvalidInput { message } => {
            (codes::INVALID_INPUT, "Invalid input", Some(message.clone()))
        }
        RepoError::Integrity { message } => (
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message.clone()),
        ),
        RepoError::Timeout => (codes::DB_TIMEOUT, "Database timeout", None),
        RepoError::Unavailable(_) => (
            codes::DB_UNAVAILABLE,
            "Service temporarily unavailable",
            None,
        ),
        RepoError::Persistence(_) => (codes::REPO, "Internal server error", None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;

    #[test]
    fn versioned_conflict_renders_409_with_hint() {
        let api = access_to_api(
            "test",
            AccessError::Conflict {
                current_version: Some(4),
            },
        );
        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.code(), codes::VERSION_CONFLICT);
    }

    #[test]
    fn cache_failure_is_service_unavailable() {
        let api = access_to_api("test", AccessError::Cache(CacheError::Timeout));
        assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn store_timeout_is_not_a_404() {
        let api = access_to_api("test", AccessError::Repo(RepoError::Timeout));
        assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.code(), codes::DB_TIMEOUT);
    }

    #[test]
    fn duplicate_record_is_a_conflict() {
        let api = access_to_api(
            "test",
            AccessError::Repo(RepoError::Duplicate {
                constraint: "followers_pkey".to_string(),
            }),
        );
        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.code(), codes::DUPLICATE);
    }

    #[test]
    fn validation_failure_is_bad_request() {
        let api = access_to_api("test", DomainError::validation("title is required").into());
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.code(), codes::INVALID_INPUT);

        let api = access_to_api("test", AccessError::NotFound);
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rate_limited_sets_retry_after_header() {
        let response = ApiError::rate_limited(3);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("3")
        );
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }
}
