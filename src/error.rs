use std::{future::Future, time::Duration};

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

/// Failure type shared by every handler and service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input: date order, email/phone pattern, missing field.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("An account with this email already exists")]
    DuplicateAccount,

    /// Same message for unknown email and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("{0}")]
    Unauthorized(String),

    /// Store or notifier unreachable or too slow.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[source] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateAccount => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateAccount => "DUPLICATE_ACCOUNT",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidOrExpiredToken => "INVALID_TOKEN",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show a client. Upstream and internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::UpstreamUnavailable(_) => {
                "Service temporarily unavailable, please try again".into()
            }
            AppError::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::UpstreamUnavailable(e) => error!(error = ?e, "upstream call failed"),
            AppError::Internal(e) => error!(error = ?e, "internal error"),
            _ => {}
        }

        let body = serde_json::json!({
            "success": false,
            "error": self.public_message(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), "rejected json body");
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(status = %rejection.status(), "rejected query string");
        AppError::Validation(rejection.body_text())
    }
}

/// A path segment that cannot be parsed names no resource.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        warn!(reason = %rejection.body_text(), "rejected path");
        AppError::NotFound("Resource not found".into())
    }
}

/// Failure reported by a document store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint violated.
    #[error("duplicate key")]
    Duplicate,

    /// The write would leave `end_date` before `start_date`.
    #[error("end date before start date")]
    InvalidDateRange,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Duplicate;
            }
            if db.is_check_violation() {
                return StoreError::InvalidDateRange;
            }
        }
        StoreError::Backend(e.into())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AppError::DuplicateAccount,
            StoreError::InvalidDateRange => {
                AppError::validation("End date must not be before start date")
            }
            StoreError::Backend(e) => AppError::UpstreamUnavailable(e),
        }
    }
}

/// Runs one store round trip under the per-request deadline.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(AppError::from),
        Err(_) => Err(AppError::UpstreamUnavailable(anyhow::anyhow!(
            "store call exceeded {:?}",
            limit
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn upstream_error_hides_details() {
        let resp = AppError::UpstreamUnavailable(anyhow::anyhow!("connection refused to 10.0.0.3"))
            .into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UPSTREAM_UNAVAILABLE");
        assert!(!body["error"].as_str().unwrap().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn duplicate_account_is_bad_request() {
        let resp = AppError::DuplicateAccount.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["code"], "DUPLICATE_ACCOUNT");
    }

    #[tokio::test]
    async fn deadline_maps_to_upstream_unavailable() {
        let res: AppResult<()> = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn store_date_range_maps_to_validation() {
        let res: AppResult<()> =
            with_deadline(Duration::from_secs(1), async { Err(StoreError::InvalidDateRange) })
                .await;
        assert!(matches!(res, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn store_duplicate_maps_to_duplicate_account() {
        let res: AppResult<()> =
            with_deadline(Duration::from_secs(1), async { Err(StoreError::Duplicate) }).await;
        assert!(matches!(res, Err(AppError::DuplicateAccount)));
    }
}
