// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::onboarding::OnboardingError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<OnboardingError> for ApiError {
    fn from(err: OnboardingError) -> Self {
        match &err {
            OnboardingError::UserExists(_) => Self::bad_request(err.to_string()),
            OnboardingError::UserNotFound(_) => Self::not_found(err.to_string()),
            OnboardingError::MissingPrivateKey => {
                Self::internal("Server configuration error: Private key not set")
            }
            OnboardingError::Execution(e) => Self::internal(friendly_chain_message(e.cause().message())),
            OnboardingError::Client(_) | OnboardingError::MissingWalletAddress(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

/// Map well-known contract and node messages to operator-facing text.
fn friendly_chain_message(message: &str) -> String {
    if message.contains("User already exists") {
        "User already exists".to_string()
    } else if message.contains("User does not exist") {
        "User not found".to_string()
    } else if message.to_lowercase().contains("insufficient funds") {
        "Insufficient funds in deployer wallet".to_string()
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{ExecutionError, TxError};
    use axum::body::to_bytes;

    fn execution(message: &str) -> OnboardingError {
        OnboardingError::Execution(ExecutionError {
            label: "storeSecret".into(),
            attempts: 1,
            source: TxError::classify(message),
        })
    }

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let internal = ApiError::internal("oops");
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message, "oops");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"success":false,"error":"bad data"}"#);
    }

    #[test]
    fn onboarding_errors_map_to_statuses() {
        let exists: ApiError = OnboardingError::UserExists("alice".into()).into();
        assert_eq!(exists.status, StatusCode::BAD_REQUEST);
        assert_eq!(exists.message, "User 'alice' already exists on Oasis");

        let missing: ApiError = OnboardingError::UserNotFound("bob".into()).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let key: ApiError = OnboardingError::MissingPrivateKey.into();
        assert_eq!(key.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(key.message, "Server configuration error: Private key not set");
    }

    #[test]
    fn chain_failures_get_friendly_messages() {
        let funds: ApiError = execution("insufficient funds for gas * price + value").into();
        assert_eq!(funds.message, "Insufficient funds in deployer wallet");

        let dup: ApiError = execution("execution reverted: User already exists").into();
        assert_eq!(dup.message, "User already exists");

        let gone: ApiError = execution("execution reverted: User does not exist").into();
        assert_eq!(gone.message, "User not found");

        let other: ApiError = execution("something odd").into();
        assert_eq!(other.message, "something odd");
        assert_eq!(other.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
