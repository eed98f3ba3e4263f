// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::{
    error::ApiError,
    models::{CreateUserRequest, CreateUserResponse, DeleteUserRequest, DeleteUserResponse},
    state::AppState,
};

/// Header selecting the operation on the single-function entrypoint.
pub const FUNCTION_NAME_HEADER: &str = "x-function-name";

/// Create a user on Sapphire and register their ENS subdomain on Hoodi.
///
/// ENS failures do not fail the request; they are reported in `ens.error`.
#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Invalid input or user already exists"),
        (status = 500, description = "Chain or configuration failure"),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, ApiError> {
    let user = request.validate().map_err(ApiError::bad_request)?;
    let response = state.accounts.create_user(user).await?;
    Ok(Json(response))
}

/// Delete a user from Sapphire. The contract verifies the password.
#[utoipa::path(
    delete,
    path = "/v1/users",
    tag = "Users",
    request_body = DeleteUserRequest,
    responses(
        (status = 200, description = "User deleted", body = DeleteUserResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "User does not exist"),
        (status = 500, description = "Chain or configuration failure"),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Json(request): Json<DeleteUserRequest>,
) -> Result<Json<DeleteUserResponse>, ApiError> {
    let deletion = request.validate().map_err(ApiError::bad_request)?;
    let response = state.accounts.delete_user(deletion).await?;
    Ok(Json(response))
}

/// Single-function entrypoint routed by the `X-Function-Name` header.
///
/// `deleteUser` deletes; anything else, including no header, creates.
#[utoipa::path(
    post,
    path = "/",
    tag = "Users",
    request_body(
        content = CreateUserRequest,
        description = "A `CreateUserRequest`, or a `DeleteUserRequest` when the header selects `deleteUser`"
    ),
    params(
        ("X-Function-Name" = Option<String>, Header, description = "`createUser` (default) or `deleteUser`")
    ),
    responses(
        (status = 200, description = "Operation succeeded"),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "User does not exist"),
        (status = 500, description = "Chain or configuration failure"),
    )
)]
pub async fn dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let function = headers
        .get(FUNCTION_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("createUser");

    if function == "deleteUser" {
        let request: DeleteUserRequest = parse_body(&body)?;
        Ok(delete_user(State(state), Json(request)).await?.into_response())
    } else {
        let request: CreateUserRequest = parse_body(&body)?;
        Ok(create_user(State(state), Json(request)).await?.into_response())
    }
}

/// Lenient body parsing: an empty body is an empty request.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}
