// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        CreateUserRequest, CreateUserResponse, DeleteUserRequest, DeleteUserResponse, EnsResult,
        OasisResult,
    },
    state::AppState,
};

pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new().route(
        "/users",
        post(users::create_user).delete(users::delete_user),
    );

    Router::new()
        .route("/", post(users::dispatch))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::dispatch,
        users::create_user,
        users::delete_user,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            CreateUserRequest,
            CreateUserResponse,
            DeleteUserRequest,
            DeleteUserResponse,
            OasisResult,
            EnsResult,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Users", description = "Confidential user onboarding"),
        (name = "Health", description = "Liveness and health probes")
    )
)]
struct ApiDoc;
