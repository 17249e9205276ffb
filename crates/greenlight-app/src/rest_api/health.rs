use axum::{extract::State, response::IntoResponse, Json};
use greenlight_types::config::Environment;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub environment: Environment,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub system_info: SystemInfo,
}

pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config();
    Json(Health {
        status: "available",
        system_info: SystemInfo {
            environment: config.environment,
            version: config.version,
        },
    })
}
