use std::any::Any;

use crate::config::ServerConfig;
use crate::error::Result;
use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::FutureExt;
use greenlight_app::{
    error::ApiError,
    rest_api::{self, health::healthcheck},
    state::{AppConfig, AppState},
};
use greenlight_types::config::DatabaseConfig;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if args.cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        "Starting {} server on {}",
        args.env,
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn main_router(state: AppState) -> Router<()> {
    Router::new()
        .route("/v1/healthcheck", get(healthcheck))
        .nest("/v1/movies", rest_api::movie::router())
        .fallback(rest_api::not_found)
        .method_not_allowed_fallback(rest_api::method_not_allowed)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::InternalError(format!("handler panicked: {detail}")).into_response()
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let pool = open_database(&config.database).await?;
    Ok(AppState::new(AppConfig::from(config), pool))
}

async fn open_database(config: &DatabaseConfig) -> Result<greenlight_dal::Pool> {
    let pool = greenlight_dal::new_pool(config).await.inspect_err(|e| {
        error!("Cannot open database {}: {e}", config.database_url);
    })?;
    greenlight_dal::migrate(&pool).await?;
    info!("Database {} ready", config.database_url);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt as _;
    use serde_json::{json, Value};
    use tower::ServiceExt as _;

    use super::*;
    use crate::config::Parser as _;

    async fn test_app(args: &[&str]) -> Router {
        let mut full_args = vec![
            "greenlight-server",
            "--database-url",
            "sqlite::memory:",
            "--db-max-open-conns",
            "1",
            "--db-min-conns",
            "1",
        ];
        full_args.extend_from_slice(args);
        let config = ServerConfig::try_parse_from(full_args).unwrap();
        main_router(build_state(&config).await.unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_healthcheck() {
        let app = test_app(&["--env", "staging"]).await;
        let (status, body) = get_json(app, "/v1/healthcheck").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "available",
                "system_info": {"environment": "staging", "version": env!("CARGO_PKG_VERSION")}
            })
        );
    }

    #[tokio::test]
    async fn test_fallbacks() {
        let app = test_app(&[]).await;
        let (status, body) = get_json(app.clone(), "/v1/nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"error": "the requested resource could not be found"})
        );

        let response = app
            .oneshot(
                Request::post("/v1/healthcheck")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_movies_are_nested() {
        let app = test_app(&[]).await;
        let (status, body) = get_json(app, "/v1/movies").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"movies": []}));
    }

    #[test]
    fn test_panic_response() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
