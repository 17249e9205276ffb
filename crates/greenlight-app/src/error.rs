use axum::{
    response::{IntoResponse, Response},
    Json,
};
use greenlight_types::ValidationError;
use http::StatusCode;
use tracing::{debug, error};

use crate::{envelope::ErrorEnvelope, json::DecodeError};

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidBody(#[from] DecodeError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("the requested resource could not be found")]
    ResourceNotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(http::Method),

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    #[error("Store error: {0}")]
    StoreError(#[source] greenlight_dal::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

impl From<greenlight_dal::Error> for ApiError {
    fn from(e: greenlight_dal::Error) -> Self {
        match e {
            greenlight_dal::Error::RecordNotFound(what) => {
                debug!("Record not found: {what}");
                ApiError::ResourceNotFound
            }
            greenlight_dal::Error::EditConflict { id, version } => {
                debug!("Edit conflict on movie {id} at version {version}");
                ApiError::EditConflict
            }
            other => ApiError::StoreError(other),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(DecodeError::PayloadTooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidBody(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ResourceNotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::StoreError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::Validation(errors) => ErrorEnvelope::fields(errors.0),
            // cause stays in the log, client gets a generic message
            e if status.is_server_error() => {
                error!("Request failed: {e}");
                ErrorEnvelope::message(SERVER_ERROR_MESSAGE)
            }
            e => ErrorEnvelope::message(e.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use http_body_util::BodyExt as _;
    use serde_json::{json, Value};

    use super::*;

    async fn render(e: ApiError) -> (StatusCode, Value) {
        let response = e.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_store_errors_mapping() {
        let e: ApiError = greenlight_dal::Error::RecordNotFound("Movie 1".into()).into();
        assert_eq!(
            render(e).await,
            (
                StatusCode::NOT_FOUND,
                json!({"error": "the requested resource could not be found"})
            )
        );

        let e: ApiError = greenlight_dal::Error::EditConflict { id: 1, version: 2 }.into();
        let (status, body) = render(e).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            json!({"error": "unable to update the record due to an edit conflict, please try again"})
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_server_errors_are_not_echoed() {
        let e: ApiError = greenlight_dal::Error::Timeout(Duration::from_secs(3)).into();
        let (status, body) = render(e).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": SERVER_ERROR_MESSAGE}));
        assert!(logs_contain("Query did not finish"));
    }

    #[tokio::test]
    async fn test_client_errors() {
        let (status, body) = render(DecodeError::PayloadTooLarge(10).into()).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({"error": "body must not be larger than 10 bytes"}));

        let (status, body) = render(DecodeError::EmptyBody.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "body must not be empty"}));

        let fields = BTreeMap::from([(
            "genres".to_string(),
            "must not contain duplicate values".to_string(),
        )]);
        let (status, body) = render(ValidationError(fields).into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({"error": {"genres": "must not contain duplicate values"}})
        );
    }
}
