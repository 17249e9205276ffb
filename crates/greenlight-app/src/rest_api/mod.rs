pub mod health;
pub mod movie;

use http::Method;

use crate::error::ApiError;

pub async fn not_found() -> ApiError {
    ApiError::ResourceNotFound
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
