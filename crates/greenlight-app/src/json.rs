//! Strict decoding of JSON request bodies.
//!
//! A body is read up to a size limit and must contain exactly one JSON value matching the
//! target type, unknown keys included. Every failure is classified into a [`DecodeError`],
//! which the API turns into a client error response.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Request},
};
use http_body_util::{BodyExt as _, LengthLimitError, Limited};
use serde::de::{Deserialize as _, DeserializeOwned, IgnoredAny};
use serde_json::error::Category;
use tracing::debug;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("body must not be larger than {0} bytes")]
    PayloadTooLarge(usize),
    #[error("body contains badly-formed JSON (at character {0})")]
    SyntaxError(usize),
    #[error("body contains badly-formed JSON")]
    UnexpectedEnd,
    #[error("body must not be empty")]
    EmptyBody,
    #[error("{}", type_mismatch_message(.field, .offset))]
    TypeMismatch { field: Option<String>, offset: usize },
    #[error("body contains unknown key \"{0}\"")]
    UnknownField(String),
    #[error("body must only contain a single JSON value")]
    MultipleValues,
    #[error("body could not be decoded: {0}")]
    Unknown(String),
}

fn type_mismatch_message(field: &Option<String>, offset: &usize) -> String {
    match field {
        Some(field) => format!("body contains incorrect JSON type for field \"{field}\""),
        None => format!("body contains incorrect JSON type (at character {offset})"),
    }
}

/// Reads the whole body, failing as soon as more than `limit` bytes arrive.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, DecodeError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(DecodeError::PayloadTooLarge(limit)),
        Err(e) => Err(DecodeError::Unknown(e.to_string())),
    }
}

/// Decodes exactly one JSON value of type `T` from `input`.
///
/// Syntax of the first value is checked before it is mapped onto `T`, so a malformed or
/// truncated body is reported as such even when it also has wrong types or unknown keys.
pub fn decode_strict<T: DeserializeOwned>(input: &[u8]) -> Result<T, DecodeError> {
    check_syntax(input)?;
    let mut de = serde_json::Deserializer::from_slice(input);
    let value = serde_path_to_error::deserialize(&mut de).map_err(|e| classify(input, e))?;
    // only whitespace may follow the value
    de.end().map_err(|_| DecodeError::MultipleValues)?;
    Ok(value)
}

fn check_syntax(input: &[u8]) -> Result<(), DecodeError> {
    let mut de = serde_json::Deserializer::from_slice(input);
    match IgnoredAny::deserialize(&mut de) {
        Ok(_) => Ok(()),
        Err(err) => match err.classify() {
            Category::Syntax | Category::Eof => Err(classify_syntax(input, &err)),
            // left for the typed pass
            Category::Data | Category::Io => Ok(()),
        },
    }
}

fn classify_syntax(input: &[u8], err: &serde_json::Error) -> DecodeError {
    match err.classify() {
        Category::Eof if input.iter().all(u8::is_ascii_whitespace) => DecodeError::EmptyBody,
        Category::Eof => DecodeError::UnexpectedEnd,
        _ => DecodeError::SyntaxError(byte_offset(input, err.line(), err.column())),
    }
}

fn classify(input: &[u8], err: serde_path_to_error::Error<serde_json::Error>) -> DecodeError {
    let field = if err.path().iter().next().is_some() {
        Some(err.path().to_string())
    } else {
        None
    };
    let err = err.into_inner();
    let offset = byte_offset(input, err.line(), err.column());
    match err.classify() {
        Category::Syntax | Category::Eof => classify_syntax(input, &err),
        Category::Data => classify_data(&err, field, offset),
        Category::Io => DecodeError::Unknown(err.to_string()),
    }
}

fn classify_data(err: &serde_json::Error, field: Option<String>, offset: usize) -> DecodeError {
    let message = err.to_string();
    if let Some(rest) = message.strip_prefix("unknown field `") {
        let name = rest.split('`').next().unwrap_or_default();
        DecodeError::UnknownField(name.to_string())
    } else if ["invalid type", "invalid value", "invalid length"]
        .iter()
        .any(|prefix| message.starts_with(prefix))
    {
        DecodeError::TypeMismatch { field, offset }
    } else {
        DecodeError::Unknown(message)
    }
}

/// serde_json reports 1-based lines and byte columns, this turns them into an offset.
fn byte_offset(input: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = input
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    line_start + column
}

/// [`read_body`] followed by [`decode_strict`].
pub async fn decode_body<T: DeserializeOwned>(body: Body, limit: usize) -> Result<T, DecodeError> {
    let bytes = read_body(body, limit).await?;
    decode_strict(&bytes).inspect_err(|e| debug!("Rejected request body: {e}"))
}

/// Body extractor applying [`decode_body`] with the configured limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictJson<T>(pub T);

impl<T> FromRequest<AppState> for StrictJson<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let limit = state.config().max_body_bytes;
        let value = decode_body(req.into_body(), limit).await?;
        Ok(StrictJson(value))
    }
}
