use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use greenlight_dal::movie::MovieRepository;
use tracing::debug;

use crate::{error::ApiError, state::AppState};
#[allow(unused_imports)]
use axum::routing::{delete, get, patch, post};

crate::repository_from_request!(MovieRepository);

/// Optional header carrying the version the client last saw.
pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

/// Id from the `{id}` path segment, anything that is not a positive integer is not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieId(pub i64);

impl<S> FromRequestParts<S> for MovieId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                debug!("Missing id in path: {e}");
                ApiError::ResourceNotFound
            })?;
        parse_id(&raw).map(MovieId).ok_or_else(|| {
            debug!("Invalid movie id {raw:?}");
            ApiError::ResourceNotFound
        })
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id >= 1)
}

mod crud_api {
    use super::*;
    use crate::{
        envelope::envelope,
        error::ApiResult,
        json::{decode_body, StrictJson},
    };
    use axum::{body::Body, extract::State, response::IntoResponse};
    use greenlight_dal::movie::{MovieInput, MoviePatch};
    use greenlight_types::Validator;
    use http::{header, HeaderMap, StatusCode};

    pub async fn create(
        repository: MovieRepository,
        StrictJson(payload): StrictJson<MovieInput>,
    ) -> ApiResult<impl IntoResponse> {
        payload.check()?;
        let movie = repository.insert(payload).await?;
        debug!("Created movie {}", movie.id);
        let location = format!("/v1/movies/{}", movie.id);

        Ok((
            StatusCode::CREATED,
            [(header::LOCATION, location)],
            envelope("movie", movie),
        ))
    }

    pub async fn list(repository: MovieRepository) -> ApiResult<impl IntoResponse> {
        let movies = repository.list().await?;
        Ok((StatusCode::OK, envelope("movies", movies)))
    }

    pub async fn get(
        MovieId(id): MovieId,
        repository: MovieRepository,
    ) -> ApiResult<impl IntoResponse> {
        let movie = repository.get(id).await?;

        Ok((StatusCode::OK, envelope("movie", movie)))
    }

    /// Partial update: fetch, merge the patch, validate the result, write with the fetched version.
    pub async fn update(
        MovieId(id): MovieId,
        repository: MovieRepository,
        State(state): State<AppState>,
        headers: HeaderMap,
        body: Body,
    ) -> ApiResult<impl IntoResponse> {
        let movie = repository.get(id).await?;

        if let Some(expected) = expected_version(&headers)? {
            if expected != movie.version {
                debug!(
                    "Movie {id} is at version {}, client expected {expected}",
                    movie.version
                );
                return Err(ApiError::EditConflict);
            }
        }

        let patch: MoviePatch = decode_body(body, state.config().max_body_bytes).await?;
        let mut v = Validator::new();
        patch.reject_nulls(&mut v);
        let mut movie = movie.merge(patch);
        movie.fields.validate_into(&mut v);
        v.finish()?;

        movie.version = repository.update(&movie).await?;

        Ok((StatusCode::OK, envelope("movie", movie)))
    }

    pub async fn delete(
        MovieId(id): MovieId,
        repository: MovieRepository,
    ) -> ApiResult<impl IntoResponse> {
        repository.delete(id).await?;

        Ok((
            StatusCode::OK,
            envelope("message", "movie successfully deleted"),
        ))
    }

    fn expected_version(headers: &HeaderMap) -> ApiResult<Option<i64>> {
        headers
            .get(EXPECTED_VERSION_HEADER)
            .map(|value| {
                value
                    .to_str()
                    .ok()
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .ok_or_else(|| {
                        ApiError::InvalidRequest(format!(
                            "{EXPECTED_VERSION_HEADER} header must be an integer"
                        ))
                    })
            })
            .transpose()
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(crud_api::create).get(crud_api::list))
        .route(
            "/{id}",
            get(crud_api::get)
                .patch(crud_api::update)
                .delete(crud_api::delete),
        )
        .method_not_allowed_fallback(crate::rest_api::method_not_allowed)
}
