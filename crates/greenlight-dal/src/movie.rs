use std::future::Future;
use std::time::Duration;

use futures::TryStreamExt as _;
use garde::Validate;
use greenlight_types::{ValidationError, Validator, validator::unique};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row as _, types::Json};
use time::PrimitiveDateTime;
use tracing::debug;

use crate::{
    ChosenRow, DEFAULT_QUERY_TIMEOUT, Error,
    error::Result,
    patch::Patch,
};

/// Earliest year a movie could have been made in.
pub const MIN_YEAR: i32 = 1888;

/// Editable part of a movie, also the create payload.
///
/// Missing keys decode to empty values, so that they are reported by validation
/// (`must be provided`) together with all other field problems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct MovieInput {
    #[garde(length(max = 500))]
    pub title: String,
    #[garde(range(min = 1888))]
    pub year: i32,
    #[garde(range(min = 1))]
    pub runtime: i32,
    #[garde(length(max = 5))]
    pub genres: Vec<String>,
}

impl MovieInput {
    /// Records all problems of these fields into `v`.
    pub fn validate_into(&self, v: &mut Validator) {
        v.check(!self.title.is_empty(), "title", "must be provided");
        v.check(self.year != 0, "year", "must be provided");
        v.check(self.runtime != 0, "runtime", "must be provided");
        v.check(!self.genres.is_empty(), "genres", "must be provided");

        if let Err(report) = self.validate() {
            v.append_report(report);
        }

        v.check(
            self.year <= current_year(),
            "year",
            "must not be in the future",
        );
        v.check(
            unique(&self.genres),
            "genres",
            "must not contain duplicate values",
        );
    }

    pub fn check(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        self.validate_into(&mut v);
        v.finish()
    }
}

fn current_year() -> i32 {
    time::OffsetDateTime::now_utc().year()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub id: i64,
    #[serde(skip)]
    pub created_at: PrimitiveDateTime,
    #[serde(flatten)]
    pub fields: MovieInput,
    pub version: i64,
}

impl Movie {
    /// Candidate record with every field present in `patch` replaced.
    ///
    /// The result is not validated, run [`MovieInput::check`] on its fields before storing it.
    pub fn merge(mut self, patch: MoviePatch) -> Movie {
        let MoviePatch {
            title,
            year,
            runtime,
            genres,
        } = patch;
        title.apply_to(&mut self.fields.title);
        year.apply_to(&mut self.fields.year);
        runtime.apply_to(&mut self.fields.runtime);
        genres.apply_to(&mut self.fields.genres);
        self
    }
}

impl sqlx::FromRow<'_, ChosenRow> for Movie {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let Json(genres) = row.try_get::<Json<Vec<String>>, _>("genres")?;
        Ok(Movie {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            fields: MovieInput {
                title: row.try_get("title")?,
                year: row.try_get("year")?,
                runtime: row.try_get("runtime")?,
                genres,
            },
            version: row.try_get("version")?,
        })
    }
}

/// Partial update payload, see [`Patch`] for the meaning of each field state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoviePatch {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub year: Patch<i32>,
    #[serde(default)]
    pub runtime: Patch<i32>,
    #[serde(default)]
    pub genres: Patch<Vec<String>>,
}

impl MoviePatch {
    /// All movie fields are mandatory, so explicit nulls cannot be merged.
    pub fn reject_nulls(&self, v: &mut Validator) {
        v.check(!self.title.is_null(), "title", "must not be null");
        v.check(!self.year.is_null(), "year", "must not be null");
        v.check(!self.runtime.is_null(), "runtime", "must not be null");
        v.check(!self.genres.is_null(), "genres", "must not be null");
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_absent()
            && self.year.is_absent()
            && self.runtime.is_absent()
            && self.genres.is_absent()
    }
}

pub type MovieRepository = MovieRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
    timeout: Duration,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self::with_timeout(executor, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn with_timeout(executor: E, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    /// Runs a store call, dropping (and thus cancelling) it when it exceeds the timeout.
    async fn bounded<T, F>(&self, query: F) -> Result<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(res) => Ok(res?),
            Err(_) => {
                debug!("Movie query exceeded {:?}", self.timeout);
                Err(Error::Timeout(self.timeout))
            }
        }
    }

    pub async fn insert(&self, payload: MovieInput) -> Result<Movie> {
        let (id, created_at, version) = self
            .bounded(
                sqlx::query_as::<_, (i64, PrimitiveDateTime, i64)>(
                    "INSERT INTO movies (title, year, runtime, genres) VALUES (?, ?, ?, ?)
                    RETURNING id, created_at, version",
                )
                .bind(&payload.title)
                .bind(payload.year)
                .bind(payload.runtime)
                .bind(Json(&payload.genres))
                .fetch_one(&self.executor),
            )
            .await?;

        Ok(Movie {
            id,
            created_at,
            fields: payload,
            version,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Movie> {
        if id < 1 {
            return Err(Error::RecordNotFound(format!("Movie {id}")));
        }
        self.bounded(
            sqlx::query_as::<_, Movie>(
                "SELECT id, created_at, title, year, runtime, genres, version
                FROM movies WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.executor),
        )
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Movie {id}")))
    }

    /// Writes the movie if its `version` is still the stored one and returns the new version.
    pub async fn update(&self, movie: &Movie) -> Result<i64> {
        let new_version = self
            .bounded(
                sqlx::query_scalar::<_, i64>(
                    "UPDATE movies SET title = ?, year = ?, runtime = ?, genres = ?, version = version + 1
                    WHERE id = ? AND version = ?
                    RETURNING version",
                )
                .bind(&movie.fields.title)
                .bind(movie.fields.year)
                .bind(movie.fields.runtime)
                .bind(Json(&movie.fields.genres))
                .bind(movie.id)
                .bind(movie.version)
                .fetch_optional(&self.executor),
            )
            .await?;

        new_version.ok_or_else(|| {
            debug!(
                "Movie {} was not updated, version {} is stale",
                movie.id, movie.version
            );
            Error::EditConflict {
                id: movie.id,
                version: movie.version,
            }
        })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Err(Error::RecordNotFound(format!("Movie {id}")));
        }
        let res = self
            .bounded(
                sqlx::query("DELETE FROM movies WHERE id = ?")
                    .bind(id)
                    .execute(&self.executor),
            )
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound(format!("Movie {id}")))
        } else {
            Ok(())
        }
    }

    pub async fn list(&self) -> Result<Vec<Movie>> {
        self.bounded(
            sqlx::query_as::<_, Movie>(
                "SELECT id, created_at, title, year, runtime, genres, version
                FROM movies ORDER BY id",
            )
            .fetch(&self.executor)
            .try_collect::<Vec<_>>(),
        )
        .await
    }

    pub async fn count(&self) -> Result<u64> {
        let count = self
            .bounded(
                sqlx::query_scalar::<_, i64>("SELECT count(*) FROM movies")
                    .fetch_one(&self.executor),
            )
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    fn now() -> PrimitiveDateTime {
        let now = time::OffsetDateTime::now_utc();
        PrimitiveDateTime::new(now.date(), now.time())
    }

    fn up() -> MovieInput {
        MovieInput {
            title: "Up".into(),
            year: 2009,
            runtime: 96,
            genres: vec!["animation".into(), "adventure".into()],
        }
    }

    fn stored(fields: MovieInput) -> Movie {
        Movie {
            id: 1,
            created_at: now(),
            fields,
            version: 3,
        }
    }

    #[test]
    fn test_valid_movie() {
        assert!(up().check().is_ok());
    }

    #[test]
    fn test_missing_fields() {
        let err = MovieInput::default().check().unwrap_err();
        for field in ["title", "year", "runtime", "genres"] {
            assert_eq!(err.message(field), Some("must be provided"), "{field}");
        }
    }

    #[test]
    fn test_field_bounds() {
        let movie = MovieInput {
            title: "x".repeat(501),
            year: 1887,
            runtime: -5,
            genres: vec!["a", "b", "c", "d", "e", "f"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        let err = movie.check().unwrap_err();
        assert_eq!(err.fields().len(), 4);

        let movie = MovieInput {
            title: "x".repeat(500),
            year: MIN_YEAR,
            ..up()
        };
        assert!(movie.check().is_ok());
    }

    #[test]
    fn test_future_year() {
        let movie = MovieInput {
            year: current_year() + 1,
            ..up()
        };
        let err = movie.check().unwrap_err();
        assert_eq!(err.message("year"), Some("must not be in the future"));
    }

    #[test]
    fn test_duplicate_genres() {
        let movie = MovieInput {
            title: "X".into(),
            year: 2020,
            runtime: 100,
            genres: vec!["a".into(), "a".into()],
        };
        let err = movie.check().unwrap_err();
        assert_eq!(
            err.message("genres"),
            Some("must not contain duplicate values")
        );
        assert_eq!(err.fields().len(), 1);
    }

    #[test]
    fn test_merge_present_fields() {
        let patch = MoviePatch {
            title: Patch::from("Up (Director's cut)".to_string()),
            genres: Patch::from(vec!["animation".to_string()]),
            ..Default::default()
        };
        let original = stored(up());
        let merged = original.clone().merge(patch);
        assert_eq!(merged.fields.title, "Up (Director's cut)");
        assert_eq!(merged.fields.genres, vec!["animation".to_string()]);
        assert_eq!(merged.fields.year, original.fields.year);
        assert_eq!(merged.fields.runtime, original.fields.runtime);
        assert_eq!(merged.id, original.id);
        assert_eq!(merged.version, original.version);
        assert_eq!(merged.created_at, original.created_at);
    }

    #[test]
    fn test_merged_result_is_validated() {
        let patch = MoviePatch {
            genres: Patch::from(vec!["animation".to_string(), "animation".to_string()]),
            ..Default::default()
        };
        let merged = stored(up()).merge(patch);
        assert!(merged.fields.check().is_err());
    }

    #[test]
    fn test_reject_nulls() {
        let patch: MoviePatch = serde_json::from_str(r#"{"year": null, "title": "A"}"#).unwrap();
        let mut v = Validator::new();
        patch.reject_nulls(&mut v);
        assert_eq!(v.errors().len(), 1);
        assert_eq!(v.errors()["year"], "must not be null");
        assert!(!patch.is_empty());
        assert!(MoviePatch::default().is_empty());
    }

    #[test]
    fn test_movie_output_shape() {
        let movie = stored(up());
        let value = serde_json::to_value(&movie).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys.len(), 6);
        for key in ["id", "title", "year", "runtime", "genres", "version"] {
            assert!(keys.contains(&key), "{key}");
        }
        assert!(value.get("created_at").is_none());
    }

    #[quickcheck]
    fn empty_patch_keeps_movie(title: String, year: i32, runtime: i32, genres: Vec<String>) -> bool {
        let movie = stored(MovieInput {
            title,
            year,
            runtime,
            genres,
        });
        movie.clone().merge(MoviePatch::default()) == movie
    }

    #[quickcheck]
    fn patch_replaces_only_present(title: Option<String>, runtime: Option<i32>) -> bool {
        let original = stored(up());
        let patch = MoviePatch {
            title: title.clone().map_or(Patch::Absent, Patch::Value),
            runtime: runtime.map_or(Patch::Absent, Patch::Value),
            ..Default::default()
        };
        let merged = original.clone().merge(patch);
        merged.fields.title == title.unwrap_or(original.fields.title.clone())
            && merged.fields.runtime == runtime.unwrap_or(original.fields.runtime)
            && merged.fields.year == original.fields.year
            && merged.fields.genres == original.fields.genres
    }
}
