//! Catalog repository for database operations.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{Genre, Movie, MovieInput};

const MOVIE_COLUMNS: &str = r#"
    SELECT id, title, description, year, release_date, runtime, rating,
           mpaa_rating, created_at, updated_at
    FROM movies
"#;

/// Repository for movies and genres.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Create a new catalog repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a movie by ID, with its genres.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!("{MOVIE_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch movie")?;

        match movie {
            Some(mut movie) => {
                movie.genres = self.genres_for(movie.id).await?;
                Ok(Some(movie))
            }
            None => Ok(None),
        }
    }

    /// List movies ordered by title, optionally only those in `genre_id`.
    #[instrument(skip(self))]
    pub async fn all(&self, genre_id: Option<i64>) -> Result<Vec<Movie>> {
        let mut movies = match genre_id {
            Some(genre_id) => sqlx::query_as::<_, Movie>(&format!(
                "{MOVIE_COLUMNS} WHERE id IN (SELECT movie_id FROM movies_genres WHERE genre_id = ?) ORDER BY title"
            ))
            .bind(genre_id)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as::<_, Movie>(&format!("{MOVIE_COLUMNS} ORDER BY title"))
                .fetch_all(&self.pool)
                .await,
        }
        .context("Failed to list movies")?;

        for movie in &mut movies {
            movie.genres = self.genres_for(movie.id).await?;
        }

        Ok(movies)
    }

    /// Movies whose title contains `needle`, ignoring case, ordered by title.
    #[instrument(skip(self))]
    pub async fn search(&self, needle: &str) -> Result<Vec<Movie>> {
        let needle = needle.to_lowercase();
        let movies = self.all(None).await?;
        Ok(movies
            .into_iter()
            .filter(|movie| movie.title.to_lowercase().contains(&needle))
            .collect())
    }

    async fn genres_for(&self, movie_id: i64) -> Result<BTreeMap<i64, String>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT mg.id, g.genre_name
            FROM movies_genres mg
            JOIN genres g ON g.id = mg.genre_id
            WHERE mg.movie_id = ?
            "#,
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch movie genres")?;

        Ok(rows.into_iter().collect())
    }

    /// List all genres ordered by name.
    #[instrument(skip(self))]
    pub async fn genres_all(&self) -> Result<Vec<Genre>> {
        sqlx::query_as::<_, Genre>("SELECT id, genre_name FROM genres ORDER BY genre_name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list genres")
    }

    /// Link a movie to a genre. Linking twice is a no-op.
    #[instrument(skip(self))]
    pub async fn add_genre(&self, movie_id: i64, genre_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO movies_genres (movie_id, genre_id) VALUES (?, ?)")
            .bind(movie_id)
            .bind(genre_id)
            .execute(&self.pool)
            .await
            .context("Failed to link movie genre")?;
        Ok(())
    }

    /// Insert a movie and return its ID.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn insert(&self, input: &MovieInput) -> Result<i64> {
        let id = sqlx::query(
            r#"
            INSERT INTO movies (title, description, year, release_date, runtime, rating, mpaa_rating)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.year)
        .bind(&input.release_date)
        .bind(input.runtime)
        .bind(input.rating)
        .bind(&input.mpaa_rating)
        .execute(&self.pool)
        .await
        .context("Failed to insert movie")?
        .last_insert_rowid();

        debug!("Inserted movie {}", id);
        Ok(id)
    }

    /// Update a movie. Fails when the movie does not exist.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn update(&self, id: i64, input: &MovieInput) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE movies
            SET title = ?, description = ?, year = ?, release_date = ?,
                runtime = ?, rating = ?, mpaa_rating = ?, updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.year)
        .bind(&input.release_date)
        .bind(input.runtime)
        .bind(input.rating)
        .bind(&input.mpaa_rating)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update movie")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Movie not found: {}", id);
        }
        Ok(())
    }

    /// Delete a movie. Fails when the movie does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM movies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete movie")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Movie not found: {}", id);
        }
        Ok(())
    }
}
