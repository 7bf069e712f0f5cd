//! Catalog data models.

use std::collections::BTreeMap;

use async_graphql::SimpleObject;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Movie entity from database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, SimpleObject)]
#[graphql(rename_fields = "snake_case")]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub year: i64,
    pub release_date: String,
    pub runtime: i64,
    pub rating: i64,
    pub mpaa_rating: String,
    pub created_at: String,
    pub updated_at: String,
    /// Genre names keyed by movie/genre link id.
    #[sqlx(skip)]
    #[serde(default)]
    #[graphql(skip)]
    pub genres: BTreeMap<i64, String>,
}

/// Genre entity from database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Genre {
    pub id: i64,
    pub genre_name: String,
}

/// Movie edit request as sent by clients. Every movie field is a string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MoviePayload {
    pub id: String,
    pub title: String,
    pub description: String,
    pub year: String,
    pub release_date: String,
    pub runtime: String,
    pub rating: String,
    pub mpaa_rating: String,
    /// Genres to link the movie to. Existing links are kept.
    pub genre_ids: Vec<i64>,
}

/// Validated movie fields ready for insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieInput {
    pub title: String,
    pub description: String,
    pub year: i64,
    pub release_date: String,
    pub runtime: i64,
    pub rating: i64,
    pub mpaa_rating: String,
}

impl MoviePayload {
    /// Parse the payload into the target movie id (0 means create) and its
    /// fields. The year is derived from the release date.
    pub fn parse(&self) -> Result<(i64, MovieInput), String> {
        let id = parse_number("id", &self.id)?;
        if id < 0 {
            return Err(format!("invalid id: {}", self.id));
        }

        let title = self.title.trim();
        if title.is_empty() {
            return Err("title must not be empty".to_string());
        }

        let release_date = NaiveDate::parse_from_str(self.release_date.trim(), "%Y-%m-%d")
            .map_err(|_| format!("invalid release_date: {}", self.release_date))?;

        let rating = parse_number("rating", &self.rating)?;
        if !(0..=5).contains(&rating) {
            return Err(format!("rating must be between 0 and 5: {rating}"));
        }

        Ok((
            id,
            MovieInput {
                title: title.to_string(),
                description: self.description.clone(),
                year: i64::from(release_date.year()),
                release_date: release_date.format("%Y-%m-%d").to_string(),
                runtime: parse_number("runtime", &self.runtime)?,
                rating,
                mpaa_rating: self.mpaa_rating.trim().to_string(),
            },
        ))
    }
}

/// Empty strings count as zero.
fn parse_number(field: &str, value: &str) -> Result<i64, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse()
        .map_err(|_| format!("invalid {field}: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> MoviePayload {
        MoviePayload {
            id: "0".to_string(),
            title: "The Shawshank Redemption".to_string(),
            description: "Two imprisoned men bond".to_string(),
            year: String::new(),
            release_date: "1994-10-14".to_string(),
            runtime: "142".to_string(),
            rating: "5".to_string(),
            mpaa_rating: "R".to_string(),
            genre_ids: Vec::new(),
        }
    }

    #[test]
    fn test_parse_derives_year_from_release_date() {
        let (id, input) = payload().parse().unwrap();
        assert_eq!(id, 0);
        assert_eq!(input.year, 1994);
        assert_eq!(input.runtime, 142);
        assert_eq!(input.rating, 5);
        assert_eq!(input.release_date, "1994-10-14");
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        let mut bad_date = payload();
        bad_date.release_date = "14/10/1994".to_string();
        assert!(bad_date.parse().unwrap_err().contains("release_date"));

        let mut bad_runtime = payload();
        bad_runtime.runtime = "two hours".to_string();
        assert!(bad_runtime.parse().unwrap_err().contains("runtime"));

        let mut bad_rating = payload();
        bad_rating.rating = "9".to_string();
        assert!(bad_rating.parse().unwrap_err().contains("rating"));

        let mut no_title = payload();
        no_title.title = "  ".to_string();
        assert!(no_title.parse().is_err());

        let mut bad_id = payload();
        bad_id.id = "-3".to_string();
        assert!(bad_id.parse().is_err());
    }

    #[test]
    fn test_payload_genre_ids_default_to_empty() {
        let bare: MoviePayload = serde_json::from_str(r#"{"id":"0","title":"Heat"}"#).unwrap();
        assert!(bare.genre_ids.is_empty());

        let linked: MoviePayload =
            serde_json::from_str(r#"{"id":"0","title":"Heat","genre_ids":[3,5]}"#).unwrap();
        assert_eq!(linked.genre_ids, vec![3, 5]);
    }

    #[test]
    fn test_movie_genres_serialize_as_object() {
        let movie = Movie {
            id: 1,
            title: "Heat".to_string(),
            description: String::new(),
            year: 1995,
            release_date: "1995-12-15".to_string(),
            runtime: 170,
            rating: 4,
            mpaa_rating: "R".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
            genres: BTreeMap::from([(3, "Crime".to_string())]),
        };

        let value = serde_json::to_value(&movie).unwrap();
        assert_eq!(value["genres"]["3"], "Crime");
    }
}
