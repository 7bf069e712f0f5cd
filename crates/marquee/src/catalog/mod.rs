//! Movie catalog: movies, genres and their links.

mod models;
mod repository;

pub use models::{Genre, Movie, MovieInput, MoviePayload};
pub use repository::CatalogRepository;
