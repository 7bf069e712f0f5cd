//! API request handlers, organized by domain:
//! - `auth`: signin
//! - `catalog`: movie and genre listing plus admin edits
//! - `graphql`: read-only catalog queries
//! - `status`: service status

mod auth;
mod catalog;
mod graphql;
mod status;

pub use auth::signin;
pub use catalog::{
    MutationResponse, all_genres, all_movies, delete_movie, edit_movie, get_movie,
    movies_by_genre,
};
pub use graphql::graphql;
pub use status::{AppStatus, status};
