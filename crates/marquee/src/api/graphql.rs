//! Read-only GraphQL view of the movie catalog.

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Result, Schema};
use tracing::error;

use crate::catalog::{CatalogRepository, Movie};

/// Schema served at `/v1/graphql`.
pub type CatalogSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub fn build_schema(catalog: CatalogRepository) -> CatalogSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(catalog)
        .finish()
}

pub struct QueryRoot;

#[Object(name = "RootQuery")]
impl QueryRoot {
    /// Get movie by id
    async fn movie(&self, ctx: &Context<'_>, id: Option<i64>) -> Result<Option<Movie>> {
        let Some(id) = id else {
            return Ok(None);
        };
        catalog(ctx)?.get(id).await.map_err(resolver_error)
    }

    /// Get all movies
    async fn list(&self, ctx: &Context<'_>) -> Result<Vec<Movie>> {
        catalog(ctx)?.all(None).await.map_err(resolver_error)
    }

    /// Search movies by title
    async fn search(
        &self,
        ctx: &Context<'_>,
        title_contains: Option<String>,
    ) -> Result<Vec<Movie>> {
        match title_contains {
            Some(needle) => catalog(ctx)?.search(&needle).await.map_err(resolver_error),
            None => Ok(Vec::new()),
        }
    }
}

fn catalog<'a>(ctx: &Context<'a>) -> Result<&'a CatalogRepository> {
    ctx.data::<CatalogRepository>()
}

/// Repository failures are logged; the client only learns that one happened.
fn resolver_error(err: anyhow::Error) -> async_graphql::Error {
    error!(error = %format!("{err:#}"), "GraphQL resolver failed");
    async_graphql::Error::new("internal server error")
}
