//! Movie catalog API with stateless bearer token authentication.
//!
//! The binary wires these modules together; integration tests use them
//! directly to build a router around an in-memory database.

pub mod account;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
