//! HTTP client for the external Hospital Directory service.

pub mod api;

pub use api::{DirectoryApi, DirectoryApiError, DirectoryConfig};
