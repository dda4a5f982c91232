//! Domain types and contracts shared by every hospital bulk-intake crate.
//!
//! Holds the batch data model, the batch state store, CSV row ingestion and
//! the contract of the upstream Hospital Directory service.

pub mod batch;
pub mod directory;
pub mod error;
pub mod ingest;
pub mod store;
pub mod types;
