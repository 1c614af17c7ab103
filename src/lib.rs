//! Customer Service Library
//!
//! Customer and address records behind a small REST API, used directly by
//! clients and by other services (e.g. order-service validating address
//! ownership).
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `correlation`: Correlation id middleware and extractor.
//! - `db`: PostgreSQL connection pool and schema bootstrap.
//! - `db_storage`: PostgreSQL repository.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `memory_storage`: In-memory repository.
//! - `metrics`: Request metrics and Prometheus exposition.
//! - `models`: Records, payloads and query parameters.
//! - `openapi`: OpenAPI document and Swagger UI.
//! - `repository`: Storage trait.
//! - `routes`: Router assembly.
//! - `seed`: Initial data load.
//! - `validation`: Payload validation.

pub mod config;
pub mod correlation;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod memory_storage;
pub mod metrics;
pub mod models;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod seed;
pub mod validation;
