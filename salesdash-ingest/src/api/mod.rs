//! HTTP API handlers for salesdash-ingest

pub mod health;
pub mod summaries;
pub mod upload;

pub use health::health_routes;
pub use summaries::summary_routes;
pub use upload::upload_routes;
