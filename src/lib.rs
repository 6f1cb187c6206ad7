//! Ghost-job posting analysis service with a two-tier analysis cache.
//!
//! Submissions go through [`service::ScanService`], which reuses an earlier
//! analysis when the [`cache::JobCache`] finds an identical or similar posting
//! and only calls the LLM provider on a miss.

pub mod analysis;
pub mod cache;
pub mod core;
pub mod metrics;
pub mod scan_cli;
pub mod service;
pub mod store;
pub mod testing;
pub mod types;
pub mod web;

pub use web::start_web_server;
