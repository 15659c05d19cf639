//! # API Route Modules
//!
//! - `proof`: certificate upload and the execute → prove → verify pipeline.
//! - `ops`: readiness and Prometheus scrape endpoints.

pub mod ops;
pub mod proof;
