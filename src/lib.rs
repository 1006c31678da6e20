//! Edge augmentation proxy library.
//!
//! Sits in front of an origin server and rewrites its HTML on the way out,
//! applying per-page rules published by a configuration service.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod rewrite;
pub mod rules;

pub use config::schema::AugmentConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::RequestPipeline;
