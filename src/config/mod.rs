//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → startup flags layered on top (main.rs)
//!     → validation.rs (semantic checks)
//!     → AugmentConfig (validated, immutable)
//!     → handed to the pipeline at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults except the tenant identifier
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    AugmentConfig, ListenerConfig, LogFormat, ObservabilityConfig, OriginConfig, RulesConfig,
    TimeoutConfig, TransformConfig,
};
pub use validation::{validate_config, ValidationError};
