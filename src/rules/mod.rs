//! Per-page rewrite rules.
//!
//! # Data Flow
//! ```text
//! request URL
//!     → key.rs (ConfigKey: strip `/ . - : = ?`)
//!     → client.rs (GET <base>/<tenant>/<key>.json, timeout-bounded)
//!     → rule.rs (validate each record into a tagged Rule)
//!     → set.rs (RuleSet: content rules + schema rules, order preserved)
//!     → TransformContext handed to the rewrite subsystem
//! ```
//!
//! # Design Decisions
//! - Records are validated one at a time; a malformed record is dropped, never the set
//! - Any fetch failure degrades to an empty RuleSet
//! - Rule content is trusted: replacements and schema payloads are emitted as raw markup

pub mod client;
pub mod key;
pub mod rule;
pub mod set;

pub use client::{RuleClient, RuleFetchError};
pub use key::{ConfigKey, KeySource};
pub use rule::{ContentRule, Rule, RuleError, SchemaRule};
pub use set::{RuleSet, TransformContext};
