//! Streaming HTML rewriting.
//!
//! # Data Flow
//! ```text
//! TransformContext
//!     → transformer.rs (lol_html handlers: scope tracking, text rules, head injection)
//!         ↳ scope.rs (nearest enclosing element)
//!         ↳ text.rs  (whole-text-node accumulation)
//!     → stream.rs (async body in, async body out, worker thread in between)
//! ```
//!
//! # Design Decisions
//! - Never buffer the document; only the current text node is held, and only up to a limit
//! - Untouched markup is emitted byte-for-byte
//! - Failures degrade to passthrough, never to an error response

pub mod error;
pub mod scope;
pub mod stream;
pub mod text;
pub mod transformer;

pub use error::{TransformError, TransformResult};
pub use stream::transform_body;
pub use transformer::{transform_chunks, HtmlTransformer, TransformLimits};
