//! Open-element tracking for content-rule scoping.
//!
//! Content rules only touch text whose *nearest* enclosing element is a `p`
//! or `li`. Text inside `<p><a>..</a></p>` belongs to the `a`, so an injected
//! link never ends up nested in an existing one.
//!
//! Elements are pushed when their start tag is seen and the stack is cut
//! back to their depth when their end tag is seen. An element whose end tag
//! is implied rather than written is discarded when an ancestor closes.
//! Until then it stays open: in `<p>one<p>two</p>tail` the `</p>` closes the
//! inner paragraph only, so `tail` still counts as paragraph text. This is
//! the same scoping the `p, li` text selector applies.

/// Tags whose direct text is eligible for content rules.
pub const CONTENT_TAGS: &[&str] = &["p", "li"];

/// Selector matching the same tags, for the parser's text handlers.
pub const CONTENT_SELECTOR: &str = "p, li";

pub fn is_content_tag(tag: &str) -> bool {
    CONTENT_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

#[derive(Debug, Default)]
pub struct ScopeTracker {
    open: Vec<bool>,
}

impl ScopeTracker {
    /// Record an opened element, returning the depth to close it at.
    pub fn open(&mut self, tag: &str) -> usize {
        let depth = self.open.len();
        self.open.push(is_content_tag(tag));
        depth
    }

    /// Close the element opened at `depth`, along with anything left open inside it.
    pub fn close(&mut self, depth: usize) {
        self.open.truncate(depth);
    }

    /// True when the innermost open element is a content tag.
    pub fn in_content(&self) -> bool {
        self.open.last().copied().unwrap_or(false)
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }
}
