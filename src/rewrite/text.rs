//! Text node accumulation.
//!
//! The HTML parser hands text over in whatever pieces the input chunks
//! happen to produce, so one logical text node can arrive as several
//! fragments. Rules must see the whole node: fragments are held back until
//! the last one arrives, then the joined text is rewritten and emitted in
//! place of that last fragment.
//!
//! Holding text is bounded. Once a node grows past the limit, what was held
//! is released unmodified and the rest of that node streams through as-is.

use crate::rules::TransformContext;

/// What to do with the fragment just pushed.
#[derive(Debug, PartialEq, Eq)]
pub enum TextStep {
    /// Drop the fragment from the output; its text is held.
    Hold,
    /// Replace the fragment with this markup.
    Emit(String),
    /// Leave the fragment as it is.
    Keep,
}

#[derive(Debug)]
pub struct TextAccumulator {
    pending: String,
    limit: usize,
    overflowed: bool,
}

impl TextAccumulator {
    pub fn new(limit: usize) -> Self {
        Self {
            pending: String::new(),
            limit,
            overflowed: false,
        }
    }

    /// Feed one fragment of a text node.
    pub fn push(&mut self, fragment: &str, last_in_node: bool, context: &TransformContext) -> TextStep {
        if self.overflowed {
            if last_in_node {
                self.overflowed = false;
            }
            return TextStep::Keep;
        }

        if last_in_node {
            if self.pending.is_empty() {
                // Whole node in one fragment: nothing to re-emit unless a rule fired.
                return match context.apply_content_rules(fragment) {
                    std::borrow::Cow::Borrowed(_) => TextStep::Keep,
                    std::borrow::Cow::Owned(rewritten) => TextStep::Emit(rewritten),
                };
            }
            self.pending.push_str(fragment);
            let node = std::mem::take(&mut self.pending);
            return TextStep::Emit(context.apply_content_rules(&node).into_owned());
        }

        self.pending.push_str(fragment);
        if self.pending.len() > self.limit {
            tracing::debug!(
                config_key = %context.key(),
                held_bytes = self.pending.len(),
                limit = self.limit,
                "Text node exceeds hold limit, streaming it unmodified"
            );
            self.overflowed = true;
            return TextStep::Emit(std::mem::take(&mut self.pending));
        }
        TextStep::Hold
    }

    /// Text currently held back, leaving the accumulator empty.
    pub fn take_pending(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }
}
