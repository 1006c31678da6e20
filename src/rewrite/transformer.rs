//! Streaming HTML transformer.
//!
//! Wraps an `lol_html` rewriter configured from a [`TransformContext`]:
//!
//! - `*` element handler: maintains the open-element stack for scoping
//! - `p, li` text handler: accumulates whole text nodes and applies content rules
//! - `head` element handler: one JSON-LD script per schema rule, before `</head>`
//!
//! Handlers are only registered for the rule kinds present, so a context
//! without content rules never pays for scope tracking.
//!
//! Input is pushed with [`HtmlTransformer::write`]; each call returns the
//! output bytes that became ready. Everything the handlers don't touch is
//! emitted exactly as it came in.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lol_html::html_content::ContentType;
use lol_html::{
    element, text, ElementContentHandlers, EndTagHandler, HtmlRewriter, MemorySettings,
    OutputSink, Selector, Settings,
};

use crate::config::TransformConfig;
use crate::rewrite::error::{TransformError, TransformResult};
use crate::rewrite::scope::{ScopeTracker, CONTENT_SELECTOR};
use crate::rewrite::text::{TextAccumulator, TextStep};
use crate::rules::TransformContext;

/// Memory bounds for a single transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformLimits {
    /// Largest text node held back for rule matching.
    pub max_text_node_bytes: usize,
    /// Cap on the parser's internal buffering.
    pub max_memory_bytes: usize,
}

impl Default for TransformLimits {
    fn default() -> Self {
        TransformLimits::from(&TransformConfig::default())
    }
}

impl From<&TransformConfig> for TransformLimits {
    fn from(config: &TransformConfig) -> Self {
        Self {
            max_text_node_bytes: config.max_text_node_bytes,
            max_memory_bytes: config.max_memory_bytes,
        }
    }
}

/// Output sink shared between the rewriter and its owner.
#[derive(Clone, Default)]
struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl OutputSink for SharedOutput {
    fn handle_chunk(&mut self, chunk: &[u8]) {
        self.0.borrow_mut().extend_from_slice(chunk);
    }
}

type HandlerList = Vec<(Cow<'static, Selector>, ElementContentHandlers<'static>)>;

/// Incremental HTML rewriter for one response.
///
/// Not `Send`: it lives on the thread that feeds it (see `rewrite::stream`).
///
/// Untouched markup comes out byte-for-byte, so the input the output
/// accounts for is `output_len - growth`, where `growth` is what the
/// handlers added minus what they removed. Input past that point is kept
/// raw in `unflushed` until the output covers it; it is bounded by the
/// parser's memory limit plus one chunk.
pub struct HtmlTransformer {
    rewriter: Option<HtmlRewriter<'static, SharedOutput>>,
    output: SharedOutput,
    text: Rc<RefCell<TextAccumulator>>,
    growth: Rc<Cell<isize>>,
    unflushed: Vec<u8>,
    input_len: usize,
    output_len: usize,
}

impl HtmlTransformer {
    pub fn new(context: TransformContext, limits: TransformLimits) -> Self {
        let context = Rc::new(context);
        let text = Rc::new(RefCell::new(TextAccumulator::new(limits.max_text_node_bytes)));
        let growth = Rc::new(Cell::new(0));
        let output = SharedOutput::default();

        let mut handlers: HandlerList = Vec::new();
        if !context.content_rules().is_empty() {
            content_handlers(&mut handlers, Rc::clone(&context), Rc::clone(&text), Rc::clone(&growth));
        }
        if !context.schema_rules().is_empty() {
            schema_handler(&mut handlers, &context, Rc::clone(&growth));
        }

        let mut memory_settings = MemorySettings::default();
        memory_settings.max_allowed_memory_usage = limits.max_memory_bytes;

        let rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: handlers,
                memory_settings,
                // Ambiguous markup is passed through rather than rejected.
                strict: false,
                ..Settings::new()
            },
            output.clone(),
        );

        Self {
            rewriter: Some(rewriter),
            output,
            text,
            growth,
            unflushed: Vec::new(),
            input_len: 0,
            output_len: 0,
        }
    }

    /// Feed the next input chunk, returning whatever output is ready.
    pub fn write(&mut self, chunk: &[u8]) -> TransformResult<Vec<u8>> {
        let rewriter = self.rewriter.as_mut().ok_or(TransformError::Ended)?;
        self.unflushed.extend_from_slice(chunk);
        self.input_len += chunk.len();
        rewriter.write(chunk)?;
        Ok(self.drain_output())
    }

    /// Signal end of input, returning the remaining output.
    pub fn end(&mut self) -> TransformResult<Vec<u8>> {
        let rewriter = self.rewriter.take().ok_or(TransformError::Ended)?;
        rewriter.end()?;
        Ok(self.drain_output())
    }

    /// Give up after a failure. Returns the output produced so far, then the
    /// text held back for matching, then the raw input the parser had not
    /// flushed, so the caller can continue verbatim with the next chunk.
    pub fn abandon(mut self) -> Vec<u8> {
        self.rewriter = None;
        let mut bytes = self.drain_output();
        bytes.extend_from_slice(self.text.borrow_mut().take_pending().as_bytes());
        bytes.extend_from_slice(&self.unflushed);
        bytes
    }

    fn drain_output(&mut self) -> Vec<u8> {
        let out = self.output.take();
        self.output_len += out.len();

        let covered = (self.output_len as isize - self.growth.get()).clamp(0, self.input_len as isize);
        let pending = self.input_len - covered as usize;
        if pending < self.unflushed.len() {
            let flushed = self.unflushed.len() - pending;
            self.unflushed.drain(..flushed);
        }
        out
    }
}

fn content_handlers(
    handlers: &mut HandlerList,
    context: Rc<TransformContext>,
    text: Rc<RefCell<TextAccumulator>>,
    growth: Rc<Cell<isize>>,
) {
    let scope = Rc::new(RefCell::new(ScopeTracker::default()));

    let tracker = Rc::clone(&scope);
    handlers.push(element!("*", move |el| {
        let tag = el.tag_name();
        // Void elements have no end tag and never contain text.
        if let Some(end_handlers) = el.end_tag_handlers() {
            let depth = tracker.borrow_mut().open(&tag);
            let closer = Rc::clone(&tracker);
            let handler: EndTagHandler<'static> = Box::new(move |_end| {
                closer.borrow_mut().close(depth);
                Ok(())
            });
            end_handlers.push(handler);
        }
        Ok(())
    }));

    handlers.push(text!(CONTENT_SELECTOR, move |chunk| {
        if !scope.borrow().in_content() {
            return Ok(());
        }
        let original = chunk.as_str().len() as isize;
        let step = text
            .borrow_mut()
            .push(chunk.as_str(), chunk.last_in_text_node(), &context);
        match step {
            TextStep::Hold => {
                chunk.remove();
                growth.set(growth.get() - original);
            }
            TextStep::Emit(markup) => {
                chunk.replace(&markup, ContentType::Html);
                growth.set(growth.get() + markup.len() as isize - original);
            }
            TextStep::Keep => {}
        }
        Ok(())
    }));
}

fn schema_handler(handlers: &mut HandlerList, context: &TransformContext, growth: Rc<Cell<isize>>) {
    let markup = Rc::new(context.schema_markup());
    let mut injected = false;

    handlers.push(element!("head", move |el| {
        if injected {
            return Ok(());
        }
        injected = true;
        // Inserted right before `</head>`, i.e. after the existing children.
        if let Some(end_handlers) = el.end_tag_handlers() {
            let markup = Rc::clone(&markup);
            let growth = Rc::clone(&growth);
            let handler: EndTagHandler<'static> = Box::new(move |end| {
                end.before(markup.as_str(), ContentType::Html);
                growth.set(growth.get() + markup.len() as isize);
                Ok(())
            });
            end_handlers.push(handler);
        }
        Ok(())
    }));
}

/// Transform a complete document delivered as a sequence of chunks.
pub fn transform_chunks<'a>(
    chunks: impl IntoIterator<Item = &'a [u8]>,
    context: TransformContext,
    limits: TransformLimits,
) -> TransformResult<Vec<u8>> {
    let mut transformer = HtmlTransformer::new(context, limits);
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(transformer.write(chunk)?);
    }
    out.extend(transformer.end()?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ConfigKey, ContentRule, Rule, RuleSet, SchemaRule};

    fn context(rules: Vec<Rule>) -> TransformContext {
        TransformContext::new(ConfigKey::derive("/page"), RuleSet::from_rules(rules))
    }

    fn replace(o: &str, n: &str) -> Rule {
        Rule::ContentReplace(ContentRule::new(o, n))
    }

    fn schema(payload: &str) -> Rule {
        Rule::SchemaInject(SchemaRule::new(payload))
    }

    fn run(html: &str, rules: Vec<Rule>) -> String {
        run_chunks(&[html], rules)
    }

    fn run_chunks(chunks: &[&str], rules: Vec<Rule>) -> String {
        let out = transform_chunks(
            chunks.iter().map(|c| c.as_bytes()),
            context(rules),
            TransformLimits::default(),
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    const PAGE: &str = concat!(
        "<!DOCTYPE html>\n",
        "<html lang=\"en\"><head><meta charset=\"utf-8\">",
        "<title>SEO guide</title><!-- build 42 --></head>\n",
        "<body class='x'  data-a=\"1\"><p>We do SEO work.</p>",
        "<ul><li>SEO audits</li><li>Links</li></ul>",
        "<script>var s = \"<p>SEO</p>\";</script></body></html>"
    );

    #[test]
    fn test_empty_context_is_byte_identical() {
        assert_eq!(run(PAGE, vec![]), PAGE);
    }

    #[test]
    fn test_absent_match_is_byte_identical() {
        assert_eq!(run(PAGE, vec![replace("nowhere to be found", "x")]), PAGE);
    }

    #[test]
    fn test_link_injection() {
        let out = run(
            "<p>We do SEO work.</p>",
            vec![replace("SEO", "<a href=\"/seo\">SEO</a>")],
        );
        assert_eq!(out, "<p>We do <a href=\"/seo\">SEO</a> work.</p>");
    }

    #[test]
    fn test_list_items_are_in_scope() {
        let out = run(PAGE, vec![replace("SEO", "X")]);
        assert!(out.contains("<li>X audits</li>"));
        assert!(out.contains("<p>We do X work.</p>"));
    }

    #[test]
    fn test_rules_apply_to_previous_output() {
        let out = run("<p>foo</p>", vec![replace("foo", "bar"), replace("bar", "baz")]);
        assert_eq!(out, "<p>baz</p>");
    }

    #[test]
    fn test_scope_isolation() {
        let html = concat!(
            "<head><title>SEO</title></head>",
            "<div>SEO</div><h1>SEO</h1>",
            "<p>SEO <strong>SEO</strong> SEO</p>"
        );
        let out = run(html, vec![replace("SEO", "X")]);
        assert_eq!(
            out,
            concat!(
                "<head><title>SEO</title></head>",
                "<div>SEO</div><h1>SEO</h1>",
                "<p>X <strong>SEO</strong> X</p>"
            )
        );
    }

    #[test]
    fn test_script_text_inside_paragraph_untouched() {
        let html = "<p>SEO<script>var x = 'SEO';</script></p>";
        let out = run(html, vec![replace("SEO", "X")]);
        assert_eq!(out, "<p>X<script>var x = 'SEO';</script></p>");
    }

    #[test]
    fn test_raw_text_is_preserved() {
        let out = run("<p>Fish &amp; Chips</p>", vec![replace("Chips", "Fries")]);
        assert_eq!(out, "<p>Fish &amp; Fries</p>");
    }

    #[test]
    fn test_schema_injection() {
        let html = "<html><head><meta charset=\"utf-8\"><title>T</title></head><body></body></html>";
        let out = run(html, vec![schema("{\"a\":1}"), schema("{\"b\":2}")]);
        assert_eq!(
            out,
            concat!(
                "<html><head><meta charset=\"utf-8\"><title>T</title>",
                "<script type=\"application/ld+json\">{\"a\":1}</script>",
                "<script type=\"application/ld+json\">{\"b\":2}</script>",
                "</head><body></body></html>"
            )
        );
    }

    #[test]
    fn test_schema_injected_into_first_head_only() {
        let out = run("<head></head><head></head>", vec![schema("{}")]);
        assert_eq!(
            out,
            "<head><script type=\"application/ld+json\">{}</script></head><head></head>"
        );
    }

    #[test]
    fn test_schema_rules_leave_text_alone() {
        let html = "<head></head><p>{}</p>";
        let out = run(html, vec![schema("{}")]);
        assert!(out.ends_with("</head><p>{}</p>"));
    }

    #[test]
    fn test_match_across_chunk_boundary() {
        let out = run_chunks(&["<p>hello ", "world</p>"], vec![replace("hello world", "hi")]);
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn test_every_split_point() {
        let html = "<div><p>We do SEO work.</p></div>";
        let expected = "<div><p>We do <a href=\"/seo\">SEO</a> work.</p></div>";

        for split in 1..html.len() {
            let (a, b) = html.split_at(split);
            let out = run_chunks(&[a, b], vec![replace("SEO", "<a href=\"/seo\">SEO</a>")]);
            assert_eq!(out, expected, "split at {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let html = "<ul><li>edge augmentation</li></ul>";
        let chunks: Vec<&str> = (0..html.len()).map(|i| &html[i..i + 1]).collect();
        let out = run_chunks(&chunks, vec![replace("edge augmentation", "<em>edge</em>")]);
        assert_eq!(out, "<ul><li><em>edge</em></li></ul>");
    }

    #[test]
    fn test_malformed_html_passes_through() {
        let html = "<p>unclosed <b>bold<p>SEO</div></i><<>>";
        let out = run(html, vec![replace("SEO", "X")]);
        assert_eq!(out, "<p>unclosed <b>bold<p>X</div></i><<>>");
    }

    #[test]
    fn test_incremental_output() {
        let mut transformer = HtmlTransformer::new(
            context(vec![replace("SEO", "X")]),
            TransformLimits::default(),
        );

        // Markup before the first text node is released without waiting for the end
        let first = transformer.write(b"<html><body><div>intro</div>").unwrap();
        assert!(!first.is_empty());

        let mut out = first;
        out.extend(transformer.write(b"<p>SEO</p></body></html>").unwrap());
        out.extend(transformer.end().unwrap());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<html><body><div>intro</div><p>X</p></body></html>"
        );
    }

    #[test]
    fn test_abandon_returns_held_text() {
        let mut transformer = HtmlTransformer::new(
            context(vec![replace("zzz", "x")]),
            TransformLimits::default(),
        );

        let mut out = transformer.write(b"<p>held ").unwrap();
        out.extend(transformer.abandon());

        // Whatever the parser emitted, held or buffered comes back exactly once
        assert_eq!(String::from_utf8(out).unwrap(), "<p>held ");
    }

    #[test]
    fn test_failure_replays_buffered_input() {
        let page = format!(
            "<html><body><p>SEO</p><img src=\"{}\"><p>tail</p></body></html>",
            "A".repeat(4096)
        );
        let limits = TransformLimits {
            max_text_node_bytes: 1024,
            max_memory_bytes: 3000,
        };
        let mut transformer = HtmlTransformer::new(context(vec![replace("SEO", "X")]), limits);

        let mut out = Vec::new();
        let mut chunks = page.as_bytes().chunks(512);
        let mut failed = false;
        for chunk in chunks.by_ref() {
            match transformer.write(chunk) {
                Ok(bytes) => out.extend(bytes),
                Err(TransformError::Rewriting(_)) => {
                    failed = true;
                    break;
                }
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert!(failed, "the attribute should exceed the memory limit");

        out.extend(transformer.abandon());
        for chunk in chunks {
            out.extend_from_slice(chunk);
        }
        assert_eq!(
            String::from_utf8(out).unwrap(),
            page.replacen("<p>SEO</p>", "<p>X</p>", 1)
        );
    }

    #[test]
    fn test_write_after_end_is_rejected() {
        let mut transformer = HtmlTransformer::new(context(vec![]), TransformLimits::default());
        transformer.end().unwrap();
        assert!(matches!(transformer.write(b"<p>"), Err(TransformError::Ended)));
    }

    #[test]
    fn test_implied_paragraph_end_keeps_scope_open() {
        // `</p>` closes only the innermost `p`; the outer one has no end tag
        // in the markup, so the text after it still counts as paragraph text.
        let html = "<p>one<p>two</p>SEO outside<div>SEO</div>";
        let out = run(html, vec![replace("SEO", "X")]);
        assert_eq!(out, "<p>one<p>two</p>X outside<div>SEO</div>");
    }
}
