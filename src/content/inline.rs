//! Inline style pass
//!
//! Rules run in a fixed order over the still-unstyled runs of a line. Once a
//! run is styled it is never offered to a later rule, so the content of a
//! code span or a bold span keeps its literal delimiters.

use super::blocks::{Span, SpanStyle};
use regex::Regex;
use std::sync::LazyLock;

static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BOLD_STARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static BOLD_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.+?)__").unwrap());
static ITALIC_STAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static ITALIC_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_]+)_").unwrap());

/// Split a line of text into styled spans
pub fn parse_inline(text: &str) -> Vec<Span> {
    let rules: [(&Regex, SpanStyle); 5] = [
        (&CODE, SpanStyle::Code),
        (&BOLD_STARS, SpanStyle::Bold),
        (&BOLD_UNDERSCORES, SpanStyle::Bold),
        (&ITALIC_STAR, SpanStyle::Italic),
        (&ITALIC_UNDERSCORE, SpanStyle::Italic),
    ];

    let mut spans = vec![Span::plain(text)];
    for (pattern, style) in rules {
        spans = spans
            .into_iter()
            .flat_map(|span| match span.style {
                SpanStyle::Plain => apply_rule(&span.text, pattern, style),
                _ => vec![span],
            })
            .collect();
    }

    spans.retain(|s| !s.text.is_empty());
    spans
}

fn apply_rule(text: &str, pattern: &Regex, style: SpanStyle) -> Vec<Span> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            out.push(Span::plain(&text[last..whole.start()]));
        }
        out.push(Span::new(style, inner.as_str()));
        last = whole.end();
    }

    if last < text.len() {
        out.push(Span::plain(&text[last..]));
    }
    out
}
