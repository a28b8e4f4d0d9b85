//! Line-oriented reply parser
//!
//! Turns a raw reply string into an ordered list of [`ContentBlock`]s in a
//! single pass. Blockquotes, tables and lists accumulate across consecutive
//! lines; every other line class is a block of its own. The moment a line
//! stops matching the open block's class, that block is flushed.

use super::blocks::{ContentBlock, Span};
use super::inline::parse_inline;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s+(.*)$").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

const BULLETS: [&str; 3] = ["- ", "* ", "• "];
const FENCE: &str = "```";

/// Classification of a single input line
#[derive(Debug, PartialEq)]
enum Line<'a> {
    Quote(&'a str),
    TableRow(Vec<&'a str>),
    TableSeparator,
    ListItem { ordered: bool, text: &'a str },
    Heading { level: u8, text: &'a str },
    Text(&'a str),
    Empty,
}

fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();

    if let Some(rest) = line.strip_prefix('>') {
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        return Line::Quote(rest.trim_end());
    }

    if line.len() >= 2 && line.starts_with('|') && line.ends_with('|') {
        let inner = &line[1..line.len() - 1];
        if inner.contains('|') {
            if is_separator(line) {
                return Line::TableSeparator;
            }
            return Line::TableRow(inner.split('|').map(str::trim).collect());
        }
    }

    for bullet in BULLETS {
        if let Some(text) = line.strip_prefix(bullet) {
            return Line::ListItem {
                ordered: false,
                text: text.trim(),
            };
        }
    }
    if let Some(caps) = NUMBERED_ITEM.captures(line) {
        if let Some(text) = caps.get(1) {
            return Line::ListItem {
                ordered: true,
                text: text.as_str().trim(),
            };
        }
    }

    if let Some(caps) = HEADING.captures(line) {
        if let (Some(hashes), Some(text)) = (caps.get(1), caps.get(2)) {
            return Line::Heading {
                level: hashes.as_str().len() as u8,
                text: text.as_str().trim(),
            };
        }
    }

    if line.is_empty() {
        Line::Empty
    } else {
        Line::Text(line)
    }
}

/// A row made only of dashes, colons, pipes and spaces
fn is_separator(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| matches!(c, '-' | ':' | '|' | ' '))
}

/// Which multi-line block is currently open
#[derive(Clone, Debug, Default, PartialEq)]
enum ParserState {
    #[default]
    Idle,
    InBlockquote(Vec<Vec<Span>>),
    InTable(Vec<Vec<Vec<Span>>>),
    InList {
        ordered: bool,
        items: Vec<Vec<Span>>,
    },
}

/// Incremental reply parser
///
/// Feed lines with [`ContentParser::feed_line`] and collect the result with
/// [`ContentParser::finish`]. [`parse_reply`] wraps both for whole strings.
#[derive(Clone, Debug, Default)]
pub struct ContentParser {
    state: ParserState,
    blocks: Vec<ContentBlock>,
}

impl ContentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator)
    pub fn feed_line(&mut self, raw: &str) {
        if raw.trim_start().starts_with(FENCE) {
            trace!("Dropping fence line");
            return;
        }

        match classify(raw) {
            Line::Quote(text) => {
                if !matches!(self.state, ParserState::InBlockquote(_)) {
                    self.flush();
                    self.state = ParserState::InBlockquote(Vec::new());
                }
                if let ParserState::InBlockquote(lines) = &mut self.state {
                    lines.push(parse_inline(text));
                }
            }
            Line::TableRow(cells) => {
                self.enter_table();
                if let ParserState::InTable(rows) = &mut self.state {
                    rows.push(cells.into_iter().map(parse_inline).collect());
                }
            }
            Line::TableSeparator => self.enter_table(),
            Line::ListItem { ordered, text } => {
                let same_list =
                    matches!(self.state, ParserState::InList { ordered: o, .. } if o == ordered);
                if !same_list {
                    self.flush();
                    self.state = ParserState::InList {
                        ordered,
                        items: Vec::new(),
                    };
                }
                if let ParserState::InList { items, .. } = &mut self.state {
                    items.push(parse_inline(text));
                }
            }
            Line::Heading { level, text } => {
                self.flush();
                self.blocks.push(ContentBlock::Heading {
                    level,
                    spans: parse_inline(text),
                });
            }
            Line::Text(text) => {
                self.flush();
                self.blocks.push(ContentBlock::Paragraph {
                    spans: parse_inline(text),
                });
            }
            Line::Empty => {
                self.flush();
                self.blocks.push(ContentBlock::Spacer);
            }
        }
    }

    /// Flush any open block and return everything parsed so far
    pub fn finish(mut self) -> Vec<ContentBlock> {
        self.flush();
        self.blocks
    }

    fn enter_table(&mut self) {
        if !matches!(self.state, ParserState::InTable(_)) {
            self.flush();
            self.state = ParserState::InTable(Vec::new());
        }
    }

    fn flush(&mut self) {
        match std::mem::take(&mut self.state) {
            ParserState::Idle => {}
            ParserState::InBlockquote(lines) => self.flush_blockquote(lines),
            ParserState::InTable(rows) => self.flush_table(rows),
            ParserState::InList { ordered, items } => self.flush_list(ordered, items),
        }
    }

    fn flush_blockquote(&mut self, lines: Vec<Vec<Span>>) {
        if !lines.is_empty() {
            self.blocks.push(ContentBlock::Blockquote { lines });
        }
    }

    /// Separators were never stored, so `rows` holds real rows only. A table
    /// needs a header and at least one body row to be emitted.
    fn flush_table(&mut self, rows: Vec<Vec<Vec<Span>>>) {
        if rows.len() < 2 {
            debug!("Dropping table without body rows ({} row(s))", rows.len());
            return;
        }
        let mut rows = rows.into_iter();
        if let Some(header) = rows.next() {
            self.blocks.push(ContentBlock::Table {
                header,
                rows: rows.collect(),
            });
        }
    }

    fn flush_list(&mut self, ordered: bool, items: Vec<Vec<Span>>) {
        if !items.is_empty() {
            self.blocks.push(ContentBlock::List { ordered, items });
        }
    }
}

/// Parse a complete reply
pub fn parse_reply(raw: &str) -> Vec<ContentBlock> {
    let mut parser = ContentParser::new();
    for line in raw.trim().lines() {
        parser.feed_line(line);
    }
    parser.finish()
}
