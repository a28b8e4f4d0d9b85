use serde::Serialize;
use std::fmt;

/// Emphasis carried by an inline run. Exactly one style per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStyle {
    Plain,
    Bold,
    Italic,
    Code,
}

/// An inline run of text with a single style
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Span {
    pub style: SpanStyle,
    pub text: String,
}

impl Span {
    pub fn new(style: SpanStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(SpanStyle::Plain, text)
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(SpanStyle::Bold, text)
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self::new(SpanStyle::Italic, text)
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self::new(SpanStyle::Code, text)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Fixed set of heading sizes a renderer has to support
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingSize {
    Large,
    Medium,
    Small,
}

impl HeadingSize {
    /// Levels 3 through 6 all share the smallest size
    pub fn for_level(level: u8) -> Self {
        match level {
            1 => HeadingSize::Large,
            2 => HeadingSize::Medium,
            _ => HeadingSize::Small,
        }
    }
}

/// One structural unit of a parsed reply
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading { level: u8, spans: Vec<Span> },
    Paragraph { spans: Vec<Span> },
    List { ordered: bool, items: Vec<Vec<Span>> },
    Table { header: Vec<Vec<Span>>, rows: Vec<Vec<Vec<Span>>> },
    Blockquote { lines: Vec<Vec<Span>> },
    Spacer,
}

impl ContentBlock {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Heading { .. } => "heading",
            ContentBlock::Paragraph { .. } => "paragraph",
            ContentBlock::List { .. } => "list",
            ContentBlock::Table { .. } => "table",
            ContentBlock::Blockquote { .. } => "blockquote",
            ContentBlock::Spacer => "spacer",
        }
    }

    /// Heading size for heading blocks, `None` otherwise
    pub fn heading_size(&self) -> Option<HeadingSize> {
        match self {
            ContentBlock::Heading { level, .. } => Some(HeadingSize::for_level(*level)),
            _ => None,
        }
    }
}

/// Concatenated text of a span run, styles dropped
pub fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

fn write_cells(f: &mut fmt::Formatter<'_>, cells: &[Vec<Span>]) -> fmt::Result {
    f.write_str("|")?;
    for cell in cells {
        write!(f, " {} |", spans_text(cell))?;
    }
    Ok(())
}

impl fmt::Display for ContentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentBlock::Heading { level, spans } => {
                write!(f, "{} {}", "#".repeat(*level as usize), spans_text(spans))
            }
            ContentBlock::Paragraph { spans } => f.write_str(&spans_text(spans)),
            ContentBlock::List { ordered, items } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    if *ordered {
                        write!(f, "{}. {}", i + 1, spans_text(item))?;
                    } else {
                        write!(f, "- {}", spans_text(item))?;
                    }
                }
                Ok(())
            }
            ContentBlock::Table { header, rows } => {
                write_cells(f, header)?;
                for row in rows {
                    writeln!(f)?;
                    write_cells(f, row)?;
                }
                Ok(())
            }
            ContentBlock::Blockquote { lines } => {
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "> {}", spans_text(line))?;
                }
                Ok(())
            }
            ContentBlock::Spacer => Ok(()),
        }
    }
}
