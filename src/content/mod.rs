//! Reply content parsing
//!
//! Converts a raw reply string into typed [`ContentBlock`]s without a general
//! markdown library. Rendering the blocks is left to the consumer.

pub mod blocks;
pub mod inline;
pub mod parser;

pub use blocks::{spans_text, ContentBlock, HeadingSize, Span, SpanStyle};
pub use inline::parse_inline;
pub use parser::{parse_reply, ContentParser};
