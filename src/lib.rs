//! A lossless parser for MediaWiki wikitext.
//!
//! ```
//! let code = wikitree::parse("{{greeting|name=world}} and [[a link|text]]").unwrap();
//! assert_eq!(code.to_string(), "{{greeting|name=world}} and [[a link|text]]");
//! assert_eq!(code.templates()[0].get("name").unwrap().value.to_string(), "world");
//! ```

mod common;
pub mod wikitext;

pub use wikitext::{Context, ParseError, Parser, ParserConfig, Wikicode, parse};
