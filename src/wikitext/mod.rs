//! Wikitext parser.
//!
//! Parsing happens in two passes. A [`Tokenizer`] turns the text into a flat
//! stream of [`Token`]s, and a [`Builder`] assembles that stream into a tree
//! of [`Node`]s. Markup which cannot be parsed becomes text, so parsing never
//! fails on user input, and formatting the tree always reproduces the input
//! exactly.

pub use builder::{BuildError, Builder};
pub use codemap::{FileMap, LineCol, Span};
pub use config::{ParserConfig, TOKENIZER_ENV, TokenizerBackend, UnknownBackend};
pub use contexts::Context;
pub use inspectors::inspect;
pub use nodes::{
    Argument, Attribute, Comment, ExternalLink, Heading, HtmlEntity, Node, Parameter, Style, Tag,
    Template, Wikicode, Wikilink,
};
pub use tokenizer::{MAX_CYCLES, MAX_DEPTH, Tokenizer, TokenizerError};
pub use tokens::{HeadingLevel, HeadingRangeError, TextStyle, Token};

use tokens::Nesting;

mod builder;
mod codemap;
mod config;
mod contexts;
pub mod definitions;
pub mod helpers;
mod inspectors;
mod nodes;
#[cfg(test)]
mod tests;
mod tokenizer;
mod tokens;
pub mod visit;

/// An internal parser error. These are never caused by bad input.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The tokenizer broke its contract.
    #[error("This is a bug and should be reported. Info: {0}.")]
    Tokenizer(#[from] TokenizerError),
    /// The builder was given a stream it could not assemble.
    #[error("This is a bug and should be reported. Info: {0}.")]
    Build(#[from] BuildError),
}

/// A tokenizer backend.
pub trait Tokenize: core::fmt::Debug {
    /// Splits `text` into tokens, starting in the given context.
    fn tokenize(
        &mut self,
        text: &str,
        context: Context,
        skip_style_tags: bool,
    ) -> Result<Vec<Token>, TokenizerError>;
}

impl Tokenize for Tokenizer {
    fn tokenize(
        &mut self,
        text: &str,
        context: Context,
        skip_style_tags: bool,
    ) -> Result<Vec<Token>, TokenizerError> {
        Tokenizer::tokenize(self, text, context, skip_style_tags)
    }
}

/// A tokenizer which verifies that the output of another tokenizer nests
/// correctly before returning it.
#[derive(Debug, Default)]
pub struct CheckedTokenizer<T = Tokenizer>(T);

impl<T> CheckedTokenizer<T> {
    /// Wraps `inner`.
    pub fn new(inner: T) -> Self {
        Self(inner)
    }
}

impl<T: Tokenize> Tokenize for CheckedTokenizer<T> {
    fn tokenize(
        &mut self,
        text: &str,
        context: Context,
        skip_style_tags: bool,
    ) -> Result<Vec<Token>, TokenizerError> {
        let tokens = self.0.tokenize(text, context, skip_style_tags)?;
        verify_balanced(&tokens)?;
        Ok(tokens)
    }
}

/// Checks that every open token has a matching close token, and that
/// separators only appear directly inside their own construct.
fn verify_balanced(tokens: &[Token]) -> Result<(), TokenizerError> {
    let mut open = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        match token.nesting() {
            Nesting::Open(construct) => open.push(construct),
            Nesting::Inner(construct) if open.last() == Some(&construct) => {}
            Nesting::Close(construct) if open.last() == Some(&construct) => {
                open.pop();
            }
            Nesting::Leaf => {}
            Nesting::Inner(_) | Nesting::Close(_) => {
                return Err(TokenizerError::Unbalanced(format!(
                    "{token:?} at index {index} inside {:?}",
                    open.last()
                )));
            }
        }
    }
    match open.last() {
        Some(construct) => Err(TokenizerError::Unbalanced(format!(
            "{construct:?} left open at end of stream"
        ))),
        None => Ok(()),
    }
}

/// A Wikitext parser.
#[derive(Debug)]
pub struct Parser {
    /// The tokenizer backend.
    tokenizer: Box<dyn Tokenize>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(&ParserConfig::default())
    }
}

impl Parser {
    /// Creates a new parser with the given configuration.
    pub fn new(config: &ParserConfig) -> Self {
        log::debug!("using the {} tokenizer", config.backend);
        let tokenizer: Box<dyn Tokenize> = match config.backend {
            TokenizerBackend::Portable => Box::new(Tokenizer::new()),
            TokenizerBackend::Checked => Box::new(CheckedTokenizer::<Tokenizer>::default()),
        };
        Self { tokenizer }
    }

    /// Creates a new parser which uses the given tokenizer.
    pub fn with_tokenizer(tokenizer: Box<dyn Tokenize>) -> Self {
        Self { tokenizer }
    }

    /// Splits `text` into tokens without building a tree.
    pub fn tokenize(
        &mut self,
        text: &str,
        context: Context,
        skip_style_tags: bool,
    ) -> Result<Vec<Token>, ParseError> {
        Ok(self.tokenizer.tokenize(text, context, skip_style_tags)?)
    }

    /// Parses `text` into a node tree, starting in the given context.
    ///
    /// If `skip_style_tags` is true, apostrophes are never treated as bold or
    /// italic markup.
    pub fn parse(
        &mut self,
        text: &str,
        context: Context,
        skip_style_tags: bool,
    ) -> Result<Wikicode, ParseError> {
        let tokens = self.tokenize(text, context, skip_style_tags)?;
        let token_count = tokens.len();
        let code = Builder::new().build(tokens)?;
        log::debug!(
            "built {} top-level nodes from {token_count} tokens",
            code.nodes.len()
        );
        Ok(code)
    }
}

/// Parses `text` with a default parser.
pub fn parse(text: &str) -> Result<Wikicode, ParseError> {
    Parser::default().parse(text, Context::empty(), false)
}

/// A tree which does not format back to its source text.
#[derive(Debug, thiserror::Error)]
#[error("output differs from input at {at}")]
pub struct RoundTripError {
    /// Where the first difference is in the source text.
    pub at: LineCol,
}

/// Checks that `tree` formats back to exactly `source`.
pub fn check_round_trip(source: &str, tree: &Wikicode) -> Result<(), RoundTripError> {
    let output = tree.to_string();
    if output == source {
        return Ok(());
    }

    let offset = source
        .char_indices()
        .zip(output.chars())
        .find_map(|((index, a), b)| (a != b).then_some(index))
        .unwrap_or(source.len().min(output.len()));
    Err(RoundTripError {
        at: FileMap::new(source).find_line_col(offset),
    })
}
