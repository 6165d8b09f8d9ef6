//! The token vocabulary shared by the tokenizer and the builder.
//!
//! Tokens are a flat stream. Every construct the tokenizer recognises appears
//! as an open token, optional separator tokens, and a close token, nesting like
//! parentheses. A construct which failed to parse does not appear at all; its
//! source text is part of an ordinary [`Token::Text`] instead.

use serde::Serialize;

/// A single token emitted by the tokenizer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Token {
    /// A run of plain text.
    Text {
        /// The text.
        text: String,
    },

    /// `{{`
    TemplateOpen,
    /// `|` between template parameters.
    TemplateParamSeparator,
    /// `=` between a template parameter name and its value.
    TemplateParamEquals,
    /// `}}`
    TemplateClose,

    /// `{{{`
    ArgumentOpen,
    /// `|` between an argument name and its default.
    ArgumentSeparator,
    /// `}}}`
    ArgumentClose,

    /// `[[`
    WikilinkOpen,
    /// `|` between a wikilink title and its text.
    WikilinkSeparator,
    /// `]]`
    WikilinkClose,

    /// The start of an external link, either `[` or nothing for a free link.
    ExternalLinkOpen {
        /// Whether the link is enclosed in brackets.
        brackets: bool,
    },
    /// The whitespace between the URL and title of a bracketed link.
    ExternalLinkSeparator {
        /// If true, the title starts immediately after the URL with no
        /// separating space.
        suppress_space: bool,
    },
    /// The end of an external link.
    ExternalLinkClose,

    /// `&`
    HtmlEntityStart,
    /// `#`
    HtmlEntityNumeric,
    /// `x` or `X` after `&#`.
    HtmlEntityHex {
        /// The hex marker as written.
        char: char,
    },
    /// `;`
    HtmlEntityEnd,

    /// A run of `=` at the start of a line.
    HeadingStart {
        /// The heading level.
        level: HeadingLevel,
    },
    /// The closing run of `=`.
    HeadingEnd,

    /// `<!--`
    CommentStart,
    /// `-->`
    CommentEnd,

    /// `<`, or the wiki markup which stands in for an HTML tag.
    TagOpenOpen {
        /// The wiki markup for list bullets, rules, and table parts.
        wiki_markup: Option<String>,
        /// Whether this is a stray close tag of a void element, like `</br>`.
        invalid: bool,
    },
    /// The start of a tag attribute.
    TagAttrStart {
        /// Whitespace before the attribute name.
        pad_first: String,
        /// Whitespace between the name and `=`.
        pad_before_eq: String,
        /// Whitespace between `=` and the value.
        pad_after_eq: String,
    },
    /// `=` in a tag attribute.
    TagAttrEquals,
    /// The opening quote of a quoted tag attribute value.
    TagAttrQuote {
        /// The quote character.
        char: char,
    },
    /// `>` after the tag name and attributes.
    TagCloseOpen {
        /// The separator markup between table attributes and content.
        wiki_markup: Option<String>,
        /// Whitespace before the `>`.
        padding: String,
    },
    /// `/>`, or the implicit end of a void element.
    TagCloseSelfclose {
        /// Whitespace before the `/>`.
        padding: String,
        /// If true, the tag was closed with `>` instead of `/>`.
        implicit: bool,
    },
    /// `</`, or the wiki markup which closes a table.
    TagOpenClose {
        /// The closing wiki markup.
        wiki_markup: Option<String>,
    },
    /// `>` after the closing tag name.
    TagCloseClose,

    /// `''` or `'''`.
    StyleOpen {
        /// The style being opened.
        style: TextStyle,
    },
    /// The end of a style run.
    StyleClose,
}

impl Token {
    /// Creates a new [`Token::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns the role this token plays in the nesting of the stream.
    pub(crate) fn nesting(&self) -> Nesting {
        use Construct as C;
        match self {
            Self::Text { .. } => Nesting::Leaf,
            Self::TemplateOpen => Nesting::Open(C::Template),
            Self::TemplateParamSeparator | Self::TemplateParamEquals => Nesting::Inner(C::Template),
            Self::TemplateClose => Nesting::Close(C::Template),
            Self::ArgumentOpen => Nesting::Open(C::Argument),
            Self::ArgumentSeparator => Nesting::Inner(C::Argument),
            Self::ArgumentClose => Nesting::Close(C::Argument),
            Self::WikilinkOpen => Nesting::Open(C::Wikilink),
            Self::WikilinkSeparator => Nesting::Inner(C::Wikilink),
            Self::WikilinkClose => Nesting::Close(C::Wikilink),
            Self::ExternalLinkOpen { .. } => Nesting::Open(C::ExternalLink),
            Self::ExternalLinkSeparator { .. } => Nesting::Inner(C::ExternalLink),
            Self::ExternalLinkClose => Nesting::Close(C::ExternalLink),
            Self::HtmlEntityStart => Nesting::Open(C::HtmlEntity),
            Self::HtmlEntityNumeric | Self::HtmlEntityHex { .. } => Nesting::Inner(C::HtmlEntity),
            Self::HtmlEntityEnd => Nesting::Close(C::HtmlEntity),
            Self::HeadingStart { .. } => Nesting::Open(C::Heading),
            Self::HeadingEnd => Nesting::Close(C::Heading),
            Self::CommentStart => Nesting::Open(C::Comment),
            Self::CommentEnd => Nesting::Close(C::Comment),
            Self::TagOpenOpen { .. } => Nesting::Open(C::Tag),
            Self::TagAttrStart { .. }
            | Self::TagAttrEquals
            | Self::TagAttrQuote { .. }
            | Self::TagCloseOpen { .. }
            | Self::TagOpenClose { .. } => Nesting::Inner(C::Tag),
            Self::TagCloseSelfclose { .. } | Self::TagCloseClose => Nesting::Close(C::Tag),
            Self::StyleOpen { .. } => Nesting::Open(C::Style),
            Self::StyleClose => Nesting::Close(C::Style),
        }
    }
}

/// A construct delimited by open and close tokens.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Construct {
    Template,
    Argument,
    Wikilink,
    ExternalLink,
    HtmlEntity,
    Heading,
    Comment,
    Tag,
    Style,
}

/// The nesting role of a token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Nesting {
    /// Opens a construct.
    Open(Construct),
    /// Separates parts of the innermost open construct.
    Inner(Construct),
    /// Closes the innermost open construct.
    Close(Construct),
    /// Plain content.
    Leaf,
}

/// A conversion error for out-of-range heading levels.
#[derive(Debug, thiserror::Error)]
#[error("{0} is not a valid heading level")]
pub struct HeadingRangeError(u8);

/// A heading level.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Returns the `=` run which delimits a heading of this level.
    pub fn markup(self) -> &'static str {
        const MARKUP: [&str; 6] = ["=", "==", "===", "====", "=====", "======"];
        MARKUP[usize::from(self.0) - 1]
    }
}

impl From<HeadingLevel> for u8 {
    fn from(value: HeadingLevel) -> Self {
        value.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = HeadingRangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=6).contains(&value) {
            Ok(Self(value))
        } else {
            Err(HeadingRangeError(value))
        }
    }
}

/// A wikitext text style.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    /// Bold text, `'''`.
    Bold,
    /// Italic text, `''`.
    Italic,
}

impl TextStyle {
    /// Returns the apostrophe run which delimits this style.
    pub fn markup(self) -> &'static str {
        match self {
            Self::Bold => "'''",
            Self::Italic => "''",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_level_range() {
        assert!(HeadingLevel::try_from(0).is_err());
        assert!(HeadingLevel::try_from(7).is_err());
        let level = HeadingLevel::try_from(3).unwrap();
        assert_eq!(level.markup(), "===");
        assert_eq!(u8::from(level), 3);
    }

    #[test]
    fn serialize() {
        let json = serde_json::to_string(&[
            Token::HeadingStart {
                level: HeadingLevel::try_from(2).unwrap(),
            },
            Token::text("x"),
            Token::StyleOpen {
                style: TextStyle::Bold,
            },
        ])
        .unwrap();
        assert_eq!(
            json,
            r#"[{"type":"HeadingStart","level":2},{"type":"Text","text":"x"},{"type":"StyleOpen","style":"bold"}]"#
        );
    }
}
