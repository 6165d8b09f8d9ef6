//! The node tree produced by the builder.
//!
//! Every node remembers enough of its source markup (padding, quote
//! characters, which wiki markup was used, whether a tag was closed
//! implicitly, ...) that formatting a tree with [`Display`](fmt::Display)
//! reproduces the parsed text exactly.

use super::{
    Context, ParseError, Parser, ParserConfig,
    definitions::is_visible,
    helpers::{Filter, StripCode},
    tokens::{HeadingLevel, TextStyle},
    visit::Visitor as _,
};
use crate::common::{named_entity, numeric_entity_value};
use core::fmt::{self, Write as _};
use regex::Regex;
use std::sync::LazyLock;

/// A sequence of nodes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Wikicode {
    /// The nodes.
    pub nodes: Vec<Node>,
}

impl Wikicode {
    /// Creates a new sequence from the given nodes.
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Returns an iterator over the top-level nodes.
    pub fn iter(&self) -> core::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Returns true if there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Renders the sequence as plain text, dropping markup which has no
    /// visible text, decoding entities, and collapsing runs of blank lines.
    pub fn strip_code(&self) -> String {
        static BLANK_LINES: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

        let mut stripper = StripCode::new(String::new());
        if stripper.visit_wikicode(self).is_err() {
            return String::new();
        }
        let text = stripper.finish();
        BLANK_LINES
            .replace_all(text.trim_matches('\n'), "\n\n")
            .into_owned()
    }

    /// Returns every node in the tree, at any depth, for which `predicate`
    /// returns true. Nodes are returned in document order, parents before
    /// their children.
    pub fn filter<F>(&self, predicate: F) -> Vec<&Node>
    where
        F: FnMut(&Node) -> bool,
    {
        let mut filter = Filter::new(predicate);
        let Ok(()) = filter.visit_wikicode(self);
        filter.finish()
    }

    /// Returns every template in the tree, at any depth.
    pub fn templates(&self) -> Vec<&Template> {
        self.filter(|node| matches!(node, Node::Template(_)))
            .into_iter()
            .filter_map(|node| match node {
                Node::Template(template) => Some(template),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Wikicode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.nodes.iter().try_for_each(|node| node.fmt(f))
    }
}

impl<'a> IntoIterator for &'a Wikicode {
    type Item = &'a Node;
    type IntoIter = core::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl From<&str> for Wikicode {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::default()
        } else {
            Self::new(vec![Node::Text(value.into())])
        }
    }
}

/// A node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    /// Plain text.
    Text(String),
    /// `{{name|params}}`
    Template(Template),
    /// `{{{name|default}}}`
    Argument(Argument),
    /// `[[title|text]]`
    Wikilink(Wikilink),
    /// `[url title]` or a free URL.
    ExternalLink(ExternalLink),
    /// `== title ==`
    Heading(Heading),
    /// An HTML tag, or wiki markup which stands in for one.
    Tag(Tag),
    /// `<!-- contents -->`
    Comment(Comment),
    /// `&name;`, `&#nnn;`, or `&#xhhh;`
    HtmlEntity(HtmlEntity),
    /// `''italic''` or `'''bold'''`
    Style(Style),
}

impl Node {
    /// Returns the node's kind as a string.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Text(_) => "Text",
            Node::Template(_) => "Template",
            Node::Argument(_) => "Argument",
            Node::Wikilink(_) => "Wikilink",
            Node::ExternalLink(_) => "ExternalLink",
            Node::Heading(_) => "Heading",
            Node::Tag(_) => "Tag",
            Node::Comment(_) => "Comment",
            Node::HtmlEntity(_) => "HtmlEntity",
            Node::Style(_) => "Style",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => f.write_str(text),
            Node::Template(template) => template.fmt(f),
            Node::Argument(argument) => argument.fmt(f),
            Node::Wikilink(wikilink) => wikilink.fmt(f),
            Node::ExternalLink(link) => link.fmt(f),
            Node::Heading(heading) => heading.fmt(f),
            Node::Tag(tag) => tag.fmt(f),
            Node::Comment(comment) => comment.fmt(f),
            Node::HtmlEntity(entity) => entity.fmt(f),
            Node::Style(style) => style.fmt(f),
        }
    }
}

/// A template transclusion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Template {
    /// The template name.
    pub name: Wikicode,
    /// The parameters, in source order.
    pub params: Vec<Parameter>,
}

impl Template {
    /// Returns the last parameter whose trimmed name is `name`.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        let name = name.trim();
        self.params
            .iter()
            .rev()
            .find(|param| param.name.to_string().trim() == name)
    }

    /// Returns true if there is a parameter named `name`.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}", self.name)?;
        for param in &self.params {
            write!(f, "|{param}")?;
        }
        f.write_str("}}")
    }
}

/// A template parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    /// The parameter name. Positional parameters are named by their
    /// position, starting at 1.
    pub name: Wikicode,
    /// The parameter value.
    pub value: Wikicode,
    /// Whether the name appears in the source.
    pub showkey: bool,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.showkey {
            write!(f, "{}={}", self.name, self.value)
        } else {
            self.value.fmt(f)
        }
    }
}

/// A template argument.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Argument {
    /// The argument name.
    pub name: Wikicode,
    /// The default value.
    pub default: Option<Wikicode>,
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{{{}", self.name)?;
        if let Some(default) = &self.default {
            write!(f, "|{default}")?;
        }
        f.write_str("}}}")
    }
}

/// An internal link.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Wikilink {
    /// The link target.
    pub title: Wikicode,
    /// The link text.
    pub text: Option<Wikicode>,
}

impl fmt::Display for Wikilink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}", self.title)?;
        if let Some(text) = &self.text {
            write!(f, "|{text}")?;
        }
        f.write_str("]]")
    }
}

/// An external link.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExternalLink {
    /// The URL.
    pub url: Wikicode,
    /// The link text.
    pub title: Option<Wikicode>,
    /// Whether the link is enclosed in brackets.
    pub brackets: bool,
    /// Whether the title follows the URL without a space.
    pub suppress_space: bool,
}

impl ExternalLink {
    /// Replaces the URL. The new URL is parsed with external link detection
    /// disabled so that it cannot turn into a nested link.
    pub fn set_url(&mut self, url: &str) -> Result<(), ParseError> {
        let mut parser = Parser::new(&ParserConfig::default());
        self.url = parser.parse(url, Context::EXT_LINK_URI, false)?;
        Ok(())
    }
}

impl fmt::Display for ExternalLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.brackets {
            return self.url.fmt(f);
        }
        write!(f, "[{}", self.url)?;
        if let Some(title) = &self.title {
            if !self.suppress_space {
                f.write_char(' ')?;
            }
            title.fmt(f)?;
        }
        f.write_char(']')
    }
}

/// A section heading.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Heading {
    /// The heading level.
    pub level: HeadingLevel,
    /// The heading text, including any surrounding whitespace.
    pub title: Wikicode,
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let markup = self.level.markup();
        write!(f, "{markup}{}{markup}", self.title)
    }
}

/// An HTML comment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Comment {
    /// The text between `<!--` and `-->`.
    pub contents: String,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<!--{}-->", self.contents)
    }
}

/// An HTML character reference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HtmlEntity {
    /// The entity name, or its digits as written.
    pub value: String,
    /// Whether this is a named reference.
    pub named: bool,
    /// Whether a numeric reference is hexadecimal.
    pub hexadecimal: bool,
    /// The `x` or `X` of a hexadecimal reference.
    pub hex_char: char,
}

impl HtmlEntity {
    /// Returns the text this entity stands for.
    pub fn normalize(&self) -> String {
        if self.named {
            return named_entity(&self.value).map_or_else(|| self.to_string(), Into::into);
        }
        numeric_entity_value(&self.value, self.hexadecimal)
            .and_then(char::from_u32)
            .map_or_else(|| self.to_string(), String::from)
    }
}

impl fmt::Display for HtmlEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.named {
            write!(f, "&{};", self.value)
        } else if self.hexadecimal {
            write!(f, "&#{}{};", self.hex_char, self.value)
        } else {
            write!(f, "&#{};", self.value)
        }
    }
}

/// A run of bold or italic text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Style {
    /// The style.
    pub style: TextStyle,
    /// The styled text.
    pub contents: Wikicode,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let markup = self.style.markup();
        write!(f, "{markup}{}{markup}", self.contents)
    }
}

/// An attribute of an HTML tag or table part.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    /// The attribute name.
    pub name: Wikicode,
    /// The attribute value, if there was an `=`.
    pub value: Option<Wikicode>,
    /// The quote character around the value.
    pub quotes: Option<char>,
    /// Whitespace before the name.
    pub pad_first: String,
    /// Whitespace between the name and `=`.
    pub pad_before_eq: String,
    /// Whitespace between `=` and the value.
    pub pad_after_eq: String,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pad_first, self.name, self.pad_before_eq)?;
        if let Some(value) = &self.value {
            write!(f, "={}", self.pad_after_eq)?;
            match self.quotes {
                Some(quote) => write!(f, "{quote}{value}{quote}")?,
                None => value.fmt(f)?,
            }
        }
        Ok(())
    }
}

/// An HTML tag, or wiki markup which behaves like one (list bullets,
/// horizontal rules, and table parts).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tag {
    /// The tag name.
    pub tag: Wikicode,
    /// The attributes.
    pub attributes: Vec<Attribute>,
    /// The body, if the tag is not self-closing.
    pub contents: Option<Wikicode>,
    /// The wiki markup which opened the tag, like `*` or `{|`.
    pub wiki_markup: Option<String>,
    /// Whether the tag has no body.
    pub self_closing: bool,
    /// Whether the tag was written as a close tag, like `</br>`.
    pub invalid: bool,
    /// Whether a self-closing tag was closed with `>` instead of `/>`, or
    /// never closed at all.
    pub implicit: bool,
    /// Whitespace before the end of the open tag.
    pub padding: String,
    /// The name as written in the close tag.
    pub closing_tag: Option<Wikicode>,
    /// The wiki markup which separates table attributes from contents.
    pub wiki_style_separator: Option<String>,
    /// The wiki markup which closed the tag, like `|}`.
    pub closing_wiki_markup: Option<String>,
}

impl Tag {
    /// Returns the last attribute whose trimmed name is `name`.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        let name = name.trim();
        self.attributes
            .iter()
            .rev()
            .find(|attr| attr.name.to_string().trim() == name)
    }

    /// Returns true if the tag would render as visible text.
    pub fn is_visible(&self) -> bool {
        is_visible(self.tag.to_string().trim())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(markup) = &self.wiki_markup {
            f.write_str(markup)?;
            self.attributes.iter().try_for_each(|attr| attr.fmt(f))?;
            f.write_str(&self.padding)?;
            if let Some(separator) = &self.wiki_style_separator {
                f.write_str(separator)?;
            }
            if !self.self_closing {
                if let Some(contents) = &self.contents {
                    contents.fmt(f)?;
                }
                if let Some(markup) = &self.closing_wiki_markup {
                    f.write_str(markup)?;
                }
            }
            return Ok(());
        }

        write!(f, "{}{}", if self.invalid { "</" } else { "<" }, self.tag)?;
        self.attributes.iter().try_for_each(|attr| attr.fmt(f))?;
        f.write_str(&self.padding)?;
        if self.self_closing {
            return f.write_str(if self.implicit { ">" } else { "/>" });
        }
        f.write_char('>')?;
        if let Some(contents) = &self.contents {
            contents.fmt(f)?;
        }
        f.write_str("</")?;
        if let Some(closing_tag) = &self.closing_tag {
            closing_tag.fmt(f)?;
        }
        f.write_char('>')
    }
}
