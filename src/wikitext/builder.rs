//! Assembles a flat token stream into a node tree.

use super::{
    nodes::{
        Argument, Attribute, Comment, ExternalLink, Heading, HtmlEntity, Node, Parameter, Style,
        Tag, Template, Wikicode, Wikilink,
    },
    tokens::{HeadingLevel, TextStyle, Token},
};

/// A builder contract violation. The token stream given to the builder was
/// not one the tokenizer should ever produce.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A token appeared somewhere it has no meaning.
    #[error("unexpected {token:?} while building {construct}")]
    Unexpected {
        /// The construct being assembled.
        construct: &'static str,
        /// The offending token.
        token: Token,
    },
    /// The stream ended inside a construct.
    #[error("token stream ended inside {0}")]
    Unclosed(&'static str),
    /// A construct which holds only text held something else.
    #[error("{0} contains nested markup")]
    Nested(&'static str),
}

/// An attribute being assembled inside a tag.
#[derive(Debug)]
struct AttributeFrame {
    name: Option<Wikicode>,
    quotes: Option<char>,
    pad_first: String,
    pad_before_eq: String,
    pad_after_eq: String,
}

impl AttributeFrame {
    fn into_token(self) -> Token {
        Token::TagAttrStart {
            pad_first: self.pad_first,
            pad_before_eq: self.pad_before_eq,
            pad_after_eq: self.pad_after_eq,
        }
    }
}

/// A tag being assembled.
#[derive(Debug)]
struct TagFrame {
    name: Option<Wikicode>,
    attributes: Vec<Attribute>,
    contents: Option<Wikicode>,
    wiki_markup: Option<String>,
    invalid: bool,
    padding: String,
    wiki_style_separator: Option<String>,
    closing_wiki_markup: Option<String>,
}

/// The construct a frame is assembling, and what it has collected from its
/// finished slots.
#[derive(Debug)]
enum Kind {
    Root,
    Template {
        name: Option<Wikicode>,
        key: Option<Wikicode>,
        params: Vec<Parameter>,
        position: usize,
    },
    Argument {
        name: Option<Wikicode>,
    },
    Wikilink {
        title: Option<Wikicode>,
    },
    ExternalLink {
        brackets: bool,
        url: Option<Wikicode>,
        suppress_space: bool,
    },
    HtmlEntity {
        numeric: bool,
        hex_char: Option<char>,
    },
    Heading {
        level: HeadingLevel,
    },
    Comment,
    Tag(Box<TagFrame>),
    Attribute(AttributeFrame),
    Style {
        style: TextStyle,
    },
}

impl Kind {
    fn name(&self) -> &'static str {
        match self {
            Kind::Root => "the root",
            Kind::Template { .. } => "a template",
            Kind::Argument { .. } => "an argument",
            Kind::Wikilink { .. } => "a wikilink",
            Kind::ExternalLink { .. } => "an external link",
            Kind::HtmlEntity { .. } => "an HTML entity",
            Kind::Heading { .. } => "a heading",
            Kind::Comment => "a comment",
            Kind::Tag(_) => "a tag",
            Kind::Attribute(_) => "a tag attribute",
            Kind::Style { .. } => "a text style",
        }
    }
}

/// An in-progress node. `slot` collects the children of whichever part of
/// the node is currently being filled.
#[derive(Debug)]
struct Frame {
    kind: Kind,
    slot: Vec<Node>,
}

impl Frame {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            slot: Vec::new(),
        }
    }

    fn take_slot(&mut self) -> Wikicode {
        Wikicode::new(core::mem::take(&mut self.slot))
    }
}

/// Returns the text of a part which is always plain text.
fn plain_text(part: Wikicode, construct: &'static str) -> Result<String, BuildError> {
    part.nodes.into_iter().try_fold(String::new(), |mut text, node| {
        let Node::Text(part) = node else {
            return Err(BuildError::Nested(construct));
        };
        text += &part;
        Ok(text)
    })
}

/// Appends a node, merging adjacent text.
fn push_node(slot: &mut Vec<Node>, node: Node) {
    match (slot.last_mut(), node) {
        (Some(Node::Text(last)), Node::Text(text)) => last.push_str(&text),
        (_, Node::Text(text)) if text.is_empty() => {}
        (_, node) => slot.push(node),
    }
}

/// Turns a token stream into a tree.
#[derive(Debug)]
pub struct Builder {
    stack: Vec<Frame>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            stack: vec![Frame::new(Kind::Root)],
        }
    }

    /// Consumes `tokens` and returns the tree they describe.
    pub fn build(mut self, tokens: Vec<Token>) -> Result<Wikicode, BuildError> {
        for token in tokens {
            self.handle(token)?;
        }

        match self.stack.pop() {
            Some(mut root) if self.stack.is_empty() && matches!(root.kind, Kind::Root) => {
                Ok(root.take_slot())
            }
            Some(frame) => Err(BuildError::Unclosed(frame.kind.name())),
            None => Err(BuildError::Unclosed("the root")),
        }
    }

    fn top(&mut self) -> &mut Frame {
        // The root frame is only removed by `build`.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn write(&mut self, node: Node) {
        push_node(&mut self.top().slot, node);
    }

    fn open(&mut self, kind: Kind) {
        self.stack.push(Frame::new(kind));
    }

    /// Pops the finished top frame, writing `node` into its parent.
    fn close(&mut self, node: Node) {
        self.stack.pop();
        self.write(node);
    }

    fn handle(&mut self, token: Token) -> Result<(), BuildError> {
        // Attributes have no close token of their own. The token which ends
        // one is handled again by the enclosing tag.
        if matches!(self.top().kind, Kind::Attribute(_))
            && matches!(
                token,
                Token::TagAttrStart { .. }
                    | Token::TagCloseOpen { .. }
                    | Token::TagCloseSelfclose { .. }
            )
        {
            self.finish_attribute()?;
        }

        match token {
            Token::Text { text } => self.write(Node::Text(text)),

            Token::TemplateOpen => self.open(Kind::Template {
                name: None,
                key: None,
                params: Vec::new(),
                position: 1,
            }),
            Token::ArgumentOpen => self.open(Kind::Argument { name: None }),
            Token::WikilinkOpen => self.open(Kind::Wikilink { title: None }),
            Token::ExternalLinkOpen { brackets } => self.open(Kind::ExternalLink {
                brackets,
                url: None,
                suppress_space: false,
            }),
            Token::HtmlEntityStart => self.open(Kind::HtmlEntity {
                numeric: false,
                hex_char: None,
            }),
            Token::HeadingStart { level } => self.open(Kind::Heading { level }),
            Token::CommentStart => self.open(Kind::Comment),
            Token::StyleOpen { style } => self.open(Kind::Style { style }),
            Token::TagOpenOpen {
                wiki_markup,
                invalid,
            } => self.open(Kind::Tag(Box::new(TagFrame {
                name: None,
                attributes: Vec::new(),
                contents: None,
                closing_wiki_markup: wiki_markup.clone(),
                wiki_markup,
                invalid,
                padding: String::new(),
                wiki_style_separator: None,
            }))),

            Token::TagAttrStart {
                pad_first,
                pad_before_eq,
                pad_after_eq,
            } => self.open_attribute(AttributeFrame {
                name: None,
                quotes: None,
                pad_first,
                pad_before_eq,
                pad_after_eq,
            })?,

            token => self.handle_inner(token)?,
        }
        Ok(())
    }

    /// Starts an attribute of the tag on top of the stack. The text written
    /// so far is the tag name.
    fn open_attribute(&mut self, attr: AttributeFrame) -> Result<(), BuildError> {
        let frame = self.top();
        let construct = frame.kind.name();
        let slot = frame.take_slot();
        let Kind::Tag(tag) = &mut frame.kind else {
            return Err(BuildError::Unexpected {
                construct,
                token: attr.into_token(),
            });
        };
        if tag.contents.is_some() || (tag.name.is_some() && !slot.is_empty()) {
            return Err(BuildError::Unexpected {
                construct,
                token: attr.into_token(),
            });
        }
        if tag.name.is_none() {
            tag.name = Some(slot);
        }
        self.open(Kind::Attribute(attr));
        Ok(())
    }

    /// Handles separator and close tokens, which act on the top frame.
    fn handle_inner(&mut self, token: Token) -> Result<(), BuildError> {
        let frame = self.top();
        let slot = frame.take_slot();
        let node = match (&mut frame.kind, token) {
            (Kind::Template { name, key, .. }, Token::TemplateParamEquals)
                if name.is_some() && key.is_none() =>
            {
                *key = Some(slot);
                return Ok(());
            }
            (
                Kind::Template {
                    name,
                    key,
                    params,
                    position,
                },
                token @ (Token::TemplateParamSeparator | Token::TemplateClose),
            ) => {
                if name.is_none() {
                    *name = Some(slot);
                } else {
                    params.push(match key.take() {
                        Some(key) => Parameter {
                            name: key,
                            value: slot,
                            showkey: true,
                        },
                        None => {
                            let name = Wikicode::from(position.to_string().as_str());
                            *position += 1;
                            Parameter {
                                name,
                                value: slot,
                                showkey: false,
                            }
                        }
                    });
                }
                if matches!(token, Token::TemplateParamSeparator) {
                    return Ok(());
                }
                Node::Template(Template {
                    name: name.take().unwrap_or_default(),
                    params: core::mem::take(params),
                })
            }

            (Kind::Argument { name }, Token::ArgumentSeparator) if name.is_none() => {
                *name = Some(slot);
                return Ok(());
            }
            (Kind::Argument { name }, Token::ArgumentClose) => match name.take() {
                Some(name) => Node::Argument(Argument {
                    name,
                    default: Some(slot),
                }),
                None => Node::Argument(Argument {
                    name: slot,
                    default: None,
                }),
            },

            (Kind::Wikilink { title }, Token::WikilinkSeparator) if title.is_none() => {
                *title = Some(slot);
                return Ok(());
            }
            (Kind::Wikilink { title }, Token::WikilinkClose) => match title.take() {
                Some(title) => Node::Wikilink(Wikilink {
                    title,
                    text: Some(slot),
                }),
                None => Node::Wikilink(Wikilink {
                    title: slot,
                    text: None,
                }),
            },

            (
                Kind::ExternalLink {
                    url,
                    suppress_space,
                    ..
                },
                Token::ExternalLinkSeparator {
                    suppress_space: suppress,
                },
            ) if url.is_none() => {
                *url = Some(slot);
                *suppress_space = suppress;
                return Ok(());
            }
            (
                Kind::ExternalLink {
                    brackets,
                    url,
                    suppress_space,
                },
                Token::ExternalLinkClose,
            ) => {
                let (url, title) = match url.take() {
                    Some(url) => (url, Some(slot)),
                    None => (slot, None),
                };
                Node::ExternalLink(ExternalLink {
                    url,
                    title,
                    brackets: *brackets,
                    suppress_space: *suppress_space,
                })
            }

            (Kind::HtmlEntity { numeric, hex_char }, Token::HtmlEntityNumeric)
                if slot.is_empty() && !*numeric && hex_char.is_none() =>
            {
                *numeric = true;
                return Ok(());
            }
            (Kind::HtmlEntity { numeric, hex_char }, Token::HtmlEntityHex { char })
                if slot.is_empty() && *numeric && hex_char.is_none() =>
            {
                *hex_char = Some(char);
                return Ok(());
            }
            (Kind::HtmlEntity { numeric, hex_char }, Token::HtmlEntityEnd) => {
                Node::HtmlEntity(HtmlEntity {
                    value: plain_text(slot, "an HTML entity")?,
                    named: !*numeric,
                    hexadecimal: hex_char.is_some(),
                    hex_char: hex_char.unwrap_or('x'),
                })
            }

            (Kind::Heading { level }, Token::HeadingEnd) => Node::Heading(Heading {
                level: *level,
                title: slot,
            }),

            (Kind::Comment, Token::CommentEnd) => Node::Comment(Comment {
                contents: plain_text(slot, "a comment")?,
            }),

            (Kind::Style { style }, Token::StyleClose) => Node::Style(Style {
                style: *style,
                contents: slot,
            }),

            (Kind::Tag(tag), token) => {
                let Some(node) = Self::handle_tag(tag, slot, token)? else {
                    return Ok(());
                };
                node
            }

            (Kind::Attribute(attr), Token::TagAttrEquals) if attr.name.is_none() => {
                attr.name = Some(slot);
                return Ok(());
            }
            (Kind::Attribute(attr), Token::TagAttrQuote { char })
                if attr.name.is_some() && attr.quotes.is_none() && slot.is_empty() =>
            {
                attr.quotes = Some(char);
                return Ok(());
            }

            (kind, token) => {
                return Err(BuildError::Unexpected {
                    construct: kind.name(),
                    token,
                });
            }
        };
        self.close(node);
        Ok(())
    }

    /// Handles a token inside a tag. Returns the finished tag when the token
    /// closes it.
    fn handle_tag(
        tag: &mut TagFrame,
        slot: Wikicode,
        token: Token,
    ) -> Result<Option<Node>, BuildError> {
        match token {
            Token::TagCloseOpen {
                wiki_markup,
                padding,
            } if tag.contents.is_none() => {
                if tag.name.is_none() {
                    tag.name = Some(slot);
                }
                tag.wiki_style_separator = wiki_markup;
                tag.padding = padding;
                tag.contents = Some(Wikicode::default());
                Ok(None)
            }
            Token::TagOpenClose { wiki_markup } if tag.contents.is_some() => {
                tag.closing_wiki_markup = wiki_markup;
                tag.contents = Some(slot);
                Ok(None)
            }
            Token::TagCloseSelfclose { padding, implicit } if tag.contents.is_none() => {
                let name = tag.name.take().unwrap_or(slot);
                Ok(Some(Node::Tag(Tag {
                    tag: name,
                    attributes: core::mem::take(&mut tag.attributes),
                    contents: None,
                    wiki_markup: tag.wiki_markup.take(),
                    self_closing: true,
                    invalid: tag.invalid,
                    implicit,
                    padding,
                    closing_tag: None,
                    wiki_style_separator: tag.wiki_style_separator.take(),
                    closing_wiki_markup: tag.closing_wiki_markup.take(),
                })))
            }
            Token::TagCloseClose if tag.contents.is_some() => Ok(Some(Node::Tag(Tag {
                tag: tag.name.take().unwrap_or_default(),
                attributes: core::mem::take(&mut tag.attributes),
                contents: tag.contents.take(),
                wiki_markup: tag.wiki_markup.take(),
                self_closing: false,
                invalid: tag.invalid,
                implicit: false,
                padding: core::mem::take(&mut tag.padding),
                closing_tag: Some(slot),
                wiki_style_separator: tag.wiki_style_separator.take(),
                closing_wiki_markup: tag.closing_wiki_markup.take(),
            }))),
            token => Err(BuildError::Unexpected {
                construct: "a tag",
                token,
            }),
        }
    }

    /// Finishes the attribute on top of the stack and attaches it to its tag.
    fn finish_attribute(&mut self) -> Result<(), BuildError> {
        let Some(mut frame) = self.stack.pop() else {
            return Err(BuildError::Unclosed("a tag attribute"));
        };
        let slot = frame.take_slot();
        let Kind::Attribute(attr) = frame.kind else {
            return Err(BuildError::Unclosed(frame.kind.name()));
        };
        let (name, value) = match attr.name {
            Some(name) => (name, Some(slot)),
            None => (slot, None),
        };
        let Kind::Tag(tag) = &mut self.top().kind else {
            return Err(BuildError::Unclosed("a tag attribute"));
        };
        tag.attributes.push(Attribute {
            name,
            value,
            quotes: attr.quotes,
            pad_first: attr.pad_first,
            pad_before_eq: attr.pad_before_eq,
            pad_after_eq: attr.pad_after_eq,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(text: &str) -> Token {
        Token::text(text)
    }

    #[test]
    fn merges_text() {
        let tree = Builder::new()
            .build(vec![text("a"), text(""), text("b")])
            .unwrap();
        assert_eq!(tree.nodes, [Node::Text("ab".into())]);
    }

    #[test]
    fn template_params() {
        let tree = Builder::new()
            .build(vec![
                Token::TemplateOpen,
                text("foo"),
                Token::TemplateParamSeparator,
                text("a"),
                Token::TemplateParamSeparator,
                text("k"),
                Token::TemplateParamEquals,
                text("v"),
                Token::TemplateParamSeparator,
                text("b"),
                Token::TemplateClose,
            ])
            .unwrap();
        let [Node::Template(template)] = tree.nodes.as_slice() else {
            panic!("expected one template, got {tree:?}");
        };
        let names = template
            .params
            .iter()
            .map(|param| (param.name.to_string(), param.showkey))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                ("1".to_string(), false),
                ("k".to_string(), true),
                ("2".to_string(), false)
            ]
        );
        assert_eq!(tree.to_string(), "{{foo|a|k=v|b}}");
    }

    #[test]
    fn tag_attributes() {
        let tree = Builder::new()
            .build(vec![
                Token::TagOpenOpen {
                    wiki_markup: None,
                    invalid: false,
                },
                text("span"),
                Token::TagAttrStart {
                    pad_first: " ".into(),
                    pad_before_eq: String::new(),
                    pad_after_eq: String::new(),
                },
                text("a"),
                Token::TagAttrEquals,
                Token::TagAttrQuote { char: '"' },
                text("b c"),
                Token::TagAttrStart {
                    pad_first: " ".into(),
                    pad_before_eq: String::new(),
                    pad_after_eq: String::new(),
                },
                text("d"),
                Token::TagCloseOpen {
                    wiki_markup: None,
                    padding: String::new(),
                },
                text("x"),
                Token::TagOpenClose { wiki_markup: None },
                text("SPAN"),
                Token::TagCloseClose,
            ])
            .unwrap();
        let [Node::Tag(tag)] = tree.nodes.as_slice() else {
            panic!("expected one tag, got {tree:?}");
        };
        assert_eq!(tag.attributes.len(), 2);
        assert_eq!(tag.attributes[0].quotes, Some('"'));
        assert_eq!(tag.attributes[1].value, None);
        assert_eq!(tree.to_string(), r#"<span a="b c" d>x</SPAN>"#);
    }

    #[test]
    fn unbalanced() {
        assert!(matches!(
            Builder::new().build(vec![Token::TemplateOpen, text("a")]),
            Err(BuildError::Unclosed("a template"))
        ));
        assert!(matches!(
            Builder::new().build(vec![text("a"), Token::WikilinkClose]),
            Err(BuildError::Unexpected {
                construct: "the root",
                token: Token::WikilinkClose,
            })
        ));
        assert!(matches!(
            Builder::new().build(vec![
                Token::CommentStart,
                Token::StyleOpen {
                    style: TextStyle::Bold
                },
                Token::StyleClose,
                Token::CommentEnd,
            ]),
            Err(BuildError::Nested("a comment"))
        ));
    }
}
