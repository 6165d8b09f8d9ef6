//! HTML tags.

use super::{Halt, Route, Tokenizer, TokenizerError, is_marker};
use crate::wikitext::{
    contexts::Context,
    definitions::{is_parsable, is_single_only},
    tokens::Token,
};

bitflags::bitflags! {
    /// The state of the scanner inside an open tag.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub(super) struct TagState: u8 {
        const NAME = 1 << 0;
        const ATTR_READY = 1 << 1;
        const ATTR_NAME = 1 << 2;
        const ATTR_VALUE = 1 << 3;
        const QUOTED = 1 << 4;
        const NOTE_SPACE = 1 << 5;
        const NOTE_EQUALS = 1 << 6;
        const NOTE_QUOTE = 1 << 7;
    }
}

/// Whitespace collected around the current attribute.
#[derive(Debug, Default)]
pub(super) struct Padding {
    pub first: String,
    pub before_eq: String,
    pub after_eq: String,
}

/// Scratch state for an open tag or table attribute list.
#[derive(Debug)]
pub(super) struct TagData {
    pub state: TagState,
    pub padding: Padding,
    /// The quote character of the current quoted value.
    quoter: char,
    /// Where the current quoted value started.
    pub reset: usize,
}

impl TagData {
    pub fn new(state: TagState) -> Self {
        Self {
            state,
            padding: Padding::default(),
            quoter: '"',
            reset: 0,
        }
    }

    /// Returns true if a `>` (or other terminator) at the cursor would end
    /// the tag.
    fn can_exit(&self) -> bool {
        !self.state.intersects(TagState::QUOTED | TagState::NAME)
            || self.state.contains(TagState::NOTE_SPACE)
    }

    /// Like [`Self::can_exit`], for attribute lists without a name.
    pub fn can_exit_attrs(&self) -> bool {
        !self.state.contains(TagState::QUOTED) || self.state.contains(TagState::NOTE_SPACE)
    }
}

/// Normalises a tag name for comparison.
fn strip_tag_name(name: &str) -> String {
    name.trim_end().to_lowercase()
}

impl Tokenizer {
    /// Returns the name of the tag whose frame is on top of the stack.
    pub(super) fn tag_name(&self) -> Result<String, TokenizerError> {
        let start = self.frames.last().map_or(0, |frame| frame.start);
        match self.tokens.get(start + 1) {
            Some(Token::Text { text }) => Ok(text.clone()),
            _ => Err(TokenizerError::MissingTagName),
        }
    }

    /// Parses an HTML tag starting at `<`, or emits `<` as text.
    pub(super) fn parse_tag(&mut self) -> Route<()> {
        let reset = self.head;
        self.head += 1;
        match self.attempt(Self::really_parse_tag)? {
            Ok(tag) => self.emit_all(tag),
            Err(_) => {
                self.head = reset;
                self.emit_char('<');
            }
        }
        Ok(())
    }

    fn really_parse_tag(&mut self) -> Route<Vec<Token>> {
        let mut data = TagData::new(TagState::NAME);
        self.push(Context::TAG_OPEN)?;
        self.emit(Token::TagOpenOpen {
            wiki_markup: None,
            invalid: false,
        });

        loop {
            let this = self.read(0);
            let next = self.read(1);
            let can_exit = data.can_exit();

            match this {
                None => {
                    if self.context().contains(Context::TAG_ATTR) {
                        if data.state.contains(TagState::QUOTED) {
                            // An unclosed quote is retried as an unquoted
                            // value.
                            data.state = TagState::ATTR_VALUE;
                            self.memoize_bad_route();
                            self.discard()?;
                            self.head = data.reset;
                            continue;
                        }
                        self.discard()?;
                    }
                    return Err(self.fail_route());
                }
                Some('>') if can_exit => {
                    self.handle_tag_close_open(&mut data, false)?;
                    self.set_context(Context::TAG_BODY);
                    let name = self.tag_name()?;
                    if is_single_only(&name) {
                        return self.handle_single_only_tag_end();
                    }
                    if is_parsable(&name) {
                        return self.parse_body();
                    }
                    return self.handle_blacklisted_tag(&name);
                }
                Some('/') if next == Some('>') && can_exit => {
                    self.handle_tag_close_open(&mut data, true)?;
                    return Ok(self.pop()?);
                }
                Some(this) => self.handle_tag_data(&mut data, this)?,
            }
            self.head += 1;
        }
    }

    /// Writes the end of the open tag.
    fn handle_tag_close_open(&mut self, data: &mut TagData, self_closing: bool) -> Route<()> {
        if data
            .state
            .intersects(TagState::ATTR_NAME | TagState::ATTR_VALUE)
        {
            self.push_tag_buffer(data)?;
        }
        let padding = core::mem::take(&mut data.padding.first);
        self.emit(if self_closing {
            Token::TagCloseSelfclose {
                padding,
                implicit: false,
            }
        } else {
            Token::TagCloseOpen {
                wiki_markup: None,
                padding,
            }
        });
        self.head += 1;
        Ok(())
    }

    /// Handles one character of an open tag or attribute list.
    pub(super) fn handle_tag_data(&mut self, data: &mut TagData, this: char) -> Route<()> {
        if data.state.contains(TagState::NAME) {
            let first_time = !data.state.contains(TagState::NOTE_SPACE);
            if is_marker(Some(this)) || (this.is_whitespace() && first_time) {
                // Names must start with text.
                return Err(self.fail_route());
            } else if first_time {
                data.state.insert(TagState::NOTE_SPACE);
            } else if this.is_whitespace() {
                data.state = TagState::ATTR_READY;
                return self.handle_tag_space(data, this);
            }
        } else if this.is_whitespace() {
            return self.handle_tag_space(data, this);
        } else if data.state.contains(TagState::NOTE_SPACE) {
            if data.state.contains(TagState::QUOTED) {
                // Text right after a closing quote means the quote was not
                // really a quote.
                data.state = TagState::ATTR_VALUE;
                self.memoize_bad_route();
                self.discard()?;
                self.head = data.reset - 1;
                return Ok(());
            }
            return Err(self.fail_route());
        } else if data.state.contains(TagState::ATTR_READY) {
            data.state = TagState::ATTR_NAME;
            self.push(Context::TAG_ATTR)?;
        } else if data.state.contains(TagState::ATTR_NAME) {
            if this == '=' {
                data.state = TagState::ATTR_VALUE | TagState::NOTE_QUOTE;
                self.emit(Token::TagAttrEquals);
                return Ok(());
            }
            if data.state.contains(TagState::NOTE_EQUALS) {
                self.push_tag_buffer(data)?;
                data.state = TagState::ATTR_NAME;
                self.push(Context::TAG_ATTR)?;
            }
        } else {
            let escaped = self.read_back(1) == Some('\\') && self.read_back(2) != Some('\\');
            if data.state.contains(TagState::NOTE_QUOTE) {
                data.state.remove(TagState::NOTE_QUOTE);
                if matches!(this, '"' | '\'') && !escaped {
                    data.state.insert(TagState::QUOTED);
                    data.quoter = this;
                    data.reset = self.head;
                    if let Err(halt) = self.push(self.context()) {
                        let Halt::BadRoute(_) = halt else {
                            return Err(halt);
                        };
                        // Already known not to close.
                        data.state = TagState::ATTR_VALUE;
                        self.head -= 1;
                    }
                    return Ok(());
                }
            } else if data.state.contains(TagState::QUOTED)
                && this == data.quoter
                && !escaped
            {
                data.state.insert(TagState::NOTE_SPACE);
                return Ok(());
            }
        }
        self.handle_tag_text(this)
    }

    /// Handles whitespace inside an open tag.
    fn handle_tag_space(&mut self, data: &mut TagData, this: char) -> Route<()> {
        let state = data.state;
        let end_of_value = state.contains(TagState::ATTR_VALUE)
            && !state.intersects(TagState::QUOTED | TagState::NOTE_QUOTE);

        if end_of_value || state.contains(TagState::QUOTED | TagState::NOTE_SPACE) {
            self.push_tag_buffer(data)?;
            data.state = TagState::ATTR_READY;
        } else if state.contains(TagState::NOTE_SPACE) {
            data.state = TagState::ATTR_READY;
        } else if state.contains(TagState::ATTR_NAME) {
            data.state.insert(TagState::NOTE_EQUALS);
            data.padding.before_eq.push(this);
        }

        if state.contains(TagState::QUOTED) && !state.contains(TagState::NOTE_SPACE) {
            self.emit_char(this);
        } else if data.state.contains(TagState::ATTR_READY) {
            data.padding.first.push(this);
        } else if data.state.contains(TagState::ATTR_VALUE) {
            data.padding.after_eq.push(this);
        }
        Ok(())
    }

    /// Handles regular text inside an open tag, which may contain templates,
    /// links, or other tags.
    fn handle_tag_text(&mut self, this: char) -> Route<()> {
        let next = self.read(1);
        if !is_marker(Some(this)) || !self.can_recurse() {
            self.emit_char(this);
        } else if this == '{' && next == Some('{') {
            self.parse_template_or_argument()?;
        } else if this == '[' && next == Some('[') {
            self.parse_wikilink()?;
        } else if this == '<' {
            self.parse_tag()?;
        } else {
            self.emit_char(this);
        }
        Ok(())
    }

    /// Closes the frames of the current attribute, writing its tokens into
    /// the tag frame.
    pub(super) fn push_tag_buffer(&mut self, data: &mut TagData) -> Route<()> {
        if data.state.contains(TagState::QUOTED) {
            self.emit_first(Token::TagAttrQuote { char: data.quoter });
            let value = self.pop()?;
            self.emit_all(value);
        }
        let padding = core::mem::take(&mut data.padding);
        self.emit_first(Token::TagAttrStart {
            pad_first: padding.first,
            pad_before_eq: padding.before_eq,
            pad_after_eq: padding.after_eq,
        });
        let attr = self.pop()?;
        self.emit_all(attr);
        Ok(())
    }

    /// Handles `</` inside a tag body.
    pub(super) fn handle_tag_open_close(&mut self) -> Route<()> {
        self.emit(Token::TagOpenClose { wiki_markup: None });
        self.push(Context::TAG_CLOSE)?;
        self.head += 1;
        Ok(())
    }

    /// Handles the `>` of a closing tag.
    pub(super) fn handle_tag_close_close(&mut self) -> Route<Vec<Token>> {
        let closing = self.pop()?;
        let name = self.tag_name()?;
        let matches = match closing.as_slice() {
            [Token::Text { text }] => strip_tag_name(text) == strip_tag_name(&name),
            _ => false,
        };
        if !matches {
            return Err(self.fail_route());
        }
        self.emit_all(closing);
        self.emit(Token::TagCloseClose);
        Ok(self.pop()?)
    }

    /// Reads the body of a tag whose contents are not wikitext, up to the
    /// matching close tag.
    fn handle_blacklisted_tag(&mut self, name: &str) -> Route<Vec<Token>> {
        let name = strip_tag_name(name);
        loop {
            let this = self.read(0);
            let next = self.read(1);
            match this {
                None => return Err(self.fail_route()),
                Some('<') if next == Some('/') => {
                    self.head += 2;
                    let reset = self.head - 1;
                    let mut closing = String::new();
                    loop {
                        match self.read(0) {
                            Some('>') if strip_tag_name(&closing) == name => {
                                self.emit(Token::TagOpenClose { wiki_markup: None });
                                self.emit_text(&closing);
                                self.emit(Token::TagCloseClose);
                                return Ok(self.pop()?);
                            }
                            None | Some('\n' | '>') => {
                                self.head = reset;
                                self.emit_text("</");
                                break;
                            }
                            Some(c) => {
                                closing.push(c);
                                self.head += 1;
                            }
                        }
                    }
                }
                Some('&') => self.parse_entity()?,
                Some(this) => self.emit_char(this),
            }
            self.head += 1;
        }
    }

    /// Handles `</` outside of a tag body, which is only meaningful as the
    /// start of a stray void element like `</br>`.
    pub(super) fn handle_invalid_tag_start(&mut self) -> Route<()> {
        let reset = self.head + 1;
        self.head += 2;

        let name = self
            .text
            .get(self.head..)
            .unwrap_or_default()
            .iter()
            .take_while(|c| !c.is_whitespace() && !is_marker(Some(**c)))
            .collect::<String>();

        let tag = if is_single_only(&name) {
            self.attempt(Self::really_parse_tag)?.ok()
        } else {
            None
        };

        match tag {
            Some(mut tag) => {
                if let Some(Token::TagOpenOpen { invalid, .. }) = tag.first_mut() {
                    *invalid = true;
                }
                self.emit_all(tag);
            }
            None => {
                self.head = reset;
                self.emit_text("</");
            }
        }
        Ok(())
    }

    /// Closes a void element which was opened with `>` instead of `/>`.
    fn handle_single_only_tag_end(&mut self) -> Route<Vec<Token>> {
        self.push_textbuffer();
        let padding = match self.tokens.pop() {
            Some(Token::TagCloseOpen { padding, .. }) => padding,
            _ => return Err(TokenizerError::MissingCloseOpen.into()),
        };
        self.emit(Token::TagCloseSelfclose {
            padding,
            implicit: true,
        });
        self.head -= 1;
        Ok(self.pop()?)
    }

    /// Closes a tag which may be left open when the input ends inside it.
    /// Its body becomes a sibling of the tag.
    pub(super) fn handle_single_tag_end(&mut self) -> Route<Vec<Token>> {
        self.push_textbuffer();
        let start = self.frames.last().map_or(0, |frame| frame.start);
        let mut depth = 1_usize;
        let mut close_open = None;
        for (index, token) in self.tokens.iter().enumerate().skip(start + 2) {
            match token {
                Token::TagOpenOpen { .. } => depth += 1,
                Token::TagCloseOpen { .. } => {
                    depth -= 1;
                    if depth == 0 {
                        close_open = Some(index);
                        break;
                    }
                }
                Token::TagCloseSelfclose { .. } => {
                    depth -= 1;
                    if depth == 0 {
                        return Err(TokenizerError::UnexpectedSelfClose.into());
                    }
                }
                _ => {}
            }
        }

        let Some(index) = close_open else {
            return Err(TokenizerError::MissingCloseOpen.into());
        };
        if let Token::TagCloseOpen { padding, .. } = &mut self.tokens[index] {
            let padding = core::mem::take(padding);
            self.tokens[index] = Token::TagCloseSelfclose {
                padding,
                implicit: true,
            };
        }
        Ok(self.pop()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn tokenize(text: &str) -> Vec<Token> {
        Tokenizer::new()
            .tokenize(text, Context::empty(), false)
            .unwrap()
    }

    fn open() -> Token {
        Token::TagOpenOpen {
            wiki_markup: None,
            invalid: false,
        }
    }

    fn close_open(padding: &str) -> Token {
        Token::TagCloseOpen {
            wiki_markup: None,
            padding: padding.into(),
        }
    }

    fn attr(pad_first: &str) -> Token {
        Token::TagAttrStart {
            pad_first: pad_first.into(),
            pad_before_eq: String::new(),
            pad_after_eq: String::new(),
        }
    }

    #[test]
    fn simple() {
        assert_eq!(
            tokenize("<b>x</b>"),
            [
                open(),
                Token::text("b"),
                close_open(""),
                Token::text("x"),
                Token::TagOpenClose { wiki_markup: None },
                Token::text("b"),
                Token::TagCloseClose,
            ]
        );
    }

    #[test]
    fn attributes() {
        assert_eq!(
            tokenize(r#"<span id="a" class=b>x</span>"#),
            [
                open(),
                Token::text("span"),
                attr(" "),
                Token::text("id"),
                Token::TagAttrEquals,
                Token::TagAttrQuote { char: '"' },
                Token::text("a"),
                attr(" "),
                Token::text("class"),
                Token::TagAttrEquals,
                Token::text("b"),
                close_open(""),
                Token::text("x"),
                Token::TagOpenClose { wiki_markup: None },
                Token::text("span"),
                Token::TagCloseClose,
            ]
        );
    }

    #[test]
    fn self_closing() {
        assert_eq!(
            tokenize("<ref name=x />"),
            [
                open(),
                Token::text("ref"),
                attr(" "),
                Token::text("name"),
                Token::TagAttrEquals,
                Token::text("x"),
                Token::TagCloseSelfclose {
                    padding: " ".into(),
                    implicit: false,
                },
            ]
        );
    }

    #[test]
    fn void_element() {
        assert_eq!(
            tokenize("a<br>b"),
            [
                Token::text("a"),
                open(),
                Token::text("br"),
                Token::TagCloseSelfclose {
                    padding: String::new(),
                    implicit: true,
                },
                Token::text("b"),
            ]
        );
    }

    #[test]
    fn invalid_close() {
        assert_eq!(
            tokenize("</br>"),
            [
                Token::TagOpenOpen {
                    wiki_markup: None,
                    invalid: true,
                },
                Token::text("br"),
                Token::TagCloseSelfclose {
                    padding: String::new(),
                    implicit: true,
                },
            ]
        );
        assert_eq!(tokenize("</span>"), [Token::text("</span>")]);
    }

    #[test]
    fn unclosed_single() {
        assert_eq!(
            tokenize("<li>item"),
            [
                open(),
                Token::text("li"),
                Token::TagCloseSelfclose {
                    padding: String::new(),
                    implicit: true,
                },
                Token::text("item"),
            ]
        );
    }

    #[test]
    fn mismatched() {
        assert_eq!(tokenize("<b>x</i>"), [Token::text("<b>x</i>")]);
        assert_eq!(tokenize("<b>x"), [Token::text("<b>x")]);
        assert_eq!(tokenize("< b>"), [Token::text("< b>")]);
    }

    #[test]
    fn blacklisted() {
        assert_eq!(
            tokenize("<nowiki>[[a]] &amp;</nowiki>"),
            [
                open(),
                Token::text("nowiki"),
                close_open(""),
                Token::text("[[a]] "),
                Token::HtmlEntityStart,
                Token::text("amp"),
                Token::HtmlEntityEnd,
                Token::TagOpenClose { wiki_markup: None },
                Token::text("nowiki"),
                Token::TagCloseClose,
            ]
        );
    }

    #[test]
    fn unclosed_quote() {
        assert_eq!(
            tokenize(r#"<span a="b>x</span>"#),
            [
                open(),
                Token::text("span"),
                attr(" "),
                Token::text("a"),
                Token::TagAttrEquals,
                Token::text("\"b"),
                close_open(""),
                Token::text("x"),
                Token::TagOpenClose { wiki_markup: None },
                Token::text("span"),
                Token::TagCloseClose,
            ]
        );
    }
}
