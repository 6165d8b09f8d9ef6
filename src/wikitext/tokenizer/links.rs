//! Wikilinks and external links.

use super::{Halt, Route, Tokenizer};
use crate::wikitext::{contexts::Context, definitions::is_scheme, tokens::Token};

/// Characters which are held back from the end of a free link unless more
/// URL text follows them.
const FREE_LINK_PUNCTUATION: [char; 7] = [',', ';', '\\', '.', ':', '!', '?'];

/// Returns true if `c` may appear in a URI scheme.
fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-')
}

impl Tokenizer {
    /// Parses `[[`, which is either a wikilink or a bracketed external link
    /// preceded by a literal `[`.
    pub(super) fn parse_wikilink(&mut self) -> Route<()> {
        let reset = self.head + 1;
        self.head += 2;

        match self.attempt(|t| t.really_parse_external_link(true))? {
            Ok((link, _)) => {
                if self.context().contains(Context::EXT_LINK_TITLE) {
                    // A bracketed link cannot appear in the title of another.
                    self.head = reset;
                    self.emit_text("[[");
                    return Ok(());
                }
                self.emit_char('[');
                self.emit(Token::ExternalLinkOpen { brackets: true });
                self.emit_all(link);
                self.emit(Token::ExternalLinkClose);
            }
            Err(_) => {
                self.head = reset + 1;
                match self.attempt(|t| t.parse(Context::WIKILINK_TITLE))? {
                    Ok(wikilink) => {
                        self.emit(Token::WikilinkOpen);
                        self.emit_all(wikilink);
                        self.emit(Token::WikilinkClose);
                    }
                    Err(_) => {
                        self.head = reset;
                        self.emit_text("[[");
                    }
                }
            }
        }
        Ok(())
    }

    pub(super) fn handle_wikilink_separator(&mut self) {
        self.remove_context(Context::WIKILINK_TITLE);
        self.add_context(Context::WIKILINK_TEXT);
        self.emit(Token::WikilinkSeparator);
    }

    pub(super) fn handle_wikilink_end(&mut self) -> Route<Vec<Token>> {
        self.head += 1;
        Ok(self.pop()?)
    }

    /// Parses the scheme of a bracketed link and opens the link frame.
    fn parse_bracketed_uri_scheme(&mut self) -> Route<()> {
        self.push(Context::EXT_LINK_URI)?;
        if self.read(0) == Some('/') && self.read(1) == Some('/') {
            self.emit_text("//");
            self.head += 2;
            return Ok(());
        }

        let mut scheme = String::new();
        while let Some(c) = self.read(0).filter(|c| is_scheme_char(*c)) {
            scheme.push(c);
            self.emit_char(c);
            self.head += 1;
        }
        if self.read(0) != Some(':') {
            return Err(self.fail_route());
        }
        self.emit_char(':');
        self.head += 1;

        let slashes = self.read(0) == Some('/') && self.read(1) == Some('/');
        if slashes {
            self.emit_text("//");
            self.head += 2;
        }
        if !is_scheme(&scheme, slashes) {
            return Err(self.fail_route());
        }
        Ok(())
    }

    /// Finds the scheme of a free link, which was already written to the
    /// text buffer, and opens the link frame.
    fn parse_free_uri_scheme(&mut self) -> Route<()> {
        let textbuffer = self
            .frames
            .last()
            .map_or("", |frame| frame.textbuffer.as_str());

        let mut scheme = Vec::new();
        for c in textbuffer.chars().rev() {
            if !c.is_alphanumeric() && c != '_' {
                break;
            }
            if !is_scheme_char(c) {
                return Err(Halt::BadRoute(self.context()));
            }
            scheme.push(c);
        }
        let scheme = scheme.into_iter().rev().collect::<String>();

        let slashes = self.read(0) == Some('/') && self.read(1) == Some('/');
        if !is_scheme(&scheme, slashes) {
            return Err(Halt::BadRoute(self.context()));
        }

        self.push(self.context() | Context::EXT_LINK_URI)?;
        self.emit_text(&scheme);
        self.emit_char(':');
        if slashes {
            self.emit_text("//");
            self.head += 2;
        }
        Ok(())
    }

    /// Writes a character of a free link, holding back trailing punctuation
    /// in `tail`.
    fn handle_free_link_text(&mut self, parens: &mut bool, tail: &mut String, this: char) {
        if this == '(' && !*parens {
            *parens = true;
            self.flush_tail(tail);
        } else if FREE_LINK_PUNCTUATION.contains(&this) || (!*parens && this == ')') {
            tail.push(this);
            return;
        } else {
            self.flush_tail(tail);
        }
        self.emit_char(this);
    }

    fn flush_tail(&mut self, tail: &mut String) {
        if !tail.is_empty() {
            let tail = core::mem::take(tail);
            self.emit_text(&tail);
        }
    }

    /// Returns true if `this` ends the URI of an external link.
    fn is_uri_end(&self, this: Option<char>, next: Option<char>) -> bool {
        let context = self.context();
        let after = self.read(2);
        match this {
            None | Some('\n' | '[' | ']' | '<' | '>' | '"' | ' ') => true,
            Some('\'') => next == Some('\''),
            Some('|') => context.intersects(Context::TEMPLATE),
            Some('=') => context.intersects(Context::TEMPLATE_PARAM_KEY | Context::HEADING),
            Some('}') => {
                next == Some('}')
                    && (context.intersects(Context::TEMPLATE)
                        || (after == Some('}') && context.intersects(Context::ARGUMENT)))
            }
            Some(_) => false,
        }
    }

    /// Parses an external link after its opening `[` or scheme colon.
    /// Returns the link tokens and any text which ended up just after the
    /// link.
    fn really_parse_external_link(&mut self, brackets: bool) -> Route<(Vec<Token>, String)> {
        if brackets {
            self.parse_bracketed_uri_scheme()?;
        } else {
            self.parse_free_uri_scheme()?;
        }

        match self.read(0) {
            None | Some('\n' | ' ' | ']') => return Err(self.fail_route()),
            Some('[') if !brackets => return Err(self.fail_route()),
            _ => {}
        }

        let mut parens = false;
        let mut tail = String::new();
        loop {
            let this = self.read(0);
            let next = self.read(1);
            if this == Some('&') {
                self.flush_tail(&mut tail);
                self.parse_entity()?;
            } else if this == Some('<')
                && next == Some('!')
                && self.read(2) == Some('-')
                && self.read(3) == Some('-')
            {
                self.flush_tail(&mut tail);
                self.parse_comment()?;
            } else if this == Some('{') && next == Some('{') && self.can_recurse() {
                self.flush_tail(&mut tail);
                self.parse_template_or_argument()?;
            } else if brackets {
                let Some(this) = this.filter(|this| *this != '\n') else {
                    return Err(self.fail_route());
                };
                if this == ']' {
                    return Ok((self.pop()?, tail));
                }
                if self.is_uri_end(Some(this), next) {
                    let suppress_space = this != ' ';
                    self.emit(Token::ExternalLinkSeparator { suppress_space });
                    if !suppress_space {
                        self.head += 1;
                    }
                    self.remove_context(Context::EXT_LINK_URI);
                    self.add_context(Context::EXT_LINK_TITLE);
                    return Ok((self.parse_body()?, tail));
                }
                self.emit_char(this);
            } else {
                if self.is_uri_end(this, next) {
                    if this == Some(' ') {
                        tail.push(' ');
                    } else {
                        self.head -= 1;
                    }
                    return Ok((self.pop()?, tail));
                }
                if let Some(this) = this {
                    self.handle_free_link_text(&mut parens, &mut tail, this);
                }
            }
            self.head += 1;
        }
    }

    /// Parses an external link. `brackets` is true at a `[` and false at the
    /// colon of a possible free link.
    pub(super) fn parse_external_link(&mut self, brackets: bool) -> Route<()> {
        let context = self.context();
        if context.intersects(Context::NO_EXT_LINKS) || !self.can_recurse() {
            self.emit_link_fallback(brackets);
            return Ok(());
        }

        let reset = self.head;
        self.head += 1;
        match self.attempt(|t| t.really_parse_external_link(brackets))? {
            Ok((link, extra)) => {
                if !brackets {
                    self.remove_uri_scheme_from_textbuffer(&link);
                }
                self.emit(Token::ExternalLinkOpen { brackets });
                self.emit_all(link);
                self.emit(Token::ExternalLinkClose);
                if !extra.is_empty() {
                    self.emit_text(&extra);
                }
            }
            Err(_) => {
                self.head = reset;
                self.emit_link_fallback(brackets);
            }
        }
        Ok(())
    }

    /// Handles a `[` or `:` which did not start an external link.
    fn emit_link_fallback(&mut self, brackets: bool) {
        if !brackets && self.context().contains(Context::DL_TERM) {
            self.handle_dl_term();
        } else if let Some(this) = self.read(0) {
            self.emit_char(this);
        }
    }

    /// Removes the scheme of a free link from the text buffer, since it is
    /// now part of the link.
    fn remove_uri_scheme_from_textbuffer(&mut self, link: &[Token]) {
        let Some(Token::Text { text }) = link.first() else {
            return;
        };
        let scheme = text.split(':').next().unwrap_or_default();
        if let Some(frame) = self.frames.last_mut()
            && frame.textbuffer.ends_with(scheme)
        {
            let len = frame.textbuffer.len() - scheme.len();
            frame.textbuffer.truncate(len);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::wikitext::{
        contexts::Context,
        tokenizer::Tokenizer,
        tokens::Token,
    };

    #[track_caller]
    fn tokenize(text: &str) -> Vec<Token> {
        Tokenizer::new()
            .tokenize(text, Context::empty(), false)
            .unwrap()
    }

    #[test]
    fn wikilink() {
        assert_eq!(
            tokenize("[[Foo|bar]]"),
            [
                Token::WikilinkOpen,
                Token::text("Foo"),
                Token::WikilinkSeparator,
                Token::text("bar"),
                Token::WikilinkClose,
            ]
        );
        assert_eq!(tokenize("[[Foo\nbar]]"), [Token::text("[[Foo\nbar]]")]);
        assert_eq!(tokenize("[[Foo"), [Token::text("[[Foo")]);
    }

    #[test]
    fn bracketed() {
        assert_eq!(
            tokenize("[http://example.com Example]"),
            [
                Token::ExternalLinkOpen { brackets: true },
                Token::text("http://example.com"),
                Token::ExternalLinkSeparator {
                    suppress_space: false
                },
                Token::text("Example"),
                Token::ExternalLinkClose,
            ]
        );
        assert_eq!(
            tokenize("[http://example.com]"),
            [
                Token::ExternalLinkOpen { brackets: true },
                Token::text("http://example.com"),
                Token::ExternalLinkClose,
            ]
        );
        assert_eq!(tokenize("[bogus://x y]"), [Token::text("[bogus://x y]")]);
        assert_eq!(
            tokenize("[http://x y"),
            [
                Token::text("["),
                Token::ExternalLinkOpen { brackets: false },
                Token::text("http://x"),
                Token::ExternalLinkClose,
                Token::text(" y"),
            ]
        );
    }

    #[test]
    fn suppressed_space() {
        assert_eq!(
            tokenize("[http://x<b>y</b>]")[..3],
            [
                Token::ExternalLinkOpen { brackets: true },
                Token::text("http://x"),
                Token::ExternalLinkSeparator {
                    suppress_space: true
                },
            ]
        );
    }

    #[test]
    fn free() {
        assert_eq!(
            tokenize("see http://example.com/a_(b), ok"),
            [
                Token::text("see "),
                Token::ExternalLinkOpen { brackets: false },
                Token::text("http://example.com/a_(b)"),
                Token::ExternalLinkClose,
                Token::text(", ok"),
            ]
        );
        assert_eq!(
            tokenize("mailto:a@b.c."),
            [
                Token::ExternalLinkOpen { brackets: false },
                Token::text("mailto:a@b.c"),
                Token::ExternalLinkClose,
                Token::text("."),
            ]
        );
        assert_eq!(tokenize("foo:bar"), [Token::text("foo:bar")]);
        assert_eq!(tokenize("http:bar"), [Token::text("http:bar")]);
    }

    #[test]
    fn bracketed_in_wikilink_markup() {
        assert_eq!(
            tokenize("[[http://x]]"),
            [
                Token::text("["),
                Token::ExternalLinkOpen { brackets: true },
                Token::text("http://x"),
                Token::ExternalLinkClose,
                Token::text("]"),
            ]
        );
    }

    #[test]
    fn uri_context() {
        assert_eq!(
            Tokenizer::new()
                .tokenize("http://x [[a]] [b]", Context::EXT_LINK_URI, false)
                .unwrap(),
            [Token::text("http://x [[a]] [b]")]
        );
    }
}
