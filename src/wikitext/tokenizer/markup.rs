//! Text styles, lists, definition lists, and horizontal rules.

use super::{Route, Tokenizer};
use crate::wikitext::{
    contexts::Context,
    definitions::get_html_tag,
    tokens::{TextStyle, Token},
};

impl Tokenizer {
    /// Parses a run of apostrophes. Returns the current frame if the run
    /// closes it.
    pub(super) fn parse_style(&mut self) -> Route<Option<Vec<Token>>> {
        self.head += 2;
        let mut ticks = 2;
        while self.read(0) == Some('\'') {
            self.head += 1;
            ticks += 1;
        }

        let context = self.context();
        let italics = context.contains(Context::STYLE_ITALICS);
        let bold = context.contains(Context::STYLE_BOLD);

        if ticks > 5 {
            self.emit_text(&"'".repeat(ticks - 5));
            ticks = 5;
        } else if ticks == 4 {
            self.emit_char('\'');
            ticks = 3;
        }

        if (italics && matches!(ticks, 2 | 5)) || (bold && matches!(ticks, 3 | 5)) {
            if ticks == 5 {
                self.head -= if italics { 3 } else { 2 };
            }
            return Ok(Some(self.pop()?));
        }

        if !self.can_recurse() {
            if ticks == 3 {
                if context.contains(Context::STYLE_SECOND_PASS) {
                    self.emit_char('\'');
                    return Ok(Some(self.pop()?));
                }
                if italics {
                    self.add_context(Context::STYLE_PASS_AGAIN);
                }
            }
            self.emit_text(&"'".repeat(ticks));
        } else if ticks == 2 {
            self.parse_italics()?;
        } else if ticks == 3 {
            if self.parse_bold()? {
                return Ok(Some(self.pop()?));
            }
        } else {
            self.parse_italics_and_bold()?;
        }
        self.head -= 1;
        Ok(None)
    }

    fn parse_italics(&mut self) -> Route<()> {
        let reset = self.head;
        let stack = match self.attempt(|t| t.parse(Context::STYLE_ITALICS))? {
            Ok(stack) => stack,
            Err(context) if context.contains(Context::STYLE_PASS_AGAIN) => {
                // A bold run inside failed because it was really the end of
                // this italic run plus an apostrophe.
                let context = Context::STYLE_ITALICS | Context::STYLE_SECOND_PASS;
                match self.attempt(|t| t.parse(context))? {
                    Ok(stack) => stack,
                    Err(_) => {
                        self.head = reset;
                        self.emit_text("''");
                        return Ok(());
                    }
                }
            }
            Err(_) => {
                self.head = reset;
                self.emit_text("''");
                return Ok(());
            }
        };
        self.emit_style(TextStyle::Italic, stack);
        Ok(())
    }

    /// Parses a bold run. Returns true if the current frame should close.
    fn parse_bold(&mut self) -> Route<bool> {
        let reset = self.head;
        match self.attempt(|t| t.parse(Context::STYLE_BOLD))? {
            Ok(stack) => self.emit_style(TextStyle::Bold, stack),
            Err(_) => {
                self.head = reset;
                let context = self.context();
                if context.contains(Context::STYLE_SECOND_PASS) {
                    self.emit_char('\'');
                    return Ok(true);
                }
                if context.contains(Context::STYLE_ITALICS) {
                    self.add_context(Context::STYLE_PASS_AGAIN);
                    self.emit_text("'''");
                } else {
                    self.emit_char('\'');
                    self.parse_italics()?;
                }
            }
        }
        Ok(false)
    }

    fn parse_italics_and_bold(&mut self) -> Route<()> {
        let reset = self.head;
        if let Ok(bold) = self.attempt(|t| t.parse(Context::STYLE_BOLD))? {
            let reset = self.head;
            match self.attempt(|t| t.parse(Context::STYLE_ITALICS))? {
                Ok(italics) => {
                    self.push(Context::empty())?;
                    self.emit_style(TextStyle::Bold, bold);
                    self.emit_all(italics);
                    let outer = self.pop()?;
                    self.emit_style(TextStyle::Italic, outer);
                }
                Err(_) => {
                    self.head = reset;
                    self.emit_text("''");
                    self.emit_style(TextStyle::Bold, bold);
                }
            }
            return Ok(());
        }

        self.head = reset;
        let Ok(italics) = self.attempt(|t| t.parse(Context::STYLE_ITALICS))? else {
            self.head = reset;
            self.emit_text("'''''");
            return Ok(());
        };

        let reset = self.head;
        match self.attempt(|t| t.parse(Context::STYLE_BOLD))? {
            Ok(bold) => {
                self.push(Context::empty())?;
                self.emit_style(TextStyle::Italic, italics);
                self.emit_all(bold);
                let outer = self.pop()?;
                self.emit_style(TextStyle::Bold, outer);
            }
            Err(_) => {
                self.head = reset;
                self.emit_text("'''");
                self.emit_style(TextStyle::Italic, italics);
            }
        }
        Ok(())
    }

    fn emit_style(&mut self, style: TextStyle, body: Vec<Token>) {
        self.emit(Token::StyleOpen { style });
        self.emit_all(body);
        self.emit(Token::StyleClose);
    }

    /// Writes one list or definition bullet.
    fn handle_list_marker(&mut self) {
        let Some(markup) = self.read(0) else {
            return;
        };
        if markup == ';' {
            self.add_context(Context::DL_TERM);
        }
        self.emit(Token::TagOpenOpen {
            wiki_markup: Some(markup.to_string()),
            invalid: false,
        });
        self.emit_text(get_html_tag(markup).unwrap_or_default());
        self.emit(Token::TagCloseSelfclose {
            padding: String::new(),
            implicit: false,
        });
    }

    /// Writes the run of bullets at the start of a list item.
    pub(super) fn handle_list(&mut self) {
        self.handle_list_marker();
        while matches!(self.read(1), Some('#' | '*' | ';' | ':')) {
            self.head += 1;
            self.handle_list_marker();
        }
    }

    /// Writes a horizontal rule.
    pub(super) fn handle_hr(&mut self) {
        let mut length = 4;
        self.head += 3;
        while self.read(1) == Some('-') {
            length += 1;
            self.head += 1;
        }
        self.emit(Token::TagOpenOpen {
            wiki_markup: Some("-".repeat(length)),
            invalid: false,
        });
        self.emit_text("hr");
        self.emit(Token::TagCloseSelfclose {
            padding: String::new(),
            implicit: false,
        });
    }

    /// Ends a definition term at a `:` or newline.
    pub(super) fn handle_dl_term(&mut self) {
        self.remove_context(Context::DL_TERM);
        if self.read(0) == Some(':') {
            self.handle_list_marker();
        } else {
            self.emit_char('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::wikitext::{
        contexts::Context,
        tokenizer::Tokenizer,
        tokens::{TextStyle, Token},
    };

    #[track_caller]
    fn tokenize(text: &str) -> Vec<Token> {
        Tokenizer::new()
            .tokenize(text, Context::empty(), false)
            .unwrap()
    }

    fn open(style: TextStyle) -> Token {
        Token::StyleOpen { style }
    }

    fn bullet(markup: &str, tag: &str) -> [Token; 3] {
        [
            Token::TagOpenOpen {
                wiki_markup: Some(markup.into()),
                invalid: false,
            },
            Token::text(tag),
            Token::TagCloseSelfclose {
                padding: String::new(),
                implicit: false,
            },
        ]
    }

    #[test]
    fn italics_and_bold() {
        assert_eq!(
            tokenize("''a'' '''b'''"),
            [
                open(TextStyle::Italic),
                Token::text("a"),
                Token::StyleClose,
                Token::text(" "),
                open(TextStyle::Bold),
                Token::text("b"),
                Token::StyleClose,
            ]
        );
    }

    #[test]
    fn five_ticks() {
        assert_eq!(
            tokenize("'''''a'''''"),
            [
                open(TextStyle::Italic),
                open(TextStyle::Bold),
                Token::text("a"),
                Token::StyleClose,
                Token::StyleClose,
            ]
        );
    }

    #[test]
    fn unclosed() {
        assert_eq!(tokenize("''a"), [Token::text("''a")]);
        assert_eq!(tokenize("'''a"), [Token::text("'''a")]);
    }

    #[test]
    fn apostrophe_before_bold() {
        assert_eq!(
            tokenize("''''a'''"),
            [
                Token::text("'"),
                open(TextStyle::Bold),
                Token::text("a"),
                Token::StyleClose,
            ]
        );
    }

    #[test]
    fn skipped() {
        assert_eq!(
            Tokenizer::new()
                .tokenize("''a''", Context::empty(), true)
                .unwrap(),
            [Token::text("''a''")]
        );
    }

    #[test]
    fn lists() {
        let mut expected = Vec::new();
        expected.extend(bullet("*", "li"));
        expected.extend(bullet("#", "li"));
        expected.push(Token::text(" a\n"));
        expected.extend(bullet(";", "dt"));
        expected.push(Token::text(" b "));
        expected.extend(bullet(":", "dd"));
        expected.push(Token::text(" c"));
        assert_eq!(tokenize("*# a\n; b : c"), expected);
    }

    #[test]
    fn hr() {
        let mut expected = vec![Token::text("a\n")];
        expected.extend(bullet("-----", "hr"));
        expected.push(Token::text("b"));
        assert_eq!(tokenize("a\n-----b"), expected);
    }
}
