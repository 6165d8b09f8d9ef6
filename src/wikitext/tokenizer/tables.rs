//! Wiki tables.
//!
//! Tables, rows, and cells are emitted as tags with wiki markup, so
//! `{|` becomes a `table` tag whose open markup is `{|` and whose close
//! markup is `|}`. Rows and cells have no close markup; they end at the next
//! row or cell, or at the end of the table.

use super::{
    Route, Tokenizer,
    tags::{TagData, TagState},
};
use crate::wikitext::{contexts::Context, tokens::Token};

/// The parts of a table tag.
struct TableTag<'a> {
    open_markup: &'a str,
    tag: &'a str,
    style: Vec<Token>,
    padding: String,
    separator: Option<&'a str>,
    contents: Vec<Token>,
    close_markup: &'a str,
}

impl Tokenizer {
    /// Reads table attributes up to `end`. Returns the whitespace which came
    /// after the last attribute.
    fn handle_table_style(&mut self, end: char) -> Route<String> {
        let mut data = TagData::new(TagState::ATTR_READY);
        loop {
            let this = self.read(0);
            if this == Some(end) && data.can_exit_attrs() {
                if data
                    .state
                    .intersects(TagState::ATTR_NAME | TagState::ATTR_VALUE)
                {
                    self.push_tag_buffer(&mut data)?;
                }
                if end.is_whitespace() {
                    data.padding.first.push(end);
                }
                return Ok(core::mem::take(&mut data.padding.first));
            }

            let Some(this) = this.filter(|this| *this != end) else {
                if self.context().contains(Context::TAG_ATTR) {
                    if data.state.contains(TagState::QUOTED) {
                        data.state = TagState::ATTR_VALUE;
                        self.memoize_bad_route();
                        self.discard()?;
                        self.head = data.reset;
                        continue;
                    }
                    self.discard()?;
                }
                return Err(self.fail_route());
            };

            self.handle_tag_data(&mut data, this)?;
            self.head += 1;
        }
    }

    /// Parses a table starting at `{|`, or emits `{` as text.
    pub(super) fn parse_table(&mut self) -> Route<()> {
        let reset = self.head;
        self.head += 2;

        let style = self.attempt(|t| {
            t.push(Context::TABLE_OPEN)?;
            let padding = t.handle_table_style('\n')?;
            Ok((t.pop()?, padding))
        })?;
        let Ok((style, padding)) = style else {
            self.head = reset;
            self.emit_char('{');
            return Ok(());
        };

        self.head += 1;
        let Ok(table) = self.attempt(|t| t.parse(Context::TABLE_OPEN))? else {
            self.head = reset;
            self.emit_char('{');
            return Ok(());
        };

        self.emit_table_tag(TableTag {
            open_markup: "{|",
            tag: "table",
            style,
            padding,
            separator: None,
            contents: table,
            close_markup: "|}",
        });
        self.head -= 1;
        Ok(())
    }

    /// Parses a row starting at `|-`.
    fn handle_table_row(&mut self) -> Route<()> {
        self.head += 2;
        if !self.can_recurse() {
            self.emit_text("|-");
            self.head -= 1;
            return Ok(());
        }

        let context = Context::TABLE_OPEN | Context::TABLE_ROW_OPEN;
        self.push(context)?;
        let padding = self.handle_table_style('\n')?;
        let style = self.pop()?;

        self.head += 1;
        let row = self.parse(context)?;

        self.emit_table_tag(TableTag {
            open_markup: "|-",
            tag: "tr",
            style,
            padding,
            separator: None,
            contents: row,
            close_markup: "",
        });
        self.head -= 1;
        Ok(())
    }

    /// Parses a cell. The cell is first parsed as content; if a lone `|`
    /// shows up before the end of the line, the text before it is reparsed
    /// as attributes.
    fn handle_table_cell(&mut self, markup: &str, tag: &str, line_context: Context) -> Route<()> {
        let old_context = self.context();
        self.head += markup.chars().count();
        let reset = self.head;
        if !self.can_recurse() {
            self.emit_text(markup);
            self.head -= 1;
            return Ok(());
        }

        let base = Context::TABLE_OPEN | Context::TABLE_CELL_OPEN | line_context;
        let mut cell = self.parse(base | Context::TABLE_CELL_STYLE)?;
        let mut cell_context = self.context();
        self.set_context(old_context);

        let reset_for_style = cell_context.contains(Context::TABLE_CELL_STYLE);
        let mut padding = String::new();
        let mut style = Vec::new();
        if reset_for_style {
            self.head = reset;
            self.push(base)?;
            padding = self.handle_table_style('|')?;
            style = self.pop()?;
            self.head += 1;
            cell = self.parse(base)?;
            cell_context = self.context();
            self.set_context(old_context);
        }

        self.emit_table_tag(TableTag {
            open_markup: markup,
            tag,
            style,
            padding,
            separator: reset_for_style.then_some("|"),
            contents: cell,
            close_markup: "",
        });
        self.add_context(cell_context & (Context::TABLE_TH_LINE | Context::TABLE_TD_LINE));
        self.head -= 1;
        Ok(())
    }

    /// Ends a cell. The cell context is copied to the parent so the caller
    /// can tell whether the cell has attributes.
    fn handle_table_cell_end(&mut self, reset_for_style: bool) -> Route<Vec<Token>> {
        if reset_for_style {
            self.add_context(Context::TABLE_CELL_STYLE);
        } else {
            self.remove_context(Context::TABLE_CELL_STYLE);
        }
        Ok(self.pop_keep_context()?)
    }

    fn handle_table_row_end(&mut self) -> Route<Vec<Token>> {
        Ok(self.pop()?)
    }

    fn handle_table_end(&mut self) -> Route<Vec<Token>> {
        self.head += 2;
        Ok(self.pop()?)
    }

    /// Ends whichever of the cell, row, or table is innermost, at a `|}` or
    /// `|-` at the start of a line.
    fn end_table_part(&mut self, context: Context) -> Route<Option<Vec<Token>>> {
        if context.contains(Context::TABLE_CELL_OPEN) {
            return self.handle_table_cell_end(false).map(Some);
        }
        if context.contains(Context::TABLE_ROW_OPEN) {
            return self.handle_table_row_end().map(Some);
        }
        Ok(None)
    }

    fn emit_table_tag(&mut self, tag: TableTag<'_>) {
        self.emit(Token::TagOpenOpen {
            wiki_markup: Some(tag.open_markup.into()),
            invalid: false,
        });
        self.emit_text(tag.tag);
        self.emit_all(tag.style);
        self.emit(Token::TagCloseOpen {
            wiki_markup: tag.separator.map(Into::into),
            padding: tag.padding,
        });
        self.emit_all(tag.contents);
        self.emit(Token::TagOpenClose {
            wiki_markup: Some(tag.close_markup.into()),
        });
        self.emit_text(tag.tag);
        self.emit(Token::TagCloseClose);
    }

    /// Handles a marker inside a table. Returns the current frame if the
    /// marker closes it.
    pub(super) fn handle_table_markup(
        &mut self,
        this: char,
        next: Option<char>,
        context: Context,
    ) -> Route<Option<Vec<Token>>> {
        let doubled = next == Some(this);
        if this == '|' && doubled && context.contains(Context::TABLE_TD_LINE) {
            if context.contains(Context::TABLE_CELL_OPEN) {
                return self.handle_table_cell_end(false).map(Some);
            }
            self.handle_table_cell("||", "td", Context::TABLE_TD_LINE)?;
        } else if this == '|' && doubled && context.contains(Context::TABLE_TH_LINE) {
            if context.contains(Context::TABLE_CELL_OPEN) {
                return self.handle_table_cell_end(false).map(Some);
            }
            self.handle_table_cell("||", "th", Context::TABLE_TH_LINE)?;
        } else if this == '!' && doubled && context.contains(Context::TABLE_TH_LINE) {
            if context.contains(Context::TABLE_CELL_OPEN) {
                return self.handle_table_cell_end(false).map(Some);
            }
            self.handle_table_cell("!!", "th", Context::TABLE_TH_LINE)?;
        } else if this == '|' && context.contains(Context::TABLE_CELL_STYLE) {
            return self.handle_table_cell_end(true).map(Some);
        } else if this == '\n' && context.intersects(Context::TABLE_CELL_LINE_CONTEXTS) {
            self.remove_context(Context::TABLE_CELL_LINE_CONTEXTS);
            self.emit_char(this);
        } else if self.has_leading_whitespace() {
            if this == '|' && next == Some('}') {
                if let Some(stack) = self.end_table_part(context)? {
                    return Ok(Some(stack));
                }
                return self.handle_table_end().map(Some);
            } else if this == '|' && next == Some('-') {
                if let Some(stack) = self.end_table_part(context)? {
                    return Ok(Some(stack));
                }
                self.handle_table_row()?;
            } else if this == '|' {
                if context.contains(Context::TABLE_CELL_OPEN) {
                    return self.handle_table_cell_end(false).map(Some);
                }
                self.handle_table_cell("|", "td", Context::TABLE_TD_LINE)?;
            } else if this == '!' {
                if context.contains(Context::TABLE_CELL_OPEN) {
                    return self.handle_table_cell_end(false).map(Some);
                }
                self.handle_table_cell("!", "th", Context::TABLE_TH_LINE)?;
            } else {
                self.emit_char(this);
            }
        } else {
            self.emit_char(this);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use crate::wikitext::{contexts::Context, tokenizer::Tokenizer, tokens::Token};

    #[track_caller]
    fn tokenize(text: &str) -> Vec<Token> {
        Tokenizer::new()
            .tokenize(text, Context::empty(), false)
            .unwrap()
    }

    fn open(markup: &str) -> Token {
        Token::TagOpenOpen {
            wiki_markup: Some(markup.into()),
            invalid: false,
        }
    }

    fn close_open(separator: Option<&str>, padding: &str) -> Token {
        Token::TagCloseOpen {
            wiki_markup: separator.map(Into::into),
            padding: padding.into(),
        }
    }

    fn open_close(markup: &str) -> Token {
        Token::TagOpenClose {
            wiki_markup: Some(markup.into()),
        }
    }

    #[test]
    fn simple() {
        assert_eq!(
            tokenize("{|\n| a\n|}"),
            [
                open("{|"),
                Token::text("table"),
                close_open(None, "\n"),
                open("|"),
                Token::text("td"),
                close_open(None, ""),
                Token::text(" a\n"),
                open_close(""),
                Token::text("td"),
                Token::TagCloseClose,
                open_close("|}"),
                Token::text("table"),
                Token::TagCloseClose,
            ]
        );
    }

    #[test]
    fn row_and_styled_cell() {
        assert_eq!(
            tokenize("{|\n|-\n| x=y | a\n|}"),
            [
                open("{|"),
                Token::text("table"),
                close_open(None, "\n"),
                open("|-"),
                Token::text("tr"),
                close_open(None, "\n"),
                open("|"),
                Token::text("td"),
                Token::TagAttrStart {
                    pad_first: " ".into(),
                    pad_before_eq: String::new(),
                    pad_after_eq: String::new(),
                },
                Token::text("x"),
                Token::TagAttrEquals,
                Token::text("y"),
                close_open(Some("|"), " "),
                Token::text(" a\n"),
                open_close(""),
                Token::text("td"),
                Token::TagCloseClose,
                open_close(""),
                Token::text("tr"),
                Token::TagCloseClose,
                open_close("|}"),
                Token::text("table"),
                Token::TagCloseClose,
            ]
        );
    }

    #[test]
    fn inline_cells() {
        let tokens = tokenize("{|\n! a !! b\n|}");
        let headers = tokens
            .iter()
            .filter(|token| *token == &Token::text("th"))
            .count();
        // Each header has an open and a close name.
        assert_eq!(headers, 4);
    }

    #[test]
    fn unclosed() {
        assert_eq!(tokenize("{|\n| a"), [Token::text("{|\n| a")]);
        assert_eq!(tokenize("{| a"), [Token::text("{| a")]);
    }

    #[test]
    fn not_at_line_start() {
        assert_eq!(tokenize("x {|\n|}"), [Token::text("x {|\n|}")]);
    }
}
