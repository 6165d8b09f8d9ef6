//! The portable wikitext tokenizer.
//!
//! Wikitext has no context-free grammar, so the tokenizer is a hand-written
//! scanner which speculatively enters a construct whenever it sees something
//! that could open one. Each attempt pushes a [`Frame`] recording where its
//! tokens start in the shared token buffer. If the attempt cannot be closed,
//! the frame is dropped, its tokens are truncated away, the `(head, context)`
//! pair is remembered as a bad route, and the caller resets the cursor and
//! emits the opening delimiter as plain text instead.

mod links;
mod markup;
mod tables;
mod tags;

use super::{
    contexts::{Context, GlobalContext},
    tokens::{HeadingLevel, HeadingRangeError, Token},
};
use crate::common::{named_entity, numeric_entity_value};
use std::collections::HashSet;

/// The maximum number of frames which may be open at once. Constructs that
/// would nest deeper than this are emitted as text.
pub const MAX_DEPTH: usize = 100;

/// The maximum number of frames which may be opened during one call to
/// [`Tokenizer::tokenize`]. Once it is reached, every remaining construct is
/// emitted as text.
pub const MAX_CYCLES: usize = 100_000;

/// The longest numeric or named entity body, excluding leading zeroes.
const MAX_ENTITY_SIZE: usize = 8;

/// Characters which may start or end a construct.
const MARKERS: [char; 19] = [
    '{', '}', '[', ']', '<', '>', '|', '=', '&', '\'', '"', '#', '*', ';', ':', '/', '-', '!', '\n',
];

/// Returns true if `c` is a marker. The start and end of input (`None`) are
/// markers too.
fn is_marker(c: Option<char>) -> bool {
    c.is_none_or(|c| MARKERS.contains(&c))
}

/// An error caused by a violated tokenizer invariant. These are always bugs.
#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    /// The root frame failed.
    #[error("tokenizer exited with a bad route in {0:?}")]
    ExitedWithBadRoute(Context),
    /// Frames were left open after the root frame returned.
    #[error("tokenizer exited with {0} frames left on the stack")]
    NonEmptyStack(usize),
    /// A frame was popped when none were open.
    #[error("tokenizer popped an empty stack")]
    StackUnderflow,
    /// An unclosed single tag contained a self-closing tag at its own depth.
    #[error("single tag end got an unexpected TagCloseSelfclose")]
    UnexpectedSelfClose,
    /// A tag body was entered without a `TagCloseOpen`.
    #[error("tag end missed a TagCloseOpen")]
    MissingCloseOpen,
    /// A tag frame did not start with its name.
    #[error("tag frame has no name")]
    MissingTagName,
    /// A heading title was returned without a level.
    #[error("heading ended without a level")]
    MissingHeadingLevel,
    /// A heading level was out of range.
    #[error(transparent)]
    HeadingLevel(#[from] HeadingRangeError),
    /// The token stream did not nest.
    #[error("unbalanced token stream: {0}")]
    Unbalanced(String),
}

/// Why a route stopped.
#[derive(Debug)]
enum Halt {
    /// The construct could not be closed. Carries the context of the failed
    /// frame.
    BadRoute(Context),
    /// An invariant was violated.
    Internal(TokenizerError),
}

impl From<TokenizerError> for Halt {
    fn from(value: TokenizerError) -> Self {
        Self::Internal(value)
    }
}

/// The result of a speculative parse.
type Route<T> = Result<T, Halt>;

/// One speculative attempt.
#[derive(Debug)]
struct Frame {
    /// The local context.
    context: Context,
    /// The index of the first token belonging to this frame.
    start: usize,
    /// Text which has not yet been flushed into a [`Token::Text`].
    textbuffer: String,
    /// The route identity used for bad route memoization.
    ident: (usize, Context),
}

/// The portable wikitext tokenizer.
#[derive(Debug, Default)]
pub struct Tokenizer {
    /// The input.
    text: Vec<char>,
    /// The cursor.
    head: usize,
    /// Open frames. The last one is the current frame.
    frames: Vec<Frame>,
    /// Tokens of every open frame, in frame order.
    tokens: Vec<Token>,
    /// Tokenizer-wide context.
    global: GlobalContext,
    /// The number of open frames.
    depth: usize,
    /// The number of frames opened so far.
    cycles: usize,
    /// Routes already known to fail.
    bad_routes: HashSet<(usize, Context)>,
    /// If true, apostrophes are always text.
    skip_style_tags: bool,
    /// The level of the heading which just ended.
    heading_level: Option<HeadingLevel>,
}

impl Tokenizer {
    /// Creates a new tokenizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `text` into tokens, starting in the given context.
    ///
    /// Malformed markup is never an error; it becomes text. An error is
    /// returned only if the tokenizer itself is broken, or if `context`
    /// contains a flag which must be closed before the end of input.
    pub fn tokenize(
        &mut self,
        text: &str,
        context: Context,
        skip_style_tags: bool,
    ) -> Result<Vec<Token>, TokenizerError> {
        log::debug!(
            "tokenizing {} bytes in {context:?} (skip_style_tags: {skip_style_tags})",
            text.len()
        );

        self.text = text.chars().collect();
        self.head = 0;
        self.frames.clear();
        self.tokens.clear();
        self.global = GlobalContext::empty();
        self.depth = 0;
        self.cycles = 0;
        self.bad_routes.clear();
        self.skip_style_tags = skip_style_tags;
        self.heading_level = None;

        let tokens = match self.parse(context) {
            Ok(tokens) => tokens,
            Err(Halt::BadRoute(context)) => {
                return Err(TokenizerError::ExitedWithBadRoute(context));
            }
            Err(Halt::Internal(err)) => return Err(err),
        };

        if !self.frames.is_empty() {
            return Err(TokenizerError::NonEmptyStack(self.frames.len()));
        }

        log::debug!(
            "tokenized into {} tokens ({} bad routes)",
            tokens.len(),
            self.bad_routes.len()
        );
        Ok(tokens)
    }

    /// Returns the character `delta` places after the cursor.
    #[inline]
    fn read(&self, delta: usize) -> Option<char> {
        self.text.get(self.head + delta).copied()
    }

    /// Returns the character `delta` places before the cursor.
    #[inline]
    fn read_back(&self, delta: usize) -> Option<char> {
        self.head
            .checked_sub(delta)
            .and_then(|index| self.text.get(index).copied())
    }

    /// Returns true if the cursor is at the start of a line.
    #[inline]
    fn at_line_start(&self) -> bool {
        matches!(self.read_back(1), None | Some('\n'))
    }

    /// Returns true if only whitespace is between the start of the line and
    /// the cursor.
    fn has_leading_whitespace(&self) -> bool {
        let mut offset = 1;
        loop {
            match self.read_back(offset) {
                None | Some('\n') => return true,
                Some(c) if c.is_whitespace() => offset += 1,
                Some(_) => return false,
            }
        }
    }

    #[inline]
    fn can_recurse(&self) -> bool {
        self.depth < MAX_DEPTH && self.cycles < MAX_CYCLES
    }

    /// The local context of the current frame.
    #[inline]
    fn context(&self) -> Context {
        self.frames
            .last()
            .map_or(Context::empty(), |frame| frame.context)
    }

    #[inline]
    fn set_context(&mut self, context: Context) {
        if let Some(frame) = self.frames.last_mut() {
            frame.context = context;
        }
    }

    #[inline]
    fn add_context(&mut self, flags: Context) {
        self.set_context(self.context() | flags);
    }

    #[inline]
    fn remove_context(&mut self, flags: Context) {
        self.set_context(self.context().difference(flags));
    }

    /// Opens a new frame, unless the route is already known to fail.
    fn push(&mut self, context: Context) -> Route<()> {
        let ident = (self.head, context);
        if self.bad_routes.contains(&ident) {
            log::trace!("known bad route {context:?} at {}", self.head);
            return Err(Halt::BadRoute(context));
        }
        self.frames.push(Frame {
            context,
            start: self.tokens.len(),
            textbuffer: String::new(),
            ident,
        });
        self.depth += 1;
        self.cycles += 1;
        Ok(())
    }

    /// Flushes the text buffer of the current frame into a text token.
    fn push_textbuffer(&mut self) {
        if let Some(frame) = self.frames.last_mut()
            && !frame.textbuffer.is_empty()
        {
            let text = core::mem::take(&mut frame.textbuffer);
            self.tokens.push(Token::Text { text });
        }
    }

    /// Closes the current frame and returns its tokens.
    fn pop(&mut self) -> Result<Vec<Token>, TokenizerError> {
        self.push_textbuffer();
        let frame = self.frames.pop().ok_or(TokenizerError::StackUnderflow)?;
        self.depth -= 1;
        Ok(self.tokens.split_off(frame.start))
    }

    /// Closes the current frame, copying its context into the parent frame,
    /// and returns its tokens.
    fn pop_keep_context(&mut self) -> Result<Vec<Token>, TokenizerError> {
        let context = self.context();
        let tokens = self.pop()?;
        self.set_context(context);
        Ok(tokens)
    }

    /// Closes the current frame and throws away its tokens.
    fn discard(&mut self) -> Result<(), TokenizerError> {
        let frame = self.frames.pop().ok_or(TokenizerError::StackUnderflow)?;
        self.depth -= 1;
        self.tokens.truncate(frame.start);
        Ok(())
    }

    /// Remembers that the current frame cannot succeed.
    fn memoize_bad_route(&mut self) {
        if let Some(frame) = self.frames.last() {
            self.bad_routes.insert(frame.ident);
        }
    }

    /// Fails the current frame.
    fn fail_route(&mut self) -> Halt {
        let context = self.context();
        self.memoize_bad_route();
        if let Err(err) = self.discard() {
            return err.into();
        }
        log::trace!("bad route {context:?} at {}", self.head);
        Halt::BadRoute(context)
    }

    /// Runs a speculative parse. If it fails, the cursor is moved back to
    /// where it was, any frames left open by the failed route are dropped,
    /// and the context of the failed frame is returned.
    fn attempt<T>(
        &mut self,
        route: impl FnOnce(&mut Self) -> Route<T>,
    ) -> Result<Result<T, Context>, TokenizerError> {
        let head = self.head;
        let level = self.frames.len();
        match route(self) {
            Ok(value) => Ok(Ok(value)),
            Err(Halt::BadRoute(context)) => {
                while self.frames.len() > level {
                    self.memoize_bad_route();
                    self.discard()?;
                }
                self.head = head;
                Ok(Err(context))
            }
            Err(Halt::Internal(err)) => Err(err),
        }
    }

    /// Writes a token to the current frame.
    fn emit(&mut self, token: Token) {
        self.push_textbuffer();
        self.tokens.push(token);
    }

    /// Writes a token to the start of the current frame.
    fn emit_first(&mut self, token: Token) {
        self.push_textbuffer();
        let start = self.frames.last().map_or(0, |frame| frame.start);
        self.tokens.insert(start, token);
    }

    /// Writes text to the current frame.
    fn emit_text(&mut self, text: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.textbuffer.push_str(text);
        }
    }

    fn emit_char(&mut self, c: char) {
        if let Some(frame) = self.frames.last_mut() {
            frame.textbuffer.push(c);
        }
    }

    /// Writes a list of tokens to the current frame. A leading text token is
    /// merged into the text buffer.
    fn emit_all(&mut self, tokens: Vec<Token>) {
        let mut tokens = tokens.into_iter().peekable();
        if let Some(Token::Text { text }) =
            tokens.next_if(|token| matches!(token, Token::Text { .. }))
        {
            self.emit_text(&text);
        }
        self.push_textbuffer();
        self.tokens.extend(tokens);
    }

    /// Closes the current frame, writes `text`, then writes the tokens of the
    /// closed frame after it.
    fn emit_text_then_stack(&mut self, text: &str) -> Result<(), TokenizerError> {
        let stack = self.pop()?;
        self.emit_text(text);
        if !stack.is_empty() {
            self.emit_all(stack);
        }
        self.head -= 1;
        Ok(())
    }

    /// Opens a frame and parses until it closes.
    fn parse(&mut self, context: Context) -> Route<Vec<Token>> {
        self.push(context)?;
        self.parse_body()
    }

    /// Parses the current frame until it closes.
    fn parse_body(&mut self) -> Route<Vec<Token>> {
        loop {
            let this = self.read(0);
            let context = self.context();
            if context.intersects(Context::UNSAFE) && !self.verify_safe(this) {
                if context.intersects(Context::DOUBLE) {
                    self.memoize_bad_route();
                    self.discard()?;
                }
                return Err(self.fail_route());
            }

            let Some(this) = this.filter(|this| is_marker(Some(*this))) else {
                let Some(this) = this else {
                    return self.handle_end();
                };
                self.emit_char(this);
                self.head += 1;
                continue;
            };

            let next = self.read(1);
            let context = self.context();
            let in_heading = self.global.contains(GlobalContext::HEADING);

            if this == '{' && next == Some('{') {
                if self.can_recurse() {
                    self.parse_template_or_argument()?;
                } else {
                    self.emit_char(this);
                }
            } else if this == '|' && context.intersects(Context::TEMPLATE) {
                self.handle_template_param()?;
            } else if this == '=' && context.contains(Context::TEMPLATE_PARAM_KEY) {
                if !in_heading && self.at_line_start() && next == Some('=') {
                    self.parse_heading()?;
                } else {
                    self.handle_template_param_value()?;
                }
            } else if this == '}' && next == Some('}') && context.intersects(Context::TEMPLATE) {
                return self.handle_template_end();
            } else if this == '|' && context.contains(Context::ARGUMENT_NAME) {
                self.handle_argument_separator();
            } else if this == '}' && next == Some('}') && context.intersects(Context::ARGUMENT) {
                if self.read(2) == Some('}') {
                    return self.handle_argument_end();
                }
                self.emit_char(this);
            } else if this == '[' && next == Some('[') && self.can_recurse() {
                if context.intersects(Context::NO_WIKILINKS) {
                    self.emit_char(this);
                } else {
                    self.parse_wikilink()?;
                }
            } else if this == '|' && context.contains(Context::WIKILINK_TITLE) {
                self.handle_wikilink_separator();
            } else if this == ']' && next == Some(']') && context.intersects(Context::WIKILINK) {
                return self.handle_wikilink_end();
            } else if this == '[' {
                self.parse_external_link(true)?;
            } else if this == ':' && !is_marker(self.read_back(1)) {
                self.parse_external_link(false)?;
            } else if this == ']' && context.contains(Context::EXT_LINK_TITLE) {
                return Ok(self.pop()?);
            } else if this == '=' && !in_heading && !context.intersects(Context::TEMPLATE) {
                if self.at_line_start() {
                    self.parse_heading()?;
                } else {
                    self.emit_char(this);
                }
            } else if this == '=' && context.intersects(Context::HEADING) {
                return self.handle_heading_end();
            } else if this == '\n' && context.intersects(Context::HEADING) {
                return Err(self.fail_route());
            } else if this == '&' {
                self.parse_entity()?;
            } else if this == '<' && next == Some('!') {
                if self.read(2) == Some('-') && self.read(3) == Some('-') {
                    self.parse_comment()?;
                } else {
                    self.emit_char(this);
                }
            } else if this == '<' && next == Some('/') && self.read(2).is_some() {
                if context.contains(Context::TAG_BODY) {
                    self.handle_tag_open_close()?;
                } else {
                    self.handle_invalid_tag_start()?;
                }
            } else if this == '<' && !context.contains(Context::TAG_CLOSE) {
                if self.can_recurse() {
                    self.parse_tag()?;
                } else {
                    self.emit_char(this);
                }
            } else if this == '>' && context.contains(Context::TAG_CLOSE) {
                return self.handle_tag_close_close();
            } else if this == '\'' && next == Some('\'') && !self.skip_style_tags {
                if let Some(stack) = self.parse_style()? {
                    return Ok(stack);
                }
            } else if self.at_line_start() && matches!(this, '#' | '*' | ';' | ':') {
                self.handle_list();
            } else if self.at_line_start()
                && this == '-'
                && next == Some('-')
                && self.read(2) == Some('-')
                && self.read(3) == Some('-')
            {
                self.handle_hr();
            } else if matches!(this, '\n' | ':') && context.contains(Context::DL_TERM) {
                self.handle_dl_term();
                if this == '\n' {
                    self.remove_context(Context::TABLE_CELL_LINE_CONTEXTS);
                }
            } else if this == '{' && next == Some('|') && self.has_leading_whitespace() {
                if self.can_recurse() {
                    self.parse_table()?;
                } else {
                    self.emit_char(this);
                }
            } else if context.contains(Context::TABLE_OPEN) {
                if let Some(stack) = self.handle_table_markup(this, next, context)? {
                    return Ok(stack);
                }
            } else {
                self.emit_char(this);
            }

            self.head += 1;
        }
    }

    /// Handles the end of input.
    fn handle_end(&mut self) -> Route<Vec<Token>> {
        let context = self.context();
        if context.intersects(Context::FAIL) {
            if context.contains(Context::TAG_BODY) && self.tag_name().is_ok_and(|name| {
                super::definitions::is_single(&name)
            }) {
                return self.handle_single_tag_end();
            }
            if context.contains(Context::TABLE_CELL_OPEN) {
                self.discard()?;
            }
            if self.context().intersects(Context::DOUBLE) {
                self.discard()?;
            }
            return Err(self.fail_route());
        }
        Ok(self.pop()?)
    }

    /// Checks whether `this` is allowed in the current unsafe context. This
    /// may set safety flags which cause the *next* character to fail.
    fn verify_safe(&mut self, this: Option<char>) -> bool {
        let context = self.context();
        if context.contains(Context::FAIL_NEXT) {
            return false;
        }

        if context.contains(Context::WIKILINK_TITLE) {
            match this {
                Some(']' | '{') => self.add_context(Context::FAIL_NEXT),
                Some('\n' | '[' | '}' | '>') => return false,
                Some('<') => {
                    if self.read(1) == Some('!') {
                        self.add_context(Context::FAIL_NEXT);
                    } else {
                        return false;
                    }
                }
                _ => {}
            }
            return true;
        }

        if context.contains(Context::EXT_LINK_TITLE) {
            return this != Some('\n');
        }

        if context.contains(Context::TEMPLATE_NAME) {
            match this {
                Some('{') => {
                    self.add_context(Context::HAS_TEMPLATE | Context::FAIL_NEXT);
                    return true;
                }
                Some('}') => {
                    self.add_context(Context::FAIL_NEXT);
                    return true;
                }
                Some('<') if self.read(1) == Some('!') => {
                    self.add_context(Context::FAIL_NEXT);
                    return true;
                }
                Some('[' | ']' | '<' | '>') => return false,
                Some('|') => return true,
                _ => {}
            }

            let is_text = this.is_none_or(|this| !this.is_whitespace());
            if context.contains(Context::HAS_TEXT) {
                if context.contains(Context::FAIL_ON_TEXT) {
                    if is_text {
                        return false;
                    }
                } else if this == Some('\n') {
                    self.add_context(Context::FAIL_ON_TEXT);
                }
            } else if is_text {
                self.add_context(Context::HAS_TEXT);
            }
            return true;
        }

        if context.contains(Context::TAG_CLOSE) {
            return this != Some('<');
        }

        if context.contains(Context::FAIL_ON_EQUALS) {
            if this == Some('=') {
                return false;
            }
        } else if context.contains(Context::FAIL_ON_LBRACE) {
            if this == Some('{') || (self.read_back(1) == Some('{') && self.read_back(2) == Some('{'))
            {
                if context.intersects(Context::TEMPLATE) {
                    self.add_context(Context::FAIL_ON_EQUALS);
                } else {
                    self.add_context(Context::FAIL_NEXT);
                }
                return true;
            }
            self.remove_context(Context::FAIL_ON_LBRACE);
        } else if context.contains(Context::FAIL_ON_RBRACE) {
            if this == Some('}') {
                self.add_context(Context::FAIL_NEXT);
                return true;
            }
            self.remove_context(Context::FAIL_ON_RBRACE);
        } else if this == Some('{') {
            self.add_context(Context::FAIL_ON_LBRACE);
        } else if this == Some('}') {
            self.add_context(Context::FAIL_ON_RBRACE);
        }
        true
    }

    /// Parses a run of two or more `{`, resolving it greedily into arguments
    /// and templates.
    fn parse_template_or_argument(&mut self) -> Route<()> {
        self.head += 2;
        let mut braces = 2;
        while self.read(0) == Some('{') {
            self.head += 1;
            braces += 1;
        }
        let mut has_content = false;
        self.push(Context::empty())?;

        while braces > 0 {
            if braces == 1 {
                return Ok(self.emit_text_then_stack("{")?);
            }

            if braces == 2 {
                if self.attempt(|t| t.parse_template(has_content))?.is_err() {
                    return Ok(self.emit_text_then_stack("{{")?);
                }
                break;
            }

            if self.attempt(Self::parse_argument)?.is_ok() {
                braces -= 3;
            } else if self.attempt(|t| t.parse_template(has_content))?.is_ok() {
                braces -= 2;
            } else {
                return Ok(self.emit_text_then_stack(&"{".repeat(braces))?);
            }

            if braces > 0 {
                has_content = true;
                self.head += 1;
            }
        }

        let stack = self.pop()?;
        self.emit_all(stack);
        self.remove_context(Context::FAIL_NEXT);
        Ok(())
    }

    fn parse_template(&mut self, has_content: bool) -> Route<()> {
        let mut context = Context::TEMPLATE_NAME;
        if has_content {
            context |= Context::HAS_TEMPLATE;
        }
        let template = self.parse(context)?;
        self.emit_first(Token::TemplateOpen);
        self.emit_all(template);
        self.emit(Token::TemplateClose);
        Ok(())
    }

    fn parse_argument(&mut self) -> Route<()> {
        let argument = self.parse(Context::ARGUMENT_NAME)?;
        self.emit_first(Token::ArgumentOpen);
        self.emit_all(argument);
        self.emit(Token::ArgumentClose);
        Ok(())
    }

    /// Handles a `|` inside a template.
    fn handle_template_param(&mut self) -> Route<()> {
        let context = self.context();
        if context.contains(Context::TEMPLATE_NAME) {
            if !context.intersects(Context::HAS_TEXT | Context::HAS_TEMPLATE) {
                return Err(self.fail_route());
            }
            self.remove_context(Context::TEMPLATE_NAME);
        } else if context.contains(Context::TEMPLATE_PARAM_VALUE) {
            self.remove_context(Context::TEMPLATE_PARAM_VALUE);
        } else {
            let key = self.pop()?;
            self.emit_all(key);
        }
        self.add_context(Context::TEMPLATE_PARAM_KEY);
        self.emit(Token::TemplateParamSeparator);
        self.push(self.context())
    }

    /// Handles a `=` inside a template parameter key.
    fn handle_template_param_value(&mut self) -> Route<()> {
        let key = self.pop()?;
        self.emit_all(key);
        self.remove_context(Context::TEMPLATE_PARAM_KEY);
        self.add_context(Context::TEMPLATE_PARAM_VALUE);
        self.emit(Token::TemplateParamEquals);
        Ok(())
    }

    fn handle_template_end(&mut self) -> Route<Vec<Token>> {
        let context = self.context();
        if context.contains(Context::TEMPLATE_NAME) {
            if !context.intersects(Context::HAS_TEXT | Context::HAS_TEMPLATE) {
                return Err(self.fail_route());
            }
        } else if context.contains(Context::TEMPLATE_PARAM_KEY) {
            let key = self.pop()?;
            self.emit_all(key);
        }
        self.head += 1;
        Ok(self.pop()?)
    }

    fn handle_argument_separator(&mut self) {
        self.remove_context(Context::ARGUMENT_NAME);
        self.add_context(Context::ARGUMENT_DEFAULT);
        self.emit(Token::ArgumentSeparator);
    }

    fn handle_argument_end(&mut self) -> Route<Vec<Token>> {
        self.head += 2;
        Ok(self.pop()?)
    }

    /// Parses a heading at the start of a line.
    fn parse_heading(&mut self) -> Route<()> {
        self.global.insert(GlobalContext::HEADING);
        let reset = self.head;
        self.head += 1;
        let mut best = 1;
        while self.read(0) == Some('=') {
            best += 1;
            self.head += 1;
        }

        let title = self.attempt(|t| t.parse(Context::heading(best)));
        self.global.remove(GlobalContext::HEADING);

        match title? {
            Ok(title) => {
                let level = self
                    .heading_level
                    .take()
                    .ok_or(TokenizerError::MissingHeadingLevel)?;
                self.emit(Token::HeadingStart { level });
                let level = usize::from(u8::from(level));
                if level < best {
                    self.emit_text(&"=".repeat(best - level));
                }
                self.emit_all(title);
                self.emit(Token::HeadingEnd);
            }
            Err(_) => {
                self.head = reset + best - 1;
                self.emit_text(&"=".repeat(best));
            }
        }
        Ok(())
    }

    /// Handles a run of `=` inside a heading, which might be the end of the
    /// heading or might just be part of its title.
    fn handle_heading_end(&mut self) -> Route<Vec<Token>> {
        let reset = self.head;
        self.head += 1;
        let mut best = 1;
        while self.read(0) == Some('=') {
            best += 1;
            self.head += 1;
        }

        let context = self.context();
        let current = usize::from(context.heading_level().unwrap_or(1));
        let level = current.min(best.min(6));

        match self.attempt(|t| t.parse(context))? {
            Ok(after) => {
                let after_level = self
                    .heading_level
                    .take()
                    .ok_or(TokenizerError::MissingHeadingLevel)?;
                self.emit_text(&"=".repeat(best));
                self.emit_all(after);
                self.heading_level = Some(after_level);
            }
            Err(_) => {
                if level < best {
                    self.emit_text(&"=".repeat(best - level));
                }
                self.head = reset + best - 1;
                let level = u8::try_from(level).unwrap_or(6);
                self.heading_level =
                    Some(HeadingLevel::try_from(level).map_err(TokenizerError::from)?);
            }
        }
        Ok(self.pop()?)
    }

    /// Parses an HTML entity, or emits `&` as text.
    fn parse_entity(&mut self) -> Route<()> {
        let entity = self.attempt(|t| {
            t.push(Context::HTML_ENTITY)?;
            t.really_parse_entity()?;
            Ok(t.pop()?)
        })?;

        match entity {
            Ok(entity) => self.emit_all(entity),
            Err(_) => self.emit_char('&'),
        }
        Ok(())
    }

    fn really_parse_entity(&mut self) -> Route<()> {
        self.emit(Token::HtmlEntityStart);
        self.head += 1;

        let mut numeric = false;
        let mut hexadecimal = false;
        if self.read(0) == Some('#') {
            numeric = true;
            self.emit(Token::HtmlEntityNumeric);
            self.head += 1;
            if let Some(char @ ('x' | 'X')) = self.read(0) {
                hexadecimal = true;
                self.emit(Token::HtmlEntityHex { char });
                self.head += 1;
            }
        }

        let mut text = String::new();
        let mut zeroes = 0;
        loop {
            let this = self.read(0);
            if this == Some(';') {
                if text.is_empty() {
                    return Err(self.fail_route());
                }
                break;
            }
            if text.is_empty() && numeric && this == Some('0') {
                zeroes += 1;
                self.head += 1;
                continue;
            }
            if text.len() >= MAX_ENTITY_SIZE {
                return Err(self.fail_route());
            }
            let valid = this.filter(|c| {
                !is_marker(Some(*c))
                    && if hexadecimal {
                        c.is_ascii_hexdigit()
                    } else if numeric {
                        c.is_ascii_digit()
                    } else {
                        c.is_ascii_alphanumeric()
                    }
            });
            let Some(c) = valid else {
                return Err(self.fail_route());
            };
            text.push(c);
            self.head += 1;
        }

        let known = if numeric {
            numeric_entity_value(&text, hexadecimal).is_some()
        } else {
            named_entity(&text).is_some()
        };
        if !known {
            return Err(self.fail_route());
        }

        self.emit(Token::text("0".repeat(zeroes) + &text));
        self.emit(Token::HtmlEntityEnd);
        Ok(())
    }

    /// Parses an HTML comment, or emits `<!--` as text if it never ends.
    fn parse_comment(&mut self) -> Route<()> {
        self.head += 4;
        let reset = self.head - 1;
        self.push(Context::empty())?;
        loop {
            let Some(this) = self.read(0) else {
                self.discard()?;
                self.head = reset;
                self.emit_text("<!--");
                return Ok(());
            };

            if this == '-' && self.read(1) == Some('-') && self.read(2) == Some('>') {
                self.emit_first(Token::CommentStart);
                self.emit(Token::CommentEnd);
                let comment = self.pop()?;
                self.emit_all(comment);
                self.head += 2;
                // A comment start inside a template name or link title sets
                // this flag until the comment is known to be closed.
                self.remove_context(Context::FAIL_NEXT);
                return Ok(());
            }

            self.emit_char(this);
            self.head += 1;
        }
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

    #[test]
    fn empty() {
        assert_eq!(tokenize(""), []);
    }

    #[test]
    fn plain_text() {
        assert_eq!(tokenize("plain text"), [Token::text("plain text")]);
    }

    #[test]
    fn template() {
        assert_eq!(
            tokenize("{{foo|bar=baz}}"),
            [
                Token::TemplateOpen,
                Token::text("foo"),
                Token::TemplateParamSeparator,
                Token::text("bar"),
                Token::TemplateParamEquals,
                Token::text("baz"),
                Token::TemplateClose,
            ]
        );
    }

    #[test]
    fn nested_template() {
        assert_eq!(
            tokenize("{{a|{{b}}}}"),
            [
                Token::TemplateOpen,
                Token::text("a"),
                Token::TemplateParamSeparator,
                Token::TemplateOpen,
                Token::text("b"),
                Token::TemplateClose,
                Token::TemplateClose,
            ]
        );
    }

    #[test]
    fn unclosed_template() {
        assert_eq!(tokenize("{{unclosed"), [Token::text("{{unclosed")]);
    }

    #[test]
    fn empty_template_name() {
        assert_eq!(tokenize("{{|a}}"), [Token::text("{{|a}}")]);
    }

    #[test]
    fn bad_template_name() {
        assert_eq!(tokenize("{{a[b}}"), [Token::text("{{a[b}}")]);
        assert_eq!(tokenize("{{a\nb}}"), [Token::text("{{a\nb}}")]);
    }

    #[test]
    fn argument() {
        assert_eq!(
            tokenize("{{{a|b}}}"),
            [
                Token::ArgumentOpen,
                Token::text("a"),
                Token::ArgumentSeparator,
                Token::text("b"),
                Token::ArgumentClose,
            ]
        );
    }

    #[test]
    fn five_braces() {
        assert_eq!(
            tokenize("{{{{{a}}}}}"),
            [
                Token::TemplateOpen,
                Token::ArgumentOpen,
                Token::text("a"),
                Token::ArgumentClose,
                Token::TemplateClose,
            ]
        );
    }

    #[test]
    fn heading() {
        assert_eq!(
            tokenize("== Title =="),
            [
                Token::HeadingStart {
                    level: HeadingLevel::try_from(2).unwrap()
                },
                Token::text(" Title "),
                Token::HeadingEnd,
            ]
        );
    }

    #[test]
    fn uneven_heading() {
        assert_eq!(
            tokenize("===Title=="),
            [
                Token::HeadingStart {
                    level: HeadingLevel::try_from(2).unwrap()
                },
                Token::text("=Title"),
                Token::HeadingEnd,
            ]
        );
    }

    #[test]
    fn heading_with_newline() {
        assert_eq!(tokenize("== a\nb =="), [Token::text("== a\nb ==")]);
    }

    #[test]
    fn entities() {
        assert_eq!(
            tokenize("&amp;&#x2A;&#0065;"),
            [
                Token::HtmlEntityStart,
                Token::text("amp"),
                Token::HtmlEntityEnd,
                Token::HtmlEntityStart,
                Token::HtmlEntityNumeric,
                Token::HtmlEntityHex { char: 'x' },
                Token::text("2A"),
                Token::HtmlEntityEnd,
                Token::HtmlEntityStart,
                Token::HtmlEntityNumeric,
                Token::text("0065"),
                Token::HtmlEntityEnd,
            ]
        );
        assert_eq!(tokenize("&bogus; &#0; &#x110000;"), [Token::text(
            "&bogus; &#0; &#x110000;"
        )]);
    }

    #[test]
    fn comment() {
        assert_eq!(
            tokenize("a<!-- b -->c"),
            [
                Token::text("a"),
                Token::CommentStart,
                Token::text(" b "),
                Token::CommentEnd,
                Token::text("c"),
            ]
        );
        assert_eq!(tokenize("<!-- open"), [Token::text("<!-- open")]);
    }

    #[test]
    fn fail_context() {
        assert!(matches!(
            Tokenizer::new().tokenize("abc", Context::TEMPLATE_NAME, false),
            Err(TokenizerError::ExitedWithBadRoute(_))
        ));
    }

    #[test]
    fn depth_limit() {
        let depth = MAX_DEPTH + 20;
        let text = format!("{}x{}", "{{a|".repeat(depth), "}}".repeat(depth));
        let tokens = tokenize(&text);
        let opens = tokens
            .iter()
            .filter(|token| matches!(token, Token::TemplateOpen))
            .count();
        let closes = tokens
            .iter()
            .filter(|token| matches!(token, Token::TemplateClose))
            .count();
        assert!(opens > 0);
        assert!(opens < depth);
        assert_eq!(opens, closes);
    }

    #[test]
    fn failed_braces_stay_one_text() {
        assert_eq!(tokenize("{{{a"), [Token::text("{{{a")]);
        assert_eq!(tokenize("{{{a|b"), [Token::text("{{{a|b")]);
        assert_eq!(tokenize("x{{y"), [Token::text("x{{y")]);
        assert_eq!(tokenize("{{a|{{b"), [Token::text("{{a|{{b")]);
    }

    #[test]
    fn cycle_limit() {
        let count = MAX_CYCLES;
        let tokens = tokenize(&"{{a}}".repeat(count));
        let opens = tokens
            .iter()
            .filter(|token| matches!(token, Token::TemplateOpen))
            .count();
        let closes = tokens
            .iter()
            .filter(|token| matches!(token, Token::TemplateClose))
            .count();
        assert!(opens > 0);
        assert!(opens < count);
        assert_eq!(opens, closes);
        assert!(matches!(
            tokens.last(),
            Some(Token::Text { text }) if text.ends_with("{{a}}{{a}}")
        ));
    }
}
