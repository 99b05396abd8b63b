//! Parser driver for template source
//!
//! [`Parser`] walks the token stream produced by the lexer, buffering
//! literal text between tags and flushing it through the whitespace
//! controller, and dispatches action tags to the parsing functions in
//! `actions.rs`. Expression parsing lives in `expressions.rs`; all three
//! files implement methods on the same [`Parser`] struct.
//!
//! # Whitespace control
//!
//! A text span's left flag is the right border flag of the tag before
//! it; its right flag is the left border flag of the tag after it. The
//! flags (and the active autostrip mode) are applied when the buffer is
//! flushed, so whitespace handling is finished at parse time and TEXT
//! nodes render by plain emission.

use std::ops::ControlFlow;

use crate::parser::ast::{Node, NodeList, StripMode, Target};
use crate::parser::lexer::{Lexer, TagKind, Token, TokenKind, WsFlag};
use crate::render::errors::{ErrorKind, TemplateError};
use crate::scope::Compartment;

/// Parse template text into a node tree.
pub fn parse(template: &str, text: &str) -> Result<NodeList, TemplateError> {
    let tokens = Lexer::new(text, template).tokenize()?;
    let mut parser = Parser {
        tokens,
        template: template.to_string(),
        pos: 0,
        tag_end: 0,
        buffer: String::new(),
        buffer_line: 0,
        pre_flag: WsFlag::None,
        autostrip: StripMode::None,
        autostrip_stack: Vec::new(),
    };
    parser.parse_root()
}

/// An action tag that terminates the current body (`elif`, `else`,
/// `end*`, switch cases). The parser position is left just past the
/// action word so the caller can parse the rest of the tag.
pub(crate) struct StopTag {
    pub action: String,
    pub line: usize,
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pub(crate) template: String,
    pos: usize,
    /// Index of the current tag's closing token.
    tag_end: usize,
    buffer: String,
    buffer_line: usize,
    pre_flag: WsFlag,
    autostrip: StripMode,
    autostrip_stack: Vec<StripMode>,
}

impl Parser {
    fn parse_root(&mut self) -> Result<NodeList, TemplateError> {
        let (nodes, stop) = self.parse_body(&[])?;
        debug_assert!(stop.is_none());
        Ok(nodes)
    }

    /// Parse nodes until end of input or until an action tag named in
    /// `stops` is reached. The stop tag is returned unconsumed past its
    /// action word; the caller parses its remainder and calls
    /// [`Parser::finish_tag`].
    pub(crate) fn parse_body(
        &mut self,
        stops: &[&str],
    ) -> Result<(NodeList, Option<StopTag>), TemplateError> {
        let mut list = NodeList::new();

        while self.pos < self.tokens.len() {
            let token = self.tokens[self.pos].clone();
            match token.kind {
                TokenKind::Text(text) => {
                    if self.buffer.is_empty() {
                        self.buffer_line = token.line;
                    }
                    self.buffer.push_str(&text);
                    self.pos += 1;
                }
                TokenKind::TagOpen(kind, left_flag) => {
                    let open_line = token.line;
                    let close = self.find_close(self.pos, kind, open_line)?;
                    self.flush_buffer(&mut list, left_flag);
                    self.pos += 1;
                    self.tag_end = close;

                    match kind {
                        TagKind::Comment => {
                            self.pos = close;
                            self.finish_tag()?;
                        }
                        TagKind::Emitter => {
                            self.parse_emitter(&mut list)?;
                        }
                        TagKind::Action => {
                            if let ControlFlow::Break(stop) =
                                self.parse_action_tag(stops, &mut list)?
                            {
                                return Ok((list, Some(stop)));
                            }
                        }
                    }
                }
                other => {
                    return Err(self.syntax_error(
                        format!("unexpected {}", other.describe()),
                        token.line,
                    ));
                }
            }
        }

        self.flush_buffer(&mut list, WsFlag::None);
        Ok((list, None))
    }

    /// Parse an emitter tag body. Constant expressions fold directly to
    /// text nodes.
    fn parse_emitter(&mut self, list: &mut NodeList) -> Result<(), TemplateError> {
        let line = self.current_line();
        let expr = self.parse_expr()?;
        self.finish_tag()?;

        match expr {
            crate::parser::ast::Expr::Value { value, .. } => {
                let text = value.to_display();
                if !text.is_empty() {
                    list.push(Node::Text { text, line });
                }
            }
            expr => list.push(Node::Emit { expr, line }),
        }
        Ok(())
    }

    /// Read the action word of an action tag and either signal a stop
    /// tag or dispatch to the action parser. Empty action tags are
    /// whitespace-control no-ops.
    fn parse_action_tag(
        &mut self,
        stops: &[&str],
        list: &mut NodeList,
    ) -> Result<ControlFlow<StopTag>, TemplateError> {
        if self.at_tag_end() {
            self.finish_tag()?;
            return Ok(ControlFlow::Continue(()));
        }

        let (action, line) = self.expect_word("expected action name")?;
        if stops.contains(&action.as_str()) {
            return Ok(ControlFlow::Break(StopTag { action, line }));
        }

        self.parse_action(&action, line, list)?;
        Ok(ControlFlow::Continue(()))
    }

    /// Find the closing token of the tag opened at `open_idx`.
    fn find_close(
        &self,
        open_idx: usize,
        kind: TagKind,
        open_line: usize,
    ) -> Result<usize, TemplateError> {
        for (i, token) in self.tokens.iter().enumerate().skip(open_idx + 1) {
            if let TokenKind::TagClose(close_kind, _) = token.kind {
                if close_kind == kind {
                    return Ok(i);
                }
                return Err(self.syntax_error(
                    format!(
                        "mismatched closing tag: expected '{}', found '{}'",
                        kind.closer(),
                        close_kind.closer()
                    ),
                    token.line,
                ));
            }
        }
        Err(self.syntax_error(
            format!("opening tag missing closing '{}'", kind.closer()),
            open_line,
        ))
    }

    /// Consume the current tag's closing token, erroring if unparsed
    /// tokens remain, and record its border flag for the next text span.
    pub(crate) fn finish_tag(&mut self) -> Result<(), TemplateError> {
        if self.pos < self.tag_end {
            let token = &self.tokens[self.pos];
            return Err(self.syntax_error(
                format!("unexpected {}", token.kind.describe()),
                token.line,
            ));
        }
        if let Some(Token {
            kind: TokenKind::TagClose(_, flag),
            ..
        }) = self.tokens.get(self.tag_end)
        {
            self.pre_flag = *flag;
        }
        self.pos = self.tag_end + 1;
        Ok(())
    }

    /// Flush buffered text through the whitespace controller.
    fn flush_buffer(&mut self, list: &mut NodeList, post_flag: WsFlag) {
        let text = std::mem::take(&mut self.buffer);
        let resolved = apply_whitespace(&text, self.pre_flag, post_flag, self.autostrip);
        if !resolved.is_empty() {
            list.push(Node::Text {
                text: resolved,
                line: self.buffer_line,
            });
        }
        self.pre_flag = WsFlag::None;
    }

    // ---- autostrip state, driven by the strip/autostrip actions ----

    pub(crate) fn set_autostrip(&mut self, mode: StripMode) {
        self.autostrip = mode;
    }

    pub(crate) fn push_autostrip(&mut self, mode: Option<StripMode>) {
        self.autostrip_stack.push(self.autostrip);
        if let Some(mode) = mode {
            self.autostrip = mode;
        }
    }

    pub(crate) fn pop_autostrip(&mut self) {
        if let Some(mode) = self.autostrip_stack.pop() {
            self.autostrip = mode;
        }
    }

    // ---- token helpers ----

    pub(crate) fn at_tag_end(&self) -> bool {
        self.pos >= self.tag_end
    }

    /// The line of the next token, or of the tag close when the tag is
    /// exhausted.
    pub(crate) fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tag_end))
            .map(|t| t.line)
            .unwrap_or(0)
    }

    pub(crate) fn peek_kind(&self) -> Option<&TokenKind> {
        if self.at_tag_end() {
            None
        } else {
            self.tokens.get(self.pos).map(|t| &t.kind)
        }
    }

    /// Consume the next token in the current tag.
    pub(crate) fn next_token(&mut self, expected: &str) -> Result<Token, TemplateError> {
        if self.at_tag_end() {
            return Err(self.syntax_error(format!("expected {}", expected), self.current_line()));
        }
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        Ok(token)
    }

    /// Consume the next token if it matches `kind`.
    pub(crate) fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the next token, requiring it to match `kind`.
    pub(crate) fn expect_kind(
        &mut self,
        kind: &TokenKind,
        expected: &str,
    ) -> Result<(), TemplateError> {
        let token = self.next_token(expected)?;
        if &token.kind != kind {
            return Err(self.syntax_error(
                format!("expected {}, found {}", expected, token.kind.describe()),
                token.line,
            ));
        }
        Ok(())
    }

    /// Consume a word token and return its text and line.
    pub(crate) fn expect_word(&mut self, expected: &str) -> Result<(String, usize), TemplateError> {
        let token = self.next_token(expected)?;
        match token.kind {
            TokenKind::Word(word) => Ok((word, token.line)),
            other => Err(self.syntax_error(
                format!("expected {}, found {}", expected, other.describe()),
                token.line,
            )),
        }
    }

    /// Parse an assignment/loop target: a bare name or a
    /// compartment-prefixed name like `g@counter`.
    pub(crate) fn parse_target(&mut self) -> Result<Target, TemplateError> {
        let (word, line) = self.expect_word("variable name")?;
        self.make_target(&word, line)
    }

    pub(crate) fn make_target(&self, word: &str, line: usize) -> Result<Target, TemplateError> {
        match word.split_once('@') {
            Some((prefix, name)) => {
                let compartment = match prefix.chars().next() {
                    Some(ch) if prefix.chars().count() == 1 => Compartment::from_prefix(ch),
                    _ => None,
                };
                let compartment = compartment.ok_or_else(|| {
                    self.syntax_error(format!("invalid compartment prefix: {}", word), line)
                })?;
                if !valid_name(name) {
                    return Err(
                        self.syntax_error(format!("invalid variable name: {}", word), line)
                    );
                }
                Ok(Target {
                    name: name.to_string(),
                    compartment: Some(compartment),
                })
            }
            None => {
                if !valid_name(word) {
                    return Err(
                        self.syntax_error(format!("invalid variable name: {}", word), line)
                    );
                }
                Ok(Target {
                    name: word.to_string(),
                    compartment: None,
                })
            }
        }
    }

    /// Parse a bare name where compartment prefixes are not meaningful
    /// (def parameters).
    pub(crate) fn parse_plain_name(&mut self) -> Result<String, TemplateError> {
        let (word, line) = self.expect_word("name")?;
        if !valid_name(&word) {
            return Err(self.syntax_error(format!("invalid name: {}", word), line));
        }
        Ok(word)
    }

    pub(crate) fn syntax_error(&self, message: impl Into<String>, line: usize) -> TemplateError {
        TemplateError::new(ErrorKind::Parse, message, &self.template, line)
    }

    /// Error for a segmented action missing its end tag.
    pub(crate) fn unclosed(&self, action: &str, line: usize) -> TemplateError {
        self.syntax_error(format!("unmatched action tag: {}", action), line)
    }
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Apply border flags and the autostrip mode to a text span. The result
/// is a pure function of the four inputs.
pub(crate) fn apply_whitespace(
    text: &str,
    left: WsFlag,
    right: WsFlag,
    mode: StripMode,
) -> String {
    let mut text = match mode {
        StripMode::Strip => text.trim().to_string(),
        StripMode::Trim => {
            let mut parts = Vec::new();
            for line in text.lines() {
                let line = line.trim_start();
                if !line.trim_end().is_empty() {
                    parts.push(line);
                }
            }
            parts.join("\n")
        }
        StripMode::None => {
            let mut text = text.to_string();

            // Left strip: up to the first newline, inclusive for '-'
            if matches!(left, WsFlag::StripNl | WsFlag::StripKeepNl) {
                match text.find('\n') {
                    None => text = text.trim_start().to_string(),
                    Some(i) => {
                        let keep = if left == WsFlag::StripNl { i + 1 } else { i };
                        text = format!("{}{}", text[..keep].trim_start(), &text[keep..]);
                    }
                }
            }

            // Right strip: back to the last newline, inclusive for '-'
            if matches!(right, WsFlag::StripNl | WsFlag::StripKeepNl) {
                match text.rfind('\n') {
                    None => text = text.trim_end().to_string(),
                    Some(i) => {
                        let keep = if right == WsFlag::StripNl { i } else { i + 1 };
                        text = format!("{}{}", &text[..keep], text[keep..].trim_end());
                    }
                }
            }

            text
        }
    };

    // '+' and '*' always apply, even under autostrip
    match left {
        WsFlag::AddNl => text.insert(0, '\n'),
        WsFlag::AddSp => text.insert(0, ' '),
        _ => {}
    }
    match right {
        WsFlag::AddNl => text.push('\n'),
        WsFlag::AddSp => text.push(' '),
        _ => {}
    }

    text
}
