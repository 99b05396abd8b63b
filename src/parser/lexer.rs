//! Lexer (tokenizer) for template source
//!
//! Converts raw template text into a flat [`Token`] stream consumed by
//! the parser. The lexer runs in three modes: outside tags it splits the
//! source into text spans and tag-open tokens, inside a comment it scans
//! for the comment closer, and inside an action or emitter tag it
//! tokenizes expression syntax.
//!
//! Tag openers are `{#`, `{%`, and `{{`; closers are `#}`, `%}`, and
//! `}}`. A single optional border-flag character from `- ^ + *`
//! immediately inside an opener or closer controls whitespace handling
//! of the adjacent text span and is carried on the tag token.
//!
//! Every token records the 1-based source line it starts on so parse and
//! render errors can report an accurate location.

use crate::render::errors::{ErrorKind, TemplateError};

/// Which pair of tag delimiters a tag token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `{# ... #}`
    Comment,
    /// `{% ... %}`
    Action,
    /// `{{ ... }}`
    Emitter,
}

impl TagKind {
    pub(crate) fn closer(&self) -> &'static str {
        match self {
            TagKind::Comment => "#}",
            TagKind::Action => "%}",
            TagKind::Emitter => "}}",
        }
    }
}

/// Whitespace-control border flag attached to a tag edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WsFlag {
    /// No flag present
    #[default]
    None,
    /// `-`: strip whitespace through and including the nearest newline
    StripNl,
    /// `^`: strip whitespace up to but not including the nearest newline
    StripKeepNl,
    /// `+`: insert a newline
    AddNl,
    /// `*`: insert a single space
    AddSp,
}

impl WsFlag {
    fn from_char(ch: char) -> Option<WsFlag> {
        match ch {
            '-' => Some(WsFlag::StripNl),
            '^' => Some(WsFlag::StripKeepNl),
            '+' => Some(WsFlag::AddNl),
            '*' => Some(WsFlag::AddSp),
            _ => None,
        }
    }
}

/// All token variants produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Literal text between tags
    Text(String),
    /// A tag opener with its left border flag
    TagOpen(TagKind, WsFlag),
    /// A tag closer with its right border flag
    TagClose(TagKind, WsFlag),

    // Literals and words
    Str(String),
    Int(i64),
    Float(f64),
    Word(String),

    // Punctuation
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Comma,
    Colon,
    Dot,
    Semicolon,
    Assign,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Keywords
    And,
    Or,
    Not,
    In,
}

impl TokenKind {
    /// Short description used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Text(_) => "text".to_string(),
            TokenKind::TagOpen(kind, _) => format!("'{}'", open_str(*kind)),
            TokenKind::TagClose(kind, _) => format!("'{}'", kind.closer()),
            TokenKind::Str(s) => format!("string \"{}\"", s),
            TokenKind::Int(n) => format!("integer {}", n),
            TokenKind::Float(f) => format!("float {}", f),
            TokenKind::Word(w) => format!("'{}'", w),
            TokenKind::OpenParen => "'('".to_string(),
            TokenKind::CloseParen => "')'".to_string(),
            TokenKind::OpenBracket => "'['".to_string(),
            TokenKind::CloseBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Semicolon => "';'".to_string(),
            TokenKind::Assign => "'='".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Percent => "'%'".to_string(),
            TokenKind::Eq => "'=='".to_string(),
            TokenKind::Ne => "'!='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::Le => "'<='".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::Ge => "'>='".to_string(),
            TokenKind::And => "'and'".to_string(),
            TokenKind::Or => "'or'".to_string(),
            TokenKind::Not => "'not'".to_string(),
            TokenKind::In => "'in'".to_string(),
        }
    }
}

fn open_str(kind: TagKind) -> &'static str {
    match kind {
        TagKind::Comment => "{#",
        TagKind::Action => "{%",
        TagKind::Emitter => "{{",
    }
}

/// A token with the source line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, line: usize) -> Self {
        Token { kind, line }
    }
}

enum Mode {
    Text,
    Comment,
    Tag(TagKind),
}

/// Lexer for template source text
pub struct Lexer<'a> {
    input: Vec<char>,
    template: &'a str,
    position: usize,
    line: usize,
    mode: Mode,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer. `template` is the template name used in
    /// error messages.
    pub fn new(input: &str, template: &'a str) -> Self {
        Lexer {
            input: input.chars().collect(),
            template,
            position: 0,
            line: 1,
            mode: Mode::Text,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, TemplateError> {
        while self.position < self.input.len() {
            match self.mode {
                Mode::Text => self.lex_text()?,
                Mode::Comment => self.lex_comment()?,
                Mode::Tag(kind) => self.lex_tag(kind)?,
            }
        }

        match self.mode {
            Mode::Text => Ok(self.tokens),
            Mode::Comment => Err(self.error("unclosed comment tag")),
            Mode::Tag(kind) => Err(self.error(format!(
                "opening tag missing closing '{}'",
                kind.closer()
            ))),
        }
    }

    /// Accumulate literal text until the next tag opener.
    fn lex_text(&mut self) -> Result<(), TemplateError> {
        let start_line = self.line;
        let mut text = String::new();

        while let Some(ch) = self.peek() {
            if ch == '{' {
                if let Some(kind) = self.tag_at(self.position) {
                    if !text.is_empty() {
                        self.tokens.push(Token::new(TokenKind::Text(text), start_line));
                    }
                    self.open_tag(kind);
                    return Ok(());
                }
            }
            text.push(ch);
            self.advance();
        }

        if !text.is_empty() {
            self.tokens.push(Token::new(TokenKind::Text(text), start_line));
        }
        Ok(())
    }

    /// Consume a tag opener and its optional border flag.
    fn open_tag(&mut self, kind: TagKind) {
        let line = self.line;
        self.advance();
        self.advance();

        let flag = match self.peek().and_then(WsFlag::from_char) {
            Some(flag) => {
                self.advance();
                flag
            }
            None => WsFlag::None,
        };

        self.tokens
            .push(Token::new(TokenKind::TagOpen(kind, flag), line));
        self.mode = match kind {
            TagKind::Comment => Mode::Comment,
            other => Mode::Tag(other),
        };
    }

    /// Scan a comment body for its closer; the body produces no tokens.
    fn lex_comment(&mut self) -> Result<(), TemplateError> {
        while self.position < self.input.len() {
            if let Some(flag) = self.peek().and_then(WsFlag::from_char) {
                if self.closer_at(self.position + 1) == Some(TagKind::Comment) {
                    self.tokens.push(Token::new(
                        TokenKind::TagClose(TagKind::Comment, flag),
                        self.line,
                    ));
                    self.advance();
                    self.advance();
                    self.advance();
                    self.mode = Mode::Text;
                    return Ok(());
                }
            }
            if self.closer_at(self.position) == Some(TagKind::Comment) {
                self.tokens.push(Token::new(
                    TokenKind::TagClose(TagKind::Comment, WsFlag::None),
                    self.line,
                ));
                self.advance();
                self.advance();
                self.mode = Mode::Text;
                return Ok(());
            }
            self.advance();
        }
        Err(self.error("unclosed comment tag"))
    }

    /// Tokenize expression syntax inside an action or emitter tag.
    fn lex_tag(&mut self, tag: TagKind) -> Result<(), TemplateError> {
        while let Some(ch) = self.peek() {
            // Whitespace is ignored
            if ch == ' ' || ch == '\t' || ch == '\n' || ch == '\r' {
                self.advance();
                continue;
            }

            // Closer, no border flag
            if let Some(kind) = self.closer_at(self.position) {
                self.tokens
                    .push(Token::new(TokenKind::TagClose(kind, WsFlag::None), self.line));
                self.advance();
                self.advance();
                self.mode = Mode::Text;
                return Ok(());
            }

            // Closer preceded by a border flag
            if let Some(flag) = WsFlag::from_char(ch) {
                if let Some(kind) = self.closer_at(self.position + 1) {
                    self.tokens
                        .push(Token::new(TokenKind::TagClose(kind, flag), self.line));
                    self.advance();
                    self.advance();
                    self.advance();
                    self.mode = Mode::Text;
                    return Ok(());
                }
            }

            let line = self.line;
            match ch {
                '(' => self.push_simple(TokenKind::OpenParen),
                ')' => self.push_simple(TokenKind::CloseParen),
                '[' => self.push_simple(TokenKind::OpenBracket),
                ']' => self.push_simple(TokenKind::CloseBracket),
                ',' => self.push_simple(TokenKind::Comma),
                ':' => self.push_simple(TokenKind::Colon),
                ';' => self.push_simple(TokenKind::Semicolon),
                '+' => self.push_simple(TokenKind::Plus),
                '-' => self.push_simple(TokenKind::Minus),
                '*' => self.push_simple(TokenKind::Star),
                '/' => self.push_simple(TokenKind::Slash),
                '%' => self.push_simple(TokenKind::Percent),
                '=' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        self.tokens.push(Token::new(TokenKind::Eq, line));
                    } else {
                        self.tokens.push(Token::new(TokenKind::Assign, line));
                    }
                }
                '!' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        self.tokens.push(Token::new(TokenKind::Ne, line));
                    } else {
                        return Err(self.error("unexpected character '!'"));
                    }
                }
                '<' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        self.tokens.push(Token::new(TokenKind::Le, line));
                    } else {
                        self.tokens.push(Token::new(TokenKind::Lt, line));
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        self.tokens.push(Token::new(TokenKind::Ge, line));
                    } else {
                        self.tokens.push(Token::new(TokenKind::Gt, line));
                    }
                }
                '.' => {
                    if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                        self.lex_number()?;
                    } else {
                        self.push_simple(TokenKind::Dot);
                    }
                }
                '"' | '\'' => self.lex_string(ch)?,
                '0'..='9' => self.lex_number()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(),
                _ => {
                    return Err(self.error(format!("unexpected character '{}'", ch)));
                }
            }
        }

        Err(self.error(format!(
            "opening tag missing closing '{}'",
            tag.closer()
        )))
    }

    /// Lex an integer or float literal. Signs are left to the
    /// expression parser's unary minus.
    fn lex_number(&mut self) -> Result<(), TemplateError> {
        let line = self.line;
        let mut text = String::new();
        let mut found_dot = false;

        if self.peek() == Some('.') {
            text.push('0');
            text.push('.');
            found_dot = true;
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '.' && !found_dot && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
            {
                text.push(ch);
                found_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if found_dot {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid float literal: {}", text)))?;
            self.tokens.push(Token::new(TokenKind::Float(value), line));
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid integer literal: {}", text)))?;
            self.tokens.push(Token::new(TokenKind::Int(value), line));
        }
        Ok(())
    }

    /// Lex a quoted string with backslash escapes.
    fn lex_string(&mut self, quote: char) -> Result<(), TemplateError> {
        let line = self.line;
        self.advance();
        let mut text = String::new();

        while let Some(ch) = self.peek() {
            if ch == quote {
                self.advance();
                self.tokens.push(Token::new(TokenKind::Str(text), line));
                return Ok(());
            }

            if ch == '\\' {
                self.advance();
                let escaped = self.peek().ok_or_else(|| self.error("unclosed string"))?;
                let unescaped = match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    _ => {
                        return Err(self.error(format!("unknown escape sequence: \\{}", escaped)));
                    }
                };
                text.push(unescaped);
                self.advance();
            } else {
                text.push(ch);
                self.advance();
            }
        }

        Err(self.error("unclosed string"))
    }

    /// Lex a word: an identifier, keyword, or compartment-prefixed
    /// variable name (the `@` stays in the word for the parser).
    fn lex_word(&mut self) {
        let line = self.line;
        let mut word = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '@' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match word.as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            _ => TokenKind::Word(word),
        };
        self.tokens.push(Token::new(kind, line));
    }

    /// The tag kind opened at `pos`, if `pos` starts a tag opener.
    fn tag_at(&self, pos: usize) -> Option<TagKind> {
        if self.input.get(pos) != Some(&'{') {
            return None;
        }
        match self.input.get(pos + 1) {
            Some('#') => Some(TagKind::Comment),
            Some('%') => Some(TagKind::Action),
            Some('{') => Some(TagKind::Emitter),
            _ => None,
        }
    }

    /// The tag kind closed at `pos`, if `pos` starts a tag closer.
    fn closer_at(&self, pos: usize) -> Option<TagKind> {
        let second = self.input.get(pos + 1);
        match (self.input.get(pos), second) {
            (Some('#'), Some('}')) => Some(TagKind::Comment),
            (Some('%'), Some('}')) => Some(TagKind::Action),
            (Some('}'), Some('}')) => Some(TagKind::Emitter),
            _ => None,
        }
    }

    fn push_simple(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.line));
        self.advance();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(&ch) = self.input.get(self.position) {
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::new(ErrorKind::Parse, message, self.template, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input, "test").tokenize().unwrap()
    }

    #[test]
    fn test_text_only() {
        let tokens = lex("plain text with { braces }");
        assert_eq!(tokens.len(), 1);
        assert_eq!(
            tokens[0].kind,
            TokenKind::Text("plain text with { braces }".to_string())
        );
    }

    #[test]
    fn test_emitter_tag() {
        let tokens = lex("a{{ name }}b");
        assert_eq!(tokens[0].kind, TokenKind::Text("a".to_string()));
        assert_eq!(
            tokens[1].kind,
            TokenKind::TagOpen(TagKind::Emitter, WsFlag::None)
        );
        assert_eq!(tokens[2].kind, TokenKind::Word("name".to_string()));
        assert_eq!(
            tokens[3].kind,
            TokenKind::TagClose(TagKind::Emitter, WsFlag::None)
        );
        assert_eq!(tokens[4].kind, TokenKind::Text("b".to_string()));
    }

    #[test]
    fn test_border_flags() {
        let tokens = lex("{%- x ^%}");
        assert_eq!(
            tokens[0].kind,
            TokenKind::TagOpen(TagKind::Action, WsFlag::StripNl)
        );
        assert_eq!(
            tokens[2].kind,
            TokenKind::TagClose(TagKind::Action, WsFlag::StripKeepNl)
        );
    }

    #[test]
    fn test_flag_chars_are_operators_mid_tag() {
        let tokens = lex("{{ a - b * c }}");
        assert_eq!(tokens[2].kind, TokenKind::Minus);
        assert_eq!(tokens[4].kind, TokenKind::Star);
        assert_eq!(
            tokens[6].kind,
            TokenKind::TagClose(TagKind::Emitter, WsFlag::None)
        );
    }

    #[test]
    fn test_comment_with_flags() {
        let tokens = lex("x{#+ ignored -#}y");
        assert_eq!(tokens[0].kind, TokenKind::Text("x".to_string()));
        assert_eq!(
            tokens[1].kind,
            TokenKind::TagOpen(TagKind::Comment, WsFlag::AddNl)
        );
        assert_eq!(
            tokens[2].kind,
            TokenKind::TagClose(TagKind::Comment, WsFlag::StripNl)
        );
        assert_eq!(tokens[3].kind, TokenKind::Text("y".to_string()));
    }

    #[test]
    fn test_operators_and_keywords() {
        let tokens = lex("{{ a == 1 and b != 2 or not c <= 3 }}");
        let kinds: Vec<&TokenKind> = tokens.iter().map(|t| &t.kind).collect();
        assert!(kinds.contains(&&TokenKind::Eq));
        assert!(kinds.contains(&&TokenKind::And));
        assert!(kinds.contains(&&TokenKind::Ne));
        assert!(kinds.contains(&&TokenKind::Or));
        assert!(kinds.contains(&&TokenKind::Not));
        assert!(kinds.contains(&&TokenKind::Le));
    }

    #[test]
    fn test_number_literals() {
        let tokens = lex("{{ 42 3.5 .5 }}");
        assert_eq!(tokens[1].kind, TokenKind::Int(42));
        assert_eq!(tokens[2].kind, TokenKind::Float(3.5));
        assert_eq!(tokens[3].kind, TokenKind::Float(0.5));
    }

    #[test]
    fn test_string_escapes() {
        let tokens = lex(r#"{{ "a\n\t\"b" 'c\'d' }}"#);
        assert_eq!(tokens[1].kind, TokenKind::Str("a\n\t\"b".to_string()));
        assert_eq!(tokens[2].kind, TokenKind::Str("c'd".to_string()));
    }

    #[test]
    fn test_compartment_prefix_word() {
        let tokens = lex("{{ g@counter }}");
        assert_eq!(tokens[1].kind, TokenKind::Word("g@counter".to_string()));
    }

    #[test]
    fn test_line_numbers() {
        let tokens = lex("a\nb\n{{ x\n}}c");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
        assert_eq!(tokens[2].line, 3);
        assert_eq!(tokens[3].line, 4);
        assert_eq!(tokens[4].line, 4);
    }

    #[test]
    fn test_unclosed_tag() {
        let err = Lexer::new("{{ x", "test").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn test_unclosed_string() {
        let err = Lexer::new("{{ \"abc }}", "test").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }
}
