use matc_ast::{Token, TokenKind};
use matc_errors::{Error, LexError, Result};
use matc_span::Span;

/// Converts a source buffer into a flat token stream. Tokens carry only a
/// `(kind, span)` pair; the lexeme text is never copied out of `source`
/// (spec.md §4.1) and is reread later via `span.text(source)`.
pub struct Scanner<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: u32,
    /// The kind of the last token emitted, consulted to decide whether a
    /// following `'` opens a char-array literal or reads as the transpose
    /// operator.
    last_kind: Option<TokenKind>,
    /// True only when the cursor is at the first non-whitespace position
    /// of its line, needed to recognize `%{`/`%}` block comment delimiters
    /// (spec.md §4.1: they must be alone on their line).
    at_line_start: bool,
    /// Set whenever a space or tab is consumed since the last token, and
    /// cleared each time a token is emitted. Exposed on `Token` so the
    /// parser can treat whitespace as a matrix/cell column separator
    /// (spec.md §4.2) without the scanner otherwise retaining whitespace.
    pending_space: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            line: 1,
            last_kind: None,
            at_line_start: true,
            pending_space: false,
        }
    }

    pub fn scan_all(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.scan_one()?;
            let is_eof = tok.kind == TokenKind::Eof;
            if !matches!(tok.kind, TokenKind::Comment | TokenKind::BlockComment) {
                self.last_kind = Some(tok.kind);
                tokens.push(tok);
            }
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn byte_offset(&self, idx: usize) -> usize {
        self.chars.get(idx).map(|(b, _)| *b).unwrap_or(self.source.len())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.at_line_start = true;
        } else if !c.is_whitespace() {
            self.at_line_start = false;
        }
        Some(c)
    }

    fn make(&mut self, kind: TokenKind, start: usize) -> Token {
        let tok = Token::new(kind, Span::new(self.line, self.byte_offset(start), self.byte_offset(self.pos)), self.pending_space);
        self.pending_space = false;
        tok
    }

    fn rest_of_line_is_blank(&self) -> bool {
        let mut i = self.pos;
        while let Some((_, c)) = self.chars.get(i) {
            if *c == '\n' {
                return true;
            }
            if !c.is_whitespace() {
                return false;
            }
            i += 1;
        }
        true
    }

    fn scan_one(&mut self) -> Result<Token> {
        loop {
            match self.peek() {
                None => return Ok(self.make(TokenKind::Eof, self.pos)),
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                    self.pending_space = true;
                }
                Some('\n') => {
                    let start = self.pos;
                    self.bump();
                    return Ok(self.make(TokenKind::Newline, start));
                }
                Some('.') if self.peek_at(1) == Some('.') && self.peek_at(2) == Some('.') => {
                    // Line continuation: the rest of the physical line,
                    // including its terminating newline, is not a token.
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            self.bump();
                            break;
                        }
                        self.bump();
                    }
                }
                Some('%') if self.peek_at(1) == Some('{') && self.at_line_start && self.rest_after(2) => {
                    return self.scan_block_comment();
                }
                Some('%') => return self.scan_line_comment(),
                Some('!') if self.at_line_start => return self.scan_os_call(),
                _ => return self.scan_token(),
            }
        }
    }

    /// True if nothing but whitespace follows `%{` on its line, the
    /// delimiter-alone rule required for a block-comment opener.
    fn rest_after(&self, skip: usize) -> bool {
        let mut i = self.pos + skip;
        while let Some((_, c)) = self.chars.get(i) {
            if *c == '\n' {
                return true;
            }
            if !c.is_whitespace() {
                return false;
            }
            i += 1;
        }
        true
    }

    fn scan_line_comment(&mut self) -> Result<Token> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        Ok(self.make(TokenKind::Comment, start))
    }

    fn scan_block_comment(&mut self) -> Result<Token> {
        let start = self.pos;
        let start_line = self.line;
        self.bump(); // %
        self.bump(); // {
        while let Some(c) = self.peek() {
            if c == '\n' {
                self.bump();
                if self.peek() == Some('%') && self.peek_at(1) == Some('}') && self.rest_after(2) {
                    self.bump();
                    self.bump();
                    return Ok(self.make(TokenKind::BlockComment, start));
                }
                continue;
            }
            self.bump();
        }
        Err(Error::Lex(LexError::UnterminatedBlockComment { line: start_line }))
    }

    fn scan_os_call(&mut self) -> Result<Token> {
        let start = self.pos;
        self.bump(); // !
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        Ok(self.make(TokenKind::OsCall, start))
    }

    fn scan_token(&mut self) -> Result<Token> {
        let start = self.pos;
        let start_line = self.line;
        let c = self.bump().expect("scan_one only calls scan_token when a char is present");

        macro_rules! simple {
            ($kind:expr) => {
                Ok(self.make($kind, start))
            };
        }

        match c {
            '\'' => {
                if self.last_kind.map(TokenKind::can_end_value).unwrap_or(false) {
                    simple!(TokenKind::Transpose)
                } else {
                    self.scan_char_array(start, start_line)
                }
            }
            '"' => self.scan_string(start, start_line),
            '0'..='9' => self.scan_number(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(start),
            '+' => simple!(TokenKind::Add),
            '-' => simple!(TokenKind::Subtract),
            '*' => simple!(TokenKind::Multiply),
            '/' => simple!(TokenKind::Divide),
            '\\' => simple!(TokenKind::BackDivide),
            '^' => simple!(TokenKind::Power),
            '~' if self.peek() == Some('=') => {
                self.bump();
                simple!(TokenKind::NotEqual)
            }
            '~' => simple!(TokenKind::Not),
            '=' if self.peek() == Some('=') => {
                self.bump();
                simple!(TokenKind::Equality)
            }
            '=' => simple!(TokenKind::Assign),
            '>' if self.peek() == Some('=') => {
                self.bump();
                simple!(TokenKind::GreaterEqual)
            }
            '>' => simple!(TokenKind::Greater),
            '<' if self.peek() == Some('=') => {
                self.bump();
                simple!(TokenKind::LessEqual)
            }
            '<' => simple!(TokenKind::Less),
            '&' if self.peek() == Some('&') => {
                self.bump();
                simple!(TokenKind::ShortAnd)
            }
            '&' => simple!(TokenKind::And),
            '|' if self.peek() == Some('|') => {
                self.bump();
                simple!(TokenKind::ShortOr)
            }
            '|' => simple!(TokenKind::Or),
            '(' => simple!(TokenKind::LeftParen),
            ')' => simple!(TokenKind::RightParen),
            '[' => simple!(TokenKind::LeftBracket),
            ']' => simple!(TokenKind::RightBracket),
            '{' => simple!(TokenKind::LeftBrace),
            '}' => simple!(TokenKind::RightBrace),
            ';' => simple!(TokenKind::Semicolon),
            ',' => {
                if self.last_kind == Some(TokenKind::Comma) {
                    return Err(Error::Lex(LexError::AdjacentCommas { line: start_line }));
                }
                simple!(TokenKind::Comma)
            }
            ':' => simple!(TokenKind::Colon),
            '@' => simple!(TokenKind::FunctionHandle),
            '?' => simple!(TokenKind::Metaclass),
            '.' => self.scan_dot(start),
            other => Err(Error::Lex(LexError::IllegalCharacter { line: start_line, ch: other })),
        }
    }

    fn scan_dot(&mut self, start: usize) -> Result<Token> {
        match self.peek() {
            Some('*') => {
                self.bump();
                Ok(self.make(TokenKind::ElementwiseMul, start))
            }
            Some('/') => {
                self.bump();
                Ok(self.make(TokenKind::ElementwiseDiv, start))
            }
            Some('\\') => {
                self.bump();
                Ok(self.make(TokenKind::ElementwiseBackDiv, start))
            }
            Some('^') => {
                self.bump();
                Ok(self.make(TokenKind::ElementwisePower, start))
            }
            Some('\'') => {
                self.bump();
                Ok(self.make(TokenKind::ComplexConjugate, start))
            }
            _ => Ok(self.make(TokenKind::Dot, start)),
        }
    }

    /// Double-quoted string literal. A doubled `""` is an escaped literal
    /// quote; any other occurrence of `"` closes the literal.
    fn scan_string(&mut self, start: usize, start_line: u32) -> Result<Token> {
        loop {
            match self.peek() {
                None | Some('\n') => return Err(Error::Lex(LexError::UnterminatedString { line: start_line })),
                Some('"') => {
                    self.bump();
                    if self.peek() == Some('"') {
                        self.bump();
                        continue;
                    }
                    return Ok(self.make(TokenKind::String, start));
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Single-quoted char-array literal; `''` is the escaped-quote form.
    fn scan_char_array(&mut self, start: usize, start_line: u32) -> Result<Token> {
        loop {
            match self.peek() {
                None | Some('\n') => return Err(Error::Lex(LexError::UnterminatedString { line: start_line })),
                Some('\'') => {
                    self.bump();
                    if self.peek() == Some('\'') {
                        self.bump();
                        continue;
                    }
                    return Ok(self.make(TokenKind::CharArray, start));
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn scan_number(&mut self, start: usize) -> Result<Token> {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && !matches!(self.peek_at(1), Some('*' | '/' | '\\' | '^' | '\'')) {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let save = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.bump();
                }
            } else {
                self.pos = save;
            }
        }
        if matches!(self.peek(), Some('i' | 'j')) {
            self.bump();
        }
        Ok(self.make(TokenKind::Number, start))
    }

    fn scan_identifier(&mut self, start: usize) -> Result<Token> {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        let text = &self.source[self.byte_offset(start)..self.byte_offset(self.pos)];
        let kind = match text {
            "end" => TokenKind::End,
            "if" => TokenKind::If,
            "elseif" => TokenKind::ElseIf,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "parfor" => TokenKind::Parfor,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "otherwise" => TokenKind::Otherwise,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "global" => TokenKind::Global,
            "persistent" => TokenKind::Persistent,
            "spmd" => TokenKind::Spmd,
            "classdef" => TokenKind::Classdef,
            "function" => TokenKind::Function,
            _ => TokenKind::Identifier,
        };
        Ok(self.make(kind, start))
    }
}
