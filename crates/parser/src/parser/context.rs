use matc_ast::{Ast, NodeId, NodeKind, Token, TokenKind};
use matc_errors::{Error, ParseError, Result};
use matc_span::Span;

/// Cursor and shared bookkeeping over the token stream, mirroring the
/// teacher's `ParserContext`: every grammar rule is a method on this type
/// that consumes tokens left to right and appends nodes to `ast`.
pub struct ParserContext<'a> {
    pub(crate) tokens: &'a [Token],
    pub(crate) source: &'a str,
    pub(crate) pos: usize,
    pub ast: Ast,
    /// Nesting depth of `for`/`while`/`parfor`, used to reject `break`
    /// and `continue` outside of a loop (spec.md §4.2).
    pub(crate) loop_depth: u32,
    /// Nesting depth of `parfor` specifically, used to reject `break` and
    /// `return` inside a parallel-for body.
    pub(crate) parfor_depth: u32,
    /// Nesting depth of call/matrix-access argument lists, used to decide
    /// whether a bare `end` token is the context-sensitive last-index
    /// sentinel rather than a block terminator (spec.md §4.2).
    pub(crate) call_depth: u32,
    /// Whether the cursor is currently inside a function body; `persistent`
    /// is rejected by the parser itself when this is false.
    pub(crate) inside_function: bool,
    /// Whether the first function definition in the file closed with an
    /// explicit `end`, once known. Every later function must agree, or the
    /// file mixes file-global and explicit-end styles (spec.md §4.1).
    pub(crate) explicit_close_style: Option<bool>,
}

impl<'a> ParserContext<'a> {
    pub fn new(tokens: &'a [Token], source: &'a str) -> Self {
        Self {
            tokens,
            source,
            pos: 0,
            ast: Ast::new(),
            loop_depth: 0,
            parfor_depth: 0,
            call_depth: 0,
            inside_function: false,
            explicit_close_style: None,
        }
    }

    pub(crate) fn raw_kind(&self, idx: usize) -> TokenKind {
        self.tokens.get(idx).map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    /// Records how a function body just closed (`end` consumed, or not)
    /// and enforces that every function in the file agrees.
    pub(crate) fn note_function_closing(&mut self, explicit: bool, line: u32) -> Result<()> {
        match self.explicit_close_style {
            None => {
                self.explicit_close_style = Some(explicit);
                Ok(())
            }
            Some(style) if style == explicit => Ok(()),
            Some(_) => Err(Error::Lex(matc_errors::LexError::InconsistentFunctionClosing { line })),
        }
    }

    fn raw(&self, idx: usize) -> Token {
        self.tokens.get(idx).copied().unwrap_or_else(|| {
            let last = self.tokens.last().copied();
            last.unwrap_or(Token::new(TokenKind::Eof, Span::dummy(), false))
        })
    }

    /// Current token, skipping past newlines (newlines are only
    /// significant as statement separators, handled explicitly at
    /// statement boundaries).
    pub fn peek(&self) -> Token {
        self.raw(self.pos)
    }

    pub fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub fn peek_at(&self, n: usize) -> Token {
        self.raw(self.pos + n)
    }

    pub fn line(&self) -> u32 {
        self.peek().line()
    }

    pub fn text(&self, tok: Token) -> &'a str {
        tok.span.text(self.source)
    }

    pub fn advance(&mut self) -> Token {
        let tok = self.peek();
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        self.eat(kind).ok_or_else(|| {
            Error::Parse(ParseError::UnexpectedToken {
                line: self.line(),
                found: format!("{what}: found {:?}", self.peek_kind()),
            })
        })
    }

    /// Skips any run of statement-separator tokens (newline, `;`, `,`).
    /// A leading `,`/`;` between statements is rare but harmless to accept.
    pub fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    pub fn unexpected(&self, what: &str) -> Error {
        Error::Parse(ParseError::UnexpectedToken {
            line: self.line(),
            found: format!("{what}: found {:?}", self.peek_kind()),
        })
    }

    pub fn not_yet_supported(&self, what: &str) -> Error {
        Error::Parse(ParseError::NotYetSupported { line: self.line(), what: what.to_string() })
    }

    /// Whether the statement just parsed should echo its result: MATLAB's
    /// rule is "no trailing `;`", captured by consuming an optional `;`
    /// after each statement and flagging its absence (spec.md §4.2).
    pub fn consume_verbosity(&mut self) -> bool {
        let verbose = !self.check(TokenKind::Semicolon);
        self.eat(TokenKind::Semicolon);
        verbose
    }

    pub fn alloc(&mut self, kind: NodeKind, line: u32) -> NodeId {
        self.ast.alloc(kind, line)
    }

    /// Appends `item` to the sibling chain whose current tail is
    /// `tail` (or starts the chain and returns `item` as the new head
    /// when `head` was empty).
    pub fn push_list(&mut self, head: &mut Option<NodeId>, tail: &mut Option<NodeId>, item: NodeId) {
        match *tail {
            Some(t) => self.ast.link(t, item),
            None => *head = Some(item),
        }
        *tail = Some(item);
    }
}
