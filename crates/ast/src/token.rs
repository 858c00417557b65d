use matc_span::Span;

/// The closed token alphabet of spec.md §6.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TokenKind {
    Eof,
    String,
    CharArray,
    Number,
    Identifier,
    Newline,

    // Operators
    Add,
    Subtract,
    Multiply,
    Divide,
    BackDivide,
    Power,
    ElementwiseMul,
    ElementwiseDiv,
    ElementwiseBackDiv,
    ElementwisePower,
    Transpose,
    ComplexConjugate,

    // Comparisons
    Equality,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Logical
    And,
    Or,
    ShortAnd,
    ShortOr,
    Not,

    // Assignment
    Assign,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Semicolon,
    Comma,
    Colon,
    Dot,

    // Special payload tokens
    OsCall,
    Metaclass,
    FunctionHandle,
    LineContinuation,
    Comment,
    BlockComment,

    // Keywords
    End,
    If,
    ElseIf,
    Else,
    While,
    For,
    Parfor,
    Switch,
    Case,
    Otherwise,
    Break,
    Continue,
    Return,
    Try,
    Catch,
    Global,
    Persistent,
    Spmd,
    Classdef,
    Function,
}

impl TokenKind {
    /// Whether a token of this kind can end a value, i.e. whether an
    /// apostrophe immediately following it should be read as the transpose
    /// operator rather than the opening quote of a new string (spec.md §4.1).
    pub fn can_end_value(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::Number
                | TokenKind::String
                | TokenKind::CharArray
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
                | TokenKind::Transpose
                | TokenKind::ComplexConjugate
                | TokenKind::End
        )
    }
}

/// A single scanned token. `kind` plus the `span` is the entire record;
/// lexeme text is never copied here and is reread from the source buffer via
/// `span.text(source)` whenever it is needed.
#[derive(Copy, Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Whether at least one space or tab separated this token from the
    /// previous one on the same line. The scanner does not otherwise retain
    /// inter-token whitespace (spec.md §4.1's "lexeme text is never copied"
    /// design), but the parser needs this one bit to recognize whitespace
    /// as a matrix/cell column separator (spec.md §4.2).
    pub preceded_by_space: bool,
}

impl Token {
    pub const fn new(kind: TokenKind, span: Span, preceded_by_space: bool) -> Self {
        Self { kind, span, preceded_by_space }
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }
}
