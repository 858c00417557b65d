//! Diagnostic types, one enum per compiler stage, matching spec.md §7.
//!
//! Every translation failure is fatal: the CLI converts whichever of these
//! it receives into a single printed line and a non-zero exit code. There is
//! no partial-output or best-effort mode.

use std::fmt;

use colored::Colorize;
use thiserror::Error;

/// The stage that raised a diagnostic, per spec.md §6's error reporting
/// surface ("Scanner, Parser, Symbol Table, Shape, Type").
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Stage {
    Scanner,
    Parser,
    SymbolTable,
    Shape,
    Type,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Scanner => "Scanner",
            Stage::Parser => "Parser",
            Stage::SymbolTable => "Symbol Table",
            Stage::Shape => "Shape",
            Stage::Type => "Type",
        };
        write!(f, "{s}")
    }
}

#[derive(Error, Debug)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString { line: u32 },
    #[error("unterminated block comment")]
    UnterminatedBlockComment { line: u32 },
    #[error("two adjacent comma tokens are never valid")]
    AdjacentCommas { line: u32 },
    #[error("unrecognized character '{ch}'")]
    IllegalCharacter { line: u32, ch: char },
    #[error("function-definition closing delimiters are inconsistent across the file")]
    InconsistentFunctionClosing { line: u32 },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("class definitions are not supported")]
    ClassDefinitionNotSupported { line: u32 },
    #[error("persistent declaration outside of a function")]
    PersistentOutsideFunction { line: u32 },
    #[error("break is not allowed outside a loop")]
    BreakOutsideLoop { line: u32 },
    #[error("continue is not allowed outside a loop")]
    ContinueOutsideLoop { line: u32 },
    #[error("return is not allowed inside a parallel-for body")]
    ReturnInsideParallelFor { line: u32 },
    #[error("break is not allowed inside a parallel-for body")]
    BreakInsideParallelFor { line: u32 },
    #[error("left-hand side of a multi-output assignment must be identifiers or '~'")]
    IllFormedMultiAssignTarget { line: u32 },
    #[error("unexpected token '{found}' in statement position")]
    UnexpectedToken { line: u32, found: String },
    #[error("{what} is not yet supported")]
    NotYetSupported { line: u32, what: String },
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("function '{name}' is already defined on line {first_line} (redefined on line {second_line})")]
    DuplicateFunctionName { name: String, first_line: u32, second_line: u32 },
    #[error("input parameter '{name}' is duplicated")]
    DuplicateInputParameter { name: String, line: u32 },
    #[error("output parameter '{name}' is duplicated")]
    DuplicateOutputParameter { name: String, line: u32 },
    #[error("the placeholder name cannot be used for a variadic input")]
    VariadicPlaceholderRejected { line: u32 },
    #[error("'{name}' is used as a variable, which conflicts with its use as a function")]
    FunctionVariableConflict { name: String, line: u32 },
    #[error("global declarations are not supported")]
    GlobalNotSupported { line: u32 },
    #[error("persistent declarations are not supported")]
    PersistentNotSupported { line: u32 },
    #[error("'{name}' is not bound to a function and cannot be called")]
    CalledFreeName { name: String, line: u32 },
}

#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("row count mismatch: expected {expected}, found {found}")]
    RowMismatch { line: u32, expected: u32, found: u32 },
    #[error("column count mismatch: expected {expected}, found {found}")]
    ColMismatch { line: u32, expected: u32, found: u32 },
    #[error("operands of '&&'/'||' must be scalar")]
    NonScalarShortCircuit { line: u32 },
    #[error("matrix must be square for this operation")]
    NonSquare { line: u32 },
    #[error("inner dimensions disagree for matrix multiplication ({left_cols} vs {right_rows})")]
    IncompatibleMatMul { line: u32, left_cols: u32, right_rows: u32 },
    #[error("a variable's shape may not change after its first assignment (reassigned with a different shape)")]
    ResizeRejected { line: u32 },
}

#[derive(Error, Debug)]
pub enum TypeError {
    #[error("assignment target's type conflicts with the assigned value's type")]
    AssignmentTypeConflict { line: u32 },
    #[error("unary minus cannot be applied to a string value")]
    UnaryMinusOnString { line: u32 },
    #[error("unary minus cannot be applied to a cell value")]
    UnaryMinusOnCell { line: u32 },
    #[error("unary minus did not produce a numeric type")]
    UnaryMinusNonNumeric { line: u32 },
    #[error("operator '{op}' rejects operand types {lhs} and {rhs}")]
    OperatorRejected { line: u32, op: String, lhs: String, rhs: String },
    #[error("{what} is not yet supported")]
    NotYetSupported { line: u32, what: String },
}

macro_rules! stage_and_line {
    ($ty:ty, $stage:expr, $( $variant:ident { line } ),* $(,)?) => {
        impl $ty {
            pub fn stage(&self) -> Stage { $stage }
            pub fn line(&self) -> u32 {
                match self {
                    $( Self::$variant { line, .. } => *line, )*
                }
            }
        }
    };
}

stage_and_line!(LexError, Stage::Scanner,
    UnterminatedString { line },
    UnterminatedBlockComment { line },
    AdjacentCommas { line },
    IllegalCharacter { line },
    InconsistentFunctionClosing { line },
);

stage_and_line!(ParseError, Stage::Parser,
    ClassDefinitionNotSupported { line },
    PersistentOutsideFunction { line },
    BreakOutsideLoop { line },
    ContinueOutsideLoop { line },
    ReturnInsideParallelFor { line },
    BreakInsideParallelFor { line },
    IllFormedMultiAssignTarget { line },
    UnexpectedToken { line },
    NotYetSupported { line },
);

stage_and_line!(ResolveError, Stage::SymbolTable,
    DuplicateFunctionName { line },
    DuplicateInputParameter { line },
    DuplicateOutputParameter { line },
    VariadicPlaceholderRejected { line },
    FunctionVariableConflict { line },
    GlobalNotSupported { line },
    PersistentNotSupported { line },
    CalledFreeName { line },
);

stage_and_line!(ShapeError, Stage::Shape,
    RowMismatch { line },
    ColMismatch { line },
    NonScalarShortCircuit { line },
    NonSquare { line },
    IncompatibleMatMul { line },
    ResizeRejected { line },
);

stage_and_line!(TypeError, Stage::Type,
    AssignmentTypeConflict { line },
    UnaryMinusOnString { line },
    UnaryMinusOnCell { line },
    UnaryMinusNonNumeric { line },
    OperatorRejected { line },
    NotYetSupported { line },
);

/// The aggregated error type threaded through the whole pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Type(#[from] TypeError),
    /// A failure in an out-of-scope external collaborator, e.g. a write to
    /// one of the output files (spec.md §5: "a write failure is treated as
    /// a fatal, unrecoverable error").
    #[error("{0}")]
    Io(String),
}

impl Error {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Lex(e) => Some(e.stage()),
            Error::Parse(e) => Some(e.stage()),
            Error::Resolve(e) => Some(e.stage()),
            Error::Shape(e) => Some(e.stage()),
            Error::Type(e) => Some(e.stage()),
            Error::Io(_) => None,
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            Error::Lex(e) => Some(e.line()),
            Error::Parse(e) => Some(e.line()),
            Error::Resolve(e) => Some(e.line()),
            Error::Shape(e) => Some(e.line()),
            Error::Type(e) => Some(e.line()),
            Error::Io(_) => None,
        }
    }

    /// The single user-visible diagnostic line required by spec.md §7,
    /// printed to stderr before the process exits non-zero.
    pub fn diagnostic_line(&self) -> String {
        match (self.stage(), self.line()) {
            (Some(stage), Some(line)) => format!("{}: line {}: {}", stage, line, self),
            _ => format!("{}", self),
        }
    }

    /// An enriched, multi-line rendering with a source snippet and a caret
    /// underline, shown under `-v`/`RUST_LOG=debug`. Purely presentational;
    /// the contract in spec.md §7 is satisfied by `diagnostic_line` alone.
    pub fn formatted(&self, source: &str) -> String {
        let Some(line) = self.line() else {
            return self.diagnostic_line();
        };
        let snippet = source.lines().nth(line.saturating_sub(1) as usize).unwrap_or("");
        format!(
            "{}\n  {} |{}\n  {} | {}",
            self.diagnostic_line().red().bold(),
            " ".repeat(line.to_string().len()),
            "",
            line,
            snippet,
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A single diagnostic record, used when a pass wants to report without
/// immediately unwinding (e.g. batch-collecting duplicate-name errors before
/// failing). Not used for control flow inside a stage: the first error a
/// stage detects still halts that stage per spec.md §7.
#[derive(Debug)]
pub struct Diagnostic {
    pub stage: Stage,
    pub line: u32,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: line {}: {}", self.stage, self.line, self.message)
    }
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        Diagnostic {
            stage: err.stage().unwrap_or(Stage::Scanner),
            line: err.line().unwrap_or(0),
            message: err.to_string(),
        }
    }
}
