//! Scanner and recursive-descent parser: turns a source buffer into an
//! `Ast` rooted at a `Program` node, or the first fatal `Scanner`/`Parser`
//! stage diagnostic (spec.md §4.1-§4.2, §7).

pub mod parser;
pub mod tokenizer;

use matc_ast::{Ast, NodeId};
use matc_errors::Result;

pub use parser::parse as parse_tokens;
pub use tokenizer::Scanner;

/// Scans and parses `source` in one call, the entry point the driver uses.
pub fn parse_source(source: &str) -> Result<(Ast, NodeId)> {
    let tokens = Scanner::new(source).scan_all()?;
    parser::parse(&tokens, source)
}
