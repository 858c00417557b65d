mod context;
mod expression;
mod statement;

pub use context::ParserContext;

use matc_ast::{Ast, NodeId, Token};
use matc_errors::Result;

/// Parses a complete token stream into an `Ast` rooted at a `Program` node.
pub fn parse(tokens: &[Token], source: &str) -> Result<(Ast, NodeId)> {
    let mut ctx = ParserContext::new(tokens, source);
    let root = ctx.parse_program()?;
    Ok((ctx.ast, root))
}

#[cfg(test)]
mod test;
