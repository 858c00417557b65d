pub mod name_resolver;
pub mod pass;
pub mod scope_builder;
pub mod shape_inferrer;
pub mod type_inferrer;

pub use name_resolver::NameResolver;
pub use pass::{CompilationState, CompilerConfig, Pass};
pub use scope_builder::ScopeBuilder;
pub use shape_inferrer::ShapeInferrer;
pub use type_inferrer::TypeInferrer;

use matc_ast::{Ast, NodeId};
use matc_errors::Result;

/// Runs the full analysis pipeline (spec.md §3) over a freshly parsed AST,
/// in the fixed order each pass depends on: scopes before names, names
/// before shapes, shapes before types.
pub fn run_all_passes(ast: Ast, root: NodeId, source: String, config: CompilerConfig) -> Result<CompilationState> {
    let mut state = CompilationState::new(ast, root, source, config);
    ScopeBuilder::run(&mut state)?;
    NameResolver::run(&mut state)?;
    ShapeInferrer::run(&mut state)?;
    TypeInferrer::run(&mut state)?;
    Ok(state)
}
