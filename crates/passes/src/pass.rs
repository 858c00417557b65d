use matc_ast::{Ast, NodeId, ScopeTable};
use matc_errors::Result;

/// The three invocation flags of spec.md §6, threaded through the passes
/// that care about them.
#[derive(Copy, Clone, Debug, Default)]
pub struct CompilerConfig {
    /// If set, `+`/`-` require exactly matching shapes; no scalar broadcast.
    pub mathematical_notation: bool,
    /// Both settings of this flag reject a reassignment that changes a
    /// variable's shape (dynamic resizing is a non-goal either way); the
    /// flag only selects which explicit diagnostic reasoning is recorded.
    pub disallow_resizing: bool,
    /// Only meaningful for the embeddable entry point emission pass.
    pub write_to_workspace: bool,
}

/// Shared state threaded through every analysis pass: the node arena, the
/// scope table the scope-builder pass populates, and the root node.
pub struct CompilationState {
    pub ast: Ast,
    pub scopes: ScopeTable,
    pub root: NodeId,
    /// The original source buffer, reread by passes that need a literal's
    /// text (e.g. a string literal's length) rather than just its span.
    pub source: String,
    pub config: CompilerConfig,
}

impl CompilationState {
    pub fn new(ast: Ast, root: NodeId, source: String, config: CompilerConfig) -> Self {
        Self { ast, scopes: ScopeTable::new(), root, source, config }
    }
}

/// One analysis pass over `CompilationState`. Passes run strictly in
/// sequence (spec.md §3's pipeline), each depending on annotations the
/// previous ones filled in.
pub trait Pass {
    const NAME: &'static str;

    fn run(state: &mut CompilationState) -> Result<()>;
}
