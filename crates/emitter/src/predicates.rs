use matc_ast::{ElemType, NodeKind};
use matc_passes::CompilationState;

/// File-level facts computed once over the whole annotated tree, each
/// gating one conditional library import in the emitted preamble
/// (spec.md §4.7, layout step 2).
#[derive(Copy, Clone, Debug, Default)]
pub struct Predicates {
    pub has_dynamic_values: bool,
    pub has_matrices: bool,
    pub program_prints: bool,
    pub uses_system: bool,
    pub has_multi_output: bool,
    pub has_nested_functions: bool,
    pub has_ignored_outputs: bool,
}

pub fn compute(state: &CompilationState) -> Predicates {
    let mut p = Predicates::default();
    for id in state.ast.ids() {
        let node = state.ast.get(id);
        if node.data_type == Some(ElemType::Dynamic) {
            p.has_dynamic_values = true;
        }
        if let (Some(r), Some(c)) = (node.rows, node.cols) {
            if (r, c) != (1, 1) {
                p.has_matrices = true;
            }
        }
        match &node.kind {
            NodeKind::ExprStmt { verbose, .. } | NodeKind::Assign { verbose, .. } | NodeKind::MultiAssign { verbose, .. } => {
                if *verbose {
                    p.program_prints = true;
                }
            }
            NodeKind::OsCall { .. } => p.uses_system = true,
            NodeKind::FunctionDef { outputs, .. } => {
                if state.ast.iter_list(*outputs).count() >= 2 {
                    p.has_multi_output = true;
                }
                // A function is "nested" (and so needs a capturing lambda)
                // only when its enclosing scope is itself a function, not
                // the script/file root — a top-level function never
                // captures anything and is emitted as an ordinary free
                // function regardless of how many sibling functions exist.
                if let Some(parent) = node.scope_parent {
                    let owner = state.scopes.get(parent).owner;
                    if matches!(state.ast.get(owner).kind, NodeKind::FunctionDef { .. }) {
                        p.has_nested_functions = true;
                    }
                }
            }
            NodeKind::Ignore => p.has_ignored_outputs = true,
            _ => {}
        }
    }
    p
}
