use matc_ast::NodeKind;
use matc_passes::CompilationState;

use crate::body::{emit_function_body, function_return_type};
use crate::doc::capture_doc_comment;
use crate::predicates::{compute, Predicates};

fn preamble(predicates: &Predicates) -> String {
    let mut lines = vec!["#include <cstdint>".to_string(), "#include <string>".to_string()];
    if predicates.has_matrices {
        lines.push("#include \"matc/matrix.hpp\"".to_string());
    }
    if predicates.has_dynamic_values {
        lines.push("#include \"matc/dynamic.hpp\"".to_string());
    }
    if predicates.has_multi_output {
        lines.push("#include <tuple>".to_string());
    }
    if predicates.has_ignored_outputs {
        lines.push("#include \"matc/sink.hpp\"".to_string());
    }
    if predicates.uses_system {
        lines.push("#include <cstdlib>".to_string());
    }
    if predicates.has_nested_functions {
        lines.push("#include <functional>".to_string());
    }
    if predicates.program_prints {
        lines.push("#include \"matc/echo.hpp\"".to_string());
    }
    lines.push("#include \"matc/runtime.hpp\"".to_string());
    lines.join("\n")
}

fn doc_block(doc: Option<&str>) -> String {
    match doc {
        Some(text) => {
            let mut out = String::from("/*\n");
            for line in text.lines() {
                out.push_str(&format!(" * {line}\n"));
            }
            out.push_str(" */\n");
            out
        }
        None => String::new(),
    }
}

/// Emits every top-level function (other than the entry-point body itself,
/// for the embeddable pass) as a free C++ function, wrapped in an anonymous
/// namespace once there's more than one (spec.md §4.7 layout step 3).
fn emit_top_level_functions(state: &CompilationState, functions: &[matc_ast::NodeId]) -> String {
    let mut bodies = String::new();
    for &id in functions {
        let NodeKind::FunctionDef { name, outputs, inputs, body } = state.ast.get(id).kind.clone() else {
            unreachable!("expected a function definition node")
        };
        let func_scope = state.ast.get(id).owns_scope.expect("scope builder assigns every FunctionDef a scope");
        let params: Vec<String> = state
            .ast
            .iter_list(inputs)
            .map(|p| {
                let node = state.ast.get(p);
                let ty = crate::types::cpp_type_for(node.data_type, node.rows, node.cols);
                let name = match state.ast.get(p).kind {
                    NodeKind::Param { name } => name.to_string(),
                    _ => String::new(),
                };
                format!("{ty} {name}")
            })
            .collect();
        let ret_ty = function_return_type(state, outputs);
        let NodeKind::Block { first_stmt } = state.ast.get(body).kind else {
            unreachable!("a function body is always a Block")
        };
        let body_text = emit_function_body(state, func_scope, first_stmt, outputs, 1);
        bodies.push_str(&format!("{ret_ty} {name}({}) {{\n{body_text}}}\n\n", params.join(", ")));
    }
    if functions.len() > 1 {
        format!("namespace {{\n\n{bodies}}} // namespace\n\n")
    } else {
        bodies
    }
}

/// Assembles the standalone-program form: every file-level function plus a
/// `main` that runs the script body (spec.md §4.7 "a standalone program").
pub fn emit_standalone(state: &CompilationState) -> String {
    let predicates = compute(state);
    tracing::debug!(?predicates, "emitting standalone program");
    let NodeKind::Program { first_stmt } = state.ast.get(state.root).kind else {
        unreachable!("translation always starts at a Program node")
    };
    let script_scope = state.ast.get(state.root).owns_scope.expect("scope builder assigns the Program node a scope");

    let top_level_functions: Vec<_> =
        state.ast.iter_list(first_stmt).filter(|&id| matches!(state.ast.get(id).kind, NodeKind::FunctionDef { .. })).collect();

    let mut out = String::new();
    out.push_str(&doc_block(capture_doc_comment(&state.source).as_deref()));
    out.push_str(&preamble(&predicates));
    out.push_str("\n\n");
    out.push_str(&emit_top_level_functions(state, &top_level_functions));
    out.push_str("int main() {\n");
    out.push_str(&emit_function_body(state, script_scope, first_stmt, None, 1));
    out.push_str("    return 0;\n}\n");
    out
}

/// Assembles the embeddable entry point: the same body of free functions,
/// plus a fixed-signature wrapper (named after `entry_point`) that other
/// native code can call directly instead of a `main` (spec.md §4.7 "an
/// embeddable native-extension entry point").
pub fn emit_embeddable(state: &CompilationState, entry_point: &str) -> String {
    let predicates = compute(state);
    tracing::debug!(?predicates, entry_point, "emitting embeddable entry point");
    let NodeKind::Program { first_stmt } = state.ast.get(state.root).kind else {
        unreachable!("translation always starts at a Program node")
    };
    let script_scope = state.ast.get(state.root).owns_scope.expect("scope builder assigns the Program node a scope");

    let top_level_functions: Vec<_> =
        state.ast.iter_list(first_stmt).filter(|&id| matches!(state.ast.get(id).kind, NodeKind::FunctionDef { .. })).collect();

    let mut out = String::new();
    out.push_str(&doc_block(capture_doc_comment(&state.source).as_deref()));
    out.push_str(&preamble(&predicates));
    out.push_str("\n\n");
    out.push_str(&emit_top_level_functions(state, &top_level_functions));
    out.push_str(&format!("extern \"C\" matc::DynamicValue {entry_point}(const matc::DynamicValue& __matc_args) {{\n"));
    if state.config.write_to_workspace {
        out.push_str("    matc::Workspace __matc_workspace(__matc_args);\n");
    }
    out.push_str(&emit_function_body(state, script_scope, first_stmt, None, 1));
    if state.config.write_to_workspace {
        out.push_str("    return __matc_workspace.snapshot();\n");
    } else {
        out.push_str("    return matc::DynamicValue{};\n");
    }
    out.push_str("}\n");
    out
}
