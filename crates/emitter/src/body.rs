use std::collections::HashSet;

use matc_ast::{NodeId, NodeKind, ScopeId};
use matc_passes::CompilationState;

use crate::expr::{emit_echo, emit_expr};
use crate::types::cpp_type_for;

fn indent_str(indent: usize) -> String {
    "    ".repeat(indent)
}

/// Threads the one piece of body-local state every statement-emitting
/// function needs: which canonical variable nodes have already been
/// declared (so a second assignment doesn't re-declare its type), and
/// whether `ans` has been bound yet.
struct EmitCtx {
    declared: HashSet<u32>,
    ans_declared: bool,
    /// What a bare `return` (or the function falling off its last
    /// statement) should yield; empty for a script or a function with no
    /// declared outputs.
    output_return: String,
}

fn param_name(state: &CompilationState, param: NodeId) -> String {
    match state.ast.get(param).kind {
        NodeKind::Param { name } => name.to_string(),
        other => unreachable!("expected a parameter node, found {other:?}"),
    }
}

/// `std::tuple<...>` (or a bare type, or `void`) reflecting a function's
/// declared outputs (spec.md §4.7 "Multi-output tuples").
pub fn function_return_type(state: &CompilationState, outputs: Option<NodeId>) -> String {
    let outs: Vec<NodeId> = state.ast.iter_list(outputs).collect();
    match outs.as_slice() {
        [] => "void".to_string(),
        [only] => cpp_type_for(state.ast.get(*only).data_type, state.ast.get(*only).rows, state.ast.get(*only).cols),
        many => {
            let parts: Vec<String> =
                many.iter().map(|o| cpp_type_for(state.ast.get(*o).data_type, state.ast.get(*o).rows, state.ast.get(*o).cols)).collect();
            format!("std::tuple<{}>", parts.join(", "))
        }
    }
}

/// An output parameter's name as it appears in a `return`, or a
/// default-constructed placeholder for an output the definition itself
/// discards with `~` (a slot that is never bound to any variable in the
/// function's own scope).
fn output_name(state: &CompilationState, param: NodeId) -> String {
    match state.ast.get(param).kind {
        NodeKind::Param { name } => name.to_string(),
        NodeKind::Ignore => "matc::DynamicValue{}".to_string(),
        other => unreachable!("expected an output parameter node, found {other:?}"),
    }
}

fn output_return_expr(state: &CompilationState, outputs: Option<NodeId>) -> String {
    let names: Vec<String> = state.ast.iter_list(outputs).map(|o| output_name(state, o)).collect();
    match names.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        many => format!("std::make_tuple({})", many.join(", ")),
    }
}

/// True when `scope_id` is a function's own body scope, as opposed to the
/// script/file root. Only a function scope's child function definitions are
/// genuinely nested (and so need capturing-lambda emission): a script's
/// top-level functions are already emitted as ordinary free functions by
/// `emit_top_level_functions` and never capture anything.
fn is_function_scope(state: &CompilationState, scope_id: ScopeId) -> bool {
    matches!(state.ast.get(state.scopes.get(scope_id).owner).kind, NodeKind::FunctionDef { .. })
}

fn seed_params(state: &CompilationState, scope_id: ScopeId, declared: &mut HashSet<u32>) {
    let scope = state.scopes.get(scope_id);
    for name in scope.inputs.iter().chain(scope.outputs.iter()) {
        if let Some(&id) = scope.variables.get(name) {
            declared.insert(id.0);
        }
    }
}

/// Forward-declares every true local (not an input/output parameter) of
/// `scope_id`, in first-occurrence order, ahead of any nested-function
/// lambda binding (spec.md §4.7 "Local variables are declared at the top
/// of the body, before lambdas").
fn emit_forward_decls(state: &CompilationState, scope_id: ScopeId, ctx: &mut EmitCtx, indent: usize) -> String {
    let scope = state.scopes.get(scope_id);
    let mut out = String::new();
    for (name, &decl_id) in scope.variables.iter() {
        if scope.inputs.contains(name) || scope.outputs.contains(name) {
            continue;
        }
        let node = state.ast.get(decl_id);
        let ty = cpp_type_for(node.data_type, node.rows, node.cols);
        out.push_str(&format!("{}{ty} {name}{{}};\n", indent_str(indent)));
        ctx.declared.insert(decl_id.0);
    }
    out
}

/// Emits a function (or script) body: the text between a function's
/// opening and closing brace, including the trailing `return` every
/// non-void C++ function needs (the source language instead returns
/// whichever value its output variables hold when control falls off the
/// end of the body).
pub fn emit_function_body(
    state: &CompilationState,
    scope_id: ScopeId,
    first_stmt: Option<NodeId>,
    outputs: Option<NodeId>,
    indent: usize,
) -> String {
    let mut ctx = EmitCtx { declared: HashSet::new(), ans_declared: false, output_return: output_return_expr(state, outputs) };
    seed_params(state, scope_id, &mut ctx.declared);

    let mut out = String::new();
    let has_nested = is_function_scope(state, scope_id) && !state.scopes.get(scope_id).functions.is_empty();
    if has_nested {
        out.push_str(&emit_forward_decls(state, scope_id, &mut ctx, indent));
        for id in state.ast.iter_list(first_stmt) {
            if let NodeKind::FunctionDef { .. } = state.ast.get(id).kind {
                out.push_str(&emit_nested_function(state, id, indent));
            }
        }
    }
    for id in state.ast.iter_list(first_stmt) {
        if matches!(state.ast.get(id).kind, NodeKind::FunctionDef { .. }) {
            continue;
        }
        out.push_str(&emit_stmt(state, id, &mut ctx, indent));
    }
    if !ctx.output_return.is_empty() {
        out.push_str(&format!("{}return {};\n", indent_str(indent), ctx.output_return));
    }
    out
}

fn emit_nested_function(state: &CompilationState, id: NodeId, indent: usize) -> String {
    let NodeKind::FunctionDef { name, outputs, inputs, body } = state.ast.get(id).kind.clone() else {
        unreachable!("expected a function definition node")
    };
    let func_scope = state.ast.get(id).owns_scope.expect("scope builder assigns every FunctionDef a scope");
    let params: Vec<String> = state
        .ast
        .iter_list(inputs)
        .map(|p| {
            let node = state.ast.get(p);
            format!("{} {}", cpp_type_for(node.data_type, node.rows, node.cols), param_name(state, p))
        })
        .collect();
    let ret_ty = function_return_type(state, outputs);
    let NodeKind::Block { first_stmt } = state.ast.get(body).kind else {
        unreachable!("a function body is always a Block")
    };
    let body_text = emit_function_body(state, func_scope, first_stmt, outputs, indent + 1);
    format!(
        "{ind}auto {name} = [&]({params}) -> {ret_ty} {{\n{body_text}{ind}}};\n",
        ind = indent_str(indent),
        params = params.join(", "),
    )
}

fn variable_name(state: &CompilationState, var_ref: NodeId) -> String {
    match state.ast.get(var_ref).kind {
        NodeKind::VariableRef { name, .. } => name.to_string(),
        NodeKind::Ignore => "matc::sink".to_string(),
        other => unreachable!("expected an assignment target, found {other:?}"),
    }
}

fn canonical_target(state: &CompilationState, var_ref: NodeId) -> Option<NodeId> {
    match state.ast.get(var_ref).kind {
        NodeKind::VariableRef { target, .. } => Some(target),
        NodeKind::Ignore => None,
        other => unreachable!("expected an assignment target, found {other:?}"),
    }
}

fn emit_declare_or_assign(state: &CompilationState, target: NodeId, value_text: &str, ctx: &mut EmitCtx, indent: usize) -> String {
    let ind = indent_str(indent);
    let Some(canonical) = canonical_target(state, target) else {
        return format!("{ind}matc::sink = {value_text};\n");
    };
    let name = variable_name(state, target);
    if ctx.declared.insert(canonical.0) {
        let node = state.ast.get(canonical);
        let ty = cpp_type_for(node.data_type, node.rows, node.cols);
        format!("{ind}{ty} {name} = {value_text};\n")
    } else {
        format!("{ind}{name} = {value_text};\n")
    }
}

fn emit_stmt(state: &CompilationState, id: NodeId, ctx: &mut EmitCtx, indent: usize) -> String {
    let ind = indent_str(indent);
    match state.ast.get(id).kind.clone() {
        NodeKind::Block { first_stmt } => {
            let mut out = format!("{ind}{{\n");
            for stmt in state.ast.iter_list(first_stmt) {
                out.push_str(&emit_stmt(state, stmt, ctx, indent + 1));
            }
            out.push_str(&format!("{ind}}}\n"));
            out
        }
        NodeKind::Assign { target, value, verbose } => {
            let value_text = emit_expr(state, value);
            let mut out = emit_declare_or_assign(state, target, &value_text, ctx, indent);
            if verbose {
                out.push_str(&format!("{ind}{}\n", emit_echo(&variable_name(state, target), &variable_name(state, target))));
            }
            out
        }
        NodeKind::MultiAssign { outputs, call, verbose } => emit_multi_assign(state, outputs, call, verbose, ctx, indent),
        NodeKind::If { cond, then_block, else_block } => {
            let mut out = format!("{ind}if ({}) {{\n", emit_expr(state, cond));
            out.push_str(&emit_stmt_body(state, then_block, ctx, indent + 1));
            out.push_str(&format!("{ind}}}"));
            match else_block {
                Some(else_id) if matches!(state.ast.get(else_id).kind, NodeKind::If { .. }) => {
                    out.push_str(" else ");
                    // Re-emit the nested `If` inline (an `elseif` chain),
                    // without its own leading indent.
                    let rendered = emit_stmt(state, else_id, ctx, indent);
                    out.push_str(rendered.trim_start());
                }
                Some(else_id) => {
                    out.push_str(" else {\n");
                    out.push_str(&emit_stmt_body(state, else_id, ctx, indent + 1));
                    out.push_str(&format!("{ind}}}\n"));
                }
                None => out.push('\n'),
            }
            out
        }
        NodeKind::While { cond, body } => {
            let mut out = format!("{ind}while ({}) {{\n", emit_expr(state, cond));
            out.push_str(&emit_stmt_body(state, body, ctx, indent + 1));
            out.push_str(&format!("{ind}}}\n"));
            out
        }
        NodeKind::For { iterator, range, body } => {
            let iter_name = variable_name(state, iterator);
            let mut out = format!(
                "{ind}for (auto {iter_name} : {}) {{\n",
                emit_expr(state, range)
            );
            out.push_str(&emit_stmt_body(state, body, ctx, indent + 1));
            out.push_str(&format!("{ind}}}\n"));
            out
        }
        NodeKind::ParFor { iterator, range, body } => {
            let iter_name = variable_name(state, iterator);
            let mut out = format!("{ind}#pragma omp parallel for\n");
            out.push_str(&format!("{ind}for (std::int64_t {iter_name} : {}) {{\n", emit_expr(state, range)));
            out.push_str(&emit_stmt_body(state, body, ctx, indent + 1));
            out.push_str(&format!("{ind}}}\n"));
            out
        }
        NodeKind::TryCatch { try_block, catch_var, catch_block } => {
            let mut out = format!("{ind}try {{\n");
            out.push_str(&emit_stmt_body(state, try_block, ctx, indent + 1));
            out.push_str(&format!("{ind}}} catch (const std::exception& __matc_ex) {{\n"));
            if let Some(var) = catch_var {
                let name = variable_name(state, var);
                out.push_str(&format!("{}std::string {name} = __matc_ex.what();\n", indent_str(indent + 1)));
                if let Some(canonical) = canonical_target(state, var) {
                    ctx.declared.insert(canonical.0);
                }
            }
            out.push_str(&emit_stmt_body(state, catch_block, ctx, indent + 1));
            out.push_str(&format!("{ind}}}\n"));
            out
        }
        NodeKind::Switch { scrutinee, first_case, otherwise } => {
            let scrutinee_text = emit_expr(state, scrutinee);
            let mut out = String::new();
            let mut first = true;
            for case in state.ast.iter_list(first_case) {
                let NodeKind::SwitchCase { pattern, body } = state.ast.get(case).kind else { unreachable!() };
                let keyword = if first { "if" } else { "else if" };
                first = false;
                out.push_str(&format!("{ind}{keyword} (matc::equals({scrutinee_text}, {})) {{\n", emit_expr(state, pattern)));
                out.push_str(&emit_stmt_body(state, body, ctx, indent + 1));
                out.push_str(&format!("{ind}}}"));
                out.push(' ');
            }
            if let Some(o) = otherwise {
                if first {
                    out.push_str(&format!("{ind}{{\n"));
                } else {
                    out.push_str("else {\n");
                }
                out.push_str(&emit_stmt_body(state, o, ctx, indent + 1));
                out.push_str(&format!("{ind}}}\n"));
            } else if !first {
                out.push('\n');
            }
            out
        }
        NodeKind::GlobalDecl { .. } | NodeKind::PersistentDecl { .. } => {
            unreachable!("global/persistent declarations are rejected by the name resolver before emission")
        }
        NodeKind::Parallel { body } => {
            let mut out = format!("{ind}#pragma omp parallel\n{ind}{{\n");
            out.push_str(&emit_stmt_body(state, body, ctx, indent + 1));
            out.push_str(&format!("{ind}}}\n"));
            out
        }
        NodeKind::OsCall { payload } => {
            format!("{ind}std::system(\"{}\");\n", payload.text(&state.source).trim().replace('\\', "\\\\").replace('"', "\\\""))
        }
        NodeKind::ExprStmt { expr, verbose, is_ans } => emit_expr_stmt(state, expr, verbose, is_ans, ctx, indent),
        NodeKind::Break => format!("{ind}break;\n"),
        NodeKind::Continue => format!("{ind}continue;\n"),
        NodeKind::Return => {
            if ctx.output_return.is_empty() {
                format!("{ind}return;\n")
            } else {
                format!("{ind}return {};\n", ctx.output_return)
            }
        }
        other => unreachable!("emit_stmt saw a non-statement node: {other:?}"),
    }
}

/// A block/if/while/for child that is always itself a `Block` node in this
/// AST, emitted without its own surrounding braces (the caller already
/// opened one).
fn emit_stmt_body(state: &CompilationState, block_id: NodeId, ctx: &mut EmitCtx, indent: usize) -> String {
    let NodeKind::Block { first_stmt } = state.ast.get(block_id).kind else {
        unreachable!("expected a Block node")
    };
    let mut out = String::new();
    for id in state.ast.iter_list(first_stmt) {
        out.push_str(&emit_stmt(state, id, ctx, indent));
    }
    out
}

fn emit_multi_assign(
    state: &CompilationState,
    outputs: Option<NodeId>,
    call: NodeId,
    verbose: bool,
    ctx: &mut EmitCtx,
    indent: usize,
) -> String {
    let ind = indent_str(indent);
    let targets: Vec<NodeId> = state.ast.iter_list(outputs).collect();
    let call_text = emit_expr(state, call);
    if targets.len() <= 1 {
        let mut out = String::new();
        if let Some(target) = targets.first() {
            out.push_str(&emit_declare_or_assign(state, *target, &call_text, ctx, indent));
            if verbose {
                out.push_str(&format!("{ind}{}\n", emit_echo(&variable_name(state, *target), &variable_name(state, *target))));
            }
        } else {
            out.push_str(&format!("{ind}{call_text};\n"));
        }
        return out;
    }
    let mut out = format!("{ind}auto __matc_tuple = {call_text};\n");
    for (i, target) in targets.iter().enumerate() {
        let slot = format!("std::get<{i}>(__matc_tuple)");
        out.push_str(&emit_declare_or_assign(state, *target, &slot, ctx, indent));
        if verbose && !matches!(state.ast.get(*target).kind, NodeKind::Ignore) {
            out.push_str(&format!("{ind}{}\n", emit_echo(&variable_name(state, *target), &variable_name(state, *target))));
        }
    }
    out
}

fn emit_expr_stmt(state: &CompilationState, expr: NodeId, verbose: bool, is_ans: bool, ctx: &mut EmitCtx, indent: usize) -> String {
    let ind = indent_str(indent);
    let value_text = emit_expr(state, expr);
    if !is_ans {
        // A zero-output call statement has nothing to echo; the invocation
        // itself is the whole statement.
        return format!("{ind}{value_text};\n");
    }
    let mut out = if ctx.ans_declared {
        format!("{ind}ans = {value_text};\n")
    } else {
        ctx.ans_declared = true;
        format!("{ind}auto ans = {value_text};\n")
    };
    if verbose {
        out.push_str(&format!("{ind}{}\n", emit_echo("ans", "ans")));
    }
    out
}
