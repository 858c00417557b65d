use matc_ast::{CallClassification, NodeId, NodeKind, ScopeId};
use matc_errors::{Error, Result, ResolveError};

use crate::pass::{CompilationState, Pass};

/// Rewrites every `Identifier` leaf to `VariableRef`/`FunctionRef`/`FreeName`
/// and every generic `Call` node to its final classification, once binding
/// information from the scope-builder pass is available (spec.md §4.4).
pub struct NameResolver;

impl Pass for NameResolver {
    const NAME: &'static str = "name-resolver";

    fn run(state: &mut CompilationState) -> Result<()> {
        let root = state.root;
        let scope_id = state.ast.get(root).owns_scope.expect("scope builder runs first");
        let NodeKind::Program { first_stmt } = state.ast.get(root).kind else {
            unreachable!("resolver always starts at a Program node")
        };
        resolve_block(state, first_stmt, scope_id)
    }
}

fn resolve_block(state: &mut CompilationState, head: Option<NodeId>, scope_id: ScopeId) -> Result<()> {
    for id in state.ast.iter_list(head).collect::<Vec<_>>() {
        resolve_stmt(state, id, scope_id)?;
    }
    Ok(())
}

fn resolve_stmt(state: &mut CompilationState, id: NodeId, scope_id: ScopeId) -> Result<()> {
    match state.ast.get(id).kind.clone() {
        NodeKind::FunctionDef { body, .. } => {
            let func_scope = state.ast.get(id).owns_scope.expect("scope builder assigns every FunctionDef a scope");
            let NodeKind::Block { first_stmt } = state.ast.get(body).kind else {
                unreachable!("a function body is always a Block")
            };
            resolve_block(state, first_stmt, func_scope)
        }
        NodeKind::Block { first_stmt } => resolve_block(state, first_stmt, scope_id),
        NodeKind::Assign { target, value, .. } => {
            resolve_expr(state, value, scope_id)?;
            resolve_expr(state, target, scope_id)
        }
        NodeKind::MultiAssign { outputs, call, .. } => {
            resolve_expr(state, call, scope_id)?;
            for out in state.ast.iter_list(outputs).collect::<Vec<_>>() {
                resolve_expr(state, out, scope_id)?;
            }
            Ok(())
        }
        NodeKind::If { cond, then_block, else_block } => {
            resolve_expr(state, cond, scope_id)?;
            resolve_stmt(state, then_block, scope_id)?;
            if let Some(else_id) = else_block {
                resolve_stmt(state, else_id, scope_id)?;
            }
            Ok(())
        }
        NodeKind::While { cond, body } => {
            resolve_expr(state, cond, scope_id)?;
            resolve_stmt(state, body, scope_id)
        }
        NodeKind::For { iterator, range, body } | NodeKind::ParFor { iterator, range, body } => {
            resolve_expr(state, range, scope_id)?;
            resolve_expr(state, iterator, scope_id)?;
            resolve_stmt(state, body, scope_id)
        }
        NodeKind::TryCatch { try_block, catch_var, catch_block } => {
            resolve_stmt(state, try_block, scope_id)?;
            if let Some(var) = catch_var {
                resolve_expr(state, var, scope_id)?;
            }
            resolve_stmt(state, catch_block, scope_id)
        }
        NodeKind::Switch { scrutinee, first_case, otherwise } => {
            resolve_expr(state, scrutinee, scope_id)?;
            for case in state.ast.iter_list(first_case).collect::<Vec<_>>() {
                if let NodeKind::SwitchCase { pattern, body } = state.ast.get(case).kind {
                    resolve_expr(state, pattern, scope_id)?;
                    resolve_stmt(state, body, scope_id)?;
                }
            }
            if let Some(o) = otherwise {
                resolve_stmt(state, o, scope_id)?;
            }
            Ok(())
        }
        NodeKind::Parallel { body } => resolve_stmt(state, body, scope_id),
        NodeKind::GlobalDecl { .. } => {
            Err(Error::Resolve(ResolveError::GlobalNotSupported { line: state.ast.get(id).line }))
        }
        NodeKind::PersistentDecl { .. } => {
            Err(Error::Resolve(ResolveError::PersistentNotSupported { line: state.ast.get(id).line }))
        }
        NodeKind::ExprStmt { expr, verbose, .. } => {
            resolve_expr(state, expr, scope_id)?;
            let is_ans = !is_void_call(state, expr);
            state.ast.get_mut(id).kind = NodeKind::ExprStmt { expr, verbose, is_ans };
            Ok(())
        }
        NodeKind::OsCall { .. } | NodeKind::Break | NodeKind::Continue | NodeKind::Return => Ok(()),
        other => unreachable!("resolve_stmt saw a non-statement node: {other:?}"),
    }
}

/// True when `expr` is a call to a function declared with zero outputs,
/// i.e. one whose result is never implicitly bound to `ans` when used as a
/// bare statement (spec.md §4.4/§4.2's "ans" rule).
fn is_void_call(state: &CompilationState, expr: NodeId) -> bool {
    let NodeKind::Call { callee, classification, .. } = state.ast.get(expr).kind else {
        return false;
    };
    if classification != CallClassification::FunctionCall {
        return false;
    }
    let NodeKind::FunctionRef { target, .. } = state.ast.get(callee).kind else {
        return false;
    };
    let NodeKind::FunctionDef { outputs, .. } = state.ast.get(target).kind else {
        return false;
    };
    outputs.is_none()
}

fn resolve_expr(state: &mut CompilationState, id: NodeId, scope_id: ScopeId) -> Result<()> {
    match state.ast.get(id).kind.clone() {
        NodeKind::Identifier { name } => {
            let new_kind = if let Some(target) = state.scopes.lookup_variable(scope_id, name) {
                NodeKind::VariableRef { name, target }
            } else if let Some(target) = state.scopes.lookup_function(scope_id, name) {
                NodeKind::FunctionRef { name, target }
            } else {
                NodeKind::FreeName { name }
            };
            state.ast.get_mut(id).kind = new_kind;
            Ok(())
        }
        NodeKind::Binary { left, right, .. } => {
            resolve_expr(state, left, scope_id)?;
            resolve_expr(state, right, scope_id)
        }
        NodeKind::Unary { operand, .. }
        | NodeKind::Postfix { operand, .. }
        | NodeKind::Grouping { inner: operand }
        | NodeKind::CellWrap { inner: operand } => resolve_expr(state, operand, scope_id),
        NodeKind::Range { start, step, stop } => {
            resolve_expr(state, start, scope_id)?;
            if let Some(s) = step {
                resolve_expr(state, s, scope_id)?;
            }
            resolve_expr(state, stop, scope_id)
        }
        NodeKind::MatrixHCat { left, right } | NodeKind::CellHCat { left, right } => {
            resolve_expr(state, left, scope_id)?;
            resolve_expr(state, right, scope_id)
        }
        NodeKind::MatrixVCat { top, bottom } | NodeKind::CellVCat { top, bottom } => {
            resolve_expr(state, top, scope_id)?;
            resolve_expr(state, bottom, scope_id)
        }
        NodeKind::Call { callee, args, .. } => {
            resolve_expr(state, callee, scope_id)?;
            for arg in state.ast.iter_list(args).collect::<Vec<_>>() {
                resolve_expr(state, arg, scope_id)?;
            }
            let line = state.ast.get(id).line;
            let classification = match state.ast.get(callee).kind {
                NodeKind::FunctionRef { .. } => CallClassification::FunctionCall,
                NodeKind::VariableRef { .. } => CallClassification::MatrixAccess,
                NodeKind::FreeName { name } => {
                    return Err(Error::Resolve(ResolveError::CalledFreeName { name: name.to_string(), line }));
                }
                // A call/index chained off another call's result, e.g. `f(x)(y)`.
                _ => CallClassification::MatrixAccess,
            };
            if let NodeKind::Call { classification: c, .. } = &mut state.ast.get_mut(id).kind {
                *c = classification;
            }
            Ok(())
        }
        NodeKind::NumberLit { .. }
        | NodeKind::StringLit { .. }
        | NodeKind::CharArrayLit { .. }
        | NodeKind::EndIndex
        | NodeKind::FunctionHandle { .. }
        | NodeKind::EmptyMatrix
        | NodeKind::EmptyCell
        | NodeKind::VariableRef { .. }
        | NodeKind::FunctionRef { .. }
        | NodeKind::FreeName { .. }
        | NodeKind::Ignore => Ok(()),
        other => unreachable!("resolve_expr saw a non-expression node: {other:?}"),
    }
}
