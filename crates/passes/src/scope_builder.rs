use matc_ast::{NodeId, NodeKind, ScopeId};
use matc_errors::{Error, Result, ResolveError};

use crate::pass::{CompilationState, Pass};

/// Allocates a scope per `Program`/`FunctionDef` node and records every
/// declared variable, parameter, and function name (spec.md §4.3).
pub struct ScopeBuilder;

impl Pass for ScopeBuilder {
    const NAME: &'static str = "scope-builder";

    fn run(state: &mut CompilationState) -> Result<()> {
        let root = state.root;
        let scope_id = state.scopes.alloc(None, root);
        state.ast.get_mut(root).owns_scope = Some(scope_id);
        let NodeKind::Program { first_stmt } = state.ast.get(root).kind else {
            unreachable!("scope builder always starts at a Program node")
        };
        collect_functions(state, first_stmt, scope_id)?;
        walk_block(state, first_stmt, scope_id)
    }
}

fn collect_functions(state: &mut CompilationState, head: Option<NodeId>, scope_id: ScopeId) -> Result<()> {
    for id in state.ast.iter_list(head).collect::<Vec<_>>() {
        if let NodeKind::FunctionDef { name, .. } = state.ast.get(id).kind {
            let line = state.ast.get(id).line;
            if let Some(&existing) = state.scopes.get(scope_id).functions.get(&name) {
                return Err(Error::Resolve(ResolveError::DuplicateFunctionName {
                    name: name.to_string(),
                    first_line: state.ast.get(existing).line,
                    second_line: line,
                }));
            }
            state.scopes.get_mut(scope_id).functions.insert(name, id);
        }
    }
    Ok(())
}

fn walk_block(state: &mut CompilationState, head: Option<NodeId>, scope_id: ScopeId) -> Result<()> {
    for id in state.ast.iter_list(head).collect::<Vec<_>>() {
        visit_stmt(state, id, scope_id)?;
    }
    Ok(())
}

fn visit_stmt(state: &mut CompilationState, id: NodeId, scope_id: ScopeId) -> Result<()> {
    match state.ast.get(id).kind.clone() {
        NodeKind::FunctionDef { outputs, inputs, body, .. } => {
            build_function_scope(state, id, scope_id, outputs, inputs, body)
        }
        NodeKind::Block { first_stmt } => walk_block(state, first_stmt, scope_id),
        NodeKind::Assign { target, .. } => declare_if_identifier(state, target, scope_id),
        NodeKind::MultiAssign { outputs, .. } => {
            for out in state.ast.iter_list(outputs).collect::<Vec<_>>() {
                declare_if_identifier(state, out, scope_id)?;
            }
            Ok(())
        }
        NodeKind::If { then_block, else_block, .. } => {
            visit_stmt(state, then_block, scope_id)?;
            if let Some(else_id) = else_block {
                visit_stmt(state, else_id, scope_id)?;
            }
            Ok(())
        }
        NodeKind::While { body, .. } | NodeKind::Parallel { body } => visit_stmt(state, body, scope_id),
        NodeKind::For { iterator, body, .. } | NodeKind::ParFor { iterator, body, .. } => {
            declare_if_identifier(state, iterator, scope_id)?;
            visit_stmt(state, body, scope_id)
        }
        NodeKind::TryCatch { try_block, catch_var, catch_block, .. } => {
            visit_stmt(state, try_block, scope_id)?;
            if let Some(var) = catch_var {
                declare_if_identifier(state, var, scope_id)?;
            }
            visit_stmt(state, catch_block, scope_id)
        }
        NodeKind::Switch { first_case, otherwise, .. } => {
            for case in state.ast.iter_list(first_case).collect::<Vec<_>>() {
                if let NodeKind::SwitchCase { body, .. } = state.ast.get(case).kind {
                    visit_stmt(state, body, scope_id)?;
                }
            }
            if let Some(o) = otherwise {
                visit_stmt(state, o, scope_id)?;
            }
            Ok(())
        }
        NodeKind::GlobalDecl { .. } | NodeKind::PersistentDecl { .. } => {
            // Left for the resolver: these are always rejected there
            // (spec.md §4.4), so no scope bookkeeping is needed for them.
            Ok(())
        }
        _ => Ok(()),
    }
}

fn declare_if_identifier(state: &mut CompilationState, id: NodeId, scope_id: ScopeId) -> Result<()> {
    let NodeKind::Identifier { name } = state.ast.get(id).kind else {
        return Ok(());
    };
    let line = state.ast.get(id).line;
    if let Some(&func) = state.scopes.get(scope_id).functions.get(&name) {
        let _ = func;
        return Err(Error::Resolve(ResolveError::FunctionVariableConflict { name: name.to_string(), line }));
    }
    state.scopes.get_mut(scope_id).variables.entry(name).or_insert(id);
    Ok(())
}

fn build_function_scope(
    state: &mut CompilationState,
    def_id: NodeId,
    parent: ScopeId,
    outputs: Option<NodeId>,
    inputs: Option<NodeId>,
    body: NodeId,
) -> Result<()> {
    let func_scope = state.scopes.alloc(Some(parent), def_id);
    state.ast.get_mut(def_id).owns_scope = Some(func_scope);
    state.ast.get_mut(def_id).scope_parent = Some(parent);

    for input in state.ast.iter_list(inputs).collect::<Vec<_>>() {
        let NodeKind::Param { name } = state.ast.get(input).kind else { continue };
        let line = state.ast.get(input).line;
        if state.scopes.get(func_scope).inputs.contains(&name) {
            return Err(Error::Resolve(ResolveError::DuplicateInputParameter { name: name.to_string(), line }));
        }
        state.scopes.get_mut(func_scope).inputs.push(name);
        state.scopes.get_mut(func_scope).variables.insert(name, input);
    }

    for output in state.ast.iter_list(outputs).collect::<Vec<_>>() {
        if let NodeKind::Param { name } = state.ast.get(output).kind {
            let line = state.ast.get(output).line;
            if state.scopes.get(func_scope).outputs.contains(&name) {
                return Err(Error::Resolve(ResolveError::DuplicateOutputParameter { name: name.to_string(), line }));
            }
            state.scopes.get_mut(func_scope).outputs.push(name);
            state.scopes.get_mut(func_scope).variables.entry(name).or_insert(output);
        }
    }

    let NodeKind::Block { first_stmt } = state.ast.get(body).kind else {
        unreachable!("a function body is always parsed as a Block")
    };
    collect_functions(state, first_stmt, func_scope)?;
    walk_block(state, first_stmt, func_scope)
}
