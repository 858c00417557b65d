use matc_ast::{BinOp, CallClassification, ElemType, NodeId, NodeKind, UnOp};
use matc_errors::{Error, Result, TypeError};

use crate::pass::{CompilationState, Pass};

/// Propagates element types to a fixed point (spec.md §4.6), the same
/// monotonic-fill discipline as the shape pass: every node's `data_type`
/// is written at most once, and operands that need a promotion to reach
/// their operator's result type are flagged via `cast_type`/`implicit_cast`
/// for the emitter to act on.
pub struct TypeInferrer;

impl Pass for TypeInferrer {
    const NAME: &'static str = "type-inferrer";

    fn run(state: &mut CompilationState) -> Result<()> {
        loop {
            let mut changed = false;
            for id in state.ast.ids().collect::<Vec<_>>() {
                if infer_node(state, id)? {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        // spec.md §4.6: "any node whose type remains NONE at fixed point is
        // marked Dynamic". Statement/bookkeeping nodes that never flow
        // through `infer_node`'s expression arms are left at `None` here on
        // purpose; only expression-shaped nodes actually need a type.
        for id in state.ast.ids().collect::<Vec<_>>() {
            if type_of(state, id).is_none() && is_expression(state, id) {
                set_type(state, id, ElemType::Dynamic);
            }
        }
        Ok(())
    }
}

/// Whether `id` is a node kind that carries a `data_type` at all, as opposed
/// to a pure statement/declaration/list node (spec.md §4.6 only ever speaks
/// of expression nodes' types; `NotApplicable` is reserved for the latter
/// and is never assigned here).
fn is_expression(state: &CompilationState, id: NodeId) -> bool {
    use NodeKind::*;
    matches!(
        state.ast.get(id).kind,
        Identifier { .. }
            | VariableRef { .. }
            | FunctionRef { .. }
            | FreeName { .. }
            | NumberLit { .. }
            | StringLit { .. }
            | CharArrayLit { .. }
            | Binary { .. }
            | Unary { .. }
            | Postfix { .. }
            | Grouping { .. }
            | Range { .. }
            | Call { .. }
            | EndIndex
            | FunctionHandle { .. }
            | MatrixVCat { .. }
            | MatrixHCat { .. }
            | CellVCat { .. }
            | CellHCat { .. }
            | EmptyMatrix
            | EmptyCell
            | CellWrap { .. }
            | Param { .. }
    )
}

fn type_of(state: &CompilationState, id: NodeId) -> Option<ElemType> {
    state.ast.get(id).data_type
}

fn set_type(state: &mut CompilationState, id: NodeId, ty: ElemType) -> bool {
    let node = state.ast.get_mut(id);
    if node.data_type.is_some() {
        return false;
    }
    node.data_type = Some(ty);
    true
}

/// Flags `id` as needing an implicit cast to `to` if its own type is known
/// and differs from it. Dynamic never needs a cast marker: the emitter
/// already treats it as an opaque runtime-typed value.
fn mark_cast(state: &mut CompilationState, id: NodeId, to: ElemType) {
    let node = state.ast.get_mut(id);
    if let Some(own) = node.data_type {
        if own != to && own != ElemType::Dynamic && to != ElemType::Dynamic {
            node.cast_type = Some(to);
            node.implicit_cast = true;
        }
    }
}

/// Numeric/char/string promotion rank; `None` for types that never
/// participate in arithmetic promotion (`Cell`, `Function`, `Dynamic`,
/// `NotApplicable`).
fn rank(ty: ElemType) -> Option<u8> {
    match ty {
        ElemType::Boolean => Some(0),
        ElemType::Char => Some(1),
        ElemType::Integer => Some(2),
        ElemType::Real => Some(3),
        ElemType::String => Some(4),
        _ => None,
    }
}

fn operator_rejected(op: &str, lhs: ElemType, rhs: ElemType, line: u32) -> Error {
    Error::Type(TypeError::OperatorRejected { line, op: op.to_string(), lhs: lhs.to_string(), rhs: rhs.to_string() })
}

fn promote(a: ElemType, b: ElemType, op: &str, line: u32) -> Result<ElemType> {
    if a == ElemType::Dynamic || b == ElemType::Dynamic {
        return Ok(ElemType::Dynamic);
    }
    match (rank(a), rank(b)) {
        (Some(ra), Some(rb)) => Ok(if ra >= rb { a } else { b }),
        _ => Err(operator_rejected(op, a, b, line)),
    }
}

fn op_name(op: BinOp) -> &'static str {
    use BinOp::*;
    match op {
        Add => "+",
        Subtract => "-",
        Multiply => "*",
        Divide => "/",
        LeftDivide => "\\",
        Power => "^",
        ElementwiseMultiply => ".*",
        ElementwiseDivide => "./",
        ElementwiseLeftDivide => ".\\",
        ElementwisePower => ".^",
        Less => "<",
        LessEqual => "<=",
        Greater => ">",
        GreaterEqual => ">=",
        Equal => "==",
        NotEqual => "~=",
        BitwiseAnd => "&",
        BitwiseOr => "|",
        ShortCircuitAnd => "&&",
        ShortCircuitOr => "||",
    }
}

fn infer_node(state: &mut CompilationState, id: NodeId) -> Result<bool> {
    let kind = state.ast.get(id).kind.clone();
    match kind {
        NodeKind::NumberLit { span } => {
            if type_of(state, id).is_some() {
                return Ok(false);
            }
            let text = span.text(&state.source);
            let is_integer = !text.contains(['.', 'e', 'E', 'i', 'j']);
            Ok(set_type(state, id, if is_integer { ElemType::Integer } else { ElemType::Real }))
        }
        NodeKind::StringLit { .. } => Ok(type_of(state, id).is_none() && set_type(state, id, ElemType::String)),
        NodeKind::CharArrayLit { .. } => Ok(type_of(state, id).is_none() && set_type(state, id, ElemType::Char)),
        NodeKind::EndIndex => Ok(type_of(state, id).is_none() && set_type(state, id, ElemType::Integer)),
        NodeKind::EmptyMatrix => Ok(type_of(state, id).is_none() && set_type(state, id, ElemType::Real)),
        NodeKind::EmptyCell | NodeKind::CellWrap { .. } | NodeKind::CellHCat { .. } | NodeKind::CellVCat { .. } => {
            Ok(type_of(state, id).is_none() && set_type(state, id, ElemType::Cell))
        }
        NodeKind::FunctionHandle { .. } => Ok(type_of(state, id).is_none() && set_type(state, id, ElemType::Function)),
        NodeKind::Grouping { inner } | NodeKind::Postfix { operand: inner, .. } => copy_type(state, id, inner),
        NodeKind::VariableRef { target, .. } => copy_type(state, id, target),
        NodeKind::Unary { op, operand } => infer_unary(state, id, op, operand),
        NodeKind::Binary { op, left, right } => infer_binary(state, id, op, left, right),
        NodeKind::Range { start, stop, .. } => infer_range(state, id, start, stop),
        NodeKind::MatrixHCat { left, right } | NodeKind::MatrixVCat { top: left, bottom: right } => {
            infer_matrix_concat(state, id, left, right)
        }
        NodeKind::Call { classification, callee, args } => infer_call(state, id, classification, callee, args),
        NodeKind::Assign { target, value, .. } => infer_assign(state, target, value),
        NodeKind::MultiAssign { outputs, call, .. } => infer_multi_assign(state, outputs, call),
        NodeKind::For { iterator, range, .. } | NodeKind::ParFor { iterator, range, .. } => {
            copy_type(state, iterator, range)
        }
        NodeKind::TryCatch { catch_var: Some(var), .. } => {
            Ok(type_of(state, var).is_none() && set_type(state, var, ElemType::String))
        }
        _ => Ok(false),
    }
}

fn copy_type(state: &mut CompilationState, id: NodeId, from: NodeId) -> Result<bool> {
    if type_of(state, id).is_some() {
        return Ok(false);
    }
    Ok(match type_of(state, from) {
        Some(ty) => set_type(state, id, ty),
        None => false,
    })
}

fn infer_unary(state: &mut CompilationState, id: NodeId, op: UnOp, operand: NodeId) -> Result<bool> {
    if type_of(state, id).is_some() {
        return Ok(false);
    }
    if op == UnOp::Not {
        return Ok(set_type(state, id, ElemType::Boolean));
    }
    let Some(ty) = type_of(state, operand) else {
        return Ok(false);
    };
    let line = state.ast.get(id).line;
    match ty {
        ElemType::String => Err(Error::Type(TypeError::UnaryMinusOnString { line })),
        ElemType::Cell => Err(Error::Type(TypeError::UnaryMinusOnCell { line })),
        ElemType::Dynamic => Ok(set_type(state, id, ElemType::Dynamic)),
        ElemType::Boolean | ElemType::Char => Ok(set_type(state, id, ElemType::Integer)),
        ElemType::Integer | ElemType::Real => Ok(set_type(state, id, ty)),
        ElemType::Function | ElemType::NotApplicable => Err(Error::Type(TypeError::UnaryMinusNonNumeric { line })),
    }
}

fn infer_binary(state: &mut CompilationState, id: NodeId, op: BinOp, left: NodeId, right: NodeId) -> Result<bool> {
    if type_of(state, id).is_some() {
        return Ok(false);
    }
    let (Some(lt), Some(rt)) = (type_of(state, left), type_of(state, right)) else {
        return Ok(false);
    };
    let line = state.ast.get(id).line;
    use BinOp::*;
    // spec.md §9 "Open questions (DO NOT guess)" names divide-operator
    // typing as explicitly unfinished. Matrix right-/left-division (as
    // opposed to the elementwise forms) is rejected outright rather than
    // run through the generic promotion table.
    if matches!(op, Divide | LeftDivide) {
        return Err(Error::Type(TypeError::NotYetSupported {
            line,
            what: format!("typing the '{}' operator", op_name(op)),
        }));
    }
    let is_comparison_or_logical = matches!(
        op,
        Less | LessEqual | Greater | GreaterEqual | Equal | NotEqual | BitwiseAnd | BitwiseOr | ShortCircuitAnd
            | ShortCircuitOr
    );
    // spec.md §4.6: "tables differ for addition (which permits string
    // concatenation with promotion) versus subtraction/multiply/power
    // (numeric only)". `Add` is the only operator whose table admits
    // `String`; every other arithmetic operator rejects it outright.
    if op != Add && (lt == ElemType::String || rt == ElemType::String) {
        return Err(operator_rejected(op_name(op), lt, rt, line));
    }
    let common = promote(lt, rt, op_name(op), line)?;
    mark_cast(state, left, common);
    mark_cast(state, right, common);
    let result = if is_comparison_or_logical { ElemType::Boolean } else { common };
    Ok(set_type(state, id, result))
}

/// spec.md §9 "Open questions (DO NOT guess)" names range typing as
/// explicitly unfinished. Rather than promote the endpoints' types into a
/// guessed result type, this rejects once both are known.
fn infer_range(state: &mut CompilationState, id: NodeId, start: NodeId, stop: NodeId) -> Result<bool> {
    if type_of(state, id).is_some() {
        return Ok(false);
    }
    if type_of(state, start).is_none() || type_of(state, stop).is_none() {
        return Ok(false);
    }
    Err(Error::Type(TypeError::NotYetSupported { line: state.ast.get(id).line, what: "range typing".to_string() }))
}

/// spec.md §9 names "several concatenation type rules" as explicitly
/// unfinished; rejected the same way as range typing above.
fn infer_matrix_concat(state: &mut CompilationState, id: NodeId, left: NodeId, right: NodeId) -> Result<bool> {
    if type_of(state, id).is_some() {
        return Ok(false);
    }
    if type_of(state, left).is_none() || type_of(state, right).is_none() {
        return Ok(false);
    }
    Err(Error::Type(TypeError::NotYetSupported { line: state.ast.get(id).line, what: "matrix/cell concatenation typing".to_string() }))
}

fn infer_call(
    state: &mut CompilationState,
    id: NodeId,
    classification: CallClassification,
    callee: NodeId,
    args: Option<NodeId>,
) -> Result<bool> {
    match classification {
        CallClassification::MatrixAccess => copy_type(state, id, callee),
        CallClassification::Unknown | CallClassification::CallStatement => {
            Ok(type_of(state, id).is_none() && set_type(state, id, ElemType::Dynamic))
        }
        CallClassification::FunctionCall => {
            let NodeKind::FunctionRef { target, .. } = state.ast.get(callee).kind else {
                return Ok(false);
            };
            let NodeKind::FunctionDef { inputs, outputs, .. } = state.ast.get(target).kind else {
                return Ok(false);
            };
            let mut changed = false;
            let params: Vec<NodeId> = state.ast.iter_list(inputs).collect();
            let call_args: Vec<NodeId> = state.ast.iter_list(args).collect();
            for (param, arg) in params.iter().zip(call_args.iter()) {
                if let Some(ty) = type_of(state, *arg) {
                    match type_of(state, *param) {
                        None => changed |= set_type(state, *param, ty),
                        // Monomorphic, first-call-site-wins parameter typing
                        // (spec.md §9 "function-call typing" gap): a second
                        // call site supplying a conflicting argument type
                        // cannot be resolved without guessing which call
                        // site "wins", so it is reported rather than
                        // silently accepted or silently ignored.
                        Some(existing) if existing != ty && existing != ElemType::Dynamic && ty != ElemType::Dynamic => {
                            return Err(Error::Type(TypeError::NotYetSupported {
                                line: state.ast.get(id).line,
                                what: "calling a function with argument types that conflict with an earlier call site".to_string(),
                            }));
                        }
                        Some(_) => {}
                    }
                }
            }
            if type_of(state, id).is_none() {
                if let Some(first_out) = state.ast.iter_list(outputs).next() {
                    if let Some(ty) = type_of(state, first_out) {
                        changed |= set_type(state, id, ty);
                    }
                }
            }
            Ok(changed)
        }
    }
}

fn infer_assign(state: &mut CompilationState, target: NodeId, value: NodeId) -> Result<bool> {
    let Some(vt) = type_of(state, value) else {
        return Ok(false);
    };
    let mut changed = false;
    match type_of(state, target) {
        Some(tt) if tt != vt && tt != ElemType::Dynamic && vt != ElemType::Dynamic => {
            return Err(Error::Type(TypeError::AssignmentTypeConflict { line: state.ast.get(target).line }));
        }
        Some(_) => {}
        None => changed |= set_type(state, target, vt),
    }
    if let NodeKind::VariableRef { target: decl, .. } = state.ast.get(target).kind {
        match type_of(state, decl) {
            Some(dt) if dt != vt && dt != ElemType::Dynamic && vt != ElemType::Dynamic => {
                return Err(Error::Type(TypeError::AssignmentTypeConflict { line: state.ast.get(target).line }));
            }
            Some(_) => {}
            None => changed |= set_type(state, decl, vt),
        }
    }
    Ok(changed)
}

fn infer_multi_assign(state: &mut CompilationState, outputs: Option<NodeId>, call: NodeId) -> Result<bool> {
    let NodeKind::Call { callee, classification, .. } = state.ast.get(call).kind else {
        return Ok(false);
    };
    if classification != CallClassification::FunctionCall {
        return Ok(false);
    }
    let NodeKind::FunctionRef { target, .. } = state.ast.get(callee).kind else {
        return Ok(false);
    };
    let NodeKind::FunctionDef { outputs: fn_outputs, .. } = state.ast.get(target).kind else {
        return Ok(false);
    };
    let fn_outs: Vec<NodeId> = state.ast.iter_list(fn_outputs).collect();
    let targets: Vec<NodeId> = state.ast.iter_list(outputs).collect();
    let mut changed = false;
    for (t, fo) in targets.iter().zip(fn_outs.iter()) {
        if matches!(state.ast.get(*t).kind, NodeKind::Ignore) {
            continue;
        }
        if let Some(ty) = type_of(state, *fo) {
            if type_of(state, *t).is_none() {
                changed |= set_type(state, *t, ty);
            }
            if let NodeKind::VariableRef { target: decl, .. } = state.ast.get(*t).kind {
                if type_of(state, decl).is_none() {
                    changed |= set_type(state, decl, ty);
                }
            }
        }
    }
    Ok(changed)
}
