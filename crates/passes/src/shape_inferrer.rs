use matc_ast::{BinOp, CallClassification, NodeId, NodeKind};
use matc_errors::{Error, Result, ShapeError};

use crate::pass::{CompilationState, Pass};

/// Propagates row/column counts through the AST to a fixed point
/// (spec.md §4.5). Every node's shape is written at most once: a node
/// starts at `(None, None)` and is filled in exactly when enough of its
/// children are known, which is what makes repeated passes over the same
/// node set terminate.
pub struct ShapeInferrer;

impl Pass for ShapeInferrer {
    const NAME: &'static str = "shape-inferrer";

    fn run(state: &mut CompilationState) -> Result<()> {
        loop {
            let mut changed = false;
            for id in state.ast.ids().collect::<Vec<_>>() {
                if infer_node(state, id)? {
                    changed = true;
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }
}

fn shape_of(state: &CompilationState, id: NodeId) -> Option<(u32, u32)> {
    let node = state.ast.get(id);
    match (node.rows, node.cols) {
        (Some(r), Some(c)) => Some((r, c)),
        _ => None,
    }
}

fn set_shape(state: &mut CompilationState, id: NodeId, rows: u32, cols: u32) -> bool {
    let node = state.ast.get_mut(id);
    if node.rows.is_some() {
        return false;
    }
    node.rows = Some(rows);
    node.cols = Some(cols);
    true
}

fn match_scalar(shape: (u32, u32)) -> bool {
    shape == (1, 1)
}

fn match_empty(shape: (u32, u32)) -> bool {
    shape == (0, 0)
}

fn match_square(shape: (u32, u32)) -> bool {
    shape.0 == shape.1
}

/// One axis of `soft_match_rows3`/`soft_match_cols3` (spec.md §4.5): a
/// dimension of 1 on either side broadcasts to the other side's dimension;
/// otherwise the two must agree exactly. Resolved independently per axis,
/// not gated on either whole operand being a total `1x1` scalar, so a
/// `(3,1)` column combined with a `(3,4)` matrix broadcasts to `(3,4)`.
fn match_axis(left: u32, right: u32) -> Option<u32> {
    if left == right {
        Some(left)
    } else if left == 1 {
        Some(right)
    } else if right == 1 {
        Some(left)
    } else {
        None
    }
}

/// The elementwise broadcasting rule shared by `+`, `-`, the `.`-prefixed
/// operators, the comparisons, and `&`/`|`.
fn match_elementwise(left: (u32, u32), right: (u32, u32), line: u32) -> Result<(u32, u32)> {
    let rows = match_axis(left.0, right.0)
        .ok_or(Error::Shape(ShapeError::RowMismatch { line, expected: left.0, found: right.0 }))?;
    let cols = match_axis(left.1, right.1)
        .ok_or(Error::Shape(ShapeError::ColMismatch { line, expected: left.1, found: right.1 }))?;
    Ok((rows, cols))
}

fn literal_len(source: &str, span: matc_span::Span, quote: char) -> u32 {
    let text = span.text(source);
    let inner = &text[1..text.len().saturating_sub(1)];
    let mut count = 0u32;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == quote && chars.peek() == Some(&quote) {
            chars.next();
        }
        count += 1;
    }
    count
}

fn infer_node(state: &mut CompilationState, id: NodeId) -> Result<bool> {
    let kind = state.ast.get(id).kind.clone();
    match kind {
        NodeKind::NumberLit { .. } | NodeKind::EndIndex | NodeKind::FunctionHandle { .. } | NodeKind::CellWrap { .. } => {
            Ok(set_shape(state, id, 1, 1))
        }
        NodeKind::StringLit { span } => {
            if shape_of(state, id).is_some() {
                return Ok(false);
            }
            let cols = literal_len(&state.source, span, '"');
            Ok(set_shape(state, id, 1, cols))
        }
        NodeKind::CharArrayLit { span } => {
            if shape_of(state, id).is_some() {
                return Ok(false);
            }
            let cols = literal_len(&state.source, span, '\'');
            Ok(set_shape(state, id, 1, cols))
        }
        NodeKind::EmptyMatrix | NodeKind::EmptyCell => Ok(set_shape(state, id, 0, 0)),
        NodeKind::Grouping { inner } | NodeKind::Unary { operand: inner, .. } => copy_shape(state, id, inner),
        NodeKind::Postfix { operand, .. } => {
            if shape_of(state, id).is_some() {
                return Ok(false);
            }
            match shape_of(state, operand) {
                Some((r, c)) => Ok(set_shape(state, id, c, r)),
                None => Ok(false),
            }
        }
        NodeKind::Range { start, step, stop } => infer_range(state, id, start, step, stop),
        NodeKind::Binary { op, left, right } => infer_binary(state, id, op, left, right),
        NodeKind::MatrixHCat { left, right } => infer_concat(state, id, left, right, true),
        NodeKind::MatrixVCat { top, bottom } => infer_concat(state, id, top, bottom, false),
        NodeKind::CellHCat { left, right } => infer_concat(state, id, left, right, true),
        NodeKind::CellVCat { top, bottom } => infer_concat(state, id, top, bottom, false),
        NodeKind::Call { classification, callee, args } => infer_call(state, id, classification, callee, args),
        NodeKind::VariableRef { target, .. } => copy_shape(state, id, target),
        NodeKind::Assign { target, value, .. } => infer_assign(state, target, value),
        NodeKind::MultiAssign { outputs, call, .. } => infer_multi_assign(state, outputs, call),
        NodeKind::For { iterator, .. } | NodeKind::ParFor { iterator, .. } => {
            Ok(shape_of(state, iterator).is_none() && set_shape(state, iterator, 1, 1))
        }
        NodeKind::TryCatch { catch_var: Some(var), .. } => {
            Ok(shape_of(state, var).is_none() && set_shape(state, var, 1, 1))
        }
        _ => Ok(false),
    }
}

fn copy_shape(state: &mut CompilationState, id: NodeId, from: NodeId) -> Result<bool> {
    if shape_of(state, id).is_some() {
        return Ok(false);
    }
    Ok(match shape_of(state, from) {
        Some((r, c)) => set_shape(state, id, r, c),
        None => false,
    })
}

fn infer_range(state: &mut CompilationState, id: NodeId, start: NodeId, step: Option<NodeId>, stop: NodeId) -> Result<bool> {
    if shape_of(state, id).is_some() {
        return Ok(false);
    }
    let parse_lit = |state: &CompilationState, n: NodeId| -> Option<i64> {
        if let NodeKind::NumberLit { span } = state.ast.get(n).kind {
            span.text(&state.source).parse::<f64>().ok().map(|f| f as i64)
        } else {
            None
        }
    };
    let (Some(s), Some(e)) = (parse_lit(state, start), parse_lit(state, stop)) else {
        return Ok(false);
    };
    let st = match step {
        Some(step_id) => match parse_lit(state, step_id) {
            Some(v) => v,
            None => return Ok(false),
        },
        None => 1,
    };
    if st == 0 {
        return Ok(false);
    }
    let count = if (st > 0 && e >= s) || (st < 0 && e <= s) { (e - s) / st + 1 } else { 0 };
    Ok(set_shape(state, id, 1, count.max(0) as u32))
}

fn infer_binary(state: &mut CompilationState, id: NodeId, op: BinOp, left: NodeId, right: NodeId) -> Result<bool> {
    if shape_of(state, id).is_some() {
        return Ok(false);
    }
    let (Some(l), Some(r)) = (shape_of(state, left), shape_of(state, right)) else {
        return Ok(false);
    };
    let line = state.ast.get(id).line;
    use BinOp::*;
    let result = match op {
        Add | Subtract if state.config.mathematical_notation => {
            if l != r {
                if l.0 != r.0 {
                    return Err(Error::Shape(ShapeError::RowMismatch { line, expected: l.0, found: r.0 }));
                }
                return Err(Error::Shape(ShapeError::ColMismatch { line, expected: l.1, found: r.1 }));
            }
            l
        }
        Add | Subtract | ElementwiseMultiply | ElementwiseDivide | ElementwiseLeftDivide | ElementwisePower
        | Less | LessEqual | Greater | GreaterEqual | Equal | NotEqual | BitwiseAnd | BitwiseOr => {
            match_elementwise(l, r, line)?
        }
        ShortCircuitAnd | ShortCircuitOr => {
            if !match_scalar(l) || !match_scalar(r) {
                return Err(Error::Shape(ShapeError::NonScalarShortCircuit { line }));
            }
            (1, 1)
        }
        Multiply => {
            if match_scalar(l) || match_scalar(r) {
                match_elementwise(l, r, line)?
            } else if l.1 != r.0 {
                return Err(Error::Shape(ShapeError::IncompatibleMatMul { line, left_cols: l.1, right_rows: r.0 }));
            } else {
                (l.0, r.1)
            }
        }
        Divide => {
            if match_scalar(r) {
                match_elementwise(l, r, line)?
            } else if l.1 != r.1 {
                return Err(Error::Shape(ShapeError::ColMismatch { line, expected: l.1, found: r.1 }));
            } else {
                (l.0, r.0)
            }
        }
        LeftDivide => {
            if match_scalar(l) {
                match_elementwise(l, r, line)?
            } else if l.0 != r.0 {
                return Err(Error::Shape(ShapeError::RowMismatch { line, expected: l.0, found: r.0 }));
            } else {
                (l.1, r.1)
            }
        }
        Power => {
            if match_scalar(l) {
                match_elementwise(l, r, line)?
            } else if match_scalar(r) {
                if !match_square(l) {
                    return Err(Error::Shape(ShapeError::NonSquare { line }));
                }
                l
            } else {
                return Err(Error::Shape(ShapeError::NonSquare { line }));
            }
        }
    };
    Ok(set_shape(state, id, result.0, result.1))
}

fn infer_concat(state: &mut CompilationState, id: NodeId, a: NodeId, b: NodeId, horizontal: bool) -> Result<bool> {
    if shape_of(state, id).is_some() {
        return Ok(false);
    }
    let (Some(sa), Some(sb)) = (shape_of(state, a), shape_of(state, b)) else {
        return Ok(false);
    };
    if match_empty(sa) {
        return Ok(set_shape(state, id, sb.0, sb.1));
    }
    if match_empty(sb) {
        return Ok(set_shape(state, id, sa.0, sa.1));
    }
    let line = state.ast.get(id).line;
    let result = if horizontal {
        if sa.0 != sb.0 {
            return Err(Error::Shape(ShapeError::RowMismatch { line, expected: sa.0, found: sb.0 }));
        }
        (sa.0, sa.1 + sb.1)
    } else {
        if sa.1 != sb.1 {
            return Err(Error::Shape(ShapeError::ColMismatch { line, expected: sa.1, found: sb.1 }));
        }
        (sa.0 + sb.0, sa.1)
    };
    Ok(set_shape(state, id, result.0, result.1))
}

/// `f(a, b)` as an expression: propagates argument shapes into `f`'s
/// parameter nodes and, once known, the shape of `f`'s first output back
/// onto this call node. A variable-indexed access (`A(i)`) is approximated
/// as a scalar read; full slice-shape inference is out of scope (see
/// DESIGN.md).
fn infer_call(
    state: &mut CompilationState,
    id: NodeId,
    classification: CallClassification,
    callee: NodeId,
    args: Option<NodeId>,
) -> Result<bool> {
    match classification {
        CallClassification::MatrixAccess | CallClassification::Unknown | CallClassification::CallStatement => {
            Ok(shape_of(state, id).is_none() && set_shape(state, id, 1, 1))
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
                if let Some((r, c)) = shape_of(state, *arg) {
                    if shape_of(state, *param).is_none() {
                        changed |= set_shape(state, *param, r, c);
                    }
                }
            }
            if shape_of(state, id).is_none() {
                if let Some(first_out) = state.ast.iter_list(outputs).next() {
                    if let Some((r, c)) = shape_of(state, first_out) {
                        changed |= set_shape(state, id, r, c);
                    }
                }
            }
            Ok(changed)
        }
    }
}

fn infer_assign(state: &mut CompilationState, target: NodeId, value: NodeId) -> Result<bool> {
    let Some((r, c)) = shape_of(state, value) else {
        return Ok(false);
    };
    let mut changed = false;
    match shape_of(state, target) {
        Some((tr, tc)) if (tr, tc) != (r, c) => {
            let line = state.ast.get(target).line;
            if tr != r {
                return Err(Error::Shape(ShapeError::RowMismatch { line, expected: tr, found: r }));
            }
            return Err(Error::Shape(ShapeError::ColMismatch { line, expected: tc, found: c }));
        }
        Some(_) => {}
        None => changed |= set_shape(state, target, r, c),
    }
    if let NodeKind::VariableRef { target: decl, .. } = state.ast.get(target).kind {
        match shape_of(state, decl) {
            Some((dr, dc)) if (dr, dc) != (r, c) => {
                return Err(Error::Shape(ShapeError::ResizeRejected { line: state.ast.get(target).line }));
            }
            Some(_) => {}
            None => changed |= set_shape(state, decl, r, c),
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
        if let Some((r, c)) = shape_of(state, *fo) {
            if shape_of(state, *t).is_none() {
                changed |= set_shape(state, *t, r, c);
            }
            if let NodeKind::VariableRef { target: decl, .. } = state.ast.get(*t).kind {
                if shape_of(state, decl).is_none() {
                    changed |= set_shape(state, decl, r, c);
                }
            }
        }
    }
    Ok(changed)
}
