use matc_ast::{BinOp, CallClassification, ElemType, NodeId, NodeKind, PostfixOp, UnOp};
use matc_passes::CompilationState;

use crate::types::{cpp_type_for, scalar_cpp_type};

/// Turns a source string/char-array literal's raw span text (including its
/// delimiting quotes and any doubled-quote escapes) into an unescaped Rust
/// string, ready to be re-escaped for C++.
fn unquote(text: &str, quote: char) -> String {
    let inner = &text[1..text.len().saturating_sub(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == quote && chars.peek() == Some(&quote) {
            chars.next();
        }
        out.push(c);
    }
    out
}

fn cpp_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn bin_op_text(op: BinOp) -> &'static str {
    use BinOp::*;
    match op {
        Add => "+",
        Subtract => "-",
        Multiply => "*",
        Divide => "/",
        Less => "<",
        LessEqual => "<=",
        Greater => ">",
        GreaterEqual => ">=",
        Equal => "==",
        NotEqual => "!=",
        BitwiseAnd => "&",
        BitwiseOr => "|",
        ShortCircuitAnd => "&&",
        ShortCircuitOr => "||",
        // Left-divide and the elementwise family have no native C++ infix
        // spelling; `emit_expr` routes these through runtime helper calls
        // instead of this table.
        LeftDivide | ElementwiseMultiply | ElementwiseDivide | ElementwiseLeftDivide | ElementwisePower | Power => "",
    }
}

fn maybe_cast(state: &CompilationState, operand: NodeId, text: String) -> String {
    let node = state.ast.get(operand);
    if node.implicit_cast {
        if let Some(cast_to) = node.cast_type {
            return format!("static_cast<{}>({text})", scalar_cpp_type(cast_to));
        }
    }
    text
}

/// Renders `id` as a C++ expression. Every sub-call reads shape/type
/// annotations the analysis passes already filled in; this module never
/// re-derives them (spec.md §4.7 operates purely on the annotated tree).
pub fn emit_expr(state: &CompilationState, id: NodeId) -> String {
    let node = state.ast.get(id);
    match node.kind.clone() {
        NodeKind::NumberLit { span } => {
            let text = span.text(&state.source);
            text.trim_end_matches(['i', 'j', 'I', 'J']).to_string()
        }
        NodeKind::StringLit { span } => {
            format!("\"{}\"", cpp_escape(&unquote(span.text(&state.source), '\'')))
        }
        NodeKind::CharArrayLit { span } => {
            format!("matc::char_array(\"{}\")", cpp_escape(&unquote(span.text(&state.source), '"')))
        }
        NodeKind::EndIndex => "matc::end".to_string(),
        NodeKind::FunctionHandle { name } => format!("matc::make_handle({name})"),
        NodeKind::VariableRef { name, .. } => name.to_string(),
        NodeKind::FunctionRef { name, .. } => name.to_string(),
        NodeKind::Identifier { name } | NodeKind::FreeName { name } => {
            unreachable!("unresolved identifier '{name}' reached the emitter")
        }
        NodeKind::Grouping { inner } => format!("({})", emit_expr(state, inner)),
        NodeKind::Unary { op, operand } => {
            let inner = maybe_cast(state, operand, emit_expr(state, operand));
            match op {
                UnOp::Not => format!("!{inner}"),
                UnOp::Minus => format!("-{inner}"),
                UnOp::Plus => format!("+{inner}"),
            }
        }
        NodeKind::Postfix { op, operand } => {
            let inner = emit_expr(state, operand);
            match op {
                PostfixOp::Transpose => format!("matc::transpose({inner})"),
                PostfixOp::ComplexConjugate => format!("matc::conj({inner})"),
            }
        }
        NodeKind::Range { start, step, stop } => {
            let s = emit_expr(state, start);
            let e = emit_expr(state, stop);
            match step {
                Some(step_id) => format!("matc::range({s}, {}, {e})", emit_expr(state, step_id)),
                None => format!("matc::range({s}, {e})"),
            }
        }
        NodeKind::Binary { op, left, right } => emit_binary(state, op, left, right),
        NodeKind::MatrixHCat { left, right } => format!("matc::hcat({}, {})", emit_expr(state, left), emit_expr(state, right)),
        NodeKind::MatrixVCat { top, bottom } => format!("matc::vcat({}, {})", emit_expr(state, top), emit_expr(state, bottom)),
        NodeKind::CellHCat { left, right } => format!("matc::cell_hcat({}, {})", emit_expr(state, left), emit_expr(state, right)),
        NodeKind::CellVCat { top, bottom } => format!("matc::cell_vcat({}, {})", emit_expr(state, top), emit_expr(state, bottom)),
        NodeKind::EmptyMatrix => format!("{}{{}}", cpp_type_for(node.data_type, node.rows, node.cols)),
        NodeKind::EmptyCell => "matc::Cell{}".to_string(),
        NodeKind::CellWrap { inner } => format!("matc::Cell{{{}}}", emit_expr(state, inner)),
        NodeKind::Call { callee, args, classification } => emit_call(state, callee, args, classification),
        other => unreachable!("emit_expr saw a non-expression node: {other:?}"),
    }
}

fn emit_binary(state: &CompilationState, op: BinOp, left: NodeId, right: NodeId) -> String {
    let l = maybe_cast(state, left, emit_expr(state, left));
    let r = maybe_cast(state, right, emit_expr(state, right));
    use BinOp::*;
    match op {
        LeftDivide => format!("matc::left_divide({l}, {r})"),
        ElementwiseMultiply => format!("matc::elementwise_multiply({l}, {r})"),
        ElementwiseDivide => format!("matc::elementwise_divide({l}, {r})"),
        ElementwiseLeftDivide => format!("matc::elementwise_left_divide({l}, {r})"),
        ElementwisePower => format!("matc::elementwise_power({l}, {r})"),
        Power => format!("matc::power({l}, {r})"),
        _ => format!("({l} {} {r})", bin_op_text(op)),
    }
}

fn emit_call(state: &CompilationState, callee: NodeId, args: Option<NodeId>, classification: CallClassification) -> String {
    let arg_list: Vec<String> = state.ast.iter_list(args).map(|a| emit_expr(state, a)).collect();
    match classification {
        CallClassification::MatrixAccess => {
            let target = emit_expr(state, callee);
            format!("{target}.at({})", arg_list.join(", "))
        }
        CallClassification::FunctionCall | CallClassification::CallStatement | CallClassification::Unknown => {
            let name = emit_expr(state, callee);
            format!("{name}({})", arg_list.join(", "))
        }
    }
}

/// The mirrored-echo format of spec.md §4.7 "Verbosity": a blank-terminator
/// print of a named value (or `ans`) the way the source interpreter's
/// default echo reads: newline, name, `=`, newline, indented value.
pub fn emit_echo(name: &str, expr_text: &str) -> String {
    format!("matc::echo(\"{name}\", {expr_text});")
}
