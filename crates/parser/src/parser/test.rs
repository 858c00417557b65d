use matc_ast::NodeKind;
use matc_errors::Error;

use crate::parse_source;

fn parse_ok(src: &str) -> (matc_ast::Ast, matc_ast::NodeId) {
    parse_source(src).unwrap_or_else(|e| panic!("expected {src:?} to parse, got {e}"))
}

#[test]
fn parses_simple_assignment() {
    let (ast, root) = parse_ok("x = 1 + 2;\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!("not a program") };
    let stmt = first_stmt.expect("one statement");
    let NodeKind::Assign { value, verbose, .. } = ast.get(stmt).kind else { panic!("not an assign") };
    assert!(!verbose);
    assert!(matches!(ast.get(value).kind, NodeKind::Binary { .. }));
}

#[test]
fn bare_expression_is_verbose_without_semicolon() {
    let (ast, root) = parse_ok("x = 1\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!("not a program") };
    let stmt = first_stmt.unwrap();
    let NodeKind::Assign { verbose, .. } = ast.get(stmt).kind else { panic!("not an assign") };
    assert!(verbose);
}

#[test]
fn parses_if_elseif_else_chain() {
    let (ast, root) = parse_ok("if a\n  x = 1;\nelseif b\n  x = 2;\nelse\n  x = 3;\nend\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!() };
    let stmt = first_stmt.unwrap();
    let NodeKind::If { else_block, .. } = ast.get(stmt).kind else { panic!("not an if") };
    let elseif = else_block.expect("elseif branch");
    assert!(matches!(ast.get(elseif).kind, NodeKind::If { .. }));
}

#[test]
fn parses_function_with_multiple_outputs() {
    let (ast, root) = parse_ok("function [a, b] = f(x)\n  a = x;\n  b = x;\nend\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!() };
    let stmt = first_stmt.unwrap();
    let NodeKind::FunctionDef { outputs, inputs, .. } = ast.get(stmt).kind else {
        panic!("not a function def")
    };
    assert_eq!(ast.iter_list(outputs).count(), 2);
    assert_eq!(ast.iter_list(inputs).count(), 1);
}

#[test]
fn parses_matrix_literal_as_nested_concatenation() {
    let (ast, root) = parse_ok("x = [1, 2; 3, 4];\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!() };
    let stmt = first_stmt.unwrap();
    let NodeKind::Assign { value, .. } = ast.get(stmt).kind else { panic!() };
    assert!(matches!(ast.get(value).kind, NodeKind::MatrixVCat { .. }));
}

#[test]
fn parses_matrix_literal_with_whitespace_column_separators() {
    let (ast, root) = parse_ok("x = [1 2; 3 4];\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!() };
    let stmt = first_stmt.unwrap();
    let NodeKind::Assign { value, .. } = ast.get(stmt).kind else { panic!() };
    let NodeKind::MatrixVCat { top, bottom } = ast.get(value).kind else { panic!("not a vcat") };
    assert!(matches!(ast.get(top).kind, NodeKind::MatrixHCat { .. }));
    assert!(matches!(ast.get(bottom).kind, NodeKind::MatrixHCat { .. }));
}

#[test]
fn whitespace_and_comma_column_separators_mix_freely() {
    let (ast, root) = parse_ok("x = [1, 2 3];\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!() };
    let stmt = first_stmt.unwrap();
    let NodeKind::Assign { value, .. } = ast.get(stmt).kind else { panic!() };
    let NodeKind::MatrixHCat { left, .. } = ast.get(value).kind else { panic!("not an hcat") };
    assert!(matches!(ast.get(left).kind, NodeKind::MatrixHCat { .. }));
}

#[test]
fn single_quotes_open_a_char_array_and_double_quotes_open_a_string() {
    let (ast, root) = parse_ok("a = 'x'; b = \"y\";\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!() };
    let mut stmts = ast.iter_list(first_stmt);
    let first = stmts.next().unwrap();
    let NodeKind::Assign { value: a_value, .. } = ast.get(first).kind else { panic!() };
    assert!(matches!(ast.get(a_value).kind, NodeKind::CharArrayLit { .. }));
    let second = stmts.next().expect("second assignment");
    let NodeKind::Assign { value: b_value, .. } = ast.get(second).kind else { panic!() };
    assert!(matches!(ast.get(b_value).kind, NodeKind::StringLit { .. }));
}

#[test]
fn distinguishes_multi_assign_from_matrix_literal_statement() {
    let (ast, root) = parse_ok("[a, b] = f(1);\n[1, 2, 3];\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!() };
    let mut stmts = ast.iter_list(first_stmt);
    let first = stmts.next().unwrap();
    assert!(matches!(ast.get(first).kind, NodeKind::MultiAssign { .. }));
    let second = stmts.next().unwrap();
    assert!(matches!(ast.get(second).kind, NodeKind::ExprStmt { .. }));
}

#[test]
fn rejects_break_outside_loop() {
    let err = parse_source("break;\n").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn rejects_class_definitions() {
    let err = parse_source("classdef Foo\nend\n").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn parses_end_as_index_sentinel_only_inside_calls() {
    let (ast, root) = parse_ok("y = x(end);\n");
    let NodeKind::Program { first_stmt } = ast.get(root).kind else { panic!() };
    let stmt = first_stmt.unwrap();
    let NodeKind::Assign { value, .. } = ast.get(stmt).kind else { panic!() };
    let NodeKind::Call { args, .. } = ast.get(value).kind else { panic!("not a call") };
    let arg = ast.iter_list(args).next().unwrap();
    assert!(matches!(ast.get(arg).kind, NodeKind::EndIndex));
}
