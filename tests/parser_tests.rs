// ABOUTME: Integration tests for operator precedence and associativity in the parser

use saga::ast::{Expr, Stmt};
use saga::error::Diagnostics;
use saga::lexer::lex;
use saga::parser::Parser;
use saga::token::TokenKind;

fn parse(src: &str) -> Vec<Stmt> {
    let mut diag = Diagnostics::new();
    let tokens = lex(src, &mut diag);
    let stmts = Parser::new(tokens).parse(&mut diag);
    assert!(!diag.had_error, "unexpected parse errors: {:?}", diag.messages);
    stmts
}

fn only_expr(stmts: &[Stmt]) -> &Expr {
    match &stmts[0] {
        Stmt::Say(expr) | Stmt::Expression(expr) => expr,
        other => panic!("expected a single expression statement, got {:?}", other),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let stmts = parse("say 1 + 2 * 3\n");
    match only_expr(&stmts) {
        Expr::Binary { left, op, right } => {
            assert_eq!(op.kind, TokenKind::Plus);
            assert!(matches!(**left, Expr::Literal(_)));
            assert!(matches!(**right, Expr::Binary { .. }));
        }
        other => panic!("expected top-level '+', got {:?}", other),
    }
}

#[test]
fn logical_and_binds_tighter_than_logical_or() {
    let stmts = parse("say a or b and c\n");
    match only_expr(&stmts) {
        Expr::Logical { left, op, right } => {
            assert_eq!(op.kind, TokenKind::Or);
            assert!(matches!(**left, Expr::Variable { .. }));
            match &**right {
                Expr::Logical { op, .. } => assert_eq!(op.kind, TokenKind::And),
                other => panic!("expected 'and' nested under 'or', got {:?}", other),
            }
        }
        other => panic!("expected top-level 'or', got {:?}", other),
    }
}

#[test]
fn assignment_is_right_associative() {
    let stmts = parse("let a = 0\nlet b = 0\nlet c = 0\na = b = c\n");
    match &stmts[3] {
        Stmt::Expression(Expr::Assign { name, value, .. }) => {
            assert_eq!(name.lexeme, "a");
            match &**value {
                Expr::Assign { name, .. } => assert_eq!(name.lexeme, "b"),
                other => panic!("expected nested assignment to 'b', got {:?}", other),
            }
        }
        other => panic!("expected outer assignment to 'a', got {:?}", other),
    }
}

#[test]
fn ternary_is_right_associative() {
    let stmts = parse("say a ? b : c ? d : e\n");
    match only_expr(&stmts) {
        Expr::Ternary { then_branch, else_branch, .. } => {
            assert!(matches!(**then_branch, Expr::Variable { .. }));
            assert!(matches!(**else_branch, Expr::Ternary { .. }));
        }
        other => panic!("expected top-level ternary, got {:?}", other),
    }
}

#[test]
fn comparison_binds_looser_than_addition() {
    let stmts = parse("say 1 + 2 < 3 * 4\n");
    match only_expr(&stmts) {
        Expr::Binary { left, op, right } => {
            assert_eq!(op.kind, TokenKind::Less);
            assert!(matches!(**left, Expr::Binary { .. }));
            assert!(matches!(**right, Expr::Binary { .. }));
        }
        other => panic!("expected top-level '<', got {:?}", other),
    }
}

#[test]
fn unary_minus_binds_tighter_than_factor() {
    let stmts = parse("say -a * b\n");
    match only_expr(&stmts) {
        Expr::Binary { left, op, .. } => {
            assert_eq!(op.kind, TokenKind::Star);
            assert!(matches!(**left, Expr::Unary { .. }));
        }
        other => panic!("expected top-level '*', got {:?}", other),
    }
}

#[test]
fn grouping_overrides_default_precedence() {
    let stmts = parse("say (1 + 2) * 3\n");
    match only_expr(&stmts) {
        Expr::Binary { left, op, .. } => {
            assert_eq!(op.kind, TokenKind::Star);
            assert!(matches!(**left, Expr::Grouping(_)));
        }
        other => panic!("expected top-level '*', got {:?}", other),
    }
}
