// ABOUTME: Integration tests for the static resolver's scope-distance side-table

use saga::error::Diagnostics;
use saga::lexer::lex;
use saga::parser::Parser;
use saga::resolver::Resolver;

fn resolve(src: &str) -> (Diagnostics, std::collections::HashMap<saga::ast::NodeId, usize>) {
    let mut diag = Diagnostics::new();
    let tokens = lex(src, &mut diag);
    let stmts = Parser::new(tokens).parse(&mut diag);
    assert!(!diag.had_error, "unexpected parse errors: {:?}", diag.messages);
    let mut rdiag = Diagnostics::new();
    let locals = Resolver::new(&mut rdiag).resolve(&stmts);
    (rdiag, locals)
}

#[test]
fn self_referential_initializer_inside_a_scope_is_rejected() {
    let (diag, _) = resolve("while true:\n    let x = x\n");
    assert!(diag.had_error);
}

#[test]
fn nested_scope_walks_correct_number_of_parents_to_reach_declaration() {
    // x lives two scopes out from the innermost `say x`: while -> while -> use.
    let (diag, locals) = resolve("while true:\n    let x = 1\n    while true:\n        say x\n");
    assert!(!diag.had_error);
    assert_eq!(locals.len(), 1);
    assert_eq!(*locals.values().next().unwrap(), 1);
}

#[test]
fn function_parameter_shadows_outer_binding_at_distance_zero() {
    let (diag, locals) = resolve("let x = 1\nfn f(x):\n    say x\n");
    assert!(!diag.had_error);
    assert_eq!(locals.len(), 1);
    assert_eq!(*locals.values().next().unwrap(), 0);
}

#[test]
fn reference_to_a_never_declared_name_records_no_distance() {
    let (diag, locals) = resolve("say undeclared\n");
    assert!(!diag.had_error);
    assert!(locals.is_empty());
}

#[test]
fn return_inside_a_function_is_accepted() {
    let (diag, _) = resolve("fn f():\n    return 1\n");
    assert!(!diag.had_error);
}

#[test]
fn continue_inside_a_while_loop_is_accepted() {
    let (diag, _) = resolve("while true:\n    continue\n");
    assert!(!diag.had_error);
}
