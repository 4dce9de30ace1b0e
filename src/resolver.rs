// ABOUTME: Static pass recording scope distance per variable use

use crate::ast::{Expr, NodeId, Stmt};
use crate::error::Diagnostics;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq)]
enum FunctionCtx {
    None,
    Function,
}

pub struct Resolver<'d> {
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<NodeId, usize>,
    current_function: FunctionCtx,
    loop_depth: u32,
    diag: &'d mut Diagnostics,
}

impl<'d> Resolver<'d> {
    pub fn new(diag: &'d mut Diagnostics) -> Self {
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionCtx::None,
            loop_depth: 0,
            diag,
        }
    }

    /// Resolves a whole program, returning the variable-use -> distance
    /// side-table the evaluator consults (spec.md §3, "Resolver side-table").
    pub fn resolve(mut self, stmts: &[Stmt]) -> HashMap<NodeId, usize> {
        self.resolve_stmts(stmts);
        self.locals
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), false);
        }
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &str) {
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(name) {
                let distance = self.scopes.len() - 1 - i;
                self.locals.insert(id, distance);
                return;
            }
        }
        // Not found in any scope: assume global, no entry recorded.
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Say(expr) => self.resolve_expr(expr),
            Stmt::Let { name, initializer } => {
                self.declare(&name.lexeme);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(&name.lexeme);
            }
            Stmt::Block(stmts) => {
                self.begin_scope();
                self.resolve_stmts(stmts);
                self.end_scope();
            }
            Stmt::If { cond, then_branch, else_branch } => {
                self.resolve_expr(cond);
                self.begin_scope();
                self.resolve_stmts(then_branch);
                self.end_scope();
                if let Some(else_branch) = else_branch {
                    self.begin_scope();
                    self.resolve_stmts(else_branch);
                    self.end_scope();
                }
            }
            Stmt::While { cond, body } => {
                self.resolve_expr(cond);
                self.loop_depth += 1;
                self.begin_scope();
                self.resolve_stmts(body);
                self.end_scope();
                self.loop_depth -= 1;
            }
            Stmt::Function { name, params, body } => {
                self.declare(&name.lexeme);
                self.define(&name.lexeme);
                self.resolve_function(params, body);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionCtx::None {
                    self.diag.resolve_error(
                        keyword.line,
                        keyword.column,
                        "cannot return from outside a function",
                    );
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::Break(token) => {
                if self.loop_depth == 0 {
                    self.diag.resolve_error(
                        token.line,
                        token.column,
                        "cannot break outside a loop",
                    );
                }
            }
            Stmt::Continue(token) => {
                if self.loop_depth == 0 {
                    self.diag.resolve_error(
                        token.line,
                        token.column,
                        "cannot continue outside a loop",
                    );
                }
            }
            Stmt::Pass => {}
            Stmt::Class { name, methods } => {
                self.declare(&name.lexeme);
                self.define(&name.lexeme);
                self.begin_scope();
                for method in methods {
                    if let Stmt::Function { params, body, .. } = method {
                        self.resolve_function(params, body);
                    }
                }
                self.end_scope();
            }
        }
    }

    fn resolve_function(&mut self, params: &[crate::token::Token], body: &[Stmt]) {
        let enclosing = self.current_function;
        let enclosing_loop_depth = self.loop_depth;
        self.current_function = FunctionCtx::Function;
        self.loop_depth = 0;
        self.begin_scope();
        for param in params {
            self.declare(&param.lexeme);
            self.define(&param.lexeme);
        }
        self.resolve_stmts(body);
        self.end_scope();
        self.current_function = enclosing;
        self.loop_depth = enclosing_loop_depth;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) | Expr::Bool(_) | Expr::Nil => {}
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        self.diag.resolve_error(
                            name.line,
                            name.column,
                            "cannot read local variable in its own initializer",
                        );
                    }
                }
                self.resolve_local(*id, &name.lexeme);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, &name.lexeme);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Ternary { cond, then_branch, else_branch } => {
                self.resolve_expr(cond);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::Parser;

    fn resolve_src(src: &str) -> (Diagnostics, HashMap<NodeId, usize>) {
        let mut diag = Diagnostics::new();
        let tokens = lex(src, &mut diag);
        let stmts = Parser::new(tokens).parse(&mut diag);
        let mut rdiag = Diagnostics::new();
        let locals = Resolver::new(&mut rdiag).resolve(&stmts);
        (rdiag, locals)
    }

    #[test]
    fn self_referential_initializer_is_rejected() {
        let (diag, _) = resolve_src("let x = 1\nlet x = x\n");
        assert!(diag.had_error);
    }

    #[test]
    fn shadowed_local_resolves_to_innermost_scope() {
        let (diag, locals) = resolve_src("let x = 1\nwhile true:\n    let x = 2\n    say x\n");
        assert!(!diag.had_error);
        assert_eq!(locals.len(), 1);
        assert_eq!(*locals.values().next().unwrap(), 0);
    }

    #[test]
    fn return_outside_function_is_rejected() {
        let (diag, _) = resolve_src("return 1\n");
        assert!(diag.had_error);
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let (diag, _) = resolve_src("break\n");
        assert!(diag.had_error);
    }

    #[test]
    fn global_reference_records_no_distance() {
        let (diag, locals) = resolve_src("let x = 1\nsay x\n");
        assert!(!diag.had_error);
        assert!(locals.is_empty());
    }

    #[test]
    fn break_inside_a_function_nested_in_a_loop_is_rejected() {
        let (diag, _) = resolve_src("while true:\n    fn f():\n        break\n    f()\n");
        assert!(diag.had_error);
    }

    #[test]
    fn continue_inside_a_function_nested_in_a_loop_is_rejected() {
        let (diag, _) = resolve_src("while true:\n    fn f():\n        continue\n    f()\n");
        assert!(diag.had_error);
    }
}
