// ABOUTME: Tree-walking evaluator: AST -> values and side effects

use crate::ast::{Expr, NodeId, Stmt};
use crate::control::ControlFlow;
use crate::env::Environment;
use crate::error::{Diagnostics, SagaError};
use crate::token::{Literal, Token, TokenKind};
use crate::value::{Callable, ClassDecl, Instance, LambdaFn, Value};
use std::collections::HashMap;
use std::rc::Rc;

pub struct Interpreter {
    globals: Rc<Environment>,
    env: Rc<Environment>,
    locals: HashMap<NodeId, usize>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new();
        crate::natives::register(&globals);
        Interpreter {
            globals: globals.clone(),
            env: globals,
            locals: HashMap::new(),
        }
    }

    /// Runs one program against the persistent global environment, using a
    /// freshly-resolved side-table. The REPL calls this once per line,
    /// reusing the same `Interpreter` so globals survive across lines
    /// (spec.md §5's single global environment per interpreter instance).
    pub fn run(&mut self, stmts: &[Stmt], locals: HashMap<NodeId, usize>, diag: &mut Diagnostics) {
        self.locals = locals;
        for stmt in stmts {
            match self.execute(stmt) {
                Ok(_) => {}
                Err(e) => {
                    diag.runtime_error(e.line(), e.column(), e.message());
                    return;
                }
            }
        }
    }

    /// Evaluates a single bare expression against the persistent global
    /// environment, used by the REPL's auto-print path (spec.md §6) so a
    /// one-line expression's value is visible without a `say`.
    pub fn evaluate_repl_expr(&mut self, expr: &Expr, locals: HashMap<NodeId, usize>) -> Result<Value, SagaError> {
        self.locals = locals;
        self.evaluate(expr)
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<ControlFlow, SagaError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(ControlFlow::Normal)
            }
            Stmt::Say(expr) => {
                let value = self.evaluate(expr)?;
                println!("{}", value);
                Ok(ControlFlow::Normal)
            }
            Stmt::Let { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.env.define(name.lexeme.clone(), value);
                Ok(ControlFlow::Normal)
            }
            Stmt::Block(stmts) => {
                let scope = Environment::with_parent(self.env.clone());
                self.execute_block(stmts, scope)
            }
            Stmt::If { cond, then_branch, else_branch } => {
                if self.evaluate(cond)?.is_truthy() {
                    let scope = Environment::with_parent(self.env.clone());
                    self.execute_block(then_branch, scope)
                } else if let Some(else_branch) = else_branch {
                    let scope = Environment::with_parent(self.env.clone());
                    self.execute_block(else_branch, scope)
                } else {
                    Ok(ControlFlow::Normal)
                }
            }
            Stmt::While { cond, body } => {
                while self.evaluate(cond)?.is_truthy() {
                    let scope = Environment::with_parent(self.env.clone());
                    match self.execute_block(body, scope)? {
                        ControlFlow::Break => break,
                        ControlFlow::Normal | ControlFlow::Continue => {}
                        ret @ ControlFlow::Return(_) => return Ok(ret),
                    }
                }
                Ok(ControlFlow::Normal)
            }
            Stmt::Function { name, params, body } => {
                let fun = LambdaFn {
                    name: name.lexeme.clone(),
                    params: params.iter().map(|p| p.lexeme.clone()).collect(),
                    body: Rc::new(body.clone()),
                    closure: self.env.clone(),
                };
                self.env.define(name.lexeme.clone(), Value::Callable(Callable::Function(Rc::new(fun))));
                Ok(ControlFlow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(ControlFlow::Return(value))
            }
            Stmt::Break(_) => Ok(ControlFlow::Break),
            Stmt::Continue(_) => Ok(ControlFlow::Continue),
            Stmt::Pass => Ok(ControlFlow::Normal),
            Stmt::Class { name, methods } => {
                let method_fns = methods
                    .iter()
                    .filter_map(|m| match m {
                        Stmt::Function { name, params, body } => Some(Rc::new(LambdaFn {
                            name: name.lexeme.clone(),
                            params: params.iter().map(|p| p.lexeme.clone()).collect(),
                            body: Rc::new(body.clone()),
                            closure: self.env.clone(),
                        })),
                        _ => None,
                    })
                    .collect();
                let class = ClassDecl { name: name.lexeme.clone(), methods: method_fns };
                self.env.define(name.lexeme.clone(), Value::Callable(Callable::Class(Rc::new(class))));
                Ok(ControlFlow::Normal)
            }
        }
    }

    /// Executes `stmts` with `self.env` swapped to `scope`, always
    /// restoring the caller's environment before returning.
    fn execute_block(&mut self, stmts: &[Stmt], scope: Rc<Environment>) -> Result<ControlFlow, SagaError> {
        let previous = std::mem::replace(&mut self.env, scope);
        let mut result = Ok(ControlFlow::Normal);
        for stmt in stmts {
            match self.execute(stmt) {
                Ok(cf) => {
                    if !cf.is_normal() {
                        result = Ok(cf);
                        break;
                    }
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.env = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, SagaError> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(n) => Value::Float(*n),
                Literal::Str(s) => Value::String(s.clone()),
            }),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Nil => Ok(Value::Nil),
            Expr::Variable { id, name } => self.lookup_variable(*id, name),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }
            Expr::Unary { op, right } => self.evaluate_unary(op, right),
            Expr::Binary { left, op, right } => self.evaluate_binary(left, op, right),
            Expr::Logical { left, op, right } => self.evaluate_logical(left, op, right),
            Expr::Ternary { cond, then_branch, else_branch } => {
                if self.evaluate(cond)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Call { callee, paren, args } => self.evaluate_call(callee, paren, args),
        }
    }

    fn lookup_variable(&self, id: NodeId, name: &Token) -> Result<Value, SagaError> {
        if let Some(distance) = self.locals.get(&id) {
            Ok(self.env.get_at(*distance, &name.lexeme))
        } else {
            self.globals.get(&name.lexeme, name.line, name.column)
        }
    }

    fn assign_variable(&self, id: NodeId, name: &Token, value: Value) -> Result<(), SagaError> {
        if let Some(distance) = self.locals.get(&id) {
            self.env.assign_at(*distance, &name.lexeme, value);
            Ok(())
        } else {
            self.globals.assign(&name.lexeme, value, name.line, name.column)
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> Result<Value, SagaError> {
        let right = self.evaluate(right)?;
        match op.kind {
            TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
            TokenKind::Minus => match right {
                Value::Int(n) => Ok(Value::Int(-n)),
                Value::Float(n) => Ok(Value::Float(-n)),
                _ => Err(self.err(op, "Operand must be a number.")),
            },
            _ => unreachable!("unary op restricted to ! and - by the parser"),
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, SagaError> {
        let left = self.evaluate(left)?;
        match op.kind {
            TokenKind::Or => {
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            TokenKind::And => {
                if !left.is_truthy() {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            _ => unreachable!("logical op restricted to and/or by the parser"),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, SagaError> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        match op.kind {
            TokenKind::Plus => self.add(&left, &right, op),
            TokenKind::Minus => self.numeric(&left, &right, op, |a, b| a - b, |a, b| a - b),
            TokenKind::Star => self.numeric(&left, &right, op, |a, b| a * b, |a, b| a * b),
            TokenKind::Slash => self.divide(&left, &right, op),
            TokenKind::Greater => self.compare(&left, &right, op, |a, b| a > b),
            TokenKind::GreaterEqual => self.compare(&left, &right, op, |a, b| a >= b),
            TokenKind::Less => self.compare(&left, &right, op, |a, b| a < b),
            TokenKind::LessEqual => self.compare(&left, &right, op, |a, b| a <= b),
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::BangEqual => Ok(Value::Bool(left != right)),
            TokenKind::Range => Err(self.err(op, "Range expressions are only valid in a for-loop header.")),
            _ => unreachable!("binary op restricted to arithmetic/comparison by the parser"),
        }
    }

    fn add(&self, left: &Value, right: &Value, op: &Token) -> Result<Value, SagaError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::String(a), b) if b.is_number() => Ok(Value::String(format!("{}{}", a, b))),
            (a, Value::String(b)) if a.is_number() => Ok(Value::String(format!("{}{}", a, b))),
            _ if left.is_number() && right.is_number() => {
                Ok(Value::Float(left.as_f64().unwrap() + right.as_f64().unwrap()))
            }
            _ => Err(self.err(op, "Operands must be two numbers or two strings.")),
        }
    }

    fn numeric(
        &self,
        left: &Value,
        right: &Value,
        op: &Token,
        float_op: impl Fn(f64, f64) -> f64,
        int_op: impl Fn(i64, i64) -> i64,
    ) -> Result<Value, SagaError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(*a, *b))),
            _ if left.is_number() && right.is_number() => {
                Ok(Value::Float(float_op(left.as_f64().unwrap(), right.as_f64().unwrap())))
            }
            _ => Err(self.err(op, "Operands must be numbers.")),
        }
    }

    fn divide(&self, left: &Value, right: &Value, op: &Token) -> Result<Value, SagaError> {
        if !left.is_number() || !right.is_number() {
            return Err(self.err(op, "Operands must be numbers."));
        }
        let divisor = right.as_f64().unwrap();
        if divisor == 0.0 {
            return Err(self.err(op, "divide by zero"));
        }
        Ok(Value::Float(left.as_f64().unwrap() / divisor))
    }

    fn compare(&self, left: &Value, right: &Value, op: &Token, cmp: impl Fn(f64, f64) -> bool) -> Result<Value, SagaError> {
        match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Bool(cmp(a, b))),
            _ => Err(self.err(op, "Operands must be numbers.")),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> Result<Value, SagaError> {
        let callee = self.evaluate(callee)?;
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.evaluate(arg)?);
        }
        match callee {
            Value::Callable(Callable::Function(fun)) => self.call_function(&fun, &arg_values, paren),
            Value::Callable(Callable::Native(native)) => {
                if native.arity >= 0 && arg_values.len() as i32 != native.arity {
                    return Err(self.err(
                        paren,
                        &format!("Expected {} arguments but got {}.", native.arity, arg_values.len()),
                    ));
                }
                (native.func)(&arg_values)
            }
            Value::Callable(Callable::Class(class)) => {
                Ok(Value::Instance(Rc::new(Instance { class_name: class.name.clone() })))
            }
            _ => Err(self.err(paren, "Can only call functions and classes.")),
        }
    }

    fn call_function(&mut self, fun: &Rc<LambdaFn>, args: &[Value], paren: &Token) -> Result<Value, SagaError> {
        if args.len() != fun.params.len() {
            return Err(self.err(
                paren,
                &format!("Expected {} arguments but got {}.", fun.params.len(), args.len()),
            ));
        }
        let call_env = Environment::with_parent(fun.closure.clone());
        for (param, arg) in fun.params.iter().zip(args) {
            call_env.define(param.clone(), arg.clone());
        }
        match self.execute_block(&fun.body, call_env)? {
            ControlFlow::Return(value) => Ok(value),
            ControlFlow::Normal => Ok(Value::Nil),
            ControlFlow::Break | ControlFlow::Continue => {
                Err(self.err(paren, "break/continue outside a loop."))
            }
        }
    }

    fn err(&self, token: &Token, message: &str) -> SagaError {
        SagaError::new(token.line, token.column, message)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::Parser;
    use crate::resolver::Resolver;

    fn run_source(src: &str) -> Diagnostics {
        let mut diag = Diagnostics::new();
        let tokens = lex(src, &mut diag);
        let stmts = Parser::new(tokens).parse(&mut diag);
        assert!(!diag.had_error, "parse errors: {:?}", diag.messages);
        let locals = Resolver::new(&mut diag).resolve(&stmts);
        assert!(!diag.had_error, "resolve errors: {:?}", diag.messages);
        let mut interp = Interpreter::new();
        interp.run(&stmts, locals, &mut diag);
        diag
    }

    #[test]
    fn arithmetic_precedence() {
        let diag = run_source("say 1 + 2 * 3\n");
        assert!(!diag.had_runtime_error);
    }

    #[test]
    fn short_circuit_and_skips_right_operand() {
        let diag = run_source("fn boom():\n    say \"should not print\"\n    return true\nsay false and boom()\n");
        assert!(!diag.had_runtime_error);
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let diag = run_source("say 1 / 0\n");
        assert!(diag.had_runtime_error);
        assert!(diag.messages.iter().any(|m| m.contains("divide by zero")));
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let diag = run_source("say x\n");
        assert!(diag.had_runtime_error);
        assert!(diag.messages.iter().any(|m| m.contains("Undefined variable 'x'")));
    }

    #[test]
    fn closures_keep_independent_counters() {
        let src = "fn make(n):\n    fn inc():\n        n = n + 1\n        return n\n    return inc\nlet c = make(0)\nsay c()\nsay c()\nsay c()\n";
        let diag = run_source(src);
        assert!(!diag.had_runtime_error);
    }

    #[test]
    fn for_loop_desugars_and_counts_inclusively() {
        let diag = run_source("for i in 1..3:\n    say i\n");
        assert!(!diag.had_runtime_error);
    }

    #[test]
    fn string_and_number_concatenation() {
        let diag = run_source("say \"count: \" + 5\n");
        assert!(!diag.had_runtime_error);
    }

    #[test]
    fn break_escaping_a_function_call_is_a_runtime_error() {
        // Bypasses the resolver (which already rejects this statically) to
        // check the evaluator also refuses to launder an escaped Break into
        // a normal `nil` return, per spec.md §7.
        let mut diag = Diagnostics::new();
        let tokens = lex("fn f():\n    break\nf()\n", &mut diag);
        let stmts = Parser::new(tokens).parse(&mut diag);
        assert!(!diag.had_error, "parse errors: {:?}", diag.messages);
        let mut interp = Interpreter::new();
        interp.run(&stmts, HashMap::new(), &mut diag);
        assert!(diag.had_runtime_error);
    }
}
