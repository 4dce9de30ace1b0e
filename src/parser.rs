// ABOUTME: Recursive-descent parser building the Expr/Stmt AST from a token stream

use crate::ast::{Expr, NodeIdGen, Stmt};
use crate::error::Diagnostics;
use crate::token::{Literal, Token, TokenKind};

/// Marks that an error has already been reported to `Diagnostics`; carries
/// no payload of its own (mirrors the original implementation's bare
/// `ParseError` raised after the message has been printed).
#[derive(Debug)]
struct ParseError;

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    ids: NodeIdGen,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            current: 0,
            ids: NodeIdGen::new(),
        }
    }

    /// Parses a whole program, synchronizing past each malformed
    /// declaration so one bad statement doesn't hide the rest (spec.md §4.3).
    pub fn parse(&mut self, diag: &mut Diagnostics) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            match self.declaration(diag) {
                Ok(stmt) => stmts.push(stmt),
                Err(_) => self.synchronize(),
            }
        }
        stmts
    }

    // ---- cursor helpers ----

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, diag: &mut Diagnostics, msg: &str) -> PResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error(diag, msg))
    }

    fn error(&self, diag: &mut Diagnostics, msg: &str) -> ParseError {
        let token = self.peek().clone();
        diag.parse_error(token.line, token.column, msg);
        ParseError
    }

    /// Accepts `NEWLINE`, `EOF`, or `DEDENT` as a statement terminator: a
    /// file without a trailing newline closes its open indent levels with
    /// synthetic dedents before EOF, and no newline token is ever emitted
    /// in between (spec.md §4.1's EOF-closes-indents rule).
    fn consume_stmt_end(&mut self, diag: &mut Diagnostics) -> PResult<()> {
        if self.match_any(&[TokenKind::Newline]) || self.check(TokenKind::Eof) || self.check(TokenKind::Dedent) {
            return Ok(());
        }
        Err(self.error(diag, "Expected newline after statement."))
    }

    /// Builds a token carrying the loop variable's position, used for the
    /// comparison and increment synthesized by `for`-loop desugaring.
    fn synthetic(kind: TokenKind, lexeme: &str, at: &Token) -> Token {
        Token::new(kind, lexeme, at.line, at.column)
    }

    // ---- statement grammar ----

    fn declaration(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        if self.match_any(&[TokenKind::Class]) {
            return self.class_declaration(diag);
        }
        if self.match_any(&[TokenKind::Fn]) {
            return self.function_declaration(diag, "function");
        }
        if self.match_any(&[TokenKind::Let]) {
            return self.let_declaration(diag);
        }
        self.statement(diag)
    }

    fn let_declaration(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, diag, "Expected variable name.")?.clone();
        let initializer = if self.match_any(&[TokenKind::Equal]) {
            Some(self.expression(diag)?)
        } else {
            None
        };
        self.consume_stmt_end(diag)?;
        Ok(Stmt::Let { name, initializer })
    }

    fn function_declaration(&mut self, diag: &mut Diagnostics, kind: &str) -> PResult<Stmt> {
        let name = self
            .consume(TokenKind::Identifier, diag, &format!("Expected {} name.", kind))?
            .clone();
        self.consume(TokenKind::LeftParen, diag, &format!("Expected '(' after {} name.", kind))?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    diag.parse_error(token.line, token.column, "Cannot have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, diag, "Expected parameter name.")?.clone());
                if !self.match_any(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, diag, "Expected ')' after parameters.")?;
        self.consume(TokenKind::Colon, diag, "Expected ':' before function body.")?;
        let body = self.block(diag)?;
        Ok(Stmt::Function { name, params, body })
    }

    fn class_declaration(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, diag, "Expected class name.")?.clone();
        self.consume(TokenKind::Colon, diag, "Expected ':' before class body.")?;
        self.consume(TokenKind::Newline, diag, "Expected newline before class body.")?;
        self.consume(TokenKind::Indent, diag, "Expected indented class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            self.consume(TokenKind::Fn, diag, "Expected method declaration.")?;
            methods.push(self.function_declaration(diag, "method")?);
        }
        self.consume(TokenKind::Dedent, diag, "Expected dedent to end class body.")?;
        Ok(Stmt::Class { name, methods })
    }

    /// `:` NEWLINE INDENT stmt+ DEDENT (spec.md §4.1 SUITE rule).
    fn block(&mut self, diag: &mut Diagnostics) -> PResult<Vec<Stmt>> {
        self.consume(TokenKind::Newline, diag, "Expected newline before indented block.")?;
        self.consume(TokenKind::Indent, diag, "Expected an indented block.")?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            match self.declaration(diag) {
                Ok(stmt) => stmts.push(stmt),
                Err(_) => self.synchronize(),
            }
        }
        self.consume(TokenKind::Dedent, diag, "Expected dedent to end block.")?;
        Ok(stmts)
    }

    fn statement(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        if self.match_any(&[TokenKind::Say]) {
            return self.say_statement(diag);
        }
        if self.match_any(&[TokenKind::If]) {
            return self.if_statement(diag);
        }
        if self.match_any(&[TokenKind::While]) {
            return self.while_statement(diag);
        }
        if self.match_any(&[TokenKind::For]) {
            return self.for_statement(diag);
        }
        if self.match_any(&[TokenKind::Return]) {
            return self.return_statement(diag);
        }
        if self.match_any(&[TokenKind::Break]) {
            let keyword = self.previous().clone();
            self.consume_stmt_end(diag)?;
            return Ok(Stmt::Break(keyword));
        }
        if self.match_any(&[TokenKind::Continue]) {
            let keyword = self.previous().clone();
            self.consume_stmt_end(diag)?;
            return Ok(Stmt::Continue(keyword));
        }
        if self.match_any(&[TokenKind::Pass]) {
            self.consume_stmt_end(diag)?;
            return Ok(Stmt::Pass);
        }
        self.expression_statement(diag)
    }

    fn say_statement(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        let value = self.expression(diag)?;
        self.consume_stmt_end(diag)?;
        Ok(Stmt::Say(value))
    }

    fn if_statement(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        let cond = self.expression(diag)?;
        self.consume(TokenKind::Colon, diag, "Expected ':' after if condition.")?;
        let then_branch = self.block(diag)?;
        let else_branch = if self.match_any(&[TokenKind::Else]) {
            self.consume(TokenKind::Colon, diag, "Expected ':' after else.")?;
            Some(self.block(diag)?)
        } else {
            None
        };
        Ok(Stmt::If { cond, then_branch, else_branch })
    }

    fn while_statement(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        let cond = self.expression(diag)?;
        self.consume(TokenKind::Colon, diag, "Expected ':' after while condition.")?;
        let body = self.block(diag)?;
        Ok(Stmt::While { cond, body })
    }

    /// Desugars `for x in A..B: SUITE` into:
    /// ```text
    /// let x = A
    /// while x <= B:
    ///     SUITE
    ///     x = x + 1
    /// ```
    /// per spec.md §4.3; only range iterables are supported.
    fn for_statement(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        let var_name = self.consume(TokenKind::Identifier, diag, "Expected loop variable name.")?.clone();
        self.consume(TokenKind::In, diag, "Expected 'in' after loop variable.")?;
        let start = self.term(diag)?;
        self.consume(TokenKind::Range, diag, "Expected '..' in for-loop range.")?;
        let end = self.term(diag)?;
        self.consume(TokenKind::Colon, diag, "Expected ':' after for-loop range.")?;
        let mut body = self.block(diag)?;

        let let_stmt = Stmt::Let { name: var_name.clone(), initializer: Some(start) };

        let cond = Expr::Binary {
            left: Box::new(Expr::Variable { id: self.ids.next_id(), name: var_name.clone() }),
            op: Self::synthetic(TokenKind::LessEqual, "<=", &var_name),
            right: Box::new(end),
        };

        let increment = Stmt::Expression(Expr::Assign {
            id: self.ids.next_id(),
            name: var_name.clone(),
            value: Box::new(Expr::Binary {
                left: Box::new(Expr::Variable { id: self.ids.next_id(), name: var_name.clone() }),
                op: Self::synthetic(TokenKind::Plus, "+", &var_name),
                right: Box::new(Expr::Literal(Literal::Int(1))),
            }),
        });
        body.push(increment);

        Ok(Stmt::Block(vec![let_stmt, Stmt::While { cond, body }]))
    }

    fn return_statement(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenKind::Newline) && !self.check(TokenKind::Eof) && !self.check(TokenKind::Dedent) {
            Some(self.expression(diag)?)
        } else {
            None
        };
        self.consume_stmt_end(diag)?;
        Ok(Stmt::Return { keyword, value })
    }

    fn expression_statement(&mut self, diag: &mut Diagnostics) -> PResult<Stmt> {
        let expr = self.expression(diag)?;
        self.consume_stmt_end(diag)?;
        Ok(Stmt::Expression(expr))
    }

    // ---- expression grammar (lowest to highest precedence) ----

    fn expression(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        self.comma(diag)
    }

    fn comma(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.check(TokenKind::Comma) {
            return self.leading_binary_error(diag, |p, d| p.assignment(d));
        }
        let mut expr = self.assignment(diag)?;
        while self.match_any(&[TokenKind::Comma]) {
            let op = self.previous().clone();
            let right = self.assignment(diag)?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn assignment(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        let expr = self.ternary(diag)?;

        if self.match_any(&[TokenKind::Equal]) {
            let value = self.assignment(diag)?;
            return self.finish_assign(diag, expr, value);
        }

        if self.match_any(&[
            TokenKind::PlusEqual,
            TokenKind::MinusEqual,
            TokenKind::StarEqual,
            TokenKind::SlashEqual,
        ]) {
            let op_token = self.previous().clone();
            let binop = match op_token.kind {
                TokenKind::PlusEqual => TokenKind::Plus,
                TokenKind::MinusEqual => TokenKind::Minus,
                TokenKind::StarEqual => TokenKind::Star,
                TokenKind::SlashEqual => TokenKind::Slash,
                _ => unreachable!(),
            };
            let rhs = self.assignment(diag)?;
            let lexeme = match binop {
                TokenKind::Plus => "+",
                TokenKind::Minus => "-",
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                _ => unreachable!(),
            };
            let op = Token::new(binop, lexeme, op_token.line, op_token.column);
            let combined = Expr::Binary { left: Box::new(expr.clone()), op, right: Box::new(rhs) };
            return self.finish_assign(diag, expr, combined);
        }

        if self.match_any(&[TokenKind::PlusPlus, TokenKind::MinusMinus]) {
            let op_token = self.previous().clone();
            let (binop, lexeme) = if op_token.kind == TokenKind::PlusPlus {
                (TokenKind::Plus, "+")
            } else {
                (TokenKind::Minus, "-")
            };
            let op = Token::new(binop, lexeme, op_token.line, op_token.column);
            let combined = Expr::Binary {
                left: Box::new(expr.clone()),
                op,
                right: Box::new(Expr::Literal(Literal::Int(1))),
            };
            return self.finish_assign(diag, expr, combined);
        }

        Ok(expr)
    }

    fn finish_assign(&mut self, diag: &mut Diagnostics, target: Expr, value: Expr) -> PResult<Expr> {
        if let Expr::Variable { name, .. } = target {
            return Ok(Expr::Assign { id: self.ids.next_id(), name, value: Box::new(value) });
        }
        let (line, column) = Self::expr_pos(&target);
        diag.parse_error(line, column, "Invalid assignment target.");
        Ok(target)
    }

    fn expr_pos(expr: &Expr) -> (u32, u32) {
        match expr {
            Expr::Variable { name, .. } | Expr::Assign { name, .. } => (name.line, name.column),
            Expr::Unary { op, .. } | Expr::Binary { op, .. } | Expr::Logical { op, .. } => (op.line, op.column),
            Expr::Call { paren, .. } => (paren.line, paren.column),
            Expr::Grouping(inner) => Self::expr_pos(inner),
            Expr::Ternary { cond, .. } => Self::expr_pos(cond),
            Expr::Literal(_) | Expr::Bool(_) | Expr::Nil => (0, 0),
        }
    }

    fn ternary(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        let expr = self.logical_or(diag)?;
        if self.match_any(&[TokenKind::Question]) {
            let then_branch = self.ternary(diag)?;
            self.consume(TokenKind::Colon, diag, "Expected ':' in ternary expression.")?;
            let else_branch = self.ternary(diag)?;
            return Ok(Expr::Ternary {
                cond: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }
        Ok(expr)
    }

    fn logical_or(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.check(TokenKind::Or) {
            return self.leading_binary_error(diag, |p, d| p.logical_and(d));
        }
        let mut expr = self.logical_and(diag)?;
        while self.match_any(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = self.logical_and(diag)?;
            expr = Expr::Logical { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn logical_and(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.check(TokenKind::And) {
            return self.leading_binary_error(diag, |p, d| p.equality(d));
        }
        let mut expr = self.equality(diag)?;
        while self.match_any(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = self.equality(diag)?;
            expr = Expr::Logical { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn equality(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.check(TokenKind::BangEqual) || self.check(TokenKind::EqualEqual) {
            return self.leading_binary_error(diag, |p, d| p.comparison(d));
        }
        let mut expr = self.comparison(diag)?;
        while self.match_any(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison(diag)?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn comparison(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.check(TokenKind::Greater)
            || self.check(TokenKind::GreaterEqual)
            || self.check(TokenKind::Less)
            || self.check(TokenKind::LessEqual)
        {
            return self.leading_binary_error(diag, |p, d| p.range_expr(d));
        }
        let mut expr = self.range_expr(diag)?;
        while self.match_any(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.range_expr(diag)?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn range_expr(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.check(TokenKind::Range) {
            return self.leading_binary_error(diag, |p, d| p.term(d));
        }
        let mut expr = self.term(diag)?;
        while self.match_any(&[TokenKind::Range]) {
            let op = self.previous().clone();
            let right = self.term(diag)?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    /// Only `+` is rejected as a leading operator here: unary `-` has a
    /// legitimate prefix meaning (e.g. `-5`), matching the original parser.
    fn term(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.check(TokenKind::Plus) {
            return self.leading_binary_error(diag, |p, d| p.factor(d));
        }
        let mut expr = self.factor(diag)?;
        while self.match_any(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.factor(diag)?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn factor(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.check(TokenKind::Star) || self.check(TokenKind::Slash) {
            return self.leading_binary_error(diag, |p, d| p.unary(d));
        }
        let mut expr = self.unary(diag)?;
        while self.match_any(&[TokenKind::Star, TokenKind::Slash]) {
            let op = self.previous().clone();
            let right = self.unary(diag)?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    /// Reports a leading-binary-operator error, then consumes and discards
    /// a right-hand operand so the cursor lands somewhere plausible before
    /// synchronization takes over (spec.md §4.3).
    fn leading_binary_error(
        &mut self,
        diag: &mut Diagnostics,
        parse_operand: impl Fn(&mut Self, &mut Diagnostics) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let token = self.advance().clone();
        diag.parse_error(
            token.line,
            token.column,
            &format!("binary operator '{}' cannot appear at the beginning of an expression", token.lexeme),
        );
        let _ = parse_operand(self, diag);
        Err(ParseError)
    }

    fn unary(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.match_any(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary(diag)?;
            return Ok(Expr::Unary { op, right: Box::new(right) });
        }
        self.call(diag)
    }

    fn call(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        let mut expr = self.primary(diag)?;
        loop {
            if self.match_any(&[TokenKind::LeftParen]) {
                expr = self.finish_call(diag, expr)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, diag: &mut Diagnostics, callee: Expr) -> PResult<Expr> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= 255 {
                    let token = self.peek().clone();
                    diag.parse_error(token.line, token.column, "Cannot have more than 255 arguments.");
                }
                args.push(self.assignment(diag)?);
                if !self.match_any(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, diag, "Expected ')' after arguments.")?.clone();
        Ok(Expr::Call { callee: Box::new(callee), paren, args })
    }

    fn primary(&mut self, diag: &mut Diagnostics) -> PResult<Expr> {
        if self.match_any(&[TokenKind::False]) {
            return Ok(Expr::Bool(false));
        }
        if self.match_any(&[TokenKind::True]) {
            return Ok(Expr::Bool(true));
        }
        if self.match_any(&[TokenKind::Nil]) {
            return Ok(Expr::Nil);
        }
        if self.match_any(&[TokenKind::Integer, TokenKind::Float, TokenKind::String]) {
            let literal = self.previous().literal.clone().expect("literal token must carry a payload");
            return Ok(Expr::Literal(literal));
        }
        if self.match_any(&[TokenKind::Identifier]) {
            let name = self.previous().clone();
            return Ok(Expr::Variable { id: self.ids.next_id(), name });
        }
        if self.match_any(&[TokenKind::LeftParen]) {
            let expr = self.expression(diag)?;
            self.consume(TokenKind::RightParen, diag, "Expected ')' after expression.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }
        Err(self.error(diag, "Expected expression."))
    }

    /// Discards tokens until a plausible statement boundary, so one bad
    /// statement doesn't prevent parsing the rest of the program.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Newline {
                return;
            }
            if matches!(
                self.peek().kind,
                TokenKind::Let
                    | TokenKind::Fn
                    | TokenKind::If
                    | TokenKind::For
                    | TokenKind::While
                    | TokenKind::Class
                    | TokenKind::Return
                    | TokenKind::Import
                    | TokenKind::Say
                    | TokenKind::Break
                    | TokenKind::Continue
            ) {
                return;
            }
            self.advance();
        }
    }
}
