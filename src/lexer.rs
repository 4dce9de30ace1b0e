// ABOUTME: Indentation-sensitive lexer: characters -> token stream

use crate::error::Diagnostics;
use crate::token::{keyword_kind, Literal, Token, TokenKind};

/// Spaces per indentation level (spec.md §6).
const INDENT_WIDTH: usize = 4;

pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    start: usize,
    current: usize,
    line: u32,
    column: u32,
    indent_level: usize,
    at_line_start: bool,
    line_has_content: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            chars: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            indent_level: 0,
            at_line_start: true,
            line_has_content: false,
            tokens: Vec::new(),
        }
    }

    /// Scans the whole source, reporting lexical errors to `diag` and
    /// continuing, per spec.md §4.1/§7.
    pub fn scan_tokens(mut self, diag: &mut Diagnostics) -> Vec<Token> {
        while !self.is_at_end() {
            if self.at_line_start {
                self.handle_indentation(diag);
                self.at_line_start = false;
                if self.is_at_end() {
                    break;
                }
            }
            self.start = self.current;
            self.scan_token(diag);
        }

        // EOF implicitly closes every open indent level (REDESIGN FLAGS #2).
        while self.indent_level > 0 {
            self.tokens.push(Token::new(TokenKind::Dedent, "", self.line, self.column));
            self.indent_level -= 1;
        }

        self.tokens
            .push(Token::new(TokenKind::Eof, "", self.line, self.column));
        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.chars.len() {
            '\0'
        } else {
            self.chars[self.current + 1]
        }
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            return false;
        }
        self.current += 1;
        self.column += 1;
        true
    }

    fn lexeme(&self) -> String {
        self.chars[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, self.line, self.column));
    }

    fn add_literal(&mut self, kind: TokenKind, literal: Literal) {
        let lexeme = self.lexeme();
        self.tokens
            .push(Token::with_literal(kind, lexeme, literal, self.line, self.column));
    }

    fn handle_indentation(&mut self, diag: &mut Diagnostics) {
        let mut spaces = 0usize;
        while self.peek() == ' ' {
            self.advance();
            spaces += 1;
        }

        // Blank line: no indentation tokens.
        if self.peek() == '\n' || self.peek() == '\r' || self.is_at_end() {
            return;
        }

        let level = spaces / INDENT_WIDTH;

        if level > self.indent_level {
            if level > self.indent_level + 1 {
                diag.lex_error(
                    self.line,
                    self.column,
                    "indentation jumps more than one level at once",
                );
            }
            self.indent_level = level;
            self.line_has_content = true;
            self.tokens
                .push(Token::new(TokenKind::Indent, "", self.line, self.column));
        } else if level < self.indent_level {
            while self.indent_level > level {
                self.line_has_content = true;
                self.tokens
                    .push(Token::new(TokenKind::Dedent, "", self.line, self.column));
                self.indent_level -= 1;
            }
        }
    }

    fn scan_token(&mut self, diag: &mut Diagnostics) {
        let c = self.advance();

        if !matches!(c, ' ' | '\t' | '\r' | '\n') {
            self.line_has_content = true;
        }

        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            ',' => self.add_token(TokenKind::Comma),
            ':' => self.add_token(TokenKind::Colon),
            '?' => self.add_token(TokenKind::Question),
            '.' => {
                if self.matches('.') {
                    self.add_token(TokenKind::Range)
                } else {
                    self.add_token(TokenKind::Dot)
                }
            }
            '+' => {
                if self.matches('=') {
                    self.add_token(TokenKind::PlusEqual)
                } else if self.matches('+') {
                    self.add_token(TokenKind::PlusPlus)
                } else {
                    self.add_token(TokenKind::Plus)
                }
            }
            '-' => {
                if self.matches('=') {
                    self.add_token(TokenKind::MinusEqual)
                } else if self.matches('-') {
                    self.add_token(TokenKind::MinusMinus)
                } else {
                    self.add_token(TokenKind::Minus)
                }
            }
            '*' => {
                if self.matches('=') {
                    self.add_token(TokenKind::StarEqual)
                } else {
                    self.add_token(TokenKind::Star)
                }
            }
            '/' => {
                if self.matches('/') {
                    self.line_has_content = false;
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.matches('*') {
                    self.line_has_content = false;
                    self.block_comment(diag);
                } else if self.matches('=') {
                    self.add_token(TokenKind::SlashEqual)
                } else {
                    self.add_token(TokenKind::Slash)
                }
            }
            '<' => {
                if self.matches('=') {
                    self.add_token(TokenKind::LessEqual)
                } else {
                    self.add_token(TokenKind::Less)
                }
            }
            '>' => {
                if self.matches('=') {
                    self.add_token(TokenKind::GreaterEqual)
                } else {
                    self.add_token(TokenKind::Greater)
                }
            }
            '=' => {
                if self.matches('=') {
                    self.add_token(TokenKind::EqualEqual)
                } else {
                    self.add_token(TokenKind::Equal)
                }
            }
            '!' => {
                if self.matches('=') {
                    self.add_token(TokenKind::BangEqual)
                } else {
                    self.add_token(TokenKind::Bang)
                }
            }
            ' ' | '\t' => {}
            '\r' => {}
            '\n' => {
                if self.line_has_content {
                    self.add_token(TokenKind::Newline);
                }
                self.line += 1;
                self.column = 0;
                self.at_line_start = true;
                self.line_has_content = false;
            }
            '"' => self.string(diag),
            _ if c.is_ascii_digit() => self.number(),
            _ if c.is_alphabetic() || c == '_' => self.identifier(),
            _ => diag.lex_error(self.line, self.column, "unexpected character"),
        }
    }

    fn string(&mut self, diag: &mut Diagnostics) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            diag.lex_error(self.line, self.column, "unterminated string");
            return;
        }

        self.advance(); // closing quote
        let value: String = self.chars[self.start + 1..self.current - 1].iter().collect();
        self.add_literal(TokenKind::String, Literal::Str(value));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume '.'
            while self.peek().is_ascii_digit() {
                self.advance();
            }
            let text = self.lexeme();
            let value: f64 = text.parse().expect("scanned float literal must parse");
            self.add_literal(TokenKind::Float, Literal::Float(value));
        } else {
            let text = self.lexeme();
            let value: i64 = text.parse().expect("scanned integer literal must parse");
            self.add_literal(TokenKind::Integer, Literal::Int(value));
        }
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let text = self.lexeme();
        let kind = keyword_kind(&text).unwrap_or(TokenKind::Identifier);
        self.add_token(kind);
    }

    fn block_comment(&mut self, diag: &mut Diagnostics) {
        let mut nesting = 1;
        while nesting > 0 && !self.is_at_end() {
            let c = self.advance();
            if c == '/' && self.matches('*') {
                nesting += 1;
            } else if c == '*' && self.matches('/') {
                nesting -= 1;
            } else if c == '\n' {
                self.line += 1;
            }
        }
        if nesting > 0 {
            diag.lex_error(self.line, self.column, "unterminated block comment");
        }
    }
}

/// Convenience entry point used by the parser/REPL/tests.
pub fn lex(source: &str, diag: &mut Diagnostics) -> Vec<Token> {
    // Stray CR is insignificant outside of indent counting (spec.md §6).
    let normalized = source.replace("\r\n", "\n");
    Lexer::new(&normalized).scan_tokens(diag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut diag = Diagnostics::new();
        lex(src, &mut diag).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn ends_with_single_eof() {
        let mut diag = Diagnostics::new();
        let toks = lex("say 1\n", &mut diag);
        assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(toks.iter().filter(|t| t.kind == TokenKind::Eof).count(), 1);
    }

    #[test]
    fn blank_and_comment_only_lines_emit_nothing() {
        let ks = kinds("\n\n// comment\n\nsay 1\n");
        assert_eq!(
            ks,
            vec![TokenKind::Say, TokenKind::Integer, TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn indent_dedent_balanced_with_implicit_eof_close() {
        let ks = kinds("if true:\n    say 1\n");
        assert_eq!(
            ks,
            vec![
                TokenKind::If,
                TokenKind::True,
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Say,
                TokenKind::Integer,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn multi_level_dedent_emits_multiple_tokens() {
        let ks = kinds("if true:\n    if true:\n        say 1\nsay 2\n");
        let dedents = ks.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(dedents, 2);
    }

    #[test]
    fn range_vs_dot_vs_float() {
        assert_eq!(kinds("1..3")[1], TokenKind::Range);
        assert_eq!(kinds("1.5")[0], TokenKind::Float);
        let ks = kinds("foo.bar");
        assert!(ks.contains(&TokenKind::Dot));
    }

    #[test]
    fn unterminated_string_reports_error() {
        let mut diag = Diagnostics::new();
        lex("\"abc", &mut diag);
        assert!(diag.had_error);
    }

    #[test]
    fn compound_operators_lex() {
        assert_eq!(kinds("x += 1")[1], TokenKind::PlusEqual);
        assert_eq!(kinds("x++")[1], TokenKind::PlusPlus);
        assert_eq!(kinds("x -= 1")[1], TokenKind::MinusEqual);
        assert_eq!(kinds("x--")[1], TokenKind::MinusMinus);
    }
}
