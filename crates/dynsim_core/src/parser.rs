//! Recursive-descent parser for the expression grammar.
//!
//! Levels, lowest precedence first:
//!
//! ```text
//! statement      := assignment EOF
//! assignment     := additive ( '=' assignment )?
//! additive       := multiplicative ( ('+' | '-') multiplicative )*
//! multiplicative := power ( ('*' | '/') power )*
//! power          := factor ( '^' factor )*
//! factor         := '-' negated | atom
//! negated        := atom                      (no second '-', no literal 0)
//! atom           := '(' additive ')' | NUMBER | IDENT call-or-marker
//! ```

use crate::error::FormatError;
use crate::expression::{BinaryOp, Constant, Expr, Statement};
use crate::lexer::{tokenize, Token, TokenKind};

/// Parses one statement: a bare expression or a single top-level assignment.
pub fn parse(input: &str) -> Result<Statement, FormatError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(FormatError::new("Empty expression", input.trim()));
    }
    let mut parser = Parser {
        source: input,
        tokens,
        pos: 0,
    };
    let statement = parser.parse_statement()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("Unexpected token"));
    }
    Ok(statement)
}

/// Parses input that must be a bare expression.
pub fn parse_expression(input: &str) -> Result<Expr, FormatError> {
    match parse(input)? {
        Statement::Expression(expr) => Ok(expr),
        Statement::Assignment { .. } => Err(FormatError::new(
            "Expected an expression, found an assignment",
            input.trim(),
        )),
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn consume(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn remaining(&self) -> &'a str {
        match self.tokens.get(self.pos) {
            Some(token) => &self.source[token.offset..],
            None => "",
        }
    }

    fn error(&self, message: &str) -> FormatError {
        if self.pos >= self.tokens.len() {
            FormatError::new(format!("{message}: unexpected end of input"), "")
        } else {
            FormatError::new(message, self.remaining())
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, FormatError> {
        let start = self.pos;
        let target = self.parse_additive()?;
        if let Some(TokenKind::Equals) = self.peek() {
            self.check_target(&target, start)?;
            self.consume();
            let value = self.parse_assignment_value()?;
            return Ok(Statement::Assignment { target, value });
        }
        Ok(Statement::Expression(target))
    }

    /// Chained assignments nest to the right: `a = b = c` gives
    /// `a = Assign(b, c)`.
    fn parse_assignment_value(&mut self) -> Result<Expr, FormatError> {
        let start = self.pos;
        let left = self.parse_additive()?;
        if let Some(TokenKind::Equals) = self.peek() {
            self.check_target(&left, start)?;
            self.consume();
            let right = self.parse_assignment_value()?;
            return Ok(Expr::Assign(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn check_target(&self, target: &Expr, start: usize) -> Result<(), FormatError> {
        let mut inner = target;
        while let Expr::Derivative(next) = inner {
            inner = next;
        }
        if matches!(inner, Expr::Variable(_)) {
            Ok(())
        } else {
            let offset = self.tokens.get(start).map_or(0, |t| t.offset);
            Err(FormatError::new(
                "Assignment target must be a variable",
                &self.source[offset..],
            ))
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, FormatError> {
        let mut left = self.parse_multiplicative()?;
        while let Some(token) = self.peek() {
            let op = match token {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, FormatError> {
        let mut left = self.parse_power()?;
        while let Some(token) = self.peek() {
            let op = match token {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            let right = self.parse_power()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<Expr, FormatError> {
        let mut left = self.parse_factor()?;
        while let Some(TokenKind::Caret) = self.peek() {
            self.consume();
            let right = self.parse_factor()?;
            left = Expr::pow(left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, FormatError> {
        if let Some(TokenKind::Minus) = self.peek() {
            self.consume();
            return self.parse_negated();
        }
        self.parse_atom()
    }

    fn parse_negated(&mut self) -> Result<Expr, FormatError> {
        match self.peek() {
            Some(TokenKind::Minus) => Err(self.error("Non-negated factor expected")),
            Some(TokenKind::Number(value)) => {
                let value = *value;
                if value == 0.0 {
                    return Err(self.error("Negated zero literal is not allowed"));
                }
                self.consume();
                Ok(Expr::Number(-value))
            }
            _ => Ok(Expr::neg(self.parse_atom()?)),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, FormatError> {
        match self.peek() {
            Some(TokenKind::Number(value)) => {
                let value = *value;
                self.consume();
                Ok(Expr::Number(value))
            }
            Some(TokenKind::Identifier(_)) => self.parse_identifier(),
            Some(TokenKind::LParen) => {
                self.consume();
                let expr = self.parse_additive()?;
                self.expect_closing()?;
                Ok(expr)
            }
            _ => Err(self.error("Unexpected token")),
        }
    }

    /// Resolution order: named constant, function call, variable with
    /// optional derivative markers.
    fn parse_identifier(&mut self) -> Result<Expr, FormatError> {
        let name = match self.consume() {
            Some(TokenKind::Identifier(name)) => name,
            _ => return Err(self.error("Identifier expected")),
        };
        if let Some(constant) = Constant::from_name(&name) {
            return Ok(Expr::Constant(constant));
        }
        if let Some(TokenKind::LParen) = self.peek() {
            self.consume();
            let argument = self.parse_additive()?;
            self.expect_closing()?;
            return Ok(Expr::Call(name, Box::new(argument)));
        }
        let mut expr = Expr::Variable(name);
        while let Some(TokenKind::Apostrophe) = self.peek() {
            self.consume();
            expr = Expr::Derivative(Box::new(expr));
        }
        Ok(expr)
    }

    fn expect_closing(&mut self) -> Result<(), FormatError> {
        match self.peek() {
            Some(TokenKind::RParen) => {
                self.consume();
                Ok(())
            }
            _ => Err(self.error("Missing closing parenthesis")),
        }
    }
}
