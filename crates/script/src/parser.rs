//! Recursive-descent parser building an [`ast::Program`] from tokens (§4.F, §9).
//!
//! Expression precedence, low to high: assignment, ternary, logical or,
//! logical and, equality, comparison, additive, multiplicative, unary,
//! postfix (field/index/method access), primary.

use crate::ast::{BinOp, Expr, Program, Stmt, SwitchArm, UnOp};
use crate::lexer::{tokenize, Token};
use qx_core::{Error, Result};

/// Compiles `source` into a [`Program`].
pub fn parse(source: &str) -> Result<Program> {
    let tokens = tokenize(source)?;
    let is_stmt_mode = tokens.iter().any(|t| {
        matches!(
            t,
            Token::Semi | Token::Def | Token::If | Token::For | Token::While | Token::Do | Token::Switch
        )
    });
    let mut p = Parser { tokens, pos: 0 };
    if is_stmt_mode {
        let stmts = p.parse_stmts_until_eof()?;
        Ok(Program::Stmts(stmts))
    } else {
        let expr = p.parse_expr()?;
        p.expect(Token::Eof)?;
        Ok(Program::Expr(expr))
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn check(&self, t: &Token) -> bool {
        self.peek() == t
    }

    fn matches(&mut self, t: &Token) -> bool {
        if self.check(t) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: Token) -> Result<()> {
        if self.check(&t) {
            self.advance();
            Ok(())
        } else {
            Err(Error::UnsupportedExpression(format!(
                "expected {t:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            other => Err(Error::UnsupportedExpression(format!(
                "expected identifier, found {other:?}"
            ))),
        }
    }

    // ---- statements ----

    fn parse_stmts_until_eof(&mut self) -> Result<Vec<Stmt>> {
        let mut out = Vec::new();
        while !self.check(&Token::Eof) {
            out.push(self.parse_stmt()?);
        }
        Ok(out)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(Token::LBrace)?;
        let mut out = Vec::new();
        while !self.check(&Token::RBrace) {
            out.push(self.parse_stmt()?);
        }
        self.expect(Token::RBrace)?;
        Ok(out)
    }

    /// A block or a single statement (for brace-less `if`/`for`/`while` bodies).
    fn parse_body(&mut self) -> Result<Vec<Stmt>> {
        if self.check(&Token::LBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek().clone() {
            Token::Def => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(Token::Assign)?;
                let value = self.parse_expr()?;
                self.skip_terminator();
                Ok(Stmt::Def(name, value))
            }
            Token::If => {
                self.advance();
                self.expect(Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(Token::RParen)?;
                let then_body = self.parse_body()?;
                let else_body = if self.matches(&Token::Else) {
                    if self.check(&Token::If) {
                        vec![self.parse_stmt()?]
                    } else {
                        self.parse_body()?
                    }
                } else {
                    Vec::new()
                };
                Ok(Stmt::If(cond, then_body, else_body))
            }
            Token::For => {
                self.advance();
                self.expect(Token::LParen)?;
                let init = if self.check(&Token::Semi) {
                    None
                } else {
                    Some(Box::new(self.parse_stmt_no_terminator()?))
                };
                self.expect(Token::Semi)?;
                let cond = if self.check(&Token::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(Token::Semi)?;
                let update = if self.check(&Token::RParen) {
                    None
                } else {
                    Some(self.parse_expr_statement_body()?)
                };
                self.expect(Token::RParen)?;
                let body = self.parse_body()?;
                Ok(Stmt::For(init, cond, update.map(Box::new), body))
            }
            Token::While => {
                self.advance();
                self.expect(Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(Token::RParen)?;
                let body = self.parse_body()?;
                Ok(Stmt::While(cond, body))
            }
            Token::Do => {
                self.advance();
                let body = self.parse_body()?;
                self.expect(Token::While)?;
                self.expect(Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(Token::RParen)?;
                self.skip_terminator();
                Ok(Stmt::DoWhile(body, cond))
            }
            Token::Switch => {
                self.advance();
                self.expect(Token::LParen)?;
                let scrutinee = self.parse_expr()?;
                self.expect(Token::RParen)?;
                self.expect(Token::LBrace)?;
                let mut arms = Vec::new();
                while !self.check(&Token::RBrace) {
                    let value = if self.matches(&Token::Case) {
                        let v = self.parse_expr()?;
                        self.expect(Token::Colon)?;
                        Some(v)
                    } else {
                        self.expect(Token::Default)?;
                        self.expect(Token::Colon)?;
                        None
                    };
                    let mut body = Vec::new();
                    while !matches!(self.peek(), Token::Case | Token::Default | Token::RBrace) {
                        body.push(self.parse_stmt()?);
                    }
                    arms.push(SwitchArm { value, body });
                }
                self.expect(Token::RBrace)?;
                Ok(Stmt::Switch(scrutinee, arms))
            }
            Token::Return => {
                self.advance();
                let value = if matches!(self.peek(), Token::Semi | Token::Eof | Token::RBrace) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.skip_terminator();
                Ok(Stmt::Return(value))
            }
            Token::Break => {
                self.advance();
                self.skip_terminator();
                Ok(Stmt::Break)
            }
            Token::Continue => {
                self.advance();
                self.skip_terminator();
                Ok(Stmt::Continue)
            }
            _ => {
                let stmt = self.parse_stmt_no_terminator()?;
                self.skip_terminator();
                Ok(stmt)
            }
        }
    }

    /// `def x = expr` or a bare expression, without consuming the trailing
    /// separator — used for `for(init; cond; update)` clauses.
    fn parse_stmt_no_terminator(&mut self) -> Result<Stmt> {
        if self.matches(&Token::Def) {
            let name = self.expect_ident()?;
            self.expect(Token::Assign)?;
            let value = self.parse_expr()?;
            Ok(Stmt::Def(name, value))
        } else {
            Ok(Stmt::Expr(self.parse_expr()?))
        }
    }

    fn parse_expr_statement_body(&mut self) -> Result<Expr> {
        self.parse_expr()
    }

    fn skip_terminator(&mut self) {
        while matches!(self.peek(), Token::Semi) {
            self.advance();
        }
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let lhs = self.parse_ternary()?;
        let op = match self.peek() {
            Token::Assign => None,
            Token::PlusEq => Some(BinOp::Add),
            Token::MinusEq => Some(BinOp::Sub),
            Token::StarEq => Some(BinOp::Mul),
            Token::SlashEq => Some(BinOp::Div),
            _ => return Ok(lhs),
        };
        let is_assign = matches!(self.peek(), Token::Assign);
        self.advance();
        let rhs = self.parse_assignment()?;
        Ok(if is_assign {
            Expr::Assign(Box::new(lhs), Box::new(rhs))
        } else {
            Expr::CompoundAssign(op.unwrap(), Box::new(lhs), Box::new(rhs))
        })
    }

    fn parse_ternary(&mut self) -> Result<Expr> {
        let cond = self.parse_or()?;
        if self.matches(&Token::Question) {
            let then_branch = self.parse_ternary()?;
            self.expect(Token::Colon)?;
            let else_branch = self.parse_ternary()?;
            Ok(Expr::Ternary(Box::new(cond), Box::new(then_branch), Box::new(else_branch)))
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.matches(&Token::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.matches(&Token::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.matches(&Token::Minus) {
            return Ok(Expr::Unary(UnOp::Neg, Box::new(self.parse_unary()?)));
        }
        if self.matches(&Token::Not) {
            return Ok(Expr::Unary(UnOp::Not, Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().clone() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_ident()?;
                    if self.check(&Token::LParen) {
                        let args = self.parse_args()?;
                        expr = Expr::MethodCall(Box::new(expr), name, args);
                    } else {
                        expr = Expr::Field(Box::new(expr), name);
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.parse_expr()?);
            while self.matches(&Token::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Null => Ok(Expr::Null),
            Token::Ident(name) => {
                if name == "_score" {
                    return Ok(Expr::Score);
                }
                if self.check(&Token::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::PathCall(vec![name], args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(Error::UnsupportedExpression(format!(
                "unexpected token in expression: {other:?}"
            ))),
        }
    }
}
