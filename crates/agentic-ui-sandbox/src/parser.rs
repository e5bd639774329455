//! # Parser
//!
//! Recursive descent over the token stream, producing [`Stmt`]s. The grammar
//! is a small JavaScript subset: declarations, functions and arrows, `if`,
//! `while`, `for`/`for..of`, `try`, and the usual expression operators.
//! There is no `this`, no classes, no regex literals and no templates.
//!
//! Nesting (statements inside statements, operands inside operators) is
//! counted against a depth limit so that hostile input cannot exhaust the
//! host stack.

use std::rc::Rc;

use crate::ast::{
    BinaryOp, DeclKind, Expr, FunctionBody, FunctionDef, LogicalOp, PropKey, Stmt, UnaryOp,
};
use crate::error::{ErrorKind, SandboxError};
use crate::lexer::{Token, TokenKind, lex, unescape};

type PResult<T> = Result<T, SandboxError>;

/// Parses a whole program.
pub fn parse_program(source: &str, max_depth: usize) -> PResult<Vec<Stmt>> {
    let tokens = lex(source)?;
    Parser::new(&tokens, max_depth).program()
}

/// The parser state: the token stream, current position and nesting depth.
pub struct Parser<'t, 'input> {
    tokens: &'t [Token<'input>],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'t, 'input> Parser<'t, 'input> {
    pub fn new(tokens: &'t [Token<'input>], max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    pub fn program(mut self) -> PResult<Vec<Stmt>> {
        let mut body = Vec::new();
        while !self.at_end() {
            body.push(self.statement()?);
        }
        Ok(body)
    }

    /// Current token kind, or `Eof` past the end.
    fn current(&self) -> TokenKind {
        self.nth(0)
    }

    fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes the current token. Callers check `current()` first.
    fn bump(&mut self) -> &'t Token<'input> {
        let tokens = self.tokens;
        let token = &tokens[self.pos];
        self.pos += 1;
        token
    }

    /// Consumes whatever comes next, failing at end of input.
    fn next_token(&mut self) -> PResult<&'t Token<'input>> {
        if self.at_end() {
            return Err(self.unexpected());
        }
        Ok(self.bump())
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<&'t Token<'input>> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected())
        }
    }

    fn ident(&mut self) -> PResult<String> {
        Ok(self.expect(TokenKind::Ident)?.text.to_string())
    }

    fn newline_before(&self) -> bool {
        self.tokens.get(self.pos).is_some_and(|t| t.newline_before)
    }

    fn unexpected(&self) -> SandboxError {
        match self.tokens.get(self.pos) {
            Some(t) => SandboxError::syntax(format!(
                "Unexpected token '{}' at offset {}",
                t.text, t.span.start
            )),
            None => SandboxError::syntax("Unexpected end of input"),
        }
    }

    fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(SandboxError::new(
                ErrorKind::ResourceLimit,
                format!("Maximum nesting depth of {} exceeded", self.max_depth),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// A statement ends at `;`, before `}`, at end of input or at a line break.
    fn end_statement(&mut self) -> PResult<()> {
        if self.eat(TokenKind::Semicolon)
            || self.at(TokenKind::RBrace)
            || self.at_end()
            || self.newline_before()
        {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // Statements

    fn statement(&mut self) -> PResult<Stmt> {
        self.enter()?;
        let stmt = self.statement_inner();
        self.leave();
        stmt
    }

    fn statement_inner(&mut self) -> PResult<Stmt> {
        match self.current() {
            TokenKind::LBrace => Ok(Stmt::Block(self.block()?)),
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let decl = self.declaration()?;
                self.end_statement()?;
                Ok(decl)
            }
            TokenKind::Function if self.nth(1) == TokenKind::Ident => {
                self.bump();
                let name = self.ident()?;
                Ok(Stmt::Function(Rc::new(self.function_rest(Some(name))?)))
            }
            TokenKind::Return => {
                self.bump();
                let value = if self.at(TokenKind::Semicolon)
                    || self.at(TokenKind::RBrace)
                    || self.at_end()
                    || self.newline_before()
                {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.end_statement()?;
                Ok(Stmt::Return(value))
            }
            TokenKind::If => {
                self.bump();
                let test = self.paren_expr()?;
                let then = Box::new(self.statement()?);
                let otherwise = if self.eat(TokenKind::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    test,
                    then,
                    otherwise,
                })
            }
            TokenKind::While => {
                self.bump();
                let test = self.paren_expr()?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While { test, body })
            }
            TokenKind::For => self.for_statement(),
            TokenKind::Break => {
                self.bump();
                self.end_statement()?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.bump();
                self.end_statement()?;
                Ok(Stmt::Continue)
            }
            TokenKind::Throw => {
                self.bump();
                let value = self.expr()?;
                self.end_statement()?;
                Ok(Stmt::Throw(value))
            }
            TokenKind::Try => self.try_statement(),
            TokenKind::Semicolon => {
                self.bump();
                Ok(Stmt::Empty)
            }
            _ => {
                let expr = self.expr()?;
                self.end_statement()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.unexpected());
            }
            body.push(self.statement()?);
        }
        self.bump();
        Ok(body)
    }

    fn decl_kind(&mut self) -> PResult<DeclKind> {
        let kind = match self.current() {
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            TokenKind::Var => DeclKind::Var,
            _ => return Err(self.unexpected()),
        };
        self.bump();
        Ok(kind)
    }

    fn declaration(&mut self) -> PResult<Stmt> {
        let kind = self.decl_kind()?;
        let mut bindings = Vec::new();
        loop {
            let name = self.ident()?;
            let init = if self.eat(TokenKind::Eq) {
                Some(self.assignment()?)
            } else if kind == DeclKind::Const {
                return Err(SandboxError::syntax(format!(
                    "Missing initializer in const declaration '{name}'"
                )));
            } else {
                None
            };
            bindings.push((name, init));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(Stmt::Decl { kind, bindings })
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        let is_decl = matches!(
            self.current(),
            TokenKind::Let | TokenKind::Const | TokenKind::Var
        );
        if is_decl && self.nth(1) == TokenKind::Ident && self.nth(2) == TokenKind::Of {
            let kind = self.decl_kind()?;
            let name = self.ident()?;
            self.expect(TokenKind::Of)?;
            let iterable = self.expr()?;
            self.expect(TokenKind::RParen)?;
            let body = Box::new(self.statement()?);
            return Ok(Stmt::ForOf {
                kind,
                name,
                iterable,
                body,
            });
        }

        let init = if self.at(TokenKind::Semicolon) {
            None
        } else if is_decl {
            Some(Box::new(self.declaration()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expr()?)))
        };
        self.expect(TokenKind::Semicolon)?;
        let test = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expr()?)
        };
        self.expect(TokenKind::Semicolon)?;
        let update = if self.at(TokenKind::RParen) {
            None
        } else {
            Some(self.expr()?)
        };
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> PResult<Stmt> {
        self.expect(TokenKind::Try)?;
        let block = self.block()?;
        let (mut param, mut handler, mut finalizer) = (None, None, None);
        if self.eat(TokenKind::Catch) {
            if self.eat(TokenKind::LParen) {
                param = Some(self.ident()?);
                self.expect(TokenKind::RParen)?;
            }
            handler = Some(self.block()?);
        }
        if self.eat(TokenKind::Finally) {
            finalizer = Some(self.block()?);
        }
        if handler.is_none() && finalizer.is_none() {
            return Err(SandboxError::syntax("Missing catch or finally after try"));
        }
        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    /// Parameter list and block body, after the `function` keyword and name.
    fn function_rest(&mut self, name: Option<String>) -> PResult<FunctionDef> {
        let params = self.params()?;
        let body = FunctionBody::Block(self.block()?);
        Ok(FunctionDef { name, params, body })
    }

    fn params(&mut self) -> PResult<Vec<String>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            params.push(self.ident()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    // Expressions

    pub fn expr(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn paren_expr(&mut self) -> PResult<Expr> {
        self.expect(TokenKind::LParen)?;
        let expr = self.expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(expr)
    }

    fn assignment(&mut self) -> PResult<Expr> {
        if self.at(TokenKind::Ident) && self.nth(1) == TokenKind::Arrow {
            let param = self.ident()?;
            self.bump();
            return self.arrow(vec![param]);
        }
        if self.at(TokenKind::LParen) && self.is_arrow_params() {
            let params = self.params()?;
            self.expect(TokenKind::Arrow)?;
            return self.arrow(params);
        }

        let target = self.conditional()?;
        let op = match self.current() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinaryOp::Add),
            TokenKind::MinusEq => Some(BinaryOp::Sub),
            TokenKind::StarEq => Some(BinaryOp::Mul),
            TokenKind::SlashEq => Some(BinaryOp::Div),
            TokenKind::PercentEq => Some(BinaryOp::Rem),
            _ => return Ok(target),
        };
        if !is_assignable(&target) {
            return Err(SandboxError::syntax("Invalid assignment target"));
        }
        self.bump();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            target: Box::new(target),
            op,
            value: Box::new(value),
        })
    }

    fn arrow(&mut self, params: Vec<String>) -> PResult<Expr> {
        let body = if self.at(TokenKind::LBrace) {
            FunctionBody::Block(self.block()?)
        } else {
            FunctionBody::Expr(self.assignment()?)
        };
        Ok(Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            body,
        })))
    }

    /// At `(`: does the matching `)` precede `=>`?
    fn is_arrow_params(&self) -> bool {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(self.pos) {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.tokens.get(i + 1).map(|t| t.kind) == Some(TokenKind::Arrow);
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn conditional(&mut self) -> PResult<Expr> {
        let test = self.or_expr()?;
        if !self.eat(TokenKind::Question) {
            return Ok(test);
        }
        let then = self.assignment()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.assignment()?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        let mut left = self.and_expr()?;
        loop {
            let op = match self.current() {
                TokenKind::PipePipe => LogicalOp::Or,
                TokenKind::QuestionQuestion => LogicalOp::Nullish,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.and_expr()?;
            left = Expr::Logical(op, Box::new(left), Box::new(right));
        }
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        let mut left = self.binary(0)?;
        while self.eat(TokenKind::AmpAmp) {
            let right = self.binary(0)?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Left-associative binary levels, loosest first: equality,
    /// relational, additive, multiplicative.
    fn binary(&mut self, level: usize) -> PResult<Expr> {
        if level == BINARY_LEVELS.len() {
            return self.exponent();
        }
        let mut left = self.binary(level + 1)?;
        while let Some(op) = binary_op(level, self.current()) {
            self.bump();
            let right = self.binary(level + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn exponent(&mut self) -> PResult<Expr> {
        let base = self.unary()?;
        if self.eat(TokenKind::StarStar) {
            let power = self.exponent()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(power)));
        }
        Ok(base)
    }

    fn unary(&mut self) -> PResult<Expr> {
        self.enter()?;
        let expr = self.unary_inner();
        self.leave();
        expr
    }

    fn unary_inner(&mut self) -> PResult<Expr> {
        let op = match self.current() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Typeof => UnaryOp::Typeof,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let increment = self.bump().kind == TokenKind::PlusPlus;
                let target = self.unary()?;
                if !is_assignable(&target) {
                    return Err(SandboxError::syntax("Invalid update target"));
                }
                return Ok(Expr::Update {
                    target: Box::new(target),
                    increment,
                    prefix: true,
                });
            }
            _ => return self.postfix(),
        };
        self.bump();
        let operand = self.unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let expr = self.call_member()?;
        let increment = match self.current() {
            TokenKind::PlusPlus => true,
            TokenKind::MinusMinus => false,
            _ => return Ok(expr),
        };
        if self.newline_before() || !is_assignable(&expr) {
            return Ok(expr);
        }
        self.bump();
        Ok(Expr::Update {
            target: Box::new(expr),
            increment,
            prefix: false,
        })
    }

    fn call_member(&mut self) -> PResult<Expr> {
        let mut expr = if self.eat(TokenKind::New) {
            let callee = self.member_chain()?;
            let args = if self.at(TokenKind::LParen) {
                self.arguments()?
            } else {
                Vec::new()
            };
            Expr::New {
                callee: Box::new(callee),
                args,
            }
        } else {
            self.primary()?
        };
        loop {
            expr = match self.current() {
                TokenKind::Dot | TokenKind::LBracket => self.member(expr)?,
                TokenKind::LParen => Expr::Call {
                    callee: Box::new(expr),
                    args: self.arguments()?,
                },
                _ => return Ok(expr),
            };
        }
    }

    /// Member accesses without calls, as used after `new`.
    fn member_chain(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        while matches!(self.current(), TokenKind::Dot | TokenKind::LBracket) {
            expr = self.member(expr)?;
        }
        Ok(expr)
    }

    fn member(&mut self, object: Expr) -> PResult<Expr> {
        let property = if self.eat(TokenKind::Dot) {
            if self.current() != TokenKind::Ident && !self.current().is_keyword() {
                return Err(self.unexpected());
            }
            PropKey::Named(self.bump().text.to_string())
        } else {
            self.expect(TokenKind::LBracket)?;
            let key = self.expr()?;
            self.expect(TokenKind::RBracket)?;
            PropKey::Computed(Box::new(key))
        };
        Ok(Expr::Member {
            object: Box::new(object),
            property,
        })
    }

    fn arguments(&mut self) -> PResult<Vec<Expr>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) {
            args.push(self.assignment()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn primary(&mut self) -> PResult<Expr> {
        match self.current() {
            TokenKind::Number => {
                let text = self.bump().text;
                parse_number(text)
                    .map(Expr::Number)
                    .ok_or_else(|| SandboxError::syntax(format!("Invalid number {text}")))
            }
            TokenKind::Str => Ok(Expr::Str(unescape(self.bump().text))),
            TokenKind::True => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            TokenKind::Null => {
                self.bump();
                Ok(Expr::Null)
            }
            TokenKind::Ident => Ok(Expr::Ident(self.bump().text.to_string())),
            TokenKind::LParen => self.paren_expr(),
            TokenKind::LBracket => self.array_literal(),
            TokenKind::LBrace => self.object_literal(),
            TokenKind::Function => {
                self.bump();
                let name = if self.at(TokenKind::Ident) {
                    Some(self.ident()?)
                } else {
                    None
                };
                Ok(Expr::Function(Rc::new(self.function_rest(name)?)))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn array_literal(&mut self) -> PResult<Expr> {
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RBracket) {
            items.push(self.assignment()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::Array(items))
    }

    fn object_literal(&mut self) -> PResult<Expr> {
        self.expect(TokenKind::LBrace)?;
        let mut props = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let kind = self.current();
            if !matches!(kind, TokenKind::Str | TokenKind::Number | TokenKind::Ident)
                && !kind.is_keyword()
            {
                return Err(self.unexpected());
            }
            let token = self.next_token()?;
            let key = match kind {
                TokenKind::Str => unescape(token.text),
                TokenKind::Number => parse_number(token.text)
                    .map(crate::value::number_to_string)
                    .unwrap_or_else(|| token.text.to_string()),
                _ => token.text.to_string(),
            };
            let value = if self.eat(TokenKind::Colon) {
                self.assignment()?
            } else if token.kind == TokenKind::Ident {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected());
            };
            props.push((key, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Object(props))
    }
}

const BINARY_LEVELS: [&[(TokenKind, BinaryOp)]; 4] = [
    &[
        (TokenKind::EqEq, BinaryOp::Eq),
        (TokenKind::NotEq, BinaryOp::NotEq),
        (TokenKind::EqEqEq, BinaryOp::StrictEq),
        (TokenKind::NotEqEq, BinaryOp::StrictNotEq),
    ],
    &[
        (TokenKind::Lt, BinaryOp::Lt),
        (TokenKind::LtEq, BinaryOp::LtEq),
        (TokenKind::Gt, BinaryOp::Gt),
        (TokenKind::GtEq, BinaryOp::GtEq),
    ],
    &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
    &[
        (TokenKind::Star, BinaryOp::Mul),
        (TokenKind::Slash, BinaryOp::Div),
        (TokenKind::Percent, BinaryOp::Rem),
    ],
];

fn binary_op(level: usize, kind: TokenKind) -> Option<BinaryOp> {
    BINARY_LEVELS
        .get(level)?
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, op)| *op)
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(expr, Expr::Ident(_) | Expr::Member { .. })
}

pub fn parse_number(text: &str) -> Option<f64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok().map(|n| n as f64),
        None => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(src: &str) -> Expr {
        match parse_program(src, 100).unwrap().remove(0) {
            Stmt::Expr(e) => e,
            other => panic!("expected expression, got {other:?}"),
        }
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary(
                BinaryOp::Add,
                num(1.0),
                Box::new(Expr::Binary(BinaryOp::Mul, num(2.0), num(3.0)))
            )
        );
    }

    #[test]
    fn exponent_is_right_associative() {
        assert_eq!(
            expr("2 ** 3 ** 2"),
            Expr::Binary(
                BinaryOp::Pow,
                num(2.0),
                Box::new(Expr::Binary(BinaryOp::Pow, num(3.0), num(2.0)))
            )
        );
    }

    #[test]
    fn arrow_functions() {
        assert!(matches!(expr("x => x * 2"), Expr::Function(f) if f.params == ["x"]));
        assert!(matches!(expr("(a, b) => { return a }"), Expr::Function(f) if f.params.len() == 2));
        assert!(matches!(expr("(1 + 2)"), Expr::Binary(..)));
    }

    #[test]
    fn member_call_chain() {
        let e = expr("Math.max(1, 2)");
        let Expr::Call { callee, args } = e else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert_eq!(
            *callee,
            Expr::Member {
                object: Box::new(Expr::Ident("Math".into())),
                property: PropKey::Named("max".into()),
            }
        );
    }

    #[test]
    fn statements_need_separators() {
        assert!(parse_program("a b", 100).is_err());
        assert_eq!(parse_program("a\nb", 100).unwrap().len(), 2);
        assert_eq!(parse_program("a; b;", 100).unwrap().len(), 2);
    }

    #[test]
    fn return_without_value_at_line_end() {
        let program = parse_program("return\n1", 100).unwrap();
        assert_eq!(program[0], Stmt::Return(None));
    }

    #[test]
    fn for_of_and_classic_for() {
        let program = parse_program(
            "for (const x of xs) {}\nfor (let i = 0; i < 3; i++) {}",
            100,
        )
        .unwrap();
        assert!(matches!(program[0], Stmt::ForOf { .. }));
        assert!(matches!(program[1], Stmt::For { .. }));
    }

    #[test]
    fn object_literal_keys() {
        let e = expr("({ a: 1, 'b c': 2, d })");
        let Expr::Object(props) = e else {
            panic!("expected object");
        };
        let keys: Vec<&str> = props.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b c", "d"]);
    }

    #[test]
    fn invalid_assignment_target() {
        assert!(parse_program("1 = 2", 100).is_err());
    }

    #[test]
    fn const_needs_initializer() {
        assert!(parse_program("const x", 100).is_err());
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        let err = parse_program(&deep, 20).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ResourceLimit);
        assert!(parse_program(&deep, 100).is_ok());
    }

    #[test]
    fn try_requires_handler() {
        assert!(parse_program("try {}", 100).is_err());
        assert!(parse_program("try { x } catch (e) { y } finally { z }", 100).is_ok());
    }
}
