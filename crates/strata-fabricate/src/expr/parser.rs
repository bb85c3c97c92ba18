use strata_core::Value;

use super::builtins::{Builtin, bind_call};
use super::lexer::{Span, Token, TokenKind};
use super::{BinaryOp, Expr, ParseError, UnaryOp};

/// Recursive-descent parser, one method per precedence level.
pub(crate) struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

/// Argument as written at a call site, before binding.
pub(crate) struct RawArg {
    pub name: Option<String>,
    pub value: Expr,
    pub span: Span,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            input,
            tokens,
            pos: 0,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(self.error_at_end("empty expression"));
        }
        let expr = self.parse_or()?;
        if let Some(token) = self.peek() {
            return Err(ParseError::new(
                self.input,
                token.span,
                format!("unexpected {}", describe(&token.kind)),
            ));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token, ParseError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(ParseError::new(
                self.input,
                token.span,
                format!("expected {}, got {}", describe(&kind), describe(&token.kind)),
            )),
            None => Err(self.error_at_end(format!(
                "expected {}, got end of input",
                describe(&kind)
            ))),
        }
    }

    fn error_at_end(&self, message: impl Into<String>) -> ParseError {
        let end = self.input.len();
        ParseError::new(self.input, Span { start: end, end }, message)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_cmp()?;
        while self.eat(&TokenKind::AndAnd) {
            let rhs = self.parse_cmp()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_add()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::NotEq) => BinaryOp::Ne,
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::Le) => BinaryOp::Le,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::Ge) => BinaryOp::Ge,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_add()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Minus) {
            let inner = self.parse_unary()?;
            return Ok(match inner {
                Expr::Literal(Value::Int(value)) if value != i64::MIN => {
                    Expr::Literal(Value::Int(-value))
                }
                Expr::Literal(Value::Float(value)) => Expr::Literal(Value::Float(-value)),
                other => Expr::Unary(UnaryOp::Neg, Box::new(other)),
            });
        }
        if self.eat(&TokenKind::Bang) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_power()
    }

    // `^` binds tighter than unary minus and is right-associative.
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if self.eat(&TokenKind::Caret) {
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(
                BinaryOp::Pow,
                Box::new(base),
                Box::new(exponent),
            ));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.advance() else {
            return Err(self.error_at_end("unexpected end of input"));
        };
        match &token.kind {
            TokenKind::Int(value) => Ok(Expr::Literal(Value::Int(*value))),
            TokenKind::Float(value) => Ok(Expr::Literal(Value::Float(*value))),
            TokenKind::Str(value) => Ok(Expr::Literal(Value::Text(value.clone()))),
            TokenKind::True => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_or()?);
                        if self.eat(&TokenKind::Comma) {
                            continue;
                        }
                        self.expect(TokenKind::RBracket)?;
                        break;
                    }
                }
                Ok(Expr::Vector(items))
            }
            TokenKind::Ident(name) => {
                if self.peek_kind() == Some(&TokenKind::LParen) {
                    self.pos += 1;
                    self.parse_call(name, token.span)
                } else {
                    Ok(Expr::Ident(name.clone()))
                }
            }
            other => Err(ParseError::new(
                self.input,
                token.span,
                format!("unexpected {}", describe(other)),
            )),
        }
    }

    fn parse_call(&mut self, name: &str, span: Span) -> Result<Expr, ParseError> {
        let builtin = Builtin::lookup(name)
            .ok_or_else(|| ParseError::new(self.input, span, format!("unknown function '{name}'")))?;

        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.parse_arg()?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen)?;
                break;
            }
        }

        bind_call(builtin, args)
            .map(Expr::Call)
            .map_err(|(message, at)| ParseError::new(self.input, at.unwrap_or(span), message))
    }

    fn parse_arg(&mut self) -> Result<RawArg, ParseError> {
        let start = self.peek().map(|token| token.span);
        let named = match (self.peek_kind(), self.tokens.get(self.pos + 1)) {
            (Some(TokenKind::Ident(name)), Some(next)) if next.kind == TokenKind::Assign => {
                Some(name.clone())
            }
            _ => None,
        };
        if named.is_some() {
            self.pos += 2;
        }
        let value = self.parse_or()?;
        Ok(RawArg {
            name: named,
            value,
            span: start.unwrap_or(Span {
                start: self.input.len(),
                end: self.input.len(),
            }),
        })
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Int(value) => format!("number {value}"),
        TokenKind::Float(value) => format!("number {value}"),
        TokenKind::Str(value) => format!("string '{value}'"),
        TokenKind::Ident(name) => format!("identifier '{name}'"),
        TokenKind::True => "'true'".to_string(),
        TokenKind::False => "'false'".to_string(),
        TokenKind::Null => "'null'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Assign => "'='".to_string(),
        TokenKind::Plus => "'+'".to_string(),
        TokenKind::Minus => "'-'".to_string(),
        TokenKind::Star => "'*'".to_string(),
        TokenKind::Slash => "'/'".to_string(),
        TokenKind::Percent => "'%'".to_string(),
        TokenKind::Caret => "'^'".to_string(),
        TokenKind::EqEq => "'=='".to_string(),
        TokenKind::NotEq => "'!='".to_string(),
        TokenKind::Lt => "'<'".to_string(),
        TokenKind::Le => "'<='".to_string(),
        TokenKind::Gt => "'>'".to_string(),
        TokenKind::Ge => "'>='".to_string(),
        TokenKind::AndAnd => "'&&'".to_string(),
        TokenKind::OrOr => "'||'".to_string(),
        TokenKind::Bang => "'!'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_expression;
    use super::*;

    fn ast(source: &str) -> Expr {
        parse_expression(source).expect("parse").ast().clone()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            ast("1 + x * 2"),
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Literal(Value::Int(1))),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Ident("x".to_string())),
                    Box::new(Expr::Literal(Value::Int(2))),
                )),
            )
        );
    }

    #[test]
    fn power_is_right_associative_and_beats_negation() {
        assert_eq!(
            ast("-2 ^ 3 ^ 2"),
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Binary(
                    BinaryOp::Pow,
                    Box::new(Expr::Literal(Value::Int(2))),
                    Box::new(Expr::Binary(
                        BinaryOp::Pow,
                        Box::new(Expr::Literal(Value::Int(3))),
                        Box::new(Expr::Literal(Value::Int(2))),
                    )),
                )),
            )
        );
    }

    #[test]
    fn named_arguments_bind_to_parameters() {
        let Expr::Call(call) = ast("draw_binary(0.5, link = 'logit')") else {
            panic!("expected call");
        };
        assert_eq!(call.builtin, Builtin::DrawBinary);
        assert_eq!(call.args.len(), 3);
        assert_eq!(call.args[0], Some(Expr::Literal(Value::Float(0.5))));
        assert_eq!(call.args[1], None);
        assert_eq!(
            call.args[2],
            Some(Expr::Literal(Value::Text("logit".to_string())))
        );
    }

    #[test]
    fn rejects_unknown_functions_and_arguments() {
        let err = parse_expression("sample_mean(x)").unwrap_err();
        assert!(err.message.contains("unknown function"));

        let err = parse_expression("draw_count(mean = 2, shape = 3)").unwrap_err();
        assert!(err.message.contains("unknown argument 'shape'"));

        let err = parse_expression("if_else(x, 1)").unwrap_err();
        assert!(err.message.contains("missing required argument"));
    }

    #[test]
    fn reports_trailing_tokens() {
        let err = parse_expression("1 2").unwrap_err();
        assert_eq!(err.column, 3);
        assert!(parse_expression("").is_err());
        assert!(parse_expression("(1 + 2").is_err());
    }

    #[test]
    fn collects_references() {
        let compiled = parse_expression("if_else(var1 == 'recent', gdp, gdp * N)").expect("parse");
        assert_eq!(compiled.references(), vec!["N", "gdp", "var1"]);
    }
}
