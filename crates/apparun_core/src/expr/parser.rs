use thiserror::Error;

use super::ast::{BinaryOp, Expr, Function};
use super::lexer::{Token, tokenize};

/// Deepest nesting of parentheses, calls and prefix operators accepted
const MAX_DEPTH: usize = 256;

/// Syntax errors in an expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected character `{ch}` at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("invalid number `{text}` at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("function `{name}` takes {expected} arguments, got {found}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("empty expression")]
    Empty,

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Parse expression source text into an unresolved tree
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some((offset, token)) => Err(ParseError::UnexpectedToken {
            found: token.describe(),
            expected: "an operator or end of expression",
            offset: *offset,
        }),
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    /// Current operand nesting
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(usize, Token)> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|(_, token)| token)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn expect(&mut self, wanted: Token, expected: &'static str) -> Result<(), ParseError> {
        match self.next() {
            Some((_, token)) if token == wanted => Ok(()),
            Some((offset, token)) => Err(ParseError::UnexpectedToken {
                found: token.describe(),
                expected,
                offset,
            }),
            None => Err(ParseError::UnexpectedEnd { expected }),
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    // Every operand passes through here, so this bounds the recursion
    fn unary(&mut self) -> Result<Expr, ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep(MAX_DEPTH));
        }
        let expr = match self.peek_token() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.unary().map(|inner| Expr::Neg(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        };
        self.depth -= 1;
        expr
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.atom()?;
        match self.peek_token() {
            Some(Token::Caret | Token::StarStar) => {
                self.pos += 1;
                // Right associative; the exponent may carry its own sign
                let exponent = self.unary()?;
                Ok(Expr::binary(BinaryOp::Pow, base, exponent))
            }
            _ => Ok(base),
        }
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        const EXPECTED: &str = "a number, identifier or `(`";
        match self.next() {
            Some((_, Token::Number(value))) => Ok(Expr::Const(value)),
            Some((_, Token::Ident(name))) => {
                if self.peek_token() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.call(name)
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some((_, Token::LParen)) => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some((offset, token)) => Err(ParseError::UnexpectedToken {
                found: token.describe(),
                expected: EXPECTED,
                offset,
            }),
            None => Err(ParseError::UnexpectedEnd { expected: EXPECTED }),
        }
    }

    /// Parse call arguments after the opening parenthesis
    fn call(&mut self, name: String) -> Result<Expr, ParseError> {
        let function = Function::from_name(&name).ok_or(ParseError::UnknownFunction(name))?;

        let mut args = Vec::new();
        if self.peek_token() == Some(&Token::RParen) {
            self.pos += 1;
        } else {
            loop {
                args.push(self.expr()?);
                match self.next() {
                    Some((_, Token::Comma)) => continue,
                    Some((_, Token::RParen)) => break,
                    Some((offset, token)) => {
                        return Err(ParseError::UnexpectedToken {
                            found: token.describe(),
                            expected: "`,` or `)`",
                            offset,
                        });
                    }
                    None => return Err(ParseError::UnexpectedEnd { expected: "`)`" }),
                }
            }
        }

        if let Some(expected) = function.check_arity(args.len()) {
            return Err(ParseError::Arity {
                name: function.name(),
                expected,
                found: args.len(),
            });
        }
        Ok(Expr::Call(function, args))
    }
}
