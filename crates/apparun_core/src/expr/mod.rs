//! Symbolic expressions over parameter symbols and quantity references.
//!
//! Expressions are parsed from infix source text into a small closed AST
//! ([`Expr`]). Identifiers are kept as unresolved names until the model loader
//! binds them to parameter symbols or quantities with [`Expr::resolve`].
//!
//! Reduction ([`Expr::reduce`]) is a recursive walk in double precision. The
//! only simplification performed is constant folding during
//! [`Expr::substitute`].
//!
//! # Syntax
//!
//! ```text
//! expr   := term (("+" | "-") term)*
//! term   := unary (("*" | "/") unary)*
//! unary  := ("-" | "+") unary | power
//! power  := atom (("^" | "**") unary)?
//! atom   := number | ident | ident "(" expr ("," expr)* ")" | "(" expr ")"
//! ```

mod ast;
mod lexer;
mod parser;
mod reduce;

pub use ast::{BinaryOp, Expr, ExprNames, Function, Reference};
pub use lexer::{Token, tokenize};
pub use parser::{ParseError, parse};
pub use reduce::{ReduceError, Scope, apply_binary, apply_function};
