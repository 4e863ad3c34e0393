use std::fmt;

use crate::model::{QuantityId, SymbolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 4,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// Elementary functions callable from expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Exp,
    /// Natural log with one argument, `log(x, base)` with two
    Log,
    Ln,
    Log10,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Pow,
    Min,
    Max,
}

impl Function {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "exp" => Function::Exp,
            "log" => Function::Log,
            "ln" => Function::Ln,
            "log10" => Function::Log10,
            "sqrt" => Function::Sqrt,
            "abs" => Function::Abs,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "pow" => Function::Pow,
            "min" => Function::Min,
            "max" => Function::Max,
            _ => return None,
        };
        Some(function)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Ln => "ln",
            Function::Log10 => "log10",
            Function::Sqrt => "sqrt",
            Function::Abs => "abs",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Pow => "pow",
            Function::Min => "min",
            Function::Max => "max",
        }
    }

    /// Human readable arity, or `None` when `count` arguments are accepted
    pub(crate) fn check_arity(self, count: usize) -> Option<&'static str> {
        let (ok, expected) = match self {
            Function::Log => ((1..=2).contains(&count), "1 or 2"),
            Function::Pow => (count == 2, "2"),
            Function::Min | Function::Max => (count >= 1, "at least 1"),
            _ => (count == 1, "1"),
        };
        if ok { None } else { Some(expected) }
    }
}

/// A symbolic reference an expression could not reduce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Symbol(SymbolId),
    Quantity(QuantityId),
    Name(String),
}

/// A node of the expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    /// Numeric parameter symbol
    Symbol(SymbolId),
    /// Another named quantity
    Quantity(QuantityId),
    /// Identifier not yet bound to a symbol or quantity
    Name(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    #[must_use]
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Bind every [`Expr::Name`] through `lookup`.
    ///
    /// Returns the first name `lookup` does not know.
    pub fn resolve<F>(self, lookup: &F) -> Result<Expr, String>
    where
        F: Fn(&str) -> Option<Reference>,
    {
        Ok(match self {
            Expr::Name(name) => match lookup(&name) {
                Some(Reference::Symbol(id)) => Expr::Symbol(id),
                Some(Reference::Quantity(id)) => Expr::Quantity(id),
                Some(Reference::Name(_)) | None => return Err(name),
            },
            Expr::Neg(inner) => Expr::Neg(Box::new(inner.resolve(lookup)?)),
            Expr::Binary(op, lhs, rhs) => {
                Expr::binary(op, lhs.resolve(lookup)?, rhs.resolve(lookup)?)
            }
            Expr::Call(function, args) => Expr::Call(
                function,
                args.into_iter()
                    .map(|arg| arg.resolve(lookup))
                    .collect::<Result<_, _>>()?,
            ),
            leaf => leaf,
        })
    }

    /// Append every quantity this expression references, in tree order
    pub fn quantity_refs(&self, out: &mut Vec<QuantityId>) {
        match self {
            Expr::Quantity(id) => out.push(*id),
            Expr::Neg(inner) => inner.quantity_refs(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.quantity_refs(out);
                rhs.quantity_refs(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|arg| arg.quantity_refs(out)),
            Expr::Const(_) | Expr::Symbol(_) | Expr::Name(_) => {}
        }
    }

    /// Whether the expression is a single constant
    #[must_use]
    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(value) => Some(*value),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary(op, ..) => op.precedence(),
            Expr::Neg(_) => 3,
            Expr::Const(value) if value.is_sign_negative() => 3,
            _ => 5,
        }
    }

    /// Render back to source text, using `names` for bound references
    #[must_use]
    pub fn display<'a>(&'a self, names: &'a ExprNames<'a>) -> impl fmt::Display + 'a {
        Rendered { expr: self, names }
    }
}

/// Names used to render bound references
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprNames<'a> {
    pub symbols: &'a [String],
    pub quantities: &'a [String],
}

struct Rendered<'a> {
    expr: &'a Expr,
    names: &'a ExprNames<'a>,
}

impl Rendered<'_> {
    fn child<'b>(&'b self, expr: &'b Expr) -> Rendered<'b> {
        Rendered {
            expr,
            names: self.names,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, operand: &Expr, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({})", self.child(operand))
        } else {
            write!(f, "{}", self.child(operand))
        }
    }
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            Expr::Const(value) => write!(f, "{value}"),
            Expr::Symbol(id) => match self.names.symbols.get(id.index()) {
                Some(name) => f.write_str(name),
                None => write!(f, "$s{}", id.0),
            },
            Expr::Quantity(id) => match self.names.quantities.get(id.index()) {
                Some(name) => f.write_str(name),
                None => write!(f, "$q{}", id.0),
            },
            Expr::Name(name) => f.write_str(name),
            Expr::Neg(inner) => {
                f.write_str("-")?;
                self.write_operand(f, inner, inner.precedence() < 3)
            }
            Expr::Binary(op, lhs, rhs) => {
                let prec = op.precedence();
                // Power is right associative, everything else left associative
                let (lhs_parens, rhs_parens) = if *op == BinaryOp::Pow {
                    (lhs.precedence() <= prec, rhs.precedence() < prec)
                } else {
                    (lhs.precedence() < prec, rhs.precedence() <= prec)
                };
                self.write_operand(f, lhs, lhs_parens)?;
                write!(f, " {} ", op.symbol())?;
                self.write_operand(f, rhs, rhs_parens)
            }
            Expr::Call(function, args) => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.child(arg))?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;

    fn render(source: &str) -> String {
        let names = ExprNames::default();
        parse(source).unwrap().display(&names).to_string()
    }

    #[test]
    fn test_render_minimal_parentheses() {
        assert_eq!(render("a + b * c"), "a + b * c");
        assert_eq!(render("(a + b) * c"), "(a + b) * c");
        assert_eq!(render("a - (b - c)"), "a - (b - c)");
        assert_eq!(render("a - b - c"), "a - b - c");
        assert_eq!(render("a ^ b ^ c"), "a ^ b ^ c");
        assert_eq!(render("(a ^ b) ^ c"), "(a ^ b) ^ c");
        assert_eq!(render("-(a + b)"), "-(a + b)");
        assert_eq!(render("max(a, 2.5) / 4"), "max(a, 2.5) / 4");
    }

    #[test]
    fn test_rendered_source_reparses_to_same_tree() {
        let sources = ["x * 3 + y / (z - 1)", "-x ^ 2", "log(a, 10) * exp(-b)", "2 ** -1"];
        for source in sources {
            let expr = parse(source).unwrap();
            let names = ExprNames::default();
            let rendered = expr.display(&names).to_string();
            assert_eq!(parse(&rendered).unwrap(), expr, "source {source} -> {rendered}");
        }
    }

    #[test]
    fn test_resolve_reports_first_unknown_name() {
        let expr = parse("a + b * c").unwrap();
        let lookup = |name: &str| match name {
            "a" => Some(Reference::Symbol(SymbolId(0))),
            "c" => Some(Reference::Quantity(QuantityId(0))),
            _ => None,
        };
        assert_eq!(expr.resolve(&lookup), Err("b".to_string()));
    }

    #[test]
    fn test_quantity_refs_in_tree_order() {
        let expr = Expr::binary(
            BinaryOp::Add,
            Expr::Quantity(QuantityId(2)),
            Expr::Call(
                Function::Max,
                vec![Expr::Quantity(QuantityId(0)), Expr::Symbol(SymbolId(1))],
            ),
        );
        let mut refs = Vec::new();
        expr.quantity_refs(&mut refs);
        assert_eq!(refs, vec![QuantityId(2), QuantityId(0)]);
    }
}
