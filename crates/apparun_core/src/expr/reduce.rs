use crate::error::NumericError;
use crate::model::{QuantityId, SymbolId};

use super::ast::{BinaryOp, Expr, Function, Reference};

/// Values visible to a reduction
pub trait Scope {
    fn symbol(&self, id: SymbolId) -> Option<f64>;
    fn quantity(&self, id: QuantityId) -> Option<f64>;
}

/// Why an expression could not be reduced to a number
#[derive(Debug, Clone, PartialEq)]
pub enum ReduceError {
    Numeric(NumericError),
    Unresolved(Reference),
}

impl From<NumericError> for ReduceError {
    fn from(err: NumericError) -> Self {
        ReduceError::Numeric(err)
    }
}

#[inline]
fn finite(value: f64, operation: &'static str) -> Result<f64, NumericError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NumericError::NonFinite { operation })
    }
}

/// Apply a binary operator, rejecting results that are not finite
pub fn apply_binary(op: BinaryOp, lhs: f64, rhs: f64) -> Result<f64, NumericError> {
    match op {
        BinaryOp::Add => finite(lhs + rhs, "+"),
        BinaryOp::Sub => finite(lhs - rhs, "-"),
        BinaryOp::Mul => finite(lhs * rhs, "*"),
        BinaryOp::Div => {
            if rhs == 0.0 {
                return Err(NumericError::DivisionByZero);
            }
            finite(lhs / rhs, "/")
        }
        BinaryOp::Pow => power(lhs, rhs),
    }
}

fn power(base: f64, exponent: f64) -> Result<f64, NumericError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(NumericError::DivisionByZero);
    }
    finite(base.powf(exponent), "^")
}

fn ln(value: f64) -> Result<f64, NumericError> {
    if value <= 0.0 {
        return Err(NumericError::LogOfNonPositive { value });
    }
    Ok(value.ln())
}

/// Apply an elementary function to already reduced arguments.
///
/// Argument counts are validated by the parser.
pub fn apply_function(function: Function, args: &[f64]) -> Result<f64, NumericError> {
    let first = args.first().copied().unwrap_or(f64::NAN);
    match function {
        Function::Exp => finite(first.exp(), "exp"),
        Function::Ln => ln(first),
        Function::Log => match args.get(1) {
            None => ln(first),
            Some(&base) => {
                let denominator = ln(base)?;
                if denominator == 0.0 {
                    return Err(NumericError::DivisionByZero);
                }
                finite(ln(first)? / denominator, "log")
            }
        },
        Function::Log10 => {
            if first <= 0.0 {
                return Err(NumericError::LogOfNonPositive { value: first });
            }
            Ok(first.log10())
        }
        Function::Sqrt => {
            if first < 0.0 {
                return Err(NumericError::SqrtOfNegative { value: first });
            }
            Ok(first.sqrt())
        }
        Function::Abs => Ok(first.abs()),
        Function::Floor => Ok(first.floor()),
        Function::Ceil => Ok(first.ceil()),
        Function::Pow => power(first, args.get(1).copied().unwrap_or(f64::NAN)),
        // Left-to-right fold keeps the result independent of argument storage
        Function::Min => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        Function::Max => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
    }
}

impl Expr {
    /// Reduce to a single number using the values in `scope`.
    pub fn reduce<S: Scope + ?Sized>(&self, scope: &S) -> Result<f64, ReduceError> {
        match self {
            Expr::Const(value) => Ok(*value),
            Expr::Symbol(id) => scope
                .symbol(*id)
                .ok_or(ReduceError::Unresolved(Reference::Symbol(*id))),
            Expr::Quantity(id) => scope
                .quantity(*id)
                .ok_or(ReduceError::Unresolved(Reference::Quantity(*id))),
            Expr::Name(name) => Err(ReduceError::Unresolved(Reference::Name(name.clone()))),
            Expr::Neg(inner) => Ok(-inner.reduce(scope)?),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = lhs.reduce(scope)?;
                let rhs = rhs.reduce(scope)?;
                Ok(apply_binary(*op, lhs, rhs)?)
            }
            Expr::Call(function, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.reduce(scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(apply_function(*function, &values)?)
            }
        }
    }

    /// Replace every symbol `values` knows with its number and fold constant
    /// sub-expressions. Quantity references and unknown symbols stay symbolic.
    pub fn substitute<F>(&self, values: &F) -> Result<Expr, NumericError>
    where
        F: Fn(SymbolId) -> Option<f64>,
    {
        Ok(match self {
            Expr::Symbol(id) => match values(*id) {
                Some(value) => Expr::Const(value),
                None => Expr::Symbol(*id),
            },
            Expr::Const(_) | Expr::Quantity(_) | Expr::Name(_) => self.clone(),
            Expr::Neg(inner) => match inner.substitute(values)? {
                Expr::Const(value) => Expr::Const(-value),
                other => Expr::Neg(Box::new(other)),
            },
            Expr::Binary(op, lhs, rhs) => {
                let lhs = lhs.substitute(values)?;
                let rhs = rhs.substitute(values)?;
                match (lhs.as_const(), rhs.as_const()) {
                    (Some(a), Some(b)) => Expr::Const(apply_binary(*op, a, b)?),
                    _ => Expr::binary(*op, lhs, rhs),
                }
            }
            Expr::Call(function, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.substitute(values))
                    .collect::<Result<Vec<_>, _>>()?;
                let constants: Option<Vec<f64>> = args.iter().map(Expr::as_const).collect();
                match constants {
                    Some(constants) => Expr::Const(apply_function(*function, &constants)?),
                    None => Expr::Call(*function, args),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;

    struct Values {
        symbols: Vec<f64>,
        quantities: Vec<Option<f64>>,
    }

    impl Scope for Values {
        fn symbol(&self, id: SymbolId) -> Option<f64> {
            self.symbols.get(id.index()).copied()
        }

        fn quantity(&self, id: QuantityId) -> Option<f64> {
            self.quantities.get(id.index()).copied().flatten()
        }
    }

    /// Parse and bind `x` -> symbol 0, `y` -> symbol 1, `q` -> quantity 0
    fn bound(source: &str) -> Expr {
        parse(source)
            .unwrap()
            .resolve(&|name: &str| match name {
                "x" => Some(Reference::Symbol(SymbolId(0))),
                "y" => Some(Reference::Symbol(SymbolId(1))),
                "q" => Some(Reference::Quantity(QuantityId(0))),
                _ => None,
            })
            .unwrap()
    }

    fn eval(source: &str, x: f64, y: f64) -> Result<f64, ReduceError> {
        bound(source).reduce(&Values {
            symbols: vec![x, y],
            quantities: vec![Some(100.0)],
        })
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("x * 3", 2.0, 0.0), Ok(6.0));
        assert_eq!(eval("x + y * 2 - 1", 1.0, 4.0), Ok(8.0));
        assert_eq!(eval("-x ^ 2", 3.0, 0.0), Ok(-9.0));
        assert_eq!(eval("2 ** -1", 0.0, 0.0), Ok(0.5));
        assert_eq!(eval("q / x", 4.0, 0.0), Ok(25.0));
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("max(x, y, 1)", -2.0, 0.5), Ok(1.0));
        assert_eq!(eval("min(x, y)", -2.0, 0.5), Ok(-2.0));
        assert_eq!(eval("sqrt(x)", 16.0, 0.0), Ok(4.0));
        assert_eq!(eval("abs(x) + floor(y) + ceil(y)", -1.5, 2.5), Ok(1.5 + 2.0 + 3.0));
        assert_eq!(eval("pow(x, y)", 2.0, 3.0), Ok(8.0));
        let ln = eval("ln(exp(x))", 1.0, 0.0).unwrap();
        assert!((ln - 1.0).abs() < 1e-12);
        let log = eval("log(x, 10)", 1000.0, 0.0).unwrap();
        assert!((log - 3.0).abs() < 1e-12);
        let log10 = eval("log10(x)", 100.0, 0.0).unwrap();
        assert!((log10 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            eval("10 / x", 0.0, 0.0),
            Err(ReduceError::Numeric(NumericError::DivisionByZero))
        );
        assert_eq!(
            eval("x ^ -1", 0.0, 0.0),
            Err(ReduceError::Numeric(NumericError::DivisionByZero))
        );
        assert_eq!(
            eval("log(x, 1)", 5.0, 0.0),
            Err(ReduceError::Numeric(NumericError::DivisionByZero))
        );
    }

    #[test]
    fn test_numeric_domain_errors() {
        assert_eq!(
            eval("log(x)", 0.0, 0.0),
            Err(ReduceError::Numeric(NumericError::LogOfNonPositive { value: 0.0 }))
        );
        assert_eq!(
            eval("sqrt(x)", -4.0, 0.0),
            Err(ReduceError::Numeric(NumericError::SqrtOfNegative { value: -4.0 }))
        );
        assert_eq!(
            eval("x ^ 0.5", -8.0, 0.0),
            Err(ReduceError::Numeric(NumericError::NonFinite { operation: "^" }))
        );
        assert_eq!(
            eval("exp(x)", 1000.0, 0.0),
            Err(ReduceError::Numeric(NumericError::NonFinite { operation: "exp" }))
        );
        assert_eq!(
            eval("x * y", 1e300, 1e300),
            Err(ReduceError::Numeric(NumericError::NonFinite { operation: "*" }))
        );
    }

    #[test]
    fn test_missing_quantity_is_unresolved() {
        let expr = bound("q + 1");
        let scope = Values {
            symbols: vec![],
            quantities: vec![None],
        };
        assert_eq!(
            expr.reduce(&scope),
            Err(ReduceError::Unresolved(Reference::Quantity(QuantityId(0))))
        );
        assert_eq!(
            parse("z").unwrap().reduce(&scope),
            Err(ReduceError::Unresolved(Reference::Name("z".to_string())))
        );
    }

    #[test]
    fn test_substitute_folds_constants_and_keeps_quantities() {
        let expr = bound("x * 3 + q * y");
        let substituted = expr
            .substitute(&|id: SymbolId| [2.0, 5.0].get(id.index()).copied())
            .unwrap();
        assert_eq!(
            substituted,
            Expr::binary(
                BinaryOp::Add,
                Expr::Const(6.0),
                Expr::binary(BinaryOp::Mul, Expr::Quantity(QuantityId(0)), Expr::Const(5.0))
            )
        );
    }

    #[test]
    fn test_substitute_reports_folded_division_by_zero() {
        let expr = bound("10 / x + q");
        assert_eq!(
            expr.substitute(&|_| Some(0.0)),
            Err(NumericError::DivisionByZero)
        );
    }

    #[test]
    fn test_substitute_leaves_unknown_symbols() {
        let expr = bound("x + y");
        let substituted = expr
            .substitute(&|id: SymbolId| (id.index() == 0).then_some(1.0))
            .unwrap();
        assert_eq!(
            substituted,
            Expr::binary(BinaryOp::Add, Expr::Const(1.0), Expr::Symbol(SymbolId(1)))
        );
    }
}
