//! Symbolic differentiation and numeric evaluation of expression trees

use std::collections::BTreeSet;

use num_complex::Complex64;
use thiserror::Error;

use crate::core::expr::{BinaryOp, Expr, Function, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("No value for variable '{0}'")]
    UnboundVariable(String),

    #[error("Unsupported function '{0}'")]
    UnsupportedFunction(String),
}

/// Complex infinity, the result of dividing a non-zero value by zero
pub fn complex_infinity() -> Complex64 {
    Complex64::new(f64::INFINITY, f64::INFINITY)
}

// ============================================================================
// Differentiation
// ============================================================================

/// Partial derivative of `expr` with respect to `wrt`
pub fn derivative(expr: &Expr, wrt: &str) -> Result<Expr, EvalError> {
    if !expr.contains_variable(wrt) {
        return Ok(Expr::lit(0.0));
    }

    Ok(match expr {
        Expr::Literal(_) => Expr::lit(0.0),
        Expr::Variable(name) => Expr::lit(if name == wrt { 1.0 } else { 0.0 }),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => Expr::neg(derivative(operand, wrt)?),
        Expr::Binary { op, lhs, rhs } => {
            let a = lhs.as_ref();
            let b = rhs.as_ref();
            let da = derivative(a, wrt)?;
            let db = derivative(b, wrt)?;
            match op {
                BinaryOp::Add => Expr::add(da, db),
                BinaryOp::Sub => Expr::sub(da, db),
                BinaryOp::Mul => Expr::add(Expr::mul(da, b.clone()), Expr::mul(a.clone(), db)),
                BinaryOp::Div => Expr::div(
                    Expr::sub(Expr::mul(da, b.clone()), Expr::mul(a.clone(), db)),
                    Expr::pow(b.clone(), Expr::lit(2.0)),
                ),
                BinaryOp::Pow => power_derivative(a, b, da, db, wrt),
            }
        }
        Expr::Call { func, args } => {
            let [arg] = args.as_slice() else {
                return Err(EvalError::UnsupportedFunction(func.name().to_string()));
            };
            let outer = function_derivative(func, arg)?;
            Expr::mul(outer, derivative(arg, wrt)?)
        }
    })
}

fn power_derivative(base: &Expr, exponent: &Expr, da: Expr, db: Expr, wrt: &str) -> Expr {
    if !exponent.contains_variable(wrt) {
        // b * a^(b-1) * a'
        let reduced = Expr::sub(exponent.clone(), Expr::lit(1.0));
        return Expr::mul(
            Expr::mul(exponent.clone(), Expr::pow(base.clone(), reduced)),
            da,
        );
    }
    let ln_base = Expr::call(Function::Ln, base.clone());
    let whole = Expr::pow(base.clone(), exponent.clone());
    if !base.contains_variable(wrt) {
        // a^b * ln(a) * b'
        return Expr::mul(Expr::mul(whole, ln_base), db);
    }
    // a^b * (b' ln(a) + b a' / a)
    Expr::mul(
        whole,
        Expr::add(
            Expr::mul(db, ln_base),
            Expr::div(Expr::mul(exponent.clone(), da), base.clone()),
        ),
    )
}

/// f'(a) for a single-argument function
fn function_derivative(func: &Function, a: &Expr) -> Result<Expr, EvalError> {
    let one = || Expr::lit(1.0);
    let square = |e: Expr| Expr::pow(e, Expr::lit(2.0));
    let a = a.clone();

    Ok(match func {
        Function::Sin => Expr::call(Function::Cos, a),
        Function::Cos => Expr::neg(Expr::call(Function::Sin, a)),
        Function::Tan => Expr::add(square(Expr::call(Function::Tan, a)), one()),
        Function::Asin => Expr::div(
            one(),
            Expr::call(Function::Sqrt, Expr::sub(one(), square(a))),
        ),
        Function::Acos => Expr::neg(Expr::div(
            one(),
            Expr::call(Function::Sqrt, Expr::sub(one(), square(a))),
        )),
        Function::Atan => Expr::div(one(), Expr::add(square(a), one())),
        Function::Sinh => Expr::call(Function::Cosh, a),
        Function::Cosh => Expr::call(Function::Sinh, a),
        Function::Tanh => Expr::sub(one(), square(Expr::call(Function::Tanh, a))),
        Function::Exp => Expr::call(Function::Exp, a),
        Function::Ln => Expr::div(one(), a),
        Function::Sqrt => Expr::div(
            one(),
            Expr::mul(Expr::lit(2.0), Expr::call(Function::Sqrt, a)),
        ),
        Function::Abs => Expr::div(a.clone(), Expr::call(Function::Abs, a)),
        Function::Other(name) => return Err(EvalError::UnsupportedFunction(name.clone())),
    })
}

// ============================================================================
// Complex evaluation
// ============================================================================

/// Evaluate in complex arithmetic so invalid real operations stay visible
///
/// Real inputs stay real wherever the real result exists. A negative base
/// with a fractional exponent, `sqrt` of a negative value and similar cases
/// produce a complex value; division of a non-zero value by zero produces
/// [`complex_infinity`].
pub fn evaluate_complex(
    expr: &Expr,
    lookup: &impl Fn(&str) -> Option<f64>,
) -> Result<Complex64, EvalError> {
    Ok(match expr {
        Expr::Literal(v) => Complex64::new(*v, 0.0),
        Expr::Variable(name) => {
            let v = lookup(name).ok_or_else(|| EvalError::UnboundVariable(name.clone()))?;
            Complex64::new(v, 0.0)
        }
        Expr::Unary { operand, .. } => -evaluate_complex(operand, lookup)?,
        Expr::Binary { op, lhs, rhs } => {
            let a = evaluate_complex(lhs, lookup)?;
            let b = evaluate_complex(rhs, lookup)?;
            match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => complex_div(a, b),
                BinaryOp::Pow => complex_pow(a, b),
            }
        }
        Expr::Call { func, args } => {
            let [arg] = args.as_slice() else {
                return Err(EvalError::UnsupportedFunction(func.name().to_string()));
            };
            let z = evaluate_complex(arg, lookup)?;
            complex_function(func, z)?
        }
    })
}

fn is_zero(z: Complex64) -> bool {
    z.re == 0.0 && z.im == 0.0
}

fn complex_div(a: Complex64, b: Complex64) -> Complex64 {
    if is_zero(b) {
        if is_zero(a) {
            Complex64::new(f64::NAN, 0.0)
        } else {
            complex_infinity()
        }
    } else if b.im == 0.0 {
        Complex64::new(a.re / b.re, a.im / b.re)
    } else {
        a / b
    }
}

fn complex_pow(base: Complex64, exponent: Complex64) -> Complex64 {
    if base.im == 0.0 && exponent.im == 0.0 {
        let (x, y) = (base.re, exponent.re);
        if x == 0.0 && y < 0.0 {
            return complex_infinity();
        }
        if x >= 0.0 || y.fract() == 0.0 {
            return Complex64::new(x.powf(y), 0.0);
        }
    }
    if is_zero(base) {
        return if exponent.re > 0.0 {
            Complex64::new(0.0, 0.0)
        } else {
            complex_infinity()
        };
    }
    base.powc(exponent)
}

fn complex_function(func: &Function, z: Complex64) -> Result<Complex64, EvalError> {
    if z.im == 0.0 {
        if let Some(v) = real_function(func, z.re) {
            return Ok(Complex64::new(v, 0.0));
        }
    }
    Ok(match func {
        Function::Sin => z.sin(),
        Function::Cos => z.cos(),
        Function::Tan => z.tan(),
        Function::Asin => z.asin(),
        Function::Acos => z.acos(),
        Function::Atan => z.atan(),
        Function::Sinh => z.sinh(),
        Function::Cosh => z.cosh(),
        Function::Tanh => z.tanh(),
        Function::Exp => z.exp(),
        Function::Ln if is_zero(z) => complex_infinity(),
        Function::Ln => z.ln(),
        Function::Sqrt => z.sqrt(),
        Function::Abs => Complex64::new(z.norm(), 0.0),
        Function::Other(name) => return Err(EvalError::UnsupportedFunction(name.clone())),
    })
}

/// Real-valued function, `None` outside its real domain
fn real_function(func: &Function, x: f64) -> Option<f64> {
    Some(match func {
        Function::Sin => x.sin(),
        Function::Cos => x.cos(),
        Function::Tan => x.tan(),
        Function::Asin if x.abs() <= 1.0 => x.asin(),
        Function::Acos if x.abs() <= 1.0 => x.acos(),
        Function::Atan => x.atan(),
        Function::Sinh => x.sinh(),
        Function::Cosh => x.cosh(),
        Function::Tanh => x.tanh(),
        Function::Exp => x.exp(),
        Function::Ln if x > 0.0 => x.ln(),
        Function::Sqrt if x >= 0.0 => x.sqrt(),
        Function::Abs => x.abs(),
        _ => return None,
    })
}

// ============================================================================
// Real evaluation
// ============================================================================

/// Plain `f64` evaluation; invalid operations yield NaN or infinity
pub fn evaluate_real(expr: &Expr, lookup: &impl Fn(&str) -> Option<f64>) -> Result<f64, EvalError> {
    Ok(match expr {
        Expr::Literal(v) => *v,
        Expr::Variable(name) => {
            lookup(name).ok_or_else(|| EvalError::UnboundVariable(name.clone()))?
        }
        Expr::Unary { operand, .. } => -evaluate_real(operand, lookup)?,
        Expr::Binary { op, lhs, rhs } => {
            let a = evaluate_real(lhs, lookup)?;
            let b = evaluate_real(rhs, lookup)?;
            match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Pow => a.powf(b),
            }
        }
        Expr::Call { func, args } => {
            let [arg] = args.as_slice() else {
                return Err(EvalError::UnsupportedFunction(func.name().to_string()));
            };
            let x = evaluate_real(arg, lookup)?;
            match func {
                Function::Other(name) => {
                    return Err(EvalError::UnsupportedFunction(name.clone()))
                }
                known => real_function(known, x).unwrap_or(f64::NAN),
            }
        }
    })
}

// ============================================================================
// Denominator analysis
// ============================================================================

/// Variables that end up in the denominator once the expression is brought
/// over a common denominator, in first-seen order
pub fn denominator_variables(expr: &Expr) -> Vec<String> {
    let (_, denominator) = split_fraction(expr);
    expr.variables()
        .into_iter()
        .filter(|v| denominator.contains(v))
        .collect()
}

/// (numerator variables, denominator variables)
fn split_fraction(expr: &Expr) -> (BTreeSet<String>, BTreeSet<String>) {
    match expr {
        Expr::Literal(_) => (BTreeSet::new(), BTreeSet::new()),
        Expr::Variable(name) => (BTreeSet::from([name.clone()]), BTreeSet::new()),
        Expr::Unary { operand, .. } => split_fraction(operand),
        Expr::Binary { op, lhs, rhs } => {
            let (na, da) = split_fraction(lhs);
            let (nb, db) = split_fraction(rhs);
            match op {
                BinaryOp::Add | BinaryOp::Sub => {
                    // n_a d_b ± n_b d_a over d_a d_b
                    let denominator: BTreeSet<String> = da.union(&db).cloned().collect();
                    let numerator = na
                        .union(&nb)
                        .cloned()
                        .chain(denominator.iter().cloned())
                        .collect();
                    (numerator, denominator)
                }
                BinaryOp::Mul => (
                    na.union(&nb).cloned().collect(),
                    da.union(&db).cloned().collect(),
                ),
                BinaryOp::Div => (
                    na.union(&db).cloned().collect(),
                    da.union(&nb).cloned().collect(),
                ),
                BinaryOp::Pow => match rhs.constant_rational() {
                    Some(p) if p < num_rational::Rational64::from_integer(0) => (da, na),
                    Some(_) => (na, da),
                    None => {
                        let mut all: BTreeSet<String> = expr.variables().into_iter().collect();
                        all.extend(da);
                        (all, BTreeSet::new())
                    }
                },
            }
        }
        Expr::Call { .. } => (expr.variables().into_iter().collect(), BTreeSet::new()),
    }
}
