//! Symbolic differentiation over the expression tree.
//!
//! Every rule builds fresh nodes from clones of its inputs. Results are not
//! simplified: `d/dx (x + 3)` is `1 + 0`.

use crate::error::DerivationError;
use crate::expression::{BinaryOp, Expr, Function};

/// Derivative of `expr` with respect to `variable`.
pub fn derivative(expr: &Expr, variable: &str) -> Result<Expr, DerivationError> {
    match expr {
        Expr::Number(_) | Expr::Constant(_) => Ok(Expr::number(0.0)),
        Expr::Variable(name) => Ok(Expr::number(if name == variable { 1.0 } else { 0.0 })),
        Expr::Neg(inner) => Ok(Expr::neg(derivative(inner, variable)?)),
        Expr::Binary(op, left, right) => binary_derivative(*op, left, right, variable),
        Expr::Call(name, argument) => {
            let function = Function::from_name(name)
                .ok_or_else(|| DerivationError::UnsupportedFunction(name.clone()))?;
            Ok(Expr::mul(
                outer_derivative(function, argument),
                derivative(argument, variable)?,
            ))
        }
        Expr::Derivative(inner) => Err(DerivationError::DerivativeMarker(inner.to_string())),
        Expr::Assign(..) => Err(DerivationError::Assignment),
    }
}

/// True when `expr` cannot change with `variable`: literals and constants
/// trivially, anything else when the variable does not occur in it.
pub fn is_independent_of(expr: &Expr, variable: &str) -> bool {
    match expr {
        Expr::Number(_) | Expr::Constant(_) => true,
        _ => !expr.contains_variable(variable),
    }
}

/// Rewrites every `v'` marker into an explicit derivative of `v` with respect
/// to `variable`, innermost marker first.
pub fn expand_derivative_markers(expr: &Expr, variable: &str) -> Result<Expr, DerivationError> {
    match expr {
        Expr::Number(_) | Expr::Constant(_) | Expr::Variable(_) => Ok(expr.clone()),
        Expr::Neg(inner) => Ok(Expr::neg(expand_derivative_markers(inner, variable)?)),
        Expr::Binary(op, left, right) => Ok(Expr::binary(
            *op,
            expand_derivative_markers(left, variable)?,
            expand_derivative_markers(right, variable)?,
        )),
        Expr::Call(name, argument) => Ok(Expr::Call(
            name.clone(),
            Box::new(expand_derivative_markers(argument, variable)?),
        )),
        Expr::Derivative(inner) => {
            let expanded = expand_derivative_markers(inner, variable)?;
            derivative(&expanded, variable)
        }
        Expr::Assign(target, value) => Ok(Expr::Assign(
            target.clone(),
            Box::new(expand_derivative_markers(value, variable)?),
        )),
    }
}

fn binary_derivative(
    op: BinaryOp,
    f: &Expr,
    g: &Expr,
    variable: &str,
) -> Result<Expr, DerivationError> {
    match op {
        BinaryOp::Add => Ok(Expr::add(derivative(f, variable)?, derivative(g, variable)?)),
        BinaryOp::Sub => Ok(Expr::sub(derivative(f, variable)?, derivative(g, variable)?)),
        // f'g + fg'
        BinaryOp::Mul => Ok(Expr::add(
            Expr::mul(derivative(f, variable)?, g.clone()),
            Expr::mul(f.clone(), derivative(g, variable)?),
        )),
        // (f'g - fg') / g^2
        BinaryOp::Div => Ok(Expr::div(
            Expr::sub(
                Expr::mul(derivative(f, variable)?, g.clone()),
                Expr::mul(f.clone(), derivative(g, variable)?),
            ),
            Expr::pow(g.clone(), Expr::number(2.0)),
        )),
        BinaryOp::Pow => power_derivative(f, g, variable),
    }
}

fn power_derivative(f: &Expr, g: &Expr, variable: &str) -> Result<Expr, DerivationError> {
    if is_independent_of(g, variable) {
        // g * f^(g - 1) * f'
        return Ok(Expr::mul(
            Expr::mul(
                g.clone(),
                Expr::pow(f.clone(), Expr::sub(g.clone(), Expr::number(1.0))),
            ),
            derivative(f, variable)?,
        ));
    }
    if is_independent_of(f, variable) {
        // f^g * ln(f) * g'
        return Ok(Expr::mul(
            Expr::mul(
                Expr::pow(f.clone(), g.clone()),
                Expr::call(Function::Ln, f.clone()),
            ),
            derivative(g, variable)?,
        ));
    }
    // f^g * (f' * (g / f) + g' * ln(f))
    Ok(Expr::mul(
        Expr::pow(f.clone(), g.clone()),
        Expr::add(
            Expr::mul(derivative(f, variable)?, Expr::div(g.clone(), f.clone())),
            Expr::mul(derivative(g, variable)?, Expr::call(Function::Ln, f.clone())),
        ),
    ))
}

/// Closed-form derivative of the outer function evaluated at `u`.
fn outer_derivative(function: Function, u: &Expr) -> Expr {
    let arg = || u.clone();
    match function {
        Function::Sin => Expr::call(Function::Cos, arg()),
        Function::Cos => Expr::neg(Expr::call(Function::Sin, arg())),
        Function::Tan => Expr::div(
            Expr::number(1.0),
            Expr::pow(Expr::call(Function::Cos, arg()), Expr::number(2.0)),
        ),
        Function::Cot => Expr::neg(Expr::div(
            Expr::number(1.0),
            Expr::pow(Expr::call(Function::Sin, arg()), Expr::number(2.0)),
        )),
        Function::Exp => Expr::call(Function::Exp, arg()),
        Function::Ln => Expr::div(Expr::number(1.0), arg()),
        Function::Log => Expr::div(
            Expr::number(1.0),
            Expr::mul(arg(), Expr::call(Function::Ln, Expr::number(10.0))),
        ),
    }
}
