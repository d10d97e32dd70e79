//! Expression tree produced by the parser and the derivation service.
//!
//! Nodes own their children through `Box`, so a tree is acyclic and never
//! shares a subtree between two parents. Equality is structural.

use std::f64::consts;
use std::fmt;

/// Named constants recognised by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pi" => Some(Constant::Pi),
            "e" => Some(Constant::E),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::E => "e",
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Constant::Pi => consts::PI,
            Constant::E => consts::E,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::Pow => '^',
        }
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 3,
        }
    }
}

/// The closed set of callable functions. Lookups by name fail with `None`
/// for anything outside the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Cot,
    Exp,
    Ln,
    Log,
}

const FUNCTION_TABLE: &[(&str, Function)] = &[
    ("sin", Function::Sin),
    ("cos", Function::Cos),
    ("tan", Function::Tan),
    ("cot", Function::Cot),
    ("exp", Function::Exp),
    ("ln", Function::Ln),
    ("log", Function::Log),
];

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        FUNCTION_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, function)| *function)
    }

    pub fn name(self) -> &'static str {
        FUNCTION_TABLE
            .iter()
            .find(|(_, function)| *function == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }

    /// `log` is the base-10 logarithm, `ln` the natural one.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Cot => 1.0 / x.tan(),
            Function::Exp => x.exp(),
            Function::Ln => x.ln(),
            Function::Log => x.log10(),
        }
    }
}

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Constant(Constant),
    Variable(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Function call by name. Unknown names survive parsing and are rejected
    /// when the tree is compiled or differentiated.
    Call(String, Box<Expr>),
    /// Postfix `'` marker requesting the derivative of the inner expression.
    Derivative(Box<Expr>),
    /// Nested assignment; only produced for chained `a = b = c` statements.
    Assign(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::Number(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn neg(inner: Expr) -> Self {
        Expr::Neg(Box::new(inner))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    pub fn mul(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Mul, left, right)
    }

    pub fn div(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Div, left, right)
    }

    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Self::binary(BinaryOp::Pow, base, exponent)
    }

    pub fn call(function: Function, argument: Expr) -> Self {
        Expr::Call(function.name().to_string(), Box::new(argument))
    }

    /// Free variable names in left-to-right order, first occurrence wins.
    /// Positional evaluation binds arguments in exactly this order.
    pub fn free_variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        match self {
            Expr::Number(_) | Expr::Constant(_) => false,
            Expr::Variable(own) => own == name,
            Expr::Neg(inner) | Expr::Call(_, inner) | Expr::Derivative(inner) => {
                inner.contains_variable(name)
            }
            Expr::Binary(_, left, right) | Expr::Assign(left, right) => {
                left.contains_variable(name) || right.contains_variable(name)
            }
        }
    }

    fn collect_variables(&self, names: &mut Vec<String>) {
        match self {
            Expr::Number(_) | Expr::Constant(_) => {}
            Expr::Variable(name) => {
                if !names.iter().any(|seen| seen == name) {
                    names.push(name.clone());
                }
            }
            Expr::Neg(inner) | Expr::Call(_, inner) | Expr::Derivative(inner) => {
                inner.collect_variables(names)
            }
            Expr::Binary(_, left, right) | Expr::Assign(left, right) => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
        }
    }

    /// Binding strength used by the printer. Mirrors the parser levels:
    /// assignment < additive < multiplicative < power < factor.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Assign(..) => 0,
            Expr::Binary(op, ..) => op.precedence(),
            Expr::Neg(_) => 4,
            Expr::Number(value) if *value < 0.0 => 4,
            _ => 5,
        }
    }
}

fn write_child(f: &mut fmt::Formatter<'_>, child: &Expr, min_precedence: u8) -> fmt::Result {
    if child.precedence() < min_precedence {
        write!(f, "({child})")
    } else {
        write!(f, "{child}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "{value}"),
            Expr::Constant(constant) => f.write_str(constant.name()),
            Expr::Variable(name) => f.write_str(name),
            Expr::Neg(inner) => {
                // A negated factor must itself be a plain atom; literals are
                // parenthesised so they do not fold into a negative number.
                if inner.precedence() < 5 || matches!(**inner, Expr::Number(_)) {
                    write!(f, "-({inner})")
                } else {
                    write!(f, "-{inner}")
                }
            }
            Expr::Binary(op, left, right) => {
                let own = op.precedence();
                match op {
                    BinaryOp::Pow => {
                        write_child(f, left, own)?;
                        write!(f, " ^ ")?;
                        write_child(f, right, 4)
                    }
                    _ => {
                        write_child(f, left, own)?;
                        write!(f, " {} ", op.symbol())?;
                        write_child(f, right, own + 1)
                    }
                }
            }
            Expr::Call(name, argument) => write!(f, "{name}({argument})"),
            Expr::Derivative(inner) => write!(f, "{inner}'"),
            Expr::Assign(target, value) => write!(f, "{target} = {value}"),
        }
    }
}

/// Result of parsing one input string.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expr),
    Assignment { target: Expr, value: Expr },
}

impl Statement {
    /// The right-hand side for assignments, the whole tree otherwise.
    pub fn expression(&self) -> &Expr {
        match self {
            Statement::Expression(expr) => expr,
            Statement::Assignment { value, .. } => value,
        }
    }

    pub fn into_expression(self) -> Expr {
        match self {
            Statement::Expression(expr) => expr,
            Statement::Assignment { value, .. } => value,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Expression(expr) => write!(f, "{expr}"),
            Statement::Assignment { target, value } => write!(f, "{target} = {value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_variables_keep_first_occurrence_order() {
        let expr = Expr::add(
            Expr::add(
                Expr::mul(Expr::var("y"), Expr::var("x")),
                Expr::var("y"),
            ),
            Expr::call(Function::Sin, Expr::var("z")),
        );
        assert_eq!(expr.free_variables(), vec!["y", "x", "z"]);
    }

    #[test]
    fn constants_are_not_free_variables() {
        let expr = Expr::mul(Expr::Constant(Constant::Pi), Expr::number(2.0));
        assert!(expr.free_variables().is_empty());
        assert!(!expr.contains_variable("pi"));
    }

    #[test]
    fn function_table_is_closed() {
        assert_eq!(Function::from_name("cot"), Some(Function::Cot));
        assert_eq!(Function::from_name("sqrt"), None);
        assert_eq!(Function::Log.name(), "log");
        assert!((Function::Log.apply(1000.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn printer_parenthesises_by_precedence() {
        let expr = Expr::mul(
            Expr::sub(Expr::var("a"), Expr::var("b")),
            Expr::pow(Expr::var("x"), Expr::neg(Expr::var("y"))),
        );
        assert_eq!(expr.to_string(), "(a - b) * x ^ -y");

        let nested = Expr::sub(Expr::var("a"), Expr::sub(Expr::var("b"), Expr::var("c")));
        assert_eq!(nested.to_string(), "a - (b - c)");
    }

    #[test]
    fn printer_keeps_negated_literals_distinct() {
        assert_eq!(Expr::neg(Expr::number(3.0)).to_string(), "-(3)");
        assert_eq!(Expr::number(-3.0).to_string(), "-3");
        assert_eq!(Expr::neg(Expr::neg(Expr::var("x"))).to_string(), "-(-x)");
    }
}
