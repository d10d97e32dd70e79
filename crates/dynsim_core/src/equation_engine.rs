use crate::error::{EvaluationError, FunctionError};
use crate::expression::{BinaryOp, Expr, Function};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Selects how an `ExecutableFunction` evaluates its tree. Both backends
/// produce identical results; one is chosen per engine and never mixed
/// within a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    /// Recursive walk over the expression tree.
    #[default]
    Interpreted,
    /// Stack-machine program compiled once from the tree.
    Bytecode,
}

/// OpCodes for the Stack-based Virtual Machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant value onto the stack.
    LoadConst(f64),
    /// Pushes the argument at the given free-variable position.
    LoadVar(usize),
    /// Pops top two values (b, a), pushes (a op b).
    Binary(BinaryOp),
    /// Pops top value (a), pushes -a.
    Neg,
    /// Pops top value (a), pushes f(a).
    Apply(Function),
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
    /// Deepest stack the program reaches; used to size the VM buffer.
    pub max_depth: usize,
}

/// Stateless stack machine. Each call brings its own stack, so a single
/// `Bytecode` may be executed from several places at once.
pub struct VM;

impl VM {
    pub fn execute(bytecode: &Bytecode, vars: impl Fn(usize) -> f64, stack: &mut Vec<f64>) -> f64 {
        stack.clear();

        for op in &bytecode.ops {
            match op {
                OpCode::LoadConst(val) => stack.push(*val),
                OpCode::LoadVar(idx) => stack.push(vars(*idx)),
                OpCode::Binary(op) => {
                    let b = pop(stack);
                    let a = pop(stack);
                    stack.push(op.apply(a, b));
                }
                OpCode::Neg => {
                    let a = pop(stack);
                    stack.push(-a);
                }
                OpCode::Apply(function) => {
                    let a = pop(stack);
                    stack.push(function.apply(a));
                }
            }
        }

        pop(stack)
    }
}

// The compiler only emits balanced programs, so an empty pop cannot happen
// for bytecode built by `Compiler`.
fn pop(stack: &mut Vec<f64>) -> f64 {
    stack.pop().unwrap_or(f64::NAN)
}

/// Compiles an expression into `Bytecode`, resolving variable names to
/// positions in the free-variable list.
pub struct Compiler<'a> {
    slots: &'a HashMap<String, usize>,
}

impl<'a> Compiler<'a> {
    pub fn new(slots: &'a HashMap<String, usize>) -> Self {
        Self { slots }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, FunctionError> {
        let mut bytecode = Bytecode::default();
        let mut depth = 0;
        self.compile_recursive(expr, &mut bytecode, &mut depth)?;
        Ok(bytecode)
    }

    fn push(&self, op: OpCode, bytecode: &mut Bytecode, depth: &mut usize) {
        match op {
            OpCode::LoadConst(_) | OpCode::LoadVar(_) => *depth += 1,
            OpCode::Binary(_) => *depth -= 1,
            OpCode::Neg | OpCode::Apply(_) => {}
        }
        bytecode.max_depth = bytecode.max_depth.max(*depth);
        bytecode.ops.push(op);
    }

    fn compile_recursive(
        &self,
        expr: &Expr,
        bytecode: &mut Bytecode,
        depth: &mut usize,
    ) -> Result<(), FunctionError> {
        match expr {
            Expr::Number(n) => self.push(OpCode::LoadConst(*n), bytecode, depth),
            Expr::Constant(constant) => {
                self.push(OpCode::LoadConst(constant.value()), bytecode, depth)
            }
            Expr::Variable(name) => {
                let idx = *self
                    .slots
                    .get(name)
                    .ok_or_else(|| FunctionError::UnboundVariable(name.clone()))?;
                self.push(OpCode::LoadVar(idx), bytecode, depth);
            }
            Expr::Neg(operand) => {
                self.compile_recursive(operand, bytecode, depth)?;
                self.push(OpCode::Neg, bytecode, depth);
            }
            Expr::Binary(op, left, right) => {
                self.compile_recursive(left, bytecode, depth)?;
                self.compile_recursive(right, bytecode, depth)?;
                self.push(OpCode::Binary(*op), bytecode, depth);
            }
            Expr::Call(name, arg) => {
                let function = Function::from_name(name)
                    .ok_or_else(|| FunctionError::UnsupportedFunction(name.clone()))?;
                self.compile_recursive(arg, bytecode, depth)?;
                self.push(OpCode::Apply(function), bytecode, depth);
            }
            Expr::Derivative(inner) => {
                return Err(FunctionError::DerivativeMarker(inner.to_string()))
            }
            Expr::Assign(..) => return Err(FunctionError::Assignment),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Backend {
    Interpreted,
    Compiled(Bytecode),
}

/// A callable view of an expression over its free variables.
///
/// The argument order is the first-occurrence order of the free variables
/// (see [`Expr::free_variables`]). Evaluation never mutates the function, so
/// one instance may be shared by any number of callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableFunction {
    expression: Expr,
    variables: Vec<String>,
    slots: HashMap<String, usize>,
    backend: Backend,
}

impl ExecutableFunction {
    /// Builds an interpreted function.
    pub fn new(expression: Expr) -> Result<Self, FunctionError> {
        Self::with_evaluator(expression, EvaluatorKind::Interpreted)
    }

    pub fn with_evaluator(expression: Expr, kind: EvaluatorKind) -> Result<Self, FunctionError> {
        validate(&expression)?;
        let variables = expression.free_variables();
        let slots: HashMap<String, usize> = variables
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let backend = match kind {
            EvaluatorKind::Interpreted => Backend::Interpreted,
            EvaluatorKind::Bytecode => Backend::Compiled(Compiler::new(&slots).compile(&expression)?),
        };
        Ok(Self {
            expression,
            variables,
            slots,
            backend,
        })
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    /// Ordered, deduplicated free variables.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn evaluator(&self) -> EvaluatorKind {
        match self.backend {
            Backend::Interpreted => EvaluatorKind::Interpreted,
            Backend::Compiled(_) => EvaluatorKind::Bytecode,
        }
    }

    /// Evaluates against values given in free-variable order.
    pub fn evaluate(&self, values: &[f64]) -> Result<f64, EvaluationError> {
        if values.len() != self.variables.len() {
            return Err(EvaluationError::Arity {
                expected: self.variables.len(),
                actual: values.len(),
            });
        }
        Ok(self.evaluate_with(|idx| values[idx]))
    }

    /// Evaluates against named bindings. The key set must equal the
    /// free-variable set exactly.
    pub fn evaluate_named(&self, bindings: &HashMap<String, f64>) -> Result<f64, EvaluationError> {
        let missing: Vec<String> = self
            .variables
            .iter()
            .filter(|name| !bindings.contains_key(*name))
            .cloned()
            .collect();
        let mut unexpected: Vec<String> = bindings
            .keys()
            .filter(|name| !self.slots.contains_key(*name))
            .cloned()
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            unexpected.sort();
            return Err(EvaluationError::Bindings {
                missing,
                unexpected,
            });
        }
        Ok(self.evaluate_with(|idx| bindings[&self.variables[idx]]))
    }

    /// Evaluates with arguments supplied by position. `vars` is only ever
    /// called with indices below `variables().len()`.
    pub(crate) fn evaluate_with(&self, vars: impl Fn(usize) -> f64) -> f64 {
        match &self.backend {
            Backend::Interpreted => self.interpret(&self.expression, &vars),
            Backend::Compiled(bytecode) => {
                let mut stack = Vec::with_capacity(bytecode.max_depth);
                VM::execute(bytecode, vars, &mut stack)
            }
        }
    }

    fn interpret(&self, expr: &Expr, vars: &impl Fn(usize) -> f64) -> f64 {
        match expr {
            Expr::Number(value) => *value,
            Expr::Constant(constant) => constant.value(),
            Expr::Variable(name) => self.slots.get(name).map_or(f64::NAN, |&idx| vars(idx)),
            Expr::Neg(inner) => -self.interpret(inner, vars),
            Expr::Binary(op, left, right) => {
                op.apply(self.interpret(left, vars), self.interpret(right, vars))
            }
            Expr::Call(name, arg) => {
                let value = self.interpret(arg, vars);
                Function::from_name(name).map_or(f64::NAN, |function| function.apply(value))
            }
            // Rejected by `validate` at construction.
            Expr::Derivative(_) | Expr::Assign(..) => f64::NAN,
        }
    }
}

fn validate(expr: &Expr) -> Result<(), FunctionError> {
    match expr {
        Expr::Number(_) | Expr::Constant(_) | Expr::Variable(_) => Ok(()),
        Expr::Neg(inner) => validate(inner),
        Expr::Binary(_, left, right) => {
            validate(left)?;
            validate(right)
        }
        Expr::Call(name, arg) => {
            if Function::from_name(name).is_none() {
                return Err(FunctionError::UnsupportedFunction(name.clone()));
            }
            validate(arg)
        }
        Expr::Derivative(inner) => Err(FunctionError::DerivativeMarker(inner.to_string())),
        Expr::Assign(..) => Err(FunctionError::Assignment),
    }
}
