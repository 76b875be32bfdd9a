//! Function definitions: the unit the JIT module registers and emits.

use crate::types::Param;

/// Scalar binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Apply the operator to constant operands.
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
        }
    }
}

/// Scalar expression over tensor elements and constants.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    /// Element `index` of tensor parameter `param`'s values array.
    Load { param: String, index: usize },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    pub fn load(param: impl Into<String>, index: usize) -> Self {
        Expr::Load { param: param.into(), index }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Mul, lhs, rhs)
    }

    /// Fold constant subexpressions bottom-up.
    pub fn fold_consts(&self) -> Expr {
        match self {
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.fold_consts();
                let rhs = rhs.fold_consts();
                if let (Expr::Const(a), Expr::Const(b)) = (&lhs, &rhs) {
                    Expr::Const(op.apply(*a, *b))
                } else {
                    Expr::Binary { op: *op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
                }
            }
            other => other.clone(),
        }
    }
}

/// A body statement: store a scalar into a tensor element.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Store { param: String, index: usize, value: Expr },
}

/// One IR function definition.
///
/// Identified by `name`; the JIT layer treats everything else as payload
/// for the code-generation backends. Every function compiles to a native
/// function with the declared typed signature returning an `int` status,
/// plus a packed-convention shim.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, params: Vec<Param>, body: Vec<Stmt>) -> Self {
        Self { name: name.into(), params, body }
    }

    /// Store `value` into `param.vals[index]`.
    pub fn store(param: impl Into<String>, index: usize, value: Expr) -> Stmt {
        Stmt::Store { param: param.into(), index, value }
    }

    /// Body with all constant subexpressions folded.
    pub fn folded_body(&self) -> Vec<Stmt> {
        self.body
            .iter()
            .map(|Stmt::Store { param, index, value }| Stmt::Store {
                param: param.clone(),
                index: *index,
                value: value.fold_consts(),
            })
            .collect()
    }
}
