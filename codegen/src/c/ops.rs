//! C expression/statement rendering shared by the C and CUDA backends.

use talc_ir::{BinaryOp, Expr, FunctionDef, NativeType, Param, Stmt};

use crate::error::{NotATensorSnafu, UnknownParamSnafu};
use crate::Result;

/// Look up a parameter referenced from a body statement and require it to
/// be a tensor.
pub fn tensor_param<'f>(func: &'f FunctionDef, name: &str) -> Result<&'f Param> {
    let param = func
        .params
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| UnknownParamSnafu { function: func.name.clone(), param: name.to_string() }.build())?;
    if param.ty != NativeType::Tensor {
        return NotATensorSnafu { function: func.name.clone(), param: name.to_string() }.fail();
    }
    Ok(param)
}

pub fn c_binop(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
    }
}

/// Render an f64 as a C double literal.
pub fn c_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "INFINITY".to_string() } else { "(-INFINITY)".to_string() }
    } else {
        // {:?} keeps a decimal point on integral values (1.0, not 1).
        format!("{f:?}")
    }
}

pub fn render_expr(func: &FunctionDef, expr: &Expr) -> Result<String> {
    Ok(match expr {
        Expr::Const(f) => c_float(*f),
        Expr::Load { param, index } => {
            let param = tensor_param(func, param)?;
            format!("{}->vals[{index}]", param.name)
        }
        Expr::Binary { op, lhs, rhs } => {
            format!("({} {} {})", render_expr(func, lhs)?, c_binop(*op), render_expr(func, rhs)?)
        }
    })
}

pub fn render_stmt(func: &FunctionDef, stmt: &Stmt) -> Result<String> {
    match stmt {
        Stmt::Store { param, index, value } => {
            let param = tensor_param(func, param)?;
            Ok(format!("  {}->vals[{index}] = {};\n", param.name, render_expr(func, value)?))
        }
    }
}

/// Render the typed parameter list, e.g. `talc_tensor_t* a, double s`.
pub fn render_params(func: &FunctionDef) -> String {
    func.params
        .iter()
        .map(|p| format!("{} {}", p.ty.c_repr(), p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the packed-slot unpacking for one parameter: tensor slots are
/// cast, scalar slots are dereferenced.
pub fn render_packed_arg(param: &Param, slot: usize) -> String {
    match param.ty {
        NativeType::Tensor => format!("({})(args[{slot}])", param.ty.c_repr()),
        _ => format!("*({}*)(args[{slot}])", param.ty.c_repr()),
    }
}
