//! Lowering backend: builds an LLVM IR module and serializes it for a
//! separate static-compilation stage (`llc`, then the system C compiler).
//!
//! The module is emitted as textual LLVM IR; llc's IR reader sniffs the
//! content, so the `.bc`-named intermediate file is accepted either way.
//! Functions accumulate in an internal module representation,
//! [`optimize_module`](LlvmCodeGen::optimize_module) runs a module-wide
//! constant-folding pass, and [`write_to_file`](LlvmCodeGen::write_to_file)
//! renders and serializes the result.

use std::path::Path;

use snafu::ResultExt;
use talc_ir::{BinaryOp, Expr, FunctionDef, Stmt};

use crate::c::ops::tensor_param;
use crate::error::WriteSnafu;
use crate::traits::LoweringCodeGen;
use crate::Result;

/// Module-level prelude: the tensor struct layout the generated code
/// indexes into. Field 2 is the values pointer.
const LLVM_PRELUDE: &str = "%talc_tensor_t = type { i32, ptr, ptr }\n";

/// LLVM IR module builder.
pub struct LlvmCodeGen {
    funcs: Vec<FunctionDef>,
    has_prelude: bool,
}

impl LlvmCodeGen {
    pub fn new() -> Self {
        Self { funcs: Vec::new(), has_prelude: false }
    }

    fn render_module(&self) -> Result<String> {
        let mut out = String::new();
        if self.has_prelude {
            out.push_str(LLVM_PRELUDE);
        }
        for func in &self.funcs {
            out.push_str(&render_function(func)?);
        }
        Ok(out)
    }
}

impl Default for LlvmCodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl LoweringCodeGen for LlvmCodeGen {
    fn compile(&mut self, func: &FunctionDef, emit_prelude: bool) -> Result<()> {
        // Validate eagerly so errors surface per function, not at serialization.
        render_function(func)?;
        if emit_prelude {
            self.has_prelude = true;
        }
        tracing::debug!(function.name = %func.name, "llvm codegen: compile");
        self.funcs.push(func.clone());
        Ok(())
    }

    fn optimize_module(&mut self) {
        for func in &mut self.funcs {
            func.body = func.folded_body();
        }
        tracing::debug!(module.functions = self.funcs.len(), "llvm codegen: optimized module");
    }

    fn write_to_file(&self, path: &Path) -> Result<()> {
        let text = self.render_module()?;
        std::fs::write(path, text).context(WriteSnafu { path: path.display().to_string() })?;
        Ok(())
    }
}

/// Double literal in LLVM's exact hex form.
fn llvm_double(f: f64) -> String {
    format!("0x{:016X}", f.to_bits())
}

fn llvm_binop(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "fadd",
        BinaryOp::Sub => "fsub",
        BinaryOp::Mul => "fmul",
        BinaryOp::Div => "fdiv",
    }
}

struct FnEmitter<'f> {
    func: &'f FunctionDef,
    lines: Vec<String>,
    counter: usize,
}

impl<'f> FnEmitter<'f> {
    fn temp(&mut self) -> String {
        let name = format!("%t{}", self.counter);
        self.counter += 1;
        name
    }

    /// Emit the address of `param->vals[index]`.
    fn element_ptr(&mut self, param: &str, index: usize) -> Result<String> {
        let param = tensor_param(self.func, param)?;
        let field = self.temp();
        self.lines.push(format!(
            "  {field} = getelementptr inbounds %talc_tensor_t, ptr %{}, i32 0, i32 2",
            param.name
        ));
        let vals = self.temp();
        self.lines.push(format!("  {vals} = load ptr, ptr {field}"));
        let elem = self.temp();
        self.lines.push(format!("  {elem} = getelementptr inbounds double, ptr {vals}, i64 {index}"));
        Ok(elem)
    }

    fn value(&mut self, expr: &Expr) -> Result<String> {
        Ok(match expr {
            Expr::Const(f) => llvm_double(*f),
            Expr::Load { param, index } => {
                let ptr = self.element_ptr(param, *index)?;
                let val = self.temp();
                self.lines.push(format!("  {val} = load double, ptr {ptr}"));
                val
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.value(lhs)?;
                let rhs = self.value(rhs)?;
                let val = self.temp();
                self.lines.push(format!("  {val} = {} double {lhs}, {rhs}", llvm_binop(*op)));
                val
            }
        })
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Store { param, index, value } => {
                let value = self.value(value)?;
                let ptr = self.element_ptr(param, *index)?;
                self.lines.push(format!("  store double {value}, ptr {ptr}"));
            }
        }
        Ok(())
    }
}

fn render_function(func: &FunctionDef) -> Result<String> {
    let params = func
        .params
        .iter()
        .map(|p| format!("{} %{}", p.ty.llvm_repr(), p.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut emitter = FnEmitter { func, lines: Vec::new(), counter: 0 };
    for stmt in &func.body {
        emitter.stmt(stmt)?;
    }

    let mut out = format!("\ndefine i32 @{}({params}) {{\nentry:\n", func.name);
    for line in &emitter.lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("  ret i32 0\n}\n");
    Ok(out)
}
