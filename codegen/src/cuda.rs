//! CUDA C source code generation backend.
//!
//! Shares the C backend's body rendering; differs in the prelude and in
//! the shim language. The `.cu` unit is compiled by `nvcc` as C++, so
//! generated functions carry `extern "C"` linkage to keep their symbols
//! resolvable by name, and shims live in a `.cpp` unit.

use talc_ir::FunctionDef;

use crate::c::ops::{render_packed_arg, render_params, render_stmt};
use crate::traits::CodeGen;
use crate::Result;

/// Runtime prelude for generated CUDA units.
pub const CUDA_PRELUDE: &str = r#"#ifndef TALC_GENERATED
#define TALC_GENERATED
#include <stdint.h>
#include <stdlib.h>
#include <math.h>
#include <cuda_runtime.h>
typedef struct {
  int32_t  order;
  int32_t* dimensions;
  double*  vals;
} talc_tensor_t;
#define TALC_MIN(a, b) ((a) < (b) ? (a) : (b))
#define TALC_MAX(a, b) ((a) > (b) ? (a) : (b))
#endif
"#;

/// CUDA text generator (implementation units only; headers come from the
/// C backend's header kind).
pub struct CudaCodeGen {
    out: String,
}

impl CudaCodeGen {
    pub fn implementation() -> Self {
        Self { out: String::new() }
    }
}

impl Default for CudaCodeGen {
    fn default() -> Self {
        Self::implementation()
    }
}

impl CodeGen for CudaCodeGen {
    fn compile(&mut self, func: &FunctionDef, emit_prelude: bool) -> Result<()> {
        if emit_prelude {
            self.out.push_str(CUDA_PRELUDE);
        }
        tracing::debug!(function.name = %func.name, "cuda codegen: compile");
        self.out.push_str(&format!("\nextern \"C\" int {}({}) {{\n", func.name, render_params(func)));
        for stmt in &func.body {
            let line = render_stmt(func, stmt)?;
            self.out.push_str(&line);
        }
        self.out.push_str("  return 0;\n}\n");
        Ok(())
    }

    fn output(&self) -> &str {
        &self.out
    }
}

/// Emit the packed-convention shim for one function, as C++.
pub fn generate_shim(func: &FunctionDef, out: &mut String) {
    let unpacked = func
        .params
        .iter()
        .enumerate()
        .map(|(slot, p)| render_packed_arg(p, slot))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!(
        "extern \"C\" int _shim_{name}(void** args) {{\n  return {name}({unpacked});\n}}\n",
        name = func.name
    ));
}
