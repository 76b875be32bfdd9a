//! C99 source code generation backend.
//!
//! Emits translation units suitable for `cc -shared -fPIC` and loading via
//! `dlopen`. Every function gets its natural typed signature
//! (`int f(talc_tensor_t* a, ...)`, returning a status) plus, in the shim
//! file, a packed-convention adaptor:
//!
//! ```c
//! int _shim_f(void** args);
//! ```
//!
//! with one slot per declared parameter, in declaration order.

pub mod ops;

use talc_ir::FunctionDef;

use crate::traits::CodeGen;
use crate::Result;

use self::ops::{render_packed_arg, render_params, render_stmt};

/// What a [`CCodeGen`] instance emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Function definitions (`.c`).
    Implementation,
    /// Function declarations (`.h`).
    Header,
}

/// Runtime prelude shared by every generated implementation unit.
///
/// Emitted once per translation unit, before the first function.
pub const C_PRELUDE: &str = r#"#ifndef TALC_GENERATED
#define TALC_GENERATED
#include <stdint.h>
#include <stdlib.h>
#include <math.h>
typedef struct {
  int32_t  order;
  int32_t* dimensions;
  double*  vals;
} talc_tensor_t;
#define TALC_MIN(a, b) ((a) < (b) ? (a) : (b))
#define TALC_MAX(a, b) ((a) > (b) ? (a) : (b))
#endif
"#;

/// Header prelude. `TALC_EXTERN` keeps the declarations unmangled when the
/// header is pulled into the C++ (CUDA) shim unit.
pub const HEADER_PRELUDE: &str = r#"#ifndef TALC_GENERATED_H
#define TALC_GENERATED_H
#include <stdint.h>
typedef struct {
  int32_t  order;
  int32_t* dimensions;
  double*  vals;
} talc_tensor_t;
#ifdef __cplusplus
#define TALC_EXTERN extern "C"
#else
#define TALC_EXTERN
#endif
#endif
"#;

/// C text generator, in implementation or header output kind.
pub struct CCodeGen {
    kind: OutputKind,
    out: String,
}

impl CCodeGen {
    pub fn implementation() -> Self {
        Self { kind: OutputKind::Implementation, out: String::new() }
    }

    pub fn header() -> Self {
        Self { kind: OutputKind::Header, out: String::new() }
    }

    fn compile_definition(&mut self, func: &FunctionDef) -> Result<()> {
        self.out.push_str(&format!("\nint {}({}) {{\n", func.name, render_params(func)));
        for stmt in &func.body {
            let line = render_stmt(func, stmt)?;
            self.out.push_str(&line);
        }
        self.out.push_str("  return 0;\n}\n");
        Ok(())
    }

    fn compile_declaration(&mut self, func: &FunctionDef) -> Result<()> {
        // Validate the body here too so header generation surfaces the
        // same errors regardless of pass order.
        for stmt in &func.body {
            render_stmt(func, stmt)?;
        }
        self.out.push_str(&format!("TALC_EXTERN int {}({});\n", func.name, render_params(func)));
        Ok(())
    }
}

impl CodeGen for CCodeGen {
    fn compile(&mut self, func: &FunctionDef, emit_prelude: bool) -> Result<()> {
        if emit_prelude {
            self.out.push_str(match self.kind {
                OutputKind::Implementation => C_PRELUDE,
                OutputKind::Header => HEADER_PRELUDE,
            });
        }
        tracing::debug!(function.name = %func.name, kind = ?self.kind, "c codegen: compile");
        match self.kind {
            OutputKind::Implementation => self.compile_definition(func),
            OutputKind::Header => self.compile_declaration(func),
        }
    }

    fn output(&self) -> &str {
        &self.out
    }
}

/// Emit the packed-convention shim for one function.
pub fn generate_shim(func: &FunctionDef, out: &mut String) {
    let unpacked = func
        .params
        .iter()
        .enumerate()
        .map(|(slot, p)| render_packed_arg(p, slot))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!(
        "int _shim_{name}(void** args) {{\n  return {name}({unpacked});\n}}\n",
        name = func.name
    ));
}
