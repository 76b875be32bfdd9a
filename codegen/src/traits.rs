//! Collaborator interfaces between the JIT layer and the backends.

use std::path::Path;

use talc_ir::FunctionDef;

use crate::Result;

/// A text code generator driven one function at a time.
///
/// The caller owns pass ordering: it iterates the registered functions in
/// emission order and passes `emit_prelude = true` only for the first one,
/// so the shared runtime prelude appears exactly once per translation
/// unit. Output accumulates in an internal buffer.
pub trait CodeGen {
    /// Append generated code for one function, optionally preceded by the
    /// runtime prelude.
    fn compile(&mut self, func: &FunctionDef, emit_prelude: bool) -> Result<()>;

    /// The accumulated translation unit.
    fn output(&self) -> &str;
}

/// A backend that lowers through an intermediate binary module instead of
/// emitting text directly.
///
/// Functions are compiled into an internal module representation under the
/// same first-function-triggers-prelude rule, the whole module is
/// optimized once, and the result is serialized for an external
/// static-compilation stage.
pub trait LoweringCodeGen {
    fn compile(&mut self, func: &FunctionDef, emit_prelude: bool) -> Result<()>;

    /// Run the module-wide optimization pass.
    fn optimize_module(&mut self);

    /// Serialize the module to `path`.
    fn write_to_file(&self, path: &Path) -> Result<()>;
}
