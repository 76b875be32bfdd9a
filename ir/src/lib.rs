//! Intermediate representation for the talc compiler.
//!
//! This crate defines the IR function definitions the JIT layer consumes.
//! A [`FunctionDef`] is identified by name and carries a typed parameter
//! list plus a flat body of element stores; the code-generation backends
//! lower it to C, CUDA C, or LLVM IR.

pub mod function;
pub mod types;

pub use function::{BinaryOp, Expr, FunctionDef, Stmt};
pub use types::{NativeType, Param};
