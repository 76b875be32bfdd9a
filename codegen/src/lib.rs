//! Code generation for talc function definitions.
//!
//! Three backends share one collaborator interface: the JIT layer feeds
//! them registered functions one at a time, with the runtime prelude
//! emitted only for the first function of a generation pass.
//!
//! - [`c`] — C99 text backend (implementation and header output kinds)
//! - [`cuda`] — CUDA C text backend (C++ shims)
//! - [`llvm`] — lowering backend: builds an LLVM IR module, optimizes it,
//!   and serializes it for a separate static-compilation stage

pub mod c;
pub mod cuda;
pub mod error;
pub mod llvm;
pub mod traits;

pub use c::{CCodeGen, OutputKind};
pub use cuda::CudaCodeGen;
pub use error::*;
pub use llvm::LlvmCodeGen;
pub use traits::{CodeGen, LoweringCodeGen};
