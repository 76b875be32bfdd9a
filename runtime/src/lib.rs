//! JIT compilation for talc function definitions.
//!
//! A [`Module`] collects IR function definitions, emits a translation unit
//! through one of the code-generation backends, drives the external
//! toolchain to build a shared artifact, loads it, and dispatches calls
//! through the uniform packed convention.
//!
//! ```ignore
//! let mut module = Module::new(Target::c99());
//! module.add_function(def);
//! module.compile()?;
//! let status = unsafe { module.call_packed("_shim_f", &mut args)? };
//! ```

pub mod error;
pub mod loader;
pub mod module;
pub mod target;
pub mod toolchain;


pub use error::*;
pub use loader::{LoadedLibrary, PackedFn};
pub use module::Module;
pub use target::{Arch, Target};
pub use toolchain::Invocation;
