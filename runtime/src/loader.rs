//! Native loading of compiled shared artifacts.
//!
//! Opens the artifact with "resolve all symbols now, keep them local to
//! this load" semantics and resolves symbols lazily by name. A missing
//! symbol is an ordinary absent result, never fatal at this layer.

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use libloading::Library;
use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};
use snafu::ResultExt;

use crate::error::{LibraryLoadSnafu, Result};

/// The uniform packed calling convention: one array of untyped pointers
/// (one slot per declared parameter, inputs and outputs together), integer
/// status return.
pub type PackedFn = unsafe extern "C" fn(*mut *mut c_void) -> i32;

// The packed dispatch path reinterprets a data pointer obtained from
// symbol lookup as a function pointer. Checked once, here, not per call.
const _: () = assert!(
    size_of::<PackedFn>() == size_of::<*mut c_void>(),
    "function and data pointers must have the same representation"
);

/// A loaded shared artifact.
///
/// Dropping it unloads the artifact; function pointers resolved from it
/// must not outlive it.
pub struct LoadedLibrary {
    lib: Library,
    path: PathBuf,
}

impl LoadedLibrary {
    /// Open `path` with `RTLD_NOW | RTLD_LOCAL`.
    pub fn load(path: &Path) -> Result<Self> {
        let lib = unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_LOCAL) }
            .context(LibraryLoadSnafu { path: path.display().to_string() })?;
        tracing::debug!(library.path = %path.display(), "loaded shared artifact");
        Ok(Self { lib: lib.into(), path: path.to_path_buf() })
    }

    /// Resolve a symbol by name through the packed convention.
    ///
    /// Returns `None` when the symbol is absent; the caller must branch
    /// before dispatching.
    pub fn resolve(&self, name: &str) -> Option<PackedFn> {
        let sym = unsafe { self.lib.get::<PackedFn>(name.as_bytes()) }.ok()?;
        Some(*sym)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
