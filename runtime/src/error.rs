//! Error types for JIT compilation and dispatch.

use snafu::Snafu;

/// Result type for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while building or calling into a module.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Codegen error occurred.
    #[snafu(display("Codegen error: {source}"))]
    Codegen { source: talc_codegen::Error },

    /// Static-library output is not implemented.
    #[snafu(display("Compiling to a static library is not supported"))]
    StaticLibraryUnsupported,

    /// The target configuration cannot be compiled.
    #[snafu(display("Unsupported target configuration: {reason}"))]
    UnsupportedTarget { reason: String },

    /// An external tool could not be spawned at all.
    #[snafu(display("Failed to run compilation command:\n{command}\n{source}"))]
    ToolchainSpawn { command: String, source: std::io::Error },

    /// An external tool ran and exited non-zero.
    #[snafu(display("Compilation command failed:\n{command}\nreturned {code}\n{stderr}"))]
    ToolchainFailed { command: String, code: i32, stderr: String },

    /// Failed to write a generated file.
    #[snafu(display("Failed to write '{path}': {source}"))]
    Io { path: String, source: std::io::Error },

    /// Failed to create the module's working directory.
    #[snafu(display("Failed to create working directory: {source}"))]
    Workdir { source: std::io::Error },

    /// Failed to load the compiled shared artifact.
    #[snafu(display("Failed to load '{path}': {source}"))]
    LibraryLoad { path: String, source: libloading::Error },

    /// The module has not been compiled and loaded yet.
    #[snafu(display("Module has no loaded library; call compile() first"))]
    NotLoaded,

    /// Function not found in the loaded library.
    #[snafu(display("Function '{name}' not found in module"))]
    FunctionNotFound { name: String },
}

impl From<talc_codegen::Error> for Error {
    fn from(source: talc_codegen::Error) -> Self {
        Error::Codegen { source }
    }
}
