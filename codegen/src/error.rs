//! Error types for code generation.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur during code generation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A body statement references a parameter the function does not declare.
    #[snafu(display("Function '{function}' references unknown parameter '{param}'"))]
    UnknownParam { function: String, param: String },

    /// A load or store goes through a non-tensor parameter.
    #[snafu(display("Parameter '{param}' of '{function}' is not a tensor"))]
    NotATensor { function: String, param: String },

    /// Failed to write a generated artifact.
    #[snafu(display("Failed to write '{path}': {source}"))]
    Write { path: String, source: std::io::Error },
}
