//! External toolchain invocation.
//!
//! Builds deterministic command lines for the system C compiler, nvcc, and
//! the static compiler (llc), and runs them blocking with captured output.
//! Invocation returns a structured [`Invocation`] so the caller decides
//! whether a non-zero exit is fatal; [`Module::compile`](crate::Module::compile)
//! always treats it as fatal with no retry and no fallback.

use std::path::Path;
use std::process::Command;

use snafu::ResultExt;

use crate::error::{Result, ToolchainFailedSnafu, ToolchainSpawnSnafu};
use crate::target::{Arch, Target};

/// Overrides the C compiler flag set.
pub const ENV_CFLAGS: &str = "TALC_CFLAGS";
/// Overrides the CUDA compiler binary.
pub const ENV_NVCC: &str = "TALC_NVCC";
/// Overrides the CUDA compiler flag set.
pub const ENV_NVCCFLAGS: &str = "TALC_NVCCFLAGS";
/// Overrides the static compiler binary used by the lowering path.
pub const ENV_LLC: &str = "TALC_LLC";

/// Default C flags; `-shared -fPIC` is always appended on top.
pub const DEFAULT_CFLAGS: &str = "-O3 -ffast-math -std=c99";
pub const DEFAULT_NVCCFLAGS: &str = "-O3 -Xcompiler -fPIC -shared";

/// Environment lookup with a default, ignoring unset/invalid values.
pub fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

/// An assembled external command, prior to invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BuildCommand {
    /// The full command line, as reported in errors.
    pub fn rendered(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl std::fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// Assemble the link command producing `<prefix>.so`.
///
/// Inputs depend on the family: the text families pass the primary source
/// plus the shim unit; the lowering family passes the assembly produced by
/// the prior static-compilation stage and no shims.
pub fn link_command(target: &Target, prefix: &Path) -> BuildCommand {
    let prefix = prefix.display();
    let output = format!("{prefix}.so");

    if target.cuda {
        let mut args: Vec<String> =
            env_or(ENV_NVCCFLAGS, DEFAULT_NVCCFLAGS).split_whitespace().map(str::to_string).collect();
        args.push(format!("{prefix}.cu"));
        args.push(format!("{prefix}_shims.cpp"));
        args.extend(["-o".to_string(), output]);
        return BuildCommand { program: env_or(ENV_NVCC, "nvcc"), args };
    }

    let mut args: Vec<String> = env_or(ENV_CFLAGS, DEFAULT_CFLAGS).split_whitespace().map(str::to_string).collect();
    args.extend(["-shared".to_string(), "-fPIC".to_string()]);
    match target.arch {
        Arch::C99 => {
            args.push(format!("{prefix}.c"));
            args.push(format!("{prefix}_shims.c"));
        }
        Arch::X86 => args.push(format!("{prefix}.s")),
    }
    args.extend(["-o".to_string(), output]);
    BuildCommand { program: env_or(&target.compiler_env, &target.compiler), args }
}

/// Assemble the prior static-compilation stage for the lowering family:
/// `llc <prefix>.bc`, producing `<prefix>.s`.
pub fn lowering_command(prefix: &Path) -> BuildCommand {
    BuildCommand { program: env_or(ENV_LLC, "llc"), args: vec![format!("{}.bc", prefix.display())] }
}

/// Outcome of one blocking external invocation.
#[derive(Debug)]
pub struct Invocation {
    /// The command line that ran.
    pub command: String,
    /// Process exit code (-1 if terminated by a signal).
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Treat a non-zero exit as fatal, carrying the full command line and
    /// exit code.
    pub fn check(self) -> Result<Invocation> {
        if self.success() {
            Ok(self)
        } else {
            ToolchainFailedSnafu { command: self.command, code: self.code, stderr: self.stderr }.fail()
        }
    }
}

/// Run a command, blocking until it exits, capturing its output.
///
/// There is no timeout: a hung external process hangs the caller.
pub fn invoke(cmd: &BuildCommand) -> Result<Invocation> {
    let rendered = cmd.rendered();
    tracing::debug!(toolchain.command = %rendered, "invoking external toolchain");
    let output = Command::new(&cmd.program)
        .args(&cmd.args)
        .output()
        .context(ToolchainSpawnSnafu { command: rendered.clone() })?;
    Ok(Invocation {
        command: rendered,
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
