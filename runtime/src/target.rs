//! Target descriptors: which backend family a module compiles for.

/// Architecture / backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// Emit C99 text and build it directly.
    C99,
    /// Lower through an LLVM module, then static-compile to assembly.
    X86,
}

/// Target descriptor a [`Module`](crate::Module) is constructed with.
///
/// CUDA is not an [`Arch`] of its own: it shares `Arch::C99` with the text
/// backend and diverges via the explicit `cuda` field (which selects the
/// `.cu` suffix, the C++ shim language, and the nvcc toolchain). The field
/// is only meaningful with `Arch::C99`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub arch: Arch,
    pub cuda: bool,
    /// Default compiler binary for the non-CUDA families.
    pub compiler: String,
    /// Environment variable that overrides `compiler`.
    pub compiler_env: String,
}

impl Target {
    /// C99 text target with the default `cc` toolchain.
    pub fn c99() -> Self {
        Self { arch: Arch::C99, cuda: false, compiler: "cc".to_string(), compiler_env: "TALC_CC".to_string() }
    }

    /// CUDA text target (C99 family with the CUDA toggle set).
    pub fn cuda() -> Self {
        Self { cuda: true, ..Self::c99() }
    }

    /// Native target via the lowering backend.
    pub fn x86() -> Self {
        Self { arch: Arch::X86, ..Self::c99() }
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>, env: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self.compiler_env = env.into();
        self
    }

    /// Suffix of the primary generated artifact.
    pub fn source_suffix(&self) -> &'static str {
        match (self.arch, self.cuda) {
            (Arch::C99, true) => ".cu",
            (Arch::C99, false) => ".c",
            (Arch::X86, _) => ".bc",
        }
    }

    /// Suffix of the shim translation unit.
    pub fn shim_suffix(&self) -> &'static str {
        if self.cuda { ".cpp" } else { ".c" }
    }
}
