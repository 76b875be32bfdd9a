//! The JIT compilation module.
//!
//! A [`Module`] owns an ordered registry of function definitions and a
//! simple linear lifecycle: accumulate functions, emit source through the
//! target's backend, build a shared artifact with the external toolchain,
//! load it, dispatch packed calls by name. Re-running [`Module::compile`]
//! redoes the whole pipeline under the same base name.

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;
use rand::Rng;
use snafu::{OptionExt, ResultExt};
use talc_codegen::{c, cuda, CCodeGen, CodeGen, CudaCodeGen, LlvmCodeGen, LoweringCodeGen};
use talc_ir::FunctionDef;
use tempfile::TempDir;

use crate::error::{
    FunctionNotFoundSnafu, IoSnafu, NotLoadedSnafu, Result, StaticLibraryUnsupportedSnafu, UnsupportedTargetSnafu,
    WorkdirSnafu,
};
use crate::loader::{LoadedLibrary, PackedFn};
use crate::target::{Arch, Target};
use crate::toolchain;

/// Base-name alphabet; `l` and `o` are excluded as look-alikes.
const LIBNAME_CHARS: &[u8] = b"abcdefghijkmnpqrstuvwxyz0123456789";
const LIBNAME_LEN: usize = 12;

fn random_libname() -> String {
    let mut rng = rand::rng();
    (0..LIBNAME_LEN).map(|_| LIBNAME_CHARS[rng.random_range(0..LIBNAME_CHARS.len())] as char).collect()
}

/// One compilation unit: registry, generated buffers, build artifacts,
/// and the loaded library.
pub struct Module {
    target: Target,
    funcs: Vec<FunctionDef>,
    source: String,
    header: String,
    from_user_source: bool,
    workdir: OnceCell<TempDir>,
    libname: OnceCell<String>,
    lib: Option<LoadedLibrary>,
}

impl Module {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            funcs: Vec::new(),
            source: String::new(),
            header: String::new(),
            from_user_source: false,
            workdir: OnceCell::new(),
            libname: OnceCell::new(),
            lib: None,
        }
    }

    /// Register a function definition.
    ///
    /// At most one definition per name is kept: re-registering a name
    /// silently replaces the old definition and moves it to the *end* of
    /// emission order. Callers relying on the original position must
    /// re-register the others explicitly.
    pub fn add_function(&mut self, func: FunctionDef) {
        self.funcs.retain(|f| f.name != func.name);
        self.funcs.push(func);
    }

    /// Registered functions, in emission order.
    pub fn functions(&self) -> &[FunctionDef] {
        &self.funcs
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Inject raw source, bypassing code generation entirely. The injected
    /// text is emitted verbatim by the next [`compile`](Self::compile).
    ///
    /// Only meaningful for the text families (`Arch::C99`, with or without
    /// CUDA): the lowering path would hand the injected text to the static
    /// compiler as if it were a serialized module, and the build fails
    /// there.
    pub fn set_source(&mut self, source: impl AsRef<str>) {
        self.source.push_str(source.as_ref());
        self.from_user_source = true;
    }

    /// The generated (or injected) source buffer.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The generated header buffer.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// The working directory, once lazily assigned.
    pub fn working_dir(&self) -> Option<&Path> {
        self.workdir.get().map(|d| d.path())
    }

    /// The random artifact base name, once lazily assigned.
    pub fn base_name(&self) -> Option<&str> {
        self.libname.get().map(String::as_str)
    }

    /// Lazily create the working directory and base name; both are stable
    /// for the Module's lifetime afterwards.
    fn ensure_prefix(&self) -> Result<PathBuf> {
        let dir = self.workdir.get_or_try_init(tempfile::tempdir).context(WorkdirSnafu)?;
        let name = self.libname.get_or_init(random_libname);
        Ok(dir.path().join(name))
    }

    fn write_file(path: &Path, contents: &str) -> Result<()> {
        std::fs::write(path, contents).context(IoSnafu { path: path.display().to_string() })
    }

    /// Run the generation passes and write the primary source artifact and
    /// header under `prefix`.
    ///
    /// The runtime prelude is emitted only before the first function of a
    /// pass, so emission order decides which function triggers it.
    pub fn compile_to_source(&mut self, prefix: &Path) -> Result<()> {
        if !self.from_user_source {
            self.source.clear();
            self.header.clear();

            let mut headergen = CCodeGen::header();
            match self.target.arch {
                Arch::C99 => {
                    let mut sourcegen: Box<dyn CodeGen> = if self.target.cuda {
                        Box::new(CudaCodeGen::implementation())
                    } else {
                        Box::new(CCodeGen::implementation())
                    };
                    let mut did_gen_runtime = false;
                    for func in &self.funcs {
                        sourcegen.compile(func, !did_gen_runtime)?;
                        headergen.compile(func, !did_gen_runtime)?;
                        did_gen_runtime = true;
                    }
                    self.source = sourcegen.output().to_string();
                }
                Arch::X86 => {
                    let mut lowering = LlvmCodeGen::new();
                    let mut did_gen_runtime = false;
                    for func in &self.funcs {
                        lowering.compile(func, !did_gen_runtime)?;
                        headergen.compile(func, !did_gen_runtime)?;
                        did_gen_runtime = true;
                    }
                    lowering.optimize_module();
                    lowering.write_to_file(&path_with_suffix(prefix, ".bc"))?;
                }
            }
            self.header = headergen.output().to_string();
        }

        if self.target.arch == Arch::C99 || self.from_user_source {
            let source_path = path_with_suffix(prefix, self.target.source_suffix());
            Self::write_file(&source_path, &self.source)?;
        }
        Self::write_file(&path_with_suffix(prefix, ".h"), &self.header)?;
        Ok(())
    }

    /// Write the packed-convention shim unit for the text families.
    fn write_shims(&self, prefix: &Path) -> Result<()> {
        let mut shims = format!("#include \"{}.h\"\n", prefix.display());
        for func in &self.funcs {
            if self.target.cuda {
                cuda::generate_shim(func, &mut shims);
            } else {
                c::generate_shim(func, &mut shims);
            }
        }
        let path = path_with_suffix(prefix, &format!("_shims{}", self.target.shim_suffix()));
        Self::write_file(&path, &shims)
    }

    /// Generate, build, and load the shared artifact; returns its path.
    ///
    /// Any external tool exiting non-zero is fatal and reported with the
    /// full command line and exit code. No partial artifact is used.
    pub fn compile(&mut self) -> Result<PathBuf> {
        if self.target.arch == Arch::X86 && self.target.cuda {
            return UnsupportedTargetSnafu { reason: "CUDA is only available for the C99 family" }.fail();
        }

        // Unload any previous build first: the artifact is rewritten in
        // place, and dlopen would hand back the stale mapping otherwise.
        self.lib = None;

        let prefix = self.ensure_prefix()?;
        tracing::debug!(
            module.base_name = %prefix.display(),
            module.functions = self.funcs.len(),
            "compiling module"
        );

        self.compile_to_source(&prefix)?;
        if self.target.arch == Arch::C99 {
            self.write_shims(&prefix)?;
        }

        if self.target.arch == Arch::X86 {
            toolchain::invoke(&toolchain::lowering_command(&prefix))?.check()?;
        }
        toolchain::invoke(&toolchain::link_command(&self.target, &prefix))?.check()?;

        let artifact = path_with_suffix(&prefix, ".so");
        self.lib = Some(LoadedLibrary::load(&artifact)?);
        Ok(artifact)
    }

    /// Static-library output is not implemented.
    pub fn compile_to_static_library(&mut self) -> Result<PathBuf> {
        StaticLibraryUnsupportedSnafu.fail()
    }

    /// Resolve a symbol from the loaded artifact.
    ///
    /// Lookup is lazy, per request; an absent symbol (or an unloaded
    /// module) is `None`, not an error.
    pub fn get_func_ptr(&self, name: &str) -> Option<PackedFn> {
        self.lib.as_ref()?.resolve(name)
    }

    /// Dispatch a packed call: resolve `name` and invoke it with one slot
    /// per declared parameter.
    ///
    /// # Safety
    ///
    /// The slot count, order, and pointee types of `args` must match the
    /// resolved function's packed signature; nothing is validated here.
    pub unsafe fn call_packed(&self, name: &str, args: &mut [*mut c_void]) -> Result<i32> {
        self.lib.as_ref().context(NotLoadedSnafu)?;
        let func = self.get_func_ptr(name).context(FunctionNotFoundSnafu { name })?;
        tracing::debug!(call.name = %name, call.args = args.len(), "packed dispatch");
        Ok(unsafe { func(args.as_mut_ptr()) })
    }
}

/// `prefix` + literal suffix. `Path::with_extension` would strip anything
/// after a dot in the base name, and the shim suffix is not an extension.
fn path_with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}
