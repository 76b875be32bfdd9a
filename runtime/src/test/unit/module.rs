//! Module integration tests.
//!
//! Tests the full JIT pipeline: register functions → emit source → build
//! with the external toolchain → load → packed dispatch. End-to-end tests
//! require a working `cc`; the lowering (X86) path is exercised up to the
//! serialized intermediate module, since `llc` is not assumed present.

use std::ffi::c_void;
use std::path::Path;

use proptest::prelude::*;
use talc_ir::{Expr, FunctionDef, Param};

use crate::error::Error;
use crate::module::Module;
use crate::target::Target;
use crate::toolchain;

/// Mirror of the `talc_tensor_t` struct from the generated prelude.
#[repr(C)]
struct TalcTensor {
    order: i32,
    dimensions: *mut i32,
    vals: *mut f64,
}

impl TalcTensor {
    fn vector(vals: &mut [f64], dim: &mut i32) -> Self {
        *dim = vals.len() as i32;
        Self { order: 1, dimensions: dim, vals: vals.as_mut_ptr() }
    }
}

/// `a.vals[0] = b.vals[0] + b.vals[1]`
fn sum2(name: &str) -> FunctionDef {
    FunctionDef::new(
        name,
        vec![Param::tensor("a"), Param::tensor("b")],
        vec![FunctionDef::store("a", 0, Expr::add(Expr::load("b", 0), Expr::load("b", 1)))],
    )
}

/// `a.vals[0] = b.vals[0] * 2.0`
fn double0(name: &str) -> FunctionDef {
    FunctionDef::new(
        name,
        vec![Param::tensor("a"), Param::tensor("b")],
        vec![FunctionDef::store("a", 0, Expr::mul(Expr::load("b", 0), Expr::Const(2.0)))],
    )
}

fn names(module: &Module) -> Vec<&str> {
    module.functions().iter().map(|f| f.name.as_str()).collect()
}

#[test]
fn replacement_moves_to_end_of_emission_order() {
    let mut module = Module::new(Target::c99());
    module.add_function(sum2("f1"));
    module.add_function(sum2("f2"));
    module.add_function(double0("f1"));

    assert_eq!(names(&module), vec!["f2", "f1"]);
    // The surviving f1 is the most recently registered body.
    assert_eq!(module.functions()[1], double0("f1"));
}

proptest! {
    #[test]
    fn registry_keeps_one_entry_per_name_in_last_registration_order(
        seq in prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", "e"]), 0..24)
    ) {
        let mut module = Module::new(Target::c99());
        for name in &seq {
            module.add_function(FunctionDef::new(*name, vec![], vec![]));
        }

        // Expected: distinct names ordered by their last occurrence.
        let mut expected: Vec<&str> = Vec::new();
        for name in &seq {
            expected.retain(|n| n != name);
            expected.push(name);
        }

        prop_assert_eq!(names(&module), expected);
    }
}

#[test]
fn user_source_round_trips_verbatim() {
    let injected = "int custom(void** args) { return 42; }\n";
    let mut module = Module::new(Target::c99());
    module.add_function(sum2("ignored"));
    module.set_source(injected);
    assert_eq!(module.source(), injected);

    // Generation is skipped entirely: the injected bytes hit the source
    // file unchanged and the header buffer stays untouched.
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("base");
    module.compile_to_source(&prefix).unwrap();
    assert_eq!(module.source(), injected);
    assert_eq!(module.header(), "");
    assert_eq!(std::fs::read_to_string(dir.path().join("base.c")).unwrap(), injected);
}

#[test]
fn generation_is_deterministic_across_passes() {
    let build = || {
        let dir = tempfile::tempdir().unwrap();
        let mut module = Module::new(Target::c99());
        module.add_function(sum2("f1"));
        module.add_function(double0("f2"));
        module.compile_to_source(&dir.path().join("base")).unwrap();
        (module.source().to_string(), module.header().to_string())
    };
    assert_eq!(build(), build());
}

#[test]
fn c99_compile_produces_artifacts_and_resolves_symbols() {
    let mut module = Module::new(Target::c99());
    module.add_function(sum2("f1"));
    module.add_function(double0("f2"));

    let artifact = module.compile().expect("cc must be available for this test");
    assert!(artifact.exists());

    let dir = module.working_dir().unwrap();
    let base = module.base_name().unwrap().to_string();
    for suffix in [".c", ".h", "_shims.c", ".so"] {
        let path = dir.join(format!("{base}{suffix}"));
        assert!(path.exists(), "missing artifact {}", path.display());
    }

    assert!(module.get_func_ptr("f1").is_some());
    assert!(module.get_func_ptr("f2").is_some());
    assert!(module.get_func_ptr("_shim_f1").is_some());
    assert!(module.get_func_ptr("not_registered").is_none());
}

#[test]
fn packed_dispatch_computes_through_the_shim() {
    let mut module = Module::new(Target::c99());
    module.add_function(sum2("f1"));
    module.compile().expect("cc must be available for this test");

    let mut out_vals = [0.0f64];
    let mut out_dim = 0i32;
    let mut out = TalcTensor::vector(&mut out_vals, &mut out_dim);

    let mut in_vals = [3.0f64, 4.0];
    let mut in_dim = 0i32;
    let mut input = TalcTensor::vector(&mut in_vals, &mut in_dim);

    let mut args = [&raw mut out as *mut c_void, &raw mut input as *mut c_void];
    let status = unsafe { module.call_packed("_shim_f1", &mut args) }.unwrap();

    assert_eq!(status, 0);
    assert_eq!(out_vals[0], 7.0);
}

#[test]
fn dispatch_without_compile_is_recoverable() {
    let module = Module::new(Target::c99());
    assert!(module.get_func_ptr("f1").is_none());

    let mut args: [*mut c_void; 0] = [];
    let err = unsafe { module.call_packed("f1", &mut args) }.unwrap_err();
    assert!(matches!(err, Error::NotLoaded));
}

#[test]
fn missing_symbol_dispatch_is_function_not_found() {
    let mut module = Module::new(Target::c99());
    module.add_function(sum2("f1"));
    module.compile().expect("cc must be available for this test");

    let mut args: [*mut c_void; 0] = [];
    let err = unsafe { module.call_packed("_shim_nope", &mut args) }.unwrap_err();
    assert!(matches!(err, Error::FunctionNotFound { .. }));
}

#[test]
fn recompile_picks_up_replaced_definition() {
    let mut module = Module::new(Target::c99());
    module.add_function(sum2("f1"));
    module.compile().expect("cc must be available for this test");

    module.add_function(double0("f1"));
    module.compile().expect("recompile under the same base name");

    let mut out_vals = [0.0f64];
    let mut out_dim = 0i32;
    let mut out = TalcTensor::vector(&mut out_vals, &mut out_dim);
    let mut in_vals = [3.0f64, 4.0];
    let mut in_dim = 0i32;
    let mut input = TalcTensor::vector(&mut in_vals, &mut in_dim);

    let mut args = [&raw mut out as *mut c_void, &raw mut input as *mut c_void];
    unsafe { module.call_packed("_shim_f1", &mut args) }.unwrap();
    assert_eq!(out_vals[0], 6.0);
}

#[test]
fn nonexistent_compiler_is_fatal_with_command_and_no_artifact() {
    let target = Target::c99().with_compiler("/nonexistent/talc-cc-missing", "TALC_TEST_UNSET_VAR");
    let mut module = Module::new(target);
    module.add_function(sum2("f1"));

    let err = module.compile().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("/nonexistent/talc-cc-missing"), "unexpected error: {msg}");

    let dir = module.working_dir().unwrap();
    let base = module.base_name().unwrap();
    assert!(!dir.join(format!("{base}.so")).exists());
}

#[test]
fn nonzero_compiler_exit_reports_exit_code() {
    // `false` accepts any arguments and exits 1.
    let target = Target::c99().with_compiler("false", "TALC_TEST_UNSET_VAR");
    let mut module = Module::new(target);
    module.add_function(sum2("f1"));

    match module.compile().unwrap_err() {
        Error::ToolchainFailed { command, code, .. } => {
            assert!(command.starts_with("false "));
            assert_eq!(code, 1);
        }
        other => panic!("expected ToolchainFailed, got {other}"),
    }
}

#[test]
fn cuda_toggle_switches_toolchain_and_generated_files() {
    let mut module = Module::new(Target::cuda());
    module.add_function(sum2("f1"));

    // nvcc is not assumed installed; whether the build fails at spawn or
    // at compile, the generated inputs must already be CUDA-flavored.
    let result = module.compile();
    if let Err(err) = result {
        assert!(err.to_string().contains("nvcc"), "unexpected error: {err}");
    }

    let dir = module.working_dir().unwrap();
    let base = module.base_name().unwrap().to_string();
    assert!(dir.join(format!("{base}.cu")).exists());
    assert!(dir.join(format!("{base}_shims.cpp")).exists());
    assert!(!dir.join(format!("{base}.c")).exists());
    assert!(module.source().contains("extern \"C\" int f1"));
}

#[test]
fn x86_lowering_serializes_module_and_header() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("base");
    let mut module = Module::new(Target::x86());
    module.add_function(sum2("f1"));
    module.add_function(double0("f2"));

    module.compile_to_source(&prefix).unwrap();

    let bitcode = std::fs::read_to_string(dir.path().join("base.bc")).unwrap();
    assert_eq!(bitcode.matches("%talc_tensor_t = type").count(), 1);
    assert!(bitcode.contains("define i32 @f1"));
    assert!(bitcode.contains("define i32 @f2"));
    assert!(module.header().contains("TALC_EXTERN int f1"));
    // The text-source buffer plays no part in the lowering path.
    assert_eq!(module.source(), "");
}

#[test]
fn cuda_with_x86_arch_is_unsupported() {
    let mut target = Target::x86();
    target.cuda = true;
    let mut module = Module::new(target);
    assert!(matches!(module.compile().unwrap_err(), Error::UnsupportedTarget { .. }));
}

#[test]
fn static_library_output_is_unsupported() {
    let mut module = Module::new(Target::c99());
    let err = module.compile_to_static_library().unwrap_err();
    assert!(err.to_string().contains("not supported"));
}

#[test]
fn compiler_env_override_wins() {
    // SAFETY: the variable is unique to this test.
    unsafe { std::env::set_var("TALC_TEST_CC_OVERRIDE", "my-cc") };
    let target = Target::c99().with_compiler("cc", "TALC_TEST_CC_OVERRIDE");
    let cmd = toolchain::link_command(&target, Path::new("/tmp/x"));
    assert_eq!(cmd.program, "my-cc");
}

#[test]
fn base_name_is_twelve_lowercase_alphanumerics() {
    let mut module = Module::new(Target::c99());
    module.add_function(sum2("f1"));
    let dir = tempfile::tempdir().unwrap();
    // compile_to_source does not assign the name; compile() does. Drive
    // just the naming through a failing build to avoid needing cc here.
    let _ = module.compile_to_source(&dir.path().join("base"));
    assert!(module.base_name().is_none());

    let target = Target::c99().with_compiler("false", "TALC_TEST_UNSET_VAR");
    let mut module = Module::new(target);
    module.add_function(sum2("f1"));
    let _ = module.compile();

    let base = module.base_name().unwrap();
    assert_eq!(base.len(), 12);
    assert!(base.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}
