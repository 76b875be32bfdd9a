//! Native types crossing the generated-code boundary.

/// Type of a generated function parameter, as seen by native code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    /// Pointer to a `talc_tensor_t` (defined by the runtime prelude).
    Tensor,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl NativeType {
    /// C spelling of this type, matching the runtime prelude.
    pub fn c_repr(self) -> &'static str {
        match self {
            NativeType::Tensor => "talc_tensor_t*",
            NativeType::Int32 => "int32_t",
            NativeType::Int64 => "int64_t",
            NativeType::Float32 => "float",
            NativeType::Float64 => "double",
        }
    }

    /// LLVM IR spelling of this type.
    pub fn llvm_repr(self) -> &'static str {
        match self {
            NativeType::Tensor => "ptr",
            NativeType::Int32 => "i32",
            NativeType::Int64 => "i64",
            NativeType::Float32 => "float",
            NativeType::Float64 => "double",
        }
    }
}

/// A named, typed parameter of a generated function.
///
/// Parameter order is the packed-call slot order: slot `i` of the packed
/// argument array corresponds to `params[i]` of the declared signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: NativeType,
}

impl Param {
    pub fn tensor(name: impl Into<String>) -> Self {
        Self { name: name.into(), ty: NativeType::Tensor }
    }

    pub fn new(name: impl Into<String>, ty: NativeType) -> Self {
        Self { name: name.into(), ty }
    }
}
