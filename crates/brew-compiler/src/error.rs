//! Compilation errors

use crate::lir::BlockId;
use brew_bytecode::{ClassFileError, ConstantPoolError, VerifyError};
use brew_types::TypeError;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Type check failed: {0}")]
    TypeCheck(#[from] TypeError),

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Duplicate variable: {name}")]
    DuplicateVariable { name: String },

    #[error("Invalid jump opcode {opcode:#04x}")]
    InvalidJump { opcode: u8 },

    #[error("Negative local variable slot {slot}")]
    NegativeSlot { slot: i32 },

    #[error("Unknown block {block}")]
    UnknownBlock { block: BlockId },

    #[error("Incomplete switch: {reason}")]
    IncompleteSwitch { reason: String },

    #[error("Duplicate switch case {key}")]
    DuplicateCase { key: i32 },

    #[error("Invalid break statement (not in loop)")]
    InvalidBreak,

    #[error("Invalid continue statement (not in loop)")]
    InvalidContinue,

    #[error("Array literal has {len} elements (max {max})")]
    ArrayLiteralTooLarge { len: usize, max: usize },

    #[error("Method {method} is too large: {size} bytes (max 65535)")]
    MethodTooLarge { method: String, size: usize },

    #[error("Jump offset {offset} too large")]
    JumpTooLarge { offset: i64 },

    #[error("Too many local variables (max 65535)")]
    TooManyLocals,

    #[error("Constant pool error: {0}")]
    ConstantPool(#[from] ConstantPoolError),

    #[error("Class file error: {0}")]
    ClassFile(#[from] ClassFileError),

    #[error("Bytecode verification failed: {0}")]
    Verification(#[from] VerifyError),

    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },

    #[error("Invalid compiler options: {message}")]
    InvalidOptions { message: String },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}

impl CompileError {
    pub(crate) fn unsupported(feature: impl Into<String>) -> Self {
        CompileError::UnsupportedFeature {
            feature: feature.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        CompileError::InternalError {
            message: message.into(),
        }
    }
}

/// Failure to compile a class, tagged with the class name
#[derive(Debug, Error)]
#[error("Failed to compile class {class}: {source}")]
pub struct ClassCompileError {
    pub class: String,
    #[source]
    pub source: CompileError,
}
