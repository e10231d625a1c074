//! Brew Class File Definitions
//!
//! This crate provides the JVM instruction set, the constant pool, the class
//! file model with its binary encoding, and a structural verifier.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class;
pub mod constants;
pub mod encoder;
pub mod opcode;
pub mod verify;

pub use class::{
    access, Attribute, ClassFile, ClassFileError, Code, ExceptionHandler, FieldInfo, MethodInfo,
    DEFAULT_MAJOR_VERSION, MAGIC, MAX_CODE_LENGTH,
};
pub use constants::{Constant, ConstantPool, ConstantPoolError, MemberRef};
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use opcode::Opcode;
pub use verify::{
    decode_instructions, field_slots, method_slots, verify_class, verify_code, Instruction,
    Operand, VerifyError,
};
