//! Brew Compiler - typed IR to JVM class files
//!
//! Methods are written as typed statements (`hir`), checked by
//! unification (`infer`), lowered into blocks of stack operations (`lir`,
//! `lower`), pruned of unreachable private methods (`dce`) and encoded as
//! class file bytes (`emit`).

pub mod dce;
mod emit;
pub mod error;
pub mod hir;
pub mod infer;
pub mod lir;
pub mod lower;
pub mod options;
pub mod pretty;

pub use dce::{eliminate_dead_methods, DeadMethodEliminator};
pub use error::{ClassCompileError, CompileError, CompileResult};
pub use hir::{
    BinaryOp, Branch, CaseKey, Conditional, Expr, Literal, Loop, Stmt, Switch, SwitchCase,
    UnaryOp, Vars,
};
pub use infer::TypeChecker;
pub use lir::{
    negate_opcode, ArrayLiteral, ArrayValues, Block, BlockId, Body, ClassBuilder, Field,
    InvokeKind, JumpCond, MemberRef, Method, MethodState, Op, Owner, VarRef,
    MAX_ARRAY_LITERAL_LEN,
};
pub use lower::is_dense;
pub use options::CompilerOptions;
pub use pretty::{cfg_dot, PrettyPrint};

// Re-export the type and class file layers for convenience
pub use brew_bytecode::{ClassFile, Opcode};
pub use brew_types::{MethodDescriptor, PrimitiveType, Type};
