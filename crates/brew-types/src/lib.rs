//! Brew Type System
//!
//! Type representation, descriptors, and unification for the Brew class-file
//! compiler.

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod ty;
pub mod unify;

pub use context::TypeEnv;
pub use error::TypeError;
pub use ty::{
    next_type_var_id, reset_type_var_counter, MethodDescriptor, PrimitiveType, Type, TypeVar,
    ValueKind,
};
pub use unify::{unifiable, unify};
