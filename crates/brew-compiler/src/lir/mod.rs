//! Low IR
//!
//! Stack-machine operations grouped into blocks. Blocks live in a per-method
//! arena and are emitted in layout order; a block without a terminator falls
//! through to the next one.

mod block;
mod class;
mod method;
mod op;

pub use block::{Block, BlockId, Body};
pub use class::{ClassBuilder, Field};
pub(crate) use class::ClassHeader;
pub use method::{Method, MethodState};
pub use op::{
    array_load_opcode, array_store_opcode, class_constant_name, negate_opcode, newarray_code,
    ArrayLiteral, ArrayValues, InvokeKind, JumpCond, MemberRef, Op, Owner, VarRef,
    MAX_ARRAY_LITERAL_LEN,
};
