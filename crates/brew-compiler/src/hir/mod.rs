//! High IR
//!
//! Typed expression and statement trees as callers build them. Methods own
//! their statements until `resolve` infers types and lowers them into
//! blocks.

mod expr;
mod stmt;
mod vars;

pub use expr::{BinaryOp, Expr, Literal, UnaryOp};
pub use stmt::{Branch, CaseKey, Conditional, Loop, Stmt, Switch, SwitchCase};
pub use vars::Vars;
