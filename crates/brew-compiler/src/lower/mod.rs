//! High IR to block IR lowering
//!
//! Runs after type inference, so every expression type it asks for is
//! already resolved. Statements are appended to the current block; control
//! constructs reserve their target blocks up front and place them in layout
//! order as lowering reaches them.

mod control_flow;
mod expr;

pub use control_flow::is_dense;

use crate::error::{CompileError, CompileResult};
use crate::hir::{Stmt, Vars};
use crate::lir::{array_store_opcode, Block, BlockId, Body, MemberRef, Op, VarRef};
use brew_types::{Type, ValueKind};
use control_flow::LoopStack;
use log::trace;

/// Lowers one method's statements into its block body
pub(crate) struct Lowerer<'a> {
    body: &'a mut Body,
    vars: Option<&'a Vars>,
    return_type: &'a Type,
    class_name: &'a str,
    is_static: bool,
    /// Block receiving ops; `None` until the first statement
    current: Option<BlockId>,
    loops: LoopStack,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        body: &'a mut Body,
        vars: Option<&'a Vars>,
        return_type: &'a Type,
        class_name: &'a str,
        is_static: bool,
    ) -> Self {
        let current = body.last();
        Self {
            body,
            vars,
            return_type,
            class_name,
            is_static,
            current,
            loops: LoopStack::new(),
        }
    }

    /// Lower a statement list. Statements after a terminator are dead and
    /// are not lowered.
    pub fn lower_block(&mut self, stmts: &[Stmt]) -> CompileResult<()> {
        if stmts.is_empty() {
            return Ok(());
        }
        if self.current.is_none() {
            self.current = Some(self.body.new_block());
        }
        for stmt in stmts {
            if self.is_terminated() {
                trace!("skipping unreachable statements in {}", self.current_block()?);
                break;
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    /// Append the implicit `return` of a void method
    pub fn finish(&mut self) -> CompileResult<()> {
        if !self.return_type.is_void() {
            return Ok(());
        }
        let last = match self.body.last() {
            Some(id) => id,
            None => self.body.new_block(),
        };
        let block = self.body.block_mut(last)?;
        if !block.is_terminated() {
            trace!("implicit return at end of {}", last);
            block.push(Op::ReturnVoid);
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Expr(expr) => {
                let ty = self.lower_expr(expr)?;
                self.discard(&ty)
            }
            Stmt::Assign { name, value } => {
                self.lower_expr(value)?;
                let ty = self.var_type(name)?;
                self.emit(Op::store(name.as_str(), ty))
            }
            Stmt::Increment { name, delta } => {
                self.var_type(name)?;
                self.emit(Op::Increment {
                    var: VarRef::Named(name.clone()),
                    delta: *delta,
                })
            }
            Stmt::SetField {
                object,
                owner,
                name,
                ty,
                value,
            } => {
                self.lower_expr(object)?;
                self.lower_expr(value)?;
                let field = MemberRef::new(owner.clone(), name.clone(), ty.descriptor()?);
                self.emit(Op::PutField(field))
            }
            Stmt::SetStatic {
                owner,
                name,
                ty,
                value,
            } => {
                self.lower_expr(value)?;
                let field = MemberRef::new(owner.clone(), name.clone(), ty.descriptor()?);
                self.emit(Op::PutStatic(field))
            }
            Stmt::ArraySet {
                array,
                index,
                value,
            } => {
                let array_ty = self.lower_expr(array)?;
                self.lower_expr(index)?;
                self.lower_expr(value)?;
                let element = element_type(&array_ty)?;
                let opcode = array_store_opcode(&element)
                    .ok_or_else(|| CompileError::internal(format!("no array store for {}", element)))?;
                self.emit(Op::Raw(opcode))
            }
            Stmt::If(cond) => self.lower_conditional(cond),
            Stmt::Loop(lp) => self.lower_loop(lp),
            Stmt::Switch(switch) => self.lower_switch(switch),
            Stmt::Return(expr) => {
                self.lower_expr(expr)?;
                self.emit(Op::Return {
                    ty: self.return_type.resolve(),
                })
            }
            Stmt::ReturnVoid => self.emit(Op::ReturnVoid),
            Stmt::Continue => {
                let target = self.loops.continue_target().ok_or(CompileError::InvalidContinue)?;
                self.emit(Op::goto(target))
            }
            Stmt::Break => {
                let target = self.loops.break_target().ok_or(CompileError::InvalidBreak)?;
                self.emit(Op::goto(target))
            }
        }
    }

    /// Drop an expression statement's value ("container semantics")
    fn discard(&mut self, ty: &Type) -> CompileResult<()> {
        match ty.value_kind()? {
            ValueKind::Void => Ok(()),
            ValueKind::Long | ValueKind::Double => self.emit(Op::Raw(brew_bytecode::Opcode::Pop2)),
            _ => self.emit(Op::Raw(brew_bytecode::Opcode::Pop)),
        }
    }

    /// Resolved declared type of a variable
    fn var_type(&self, name: &str) -> CompileResult<Type> {
        let vars = self.vars.ok_or_else(|| CompileError::UndefinedVariable {
            name: name.to_string(),
        })?;
        let ty = vars.type_of(name)?.resolve();
        ty.value_kind()?;
        Ok(ty)
    }

    // ===== Block management =====

    fn current_block(&self) -> CompileResult<BlockId> {
        self.current
            .ok_or_else(|| CompileError::internal("lowering outside of a block"))
    }

    fn emit(&mut self, op: Op) -> CompileResult<()> {
        let current = self.current_block()?;
        self.body.block_mut(current)?.push(op);
        Ok(())
    }

    fn is_terminated(&self) -> bool {
        self.current
            .and_then(|id| self.body.block(id).ok())
            .map_or(false, Block::is_terminated)
    }

    /// Reserve a jump target that is placed later
    fn reserve(&mut self, label: &str) -> CompileResult<BlockId> {
        let id = self.body.reserve_block();
        self.body.block_mut(id)?.set_label(label);
        Ok(id)
    }

    /// Place a reserved block at the end of the layout and continue there
    fn start_block(&mut self, id: BlockId) -> CompileResult<()> {
        self.body.place_block(id)?;
        trace!("lowering into {}", id);
        self.current = Some(id);
        Ok(())
    }
}

/// Element type of an array type
fn element_type(array: &Type) -> CompileResult<Type> {
    match array.prune() {
        Type::Array(element) => Ok(element.resolve()),
        other => Err(CompileError::internal(format!(
            "array access on non-array type {}",
            other
        ))),
    }
}
