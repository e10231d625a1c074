//! Methods: signature, pending statements and the lowered block body

use crate::error::{CompileError, CompileResult};
use crate::hir::{Stmt, Vars};
use crate::infer::TypeChecker;
use crate::lir::{Block, BlockId, Body};
use crate::lower::Lowerer;
use brew_bytecode::access;
use brew_types::{MethodDescriptor, Type};
use log::debug;

/// Lifecycle of a method: statements are lowered once, emitted once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodState {
    Unresolved,
    Resolved,
    Emitted,
}

#[derive(Debug, Clone)]
pub struct Method {
    name: String,
    params: Vec<Type>,
    ret: Type,
    access: u16,
    vars: Option<Vars>,
    body: Body,
    pending: Vec<Stmt>,
    state: MethodState,
}

impl Method {
    /// Public instance method
    pub fn new(name: impl Into<String>, params: Vec<Type>, ret: Type) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            access: access::ACC_PUBLIC,
            vars: None,
            body: Body::new(),
            pending: Vec::new(),
            state: MethodState::Unresolved,
        }
    }

    pub fn with_access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    /// Declare the variable table. The first variables name the arguments.
    pub fn with_vars(mut self, vars: Vars) -> Self {
        self.vars = Some(vars);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn params(&self) -> &[Type] {
        &self.params
    }

    pub fn return_type(&self) -> &Type {
        &self.ret
    }

    pub fn access(&self) -> u16 {
        self.access
    }

    pub fn set_access(&mut self, access: u16) -> &mut Self {
        self.access = access;
        self
    }

    pub fn set_vars(&mut self, vars: Vars) -> &mut Self {
        self.vars = Some(vars);
        self
    }

    pub fn vars(&self) -> Option<&Vars> {
        self.vars.as_ref()
    }

    pub fn is_static(&self) -> bool {
        self.access & access::ACC_STATIC != 0
    }

    /// Abstract and native methods carry no code
    pub fn has_code(&self) -> bool {
        self.access & (access::ACC_ABSTRACT | access::ACC_NATIVE) == 0
    }

    pub fn state(&self) -> MethodState {
        self.state
    }

    pub fn signature(&self) -> MethodDescriptor {
        MethodDescriptor::new(self.params.clone(), self.ret.clone())
    }

    /// JVM method descriptor; fails while a parameter type is unresolved
    pub fn descriptor(&self) -> CompileResult<String> {
        Ok(self.signature().descriptor()?)
    }

    // ===== High IR =====

    pub fn push_stmt(&mut self, stmt: Stmt) -> &mut Self {
        self.pending.push(stmt);
        self
    }

    pub fn extend_stmts(&mut self, stmts: impl IntoIterator<Item = Stmt>) -> &mut Self {
        self.pending.extend(stmts);
        self
    }

    pub fn pending(&self) -> &[Stmt] {
        &self.pending
    }

    // ===== Low IR =====

    pub fn new_block(&mut self) -> BlockId {
        self.body.new_block()
    }

    pub fn insert_block_after(&mut self, after: BlockId) -> CompileResult<BlockId> {
        self.body.insert_block_after(after)
    }

    pub fn block(&self, id: BlockId) -> CompileResult<&Block> {
        self.body.block(id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> CompileResult<&mut Block> {
        self.body.block_mut(id)
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Infer types for the pending statements, then lower them into blocks.
    ///
    /// Statements are appended after any blocks built directly. Calling
    /// this on an already resolved method does nothing.
    pub fn resolve(&mut self, class_name: &str) -> CompileResult<()> {
        if self.state != MethodState::Unresolved {
            return Ok(());
        }
        if !self.has_code() {
            if !self.pending.is_empty() || !self.body.is_empty() {
                return Err(CompileError::unsupported(format!(
                    "code in abstract or native method {}",
                    self.name
                )));
            }
            self.state = MethodState::Resolved;
            return Ok(());
        }

        let is_static = self.is_static();
        let mut checker = TypeChecker::new(class_name, &self.ret, self.vars.as_ref(), is_static);
        checker.seed_arguments(&self.params)?;
        checker.infer_block(&self.pending)?;

        let stmts = std::mem::take(&mut self.pending);
        let mut lowerer = Lowerer::new(
            &mut self.body,
            self.vars.as_ref(),
            &self.ret,
            class_name,
            is_static,
        );
        lowerer.lower_block(&stmts)?;
        lowerer.finish()?;

        debug!(
            "resolved {}.{}: {} statements into {} blocks",
            class_name,
            self.name,
            stmts.len(),
            self.body.len()
        );
        self.state = MethodState::Resolved;
        Ok(())
    }

    pub(crate) fn mark_emitted(&mut self) {
        self.state = MethodState::Emitted;
    }
}
