//! Type inference
//!
//! Walks high IR once, unifying as it goes. Declared variable types and the
//! types recorded in the environment share inference variables, so binding
//! one during the walk resolves every use.

use crate::error::{CompileError, CompileResult};
use crate::hir::{BinaryOp, Expr, Stmt, UnaryOp, Vars};
use brew_types::{unify, Type, TypeEnv, TypeError};

/// Inference state for one method body
pub struct TypeChecker<'a> {
    env: TypeEnv,
    class_name: &'a str,
    return_type: &'a Type,
    vars: Option<&'a Vars>,
    is_static: bool,
}

impl<'a> TypeChecker<'a> {
    pub fn new(
        class_name: &'a str,
        return_type: &'a Type,
        vars: Option<&'a Vars>,
        is_static: bool,
    ) -> Self {
        let mut env = TypeEnv::new();
        if let Some(vars) = vars {
            for (_, name, ty) in vars.iter() {
                env.insert(name, ty.clone());
            }
        }
        Self {
            env,
            class_name,
            return_type,
            vars,
            is_static,
        }
    }

    /// Pair the argument types with the first declared variables
    pub fn seed_arguments(&mut self, params: &[Type]) -> CompileResult<()> {
        let Some(vars) = self.vars else {
            return Ok(());
        };
        for (i, param) in params.iter().enumerate() {
            if let Some(declared) = vars.type_at(i + 1) {
                unify(param, declared)?;
            }
        }
        Ok(())
    }

    pub fn env(&self) -> &TypeEnv {
        &self.env
    }

    pub fn infer_block(&mut self, stmts: &[Stmt]) -> CompileResult<()> {
        for stmt in stmts {
            self.infer_stmt(stmt)?;
        }
        Ok(())
    }

    /// Check a statement. Only `return` statements have a type.
    pub fn infer_stmt(&mut self, stmt: &Stmt) -> CompileResult<Option<Type>> {
        match stmt {
            Stmt::Expr(expr) => {
                self.infer_expr(expr)?;
            }
            Stmt::Assign { name, value } => {
                let ty = self.infer_expr(value)?;
                self.check_declared(name)?;
                self.env.unify_binding(name, &ty)?;
            }
            Stmt::Increment { name, .. } => {
                self.check_declared(name)?;
                self.env.unify_binding(name, &Type::INT)?;
            }
            // Writes to fields and array elements are not checked against
            // the destination type
            Stmt::SetField { object, value, .. } => {
                self.infer_expr(object)?;
                self.infer_expr(value)?;
            }
            Stmt::SetStatic { value, .. } => {
                self.infer_expr(value)?;
            }
            Stmt::ArraySet {
                array,
                index,
                value,
            } => {
                self.infer_expr(array)?;
                self.infer_expr(index)?;
                self.infer_expr(value)?;
            }
            Stmt::If(cond) => {
                for branch in &cond.branches {
                    self.infer_condition(&branch.condition)?;
                    self.infer_block(&branch.body)?;
                }
                if let Some(otherwise) = &cond.otherwise {
                    self.infer_block(otherwise)?;
                }
            }
            Stmt::Loop(lp) => {
                if let Some(condition) = &lp.condition {
                    self.infer_condition(condition)?;
                }
                self.infer_block(&lp.body)?;
            }
            Stmt::Switch(switch) => {
                let scrutinee = self.infer_expr(&switch.scrutinee)?;
                if !switch.has_string_keys() {
                    unify(&Type::INT, &scrutinee)?;
                }
                for case in &switch.cases {
                    self.infer_block(&case.body)?;
                }
                if let Some(default) = &switch.default {
                    self.infer_block(default)?;
                }
            }
            Stmt::Return(expr) => {
                let ty = self.infer_expr(expr)?;
                unify(self.return_type, &ty)?;
                return Ok(Some(ty.prune()));
            }
            Stmt::ReturnVoid => {
                unify(self.return_type, &Type::VOID)?;
            }
            Stmt::Continue | Stmt::Break => {}
        }
        Ok(None)
    }

    fn infer_condition(&mut self, condition: &Expr) -> CompileResult<()> {
        let ty = self.infer_expr(condition)?;
        unify(&Type::BOOLEAN, &ty)?;
        Ok(())
    }

    pub fn infer_expr(&mut self, expr: &Expr) -> CompileResult<Type> {
        let ty = match expr {
            Expr::Literal(lit) => lit.ty(),
            Expr::Var { name, ty } => {
                self.check_declared(name)?;
                self.env.unify_binding(name, ty)?
            }
            Expr::Binary { op, left, right } => self.infer_binary(*op, left, right)?,
            Expr::Unary { op, operand } => {
                let ty = self.infer_expr(operand)?;
                match op {
                    UnaryOp::Not => {
                        unify(&Type::BOOLEAN, &ty)?;
                        Type::BOOLEAN
                    }
                    UnaryOp::Neg => ty.prune(),
                }
            }
            Expr::Call {
                kind,
                descriptor,
                args,
                ..
            } => {
                let receiver = kind.has_receiver() as usize;
                self.infer_arguments(&descriptor.params, args, receiver)?;
                descriptor.ret.clone()
            }
            Expr::New {
                class,
                descriptor,
                args,
            } => {
                self.infer_arguments(&descriptor.params, args, 0)?;
                Type::reference(class.resolve(self.class_name))
            }
            Expr::Cast { expr, to } => {
                self.infer_expr(expr)?;
                to.clone()
            }
            Expr::GetField { object, ty, .. } => {
                self.infer_expr(object)?;
                ty.clone()
            }
            Expr::GetStatic { ty, .. } => ty.clone(),
            Expr::ArrayGet { array, index } => {
                let array = self.infer_expr(array)?;
                let element = Type::fresh_var();
                unify(&Type::array(element.clone()), &array)?;
                let index = self.infer_expr(index)?;
                unify(&Type::INT, &index)?;
                element.prune()
            }
            Expr::ArrayLength(array) => {
                let array = self.infer_expr(array)?;
                unify(&Type::array(Type::fresh_var()), &array)?;
                Type::INT
            }
            Expr::NewArray { element, length } => {
                let length = self.infer_expr(length)?;
                unify(&Type::INT, &length)?;
                Type::array(element.clone())
            }
            Expr::ArrayLiteral(lit) => lit.ty(),
            Expr::This => {
                if self.is_static {
                    return Err(CompileError::unsupported("`this` in a static method"));
                }
                Type::reference(self.class_name)
            }
        };
        Ok(ty)
    }

    fn infer_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> CompileResult<Type> {
        let left = self.infer_expr(left)?;
        let right = self.infer_expr(right)?;
        if op.is_shift() {
            // The shift distance is an int even when shifting a long
            unify(&Type::INT, &right)?;
            return Ok(left.prune());
        }
        unify(&left, &right)?;
        if op.is_comparison() {
            Ok(Type::BOOLEAN)
        } else {
            Ok(left.prune())
        }
    }

    fn infer_arguments(&mut self, params: &[Type], args: &[Expr], receiver: usize) -> CompileResult<()> {
        if args.len() != params.len() + receiver {
            return Err(TypeError::Mismatch {
                expected: format!("{} arguments", params.len() + receiver),
                actual: format!("{} arguments", args.len()),
            }
            .into());
        }
        for (i, arg) in args.iter().enumerate() {
            let ty = self.infer_expr(arg)?;
            if i >= receiver {
                unify(&params[i - receiver], &ty)?;
            }
        }
        Ok(())
    }

    fn check_declared(&self, name: &str) -> CompileResult<()> {
        match self.vars {
            Some(vars) => vars.index_of(name).map(|_| ()),
            None => Err(CompileError::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }
}
