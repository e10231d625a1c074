//! Control flow lowering: conditional chains, loops, switches and guards

use super::Lowerer;
use crate::error::{CompileError, CompileResult};
use crate::hir::{BinaryOp, CaseKey, Conditional, Expr, Literal, Loop, Switch, UnaryOp};
use crate::lir::{BlockId, JumpCond, Op};
use brew_bytecode::Opcode;
use brew_types::{Type, ValueKind};

/// Break and continue targets of the enclosing loops
pub(super) struct LoopStack {
    loops: Vec<LoopContext>,
}

struct LoopContext {
    break_target: BlockId,
    continue_target: BlockId,
}

impl LoopStack {
    pub fn new() -> Self {
        Self { loops: Vec::new() }
    }

    pub fn push(&mut self, break_target: BlockId, continue_target: BlockId) {
        self.loops.push(LoopContext {
            break_target,
            continue_target,
        });
    }

    pub fn pop(&mut self) {
        self.loops.pop();
    }

    pub fn break_target(&self) -> Option<BlockId> {
        self.loops.last().map(|ctx| ctx.break_target)
    }

    pub fn continue_target(&self) -> Option<BlockId> {
        self.loops.last().map(|ctx| ctx.continue_target)
    }
}

/// Whether sorted keys form one contiguous run with step 1
pub fn is_dense(keys: &[i32]) -> bool {
    !keys.is_empty()
        && keys
            .windows(2)
            .all(|pair| i64::from(pair[1]) - i64::from(pair[0]) == 1)
}

impl<'a> Lowerer<'a> {
    pub(super) fn lower_conditional(&mut self, cond: &Conditional) -> CompileResult<()> {
        let exit = self.reserve("if.exit")?;
        let count = cond.branches.len();
        for (i, branch) in cond.branches.iter().enumerate() {
            let next = if i + 1 == count && cond.otherwise.is_none() {
                exit
            } else {
                self.reserve("if.else")?
            };
            self.branch(&branch.condition, false, next)?;

            let then = self.reserve("if.then")?;
            self.start_block(then)?;
            self.lower_block(&branch.body)?;
            if next != exit {
                if !self.is_terminated() {
                    self.emit(Op::goto(exit))?;
                }
                self.start_block(next)?;
            }
        }
        if let Some(otherwise) = &cond.otherwise {
            self.lower_block(otherwise)?;
        }
        self.start_block(exit)
    }

    pub(super) fn lower_loop(&mut self, lp: &Loop) -> CompileResult<()> {
        let head = self.reserve("loop.cond")?;
        let exit = self.reserve("loop.exit")?;

        self.start_block(head)?;
        if let Some(condition) = &lp.condition {
            self.branch(condition, false, exit)?;
        }

        let body = self.reserve("loop.body")?;
        self.start_block(body)?;
        self.loops.push(exit, head);
        let lowered = self.lower_block(&lp.body);
        self.loops.pop();
        lowered?;
        if !self.is_terminated() {
            self.emit(Op::goto(head))?;
        }

        self.start_block(exit)
    }

    pub(super) fn lower_switch(&mut self, switch: &Switch) -> CompileResult<()> {
        if !switch.is_complete() {
            let reason = if switch.cases.is_empty() {
                "no cases"
            } else {
                "missing or empty default"
            };
            return Err(CompileError::IncompleteSwitch {
                reason: reason.to_string(),
            });
        }
        if switch.has_string_keys() {
            return Err(CompileError::unsupported("switch on string keys"));
        }

        // (key, case index) sorted by key
        let mut keyed: Vec<(i32, usize)> = switch
            .cases
            .iter()
            .enumerate()
            .filter_map(|(i, case)| match case.key {
                CaseKey::Int(key) => Some((key, i)),
                CaseKey::String(_) => None,
            })
            .collect();
        keyed.sort_by_key(|&(key, _)| key);
        if let Some(pair) = keyed.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(CompileError::DuplicateCase { key: pair[0].0 });
        }

        self.lower_expr(&switch.scrutinee)?;

        let case_blocks = switch
            .cases
            .iter()
            .map(|_| self.reserve("switch.case"))
            .collect::<CompileResult<Vec<_>>>()?;
        let default = self.reserve("switch.default")?;
        let exit = self.reserve("switch.exit")?;

        let keys: Vec<i32> = keyed.iter().map(|&(key, _)| key).collect();
        if is_dense(&keys) {
            self.emit(Op::TableSwitch {
                low: keys[0],
                targets: keyed.iter().map(|&(_, i)| case_blocks[i]).collect(),
                default,
            })?;
        } else {
            self.emit(Op::LookupSwitch {
                pairs: keyed.iter().map(|&(key, i)| (key, case_blocks[i])).collect(),
                default,
            })?;
        }

        for (case, &block) in switch.cases.iter().zip(&case_blocks) {
            self.start_block(block)?;
            self.lower_block(&case.body)?;
            if !self.is_terminated() {
                self.emit(Op::goto(exit))?;
            }
        }

        self.start_block(default)?;
        if let Some(body) = &switch.default {
            self.lower_block(body)?;
        }
        self.start_block(exit)
    }

    /// Jump to `target` when `cond` evaluates to `when`, else fall through.
    ///
    /// Guards are lowered with `when == false`, giving the negated jump
    /// around the guarded code.
    pub(super) fn branch(&mut self, cond: &Expr, when: bool, target: BlockId) -> CompileResult<()> {
        match cond {
            Expr::Literal(Literal::Boolean(value)) => {
                if *value == when {
                    self.emit(Op::goto(target))?;
                }
                Ok(())
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.branch(operand, !when, target),
            Expr::Binary { op, left, right } if op.is_comparison() => {
                let cond = self.lower_comparison(*op, left, right)?;
                let cond = if when { cond } else { cond.negate() };
                self.emit(Op::jump_if(cond, target))
            }
            _ => {
                self.lower_expr(cond)?;
                let cond = if when { JumpCond::Ne } else { JumpCond::Eq };
                self.emit(Op::jump_if(cond, target))
            }
        }
    }

    /// Push the operands of a comparison and return the jump condition that
    /// holds when the comparison is true.
    ///
    /// Float and double use `*cmpg` for `<`/`<=` and `*cmpl` otherwise, so
    /// that a NaN operand makes every ordered comparison false under either
    /// polarity of the jump.
    fn lower_comparison(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> CompileResult<JumpCond> {
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) && (left.is_null() || right.is_null()) {
            let other = if right.is_null() { left } else { right };
            self.lower_expr(other)?;
            return Ok(if op == BinaryOp::Eq {
                JumpCond::Null
            } else {
                JumpCond::NonNull
            });
        }

        let ty = self.lower_expr(left)?;
        self.lower_expr(right)?;
        match ty.value_kind()? {
            ValueKind::Int => Ok(int_comparison(op)),
            ValueKind::Long => {
                self.emit(Op::Raw(Opcode::Lcmp))?;
                Ok(zero_comparison(op))
            }
            ValueKind::Float => {
                let opcode = if matches!(op, BinaryOp::Lt | BinaryOp::Le) {
                    Opcode::Fcmpg
                } else {
                    Opcode::Fcmpl
                };
                self.emit(Op::Raw(opcode))?;
                Ok(zero_comparison(op))
            }
            ValueKind::Double => {
                let opcode = if matches!(op, BinaryOp::Lt | BinaryOp::Le) {
                    Opcode::Dcmpg
                } else {
                    Opcode::Dcmpl
                };
                self.emit(Op::Raw(opcode))?;
                Ok(zero_comparison(op))
            }
            ValueKind::Reference => match op {
                BinaryOp::Eq => Ok(JumpCond::AcmpEq),
                BinaryOp::Ne => Ok(JumpCond::AcmpNe),
                _ => Err(CompileError::unsupported(format!(
                    "ordered comparison {} on {}",
                    op.symbol(),
                    ty
                ))),
            },
            ValueKind::Void => Err(CompileError::internal("comparison of void values")),
        }
    }

    /// Materialize a comparison as 0 or 1
    pub(super) fn lower_condition_value(&mut self, cond: &Expr) -> CompileResult<Type> {
        let is_false = self.reserve("cmp.false")?;
        let done = self.reserve("cmp.done")?;
        self.branch(cond, false, is_false)?;

        let is_true = self.reserve("cmp.true")?;
        self.start_block(is_true)?;
        self.emit(Op::PushInt(1))?;
        self.emit(Op::goto(done))?;

        self.start_block(is_false)?;
        self.emit(Op::PushInt(0))?;

        self.start_block(done)?;
        Ok(Type::BOOLEAN)
    }
}

fn int_comparison(op: BinaryOp) -> JumpCond {
    match op {
        BinaryOp::Eq => JumpCond::IcmpEq,
        BinaryOp::Ne => JumpCond::IcmpNe,
        BinaryOp::Lt => JumpCond::IcmpLt,
        BinaryOp::Le => JumpCond::IcmpLe,
        BinaryOp::Gt => JumpCond::IcmpGt,
        _ => JumpCond::IcmpGe,
    }
}

/// Condition on the result of `lcmp`/`fcmp*`/`dcmp*`
fn zero_comparison(op: BinaryOp) -> JumpCond {
    match op {
        BinaryOp::Eq => JumpCond::Eq,
        BinaryOp::Ne => JumpCond::Ne,
        BinaryOp::Lt => JumpCond::Lt,
        BinaryOp::Le => JumpCond::Le,
        BinaryOp::Gt => JumpCond::Gt,
        _ => JumpCond::Ge,
    }
}
