//! Operand stack depth analysis
//!
//! Walks the reachable blocks from the entry with a worklist, carrying the
//! depth at each block entry. Every path into a block arrives with the same
//! depth, so each block is visited once.

use crate::error::{CompileError, CompileResult};
use crate::lir::{ArrayLiteral, Body, Op};
use brew_bytecode::{field_slots, method_slots};
use brew_types::Type;
use rustc_hash::FxHashMap;

/// Maximum operand stack depth in slots
pub(crate) fn max_stack(body: &Body) -> CompileResult<u16> {
    let layout = body.layout();
    let Some(&entry) = layout.first() else {
        return Ok(0);
    };

    let mut entry_depth = FxHashMap::default();
    entry_depth.insert(entry, 0i64);
    let mut work = vec![entry];
    let mut max = 0i64;

    while let Some(id) = work.pop() {
        let mut depth = entry_depth[&id];
        let block = body.block(id)?;
        for op in block.ops() {
            let (pops, pushes, peak) = effect(op)?;
            max = max.max(depth + peak);
            depth -= pops;
            if depth < 0 {
                return Err(CompileError::internal(format!(
                    "operand stack underflow at `{:?}` in {}",
                    op, id
                )));
            }
            depth += pushes;
            max = max.max(depth);

            for target in op.targets() {
                if !entry_depth.contains_key(&target) {
                    entry_depth.insert(target, depth);
                    work.push(target);
                }
            }
        }

        if !block.is_terminated() {
            let next = body
                .position(id)
                .and_then(|pos| layout.get(pos + 1))
                .copied();
            if let Some(next) = next {
                if !entry_depth.contains_key(&next) {
                    entry_depth.insert(next, depth);
                    work.push(next);
                }
            }
        }
    }

    u16::try_from(max).map_err(|_| CompileError::internal(format!("operand stack of {} slots", max)))
}

/// `(pops, pushes, transient peak above the entry depth)` in slots
fn effect(op: &Op) -> CompileResult<(i64, i64, i64)> {
    let simple = |pops: i64, pushes: i64| Ok((pops, pushes, 0));
    match op {
        Op::PushInt(_) | Op::PushFloat(_) | Op::PushString(_) | Op::PushNull => simple(0, 1),
        Op::PushLong(_) | Op::PushDouble(_) => simple(0, 2),
        Op::Load { ty, .. } => simple(0, type_width(ty)?),
        Op::Store { ty, .. } => simple(type_width(ty)?, 0),
        Op::Increment { .. } => simple(0, 0),
        Op::GetField(field) => simple(1, descriptor_width(&field.descriptor)?),
        Op::PutField(field) => simple(1 + descriptor_width(&field.descriptor)?, 0),
        Op::GetStatic(field) => simple(0, descriptor_width(&field.descriptor)?),
        Op::PutStatic(field) => simple(descriptor_width(&field.descriptor)?, 0),
        Op::Invoke { kind, method } => {
            let (args, ret) = method_slots(&method.descriptor).ok_or_else(|| {
                CompileError::internal(format!("bad method descriptor {}", method.descriptor))
            })?;
            let receiver = if kind.has_receiver() { 1 } else { 0 };
            simple(i64::from(args) + receiver, i64::from(ret))
        }
        Op::Jump { cond, .. } => simple(i64::from(cond.operands()), 0),
        Op::TableSwitch { .. } | Op::LookupSwitch { .. } => simple(1, 0),
        Op::Return { ty } => simple(type_width(ty)?, 0),
        Op::ReturnVoid => simple(0, 0),
        Op::Raw(opcode) => {
            let (pops, pushes) = opcode.stack_effect().ok_or_else(|| {
                CompileError::unsupported(format!("raw {} without a fixed stack effect", opcode))
            })?;
            simple(i64::from(pops), i64::from(pushes))
        }
        Op::New(_) => simple(0, 1),
        Op::NewArray { .. } | Op::CheckCast(_) => simple(1, 1),
        Op::ArrayLiteral(lit) => Ok((0, 1, literal_peak(lit))),
    }
}

/// Array ref, duplicate, index and one element
fn literal_peak(lit: &ArrayLiteral) -> i64 {
    if lit.is_empty() {
        return 1;
    }
    let element = lit.values().element_type();
    3 + if element.is_wide() { 2 } else { 1 }
}

fn type_width(ty: &Type) -> CompileResult<i64> {
    Ok(i64::from(ty.value_kind()?.slots()))
}

fn descriptor_width(descriptor: &str) -> CompileResult<i64> {
    field_slots(descriptor)
        .map(i64::from)
        .ok_or_else(|| CompileError::internal(format!("bad field descriptor {}", descriptor)))
}
