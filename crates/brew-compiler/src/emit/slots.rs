//! Local variable slot layout

use crate::error::{CompileError, CompileResult};
use crate::lir::{Method, VarRef};
use brew_types::ValueKind;
use rustc_hash::FxHashMap;

/// Slot assignment for one method.
///
/// Instance methods hold `this` in slot 0. Declared variables follow in
/// declaration order, long and double taking two slots, so the leading
/// variables line up with the arguments.
#[derive(Debug)]
pub(crate) struct SlotLayout {
    slots: FxHashMap<String, u16>,
    is_static: bool,
    max_locals: u32,
}

impl SlotLayout {
    pub fn new(method: &Method) -> CompileResult<Self> {
        let is_static = method.is_static();
        let mut next: u32 = if is_static { 0 } else { 1 };
        let mut slots = FxHashMap::default();

        if let Some(vars) = method.vars() {
            for (_, name, ty) in vars.iter() {
                let slot = u16::try_from(next).map_err(|_| CompileError::TooManyLocals)?;
                slots.insert(name.to_string(), slot);
                // Unused variables may never be resolved
                next += match ty.value_kind() {
                    Ok(kind) => u32::from(kind.slots()),
                    Err(_) => 1,
                };
            }
        }

        let args = u32::from(method.signature().arg_slots()?) + if is_static { 0 } else { 1 };
        let layout = Self {
            slots,
            is_static,
            max_locals: next.max(args),
        };
        layout.check()?;
        Ok(layout)
    }

    /// Slot of `var`; `width` is its size in slots
    pub fn slot(&mut self, var: &VarRef, width: u16) -> CompileResult<u16> {
        match var {
            VarRef::This if self.is_static => Err(CompileError::unsupported("this in a static method")),
            VarRef::This => Ok(0),
            VarRef::Named(name) => self
                .slots
                .get(name)
                .copied()
                .ok_or_else(|| CompileError::UndefinedVariable { name: name.clone() }),
            VarRef::Slot(slot) => {
                if *slot < 0 {
                    return Err(CompileError::NegativeSlot { slot: *slot });
                }
                let slot = u16::try_from(*slot).map_err(|_| CompileError::TooManyLocals)?;
                self.max_locals = self.max_locals.max(u32::from(slot) + u32::from(width));
                self.check()?;
                Ok(slot)
            }
        }
    }

    pub fn max_locals(&self) -> u16 {
        // Bounded by `check`
        self.max_locals as u16
    }

    fn check(&self) -> CompileResult<()> {
        if self.max_locals > u32::from(u16::MAX) {
            return Err(CompileError::TooManyLocals);
        }
        Ok(())
    }
}

/// Slots occupied by a value of `kind`; void has none to store
pub(crate) fn kind_width(kind: ValueKind) -> CompileResult<u16> {
    match kind {
        ValueKind::Void => Err(CompileError::internal("void value in a local slot")),
        kind => Ok(kind.slots()),
    }
}
