//! Method body encoding
//!
//! Blocks are written in layout order. Each block's offset is recorded as
//! it starts; branch offsets are written as placeholders and patched once
//! every block has an offset.

use super::slots::{kind_width, SlotLayout};
use super::stack::max_stack;
use crate::error::{CompileError, CompileResult};
use crate::lir::{
    array_store_opcode, class_constant_name, newarray_code, ArrayLiteral, ArrayValues, BlockId,
    InvokeKind, MemberRef, Method, Op, VarRef,
};
use brew_bytecode::{method_slots, BytecodeWriter, Code, ConstantPool, Opcode, MAX_CODE_LENGTH};
use brew_types::{Type, ValueKind};
use rustc_hash::FxHashMap;

/// Branch offset awaiting its target's position
struct Fixup {
    /// Offset of the branching instruction
    origin: usize,
    /// Position of the offset operand
    at: usize,
    target: BlockId,
    wide: bool,
}

pub(crate) struct CodeEmitter<'a> {
    pool: &'a mut ConstantPool,
    class_name: &'a str,
    writer: BytecodeWriter,
    slots: SlotLayout,
    offsets: FxHashMap<BlockId, usize>,
    fixups: Vec<Fixup>,
}

impl<'a> CodeEmitter<'a> {
    pub fn new(pool: &'a mut ConstantPool, class_name: &'a str, method: &Method) -> CompileResult<Self> {
        Ok(Self {
            pool,
            class_name,
            writer: BytecodeWriter::new(),
            slots: SlotLayout::new(method)?,
            offsets: FxHashMap::default(),
            fixups: Vec::new(),
        })
    }

    /// Encode the method's blocks into a `Code` attribute
    pub fn emit(mut self, method: &Method) -> CompileResult<Code> {
        let body = method.body();
        for (id, block) in body.iter() {
            self.offsets.insert(id, self.writer.offset());
            for op in block.ops() {
                self.emit_op(op)?;
            }
        }

        let size = self.writer.offset();
        if size > MAX_CODE_LENGTH {
            return Err(CompileError::MethodTooLarge {
                method: method.name().to_string(),
                size,
            });
        }
        self.patch_jumps()?;

        Ok(Code {
            max_stack: max_stack(body)?,
            max_locals: self.slots.max_locals(),
            code: self.writer.into_bytes(),
            ..Default::default()
        })
    }

    fn patch_jumps(&mut self) -> CompileResult<()> {
        for fixup in &self.fixups {
            let target = *self
                .offsets
                .get(&fixup.target)
                .ok_or(CompileError::UnknownBlock { block: fixup.target })?;
            let offset = target as i64 - fixup.origin as i64;
            if fixup.wide {
                let offset =
                    i32::try_from(offset).map_err(|_| CompileError::JumpTooLarge { offset })?;
                self.writer.patch_i32(fixup.at, offset);
            } else {
                let offset =
                    i16::try_from(offset).map_err(|_| CompileError::JumpTooLarge { offset })?;
                self.writer.patch_i16(fixup.at, offset);
            }
        }
        Ok(())
    }

    fn emit_op(&mut self, op: &Op) -> CompileResult<()> {
        match op {
            Op::PushInt(value) => self.push_int(*value)?,
            Op::PushLong(value) => match value {
                0 => self.writer.emit_opcode(Opcode::Lconst0),
                1 => self.writer.emit_opcode(Opcode::Lconst1),
                _ => {
                    let index = self.pool.long(*value)?;
                    self.writer.emit_op_u16(Opcode::Ldc2W, index);
                }
            },
            Op::PushFloat(value) => self.push_float(*value)?,
            Op::PushDouble(value) => self.push_double(*value)?,
            Op::PushString(value) => {
                let index = self.pool.string(value)?;
                self.ldc(index);
            }
            Op::PushNull => self.writer.emit_opcode(Opcode::AconstNull),

            Op::Load { var, ty } => self.local(var, ty, LocalAccess::Load)?,
            Op::Store { var, ty } => self.local(var, ty, LocalAccess::Store)?,
            Op::Increment { var, delta } => {
                let slot = self.slots.slot(var, 1)?;
                match (u8::try_from(slot), i8::try_from(*delta)) {
                    (Ok(slot), Ok(delta)) => {
                        self.writer.emit_op_u8(Opcode::Iinc, slot);
                        self.writer.emit_i8(delta);
                    }
                    _ => {
                        self.writer.emit_opcode(Opcode::Wide);
                        self.writer.emit_op_u16(Opcode::Iinc, slot);
                        self.writer.emit_i16(*delta);
                    }
                }
            }

            Op::GetField(field) => self.field(Opcode::Getfield, field)?,
            Op::PutField(field) => self.field(Opcode::Putfield, field)?,
            Op::GetStatic(field) => self.field(Opcode::Getstatic, field)?,
            Op::PutStatic(field) => self.field(Opcode::Putstatic, field)?,
            Op::Invoke { kind, method } => self.invoke(*kind, method)?,

            Op::Jump { cond, target } => {
                let origin = self.writer.offset();
                self.writer.emit_opcode(cond.opcode());
                let at = self.writer.reserve_i16();
                self.fixups.push(Fixup {
                    origin,
                    at,
                    target: *target,
                    wide: false,
                });
            }
            Op::TableSwitch {
                low,
                targets,
                default,
            } => {
                let high = i64::from(*low) + targets.len() as i64 - 1;
                let high = i32::try_from(high)
                    .ok()
                    .filter(|_| !targets.is_empty())
                    .ok_or_else(|| CompileError::internal("tableswitch key range"))?;
                let origin = self.begin_switch(Opcode::Tableswitch, *default);
                self.writer.emit_i32(*low);
                self.writer.emit_i32(high);
                for target in targets {
                    self.switch_target(origin, *target);
                }
            }
            Op::LookupSwitch { pairs, default } => {
                let mut pairs = pairs.clone();
                pairs.sort_by_key(|&(key, _)| key);
                let origin = self.begin_switch(Opcode::Lookupswitch, *default);
                self.writer.emit_i32(pairs.len() as i32);
                for (key, target) in pairs {
                    self.writer.emit_i32(key);
                    self.switch_target(origin, target);
                }
            }

            Op::Return { ty } => {
                let opcode = match ty.value_kind()? {
                    ValueKind::Void => Opcode::Return,
                    kind => offset_opcode(Opcode::Ireturn, kind_index(kind)?)?,
                };
                self.writer.emit_opcode(opcode);
            }
            Op::ReturnVoid => self.writer.emit_opcode(Opcode::Return),
            Op::Raw(opcode) => {
                if opcode.operand_len() != Some(0) {
                    return Err(CompileError::unsupported(format!(
                        "raw {} with operands",
                        opcode
                    )));
                }
                self.writer.emit_opcode(*opcode);
            }

            Op::New(owner) => {
                let index = self.pool.class(owner.resolve(self.class_name))?;
                self.writer.emit_op_u16(Opcode::New, index);
            }
            Op::CheckCast(owner) => {
                let index = self.pool.class(owner.resolve(self.class_name))?;
                self.writer.emit_op_u16(Opcode::Checkcast, index);
            }
            Op::NewArray { element } => self.new_array(element)?,
            Op::ArrayLiteral(lit) => self.array_literal(lit)?,
        }
        Ok(())
    }

    // ===== Constants =====

    fn push_int(&mut self, value: i32) -> CompileResult<()> {
        match value {
            -1..=5 => {
                let opcode = offset_opcode(Opcode::Iconst0, value)?;
                self.writer.emit_opcode(opcode);
            }
            _ if i8::try_from(value).is_ok() => {
                self.writer.emit_opcode(Opcode::Bipush);
                self.writer.emit_i8(value as i8);
            }
            _ if i16::try_from(value).is_ok() => {
                self.writer.emit_opcode(Opcode::Sipush);
                self.writer.emit_i16(value as i16);
            }
            _ => {
                let index = self.pool.integer(value)?;
                self.ldc(index);
            }
        }
        Ok(())
    }

    fn push_float(&mut self, value: f32) -> CompileResult<()> {
        let bits = value.to_bits();
        if bits == 0.0f32.to_bits() {
            self.writer.emit_opcode(Opcode::Fconst0);
        } else if bits == 1.0f32.to_bits() {
            self.writer.emit_opcode(Opcode::Fconst1);
        } else if bits == 2.0f32.to_bits() {
            self.writer.emit_opcode(Opcode::Fconst2);
        } else {
            let index = self.pool.float(value)?;
            self.ldc(index);
        }
        Ok(())
    }

    fn push_double(&mut self, value: f64) -> CompileResult<()> {
        let bits = value.to_bits();
        if bits == 0.0f64.to_bits() {
            self.writer.emit_opcode(Opcode::Dconst0);
        } else if bits == 1.0f64.to_bits() {
            self.writer.emit_opcode(Opcode::Dconst1);
        } else {
            let index = self.pool.double(value)?;
            self.writer.emit_op_u16(Opcode::Ldc2W, index);
        }
        Ok(())
    }

    fn ldc(&mut self, index: u16) {
        match u8::try_from(index) {
            Ok(index) => self.writer.emit_op_u8(Opcode::Ldc, index),
            Err(_) => self.writer.emit_op_u16(Opcode::LdcW, index),
        }
    }

    // ===== Locals =====

    fn local(&mut self, var: &VarRef, ty: &Type, access: LocalAccess) -> CompileResult<()> {
        let kind = ty.value_kind()?;
        let slot = self.slots.slot(var, kind_width(kind)?)?;
        let index = kind_index(kind)?;
        let (short, long) = match access {
            LocalAccess::Load => (Opcode::Iload0, Opcode::Iload),
            LocalAccess::Store => (Opcode::Istore0, Opcode::Istore),
        };

        if slot <= 3 {
            let opcode = offset_opcode(short, index * 4 + i32::from(slot))?;
            self.writer.emit_opcode(opcode);
        } else {
            let opcode = offset_opcode(long, index)?;
            match u8::try_from(slot) {
                Ok(slot) => self.writer.emit_op_u8(opcode, slot),
                Err(_) => {
                    self.writer.emit_opcode(Opcode::Wide);
                    self.writer.emit_op_u16(opcode, slot);
                }
            }
        }
        Ok(())
    }

    // ===== Members =====

    fn field(&mut self, opcode: Opcode, field: &MemberRef) -> CompileResult<()> {
        let owner = field.owner.resolve(self.class_name);
        let index = self.pool.field_ref(owner, &field.name, &field.descriptor)?;
        self.writer.emit_op_u16(opcode, index);
        Ok(())
    }

    fn invoke(&mut self, kind: InvokeKind, method: &MemberRef) -> CompileResult<()> {
        let owner = method.owner.resolve(self.class_name);
        if kind == InvokeKind::Interface {
            let index = self
                .pool
                .interface_method_ref(owner, &method.name, &method.descriptor)?;
            let (args, _) = method_slots(&method.descriptor).ok_or_else(|| {
                CompileError::internal(format!("bad method descriptor {}", method.descriptor))
            })?;
            let count = u8::try_from(args + 1)
                .map_err(|_| CompileError::internal("too many interface call arguments"))?;
            self.writer.emit_op_u16(Opcode::Invokeinterface, index);
            self.writer.emit_u8(count);
            self.writer.emit_u8(0);
        } else {
            let index = self.pool.method_ref(owner, &method.name, &method.descriptor)?;
            self.writer.emit_op_u16(kind.opcode(), index);
        }
        Ok(())
    }

    // ===== Arrays =====

    fn new_array(&mut self, element: &Type) -> CompileResult<()> {
        let element = element.resolve();
        match element.as_primitive() {
            Some(primitive) => {
                let code = newarray_code(primitive).ok_or_else(|| {
                    CompileError::internal(format!("no newarray code for {}", primitive))
                })?;
                self.writer.emit_op_u8(Opcode::Newarray, code);
            }
            None => {
                let index = self.pool.class(&class_constant_name(&element)?)?;
                self.writer.emit_op_u16(Opcode::Anewarray, index);
            }
        }
        Ok(())
    }

    fn array_literal(&mut self, lit: &ArrayLiteral) -> CompileResult<()> {
        let element = lit.values().element_type();
        let len = i32::try_from(lit.len()).map_err(|_| CompileError::internal("array literal length"))?;
        self.push_int(len)?;
        self.new_array(&Type::Primitive(element))?;
        let store = array_store_opcode(&Type::Primitive(element))
            .ok_or_else(|| CompileError::internal(format!("no array store for {}", element)))?;

        for i in 0..len {
            self.writer.emit_opcode(Opcode::Dup);
            self.push_int(i)?;
            let at = i as usize;
            match lit.values() {
                ArrayValues::Boolean(v) => self.push_int(i32::from(v[at]))?,
                ArrayValues::Byte(v) => self.push_int(i32::from(v[at]))?,
                ArrayValues::Char(v) => self.push_int(i32::from(v[at]))?,
                ArrayValues::Short(v) => self.push_int(i32::from(v[at]))?,
                ArrayValues::Int(v) => self.push_int(v[at])?,
                ArrayValues::Long(v) => self.emit_op(&Op::PushLong(v[at]))?,
                ArrayValues::Float(v) => self.push_float(v[at])?,
                ArrayValues::Double(v) => self.push_double(v[at])?,
            }
            self.writer.emit_opcode(store);
        }
        Ok(())
    }

    // ===== Switches =====

    /// Opcode, padding and default offset; returns the opcode's offset
    fn begin_switch(&mut self, opcode: Opcode, default: BlockId) -> usize {
        let origin = self.writer.offset();
        self.writer.emit_opcode(opcode);
        self.writer.align(4);
        self.switch_target(origin, default);
        origin
    }

    fn switch_target(&mut self, origin: usize, target: BlockId) {
        let at = self.writer.reserve_i32();
        self.fixups.push(Fixup {
            origin,
            at,
            target,
            wide: true,
        });
    }
}

#[derive(Clone, Copy)]
enum LocalAccess {
    Load,
    Store,
}

/// Position of a value kind in the `i`, `l`, `f`, `d`, `a` opcode families
fn kind_index(kind: ValueKind) -> CompileResult<i32> {
    match kind {
        ValueKind::Int => Ok(0),
        ValueKind::Long => Ok(1),
        ValueKind::Float => Ok(2),
        ValueKind::Double => Ok(3),
        ValueKind::Reference => Ok(4),
        ValueKind::Void => Err(CompileError::internal("void value has no opcode family")),
    }
}

fn offset_opcode(base: Opcode, delta: i32) -> CompileResult<Opcode> {
    i32::from(base.to_u8())
        .checked_add(delta)
        .and_then(|byte| u8::try_from(byte).ok())
        .and_then(Opcode::from_u8)
        .ok_or_else(|| CompileError::internal(format!("no opcode at {} + {}", base, delta)))
}
