//! Bytecode verification
//!
//! Structural checks on a decoded class: every instruction decodes, branches
//! land on instruction boundaries, constant pool references point at entries
//! of the right kind, locals stay below `max_locals`, the operand stack never
//! underflows or exceeds `max_stack`, and execution cannot fall off the end
//! of the code array.

use crate::class::{access, ClassFile, Code, MethodInfo, MAX_CODE_LENGTH};
use crate::constants::{tags, ConstantPool};
use crate::encoder::{BytecodeReader, DecodeError};
use crate::opcode::Opcode;
use rustc_hash::FxHashMap;

/// Bytecode verification errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerifyError {
    /// Invalid opcode
    #[error("Invalid opcode {opcode:#x} at offset {offset}")]
    InvalidOpcode {
        /// Opcode byte
        opcode: u8,
        /// Code offset
        offset: usize,
    },

    /// Instruction runs past the end of the code
    #[error("Truncated instruction at offset {0}")]
    Truncated(usize),

    /// Empty code array
    #[error("Method has an empty code array")]
    EmptyCode,

    /// Code array longer than the format allows
    #[error("Code length {0} exceeds 65535 bytes")]
    CodeTooLarge(usize),

    /// Stack underflow
    #[error("Stack underflow at offset {0}")]
    StackUnderflow(usize),

    /// Stack deeper than `max_stack`
    #[error("Stack overflow at offset {offset} (depth {depth}, max {max})")]
    StackOverflow {
        /// Code offset
        offset: usize,
        /// Depth reached
        depth: u32,
        /// Declared maximum
        max: u16,
    },

    /// Two paths reach an instruction with different stack depths
    #[error("Inconsistent stack depth at offset {offset}: {first} vs {second}")]
    StackMismatch {
        /// Code offset
        offset: usize,
        /// Depth on the first path
        first: u32,
        /// Depth on the second path
        second: u32,
    },

    /// Invalid jump target
    #[error("Invalid jump target {target} at offset {offset}")]
    InvalidJumpTarget {
        /// Target offset
        target: i64,
        /// Branch offset
        offset: usize,
    },

    /// Invalid constant pool reference
    #[error("Invalid constant pool reference {index} at offset {offset}: expected {expected}")]
    InvalidConstantRef {
        /// Pool index
        index: u16,
        /// Code offset
        offset: usize,
        /// Expected entry kind
        expected: &'static str,
    },

    /// Invalid local variable reference
    #[error("Invalid local variable reference: index {index} (max {max}) at offset {offset}")]
    InvalidLocalRef {
        /// Slot index
        index: usize,
        /// `max_locals`
        max: usize,
        /// Code offset
        offset: usize,
    },

    /// Invalid `newarray` type code
    #[error("Invalid array type {code} at offset {offset}")]
    InvalidArrayType {
        /// Type code
        code: u8,
        /// Code offset
        offset: usize,
    },

    /// Malformed descriptor
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Execution falls off end
    #[error("Execution falls off end of code at offset {0}")]
    FallOffEnd(usize),

    /// Class-level structural problem
    #[error("Class structure error: {0}")]
    ClassStructure(String),

    /// Error inside a specific method
    #[error("In method {method}: {error}")]
    Method {
        /// `name` + descriptor
        method: String,
        /// Underlying error
        error: Box<VerifyError>,
    },
}

impl From<DecodeError> for VerifyError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::InvalidOpcode(opcode, offset) => {
                VerifyError::InvalidOpcode { opcode, offset }
            }
            DecodeError::UnexpectedEnd(offset) | DecodeError::InvalidUtf8(offset) => {
                VerifyError::Truncated(offset)
            }
        }
    }
}

/// Decoded instruction operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No operand
    None,
    /// Immediate value (`bipush`, `sipush`)
    Int(i32),
    /// Local variable slot
    Local(u16),
    /// Constant pool index
    Constant(u16),
    /// Absolute branch target
    Branch(usize),
    /// `iinc`
    Iinc {
        /// Slot
        local: u16,
        /// Increment
        delta: i16,
    },
    /// `invokeinterface`
    Interface {
        /// InterfaceMethodref index
        index: u16,
        /// Argument slot count including the receiver
        count: u8,
    },
    /// `newarray` type code
    ArrayType(u8),
    /// `multianewarray`
    MultiArray {
        /// Class index
        index: u16,
        /// Dimensions
        dims: u8,
    },
    /// `tableswitch` with absolute targets
    TableSwitch {
        /// Default target
        default: usize,
        /// Lowest key
        low: i32,
        /// Targets for `low..=low + len - 1`
        targets: Vec<usize>,
    },
    /// `lookupswitch` with absolute targets
    LookupSwitch {
        /// Default target
        default: usize,
        /// Sorted key/target pairs
        pairs: Vec<(i32, usize)>,
    },
}

/// A decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the first byte (the `wide` prefix if present)
    pub offset: usize,
    /// Encoded length in bytes
    pub length: usize,
    /// Opcode (the widened opcode for `wide` forms)
    pub opcode: Opcode,
    /// Whether the instruction carried a `wide` prefix
    pub wide: bool,
    /// Operand
    pub operand: Operand,
}

impl Instruction {
    /// Every branch target of this instruction
    pub fn targets(&self) -> Vec<usize> {
        match &self.operand {
            Operand::Branch(t) => vec![*t],
            Operand::TableSwitch { default, targets, .. } => {
                let mut all = targets.clone();
                all.push(*default);
                all
            }
            Operand::LookupSwitch { default, pairs } => {
                let mut all: Vec<usize> = pairs.iter().map(|(_, t)| *t).collect();
                all.push(*default);
                all
            }
            _ => Vec::new(),
        }
    }
}

fn branch_target(base: usize, relative: i64) -> Result<usize, VerifyError> {
    let target = base as i64 + relative;
    if target < 0 {
        return Err(VerifyError::InvalidJumpTarget { target, offset: base });
    }
    Ok(target as usize)
}

/// Decode a whole code array into instructions
pub fn decode_instructions(code: &[u8]) -> Result<Vec<Instruction>, VerifyError> {
    let mut instructions = Vec::new();
    let mut reader = BytecodeReader::new(code);

    while reader.has_more() {
        let offset = reader.position();
        let mut opcode = reader.read_opcode()?;
        let mut wide = false;

        let operand = match opcode {
            Opcode::Wide => {
                wide = true;
                opcode = reader.read_opcode()?;
                match opcode {
                    Opcode::Iinc => Operand::Iinc {
                        local: reader.read_u16()?,
                        delta: reader.read_i16()?,
                    },
                    Opcode::Iload
                    | Opcode::Lload
                    | Opcode::Fload
                    | Opcode::Dload
                    | Opcode::Aload
                    | Opcode::Istore
                    | Opcode::Lstore
                    | Opcode::Fstore
                    | Opcode::Dstore
                    | Opcode::Astore
                    | Opcode::Ret => Operand::Local(reader.read_u16()?),
                    other => {
                        return Err(VerifyError::InvalidOpcode {
                            opcode: other.to_u8(),
                            offset: offset + 1,
                        })
                    }
                }
            }
            Opcode::Bipush => Operand::Int(reader.read_i8()? as i32),
            Opcode::Sipush => Operand::Int(reader.read_i16()? as i32),
            Opcode::Ldc => Operand::Constant(reader.read_u8()? as u16),
            Opcode::Iload
            | Opcode::Lload
            | Opcode::Fload
            | Opcode::Dload
            | Opcode::Aload
            | Opcode::Istore
            | Opcode::Lstore
            | Opcode::Fstore
            | Opcode::Dstore
            | Opcode::Astore
            | Opcode::Ret => Operand::Local(reader.read_u8()? as u16),
            Opcode::Iinc => Operand::Iinc {
                local: reader.read_u8()? as u16,
                delta: reader.read_i8()? as i16,
            },
            Opcode::Newarray => Operand::ArrayType(reader.read_u8()?),
            Opcode::Multianewarray => Operand::MultiArray {
                index: reader.read_u16()?,
                dims: reader.read_u8()?,
            },
            Opcode::Invokeinterface => {
                let index = reader.read_u16()?;
                let count = reader.read_u8()?;
                reader.read_u8()?;
                Operand::Interface { index, count }
            }
            Opcode::Invokedynamic => {
                let index = reader.read_u16()?;
                reader.read_u16()?;
                Operand::Constant(index)
            }
            Opcode::GotoW | Opcode::JsrW => {
                Operand::Branch(branch_target(offset, reader.read_i32()? as i64)?)
            }
            op if op.is_jump() => Operand::Branch(branch_target(offset, reader.read_i16()? as i64)?),
            Opcode::Tableswitch => {
                reader.align(4)?;
                let default = branch_target(offset, reader.read_i32()? as i64)?;
                let low = reader.read_i32()?;
                let high = reader.read_i32()?;
                if high < low {
                    return Err(VerifyError::Truncated(offset));
                }
                let count = (high as i64 - low as i64 + 1) as usize;
                if count * 4 > reader.remaining() {
                    return Err(VerifyError::Truncated(offset));
                }
                let mut targets = Vec::with_capacity(count);
                for _ in 0..count {
                    targets.push(branch_target(offset, reader.read_i32()? as i64)?);
                }
                Operand::TableSwitch { default, low, targets }
            }
            Opcode::Lookupswitch => {
                reader.align(4)?;
                let default = branch_target(offset, reader.read_i32()? as i64)?;
                let npairs = reader.read_i32()?;
                if npairs < 0 || npairs as usize * 8 > reader.remaining() {
                    return Err(VerifyError::Truncated(offset));
                }
                let mut pairs = Vec::with_capacity(npairs as usize);
                for _ in 0..npairs {
                    let key = reader.read_i32()?;
                    pairs.push((key, branch_target(offset, reader.read_i32()? as i64)?));
                }
                Operand::LookupSwitch { default, pairs }
            }
            op => match op.operand_len() {
                Some(2) => Operand::Constant(reader.read_u16()?),
                _ => Operand::None,
            },
        };

        instructions.push(Instruction {
            offset,
            length: reader.position() - offset,
            opcode,
            wide,
            operand,
        });
    }

    Ok(instructions)
}

/// Slot width of the value described by a field descriptor
pub fn field_slots(descriptor: &str) -> Option<u32> {
    match descriptor.as_bytes().first()? {
        b'J' | b'D' => Some(2),
        b'V' => Some(0),
        b'I' | b'F' | b'Z' | b'B' | b'C' | b'S' | b'L' | b'[' => Some(1),
        _ => None,
    }
}

/// Argument slots and return slots of a method descriptor
pub fn method_slots(descriptor: &str) -> Option<(u32, u32)> {
    let body = descriptor.strip_prefix('(')?;
    let close = body.find(')')?;
    let bytes = body[..close].as_bytes();
    let mut args = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'J' | b'D' => {
                args += 2;
                i += 1;
            }
            b'I' | b'F' | b'Z' | b'B' | b'C' | b'S' => {
                args += 1;
                i += 1;
            }
            b'L' => {
                args += 1;
                i += bytes[i..].iter().position(|&b| b == b';')? + 1;
            }
            b'[' => {
                args += 1;
                while bytes.get(i) == Some(&b'[') {
                    i += 1;
                }
                match bytes.get(i)? {
                    b'L' => i += bytes[i..].iter().position(|&b| b == b';')? + 1,
                    _ => i += 1,
                }
            }
            _ => return None,
        }
    }
    Some((args, field_slots(&body[close + 1..])?))
}

/// Verify every method of a class
pub fn verify_class(class: &ClassFile) -> Result<(), VerifyError> {
    let pool = &class.constant_pool;
    if class.name().is_none() {
        return Err(VerifyError::ClassStructure("this_class is not a Class entry".into()));
    }
    if class.super_name().is_none() {
        return Err(VerifyError::ClassStructure("super_class is not a Class entry".into()));
    }
    for &interface in &class.interfaces {
        if pool.class_name(interface).is_none() {
            return Err(VerifyError::ClassStructure(format!(
                "interface index {} is not a Class entry",
                interface
            )));
        }
    }
    for field in &class.fields {
        if class.field_signature(field).is_none() {
            return Err(VerifyError::ClassStructure("field name or descriptor".into()));
        }
    }

    for method in &class.methods {
        let (name, descriptor) = match (class.method_name(method), class.method_descriptor(method)) {
            (Some(n), Some(d)) => (n, d),
            _ => {
                return Err(VerifyError::ClassStructure(
                    "method name or descriptor".into(),
                ))
            }
        };
        verify_method(method, descriptor, pool).map_err(|error| VerifyError::Method {
            method: format!("{}{}", name, descriptor),
            error: Box::new(error),
        })?;
    }

    Ok(())
}

fn verify_method(
    method: &MethodInfo,
    descriptor: &str,
    pool: &ConstantPool,
) -> Result<(), VerifyError> {
    let (arg_slots, _) = method_slots(descriptor)
        .ok_or_else(|| VerifyError::InvalidDescriptor(descriptor.to_string()))?;
    let bodiless = method.access_flags & (access::ACC_ABSTRACT | access::ACC_NATIVE) != 0;

    let code = match (&method.code, bodiless) {
        (Some(_), true) => {
            return Err(VerifyError::ClassStructure(
                "abstract or native method has code".into(),
            ))
        }
        (None, true) => return Ok(()),
        (None, false) => return Err(VerifyError::ClassStructure("missing Code attribute".into())),
        (Some(code), false) => code,
    };

    let this_slot = (method.access_flags & access::ACC_STATIC == 0) as u32;
    if (arg_slots + this_slot) as usize > code.max_locals as usize {
        return Err(VerifyError::InvalidLocalRef {
            index: (arg_slots + this_slot) as usize,
            max: code.max_locals as usize,
            offset: 0,
        });
    }

    verify_code(code, pool)
}

/// Verify a single `Code` attribute
pub fn verify_code(code: &Code, pool: &ConstantPool) -> Result<(), VerifyError> {
    if code.code.is_empty() {
        return Err(VerifyError::EmptyCode);
    }
    if code.code.len() > MAX_CODE_LENGTH {
        return Err(VerifyError::CodeTooLarge(code.code.len()));
    }

    let instructions = decode_instructions(&code.code)?;
    let index_of: FxHashMap<usize, usize> = instructions
        .iter()
        .enumerate()
        .map(|(i, instr)| (instr.offset, i))
        .collect();

    for instr in &instructions {
        for target in instr.targets() {
            if !index_of.contains_key(&target) {
                return Err(VerifyError::InvalidJumpTarget {
                    target: target as i64,
                    offset: instr.offset,
                });
            }
        }
        verify_constant_ref(instr, pool)?;
        verify_local_ref(instr, code.max_locals as usize)?;
        if let Operand::ArrayType(type_code) = instr.operand {
            if !(4..=11).contains(&type_code) {
                return Err(VerifyError::InvalidArrayType {
                    code: type_code,
                    offset: instr.offset,
                });
            }
        }
    }

    if let Some(last) = instructions.last() {
        if !last.opcode.is_terminator() {
            return Err(VerifyError::FallOffEnd(last.offset));
        }
    }

    verify_stack_depth(&instructions, &index_of, code, pool)
}

fn constant_tag(pool: &ConstantPool, index: u16) -> Option<u8> {
    pool.get(index).map(|c| c.tag())
}

fn verify_constant_ref(instr: &Instruction, pool: &ConstantPool) -> Result<(), VerifyError> {
    let (index, allowed, expected): (u16, &[u8], &'static str) = match (&instr.operand, instr.opcode) {
        (Operand::Constant(i), Opcode::Ldc | Opcode::LdcW) => (
            *i,
            &[tags::INTEGER, tags::FLOAT, tags::STRING, tags::CLASS][..],
            "int, float, string or class constant",
        ),
        (Operand::Constant(i), Opcode::Ldc2W) => (*i, &[tags::LONG, tags::DOUBLE][..], "long or double"),
        (
            Operand::Constant(i),
            Opcode::Getstatic | Opcode::Putstatic | Opcode::Getfield | Opcode::Putfield,
        ) => (*i, &[tags::FIELDREF][..], "Fieldref"),
        (Operand::Constant(i), Opcode::Invokevirtual) => (*i, &[tags::METHODREF][..], "Methodref"),
        (Operand::Constant(i), Opcode::Invokespecial | Opcode::Invokestatic) => (
            *i,
            &[tags::METHODREF, tags::INTERFACE_METHODREF][..],
            "Methodref",
        ),
        (Operand::Interface { index, count }, _) => {
            if *count == 0 {
                return Err(VerifyError::InvalidConstantRef {
                    index: *index,
                    offset: instr.offset,
                    expected: "non-zero invokeinterface count",
                });
            }
            (*index, &[tags::INTERFACE_METHODREF][..], "InterfaceMethodref")
        }
        (
            Operand::Constant(i),
            Opcode::New | Opcode::Anewarray | Opcode::Checkcast | Opcode::Instanceof,
        )
        | (Operand::MultiArray { index: i, .. }, _) => (*i, &[tags::CLASS][..], "Class"),
        _ => return Ok(()),
    };

    match constant_tag(pool, index) {
        Some(tag) if allowed.contains(&tag) => Ok(()),
        _ => Err(VerifyError::InvalidConstantRef {
            index,
            offset: instr.offset,
            expected,
        }),
    }
}

fn local_width(opcode: Opcode) -> usize {
    match opcode {
        Opcode::Lload | Opcode::Dload | Opcode::Lstore | Opcode::Dstore => 2,
        Opcode::Lload0
        | Opcode::Lload1
        | Opcode::Lload2
        | Opcode::Lload3
        | Opcode::Dload0
        | Opcode::Dload1
        | Opcode::Dload2
        | Opcode::Dload3
        | Opcode::Lstore0
        | Opcode::Lstore1
        | Opcode::Lstore2
        | Opcode::Lstore3
        | Opcode::Dstore0
        | Opcode::Dstore1
        | Opcode::Dstore2
        | Opcode::Dstore3 => 2,
        _ => 1,
    }
}

/// Slot encoded in a `_0`..`_3` short form
fn implicit_local(opcode: Opcode) -> Option<usize> {
    let byte = opcode.to_u8();
    match byte {
        0x1a..=0x2d => Some(((byte - 0x1a) % 4) as usize),
        0x3b..=0x4e => Some(((byte - 0x3b) % 4) as usize),
        _ => None,
    }
}

fn verify_local_ref(instr: &Instruction, max_locals: usize) -> Result<(), VerifyError> {
    let index = match &instr.operand {
        Operand::Local(i) => *i as usize,
        Operand::Iinc { local, .. } => *local as usize,
        _ => match implicit_local(instr.opcode) {
            Some(i) => i,
            None => return Ok(()),
        },
    };
    if index + local_width(instr.opcode) > max_locals {
        return Err(VerifyError::InvalidLocalRef {
            index,
            max: max_locals,
            offset: instr.offset,
        });
    }
    Ok(())
}

/// Stack effect in slots, resolving descriptors through the pool
fn stack_effect(instr: &Instruction, pool: &ConstantPool) -> Result<(u32, u32), VerifyError> {
    if let Some((pops, pushes)) = instr.opcode.stack_effect() {
        return Ok((pops as u32, pushes as u32));
    }

    let bad = |what: &str| VerifyError::InvalidDescriptor(format!("{} at offset {}", what, instr.offset));
    let member = match &instr.operand {
        Operand::Constant(i) | Operand::Interface { index: i, .. } => pool.member_ref(*i),
        Operand::MultiArray { dims, .. } => return Ok((*dims as u32, 1)),
        _ => None,
    };

    match instr.opcode {
        Opcode::Getstatic | Opcode::Putstatic | Opcode::Getfield | Opcode::Putfield => {
            let member = member.ok_or_else(|| bad("field reference"))?;
            let slots = field_slots(member.descriptor).ok_or_else(|| bad(member.descriptor))?;
            Ok(match instr.opcode {
                Opcode::Getstatic => (0, slots),
                Opcode::Putstatic => (slots, 0),
                Opcode::Getfield => (1, slots),
                _ => (1 + slots, 0),
            })
        }
        Opcode::Invokevirtual
        | Opcode::Invokespecial
        | Opcode::Invokestatic
        | Opcode::Invokeinterface => {
            let member = member.ok_or_else(|| bad("method reference"))?;
            let (args, ret) = method_slots(member.descriptor).ok_or_else(|| bad(member.descriptor))?;
            let receiver = (instr.opcode != Opcode::Invokestatic) as u32;
            Ok((args + receiver, ret))
        }
        // Only reachable for `invokedynamic`, whose call site is opaque here
        _ => Err(bad("unsupported instruction")),
    }
}

fn verify_stack_depth(
    instructions: &[Instruction],
    index_of: &FxHashMap<usize, usize>,
    code: &Code,
    pool: &ConstantPool,
) -> Result<(), VerifyError> {
    let mut depth_at: Vec<Option<u32>> = vec![None; instructions.len()];
    let mut worklist = vec![(0usize, 0u32)];

    for handler in &code.exception_table {
        if let Some(&i) = index_of.get(&(handler.handler_pc as usize)) {
            worklist.push((i, 1));
        }
    }

    while let Some((index, depth)) = worklist.pop() {
        match depth_at[index] {
            Some(seen) if seen == depth => continue,
            Some(seen) => {
                return Err(VerifyError::StackMismatch {
                    offset: instructions[index].offset,
                    first: seen,
                    second: depth,
                })
            }
            None => depth_at[index] = Some(depth),
        }

        let instr = &instructions[index];
        let (pops, pushes) = stack_effect(instr, pool)?;
        if depth < pops {
            return Err(VerifyError::StackUnderflow(instr.offset));
        }
        let after = depth - pops + pushes;
        if after > code.max_stack as u32 {
            return Err(VerifyError::StackOverflow {
                offset: instr.offset,
                depth: after,
                max: code.max_stack,
            });
        }

        for target in instr.targets() {
            // Targets were checked against instruction boundaries already
            if let Some(&t) = index_of.get(&target) {
                worklist.push((t, after));
            }
        }
        if !instr.opcode.is_terminator() && index + 1 < instructions.len() {
            worklist.push((index + 1, after));
        }
    }

    Ok(())
}
