//! Low IR operations
//!
//! Each [`Op`] variant carries exactly the data its instruction family needs.
//! Types are kept symbolic (`Type`, member descriptors, block ids) until
//! emission, which picks concrete opcodes, pool indices and branch offsets.

use crate::error::{CompileError, CompileResult};
use crate::lir::BlockId;
use brew_bytecode::Opcode;
use brew_types::{PrimitiveType, Type};
use std::fmt;

/// Maximum number of elements in an array literal
pub const MAX_ARRAY_LITERAL_LEN: usize = 4096;

/// Owner of a field or method reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// The class being compiled, whatever its final name
    SelfClass,
    /// A named class (`java/lang/String`) or array descriptor (`[I`)
    Class(String),
}

impl Owner {
    /// Named owner
    pub fn class(name: impl Into<String>) -> Self {
        Owner::Class(name.into())
    }

    /// Internal name, with the self flag resolved against `this_class`
    pub fn resolve<'a>(&'a self, this_class: &'a str) -> &'a str {
        match self {
            Owner::SelfClass => this_class,
            Owner::Class(name) => name,
        }
    }

    /// Whether this owner denotes `this_class`
    pub fn is_class(&self, this_class: &str) -> bool {
        self.resolve(this_class) == this_class
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::SelfClass => f.write_str("<self>"),
            Owner::Class(name) => f.write_str(name),
        }
    }
}

/// Field or method reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: Owner,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn new(owner: Owner, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Reference to a member of the class being compiled
    pub fn of_self(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self::new(Owner::SelfClass, name, descriptor)
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.descriptor)
    }
}

/// Method invocation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Static,
    Special,
    Interface,
}

impl InvokeKind {
    pub fn opcode(self) -> Opcode {
        match self {
            InvokeKind::Virtual => Opcode::Invokevirtual,
            InvokeKind::Static => Opcode::Invokestatic,
            InvokeKind::Special => Opcode::Invokespecial,
            InvokeKind::Interface => Opcode::Invokeinterface,
        }
    }

    /// Whether the call consumes a receiver below its arguments
    pub fn has_receiver(self) -> bool {
        self != InvokeKind::Static
    }
}

/// Branch condition of a [`Op::Jump`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpCond {
    /// `goto`
    Always,
    /// `ifeq`: top of stack is zero
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
    /// `if_icmpeq`: compares the two top ints
    IcmpEq,
    IcmpNe,
    IcmpLt,
    IcmpGe,
    IcmpGt,
    IcmpLe,
    /// `if_acmpeq`: reference identity
    AcmpEq,
    AcmpNe,
    /// `ifnull`
    Null,
    NonNull,
}

impl JumpCond {
    pub fn opcode(self) -> Opcode {
        match self {
            JumpCond::Always => Opcode::Goto,
            JumpCond::Eq => Opcode::Ifeq,
            JumpCond::Ne => Opcode::Ifne,
            JumpCond::Lt => Opcode::Iflt,
            JumpCond::Ge => Opcode::Ifge,
            JumpCond::Gt => Opcode::Ifgt,
            JumpCond::Le => Opcode::Ifle,
            JumpCond::IcmpEq => Opcode::IfIcmpeq,
            JumpCond::IcmpNe => Opcode::IfIcmpne,
            JumpCond::IcmpLt => Opcode::IfIcmplt,
            JumpCond::IcmpGe => Opcode::IfIcmpge,
            JumpCond::IcmpGt => Opcode::IfIcmpgt,
            JumpCond::IcmpLe => Opcode::IfIcmple,
            JumpCond::AcmpEq => Opcode::IfAcmpeq,
            JumpCond::AcmpNe => Opcode::IfAcmpne,
            JumpCond::Null => Opcode::Ifnull,
            JumpCond::NonNull => Opcode::Ifnonnull,
        }
    }

    pub fn from_opcode(opcode: Opcode) -> Option<Self> {
        let cond = match opcode {
            Opcode::Goto => JumpCond::Always,
            Opcode::Ifeq => JumpCond::Eq,
            Opcode::Ifne => JumpCond::Ne,
            Opcode::Iflt => JumpCond::Lt,
            Opcode::Ifge => JumpCond::Ge,
            Opcode::Ifgt => JumpCond::Gt,
            Opcode::Ifle => JumpCond::Le,
            Opcode::IfIcmpeq => JumpCond::IcmpEq,
            Opcode::IfIcmpne => JumpCond::IcmpNe,
            Opcode::IfIcmplt => JumpCond::IcmpLt,
            Opcode::IfIcmpge => JumpCond::IcmpGe,
            Opcode::IfIcmpgt => JumpCond::IcmpGt,
            Opcode::IfIcmple => JumpCond::IcmpLe,
            Opcode::IfAcmpeq => JumpCond::AcmpEq,
            Opcode::IfAcmpne => JumpCond::AcmpNe,
            Opcode::Ifnull => JumpCond::Null,
            Opcode::Ifnonnull => JumpCond::NonNull,
            _ => return None,
        };
        Some(cond)
    }

    /// The condition that holds exactly when `self` does not.
    ///
    /// `Always` maps to itself, so an unconditional jump stays
    /// unconditional. Negating twice gives back the original condition.
    pub fn negate(self) -> Self {
        match self {
            JumpCond::Always => JumpCond::Always,
            JumpCond::Eq => JumpCond::Ne,
            JumpCond::Ne => JumpCond::Eq,
            JumpCond::Lt => JumpCond::Ge,
            JumpCond::Ge => JumpCond::Lt,
            JumpCond::Gt => JumpCond::Le,
            JumpCond::Le => JumpCond::Gt,
            JumpCond::IcmpEq => JumpCond::IcmpNe,
            JumpCond::IcmpNe => JumpCond::IcmpEq,
            JumpCond::IcmpLt => JumpCond::IcmpGe,
            JumpCond::IcmpGe => JumpCond::IcmpLt,
            JumpCond::IcmpGt => JumpCond::IcmpLe,
            JumpCond::IcmpLe => JumpCond::IcmpGt,
            JumpCond::AcmpEq => JumpCond::AcmpNe,
            JumpCond::AcmpNe => JumpCond::AcmpEq,
            JumpCond::Null => JumpCond::NonNull,
            JumpCond::NonNull => JumpCond::Null,
        }
    }

    /// Stack slots consumed by the test
    pub fn operands(self) -> u32 {
        match self {
            JumpCond::Always => 0,
            JumpCond::Eq
            | JumpCond::Ne
            | JumpCond::Lt
            | JumpCond::Ge
            | JumpCond::Gt
            | JumpCond::Le
            | JumpCond::Null
            | JumpCond::NonNull => 1,
            _ => 2,
        }
    }
}

/// Negate a raw branch opcode byte
pub fn negate_opcode(opcode: u8) -> CompileResult<u8> {
    Opcode::from_u8(opcode)
        .and_then(JumpCond::from_opcode)
        .map(|cond| cond.negate().opcode().to_u8())
        .ok_or(CompileError::InvalidJump { opcode })
}

/// Local variable operand
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarRef {
    /// Slot 0 of an instance method
    This,
    /// Declared variable, laid out at emission
    Named(String),
    /// Raw slot number
    Slot(i32),
}

impl From<&str> for VarRef {
    fn from(name: &str) -> Self {
        VarRef::Named(name.to_string())
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarRef::This => f.write_str("this"),
            VarRef::Named(name) => f.write_str(name),
            VarRef::Slot(slot) => write!(f, "#{}", slot),
        }
    }
}

/// Element values of a primitive array literal
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    Boolean(Vec<bool>),
    Byte(Vec<i8>),
    Char(Vec<u16>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl ArrayValues {
    pub fn len(&self) -> usize {
        match self {
            ArrayValues::Boolean(v) => v.len(),
            ArrayValues::Byte(v) => v.len(),
            ArrayValues::Char(v) => v.len(),
            ArrayValues::Short(v) => v.len(),
            ArrayValues::Int(v) => v.len(),
            ArrayValues::Long(v) => v.len(),
            ArrayValues::Float(v) => v.len(),
            ArrayValues::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> PrimitiveType {
        match self {
            ArrayValues::Boolean(_) => PrimitiveType::Boolean,
            ArrayValues::Byte(_) => PrimitiveType::Byte,
            ArrayValues::Char(_) => PrimitiveType::Char,
            ArrayValues::Short(_) => PrimitiveType::Short,
            ArrayValues::Int(_) => PrimitiveType::Int,
            ArrayValues::Long(_) => PrimitiveType::Long,
            ArrayValues::Float(_) => PrimitiveType::Float,
            ArrayValues::Double(_) => PrimitiveType::Double,
        }
    }
}

/// `newarray` type code for a primitive element type
pub fn newarray_code(element: PrimitiveType) -> Option<u8> {
    let code = match element {
        PrimitiveType::Boolean => 4,
        PrimitiveType::Char => 5,
        PrimitiveType::Float => 6,
        PrimitiveType::Double => 7,
        PrimitiveType::Byte => 8,
        PrimitiveType::Short => 9,
        PrimitiveType::Int => 10,
        PrimitiveType::Long => 11,
        PrimitiveType::Void => return None,
    };
    Some(code)
}

/// Array element load opcode for an element type
pub fn array_load_opcode(element: &Type) -> Option<Opcode> {
    let opcode = match element.prune() {
        Type::Primitive(p) => match p {
            PrimitiveType::Boolean | PrimitiveType::Byte => Opcode::Baload,
            PrimitiveType::Char => Opcode::Caload,
            PrimitiveType::Short => Opcode::Saload,
            PrimitiveType::Int => Opcode::Iaload,
            PrimitiveType::Long => Opcode::Laload,
            PrimitiveType::Float => Opcode::Faload,
            PrimitiveType::Double => Opcode::Daload,
            PrimitiveType::Void => return None,
        },
        Type::Array(_) | Type::Reference(_) => Opcode::Aaload,
        Type::Var(_) => return None,
    };
    Some(opcode)
}

/// Array element store opcode for an element type
pub fn array_store_opcode(element: &Type) -> Option<Opcode> {
    let opcode = match array_load_opcode(element)? {
        Opcode::Baload => Opcode::Bastore,
        Opcode::Caload => Opcode::Castore,
        Opcode::Saload => Opcode::Sastore,
        Opcode::Iaload => Opcode::Iastore,
        Opcode::Laload => Opcode::Lastore,
        Opcode::Faload => Opcode::Fastore,
        Opcode::Daload => Opcode::Dastore,
        _ => Opcode::Aastore,
    };
    Some(opcode)
}

/// Name used in a `Class` constant: internal name for classes, descriptor
/// for array types
pub fn class_constant_name(ty: &Type) -> CompileResult<String> {
    match ty.prune() {
        Type::Reference(name) => Ok(name),
        array @ Type::Array(_) => Ok(array.descriptor()?),
        other => Err(CompileError::internal(format!(
            "{} has no class constant",
            other
        ))),
    }
}

/// Array literal whose length is checked against [`MAX_ARRAY_LITERAL_LEN`]
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    values: ArrayValues,
}

impl ArrayLiteral {
    pub fn new(values: ArrayValues) -> CompileResult<Self> {
        let len = values.len();
        if len > MAX_ARRAY_LITERAL_LEN {
            return Err(CompileError::ArrayLiteralTooLarge {
                len,
                max: MAX_ARRAY_LITERAL_LEN,
            });
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &ArrayValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Type of the array the literal evaluates to
    pub fn ty(&self) -> Type {
        Type::array(Type::Primitive(self.values.element_type()))
    }
}

/// Low IR operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    PushInt(i32),
    PushLong(i64),
    PushFloat(f32),
    PushDouble(f64),
    PushString(String),
    PushNull,
    Load { var: VarRef, ty: Type },
    Store { var: VarRef, ty: Type },
    Increment { var: VarRef, delta: i16 },
    GetField(MemberRef),
    PutField(MemberRef),
    GetStatic(MemberRef),
    PutStatic(MemberRef),
    Invoke { kind: InvokeKind, method: MemberRef },
    Jump { cond: JumpCond, target: BlockId },
    /// Keys `low..low + targets.len()` map to `targets` in order
    TableSwitch {
        low: i32,
        targets: Vec<BlockId>,
        default: BlockId,
    },
    /// Pairs sorted by key
    LookupSwitch {
        pairs: Vec<(i32, BlockId)>,
        default: BlockId,
    },
    Return { ty: Type },
    ReturnVoid,
    /// Operand-free opcode emitted as is
    Raw(Opcode),
    New(Owner),
    NewArray { element: Type },
    ArrayLiteral(ArrayLiteral),
    CheckCast(Owner),
}

impl Op {
    pub fn load(var: impl Into<VarRef>, ty: Type) -> Self {
        Op::Load {
            var: var.into(),
            ty,
        }
    }

    pub fn store(var: impl Into<VarRef>, ty: Type) -> Self {
        Op::Store {
            var: var.into(),
            ty,
        }
    }

    pub fn goto(target: BlockId) -> Self {
        Op::Jump {
            cond: JumpCond::Always,
            target,
        }
    }

    pub fn jump_if(cond: JumpCond, target: BlockId) -> Self {
        Op::Jump { cond, target }
    }

    /// Array literal op; fails once the element count passes the ceiling
    pub fn array_literal(values: ArrayValues) -> CompileResult<Self> {
        Ok(Op::ArrayLiteral(ArrayLiteral::new(values)?))
    }

    /// Whether control never falls through to the next op
    pub fn is_terminator(&self) -> bool {
        match self {
            Op::Jump { cond, .. } => *cond == JumpCond::Always,
            Op::TableSwitch { .. } | Op::LookupSwitch { .. } | Op::Return { .. } | Op::ReturnVoid => {
                true
            }
            Op::Raw(opcode) => opcode.is_terminator(),
            _ => false,
        }
    }

    /// Blocks this op may transfer control to
    pub fn targets(&self) -> Vec<BlockId> {
        match self {
            Op::Jump { target, .. } => vec![*target],
            Op::TableSwitch {
                targets, default, ..
            } => {
                let mut all = targets.clone();
                all.push(*default);
                all
            }
            Op::LookupSwitch { pairs, default } => {
                let mut all: Vec<BlockId> = pairs.iter().map(|(_, b)| *b).collect();
                all.push(*default);
                all
            }
            _ => Vec::new(),
        }
    }
}
