//! Core type definitions for the Brew type system

use crate::error::TypeError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter used to mint fresh inference variables
static NEXT_TYPE_VAR: AtomicU64 = AtomicU64::new(0);

/// Allocate a process-unique type variable id
pub fn next_type_var_id() -> u64 {
    NEXT_TYPE_VAR.fetch_add(1, Ordering::Relaxed)
}

/// Reset the type variable counter.
///
/// Only meaningful between independent compilation runs (tests use it to get
/// stable variable names in diagnostics).
pub fn reset_type_var_counter() {
    NEXT_TYPE_VAR.store(0, Ordering::Relaxed);
}

/// Primitive types of the target machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// 32-bit signed integer (`I`)
    Int,
    /// 32-bit IEEE 754 float (`F`)
    Float,
    /// 64-bit signed integer (`J`)
    Long,
    /// 64-bit IEEE 754 float (`D`)
    Double,
    /// Boolean, stored as an int (`Z`)
    Boolean,
    /// 8-bit signed octet (`B`)
    Byte,
    /// 16-bit unsigned char, storage only (`C`)
    Char,
    /// 16-bit signed short, storage only (`S`)
    Short,
    /// No value (`V`), only valid as a method return type
    Void,
}

impl PrimitiveType {
    /// Single-character descriptor code
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveType::Int => 'I',
            PrimitiveType::Float => 'F',
            PrimitiveType::Long => 'J',
            PrimitiveType::Double => 'D',
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Char => 'C',
            PrimitiveType::Short => 'S',
            PrimitiveType::Void => 'V',
        }
    }

    /// Parse a single-character descriptor code
    pub fn from_descriptor(code: char) -> Option<Self> {
        match code {
            'I' => Some(PrimitiveType::Int),
            'F' => Some(PrimitiveType::Float),
            'J' => Some(PrimitiveType::Long),
            'D' => Some(PrimitiveType::Double),
            'Z' => Some(PrimitiveType::Boolean),
            'B' => Some(PrimitiveType::Byte),
            'C' => Some(PrimitiveType::Char),
            'S' => Some(PrimitiveType::Short),
            'V' => Some(PrimitiveType::Void),
            _ => None,
        }
    }

    /// Source-level name
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Int => "int",
            PrimitiveType::Float => "float",
            PrimitiveType::Long => "long",
            PrimitiveType::Double => "double",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Void => "void",
        }
    }

    /// Whether values of this type take two local/stack slots
    pub fn is_wide(self) -> bool {
        matches!(self, PrimitiveType::Long | PrimitiveType::Double)
    }

    /// Whether the machine represents this type as a 32-bit int
    pub fn is_int_like(self) -> bool {
        matches!(
            self,
            PrimitiveType::Int
                | PrimitiveType::Boolean
                | PrimitiveType::Byte
                | PrimitiveType::Char
                | PrimitiveType::Short
        )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Machine-level value category of a type.
///
/// Selects the load/store/return/array instruction family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// int, boolean, byte, char, short
    Int,
    /// long
    Long,
    /// float
    Float,
    /// double
    Double,
    /// object and array references
    Reference,
    /// no value
    Void,
}

impl ValueKind {
    /// Number of slots a value of this kind occupies
    pub fn slots(self) -> u16 {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            ValueKind::Void => 0,
            _ => 1,
        }
    }
}

/// Inference variable: a shared slot that is either unbound or bound to a type
#[derive(Clone)]
pub struct TypeVar {
    id: u64,
    slot: Arc<Mutex<Option<Type>>>,
}

impl TypeVar {
    /// Create a fresh unbound variable
    pub fn fresh() -> Self {
        Self {
            id: next_type_var_id(),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Variable id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current binding, if any
    pub fn binding(&self) -> Option<Type> {
        self.slot.lock().clone()
    }

    /// Whether the variable has been bound
    pub fn is_bound(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Bind (or re-point) the variable
    pub(crate) fn bind(&self, ty: Type) {
        *self.slot.lock() = Some(ty);
    }
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeVar {}

impl fmt::Debug for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.binding() {
            Some(ty) => write!(f, "?{}={:?}", self.id, ty),
            None => write!(f, "?{}", self.id),
        }
    }
}

/// The core type representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Primitive type
    Primitive(PrimitiveType),
    /// Array of an element type
    Array(Box<Type>),
    /// Object reference by internal class name (`java/lang/String`)
    Reference(String),
    /// Inference variable
    Var(TypeVar),
}

impl Type {
    /// `int`
    pub const INT: Type = Type::Primitive(PrimitiveType::Int);
    /// `float`
    pub const FLOAT: Type = Type::Primitive(PrimitiveType::Float);
    /// `long`
    pub const LONG: Type = Type::Primitive(PrimitiveType::Long);
    /// `double`
    pub const DOUBLE: Type = Type::Primitive(PrimitiveType::Double);
    /// `boolean`
    pub const BOOLEAN: Type = Type::Primitive(PrimitiveType::Boolean);
    /// `byte`
    pub const BYTE: Type = Type::Primitive(PrimitiveType::Byte);
    /// `void`
    pub const VOID: Type = Type::Primitive(PrimitiveType::Void);

    /// Array type with the given element
    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    /// Reference type by internal name
    pub fn reference(name: impl Into<String>) -> Self {
        Type::Reference(name.into())
    }

    /// `java/lang/String`
    pub fn string() -> Self {
        Type::reference("java/lang/String")
    }

    /// `java/lang/Object`
    pub fn object() -> Self {
        Type::reference("java/lang/Object")
    }

    /// Fresh inference variable
    pub fn fresh_var() -> Self {
        Type::Var(TypeVar::fresh())
    }

    /// Follow bound variables to the representative type.
    ///
    /// Chains of bound variables are collapsed as a side effect.
    pub fn prune(&self) -> Type {
        match self {
            Type::Var(var) => match var.binding() {
                Some(bound) => {
                    let pruned = bound.prune();
                    var.bind(pruned.clone());
                    pruned
                }
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }

    /// Fully substitute bound variables, including inside array elements
    pub fn resolve(&self) -> Type {
        match self.prune() {
            Type::Array(elem) => Type::array(elem.resolve()),
            other => other,
        }
    }

    /// Whether `var` occurs anywhere in this type
    pub fn occurs(&self, var: &TypeVar) -> bool {
        match self.prune() {
            Type::Var(v) => v == *var,
            Type::Array(elem) => elem.occurs(var),
            Type::Primitive(_) | Type::Reference(_) => false,
        }
    }

    /// Get the primitive type if this is a primitive
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self.prune() {
            Type::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Whether this (pruned) type is `void`
    pub fn is_void(&self) -> bool {
        self.as_primitive() == Some(PrimitiveType::Void)
    }

    /// Whether this (pruned) type is an unbound variable
    pub fn is_unresolved(&self) -> bool {
        matches!(self.prune(), Type::Var(_))
    }

    /// Machine value category, failing on unbound variables
    pub fn value_kind(&self) -> Result<ValueKind, TypeError> {
        match self.prune() {
            Type::Primitive(p) if p.is_int_like() => Ok(ValueKind::Int),
            Type::Primitive(PrimitiveType::Long) => Ok(ValueKind::Long),
            Type::Primitive(PrimitiveType::Float) => Ok(ValueKind::Float),
            Type::Primitive(PrimitiveType::Double) => Ok(ValueKind::Double),
            Type::Primitive(_) => Ok(ValueKind::Void),
            Type::Array(_) | Type::Reference(_) => Ok(ValueKind::Reference),
            Type::Var(var) => Err(TypeError::Unresolved {
                var: format!("?{}", var.id()),
            }),
        }
    }

    /// Field descriptor (`I`, `[J`, `Ljava/lang/String;`)
    pub fn descriptor(&self) -> Result<String, TypeError> {
        let mut out = String::new();
        self.write_descriptor(&mut out)?;
        Ok(out)
    }

    fn write_descriptor(&self, out: &mut String) -> Result<(), TypeError> {
        match self.prune() {
            Type::Primitive(p) => out.push(p.descriptor()),
            Type::Array(elem) => {
                out.push('[');
                elem.write_descriptor(out)?;
            }
            Type::Reference(name) => {
                out.push('L');
                out.push_str(&name);
                out.push(';');
            }
            Type::Var(var) => {
                return Err(TypeError::Unresolved {
                    var: format!("?{}", var.id()),
                })
            }
        }
        Ok(())
    }

    /// Parse a complete field descriptor
    pub fn from_descriptor(descriptor: &str) -> Result<Type, TypeError> {
        let (ty, rest) = parse_field_type(descriptor, descriptor)?;
        if !rest.is_empty() {
            return Err(invalid(descriptor, "trailing characters"));
        }
        Ok(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prune() {
            Type::Primitive(p) => write!(f, "{}", p),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Reference(name) => f.write_str(&name),
            Type::Var(var) => write!(f, "?{}", var.id()),
        }
    }
}

fn invalid(descriptor: &str, reason: &str) -> TypeError {
    TypeError::InvalidDescriptor {
        descriptor: descriptor.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse one field type from the front of `input`, returning the remainder
fn parse_field_type<'a>(input: &'a str, whole: &str) -> Result<(Type, &'a str), TypeError> {
    let mut chars = input.chars();
    match chars.next() {
        Some('[') => {
            let (elem, rest) = parse_field_type(chars.as_str(), whole)?;
            if elem.is_void() {
                return Err(invalid(whole, "array of void"));
            }
            Ok((Type::array(elem), rest))
        }
        Some('L') => {
            let body = chars.as_str();
            let end = body
                .find(';')
                .ok_or_else(|| invalid(whole, "unterminated class name"))?;
            if end == 0 {
                return Err(invalid(whole, "empty class name"));
            }
            Ok((Type::reference(&body[..end]), &body[end + 1..]))
        }
        Some(code) => match PrimitiveType::from_descriptor(code) {
            Some(p) => Ok((Type::Primitive(p), chars.as_str())),
            None => Err(invalid(whole, "unknown type code")),
        },
        None => Err(invalid(whole, "unexpected end")),
    }
}

/// Method signature: argument types and return type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Argument types in order
    pub params: Vec<Type>,
    /// Return type (`void` for none)
    pub ret: Type,
}

impl MethodDescriptor {
    /// Create a descriptor
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self { params, ret }
    }

    /// Parse `(args)ret`
    pub fn parse(descriptor: &str) -> Result<Self, TypeError> {
        let body = descriptor
            .strip_prefix('(')
            .ok_or_else(|| invalid(descriptor, "missing '('"))?;
        let close = body
            .find(')')
            .ok_or_else(|| invalid(descriptor, "missing ')'"))?;
        let mut args = &body[..close];
        let mut params = Vec::new();
        while !args.is_empty() {
            let (ty, rest) = parse_field_type(args, descriptor)?;
            if ty.is_void() {
                return Err(invalid(descriptor, "void parameter"));
            }
            params.push(ty);
            args = rest;
        }
        let ret = Type::from_descriptor(&body[close + 1..])?;
        Ok(Self { params, ret })
    }

    /// Render `(args)ret`
    pub fn descriptor(&self) -> Result<String, TypeError> {
        let mut out = String::from("(");
        for param in &self.params {
            param.write_descriptor(&mut out)?;
        }
        out.push(')');
        self.ret.write_descriptor(&mut out)?;
        Ok(out)
    }

    /// Number of local/stack slots taken by the arguments
    pub fn arg_slots(&self) -> Result<u16, TypeError> {
        let mut slots = 0;
        for param in &self.params {
            slots += param.value_kind()?.slots();
        }
        Ok(slots)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}
