//! High IR expressions

use crate::lir::{ArrayLiteral, InvokeKind, Owner};
use brew_types::{MethodDescriptor, Type};
use std::fmt;

/// Literal constant
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    String(String),
    Null,
}

impl Literal {
    /// Static type of the literal; `null` gets a fresh variable
    pub fn ty(&self) -> Type {
        match self {
            Literal::Int(_) => Type::INT,
            Literal::Long(_) => Type::LONG,
            Literal::Float(_) => Type::FLOAT,
            Literal::Double(_) => Type::DOUBLE,
            Literal::Boolean(_) => Type::BOOLEAN,
            Literal::Byte(_) => Type::BYTE,
            Literal::Char(_) => Type::Primitive(brew_types::PrimitiveType::Char),
            Literal::Short(_) => Type::Primitive(brew_types::PrimitiveType::Short),
            Literal::String(_) => Type::string(),
            Literal::Null => Type::fresh_var(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    UShr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// High IR expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Var {
        name: String,
        ty: Type,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Instance calls take the receiver as the first argument
    Call {
        kind: InvokeKind,
        owner: Owner,
        name: String,
        descriptor: MethodDescriptor,
        args: Vec<Expr>,
    },
    /// `new C(args)`; the descriptor is the constructor's
    New {
        class: Owner,
        descriptor: MethodDescriptor,
        args: Vec<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        to: Type,
    },
    GetField {
        object: Box<Expr>,
        owner: Owner,
        name: String,
        ty: Type,
    },
    GetStatic {
        owner: Owner,
        name: String,
        ty: Type,
    },
    ArrayGet {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayLength(Box<Expr>),
    NewArray {
        element: Type,
        length: Box<Expr>,
    },
    ArrayLiteral(ArrayLiteral),
    This,
}

impl Expr {
    pub fn int(value: i32) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn long(value: i64) -> Self {
        Expr::Literal(Literal::Long(value))
    }

    pub fn float(value: f32) -> Self {
        Expr::Literal(Literal::Float(value))
    }

    pub fn double(value: f64) -> Self {
        Expr::Literal(Literal::Double(value))
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(Literal::Boolean(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    /// Variable read whose type comes from the declaration
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var {
            name: name.into(),
            ty: Type::fresh_var(),
        }
    }

    pub fn typed_var(name: impl Into<String>, ty: Type) -> Self {
        Expr::Var {
            name: name.into(),
            ty,
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    pub fn mul(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Mul, left, right)
    }

    pub fn cmp_eq(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn cmp_ne(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Ne, left, right)
    }

    pub fn cmp_lt(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Lt, left, right)
    }

    pub fn cmp_gt(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Gt, left, right)
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn neg(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
        }
    }

    pub fn call(
        kind: InvokeKind,
        owner: Owner,
        name: impl Into<String>,
        descriptor: MethodDescriptor,
        args: Vec<Expr>,
    ) -> Self {
        Expr::Call {
            kind,
            owner,
            name: name.into(),
            descriptor,
            args,
        }
    }

    /// Static call on the class being compiled
    pub fn call_self(name: impl Into<String>, descriptor: MethodDescriptor, args: Vec<Expr>) -> Self {
        Self::call(InvokeKind::Static, Owner::SelfClass, name, descriptor, args)
    }

    pub fn cast(expr: Expr, to: Type) -> Self {
        Expr::Cast {
            expr: Box::new(expr),
            to,
        }
    }

    pub fn array_get(array: Expr, index: Expr) -> Self {
        Expr::ArrayGet {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    pub fn array_length(array: Expr) -> Self {
        Expr::ArrayLength(Box::new(array))
    }

    pub fn new_array(element: Type, length: Expr) -> Self {
        Expr::NewArray {
            element,
            length: Box::new(length),
        }
    }

    pub fn get_static(owner: Owner, name: impl Into<String>, ty: Type) -> Self {
        Expr::GetStatic {
            owner,
            name: name.into(),
            ty,
        }
    }

    pub fn get_field(object: Expr, owner: Owner, name: impl Into<String>, ty: Type) -> Self {
        Expr::GetField {
            object: Box::new(object),
            owner,
            name: name.into(),
            ty,
        }
    }

    /// Whether this is the `null` literal
    pub fn is_null(&self) -> bool {
        matches!(self, Expr::Literal(Literal::Null))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Long(v) => write!(f, "{}L", v),
            Literal::Float(v) => write!(f, "{}f", v),
            Literal::Double(v) => write!(f, "{}d", v),
            Literal::Boolean(v) => write!(f, "{}", v),
            Literal::Byte(v) => write!(f, "(byte){}", v),
            Literal::Char(v) => write!(f, "(char){}", v),
            Literal::Short(v) => write!(f, "(short){}", v),
            Literal::String(v) => write!(f, "{:?}", v),
            Literal::Null => f.write_str("null"),
        }
    }
}
