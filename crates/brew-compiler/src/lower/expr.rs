//! Expression lowering

use super::{element_type, Lowerer};
use crate::error::{CompileError, CompileResult};
use crate::hir::{BinaryOp, Expr, Literal, UnaryOp};
use crate::lir::{array_load_opcode, class_constant_name, MemberRef, Op, Owner, VarRef};
use brew_bytecode::Opcode;
use brew_types::{PrimitiveType, Type, ValueKind};

impl<'a> Lowerer<'a> {
    /// Lower an expression, leaving its value on the stack. Returns the
    /// resolved type of that value.
    pub(super) fn lower_expr(&mut self, expr: &Expr) -> CompileResult<Type> {
        match expr {
            Expr::Literal(lit) => self.lower_literal(lit),
            Expr::Var { name, .. } => {
                let ty = self.var_type(name)?;
                self.emit(Op::load(name.as_str(), ty.clone()))?;
                Ok(ty)
            }
            Expr::Binary { op, left, right } => {
                if op.is_comparison() {
                    return self.lower_condition_value(expr);
                }
                let ty = self.lower_expr(left)?;
                self.lower_expr(right)?;
                self.emit(Op::Raw(binary_opcode(*op, &ty)?))?;
                Ok(ty)
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Neg => {
                    let ty = self.lower_expr(operand)?;
                    let opcode = match ty.value_kind()? {
                        ValueKind::Int => Opcode::Ineg,
                        ValueKind::Long => Opcode::Lneg,
                        ValueKind::Float => Opcode::Fneg,
                        ValueKind::Double => Opcode::Dneg,
                        _ => return Err(CompileError::unsupported(format!("negation of {}", ty))),
                    };
                    self.emit(Op::Raw(opcode))?;
                    Ok(ty)
                }
                UnaryOp::Not => {
                    self.lower_expr(operand)?;
                    self.emit(Op::PushInt(1))?;
                    self.emit(Op::Raw(Opcode::Ixor))?;
                    Ok(Type::BOOLEAN)
                }
            },
            Expr::Call {
                kind,
                owner,
                name,
                descriptor,
                args,
            } => {
                for arg in args {
                    self.lower_expr(arg)?;
                }
                let method = MemberRef::new(owner.clone(), name.clone(), descriptor.descriptor()?);
                self.emit(Op::Invoke {
                    kind: *kind,
                    method,
                })?;
                Ok(descriptor.ret.resolve())
            }
            Expr::New {
                class,
                descriptor,
                args,
            } => {
                self.emit(Op::New(class.clone()))?;
                self.emit(Op::Raw(Opcode::Dup))?;
                for arg in args {
                    self.lower_expr(arg)?;
                }
                let init = MemberRef::new(class.clone(), "<init>", descriptor.descriptor()?);
                self.emit(Op::Invoke {
                    kind: crate::lir::InvokeKind::Special,
                    method: init,
                })?;
                Ok(Type::reference(class.resolve(self.class_name)))
            }
            Expr::Cast { expr, to } => {
                let from = self.lower_expr(expr)?;
                let to = to.resolve();
                self.lower_cast(&from, &to)?;
                Ok(to)
            }
            Expr::GetField {
                object,
                owner,
                name,
                ty,
            } => {
                self.lower_expr(object)?;
                let field = MemberRef::new(owner.clone(), name.clone(), ty.descriptor()?);
                self.emit(Op::GetField(field))?;
                Ok(ty.resolve())
            }
            Expr::GetStatic { owner, name, ty } => {
                let field = MemberRef::new(owner.clone(), name.clone(), ty.descriptor()?);
                self.emit(Op::GetStatic(field))?;
                Ok(ty.resolve())
            }
            Expr::ArrayGet { array, index } => {
                let array_ty = self.lower_expr(array)?;
                self.lower_expr(index)?;
                let element = element_type(&array_ty)?;
                let opcode = array_load_opcode(&element)
                    .ok_or_else(|| CompileError::internal(format!("no array load for {}", element)))?;
                self.emit(Op::Raw(opcode))?;
                Ok(element)
            }
            Expr::ArrayLength(array) => {
                self.lower_expr(array)?;
                self.emit(Op::Raw(Opcode::Arraylength))?;
                Ok(Type::INT)
            }
            Expr::NewArray { element, length } => {
                self.lower_expr(length)?;
                let element = element.resolve();
                self.emit(Op::NewArray {
                    element: element.clone(),
                })?;
                Ok(Type::array(element))
            }
            Expr::ArrayLiteral(lit) => {
                self.emit(Op::ArrayLiteral(lit.clone()))?;
                Ok(lit.ty())
            }
            Expr::This => {
                if self.is_static {
                    return Err(CompileError::unsupported("`this` in a static method"));
                }
                let ty = Type::reference(self.class_name);
                self.emit(Op::load(VarRef::This, ty.clone()))?;
                Ok(ty)
            }
        }
    }

    fn lower_literal(&mut self, lit: &Literal) -> CompileResult<Type> {
        let op = match lit {
            Literal::Int(v) => Op::PushInt(*v),
            Literal::Long(v) => Op::PushLong(*v),
            Literal::Float(v) => Op::PushFloat(*v),
            Literal::Double(v) => Op::PushDouble(*v),
            Literal::Boolean(v) => Op::PushInt(*v as i32),
            Literal::Byte(v) => Op::PushInt(*v as i32),
            Literal::Char(v) => Op::PushInt(*v as i32),
            Literal::Short(v) => Op::PushInt(*v as i32),
            Literal::String(s) => Op::PushString(s.clone()),
            Literal::Null => Op::PushNull,
        };
        self.emit(op)?;
        Ok(match lit {
            Literal::Null => Type::object(),
            other => other.ty(),
        })
    }

    fn lower_cast(&mut self, from: &Type, to: &Type) -> CompileResult<()> {
        match (from.as_primitive(), to.as_primitive()) {
            (Some(f), Some(t)) => {
                for opcode in primitive_conversion(f, t)? {
                    self.emit(Op::Raw(opcode))?;
                }
                Ok(())
            }
            (None, None) => {
                if from == to || *to == Type::object() {
                    return Ok(());
                }
                let class = class_constant_name(to)?;
                self.emit(Op::CheckCast(Owner::Class(class)))
            }
            _ => Err(CompileError::unsupported(format!(
                "boxing conversion from {} to {}",
                from, to
            ))),
        }
    }
}

/// Arithmetic and bitwise opcodes by operand kind
fn binary_opcode(op: BinaryOp, ty: &Type) -> CompileResult<Opcode> {
    use Opcode::*;
    let kind = ty.value_kind()?;
    let opcode = match (kind, op) {
        (ValueKind::Int, BinaryOp::Add) => Iadd,
        (ValueKind::Int, BinaryOp::Sub) => Isub,
        (ValueKind::Int, BinaryOp::Mul) => Imul,
        (ValueKind::Int, BinaryOp::Div) => Idiv,
        (ValueKind::Int, BinaryOp::Rem) => Irem,
        (ValueKind::Int, BinaryOp::And) => Iand,
        (ValueKind::Int, BinaryOp::Or) => Ior,
        (ValueKind::Int, BinaryOp::Xor) => Ixor,
        (ValueKind::Int, BinaryOp::Shl) => Ishl,
        (ValueKind::Int, BinaryOp::Shr) => Ishr,
        (ValueKind::Int, BinaryOp::UShr) => Iushr,
        (ValueKind::Long, BinaryOp::Add) => Ladd,
        (ValueKind::Long, BinaryOp::Sub) => Lsub,
        (ValueKind::Long, BinaryOp::Mul) => Lmul,
        (ValueKind::Long, BinaryOp::Div) => Ldiv,
        (ValueKind::Long, BinaryOp::Rem) => Lrem,
        (ValueKind::Long, BinaryOp::And) => Land,
        (ValueKind::Long, BinaryOp::Or) => Lor,
        (ValueKind::Long, BinaryOp::Xor) => Lxor,
        (ValueKind::Long, BinaryOp::Shl) => Lshl,
        (ValueKind::Long, BinaryOp::Shr) => Lshr,
        (ValueKind::Long, BinaryOp::UShr) => Lushr,
        (ValueKind::Float, BinaryOp::Add) => Fadd,
        (ValueKind::Float, BinaryOp::Sub) => Fsub,
        (ValueKind::Float, BinaryOp::Mul) => Fmul,
        (ValueKind::Float, BinaryOp::Div) => Fdiv,
        (ValueKind::Float, BinaryOp::Rem) => Frem,
        (ValueKind::Double, BinaryOp::Add) => Dadd,
        (ValueKind::Double, BinaryOp::Sub) => Dsub,
        (ValueKind::Double, BinaryOp::Mul) => Dmul,
        (ValueKind::Double, BinaryOp::Div) => Ddiv,
        (ValueKind::Double, BinaryOp::Rem) => Drem,
        _ => {
            return Err(CompileError::unsupported(format!(
                "operator {} on {}",
                op.symbol(),
                ty
            )))
        }
    };
    Ok(opcode)
}

/// Conversion opcodes between primitive types.
///
/// Widening and narrowing go through the computational kind first, then
/// truncate to byte, char or short where the target is one of those.
fn primitive_conversion(from: PrimitiveType, to: PrimitiveType) -> CompileResult<Vec<Opcode>> {
    use PrimitiveType as P;
    if from == to {
        return Ok(Vec::new());
    }
    if matches!(from, P::Boolean | P::Void) || matches!(to, P::Boolean | P::Void) {
        return Err(CompileError::unsupported(format!(
            "conversion from {} to {}",
            from, to
        )));
    }

    let kind = |p: P| match p {
        P::Long => ValueKind::Long,
        P::Float => ValueKind::Float,
        P::Double => ValueKind::Double,
        _ => ValueKind::Int,
    };
    let mut ops = Vec::new();
    let widened = match (kind(from), kind(to)) {
        (ValueKind::Int, ValueKind::Long) => Some(Opcode::I2l),
        (ValueKind::Int, ValueKind::Float) => Some(Opcode::I2f),
        (ValueKind::Int, ValueKind::Double) => Some(Opcode::I2d),
        (ValueKind::Long, ValueKind::Int) => Some(Opcode::L2i),
        (ValueKind::Long, ValueKind::Float) => Some(Opcode::L2f),
        (ValueKind::Long, ValueKind::Double) => Some(Opcode::L2d),
        (ValueKind::Float, ValueKind::Int) => Some(Opcode::F2i),
        (ValueKind::Float, ValueKind::Long) => Some(Opcode::F2l),
        (ValueKind::Float, ValueKind::Double) => Some(Opcode::F2d),
        (ValueKind::Double, ValueKind::Int) => Some(Opcode::D2i),
        (ValueKind::Double, ValueKind::Long) => Some(Opcode::D2l),
        (ValueKind::Double, ValueKind::Float) => Some(Opcode::D2f),
        _ => None,
    };
    ops.extend(widened);
    match to {
        P::Byte => ops.push(Opcode::I2b),
        P::Char => ops.push(Opcode::I2c),
        P::Short => ops.push(Opcode::I2s),
        _ => {}
    }
    Ok(ops)
}
