//! Unification for the Brew type system
//!
//! Variables are pruned before comparison. An unbound variable unifies with
//! anything it does not occur in by binding; concrete types unify only when
//! they are structurally equal.

use crate::error::TypeError;
use crate::ty::Type;

/// Unify two types, binding inference variables as a side effect
pub fn unify(expected: &Type, actual: &Type) -> Result<(), TypeError> {
    let a = expected.prune();
    let b = actual.prune();

    match (&a, &b) {
        (Type::Var(x), Type::Var(y)) if x == y => Ok(()),
        (Type::Var(var), other) | (other, Type::Var(var)) => {
            if other.occurs(var) {
                return Err(TypeError::Recursive {
                    var: format!("?{}", var.id()),
                    ty: other.to_string(),
                });
            }
            var.bind(other.clone());
            Ok(())
        }
        (Type::Primitive(p), Type::Primitive(q)) if p == q => Ok(()),
        (Type::Reference(x), Type::Reference(y)) if x == y => Ok(()),
        (Type::Array(x), Type::Array(y)) => unify(x, y).map_err(|_| mismatch(&a, &b)),
        _ => Err(mismatch(&a, &b)),
    }
}

/// Check whether two types would unify, without binding anything
pub fn unifiable(a: &Type, b: &Type) -> bool {
    match (a.prune(), b.prune()) {
        (Type::Var(_), _) | (_, Type::Var(_)) => true,
        (Type::Primitive(p), Type::Primitive(q)) => p == q,
        (Type::Reference(x), Type::Reference(y)) => x == y,
        (Type::Array(x), Type::Array(y)) => unifiable(&x, &y),
        _ => false,
    }
}

fn mismatch(expected: &Type, actual: &Type) -> TypeError {
    TypeError::Mismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}
