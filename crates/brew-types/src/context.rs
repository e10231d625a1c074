//! Type environment used during inference

use crate::error::TypeError;
use crate::ty::Type;
use crate::unify::unify;
use rustc_hash::FxHashMap;

/// Mapping from variable names to their (possibly partially inferred) types
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    bindings: FxHashMap<String, Type>,
}

impl TypeEnv {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Current type for `name`, if bound
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.bindings.get(name)
    }

    /// Bind `name` to `ty`, replacing any previous binding
    pub fn insert(&mut self, name: impl Into<String>, ty: Type) {
        self.bindings.insert(name.into(), ty);
    }

    /// Unify `ty` with the binding of `name`.
    ///
    /// An unbound name is first bound to a fresh variable.
    pub fn unify_binding(&mut self, name: &str, ty: &Type) -> Result<Type, TypeError> {
        let bound = self
            .bindings
            .entry(name.to_string())
            .or_insert_with(Type::fresh_var)
            .clone();
        unify(&bound, ty)?;
        Ok(bound.prune())
    }

    /// Whether `name` is bound
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the environment is empty
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
