//! Variable table
//!
//! Names map to 1-based indices in declaration order. The table is fixed
//! once built: looking up a name that was never declared is an error rather
//! than an implicit declaration.

use crate::error::{CompileError, CompileResult};
use brew_types::Type;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct Vars {
    names: Vec<String>,
    types: Vec<Type>,
    index: FxHashMap<String, usize>,
}

impl Vars {
    /// Declare variables in order; the first ones name the method arguments
    pub fn new<S: Into<String>>(decls: impl IntoIterator<Item = (S, Type)>) -> CompileResult<Self> {
        let mut vars = Vars::default();
        for (name, ty) in decls {
            let name = name.into();
            if vars.index.contains_key(&name) {
                return Err(CompileError::DuplicateVariable { name });
            }
            vars.names.push(name.clone());
            vars.types.push(ty);
            vars.index.insert(name, vars.names.len());
        }
        Ok(vars)
    }

    /// Variables whose types are left to inference
    pub fn inferred<S: Into<String>>(names: impl IntoIterator<Item = S>) -> CompileResult<Self> {
        Self::new(names.into_iter().map(|n| (n, Type::fresh_var())))
    }

    /// 1-based index of a declared name
    pub fn index_of(&self, name: &str) -> CompileResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Name declared at a 1-based index
    pub fn name_at(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    pub fn type_of(&self, name: &str) -> CompileResult<&Type> {
        let index = self.index_of(name)?;
        Ok(&self.types[index - 1])
    }

    pub fn type_at(&self, index: usize) -> Option<&Type> {
        index.checked_sub(1).and_then(|i| self.types.get(i))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(index, name, type)` in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &Type)> + '_ {
        self.names
            .iter()
            .zip(&self.types)
            .enumerate()
            .map(|(i, (name, ty))| (i + 1, name.as_str(), ty))
    }
}
