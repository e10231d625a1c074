//! Dead method elimination
//!
//! Removes private methods that no non-private method of the class can
//! reach through direct invokes.

use crate::error::CompileResult;
use crate::lir::{Method, Op};
use brew_bytecode::access;
use rustc_hash::{FxHashMap, FxHashSet};

/// (name, descriptor) identity of a method within its class
type MethodKey = (String, String);

/// Dead method eliminator for one class
pub struct DeadMethodEliminator<'a> {
    class_name: &'a str,
}

impl<'a> DeadMethodEliminator<'a> {
    pub fn new(class_name: &'a str) -> Self {
        Self { class_name }
    }

    /// Keep the reachable methods, preserving their order
    pub fn eliminate(&self, methods: Vec<Method>) -> CompileResult<Vec<Method>> {
        let keys = methods
            .iter()
            .map(|m| Ok((m.name().to_string(), m.descriptor()?)))
            .collect::<CompileResult<Vec<MethodKey>>>()?;
        let index: FxHashMap<&MethodKey, usize> =
            keys.iter().enumerate().map(|(i, key)| (key, i)).collect();

        let mut kept = FxHashSet::default();
        let mut work: Vec<usize> = methods
            .iter()
            .enumerate()
            .filter(|(_, m)| is_root(m))
            .map(|(i, _)| i)
            .collect();

        while let Some(i) = work.pop() {
            if !kept.insert(i) {
                continue;
            }
            for callee in self.callees(&methods[i]) {
                if let Some(&j) = index.get(&callee) {
                    if !kept.contains(&j) {
                        work.push(j);
                    }
                }
            }
        }

        Ok(methods
            .into_iter()
            .enumerate()
            .filter(|(i, _)| kept.contains(i))
            .map(|(_, m)| m)
            .collect())
    }

    /// Methods of this class invoked from `method`
    fn callees(&self, method: &Method) -> Vec<MethodKey> {
        method
            .body()
            .iter()
            .flat_map(|(_, block)| block.ops())
            .filter_map(|op| match op {
                Op::Invoke { method, .. } if method.owner.is_class(self.class_name) => {
                    Some((method.name.clone(), method.descriptor.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

/// Anything but exactly `ACC_PRIVATE` is reachable from outside
fn is_root(method: &Method) -> bool {
    method.access() != access::ACC_PRIVATE
}

pub fn eliminate_dead_methods(class_name: &str, methods: Vec<Method>) -> CompileResult<Vec<Method>> {
    DeadMethodEliminator::new(class_name).eliminate(methods)
}
