//! Compiler options
//!
//! Options are plain serde structs so they can be loaded from a JSON
//! configuration file. Unknown keys are rejected.

use crate::error::{CompileError, CompileResult};
use brew_bytecode::DEFAULT_MAJOR_VERSION;
use serde::{Deserialize, Serialize};

/// Oldest class file major version accepted (JDK 1.1)
pub const MIN_MAJOR_VERSION: u16 = 45;

/// Newest class file major version accepted. Version 50 and later require
/// `StackMapTable` frames, which are never emitted.
pub const MAX_MAJOR_VERSION: u16 = 49;

/// Options controlling class emission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    /// Class file major version
    pub major_version: u16,
    /// Class file minor version
    pub minor_version: u16,
    /// Drop private methods that no non-private method can reach
    pub eliminate_dead_methods: bool,
    /// Decode and structurally verify the emitted bytes before returning them
    pub verify_output: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            major_version: DEFAULT_MAJOR_VERSION,
            minor_version: 0,
            eliminate_dead_methods: true,
            verify_output: true,
        }
    }
}

impl CompilerOptions {
    /// Parse options from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> CompileResult<Self> {
        let options: CompilerOptions =
            serde_json::from_str(json).map_err(|e| CompileError::InvalidOptions {
                message: e.to_string(),
            })?;
        options.validate()?;
        Ok(options)
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> CompileResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CompileError::InvalidOptions {
            message: e.to_string(),
        })
    }

    /// Check that the options describe a class file this compiler can produce
    pub fn validate(&self) -> CompileResult<()> {
        if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&self.major_version) {
            return Err(CompileError::InvalidOptions {
                message: format!(
                    "major_version {} outside {}..={}",
                    self.major_version, MIN_MAJOR_VERSION, MAX_MAJOR_VERSION
                ),
            });
        }
        Ok(())
    }
}
