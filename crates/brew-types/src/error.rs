//! Type system errors

use thiserror::Error;

/// Errors that can occur during unification and descriptor handling
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// Two types could not be unified
    #[error("Type mismatch: expected {expected}, got {actual}")]
    Mismatch {
        /// Expected type
        expected: String,
        /// Actual type
        actual: String,
    },

    /// Binding a variable would create an infinite type
    #[error("Recursive type: {var} occurs in {ty}")]
    Recursive {
        /// The variable being bound
        var: String,
        /// The type it occurs in
        ty: String,
    },

    /// A type still contains an unbound inference variable
    #[error("Unresolved type variable {var}")]
    Unresolved {
        /// Variable name
        var: String,
    },

    /// Malformed field or method descriptor
    #[error("Invalid descriptor '{descriptor}': {reason}")]
    InvalidDescriptor {
        /// The offending descriptor
        descriptor: String,
        /// What is wrong with it
        reason: String,
    },
}
