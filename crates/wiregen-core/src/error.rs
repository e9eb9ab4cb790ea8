//! Error types for the wiregen-core library.
//!
//! All lowering and emission errors are fatal to the invocation: the first
//! error short-circuits and is returned to the caller, and no partial output
//! is produced.

use thiserror::Error;

/// Result type alias for wiregen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all lowering and emission operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input file is not proto3
    #[error("only proto3 is supported: '{path}' declares syntax '{syntax}'")]
    UnsupportedSyntax {
        /// Path of the offending file
        path: String,
        /// The declared syntax string
        syntax: String,
    },

    /// A schema construct the generator does not handle
    #[error("unsupported construct on {full_name}: {details}")]
    UnsupportedConstruct {
        /// Fully-qualified name of the offending element
        full_name: String,
        /// What was encountered
        details: String,
    },

    /// A native-type override incompatible with the field's wire kind
    #[error("unsupported native type {native:?} for {full_name}")]
    InvalidNativeType {
        /// Fully-qualified name of the offending field
        full_name: String,
        /// The rejected override value
        native: String,
    },

    /// A dangling message or enum reference
    #[error("unknown type reference: {full_name}")]
    UnknownReference {
        /// The fully-qualified name that did not resolve
        full_name: String,
    },

    /// No output directory configured for a target that was asked to run
    #[error("missing configuration for '{path}': {details}")]
    MissingConfiguration {
        /// Path of the offending file
        path: String,
        /// What is missing
        details: String,
    },

    /// An emitter encountered a kind it has no rule for
    ///
    /// This indicates a bug in the generator, not a user error.
    #[error("internal emitter error on {full_name}: {details}")]
    InternalEmitter {
        /// Fully-qualified name of the element being emitted
        full_name: String,
        /// Which rule was missing
        details: String,
    },

    /// An invalid field number in a descriptor
    #[error("invalid field number {number} on {full_name}: must be 1..={max} and outside 19000..=19999")]
    InvalidFieldNumber {
        /// Fully-qualified name of the offending field
        full_name: String,
        /// The invalid field number
        number: i32,
        /// Maximum valid field number
        max: u32,
    },
}

impl Error {
    /// Creates a new unsupported-syntax error
    pub fn unsupported_syntax(path: impl Into<String>, syntax: impl Into<String>) -> Self {
        Self::UnsupportedSyntax {
            path: path.into(),
            syntax: syntax.into(),
        }
    }

    /// Creates a new unsupported-construct error
    pub fn unsupported_construct(full_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            full_name: full_name.into(),
            details: details.into(),
        }
    }

    /// Creates a new invalid-native-type error
    pub fn invalid_native_type(full_name: impl Into<String>, native: impl Into<String>) -> Self {
        Self::InvalidNativeType {
            full_name: full_name.into(),
            native: native.into(),
        }
    }

    /// Creates a new unknown-reference error
    pub fn unknown_reference(full_name: impl Into<String>) -> Self {
        Self::UnknownReference {
            full_name: full_name.into(),
        }
    }

    /// Creates a new missing-configuration error
    pub fn missing_configuration(path: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Creates a new internal emitter error
    pub fn internal(full_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InternalEmitter {
            full_name: full_name.into(),
            details: details.into(),
        }
    }
}
