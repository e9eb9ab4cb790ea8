//! # wiregen-core
//!
//! A library for generating Go and JavaScript serialization code from
//! resolved Protocol Buffer (proto3) descriptors.
//!
//! This crate provides the core functionality for:
//! - Lowering resolved `prost-reflect` descriptors into a language-neutral
//!   intermediate representation
//! - Emitting Go structs with `Encode`/`Decode` functions over the protobuf
//!   binary wire format
//! - Emitting JavaScript typedefs with `write`/`encode`/`decode` functions
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`wire`]: Protobuf wire-format primitives and constants
//! - [`ir`]: The intermediate representation and name mangling
//! - [`lower`]: Descriptor-to-IR lowering and native-type validation
//! - [`emit`]: The Go and JavaScript emitters plus their runtime assets
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use prost_reflect::DescriptorPool;
//! use wiregen_core::{emit, lower};
//!
//! let bytes = std::fs::read("./model.binpb")?;
//! let pool = DescriptorPool::decode(bytes.as_slice())?;
//!
//! let files = lower::lower_pool(&pool)?;
//! let options = emit::Options::default().go_out("./gen/go").js_out("./gen/js");
//! for emitter in emit::all_emitters() {
//!     for output in emitter.generate(&files, &options)? {
//!         println!("{} ({} bytes)", output.path.display(), output.content.len());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod emit;
pub mod error;
pub mod ir;
pub mod lower;
pub mod wire;

// Re-export primary types for convenience
pub use emit::{all_emitters, Emitter, JsonTagStyle, Options, OutputFile};
pub use error::{Error, Result};
pub use ir::{Cardinality, Enum, Field, File, HostNative, Kind, Message, ScriptNative};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
