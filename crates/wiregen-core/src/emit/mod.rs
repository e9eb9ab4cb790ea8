//! The emission engine.
//!
//! Each target language implements the [`Emitter`] trait: a pure function
//! from lowered IR files plus an [`Options`] record to a list of
//! [`OutputFile`]s. Emitters share no mutable state and never modify the IR.
//!
//! A target is skipped when its output directory is neither set on the
//! invocation options nor in the per-file schema options.

mod go;
mod js;
mod source;

use crate::error::Result;
use crate::ir::File;
use std::path::PathBuf;

pub use go::GoEmitter;
pub use js::JsEmitter;
pub(crate) use source::SourceWriter;

/// How JSON struct tags are rendered by the Go emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonTagStyle {
    /// No JSON tags
    None,
    /// `json:"snake_case"` tags derived from the field name
    #[default]
    Snake,
}

/// Options consumed by the emitters.
///
/// Directories given here override the per-file schema options; empty
/// values defer to them.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Go output directory
    pub go_out: String,
    /// Go package name for generated code
    pub go_package: String,
    /// JavaScript output directory
    pub js_out: String,
    /// JSON tag style for the Go target
    pub json_tags: JsonTagStyle,
}

impl Options {
    /// Creates options with all fields empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Go output directory
    pub fn go_out(mut self, dir: impl Into<String>) -> Self {
        self.go_out = dir.into();
        self
    }

    /// Sets the Go package name
    pub fn go_package(mut self, package: impl Into<String>) -> Self {
        self.go_package = package.into();
        self
    }

    /// Sets the JavaScript output directory
    pub fn js_out(mut self, dir: impl Into<String>) -> Self {
        self.js_out = dir.into();
        self
    }

    /// Sets the JSON tag style
    pub fn json_tags(mut self, style: JsonTagStyle) -> Self {
        self.json_tags = style;
        self
    }
}

/// One file produced by an emitter.
#[derive(Debug, Clone)]
pub struct OutputFile {
    /// Target path (output directory joined with the fixed basename)
    pub path: PathBuf,
    /// File content
    pub content: Vec<u8>,
}

impl OutputFile {
    /// Creates an output file from path and text content.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A target-language code emitter.
///
/// Emitters are pure functions of the IR; a single IR may be handed to any
/// number of emitters in sequence.
pub trait Emitter {
    /// Short target name for diagnostics, e.g. `go`
    fn name(&self) -> &'static str;

    /// Walk the files and produce generated sources plus runtime assets.
    fn generate(&self, files: &[File], options: &Options) -> Result<Vec<OutputFile>>;
}

/// All built-in emitters, in emission order.
pub fn all_emitters() -> Vec<Box<dyn Emitter>> {
    vec![Box::new(GoEmitter), Box::new(JsEmitter)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = Options::new()
            .go_out("./gen/go")
            .go_package("model")
            .js_out("./gen/js")
            .json_tags(JsonTagStyle::None);

        assert_eq!(options.go_out, "./gen/go");
        assert_eq!(options.go_package, "model");
        assert_eq!(options.js_out, "./gen/js");
        assert_eq!(options.json_tags, JsonTagStyle::None);
    }

    #[test]
    fn test_emitters_skip_unconfigured_targets() {
        let files = vec![File::default()];
        for emitter in all_emitters() {
            let outputs = emitter.generate(&files, &Options::new()).unwrap();
            assert!(outputs.is_empty(), "{} emitted without output dir", emitter.name());
        }
    }
}
