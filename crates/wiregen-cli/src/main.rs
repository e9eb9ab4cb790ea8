//! wiregen - Generate Go and JavaScript serialization code from proto3 schemas
//!
//! This tool consumes compiled descriptor sets (produced by `protoc
//! --descriptor_set_out --include_imports` or `buf build`) and generates
//! wire-format encode/decode code for Go and JavaScript.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use prost_reflect::DescriptorPool;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;
use wiregen_core::{all_emitters, lower, JsonTagStyle, Options};

/// Generate Go and JavaScript serialization code from proto3 descriptors
#[derive(Parser, Debug)]
#[command(name = "wiregen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Compiled descriptor set file (repeatable); produce one with
    /// `protoc --descriptor_set_out=model.binpb --include_imports ...`
    #[arg(short, long = "descriptor-set", required = true)]
    descriptor_set: Vec<PathBuf>,

    /// Output directory for Go (overrides the schema's go_out option)
    #[arg(long)]
    go_out: Option<String>,

    /// Go package name for generated code (overrides option go_package)
    #[arg(long)]
    go_pkg: Option<String>,

    /// JSON tag style for generated Go structs
    #[arg(long, value_enum, default_value = "snake")]
    json_tags: TagStyle,

    /// Output directory for JavaScript (overrides the schema's js_out option)
    #[arg(long)]
    js_out: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry run - don't write files, just show what would be generated
    #[arg(long)]
    dry_run: bool,
}

/// JSON tag style for the Go target
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TagStyle {
    /// No JSON tags
    None,
    /// snake_case tags derived from the field name
    Snake,
}

impl From<TagStyle> for JsonTagStyle {
    fn from(style: TagStyle) -> Self {
        match style {
            TagStyle::None => JsonTagStyle::None,
            TagStyle::Snake => JsonTagStyle::Snake,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let files = load_files(&cli.descriptor_set)?;
    if files.is_empty() {
        bail!("descriptor sets contain no generatable files");
    }

    let options = Options::new()
        .go_out(cli.go_out.clone().unwrap_or_default())
        .go_package(cli.go_pkg.clone().unwrap_or_default())
        .js_out(cli.js_out.clone().unwrap_or_default())
        .json_tags(cli.json_tags.into());

    let mut written = 0usize;
    for emitter in all_emitters() {
        let outputs = emitter
            .generate(&files, &options)
            .with_context(|| format!("{} generation failed", emitter.name()))?;
        for output in outputs {
            if cli.dry_run {
                println!("Would write: {}", output.path.display());
                continue;
            }
            write_output(&output.path, &output.content)?;
            println!("Wrote {}", output.path.display());
            written += 1;
        }
    }

    if written == 0 && !cli.dry_run {
        bail!(
            "no output directory configured: pass --go-out/--js-out or set \
             the schema file options"
        );
    }
    info!("generated {} files from {} inputs", written, files.len());
    Ok(())
}

/// Load and lower every descriptor set, skipping duplicate proto files.
fn load_files(paths: &[PathBuf]) -> Result<Vec<wiregen_core::File>> {
    let mut files = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for path in paths {
        debug!("reading descriptor set {}", path.display());
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read descriptor set: {}", path.display()))?;
        let pool = DescriptorPool::decode(bytes.as_slice())
            .with_context(|| format!("failed to decode descriptor set: {}", path.display()))?;
        for file in lower::lower_pool(&pool)? {
            if seen.insert(file.path.clone()) {
                files.push(file);
            } else {
                debug!("skipping duplicate input file {}", file.path);
            }
        }
    }
    Ok(files)
}

/// Write a generated file, creating parent directories as needed.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content)
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;
    use prost_types::{
        field_descriptor_proto, DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
        FileDescriptorSet,
    };
    use tempfile::TempDir;

    fn sample_descriptor_set() -> FileDescriptorSet {
        let field = FieldDescriptorProto {
            name: Some("item_id".to_string()),
            number: Some(1),
            label: Some(field_descriptor_proto::Label::Optional as i32),
            r#type: Some(field_descriptor_proto::Type::String as i32),
            json_name: Some("itemId".to_string()),
            ..Default::default()
        };
        let message = DescriptorProto {
            name: Some("Item".to_string()),
            field: vec![field],
            ..Default::default()
        };
        FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("demo/item.proto".to_string()),
                package: Some("demo".to_string()),
                syntax: Some("proto3".to_string()),
                message_type: vec![message],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_end_to_end_generation() {
        let temp = TempDir::new().unwrap();
        let set_path = temp.path().join("model.binpb");
        fs::write(&set_path, sample_descriptor_set().encode_to_vec()).unwrap();

        let go_dir = temp.path().join("go");
        let js_dir = temp.path().join("js");
        let cli = Cli {
            descriptor_set: vec![set_path],
            go_out: Some(go_dir.to_string_lossy().into_owned()),
            go_pkg: Some("model".to_string()),
            json_tags: TagStyle::Snake,
            js_out: Some(js_dir.to_string_lossy().into_owned()),
            verbose: 0,
            dry_run: false,
        };
        run(&cli).unwrap();

        let model_go = fs::read_to_string(go_dir.join("model.gen.go")).unwrap();
        assert!(model_go.contains("type Item struct {"));
        assert!(model_go.contains("ItemID string `json:\"item_id\"`"));
        assert!(go_dir.join("util.go").exists());

        let model_js = fs::read_to_string(js_dir.join("model.gen.js")).unwrap();
        assert!(model_js.contains("export function encodeItem(message) {"));
        assert!(model_js.contains("@property {string} itemId"));
        assert!(js_dir.join("util.js").exists());
    }

    #[test]
    fn test_no_output_dirs_is_an_error() {
        let temp = TempDir::new().unwrap();
        let set_path = temp.path().join("model.binpb");
        fs::write(&set_path, sample_descriptor_set().encode_to_vec()).unwrap();

        let cli = Cli {
            descriptor_set: vec![set_path],
            go_out: None,
            go_pkg: None,
            json_tags: TagStyle::Snake,
            js_out: None,
            verbose: 0,
            dry_run: false,
        };
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().contains("no output directory"));
    }

    #[test]
    fn test_write_output_creates_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/out.txt");
        write_output(&path, b"content").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"content");
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
