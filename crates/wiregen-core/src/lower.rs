//! Lowering resolved descriptors into the IR.
//!
//! The descriptor side of the pipeline is delegated to `prost-reflect`: the
//! caller hands this module a [`DescriptorPool`] (typically decoded from a
//! `protoc`/`buf` descriptor set) and receives `Vec<ir::File>` back.
//!
//! Lowering rejects proto2 files, non-synthetic oneofs, invalid native-type
//! overrides, and well-known-type map values. Nested messages and enums are
//! flattened with `_`-joined PascalCase mangling.

use crate::error::{Error, Result};
use crate::ir::{
    names, Cardinality, Enum, EnumValue, Field, File, HostNative, Kind, Message, ScriptNative,
};
use crate::wire;
use prost_reflect::{
    DescriptorPool, DynamicMessage, EnumDescriptor, FieldDescriptor, FileDescriptor,
    Kind as DescriptorKind, MessageDescriptor,
};
use std::collections::HashSet;
use tracing::{debug, trace};

/// FileOptions extension tag carrying the Go output directory.
pub const FILE_OPTION_GO_OUT: u32 = 50_000;
/// FileOptions extension tag carrying the JavaScript output directory.
pub const FILE_OPTION_JS_OUT: u32 = 50_001;
/// FieldOptions extension tag carrying the Go native type.
pub const FIELD_OPTION_GO_TYPE: u32 = 50_010;
/// FieldOptions extension tag carrying the JavaScript native type.
pub const FIELD_OPTION_JS_TYPE: u32 = 50_011;

const TIMESTAMP_FULL_NAME: &str = "google.protobuf.Timestamp";
const DURATION_FULL_NAME: &str = "google.protobuf.Duration";

/// Lower every generatable file in the pool.
///
/// Files under the `google.protobuf` package and files declaring neither
/// messages nor enums (such as option-extension carriers) are skipped.
pub fn lower_pool(pool: &DescriptorPool) -> Result<Vec<File>> {
    let mut result = Vec::new();
    for file in pool.files() {
        if file.package_name().starts_with("google.protobuf") {
            trace!("skipping well-known file {}", file.name());
            continue;
        }
        if file.messages().next().is_none() && file.enums().next().is_none() {
            trace!("skipping type-less file {}", file.name());
            continue;
        }
        result.push(lower_file(&file)?);
    }
    Ok(result)
}

/// Lower a single resolved file descriptor.
pub fn lower_file(file: &FileDescriptor) -> Result<File> {
    let syntax = file.file_descriptor_proto().syntax();
    if syntax != "proto3" {
        let declared = if syntax.is_empty() { "proto2" } else { syntax };
        return Err(Error::unsupported_syntax(file.name(), declared));
    }

    let go_out = string_extension(&file.options(), FILE_OPTION_GO_OUT).unwrap_or_default();
    let js_out = string_extension(&file.options(), FILE_OPTION_JS_OUT).unwrap_or_default();
    let go_package = match go_package_from_options(file) {
        Some(pkg) => pkg,
        None => file.package_name().to_string(),
    };

    let mut out = File {
        path: file.name().to_string(),
        package: file.package_name().to_string(),
        go_package,
        go_out,
        js_out,
        enums: Vec::new(),
        messages: Vec::new(),
    };

    for message in file.messages() {
        collect_messages(&message, &[], &mut out.messages)?;
    }
    for enum_type in file.enums() {
        out.enums.push(lower_enum(&enum_type, &[])?);
    }
    for message in file.messages() {
        collect_message_enums(&message, &[], &mut out.enums)?;
    }

    check_unique_names(&out)?;
    debug!(
        "lowered {}: {} messages, {} enums",
        out.path,
        out.messages.len(),
        out.enums.len()
    );
    Ok(out)
}

/// Depth-first message walk; nested messages follow their parent.
fn collect_messages(
    message: &MessageDescriptor,
    prefix: &[&str],
    out: &mut Vec<Message>,
) -> Result<()> {
    if message.is_map_entry() {
        return Ok(());
    }
    let mut parts: Vec<&str> = prefix.to_vec();
    parts.push(message.name());

    let fields = collect_fields(message)?;
    let repeated_wrapper = match fields.as_slice() {
        [field] => field.is_repeated() && !field.is_map(),
        _ => false,
    };
    out.push(Message {
        name: names::go_name(&parts.join("_")),
        full_name: message.full_name().to_string(),
        fields,
        repeated_wrapper,
    });

    for nested in message.child_messages() {
        collect_messages(&nested, &parts, out)?;
    }
    Ok(())
}

fn collect_message_enums(
    message: &MessageDescriptor,
    prefix: &[&str],
    out: &mut Vec<Enum>,
) -> Result<()> {
    if message.is_map_entry() {
        return Ok(());
    }
    let mut parts: Vec<&str> = prefix.to_vec();
    parts.push(message.name());

    for enum_type in message.child_enums() {
        out.push(lower_enum(&enum_type, &parts)?);
    }
    for nested in message.child_messages() {
        collect_message_enums(&nested, &parts, out)?;
    }
    Ok(())
}

fn lower_enum(enum_type: &EnumDescriptor, prefix: &[&str]) -> Result<Enum> {
    let mut parts: Vec<&str> = prefix.to_vec();
    parts.push(enum_type.name());

    let values: Vec<EnumValue> = enum_type
        .values()
        .map(|value| EnumValue {
            name: value.name().to_string(),
            number: value.number(),
        })
        .collect();

    // proto3 requires a zero entry; the compiler normally guarantees it
    if !values.iter().any(|v| v.number == 0) {
        return Err(Error::unsupported_construct(
            enum_type.full_name(),
            "enum has no zero value",
        ));
    }

    Ok(Enum {
        name: names::go_name(&parts.join("_")),
        full_name: enum_type.full_name().to_string(),
        values,
    })
}

fn collect_fields(message: &MessageDescriptor) -> Result<Vec<Field>> {
    let mut result = Vec::new();
    for field in message.fields() {
        result.push(lower_field(&field)?);
    }
    Ok(result)
}

fn lower_field(field: &FieldDescriptor) -> Result<Field> {
    let full_name = field.full_name().to_string();
    let proto = field.field_descriptor_proto();

    let proto3_optional = proto.proto3_optional();
    if field.containing_oneof().is_some() && !proto3_optional {
        return Err(Error::unsupported_construct(&full_name, "oneof"));
    }

    let number = wire::check_field_number(&full_name, proto.number())?;
    let kind = lower_kind(&field.kind());

    let mut out = Field::new(field.name(), number, kind);

    if field.is_map() {
        lower_map_field(field, &full_name, &mut out)?;
    } else {
        if field.is_list() {
            out.cardinality = Cardinality::Repeated;
            out.packed = field.is_packed();
        }
        match field.kind() {
            DescriptorKind::Message(message) => {
                let ref_name = message.full_name().to_string();
                out.is_timestamp = ref_name == TIMESTAMP_FULL_NAME;
                out.is_duration = ref_name == DURATION_FULL_NAME;
                out.message_ref = Some(ref_name);
            }
            DescriptorKind::Enum(enum_type) => {
                out.enum_ref = Some(enum_type.full_name().to_string());
            }
            _ => {}
        }
        out.has_presence = proto3_optional && !field.is_list() && kind != Kind::Message;
    }

    let options = field.options();
    let go_type = string_extension(&options, FIELD_OPTION_GO_TYPE);
    let js_type = string_extension(&options, FIELD_OPTION_JS_TYPE);
    out.host_native = match go_type {
        Some(value) => Some(parse_host_native(&full_name, &value)?),
        None => None,
    };
    out.script_native = match js_type {
        Some(value) => Some(parse_script_native(&full_name, &value)?),
        None => None,
    };
    validate_native_types(&full_name, &out)?;

    Ok(out)
}

fn lower_map_field(field: &FieldDescriptor, full_name: &str, out: &mut Field) -> Result<()> {
    let entry = match field.kind() {
        DescriptorKind::Message(entry) => entry,
        _ => {
            return Err(Error::internal(full_name, "map field without entry message"));
        }
    };
    let key = entry.map_entry_key_field();
    let value = entry.map_entry_value_field();

    out.cardinality = Cardinality::Map;
    out.map_key_kind = Some(lower_kind(&key.kind()));
    out.map_value_kind = Some(lower_kind(&value.kind()));
    match value.kind() {
        DescriptorKind::Message(message) => {
            let ref_name = message.full_name();
            if ref_name == TIMESTAMP_FULL_NAME || ref_name == DURATION_FULL_NAME {
                return Err(Error::unsupported_construct(
                    full_name,
                    "well-known types are not supported as map values",
                ));
            }
            out.map_value_ref = Some(ref_name.to_string());
        }
        DescriptorKind::Enum(enum_type) => {
            out.map_value_ref = Some(enum_type.full_name().to_string());
        }
        _ => {}
    }
    Ok(())
}

fn lower_kind(kind: &DescriptorKind) -> Kind {
    match kind {
        DescriptorKind::Bool => Kind::Bool,
        DescriptorKind::Int32 => Kind::Int32,
        DescriptorKind::Int64 => Kind::Int64,
        DescriptorKind::Uint32 => Kind::Uint32,
        DescriptorKind::Uint64 => Kind::Uint64,
        DescriptorKind::Sint32 => Kind::Sint32,
        DescriptorKind::Sint64 => Kind::Sint64,
        DescriptorKind::Fixed32 => Kind::Fixed32,
        DescriptorKind::Fixed64 => Kind::Fixed64,
        DescriptorKind::Sfixed32 => Kind::Sfixed32,
        DescriptorKind::Sfixed64 => Kind::Sfixed64,
        DescriptorKind::Float => Kind::Float,
        DescriptorKind::Double => Kind::Double,
        DescriptorKind::String => Kind::String,
        DescriptorKind::Bytes => Kind::Bytes,
        DescriptorKind::Message(_) => Kind::Message,
        DescriptorKind::Enum(_) => Kind::Enum,
    }
}

/// Map the recognized `go_type` option values onto [`HostNative`].
fn parse_host_native(full_name: &str, value: &str) -> Result<HostNative> {
    match value {
        "time.Time" => Ok(HostNative::Time),
        "time.Duration" => Ok(HostNative::Duration),
        "github.com/google/uuid.UUID" => Ok(HostNative::Uuid),
        _ => Err(Error::invalid_native_type(full_name, value)),
    }
}

/// Map the recognized `js_type` option values onto [`ScriptNative`].
fn parse_script_native(full_name: &str, value: &str) -> Result<ScriptNative> {
    match value {
        "number" => Ok(ScriptNative::Number),
        "bigint" => Ok(ScriptNative::Bigint),
        _ => Err(Error::invalid_native_type(full_name, value)),
    }
}

/// Enforce the native-type validation table.
fn validate_native_types(full_name: &str, field: &Field) -> Result<()> {
    if field.is_map() && (field.host_native.is_some() || field.script_native.is_some()) {
        return Err(Error::invalid_native_type(
            full_name,
            "native type overrides are not supported on map fields",
        ));
    }
    if let Some(host) = field.host_native {
        let ok = match host {
            HostNative::Time => {
                field.is_timestamp || matches!(field.kind, Kind::Int32 | Kind::Int64)
            }
            HostNative::Duration => {
                field.is_duration || matches!(field.kind, Kind::Int32 | Kind::Int64)
            }
            HostNative::Uuid => field.kind == Kind::Bytes,
        };
        if !ok {
            return Err(Error::invalid_native_type(full_name, format!("{host:?}")));
        }
    }
    if let Some(script) = field.script_native {
        let ok = matches!(field.kind, Kind::Int32 | Kind::Int64)
            || field.is_timestamp
            || field.is_duration;
        if !ok {
            return Err(Error::invalid_native_type(full_name, format!("{script:?}")));
        }
    }
    Ok(())
}

/// Read a string-valued extension from an options message by tag number.
///
/// The extension tags are the stable contract; names are not consulted, so
/// the options file may live under any package.
fn string_extension(options: &DynamicMessage, number: u32) -> Option<String> {
    for (extension, value) in options.extensions() {
        if extension.number() != number {
            continue;
        }
        match value.as_str() {
            Some(s) if !s.is_empty() => return Some(s.to_string()),
            _ => return None,
        }
    }
    None
}

/// Resolve the Go package name from the standard `go_package` option.
///
/// `go_package` may be `import/path;package_name` or just `import/path`;
/// the package name is the part after `;`, or the last path segment.
fn go_package_from_options(file: &FileDescriptor) -> Option<String> {
    let options = file.file_descriptor_proto().options.as_ref()?;
    let go_package = options.go_package();
    if go_package.is_empty() {
        return None;
    }
    if let Some(idx) = go_package.rfind(';') {
        return Some(go_package[idx + 1..].to_string());
    }
    let trimmed = go_package.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => Some(trimmed[idx + 1..].to_string()),
        None => Some(trimmed.to_string()),
    }
}

/// Message and enum names must stay unique after mangling.
fn check_unique_names(file: &File) -> Result<()> {
    let mut seen = HashSet::new();
    for message in &file.messages {
        if !seen.insert(message.name.as_str()) {
            return Err(Error::unsupported_construct(
                &message.full_name,
                format!("generated name '{}' collides", message.name),
            ));
        }
    }
    for enum_type in &file.enums {
        if !seen.insert(enum_type.name.as_str()) {
            return Err(Error::unsupported_construct(
                &enum_type.full_name,
                format!("generated name '{}' collides", enum_type.name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_native() {
        assert_eq!(parse_host_native("t.f", "time.Time").unwrap(), HostNative::Time);
        assert_eq!(
            parse_host_native("t.f", "time.Duration").unwrap(),
            HostNative::Duration
        );
        assert_eq!(
            parse_host_native("t.f", "github.com/google/uuid.UUID").unwrap(),
            HostNative::Uuid
        );
        assert!(parse_host_native("t.f", "time.Instant").is_err());
    }

    #[test]
    fn test_parse_script_native() {
        assert_eq!(parse_script_native("t.f", "number").unwrap(), ScriptNative::Number);
        assert_eq!(parse_script_native("t.f", "bigint").unwrap(), ScriptNative::Bigint);
        assert!(parse_script_native("t.f", "string").is_err());
    }

    #[test]
    fn test_native_validation_table() {
        let mut field = Field::new("when", 1, Kind::Int64);
        field.host_native = Some(HostNative::Time);
        assert!(validate_native_types("t.when", &field).is_ok());

        let mut field = Field::new("when", 1, Kind::String);
        field.host_native = Some(HostNative::Time);
        assert!(validate_native_types("t.when", &field).is_err());

        let mut field = Field::new("ref", 2, Kind::Bytes);
        field.host_native = Some(HostNative::Uuid);
        assert!(validate_native_types("t.ref", &field).is_ok());

        let mut field = Field::new("ref", 2, Kind::Int64);
        field.host_native = Some(HostNative::Uuid);
        assert!(validate_native_types("t.ref", &field).is_err());

        let mut field = Field::new("count", 3, Kind::Uint64);
        field.script_native = Some(ScriptNative::Bigint);
        assert!(validate_native_types("t.count", &field).is_err());

        let mut field = Field::new("count", 3, Kind::Int64);
        field.script_native = Some(ScriptNative::Bigint);
        assert!(validate_native_types("t.count", &field).is_ok());

        let mut field = Field::new("labels", 4, Kind::Message);
        field.cardinality = Cardinality::Map;
        field.script_native = Some(ScriptNative::Number);
        assert!(validate_native_types("t.labels", &field).is_err());
    }

    #[test]
    fn test_unique_name_check() {
        let file = File {
            messages: vec![
                Message {
                    name: "OrderItem".into(),
                    full_name: "demo.Order.Item".into(),
                    fields: vec![],
                    repeated_wrapper: false,
                },
                Message {
                    name: "OrderItem".into(),
                    full_name: "demo.Order_Item".into(),
                    fields: vec![],
                    repeated_wrapper: false,
                },
            ],
            ..File::default()
        };
        assert!(check_unique_names(&file).is_err());
    }
}
