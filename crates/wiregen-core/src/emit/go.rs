//! The Go emitter.
//!
//! For every input file with a Go output directory this emitter produces a
//! `model.gen.go` containing struct declarations, enum constants, `Encode`
//! methods and `Decode` functions, plus one `util.go` wire runtime per
//! distinct output directory. Generated code composes small calls into the
//! runtime rather than inlining wire handling per field.

use crate::emit::{Emitter, JsonTagStyle, Options, OutputFile, SourceWriter};
use crate::error::{Error, Result};
use crate::ir::{names, Field, File, HostNative, Kind, Message, TimeUnit, TypeIndex};
use crate::wire::WireType;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// The static wire runtime shipped next to generated Go code.
const UTIL_SOURCE: &str = include_str!("runtime/util.go");

/// Placeholder package line rewritten per output directory.
const UTIL_PACKAGE_LINE: &str = "package protowireu";

/// Emits Go structs and wire-format functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoEmitter;

impl Emitter for GoEmitter {
    fn name(&self) -> &'static str {
        "go"
    }

    fn generate(&self, files: &[File], options: &Options) -> Result<Vec<OutputFile>> {
        let index = TypeIndex::build(files);
        let mut outputs = Vec::new();
        // out dir -> package, first file wins per directory
        let mut runtime_dirs: BTreeMap<String, String> = BTreeMap::new();

        for file in files {
            let out_dir = if options.go_out.is_empty() {
                file.go_out.as_str()
            } else {
                options.go_out.as_str()
            };
            if out_dir.is_empty() {
                continue;
            }
            let package = if options.go_package.is_empty() {
                file.go_package.as_str()
            } else {
                options.go_package.as_str()
            };
            if package.is_empty() {
                return Err(Error::missing_configuration(
                    &file.path,
                    "go package name is required (set go_pkg or option go_package)",
                ));
            }

            let source = GoFile::new(&index, options.json_tags).render(file, package)?;
            debug!("generated Go for {} into {}", file.path, out_dir);
            outputs.push(OutputFile::new(
                Path::new(out_dir).join("model.gen.go"),
                source,
            ));
            runtime_dirs
                .entry(out_dir.to_string())
                .or_insert_with(|| package.to_string());
        }

        for (dir, package) in runtime_dirs {
            outputs.push(OutputFile::new(
                Path::new(&dir).join("util.go"),
                util_source(&package),
            ));
        }
        Ok(outputs)
    }
}

/// The runtime asset with its package line rewritten.
fn util_source(package: &str) -> String {
    UTIL_SOURCE.replacen(UTIL_PACKAGE_LINE, &format!("package {package}"), 1)
}

/// Per-file emission state.
struct GoFile<'a> {
    index: &'a TypeIndex<'a>,
    json_tags: JsonTagStyle,
    w: SourceWriter,
}

impl<'a> GoFile<'a> {
    fn new(index: &'a TypeIndex<'a>, json_tags: JsonTagStyle) -> Self {
        Self {
            index,
            json_tags,
            w: SourceWriter::new("\t"),
        }
    }

    fn render(mut self, file: &File, package: &str) -> Result<String> {
        self.w.line("// Code generated by wiregen. DO NOT EDIT.");
        self.w.line("//");
        self.w.line(format!("// Source: {}", file.path));
        self.w.blank();
        self.w.line(format!("package {package}"));
        self.w.blank();
        self.write_imports(file);

        for enum_type in &file.enums {
            self.w.line(format!("// {} values.", enum_type.name));
            self.w.open("const (");
            for value in &enum_type.values {
                self.w.line(format!(
                    "{} int32 = {}",
                    names::go_name(&value.name),
                    value.number
                ));
            }
            self.w.close(")");
            self.w.blank();
        }

        for message in &file.messages {
            self.write_struct(message)?;
            self.write_encode(message)?;
            self.write_decode(message)?;
        }
        Ok(self.w.finish())
    }

    fn write_imports(&mut self, file: &File) {
        let uses_time = file.messages.iter().flat_map(|m| &m.fields).any(|f| {
            f.is_time_like() || f.is_duration_like()
        });
        let uses_uuid = file
            .messages
            .iter()
            .flat_map(|m| &m.fields)
            .any(|f| f.host_native == Some(HostNative::Uuid));

        self.w.open("import (");
        if uses_time {
            self.w.line("\"time\"");
            self.w.blank();
        }
        if uses_uuid {
            self.w.line("\"github.com/google/uuid\"");
        }
        self.w
            .line("\"google.golang.org/protobuf/encoding/protowire\"");
        self.w.close(")");
        self.w.blank();
    }

    fn write_struct(&mut self, message: &Message) -> Result<()> {
        self.w.open(format!("type {} struct {{", message.name));
        for field in &message.fields {
            let go_type = self.field_type(message, field)?;
            let name = names::go_name(&field.name);
            match self.json_tags {
                JsonTagStyle::Snake => {
                    let tag = names::json_snake_case(&names::js_name(&field.name));
                    self.w
                        .line(format!("{name} {go_type} `json:\"{tag}\"`"));
                }
                JsonTagStyle::None => self.w.line(format!("{name} {go_type}")),
            }
        }
        self.w.close("}");
        self.w.blank();
        Ok(())
    }

    fn field_type(&self, message: &Message, field: &Field) -> Result<String> {
        let full_name = || format!("{}.{}", message.full_name, field.name);
        if let Some(reference) = field.enum_ref.as_deref() {
            self.index.enum_type(reference)?;
        }
        if field.is_time_like() {
            return Ok(shaped("time.Time", field));
        }
        if field.is_duration_like() {
            return Ok(shaped("time.Duration", field));
        }
        if field.host_native == Some(HostNative::Uuid) {
            return Ok(shaped("uuid.UUID", field));
        }
        if field.is_map() {
            let key = map_key_type(&full_name(), field.map_key_kind.unwrap_or(Kind::String))?;
            let value = self.map_value_type(&full_name(), field)?;
            return Ok(format!("map[{key}]{value}"));
        }
        if field.is_repeated() {
            return Ok(match field.kind {
                Kind::Message => {
                    let msg = self.resolve_message(field)?;
                    format!("[]*{}", msg.name)
                }
                Kind::Bytes => "[][]byte".to_string(),
                kind => format!("[]{}", scalar_type(&full_name(), kind)?),
            });
        }
        match field.kind {
            Kind::Message => {
                let msg = self.resolve_message(field)?;
                Ok(format!("*{}", msg.name))
            }
            Kind::Bytes => Ok(if field.has_presence {
                "*[]byte".to_string()
            } else {
                "[]byte".to_string()
            }),
            kind => {
                let base = scalar_type(&full_name(), kind)?;
                Ok(if field.has_presence {
                    format!("*{base}")
                } else {
                    base.to_string()
                })
            }
        }
    }

    fn map_value_type(&self, full_name: &str, field: &Field) -> Result<String> {
        match field.map_value_kind.unwrap_or(Kind::String) {
            Kind::Message => {
                let reference = field
                    .map_value_ref
                    .as_deref()
                    .ok_or_else(|| Error::internal(full_name, "map value without reference"))?;
                Ok(format!("*{}", self.index.message(reference)?.name))
            }
            Kind::Enum => {
                if let Some(reference) = field.map_value_ref.as_deref() {
                    self.index.enum_type(reference)?;
                }
                Ok("int32".to_string())
            }
            Kind::Bytes => Ok("[]byte".to_string()),
            kind => Ok(scalar_type(full_name, kind)?.to_string()),
        }
    }

    fn resolve_message(&self, field: &Field) -> Result<&'a Message> {
        let reference = field
            .message_ref
            .as_deref()
            .ok_or_else(|| Error::internal(&field.name, "message field without reference"))?;
        self.index.message(reference)
    }

    fn write_encode(&mut self, message: &Message) -> Result<()> {
        self.w
            .open(format!("func (m *{}) Encode() []byte {{", message.name));
        self.w.line("var b []byte");
        for field in &message.fields {
            self.encode_field(message, field)?;
        }
        self.w.line("return b");
        self.w.close("}");
        self.w.blank();
        Ok(())
    }

    fn encode_field(&mut self, message: &Message, field: &Field) -> Result<()> {
        let name = format!("m.{}", names::go_name(&field.name));
        let number = field.number;
        let full_name = format!("{}.{}", message.full_name, field.name);

        if field.host_native == Some(HostNative::Uuid) {
            return self.encode_uuid(field, &name);
        }
        if field.is_time_like() {
            return self.encode_time(field, &name);
        }
        if field.is_duration_like() {
            return self.encode_duration(field, &name);
        }
        if field.is_map() {
            return self.encode_map(&full_name, field, &name);
        }
        if field.is_repeated() && field.kind == Kind::Message {
            self.w.open(format!("for _, item := range {name} {{"));
            self.w.open("if item == nil {");
            self.w.line("continue");
            self.w.close("}");
            self.w.line(format!(
                "b = protowire.AppendTag(b, {number}, protowire.BytesType)"
            ));
            self.w.line("b = protowire.AppendBytes(b, item.Encode())");
            self.w.close("}");
            return Ok(());
        }
        if field.is_repeated() {
            if field.is_packed_wire() {
                let compact = compact_helper(&full_name, field.kind)?;
                self.w.line(format!(
                    "b = AppendRepeatedCompact(b, {name}, {number}, AppendCompactDecorator({compact}))"
                ));
            } else {
                let compact = compact_helper(&full_name, field.kind)?;
                let wire = wire_const(field.kind.wire_type());
                self.w.line(format!(
                    "b = AppendRepeated(b, {name}, AppendElementDecorator({compact}, {number}, {wire}))"
                ));
            }
            return Ok(());
        }
        if field.kind == Kind::Message {
            self.w.open(format!("if {name} != nil {{"));
            self.w.line(format!(
                "b = protowire.AppendTag(b, {number}, protowire.BytesType)"
            ));
            self.w
                .line(format!("b = protowire.AppendBytes(b, {name}.Encode())"));
            self.w.close("}");
            return Ok(());
        }
        if field.has_presence {
            let helper = append_opt_helper(&full_name, field.kind)?;
            self.w
                .line(format!("b = {helper}(b, {name}, {number})"));
            return Ok(());
        }
        let helper = append_helper(&full_name, field.kind)?;
        self.w.line(format!("b = {helper}(b, {name}, {number})"));
        Ok(())
    }

    fn encode_uuid(&mut self, field: &Field, name: &str) -> Result<()> {
        let number = field.number;
        if field.is_repeated() {
            self.w.line(format!(
                "b = AppendRepeated(b, {name}, AppendElementDecorator(AppendUUIDCompact, {number}, protowire.BytesType))"
            ));
        } else if field.has_presence {
            self.w
                .line(format!("b = AppendUUIDFieldOpt(b, {name}, {number})"));
        } else {
            self.w
                .line(format!("b = AppendUUIDField(b, {name}, {number})"));
        }
        Ok(())
    }

    fn encode_time(&mut self, field: &Field, name: &str) -> Result<()> {
        let number = field.number;
        let unit = time_unit_of(&field.name, field)?;
        if field.is_repeated() {
            self.w.open(format!("for _, item := range {name} {{"));
            match unit {
                TimeUnit::Wkt => {
                    self.w.line(format!(
                        "b = protowire.AppendTag(b, {number}, protowire.BytesType)"
                    ));
                    self.w
                        .line("b = protowire.AppendBytes(b, EncodeTimestamp(item))");
                }
                _ => {
                    self.w.line(format!(
                        "b = protowire.AppendTag(b, {number}, protowire.VarintType)"
                    ));
                    self.w.line(format!(
                        "b = protowire.AppendVarint(b, {})",
                        time_value_expr("item", unit)
                    ));
                }
            }
            self.w.close("}");
            return Ok(());
        }
        if field.has_presence {
            self.w
                .open(format!("if {name} != nil && !{name}.IsZero() {{"));
        } else {
            self.w.open(format!("if !{name}.IsZero() {{"));
        }
        match unit {
            TimeUnit::Wkt => self.w.line(format!(
                "b = AppendBytesField(b, EncodeTimestamp({name}), {number})"
            )),
            _ => self.w.line(format!(
                "b = AppendVarIntField(b, {}, {number})",
                time_value_expr(name, unit)
            )),
        }
        self.w.close("}");
        Ok(())
    }

    fn encode_duration(&mut self, field: &Field, name: &str) -> Result<()> {
        let number = field.number;
        let unit = time_unit_of(&field.name, field)?;
        if field.is_repeated() {
            self.w.open(format!("for _, item := range {name} {{"));
            match unit {
                TimeUnit::Wkt => {
                    self.w.line(format!(
                        "b = protowire.AppendTag(b, {number}, protowire.BytesType)"
                    ));
                    self.w
                        .line("b = protowire.AppendBytes(b, EncodeDuration(item))");
                }
                _ => {
                    self.w.line(format!(
                        "b = protowire.AppendTag(b, {number}, protowire.VarintType)"
                    ));
                    self.w.line(format!(
                        "b = protowire.AppendVarint(b, {})",
                        duration_value_expr("item", unit)
                    ));
                }
            }
            self.w.close("}");
            return Ok(());
        }
        if field.has_presence {
            self.w
                .open(format!("if {name} != nil && *{name} != 0 {{"));
            match unit {
                TimeUnit::Wkt => self.w.line(format!(
                    "b = AppendBytesField(b, EncodeDuration(*{name}), {number})"
                )),
                _ => self.w.line(format!(
                    "b = AppendVarIntField(b, {}, {number})",
                    duration_value_expr(&format!("(*{name})"), unit)
                )),
            }
        } else {
            self.w.open(format!("if {name} != 0 {{"));
            match unit {
                TimeUnit::Wkt => self.w.line(format!(
                    "b = AppendBytesField(b, EncodeDuration({name}), {number})"
                )),
                _ => self.w.line(format!(
                    "b = AppendVarIntField(b, {}, {number})",
                    duration_value_expr(name, unit)
                )),
            }
        }
        self.w.close("}");
        Ok(())
    }

    fn encode_map(&mut self, full_name: &str, field: &Field, name: &str) -> Result<()> {
        let number = field.number;
        let key_kind = field.map_key_kind.unwrap_or(Kind::String);
        let value_kind = field.map_value_kind.unwrap_or(Kind::String);
        let key_helper = append_helper(full_name, key_kind)?;
        let value_expr = if value_kind == Kind::Message {
            let value_type = self.map_value_type(full_name, field)?;
            format!("AppendMessageFieldDecorator[{value_type}](2)")
        } else {
            let value_helper = append_helper(full_name, value_kind)?;
            format!("AppendFieldDecorator({value_helper}, 2)")
        };
        self.w.line(format!(
            "b = AppendMap(b, {name}, {number}, AppendFieldDecorator({key_helper}, 1), {value_expr})"
        ));
        Ok(())
    }

    fn write_decode(&mut self, message: &Message) -> Result<()> {
        let needs_msg_bytes = message.fields.iter().any(|f| {
            f.kind == Kind::Message && !f.is_map() && !f.is_time_like() && !f.is_duration_like()
        });

        self.w.open(format!(
            "func Decode{name}(b []byte) (*{name}, error) {{",
            name = message.name
        ));
        self.w.line(format!("m := &{}{{}}", message.name));
        self.w.line("var err error");
        if needs_msg_bytes {
            self.w.line("var msgBytes []byte");
        }
        self.w.open("for len(b) > 0 {");
        self.w.line("var num protowire.Number");
        self.w.line("var typ protowire.Type");
        self.w.line("b, num, typ, err = ConsumeTag(b)");
        self.w.open("if err != nil {");
        self.w.line("return nil, err");
        self.w.close("}");
        // gofmt keeps case labels level with the switch itself
        self.w.line("switch num {");
        for field in &message.fields {
            self.w.open(format!("case {}:", field.number));
            self.decode_field(message, field)?;
            self.w.dedent();
        }
        self.w.open("default:");
        self.w.line("b, err = SkipFieldValue(b, num, typ)");
        self.w.dedent();
        self.w.line("}");
        self.w.open("if err != nil {");
        self.w.line("return nil, err");
        self.w.close("}");
        self.w.close("}");
        self.w.line("return m, nil");
        self.w.close("}");
        self.w.blank();
        Ok(())
    }

    fn decode_field(&mut self, message: &Message, field: &Field) -> Result<()> {
        let name = format!("m.{}", names::go_name(&field.name));
        let full_name = format!("{}.{}", message.full_name, field.name);

        if field.host_native == Some(HostNative::Uuid) {
            return self.decode_uuid(field, &name);
        }
        if field.is_time_like() {
            return self.decode_time(&full_name, field, &name);
        }
        if field.is_duration_like() {
            return self.decode_duration(&full_name, field, &name);
        }
        if field.is_map() {
            return self.decode_map(&full_name, field, &name);
        }
        if field.kind == Kind::Message {
            let msg = self.resolve_message(field)?;
            self.w.line("b, msgBytes, err = ConsumeMessage(b, typ)");
            self.w.open("if err == nil {");
            self.w.line(format!("var item *{}", msg.name));
            self.w
                .line(format!("item, err = Decode{}(msgBytes)", msg.name));
            self.w.open("if err == nil {");
            if field.is_repeated() {
                self.w.line(format!("{name} = append({name}, item)"));
            } else {
                self.w.line(format!("{name} = item"));
            }
            self.w.close("}");
            self.w.close("}");
            return Ok(());
        }
        if field.is_repeated() {
            let consume = consume_helper(&full_name, field.kind)?;
            if field.kind.is_packable() {
                let wire = wire_const(field.kind.wire_type());
                self.w.line(format!(
                    "b, {name}, err = ConsumeRepeatedCompact(b, typ, {wire}, {name}, {consume})"
                ));
            } else {
                let elem = elem_type(&full_name, field.kind)?;
                self.w.line(format!("var item {elem}"));
                self.w.line(format!(
                    "b, item, err = ConsumeRepeatedElement(b, typ, {consume})"
                ));
                self.w.open("if err == nil {");
                self.w.line(format!("{name} = append({name}, item)"));
                self.w.close("}");
            }
            return Ok(());
        }
        if field.has_presence {
            let consume = consume_opt_helper(&full_name, field.kind)?;
            self.w.line(format!("b, {name}, err = {consume}(b, typ)"));
            return Ok(());
        }
        let consume = consume_helper(&full_name, field.kind)?;
        self.w.line(format!("b, {name}, err = {consume}(b, typ)"));
        Ok(())
    }

    fn decode_uuid(&mut self, field: &Field, name: &str) -> Result<()> {
        if field.is_repeated() {
            self.w.line("var item uuid.UUID");
            self.w.line("b, item, err = ConsumeUUID(b, typ)");
            self.w.open("if err == nil {");
            self.w.line(format!("{name} = append({name}, item)"));
            self.w.close("}");
        } else if field.has_presence {
            self.w
                .line(format!("b, {name}, err = ConsumeUUIDOpt(b, typ)"));
        } else {
            self.w.line(format!("b, {name}, err = ConsumeUUID(b, typ)"));
        }
        Ok(())
    }

    fn decode_time(&mut self, full_name: &str, field: &Field, name: &str) -> Result<()> {
        let unit = time_unit_of(full_name, field)?;
        if unit == TimeUnit::Wkt {
            self.w.line("var item time.Time");
            self.w.line("b, item, err = ConsumeTimestamp(b, typ)");
            self.w.open("if err == nil {");
            if field.is_repeated() {
                self.w.line(format!("{name} = append({name}, item)"));
            } else {
                self.w.line(format!("{name} = item"));
            }
            self.w.close("}");
            return Ok(());
        }

        let raw_type = scalar_type(full_name, field.kind)?;
        let consume = consume_helper(full_name, field.kind)?;
        if field.is_repeated() {
            self.w.line(format!("var raw []{raw_type}"));
            let wire = wire_const(field.kind.wire_type());
            self.w.line(format!(
                "b, raw, err = ConsumeRepeatedCompact(b, typ, {wire}, nil, {consume})"
            ));
            self.w.open("if err == nil {");
            self.w.open("for _, v := range raw {");
            self.w.line(format!(
                "{name} = append({name}, {})",
                time_from_raw("v", unit)
            ));
            self.w.close("}");
            self.w.close("}");
            return Ok(());
        }
        self.w.line(format!("var raw {raw_type}"));
        self.w.line(format!("b, raw, err = {consume}(b, typ)"));
        self.w.open("if err == nil {");
        if field.has_presence {
            self.w
                .line(format!("tmp := {}", time_from_raw("raw", unit)));
            self.w.line(format!("{name} = &tmp"));
        } else {
            self.w
                .line(format!("{name} = {}", time_from_raw("raw", unit)));
        }
        self.w.close("}");
        Ok(())
    }

    fn decode_duration(&mut self, full_name: &str, field: &Field, name: &str) -> Result<()> {
        let unit = time_unit_of(full_name, field)?;
        if unit == TimeUnit::Wkt {
            self.w.line("var item time.Duration");
            self.w.line("b, item, err = ConsumeDuration(b, typ)");
            self.w.open("if err == nil {");
            if field.is_repeated() {
                self.w.line(format!("{name} = append({name}, item)"));
            } else {
                self.w.line(format!("{name} = item"));
            }
            self.w.close("}");
            return Ok(());
        }

        let raw_type = scalar_type(full_name, field.kind)?;
        let consume = consume_helper(full_name, field.kind)?;
        if field.is_repeated() {
            self.w.line(format!("var raw []{raw_type}"));
            let wire = wire_const(field.kind.wire_type());
            self.w.line(format!(
                "b, raw, err = ConsumeRepeatedCompact(b, typ, {wire}, nil, {consume})"
            ));
            self.w.open("if err == nil {");
            self.w.open("for _, v := range raw {");
            self.w.line(format!(
                "{name} = append({name}, {})",
                duration_from_raw("v", unit)
            ));
            self.w.close("}");
            self.w.close("}");
            return Ok(());
        }
        self.w.line(format!("var raw {raw_type}"));
        self.w.line(format!("b, raw, err = {consume}(b, typ)"));
        self.w.open("if err == nil {");
        if field.has_presence {
            self.w
                .line(format!("tmp := {}", duration_from_raw("raw", unit)));
            self.w.line(format!("{name} = &tmp"));
        } else {
            self.w
                .line(format!("{name} = {}", duration_from_raw("raw", unit)));
        }
        self.w.close("}");
        Ok(())
    }

    fn decode_map(&mut self, full_name: &str, field: &Field, name: &str) -> Result<()> {
        let key_kind = field.map_key_kind.unwrap_or(Kind::String);
        let value_kind = field.map_value_kind.unwrap_or(Kind::String);
        let key_type = map_key_type(full_name, key_kind)?;
        let value_type = self.map_value_type(full_name, field)?;
        let key_consume = consume_helper(full_name, key_kind)?;
        let value_consume = match value_kind {
            Kind::Message => {
                let reference = field
                    .map_value_ref
                    .as_deref()
                    .ok_or_else(|| Error::internal(full_name, "map value without reference"))?;
                let msg = self.index.message(reference)?;
                format!("ConsumeMessageDecorator(Decode{})", msg.name)
            }
            kind => consume_helper(full_name, kind)?.to_string(),
        };
        self.w.open(format!("if {name} == nil {{"));
        self.w
            .line(format!("{name} = make(map[{key_type}]{value_type})"));
        self.w.close("}");
        self.w.line(format!(
            "b, err = ConsumeMapEntry(b, typ, {name}, {key_consume}, {value_consume})"
        ));
        Ok(())
    }
}

/// The time unit of a time-like field; a missing unit is a bug upstream.
fn time_unit_of(full_name: &str, field: &Field) -> Result<TimeUnit> {
    field
        .time_unit()
        .ok_or_else(|| Error::internal(full_name, format!("no time unit for {:?}", field.kind)))
}

/// Shape a base type per cardinality and presence.
fn shaped(base: &str, field: &Field) -> String {
    if field.is_repeated() {
        format!("[]{base}")
    } else if field.has_presence {
        format!("*{base}")
    } else {
        base.to_string()
    }
}

fn time_value_expr(name: &str, unit: TimeUnit) -> String {
    match unit {
        TimeUnit::Seconds => format!("uint64(uint32({name}.Unix()))"),
        _ => format!("uint64({name}.UnixMilli())"),
    }
}

fn time_from_raw(name: &str, unit: TimeUnit) -> String {
    match unit {
        TimeUnit::Seconds => format!("time.Unix(int64({name}), 0)"),
        _ => format!("time.UnixMilli(int64({name}))"),
    }
}

fn duration_value_expr(name: &str, unit: TimeUnit) -> String {
    match unit {
        TimeUnit::Seconds => format!("uint64(uint32(int64({name} / time.Second)))"),
        _ => format!("uint64({name}.Milliseconds())"),
    }
}

fn duration_from_raw(name: &str, unit: TimeUnit) -> String {
    match unit {
        TimeUnit::Seconds => format!("time.Duration({name}) * time.Second"),
        _ => format!("time.Duration({name}) * time.Millisecond"),
    }
}

/// The `protowire` constant for a wire type.
fn wire_const(wire_type: WireType) -> &'static str {
    match wire_type {
        WireType::Varint => "protowire.VarintType",
        WireType::I32 => "protowire.Fixed32Type",
        WireType::I64 => "protowire.Fixed64Type",
        WireType::Len => "protowire.BytesType",
    }
}

/// The Go scalar type backing a kind.
fn scalar_type(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::Bool => Ok("bool"),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 | Kind::Enum => Ok("int32"),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Ok("int64"),
        Kind::Uint32 | Kind::Fixed32 => Ok("uint32"),
        Kind::Uint64 | Kind::Fixed64 => Ok("uint64"),
        Kind::Float => Ok("float32"),
        Kind::Double => Ok("float64"),
        Kind::String => Ok("string"),
        Kind::Bytes | Kind::Message => {
            Err(Error::internal(full_name, format!("no scalar type for {kind:?}")))
        }
    }
}

/// Element type of a repeated non-packable field.
fn elem_type(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::String => Ok("string"),
        Kind::Bytes => Ok("[]byte"),
        kind => scalar_type(full_name, kind),
    }
}

/// Allowed map key types per the proto grammar.
fn map_key_type(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::Bool => Ok("bool"),
        Kind::String => Ok("string"),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Ok("int32"),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Ok("int64"),
        Kind::Uint32 | Kind::Fixed32 => Ok("uint32"),
        Kind::Uint64 | Kind::Fixed64 => Ok("uint64"),
        Kind::Float
        | Kind::Double
        | Kind::Bytes
        | Kind::Message
        | Kind::Enum => Err(Error::internal(
            full_name,
            format!("invalid map key kind {kind:?}"),
        )),
    }
}

/// Runtime append helper writing one tagged field with default suppression.
fn append_helper(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::String => Ok("AppendStringField"),
        Kind::Bytes => Ok("AppendBytesField"),
        Kind::Bool => Ok("AppendBoolField"),
        Kind::Float => Ok("AppendFloat32Field"),
        Kind::Double => Ok("AppendFloat64Field"),
        Kind::Int32 | Kind::Enum => Ok("AppendInt32Field"),
        Kind::Sint32 => Ok("AppendSint32Field"),
        Kind::Uint32 => Ok("AppendUint32Field"),
        Kind::Int64 => Ok("AppendInt64Field"),
        Kind::Sint64 => Ok("AppendSint64Field"),
        Kind::Uint64 => Ok("AppendUint64Field"),
        Kind::Fixed32 => Ok("AppendFixed32Field"),
        Kind::Fixed64 => Ok("AppendFixed64Field"),
        Kind::Sfixed32 => Ok("AppendSfixed32Field"),
        Kind::Sfixed64 => Ok("AppendSfixed64Field"),
        Kind::Message => Err(Error::internal(full_name, "no append helper for messages")),
    }
}

/// Presence-aware variant of [`append_helper`].
fn append_opt_helper(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::String => Ok("AppendStringFieldOpt"),
        Kind::Bytes => Ok("AppendBytesFieldOpt"),
        Kind::Bool => Ok("AppendBoolFieldOpt"),
        Kind::Float => Ok("AppendFloat32FieldOpt"),
        Kind::Double => Ok("AppendFloat64FieldOpt"),
        Kind::Int32 | Kind::Enum => Ok("AppendInt32FieldOpt"),
        Kind::Sint32 => Ok("AppendSint32FieldOpt"),
        Kind::Uint32 => Ok("AppendUint32FieldOpt"),
        Kind::Int64 => Ok("AppendInt64FieldOpt"),
        Kind::Sint64 => Ok("AppendSint64FieldOpt"),
        Kind::Uint64 => Ok("AppendUint64FieldOpt"),
        Kind::Fixed32 => Ok("AppendFixed32FieldOpt"),
        Kind::Fixed64 => Ok("AppendFixed64FieldOpt"),
        Kind::Sfixed32 => Ok("AppendSfixed32FieldOpt"),
        Kind::Sfixed64 => Ok("AppendSfixed64FieldOpt"),
        Kind::Message => Err(Error::internal(full_name, "no append helper for messages")),
    }
}

/// Runtime compact helper writing one untagged payload.
fn compact_helper(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::Bool => Ok("AppendBoolCompact"),
        Kind::Float => Ok("AppendFloat32Compact"),
        Kind::Double => Ok("AppendFloat64Compact"),
        Kind::Int32 | Kind::Enum => Ok("AppendInt32Compact"),
        Kind::Uint32 => Ok("AppendUint32Compact"),
        Kind::Sint32 => Ok("AppendSint32Compact"),
        Kind::Int64 => Ok("AppendInt64Compact"),
        Kind::Uint64 => Ok("AppendUint64Compact"),
        Kind::Sint64 => Ok("AppendSint64Compact"),
        Kind::Fixed32 => Ok("AppendFixed32Compact"),
        Kind::Sfixed32 => Ok("AppendSfixed32Compact"),
        Kind::Fixed64 => Ok("AppendFixed64Compact"),
        Kind::Sfixed64 => Ok("AppendSfixed64Compact"),
        Kind::String => Ok("AppendStringCompact"),
        Kind::Bytes => Ok("AppendBytesCompact"),
        Kind::Message => Err(Error::internal(full_name, "no compact helper for messages")),
    }
}

/// Runtime consume helper for one value of a kind.
fn consume_helper(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::String => Ok("ConsumeString"),
        Kind::Bytes => Ok("ConsumeBytesCopy"),
        Kind::Bool => Ok("ConsumeBool"),
        Kind::Float => Ok("ConsumeFloat32"),
        Kind::Double => Ok("ConsumeFloat64"),
        Kind::Int32 | Kind::Enum => Ok("ConsumeVarInt32"),
        Kind::Sint32 => Ok("ConsumeSint32"),
        Kind::Uint32 => Ok("ConsumeVarUint32"),
        Kind::Int64 => Ok("ConsumeVarInt64"),
        Kind::Sint64 => Ok("ConsumeSint64"),
        Kind::Uint64 => Ok("ConsumeVarUint64"),
        Kind::Fixed32 => Ok("ConsumeFixedUint32"),
        Kind::Fixed64 => Ok("ConsumeFixedUint64"),
        Kind::Sfixed32 => Ok("ConsumeSfixed32"),
        Kind::Sfixed64 => Ok("ConsumeSfixed64"),
        Kind::Message => Err(Error::internal(full_name, "no consume helper for messages")),
    }
}

/// Presence-aware variant of [`consume_helper`].
fn consume_opt_helper(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::String => Ok("ConsumeStringOpt"),
        Kind::Bytes => Ok("ConsumeBytesOpt"),
        Kind::Bool => Ok("ConsumeBoolOpt"),
        Kind::Float => Ok("ConsumeFloat32Opt"),
        Kind::Double => Ok("ConsumeFloat64Opt"),
        Kind::Int32 | Kind::Enum => Ok("ConsumeVarInt32Opt"),
        Kind::Sint32 => Ok("ConsumeSint32Opt"),
        Kind::Uint32 => Ok("ConsumeVarUint32Opt"),
        Kind::Int64 => Ok("ConsumeVarInt64Opt"),
        Kind::Sint64 => Ok("ConsumeSint64Opt"),
        Kind::Uint64 => Ok("ConsumeVarUint64Opt"),
        Kind::Fixed32 => Ok("ConsumeFixedUint32Opt"),
        Kind::Fixed64 => Ok("ConsumeFixedUint64Opt"),
        Kind::Sfixed32 => Ok("ConsumeSfixed32Opt"),
        Kind::Sfixed64 => Ok("ConsumeSfixed64Opt"),
        Kind::Message => Err(Error::internal(full_name, "no consume helper for messages")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Cardinality, Enum, EnumValue};

    fn sample_file() -> File {
        let mut n = Field::new("n", 1, Kind::Int32);
        n.has_presence = false;
        let s = Field::new("s", 2, Kind::String);
        let mut xs = Field::new("xs", 3, Kind::Int32);
        xs.cardinality = Cardinality::Repeated;
        xs.packed = true;
        let mut m = Field::new("m", 4, Kind::Message);
        m.cardinality = Cardinality::Map;
        m.map_key_kind = Some(Kind::String);
        m.map_value_kind = Some(Kind::Int32);

        File {
            path: "demo/model.proto".into(),
            package: "demo".into(),
            go_package: "model".into(),
            messages: vec![Message {
                name: "Sample".into(),
                full_name: "demo.Sample".into(),
                fields: vec![n, s, xs, m],
                repeated_wrapper: false,
            }],
            enums: vec![Enum {
                name: "Color".into(),
                full_name: "demo.Color".into(),
                values: vec![
                    EnumValue {
                        name: "COLOR_UNSPECIFIED".into(),
                        number: 0,
                    },
                    EnumValue {
                        name: "COLOR_RED".into(),
                        number: 1,
                    },
                ],
            }],
            ..File::default()
        }
    }

    fn generate_text(files: &[File], options: &Options) -> String {
        let outputs = GoEmitter.generate(files, options).unwrap();
        let model = outputs
            .iter()
            .find(|o| o.path.ends_with("model.gen.go"))
            .expect("model.gen.go");
        String::from_utf8(model.content.clone()).unwrap()
    }

    #[test]
    fn test_generate_scalar_message() {
        let files = vec![sample_file()];
        let options = Options::new().go_out("./gen/go");
        let text = generate_text(&files, &options);

        assert!(text.contains("package model"));
        assert!(text.contains("type Sample struct {"));
        assert!(text.contains("N int32 `json:\"n\"`"));
        assert!(text.contains("b = AppendInt32Field(b, m.N, 1)"));
        assert!(text.contains("b = AppendStringField(b, m.S, 2)"));
        assert!(text.contains(
            "b = AppendRepeatedCompact(b, m.Xs, 3, AppendCompactDecorator(AppendInt32Compact))"
        ));
        assert!(text.contains(
            "b, m.Xs, err = ConsumeRepeatedCompact(b, typ, protowire.VarintType, m.Xs, ConsumeVarInt32)"
        ));
        assert!(text.contains("b, err = ConsumeMapEntry(b, typ, m.M, ConsumeString, ConsumeVarInt32)"));
        assert!(text.contains("b, err = SkipFieldValue(b, num, typ)"));
        assert!(text.contains("ColorRed int32 = 1"));
    }

    #[test]
    fn test_json_tags_none() {
        let files = vec![sample_file()];
        let options = Options::new().go_out("./gen/go").json_tags(JsonTagStyle::None);
        let text = generate_text(&files, &options);
        assert!(!text.contains("`json:"));
        assert!(text.contains("N int32\n"));
    }

    #[test]
    fn test_util_package_rewrite() {
        let files = vec![sample_file()];
        let options = Options::new().go_out("./gen/go").go_package("override");
        let outputs = GoEmitter.generate(&files, &options).unwrap();
        let util = outputs
            .iter()
            .find(|o| o.path.ends_with("util.go"))
            .expect("util.go");
        let text = String::from_utf8(util.content.clone()).unwrap();
        assert!(text.starts_with("// Code generated by wiregen. DO NOT EDIT."));
        assert!(text.contains("package override"));
        assert!(!text.contains("package protowireu"));
    }

    #[test]
    fn test_missing_package_is_fatal() {
        let mut file = sample_file();
        file.go_package.clear();
        let err = GoEmitter
            .generate(&[file], &Options::new().go_out("./gen/go"))
            .unwrap_err();
        assert!(err.to_string().contains("go package name"));
    }

    #[test]
    fn test_timestamp_field_shapes() {
        let mut created = Field::new("created", 1, Kind::Message);
        created.message_ref = Some("google.protobuf.Timestamp".into());
        created.is_timestamp = true;
        let mut updated_ms = Field::new("updated_ms", 2, Kind::Int64);
        updated_ms.host_native = Some(HostNative::Time);

        let file = File {
            path: "demo/t.proto".into(),
            go_package: "model".into(),
            messages: vec![Message {
                name: "Stamped".into(),
                full_name: "demo.Stamped".into(),
                fields: vec![created, updated_ms],
                repeated_wrapper: false,
            }],
            ..File::default()
        };
        let text = generate_text(&[file], &Options::new().go_out("./gen/go"));

        assert!(text.contains("\"time\""));
        assert!(text.contains("Created time.Time"));
        assert!(text.contains("UpdatedMs time.Time"));
        assert!(text.contains("b = AppendBytesField(b, EncodeTimestamp(m.Created), 1)"));
        assert!(text.contains("b = AppendVarIntField(b, uint64(m.UpdatedMs.UnixMilli()), 2)"));
        assert!(text.contains("m.UpdatedMs = time.UnixMilli(int64(raw))"));
    }

    #[test]
    fn test_uuid_field() {
        let mut reference = Field::new("ref", 7, Kind::Bytes);
        reference.host_native = Some(HostNative::Uuid);
        let file = File {
            path: "demo/u.proto".into(),
            go_package: "model".into(),
            messages: vec![Message {
                name: "Keyed".into(),
                full_name: "demo.Keyed".into(),
                fields: vec![reference],
                repeated_wrapper: false,
            }],
            ..File::default()
        };
        let text = generate_text(&[file], &Options::new().go_out("./gen/go"));
        assert!(text.contains("\"github.com/google/uuid\""));
        assert!(text.contains("Ref uuid.UUID"));
        assert!(text.contains("b = AppendUUIDField(b, m.Ref, 7)"));
        assert!(text.contains("b, m.Ref, err = ConsumeUUID(b, typ)"));
    }

    #[test]
    fn test_unknown_message_reference() {
        let mut nested = Field::new("inner", 1, Kind::Message);
        nested.message_ref = Some("demo.Missing".into());
        let file = File {
            path: "demo/x.proto".into(),
            go_package: "model".into(),
            messages: vec![Message {
                name: "Outer".into(),
                full_name: "demo.Outer".into(),
                fields: vec![nested],
                repeated_wrapper: false,
            }],
            ..File::default()
        };
        let err = GoEmitter
            .generate(&[file], &Options::new().go_out("./gen/go"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownReference { .. }));
    }
}
