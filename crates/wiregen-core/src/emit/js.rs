//! The JavaScript emitter.
//!
//! For every input file with a JavaScript output directory this emitter
//! produces a `model.gen.js` containing JSDoc typedefs, enum value objects,
//! and `write`/`encode`/`decode` functions, plus one `util.js` runtime per
//! distinct output directory providing the `Writer`/`Reader` classes the
//! generated code drives.

use crate::emit::{Emitter, Options, OutputFile, SourceWriter};
use crate::error::{Error, Result};
use crate::ir::{names, Field, File, Kind, Message, ScriptNative, TypeIndex};
use crate::wire::WireType;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// The static runtime shipped next to generated JavaScript code.
const UTIL_SOURCE: &str = include_str!("runtime/util.js");

/// Emits JavaScript typedefs and wire-format functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsEmitter;

impl Emitter for JsEmitter {
    fn name(&self) -> &'static str {
        "js"
    }

    fn generate(&self, files: &[File], options: &Options) -> Result<Vec<OutputFile>> {
        let index = TypeIndex::build(files);
        let mut outputs = Vec::new();
        let mut runtime_dirs: BTreeSet<String> = BTreeSet::new();

        for file in files {
            let out_dir = if options.js_out.is_empty() {
                file.js_out.as_str()
            } else {
                options.js_out.as_str()
            };
            if out_dir.is_empty() {
                continue;
            }
            let source = JsFile::new(&index).render(file)?;
            debug!("generated JavaScript for {} into {}", file.path, out_dir);
            outputs.push(OutputFile::new(
                Path::new(out_dir).join("model.gen.js"),
                source,
            ));
            runtime_dirs.insert(out_dir.to_string());
        }

        for dir in runtime_dirs {
            outputs.push(OutputFile::new(Path::new(&dir).join("util.js"), UTIL_SOURCE));
        }
        Ok(outputs)
    }
}

/// Runtime symbols the generated file needs to import.
#[derive(Debug, Default)]
struct RuntimeNeeds {
    read_int64: bool,
    read_int64_bigint: bool,
    timestamp: bool,
    duration: bool,
    timestamp_native: bool,
    duration_bigint: bool,
}

impl RuntimeNeeds {
    fn import_list(&self) -> String {
        let mut symbols = vec!["Reader", "WIRE", "Writer", "tag"];
        if self.timestamp {
            symbols.extend(["decodeTimestampMessage", "writeTimestamp"]);
        }
        if self.timestamp_native {
            symbols.extend([
                "decodeTimestampBigIntMessage",
                "decodeTimestampMillisMessage",
                "writeTimestampFromBigInt",
                "writeTimestampFromMillis",
            ]);
        }
        if self.duration {
            symbols.extend(["decodeDurationMessage", "writeDuration"]);
        }
        if self.duration_bigint {
            symbols.extend(["decodeDurationBigIntMessage", "writeDurationFromBigInt"]);
        }
        if self.read_int64 {
            symbols.push("readInt64");
        }
        if self.read_int64_bigint {
            symbols.push("readInt64BigInt");
        }
        symbols.sort_unstable();
        symbols.join(", ")
    }
}

/// Per-file emission state.
struct JsFile<'a> {
    index: &'a TypeIndex<'a>,
    needs: RuntimeNeeds,
    w: SourceWriter,
}

impl<'a> JsFile<'a> {
    fn new(index: &'a TypeIndex<'a>) -> Self {
        Self {
            index,
            needs: RuntimeNeeds::default(),
            w: SourceWriter::new("    "),
        }
    }

    fn render(mut self, file: &File) -> Result<String> {
        for enum_type in &file.enums {
            self.w.line("/**");
            self.w.line(format!(" * @typedef {{number}} {}", enum_type.name));
            self.w.line(" */");
            self.w
                .open(format!("export const {} = Object.freeze({{", enum_type.name));
            for value in &enum_type.values {
                self.w.line(format!("{}: {},", value.name, value.number));
            }
            self.w.close("});");
            self.w.blank();
        }

        for message in &file.messages {
            self.write_typedef(message)?;
            self.w.blank();
        }
        for message in &file.messages {
            self.write_write_func(message)?;
            self.w.blank();
            self.write_encode_func(message);
            self.w.blank();
            self.write_decode_message_func(message)?;
            self.w.blank();
            self.write_decode_func(message);
            self.w.blank();
        }

        let body = self.w.finish();
        let mut out = String::new();
        out.push_str("// Code generated by wiregen. DO NOT EDIT.\n");
        out.push_str("//\n");
        out.push_str(&format!("// Source: {}\n", file.path));
        out.push('\n');
        out.push_str(&format!(
            "import {{ {} }} from \"./util.js\";\n",
            self.needs.import_list()
        ));
        out.push('\n');
        out.push_str(&body);
        Ok(out)
    }

    fn write_typedef(&mut self, message: &Message) -> Result<()> {
        if let Some(field) = repeated_wrapper_field(message) {
            let elem = self.wrapper_elem_type(field)?;
            self.w.line("/**");
            self.w
                .line(format!(" * @typedef {{{elem}[]}} {}", message.name));
            self.w.line(" */");
            return Ok(());
        }
        self.w.line("/**");
        self.w
            .line(format!(" * @typedef {{Object}} {}", message.name));
        for field in &message.fields {
            let doc_type = self.doc_type(field)?;
            self.w.line(format!(
                " * @property {{{doc_type}}} {}",
                names::js_name(&field.name)
            ));
        }
        self.w.line(" */");
        Ok(())
    }

    fn doc_type(&self, field: &Field) -> Result<String> {
        if field.is_map() {
            let value = self.map_value_type(field)?;
            return Ok(format!("Object.<string, {value}>"));
        }
        let base = self.base_type(field)?;
        if field.is_repeated() {
            return Ok(format!("{base}[]"));
        }
        Ok(base)
    }

    fn base_type(&self, field: &Field) -> Result<String> {
        if let Some(reference) = field.enum_ref.as_deref() {
            self.index.enum_type(reference)?;
        }
        if let Some(native) = field.script_native {
            return Ok(match native {
                ScriptNative::Number => "number".to_string(),
                ScriptNative::Bigint => "bigint".to_string(),
            });
        }
        if field.is_timestamp {
            return Ok("Date".to_string());
        }
        if field.is_duration {
            return Ok("number".to_string());
        }
        match field.kind {
            Kind::String => Ok("string".to_string()),
            Kind::Bytes => Ok("Uint8Array".to_string()),
            Kind::Bool => Ok("boolean".to_string()),
            Kind::Message => {
                let reference = field
                    .message_ref
                    .as_deref()
                    .ok_or_else(|| Error::internal(&field.name, "message field without reference"))?;
                Ok(self.index.message(reference)?.name.clone())
            }
            Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Fixed32
            | Kind::Fixed64
            | Kind::Sfixed32
            | Kind::Sfixed64
            | Kind::Float
            | Kind::Double
            | Kind::Enum => Ok("number".to_string()),
        }
    }

    fn map_value_type(&self, field: &Field) -> Result<String> {
        match field.map_value_kind.unwrap_or(Kind::String) {
            Kind::Message => {
                let reference = field
                    .map_value_ref
                    .as_deref()
                    .ok_or_else(|| Error::internal(&field.name, "map value without reference"))?;
                Ok(self.index.message(reference)?.name.clone())
            }
            Kind::Bytes => Ok("Uint8Array".to_string()),
            Kind::Bool => Ok("boolean".to_string()),
            Kind::String => Ok("string".to_string()),
            _ => Ok("number".to_string()),
        }
    }

    fn wrapper_elem_type(&self, field: &Field) -> Result<String> {
        let mut elem = Field::new(field.name.clone(), field.number, field.kind);
        elem.message_ref = field.message_ref.clone();
        elem.enum_ref = field.enum_ref.clone();
        elem.is_timestamp = field.is_timestamp;
        elem.is_duration = field.is_duration;
        elem.script_native = field.script_native;
        self.base_type(&elem)
    }

    fn default_value(&self, field: &Field) -> String {
        if field.is_map() {
            return "{}".to_string();
        }
        if field.is_repeated() {
            return "[]".to_string();
        }
        if field.has_presence {
            return "undefined".to_string();
        }
        match field.script_native {
            Some(ScriptNative::Bigint) => return "0n".to_string(),
            Some(ScriptNative::Number) => return "0".to_string(),
            None => {}
        }
        if field.is_timestamp {
            return "new Date(0)".to_string();
        }
        if field.is_duration {
            return "0".to_string();
        }
        match field.kind {
            Kind::String => "\"\"".to_string(),
            Kind::Bytes => "new Uint8Array(0)".to_string(),
            Kind::Bool => "false".to_string(),
            Kind::Message => "undefined".to_string(),
            _ => "0".to_string(),
        }
    }

    fn presence_check(&self, field: &Field, name: &str) -> String {
        if field.has_presence {
            return format!("{name} !== undefined && {name} !== null");
        }
        match field.script_native {
            Some(ScriptNative::Bigint) => {
                return format!("{name} !== undefined && {name} !== null && {name} !== 0n");
            }
            Some(ScriptNative::Number) => {
                return format!("{name} !== undefined && {name} !== null && {name} !== 0");
            }
            None => {}
        }
        if field.kind == Kind::Message && !field.is_timestamp && !field.is_duration {
            return format!("{name} !== undefined && {name} !== null");
        }
        if field.is_timestamp {
            return format!("{name} instanceof Date");
        }
        if field.is_duration {
            return format!("{name} !== undefined && {name} !== null && {name} !== 0");
        }
        match field.kind {
            Kind::String => format!("{name} !== undefined && {name} !== null && {name} !== \"\""),
            Kind::Bytes => format!("{name} && {name}.length > 0"),
            Kind::Bool => format!("{name} === true"),
            _ => format!("{name} !== undefined && {name} !== null && {name} !== 0"),
        }
    }

    fn write_write_func(&mut self, message: &Message) -> Result<()> {
        self.w.line("/**");
        self.w.line(format!(" * @param {{{}}} message", message.name));
        self.w.line(" * @param {Writer} writer");
        self.w.line(" */");
        self.w.open(format!(
            "export function write{}(message, writer) {{",
            message.name
        ));

        if let Some(field) = repeated_wrapper_field(message) {
            self.write_wrapper_body(field)?;
            self.w.close("}");
            return Ok(());
        }

        for field in &message.fields {
            let name = format!("message.{}", names::js_name(&field.name));
            if field.is_map() {
                self.encode_map(field, &name)?;
                continue;
            }
            if field.is_repeated() {
                if field.is_packed_wire() {
                    self.encode_packed(field, &name)?;
                } else {
                    self.w.open(format!("if ({name} && {name}.length > 0) {{"));
                    self.w.open(format!("for (const item of {name}) {{"));
                    self.encode_field(field, "item")?;
                    self.w.close("}");
                    self.w.close("}");
                }
                continue;
            }
            let cond = self.presence_check(field, &name);
            self.w.open(format!("if ({cond}) {{"));
            self.encode_field(field, &name)?;
            self.w.close("}");
        }
        self.w.close("}");
        Ok(())
    }

    fn write_wrapper_body(&mut self, field: &Field) -> Result<()> {
        if field.is_packed_wire() {
            self.w.open("if (message) {");
            self.w.line("const packedWriter = Writer.create();");
            self.w.open("for (const item of message) {");
            self.w
                .line(format!("packedWriter.{}(item);", writer_method(&field.name, field.kind)?));
            self.w.close("}");
            self.w.open("if (packedWriter.len > 0) {");
            self.w.line(format!(
                "writer.uint32(tag({}, WIRE.LDELIM)).bytes(packedWriter.finish());",
                field.number
            ));
            self.w.close("}");
            self.w.close("}");
            return Ok(());
        }
        self.w.open("if (message) {");
        self.w.open("for (const item of message) {");
        self.encode_field(field, "item")?;
        self.w.close("}");
        self.w.close("}");
        Ok(())
    }

    fn encode_packed(&mut self, field: &Field, name: &str) -> Result<()> {
        self.w.open(format!("if ({name}) {{"));
        self.w.line("const packedWriter = Writer.create();");
        self.w.open(format!("for (const item of {name}) {{"));
        self.w
            .line(format!("packedWriter.{}(item);", writer_method(&field.name, field.kind)?));
        self.w.close("}");
        self.w.open("if (packedWriter.len > 0) {");
        self.w.line(format!(
            "writer.uint32(tag({}, WIRE.LDELIM)).bytes(packedWriter.finish());",
            field.number
        ));
        self.w.close("}");
        self.w.close("}");
        Ok(())
    }

    fn encode_map(&mut self, field: &Field, name: &str) -> Result<()> {
        let key_kind = field.map_key_kind.unwrap_or(Kind::String);
        let value_kind = field.map_value_kind.unwrap_or(Kind::String);
        self.w
            .open(format!("if ({name} && Object.keys({name}).length > 0) {{"));
        self.w.open(format!(
            "for (const [rawKey, value] of Object.entries({name})) {{"
        ));
        self.w
            .line(format!("const key = {};", map_key_cast(key_kind)));
        self.w.line(format!(
            "writer.uint32(tag({}, WIRE.LDELIM)).fork();",
            field.number
        ));
        self.w.line(format!(
            "writer.uint32(tag(1, {})).{}(key);",
            wire_const(key_kind.wire_type()),
            writer_method(&field.name, key_kind)?
        ));
        match value_kind {
            Kind::Message => {
                let reference = field
                    .map_value_ref
                    .as_deref()
                    .ok_or_else(|| Error::internal(&field.name, "map value without reference"))?;
                let msg = self.index.message(reference)?;
                self.w.open("if (value) {");
                self.w.line("writer.uint32(tag(2, WIRE.LDELIM)).fork();");
                self.w.line(format!("write{}(value, writer);", msg.name));
                self.w.line("writer.ldelim();");
                self.w.close("}");
            }
            Kind::Bytes => {
                self.w.open("if (value && value.length > 0) {");
                self.w.line("writer.uint32(tag(2, WIRE.LDELIM)).bytes(value);");
                self.w.close("}");
            }
            kind => {
                self.w
                    .open(format!("if ({}) {{", map_value_presence(kind)));
                self.w.line(format!(
                    "writer.uint32(tag(2, {})).{}(value);",
                    wire_const(kind.wire_type()),
                    writer_method(&field.name, kind)?
                ));
                self.w.close("}");
            }
        }
        self.w.line("writer.ldelim();");
        self.w.close("}");
        self.w.close("}");
        Ok(())
    }

    fn encode_field(&mut self, field: &Field, name: &str) -> Result<()> {
        if field.script_native.is_some() {
            return self.encode_native_field(field, name);
        }
        let number = field.number;
        if field.is_timestamp {
            self.needs.timestamp = true;
            self.w
                .line(format!("writer.uint32(tag({number}, WIRE.LDELIM)).fork();"));
            self.w.line(format!("writeTimestamp({name}, writer);"));
            self.w.line("writer.ldelim();");
            return Ok(());
        }
        if field.is_duration {
            self.needs.duration = true;
            self.w
                .line(format!("writer.uint32(tag({number}, WIRE.LDELIM)).fork();"));
            self.w.line(format!("writeDuration({name}, writer);"));
            self.w.line("writer.ldelim();");
            return Ok(());
        }
        if field.kind == Kind::Message {
            let reference = field
                .message_ref
                .as_deref()
                .ok_or_else(|| Error::internal(&field.name, "message field without reference"))?;
            let msg = self.index.message(reference)?;
            self.w
                .line(format!("writer.uint32(tag({number}, WIRE.LDELIM)).fork();"));
            self.w.line(format!("write{}({name}, writer);", msg.name));
            self.w.line("writer.ldelim();");
            return Ok(());
        }
        self.w.line(format!(
            "writer.uint32(tag({number}, {})).{}({name});",
            wire_const(field.kind.wire_type()),
            writer_method(&field.name, field.kind)?
        ));
        Ok(())
    }

    fn encode_native_field(&mut self, field: &Field, name: &str) -> Result<()> {
        let number = field.number;
        let native = field
            .script_native
            .ok_or_else(|| Error::internal(&field.name, "native encode without override"))?;
        if field.is_timestamp {
            self.needs.timestamp_native = true;
            let helper = match native {
                ScriptNative::Number => "writeTimestampFromMillis",
                ScriptNative::Bigint => "writeTimestampFromBigInt",
            };
            self.w
                .line(format!("writer.uint32(tag({number}, WIRE.LDELIM)).fork();"));
            self.w.line(format!("{helper}({name}, writer);"));
            self.w.line("writer.ldelim();");
            return Ok(());
        }
        if field.is_duration {
            let helper = match native {
                ScriptNative::Number => {
                    self.needs.duration = true;
                    "writeDuration"
                }
                ScriptNative::Bigint => {
                    self.needs.duration_bigint = true;
                    "writeDurationFromBigInt"
                }
            };
            self.w
                .line(format!("writer.uint32(tag({number}, WIRE.LDELIM)).fork();"));
            self.w.line(format!("{helper}({name}, writer);"));
            self.w.line("writer.ldelim();");
            return Ok(());
        }
        match (field.kind, native) {
            (Kind::Int32, ScriptNative::Number) => {
                self.w.line(format!(
                    "writer.uint32(tag({number}, WIRE.VARINT)).int32(Math.trunc({name}));"
                ));
            }
            (Kind::Int64, ScriptNative::Number) => {
                self.w.line(format!(
                    "writer.uint32(tag({number}, WIRE.VARINT)).int64(Math.trunc({name}));"
                ));
            }
            (Kind::Int32, ScriptNative::Bigint) => {
                self.w.line(format!(
                    "writer.uint32(tag({number}, WIRE.VARINT)).int32(Number({name}));"
                ));
            }
            (Kind::Int64, ScriptNative::Bigint) => {
                self.w.line(format!(
                    "writer.uint32(tag({number}, WIRE.VARINT)).int64({name}.toString());"
                ));
            }
            _ => {
                return Err(Error::internal(
                    &field.name,
                    "unsupported native type conversion",
                ));
            }
        }
        Ok(())
    }

    fn write_encode_func(&mut self, message: &Message) {
        self.w.line("/**");
        self.w.line(format!(" * @param {{{}}} message", message.name));
        self.w.line(" * @returns {Uint8Array}");
        self.w.line(" */");
        self.w
            .open(format!("export function encode{}(message) {{", message.name));
        self.w.line("const writer = Writer.create();");
        self.w
            .line(format!("write{}(message, writer);", message.name));
        self.w.line("return writer.finish();");
        self.w.close("}");
    }

    fn write_decode_func(&mut self, message: &Message) {
        self.w.line("/**");
        self.w.line(" * @param {ArrayBuffer} buffer");
        self.w.line(format!(" * @returns {{{}}}", message.name));
        self.w.line(" */");
        self.w
            .open(format!("export function decode{}(buffer) {{", message.name));
        self.w
            .line("const reader = Reader.create(new Uint8Array(buffer));");
        self.w
            .line(format!("return decode{}Message(reader);", message.name));
        self.w.close("}");
    }

    fn write_decode_message_func(&mut self, message: &Message) -> Result<()> {
        self.w.line("/**");
        self.w.line(" * @param {Reader} reader");
        self.w.line(" * @param {number} [length]");
        self.w.line(format!(" * @returns {{{}}}", message.name));
        self.w.line(" */");
        self.w.open(format!(
            "function decode{}Message(reader, length) {{",
            message.name
        ));
        self.w
            .line("const end = length === undefined ? reader.len : reader.pos + length;");

        if let Some(field) = repeated_wrapper_field(message) {
            self.w.line("const message = [];");
            self.w.open("while (reader.pos < end) {");
            self.w.line("const tag = reader.uint32();");
            self.w.open("switch (tag >>> 3) {");
            self.w.open(format!("case {}: {{", field.number));
            self.decode_wrapper_field(field)?;
            self.w.line("break;");
            self.w.close("}");
            self.w.open("default:");
            self.w.line("reader.skipType(tag & 7);");
            self.w.dedent();
            self.w.close("}");
            self.w.close("}");
            self.w.line("return message;");
            self.w.close("}");
            return Ok(());
        }

        let defaults: Vec<String> = message
            .fields
            .iter()
            .map(|f| format!("{}: {}", names::js_name(&f.name), self.default_value(f)))
            .collect();
        self.w
            .line(format!("const message = {{ {} }};", defaults.join(", ")));
        self.w.open("while (reader.pos < end) {");
        self.w.line("const tag = reader.uint32();");
        self.w.open("switch (tag >>> 3) {");
        for field in &message.fields {
            self.w.open(format!("case {}: {{", field.number));
            self.decode_field(field, "message")?;
            self.w.line("break;");
            self.w.close("}");
        }
        self.w.open("default:");
        self.w.line("reader.skipType(tag & 7);");
        self.w.dedent();
        self.w.close("}");
        self.w.close("}");
        self.w.line("return message;");
        self.w.close("}");
        Ok(())
    }

    fn decode_field(&mut self, field: &Field, target: &str) -> Result<()> {
        let name = format!("{target}.{}", names::js_name(&field.name));
        if field.script_native.is_some() {
            return self.decode_native_field(field, &name);
        }
        if field.is_map() {
            return self.decode_map(field, &name);
        }
        if field.is_repeated() {
            if field.is_timestamp {
                self.needs.timestamp = true;
                self.w.line(format!(
                    "{name}.push(decodeTimestampMessage(reader, reader.uint32()));"
                ));
                return Ok(());
            }
            if field.is_duration {
                self.needs.duration = true;
                self.w.line(format!(
                    "{name}.push(decodeDurationMessage(reader, reader.uint32()));"
                ));
                return Ok(());
            }
            if field.kind == Kind::Message {
                let msg = self.resolve_message(field)?;
                self.w.line(format!(
                    "{name}.push(decode{}Message(reader, reader.uint32()));",
                    msg.name
                ));
                return Ok(());
            }
            if field.kind.is_packable() {
                self.decode_packed(field, &name)?;
                return Ok(());
            }
            let read = self.read_value_expr(field.kind, &field.name)?;
            self.w.line(format!("{name}.push({read});"));
            return Ok(());
        }
        if field.is_timestamp {
            self.needs.timestamp = true;
            self.w.line(format!(
                "{name} = decodeTimestampMessage(reader, reader.uint32());"
            ));
            return Ok(());
        }
        if field.is_duration {
            self.needs.duration = true;
            self.w.line(format!(
                "{name} = decodeDurationMessage(reader, reader.uint32());"
            ));
            return Ok(());
        }
        if field.kind == Kind::Message {
            let msg = self.resolve_message(field)?;
            self.w.line(format!(
                "{name} = decode{}Message(reader, reader.uint32());",
                msg.name
            ));
            return Ok(());
        }
        let read = self.read_value_expr(field.kind, &field.name)?;
        self.w.line(format!("{name} = {read};"));
        Ok(())
    }

    /// Packed-capable fields accept both encodings on decode.
    fn decode_packed(&mut self, field: &Field, name: &str) -> Result<()> {
        let read = self.read_value_expr(field.kind, &field.name)?;
        self.w.open("if ((tag & 7) === WIRE.LDELIM) {");
        self.w.line("const end2 = reader.uint32() + reader.pos;");
        self.w.open("while (reader.pos < end2) {");
        self.w.line(format!("{name}.push({read});"));
        self.w.close("}");
        self.w.close("} else {");
        self.w.indent();
        self.w.line(format!("{name}.push({read});"));
        self.w.close("}");
        Ok(())
    }

    fn decode_native_field(&mut self, field: &Field, name: &str) -> Result<()> {
        let native = field
            .script_native
            .ok_or_else(|| Error::internal(&field.name, "native decode without override"))?;
        if field.is_timestamp {
            self.needs.timestamp_native = true;
            let helper = match native {
                ScriptNative::Number => "decodeTimestampMillisMessage",
                ScriptNative::Bigint => "decodeTimestampBigIntMessage",
            };
            if field.is_repeated() {
                self.w
                    .line(format!("{name}.push({helper}(reader, reader.uint32()));"));
            } else {
                self.w
                    .line(format!("{name} = {helper}(reader, reader.uint32());"));
            }
            return Ok(());
        }
        if field.is_duration {
            let helper = match native {
                ScriptNative::Number => {
                    self.needs.duration = true;
                    "decodeDurationMessage"
                }
                ScriptNative::Bigint => {
                    self.needs.duration_bigint = true;
                    "decodeDurationBigIntMessage"
                }
            };
            if field.is_repeated() {
                self.w
                    .line(format!("{name}.push({helper}(reader, reader.uint32()));"));
            } else {
                self.w
                    .line(format!("{name} = {helper}(reader, reader.uint32());"));
            }
            return Ok(());
        }

        let read = match (field.kind, native) {
            (Kind::Int32, ScriptNative::Number) => "reader.int32()".to_string(),
            (Kind::Int32, ScriptNative::Bigint) => "BigInt(reader.int32())".to_string(),
            (Kind::Int64, ScriptNative::Number) => {
                self.needs.read_int64 = true;
                "readInt64(reader, \"int64\")".to_string()
            }
            (Kind::Int64, ScriptNative::Bigint) => {
                self.needs.read_int64_bigint = true;
                "readInt64BigInt(reader, \"int64\")".to_string()
            }
            _ => {
                return Err(Error::internal(
                    &field.name,
                    "unsupported native type conversion",
                ));
            }
        };
        if field.is_repeated() {
            if field.kind.is_packable() && field.packed {
                self.w.open("if ((tag & 7) === WIRE.LDELIM) {");
                self.w.line("const end2 = reader.uint32() + reader.pos;");
                self.w.open("while (reader.pos < end2) {");
                self.w.line(format!("{name}.push({read});"));
                self.w.close("}");
                self.w.close("} else {");
                self.w.indent();
                self.w.line(format!("{name}.push({read});"));
                self.w.close("}");
            } else {
                self.w.line(format!("{name}.push({read});"));
            }
        } else {
            self.w.line(format!("{name} = {read};"));
        }
        Ok(())
    }

    fn decode_map(&mut self, field: &Field, name: &str) -> Result<()> {
        let key_kind = field.map_key_kind.unwrap_or(Kind::String);
        let value_kind = field.map_value_kind.unwrap_or(Kind::String);
        self.w.line("const end2 = reader.uint32() + reader.pos;");
        self.w
            .line(format!("let key = {};", map_key_default(key_kind)));
        self.w
            .line(format!("let value = {};", map_value_default(value_kind)));
        self.w.open("while (reader.pos < end2) {");
        self.w.line("const tag2 = reader.uint32();");
        self.w.open("switch (tag2 >>> 3) {");
        self.w.open("case 1:");
        let key_read = self.read_value_expr(key_kind, &field.name)?;
        self.w.line(format!("key = {key_read};"));
        self.w.line("break;");
        self.w.dedent();
        self.w.open("case 2:");
        match value_kind {
            Kind::Message => {
                let reference = field
                    .map_value_ref
                    .as_deref()
                    .ok_or_else(|| Error::internal(&field.name, "map value without reference"))?;
                let msg = self.index.message(reference)?;
                self.w.line(format!(
                    "value = decode{}Message(reader, reader.uint32());",
                    msg.name
                ));
            }
            kind => {
                let value_read = self.read_value_expr(kind, &field.name)?;
                self.w.line(format!("value = {value_read};"));
            }
        }
        self.w.line("break;");
        self.w.dedent();
        self.w.open("default:");
        self.w.line("reader.skipType(tag2 & 7);");
        self.w.dedent();
        self.w.close("}");
        self.w.close("}");
        self.w.open(format!("if (!{name}) {{"));
        self.w.line(format!("{name} = {{}};"));
        self.w.close("}");
        self.w.line(format!("{name}[String(key)] = value;"));
        Ok(())
    }

    fn decode_wrapper_field(&mut self, field: &Field) -> Result<()> {
        if field.script_native.is_some() {
            return self.decode_native_field(field, "message");
        }
        if field.is_timestamp {
            self.needs.timestamp = true;
            self.w
                .line("message.push(decodeTimestampMessage(reader, reader.uint32()));");
            return Ok(());
        }
        if field.is_duration {
            self.needs.duration = true;
            self.w
                .line("message.push(decodeDurationMessage(reader, reader.uint32()));");
            return Ok(());
        }
        if field.kind == Kind::Message {
            let msg = self.resolve_message(field)?;
            self.w.line(format!(
                "message.push(decode{}Message(reader, reader.uint32()));",
                msg.name
            ));
            return Ok(());
        }
        if field.kind.is_packable() {
            return self.decode_packed(field, "message");
        }
        let read = self.read_value_expr(field.kind, &field.name)?;
        self.w.line(format!("message.push({read});"));
        Ok(())
    }

    /// Expression reading one value of a kind off the reader, routing
    /// 64-bit kinds through `readInt64`.
    fn read_value_expr(&mut self, kind: Kind, full_name: &str) -> Result<String> {
        let method = reader_method(full_name, kind)?;
        if is_read_int64(kind) {
            self.needs.read_int64 = true;
            return Ok(format!("readInt64(reader, \"{method}\")"));
        }
        Ok(format!("reader.{method}()"))
    }

    fn resolve_message(&self, field: &Field) -> Result<&'a Message> {
        let reference = field
            .message_ref
            .as_deref()
            .ok_or_else(|| Error::internal(&field.name, "message field without reference"))?;
        self.index.message(reference)
    }
}

fn repeated_wrapper_field(message: &Message) -> Option<&Field> {
    if !message.repeated_wrapper {
        return None;
    }
    message.fields.first()
}

/// 64-bit kinds decode through the precision-aware read helpers.
fn is_read_int64(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Int64 | Kind::Uint64 | Kind::Sint64 | Kind::Fixed64 | Kind::Sfixed64
    )
}

/// The `WIRE` constant for a wire type.
fn wire_const(wire_type: WireType) -> &'static str {
    match wire_type {
        WireType::Varint => "WIRE.VARINT",
        WireType::I32 => "WIRE.FIXED32",
        WireType::I64 => "WIRE.FIXED64",
        WireType::Len => "WIRE.LDELIM",
    }
}

/// The `Writer` method carrying a kind.
fn writer_method(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::Bool => Ok("bool"),
        Kind::Int32 => Ok("int32"),
        Kind::Int64 => Ok("int64"),
        Kind::Uint32 => Ok("uint32"),
        Kind::Uint64 => Ok("uint64"),
        Kind::Sint32 => Ok("sint32"),
        Kind::Sint64 => Ok("sint64"),
        Kind::Fixed32 => Ok("fixed32"),
        Kind::Fixed64 => Ok("fixed64"),
        Kind::Sfixed32 => Ok("sfixed32"),
        Kind::Sfixed64 => Ok("sfixed64"),
        Kind::Float => Ok("float"),
        Kind::Double => Ok("double"),
        Kind::String => Ok("string"),
        Kind::Bytes => Ok("bytes"),
        Kind::Enum => Ok("int32"),
        Kind::Message => Err(Error::internal(full_name, "no writer method for messages")),
    }
}

/// The `Reader` method carrying a kind.
fn reader_method(full_name: &str, kind: Kind) -> Result<&'static str> {
    match kind {
        Kind::Bool => Ok("bool"),
        Kind::Int32 => Ok("int32"),
        Kind::Int64 => Ok("int64"),
        Kind::Uint32 => Ok("uint32"),
        Kind::Uint64 => Ok("uint64"),
        Kind::Sint32 => Ok("sint32"),
        Kind::Sint64 => Ok("sint64"),
        Kind::Fixed32 => Ok("fixed32"),
        Kind::Fixed64 => Ok("fixed64"),
        Kind::Sfixed32 => Ok("sfixed32"),
        Kind::Sfixed64 => Ok("sfixed64"),
        Kind::Float => Ok("float"),
        Kind::Double => Ok("double"),
        Kind::String => Ok("string"),
        Kind::Bytes => Ok("bytes"),
        Kind::Enum => Ok("int32"),
        Kind::Message => Err(Error::internal(full_name, "no reader method for messages")),
    }
}

fn map_key_cast(kind: Kind) -> &'static str {
    match kind {
        Kind::String => "rawKey",
        Kind::Bool => "rawKey === \"true\"",
        _ => "Number(rawKey)",
    }
}

fn map_key_default(kind: Kind) -> &'static str {
    match kind {
        Kind::Bool => "false",
        Kind::String => "\"\"",
        _ => "0",
    }
}

fn map_value_default(kind: Kind) -> &'static str {
    match kind {
        Kind::Bool => "false",
        Kind::String => "\"\"",
        Kind::Bytes => "new Uint8Array(0)",
        Kind::Message => "undefined",
        _ => "0",
    }
}

fn map_value_presence(kind: Kind) -> &'static str {
    match kind {
        Kind::String => "value !== undefined && value !== null && value !== \"\"",
        Kind::Bool => "value === true",
        _ => "value !== undefined && value !== null && value !== 0",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Cardinality, HostNative};

    fn wrapper_file() -> File {
        let mut ids = Field::new("ids", 1, Kind::Int64);
        ids.cardinality = Cardinality::Repeated;
        ids.packed = true;
        File {
            path: "demo/ids.proto".into(),
            js_out: "./gen/js".into(),
            messages: vec![Message {
                name: "IDList".into(),
                full_name: "demo.IDList".into(),
                fields: vec![ids],
                repeated_wrapper: true,
            }],
            ..File::default()
        }
    }

    fn generate_text(files: &[File], options: &Options) -> String {
        let outputs = JsEmitter.generate(files, options).unwrap();
        let model = outputs
            .iter()
            .find(|o| o.path.ends_with("model.gen.js"))
            .expect("model.gen.js");
        String::from_utf8(model.content.clone()).unwrap()
    }

    #[test]
    fn test_repeated_wrapper_renders_as_array() {
        let text = generate_text(&[wrapper_file()], &Options::new());
        assert!(text.contains("@typedef {number[]} IDList"));
        assert!(text.contains("const message = [];"));
        assert!(text.contains("message.push(readInt64(reader, \"int64\"));"));
        // Packed fields accept both encodings
        assert!(text.contains("if ((tag & 7) === WIRE.LDELIM) {"));
        assert!(text.contains("reader.skipType(tag & 7);"));
    }

    #[test]
    fn test_scalar_message() {
        let mut n = Field::new("n", 1, Kind::Int32);
        n.has_presence = false;
        let s = Field::new("s", 2, Kind::String);
        let file = File {
            path: "demo/model.proto".into(),
            js_out: "./gen/js".into(),
            messages: vec![Message {
                name: "Sample".into(),
                full_name: "demo.Sample".into(),
                fields: vec![n, s],
                repeated_wrapper: false,
            }],
            ..File::default()
        };
        let text = generate_text(&[file], &Options::new());
        assert!(text.contains("export function writeSample(message, writer) {"));
        assert!(text.contains("writer.uint32(tag(1, WIRE.VARINT)).int32(message.n);"));
        assert!(text.contains(
            "if (message.s !== undefined && message.s !== null && message.s !== \"\") {"
        ));
        assert!(text.contains("const message = { n: 0, s: \"\" };"));
        assert!(text.contains("message.n = reader.int32();"));
        assert!(text.contains("import { Reader, WIRE, Writer, tag } from \"./util.js\";"));
    }

    #[test]
    fn test_bigint_timestamp_imports() {
        let mut ts = Field::new("created", 1, Kind::Message);
        ts.message_ref = Some("google.protobuf.Timestamp".into());
        ts.is_timestamp = true;
        ts.script_native = Some(ScriptNative::Bigint);
        let file = File {
            path: "demo/t.proto".into(),
            js_out: "./gen/js".into(),
            messages: vec![Message {
                name: "Stamped".into(),
                full_name: "demo.Stamped".into(),
                fields: vec![ts],
                repeated_wrapper: false,
            }],
            ..File::default()
        };
        let text = generate_text(&[file], &Options::new());
        assert!(text.contains("writeTimestampFromBigInt(message.created, writer);"));
        assert!(text.contains("message.created = decodeTimestampBigIntMessage(reader, reader.uint32());"));
        assert!(text.contains("decodeTimestampBigIntMessage"));
        assert!(text.contains("@property {bigint} created"));
    }

    #[test]
    fn test_host_native_does_not_leak_into_js() {
        // A Go-side uuid override must not change the JS shape
        let mut reference = Field::new("ref", 7, Kind::Bytes);
        reference.host_native = Some(HostNative::Uuid);
        let file = File {
            path: "demo/u.proto".into(),
            js_out: "./gen/js".into(),
            messages: vec![Message {
                name: "Keyed".into(),
                full_name: "demo.Keyed".into(),
                fields: vec![reference],
                repeated_wrapper: false,
            }],
            ..File::default()
        };
        let text = generate_text(&[file], &Options::new());
        assert!(text.contains("@property {Uint8Array} ref"));
        assert!(text.contains("writer.uint32(tag(7, WIRE.LDELIM)).bytes(message.ref);"));
    }

    #[test]
    fn test_map_field() {
        let mut m = Field::new("labels", 4, Kind::Message);
        m.cardinality = Cardinality::Map;
        m.map_key_kind = Some(Kind::String);
        m.map_value_kind = Some(Kind::Int32);
        let file = File {
            path: "demo/m.proto".into(),
            js_out: "./gen/js".into(),
            messages: vec![Message {
                name: "Tagged".into(),
                full_name: "demo.Tagged".into(),
                fields: vec![m],
                repeated_wrapper: false,
            }],
            ..File::default()
        };
        let text = generate_text(&[file], &Options::new());
        assert!(text.contains("@property {Object.<string, number>} labels"));
        assert!(text.contains("for (const [rawKey, value] of Object.entries(message.labels)) {"));
        assert!(text.contains("writer.uint32(tag(1, WIRE.LDELIM)).string(key);"));
        assert!(text.contains("message.labels[String(key)] = value;"));
        assert!(text.contains("reader.skipType(tag2 & 7);"));
    }
}
