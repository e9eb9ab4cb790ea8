//! The language-neutral intermediate representation.
//!
//! Lowering produces one [`File`] per input descriptor; emitters walk the
//! files read-only. All cross-references between messages and enums use
//! fully-qualified proto names resolved through a [`TypeIndex`] built per
//! invocation.
//!
//! Per-kind decisions (wire type, packability) live here as data tables so
//! every emitter dispatches over the same closed [`Kind`] set.

pub mod names;

use crate::error::{Error, Result};
use crate::wire::WireType;
use std::collections::HashMap;

/// The wire kind of a field, mirroring the proto3 scalar set plus
/// message and enum references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `bool`
    Bool,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint32` (zigzag varint)
    Sint32,
    /// `sint64` (zigzag varint)
    Sint64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    Sfixed32,
    /// `sfixed64`
    Sfixed64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// An embedded message
    Message,
    /// An enum (varint on the wire)
    Enum,
}

impl Kind {
    /// The wire type used in tag bytes for this kind.
    pub fn wire_type(self) -> WireType {
        match self {
            Kind::Bool
            | Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Enum => WireType::Varint,
            Kind::Fixed32 | Kind::Sfixed32 | Kind::Float => WireType::I32,
            Kind::Fixed64 | Kind::Sfixed64 | Kind::Double => WireType::I64,
            Kind::String | Kind::Bytes | Kind::Message => WireType::Len,
        }
    }

    /// Whether a repeated field of this kind may use the packed encoding.
    pub fn is_packable(self) -> bool {
        match self {
            Kind::String | Kind::Bytes | Kind::Message => false,
            Kind::Bool
            | Kind::Int32
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
            | Kind::Enum => true,
        }
    }
}

/// How many values a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// A single value
    #[default]
    Single,
    /// An ordered sequence
    Repeated,
    /// A key/value mapping
    Map,
}

/// A Go-side native type override carried by a field option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNative {
    /// Surface the field as `time.Time`
    Time,
    /// Surface the field as `time.Duration`
    Duration,
    /// Surface the field as `uuid.UUID`
    Uuid,
}

/// A JavaScript-side native type override carried by a field option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptNative {
    /// Decode 64-bit values into a plain `number`
    Number,
    /// Decode 64-bit values into a `bigint`
    Bigint,
}

/// The wire shape of a time-like or duration-like field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// The well-known sub-message form `{1: seconds, 2: nanos}`
    Wkt,
    /// A single varint holding seconds (Int32-backed)
    Seconds,
    /// A single varint holding milliseconds (Int64-backed)
    Millis,
}

/// One lowered input file.
#[derive(Debug, Clone, Default)]
pub struct File {
    /// Original descriptor path, e.g. `demo/model.proto`
    pub path: String,
    /// The proto package
    pub package: String,
    /// Go package name resolved from file options (may be overridden)
    pub go_package: String,
    /// Go output directory from file options, empty when unset
    pub go_out: String,
    /// JavaScript output directory from file options, empty when unset
    pub js_out: String,
    /// Top-level enums followed by flattened nested enums
    pub enums: Vec<Enum>,
    /// Messages in declaration order, nested messages flattened after
    /// their parents
    pub messages: Vec<Message>,
}

/// A lowered enum.
#[derive(Debug, Clone)]
pub struct Enum {
    /// Mangled name, e.g. `OrderStatus`
    pub name: String,
    /// Fully-qualified proto name, e.g. `demo.Order.Status`
    pub full_name: String,
    /// Values in declaration order
    pub values: Vec<EnumValue>,
}

/// A single enum entry.
#[derive(Debug, Clone)]
pub struct EnumValue {
    /// Original value name, e.g. `ORDER_STATUS_OPEN`
    pub name: String,
    /// Numeric value
    pub number: i32,
}

/// A lowered message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Mangled name; nested messages join parent names with `_` before
    /// PascalCasing, e.g. `Order_Item` becomes `OrderItem`
    pub name: String,
    /// Fully-qualified proto name
    pub full_name: String,
    /// Fields in declaration order
    pub fields: Vec<Field>,
    /// Set when the message contains exactly one repeated non-map field;
    /// the script target renders such messages as bare sequences
    pub repeated_wrapper: bool,
}

/// A lowered field.
#[derive(Debug, Clone)]
pub struct Field {
    /// Original identifier as declared in the schema
    pub name: String,
    /// Wire field number
    pub number: u32,
    /// Wire kind
    pub kind: Kind,
    /// Single, repeated, or map
    pub cardinality: Cardinality,
    /// True iff the field is a proto3 `optional` scalar
    pub has_presence: bool,
    /// Packed encoding on the wire (repeated numeric kinds default true)
    pub packed: bool,
    /// Key kind, populated iff map
    pub map_key_kind: Option<Kind>,
    /// Value kind, populated iff map
    pub map_value_kind: Option<Kind>,
    /// Fully-qualified name of the map value type when it is a message
    /// or enum
    pub map_value_ref: Option<String>,
    /// Fully-qualified message reference, populated iff kind is Message
    pub message_ref: Option<String>,
    /// Fully-qualified enum reference, populated iff kind is Enum
    pub enum_ref: Option<String>,
    /// Message reference is `google.protobuf.Timestamp`
    pub is_timestamp: bool,
    /// Message reference is `google.protobuf.Duration`
    pub is_duration: bool,
    /// Go native type override
    pub host_native: Option<HostNative>,
    /// JavaScript native type override
    pub script_native: Option<ScriptNative>,
}

impl Field {
    /// Creates a field with the given identity and all flags cleared.
    pub fn new(name: impl Into<String>, number: u32, kind: Kind) -> Self {
        Self {
            name: name.into(),
            number,
            kind,
            cardinality: Cardinality::Single,
            has_presence: false,
            packed: false,
            map_key_kind: None,
            map_value_kind: None,
            map_value_ref: None,
            message_ref: None,
            enum_ref: None,
            is_timestamp: false,
            is_duration: false,
            host_native: None,
            script_native: None,
        }
    }

    /// Whether the field holds a sequence.
    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// Whether the field holds a mapping.
    pub fn is_map(&self) -> bool {
        self.cardinality == Cardinality::Map
    }

    /// Whether the field surfaces as a point in time on the Go side,
    /// either through the well-known type or an integer-backed override.
    pub fn is_time_like(&self) -> bool {
        self.is_timestamp || self.host_native == Some(HostNative::Time)
    }

    /// Whether the field surfaces as a duration on the Go side.
    pub fn is_duration_like(&self) -> bool {
        self.is_duration || self.host_native == Some(HostNative::Duration)
    }

    /// The wire shape of a time-like or duration-like field.
    ///
    /// Integer-backed forms hold seconds (Int32) or milliseconds (Int64);
    /// this convention is fixed, not configurable. Returns `None` for
    /// fields with no time representation, including time-like fields of
    /// a kind that has none — lowering validation rules those out, and
    /// emitters treat them as an internal error rather than guessing.
    pub fn time_unit(&self) -> Option<TimeUnit> {
        if !self.is_time_like() && !self.is_duration_like() {
            return None;
        }
        match self.kind {
            Kind::Message => Some(TimeUnit::Wkt),
            Kind::Int32 => Some(TimeUnit::Seconds),
            Kind::Int64 => Some(TimeUnit::Millis),
            Kind::Bool
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
            | Kind::String
            | Kind::Bytes
            | Kind::Enum => None,
        }
    }

    /// Whether the encoded form of a repeated field is packed.
    pub fn is_packed_wire(&self) -> bool {
        self.is_repeated() && self.packed && self.kind.is_packable()
    }
}

/// Index of all messages and enums across an invocation, keyed by
/// fully-qualified name.
#[derive(Debug, Default)]
pub struct TypeIndex<'a> {
    messages: HashMap<&'a str, &'a Message>,
    enums: HashMap<&'a str, &'a Enum>,
}

impl<'a> TypeIndex<'a> {
    /// Builds the index over every file of the invocation.
    pub fn build(files: &'a [File]) -> Self {
        let mut index = Self::default();
        for file in files {
            for msg in &file.messages {
                index.messages.insert(msg.full_name.as_str(), msg);
            }
            for e in &file.enums {
                index.enums.insert(e.full_name.as_str(), e);
            }
        }
        index
    }

    /// Resolves a message by fully-qualified name.
    pub fn message(&self, full_name: &str) -> Result<&'a Message> {
        self.messages
            .get(full_name)
            .copied()
            .ok_or_else(|| Error::unknown_reference(full_name))
    }

    /// Resolves an enum by fully-qualified name.
    pub fn enum_type(&self, full_name: &str) -> Result<&'a Enum> {
        self.enums
            .get(full_name)
            .copied()
            .ok_or_else(|| Error::unknown_reference(full_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_type_table() {
        assert_eq!(Kind::Bool.wire_type(), WireType::Varint);
        assert_eq!(Kind::Sint64.wire_type(), WireType::Varint);
        assert_eq!(Kind::Enum.wire_type(), WireType::Varint);
        assert_eq!(Kind::Float.wire_type(), WireType::I32);
        assert_eq!(Kind::Sfixed32.wire_type(), WireType::I32);
        assert_eq!(Kind::Double.wire_type(), WireType::I64);
        assert_eq!(Kind::Fixed64.wire_type(), WireType::I64);
        assert_eq!(Kind::String.wire_type(), WireType::Len);
        assert_eq!(Kind::Bytes.wire_type(), WireType::Len);
        assert_eq!(Kind::Message.wire_type(), WireType::Len);
    }

    #[test]
    fn test_packable_table() {
        assert!(Kind::Int32.is_packable());
        assert!(Kind::Double.is_packable());
        assert!(Kind::Enum.is_packable());
        assert!(!Kind::String.is_packable());
        assert!(!Kind::Bytes.is_packable());
        assert!(!Kind::Message.is_packable());
    }

    #[test]
    fn test_time_unit_convention() {
        let mut field = Field::new("created", 1, Kind::Message);
        field.is_timestamp = true;
        assert_eq!(field.time_unit(), Some(TimeUnit::Wkt));

        let mut field = Field::new("created_s", 2, Kind::Int32);
        field.host_native = Some(HostNative::Time);
        assert_eq!(field.time_unit(), Some(TimeUnit::Seconds));

        let mut field = Field::new("created_ms", 3, Kind::Int64);
        field.host_native = Some(HostNative::Time);
        assert_eq!(field.time_unit(), Some(TimeUnit::Millis));

        let field = Field::new("plain", 4, Kind::Int64);
        assert_eq!(field.time_unit(), None);

        // a time override on a kind with no time representation yields no
        // unit rather than a guessed one
        let mut field = Field::new("bad", 5, Kind::String);
        field.host_native = Some(HostNative::Time);
        assert_eq!(field.time_unit(), None);
    }

    #[test]
    fn test_type_index_unknown_reference() {
        let files = vec![File {
            messages: vec![Message {
                name: "Item".into(),
                full_name: "demo.Item".into(),
                fields: vec![],
                repeated_wrapper: false,
            }],
            ..File::default()
        }];
        let index = TypeIndex::build(&files);
        assert!(index.message("demo.Item").is_ok());
        let err = index.message("demo.Missing").unwrap_err();
        assert!(err.to_string().contains("demo.Missing"));
    }
}
