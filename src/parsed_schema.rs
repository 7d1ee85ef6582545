use serde_json::Value;

use crate::errors::KadminViewsError;
use crate::schema::SchemaType;

/// A schema-registry result, already parsed into one of the three structural
/// shapes the registry serves.
///
/// This enum is a rust-idiomatic way to handle the fact that a single registry
/// subject can hold structurally unrelated schema dialects. Keeping the shapes
/// in a closed variant keeps the field unification in
/// [`unify`](crate::schema::unify) exhaustive: a new dialect cannot be added
/// without the compiler pointing at every place that has to learn about it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ParsedSchema {
    /// Record-oriented shape: named fields, union types, nested records.
    Avro(AvroSchema),

    /// Combinator-oriented shape: object properties, `anyOf`/`oneOf`/`allOf`.
    Json(JsonObjectSchema),

    /// Message-description shape: flat field lists under named messages.
    Protobuf(ProtobufMessageSet),
}

impl ParsedSchema {
    /// Parses the raw text a schema registry returns for a subject version.
    ///
    /// Avro and JSON Schema documents are JSON text and are rejected with an
    /// error when malformed or of an unexpected top-level shape. Protobuf
    /// definitions are scanned best-effort and never fail: unrecognised lines
    /// are skipped, matching the empty-not-error posture of the unifier.
    pub fn parse(schema_type: SchemaType, raw: &str) -> Result<Self, KadminViewsError> {
        match schema_type {
            SchemaType::Avro => AvroSchema::parse(raw).map(ParsedSchema::Avro),
            SchemaType::Json => JsonObjectSchema::parse(raw).map(ParsedSchema::Json),
            SchemaType::Protobuf => Ok(ParsedSchema::Protobuf(ProtobufMessageSet::parse(raw))),
        }
    }
}

/// An Avro record: a name and its declared fields, in declaration order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AvroSchema {
    pub name: String,
    pub fields: Vec<AvroField>,
}

/// A single declared field of an [`AvroSchema`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AvroField {
    pub name: String,
    pub ty: AvroType,
}

/// The type of an [`AvroField`].
///
/// Only the distinctions the field unification cares about are modelled:
/// everything that is neither a union nor an inline record (primitives, named
/// references, arrays, maps, enums, fixed) collapses to its type-tag string.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AvroType {
    Primitive(String),
    Record(AvroSchema),
    Union(Vec<AvroType>),
}

impl AvroType {
    /// The display tag of this type: the primitive/reference name, or the
    /// record name for inline records.
    pub fn tag(&self) -> &str {
        match self {
            AvroType::Primitive(name) => name,
            AvroType::Record(record) => &record.name,
            // Avro forbids immediately-nested unions; this arm only shows up
            // for hand-built degenerate inputs.
            AvroType::Union(_) => "union",
        }
    }
}

impl AvroSchema {
    /// Parses an Avro schema document (JSON text) into [`AvroSchema`].
    ///
    /// The top level must be a record. Anything else the registry could store
    /// under an Avro subject (a bare primitive, a union) has no field list to
    /// preview and is reported as an unexpected shape.
    pub fn parse(raw: &str) -> Result<Self, KadminViewsError> {
        let document: Value = serde_json::from_str(raw)?;
        Self::record_from_value(&document)
            .ok_or_else(|| KadminViewsError::NotAnAvroRecord(kind_of(&document)))
    }

    fn record_from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.get("type").and_then(Value::as_str) != Some("record") {
            return None;
        }

        let name = object.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        let fields = object
            .get("fields")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Self::field_from_value).collect())
            .unwrap_or_default();

        Some(AvroSchema { name, fields })
    }

    fn field_from_value(value: &Value) -> Option<AvroField> {
        let object = value.as_object()?;
        let name = object.get("name").and_then(Value::as_str)?.to_string();
        let ty = Self::type_from_value(object.get("type")?);
        Some(AvroField { name, ty })
    }

    fn type_from_value(value: &Value) -> AvroType {
        match value {
            // Primitive or a reference to a named type.
            Value::String(name) => AvroType::Primitive(name.clone()),

            // A JSON array in type position is a union.
            Value::Array(members) => {
                AvroType::Union(members.iter().map(Self::type_from_value).collect())
            }

            // Complex type object: inline record, or array/map/enum/fixed,
            // or an annotated primitive (e.g. one carrying a logicalType).
            Value::Object(object) => {
                if let Some(record) = Self::record_from_value(value) {
                    AvroType::Record(record)
                } else {
                    let tag = object.get("type").and_then(Value::as_str).unwrap_or("unknown");
                    AvroType::Primitive(tag.to_string())
                }
            }

            other => AvroType::Primitive(kind_of(other)),
        }
    }
}

/// A JSON Schema object: its declared properties, in declaration order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct JsonObjectSchema {
    pub properties: Vec<(String, JsonSchemaNode)>,
}

/// One node of a JSON Schema tree, reduced to the structural kinds the field
/// unification distinguishes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum JsonSchemaNode {
    Object(JsonObjectSchema),
    Scalar(String),
    Combinator(Vec<JsonSchemaNode>),
}

impl JsonSchemaNode {
    /// The structural kind name shown for this node.
    pub fn kind(&self) -> &str {
        match self {
            JsonSchemaNode::Object(_) => "object",
            JsonSchemaNode::Scalar(kind) => kind,
            JsonSchemaNode::Combinator(_) => "combined",
        }
    }
}

impl JsonObjectSchema {
    /// Parses a JSON Schema document into [`JsonObjectSchema`].
    ///
    /// The top level must describe an object (explicit `"type": "object"` or a
    /// `properties` map); scalar and combinator top levels carry no property
    /// list to preview.
    pub fn parse(raw: &str) -> Result<Self, KadminViewsError> {
        let document: Value = serde_json::from_str(raw)?;
        match Self::node_from_value(&document) {
            JsonSchemaNode::Object(schema) => Ok(schema),
            other => Err(KadminViewsError::NotAJsonObjectSchema(other.kind().to_string())),
        }
    }

    fn node_from_value(value: &Value) -> JsonSchemaNode {
        let Some(object) = value.as_object() else {
            return JsonSchemaNode::Scalar(kind_of(value));
        };

        for combinator in ["anyOf", "oneOf", "allOf"] {
            if let Some(alternatives) = object.get(combinator).and_then(Value::as_array) {
                return JsonSchemaNode::Combinator(
                    alternatives.iter().map(Self::node_from_value).collect(),
                );
            }
        }

        let declared_type = object.get("type");
        let has_properties = object.get("properties").is_some();

        match declared_type.and_then(Value::as_str) {
            Some("object") => JsonSchemaNode::Object(Self::object_from_value(object)),
            Some(kind) => JsonSchemaNode::Scalar(kind.to_string()),
            None => {
                // `"type": ["string", "null"]` style unions behave like a
                // combinator of scalars.
                if let Some(kinds) = declared_type.and_then(Value::as_array) {
                    return JsonSchemaNode::Combinator(
                        kinds
                            .iter()
                            .map(|k| {
                                JsonSchemaNode::Scalar(
                                    k.as_str().map(str::to_string).unwrap_or_else(|| kind_of(k)),
                                )
                            })
                            .collect(),
                    );
                }
                if has_properties {
                    JsonSchemaNode::Object(Self::object_from_value(object))
                } else {
                    JsonSchemaNode::Scalar("any".to_string())
                }
            }
        }
    }

    fn object_from_value(object: &serde_json::Map<String, Value>) -> JsonObjectSchema {
        let properties = object
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .map(|(name, node)| (name.clone(), Self::node_from_value(node)))
                    .collect()
            })
            .unwrap_or_default();

        JsonObjectSchema { properties }
    }
}

/// The top-level message definitions of a Protobuf schema, in declaration
/// order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ProtobufMessageSet {
    pub messages: Vec<ProtobufMessage>,
}

/// One `message` block: its name and directly-declared fields.
///
/// Fields of nested message/enum/oneof blocks are not included; the structural
/// preview only expands one level of a Protobuf definition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProtobufMessage {
    pub name: String,
    pub fields: Vec<ProtobufField>,
}

/// A single `type name = tag;` declaration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProtobufField {
    pub name: String,
    pub type_name: String,
}

impl ProtobufMessageSet {
    /// Scans `.proto` text for top-level `message` blocks and their fields.
    ///
    /// This is a tolerant line-level scanner, not a grammar: comments are
    /// stripped, `optional`/`required`/`repeated` labels and `[...]` field
    /// options are ignored, `map<...>` types are kept whole, and nested
    /// `message`/`enum`/`oneof` bodies are skipped entirely. Statements that
    /// do not look like field declarations are dropped without complaint.
    pub fn parse(raw: &str) -> Self {
        let text = strip_proto_comments(raw);
        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0;
        let mut messages = Vec::new();

        while pos < chars.len() {
            skip_whitespace(&chars, &mut pos);
            let word = next_word(&chars, &mut pos);
            if word.is_empty() {
                pos += 1;
                continue;
            }
            if word == "message" {
                skip_whitespace(&chars, &mut pos);
                let name = next_word(&chars, &mut pos);
                skip_whitespace(&chars, &mut pos);
                if chars.get(pos) == Some(&'{') {
                    pos += 1;
                    let body = take_block(&chars, &mut pos);
                    messages.push(ProtobufMessage { name, fields: parse_message_fields(&body) });
                }
            } else {
                // syntax/package/import/option/enum/service at the top level
                skip_statement(&chars, &mut pos);
            }
        }

        ProtobufMessageSet { messages }
    }
}

fn parse_message_fields(body: &str) -> Vec<ProtobufField> {
    let chars: Vec<char> = body.chars().collect();
    let mut pos = 0;
    let mut fields = Vec::new();

    while pos < chars.len() {
        skip_whitespace(&chars, &mut pos);
        if pos >= chars.len() {
            break;
        }
        let word = next_word(&chars, &mut pos);
        if word.is_empty() {
            pos += 1;
            continue;
        }
        match word.as_str() {
            "message" | "enum" | "oneof" | "extend" | "extensions" | "reserved" | "option" => {
                skip_statement(&chars, &mut pos);
            }
            _ => {
                if let Some(field) = collect_field_statement(word, &chars, &mut pos) {
                    fields.push(field);
                }
            }
        }
    }

    fields
}

/// Consumes tokens up to the terminating `;` and shapes them into a field
/// declaration, or `None` when the statement does not match `type name = tag`.
fn collect_field_statement(first: String, chars: &[char], pos: &mut usize) -> Option<ProtobufField> {
    let mut tokens = vec![first];
    loop {
        skip_whitespace(chars, pos);
        match chars.get(*pos) {
            None | Some(';') => {
                *pos = (*pos + 1).min(chars.len());
                break;
            }
            Some('{') => {
                // group-style or unrecognised block: not a field
                *pos += 1;
                take_block(chars, pos);
                return None;
            }
            Some('[') => {
                skip_until(chars, pos, ']');
            }
            Some('=') => {
                tokens.push("=".to_string());
                *pos += 1;
            }
            Some(_) => {
                let word = next_word(chars, pos);
                if word.is_empty() {
                    *pos += 1;
                } else {
                    tokens.push(word);
                }
            }
        }
    }

    let mut tokens = tokens.into_iter().peekable();
    if matches!(tokens.peek().map(String::as_str), Some("optional" | "required" | "repeated")) {
        tokens.next();
    }
    let mut type_name = tokens.next()?;
    // `map<string, int32>` splits on the embedded space; rejoin until the
    // angle brackets balance.
    while type_name.matches('<').count() > type_name.matches('>').count() {
        type_name.push_str(&tokens.next()?);
    }

    let name = tokens.next()?;
    if tokens.next()? != "=" {
        return None;
    }
    let tag = tokens.next()?;
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(ProtobufField { name, type_name })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '<' | '>' | ',')
}

fn next_word(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_word_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().filter(|c| !c.is_whitespace()).collect()
}

fn skip_whitespace(chars: &[char], pos: &mut usize) {
    while *pos < chars.len() && chars[*pos].is_whitespace() {
        *pos += 1;
    }
}

fn skip_until(chars: &[char], pos: &mut usize, target: char) {
    while *pos < chars.len() {
        let c = chars[*pos];
        *pos += 1;
        if c == target {
            return;
        }
    }
}

/// Consumes a `{`-opened block (the opening brace already eaten) and returns
/// its content, leaving `pos` just past the matching `}`.
fn take_block(chars: &[char], pos: &mut usize) -> String {
    let mut depth = 1usize;
    let mut body = String::new();
    while *pos < chars.len() {
        let c = chars[*pos];
        *pos += 1;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        body.push(c);
    }
    body
}

/// Consumes the rest of a statement: everything up to a top-level `;`, or a
/// whole `{...}` block when one opens first.
fn skip_statement(chars: &[char], pos: &mut usize) {
    while *pos < chars.len() {
        let c = chars[*pos];
        *pos += 1;
        match c {
            ';' => return,
            '{' => {
                take_block(chars, pos);
                return;
            }
            _ => {}
        }
    }
}

/// The JSON value kind name, used when a schema document puts an unexpected
/// value where a type belongs.
fn kind_of(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

/// Removes `//` line comments and `/* */` block comments, leaving string
/// literals intact.
fn strip_proto_comments(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut pos = 0;
    while pos < chars.len() {
        match chars[pos] {
            '"' => {
                out.push('"');
                pos += 1;
                while pos < chars.len() {
                    let c = chars[pos];
                    out.push(c);
                    pos += 1;
                    if c == '\\' && pos < chars.len() {
                        out.push(chars[pos]);
                        pos += 1;
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '/' if chars.get(pos + 1) == Some(&'/') => {
                while pos < chars.len() && chars[pos] != '\n' {
                    pos += 1;
                }
            }
            '/' if chars.get(pos + 1) == Some(&'*') => {
                pos += 2;
                while pos < chars.len() {
                    if chars[pos] == '*' && chars.get(pos + 1) == Some(&'/') {
                        pos += 2;
                        break;
                    }
                    pos += 1;
                }
                // a comment can separate tokens
                out.push(' ');
            }
            c => {
                out.push(c);
                pos += 1;
            }
        }
    }
    out
}
