use crate::parsed_schema::{
    AvroField, AvroSchema, AvroType, JsonObjectSchema, JsonSchemaNode, ParsedSchema,
    ProtobufMessageSet,
};

/// The schema dialect a registry subject is written in.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchemaType {
    Avro,
    Json,
    Protobuf,
}

/// The compatibility rule in force for a subject, and whether it is the
/// registry-wide default rather than a per-subject override.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Compatibility {
    pub level: String,
    pub is_global_default: bool,
}

/// One node of the unified field tree.
///
/// The three registry dialects collapse onto this single shape so the
/// structural preview can render any of them the same way:
///
/// * `types` holds one type tag per alternative; more than one entry signals
///   a union (Avro) or combinator (JSON Schema).
/// * `children` holds the nested fields of the first record/object-shaped
///   alternative, or nothing.
///
/// A node with a single, non-composite type always has empty `children`.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaField {
    pub name: String,
    pub types: Vec<String>,
    pub children: Vec<SchemaField>,
}

/// A registry subject version, normalised for display.
///
/// Built once per fetch and never mutated; `fields` is the unified tree
/// produced by [`unify`] from the dialect-specific parse, `raw` keeps the
/// canonical text for the raw view.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema {
    pub id: i32,
    pub subject: String,
    pub version: i32,
    pub versions: Vec<i32>,
    pub schema_type: SchemaType,
    pub compatibility: Compatibility,
    pub raw: String,
    pub fields: Vec<SchemaField>,
}

impl Schema {
    /// Assembles a [`Schema`] view from registry metadata plus the parsed
    /// schema text, running the field unification as part of construction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i32,
        subject: impl Into<String>,
        version: i32,
        versions: Vec<i32>,
        schema_type: SchemaType,
        compatibility: Compatibility,
        raw: impl Into<String>,
        parsed: &ParsedSchema,
    ) -> Self {
        Schema {
            id,
            subject: subject.into(),
            version,
            versions,
            schema_type,
            compatibility,
            raw: raw.into(),
            fields: unify(parsed),
        }
    }
}

/// Collapses a dialect-specific parsed schema into the unified field tree.
///
/// Output order always follows declaration order in the input. A shape the
/// unification does not support (e.g. a Protobuf definition with zero or more
/// than one top-level message) yields an empty sequence, never an error:
/// callers treat empty as "no structural preview available".
pub fn unify(parsed: &ParsedSchema) -> Vec<SchemaField> {
    match parsed {
        ParsedSchema::Avro(record) => unify_avro_fields(&record.fields),
        ParsedSchema::Json(object) => unify_json_properties(object),
        ParsedSchema::Protobuf(set) => unify_protobuf(set),
    }
}

fn unify_avro_fields(fields: &[AvroField]) -> Vec<SchemaField> {
    fields.iter().map(unify_avro_field).collect()
}

fn unify_avro_field(field: &AvroField) -> SchemaField {
    match &field.ty {
        AvroType::Union(members) => {
            let types = members.iter().map(|m| m.tag().to_string()).collect();
            let records: Vec<&AvroSchema> = members
                .iter()
                .filter_map(|member| match member {
                    AvroType::Record(record) => Some(record),
                    _ => None,
                })
                .collect();
            // Only an unambiguous single record alternative gets expanded.
            let children = match records.as_slice() {
                [record] => unify_avro_fields(&record.fields),
                _ => Vec::new(),
            };
            SchemaField { name: field.name.clone(), types, children }
        }
        AvroType::Record(record) => SchemaField {
            name: field.name.clone(),
            types: vec![record.name.clone()],
            children: unify_avro_fields(&record.fields),
        },
        AvroType::Primitive(tag) => SchemaField {
            name: field.name.clone(),
            types: vec![tag.clone()],
            children: Vec::new(),
        },
    }
}

fn unify_json_properties(object: &JsonObjectSchema) -> Vec<SchemaField> {
    object
        .properties
        .iter()
        .map(|(name, node)| unify_json_property(name, node))
        .collect()
}

fn unify_json_property(name: &str, node: &JsonSchemaNode) -> SchemaField {
    match node {
        JsonSchemaNode::Combinator(alternatives) => {
            let types = alternatives.iter().map(|alt| alt.kind().to_string()).collect();
            let children = alternatives
                .iter()
                .find_map(|alternative| match alternative {
                    JsonSchemaNode::Object(object) => Some(unify_json_properties(object)),
                    _ => None,
                })
                .unwrap_or_default();
            SchemaField { name: name.to_string(), types, children }
        }
        JsonSchemaNode::Object(object) => SchemaField {
            name: name.to_string(),
            types: vec!["object".to_string()],
            children: unify_json_properties(object),
        },
        JsonSchemaNode::Scalar(kind) => SchemaField {
            name: name.to_string(),
            types: vec![kind.clone()],
            children: Vec::new(),
        },
    }
}

fn unify_protobuf(set: &ProtobufMessageSet) -> Vec<SchemaField> {
    // Multi-message (and empty) definitions carry no single field list to
    // preview; nested message types are deliberately not expanded.
    match set.messages.as_slice() {
        [message] => message
            .fields
            .iter()
            .map(|field| SchemaField {
                name: field.name.clone(),
                types: vec![field.type_name.clone()],
                children: Vec::new(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsed_schema::{ProtobufField, ProtobufMessage};
    use crate::utils::is_thread_safe;

    fn avro_record(name: &str, fields: Vec<AvroField>) -> AvroSchema {
        AvroSchema { name: name.to_string(), fields }
    }

    fn avro_field(name: &str, ty: AvroType) -> AvroField {
        AvroField { name: name.to_string(), ty }
    }

    fn primitive(tag: &str) -> AvroType {
        AvroType::Primitive(tag.to_string())
    }

    #[test]
    fn avro_union_types_follow_declaration_order() {
        let parsed = ParsedSchema::Avro(avro_record(
            "Envelope",
            vec![avro_field(
                "payload",
                AvroType::Union(vec![primitive("null"), primitive("string"), primitive("bytes")]),
            )],
        ));

        let fields = unify(&parsed);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].types, vec!["null", "string", "bytes"]);
        assert!(fields[0].children.is_empty());
    }

    #[test]
    fn avro_union_with_single_record_member_expands_its_fields() {
        let inner = avro_record("Address", vec![avro_field("street", primitive("string"))]);
        let parsed = ParsedSchema::Avro(avro_record(
            "Person",
            vec![avro_field(
                "address",
                AvroType::Union(vec![primitive("null"), AvroType::Record(inner)]),
            )],
        ));

        let fields = unify(&parsed);
        assert_eq!(fields[0].types, vec!["null", "Address"]);
        assert_eq!(fields[0].children.len(), 1);
        assert_eq!(fields[0].children[0].name, "street");
        assert_eq!(fields[0].children[0].types, vec!["string"]);
    }

    #[test]
    fn avro_union_with_two_record_members_expands_nothing() {
        let a = avro_record("A", vec![avro_field("x", primitive("int"))]);
        let b = avro_record("B", vec![avro_field("y", primitive("int"))]);
        let parsed = ParsedSchema::Avro(avro_record(
            "Either",
            vec![avro_field(
                "value",
                AvroType::Union(vec![AvroType::Record(a), AvroType::Record(b)]),
            )],
        ));

        let fields = unify(&parsed);
        assert_eq!(fields[0].types, vec!["A", "B"]);
        assert!(fields[0].children.is_empty());
    }

    #[test]
    fn avro_nested_record_recurses() {
        let inner = avro_record("Inner", vec![avro_field("deep", primitive("long"))]);
        let parsed = ParsedSchema::Avro(avro_record(
            "Outer",
            vec![
                avro_field("plain", primitive("string")),
                avro_field("nested", AvroType::Record(inner)),
            ],
        ));

        let fields = unify(&parsed);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].types, vec!["string"]);
        assert!(fields[0].children.is_empty());
        assert_eq!(fields[1].types, vec!["Inner"]);
        assert_eq!(fields[1].children[0].name, "deep");
    }

    #[test]
    fn protobuf_single_message_flattens_declared_fields() {
        let parsed = ParsedSchema::Protobuf(ProtobufMessageSet {
            messages: vec![ProtobufMessage {
                name: "Order".to_string(),
                fields: vec![
                    ProtobufField { name: "id".to_string(), type_name: "string".to_string() },
                    ProtobufField { name: "amount".to_string(), type_name: "double".to_string() },
                ],
            }],
        });

        let fields = unify(&parsed);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "id");
        assert_eq!(fields[0].types, vec!["string"]);
        assert!(fields[0].children.is_empty());
    }

    #[test]
    fn protobuf_zero_or_many_messages_yield_empty() {
        let empty = ParsedSchema::Protobuf(ProtobufMessageSet::default());
        assert!(unify(&empty).is_empty());

        let message = |name: &str| ProtobufMessage {
            name: name.to_string(),
            fields: vec![ProtobufField { name: "x".to_string(), type_name: "string".to_string() }],
        };
        let two = ParsedSchema::Protobuf(ProtobufMessageSet {
            messages: vec![message("A"), message("B")],
        });
        assert!(unify(&two).is_empty());
    }

    #[test]
    fn json_combinator_expands_first_object_alternative() {
        let object = JsonObjectSchema {
            properties: vec![(
                "payload".to_string(),
                JsonSchemaNode::Combinator(vec![
                    JsonSchemaNode::Scalar("string".to_string()),
                    JsonSchemaNode::Object(JsonObjectSchema {
                        properties: vec![(
                            "code".to_string(),
                            JsonSchemaNode::Scalar("integer".to_string()),
                        )],
                    }),
                ]),
            )],
        };

        let fields = unify(&ParsedSchema::Json(object));
        assert_eq!(fields[0].types, vec!["string", "object"]);
        assert_eq!(fields[0].children.len(), 1);
        assert_eq!(fields[0].children[0].name, "code");
    }

    #[test]
    fn json_plain_object_property_recurses() {
        let object = JsonObjectSchema {
            properties: vec![
                ("id".to_string(), JsonSchemaNode::Scalar("string".to_string())),
                (
                    "meta".to_string(),
                    JsonSchemaNode::Object(JsonObjectSchema {
                        properties: vec![(
                            "tag".to_string(),
                            JsonSchemaNode::Scalar("string".to_string()),
                        )],
                    }),
                ),
            ],
        };

        let fields = unify(&ParsedSchema::Json(object));
        assert_eq!(fields[0].types, vec!["string"]);
        assert!(fields[0].children.is_empty());
        assert_eq!(fields[1].types, vec!["object"]);
        assert_eq!(fields[1].children[0].name, "tag");
    }

    #[test]
    fn raw_text_and_hand_built_inputs_unify_identically() {
        let raw = r#"{
            "type": "record",
            "name": "Person",
            "fields": [
                {"name": "name", "type": "string"},
                {"name": "nickname", "type": ["null", "string"]}
            ]
        }"#;
        let from_text = unify(&ParsedSchema::parse(SchemaType::Avro, raw).unwrap());

        let hand_built = unify(&ParsedSchema::Avro(avro_record(
            "Person",
            vec![
                avro_field("name", primitive("string")),
                avro_field(
                    "nickname",
                    AvroType::Union(vec![primitive("null"), primitive("string")]),
                ),
            ],
        )));

        assert_eq!(from_text, hand_built);
    }

    #[test]
    fn schema_construction_runs_unification() {
        let parsed = ParsedSchema::Avro(avro_record(
            "Person",
            vec![avro_field("name", primitive("string"))],
        ));
        let schema = Schema::new(
            7,
            "person-value",
            3,
            vec![1, 2, 3],
            SchemaType::Avro,
            Compatibility { level: "BACKWARD".to_string(), is_global_default: true },
            "{}",
            &parsed,
        );

        assert_eq!(schema.subject, "person-value");
        assert_eq!(schema.fields.len(), 1);
        assert_eq!(schema.fields[0].name, "name");
    }

    #[test]
    fn test_types_thread_safety() {
        is_thread_safe::<Schema>();
        is_thread_safe::<SchemaField>();
        is_thread_safe::<SchemaType>();
        is_thread_safe::<Compatibility>();
    }
}
