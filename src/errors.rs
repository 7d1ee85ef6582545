use thiserror::Error;

/// Errors raised while turning raw schema-registry text into a [`ParsedSchema`].
///
/// The three view-model transformations themselves never fail: unsupported
/// shapes degrade to empty field trees, misclassified payloads fall back to
/// their original text, missing offsets are synthesised. Only the raw-text
/// schema constructors can reject their input.
///
/// [`ParsedSchema`]: crate::ParsedSchema
#[derive(Error, Debug)]
pub enum KadminViewsError {
    #[error("Schema document is not valid JSON: {0}")]
    MalformedSchemaDocument(#[from] serde_json::Error),

    #[error("Expected an Avro record schema at the top level, found: {0}")]
    NotAnAvroRecord(String),

    #[error("Expected a JSON Schema object at the top level, found: {0}")]
    NotAJsonObjectSchema(String),
}
