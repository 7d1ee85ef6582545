//! Normalises raw Kafka admin-client results into uniform, queryable view
//! models.
//!
//! The admin clients hand back three families of format-specific results;
//! this crate turns each into a plain value object a presentation layer can
//! render without knowing where it came from:
//!
//! 1. **Schema field unification** — collapses the three schema-registry
//!    dialects (Avro records, Protobuf messages, JSON Schema combinators)
//!    into one recursive [`SchemaField`] tree. See [`unify`].
//! 2. **Consumer-group offset/lag aggregation** — joins a group description
//!    with committed offsets and log watermarks into a per-partition
//!    [`ConsumerGroup`] lag model with per-topic and overall rollups.
//! 3. **Record payload classification** — detects JSON-like payloads inside
//!    opaque record text and produces a single-line and an indented rendering
//!    of each [`Record`], with safe fallback when detection is wrong.
//!
//! All three transformations are pure, synchronous and side-effect-free over
//! already-fetched inputs: no network calls, no shared state, safe to invoke
//! concurrently and repeatedly. They also prefer documented fallback over
//! raised errors, because they render best-effort previews of
//! operator-supplied or third-party-produced data: an unsupported schema
//! shape becomes an empty field list, a payload that merely looks like JSON
//! is shown unmodified, a missing committed offset is synthesised. Only the
//! raw schema-text constructors on [`ParsedSchema`] can fail.
//!
//! Transport, authentication, retries and rendering are all concerns of the
//! surrounding application; this crate starts where a successful fetch ends.

mod consumer_group;
mod errors;
mod parsed_schema;
mod record;
mod schema;
mod utils;

pub use consumer_group::{
    ConsumerGroup, GroupDescription, Member, MissingOffsetPolicy, Node, Offset, TopicPartition,
};
pub use errors::KadminViewsError;
pub use parsed_schema::{
    AvroField, AvroSchema, AvroType, JsonObjectSchema, JsonSchemaNode, ParsedSchema,
    ProtobufField, ProtobufMessage, ProtobufMessageSet,
};
pub use record::{
    ConsumedMessage, PayloadView, ProducerRecord, PublishAck, Record, TimestampType,
};
pub use schema::{unify, Compatibility, Schema, SchemaField, SchemaType};
