//! Event envelope - the canonical wrapper for every inter-service message.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{require_identifier, require_text};
use crate::{resolve_topic, EventPriority, EventType, SchemaValidationError};

/// Open key/value container used for `data` and `metadata`.
///
/// Value shapes are documented per event type but not enforced here.
pub type Payload = serde_json::Map<String, Value>;

/// Default schema version stamped on new envelopes.
pub const DEFAULT_EVENT_VERSION: &str = "1.0";

/// Default producer instance name.
pub const DEFAULT_SOURCE_INSTANCE: &str = "default";

/// The event envelope.
///
/// Instances only come out of [`EventEnvelopeBuilder::build`] or
/// deserialization, both of which apply defaults and validate every field
/// first. Apart from `data` and `metadata`, fields are read-only.
///
/// Top-level fields the envelope does not model are kept as extensions and
/// written back out unchanged, so a domain event that travels as a plain
/// envelope loses nothing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "EnvelopeWire")]
pub struct EventEnvelope {
    event_id: String,
    event_type: EventType,
    event_version: String,
    timestamp: DateTime<Utc>,
    source_service: String,
    source_instance: String,
    correlation_id: String,
    causation_id: Option<String>,
    topic: String,
    reply_to: Option<String>,
    priority: EventPriority,
    ttl: Option<u64>,
    data: Payload,
    metadata: Payload,
    auth_token: Option<String>,
    encrypted_fields: Vec<String>,
    extensions: Payload,
}

impl EventEnvelope {
    /// Creates a new event envelope builder.
    pub fn builder() -> EventEnvelopeBuilder {
        EventEnvelopeBuilder::new()
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn event_version(&self) -> &str {
        &self.event_version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source_service(&self) -> &str {
        &self.source_service
    }

    pub fn source_instance(&self) -> &str {
        &self.source_instance
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn priority(&self) -> EventPriority {
        self.priority
    }

    /// Time to live in seconds.
    pub fn ttl(&self) -> Option<u64> {
        self.ttl
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn metadata(&self) -> &Payload {
        &self.metadata
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Names of `data` entries whose values are ciphertext.
    pub fn encrypted_fields(&self) -> &[String] {
        &self.encrypted_fields
    }

    /// Unmodelled top-level fields carried through from the wire.
    pub fn extensions(&self) -> &Payload {
        &self.extensions
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// Adds or replaces a metadata entry.
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Adds or replaces a payload entry.
    pub fn add_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Returns true if the TTL has elapsed as of now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if strictly more than `ttl` seconds separate `now`
    /// from the envelope timestamp. Envelopes without a TTL never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        let limit = i64::try_from(ttl)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        self.age(now) > limit
    }

    /// Time elapsed between the envelope timestamp and `now`.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.timestamp)
    }

    /// Routing key for message brokers: `{source_service}.{event_type}`.
    pub fn to_routing_key(&self) -> String {
        format!("{}.{}", self.source_service, self.event_type)
    }

    /// Tracing context for distributed tracing collaborators.
    pub fn trace_context(&self) -> TraceContext {
        let correlation_id = if self.correlation_id.is_empty() {
            self.event_id.clone()
        } else {
            self.correlation_id.clone()
        };
        TraceContext {
            event_id: self.event_id.clone(),
            correlation_id,
            causation_id: self.causation_id.clone().unwrap_or_default(),
            source_service: self.source_service.clone(),
            source_instance: self.source_instance.clone(),
        }
    }

    /// A `tracing` span carrying the envelope's identifiers.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "event",
            event_id = %self.event_id,
            event_type = %self.event_type,
            correlation_id = %self.correlation_id,
            source_service = %self.source_service,
        )
    }

    /// Starts a reply to this envelope.
    ///
    /// The reply is caused by this event, shares its correlation ID and is
    /// addressed to `reply_to` when the requester supplied one. Callers
    /// still choose the topic when `reply_to` is absent.
    pub fn reply_builder(
        &self,
        source_service: impl Into<String>,
        event_type: EventType,
    ) -> EventEnvelopeBuilder {
        let builder = EventEnvelopeBuilder::new()
            .event_type(event_type)
            .source_service(source_service)
            .correlation_id(self.correlation_id.clone())
            .causation_id(self.event_id.clone());
        match &self.reply_to {
            Some(reply_to) => builder.topic(reply_to.clone()),
            None => builder,
        }
    }

    /// Decodes and validates an envelope from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SchemaValidationError> {
        let wire: EnvelopeWire = serde_json::from_str(json)?;
        Self::try_from(wire)
    }

    /// Decodes and validates an envelope from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, SchemaValidationError> {
        let wire: EnvelopeWire = serde_json::from_value(value)?;
        Self::try_from(wire)
    }

    /// Encodes the envelope as JSON text.
    pub fn to_json(&self) -> Result<String, SchemaValidationError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes the envelope as a JSON value.
    pub fn to_value(&self) -> Result<Value, SchemaValidationError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for EventEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let shadowed = &self.extensions;
        let mut map = serializer.serialize_map(None)?;
        entry(&mut map, shadowed, "event_id", &self.event_id)?;
        entry(&mut map, shadowed, "event_type", &self.event_type)?;
        entry(&mut map, shadowed, "event_version", &self.event_version)?;
        entry(&mut map, shadowed, "timestamp", &self.timestamp)?;
        entry(&mut map, shadowed, "source_service", &self.source_service)?;
        entry(&mut map, shadowed, "source_instance", &self.source_instance)?;
        entry(&mut map, shadowed, "correlation_id", &self.correlation_id)?;
        entry(&mut map, shadowed, "causation_id", &self.causation_id)?;
        entry(&mut map, shadowed, "topic", &self.topic)?;
        entry(&mut map, shadowed, "reply_to", &self.reply_to)?;
        entry(&mut map, shadowed, "priority", &self.priority)?;
        entry(&mut map, shadowed, "ttl", &self.ttl)?;
        entry(&mut map, shadowed, "data", &self.data)?;
        entry(&mut map, shadowed, "metadata", &self.metadata)?;
        entry(&mut map, shadowed, "auth_token", &self.auth_token)?;
        entry(&mut map, shadowed, "encrypted_fields", &self.encrypted_fields)?;
        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Writes a modelled field unless an extension of the same name replaces it.
fn entry<M, T>(map: &mut M, shadowed: &Payload, key: &str, value: &T) -> Result<(), M::Error>
where
    M: SerializeMap,
    T: Serialize + ?Sized,
{
    if shadowed.contains_key(key) {
        return Ok(());
    }
    map.serialize_entry(key, value)
}

/// Checks that a raw JSON document is a valid envelope.
pub fn validate_event_schema(value: &Value) -> Result<(), SchemaValidationError> {
    EventEnvelope::from_value(value.clone()).map(|_| ())
}

// =============================================================================
// Trace Context
// =============================================================================

/// Identifiers a tracing collaborator needs to stitch events together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    pub event_id: String,
    pub correlation_id: String,
    /// Empty when the event has no cause.
    pub causation_id: String,
    pub source_service: String,
    pub source_instance: String,
}

impl TraceContext {
    /// Flattens the context into a string mapping, e.g. for message headers.
    pub fn into_map(self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("event_id".to_string(), self.event_id),
            ("correlation_id".to_string(), self.correlation_id),
            ("causation_id".to_string(), self.causation_id),
            ("source_service".to_string(), self.source_service),
            ("source_instance".to_string(), self.source_instance),
        ])
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for constructing event envelopes.
///
/// `build` applies defaults in a fixed order: identifiers and timestamp,
/// then the correlation ID, then the topic (which depends on the final
/// event type). Every field is validated before an envelope is returned.
#[derive(Debug, Clone, Default)]
pub struct EventEnvelopeBuilder {
    event_id: Option<String>,
    event_type: Option<EventType>,
    event_version: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    source_service: Option<String>,
    source_instance: Option<String>,
    correlation_id: Option<String>,
    causation_id: Option<String>,
    topic: Option<String>,
    reply_to: Option<String>,
    priority: EventPriority,
    ttl: Option<u64>,
    data: Payload,
    metadata: Payload,
    auth_token: Option<String>,
    encrypted_fields: Vec<String>,
    extensions: Payload,
}

impl EventEnvelopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = Some(id.into());
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn event_version(mut self, version: impl Into<String>) -> Self {
        self.event_version = Some(version.into());
        self
    }

    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    pub fn source_service(mut self, service: impl Into<String>) -> Self {
        self.source_service = Some(service.into());
        self
    }

    pub fn source_instance(mut self, instance: impl Into<String>) -> Self {
        self.source_instance = Some(instance.into());
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn causation_id(mut self, id: impl Into<String>) -> Self {
        self.causation_id = Some(id.into());
        self
    }

    /// Sets the topic. Pass [`AUTO_TOPIC`](crate::AUTO_TOPIC) to derive it
    /// from the event type.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn reply_to(mut self, topic: impl Into<String>) -> Self {
        self.reply_to = Some(topic.into());
        self
    }

    pub fn priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the time to live in seconds.
    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl = Some(seconds);
        self
    }

    pub fn data(mut self, data: Payload) -> Self {
        self.data = data;
        self
    }

    pub fn data_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn metadata(mut self, metadata: Payload) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn metadata_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn encrypted_field(mut self, name: impl Into<String>) -> Self {
        self.encrypted_fields.push(name.into());
        self
    }

    pub fn encrypted_fields(mut self, names: Vec<String>) -> Self {
        self.encrypted_fields = names;
        self
    }

    /// Sets the event type only if the caller has not.
    pub(crate) fn default_event_type(mut self, event_type: EventType) -> Self {
        self.event_type.get_or_insert(event_type);
        self
    }

    /// Sets the topic only if the caller has not.
    pub(crate) fn default_topic(mut self, topic: &str) -> Self {
        self.topic.get_or_insert_with(|| topic.to_string());
        self
    }

    /// Builds the event envelope.
    pub fn build(self) -> Result<EventEnvelope, SchemaValidationError> {
        // Identifiers and timestamp.
        let event_id = match self.event_id {
            Some(id) => {
                require_identifier("event_id", &id)?;
                id
            }
            None => unison_id::new_event_id(),
        };
        let timestamp = self.timestamp.unwrap_or_else(Utc::now);

        // Correlation.
        let correlation_id = match self.correlation_id {
            Some(id) => {
                require_identifier("correlation_id", &id)?;
                id
            }
            None => unison_id::new_correlation_id(),
        };

        // Topic, which needs the final event type.
        let event_type = self
            .event_type
            .ok_or(SchemaValidationError::MissingField { field: "event_type" })?;
        let requested = self
            .topic
            .ok_or(SchemaValidationError::MissingField { field: "topic" })?;
        require_text("topic", &requested)?;
        let topic = resolve_topic(event_type, &requested);

        let source_service = self
            .source_service
            .ok_or(SchemaValidationError::MissingField {
                field: "source_service",
            })?;
        require_text("source_service", &source_service)?;

        let source_instance = self
            .source_instance
            .unwrap_or_else(|| DEFAULT_SOURCE_INSTANCE.to_string());
        require_text("source_instance", &source_instance)?;

        let event_version = self
            .event_version
            .unwrap_or_else(|| DEFAULT_EVENT_VERSION.to_string());
        require_text("event_version", &event_version)?;

        if let Some(causation_id) = &self.causation_id {
            require_identifier("causation_id", causation_id)?;
        }
        if let Some(reply_to) = &self.reply_to {
            require_text("reply_to", reply_to)?;
        }
        if self.encrypted_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(SchemaValidationError::invalid(
                "encrypted_fields",
                "field names must not be blank",
            ));
        }

        Ok(EventEnvelope {
            event_id,
            event_type,
            event_version,
            timestamp,
            source_service,
            source_instance,
            correlation_id,
            causation_id: self.causation_id,
            topic,
            reply_to: self.reply_to,
            priority: self.priority,
            ttl: self.ttl,
            data: self.data,
            metadata: self.metadata,
            auth_token: self.auth_token,
            encrypted_fields: self.encrypted_fields,
            extensions: self.extensions,
        })
    }
}

// =============================================================================
// Wire Decoding
// =============================================================================

/// Loosely typed form of an incoming envelope.
///
/// Every field is optional so that decoding can report exactly which field
/// is missing or invalid, and so that defaults are applied by the builder
/// rather than by serde. Unknown fields land in `extensions`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct EnvelopeWire {
    event_id: Option<String>,
    event_type: Option<String>,
    event_version: Option<String>,
    timestamp: Option<String>,
    source_service: Option<String>,
    source_instance: Option<String>,
    correlation_id: Option<String>,
    causation_id: Option<String>,
    topic: Option<String>,
    reply_to: Option<String>,
    priority: Option<String>,
    ttl: Option<i64>,
    data: Option<Payload>,
    metadata: Option<Payload>,
    auth_token: Option<String>,
    encrypted_fields: Option<Vec<String>>,
    #[serde(flatten)]
    extensions: Payload,
}

impl EnvelopeWire {
    pub(crate) fn into_builder(self) -> Result<EventEnvelopeBuilder, SchemaValidationError> {
        let event_type = self
            .event_type
            .as_deref()
            .map(str::parse::<EventType>)
            .transpose()?;
        let mut extensions = self.extensions;
        let priority = match self.priority {
            None => EventPriority::default(),
            Some(label) => match label.parse::<EventPriority>() {
                Ok(priority) => priority,
                // Producers such as the goal service put their own labels
                // here. Keep the label and route the envelope as normal.
                Err(_) => {
                    tracing::debug!(priority = %label, "unknown event priority, routing as normal");
                    extensions.insert("priority".to_string(), Value::String(label));
                    EventPriority::Normal
                }
            },
        };
        let timestamp = self.timestamp.as_deref().map(parse_timestamp).transpose()?;
        let ttl = match self.ttl {
            Some(ttl) if ttl < 0 => {
                return Err(SchemaValidationError::OutOfRange {
                    field: "ttl",
                    value: ttl as f64,
                    min: 0.0,
                    max: u64::MAX as f64,
                })
            }
            Some(ttl) => Some(ttl.unsigned_abs()),
            None => None,
        };

        Ok(EventEnvelopeBuilder {
            event_id: self.event_id,
            event_type,
            event_version: self.event_version,
            timestamp,
            source_service: self.source_service,
            source_instance: self.source_instance,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            topic: self.topic,
            reply_to: self.reply_to,
            priority,
            ttl,
            data: self.data.unwrap_or_default(),
            metadata: self.metadata.unwrap_or_default(),
            auth_token: self.auth_token,
            encrypted_fields: self.encrypted_fields.unwrap_or_default(),
            extensions,
        })
    }
}

impl TryFrom<EnvelopeWire> for EventEnvelope {
    type Error = SchemaValidationError;

    fn try_from(wire: EnvelopeWire) -> Result<Self, Self::Error> {
        wire.into_builder()?.build()
    }
}

/// Parses an ISO-8601 timestamp. Timestamps without an offset are taken
/// as UTC, which is what producers using naive UTC clocks emit.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, SchemaValidationError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| SchemaValidationError::invalid("timestamp", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AUTO_TOPIC;
    use serde_json::json;

    fn orchestrator_event() -> EventEnvelopeBuilder {
        EventEnvelope::builder()
            .event_type(EventType::IntentReceived)
            .source_service("orchestrator")
            .topic(AUTO_TOPIC)
    }

    #[test]
    fn test_builder_defaults() {
        let envelope = orchestrator_event().build().unwrap();

        assert!(unison_id::is_valid_identifier(envelope.event_id()));
        assert!(unison_id::is_valid_identifier(envelope.correlation_id()));
        assert_ne!(envelope.event_id(), envelope.correlation_id());
        assert_eq!(envelope.event_version(), "1.0");
        assert_eq!(envelope.source_instance(), "default");
        assert_eq!(envelope.priority(), EventPriority::Normal);
        assert_eq!(envelope.topic(), "unison.intent.received");
        assert!(envelope.data().is_empty());
        assert!(envelope.metadata().is_empty());
        assert!(envelope.encrypted_fields().is_empty());
        assert_eq!(envelope.causation_id(), None);
        assert_eq!(envelope.ttl(), None);
    }

    #[test]
    fn test_each_build_gets_fresh_ids() {
        let a = orchestrator_event().build().unwrap();
        let b = orchestrator_event().build().unwrap();
        assert_ne!(a.event_id(), b.event_id());
        assert_ne!(a.correlation_id(), b.correlation_id());
    }

    #[test]
    fn test_supplied_correlation_kept() {
        let envelope = orchestrator_event()
            .correlation_id("flow-7")
            .build()
            .unwrap();
        assert_eq!(envelope.correlation_id(), "flow-7");
    }

    #[test]
    fn test_missing_required_fields() {
        let err = EventEnvelope::builder()
            .source_service("svc")
            .topic("t")
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("event_type"));

        let err = EventEnvelope::builder()
            .event_type(EventType::SystemError)
            .source_service("svc")
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("topic"));

        let err = EventEnvelope::builder()
            .event_type(EventType::SystemError)
            .topic("t")
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("source_service"));

        let err = orchestrator_event().source_service("  ").build().unwrap_err();
        assert_eq!(err.field(), Some("source_service"));
    }

    #[test]
    fn test_bad_identifiers_rejected() {
        let err = orchestrator_event().event_id("").build().unwrap_err();
        assert_eq!(err.field(), Some("event_id"));
        let err = orchestrator_event()
            .causation_id("not an id")
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("causation_id"));
    }

    #[test]
    fn test_topic_resolution() {
        let envelope = EventEnvelope::builder()
            .event_type(EventType::GoalCreated)
            .source_service("intent-graph")
            .topic("auto")
            .build()
            .unwrap();
        assert_eq!(envelope.topic(), "unison.goal.created");

        let envelope = EventEnvelope::builder()
            .event_type(EventType::GoalCreated)
            .source_service("intent-graph")
            .topic("goals.custom")
            .build()
            .unwrap();
        assert_eq!(envelope.topic(), "goals.custom");

        let envelope = EventEnvelope::builder()
            .event_type(EventType::VdiInteraction)
            .source_service("agent-vdi")
            .topic("auto")
            .build()
            .unwrap();
        assert_eq!(envelope.topic(), "auto");
    }

    #[test]
    fn test_ttl_expiry() {
        let t = Utc::now();
        let envelope = orchestrator_event().timestamp(t).ttl(5).build().unwrap();

        assert!(!envelope.is_expired_at(t + TimeDelta::seconds(4)));
        assert!(!envelope.is_expired_at(t + TimeDelta::seconds(5)));
        assert!(envelope.is_expired_at(t + TimeDelta::seconds(6)));
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let t = Utc::now();
        let envelope = orchestrator_event()
            .timestamp(t - TimeDelta::days(3650))
            .build()
            .unwrap();
        assert!(!envelope.is_expired());
        assert!(!envelope.is_expired_at(t + TimeDelta::days(36500)));
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let envelope = orchestrator_event().ttl(u64::MAX).build().unwrap();
        assert!(!envelope.is_expired());
    }

    #[test]
    fn test_routing_key() {
        let envelope = orchestrator_event().build().unwrap();
        assert_eq!(envelope.to_routing_key(), "orchestrator.intent.received");
    }

    #[test]
    fn test_trace_context() {
        let envelope = orchestrator_event()
            .source_instance("orch-2")
            .build()
            .unwrap();
        let ctx = envelope.trace_context();
        assert_eq!(ctx.event_id, envelope.event_id());
        assert_eq!(ctx.correlation_id, envelope.correlation_id());
        assert_eq!(ctx.causation_id, "");
        assert_eq!(ctx.source_service, "orchestrator");

        let map = ctx.into_map();
        assert_eq!(map.len(), 5);
        assert_eq!(map["source_instance"], "orch-2");
    }

    #[test]
    fn test_add_metadata_and_data_serialize() {
        let mut envelope = orchestrator_event().build().unwrap();
        envelope.add_metadata("k", "v");
        envelope.add_data("count", 3);

        let value = envelope.to_value().unwrap();
        assert_eq!(value["metadata"]["k"], "v");
        assert_eq!(value["data"]["count"], 3);
    }

    #[test]
    fn test_wire_shape() {
        let envelope = orchestrator_event()
            .priority(EventPriority::High)
            .build()
            .unwrap();
        let value = envelope.to_value().unwrap();

        assert_eq!(value["event_type"], "intent.received");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["causation_id"], Value::Null);
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
        for field in [
            "event_id",
            "event_version",
            "source_service",
            "source_instance",
            "correlation_id",
            "topic",
            "reply_to",
            "ttl",
            "data",
            "metadata",
            "auth_token",
            "encrypted_fields",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_json_roundtrip_preserves_everything() {
        let envelope = orchestrator_event()
            .ttl(30)
            .reply_to("unison.replies.orchestrator")
            .auth_token("tok")
            .encrypted_field("ssn")
            .data_entry("ssn", "ciphertext")
            .build()
            .unwrap();
        let json = envelope.to_json().unwrap();
        let decoded = EventEnvelope::from_json(&json).unwrap();
        assert_eq!(decoded, envelope);

        let via_serde: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(via_serde, envelope);
    }

    #[test]
    fn test_decode_applies_defaults() {
        let envelope = EventEnvelope::from_value(json!({
            "event_type": "goal.created",
            "source_service": "intent-graph",
            "topic": "auto",
        }))
        .unwrap();
        assert_eq!(envelope.topic(), "unison.goal.created");
        assert_eq!(envelope.event_version(), "1.0");
        assert!(unison_id::is_valid_identifier(envelope.correlation_id()));
    }

    #[test]
    fn test_decode_accepts_naive_utc_timestamp() {
        let envelope = EventEnvelope::from_value(json!({
            "event_type": "system.alert",
            "source_service": "monitor",
            "topic": "auto",
            "timestamp": "2025-01-02T03:04:05.123456",
        }))
        .unwrap();
        assert_eq!(envelope.timestamp().to_rfc3339(), "2025-01-02T03:04:05.123456+00:00");
    }

    #[test]
    fn test_decode_rejects_bad_fields() {
        let base = json!({
            "event_type": "goal.created",
            "source_service": "intent-graph",
            "topic": "auto",
        });

        let mut doc = base.clone();
        doc["event_type"] = json!("goal.exploded");
        assert_eq!(
            EventEnvelope::from_value(doc).unwrap_err().field(),
            Some("event_type")
        );

        let mut doc = base.clone();
        doc["priority"] = json!(3);
        assert!(matches!(
            EventEnvelope::from_value(doc),
            Err(SchemaValidationError::Malformed(_))
        ));

        let mut doc = base.clone();
        doc["ttl"] = json!(-1);
        assert_eq!(
            EventEnvelope::from_value(doc).unwrap_err().field(),
            Some("ttl")
        );

        let mut doc = base;
        doc["timestamp"] = json!("yesterday");
        assert_eq!(
            EventEnvelope::from_value(doc).unwrap_err().field(),
            Some("timestamp")
        );

        assert!(matches!(
            EventEnvelope::from_json("[1, 2]"),
            Err(SchemaValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let envelope = EventEnvelope::from_value(json!({
            "event_type": "intent.received",
            "source_service": "orchestrator",
            "topic": "auto",
            "person_id": "u1",
            "confidence": 0.9,
        }))
        .unwrap();
        assert_eq!(envelope.extension("person_id"), Some(&json!("u1")));
        assert_eq!(envelope.extensions().len(), 2);
        assert!(envelope.data().is_empty());

        let value = envelope.to_value().unwrap();
        assert_eq!(value["person_id"], "u1");
        assert_eq!(value["confidence"], 0.9);
        assert_eq!(EventEnvelope::from_value(value).unwrap(), envelope);
    }

    #[test]
    fn test_unknown_priority_label_falls_back_to_normal() {
        let envelope = EventEnvelope::from_value(json!({
            "event_type": "goal.created",
            "source_service": "intent-graph",
            "topic": "auto",
            "priority": "medium",
        }))
        .unwrap();
        assert_eq!(envelope.priority(), EventPriority::Normal);
        assert_eq!(envelope.extension("priority"), Some(&json!("medium")));

        // The raw label is written back in place of the routing priority.
        let json = envelope.to_json().unwrap();
        assert_eq!(json.matches("\"priority\"").count(), 1);
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["priority"], "medium");
    }

    #[test]
    fn test_built_envelopes_have_no_extensions() {
        let envelope = orchestrator_event().priority(EventPriority::Low).build().unwrap();
        assert!(envelope.extensions().is_empty());
        assert_eq!(envelope.to_value().unwrap()["priority"], "low");
    }

    #[test]
    fn test_validate_event_schema() {
        assert!(validate_event_schema(&json!({
            "event_type": "service.health",
            "source_service": "context",
            "topic": "auto",
        }))
        .is_ok());
        assert!(validate_event_schema(&json!({"event_type": "service.health"})).is_err());
    }

    #[test]
    fn test_reply_builder() {
        let request = orchestrator_event()
            .reply_to("unison.replies.orchestrator")
            .build()
            .unwrap();
        let reply = request
            .reply_builder("intent-graph", EventType::IntentProcessed)
            .build()
            .unwrap();

        assert_eq!(reply.causation_id(), Some(request.event_id()));
        assert_eq!(reply.correlation_id(), request.correlation_id());
        assert_eq!(reply.topic(), "unison.replies.orchestrator");
        assert_eq!(reply.source_service(), "intent-graph");
    }
}
