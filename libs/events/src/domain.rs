//! Domain events: an envelope plus a typed payload.
//!
//! Payload fields travel at the top level of the JSON object, next to the
//! envelope fields. Each payload type names a canonical event type; a
//! domain event built or decoded without an explicit `event_type` gets that
//! type, and one without a `topic` gets the `"auto"` sentinel so the topic
//! resolves through the same lookup table as a raw envelope.
//!
//! A payload field that shares its name with an envelope field (the goal
//! `priority` label) replaces the envelope field on the wire.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use unison_id::{Experience, ExperienceId, Goal, GoalId, RecordId, RecordKind};

use crate::envelope::EnvelopeWire;
use crate::error::require_text;
use crate::{
    EventEnvelope, EventEnvelopeBuilder, EventPriority, EventType, Payload, SchemaValidationError,
    AUTO_TOPIC,
};

/// A payload that turns an envelope into a domain event.
pub trait EventPayload: Serialize + DeserializeOwned + Clone + fmt::Debug {
    /// Event type used when the producer does not choose one.
    const CANONICAL_TYPE: EventType;

    /// Fields that must be present on the wire.
    const REQUIRED_FIELDS: &'static [&'static str];

    /// Checks field values that the type system cannot express.
    fn validate(&self) -> Result<(), SchemaValidationError>;

    /// Checks the raw wire fields before decoding.
    fn check_fields(fields: &Payload) -> Result<(), SchemaValidationError> {
        require_fields(fields, Self::REQUIRED_FIELDS)
    }
}

fn require_fields(fields: &Payload, required: &[&'static str]) -> Result<(), SchemaValidationError> {
    for &field in required {
        if fields.get(field).is_none_or(Value::is_null) {
            return Err(SchemaValidationError::MissingField { field });
        }
    }
    Ok(())
}

/// Checks that a wire value, when present, is a `K` record identifier.
fn check_record_id<K: RecordKind>(value: Option<&Value>) -> Result<(), SchemaValidationError> {
    match value {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(id)) => RecordId::<K>::parse(id)
            .map(|_| ())
            .map_err(|e| SchemaValidationError::invalid(K::FIELD, e.to_string())),
        Some(other) => Err(SchemaValidationError::invalid(
            K::FIELD,
            format!("expected an identifier string, got {other}"),
        )),
    }
}

/// An envelope specialized with a domain payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainEvent<P> {
    envelope: EventEnvelope,
    payload: P,
}

pub type IntentEvent = DomainEvent<IntentPayload>;
pub type ContextEvent = DomainEvent<ContextPayload>;
pub type ExperienceEvent = DomainEvent<ExperiencePayload>;
pub type GoalEvent = DomainEvent<GoalPayload>;

impl<P: EventPayload> DomainEvent<P> {
    /// Creates a builder around a payload.
    pub fn builder(payload: P) -> DomainEventBuilder<P> {
        DomainEventBuilder {
            envelope: EventEnvelopeBuilder::new(),
            payload,
        }
    }

    pub fn envelope(&self) -> &EventEnvelope {
        &self.envelope
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_parts(self) -> (EventEnvelope, P) {
        (self.envelope, self.payload)
    }

    /// Decodes a domain event from a JSON object's fields.
    ///
    /// Fields the payload consumes are not seen by the envelope, so a
    /// payload field never leaks into the envelope's extensions and a
    /// colliding name never reaches the envelope decoder.
    pub fn from_fields(mut fields: Payload) -> Result<Self, SchemaValidationError> {
        P::check_fields(&fields)?;
        let payload: P = serde_json::from_value(Value::Object(fields.clone()))?;
        if let Value::Object(consumed) = serde_json::to_value(&payload)? {
            fields.retain(|name, _| !consumed.contains_key(name));
        }
        let wire: EnvelopeWire = serde_json::from_value(Value::Object(fields))?;
        let envelope = wire
            .into_builder()?
            .default_event_type(P::CANONICAL_TYPE)
            .default_topic(AUTO_TOPIC)
            .build()?;
        payload.validate()?;
        Ok(Self { envelope, payload })
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaValidationError> {
        Self::from_fields(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self, SchemaValidationError> {
        match value {
            Value::Object(fields) => Self::from_fields(fields),
            _ => Err(SchemaValidationError::Malformed(
                "event must be a JSON object".to_string(),
            )),
        }
    }

    /// Encodes the envelope and payload into one JSON object.
    pub fn to_fields(&self) -> Result<Payload, SchemaValidationError> {
        let Value::Object(mut fields) = serde_json::to_value(&self.envelope)? else {
            return Err(SchemaValidationError::Malformed(
                "envelope did not encode to an object".to_string(),
            ));
        };
        let Value::Object(payload) = serde_json::to_value(&self.payload)? else {
            return Err(SchemaValidationError::Malformed(
                "payload did not encode to an object".to_string(),
            ));
        };
        fields.extend(payload);
        Ok(fields)
    }

    pub fn to_json(&self) -> Result<String, SchemaValidationError> {
        Ok(serde_json::to_string(&self.to_fields()?)?)
    }

    pub fn to_value(&self) -> Result<Value, SchemaValidationError> {
        Ok(Value::Object(self.to_fields()?))
    }

    /// The plain envelope a consumer that ignores payload types would see.
    /// Payload fields ride along as envelope extensions.
    pub fn to_envelope(&self) -> Result<EventEnvelope, SchemaValidationError> {
        EventEnvelope::from_value(self.to_value()?)
    }
}

/// Reads a domain event back out of a plain envelope, e.g. one decoded by
/// a consumer that routes on the envelope alone. Payload fields are taken
/// from the envelope's extensions.
impl<P: EventPayload> TryFrom<&EventEnvelope> for DomainEvent<P> {
    type Error = SchemaValidationError;

    fn try_from(envelope: &EventEnvelope) -> Result<Self, Self::Error> {
        Self::from_value(envelope.to_value()?)
    }
}

impl<P> Deref for DomainEvent<P> {
    type Target = EventEnvelope;

    fn deref(&self) -> &Self::Target {
        &self.envelope
    }
}

impl<P> DerefMut for DomainEvent<P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.envelope
    }
}

impl<P: EventPayload> Serialize for DomainEvent<P> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_fields()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, P: EventPayload> Deserialize<'de> for DomainEvent<P> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Payload::deserialize(deserializer)?;
        Self::from_fields(fields).map_err(D::Error::custom)
    }
}

/// Builder for domain events.
///
/// Envelope setters mirror [`EventEnvelopeBuilder`]; anything not mirrored
/// is reachable through [`DomainEventBuilder::map_envelope`].
#[derive(Debug, Clone)]
pub struct DomainEventBuilder<P> {
    envelope: EventEnvelopeBuilder,
    payload: P,
}

impl<P: EventPayload> DomainEventBuilder<P> {
    pub fn source_service(mut self, service: impl Into<String>) -> Self {
        self.envelope = self.envelope.source_service(service);
        self
    }

    pub fn source_instance(mut self, instance: impl Into<String>) -> Self {
        self.envelope = self.envelope.source_instance(instance);
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.envelope = self.envelope.event_type(event_type);
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.envelope = self.envelope.topic(topic);
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.envelope = self.envelope.correlation_id(id);
        self
    }

    pub fn causation_id(mut self, id: impl Into<String>) -> Self {
        self.envelope = self.envelope.causation_id(id);
        self
    }

    pub fn reply_to(mut self, topic: impl Into<String>) -> Self {
        self.envelope = self.envelope.reply_to(topic);
        self
    }

    pub fn priority(mut self, priority: EventPriority) -> Self {
        self.envelope = self.envelope.priority(priority);
        self
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.envelope = self.envelope.ttl(seconds);
        self
    }

    /// Applies arbitrary envelope settings.
    pub fn map_envelope(mut self, f: impl FnOnce(EventEnvelopeBuilder) -> EventEnvelopeBuilder) -> Self {
        self.envelope = f(self.envelope);
        self
    }

    /// Builds the domain event, defaulting `event_type` to the payload's
    /// canonical type and `topic` to `"auto"`.
    pub fn build(self) -> Result<DomainEvent<P>, SchemaValidationError> {
        let envelope = self
            .envelope
            .default_event_type(P::CANONICAL_TYPE)
            .default_topic(AUTO_TOPIC)
            .build()?;
        self.payload.validate()?;
        Ok(DomainEvent {
            envelope,
            payload: self.payload,
        })
    }
}

// =============================================================================
// Intent
// =============================================================================

/// Payload for intent-related events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPayload {
    /// Person submitting the intent.
    pub person_id: String,
    /// Natural language expression of the intent.
    pub expression: String,
    pub intent_type: Option<String>,
    /// Classifier confidence in `[0.0, 1.0]`.
    #[serde(default)]
    pub confidence: f64,
}

impl IntentPayload {
    pub fn new(person_id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            person_id: person_id.into(),
            expression: expression.into(),
            intent_type: None,
            confidence: 0.0,
        }
    }

    pub fn with_intent_type(mut self, intent_type: impl Into<String>) -> Self {
        self.intent_type = Some(intent_type.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

impl EventPayload for IntentPayload {
    const CANONICAL_TYPE: EventType = EventType::IntentReceived;
    const REQUIRED_FIELDS: &'static [&'static str] = &["person_id", "expression"];

    fn validate(&self) -> Result<(), SchemaValidationError> {
        require_text("person_id", &self.person_id)?;
        require_text("expression", &self.expression)?;
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(SchemaValidationError::OutOfRange {
                field: "confidence",
                value: self.confidence,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Context
// =============================================================================

fn default_merge_strategy() -> String {
    "merge".to_string()
}

/// Payload for context-related events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPayload {
    pub person_id: String,
    /// Kind of context, e.g. `user`, `session`, `environment`.
    pub context_type: String,
    #[serde(default)]
    pub context_data: Payload,
    #[serde(default = "default_merge_strategy")]
    pub merge_strategy: String,
}

impl ContextPayload {
    pub fn new(person_id: impl Into<String>, context_type: impl Into<String>) -> Self {
        Self {
            person_id: person_id.into(),
            context_type: context_type.into(),
            context_data: Payload::new(),
            merge_strategy: default_merge_strategy(),
        }
    }

    pub fn with_context_data(mut self, data: Payload) -> Self {
        self.context_data = data;
        self
    }

    pub fn with_merge_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.merge_strategy = strategy.into();
        self
    }
}

impl EventPayload for ContextPayload {
    const CANONICAL_TYPE: EventType = EventType::ContextUpdated;
    const REQUIRED_FIELDS: &'static [&'static str] = &["person_id", "context_type"];

    fn validate(&self) -> Result<(), SchemaValidationError> {
        require_text("person_id", &self.person_id)?;
        require_text("context_type", &self.context_type)?;
        require_text("merge_strategy", &self.merge_strategy)
    }
}

// =============================================================================
// Experience
// =============================================================================

/// Payload for experience-related events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperiencePayload {
    pub experience_id: ExperienceId,
    pub person_id: String,
    /// Kind of experience, e.g. `ui`, `voice`, `ar`.
    pub experience_type: String,
    #[serde(default)]
    pub components: Vec<Payload>,
    #[serde(default)]
    pub adaptation_rules: Vec<Payload>,
}

impl ExperiencePayload {
    /// Describes a new experience under a freshly minted ID.
    pub fn new(person_id: impl Into<String>, experience_type: impl Into<String>) -> Self {
        Self {
            experience_id: ExperienceId::new(),
            person_id: person_id.into(),
            experience_type: experience_type.into(),
            components: Vec::new(),
            adaptation_rules: Vec::new(),
        }
    }

    pub fn with_experience_id(mut self, experience_id: ExperienceId) -> Self {
        self.experience_id = experience_id;
        self
    }

    pub fn with_component(mut self, component: Payload) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_adaptation_rule(mut self, rule: Payload) -> Self {
        self.adaptation_rules.push(rule);
        self
    }
}

impl EventPayload for ExperiencePayload {
    const CANONICAL_TYPE: EventType = EventType::ExperienceGenerated;
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["experience_id", "person_id", "experience_type"];

    fn validate(&self) -> Result<(), SchemaValidationError> {
        require_text("person_id", &self.person_id)?;
        require_text("experience_type", &self.experience_type)
    }

    fn check_fields(fields: &Payload) -> Result<(), SchemaValidationError> {
        require_fields(fields, Self::REQUIRED_FIELDS)?;
        check_record_id::<Experience>(fields.get(Experience::FIELD))
    }
}

// =============================================================================
// Goal
// =============================================================================

/// Goal lifecycle state.
///
/// `pending → active → {completed | failed | cancelled}`. Transitions are
/// driven by the services that own goals; events only carry the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalState {
    #[default]
    Pending,
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl GoalState {
    pub const ALL: [GoalState; 5] = [
        GoalState::Pending,
        GoalState::Active,
        GoalState::Completed,
        GoalState::Failed,
        GoalState::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            GoalState::Pending => "pending",
            GoalState::Active => "active",
            GoalState::Completed => "completed",
            GoalState::Failed => "failed",
            GoalState::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            GoalState::Completed | GoalState::Failed | GoalState::Cancelled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub const fn can_transition_to(&self, next: GoalState) -> bool {
        match self {
            GoalState::Pending => matches!(next, GoalState::Active),
            GoalState::Active => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for GoalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalState {
    type Err = SchemaValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoalState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| {
                SchemaValidationError::invalid(
                    "goal_state",
                    format!(
                        "'{s}' is not one of pending, active, completed, failed, cancelled"
                    ),
                )
            })
    }
}

impl<'de> Deserialize<'de> for GoalState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

fn default_goal_priority() -> String {
    "normal".to_string()
}

/// Payload for goal-related events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalPayload {
    pub goal_id: GoalId,
    pub person_id: String,
    pub goal_type: String,
    #[serde(default)]
    pub goal_state: GoalState,
    /// Goal priority label. Unrelated to [`EventPriority`].
    #[serde(default = "default_goal_priority")]
    pub priority: String,
    /// Goals this one waits on.
    #[serde(default)]
    pub dependencies: Vec<GoalId>,
}

impl GoalPayload {
    /// Describes a new pending goal under a freshly minted ID.
    pub fn new(person_id: impl Into<String>, goal_type: impl Into<String>) -> Self {
        Self {
            goal_id: GoalId::new(),
            person_id: person_id.into(),
            goal_type: goal_type.into(),
            goal_state: GoalState::default(),
            priority: default_goal_priority(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_goal_id(mut self, goal_id: GoalId) -> Self {
        self.goal_id = goal_id;
        self
    }

    pub fn with_state(mut self, state: GoalState) -> Self {
        self.goal_state = state;
        self
    }

    /// Sets the state from its label, rejecting labels outside the
    /// lifecycle.
    pub fn with_state_label(self, label: &str) -> Result<Self, SchemaValidationError> {
        Ok(self.with_state(label.parse()?))
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn with_dependency(mut self, goal_id: GoalId) -> Self {
        self.dependencies.push(goal_id);
        self
    }
}

impl EventPayload for GoalPayload {
    const CANONICAL_TYPE: EventType = EventType::GoalCreated;
    const REQUIRED_FIELDS: &'static [&'static str] = &["goal_id", "person_id", "goal_type"];
    fn validate(&self) -> Result<(), SchemaValidationError> {
        require_text("person_id", &self.person_id)?;
        require_text("goal_type", &self.goal_type)?;
        require_text("priority", &self.priority)?;
        if self.dependencies.contains(&self.goal_id) {
            return Err(SchemaValidationError::invalid(
                "dependencies",
                "a goal cannot depend on itself",
            ));
        }
        Ok(())
    }

    fn check_fields(fields: &Payload) -> Result<(), SchemaValidationError> {
        require_fields(fields, Self::REQUIRED_FIELDS)?;
        check_record_id::<Goal>(fields.get(Goal::FIELD))?;
        match fields.get("dependencies") {
            Some(Value::Array(ids)) => {
                for id in ids {
                    check_record_id::<Goal>(Some(id)).map_err(|e| match e {
                        SchemaValidationError::InvalidValue { message, .. } => {
                            SchemaValidationError::invalid("dependencies", message)
                        }
                        other => other,
                    })?;
                }
            }
            None | Some(Value::Null) => {}
            Some(other) => {
                return Err(SchemaValidationError::invalid(
                    "dependencies",
                    format!("expected a list of goal IDs, got {other}"),
                ))
            }
        }
        match fields.get("goal_state") {
            Some(Value::String(label)) => label.parse::<GoalState>().map(|_| ()),
            None => Ok(()),
            Some(other) => Err(SchemaValidationError::invalid(
                "goal_state",
                format!("expected a string, got {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_event_defaults() {
        let event = IntentEvent::builder(IntentPayload::new("u1", "hello"))
            .source_service("orchestrator")
            .build()
            .unwrap();

        assert_eq!(event.event_type(), EventType::IntentReceived);
        assert_eq!(event.topic(), "unison.intent.received");
        assert!(unison_id::is_valid_identifier(event.correlation_id()));
        assert_eq!(event.payload().confidence, 0.0);
        assert_eq!(event.payload().intent_type, None);
    }

    #[test]
    fn test_explicit_type_and_topic_win() {
        let event = IntentEvent::builder(IntentPayload::new("u1", "hello"))
            .source_service("intent-graph")
            .event_type(EventType::IntentProcessed)
            .build()
            .unwrap();
        assert_eq!(event.event_type(), EventType::IntentProcessed);
        assert_eq!(event.topic(), "unison.intent.processed");

        let event = IntentEvent::builder(IntentPayload::new("u1", "hello"))
            .source_service("intent-graph")
            .topic("intents.eu")
            .build()
            .unwrap();
        assert_eq!(event.topic(), "intents.eu");
    }

    #[test]
    fn test_confidence_range() {
        let err = IntentEvent::builder(IntentPayload::new("u1", "hello").with_confidence(1.5))
            .source_service("orchestrator")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaValidationError::OutOfRange { field: "confidence", .. }
        ));

        for bad in [-0.1, f64::NAN, f64::INFINITY] {
            assert!(IntentPayload::new("u1", "hello")
                .with_confidence(bad)
                .validate()
                .is_err());
        }
    }

    #[test]
    fn test_intent_roundtrip() {
        let event = IntentEvent::builder(
            IntentPayload::new("u1", "book a table").with_confidence(0.5),
        )
        .source_service("orchestrator")
        .build()
        .unwrap();

        let json = serde_json::to_string(&event).unwrap();
        let decoded: IntentEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.payload().confidence, 0.5);
    }

    #[test]
    fn test_payload_fields_at_top_level() {
        let event = IntentEvent::builder(IntentPayload::new("u1", "hello"))
            .source_service("orchestrator")
            .build()
            .unwrap();
        let value = event.to_value().unwrap();
        assert_eq!(value["person_id"], "u1");
        assert_eq!(value["expression"], "hello");
        assert_eq!(value["event_type"], "intent.received");
    }

    #[test]
    fn test_decode_applies_variant_defaults() {
        let goal_id = GoalId::new();
        let event = GoalEvent::from_value(json!({
            "source_service": "intent-graph",
            "goal_id": goal_id.to_string(),
            "person_id": "u1",
            "goal_type": "schedule_meeting",
        }))
        .unwrap();
        assert_eq!(event.event_type(), EventType::GoalCreated);
        assert_eq!(event.topic(), "unison.goal.created");
        assert_eq!(event.payload().goal_state, GoalState::Pending);
        assert_eq!(event.payload().priority, "normal");
        assert_eq!(event.payload().goal_id, goal_id);
        assert!(event.extensions().is_empty());
    }

    #[test]
    fn test_record_ids_checked_on_decode() {
        let base = json!({
            "source_service": "intent-graph",
            "goal_id": GoalId::new().to_string(),
            "person_id": "u1",
            "goal_type": "schedule_meeting",
        });

        let mut doc = base.clone();
        doc["goal_id"] = json!("goal-1");
        assert_eq!(GoalEvent::from_value(doc).unwrap_err().field(), Some("goal_id"));

        let mut doc = base.clone();
        doc["goal_id"] = json!(ExperienceId::new().to_string());
        assert_eq!(GoalEvent::from_value(doc).unwrap_err().field(), Some("goal_id"));

        let mut doc = base.clone();
        doc["dependencies"] = json!([GoalId::new().to_string(), "goal-0"]);
        assert_eq!(
            GoalEvent::from_value(doc).unwrap_err().field(),
            Some("dependencies")
        );

        let mut doc = base;
        doc["dependencies"] = json!("goal-0");
        assert_eq!(
            GoalEvent::from_value(doc).unwrap_err().field(),
            Some("dependencies")
        );

        let err = ExperienceEvent::from_value(json!({
            "source_service": "experience-renderer",
            "experience_id": 42,
            "person_id": "u1",
            "experience_type": "ui",
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("experience_id"));
    }

    #[test]
    fn test_goal_cannot_depend_on_itself() {
        let payload = GoalPayload::new("u1", "schedule_meeting");
        let own = payload.goal_id;
        let err = GoalEvent::builder(payload.with_dependency(own))
            .source_service("intent-graph")
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("dependencies"));
    }

    #[test]
    fn test_decode_missing_payload_field() {
        let err = IntentEvent::from_value(json!({
            "source_service": "orchestrator",
            "person_id": "u1",
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("expression"));
    }

    #[test]
    fn test_goal_state_validation() {
        let payload = GoalPayload::new("u1", "schedule_meeting");
        assert!(payload.clone().with_state_label("bogus").is_err());

        let event = GoalEvent::builder(payload.with_state_label("completed").unwrap())
            .source_service("intent-graph")
            .event_type(EventType::GoalCompleted)
            .build()
            .unwrap();
        assert_eq!(event.payload().goal_state, GoalState::Completed);

        let err = GoalEvent::from_value(json!({
            "source_service": "intent-graph",
            "goal_id": GoalId::new().to_string(),
            "person_id": "u1",
            "goal_type": "schedule_meeting",
            "goal_state": "bogus",
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("goal_state"));
    }

    #[test]
    fn test_goal_priority_shadows_envelope_priority() {
        let dependency = GoalId::new();
        let event = GoalEvent::builder(
            GoalPayload::new("u1", "schedule_meeting")
                .with_priority("high")
                .with_dependency(dependency),
        )
        .source_service("intent-graph")
        .build()
        .unwrap();

        let value = event.to_value().unwrap();
        assert_eq!(value["priority"], "high");

        let decoded = GoalEvent::from_value(value).unwrap();
        assert_eq!(decoded.payload().priority, "high");
        assert_eq!(decoded.priority(), EventPriority::Normal);
        assert_eq!(decoded.payload().dependencies, vec![dependency]);

        // Labels outside the envelope vocabulary are fine for goals.
        let event = GoalEvent::builder(GoalPayload::new("u1", "t").with_priority("medium"))
            .source_service("intent-graph")
            .build()
            .unwrap();
        let decoded = GoalEvent::from_json(&event.to_json().unwrap()).unwrap();
        assert_eq!(decoded.payload().priority, "medium");
    }

    #[test]
    fn test_goal_event_through_plain_envelope() {
        let event = GoalEvent::builder(
            GoalPayload::new("u1", "schedule_meeting")
                .with_priority("medium")
                .with_state(GoalState::Active),
        )
        .source_service("intent-graph")
        .event_type(EventType::GoalUpdated)
        .build()
        .unwrap();

        let envelope = EventEnvelope::from_json(&event.to_json().unwrap()).unwrap();
        assert_eq!(envelope.priority(), EventPriority::Normal);
        assert_eq!(envelope.extension("priority"), Some(&json!("medium")));
        assert_eq!(
            envelope.extension("goal_id"),
            Some(&json!(event.payload().goal_id.to_string()))
        );

        let recovered = GoalEvent::try_from(&envelope).unwrap();
        assert_eq!(recovered, event);
        assert!(recovered.extensions().is_empty());
    }

    #[test]
    fn test_intent_event_through_plain_envelope() {
        let event = IntentEvent::builder(
            IntentPayload::new("u1", "turn on the lights").with_confidence(0.8),
        )
        .source_service("orchestrator")
        .build()
        .unwrap();
        let envelope = EventEnvelope::from_value(event.to_value().unwrap()).unwrap();
        assert_eq!(envelope.extension("person_id"), Some(&json!("u1")));

        let recovered = IntentEvent::try_from(&envelope).unwrap();
        assert_eq!(recovered.payload(), event.payload());
        assert_eq!(recovered.event_id(), event.event_id());

        // A plain envelope without the payload fields is not an intent event.
        let bare = EventEnvelope::builder()
            .event_type(EventType::IntentReceived)
            .source_service("orchestrator")
            .topic("auto")
            .build()
            .unwrap();
        assert_eq!(
            IntentEvent::try_from(&bare).unwrap_err().field(),
            Some("person_id")
        );
    }

    #[test]
    fn test_goal_lifecycle() {
        assert!(GoalState::Pending.can_transition_to(GoalState::Active));
        assert!(GoalState::Active.can_transition_to(GoalState::Completed));
        assert!(!GoalState::Completed.can_transition_to(GoalState::Active));
        assert!(!GoalState::Pending.can_transition_to(GoalState::Completed));
        assert!(!GoalState::Pending.can_transition_to(GoalState::Cancelled));
        assert!(GoalState::Active.can_transition_to(GoalState::Cancelled));
        assert!(!GoalState::Active.can_transition_to(GoalState::Pending));
        assert!(GoalState::Cancelled.is_terminal());
        assert!(!GoalState::Active.is_terminal());
    }

    #[test]
    fn test_context_event_defaults() {
        let mut data = Payload::new();
        data.insert("timezone".into(), json!("UTC"));
        let event = ContextEvent::builder(
            ContextPayload::new("u1", "session").with_context_data(data),
        )
        .source_service("context")
        .build()
        .unwrap();

        assert_eq!(event.event_type(), EventType::ContextUpdated);
        assert_eq!(event.topic(), "unison.context.updated");
        assert_eq!(event.payload().merge_strategy, "merge");
        assert_eq!(event.payload().context_data["timezone"], "UTC");
    }

    #[test]
    fn test_experience_event_roundtrip() {
        let mut component = Payload::new();
        component.insert("type".into(), json!("ui_interface"));
        let event = ExperienceEvent::builder(
            ExperiencePayload::new("u1", "ui").with_component(component),
        )
        .source_service("experience-renderer")
        .build()
        .unwrap();
        assert_eq!(event.topic(), "unison.experience.generated");

        let decoded = ExperienceEvent::from_json(&event.to_json().unwrap()).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.payload().components[0]["type"], "ui_interface");
    }

    #[test]
    fn test_blank_required_field_rejected() {
        let err = ExperienceEvent::builder(ExperiencePayload::new(" ", "ui"))
            .source_service("experience-renderer")
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("person_id"));
    }

    #[test]
    fn test_metadata_through_deref() {
        let mut event = ContextEvent::builder(ContextPayload::new("u1", "user"))
            .source_service("context")
            .build()
            .unwrap();
        event.add_metadata("k", "v");
        event.add_data("n", 1);
        let value = event.to_value().unwrap();
        assert_eq!(value["metadata"]["k"], "v");
        assert_eq!(value["data"]["n"], 1);
    }
}
