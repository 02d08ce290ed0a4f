//! Event taxonomies: the closed vocabularies used by the envelope.
//!
//! Both enums serialize as their dotted string values, never as structured
//! tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SchemaValidationError;

// =============================================================================
// Event Type
// =============================================================================

/// Standardized event types across all platform services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    // Intent processing
    #[serde(rename = "intent.received")]
    IntentReceived,
    #[serde(rename = "intent.processed")]
    IntentProcessed,
    #[serde(rename = "intent.decomposed")]
    IntentDecomposed,
    #[serde(rename = "intent.failed")]
    IntentFailed,

    // Context management
    #[serde(rename = "context.updated")]
    ContextUpdated,
    #[serde(rename = "context.query")]
    ContextQuery,
    #[serde(rename = "context.response")]
    ContextResponse,
    #[serde(rename = "context.merged")]
    ContextMerged,

    // Goal management
    #[serde(rename = "goal.created")]
    GoalCreated,
    #[serde(rename = "goal.updated")]
    GoalUpdated,
    #[serde(rename = "goal.completed")]
    GoalCompleted,
    #[serde(rename = "goal.failed")]
    GoalFailed,
    #[serde(rename = "goal.cancelled")]
    GoalCancelled,

    // Experience management
    #[serde(rename = "experience.generated")]
    ExperienceGenerated,
    #[serde(rename = "experience.adapted")]
    ExperienceAdapted,
    #[serde(rename = "experience.interaction")]
    ExperienceInteraction,
    #[serde(rename = "experience.rendered")]
    ExperienceRendered,

    // Agent VDI
    #[serde(rename = "vdi.session.created")]
    VdiSessionCreated,
    #[serde(rename = "vdi.session.destroyed")]
    VdiSessionDestroyed,
    #[serde(rename = "vdi.display.updated")]
    VdiDisplayUpdated,
    #[serde(rename = "vdi.interaction")]
    VdiInteraction,

    // I/O
    #[serde(rename = "speech.processed")]
    SpeechProcessed,
    #[serde(rename = "vision.processed")]
    VisionProcessed,
    #[serde(rename = "io.request")]
    IoRequest,
    #[serde(rename = "io.response")]
    IoResponse,

    // Inference
    #[serde(rename = "inference.request")]
    InferenceRequest,
    #[serde(rename = "inference.response")]
    InferenceResponse,
    #[serde(rename = "inference.completed")]
    InferenceCompleted,
    #[serde(rename = "inference.failed")]
    InferenceFailed,

    // Service and system
    #[serde(rename = "service.health")]
    ServiceHealth,
    #[serde(rename = "service.metrics")]
    ServiceMetrics,
    #[serde(rename = "service.started")]
    ServiceStarted,
    #[serde(rename = "service.stopped")]
    ServiceStopped,
    #[serde(rename = "system.alert")]
    SystemAlert,
    #[serde(rename = "system.error")]
    SystemError,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [EventType; 35] = [
        EventType::IntentReceived,
        EventType::IntentProcessed,
        EventType::IntentDecomposed,
        EventType::IntentFailed,
        EventType::ContextUpdated,
        EventType::ContextQuery,
        EventType::ContextResponse,
        EventType::ContextMerged,
        EventType::GoalCreated,
        EventType::GoalUpdated,
        EventType::GoalCompleted,
        EventType::GoalFailed,
        EventType::GoalCancelled,
        EventType::ExperienceGenerated,
        EventType::ExperienceAdapted,
        EventType::ExperienceInteraction,
        EventType::ExperienceRendered,
        EventType::VdiSessionCreated,
        EventType::VdiSessionDestroyed,
        EventType::VdiDisplayUpdated,
        EventType::VdiInteraction,
        EventType::SpeechProcessed,
        EventType::VisionProcessed,
        EventType::IoRequest,
        EventType::IoResponse,
        EventType::InferenceRequest,
        EventType::InferenceResponse,
        EventType::InferenceCompleted,
        EventType::InferenceFailed,
        EventType::ServiceHealth,
        EventType::ServiceMetrics,
        EventType::ServiceStarted,
        EventType::ServiceStopped,
        EventType::SystemAlert,
        EventType::SystemError,
    ];

    /// The wire value, e.g. `"intent.received"`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::IntentReceived => "intent.received",
            EventType::IntentProcessed => "intent.processed",
            EventType::IntentDecomposed => "intent.decomposed",
            EventType::IntentFailed => "intent.failed",
            EventType::ContextUpdated => "context.updated",
            EventType::ContextQuery => "context.query",
            EventType::ContextResponse => "context.response",
            EventType::ContextMerged => "context.merged",
            EventType::GoalCreated => "goal.created",
            EventType::GoalUpdated => "goal.updated",
            EventType::GoalCompleted => "goal.completed",
            EventType::GoalFailed => "goal.failed",
            EventType::GoalCancelled => "goal.cancelled",
            EventType::ExperienceGenerated => "experience.generated",
            EventType::ExperienceAdapted => "experience.adapted",
            EventType::ExperienceInteraction => "experience.interaction",
            EventType::ExperienceRendered => "experience.rendered",
            EventType::VdiSessionCreated => "vdi.session.created",
            EventType::VdiSessionDestroyed => "vdi.session.destroyed",
            EventType::VdiDisplayUpdated => "vdi.display.updated",
            EventType::VdiInteraction => "vdi.interaction",
            EventType::SpeechProcessed => "speech.processed",
            EventType::VisionProcessed => "vision.processed",
            EventType::IoRequest => "io.request",
            EventType::IoResponse => "io.response",
            EventType::InferenceRequest => "inference.request",
            EventType::InferenceResponse => "inference.response",
            EventType::InferenceCompleted => "inference.completed",
            EventType::InferenceFailed => "inference.failed",
            EventType::ServiceHealth => "service.health",
            EventType::ServiceMetrics => "service.metrics",
            EventType::ServiceStarted => "service.started",
            EventType::ServiceStopped => "service.stopped",
            EventType::SystemAlert => "system.alert",
            EventType::SystemError => "system.error",
        }
    }

    /// The subsystem group, i.e. the text before the first dot.
    pub fn domain(&self) -> &'static str {
        let s = self.as_str();
        s.split_once('.').map_or(s, |(group, _)| group)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = SchemaValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaValidationError::invalid("event_type", format!("unknown event type '{s}'")))
    }
}

// =============================================================================
// Event Priority
// =============================================================================

/// Event priority levels for routing and processing.
///
/// Declaration order gives `Ord`; this layer does not act on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
    Urgent,
}

impl EventPriority {
    pub const ALL: [EventPriority; 5] = [
        EventPriority::Low,
        EventPriority::Normal,
        EventPriority::High,
        EventPriority::Critical,
        EventPriority::Urgent,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EventPriority::Low => "low",
            EventPriority::Normal => "normal",
            EventPriority::High => "high",
            EventPriority::Critical => "critical",
            EventPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventPriority {
    type Err = SchemaValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventPriority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| SchemaValidationError::invalid("priority", format!("unknown priority '{s}'")))
    }
}
