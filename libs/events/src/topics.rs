//! Event type to topic lookup.
//!
//! The table is process-wide immutable configuration. Only event types
//! listed here resolve from the `"auto"` sentinel; producers of any other
//! type must supply a concrete topic.

use crate::EventType;

/// Topic sentinel asking the envelope to derive the topic from its type.
pub const AUTO_TOPIC: &str = "auto";

/// Returns the standard topic for an event type, if it has one.
pub const fn topic_for(event_type: EventType) -> Option<&'static str> {
    let topic = match event_type {
        EventType::IntentReceived => "unison.intent.received",
        EventType::IntentProcessed => "unison.intent.processed",
        EventType::IntentDecomposed => "unison.intent.decomposed",
        EventType::IntentFailed => "unison.intent.failed",

        EventType::ContextUpdated => "unison.context.updated",
        EventType::ContextQuery => "unison.context.query",
        EventType::ContextResponse => "unison.context.response",

        EventType::GoalCreated => "unison.goal.created",
        EventType::GoalUpdated => "unison.goal.updated",
        EventType::GoalCompleted => "unison.goal.completed",
        EventType::GoalFailed => "unison.goal.failed",

        EventType::ExperienceGenerated => "unison.experience.generated",
        EventType::ExperienceAdapted => "unison.experience.adapted",
        EventType::ExperienceInteraction => "unison.experience.interaction",

        EventType::ServiceHealth => "unison.service.health",
        EventType::ServiceMetrics => "unison.service.metrics",
        EventType::SystemAlert => "unison.system.alert",

        _ => return None,
    };
    Some(topic)
}

/// Resolves a requested topic against the lookup table.
///
/// Only the exact string `"auto"` triggers lookup. When the event type has
/// no entry the sentinel is returned unchanged.
pub fn resolve_topic(event_type: EventType, requested: &str) -> String {
    if requested != AUTO_TOPIC {
        return requested.to_string();
    }
    match topic_for(event_type) {
        Some(topic) => topic.to_string(),
        None => {
            tracing::debug!(
                event_type = %event_type,
                "no standard topic for event type, keeping \"auto\""
            );
            requested.to_string()
        }
    }
}
