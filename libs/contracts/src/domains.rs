//! Domain contracts layered on top of [`ServiceContract`](crate::ServiceContract).
//!
//! A service implements any subset of these. Arguments and results are
//! open records whose shapes are owned by each domain service. Records a
//! service owns are addressed by typed IDs; use
//! [`parse_id`](crate::parse_id) to read one out of an incoming record.

use async_trait::async_trait;
use unison_events::Payload;
use unison_id::{DisplaySessionId, ExperienceId, IntentId};

use crate::{ContractError, MergeStrategy};

/// Open record exchanged through domain contracts.
pub type Record = Payload;

/// Experience type used when the caller has no preference.
pub const DEFAULT_EXPERIENCE_TYPE: &str = "ui";

/// Capture format used when the caller has no preference.
pub const DEFAULT_CAPTURE_FORMAT: &str = "screenshot";

/// Services that accept and decompose user intents.
#[async_trait]
pub trait IntentProcessingContract: Send + Sync {
    /// Processes a natural language expression.
    ///
    /// Empty `person_id` or `expression` is a validation failure; see
    /// [`require_non_empty`](crate::require_non_empty).
    async fn process_intent(
        &self,
        person_id: &str,
        expression: &str,
        context: Option<Record>,
    ) -> Result<Record, ContractError>;

    /// Breaks an existing intent into goal records. Unknown intents are
    /// [`ContractError::NotFound`].
    async fn decompose_intent(&self, intent_id: &IntentId) -> Result<Vec<Record>, ContractError>;

    async fn get_intent_status(&self, intent_id: &IntentId) -> Result<Record, ContractError>;
}

/// Services that store and merge person or system context.
#[async_trait]
pub trait ContextManagementContract: Send + Sync {
    /// Applies `context_data` with the given strategy and returns the
    /// resulting context.
    async fn update_context(
        &self,
        person_id: &str,
        context_type: &str,
        context_data: Record,
        merge_strategy: MergeStrategy,
    ) -> Result<Record, ContractError>;

    /// All context for a person, or one context type when given.
    async fn get_context(
        &self,
        person_id: &str,
        context_type: Option<&str>,
    ) -> Result<Record, ContractError>;

    async fn query_context(
        &self,
        query: Record,
        filters: Option<Record>,
    ) -> Result<Vec<Record>, ContractError>;
}

/// Services that render experiences from intent and context.
#[async_trait]
pub trait ExperienceGenerationContract: Send + Sync {
    async fn generate_experience(
        &self,
        person_id: &str,
        intent_data: Record,
        context_data: Record,
        experience_type: &str,
    ) -> Result<Record, ContractError>;

    async fn adapt_experience(
        &self,
        experience_id: &ExperienceId,
        adaptation_triggers: Record,
    ) -> Result<Record, ContractError>;

    async fn get_experience_status(&self, experience_id: &ExperienceId) -> Result<Record, ContractError>;
}

/// Services that drive virtual displays on an agent's behalf.
#[async_trait]
pub trait AgentVdiContract: Send + Sync {
    async fn create_virtual_display(
        &self,
        session_id: &DisplaySessionId,
        display_config: Record,
    ) -> Result<Record, ContractError>;

    async fn interact_with_display(
        &self,
        session_id: &DisplaySessionId,
        interaction_data: Record,
    ) -> Result<Record, ContractError>;

    /// Captures the display, e.g. as `screenshot` or `dom`.
    async fn capture_display_state(
        &self,
        session_id: &DisplaySessionId,
        capture_format: &str,
    ) -> Result<Record, ContractError>;
}

/// Services that run model inference.
#[async_trait]
pub trait InferenceContract: Send + Sync {
    /// Unknown models are [`ContractError::NotFound`].
    async fn run_inference(
        &self,
        model_name: &str,
        input_data: Record,
        inference_config: Option<Record>,
    ) -> Result<Record, ContractError>;

    async fn list_available_models(&self) -> Result<Vec<Record>, ContractError>;

    async fn get_model_info(&self, model_name: &str) -> Result<Record, ContractError>;
}
