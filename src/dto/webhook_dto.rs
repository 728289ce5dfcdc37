use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::interview::{EventMetadata, InterviewState};

/// Event pushed by the ATS or calendar integration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AtsEventPayload {
    pub event: String,
    pub interview_id: Uuid,
    pub state: InterviewState,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<EventMetadata>,
}
