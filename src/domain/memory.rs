use crate::domain::memory_uuid::MemoryUuid;
use crate::domain::space_id::SpaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One contributed photo and note inside a space. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: MemoryUuid,
    pub space_id: SpaceId,
    pub display_name: String,
    pub note: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
}
