use crate::domain::memory::Memory;
use crate::domain::space_id::SpaceId;
use crate::domain::story::{GeneratedStory, StoryContent};
use async_trait::async_trait;

pub struct NewMemory {
    pub space_id: SpaceId,
    pub display_name: String,
    pub note: String,
    pub photo_url: String,
}

pub struct NewStory {
    pub space_id: SpaceId,
    pub content: StoryContent,
}

/// Persistence seam. Backends are interchangeable adapters selected once at
/// startup; call sites never branch on which one is live.
#[async_trait]
pub trait StoreCapability: Send + Sync {
    async fn create_memory(&self, new_memory: NewMemory) -> Result<Memory, String>;

    /// All memories for a space, most recent first. An unknown space yields
    /// an empty list, not an error.
    async fn memories_by_space(&self, space_id: &SpaceId) -> Result<Vec<Memory>, String>;

    /// Insert-if-absent, else replace in place. Must hold the
    /// one-story-per-space invariant under concurrent calls.
    async fn upsert_story(&self, new_story: NewStory) -> Result<GeneratedStory, String>;

    async fn story_by_space(&self, space_id: &SpaceId) -> Result<Option<GeneratedStory>, String>;
}
