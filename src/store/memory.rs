use crate::capability::store::{NewMemory, NewStory, StoreCapability};
use crate::domain::memory::Memory;
use crate::domain::memory_uuid::MemoryUuid;
use crate::domain::space_id::SpaceId;
use crate::domain::story::GeneratedStory;
use crate::domain::story_uuid::StoryUuid;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    memories: HashMap<MemoryUuid, Memory>,
    stories: HashMap<SpaceId, GeneratedStory>,
}

/// In-process adapter. One write lock covers each upsert, so the
/// one-story-per-space invariant holds under concurrent generation.
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

#[async_trait]
impl StoreCapability for MemStore {
    async fn create_memory(&self, new_memory: NewMemory) -> Result<Memory, String> {
        let memory = Memory {
            id: MemoryUuid::new(),
            space_id: new_memory.space_id,
            display_name: new_memory.display_name,
            note: new_memory.note,
            photo_url: new_memory.photo_url,
            created_at: chrono::Utc::now(),
        };

        let mut inner = self.inner.write().await;
        inner.memories.insert(memory.id, memory.clone());

        Ok(memory)
    }

    async fn memories_by_space(&self, space_id: &SpaceId) -> Result<Vec<Memory>, String> {
        let inner = self.inner.read().await;

        let mut memories: Vec<Memory> = inner
            .memories
            .values()
            .filter(|memory| memory.space_id == *space_id)
            .cloned()
            .collect();

        // Most recent first; uuid v7 breaks same-instant ties in creation order.
        memories.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.to_uuid().cmp(&a.id.to_uuid()))
        });

        Ok(memories)
    }

    async fn upsert_story(&self, new_story: NewStory) -> Result<GeneratedStory, String> {
        let mut inner = self.inner.write().await;

        let id = inner
            .stories
            .get(&new_story.space_id)
            .map(|existing| existing.id)
            .unwrap_or_else(StoryUuid::new);

        let story = GeneratedStory {
            id,
            space_id: new_story.space_id.clone(),
            content: new_story.content,
            created_at: chrono::Utc::now(),
        };

        inner.stories.insert(new_story.space_id, story.clone());

        Ok(story)
    }

    async fn story_by_space(&self, space_id: &SpaceId) -> Result<Option<GeneratedStory>, String> {
        let inner = self.inner.read().await;

        Ok(inner.stories.get(space_id).cloned())
    }
}
