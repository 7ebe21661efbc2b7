use crate::capability::store::{NewMemory, NewStory, StoreCapability};
use crate::domain::memory::Memory;
use crate::domain::memory_uuid::MemoryUuid;
use crate::domain::space_id::SpaceId;
use crate::domain::story::{GeneratedStory, StoryContent};
use crate::domain::story_uuid::StoryUuid;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row};

pub struct PgStore {
    sqlx: sqlx::Pool<Postgres>,
}

impl PgStore {
    pub fn new(sqlx: sqlx::Pool<Postgres>) -> Self {
        Self { sqlx }
    }
}

fn memory_from_row(row: &PgRow) -> Result<Memory, String> {
    let space_id_raw: String = row
        .try_get("space_id")
        .map_err(|err| format!("Error reading space_id column: {}", err))?;

    let space_id = SpaceId::from_string(space_id_raw)
        .map_err(|_| "Stored memory has an empty space_id".to_string())?;

    Ok(Memory {
        id: MemoryUuid::from_uuid(
            row.try_get("uuid")
                .map_err(|err| format!("Error reading uuid column: {}", err))?,
        ),
        space_id,
        display_name: row
            .try_get("display_name")
            .map_err(|err| format!("Error reading display_name column: {}", err))?,
        note: row
            .try_get("note")
            .map_err(|err| format!("Error reading note column: {}", err))?,
        photo_url: row
            .try_get("photo_url")
            .map_err(|err| format!("Error reading photo_url column: {}", err))?,
        created_at: row
            .try_get("created_at")
            .map_err(|err| format!("Error reading created_at column: {}", err))?,
    })
}

fn story_from_row(row: &PgRow) -> Result<GeneratedStory, String> {
    let space_id_raw: String = row
        .try_get("space_id")
        .map_err(|err| format!("Error reading space_id column: {}", err))?;

    let space_id = SpaceId::from_string(space_id_raw)
        .map_err(|_| "Stored story has an empty space_id".to_string())?;

    let content_raw: String = row
        .try_get("content")
        .map_err(|err| format!("Error reading content column: {}", err))?;

    let content: StoryContent = serde_json::from_str(&content_raw)
        .map_err(|err| format!("Error decoding stored story content: {}", err))?;

    Ok(GeneratedStory {
        id: StoryUuid::from_uuid(
            row.try_get("uuid")
                .map_err(|err| format!("Error reading uuid column: {}", err))?,
        ),
        space_id,
        content,
        created_at: row
            .try_get("created_at")
            .map_err(|err| format!("Error reading created_at column: {}", err))?,
    })
}

#[async_trait]
impl StoreCapability for PgStore {
    async fn create_memory(&self, new_memory: NewMemory) -> Result<Memory, String> {
        let row = sqlx::query(
            r#"
                INSERT INTO memories (uuid, space_id, display_name, note, photo_url)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING uuid, space_id, display_name, note, photo_url, created_at;
            "#,
        )
        .bind(MemoryUuid::new().to_uuid())
        .bind(new_memory.space_id.to_string())
        .bind(new_memory.display_name)
        .bind(new_memory.note)
        .bind(new_memory.photo_url)
        .fetch_one(&self.sqlx)
        .await
        .map_err(|err| format!("Error inserting new memory: {}", err))?;

        memory_from_row(&row)
    }

    async fn memories_by_space(&self, space_id: &SpaceId) -> Result<Vec<Memory>, String> {
        let rows = sqlx::query(
            r#"
                SELECT uuid, space_id, display_name, note, photo_url, created_at
                FROM memories
                WHERE space_id = $1
                ORDER BY created_at DESC, uuid DESC;
            "#,
        )
        .bind(space_id.to_string())
        .fetch_all(&self.sqlx)
        .await
        .map_err(|err| format!("Error listing memories: {}", err))?;

        rows.iter().map(memory_from_row).collect()
    }

    async fn upsert_story(&self, new_story: NewStory) -> Result<GeneratedStory, String> {
        let content = serde_json::to_string(&new_story.content)
            .map_err(|err| format!("Error encoding story content: {}", err))?;

        // The unique index on space_id makes regeneration a single atomic
        // statement, so concurrent calls can never leave two records.
        let row = sqlx::query(
            r#"
                INSERT INTO generated_stories (uuid, space_id, content)
                VALUES ($1, $2, $3)
                ON CONFLICT (space_id)
                DO UPDATE SET content = EXCLUDED.content, created_at = now()
                RETURNING uuid, space_id, content, created_at;
            "#,
        )
        .bind(StoryUuid::new().to_uuid())
        .bind(new_story.space_id.to_string())
        .bind(content)
        .fetch_one(&self.sqlx)
        .await
        .map_err(|err| format!("Error upserting generated story: {}", err))?;

        story_from_row(&row)
    }

    async fn story_by_space(&self, space_id: &SpaceId) -> Result<Option<GeneratedStory>, String> {
        let row = sqlx::query(
            r#"
                SELECT uuid, space_id, content, created_at
                FROM generated_stories
                WHERE space_id = $1;
            "#,
        )
        .bind(space_id.to_string())
        .fetch_optional(&self.sqlx)
        .await
        .map_err(|err| format!("Error loading generated story: {}", err))?;

        match row {
            Some(row) => story_from_row(&row).map(Some),
            None => Ok(None),
        }
    }
}
