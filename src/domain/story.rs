use crate::domain::space_id::SpaceId;
use crate::domain::story_uuid::StoryUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single synthesized memory book for a space. At most one exists per
/// space id; regeneration replaces the content in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedStory {
    pub id: StoryUuid,
    pub space_id: SpaceId,
    #[serde(flatten)]
    pub content: StoryContent,
    pub created_at: DateTime<Utc>,
}

/// The two output shapes of the generator. The renderer dispatches on the
/// `mode` tag; the shapes never share a loosely-typed text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum StoryContent {
    Narrative {
        title: String,
        body: String,
    },
    Scrapbook {
        title: String,
        captions: Vec<PhotoCaption>,
    },
}

impl StoryContent {
    pub fn title(&self) -> &str {
        match self {
            StoryContent::Narrative { title, .. } => title,
            StoryContent::Scrapbook { title, .. } => title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoCaption {
    pub photo_url: String,
    pub caption: String,
    pub mood: String,
}
