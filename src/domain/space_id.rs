use crate::nice_display::NiceDisplay;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(String);

#[derive(Debug, Clone)]
pub struct EmptySpaceId;

impl NiceDisplay for EmptySpaceId {
    fn message(&self) -> String {
        "space id must not be empty".to_string()
    }
}

impl SpaceId {
    pub fn from_string(raw: String) -> Result<Self, EmptySpaceId> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(EmptySpaceId);
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_string(&self) -> String {
        self.0.clone()
    }
}
