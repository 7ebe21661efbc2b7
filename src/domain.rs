pub mod layout;
pub mod markdown;
pub mod memory;
pub mod memory_uuid;
pub mod space_id;
pub mod story;
pub mod story_uuid;
