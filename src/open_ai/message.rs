pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn to_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

pub enum ContentPart {
    Text { text: String },
    ImageUrl { url: String },
}

impl Content {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Content::Text(text) => serde_json::Value::String(text.clone()),
            Content::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => serde_json::json!({
                        "type": "text",
                        "text": text,
                    }),
                    ContentPart::ImageUrl { url } => serde_json::json!({
                        "type": "image_url",
                        "image_url": { "url": url },
                    }),
                })
                .collect::<serde_json::Value>(),
        }
    }
}

pub struct Message {
    role: Role,
    content: Content,
}

impl Message {
    pub fn new(role: Role, content: Content) -> Self {
        Self { role, content }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn content(&self) -> &Content {
        &self.content
    }
}
