use async_trait::async_trait;

pub enum ResponseFormat {
    Text,
    JsonObject,
}

pub struct CompletionRequest {
    pub prompt: String,
    pub image_url: Option<String>,
    pub response_format: ResponseFormat,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn text_only(prompt: String, response_format: ResponseFormat, max_tokens: u32) -> Self {
        Self {
            prompt,
            image_url: None,
            response_format,
            max_tokens,
        }
    }

    pub fn with_image(
        prompt: String,
        image_url: String,
        response_format: ResponseFormat,
        max_tokens: u32,
    ) -> Self {
        Self {
            prompt,
            image_url: Some(image_url),
            response_format,
            max_tokens,
        }
    }
}

/// Text/vision generation seam. The provider behind it is a black box: same
/// prompt, non-deterministic text, and any call may fail in transit or come
/// back malformed. Callers own recovery.
#[async_trait]
pub trait CompletionCapability: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, String>;
}
