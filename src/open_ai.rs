pub mod completion;
pub mod history;
pub mod message;
pub mod model;

use crate::capability::completion::{CompletionCapability, CompletionRequest, ResponseFormat};
use crate::nice_display::NiceDisplay;
use crate::open_ai::completion::{Completion, CompletionError};
use crate::open_ai::message::{Content, ContentPart, Role};
use crate::open_ai::model::Model;
use crate::open_ai_key::OpenAiKey;
use async_trait::async_trait;

/// Production completion adapter over an OpenAI-compatible endpoint.
pub struct OpenAi {
    open_ai_key: OpenAiKey,
    reqwest_client: reqwest::Client,
}

impl OpenAi {
    pub fn new(open_ai_key: OpenAiKey, reqwest_client: reqwest::Client) -> Self {
        Self {
            open_ai_key,
            reqwest_client,
        }
    }
}

#[async_trait]
impl CompletionCapability for OpenAi {
    async fn complete(&self, request: CompletionRequest) -> Result<String, String> {
        let content = match request.image_url {
            None => Content::Text(request.prompt),
            Some(url) => Content::Parts(vec![
                ContentPart::Text {
                    text: request.prompt,
                },
                ContentPart::ImageUrl { url },
            ]),
        };

        let mut completion = Completion::new(Model::Gpt4oMini);
        completion.add_message(Role::User, content);
        completion.max_tokens(request.max_tokens);

        if let ResponseFormat::JsonObject = request.response_format {
            completion.json_response();
        }

        let response = completion
            .send_request(&self.open_ai_key, self.reqwest_client.clone())
            .await
            .map_err(|err| err.message())?;

        response.as_message().map_err(|err| {
            let err: CompletionError = err.into();
            err.message()
        })
    }
}
