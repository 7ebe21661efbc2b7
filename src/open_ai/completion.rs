use crate::nice_display::NiceDisplay;
use crate::open_ai::history::History;
use crate::open_ai::message::{Content, Role};
use crate::open_ai::model::Model;
use crate::open_ai_key::OpenAiKey;

pub struct Completion {
    model: String,
    history: History,
    json_response: bool,
    max_tokens: Option<u32>,
}

pub struct Response {
    json: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum MessageError {
    MissingField(String),
    NoChoices,
    NotString { what: String },
}

impl Into<CompletionError> for MessageError {
    fn into(self) -> CompletionError {
        CompletionError::MessageError(self)
    }
}

impl NiceDisplay for MessageError {
    fn message(&self) -> String {
        match self {
            MessageError::MissingField(field) => format!("Missing field: {}", field),
            MessageError::NoChoices => "No choices in response".to_string(),
            MessageError::NotString { what } => format!("Field is not a string: {}", what),
        }
    }
}

impl Response {
    fn new(json: serde_json::Value) -> Self {
        Self { json }
    }

    pub fn as_message(&self) -> Result<String, MessageError> {
        self.json
            .get("choices")
            .ok_or_else(|| MessageError::MissingField("choices".to_string()))?
            .get(0)
            .ok_or_else(|| MessageError::NoChoices)?
            .get("message")
            .ok_or_else(|| MessageError::MissingField("message".to_string()))?
            .get("content")
            .ok_or_else(|| MessageError::MissingField("content".to_string()))?
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| MessageError::NotString {
                what: "content".to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub enum CompletionError {
    RequestError(String),
    ResponseError(String),
    ResponseJsonDecodeError(String),
    MessageError(MessageError),
}

impl NiceDisplay for CompletionError {
    fn message(&self) -> String {
        match self {
            CompletionError::RequestError(err) => {
                format!("I had trouble making a request to open ai: {}", err)
            }
            CompletionError::ResponseError(err) => {
                format!("I had trouble with the response from open ai: {}", err)
            }
            CompletionError::ResponseJsonDecodeError(err) => {
                format!("I had trouble decoding the response from open ai: {}", err)
            }
            CompletionError::MessageError(err) => {
                format!(
                    "I had trouble extracting the message from the response:\n{:?}",
                    err.message()
                )
            }
        }
    }
}

impl Completion {
    pub fn new(model: Model) -> Self {
        let model_str = model.to_string();

        Self {
            model: model_str,
            history: History::new(),
            json_response: false,
            max_tokens: None,
        }
    }

    pub fn add_message(&mut self, role: Role, content: Content) -> &mut Self {
        self.history.add_message(role, content);
        self
    }

    /// Ask the provider to return a strict JSON object.
    pub fn json_response(&mut self) -> &mut Self {
        self.json_response = true;
        self
    }

    pub fn max_tokens(&mut self, max_tokens: u32) -> &mut Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub async fn send_request(
        &self,
        open_ai_key: &OpenAiKey,
        client: reqwest::Client,
    ) -> Result<Response, CompletionError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": self.history.get_messages().iter().map(|msg| {
                serde_json::json!({
                    "role": msg.role().to_str(),
                    "content": msg.content().to_json(),
                })
            }).collect::<Vec<_>>()
        });

        if self.json_response {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        let res = client
            .post(format!("{}/chat/completions", open_ai_key.base_url()))
            .header("Content-Type", "application/json")
            .header("Authorization", open_ai_key.to_header())
            .json(&body)
            .send()
            .await
            .map_err(|err| CompletionError::RequestError(err.to_string()))?
            .text()
            .await
            .map_err(|err| CompletionError::ResponseError(err.to_string()))?;

        let res_json: serde_json::Value = serde_json::from_str(&res)
            .map_err(|err| CompletionError::ResponseJsonDecodeError(err.to_string()))?;

        Ok(Response::new(res_json))
    }
}
