use std::env::VarError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiKey {
    key: String,
    base_url: String,
}

impl OpenAiKey {
    pub fn from_env() -> Result<Self, VarError> {
        let key = std::env::var("OPEN_AI_API_KEY")?;

        // An OpenAI-compatible endpoint can stand in for the real thing.
        let base_url = std::env::var("OPEN_AI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(OpenAiKey { key, base_url })
    }

    pub fn to_header(&self) -> String {
        format!("Bearer {}", self.key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn base_url_defaults_and_can_be_overridden() {
        std::env::set_var("OPEN_AI_API_KEY", "test-key");
        std::env::remove_var("OPEN_AI_BASE_URL");

        let key = OpenAiKey::from_env().unwrap();
        assert_eq!(key.base_url(), "https://api.openai.com/v1");
        assert_eq!(key.to_header(), "Bearer test-key");

        std::env::set_var("OPEN_AI_BASE_URL", "https://proxy.example.com/v1/");
        let key = OpenAiKey::from_env().unwrap();
        assert_eq!(key.base_url(), "https://proxy.example.com/v1");

        std::env::remove_var("OPEN_AI_BASE_URL");
        std::env::remove_var("OPEN_AI_API_KEY");
    }

    #[test]
    #[serial]
    fn missing_key_is_an_error() {
        std::env::remove_var("OPEN_AI_API_KEY");
        assert!(OpenAiKey::from_env().is_err());
    }
}
