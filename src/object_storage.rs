use crate::nice_display::NiceDisplay;
use uuid::Uuid;

pub struct Config {
    pub base_url: String,
    pub anon_key: String,
    pub bucket: String,
}

pub enum ConfigError {
    ReadingUrl(dotenv::Error),
    ReadingAnonKey(dotenv::Error),
}

impl NiceDisplay for ConfigError {
    fn message(&self) -> String {
        match self {
            ConfigError::ReadingUrl(err) => format!("Error reading SUPABASE_URL: {}", err),
            ConfigError::ReadingAnonKey(err) => {
                format!("Error reading SUPABASE_ANON_KEY: {}", err)
            }
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        let base_url = dotenv::var("SUPABASE_URL")
            .map_err(ConfigError::ReadingUrl)?
            .trim_end_matches('/')
            .to_string();
        let anon_key = dotenv::var("SUPABASE_ANON_KEY").map_err(ConfigError::ReadingAnonKey)?;
        let bucket = dotenv::var("SUPABASE_BUCKET").unwrap_or_else(|_| "photos".to_string());

        Ok(Config {
            base_url,
            anon_key,
            bucket,
        })
    }
}

pub struct UploadTarget {
    pub upload_url: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub enum UploadError {
    Request(String),
    ResponseJsonDecode(String),
    MissingUrl,
}

impl NiceDisplay for UploadError {
    fn message(&self) -> String {
        match self {
            UploadError::Request(err) => {
                format!("I had trouble asking the storage service for an upload url: {}", err)
            }
            UploadError::ResponseJsonDecode(err) => {
                format!("I had trouble decoding the storage service response: {}", err)
            }
            UploadError::MissingUrl => {
                "The storage service response had no url field".to_string()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum NormalizeError {
    Empty,
    Malformed { raw: String },
}

impl NiceDisplay for NormalizeError {
    fn message(&self) -> String {
        match self {
            NormalizeError::Empty => "photo url must not be empty".to_string(),
            NormalizeError::Malformed { raw } => format!("photo url is malformed: {}", raw),
        }
    }
}

/// Proxy to the external object-storage service. The service itself issues
/// upload urls and serves files; this crate only asks for upload targets and
/// keeps photo urls in one canonical public form.
pub struct ObjectStorage {
    config: Config,
    reqwest_client: reqwest::Client,
}

impl ObjectStorage {
    pub fn new(config: Config, reqwest_client: reqwest::Client) -> Self {
        Self {
            config,
            reqwest_client,
        }
    }

    fn object_path(&self, file_name: &str) -> String {
        let sanitized: String = file_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();

        format!("{}/{}", Uuid::now_v7(), sanitized)
    }

    fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.base_url, self.config.bucket, object_path
        )
    }

    pub async fn create_upload_target(
        &self,
        file_name: &str,
        file_type: &str,
    ) -> Result<UploadTarget, UploadError> {
        let object_path = self.object_path(file_name);

        let res = self
            .reqwest_client
            .post(format!(
                "{}/storage/v1/object/upload/sign/{}/{}",
                self.config.base_url, self.config.bucket, object_path
            ))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.anon_key))
            .json(&serde_json::json!({ "contentType": file_type }))
            .send()
            .await
            .map_err(|err| UploadError::Request(err.to_string()))?
            .text()
            .await
            .map_err(|err| UploadError::Request(err.to_string()))?;

        let res_json: serde_json::Value = serde_json::from_str(&res)
            .map_err(|err| UploadError::ResponseJsonDecode(err.to_string()))?;

        let signed_path = res_json["url"].as_str().ok_or(UploadError::MissingUrl)?;

        Ok(UploadTarget {
            upload_url: format!("{}/storage/v1{}", self.config.base_url, signed_path),
            public_url: self.public_url(&object_path),
        })
    }

    /// Fold the many shapes a photo reference arrives in (signed upload url,
    /// public url with a query string, bare object path, foreign url) into
    /// one canonical retrieval url.
    pub fn normalize_url(&self, raw: &str) -> Result<String, NormalizeError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(NormalizeError::Empty);
        }

        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(NormalizeError::Malformed {
                raw: trimmed.to_string(),
            });
        }

        let without_query = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or(trimmed)
            .to_string();

        let own_object_prefix = format!("{}/storage/v1/object/", self.config.base_url);

        if without_query.starts_with(&own_object_prefix) {
            return Ok(without_query
                .replacen("/object/upload/sign/", "/object/public/", 1)
                .replacen("/object/sign/", "/object/public/", 1));
        }

        if without_query.starts_with("http://") || without_query.starts_with("https://") {
            return Ok(without_query);
        }

        Ok(self.public_url(without_query.trim_start_matches('/')))
    }
}
