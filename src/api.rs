use crate::capability::completion::{CompletionRequest, ResponseFormat};
use crate::capability::store::{NewMemory, NewStory};
use crate::domain::layout::{assign_grid_pattern, assign_layout, GridPattern, Layout};
use crate::domain::markdown;
use crate::domain::memory::Memory;
use crate::domain::space_id::SpaceId;
use crate::domain::story::{GeneratedStory, StoryContent};
use crate::nice_display::NiceDisplay;
use crate::story_generator::{self, MemoryForStory, StoryMode};
use crate::worker::Worker;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

const CAPTION_MAX_TOKENS: u32 = 100;

const CAPTION_PROMPT: &str = "Write a gentle scrapbook-style caption for this photo: at most 20 words, grounded in the scene, ending with one fitting emoji.";

const CAPTION_FALLBACK: &str = "A quiet moment, kept for later ✨";

#[derive(Debug)]
pub enum ApiError {
    Validation {
        field: &'static str,
        message: String,
    },
    NoMemories {
        space_id: String,
    },
    Storage,
    ObjectStorage,
}

impl NiceDisplay for ApiError {
    fn message(&self) -> String {
        match self {
            ApiError::Validation { field, message } => format!("{}: {}", field, message),
            ApiError::NoMemories { space_id } => {
                format!("No memories in space '{}' to generate a story from", space_id)
            }
            ApiError::Storage => "The memory store is unavailable right now".to_string(),
            ApiError::ObjectStorage => {
                "The photo storage service is unavailable right now".to_string()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NoMemories { .. } => StatusCode::BAD_REQUEST,
            ApiError::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ObjectStorage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "message": self.message() }))
    }
}

fn storage_error(err: String) -> ApiError {
    error!(error = %err, "storage failure");
    ApiError::Storage
}

fn required_text(field: &'static str, raw: String) -> Result<String, ApiError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ApiError::Validation {
            field,
            message: "must not be empty".to_string(),
        });
    }

    Ok(trimmed.to_string())
}

fn parse_space_id(raw: String) -> Result<SpaceId, ApiError> {
    SpaceId::from_string(raw).map_err(|err| ApiError::Validation {
        field: "spaceId",
        message: err.message(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemoryRequest {
    space_id: String,
    display_name: String,
    note: String,
    photo_url: String,
}

#[post("/api/memories")]
async fn add_memory(
    worker: web::Data<Worker>,
    body: web::Json<AddMemoryRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let space_id = parse_space_id(body.space_id)?;
    let display_name = required_text("displayName", body.display_name)?;
    let note = required_text("note", body.note)?;

    let photo_url = worker
        .object_storage
        .normalize_url(&body.photo_url)
        .map_err(|err| ApiError::Validation {
            field: "photoUrl",
            message: err.message(),
        })?;

    let memory = worker
        .store
        .create_memory(NewMemory {
            space_id,
            display_name,
            note,
            photo_url,
        })
        .await
        .map_err(storage_error)?;

    info!(
        memory_id = %memory.id.to_string(),
        space_id = %memory.space_id.as_str(),
        "memory added"
    );

    Ok(HttpResponse::Created().json(memory))
}

#[get("/api/memories/{space_id}")]
async fn list_memories(
    worker: web::Data<Worker>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let space_id = parse_space_id(path.into_inner())?;

    let memories = worker
        .store
        .memories_by_space(&space_id)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(memories))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateStoryRequest {
    space_id: String,
    mode: Option<StoryMode>,
}

#[post("/api/generate-story")]
async fn generate_story(
    worker: web::Data<Worker>,
    body: web::Json<GenerateStoryRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let space_id = parse_space_id(body.space_id)?;
    let mode = body.mode.unwrap_or(StoryMode::Narrative);

    let memories = worker
        .store
        .memories_by_space(&space_id)
        .await
        .map_err(storage_error)?;

    if memories.is_empty() {
        return Err(ApiError::NoMemories {
            space_id: space_id.to_string(),
        });
    }

    let for_story: Vec<MemoryForStory> = memories.iter().map(MemoryForStory::from).collect();

    let content = story_generator::generate(worker.completion.as_ref(), mode, &for_story).await;

    let story = worker
        .store
        .upsert_story(NewStory { space_id, content })
        .await
        .map_err(storage_error)?;

    info!(
        story_id = %story.id.to_string(),
        space_id = %story.space_id.as_str(),
        title = %story.content.title(),
        memory_count = for_story.len(),
        "story generated"
    );

    Ok(HttpResponse::Ok().json(story))
}

#[get("/api/generated-story/{space_id}")]
async fn get_story(
    worker: web::Data<Worker>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let space_id = parse_space_id(path.into_inner())?;

    let story = worker
        .store
        .story_by_space(&space_id)
        .await
        .map_err(storage_error)?;

    // Absence is "not generated yet", serialized as null.
    Ok(HttpResponse::Ok().json(story))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryBookItem {
    memory: Memory,
    layout: Layout,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryBookResponse {
    story: Option<GeneratedStory>,
    body_html: Option<String>,
    grid_pattern: GridPattern,
    items: Vec<MemoryBookItem>,
}

/// Everything the poster view needs in one shot: the stored story (narrative
/// body pre-rendered to html), plus the deterministic per-item styling.
/// Recomputed identically on every call, so a re-render or the
/// export-to-image step can never drift from what was on screen.
#[get("/api/memory-book/{space_id}")]
async fn memory_book(
    worker: web::Data<Worker>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let space_id = parse_space_id(path.into_inner())?;

    let memories = worker
        .store
        .memories_by_space(&space_id)
        .await
        .map_err(storage_error)?;

    let story = worker
        .store
        .story_by_space(&space_id)
        .await
        .map_err(storage_error)?;

    let body_html = story.as_ref().and_then(|story| match &story.content {
        StoryContent::Narrative { body, .. } => Some(markdown::render(body)),
        StoryContent::Scrapbook { .. } => None,
    });

    let items = memories
        .into_iter()
        .enumerate()
        .map(|(index, memory)| MemoryBookItem {
            layout: assign_layout(index),
            memory,
        })
        .collect();

    Ok(HttpResponse::Ok().json(MemoryBookResponse {
        story,
        body_html,
        grid_pattern: assign_grid_pattern(&space_id),
        items,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    file_name: String,
    file_type: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    #[serde(rename = "uploadURL")]
    upload_url: String,
    #[serde(rename = "publicURL")]
    public_url: String,
}

async fn upload_object_inner(
    worker: web::Data<Worker>,
    body: web::Json<UploadRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let file_name = required_text("fileName", body.file_name)?;
    let file_type = required_text("fileType", body.file_type)?;

    let target = worker
        .object_storage
        .create_upload_target(&file_name, &file_type)
        .await
        .map_err(|err| {
            error!(error = %err.message(), "upload target request failed");
            ApiError::ObjectStorage
        })?;

    Ok(HttpResponse::Ok().json(UploadResponse {
        upload_url: target.upload_url,
        public_url: target.public_url,
    }))
}

#[post("/api/objects/upload")]
async fn upload_object(
    worker: web::Data<Worker>,
    body: web::Json<UploadRequest>,
) -> Result<HttpResponse, ApiError> {
    upload_object_inner(worker, body).await
}

// Older clients still post to the storage-flavored path.
#[post("/api/storage/upload")]
async fn upload_object_alias(
    worker: web::Data<Worker>,
    body: web::Json<UploadRequest>,
) -> Result<HttpResponse, ApiError> {
    upload_object_inner(worker, body).await
}

#[derive(Deserialize)]
pub struct CaptionRequest {
    image: String,
}

#[derive(Serialize)]
pub struct CaptionResponse {
    caption: String,
}

#[post("/api/caption")]
async fn caption_photo(
    worker: web::Data<Worker>,
    body: web::Json<CaptionRequest>,
) -> Result<HttpResponse, ApiError> {
    let image = required_text("image", body.into_inner().image)?;

    // Bare base64 payloads get a data uri header; urls pass through.
    let image_url = if image.starts_with("http://")
        || image.starts_with("https://")
        || image.starts_with("data:image/")
    {
        image
    } else {
        format!("data:image/jpeg;base64,{}", image)
    };

    let request = CompletionRequest::with_image(
        CAPTION_PROMPT.to_string(),
        image_url,
        ResponseFormat::Text,
        CAPTION_MAX_TOKENS,
    );

    let caption = match worker.completion.complete(request).await {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        Ok(_) => {
            warn!("caption response was empty, using fallback");
            CAPTION_FALLBACK.to_string()
        }
        Err(err) => {
            warn!(error = %err, "caption generation failed, using fallback");
            CAPTION_FALLBACK.to_string()
        }
    };

    Ok(HttpResponse::Ok().json(CaptionResponse { caption }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(add_memory)
        .service(list_memories)
        .service(generate_story)
        .service(get_story)
        .service(memory_book)
        .service(upload_object)
        .service(upload_object_alias)
        .service(caption_photo);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::completion::CompletionCapability;
    use crate::object_storage::{Config, ObjectStorage};
    use crate::store::memory::MemStore;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct CannedCompletion {
        result: Result<String, String>,
    }

    #[async_trait]
    impl CompletionCapability for CannedCompletion {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, String> {
            self.result.clone()
        }
    }

    fn test_worker(completion: CannedCompletion) -> Worker {
        Worker {
            completion: Arc::new(completion),
            store: Arc::new(MemStore::new()),
            object_storage: Arc::new(ObjectStorage::new(
                Config {
                    base_url: "https://abc.supabase.co".to_string(),
                    anon_key: "anon".to_string(),
                    bucket: "photos".to_string(),
                },
                reqwest::Client::new(),
            )),
        }
    }

    fn failing_completion() -> CannedCompletion {
        CannedCompletion {
            result: Err("connection reset by peer".to_string()),
        }
    }

    macro_rules! test_app {
        ($worker:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($worker))
                    .configure(configure),
            )
            .await
        };
    }

    fn add_memory_body(space_id: &str, note: &str) -> serde_json::Value {
        serde_json::json!({
            "spaceId": space_id,
            "displayName": "Ada",
            "note": note,
            "photoUrl": format!("https://example.com/{}.jpg", note),
        })
    }

    #[actix_web::test]
    async fn added_memories_come_back_in_the_listing() {
        let app = test_app!(test_worker(failing_completion()));

        let req = test::TestRequest::post()
            .uri("/api/memories")
            .set_json(add_memory_body("trip", "first-snow"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/api/memories/trip").to_request();
        let listed: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["spaceId"], "trip");
        assert_eq!(listed[0]["displayName"], "Ada");
        assert_eq!(listed[0]["photoUrl"], "https://example.com/first-snow.jpg");
    }

    #[actix_web::test]
    async fn blank_note_is_rejected_without_a_write() {
        let app = test_app!(test_worker(failing_completion()));

        let req = test::TestRequest::post()
            .uri("/api/memories")
            .set_json(add_memory_body("trip", "  "))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/memories/trip").to_request();
        let listed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn generating_without_memories_is_a_client_error() {
        let app = test_app!(test_worker(failing_completion()));

        let req = test::TestRequest::post()
            .uri("/api/generate-story")
            .set_json(serde_json::json!({ "spaceId": "empty-space" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        // Nothing was written either.
        let req = test::TestRequest::get()
            .uri("/api/generated-story/empty-space")
            .to_request();
        let stored: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(stored.is_null());
    }

    #[actix_web::test]
    async fn generating_twice_keeps_one_story_per_space() {
        let app = test_app!(test_worker(failing_completion()));

        let req = test::TestRequest::post()
            .uri("/api/memories")
            .set_json(add_memory_body("trip", "first-snow"))
            .to_request();
        test::call_service(&app, req).await;

        let generate = || {
            test::TestRequest::post()
                .uri("/api/generate-story")
                .set_json(serde_json::json!({ "spaceId": "trip" }))
                .to_request()
        };

        let first: serde_json::Value = test::call_and_read_body_json(&app, generate()).await;
        let second: serde_json::Value = test::call_and_read_body_json(&app, generate()).await;

        // Replaced in place, not duplicated.
        assert_eq!(first["id"], second["id"]);

        let req = test::TestRequest::get()
            .uri("/api/generated-story/trip")
            .to_request();
        let stored: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stored["id"], second["id"]);
        assert_eq!(stored["mode"], "narrative");
    }

    #[actix_web::test]
    async fn scrapbook_mode_covers_every_photo_even_when_generation_fails() {
        let app = test_app!(test_worker(failing_completion()));

        for note in ["one", "two", "three"] {
            let req = test::TestRequest::post()
                .uri("/api/memories")
                .set_json(add_memory_body("trip", note))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::post()
            .uri("/api/generate-story")
            .set_json(serde_json::json!({ "spaceId": "trip", "mode": "scrapbook" }))
            .to_request();
        let story: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(story["mode"], "scrapbook");
        assert_eq!(story["captions"].as_array().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn narrative_mode_uses_the_model_output_when_it_is_well_formed() {
        let completion = CannedCompletion {
            result: Ok(
                r##"{"title": "Weekend at the Lake", "content": "# Weekend at the Lake\n\n## Morning\nWe arrived early."}"##
                    .to_string(),
            ),
        };
        let app = test_app!(test_worker(completion));

        let req = test::TestRequest::post()
            .uri("/api/memories")
            .set_json(add_memory_body("lake", "early-start"))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/generate-story")
            .set_json(serde_json::json!({ "spaceId": "lake" }))
            .to_request();
        let story: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(story["title"], "Weekend at the Lake");
        assert!(story["body"].as_str().unwrap().contains("## Morning"));
    }

    #[actix_web::test]
    async fn memory_book_renders_the_narrative_and_assigns_layouts() {
        let completion = CannedCompletion {
            result: Ok(
                r##"{"title": "Weekend", "content": "# Weekend\n\n## Morning\nWe arrived early.\nThe air was crisp."}"##
                    .to_string(),
            ),
        };
        let app = test_app!(test_worker(completion));

        for note in ["one", "two", "three", "four", "five"] {
            let req = test::TestRequest::post()
                .uri("/api/memories")
                .set_json(add_memory_body("trip", note))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::post()
            .uri("/api/generate-story")
            .set_json(serde_json::json!({ "spaceId": "trip" }))
            .to_request();
        test::call_service(&app, req).await;

        let fetch = || {
            test::TestRequest::get()
                .uri("/api/memory-book/trip")
                .to_request()
        };

        let book: serde_json::Value = test::call_and_read_body_json(&app, fetch()).await;

        assert!(book["bodyHtml"]
            .as_str()
            .unwrap()
            .contains("<h2>Morning</h2><p>We arrived early. The air was crisp.</p>"));

        let items = book["items"].as_array().unwrap();
        assert_eq!(items.len(), 5);
        // Index cycling: frame styles repeat with period 4.
        assert_eq!(items[0]["layout"]["frameStyle"], items[4]["layout"]["frameStyle"]);
        assert_ne!(items[0]["layout"]["frameStyle"], items[1]["layout"]["frameStyle"]);

        // Re-fetching yields the identical poster.
        let again: serde_json::Value = test::call_and_read_body_json(&app, fetch()).await;
        assert_eq!(book["gridPattern"], again["gridPattern"]);
        assert_eq!(book["items"], again["items"]);
    }

    #[actix_web::test]
    async fn memory_book_without_a_story_still_lays_out_the_gallery() {
        let app = test_app!(test_worker(failing_completion()));

        let req = test::TestRequest::post()
            .uri("/api/memories")
            .set_json(add_memory_body("trip", "only-one"))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/api/memory-book/trip")
            .to_request();
        let book: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert!(book["story"].is_null());
        assert!(book["bodyHtml"].is_null());
        assert_eq!(book["items"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn caption_degrades_to_the_fallback() {
        let app = test_app!(test_worker(failing_completion()));

        let req = test::TestRequest::post()
            .uri("/api/caption")
            .set_json(serde_json::json!({ "image": "aGVsbG8=" }))
            .to_request();
        let res: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(res["caption"], CAPTION_FALLBACK);
    }

    #[actix_web::test]
    async fn caption_returns_the_model_text() {
        let completion = CannedCompletion {
            result: Ok("The mountains looked endless from here 🏔".to_string()),
        };
        let app = test_app!(test_worker(completion));

        let req = test::TestRequest::post()
            .uri("/api/caption")
            .set_json(serde_json::json!({ "image": "https://example.com/p/1.jpg" }))
            .to_request();
        let res: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(res["caption"], "The mountains looked endless from here 🏔");
    }
}
