use crate::capability::completion::{CompletionCapability, CompletionRequest, ResponseFormat};
use crate::domain::memory::Memory;
use crate::domain::story::{PhotoCaption, StoryContent};
use crate::nice_display::NiceDisplay;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryMode {
    Narrative,
    Scrapbook,
}

/// The slice of a memory the generator cares about.
pub struct MemoryForStory {
    pub display_name: String,
    pub note: String,
    pub photo_url: String,
}

impl From<&Memory> for MemoryForStory {
    fn from(memory: &Memory) -> Self {
        MemoryForStory {
            display_name: memory.display_name.clone(),
            note: memory.note.clone(),
            photo_url: memory.photo_url.clone(),
        }
    }
}

const NARRATIVE_MAX_TOKENS: u32 = 2000;
const SCRAPBOOK_MAX_TOKENS: u32 = 1500;

const DEFAULT_NARRATIVE_TITLE: &str = "Our Travel Journal";
const DEFAULT_NARRATIVE_BODY: &str = "A collection of moments from our journey.";
const DEFAULT_SCRAPBOOK_TITLE: &str = "Our Memory Book";

/// Synthesize a story from a non-empty list of memories. The external call
/// can fail or come back malformed in every way a network service can; none
/// of that escapes this function. Worst case the caller gets the
/// deterministic fallback, which has the same shape as the real thing.
pub async fn generate(
    completion: &dyn CompletionCapability,
    mode: StoryMode,
    memories: &[MemoryForStory],
) -> StoryContent {
    let (prompt, max_tokens) = match mode {
        StoryMode::Narrative => (narrative_prompt(memories), NARRATIVE_MAX_TOKENS),
        StoryMode::Scrapbook => (scrapbook_prompt(memories), SCRAPBOOK_MAX_TOKENS),
    };

    let request = CompletionRequest::text_only(prompt, ResponseFormat::JsonObject, max_tokens);

    let raw = match completion.complete(request).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "story generation request failed, using fallback");
            return fallback_story(mode, memories);
        }
    };

    match parse_story(mode, &raw, memories) {
        Ok(content) => content,
        Err(err) => {
            warn!(error = %err.message(), "story response was malformed, using fallback");
            fallback_story(mode, memories)
        }
    }
}

fn enumerate_memories(memories: &[MemoryForStory], with_photo_urls: bool) -> String {
    memories
        .iter()
        .enumerate()
        .map(|(idx, memory)| {
            if with_photo_urls {
                format!(
                    "Photo {} by {}: \"{}\"\nPhoto URL: {}",
                    idx + 1,
                    memory.display_name,
                    memory.note,
                    memory.photo_url
                )
            } else {
                format!(
                    "Memory {} by {}: \"{}\"",
                    idx + 1,
                    memory.display_name,
                    memory.note
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn narrative_prompt(memories: &[MemoryForStory]) -> String {
    let memories_text = enumerate_memories(memories, false);

    format!(
        r#"You are a documentary-style travel journal writer who creates realistic, authentic travel journals from shared memories. You have been given a collection of photos and notes from a shared space where people have documented their experiences.

Your task is to create a realistic, documentary-style travel journal in Markdown format. The journal should:

1. Use a calm, reflective, real-life diary tone (not poetic or fictional)
2. Organize chronologically with emoji section markers (e.g., 🏞 Start, 🌲 Path, ❄️ Snow, 🏕 Return)
3. Include short, authentic sentences (3-4 per section) that match the uploaded notes
4. Avoid exaggeration or imagination — keep it real and human
5. Use Markdown headings (# for title, ## for each section)
6. Be between 300-600 words total
7. Sound like a real person documenting their actual experiences

Here are the memories to transform into a journal:

{memories_text}

Format your response as JSON with two fields:
- "title": A simple, realistic title (e.g., "Weekend at the Lake", "City Exploration", "Mountain Hike")
- "content": The full journal in Markdown format with ## headings for each chronological section

Example format:
## 🏞 Morning Start
We arrived early at the trailhead. The air was crisp and fresh. Everyone was excited to begin the hike.

## 🌲 Through the Forest
The path wound through tall pines. We stopped to take photos of the view. The sounds of nature were everywhere."#
    )
}

fn scrapbook_prompt(memories: &[MemoryForStory]) -> String {
    let memories_text = enumerate_memories(memories, true);

    format!(
        r#"You are creating a visual scrapbook-style memory book from uploaded photos and notes. Each photo needs a short, poetic caption that captures the moment.

Your task is to generate short captions (max 20 words each) for each photo that feel human, calm, and reflective.

## CAPTION STYLE:

1. **Short & poetic** (max 20 words)
   - Calm, reflective tone
   - Reference what's in the note
   - Add appropriate emoji at the end

2. **Emotional tone by scenario**:
   - Travel → "The sunlight fell perfectly on this street 🌿"
   - Daily Life → "Quiet moments before everything began"
   - Events → "We laughed too much to take this photo seriously 😂"
   - Work/Project → "Progress felt slow, but we kept going 💼"
   - Study → "Finally understanding after hours of trying 📚"
   - Friendship → "The best kind of afternoon ☕"

3. **Keep it natural**:
   - No over-explanation
   - Reference the user's note content
   - Match the mood of the moment

Here are the photos and notes:

{memories_text}

Format your response as JSON:
{{
  "title": "Simple title for the memory book (e.g., 'Weekend Memories', 'Our Days Together')",
  "captions": [
    {{
      "photoUrl": "exact photo URL from above",
      "caption": "short caption (max 20 words)",
      "emoji": "single emoji that fits the mood"
    }}
  ]
}}

Generate a caption for EACH photo. Match the emotional tone to the context. Keep captions short, natural, and grounded."#
    )
}

#[derive(Debug, Clone)]
enum ParseError {
    EmptyResponse,
    NotJson(String),
    NotAnObject,
    CaptionsMissing,
    CaptionCoverage { detail: String },
}

impl NiceDisplay for ParseError {
    fn message(&self) -> String {
        match self {
            ParseError::EmptyResponse => "The response was empty".to_string(),
            ParseError::NotJson(err) => format!("The response was not JSON: {}", err),
            ParseError::NotAnObject => "The response was not a JSON object".to_string(),
            ParseError::CaptionsMissing => "The response had no captions list".to_string(),
            ParseError::CaptionCoverage { detail } => {
                format!("The captions did not cover the photos: {}", detail)
            }
        }
    }
}

fn parse_story(
    mode: StoryMode,
    raw: &str,
    memories: &[MemoryForStory],
) -> Result<StoryContent, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    match mode {
        StoryMode::Narrative => parse_narrative(raw),
        StoryMode::Scrapbook => parse_scrapbook(raw, memories),
    }
}

fn parse_narrative(raw: &str) -> Result<StoryContent, ParseError> {
    let json: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| ParseError::NotJson(err.to_string()))?;

    let obj = json.as_object().ok_or(ParseError::NotAnObject)?;

    let title = obj
        .get("title")
        .and_then(|value| value.as_str())
        .unwrap_or(DEFAULT_NARRATIVE_TITLE)
        .to_string();

    let body = obj
        .get("content")
        .and_then(|value| value.as_str())
        .unwrap_or(DEFAULT_NARRATIVE_BODY)
        .to_string();

    Ok(StoryContent::Narrative { title, body })
}

#[derive(Deserialize)]
struct ScrapbookResponse {
    title: Option<String>,
    captions: Option<Vec<RawCaption>>,
}

#[derive(Deserialize)]
struct RawCaption {
    #[serde(rename = "photoUrl")]
    photo_url: String,
    caption: String,
    emoji: String,
}

fn parse_scrapbook(raw: &str, memories: &[MemoryForStory]) -> Result<StoryContent, ParseError> {
    let response: ScrapbookResponse =
        serde_json::from_str(raw).map_err(|err| ParseError::NotJson(err.to_string()))?;

    let raw_captions = response.captions.ok_or(ParseError::CaptionsMissing)?;

    // The caption-to-photo binding lives in the echoed URL. Every input photo
    // must come back exactly once, verbatim; anything else is malformed
    // output, not something to repair.
    let mut remaining: HashMap<&str, u32> = HashMap::new();
    for memory in memories {
        *remaining.entry(memory.photo_url.as_str()).or_insert(0) += 1;
    }

    for raw_caption in &raw_captions {
        match remaining.get_mut(raw_caption.photo_url.as_str()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => {
                return Err(ParseError::CaptionCoverage {
                    detail: format!("unexpected photo url {}", raw_caption.photo_url),
                });
            }
        }
    }

    if let Some((url, _)) = remaining.iter().find(|(_, count)| **count > 0) {
        return Err(ParseError::CaptionCoverage {
            detail: format!("no caption for {}", url),
        });
    }

    let title = response
        .title
        .unwrap_or_else(|| DEFAULT_SCRAPBOOK_TITLE.to_string());

    let captions = raw_captions
        .into_iter()
        .map(|raw_caption| PhotoCaption {
            photo_url: raw_caption.photo_url,
            caption: raw_caption.caption,
            mood: raw_caption.emoji,
        })
        .collect();

    Ok(StoryContent::Scrapbook { title, captions })
}

const FALLBACK_TITLES: [&str; 5] = [
    "Treasured Memories",
    "Good Times",
    "Fragments of Memory",
    "Moments of Life",
    "Our Story",
];

const FALLBACK_CAPTIONS: [(&str, &str); 8] = [
    ("Sunshine and easy smiles 🌞", "🌞"),
    ("A warm, ordinary moment ☀️", "☀️"),
    ("An instant worth keeping ✨", "✨"),
    ("A simple, lovely day 🌈", "🌈"),
    ("A small happiness in passing 💫", "💫"),
    ("Together, and glad of it 👫", "👫"),
    ("A quiet afternoon 🍃", "🍃"),
    ("A bright scrap of memory 🎈", "🎈"),
];

/// Deterministic substitute when the external service is down or returned
/// garbage. No further failure mode, and every input memory is covered.
pub fn fallback_story(mode: StoryMode, memories: &[MemoryForStory]) -> StoryContent {
    let title = FALLBACK_TITLES[memories.len() % FALLBACK_TITLES.len()].to_string();

    match mode {
        StoryMode::Scrapbook => {
            let captions = memories
                .iter()
                .enumerate()
                .map(|(idx, memory)| {
                    let (text, emoji) = FALLBACK_CAPTIONS[idx % FALLBACK_CAPTIONS.len()];

                    let caption = if memory.note.is_empty() {
                        text.to_string()
                    } else {
                        format!("{} {}", memory.note, text)
                    };

                    PhotoCaption {
                        photo_url: memory.photo_url.clone(),
                        caption,
                        mood: emoji.to_string(),
                    }
                })
                .collect();

            StoryContent::Scrapbook { title, captions }
        }
        StoryMode::Narrative => {
            let mut body = format!(
                "# {}\n\nThe journal writer is away for a moment, but the memories speak for themselves.\n",
                title
            );

            for (idx, memory) in memories.iter().enumerate() {
                let line = if memory.note.is_empty() {
                    format!("A photo shared by {}.", memory.display_name)
                } else {
                    format!("{}: {}", memory.display_name, memory.note)
                };

                body.push_str(&format!("\n## Moment {}\n{}\n", idx + 1, line));
            }

            StoryContent::Narrative { title, body }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CannedCompletion {
        result: Result<String, String>,
    }

    impl CannedCompletion {
        fn ok(raw: &str) -> Self {
            Self {
                result: Ok(raw.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err("connection reset by peer".to_string()),
            }
        }
    }

    #[async_trait]
    impl CompletionCapability for CannedCompletion {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, String> {
            self.result.clone()
        }
    }

    fn sample_memories() -> Vec<MemoryForStory> {
        vec![
            MemoryForStory {
                display_name: "Ada".to_string(),
                note: "First snow of the year".to_string(),
                photo_url: "https://example.com/p/1.jpg".to_string(),
            },
            MemoryForStory {
                display_name: "Ben".to_string(),
                note: "".to_string(),
                photo_url: "https://example.com/p/2.jpg".to_string(),
            },
            MemoryForStory {
                display_name: "Cleo".to_string(),
                note: "Coffee before the hike".to_string(),
                photo_url: "https://example.com/p/3.jpg".to_string(),
            },
        ]
    }

    fn scrapbook_urls(content: &StoryContent) -> Vec<String> {
        match content {
            StoryContent::Scrapbook { captions, .. } => {
                captions.iter().map(|c| c.photo_url.clone()).collect()
            }
            StoryContent::Narrative { .. } => panic!("expected scrapbook content"),
        }
    }

    #[tokio::test]
    async fn narrative_success_uses_the_model_output() {
        let completion = CannedCompletion::ok(
            r##"{"title": "Weekend at the Lake", "content": "# Weekend at the Lake\n\n## 🏞 Morning\nWe arrived early."}"##,
        );

        let content = generate(&completion, StoryMode::Narrative, &sample_memories()).await;

        match content {
            StoryContent::Narrative { title, body } => {
                assert_eq!(title, "Weekend at the Lake");
                assert!(body.contains("## 🏞 Morning"));
            }
            StoryContent::Scrapbook { .. } => panic!("expected narrative content"),
        }
    }

    #[tokio::test]
    async fn narrative_missing_fields_fall_back_to_defaults() {
        let completion = CannedCompletion::ok("{}");

        let content = generate(&completion, StoryMode::Narrative, &sample_memories()).await;

        match content {
            StoryContent::Narrative { title, body } => {
                assert_eq!(title, DEFAULT_NARRATIVE_TITLE);
                assert_eq!(body, DEFAULT_NARRATIVE_BODY);
            }
            StoryContent::Scrapbook { .. } => panic!("expected narrative content"),
        }
    }

    #[tokio::test]
    async fn scrapbook_success_keeps_the_echoed_bindings() {
        let completion = CannedCompletion::ok(
            r#"{
                "title": "Our Days Together",
                "captions": [
                    {"photoUrl": "https://example.com/p/2.jpg", "caption": "Quiet before the start", "emoji": "🌤"},
                    {"photoUrl": "https://example.com/p/1.jpg", "caption": "Snow at last ❄️", "emoji": "❄️"},
                    {"photoUrl": "https://example.com/p/3.jpg", "caption": "Coffee first ☕", "emoji": "☕"}
                ]
            }"#,
        );

        let memories = sample_memories();
        let content = generate(&completion, StoryMode::Scrapbook, &memories).await;

        let mut urls = scrapbook_urls(&content);
        urls.sort();
        let mut expected: Vec<String> = memories.iter().map(|m| m.photo_url.clone()).collect();
        expected.sort();
        assert_eq!(urls, expected);
        assert_eq!(content.title(), "Our Days Together");
    }

    #[tokio::test]
    async fn transport_failure_falls_back_and_covers_every_memory() {
        let completion = CannedCompletion::failing();
        let memories = sample_memories();

        let content = generate(&completion, StoryMode::Scrapbook, &memories).await;

        let urls = scrapbook_urls(&content);
        assert_eq!(urls.len(), memories.len());
        for memory in &memories {
            assert_eq!(urls.iter().filter(|u| **u == memory.photo_url).count(), 1);
        }
    }

    #[tokio::test]
    async fn malformed_json_falls_back() {
        let completion = CannedCompletion::ok("Sorry, I cannot produce JSON today.");
        let memories = sample_memories();

        let content = generate(&completion, StoryMode::Narrative, &memories).await;

        match content {
            StoryContent::Narrative { body, .. } => {
                // Every memory appears in the fallback body.
                assert!(body.contains("Ada"));
                assert!(body.contains("Cleo"));
                assert!(body.contains("## Moment 2"));
            }
            StoryContent::Scrapbook { .. } => panic!("expected narrative content"),
        }
    }

    #[tokio::test]
    async fn scrapbook_with_unknown_url_falls_back() {
        let completion = CannedCompletion::ok(
            r#"{
                "title": "Our Days",
                "captions": [
                    {"photoUrl": "https://example.com/p/1.jpg", "caption": "a", "emoji": "✨"},
                    {"photoUrl": "https://example.com/p/2.jpg", "caption": "b", "emoji": "✨"},
                    {"photoUrl": "https://example.com/elsewhere.jpg", "caption": "c", "emoji": "✨"}
                ]
            }"#,
        );

        let memories = sample_memories();
        let content = generate(&completion, StoryMode::Scrapbook, &memories).await;

        // The broken binding routes to the fallback, which re-covers all
        // three inputs with their original urls.
        let urls = scrapbook_urls(&content);
        assert!(urls.contains(&"https://example.com/p/3.jpg".to_string()));
        assert!(!urls.contains(&"https://example.com/elsewhere.jpg".to_string()));
    }

    #[tokio::test]
    async fn scrapbook_with_dropped_photo_falls_back() {
        let completion = CannedCompletion::ok(
            r#"{
                "title": "Our Days",
                "captions": [
                    {"photoUrl": "https://example.com/p/1.jpg", "caption": "a", "emoji": "✨"}
                ]
            }"#,
        );

        let memories = sample_memories();
        let content = generate(&completion, StoryMode::Scrapbook, &memories).await;

        assert_eq!(scrapbook_urls(&content).len(), memories.len());
    }

    #[test]
    fn fallback_is_deterministic() {
        let memories = sample_memories();

        let first = fallback_story(StoryMode::Scrapbook, &memories);
        let second = fallback_story(StoryMode::Scrapbook, &memories);
        assert_eq!(first, second);

        let first = fallback_story(StoryMode::Narrative, &memories);
        let second = fallback_story(StoryMode::Narrative, &memories);
        assert_eq!(first, second);
    }

    #[test]
    fn fallback_captions_concatenate_nonempty_notes() {
        let memories = sample_memories();
        let content = fallback_story(StoryMode::Scrapbook, &memories);

        match content {
            StoryContent::Scrapbook { captions, .. } => {
                assert!(captions[0].caption.starts_with("First snow of the year"));
                // Empty note keeps the bare pool caption.
                assert_eq!(captions[1].caption, FALLBACK_CAPTIONS[1].0);
            }
            StoryContent::Narrative { .. } => panic!("expected scrapbook content"),
        }
    }

    #[test]
    fn fallback_title_comes_from_the_fixed_pool() {
        let memories = sample_memories();
        let content = fallback_story(StoryMode::Scrapbook, &memories);
        assert!(FALLBACK_TITLES.contains(&content.title()));
    }
}
