//! Fixed transcription prompt and request construction.

use crate::config::VisionSettings;

use super::types::{ChatMessage, ChatRequest, ContentPart, ImageUrl};

/// Instruction sent with every image.
pub const TRANSCRIPTION_PROMPT: &str = "Convert the content of this document image into GitHub Flavored Markdown format. Maintain the original structure and formatting as closely as possible. Include all text, tables, headings like and lists. Use appropriate Markdown syntax for headers, tables, and bullet points. Do not add any additional commentary or description outside of the document's content.";

/// Build the chat completion request for one image.
///
/// One user message holding the instruction followed by the image; sampling
/// parameters come from `settings`.
pub fn build_vision_request(image: &str, settings: &VisionSettings) -> ChatRequest {
    ChatRequest {
        model: settings.model.clone(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: vec![
                ContentPart::Text {
                    text: TRANSCRIPTION_PROMPT.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.to_string(),
                    },
                },
            ],
        }],
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        top_p: settings.top_p,
        stream: false,
    }
}
