use crate::client::{VertexEndpoint, VertexTransport};
use crate::error::{empty_response, invalid_input, VertexError};
use base64::Engine;
use log::{debug, warn};
use serde_json::{json, Value};

pub const PROMPT_INSTRUCTION: &str = "You are an expert prompt engineer for generative AI models that create video from images and text. \
Based on the following uploaded image and the user's initial idea, generate an enhanced, highly descriptive, and creative prompt. \
This generated prompt should be suitable for an advanced image-to-video AI model to produce a compelling short video clip. \
Focus on visual details, atmosphere, potential motion, and artistic style implied by the image and text. \
The output should be only the generated prompt itself, ready to be copied and used.";

const MAX_OUTPUT_TOKENS: u32 = 2048;
const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.95;

const BLOCKED_HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
];

/// Turns an image and a rough idea into an image-to-video prompt with Gemini.
pub struct PromptBuilder {
    transport: VertexTransport,
    endpoint: VertexEndpoint,
}

impl PromptBuilder {
    pub fn new(transport: VertexTransport, endpoint: VertexEndpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    pub fn build_prompt(&self, image: &[u8], idea: &str) -> Result<String, VertexError> {
        if image.is_empty() {
            return Err(invalid_input("an image is required"));
        }
        if idea.trim().is_empty() {
            return Err(invalid_input("an initial prompt idea is required"));
        }

        let request = compose_prompt_request(image, idea.trim());
        debug!("Asking {} for a prompt", self.endpoint.model);
        let response = self
            .transport
            .post_json(&self.endpoint.generate_content(), &request)?;
        extract_prompt_text(&response)
    }
}

pub fn compose_prompt_request(image: &[u8], idea: &str) -> Value {
    let mime_type = detect_image_mime_type(image);
    let text = format!(
        "{PROMPT_INSTRUCTION}\n\nUser's Initial Idea: {idea}\n\nUploaded Image Context:\n"
    );
    let safety_settings: Vec<Value> = BLOCKED_HARM_CATEGORIES
        .iter()
        .map(|category| json!({ "category": category, "threshold": "BLOCK_MEDIUM_AND_ABOVE" }))
        .collect();

    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": text },
                {
                    "inlineData": {
                        "mimeType": mime_type,
                        "data": base64::engine::general_purpose::STANDARD.encode(image),
                    }
                }
            ]
        }],
        "generationConfig": {
            "maxOutputTokens": MAX_OUTPUT_TOKENS,
            "temperature": TEMPERATURE,
            "topP": TOP_P,
        },
        "safetySettings": safety_settings,
    })
}

pub fn extract_prompt_text(response: &Value) -> Result<String, VertexError> {
    if let Some(text) = response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
    {
        return Ok(text.to_string());
    }

    match response
        .pointer("/candidates/0/finishReason")
        .and_then(Value::as_str)
    {
        Some(reason) if reason != "STOP" => Err(empty_response(format!(
            "prompt generation stopped: {reason}"
        ))),
        _ => Err(empty_response("the model returned no content")),
    }
}

/// Sniffs the image format from its magic bytes, defaulting to PNG.
pub fn detect_image_mime_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else {
        warn!("Could not determine image type, defaulting to PNG");
        "image/png"
    }
}
