use crate::client::{VertexEndpoint, VertexTransport};
use crate::error::{invalid_input, VertexError};
use base64::Engine;
use genmedia_jobs::TransportError;
use log::{info, warn};
use serde_json::{json, Value};
use uuid::Uuid;

pub const DEFAULT_SAMPLE_COUNT: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub sample_count: u32,
}

impl MusicRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: String::new(),
            sample_count: DEFAULT_SAMPLE_COUNT,
        }
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = negative_prompt.into();
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    fn to_payload(&self) -> Value {
        json!({
            "instances": [{
                "prompt": self.prompt,
                "sampleCount": self.sample_count,
                "negativePrompt": self.negative_prompt,
            }]
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicSample {
    pub file_name: String,
    pub audio: Vec<u8>,
}

/// Lyria answers `:predict` synchronously, so no operation polling is involved.
pub struct LyriaClient {
    transport: VertexTransport,
    endpoint: VertexEndpoint,
}

impl LyriaClient {
    pub fn new(transport: VertexTransport, endpoint: VertexEndpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    pub fn generate_music(&self, request: &MusicRequest) -> Result<Vec<MusicSample>, VertexError> {
        if request.prompt.trim().is_empty() {
            return Err(invalid_input("music prompt must not be empty"));
        }
        if request.sample_count == 0 {
            return Err(invalid_input("sample_count must be positive"));
        }

        let response = self
            .transport
            .post_json(&self.endpoint.predict(), &request.to_payload())?;
        let samples = decode_predictions(&response, &self.endpoint.project_id)?;
        info!("Lyria returned {} sample(s)", samples.len());
        Ok(samples)
    }
}

/// Decodes `predictions[]` audio, preferring `bytesBase64Encoded` over `content`.
pub fn decode_predictions(response: &Value, project_id: &str) -> Result<Vec<MusicSample>, VertexError> {
    let predictions = response
        .get("predictions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if predictions.is_empty() {
        warn!("Lyria returned no predictions");
    }

    let mut samples = Vec::with_capacity(predictions.len());
    for (index, prediction) in predictions.iter().enumerate() {
        let sample = index + 1;
        let encoded = ["bytesBase64Encoded", "content"]
            .iter()
            .filter_map(|field| prediction.get(*field).and_then(Value::as_str))
            .find(|value| !value.is_empty());

        let Some(encoded) = encoded else {
            warn!("Sample {sample} from Lyria had no audio content");
            continue;
        };
        let audio = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|err| TransportError::Decode(format!("Lyria sample {sample}: {err}")))?;

        let id = Uuid::new_v4().simple().to_string();
        samples.push(MusicSample {
            file_name: format!("lyria_sample_{project_id}_{}_{sample}.wav", &id[..8]),
            audio,
        });
    }

    Ok(samples)
}
