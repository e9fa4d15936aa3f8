use crate::error::{empty_response, invalid_input, VertexError};
use crate::storage::{GcsUri, UploadedObject};
use base64::Engine;
use genmedia_jobs::{CancellationToken, JobClient, JobRequest, PollPolicy, Transport, TransportError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_SAMPLE_COUNT: u32 = 4;

/// A media input already stored in Cloud Storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub gcs_uri: String,
    pub mime_type: String,
}

impl MediaRef {
    pub fn new(gcs_uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            gcs_uri: gcs_uri.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn image(gcs_uri: impl Into<String>) -> Self {
        Self::new(gcs_uri, "image/jpeg")
    }

    pub fn video(gcs_uri: impl Into<String>) -> Self {
        Self::new(gcs_uri, "video/mp4")
    }
}

impl From<UploadedObject> for MediaRef {
    fn from(object: UploadedObject) -> Self {
        Self::new(object.uri.to_string(), object.content_type)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    #[default]
    AllowAdult,
    DontAllow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VeoParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhance_prompt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_generation: Option<PersonGeneration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

impl VeoParameters {
    fn validated(&self) -> Result<Self, VertexError> {
        let mut parameters = self.clone();

        if let Some(count) = parameters.sample_count {
            let clamped = count.clamp(1, MAX_SAMPLE_COUNT);
            if clamped != count {
                warn!("sample_count {count} is outside 1..={MAX_SAMPLE_COUNT}, using {clamped}");
                parameters.sample_count = Some(clamped);
            }
        }
        if parameters.duration_seconds == Some(0) {
            return Err(invalid_input("duration_seconds must be positive"));
        }
        if let Some(uri) = &parameters.storage_uri {
            uri.parse::<GcsUri>()?;
        }

        Ok(parameters)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VeoInput {
    pub prompt: String,
    pub image: Option<MediaRef>,
    /// A video to extend.
    pub video: Option<MediaRef>,
    /// Final frame for interpolation between `image` and this frame.
    pub last_frame: Option<MediaRef>,
    pub camera_control: Option<String>,
}

impl VeoInput {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: MediaRef) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_video(mut self, video: MediaRef) -> Self {
        self.video = Some(video);
        self
    }

    pub fn with_last_frame(mut self, last_frame: MediaRef) -> Self {
        self.last_frame = Some(last_frame);
        self
    }

    pub fn with_camera_control(mut self, camera_control: impl Into<String>) -> Self {
        self.camera_control = Some(camera_control.into());
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoInstance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a MediaRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<&'a MediaRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame: Option<&'a MediaRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    camera_control: Option<&'a str>,
}

/// Builds the `predictLongRunning` body: one instance plus the parameters.
pub fn compose_request(input: &VeoInput, parameters: &VeoParameters) -> Result<JobRequest, VertexError> {
    if input.prompt.trim().is_empty() && input.image.is_none() {
        return Err(invalid_input("either a prompt or an image is required"));
    }
    if input.last_frame.is_some() && input.image.is_none() {
        warn!("last_frame without a first frame image, Veo may reject the request");
    }

    let instance = VeoInstance {
        prompt: &input.prompt,
        image: input.image.as_ref(),
        video: input.video.as_ref(),
        last_frame: input.last_frame.as_ref(),
        camera_control: input.camera_control.as_deref(),
    };
    let instance = serde_json::to_value(instance)
        .map_err(|err| invalid_input(format!("failed to encode instance: {err}")))?;
    let parameters = serde_json::to_value(parameters.validated()?)
        .map_err(|err| invalid_input(format!("failed to encode parameters: {err}")))?;

    Ok(JobRequest::new()
        .with("instances", Value::Array(vec![instance]))
        .with("parameters", parameters))
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedVideo {
    pub gcs_uri: Option<GcsUri>,
    pub mime_type: Option<String>,
    pub bytes: Option<Vec<u8>>,
}

/// Reads the videos out of a finished operation's `response` object.
///
/// Both the `videos[]` layout and the older `generatedSamples[].video.uri`
/// layout are understood. Entries with neither a URI nor inline bytes are
/// dropped with a warning.
pub fn generated_videos(response: &Value) -> Result<Vec<GeneratedVideo>, VertexError> {
    if let Some(videos) = response.get("videos").and_then(Value::as_array) {
        let mut result = Vec::with_capacity(videos.len());
        for (index, entry) in videos.iter().enumerate() {
            let gcs_uri = match entry.get("gcsUri").and_then(Value::as_str) {
                Some(uri) => match uri.parse::<GcsUri>() {
                    Ok(uri) => Some(uri),
                    Err(err) => {
                        warn!("Ignoring video sample {}: {err}", index + 1);
                        None
                    }
                },
                None => None,
            };
            let bytes = entry
                .get("bytesBase64Encoded")
                .and_then(Value::as_str)
                .map(|encoded| {
                    base64::engine::general_purpose::STANDARD
                        .decode(encoded)
                        .map_err(|err| {
                            TransportError::Decode(format!("video sample {}: {err}", index + 1))
                        })
                })
                .transpose()?;

            if gcs_uri.is_none() && bytes.is_none() {
                warn!("Video sample {} has no content", index + 1);
                continue;
            }
            result.push(GeneratedVideo {
                gcs_uri,
                mime_type: entry
                    .get("mimeType")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                bytes,
            });
        }
        return Ok(result);
    }

    let samples = response
        .pointer("/generatedSamples")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    Ok(samples
        .iter()
        .filter_map(|sample| sample.pointer("/video/uri").and_then(Value::as_str))
        .filter_map(|uri| uri.parse::<GcsUri>().ok())
        .map(|uri| GeneratedVideo {
            gcs_uri: Some(uri),
            mime_type: None,
            bytes: None,
        })
        .collect())
}

/// Runs Veo generations to completion through a [`JobClient`].
pub struct VeoGenerator<T> {
    client: JobClient<T>,
    policy: PollPolicy,
}

impl<T: Transport> VeoGenerator<T> {
    pub fn new(client: JobClient<T>, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &JobClient<T> {
        &self.client
    }

    pub fn generate(
        &self,
        input: &VeoInput,
        parameters: &VeoParameters,
    ) -> Result<Vec<GeneratedVideo>, VertexError> {
        self.generate_with_cancel(input, parameters, &CancellationToken::new())
    }

    pub fn generate_with_cancel(
        &self,
        input: &VeoInput,
        parameters: &VeoParameters,
        cancel: &CancellationToken,
    ) -> Result<Vec<GeneratedVideo>, VertexError> {
        let request = compose_request(input, parameters)?;
        let output = self
            .client
            .submit_and_await_with_cancel(&request, &self.policy, cancel)?;

        let videos = generated_videos(&output.payload)?;
        if videos.is_empty() {
            return match output
                .payload
                .get("raiMediaFilteredCount")
                .and_then(Value::as_u64)
            {
                Some(filtered) if filtered > 0 => Err(empty_response(format!(
                    "{filtered} video(s) were removed by safety filters"
                ))),
                _ => Err(empty_response("operation finished without any videos")),
            };
        }

        info!(
            "Veo generation produced {} video(s) after {} status check(s)",
            videos.len(),
            output.attempts
        );
        Ok(videos)
    }
}
