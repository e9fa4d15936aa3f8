pub mod authentication;
pub mod client;
pub mod config;
pub mod error;
pub mod lyria;
pub mod prompt;
pub mod storage;
pub mod veo;

pub use authentication::{AuthToken, CachedToken, StaticToken, TokenSource};
pub use client::{VertexEndpoint, VertexTransport};
pub use config::VertexConfig;
pub use error::VertexError;
pub use lyria::{LyriaClient, MusicRequest, MusicSample};
pub use prompt::PromptBuilder;
pub use storage::{GcsClient, GcsUri, UploadedObject};
pub use veo::{
    AspectRatio, GeneratedVideo, MediaRef, PersonGeneration, VeoGenerator, VeoInput, VeoParameters,
};

use genmedia_jobs::error::ConfigError;
use genmedia_jobs::{CancellationToken, JobClient, LOGGING_STATE};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Output folder inside the bucket when the caller does not pick a storage URI.
pub const DEFAULT_VIDEO_FOLDER: &str = "video_outputs";

/// Wires configuration, credentials and the shared HTTP client into the
/// individual Vertex AI clients.
#[derive(Clone)]
pub struct VertexMedia {
    config: VertexConfig,
    transport: VertexTransport,
    storage_base_url: Option<String>,
}

impl VertexMedia {
    pub fn new(config: VertexConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, VertexError> {
        let transport = VertexTransport::new(tokens, config.timeout)?;
        Ok(Self {
            config,
            transport,
            storage_base_url: None,
        })
    }

    /// Reads configuration and a `GOOGLE_ACCESS_TOKEN` from the environment.
    pub fn from_env() -> Result<Self, VertexError> {
        LOGGING_STATE.with_borrow_mut(|state| state.init());

        let config = VertexConfig::from_env()?;
        let tokens = StaticToken::from_env()?;
        Self::new(config, Arc::new(tokens))
    }

    pub fn with_storage_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.storage_base_url = Some(base_url.into());
        self
    }

    pub fn config(&self) -> &VertexConfig {
        &self.config
    }

    pub fn veo(&self) -> VeoGenerator<VertexTransport> {
        let client = JobClient::new(self.transport.clone(), self.config.veo_endpoint().operations());
        VeoGenerator::new(client, self.config.poll)
    }

    pub fn lyria(&self) -> LyriaClient {
        LyriaClient::new(self.transport.clone(), self.config.lyria_endpoint())
    }

    pub fn prompt_builder(&self) -> PromptBuilder {
        PromptBuilder::new(self.transport.clone(), self.config.gemini_endpoint())
    }

    pub fn storage(&self) -> GcsClient {
        let storage = GcsClient::new(self.transport.clone());
        match &self.storage_base_url {
            Some(base_url) => storage.with_base_url(base_url),
            None => storage,
        }
    }

    /// Generates videos and saves them to the local output directory as
    /// `generated_{source}_sample_{n}_*`.
    pub fn generate_video(
        &self,
        input: &VeoInput,
        parameters: &VeoParameters,
        source: &str,
    ) -> Result<Vec<PathBuf>, VertexError> {
        self.generate_video_with_cancel(input, parameters, source, &CancellationToken::new())
    }

    pub fn generate_video_with_cancel(
        &self,
        input: &VeoInput,
        parameters: &VeoParameters,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>, VertexError> {
        let mut parameters = parameters.clone();
        if parameters.storage_uri.is_none() {
            parameters.storage_uri = self.config.default_storage_uri(DEFAULT_VIDEO_FOLDER);
        }

        let videos = self.veo().generate_with_cancel(input, &parameters, cancel)?;
        self.storage()
            .save_videos(&videos, &self.config.local_output_dir, source)
    }

    /// Generates music and writes each sample as a `.wav` file in the local output directory.
    pub fn generate_music(&self, request: &MusicRequest) -> Result<Vec<PathBuf>, VertexError> {
        let samples = self.lyria().generate_music(request)?;
        save_music_samples(&samples, &self.config.local_output_dir)
    }

    pub fn build_prompt(&self, image: &[u8], idea: &str) -> Result<String, VertexError> {
        self.prompt_builder().build_prompt(image, idea)
    }

    /// Uploads a local image under the configured upload prefix of the output bucket.
    pub fn upload_image(&self, path: &Path) -> Result<MediaRef, VertexError> {
        self.upload(path, &self.config.image_upload_prefix)
    }

    /// Uploads a clip to extend, for use with [`VeoInput::with_video`].
    pub fn upload_video(&self, path: &Path) -> Result<MediaRef, VertexError> {
        self.upload(path, &self.config.video_upload_prefix)
    }

    fn upload(&self, path: &Path, prefix: &str) -> Result<MediaRef, VertexError> {
        let bucket = self
            .config
            .output_bucket
            .as_deref()
            .ok_or_else(|| ConfigError::Missing(config::OUTPUT_BUCKET_ENV_VAR.to_string()))?;
        let uploaded = self.storage().upload_file(bucket, prefix, path)?;
        Ok(uploaded.into())
    }
}

pub fn save_music_samples(samples: &[MusicSample], dir: &Path) -> Result<Vec<PathBuf>, VertexError> {
    fs::create_dir_all(dir)?;
    samples
        .iter()
        .map(|sample| {
            let path = dir.join(&sample.file_name);
            fs::write(&path, &sample.audio)?;
            info!("Saved {}", path.display());
            Ok(path)
        })
        .collect()
}
