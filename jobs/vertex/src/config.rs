use crate::client::VertexEndpoint;
use genmedia_jobs::config::{
    get_config_key, get_config_with_default, get_optional_config, get_parsed_config,
    load_env_file,
};
use genmedia_jobs::error::ConfigError;
use genmedia_jobs::PollPolicy;
use std::path::PathBuf;
use std::time::Duration;

pub const PROJECT_ID_ENV_VAR: &str = "DEFAULT_PROJECT_ID";
pub const LYRIA_PROJECT_ID_ENV_VAR: &str = "DEFAULT_LYRIA_PROJECT_ID";
pub const REGION_ENV_VAR: &str = "GCP_REGION";
pub const API_HOST_ENV_VAR: &str = "VERTEX_API_HOST";
pub const API_VERSION_ENV_VAR: &str = "VERTEX_API_VERSION";
pub const VEO_MODEL_ENV_VAR: &str = "VEO_MODEL_ID";
pub const LYRIA_MODEL_ENV_VAR: &str = "LYRIA_MODEL_ID";
pub const GEMINI_MODEL_ENV_VAR: &str = "GEMINI_MODEL_NAME";
pub const OUTPUT_BUCKET_ENV_VAR: &str = "DEFAULT_OUTPUT_GCS_BUCKET";
pub const LOCAL_OUTPUT_DIR_ENV_VAR: &str = "DEFAULT_LOCAL_OUTPUT_DIR";
pub const IMAGE_UPLOAD_PREFIX_ENV_VAR: &str = "IMAGE_UPLOAD_GCS_PREFIX";
pub const VIDEO_UPLOAD_PREFIX_ENV_VAR: &str = "VIDEO_UPLOAD_GCS_PREFIX";
pub const TIMEOUT_ENV_VAR: &str = "VERTEX_TIMEOUT_SECS";
pub const DRIVE_FOLDER_LINK_ENV_VAR: &str = "DEFAULT_DRIVE_FOLDER_LINK";

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_VEO_MODEL: &str = "veo-2.0-generate-001";
pub const DEFAULT_LYRIA_MODEL: &str = "lyria-base-001";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-04-17";
pub const DEFAULT_LOCAL_OUTPUT_DIR: &str = "Output";
pub const DEFAULT_IMAGE_UPLOAD_PREFIX: &str = "uploads/";
pub const DEFAULT_VIDEO_UPLOAD_PREFIX: &str = "video_uploads/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct VertexConfig {
    pub project_id: String,
    /// Music generation may be enabled on a different project.
    pub lyria_project_id: Option<String>,
    pub location: String,
    pub api_host: Option<String>,
    pub api_version: String,
    pub veo_model: String,
    pub lyria_model: String,
    pub gemini_model: String,
    pub output_bucket: Option<String>,
    pub local_output_dir: PathBuf,
    pub image_upload_prefix: String,
    /// Where clips to extend are uploaded before being sent as the instance video.
    pub video_upload_prefix: String,
    /// Shared Drive folder the host application publishes results to.
    pub drive_folder_link: Option<String>,
    pub timeout: Duration,
    pub poll: PollPolicy,
}

impl VertexConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            lyria_project_id: None,
            location: DEFAULT_REGION.to_string(),
            api_host: None,
            api_version: "v1".to_string(),
            veo_model: DEFAULT_VEO_MODEL.to_string(),
            lyria_model: DEFAULT_LYRIA_MODEL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            output_bucket: None,
            local_output_dir: PathBuf::from(DEFAULT_LOCAL_OUTPUT_DIR),
            image_upload_prefix: DEFAULT_IMAGE_UPLOAD_PREFIX.to_string(),
            video_upload_prefix: DEFAULT_VIDEO_UPLOAD_PREFIX.to_string(),
            drive_folder_link: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll: PollPolicy::default(),
        }
    }

    /// Reads the environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env_file();

        Ok(Self {
            project_id: get_config_key(PROJECT_ID_ENV_VAR)?,
            lyria_project_id: get_optional_config(LYRIA_PROJECT_ID_ENV_VAR),
            location: get_config_with_default(REGION_ENV_VAR, DEFAULT_REGION),
            api_host: get_optional_config(API_HOST_ENV_VAR),
            api_version: get_config_with_default(API_VERSION_ENV_VAR, "v1"),
            veo_model: get_config_with_default(VEO_MODEL_ENV_VAR, DEFAULT_VEO_MODEL),
            lyria_model: get_config_with_default(LYRIA_MODEL_ENV_VAR, DEFAULT_LYRIA_MODEL),
            gemini_model: get_config_with_default(GEMINI_MODEL_ENV_VAR, DEFAULT_GEMINI_MODEL),
            output_bucket: get_optional_config(OUTPUT_BUCKET_ENV_VAR),
            local_output_dir: PathBuf::from(get_config_with_default(
                LOCAL_OUTPUT_DIR_ENV_VAR,
                DEFAULT_LOCAL_OUTPUT_DIR,
            )),
            image_upload_prefix: get_config_with_default(
                IMAGE_UPLOAD_PREFIX_ENV_VAR,
                DEFAULT_IMAGE_UPLOAD_PREFIX,
            ),
            video_upload_prefix: get_config_with_default(
                VIDEO_UPLOAD_PREFIX_ENV_VAR,
                DEFAULT_VIDEO_UPLOAD_PREFIX,
            ),
            drive_folder_link: get_optional_config(DRIVE_FOLDER_LINK_ENV_VAR),
            timeout: Duration::from_secs(get_parsed_config(TIMEOUT_ENV_VAR, DEFAULT_TIMEOUT_SECS)?),
            poll: PollPolicy::from_env()?,
        })
    }

    pub fn veo_endpoint(&self) -> VertexEndpoint {
        self.endpoint(&self.project_id, &self.veo_model)
    }

    pub fn lyria_endpoint(&self) -> VertexEndpoint {
        let project_id = self.lyria_project_id.as_deref().unwrap_or(&self.project_id);
        self.endpoint(project_id, &self.lyria_model)
    }

    pub fn gemini_endpoint(&self) -> VertexEndpoint {
        self.endpoint(&self.project_id, &self.gemini_model)
    }

    /// Where generated videos are written when the caller gives no storage URI.
    pub fn default_storage_uri(&self, folder: &str) -> Option<String> {
        self.output_bucket
            .as_ref()
            .map(|bucket| format!("gs://{bucket}/{}/", folder.trim_matches('/')))
    }

    pub fn drive_folder_id(&self) -> Option<&str> {
        self.drive_folder_link
            .as_deref()
            .and_then(crate::storage::drive_folder_id)
    }

    fn endpoint(&self, project_id: &str, model: &str) -> VertexEndpoint {
        let endpoint = VertexEndpoint::new(project_id, &self.location, model)
            .with_api_version(&self.api_version);
        match &self.api_host {
            Some(host) => endpoint.with_api_host(host),
            None => endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lyria_falls_back_to_the_main_project() {
        let mut config = VertexConfig::new("veo-testing");
        assert_eq!(config.lyria_endpoint().project_id, "veo-testing");

        config.lyria_project_id = Some("music-generation".to_string());
        assert_eq!(config.lyria_endpoint().project_id, "music-generation");
        assert_eq!(config.lyria_endpoint().model, DEFAULT_LYRIA_MODEL);
    }

    #[test]
    fn api_host_override_applies_to_every_model() {
        let mut config = VertexConfig::new("p");
        config.api_host = Some("http://localhost:9000".to_string());
        assert!(config
            .veo_endpoint()
            .predict_long_running()
            .starts_with("http://localhost:9000/v1/projects/p/"));
        assert!(config
            .gemini_endpoint()
            .generate_content()
            .starts_with("http://localhost:9000/v1/projects/p/"));
    }

    #[test]
    fn storage_uri_needs_a_bucket() {
        let mut config = VertexConfig::new("p");
        assert_eq!(config.default_storage_uri("video_outputs"), None);

        config.output_bucket = Some("fk-test-veo".to_string());
        assert_eq!(
            config.default_storage_uri("/video_outputs/"),
            Some("gs://fk-test-veo/video_outputs/".to_string())
        );
    }

    #[test]
    fn drive_folder_comes_from_the_link() {
        let mut config = VertexConfig::new("p");
        assert_eq!(config.drive_folder_id(), None);

        config.drive_folder_link =
            Some("https://drive.google.com/drive/folders/15SK65dQ?usp=drive_link".to_string());
        assert_eq!(config.drive_folder_id(), Some("15SK65dQ"));
    }

    #[test]
    fn from_env_needs_a_project_and_defaults_the_rest() {
        // The only test in this crate that touches these keys.
        std::env::remove_var(PROJECT_ID_ENV_VAR);
        assert_eq!(
            VertexConfig::from_env(),
            Err(ConfigError::Missing(PROJECT_ID_ENV_VAR.to_string()))
        );

        std::env::set_var(PROJECT_ID_ENV_VAR, "veo-testing");
        let config = VertexConfig::from_env().unwrap();
        std::env::remove_var(PROJECT_ID_ENV_VAR);

        assert_eq!(config.project_id, "veo-testing");
        assert_eq!(config.lyria_endpoint().project_id, "veo-testing");
        assert_eq!(config.veo_model, DEFAULT_VEO_MODEL);
        assert_eq!(config.image_upload_prefix, "uploads/");
        assert_eq!(config.video_upload_prefix, "video_uploads/");
        assert_eq!(config.poll, PollPolicy::default());
    }
}
