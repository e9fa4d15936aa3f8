use crate::client::{require_success, VertexTransport};
use crate::error::{from_reqwest_error, invalid_input, VertexError};
use crate::veo::GeneratedVideo;
use log::{info, trace, warn};
use reqwest::Method;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_STORAGE_HOST: &str = "https://storage.googleapis.com";

/// A `gs://bucket/object` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GcsUri {
    pub bucket: String,
    pub object: String,
}

impl GcsUri {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Last path segment of the object name, if it has one.
    pub fn file_name(&self) -> Option<&str> {
        self.object
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }
}

impl FromStr for GcsUri {
    type Err = VertexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("gs://")
            .ok_or_else(|| invalid_input(format!("not a gs:// URI: {s}")))?;
        let (bucket, object) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(invalid_input(format!("missing bucket in {s}")));
        }
        Ok(Self::new(bucket, object))
    }
}

impl Display for GcsUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.object)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub uri: GcsUri,
    pub content_type: String,
}

/// Cloud Storage JSON API access over the same authenticated client as Vertex.
#[derive(Clone)]
pub struct GcsClient {
    transport: VertexTransport,
    base_url: String,
}

impl GcsClient {
    pub fn new(transport: VertexTransport) -> Self {
        Self {
            transport,
            base_url: DEFAULT_STORAGE_HOST.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Downloads an object, creating missing parent directories of `destination`.
    /// Returns the number of bytes written.
    pub fn download_to_file(&self, uri: &GcsUri, destination: &Path) -> Result<u64, VertexError> {
        if uri.object.is_empty() {
            return Err(invalid_input(format!("no object to download in {uri}")));
        }

        let url = format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.base_url,
            uri.bucket,
            urlencoding::encode(&uri.object)
        );
        trace!("GET {url}");

        let response = self
            .transport
            .authorized(Method::GET, &url)?
            .send()
            .map_err(|err| from_reqwest_error("Download request failed", err))?;
        let mut response = require_success(response)?;

        create_parent_dirs(destination)?;
        let written = write_complete(destination, |file| {
            response
                .copy_to(file)
                .map_err(|err| VertexError::from(from_reqwest_error("Failed to read object body", err)))
        })?;

        info!("Downloaded {uri} to {}", destination.display());
        Ok(written)
    }

    /// Uploads a local file as `{prefix}{uuid}_{file name}` in `bucket`.
    pub fn upload_file(
        &self,
        bucket: &str,
        prefix: &str,
        path: &Path,
    ) -> Result<UploadedObject, VertexError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| invalid_input(format!("no file name in {}", path.display())))?;
        let object = format!("{prefix}{}_{file_name}", Uuid::new_v4());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let body = fs::read(path)?;

        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            bucket,
            urlencoding::encode(&object)
        );
        trace!("POST {url}");

        let response = self
            .transport
            .authorized(Method::POST, &url)?
            .header("Content-Type", content_type.as_str())
            .body(body)
            .send()
            .map_err(|err| from_reqwest_error("Upload request failed", err))?;
        let response = require_success(response)?;
        let stored = response
            .json::<serde_json::Value>()
            .map_err(|err| from_reqwest_error("Failed to decode upload response", err))?;
        let object = stored
            .get("name")
            .and_then(|name| name.as_str())
            .map(str::to_string)
            .unwrap_or(object);

        let uri = GcsUri::new(bucket, object);
        info!("Uploaded {} to {uri}", path.display());
        Ok(UploadedObject { uri, content_type })
    }

    /// Fetches a public URL into `dir` under a unique, sanitized name.
    pub fn download_url_to_dir(&self, url: &str, dir: &Path) -> Result<PathBuf, VertexError> {
        trace!("GET {url}");
        let response = self
            .transport
            .http()
            .get(url)
            .send()
            .map_err(|err| from_reqwest_error("Download request failed", err))?;
        let mut response = require_success(response)?;

        let remote_name = response
            .url()
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.jpg", Uuid::new_v4()));
        let destination = dir.join(format!("{}_{}", Uuid::new_v4(), sanitize_file_name(&remote_name)));

        fs::create_dir_all(dir)?;
        write_complete(&destination, |file| {
            response
                .copy_to(file)
                .map_err(|err| VertexError::from(from_reqwest_error("Failed to read download body", err)))
        })?;
        Ok(destination)
    }

    /// Writes every generated video into `dir`, downloading the ones stored in
    /// Cloud Storage. Videos without any content are skipped.
    pub fn save_videos(
        &self,
        videos: &[GeneratedVideo],
        dir: &Path,
        source: &str,
    ) -> Result<Vec<PathBuf>, VertexError> {
        fs::create_dir_all(dir)?;
        let mut saved = Vec::with_capacity(videos.len());

        for (index, video) in videos.iter().enumerate() {
            let sample = index + 1;
            if let Some(uri) = &video.gcs_uri {
                let destination = local_output_path(dir, source, sample, uri);
                self.download_to_file(uri, &destination)?;
                saved.push(destination);
            } else if let Some(bytes) = &video.bytes {
                let destination = dir.join(format!(
                    "generated_{source}_sample_{sample}_video_{}.mp4",
                    Uuid::new_v4()
                ));
                fs::write(&destination, bytes)?;
                saved.push(destination);
            } else {
                warn!("Video sample {sample} has neither a GCS URI nor inline bytes, skipping");
            }
        }

        Ok(saved)
    }
}

/// Writes into `{destination}.part` and renames it into place only once `write`
/// succeeds, so an interrupted download never leaves a truncated file behind.
fn write_complete(
    destination: &Path,
    write: impl FnOnce(&mut File) -> Result<u64, VertexError>,
) -> Result<u64, VertexError> {
    let partial = partial_path(destination);
    let mut file = File::create(&partial)?;
    let result = write(&mut file);
    drop(file);

    let written = result.and_then(|written| {
        fs::rename(&partial, destination)?;
        Ok(written)
    });
    if written.is_err() {
        warn!("Discarding incomplete {}", partial.display());
        let _ = fs::remove_file(&partial);
    }
    written
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

fn create_parent_dirs(path: &Path) -> Result<(), VertexError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

/// Replaces everything except ASCII alphanumerics, `.`, `_` and `-` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{dir}/generated_{source}_sample_{sample}_{object file name}`; `sample` counts from 1.
pub fn local_output_path(dir: &Path, source: &str, sample: usize, uri: &GcsUri) -> PathBuf {
    let base_name = uri
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("video_{}.mp4", Uuid::new_v4()));
    dir.join(format!("generated_{source}_sample_{sample}_{base_name}"))
}

/// Extracts the folder id from a `https://drive.google.com/drive/folders/<id>?...` link.
pub fn drive_folder_id(link: &str) -> Option<&str> {
    let (_, rest) = link.split_once("/folders/")?;
    let id = rest.split(['?', '/']).next()?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
