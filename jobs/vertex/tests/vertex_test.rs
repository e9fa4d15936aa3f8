use genmedia_jobs::{JobError, PollPolicy, SubmissionError, TransportError};
use genmedia_jobs_vertex::{
    AuthToken, CachedToken, GcsUri, MediaRef, MusicRequest, StaticToken, VeoInput, VeoParameters,
    VertexConfig, VertexError, VertexMedia,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const TOKEN: &str = "test-token";
const OPERATION: &str =
    "projects/veo-testing/locations/us-central1/publishers/google/models/veo-2.0-generate-001/operations/op-1";

fn media(server: &ServerGuard, output_dir: &Path) -> VertexMedia {
    let mut config = VertexConfig::new("veo-testing");
    config.lyria_project_id = Some("music-project".to_string());
    config.api_host = Some(server.url());
    config.output_bucket = Some("fk-test-veo".to_string());
    config.local_output_dir = output_dir.to_path_buf();
    config.timeout = Duration::from_secs(5);
    config.poll = PollPolicy::new(Duration::from_millis(10), 3).unwrap();

    VertexMedia::new(config, Arc::new(StaticToken::new(TOKEN)))
        .unwrap()
        .with_storage_base_url(server.url())
}

fn started_operation(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", Matcher::Regex("veo-2.0-generate-001:predictLongRunning".to_string()))
        .match_header("authorization", format!("Bearer {TOKEN}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "name": OPERATION }).to_string())
        .create()
}

fn operation_status(
    server: &mut ServerGuard,
    status: usize,
    body: serde_json::Value,
    hits: usize,
) -> mockito::Mock {
    server
        .mock("POST", Matcher::Regex("veo-2.0-generate-001:fetchPredictOperation".to_string()))
        .match_header("authorization", format!("Bearer {TOKEN}").as_str())
        .match_body(Matcher::Json(json!({ "operationName": OPERATION })))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(hits)
        .create()
}

#[test]
fn veo_generation_downloads_the_finished_videos() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let start = server
        .mock("POST", Matcher::Regex("veo-2.0-generate-001:predictLongRunning".to_string()))
        .match_header("authorization", format!("Bearer {TOKEN}").as_str())
        .match_body(Matcher::PartialJson(json!({
            "instances": [{ "prompt": "A majestic lion roaming the savanna" }],
            "parameters": {
                "storageUri": "gs://fk-test-veo/video_outputs/",
                "aspectRatio": "16:9",
                "sampleCount": 1
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "name": OPERATION }).to_string())
        .expect(1)
        .create();
    let check = operation_status(
        &mut server,
        200,
        json!({
            "name": OPERATION,
            "done": true,
            "response": {
                "videos": [{
                    "gcsUri": "gs://fk-test-veo/video_outputs/42/sample_0.mp4",
                    "mimeType": "video/mp4"
                }]
            }
        }),
        1,
    );
    let download = server
        .mock("GET", Matcher::Regex("^/storage/v1/b/fk-test-veo/o/video_outputs%2F42%2Fsample_0.mp4".to_string()))
        .match_query(Matcher::UrlEncoded("alt".to_string(), "media".to_string()))
        .match_header("authorization", format!("Bearer {TOKEN}").as_str())
        .with_status(200)
        .with_body("fake-mp4")
        .expect(1)
        .create();

    let parameters = VeoParameters {
        sample_count: Some(1),
        aspect_ratio: Some(Default::default()),
        ..VeoParameters::default()
    };
    let saved = media(&server, output.path())
        .generate_video(
            &VeoInput::text("A majestic lion roaming the savanna"),
            &parameters,
            "video",
        )
        .unwrap();

    start.assert();
    check.assert();
    download.assert();
    assert_eq!(saved, vec![output.path().join("generated_video_sample_1_sample_0.mp4")]);
    assert_eq!(fs::read(&saved[0]).unwrap(), b"fake-mp4");
}

#[test]
fn rejected_submission_is_not_polled() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let start = server
        .mock("POST", Matcher::Regex(":predictLongRunning".to_string()))
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(json!({ "error": { "code": 400, "message": "Invalid prompt" } }).to_string())
        .create();
    let check = server
        .mock("POST", Matcher::Regex(":fetchPredictOperation".to_string()))
        .expect(0)
        .create();

    let err = media(&server, output.path())
        .veo()
        .generate(&VeoInput::text("x"), &VeoParameters::default())
        .unwrap_err();

    start.assert();
    check.assert();
    match err {
        VertexError::Job(JobError::Submission(SubmissionError::Rejected { status, body, .. })) => {
            assert_eq!(status, Some(400));
            assert_eq!(body.unwrap()["error"]["message"], "Invalid prompt");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn failing_status_check_aborts_polling() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let _start = started_operation(&mut server);
    let check = operation_status(&mut server, 503, json!({ "error": "unavailable" }), 1);

    let err = media(&server, output.path())
        .veo()
        .generate(&VeoInput::text("x"), &VeoParameters::default())
        .unwrap_err();

    check.assert();
    assert!(matches!(
        err,
        VertexError::Job(JobError::PollTransport(TransportError::Status { status: 503, .. }))
    ));
}

#[test]
fn pending_operation_times_out_after_the_policy_attempts() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let _start = started_operation(&mut server);
    let check = operation_status(&mut server, 200, json!({ "name": OPERATION }), 3);

    let err = media(&server, output.path())
        .veo()
        .generate(&VeoInput::text("x"), &VeoParameters::default())
        .unwrap_err();

    check.assert();
    assert!(matches!(err, VertexError::Job(JobError::Timeout { attempts: 3, .. })));
}

#[test]
fn operation_error_is_a_remote_failure() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let _start = started_operation(&mut server);
    let _check = operation_status(
        &mut server,
        200,
        json!({
            "name": OPERATION,
            "done": true,
            "error": { "code": 3, "message": "Unsupported output storage uri" }
        }),
        1,
    );

    let err = media(&server, output.path())
        .veo()
        .generate(&VeoInput::text("x"), &VeoParameters::default())
        .unwrap_err();

    match err {
        VertexError::Job(JobError::Remote { code, message, .. }) => {
            assert_eq!(code, Some(3));
            assert_eq!(message, "Unsupported output storage uri");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn filtered_videos_are_reported() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let _start = started_operation(&mut server);
    let _check = operation_status(
        &mut server,
        200,
        json!({
            "name": OPERATION,
            "done": true,
            "response": { "raiMediaFilteredCount": 1, "videos": [] }
        }),
        1,
    );

    let err = media(&server, output.path())
        .veo()
        .generate(&VeoInput::text("x"), &VeoParameters::default())
        .unwrap_err();

    match err {
        VertexError::EmptyResponse(message) => assert!(message.contains("safety filters")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn token_failure_never_reaches_the_server() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let start = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create();

    let mut config = VertexConfig::new("veo-testing");
    config.api_host = Some(server.url());
    config.local_output_dir = output.path().to_path_buf();
    let tokens = CachedToken::new(|| -> Result<AuthToken, TransportError> {
        Err(TransportError::Network("metadata server unreachable".to_string()))
    });
    let media = VertexMedia::new(config, Arc::new(tokens)).unwrap();

    let err = media
        .veo()
        .generate(&VeoInput::text("x"), &VeoParameters::default())
        .unwrap_err();

    start.assert();
    assert!(matches!(
        err,
        VertexError::Job(JobError::Submission(SubmissionError::Transport(TransportError::Auth(_))))
    ));
}

#[test]
fn lyria_samples_are_written_as_wav_files() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let predict = server
        .mock(
            "POST",
            Matcher::Regex("/projects/music-project/.*lyria-base-001:predict".to_string()),
        )
        .match_body(Matcher::Json(json!({
            "instances": [{
                "prompt": "An upbeat synthwave track",
                "sampleCount": 2,
                "negativePrompt": "vocals"
            }]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "predictions": [
                    { "bytesBase64Encoded": "UklGRg==", "mimeType": "audio/wav" },
                    { "content": "UklGRg==" }
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let request = MusicRequest::new("An upbeat synthwave track")
        .with_negative_prompt("vocals")
        .with_sample_count(2);
    let saved = media(&server, output.path()).generate_music(&request).unwrap();

    predict.assert();
    assert_eq!(saved.len(), 2);
    for path in &saved {
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("lyria_sample_music-project_"));
        assert!(name.ends_with(".wav"));
        assert_eq!(fs::read(path).unwrap(), b"RIFF");
    }
}

#[test]
fn prompt_builder_returns_the_model_text() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let generate = server
        .mock(
            "POST",
            Matcher::Regex("gemini-2.5-flash-preview-04-17:generateContent".to_string()),
        )
        .match_body(Matcher::PartialJson(json!({
            "generationConfig": { "maxOutputTokens": 2048 }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "A slow dolly shot over a neon city" }] },
                    "finishReason": "STOP"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let prompt = media(&server, output.path())
        .build_prompt(&[0x89, 0x50, 0x4E, 0x47], "neon city")
        .unwrap();

    generate.assert();
    assert_eq!(prompt, "A slow dolly shot over a neon city");
}

#[test]
fn images_are_uploaded_under_the_configured_prefix() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();
    let image = output.path().join("photo.png");
    fs::write(&image, [0x89, 0x50, 0x4E, 0x47]).unwrap();

    let upload = server
        .mock("POST", Matcher::Regex("^/upload/storage/v1/b/fk-test-veo/o".to_string()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("uploadType".to_string(), "media".to_string()),
            Matcher::Regex("name=uploads%2F.+_photo\\.png".to_string()),
        ]))
        .match_header("content-type", "image/png")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "name": "uploads/0b7c_photo.png", "bucket": "fk-test-veo" }).to_string())
        .expect(1)
        .create();

    let uploaded = media(&server, output.path()).upload_image(&image).unwrap();

    upload.assert();
    assert_eq!(
        uploaded,
        MediaRef::new("gs://fk-test-veo/uploads/0b7c_photo.png", "image/png")
    );
}

#[test]
fn clips_to_extend_are_uploaded_under_the_video_prefix() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();
    let clip = output.path().join("clip.mp4");
    fs::write(&clip, [0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70]).unwrap();

    let upload = server
        .mock("POST", Matcher::Regex("^/upload/storage/v1/b/fk-test-veo/o".to_string()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("uploadType".to_string(), "media".to_string()),
            Matcher::Regex("name=video_uploads%2F.+_clip\\.mp4".to_string()),
        ]))
        .match_header("content-type", "video/mp4")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "name": "video_uploads/5e1d_clip.mp4", "bucket": "fk-test-veo" }).to_string())
        .expect(1)
        .create();

    let uploaded = media(&server, output.path()).upload_video(&clip).unwrap();

    upload.assert();
    assert_eq!(
        uploaded,
        MediaRef::new("gs://fk-test-veo/video_uploads/5e1d_clip.mp4", "video/mp4")
    );
}

#[test]
fn missing_objects_surface_the_status() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let _download = server
        .mock("GET", Matcher::Regex("^/storage/v1/b/fk-test-veo/o/".to_string()))
        .with_status(404)
        .with_body("No such object")
        .create();

    let uri: GcsUri = "gs://fk-test-veo/missing.mp4".parse().unwrap();
    let destination = output.path().join("nested").join("missing.mp4");
    let err = media(&server, output.path())
        .storage()
        .download_to_file(&uri, &destination)
        .unwrap_err();

    assert!(matches!(
        err,
        VertexError::Transport(TransportError::Status { status: 404, .. })
    ));
    assert!(!destination.exists());
}

#[test]
fn image_urls_are_fetched_under_a_sanitized_name() {
    let mut server = Server::new();
    let output = tempfile::tempdir().unwrap();

    let image = server
        .mock("GET", "/images/lion%20cub.jpg")
        .with_status(200)
        .with_body("jpeg-bytes")
        .expect(1)
        .create();

    let url = format!("{}/images/lion%20cub.jpg", server.url());
    let saved = media(&server, output.path())
        .storage()
        .download_url_to_dir(&url, &output.path().join("temp_images"))
        .unwrap();

    image.assert();
    let name = saved.file_name().unwrap().to_str().unwrap();
    assert!(name.ends_with("_lion_20cub.jpg"));
    assert_eq!(fs::read(&saved).unwrap(), b"jpeg-bytes");
}
