use log::{debug, warn};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::config::AppConfig;

/// Seam between the pipeline and the inference endpoint. Implementations
/// are best-effort per segment: they return the transcribed text, or an
/// empty string when the segment could not be transcribed. A failed
/// segment must never abort the callers' run.
pub trait SegmentTranscriber {
    fn transcribe(&self, artifact: &Path) -> impl Future<Output = String> + Send;
}

/// HTTP client for the external speech-to-text endpoint. One multipart
/// upload per segment, bounded by the configured per-request timeout.
#[derive(Clone)]
pub struct TranscriptionClient {
    client: reqwest::Client,
    endpoint_url: String,
}

impl TranscriptionClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
        })
    }

    async fn transcribe_inner(&self, artifact: &Path) -> Result<String, anyhow::Error> {
        let audio_data = tokio::fs::read(artifact).await?;
        debug!(
            "Submitting segment {} ({} bytes) to {}",
            artifact.display(),
            audio_data.len(),
            self.endpoint_url
        );

        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "segment.wav".to_string());
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(audio_data).file_name(file_name),
        );

        let response = self
            .client
            .post(&self.endpoint_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("endpoint returned {status}: {body}");
        }

        let json: Value = serde_json::from_str(&body)?;
        Ok(json
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

impl SegmentTranscriber for TranscriptionClient {
    /// Degrades to an empty string on any failure (non-200, timeout,
    /// network error, unreadable artifact, unparsable body). The failure
    /// is logged, and stays observable as an empty segment text.
    async fn transcribe(&self, artifact: &Path) -> String {
        match self.transcribe_inner(artifact).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Transcription failed for {}: {e}", artifact.display());
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, HttpServer, Responder, post, web};
    use tempfile::TempDir;

    fn test_config(endpoint_url: String) -> AppConfig {
        AppConfig {
            endpoint_url,
            request_timeout_secs: 2,
            ..AppConfig::default()
        }
    }

    fn write_artifact(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("segment-test.wav");
        std::fs::write(&path, b"RIFF fake segment bytes").unwrap();
        path
    }

    #[post("/v1/audio/transcriptions")]
    async fn stub_transcriptions(_payload: web::Payload) -> impl Responder {
        HttpResponse::Ok().json(serde_json::json!({ "text": "hello from stub" }))
    }

    #[post("/broken")]
    async fn stub_broken() -> impl Responder {
        HttpResponse::InternalServerError().json(serde_json::json!({ "error": "boom" }))
    }

    async fn spawn_stub_endpoint() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HttpServer::new(|| App::new().service(stub_transcriptions).service(stub_broken))
            .listen(listener)
            .unwrap()
            .workers(1)
            .run();
        actix_web::rt::spawn(server);
        format!("http://{addr}")
    }

    #[actix_web::test]
    async fn returns_text_field_on_success() {
        let base = spawn_stub_endpoint().await;
        let dir = TempDir::new().unwrap();
        let artifact = write_artifact(&dir);

        let client =
            TranscriptionClient::new(&test_config(format!("{base}/v1/audio/transcriptions")))
                .unwrap();
        assert_eq!(client.transcribe(&artifact).await, "hello from stub");
    }

    #[actix_web::test]
    async fn non_200_degrades_to_empty_string() {
        let base = spawn_stub_endpoint().await;
        let dir = TempDir::new().unwrap();
        let artifact = write_artifact(&dir);

        let client = TranscriptionClient::new(&test_config(format!("{base}/broken"))).unwrap();
        assert_eq!(client.transcribe(&artifact).await, "");
    }

    #[actix_web::test]
    async fn unreachable_endpoint_degrades_to_empty_string() {
        let dir = TempDir::new().unwrap();
        let artifact = write_artifact(&dir);

        // Port 9 (discard) is not listening in the test environment.
        let client =
            TranscriptionClient::new(&test_config("http://127.0.0.1:9/none".to_string())).unwrap();
        assert_eq!(client.transcribe(&artifact).await, "");
    }
}
