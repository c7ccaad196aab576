use anyhow::{Result, anyhow};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// What to submit to a running server: a local file upload or a remote URL.
pub enum Submission {
    File { path: String },
    Url { url: String },
}

pub struct ClientOptions {
    pub server_url: String,
    pub chunk_duration: Option<u32>,
    pub submission: Submission,
}

pub async fn send_transcription_request(options: &ClientOptions) -> Result<Value> {
    let client = reqwest::Client::new();

    let response = match &options.submission {
        Submission::File { path } => {
            if !Path::new(path).exists() {
                return Err(anyhow!("Audio file not found: {}", path));
            }
            let audio_data =
                fs::read(path).map_err(|e| anyhow!("Failed to read audio file: {}", e))?;
            println!("📁 Audio source: file {} ({} bytes)", path, audio_data.len());

            let mut form = reqwest::multipart::Form::new().part(
                "file",
                reqwest::multipart::Part::bytes(audio_data).file_name(path.clone()),
            );
            if let Some(chunk_duration) = options.chunk_duration {
                form = form.text("chunk_duration", chunk_duration.to_string());
            }

            println!(
                "🚀 Sending transcription request to: {}/api/v1/transcribe",
                options.server_url
            );
            client
                .post(format!("{}/api/v1/transcribe", options.server_url))
                .multipart(form)
                .send()
                .await
        }
        Submission::Url { url } => {
            println!("🔗 Audio source: {url}");
            println!(
                "🚀 Sending transcription request to: {}/api/v1/transcribe/url",
                options.server_url
            );
            client
                .post(format!("{}/api/v1/transcribe/url", options.server_url))
                .json(&serde_json::json!({
                    "audio_url": url,
                    "chunk_duration": options.chunk_duration,
                }))
                .send()
                .await
        }
    }
    .map_err(|e| anyhow!("Failed to send request: {}", e))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| anyhow!("Failed to read response: {}", e))?;

    if !status.is_success() {
        return Err(anyhow!(
            "Server returned error {}: {}",
            status,
            response_text
        ));
    }

    let json: Value = serde_json::from_str(&response_text)
        .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;

    Ok(json)
}

pub async fn check_server_health(server_url: &str) -> Result<()> {
    let client = reqwest::Client::new();

    println!("🔍 Checking server health at: {server_url}/api/v1/health");

    let response = client
        .get(format!("{server_url}/api/v1/health"))
        .send()
        .await
        .map_err(|e| anyhow!("Failed to connect to server: {}", e))?;

    if response.status().is_success() {
        println!("✅ Server is healthy");
        Ok(())
    } else {
        Err(anyhow!("Server health check failed: {}", response.status()))
    }
}

pub async fn run_client(options: ClientOptions) -> Result<()> {
    println!("🎵 Long Transcribe Client");
    println!("=========================");

    if let Err(e) = check_server_health(&options.server_url).await {
        eprintln!("❌ {e}");
        eprintln!("💡 Make sure the server is running: long-transcribe serve");
        return Err(e);
    }

    match send_transcription_request(&options).await {
        Ok(result) => {
            println!("\n✅ Transcription completed!");
            println!("📝 Result:");
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Transcription failed: {e}");
            Err(e)
        }
    }
}
