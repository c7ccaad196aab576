use actix_cors::Cors;
use actix_multipart::{Field, Multipart};
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, post, web};
use futures_util::TryStreamExt;
use log::{debug, error, info, warn};
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;

use crate::config::{AppConfig, extension_allowed};
use crate::dto::{SegmentDto, TranscriptionDto, UrlRequest};
use crate::error::PipelineError;
use crate::pipeline::{TranscriptionResult, run_pipeline};
use crate::transcribe::TranscriptionClient;

pub struct AppState {
    pub config: AppConfig,
    pub transcriber: TranscriptionClient,
    pub http: reqwest::Client,
}

#[get("/api/v1/health")]
pub async fn health_check() -> impl Responder {
    debug!("Health check endpoint called");
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "Long-audio transcription service is running"
    }))
}

#[post("/api/v1/transcribe")]
pub async fn transcribe_upload(
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> impl Responder {
    debug!("Transcription request received");

    let mut audio_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut chunk_duration = data.config.default_chunk_duration_secs;

    // Process multipart fields
    while let Some(field) = payload.try_next().await.unwrap_or(None) {
        match field.name() {
            Some("file") => {
                filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(str::to_string);
                match read_field_data(field, data.config.max_payload_bytes).await {
                    Ok(bytes) => {
                        debug!("Audio data received: {} bytes", bytes.len());
                        audio_data = Some(bytes);
                    }
                    Err(e) => return error_response(&e),
                }
            }
            Some("chunk_duration") => {
                let bytes = match read_field_data(field, 64).await {
                    Ok(bytes) => bytes,
                    Err(e) => return error_response(&e),
                };
                match String::from_utf8(bytes).ok().and_then(|s| s.trim().parse().ok()) {
                    Some(value) => {
                        chunk_duration = value;
                        debug!("Chunk duration set to: {chunk_duration}");
                    }
                    None => {
                        return error_response(&PipelineError::Validation(
                            "chunk_duration must be a positive integer".to_string(),
                        ));
                    }
                }
            }
            _ => continue,
        }
    }

    let audio_bytes = match audio_data {
        Some(bytes) => bytes,
        None => {
            warn!("No audio file provided in transcription request");
            return error_response(&PipelineError::Validation(
                "no audio file provided".to_string(),
            ));
        }
    };

    let filename = match filename {
        Some(name) if !name.is_empty() => name,
        _ => {
            return error_response(&PipelineError::Validation(
                "no filename provided".to_string(),
            ));
        }
    };
    if !extension_allowed(&filename) {
        warn!("Rejected upload with disallowed extension: {filename}");
        return error_response(&PipelineError::Validation(format!(
            "unsupported file format: {filename}"
        )));
    }

    info!(
        "Processing upload: {} ({} bytes), chunk_duration={}s",
        filename,
        audio_bytes.len(),
        chunk_duration
    );

    let source = match stage_bytes(&audio_bytes, &filename, &data.config.work_dir) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to stage upload: {e}");
            return error_response(&e);
        }
    };

    run_and_respond(&data, source, chunk_duration).await
}

#[post("/api/v1/transcribe/url")]
pub async fn transcribe_url(data: web::Data<AppState>, req: web::Json<UrlRequest>) -> impl Responder {
    let chunk_duration = req
        .chunk_duration
        .unwrap_or(data.config.default_chunk_duration_secs);

    if req.audio_url.is_empty() {
        return error_response(&PipelineError::Validation(
            "missing audio_url parameter".to_string(),
        ));
    }

    info!("Downloading audio from: {}", req.audio_url);
    let response = match data.http.get(&req.audio_url).send().await {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to download {}: {e}", req.audio_url);
            return HttpResponse::BadGateway().json(serde_json::json!({
                "error": format!("failed to download audio: {}", e)
            }));
        }
    };
    if !response.status().is_success() {
        error!(
            "Download of {} returned status {}",
            req.audio_url,
            response.status()
        );
        return HttpResponse::BadGateway().json(serde_json::json!({
            "error": format!("failed to download audio: status {}", response.status())
        }));
    }

    let audio_bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read download body: {e}");
            return HttpResponse::BadGateway().json(serde_json::json!({
                "error": format!("failed to download audio: {}", e)
            }));
        }
    };
    if audio_bytes.len() > data.config.max_payload_bytes {
        return error_response(&PipelineError::Validation(format!(
            "payload exceeds maximum size of {} bytes",
            data.config.max_payload_bytes
        )));
    }
    debug!("Downloaded {} bytes", audio_bytes.len());

    // Remote names are untrusted; stage under a fixed .wav suffix like the
    // reference service does.
    let source = match stage_bytes(&audio_bytes, "download.wav", &data.config.work_dir) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to stage download: {e}");
            return error_response(&e);
        }
    };

    run_and_respond(&data, source, chunk_duration).await
}

async fn run_and_respond(
    data: &web::Data<AppState>,
    source: TempPath,
    chunk_duration: u32,
) -> HttpResponse {
    match run_pipeline(source, chunk_duration, &data.config, &data.transcriber).await {
        Ok(result) => {
            info!(
                "Transcription completed: {} segments, {} characters",
                result.chunk_count,
                result.text.len()
            );
            HttpResponse::Ok().json(to_dto(result))
        }
        Err(e) => {
            error!("Pipeline run failed: {e}");
            error_response(&e)
        }
    }
}

async fn read_field_data(mut field: Field, limit: usize) -> Result<Vec<u8>, PipelineError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| PipelineError::Validation(format!("malformed multipart payload: {e}")))?
    {
        if data.len() + chunk.len() > limit {
            return Err(PipelineError::Validation(format!(
                "payload exceeds maximum size of {limit} bytes"
            )));
        }
        data.extend_from_slice(&chunk);
    }
    debug!("Read field data: {} bytes", data.len());
    Ok(data)
}

/// Write payload bytes to a uniquely named file in the working directory.
/// The suffix keeps the original extension so decode failures stay
/// attributable to content rather than naming.
fn stage_bytes(bytes: &[u8], filename: &str, work_dir: &Path) -> Result<TempPath, PipelineError> {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("bin");
    let mut staged = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{}", extension.to_ascii_lowercase()))
        .tempfile_in(work_dir)?;
    staged.write_all(bytes)?;
    Ok(staged.into_temp_path())
}

fn to_dto(result: TranscriptionResult) -> TranscriptionDto {
    TranscriptionDto {
        success: true,
        text: result.text,
        segments: result
            .segments
            .into_iter()
            .map(|s| SegmentDto {
                segment_id: s.segment_id,
                text: s.text,
                start_time: s.start_time,
                end_time: s.end_time,
            })
            .collect(),
        duration: result.duration_secs,
        chunk_count: result.chunk_count,
        chunk_duration: result.chunk_duration_secs,
    }
}

fn error_response(err: &PipelineError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match err {
        PipelineError::Validation(_) => HttpResponse::BadRequest().json(body),
        PipelineError::Decode(_) => HttpResponse::UnprocessableEntity().json(body),
        PipelineError::Upstream(_) | PipelineError::Io(_) => {
            HttpResponse::InternalServerError().json(body)
        }
    }
}

pub async fn run_server(host: String, port: u16, config: AppConfig) -> std::io::Result<()> {
    info!("Starting long-audio transcription service");
    info!(
        "Using configuration: endpoint={}, work_dir={}, timeout={}s, concurrency={}",
        config.endpoint_url,
        config.work_dir.display(),
        config.request_timeout_secs,
        config.transcribe_concurrency
    );

    std::fs::create_dir_all(&config.work_dir)?;

    let transcriber = match TranscriptionClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build transcription client: {e}");
            return Err(std::io::Error::other(e));
        }
    };

    let max_payload = config.max_payload_bytes;
    let app_state = web::Data::new(AppState {
        config,
        transcriber,
        http: reqwest::Client::new(),
    });

    info!("Starting HTTP server on {host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .app_data(web::PayloadConfig::new(max_payload + 64 * 1024))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health_check)
            .service(transcribe_upload)
            .service(transcribe_url)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
