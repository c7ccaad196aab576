use std::path::PathBuf;

/// Runtime configuration, built once at startup and passed by reference
/// into the pipeline and transcription client. Pipeline code never reads
/// the environment directly.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// External speech-to-text inference endpoint (multipart upload).
    pub endpoint_url: String,
    /// Directory for staged uploads and segment artifacts.
    pub work_dir: PathBuf,
    /// Per-request timeout for one segment's transcription call, seconds.
    pub request_timeout_secs: u64,
    /// Upper bound on an uploaded or downloaded payload, bytes.
    pub max_payload_bytes: usize,
    /// Chunk duration used when the caller does not supply one.
    pub default_chunk_duration_secs: u32,
    /// Largest chunk duration a caller may request.
    pub max_chunk_duration_secs: u32,
    /// How many segment transcription calls may be in flight at once.
    /// 1 gives strictly sequential behavior.
    pub transcribe_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:8000/v1/audio/transcriptions".to_string(),
            work_dir: PathBuf::from("uploads"),
            request_timeout_secs: 60,
            max_payload_bytes: 100 * 1024 * 1024, // 100MB
            default_chunk_duration_secs: 30,
            max_chunk_duration_secs: 60,
            transcribe_concurrency: 4,
        }
    }
}

impl AppConfig {
    /// Build a configuration from `LT_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint_url: env_or("LT_ENDPOINT_URL", defaults.endpoint_url),
            work_dir: PathBuf::from(env_or(
                "LT_WORK_DIR",
                defaults.work_dir.to_string_lossy().into_owned(),
            )),
            request_timeout_secs: env_parse_or(
                "LT_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
            max_payload_bytes: env_parse_or("LT_MAX_PAYLOAD_BYTES", defaults.max_payload_bytes),
            default_chunk_duration_secs: env_parse_or(
                "LT_DEFAULT_CHUNK_DURATION_SECS",
                defaults.default_chunk_duration_secs,
            ),
            max_chunk_duration_secs: env_parse_or(
                "LT_MAX_CHUNK_DURATION_SECS",
                defaults.max_chunk_duration_secs,
            ),
            transcribe_concurrency: env_parse_or(
                "LT_TRANSCRIBE_CONCURRENCY",
                defaults.transcribe_concurrency,
            )
            .max(1),
        }
    }
}

/// File extensions accepted at the upload boundary. Formats the decoder
/// cannot parse still fail later with a decode error; this list only
/// rejects obvious non-audio uploads early.
pub const ALLOWED_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "flac", "ogg"];

pub fn extension_allowed(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        assert!(extension_allowed("talk.wav"));
        assert!(extension_allowed("talk.MP3"));
        assert!(extension_allowed("a.b.flac"));
        assert!(!extension_allowed("talk.pdf"));
        assert!(!extension_allowed("no_extension"));
    }

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.default_chunk_duration_secs, 30);
        assert!(config.max_chunk_duration_secs >= config.default_chunk_duration_secs);
        assert!(config.transcribe_concurrency >= 1);
    }
}
