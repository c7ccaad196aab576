use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "long-transcribe",
    about = "Long Transcribe - chunked transcription of long audio files",
    long_about = "Splits long audio into fixed-duration segments, forwards each segment to an \
                  external speech-to-text endpoint, and reassembles the transcripts in order. \
                  Runs as an HTTP service with a built-in client.",
    after_help = "EXAMPLES:\n    # Start the transcription server\n    long-transcribe serve\n\n    # Transcribe a local audio file via a running server\n    long-transcribe file my_audio.wav\n\n    # Transcribe with 60-second chunks\n    long-transcribe file my_audio.wav --chunk-duration 60\n\n    # Transcribe a remote file by URL\n    long-transcribe url https://example.com/talk.wav\n\n    # Use a different server when in client mode\n    long-transcribe file audio.wav --server-url http://my-server:8080"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(name = "serve")]
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },
    #[command(name = "file")]
    TranscribeFile {
        audio_file: String,

        #[arg(long, default_value = "http://localhost:8080")]
        server_url: String,

        /// Segment length in seconds; server default applies when omitted.
        #[arg(long, value_parser = validate_chunk_duration)]
        chunk_duration: Option<u32>,
    },
    #[command(name = "url")]
    TranscribeUrl {
        audio_url: String,

        #[arg(long, default_value = "http://localhost:8080")]
        server_url: String,

        /// Segment length in seconds; server default applies when omitted.
        #[arg(long, value_parser = validate_chunk_duration)]
        chunk_duration: Option<u32>,
    },
}

pub fn validate_chunk_duration(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(0) => Err("Chunk duration must be at least 1 second".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err("Invalid chunk duration value".to_string()),
    }
}
