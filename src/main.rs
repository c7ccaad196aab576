mod audio;
mod cli;
mod client;
mod config;
mod dto;
mod error;
mod pipeline;
mod server;
mod transcribe;

use clap::Parser;
use cli::{Cli, Commands};
use client::{ClientOptions, Submission};
use config::AppConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { host, port } => {
            let config = AppConfig::from_env();
            server::run_server(host, port, config).await?;
        }
        Commands::TranscribeFile {
            audio_file,
            server_url,
            chunk_duration,
        } => {
            client::run_client(ClientOptions {
                server_url,
                chunk_duration,
                submission: Submission::File { path: audio_file },
            })
            .await?;
        }
        Commands::TranscribeUrl {
            audio_url,
            server_url,
            chunk_duration,
        } => {
            client::run_client(ClientOptions {
                server_url,
                chunk_duration,
                submission: Submission::Url { url: audio_url },
            })
            .await?;
        }
    }

    Ok(())
}
