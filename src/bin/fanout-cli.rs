use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "fanout-cli")]
#[command(about = "Client CLI for the call fan-out service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the service answers
    Health,
    /// Post a batch file ({"calls": [...]}) and print the results
    Run {
        /// Path to the JSON batch file
        file: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("service returned status {status}: {body}")]
    Service {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Health => client.get(&cli.url).send().await?,
        Commands::Run { file } => {
            let payload = std::fs::read(&file)?;
            // Validate locally so typos fail before anything is sent.
            let _: Value = serde_json::from_slice(&payload)?;
            client
                .post(&cli.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload)
                .send()
                .await?
        }
    };

    let status = res.status();
    let body = res.text().await?;
    println!("{}", render_reply(status, &body)?);
    Ok(())
}

/// Pretty-print a successful reply; anything else is an error so the
/// process exits non-zero.
fn render_reply(status: reqwest::StatusCode, body: &str) -> Result<String, CliError> {
    if !status.is_success() {
        return Err(CliError::Service {
            status,
            body: body.to_string(),
        });
    }
    let json: Value = serde_json::from_str(body)?;
    Ok(serde_json::to_string_pretty(&json)?)
}
