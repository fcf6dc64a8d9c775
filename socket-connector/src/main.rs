//! Entry point for `socket-connector`.
//!
//! Parses CLI arguments, sends one request and prints the response.  All
//! connection work is delegated to the library; `main.rs` owns only process
//! setup (logging, argument parsing, exit status).

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use socket_connector::{
    AttemptConfig, ConnectionAttemptManager, ConnectorConfig, Decoding, OnDecodeError, Outcome,
};

/// Send one payload over TCP and print everything the peer sends back.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Remote host name or address.
    #[arg(long)]
    host: String,

    /// Remote port.
    #[arg(short, long)]
    port: u16,

    /// Request payload (sent as-is, may be empty).
    #[arg(long, default_value = "")]
    payload: String,

    /// Re-attempts after connection errors.
    #[arg(short, long, default_value_t = 0)]
    retries: u32,

    /// Inactivity timeout in milliseconds.
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,

    /// Delay between attempts in milliseconds.
    #[arg(long, default_value_t = 3000)]
    retry_delay_ms: u64,

    /// Response encoding: `raw` or an encoding label such as `shift_jis`.
    #[arg(short, long, default_value = "raw")]
    encoding: String,

    /// Treat undecodable responses as empty successes instead of errors.
    #[arg(long)]
    lenient_decode: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    let decoding = Decoding::from_label(&cli.encoding)
        .ok_or_else(|| anyhow!("unknown encoding {:?}", cli.encoding))?;
    let on_decode_error = if cli.lenient_decode {
        OnDecodeError::EmptySuccess
    } else {
        OnDecodeError::Report
    };
    let config = ConnectorConfig::default()
        .with_inactivity_timeout(Duration::from_millis(cli.timeout_ms))
        .with_retry_delay(Duration::from_millis(cli.retry_delay_ms))
        .with_decoding(decoding)
        .with_on_decode_error(on_decode_error);

    let manager = ConnectionAttemptManager::tcp(config);
    let attempt = AttemptConfig::new(cli.host, cli.port, cli.payload).with_max_retries(cli.retries);

    let outcome = manager.request(attempt).await;
    if outcome.is_success() {
        log::info!("status {} ({})", outcome.status_code(), outcome.status_message());
    } else {
        log::warn!("status {} ({})", outcome.status_code(), outcome.status_message());
    }

    Ok(match outcome {
        Outcome::Success { data } => {
            println!("{}", String::from_utf8_lossy(&data));
            ExitCode::SUCCESS
        }
        Outcome::Error { code, message } => {
            eprintln!("error {code}: {message}");
            ExitCode::from(1)
        }
        Outcome::Timeout => {
            eprintln!("timed out");
            ExitCode::from(2)
        }
    })
}
