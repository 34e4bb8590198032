//! Command-line front end for the WBS client.
//!
//! Reads configuration from the environment (and `.env`), runs init, then the
//! requested operation, and prints the resulting envelope as JSON on stdout.
//!
//! Run with: cargo run --bin wbs -- [OPTIONS] <COMMAND>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coreauto_wbs::{BatchClient, Envelope, SessionConfig, WbsClient};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "CoreAuto WBS client", long_about = None)]
struct Cli {
    /// Log level (debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Use the batch client (no ACTIONID/STEPNAME; keystore only)
    #[arg(long)]
    batch: bool,

    /// Pretty-print the envelope
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate only
    Init,

    /// Fetch the payload of the event that triggered this action
    EventPayload,

    /// Fetch the payload stored by a step of this action
    GetStep {
        /// Step name
        step: String,
    },

    /// Store a JSON payload for the current step
    PutStep {
        /// Payload as a JSON document
        payload: String,
    },

    /// Fetch keystore entries
    Keystore {
        /// Comma separated key names
        keys: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout only carries the envelope
    let log_filter = format!("coreauto_wbs={},warn", cli.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let envelope = match config_or_envelope(SessionConfig::load()) {
        Ok(config) if cli.batch => run_batch(config, cli.command).await?,
        Ok(config) => run_full(config, cli.command).await?,
        Err(envelope) => envelope,
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    println!("{}", rendered);

    let code = exit_code(&envelope);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Configuration problems are reported like any other failure, as an envelope.
fn config_or_envelope(
    loaded: coreauto_wbs::Result<SessionConfig>,
) -> std::result::Result<SessionConfig, Envelope> {
    loaded.map_err(Envelope::from)
}

fn exit_code(envelope: &Envelope) -> i32 {
    if envelope.is_success() {
        0
    } else {
        1
    }
}

async fn run_full(config: SessionConfig, command: Commands) -> Result<Envelope> {
    // Parse input before touching the network
    let put_payload = match &command {
        Commands::PutStep { payload } => Some(
            serde_json::from_str::<Value>(payload).context("Payload is not valid JSON")?,
        ),
        _ => None,
    };

    let mut client = WbsClient::new(config)?;
    let init = client.init().await;
    if !init.is_success() {
        return Ok(init);
    }

    let envelope = match command {
        Commands::Init => init,
        Commands::EventPayload => client.event_payload().await,
        Commands::GetStep { step } => client.step_payload(&step).await,
        Commands::PutStep { .. } => {
            client
                .put_step_payload(put_payload.unwrap_or(Value::Null))
                .await
        }
        Commands::Keystore { keys } => client.keystore(&keys).await,
    };
    Ok(envelope)
}

async fn run_batch(config: SessionConfig, command: Commands) -> Result<Envelope> {
    if !matches!(command, Commands::Init | Commands::Keystore { .. }) {
        bail!("The batch client only supports `init` and `keystore`");
    }

    let mut client = BatchClient::new(config)?;
    let init = client.init().await;
    if !init.is_success() {
        return Ok(init);
    }

    let envelope = match command {
        Commands::Keystore { keys } => client.keystore(&keys).await,
        _ => init,
    };
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Base URL of a port nothing listens on.
    async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn create_test_config(base_url: &str) -> SessionConfig {
        SessionConfig {
            environment: Some("staging".to_string()),
            action_id: Some("action-42".to_string()),
            access_code: Some("code".to_string()),
            base_url: Some(base_url.to_string()),
            step_name: Some("enrich".to_string()),
            timeout_secs: Some(5),
        }
    }

    #[tokio::test]
    async fn test_batch_rejects_step_commands() {
        let config = create_test_config(&dead_url().await);
        let err = run_batch(config.clone(), Commands::EventPayload).await.unwrap_err();
        assert!(err.to_string().contains("only supports"));

        let put = Commands::PutStep { payload: "{}".to_string() };
        assert!(run_batch(config.clone(), put).await.is_err());
        let get = Commands::GetStep { step: "enrich".to_string() };
        assert!(run_batch(config, get).await.is_err());
    }

    #[tokio::test]
    async fn test_put_step_rejects_invalid_json_before_init() {
        let config = create_test_config(&dead_url().await);
        let err = run_full(config, Commands::PutStep { payload: "{".to_string() })
            .await
            .unwrap_err();
        // A network attempt would have produced a 604 envelope instead
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn test_failed_init_exits_non_zero() {
        let config = create_test_config(&dead_url().await);
        let envelope = run_full(config, Commands::Init).await.unwrap();
        assert_eq!(envelope.status_code, 604);
        assert!(!envelope.is_success());
        assert_eq!(exit_code(&envelope), 1);

        assert_eq!(exit_code(&Envelope::status(200)), 0);
    }

    #[tokio::test]
    async fn test_batch_init_failure_is_an_envelope() {
        let mut config = create_test_config(&dead_url().await);
        config.access_code = None;
        let envelope = run_batch(config, Commands::Init).await.unwrap();
        assert_eq!(envelope.status_code, 601);
        assert_eq!(exit_code(&envelope), 1);
    }

    #[test]
    fn test_bad_timeout_becomes_601_envelope() {
        let loaded = SessionConfig::from_lookup(|name| match name {
            "CA_WBS_TIMEOUT" => Some("soon".to_string()),
            _ => None,
        });
        let envelope = config_or_envelope(loaded).unwrap_err();
        assert_eq!(envelope.status_code, 601);
        assert!(envelope
            .error
            .as_ref()
            .and_then(Value::as_str)
            .map(|e| e.contains("CA_WBS_TIMEOUT"))
            .unwrap_or(false));
        assert_eq!(exit_code(&envelope), 1);
    }
}
