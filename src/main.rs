use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt, reload};

use wabridge::dispatcher::{self, Dispatcher, Flow};
use wabridge::{BroadcastMessage, Config, ReplayClient, events};

/// wabridge - forward messaging client events to webhooks
#[derive(Parser)]
#[command(name = "wabridge", version, about)]
struct Cli {
    /// Webhook URL (repeatable; overrides configuration)
    #[arg(short, long)]
    webhook: Vec<String>,

    /// Auto-reply text for direct messages
    #[arg(long, env = "WHATSAPP_AUTO_REPLY")]
    auto_reply: Option<String>,

    /// Newline-delimited JSON events to replay (default: stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Address of the logged-in account
    #[arg(long, env = "WHATSAPP_OWN_ID")]
    own_id: Option<String>,

    /// Display name of the logged-in account
    #[arg(long, env = "WHATSAPP_PUSH_NAME")]
    push_name: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging is up before config loads so file parse warnings are visible;
    // without -v the configured level replaces the startup filter afterwards
    let (filter, reload) =
        reload::Layer::new(EnvFilter::new(verbosity_filter(cli.verbose).unwrap_or("warn")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("fatal: {e}");
            return ExitCode::FAILURE;
        }
    };

    if verbosity_filter(cli.verbose).is_none() {
        if let Err(e) = reload.reload(EnvFilter::new(config.log_filter())) {
            tracing::warn!(error = %e, "failed to apply configured log level");
        }
    }

    match run(cli, config).await {
        Ok(Flow::Terminate) => dispatcher::terminate(),
        Ok(Flow::Continue) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Filter forced by `-v` flags; `None` defers to the configured log level
const fn verbosity_filter(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info,wabridge=debug"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

async fn run(cli: Cli, mut config: Config) -> anyhow::Result<Flow> {
    if !cli.webhook.is_empty() {
        config.webhooks = cli.webhook;
        config.validate()?;
    }
    if let Some(text) = cli.auto_reply {
        config.auto_reply = text;
    }

    tracing::info!(
        webhooks = config.webhooks.len(),
        own_id = ?cli.own_id,
        "starting wabridge"
    );

    let client = Arc::new(ReplayClient::new(cli.own_id, cli.push_name));
    let (notify_tx, notify_rx) = broadcast::channel(16);
    tokio::spawn(log_notifications(notify_rx));

    let dispatcher = Dispatcher::new(&config, client, notify_tx)?;

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let (event_tx, event_rx) = mpsc::channel(100);
    tokio::spawn(events::decode_stream(reader, event_tx));

    Ok(dispatcher.run(event_rx).await)
}

async fn log_notifications(mut rx: broadcast::Receiver<BroadcastMessage>) {
    loop {
        match rx.recv().await {
            Ok(message) => tracing::info!(code = %message.code, text = %message.message, "ui notification"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "ui notifications lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
