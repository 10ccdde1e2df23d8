use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use server_sentinel::{
    actors::{
        dispatcher::DispatchHandle, poller::PollHandle, rate_limit::RateLimitHandle,
        subscriber::SubscriberHandle,
    },
    commands::CommandHandler,
    config::read_config_file,
    gateway::DiscordGateway,
    probe::HttpProber,
    subscribers::SubscriberStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("server_sentinel", LevelFilter::TRACE),
        ("sentinel", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    dotenv::dotenv().ok();

    let args = Args::parse();
    trace!("started with args: {args:?}");

    // Fatal before any actor spawns: malformed config, missing token, or
    // an unusable subscriber file all abort startup.
    let config = read_config_file(&args.file)?;
    let token = std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?;
    let store = SubscriberStore::load_or_init(&config.data_file).await?;

    let (event_tx, _) = broadcast::channel(256);

    let poller = PollHandle::spawn(
        config.servers.clone(),
        Arc::new(HttpProber::new()),
        Duration::from_millis(config.poll_interval_ms),
        event_tx.clone(),
    );
    let subscribers = SubscriberHandle::spawn(store);
    let rate_limiter = RateLimitHandle::spawn(config.rate_limit.clone());
    let dispatcher = DispatchHandle::spawn(
        event_tx.subscribe(),
        subscribers.clone(),
        Arc::new(DiscordGateway::new(token)),
    );

    let commands = CommandHandler::new(poller.clone(), subscribers.clone(), rate_limiter.clone());
    tokio::spawn(console(commands));

    info!(
        "sentinel started, watching {} server(s) every {}ms",
        config.servers.len(),
        config.poll_interval_ms
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    poller.shutdown().await;
    dispatcher.shutdown().await;
    rate_limiter.shutdown().await;
    subscribers.shutdown().await;

    Ok(())
}

/// Minimal local command console: reads one command per stdin line and
/// prints the reply. The chat-platform client routes its messages into
/// [`CommandHandler::handle`] the same way.
async fn console(commands: CommandHandler) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(reply) = commands.handle("console", &line).await {
                    println!("{reply}");
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("failed to read from stdin: {e}");
                break;
            }
        }
    }
}
