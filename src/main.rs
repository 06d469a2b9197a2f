use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pubsub_broker::client::BrokerClient;
use pubsub_broker::protocol::constants::DEFAULT_BIND_ADDR;
use pubsub_broker::registry::ChannelName;
use pubsub_broker::{BrokerServer, Error, ServerConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the broker.
    Serve(ServeArgs),
    /// Subscribe to a channel and print every payload received.
    Subscribe(SubscribeArgs),
    /// Send one or more payloads to a channel.
    Publish(PublishArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Socket address to bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    listen: SocketAddr,

    /// Seconds to wait for sessions to close on shutdown.
    #[arg(long, default_value_t = 5)]
    shutdown_timeout: u64,
}

#[derive(Args, Debug)]
struct SubscribeArgs {
    /// Broker address.
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    server: SocketAddr,

    /// Channel to subscribe to.
    #[arg(long)]
    channel: String,
}

#[derive(Args, Debug)]
struct PublishArgs {
    /// Broker address.
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    server: SocketAddr,

    /// Destination channel.
    #[arg(long)]
    channel: String,

    /// Channel this connection subscribes to while publishing.
    #[arg(long, default_value = "publishers")]
    subscribe: String,

    /// Payloads to send, one message each.
    #[arg(required = true)]
    messages: Vec<String>,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::Subscribe(args) => subscribe(args).await,
        Command::Publish(args) => publish(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = ServerConfig::with_addr(args.listen)
        .shutdown_timeout(std::time::Duration::from_secs(args.shutdown_timeout));
    let server = BrokerServer::bind(config)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;

    server.run_until_ctrl_c().await?;
    info!("bye!");
    Ok(())
}

async fn subscribe(args: SubscribeArgs) -> Result<()> {
    let mut client = BrokerClient::connect(args.server, args.channel)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    info!(channel = %client.channel(), "waiting for messages");

    loop {
        tokio::select! {
            received = client.recv() => match received {
                Ok(payload) => println!("{}", String::from_utf8_lossy(&payload)),
                Err(Error::TruncatedStream) => {
                    info!("broker closed the connection");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            },
            _ = tokio::signal::ctrl_c() => {
                return client.close().await.map_err(Into::into);
            }
        }
    }
}

async fn publish(args: PublishArgs) -> Result<()> {
    let mut client = BrokerClient::connect(args.server, args.subscribe)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    let destination = ChannelName::from(args.channel);

    for message in &args.messages {
        client
            .publish(&destination, message.as_bytes())
            .await
            .with_context(|| format!("failed to publish to {destination}"))?;
    }
    info!(channel = %destination, count = args.messages.len(), "published");

    client.close().await?;
    Ok(())
}
