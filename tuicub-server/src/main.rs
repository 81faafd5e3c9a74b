//! The tuicub server binary: `api` runs the HTTP API process, `events` runs
//! the events and messages server.

mod api;
mod auth;
mod config;
mod events;
mod logging;
mod messages;
mod services;
mod store;

use anyhow::{Context, Result};
use api::AppState;
use clap::{Parser, Subcommand};
use config::Config;
use events::{EventsApiClient, EventsServer};
use messages::{MessagesClient, MessagesService};
use services::Services;
use std::net::SocketAddr;
use std::sync::Arc;
use store::Store;
use tokio::net::TcpListener;
use tracing::info;
use warp::Filter;

#[derive(Debug, Parser)]
#[command(name = "tuicubserver", about = "The authoritative tuicub game server.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the API server.
    Api {
        /// Host to bind to.
        #[arg(long, default_value = "0.0.0.0", value_parser = parse_host)]
        host: String,

        /// Port to bind to.
        #[arg(short, long, default_value_t = 5000)]
        port: u16,
    },

    /// Start the events and messages server.
    Events {
        /// Host to bind the events server to.
        #[arg(long, default_value = "0.0.0.0", value_parser = parse_host)]
        events_host: String,

        /// Port to bind the events server to.
        #[arg(long, default_value_t = 23432)]
        events_port: u16,

        /// Host to bind the messages server to.
        #[arg(long, default_value = "0.0.0.0", value_parser = parse_host)]
        messages_host: String,

        /// Port to bind the messages server to.
        #[arg(long, default_value_t = 23433)]
        messages_port: u16,

        /// Base URL of the API for disconnect callbacks.
        #[arg(long, default_value = "https://api.tuicub.com")]
        api_url: String,
    },
}

fn parse_host(raw: &str) -> Result<String, String> {
    if config::is_host_valid(raw) {
        Ok(raw.to_string())
    } else {
        Err("Host has an invalid format.".to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    logging::init(&config.logfile_path)?;

    match cli.command {
        Command::Api { host, port } => run_api(config, &host, port).await,
        Command::Events {
            events_host,
            events_port,
            messages_host,
            messages_port,
            api_url,
        } => {
            run_events(
                config,
                &events_host,
                events_port,
                &messages_host,
                messages_port,
                api_url,
            )
            .await
        }
    }
}

async fn run_api(config: Config, host: &str, port: u16) -> Result<()> {
    let store = Store::open(&config.db_path)?;
    let services = Services::new(&config);
    let messages = MessagesService::new(MessagesClient::new(
        config.messages_host.clone(),
        config.messages_port,
        config.messages_secret.clone(),
    ));

    let state = Arc::new(AppState {
        store,
        services,
        messages,
    });

    let addr = resolve(host, port).await?;
    info!(%addr, "Starting tuicub api server");
    warp::serve(api::routes(state).recover(api::handle_rejection))
        .run(addr)
        .await;
    Ok(())
}

async fn run_events(
    config: Config,
    events_host: &str,
    events_port: u16,
    messages_host: &str,
    messages_port: u16,
    api_url: String,
) -> Result<()> {
    let store = Store::open(&config.db_path)?;
    let auth = auth::AuthService::new(
        config.events_secret.clone(),
        config.messages_secret.clone(),
    );
    let server = EventsServer::new(
        store,
        auth,
        EventsApiClient::new(api_url, config.events_secret.clone()),
    );

    let clients = TcpListener::bind(resolve(events_host, events_port).await?)
        .await
        .context("Failed to bind the events listener")?;
    let bus = TcpListener::bind(resolve(messages_host, messages_port).await?)
        .await
        .context("Failed to bind the messages listener")?;

    info!("Starting tuicub events server");
    tokio::join!(
        Arc::clone(&server).listen_clients(clients),
        server.listen_bus(bus),
    );
    Ok(())
}

/// Resolves a host and port to a bindable socket address.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("No addresses for {host}:{port}"))
}
