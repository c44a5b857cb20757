use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use trusty_poll_sync::channel::{Broadcaster, Detached, SocketChannel};
use trusty_poll_sync::commands::{self, Command, CommandError};
use trusty_poll_sync::db::Database;
use trusty_poll_sync::remote::HttpPollService;
use trusty_poll_sync::tasks::event_pump;
use trusty_poll_sync::{Config, VoteEngine};

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    // Vote ledger lives in the local database
    let database = match Database::new(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };
    match database.client_token().await {
        Ok(token) => info!("Client token: {}", token),
        Err(e) => warn!("Could not read client token: {}", e),
    }

    let service = match HttpPollService::new(config.api_url.clone(), config.request_timeout) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!("Failed to build poll service client: {}", e);
            return;
        }
    };

    // Without the push channel the client still works, just without live updates
    let (channel, inbound) = match SocketChannel::connect(&config.socket_url).await {
        Ok((channel, inbound)) => (Arc::new(channel) as Arc<dyn Broadcaster>, Some(inbound)),
        Err(e) => {
            warn!("Push channel unavailable, continuing without live updates: {}", e);
            (Arc::new(Detached) as Arc<dyn Broadcaster>, None)
        }
    };

    let engine = Arc::new(VoteEngine::new(database, service, channel));

    if let Err(e) = engine.load_polls().await {
        error!("Failed to load polls: {}", e);
    }

    // --- Start Background Task for Pushed Events ---
    if let Some(inbound) = inbound {
        let engine_clone = Arc::clone(&engine);
        tokio::spawn(async move {
            event_pump::run_inbound_events(engine_clone, inbound).await;
        });
    }

    println!("{}", commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };

        let command = match commands::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        // Failures are reported and the session carries on
        match commands::execute(&engine, command).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                warn!("Command failed: {}", e);
                println!("Error: {}", e);
            }
        }
    }

    info!("Shutting down");
}
