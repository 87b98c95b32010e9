//! RaceChat terminal client - Main entry point.
//!
//! Reads lines from stdin and posts them to the channel; prints chat lines,
//! state changes and errors as they arrive. `/reconnect` forces a fresh
//! connection and `/quit` exits.

use std::collections::HashSet;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use racechat_client::{ChatClient, ChatConfig, ChatParams, Identity};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Logs go to stderr so they never interleave with chat lines.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "racechat_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ChatConfig::from_env().context("invalid chat configuration")?;
    let channel_id = std::env::var("RACECHAT_CHANNEL").context("RACECHAT_CHANNEL must be set")?;
    let identity = match (std::env::var("RACECHAT_USER"), std::env::var("RACECHAT_TOKEN")) {
        (Ok(user_id), Ok(token)) => Some(Identity::new(user_id, token)),
        _ => None,
    };

    tracing::info!(
        endpoint = %config.endpoint,
        channel_id = %channel_id,
        authenticated = identity.is_some(),
        "Starting RaceChat client"
    );

    let client = ChatClient::connect(config, ChatParams::new(channel_id).with_identity(identity));
    let mut messages = client.subscribe_messages();
    let mut errors = client.subscribe_errors();
    let mut state = client.state_observer();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
                for message in messages.borrow_and_update().messages() {
                    if printed.insert(message.id.clone()) {
                        println!(
                            "[{}] {}: {}",
                            message.created_at.format("%H:%M:%S"),
                            message.author_name,
                            message.text
                        );
                    }
                }
            }
            changed = errors.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(error) = errors.borrow_and_update().as_deref() {
                    eprintln!("! {error}");
                }
            }
            new_state = state.changed() => match new_state {
                Some(new_state) => eprintln!("* {new_state}"),
                None => break,
            },
            line = lines.next_line() => match line.context("failed to read stdin")? {
                None => break,
                Some(line) => match line.trim() {
                    "" => {}
                    "/quit" => break,
                    "/reconnect" => client.reconnect()?,
                    text => {
                        if let Err(e) = client.send_message(text) {
                            eprintln!("! {e}");
                        }
                    }
                },
            },
        }
    }

    tracing::info!("Shutting down");
    client.shutdown().await;
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Local overrides win.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
