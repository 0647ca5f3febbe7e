// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wicket status` command implementation.
//!
//! Probes the two external collaborators -- the REST backend and the STOMP
//! broker -- and reports reachability without touching any conversation.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tokio::time::timeout;

use wicket_api::ApiClient;
use wicket_broker::BrokerConnection;
use wicket_config::{ConfigCredentials, WicketConfig};
use wicket_core::error::WicketError;
use wicket_core::traits::{ConversationStore, CredentialProvider, PushChannel};
use wicket_core::types::ConnectionState;

/// Runs the `wicket status` probes.
pub async fn run_status(config: WicketConfig) -> Result<(), WicketError> {
    let credentials = ConfigCredentials::new(&config.auth);

    println!("{}", "wicket status".bold());
    println!("  broker url: {}", config.broker.url);
    println!("  api url:    {}", config.api.base_url);
    println!(
        "  credential: {}",
        if credentials.token().is_some() {
            "present".green()
        } else {
            "absent".red()
        }
    );

    probe_api(&config, &credentials).await;
    probe_broker(&config, Arc::new(credentials)).await;
    Ok(())
}

async fn probe_api(config: &WicketConfig, credentials: &ConfigCredentials) {
    match ApiClient::new(&config.api, credentials) {
        Err(e) => println!("  api:        {} ({e})", "error".red()),
        Ok(client) => match client.list_conversations().await {
            Ok(conversations) => println!(
                "  api:        {} ({} conversations visible)",
                "reachable".green(),
                conversations.len()
            ),
            Err(e) => println!("  api:        {} ({e})", "unreachable".red()),
        },
    }
}

async fn probe_broker(config: &WicketConfig, credentials: Arc<ConfigCredentials>) {
    if credentials.token().is_none() {
        println!(
            "  broker:     {} (no credential, connect not attempted)",
            "skipped".yellow()
        );
        return;
    }

    let connection = BrokerConnection::new(config.broker.clone(), credentials);
    let mut states = connection.state_changes();
    if connection.connect().await.is_err() {
        println!("  broker:     {}", "unreachable".red());
        return;
    }

    let wait = Duration::from_secs(config.broker.connect_timeout_secs + 1);
    let outcome = timeout(wait, states.wait_for(|s| *s == ConnectionState::Connected)).await;
    match outcome {
        Ok(Ok(_)) => println!("  broker:     {}", "reachable".green()),
        _ => println!(
            "  broker:     {} (no CONNECTED within {}s)",
            "unreachable".red(),
            wait.as_secs()
        ),
    }

    connection.disconnect().await;
}
