use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::Client;
use shared_types::{ContactId, PersonId, SyncResponse};

use bridge::error::ErrorResponse;
use bridge::repository::{IdentityStore, SqliteIdentityStore};

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Operate the WhatsApp/Spond availability bridge")]
#[command(
    long_about = "A command-line interface for the availability bridge.\n\n\
    Triggers invite runs against a running server and inspects or edits\n\
    the local phone number to Spond person mapping."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a running server to invite everyone who has not answered
    Sync {
        /// Bridge server URL.
        #[arg(
            short,
            long,
            default_value = "http://localhost:8080",
            env = "BRIDGE_API_URL"
        )]
        base_url: String,
    },
    /// Inspect or edit the phone number to person mapping
    Identity {
        /// Path of the SQLite database the server uses.
        #[arg(long, default_value = "app.db", env = "DB_PATH")]
        db_path: String,

        #[command(subcommand)]
        action: IdentityAction,
    },
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Show the person linked to a phone number
    Get {
        /// Phone number, with or without the leading '+'.
        phone: String,
    },
    /// Link a phone number to a Spond person id, replacing any existing link
    Link { phone: String, person_id: String },
    /// List every mapping
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { base_url } => handle_sync(&Client::new(), &base_url).await?,
        Commands::Identity { db_path, action } => handle_identity(&db_path, action).await?,
    }

    Ok(())
}

async fn handle_sync(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let url = format!("{}/sync-and-invite", base_url.trim_end_matches('/'));
    let response = client
        .post(&url)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    if !response.status().is_success() {
        let status = response.status();
        let body: ErrorResponse = response
            .json()
            .await
            .with_context(|| format!("Sync failed with status {}", status))?;
        anyhow::bail!(
            "{}: {}",
            body.error,
            body.details.unwrap_or_else(|| status.to_string())
        );
    }

    let summary: SyncResponse = response.json().await?;
    println!(
        "Events seen: {}, invites sent: {}",
        summary.events_seen, summary.invites_sent
    );
    for skipped in &summary.skipped {
        println!(
            "  skipped {} on {}: {}",
            skipped.person_id, skipped.event_id, skipped.reason
        );
    }

    Ok(())
}

async fn handle_identity(db_path: &str, action: IdentityAction) -> anyhow::Result<()> {
    let store = SqliteIdentityStore::open(db_path).await?;
    let contact =
        |raw: &str| ContactId::normalise(raw).with_context(|| format!("Invalid phone: {:?}", raw));

    match action {
        IdentityAction::Get { phone } => {
            let contact = contact(&phone)?;
            match store.person_for(&contact).await? {
                Some(person) => println!("{} -> {}", contact, person),
                None => println!("{} is not linked to any person.", contact),
            }
        }
        IdentityAction::Link { phone, person_id } => {
            let contact = contact(&phone)?;
            store.upsert(&contact, &PersonId::new(person_id.clone())).await?;
            println!("Linked {} -> {}", contact, person_id);
        }
        IdentityAction::List => {
            let mappings = store.list().await?;
            if mappings.is_empty() {
                println!("No mappings found.");
            } else {
                for (contact, person) in mappings {
                    println!("{} -> {}", contact, person);
                }
            }
        }
    }

    Ok(())
}
