use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use shared::domain::normalize_item_text;
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Direct maintenance of a collection database, bypassing the service.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/todolist.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert one pending item per argument.
    Seed {
        #[arg(required = true)]
        texts: Vec<String>,
    },
    List,
    /// Delete every item.
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Seed { texts } => {
            for raw in texts {
                let text = normalize_item_text(&raw)
                    .map_err(|rejection| anyhow!("cannot seed {raw:?}: {rejection}"))?;
                let id = storage.create_item(&text).await?;
                println!("created item_id={id}");
            }
        }
        Command::List => {
            for item in storage.list_items().await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    item.id,
                    if item.done { "done" } else { "pending" },
                    item.created_at.to_rfc3339(),
                    item.text
                );
            }
        }
        Command::Purge => {
            let removed = storage.delete_all_items().await?;
            info!(removed, database_url = %cli.database_url, "purged collection");
            println!("removed {removed} items");
        }
    }

    Ok(())
}
