use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    screen::{CONFIRM_MESSAGE, EMPTY_STATE_TEXT},
    HttpStore, MirrorState, MirrorStatus, MutationGateway, RemoteStore,
    SyncMirror, TodoScreen,
};
use shared::domain::{Item, ItemId, MAX_ITEM_TEXT_CHARS};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    runtime::Handle,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "todolist", about = "Command-line client for the shared todo list")]
struct Args {
    #[arg(
        long,
        env = "TODOLIST_SERVER_URL",
        default_value = "http://127.0.0.1:8443"
    )]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the collection in display order.
    List,
    /// Add a pending item.
    Add { text: Vec<String> },
    /// Flip an item between pending and completed.
    Toggle { id: String },
    Remove { id: String },
    /// Remove every item, after confirmation.
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Follow the live collection until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let store = Arc::new(HttpStore::new(&args.server_url)?);
    let gateway = MutationGateway::new(store.clone(), Handle::current());

    match args.command {
        Command::List => {
            let items = store.list_items().await?;
            print_items(&items);
        }
        Command::Add { text } => {
            let text = text.join(" ");
            let Some(handle) = gateway.create(&text) else {
                bail!("item text must be non-empty and at most {MAX_ITEM_TEXT_CHARS} characters");
            };
            let id = handle.await??;
            println!("added {id}");
        }
        Command::Toggle { id } => {
            let item = find_item(store.as_ref(), &ItemId(id)).await?;
            gateway.toggle_done(item.id.clone(), item.done).await??;
            println!(
                "{} is now {}",
                item.id,
                if item.done { "pending" } else { "completed" }
            );
        }
        Command::Remove { id } => {
            gateway.delete_one(ItemId(id.clone())).await??;
            println!("removed {id}");
        }
        Command::Clear { yes } => {
            if !yes && !confirm_clear_all().await? {
                info!("clear all: cancel pressed");
                println!("nothing removed");
                return Ok(());
            }
            let report = gateway.delete_all().await??;
            println!(
                "removed {} of {} items",
                report.attempted - report.failed,
                report.attempted
            );
        }
        Command::Watch => watch(store).await?,
    }
    Ok(())
}

async fn find_item(store: &dyn RemoteStore, id: &ItemId) -> Result<Item> {
    store
        .list_items()
        .await?
        .into_iter()
        .find(|item| &item.id == id)
        .with_context(|| format!("no item with id {id}"))
}

async fn confirm_clear_all() -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{CONFIRM_MESSAGE} [y/N] ").as_bytes())
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn watch(store: Arc<HttpStore>) -> Result<()> {
    let mirror = SyncMirror::start(store, &Handle::current());
    let mut updates = mirror.subscribe();
    let mut screen = TodoScreen::new();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state: MirrorState = (*updates.borrow_and_update()).clone();
                match state.status {
                    MirrorStatus::Connecting => {}
                    MirrorStatus::Live => {
                        screen.apply_snapshot(state.items);
                        println!("{}", screen.header());
                        print_items(screen.items());
                    }
                    MirrorStatus::Ended => bail!("snapshot subscription ended"),
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

fn print_items(items: &[Item]) {
    if items.is_empty() {
        println!("{EMPTY_STATE_TEXT}");
        return;
    }
    for item in items {
        let mark = if item.done { 'x' } else { ' ' };
        println!("[{mark}] {}  {}", item.id, item.text);
    }
}
