mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use backend_bridge::{commands::BackendCommand, runtime::BackendTarget};
use controller::events::UiEvent;
use ui::TodoApp;

#[derive(Parser, Debug)]
#[command(name = "todolist-gui")]
struct Args {
    #[arg(
        long,
        env = "TODOLIST_SERVER_URL",
        default_value = "http://127.0.0.1:8443"
    )]
    server_url: String,
    /// Keep the list in this process instead of connecting to a server.
    #[arg(long)]
    memory: bool,
}

impl Args {
    fn target(&self) -> BackendTarget {
        if self.memory {
            BackendTarget::InMemory
        } else {
            BackendTarget::Remote {
                server_url: self.server_url.clone(),
            }
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(args.target(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Todolist")
            .with_inner_size([480.0, 640.0])
            .with_min_inner_size([360.0, 420.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Todolist",
        options,
        Box::new(|_cc| Ok(Box::new(TodoApp::new(cmd_tx, ui_rx)))),
    )
}
