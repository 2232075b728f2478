use std::sync::Arc;

use client_core::{Mutation, MirrorStatus};
use crossbeam_channel::bounded;
use shared::domain::{Item, ItemId};

use super::TodoApp;
use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

fn item(id: &str, text: &str, done: bool) -> Item {
    Item {
        id: ItemId::from(id),
        text: text.to_string(),
        done,
    }
}

#[test]
fn snapshot_events_replace_the_rendered_list() {
    let (cmd_tx, _cmd_rx) = bounded(8);
    let (ui_tx, ui_rx) = bounded(8);
    let mut app = TodoApp::new(cmd_tx, ui_rx);

    ui_tx
        .send(UiEvent::Snapshot {
            items: Arc::from(vec![item("a", "Apple", false), item("b", "Banana", true)]),
            status: MirrorStatus::Live,
        })
        .expect("send");
    app.process_ui_events();
    assert_eq!(app.screen.header(), "Todolist (2)");
    assert_eq!(app.status, "Live");

    ui_tx
        .send(UiEvent::Snapshot {
            items: Arc::from(Vec::new()),
            status: MirrorStatus::Live,
        })
        .expect("send");
    app.process_ui_events();
    assert!(app.screen.is_empty());
}

#[test]
fn ended_subscription_keeps_last_items() {
    let (cmd_tx, _cmd_rx) = bounded(8);
    let (ui_tx, ui_rx) = bounded(8);
    let mut app = TodoApp::new(cmd_tx, ui_rx);

    ui_tx
        .send(UiEvent::Snapshot {
            items: Arc::from(vec![item("a", "Apple", false)]),
            status: MirrorStatus::Ended,
        })
        .expect("send");
    app.process_ui_events();
    assert_eq!(app.screen.items().len(), 1);
    assert!(app.status.contains("ended"));
}

#[test]
fn submitting_queues_one_create_and_clears_input() {
    let (cmd_tx, cmd_rx) = bounded(8);
    let (_ui_tx, ui_rx) = bounded(8);
    let mut app = TodoApp::new(cmd_tx, ui_rx);

    app.screen.set_draft("  Buy milk ");
    app.submit_draft();
    app.screen.set_draft("   ");
    app.submit_draft();

    assert_eq!(
        cmd_rx.try_recv().expect("queued"),
        BackendCommand::Mutate(Mutation::Create {
            text: "Buy milk".to_string()
        })
    );
    assert!(cmd_rx.try_recv().is_err());
    assert_eq!(app.screen.draft(), "   ");
}

#[test]
fn backend_startup_failure_disables_input() {
    let (cmd_tx, _cmd_rx) = bounded(8);
    let (ui_tx, ui_rx) = bounded(8);
    let mut app = TodoApp::new(cmd_tx, ui_rx);

    ui_tx
        .send(UiEvent::Error(UiError::from_message(
            UiErrorContext::BackendStartup,
            "backend worker startup failure: invalid server url: nope",
        )))
        .expect("send");
    app.process_ui_events();
    assert!(!app.backend_available);
    assert!(app.status.contains("invalid server url"));
}

#[test]
fn full_command_queue_is_reported_in_status() {
    let (cmd_tx, _cmd_rx) = bounded(1);
    let (_ui_tx, ui_rx) = bounded(8);
    let mut app = TodoApp::new(cmd_tx, ui_rx);

    app.send(Mutation::DeleteAll);
    app.send(Mutation::DeleteAll);
    assert_eq!(app.status, "UI command queue is full; please retry");
}

#[test]
fn draft_survives_when_create_cannot_be_queued() {
    let (cmd_tx, cmd_rx) = bounded(1);
    let (_ui_tx, ui_rx) = bounded(8);
    let mut app = TodoApp::new(cmd_tx, ui_rx);
    app.send(Mutation::DeleteAll);

    app.screen.set_draft("Buy milk");
    app.submit_draft();
    assert_eq!(app.screen.draft(), "Buy milk");
    assert_eq!(app.status, "UI command queue is full; please retry");

    assert_eq!(
        cmd_rx.try_recv().expect("queued"),
        BackendCommand::Mutate(Mutation::DeleteAll)
    );
    app.submit_draft();
    assert_eq!(app.screen.draft(), "");
    assert_eq!(
        cmd_rx.try_recv().expect("queued"),
        BackendCommand::Mutate(Mutation::Create {
            text: "Buy milk".to_string()
        })
    );
}

#[test]
fn draft_survives_when_backend_is_gone() {
    let (cmd_tx, cmd_rx) = bounded(8);
    let (_ui_tx, ui_rx) = bounded(8);
    let mut app = TodoApp::new(cmd_tx, ui_rx);
    drop(cmd_rx);

    app.screen.set_draft("Walk dog");
    app.submit_draft();
    assert_eq!(app.screen.draft(), "Walk dog");
    assert!(app.status.contains("disconnected"));
}
