use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use server::{api::ApiContext, app_state::AppState, build_router};
use shared::{
    domain::{Item, ItemId},
    error::{ApiException, ErrorCode},
    protocol::ServerEvent,
};
use storage::Storage;
use tokio::{net::TcpListener, runtime::Handle};

use crate::{
    test_support::{texts, wait_for_mirror},
    HttpStore, MirrorStatus, MutationGateway, RemoteStore, SyncMirror,
};

async fn spawn_collection_service() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let storage = Storage::new("sqlite::memory:").await?;
    let state = AppState {
        api: ApiContext::new(storage, 32),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = build_router(Arc::new(state));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn client(server_url: &str) -> (Arc<HttpStore>, SyncMirror, MutationGateway) {
    let store = Arc::new(HttpStore::new(server_url).expect("store"));
    let mirror = SyncMirror::start(store.clone(), &Handle::current());
    let gateway = MutationGateway::new(store.clone(), Handle::current());
    (store, mirror, gateway)
}

#[test]
fn rejects_non_http_server_urls() {
    assert!(HttpStore::new("ftp://example.com").is_err());
    assert!(HttpStore::new("not a url").is_err());
    let store = HttpStore::new(" http://127.0.0.1:8443/ ").expect("valid");
    assert_eq!(store.server_url(), "http://127.0.0.1:8443");
}

#[tokio::test]
async fn first_snapshot_arrives_without_any_write() {
    let server_url = spawn_collection_service().await.expect("spawn service");
    let (_, mirror, _) = client(&server_url);

    let state = wait_for_mirror(&mirror, |state| state.status == MirrorStatus::Live).await;
    assert!(state.items.is_empty());
    assert_eq!(state.revision, 1);
}

#[tokio::test]
async fn create_toggle_delete_round_trip_through_service() {
    let server_url = spawn_collection_service().await.expect("spawn service");
    let (_, mirror, gateway) = client(&server_url);
    wait_for_mirror(&mirror, |state| state.status == MirrorStatus::Live).await;

    gateway
        .create("  Buy milk ")
        .expect("issued")
        .await
        .expect("join")
        .expect("created");
    let state = wait_for_mirror(&mirror, |state| state.items.len() == 1).await;
    let created = state.items[0].clone();
    assert_eq!(created.text, "Buy milk");
    assert!(!created.done);

    gateway
        .toggle_done(created.id.clone(), created.done)
        .await
        .expect("join")
        .expect("toggled");
    wait_for_mirror(&mirror, |state| {
        state.items.first().is_some_and(|item| item.done)
    })
    .await;

    gateway
        .delete_one(created.id)
        .await
        .expect("join")
        .expect("deleted");
    wait_for_mirror(&mirror, |state| state.items.is_empty()).await;
}

#[tokio::test]
async fn snapshots_are_ordered_by_text() {
    let server_url = spawn_collection_service().await.expect("spawn service");
    let (store, mirror, _) = client(&server_url);

    for text in ["Cherry", "Apple", "Banana"] {
        store.create_item(text).await.expect("create");
    }

    let state = wait_for_mirror(&mirror, |state| state.items.len() == 3).await;
    assert_eq!(texts(&state.items), vec!["Apple", "Banana", "Cherry"]);
    assert_eq!(
        texts(&store.list_items().await.expect("list")),
        vec!["Apple", "Banana", "Cherry"]
    );
}

#[tokio::test]
async fn clients_observe_each_others_writes() {
    let server_url = spawn_collection_service().await.expect("spawn service");
    let (_, first_mirror, first_gateway) = client(&server_url);
    let (_, second_mirror, second_gateway) = client(&server_url);

    first_gateway
        .create("Walk dog")
        .expect("issued")
        .await
        .expect("join")
        .expect("created");
    let seen = wait_for_mirror(&second_mirror, |state| state.items.len() == 1).await;
    assert_eq!(texts(&seen.items), vec!["Walk dog"]);

    let report = second_gateway
        .delete_all()
        .await
        .expect("join")
        .expect("bulk delete");
    assert_eq!(report.attempted, 1);
    assert_eq!(report.failed, 0);
    wait_for_mirror(&first_mirror, |state| {
        state.revision > 1 && state.items.is_empty()
    })
    .await;
}

#[tokio::test]
async fn unknown_ids_surface_not_found() {
    let server_url = spawn_collection_service().await.expect("spawn service");
    let store = HttpStore::new(&server_url).expect("store");
    let missing = ItemId::from("does-not-exist");

    let err = store.set_done(&missing, true).await.expect_err("404");
    let api = err.downcast_ref::<ApiException>().expect("api error");
    assert_eq!(api.code, ErrorCode::NotFound);

    assert!(store.delete_item(&missing).await.is_err());
}

#[tokio::test]
async fn blank_text_is_rejected_by_the_service() {
    let server_url = spawn_collection_service().await.expect("spawn service");
    let store = HttpStore::new(&server_url).expect("store");

    let err = store.create_item("   ").await.expect_err("400");
    let api = err.downcast_ref::<ApiException>().expect("api error");
    assert_eq!(api.code, ErrorCode::Validation);
    assert!(store.list_items().await.expect("list").is_empty());
}

#[tokio::test]
async fn unreachable_service_ends_the_mirror() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let (_, mirror, _) = client(&format!("http://{addr}"));
    let state = wait_for_mirror(&mirror, |state| state.status == MirrorStatus::Ended).await;
    assert!(state.items.is_empty());
}

/// Serves one snapshot naming the connection number, then closes the socket.
async fn spawn_closing_subscription_service() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let connections = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/ws", get(one_snapshot_then_close))
        .with_state(connections);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

async fn one_snapshot_then_close(
    ws: WebSocketUpgrade,
    State(connections): State<Arc<AtomicUsize>>,
) -> impl IntoResponse {
    let connection = connections.fetch_add(1, Ordering::SeqCst) + 1;
    ws.on_upgrade(move |socket| send_and_close(socket, connection))
}

async fn send_and_close(mut socket: WebSocket, connection: usize) {
    let event = ServerEvent::Snapshot {
        items: vec![Item {
            id: ItemId(format!("conn-{connection}")),
            text: format!("connection {connection}"),
            done: false,
        }],
    };
    if let Ok(text) = serde_json::to_string(&event) {
        let _ = socket.send(Message::Text(text)).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}

#[tokio::test]
async fn dropped_subscription_reconnects_and_resumes() {
    let server_url = spawn_closing_subscription_service()
        .await
        .expect("spawn service");
    let (_, mirror, _) = client(&server_url);

    let first = wait_for_mirror(&mirror, |state| state.status == MirrorStatus::Live).await;
    assert_eq!(first.items.len(), 1);
    assert!(first.items[0].text.starts_with("connection "));

    let resumed = wait_for_mirror(&mirror, |state| {
        texts(&state.items) == vec!["connection 2"]
    })
    .await;
    assert_eq!(resumed.status, MirrorStatus::Live);
    assert!(resumed.revision >= 2);
}
