//! Todo collection service: REST mutations plus a WebSocket that pushes the
//! full ordered collection after every committed change.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use shared::{
    domain::{Item, ItemId},
    error::{ApiError, ErrorCode},
    protocol::{CreateItemRequest, CreateItemResponse, ServerEvent, UpdateItemRequest},
};
use tracing::warn;

pub mod api;
pub mod app_state;
pub mod config;

use app_state::AppState;

type ApiFailure = (StatusCode, Json<ApiError>);

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/items", get(http_list_items).post(http_create_item))
        .route(
            "/items/:item_id",
            patch(http_update_item).delete(http_delete_item),
        )
        .route("/ws", get(ws_handler))
        .with_state(state)
}

fn failure(err: ApiError) -> ApiFailure {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiFailure> {
    state.api.storage.health_check().await.map_err(|e| {
        failure(ApiError::new(ErrorCode::Internal, e.to_string()))
    })?;
    Ok("ok")
}

async fn http_list_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Item>>, ApiFailure> {
    let items = api::list_items(&state.api).await.map_err(failure)?;
    Ok(Json(items))
}

async fn http_create_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<CreateItemResponse>), ApiFailure> {
    let id = api::create_item(&state.api, &req.text)
        .await
        .map_err(failure)?;
    Ok((StatusCode::CREATED, Json(CreateItemResponse { id })))
}

async fn http_update_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<StatusCode, ApiFailure> {
    api::set_done(&state.api, &ItemId(item_id), req.done)
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_delete_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    api::delete_item(&state.api, &ItemId(item_id))
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();

    let (initial, mut events_rx) = match state.api.subscribe().await {
        Ok(subscription) => subscription,
        Err(err) => {
            warn!(error = %err.message, "failed to load initial snapshot for subscriber");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let ctx = state.api.clone();
    let send_task = tokio::spawn(async move {
        if send_event(&mut sender, &initial).await.is_err() {
            return;
        }
        while let Some(event) = api::next_event(&ctx, &mut events_rx).await {
            if send_event(&mut sender, &event).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> anyhow::Result<()> {
    let text = serde_json::to_string(event)?;
    sender.send(Message::Text(text)).await?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
