use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use reqwest::{Client, Response};
use shared::{
    domain::{Item, ItemId},
    error::{ApiError, ApiException},
    protocol::{
        item_route, items_route, subscribe_route, CreateItemRequest, CreateItemResponse,
        ServerEvent, UpdateItemRequest,
    },
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, info};
use url::Url;

use crate::{RemoteStore, SnapshotStream};

/// [`RemoteStore`] backed by the collection service over HTTP and WebSocket.
#[derive(Clone)]
pub struct HttpStore {
    http: Client,
    server_url: String,
}

impl HttpStore {
    pub fn new(server_url: &str) -> Result<Self> {
        let parsed = Url::parse(server_url.trim())
            .with_context(|| format!("invalid server url: {server_url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("server_url must start with http:// or https://");
        }
        Ok(Self {
            http: Client::new(),
            server_url: server_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn subscribe_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.server_url, subscribe_route()))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("cannot derive websocket url from {}", self.server_url))?;
        Ok(url)
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    /// The first connection must succeed. After that a dropped socket is
    /// reported as one stream error and re-established with backoff; the
    /// service sends a full snapshot on every connect.
    async fn subscribe_ordered(&self) -> Result<SnapshotStream> {
        let ws_url = self.subscribe_url()?;
        let reader = connect_snapshots(&ws_url).await?;
        let subscription = Subscription {
            ws_url,
            reader: Some(reader),
            backoff: RECONNECT_BACKOFF_INITIAL,
        };
        Ok(futures::stream::unfold(subscription, next_snapshot).boxed())
    }

    async fn create_item(&self, text: &str) -> Result<ItemId> {
        let res = self
            .http
            .post(format!("{}{}", self.server_url, items_route()))
            .json(&CreateItemRequest {
                text: text.to_string(),
            })
            .send()
            .await?;
        let body: CreateItemResponse = check_status(res).await?.json().await?;
        Ok(body.id)
    }

    async fn set_done(&self, id: &ItemId, done: bool) -> Result<()> {
        let res = self
            .http
            .patch(format!("{}{}", self.server_url, item_route(id)))
            .json(&UpdateItemRequest { done })
            .send()
            .await?;
        check_status(res).await?;
        Ok(())
    }

    async fn delete_item(&self, id: &ItemId) -> Result<()> {
        let res = self
            .http
            .delete(format!("{}{}", self.server_url, item_route(id)))
            .send()
            .await?;
        check_status(res).await?;
        Ok(())
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let res = self
            .http
            .get(format!("{}{}", self.server_url, items_route()))
            .send()
            .await?;
        Ok(check_status(res).await?.json().await?)
    }
}

const RECONNECT_BACKOFF_INITIAL: Duration = Duration::from_millis(200);
const RECONNECT_BACKOFF_MAX: Duration = Duration::from_secs(5);

type WsReader = BoxStream<'static, Result<Message, WsError>>;

struct Subscription {
    ws_url: Url,
    reader: Option<WsReader>,
    backoff: Duration,
}

async fn connect_snapshots(ws_url: &Url) -> Result<WsReader> {
    let (ws_stream, _) = connect_async(ws_url.as_str())
        .await
        .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
    debug!(%ws_url, "snapshot websocket connected");
    let (_, ws_reader) = ws_stream.split();
    Ok(ws_reader.boxed())
}

async fn next_snapshot(mut sub: Subscription) -> Option<(Result<Vec<Item>>, Subscription)> {
    loop {
        if sub.reader.is_none() {
            tokio::time::sleep(sub.backoff).await;
            match connect_snapshots(&sub.ws_url).await {
                Ok(reader) => {
                    info!(ws_url = %sub.ws_url, "snapshot websocket reconnected");
                    sub.reader = Some(reader);
                    sub.backoff = RECONNECT_BACKOFF_INITIAL;
                }
                Err(err) => {
                    sub.backoff = (sub.backoff * 2).min(RECONNECT_BACKOFF_MAX);
                    return Some((Err(err), sub));
                }
            }
        }
        let Some(reader) = sub.reader.as_mut() else {
            continue;
        };
        match reader.next().await {
            Some(Ok(Message::Text(text))) => return Some((parse_snapshot(&text), sub)),
            Some(Ok(Message::Close(_))) | None => {
                sub.reader = None;
                return Some((Err(anyhow!("snapshot websocket closed; reconnecting")), sub));
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => {
                sub.reader = None;
                return Some((Err(anyhow!(err).context("websocket receive failed")), sub));
            }
        }
    }
}

fn parse_snapshot(text: &str) -> Result<Vec<Item>> {
    let event: ServerEvent = serde_json::from_str(text).context("invalid server event")?;
    match event {
        ServerEvent::Snapshot { items } => Ok(items),
    }
}

/// Turns non-success responses into errors, keeping the service's message
/// when the body is an [`ApiError`].
async fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => Err(anyhow::Error::new(ApiException::from(api_error))
            .context(format!("server responded {status}"))),
        Err(_) => Err(anyhow!("server responded {status}: {body}")),
    }
}
