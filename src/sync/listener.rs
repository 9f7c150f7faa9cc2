use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::cursor::SyncCursor;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const LOG_TARGET: &str = "sync::listener";

/// Text frame the service sends on every table-state change. It carries no
/// payload; it only means "your copy is stale".
pub const STATE_CHANGED_TOKEN: &str = "NewState";

/// Subscribes to the per-table update endpoint and bumps the sync cursor
/// once per invalidation frame, plus once per attach to cover pushes sent
/// while unsubscribed. Owns nothing beyond the socket; every effect flows
/// through the cursor.
pub(super) struct StateUpdateListener {
    pub(super) endpoint: Url,
    pub(super) handshake_timeout: Duration,
    pub(super) reconnect_delay: Duration,
    pub(super) cursor: SyncCursor,
    pub(super) cancel: CancellationToken,
}

impl StateUpdateListener {
    pub(super) async fn run(self) {
        info!(target: LOG_TARGET, endpoint = %self.endpoint, "starting update listener");
        while !self.cancel.is_cancelled() {
            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => break,
                attempt = self.connect() => attempt,
            };

            match attempt {
                Ok(stream) => {
                    // Any push sent while no subscription existed is gone,
                    // whether that was an outage or the gap before the
                    // first attach; one bump covers it with a single pull.
                    let seq = self.cursor.bump();
                    debug!(target: LOG_TARGET, seq, "subscribed, forcing refresh");
                    self.pump(stream).await;
                }
                Err(err) => {
                    warn!(target: LOG_TARGET, error = %err, "failed to reach update endpoint");
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
            debug!(
                target: LOG_TARGET,
                delay_secs = self.reconnect_delay.as_secs_f32(),
                "waiting before reconnect attempt"
            );
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = sleep(self.reconnect_delay) => {}
            }
        }
        info!(target: LOG_TARGET, "update listener stopped");
    }

    async fn connect(&self) -> Result<WsStream> {
        let connect_fut = connect_async(self.endpoint.to_string());
        let (stream, _) = timeout(self.handshake_timeout, connect_fut)
            .await
            .context("update subscription handshake timed out")?
            .context("update subscription handshake failed")?;
        Ok(stream)
    }

    async fn pump(&self, stream: WsStream) {
        let (mut sink, mut source) = stream.split();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(target: LOG_TARGET, "shutdown signal received");
                    break;
                }
                frame = source.next() => {
                    match frame {
                        Some(Ok(frame)) if is_invalidation(&frame) => {
                            let seq = self.cursor.bump();
                            debug!(target: LOG_TARGET, seq, "state invalidated by push");
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            sink.send(Message::Pong(payload)).await.ok();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(target: LOG_TARGET, ?frame, "socket closed by server");
                            break;
                        }
                        Some(Ok(other)) => {
                            debug!(target: LOG_TARGET, frame = ?other, "ignoring unknown frame");
                        }
                        Some(Err(err)) => {
                            warn!(target: LOG_TARGET, error = %err, "websocket error");
                            break;
                        }
                        None => {
                            debug!(target: LOG_TARGET, "websocket stream ended");
                            break;
                        }
                    }
                }
            }
        }

        let _ = sink.close().await;
    }
}

/// Only the exact invalidation token counts; every other frame is noise the
/// client has to survive.
fn is_invalidation(frame: &Message) -> bool {
    matches!(frame, Message::Text(text) if text == STATE_CHANGED_TOKEN)
}
