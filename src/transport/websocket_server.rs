use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt, future};
use tracing::{debug, error, info, warn};

use crate::{
    protocol::OutgoingMessage,
    server::{AppState, AuthError, ControlConnection, Identity, authenticate},
};

/// GET / (WebSocket upgrade)
///
/// The upgrade is always accepted; failed handshakes are answered with a close
/// frame carrying the 4000/4001 code before anything else is read.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Incoming websocket connection request from {}", remote);
    let auth = authenticate(&headers, remote, &state.config.server.password);
    ws.on_upgrade(move |socket| handle_socket(socket, state, remote, auth))
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    remote: SocketAddr,
    auth: Result<Identity, AuthError>,
) {
    let identity = match auth {
        Ok(identity) => identity,
        Err(err) => {
            error!("Websocket connection from {} rejected: {}", remote, err);
            let frame = CloseFrame {
                code: err.close_code(),
                reason: err.reason().into(),
            };
            if let Err(e) = socket.send(Message::Close(Some(frame))).await {
                debug!("Could not send close frame to {}: {}", remote, e);
            }
            return;
        },
    };

    let (mut sender, receiver) = socket.split();
    let (tx, rx) = flume::unbounded::<OutgoingMessage>();

    let writer_name = identity.client_name.clone();
    let writer = tokio::spawn(async move {
        while let Ok(message) = rx.recv_async().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize event for <{}>: {}", writer_name, e);
                    continue;
                },
            };
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                warn!("Socket send error for <{}>: {}", writer_name, e);
                break;
            }
        }
        let _ = sender.close().await;
    });

    let reader_name = identity.client_name.clone();
    let inbound = receiver
        .take_while(move |message| {
            let open = match message {
                Ok(Message::Close(_)) => false,
                Err(e) => {
                    warn!("Websocket error from <{}>: {}", reader_name, e);
                    false
                },
                Ok(_) => true,
            };
            future::ready(open)
        })
        .filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(text.as_str().to_owned()),
                Ok(Message::Binary(bytes)) => String::from_utf8(bytes.to_vec()).ok(),
                _ => None,
            })
        });

    let connection = ControlConnection::register(state, identity, tx);
    connection.run(Box::pin(inbound)).await;

    if let Err(e) = writer.await {
        debug!("Writer task ended abnormally: {}", e);
    }
}
