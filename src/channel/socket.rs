use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

use super::packet::{self, Packet};
use super::{Broadcaster, InboundEvent, OutboundEvent};
use crate::error::ChannelError;

/// Push channel over a Socket.IO websocket.
///
/// Outbound frames are queued and written by a background task once the
/// server's handshake has arrived. Inbound events are handed out through the
/// receiver returned by [`SocketChannel::connect`] in arrival order.
#[derive(Clone)]
pub struct SocketChannel {
    outgoing: mpsc::UnboundedSender<String>,
}

impl SocketChannel {
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<InboundEvent>), ChannelError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        info!("Connected to push channel at {}", url);

        let (mut ws_writer, mut ws_reader) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<InboundEvent>();
        let (open_tx, open_rx) = oneshot::channel::<()>();

        // Writer task: hold frames until the transport is open, then join the
        // default namespace and forward the queue in order
        tokio::spawn(async move {
            if open_rx.await.is_err() {
                return;
            }
            if ws_writer.send(Message::Text(packet::CONNECT.into())).await.is_err() {
                warn!("Push channel closed before namespace connect");
                return;
            }
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = ws_writer.send(Message::Text(frame.into())).await {
                    warn!("Push channel write failed: {}", e);
                    break;
                }
            }
        });

        // Reader task: answer heartbeats and decode events
        let pong_tx = out_tx.clone();
        tokio::spawn(async move {
            let mut open_tx = Some(open_tx);
            while let Some(message) = ws_reader.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Push channel read failed: {}", e);
                        break;
                    }
                };

                match packet::decode(text.as_str()) {
                    Ok(Packet::Open(handshake)) => {
                        debug!("Push channel handshake: {}", handshake);
                        if let Some(tx) = open_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                    Ok(Packet::Ping(data)) => {
                        let _ = pong_tx.send(packet::pong(&data));
                    }
                    Ok(Packet::Connected) => info!("Joined push channel namespace"),
                    Ok(Packet::ConnectError(reason)) => warn!("Push channel refused connection: {}", reason),
                    Ok(Packet::Event { name, payload }) => match InboundEvent::decode(&name, payload) {
                        Ok(Some(event)) => {
                            if event_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Ok(None) => debug!("Ignoring push channel event {}", name),
                        Err(e) => warn!("Dropping malformed {} event: {}", name, e),
                    },
                    Ok(Packet::Close) | Ok(Packet::Disconnected) => break,
                    Ok(other) => debug!("Ignoring push channel frame {:?}", other),
                    Err(e) => warn!("Dropping push channel frame: {}", e),
                }
            }
            info!("Push channel disconnected");
        });

        Ok((Self { outgoing: out_tx }, event_rx))
    }
}

impl Broadcaster for SocketChannel {
    fn emit(&self, event: OutboundEvent) -> Result<(), ChannelError> {
        let frame = packet::encode_event(event.name(), event.payload()?)?;
        self.outgoing.send(frame).map_err(|_| ChannelError::Closed)
    }
}
