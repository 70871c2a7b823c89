use crate::channel::SignalingChannel;
use crate::channel::channel_error::ChannelError;
use crate::channel::subscription::{SubscriberSet, Subscription};
use duet_core::{ClientMessage, ServerMessage};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// [`SignalingChannel`] over a websocket connection to the service.
pub struct WsChannel {
    outbound: mpsc::UnboundedSender<String>,
    subscribers: Arc<SubscriberSet>,
    send_task: JoinHandle<()>,
    recv_task: JoinHandle<()>,
}

impl WsChannel {
    pub async fn connect(url: &str) -> Result<Self, ChannelError> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        info!("Signaling connection open to {url}");

        let (mut sink, mut stream) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let subscribers = SubscriberSet::new();

        let send_task = tokio::spawn(async move {
            while let Some(json) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::text(json)).await {
                    error!("Failed to send client message: {e}");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let inbound = Arc::clone(&subscribers);
        let recv_task = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => match ServerMessage::decode(text.as_str()) {
                        Ok(msg) => inbound.publish(msg),
                        Err(e) => warn!("Invalid server message: {e}"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Signaling connection error: {e}");
                        break;
                    }
                }
            }
            debug!("Signaling connection closed by peer");
            inbound.close();
        });

        Ok(Self {
            outbound,
            subscribers,
            send_task,
            recv_task,
        })
    }
}

impl SignalingChannel for WsChannel {
    fn send(&self, msg: ClientMessage) -> Result<(), ChannelError> {
        let json = msg.encode()?;
        self.outbound.send(json).map_err(|_| ChannelError::Closed)
    }

    fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe()
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.send_task.abort();
        self.recv_task.abort();
        self.subscribers.close();
    }
}
