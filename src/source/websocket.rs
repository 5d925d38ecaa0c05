use super::{FeedItem, PushFeed};
use crate::config::Config;
use crate::wire;
use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use rand::Rng;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Flux push sur WebSocket, avec reconnexion automatique.
///
/// Chaque perte de connexion est signalée une seule fois par `FeedItem::Disconnected`,
/// puis la reconnexion est retentée jusqu'au succès (`FeedItem::Connected`).
pub struct WebSocketFeed {
    url: String,
    reconnect_delay: Duration,
    stream: Option<WsStream>,
    reported_down: bool,
}

impl WebSocketFeed {
    pub fn new(config: &Config) -> Self {
        Self {
            url: config.ws_url.clone(),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            stream: None,
            reported_down: false,
        }
    }

    async fn wait_before_retry(&self) {
        // Léger décalage aléatoire pour ne pas reconnecter tous les clients en même temps
        let jitter = rand::rng().random_range(0..=250);
        tokio::time::sleep(self.reconnect_delay + Duration::from_millis(jitter)).await;
    }

    fn mark_down(&mut self) -> Option<FeedItem> {
        self.stream = None;
        if self.reported_down {
            None
        } else {
            self.reported_down = true;
            Some(FeedItem::Disconnected)
        }
    }
}

#[async_trait]
impl PushFeed for WebSocketFeed {
    async fn next(&mut self) -> Option<FeedItem> {
        loop {
            let Some(stream) = self.stream.as_mut() else {
                match connect_async(self.url.as_str()).await {
                    Ok((stream, _)) => {
                        info!("Flux push connecté à {}", self.url);
                        self.stream = Some(stream);
                        self.reported_down = false;
                        return Some(FeedItem::Connected);
                    }
                    Err(e) => {
                        warn!("Connexion au flux push impossible ({}): {}", self.url, e);
                        if let Some(item) = self.mark_down() {
                            return Some(item);
                        }
                        self.wait_before_retry().await;
                        continue;
                    }
                }
            };

            match stream.next().await {
                Some(Ok(Message::Text(text))) => match wire::decode_push_message(&text) {
                    Ok(Some(item)) => return Some(item),
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("Message push ignoré: {}", e);
                        continue;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("Flux push fermé par le serveur: {:?}", frame);
                    if let Some(item) = self.mark_down() {
                        return Some(item);
                    }
                }
                Some(Ok(_)) => {
                    debug!("Trame de contrôle ou binaire ignorée");
                }
                Some(Err(e)) => {
                    warn!("Erreur sur le flux push: {}", e);
                    if let Some(item) = self.mark_down() {
                        return Some(item);
                    }
                }
                None => {
                    if let Some(item) = self.mark_down() {
                        return Some(item);
                    }
                }
            }
        }
    }
}
