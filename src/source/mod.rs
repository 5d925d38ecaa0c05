//! Contrat des sources de données consommées par le moteur
//!
//! Le moteur ne connaît que ces deux traits ; le transport concret (HTTP, WebSocket,
//! simulateur) reste interchangeable.

mod http;
mod simulator;
mod websocket;

pub use http::HttpSnapshotSource;
pub use simulator::Simulator;
pub use websocket::WebSocketFeed;

use crate::error::EngineResult;
use crate::models::{AlertEvent, StatsSnapshot, TrafficEvent};
use async_trait::async_trait;

/// Résultat complet d'un pull
#[derive(Debug, Clone, PartialEq)]
pub struct PullResult {
    pub events: Vec<TrafficEvent>,
    pub stats: StatsSnapshot,
    /// `None` si la source ne fournit pas la liste d'alertes
    pub alerts: Option<Vec<AlertEvent>>,
}

/// Élément livré par le flux push
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    Event(TrafficEvent),
    Alert(AlertEvent),
    Connected,
    Disconnected,
}

/// Source interrogée périodiquement (pull)
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Récupère l'état complet ; un échec ne doit rien laisser de partiel
    async fn pull(&self) -> EngineResult<PullResult>;

    /// Résout toutes les alertes côté serveur
    async fn clear_alerts(&self) -> EngineResult<()>;

    /// Télécharge le rapport exporté par le serveur
    async fn download_report(&self) -> EngineResult<Vec<u8>>;
}

/// Flux push d'événements, d'alertes et de transitions de connectivité
#[async_trait]
pub trait PushFeed: Send {
    /// Attend l'élément suivant ; `None` signifie que le flux est définitivement fermé
    async fn next(&mut self) -> Option<FeedItem>;
}
