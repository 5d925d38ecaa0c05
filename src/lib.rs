//! Bibliothèque CyberShield : client de supervision du trafic réseau
//!
//! Le serveur classifie le trafic (normal, suspect, attaque) ; ce client réconcilie
//! deux canaux de données, un pull périodique faisant autorité et un flux push
//! incrémental, en un état cohérent prêt à être affiché.

// Modèle et format d'échange
pub mod models; // Événements, alertes, statistiques
pub mod wire;   // Décodage et validation des données reçues
pub mod error;  // Erreurs du moteur

// Réconciliation et projection
pub mod engine;      // Fusion pull/push, fenêtre bornée, alertes
pub mod aggregator;  // Répartition en pourcentages
pub mod filter_view; // Filtrage et pagination

// Transport et exécution
pub mod source;   // Sources pull et flux push (HTTP, WebSocket, simulateur)
pub mod services; // Tâches du tableau de bord

// Modules utilitaires
pub mod config;
pub mod log_mode;
pub mod logger;
pub mod presenter;
pub mod cli;

pub use config::Config;
pub use engine::{EngineSettings, EngineView, ReconciliationEngine};
pub use error::{EngineError, EngineResult};
pub use filter_view::{EventFilter, Page, PageRequest, ViewState};
pub use log_mode::LogMode;
pub use models::{AlertEvent, ConnectionState, Protocol, Severity, StatsSnapshot, TrafficEvent, TrafficStatus};
pub use services::{DashboardService, EngineHandle};
pub use source::{FeedItem, PullResult, PushFeed, SnapshotSource};
