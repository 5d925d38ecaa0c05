//! Taxonomie des erreurs du client
//!
//! Aucune de ces erreurs n'est fatale : un échec de transport dégrade l'affichage en
//! "données figées mais cohérentes", une charge utile malformée est simplement ignorée.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Échec du pull ou du flux push, récupéré au prochain cycle
    #[error("erreur de transport: {0}")]
    Transport(String),

    /// Charge utile malformée, ignorée sans application partielle
    #[error("données malformées: {0}")]
    DataShape(String),

    #[error("taille de page invalide: {0}")]
    InvalidPageSize(usize),

    #[error("configuration invalide: {0}")]
    Config(String),

    /// Le moteur a été arrêté, plus aucune opération n'est acceptée
    #[error("le moteur est arrêté")]
    ShutDown,
}

impl EngineError {
    pub fn is_transport(&self) -> bool {
        matches!(self, EngineError::Transport(_))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            EngineError::DataShape(e.to_string())
        } else {
            EngineError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::DataShape(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for EngineError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        EngineError::Transport(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
