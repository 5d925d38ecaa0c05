use crate::error::EngineError;
use crate::log_mode::LogMode;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "/etc/cybershield/config.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Version actuelle du logiciel
    pub version: String,

    /// Racine de l'API REST du serveur de détection
    pub api_base: String,

    /// URL du flux push (WebSocket)
    pub ws_url: String,

    /// Intervalle (en secondes) entre deux pulls complets
    pub poll_interval_secs: u64,

    /// Nombre d'événements demandés à chaque pull (`?limit=`)
    pub traffic_limit: usize,

    /// Capacité de la fenêtre d'événements récents
    pub window_capacity: usize,

    /// Capacité de la liste d'alertes
    pub alert_capacity: usize,

    /// Granularité (ms) de l'horodatage dans la clé de déduplication
    pub dedup_granularity_ms: u64,

    /// Capacité du canal du flux push ; plein (pendant un pull), il ralentit la lecture du flux
    pub push_buffer_capacity: usize,

    /// Taille de la file de commandes du moteur
    pub command_queue_size: usize,

    /// Timeout des requêtes HTTP (en secondes)
    pub http_timeout_secs: u64,

    /// Délai avant reconnexion du flux push (en secondes)
    pub reconnect_delay_secs: u64,

    /// Chemin vers le fichier de log
    pub log_file: String,

    /// Niveau de log
    pub log_level: String,

    /// Mode de journalisation (fichier ou systemd-journal)
    pub log_mode: LogMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_base: "http://localhost:8000/api".to_string(),
            ws_url: "ws://localhost:8000/ws/traffic/".to_string(),
            poll_interval_secs: 5,
            traffic_limit: 10,
            window_capacity: 10,
            alert_capacity: 50,
            dedup_granularity_ms: 1000,
            push_buffer_capacity: 1000,
            command_queue_size: 1000,
            http_timeout_secs: 10,
            reconnect_delay_secs: 3,
            log_file: "/var/log/cybershield/cybershield.log".to_string(),
            log_level: "info".to_string(),
            log_mode: LogMode::File,
        }
    }
}

impl Config {
    /// Charge la configuration depuis le fichier par défaut
    pub fn load() -> Result<Self, Box<dyn Error>> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Charge la configuration depuis `path`, en la créant avec les valeurs par défaut si besoin
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn Error>> {
        if !path.exists() {
            let default_config = Config::default();
            default_config.save_to(path)?;
            return Ok(default_config);
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        // Créer le répertoire si nécessaire
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let config_json = serde_json::to_string_pretty(self)?;
        fs::write(path, config_json)?;

        Ok(())
    }

    /// Rejette les valeurs qui rendraient le moteur inutilisable
    pub fn validate(&self) -> Result<(), EngineError> {
        let checks = [
            (self.poll_interval_secs == 0, "poll_interval_secs doit être > 0"),
            (self.window_capacity == 0, "window_capacity doit être > 0"),
            (self.alert_capacity == 0, "alert_capacity doit être > 0"),
            (self.traffic_limit == 0, "traffic_limit doit être > 0"),
            (self.command_queue_size == 0, "command_queue_size doit être > 0"),
            (self.push_buffer_capacity == 0, "push_buffer_capacity doit être > 0"),
            (self.dedup_granularity_ms == 0, "dedup_granularity_ms doit être > 0"),
        ];

        for (failed, message) in checks {
            if failed {
                return Err(EngineError::Config(message.to_string()));
            }
        }

        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err(EngineError::Config(format!("ws_url invalide: {}", self.ws_url)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_round_trip_and_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.window_capacity = 25;
        config.log_mode = LogMode::SystemdJournal;
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);

        fs::write(&path, r#"{"poll_interval_secs": 2}"#).unwrap();
        let partial = Config::load_from(&path).unwrap();
        assert_eq!(partial.poll_interval_secs, 2);
        assert_eq!(partial.window_capacity, 10);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"window_capacity": 0}"#).unwrap();
        assert!(Config::load_from(&path).is_err());

        let mut config = Config::default();
        config.push_buffer_capacity = 0;
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));

        let mut config = Config::default();
        config.ws_url = "http://localhost:8000/ws/".to_string();
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }
}
