use crate::error::EngineError;
use crate::log_mode::LogMode;
use crate::models::{AlertEvent, ConnectionState, Severity};
use chrono::{DateTime, Local};
use log::{error, info, warn};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Journal des faits marquants vus par le client : alertes, connectivité, échecs de pull
pub struct EventLogger {
    log_file: Mutex<Option<File>>,
    log_path: String,
    log_mode: LogMode,
}

impl EventLogger {
    pub fn new(log_path: String) -> Self {
        Self::new_with_mode(log_path, LogMode::File)
    }

    pub fn new_with_mode(log_path: String, log_mode: LogMode) -> Self {
        let file = if log_mode.writes_file() {
            Self::open(&log_path)
        } else {
            // En mode systemd-journal, pas besoin de fichier
            None
        };

        Self {
            log_file: Mutex::new(file),
            log_path,
            log_mode,
        }
    }

    fn open(log_path: &str) -> Option<File> {
        // Créer le répertoire si nécessaire
        if let Some(parent) = Path::new(log_path).parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!("Erreur lors de la création du répertoire de logs: {}", e);
            }
        }

        match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(file) => Some(file),
            Err(e) => {
                error!("Erreur lors de l'ouverture du fichier de log {}: {}", log_path, e);
                None
            }
        }
    }

    pub fn log_alert(&self, alert: &AlertEvent) {
        let source_ip = alert.source_ip.as_deref().unwrap_or("N/A");
        let entry = format!(
            "[{}] [ALERT:{}] [IP: {}] {}",
            Self::now(),
            alert.severity,
            source_ip,
            alert.message
        );

        match self.log_mode {
            LogMode::File => self.write_to_log(&entry),
            LogMode::SystemdJournal => match alert.severity {
                Severity::Critical | Severity::High => warn!("{}", entry),
                Severity::Medium | Severity::Low => info!("{}", entry),
            },
        }
    }

    pub fn log_connection(&self, state: ConnectionState) {
        let entry = format!("[{}] [CONNECTION] {}", Self::now(), state);

        match self.log_mode {
            LogMode::File => self.write_to_log(&entry),
            LogMode::SystemdJournal => match state {
                ConnectionState::Disconnected => warn!("{}", entry),
                _ => info!("{}", entry),
            },
        }
    }

    pub fn log_pull_failure(&self, err: &EngineError) {
        let kind = if err.is_transport() { "TRANSPORT" } else { "DONNÉES" };
        let entry = format!("[{}] [PULL:{}] Échec, état précédent conservé: {}", Self::now(), kind, err);

        match self.log_mode {
            LogMode::File => self.write_to_log(&entry),
            LogMode::SystemdJournal => warn!("{}", entry),
        }
    }

    pub fn log_alerts_cleared(&self) {
        let entry = format!("[{}] [ALERT] Alertes effacées par l'opérateur", Self::now());

        match self.log_mode {
            LogMode::File => self.write_to_log(&entry),
            LogMode::SystemdJournal => info!("{}", entry),
        }
    }

    fn now() -> String {
        let timestamp: DateTime<Local> = Local::now();
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }

    fn write_to_log(&self, message: &str) {
        let mut log_file_guard = match self.log_file.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("Erreur lors de l'acquisition du verrou pour le fichier de log: {}", e);
                return;
            }
        };

        if let Some(file) = log_file_guard.as_mut() {
            if let Err(e) = writeln!(file, "{}", message) {
                error!("Erreur lors de l'écriture dans le fichier de log: {}", e);

                // Essayer de réouvrir le fichier
                *log_file_guard = Self::open(&self.log_path);
            }
        }
    }
}
