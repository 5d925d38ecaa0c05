use serde::{Deserialize, Serialize};

/// Destination du journal des événements du client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogMode {
    /// Journal dans un fichier local
    #[default]
    File,
    /// Journal via systemd-journal
    SystemdJournal,
}

impl LogMode {
    pub fn writes_file(&self) -> bool {
        matches!(self, LogMode::File)
    }
}
