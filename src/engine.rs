//! Moteur de réconciliation
//!
//! Fusionne les instantanés périodiques (pull) et les événements incrémentaux (push)
//! en une vue unique qui fait autorité. Le moteur est synchrone et n'a qu'un seul
//! propriétaire : la sérialisation des mutations est assurée par la boucle de service.

use crate::aggregator::{distribution, Distribution};
use crate::config::Config;
use crate::models::{
    AlertEvent, ConnectionState, DedupKey, Origin, StatsSnapshot, TrafficEvent,
};
use log::{debug, info};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Paramètres de dimensionnement du moteur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Capacité K de la fenêtre d'événements
    pub window_capacity: usize,
    /// Capacité M de la liste d'alertes
    pub alert_capacity: usize,
    /// Granularité (ms) de l'horodatage dans la clé de déduplication
    pub dedup_granularity_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            window_capacity: 10,
            alert_capacity: 50,
            dedup_granularity_ms: 1000,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            window_capacity: config.window_capacity,
            alert_capacity: config.alert_capacity,
            dedup_granularity_ms: config.dedup_granularity_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct WindowEntry {
    event: TrafficEvent,
    key: DedupKey,
    origin: Origin,
    /// Rang d'arrivée, sert au départage à horodatage égal
    seq: u64,
}

/// Résultat de la fusion d'un événement dans la fenêtre
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeOutcome {
    Inserted,
    Replaced,
    Ignored,
}

/// État qui fait autorité, possédé exclusivement par le moteur
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    window: Vec<WindowEntry>,
    stats: StatsSnapshot,
    alerts: Vec<AlertEvent>,
    connection: ConnectionState,
}

impl EngineState {
    /// Événements de la fenêtre, du plus récent au plus ancien
    pub fn events(&self) -> impl Iterator<Item = &TrafficEvent> {
        self.window.iter().map(|entry| &entry.event)
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn stats(&self) -> &StatsSnapshot {
        &self.stats
    }

    pub fn alerts(&self) -> &[AlertEvent] {
        &self.alerts
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }
}

/// Vue immuable publiée après chaque mutation validée
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineView {
    /// Incrémenté à chaque changement effectif de l'état
    pub revision: u64,
    pub events: Vec<TrafficEvent>,
    pub stats: StatsSnapshot,
    pub distribution: Distribution,
    pub alerts: Vec<AlertEvent>,
    pub connection: ConnectionState,
}

pub struct ReconciliationEngine {
    settings: EngineSettings,
    state: EngineState,
    next_seq: u64,
    revision: u64,
    alive: Arc<AtomicBool>,
}

impl ReconciliationEngine {
    /// Crée un moteur avec un état vide et des compteurs à zéro
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            state: EngineState::default(),
            next_seq: 0,
            revision: 0,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drapeau de vivacité partagé avec les producteurs
    pub fn liveness(&self) -> Arc<AtomicBool> {
        self.alive.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(AtomicOrdering::SeqCst)
    }

    /// Arrête le moteur : toute opération ultérieure est ignorée
    pub fn teardown(&mut self) {
        self.alive.store(false, AtomicOrdering::SeqCst);
        info!("Moteur de réconciliation arrêté (révision {})", self.revision);
    }

    /// Applique un instantané du pull.
    ///
    /// Les compteurs sont remplacés tels quels ; les événements sont fusionnés par clé
    /// de déduplication puis la fenêtre est tronquée à K. Appliquer deux fois le même
    /// instantané produit le même état.
    pub fn apply_snapshot(&mut self, events: Vec<TrafficEvent>, stats: StatsSnapshot) -> bool {
        if !self.is_alive() {
            return false;
        }

        let before = self.state.clone();

        if before.stats.total != stats.total {
            // Dérive attendue entre deux pulls, corrigée ici sans être une erreur
            debug!(
                "Compteurs recalés sur le pull: total {} -> {} (attaques {} -> {})",
                before.stats.total, stats.total, before.stats.attacks, stats.attacks
            );
        }
        self.state.stats = stats;

        for event in events {
            self.merge(event, Origin::Pull);
        }
        self.normalize_window();

        self.commit_if_changed(&before)
    }

    /// Applique un événement reçu par le flux push.
    ///
    /// Sans effet si un événement équivalent d'horodatage égal ou plus récent est déjà
    /// présent. Un nouvel événement incrémente `total` et le compteur de son statut.
    pub fn apply_push_event(&mut self, event: TrafficEvent) -> bool {
        if !self.is_alive() {
            return false;
        }

        let status = event.status;
        match self.merge(event, Origin::Push) {
            MergeOutcome::Inserted => {
                self.state.stats.record(status);
                self.normalize_window();
                self.revision += 1;
                true
            }
            MergeOutcome::Replaced => {
                self.normalize_window();
                self.revision += 1;
                true
            }
            MergeOutcome::Ignored => false,
        }
    }

    /// Ajoute une alerte en tête de liste, tronquée à M
    pub fn apply_alert(&mut self, alert: AlertEvent) -> bool {
        if !self.is_alive() {
            return false;
        }

        if alert.id.is_some() && self.state.alerts.iter().any(|a| a.id == alert.id) {
            debug!("Alerte {:?} déjà connue, ignorée", alert.id);
            return false;
        }

        self.state.alerts.insert(0, alert);
        self.state.alerts.truncate(self.settings.alert_capacity);
        self.revision += 1;
        true
    }

    /// Remplace la liste d'alertes par celle du pull (vérité serveur)
    pub fn apply_alert_snapshot(&mut self, mut alerts: Vec<AlertEvent>) -> bool {
        if !self.is_alive() {
            return false;
        }

        alerts.truncate(self.settings.alert_capacity);
        if alerts == self.state.alerts {
            return false;
        }
        self.state.alerts = alerts;
        self.revision += 1;
        true
    }

    /// Vide la liste d'alertes, sans toucher aux événements ni aux compteurs
    pub fn clear_alerts(&mut self) -> bool {
        if !self.is_alive() || self.state.alerts.is_empty() {
            return false;
        }
        self.state.alerts.clear();
        self.revision += 1;
        true
    }

    pub fn set_connection_state(&mut self, connection: ConnectionState) -> bool {
        if !self.is_alive() || self.state.connection == connection {
            return false;
        }
        debug!("État de connexion: {} -> {}", self.state.connection, connection);
        self.state.connection = connection;
        self.revision += 1;
        true
    }

    /// Construit la vue immuable courante
    pub fn view(&self) -> EngineView {
        EngineView {
            revision: self.revision,
            events: self.state.events().cloned().collect(),
            stats: self.state.stats.clone(),
            distribution: distribution(&self.state.stats),
            alerts: self.state.alerts.clone(),
            connection: self.state.connection,
        }
    }

    fn merge(&mut self, event: TrafficEvent, origin: Origin) -> MergeOutcome {
        let key = event.dedup_key(self.settings.dedup_granularity_ms);

        let Some(position) = self.state.window.iter().position(|entry| entry.key == key) else {
            let seq = self.bump_seq();
            self.state.window.push(WindowEntry { event, key, origin, seq });
            return MergeOutcome::Inserted;
        };

        let existing = &self.state.window[position];
        match event.timestamp.cmp(&existing.event.timestamp) {
            Ordering::Greater => {
                let seq = self.bump_seq();
                self.state.window[position] = WindowEntry { event, key, origin, seq };
                MergeOutcome::Replaced
            }
            // Le pull fait autorité : il rafraîchit la charge utile sans changer le rang d'arrivée
            Ordering::Equal if origin == Origin::Pull => {
                let entry = &mut self.state.window[position];
                entry.event = event;
                entry.origin = Origin::Pull;
                MergeOutcome::Replaced
            }
            _ => MergeOutcome::Ignored,
        }
    }

    /// Trie la fenêtre du plus récent au plus ancien puis la tronque à K
    fn normalize_window(&mut self) {
        self.state.window.sort_by(rank);
        self.state.window.truncate(self.settings.window_capacity);
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn commit_if_changed(&mut self, before: &EngineState) -> bool {
        if self.state == *before {
            return false;
        }
        self.revision += 1;
        true
    }
}

/// Ordre de la fenêtre : horodatage décroissant, puis pull avant push.
/// Entre arrivées du pull, l'ordre du serveur (déjà du plus récent au plus ancien) est conservé ;
/// entre arrivées push, la dernière reçue passe en tête.
fn rank(a: &WindowEntry, b: &WindowEntry) -> Ordering {
    b.event
        .timestamp
        .cmp(&a.event.timestamp)
        .then(a.origin.cmp(&b.origin))
        .then_with(|| match a.origin {
            Origin::Pull => a.seq.cmp(&b.seq),
            Origin::Push => b.seq.cmp(&a.seq),
        })
}
