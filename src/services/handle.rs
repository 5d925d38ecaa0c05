use super::{ensure_alive, Command};
use crate::aggregator::Distribution;
use crate::engine::EngineView;
use crate::error::{EngineError, EngineResult};
use crate::filter_view::{self, EventFilter, Page, PageRequest, ViewState};
use crate::models::{AlertEvent, ConnectionState, StatsSnapshot};
use crate::source::SnapshotSource;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};

/// Accès du présentateur au moteur.
///
/// Les lectures sont synchrones et ne bloquent jamais : elles portent sur la dernière
/// vue publiée, jamais sur un état en cours de modification.
#[derive(Clone)]
pub struct EngineHandle {
    view_rx: watch::Receiver<Arc<EngineView>>,
    commands: mpsc::Sender<Command>,
    refresh: Arc<Notify>,
    pull_in_flight: Arc<AtomicBool>,
    source: Arc<dyn SnapshotSource>,
    alive: Arc<AtomicBool>,
}

impl EngineHandle {
    pub(super) fn new(
        view_rx: watch::Receiver<Arc<EngineView>>,
        commands: mpsc::Sender<Command>,
        refresh: Arc<Notify>,
        pull_in_flight: Arc<AtomicBool>,
        source: Arc<dyn SnapshotSource>,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            view_rx,
            commands,
            refresh,
            pull_in_flight,
            source,
            alive,
        }
    }

    /// Dernière vue validée
    pub fn view(&self) -> Arc<EngineView> {
        self.view_rx.borrow().clone()
    }

    /// Abonnement aux changements : notifié après chaque mutation validée
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineView>> {
        self.view_rx.clone()
    }

    pub fn events_page(&self, filter: &EventFilter, page: PageRequest) -> Page {
        filter_view::apply(&self.view().events, filter, page)
    }

    /// Projection selon l'état de présentation de l'opérateur
    pub fn project(&self, view_state: &ViewState) -> Page {
        view_state.project(&self.view().events)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.view().stats.clone()
    }

    pub fn distribution(&self) -> Distribution {
        self.view().distribution
    }

    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.view().alerts.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.view().connection
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Demande un pull immédiat.
    ///
    /// Renvoie `false` si la demande est fusionnée avec un pull déjà en cours ou si le
    /// service est arrêté.
    pub fn force_refresh(&self) -> bool {
        if !self.is_alive() {
            return false;
        }
        // Vérification et réservation en une seule étape : deux demandes rapprochées
        // ne peuvent pas déclencher deux pulls
        if self
            .pull_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Pull déjà en cours, demande de rafraîchissement fusionnée");
            return false;
        }
        self.refresh.notify_one();
        true
    }

    /// Efface les alertes localement puis côté serveur.
    ///
    /// L'effacement local est immédiat, y compris pendant un pull : la liste d'alertes
    /// de ce pull, antérieure à l'effacement, est alors ignorée. Le pull suivant
    /// réconcilie avec le serveur si la requête échoue.
    pub async fn clear_alerts(&self) -> EngineResult<()> {
        ensure_alive(&self.alive)?;

        self.commands
            .send(Command::ClearAlerts)
            .await
            .map_err(|_| EngineError::ShutDown)?;

        if let Err(e) = self.source.clear_alerts().await {
            warn!("Effacement des alertes côté serveur impossible: {}", e);
            return Err(e);
        }
        Ok(())
    }
}
