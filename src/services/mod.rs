//! Service d'exécution du tableau de bord
//!
//! Un seul consommateur possède le moteur et applique les commandes dans leur ordre de
//! réception ; le poller et le flux push ne sont que des producteurs. Chaque changement
//! validé est publié aux abonnés via un canal `watch`.

mod consumer;
mod handle;
mod producers;

pub use handle::EngineHandle;

use crate::config::Config;
use crate::engine::{EngineSettings, EngineView, ReconciliationEngine};
use crate::error::{EngineError, EngineResult};
use crate::logger::EventLogger;
use crate::source::{FeedItem, PullResult, PushFeed, SnapshotSource};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;

/// Commandes du poller et de l'opérateur vers le moteur.
///
/// Le flux push a son propre canal, suspendu pendant un pull.
#[derive(Debug)]
pub(crate) enum Command {
    /// Le poller commence un pull : le flux push n'est plus lu jusqu'au résultat
    PullStarted,
    PullFinished(EngineResult<PullResult>),
    ClearAlerts,
}

pub struct DashboardService {
    handle: EngineHandle,
    alive: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl DashboardService {
    /// Démarre le moteur, le poller et le flux push.
    ///
    /// Doit être appelé depuis un runtime tokio.
    pub fn start(
        config: &Config,
        source: Arc<dyn SnapshotSource>,
        feed: Box<dyn PushFeed>,
        logger: Arc<EventLogger>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let engine = ReconciliationEngine::new(EngineSettings::from(config));
        let alive = engine.liveness();

        let (command_tx, command_rx) = mpsc::channel::<Command>(config.command_queue_size);
        let (feed_tx, feed_rx) = mpsc::channel::<FeedItem>(config.push_buffer_capacity);
        let (view_tx, view_rx) = watch::channel(Arc::new(engine.view()));
        let refresh = Arc::new(Notify::new());
        let pull_in_flight = Arc::new(AtomicBool::new(false));

        let mut tasks = Vec::with_capacity(3);

        tasks.push(tokio::spawn(consumer::run(
            engine,
            command_rx,
            feed_rx,
            view_tx,
            logger,
        )));

        tasks.push(tokio::spawn(producers::run_poller(
            source.clone(),
            command_tx.clone(),
            refresh.clone(),
            pull_in_flight.clone(),
            Duration::from_secs(config.poll_interval_secs),
        )));

        tasks.push(tokio::spawn(producers::run_push_pump(feed, feed_tx)));

        info!(
            "Service démarré (pull toutes les {}s, fenêtre {}, alertes {})",
            config.poll_interval_secs, config.window_capacity, config.alert_capacity
        );

        Ok(Self {
            handle: EngineHandle::new(view_rx, command_tx, refresh, pull_in_flight, source, alive.clone()),
            alive,
            tasks,
        })
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn view(&self) -> Arc<EngineView> {
        self.handle.view()
    }

    pub fn is_running(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Arrête le service : le pull en cours est annulé, le flux push fermé, et plus
    /// aucune mutation n'est appliquée.
    pub async fn shutdown(mut self) {
        self.stop_tasks();
        for task in self.tasks.drain(..) {
            // Les tâches annulées renvoient une JoinError attendue
            let _ = task.await;
        }
        info!("Service arrêté");
    }

    fn stop_tasks(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for DashboardService {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

/// Vérifie que le service accepte encore des opérations
pub(crate) fn ensure_alive(alive: &AtomicBool) -> EngineResult<()> {
    if alive.load(Ordering::SeqCst) {
        Ok(())
    } else {
        Err(EngineError::ShutDown)
    }
}
