use super::Command;
use crate::source::{FeedItem, PushFeed, SnapshotSource};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;

/// Pull périodique, et immédiat sur demande de rafraîchissement.
///
/// Un seul pull à la fois : l'attente réseau se fait ici, hors du moteur. Le drapeau
/// `in_flight` est levé soit ici, soit par `EngineHandle::force_refresh` avant le réveil.
pub(super) async fn run_poller(
    source: Arc<dyn SnapshotSource>,
    commands: mpsc::Sender<Command>,
    refresh: Arc<Notify>,
    in_flight: Arc<AtomicBool>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if in_flight.swap(true, Ordering::SeqCst) {
                    // Une demande de rafraîchissement vient d'être acceptée : ce pull la sert
                    refresh.notified().await;
                }
            }
            _ = refresh.notified() => {
                debug!("Rafraîchissement forcé");
                interval.reset();
            }
        }

        if commands.send(Command::PullStarted).await.is_err() {
            break;
        }

        let result = source.pull().await;

        let sent = commands.send(Command::PullFinished(result)).await;
        in_flight.store(false, Ordering::SeqCst);
        if sent.is_err() {
            break;
        }
    }

    info!("Poller arrêté");
}

/// Relaie le flux push vers le moteur, dans l'ordre de réception.
///
/// L'envoi attend tant que le canal est plein : le flux est alors lu moins vite.
pub(super) async fn run_push_pump(mut feed: Box<dyn PushFeed>, items: mpsc::Sender<FeedItem>) {
    while let Some(item) = feed.next().await {
        if items.send(item).await.is_err() {
            return;
        }
    }

    info!("Flux push terminé");
    let _ = items.send(FeedItem::Disconnected).await;
}
