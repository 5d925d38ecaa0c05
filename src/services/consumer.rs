use super::Command;
use crate::engine::{EngineView, ReconciliationEngine};
use crate::logger::EventLogger;
use crate::models::ConnectionState;
use crate::source::{FeedItem, PullResult};
use log::debug;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Boucle unique de mutation du moteur.
///
/// Pendant un pull, le canal du flux push n'est plus lu : les éléments reçus
/// entre-temps y restent dans leur ordre d'arrivée et sont appliqués après le résultat
/// du pull. Le canal étant borné, le flux push ralentit au lieu de perdre des messages.
pub(super) async fn run(
    mut engine: ReconciliationEngine,
    mut commands: mpsc::Receiver<Command>,
    mut feed: mpsc::Receiver<FeedItem>,
    view_tx: watch::Sender<Arc<EngineView>>,
    logger: Arc<EventLogger>,
) {
    let mut pull_pending = false;
    // Alertes effacées alors qu'un pull était déjà parti : sa liste est périmée
    let mut cleared_during_pull = false;
    let mut feed_open = true;

    loop {
        let changed = tokio::select! {
            biased;

            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::PullStarted => {
                        pull_pending = true;
                        cleared_during_pull = false;
                        false
                    }
                    Command::PullFinished(result) => {
                        pull_pending = false;
                        let skip_alerts = std::mem::take(&mut cleared_during_pull);
                        match result {
                            Ok(pull) => apply_pull(&mut engine, pull, skip_alerts),
                            Err(e) => {
                                logger.log_pull_failure(&e);
                                false
                            }
                        }
                    }
                    Command::ClearAlerts => {
                        if pull_pending {
                            cleared_during_pull = true;
                        }
                        let changed = engine.clear_alerts();
                        if changed {
                            logger.log_alerts_cleared();
                        }
                        changed
                    }
                }
            }

            item = feed.recv(), if feed_open && !pull_pending => {
                match item {
                    Some(item) => apply_feed_item(&mut engine, item, &logger),
                    None => {
                        feed_open = false;
                        false
                    }
                }
            }
        };

        if !engine.is_alive() {
            break;
        }

        if changed {
            view_tx.send_replace(Arc::new(engine.view()));
        }
    }

    engine.teardown();
}

fn apply_pull(engine: &mut ReconciliationEngine, pull: PullResult, skip_alerts: bool) -> bool {
    let mut changed = engine.apply_snapshot(pull.events, pull.stats);
    match pull.alerts {
        Some(_) if skip_alerts => {
            debug!("Liste d'alertes du pull ignorée: effacement survenu pendant le pull");
        }
        Some(alerts) => changed |= engine.apply_alert_snapshot(alerts),
        None => {}
    }
    changed
}

fn apply_feed_item(engine: &mut ReconciliationEngine, item: FeedItem, logger: &EventLogger) -> bool {
    match item {
        FeedItem::Event(event) => engine.apply_push_event(event),
        FeedItem::Alert(alert) => {
            let changed = engine.apply_alert(alert.clone());
            if changed {
                logger.log_alert(&alert);
            }
            changed
        }
        FeedItem::Connected => set_connection(engine, ConnectionState::Connected, logger),
        FeedItem::Disconnected => set_connection(engine, ConnectionState::Disconnected, logger),
    }
}

fn set_connection(engine: &mut ReconciliationEngine, state: ConnectionState, logger: &EventLogger) -> bool {
    let changed = engine.set_connection_state(state);
    if changed {
        logger.log_connection(state);
    }
    changed
}
