use anyhow::Context;
use clap::Parser;
use cybershield::cli::{Cli, Command, DashboardAction, ViewArgs};
use cybershield::config::Config;
use cybershield::engine::{EngineSettings, ReconciliationEngine};
use cybershield::filter_view::ViewState;
use cybershield::log_mode::LogMode;
use cybershield::logger::EventLogger;
use cybershield::models::TrafficStatus;
use cybershield::presenter;
use cybershield::services::DashboardService;
use cybershield::source::{HttpSnapshotSource, PushFeed, Simulator, SnapshotSource, WebSocketFeed};
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Cadence du flux push simulé
const SIMULATION_INTERVAL: Duration = Duration::from_millis(1500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Charger la configuration pour déterminer le mode de log
    let config = match cli.config {
        Some(ref path) => Config::load_from(path),
        None => Config::load(),
    };
    let (config, load_error) = match config {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e.to_string())),
    };

    init_logging(&config);

    if let Some(e) = load_error {
        warn!("Configuration illisible, valeurs par défaut utilisées: {}", e);
    }

    match cli.command {
        Command::Watch(ref args) => {
            watch(&config, cli.simulate, args).await?;
            // Une lecture de stdin encore en attente retiendrait l'arrêt du runtime
            std::process::exit(0)
        }
        Command::Snapshot(ref args) => snapshot(&config, cli.simulate, args).await,
        Command::ClearAlerts => {
            let source = pull_source(&config, cli.simulate, None)?;
            source.clear_alerts().await.context("Effacement des alertes impossible")?;
            println!("Toutes les alertes ont été résolues.");
            Ok(())
        }
        Command::Report { ref output } => {
            let source = pull_source(&config, cli.simulate, None)?;
            let bytes = source.download_report().await.context("Téléchargement du rapport impossible")?;
            write_report(output, &bytes)?;
            println!("Rapport enregistré dans {} ({} octets)", output.display(), bytes.len());
            Ok(())
        }
    }
}

/// Initialise le logger approprié au mode configuré
fn init_logging(config: &Config) {
    match config.log_mode {
        LogMode::File => {
            env_logger::init_from_env(env_logger::Env::default().default_filter_or(&config.log_level));
        }
        LogMode::SystemdJournal => {
            #[cfg(feature = "systemd")]
            {
                use systemd_journal_logger::JournalLog;

                let level = config
                    .log_level
                    .parse::<log::LevelFilter>()
                    .unwrap_or(log::LevelFilter::Info);

                match JournalLog::new() {
                    Ok(logger) => {
                        if let Err(e) = logger.with_syslog_identifier("cybershield".to_string()).install() {
                            eprintln!("Erreur lors de l'installation du logger systemd: {}", e);
                            env_logger::init_from_env(env_logger::Env::default().default_filter_or(&config.log_level));
                        } else {
                            log::set_max_level(level);
                        }
                    }
                    Err(e) => {
                        eprintln!("Erreur lors de l'initialisation du logger systemd: {}", e);
                        env_logger::init_from_env(env_logger::Env::default().default_filter_or(&config.log_level));
                    }
                }
            }

            #[cfg(not(feature = "systemd"))]
            {
                eprintln!("AVERTISSEMENT: Le mode SystemdJournal n'est pas disponible (feature 'systemd' non activée). Utilisation du logger standard à la place.");
                env_logger::init_from_env(env_logger::Env::default().default_filter_or(&config.log_level));
            }
        }
    }
}

/// Source pull et flux push : le serveur, ou le simulateur local pour les deux
fn build_sources(config: &Config, simulate: bool) -> (Arc<dyn SnapshotSource>, Box<dyn PushFeed>) {
    if simulate {
        let simulator = Simulator::new(SIMULATION_INTERVAL, config.traffic_limit);
        (Arc::new(simulator.clone()), Box::new(simulator))
    } else {
        (Arc::new(HttpSnapshotSource::new(config)), Box::new(WebSocketFeed::new(config)))
    }
}

/// Source pour les commandes ponctuelles.
///
/// Le filtre de statut est aussi transmis au serveur pour que `limit` porte sur les
/// événements recherchés. En simulation, le générateur est amorcé pour que le premier
/// pull ait du contenu.
fn pull_source(config: &Config, simulate: bool, status: Option<TrafficStatus>) -> anyhow::Result<Arc<dyn SnapshotSource>> {
    if !simulate {
        return Ok(Arc::new(HttpSnapshotSource::new(config).with_status_filter(status)));
    }

    let simulator = Simulator::new(SIMULATION_INTERVAL, config.traffic_limit);
    for _ in 0..config.traffic_limit {
        simulator.generate()?;
    }
    Ok(Arc::new(simulator))
}

fn view_state(args: &ViewArgs) -> anyhow::Result<ViewState> {
    let mut state = ViewState::new(args.filter(), args.page_size)?;
    state.set_page(args.page_index());
    Ok(state)
}

async fn watch(config: &Config, simulate: bool, args: &ViewArgs) -> anyhow::Result<()> {
    let mut view_state = view_state(args)?;
    let (source, feed) = build_sources(config, simulate);
    let logger = Arc::new(EventLogger::new_with_mode(config.log_file.clone(), config.log_mode));

    let service = DashboardService::start(config, source, feed, logger)?;
    let handle = service.handle();
    let mut updates = handle.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let mut notice: Option<String> = None;

    info!("Tableau de bord démarré{}", if simulate { " (simulation)" } else { "" });

    loop {
        let view = updates.borrow_and_update().clone();
        let page = view_state.project(&view.events);
        presenter::print_dashboard(&view, &view_state, &page, notice.as_deref());

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    error!("Le moteur s'est arrêté de façon inattendue");
                    break;
                }
            }
            line = input.next_line(), if input_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Entrée fermée (redirection) : le tableau de bord continue sans commandes
                        input_open = false;
                        continue;
                    }
                    Err(e) => {
                        warn!("Lecture de l'entrée standard impossible: {}", e);
                        input_open = false;
                        continue;
                    }
                };

                let action = match line.parse::<DashboardAction>() {
                    Ok(action) => action,
                    Err(e) => {
                        notice = Some(e);
                        continue;
                    }
                };

                notice = match action {
                    DashboardAction::Quit => break,
                    DashboardAction::Refresh => Some(if handle.force_refresh() {
                        "Rafraîchissement demandé".to_string()
                    } else {
                        "Pull déjà en cours".to_string()
                    }),
                    DashboardAction::ClearAlerts => {
                        let handle = handle.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle.clear_alerts().await {
                                warn!("Effacement des alertes non confirmé par le serveur: {}", e);
                            }
                        });
                        Some("Alertes effacées".to_string())
                    }
                    other => {
                        let page_count = page.page_count(view_state.page().size);
                        match other.apply(&mut view_state, page_count) {
                            Ok(()) => None,
                            Err(e) => Some(e.to_string()),
                        }
                    }
                };
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interruption reçue, arrêt du tableau de bord");
                break;
            }
        }
    }

    service.shutdown().await;
    Ok(())
}

async fn snapshot(config: &Config, simulate: bool, args: &ViewArgs) -> anyhow::Result<()> {
    let view_state = view_state(args)?;
    let source = pull_source(config, simulate, args.status)?;

    let pull = source.pull().await.context("Pull impossible")?;

    let mut engine = ReconciliationEngine::new(EngineSettings::from(config));
    engine.apply_snapshot(pull.events, pull.stats);
    if let Some(alerts) = pull.alerts {
        engine.apply_alert_snapshot(alerts);
    }

    let view = engine.view();
    let page = view_state.project(&view.events);
    println!("{}", presenter::render(&view, &view_state, &page));
    Ok(())
}

fn write_report(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Création du répertoire {} impossible", dir.display()))?;
        }
    }
    std::fs::write(path, bytes).with_context(|| format!("Écriture de {} impossible", path.display()))?;
    Ok(())
}
