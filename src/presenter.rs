//! Rendu texte du tableau de bord pour le terminal

use crate::cli::DashboardAction;
use crate::engine::EngineView;
use crate::filter_view::{Page, ViewState};
use crate::models::{ConnectionState, HourlyBucket, TrafficStatus};
use num_format::{Locale, ToFormattedString};
use std::fmt::Write;

const ALERTS_SHOWN: usize = 5;
const HOURS_SHOWN: usize = 6;
const HOURLY_BAR_WIDTH: usize = 20;

/// Construit l'écran complet : compteurs, répartition, page d'événements et alertes
pub fn render(view: &EngineView, view_state: &ViewState, page: &Page) -> String {
    let mut out = String::new();
    let stats = &view.stats;
    let dist = &view.distribution;

    let connection = match view.connection {
        ConnectionState::Connected => "● Connecté",
        ConnectionState::Connecting => "◌ Connexion...",
        ConnectionState::Disconnected => "○ Déconnecté",
    };

    let _ = writeln!(out, "┌─────────────────────────────────────────────────────┐");
    let _ = writeln!(out, "│  CyberShield - Détection d'intrusions en temps réel │");
    let _ = writeln!(out, "├─────────────────────────────────────────────────────┤");
    let _ = writeln!(out, "│ Flux push: {:<40} │", connection);
    let _ = writeln!(out, "│ Trafic analysé: {:<35} │", stats.total.to_formatted_string(&Locale::fr));
    let _ = writeln!(out, "│ Attaques: {:<12} ({:>5.1} %)                    │", stats.attacks.to_formatted_string(&Locale::fr), dist.attack_pct);
    let _ = writeln!(out, "│ Suspects: {:<12} ({:>5.1} %)                    │", stats.suspicious.to_formatted_string(&Locale::fr), dist.suspicious_pct);
    let _ = writeln!(out, "│ Normaux:  {:<12} ({:>5.1} %)                    │", stats.normal.to_formatted_string(&Locale::fr), dist.normal_pct);
    let _ = writeln!(out, "└─────────────────────────────────────────────────────┘");

    render_hourly(&mut out, &stats.hourly_stats);

    let filter = view_state.filter();
    let request = view_state.page();
    let mut active = Vec::new();
    if let Some(status) = filter.status {
        active.push(format!("statut={}", status));
    }
    if let Some(protocol) = filter.protocol {
        active.push(format!("protocole={}", protocol));
    }
    if let Some(ref ip) = filter.ip_substring {
        active.push(format!("ip~{}", ip));
    }
    let filter_label = if active.is_empty() { "aucun".to_string() } else { active.join(", ") };

    let _ = writeln!(
        out,
        "\nTrafic récent (filtre: {}) - page {}/{} - {} correspondance(s)",
        filter_label,
        request.index + 1,
        page.page_count(request.size).max(1),
        page.total_matching
    );
    let _ = writeln!(out, "{:<13} {:<16} {:<22} {:<6} {:<11} {:>6}  {}", "Heure", "Source", "Destination", "Proto", "Statut", "Conf.", "Prédiction");

    if page.items.is_empty() {
        let _ = writeln!(out, "  (aucun événement)");
    }
    for event in &page.items {
        let destination = match event.dst_port {
            Some(port) => format!("{}:{}", event.dst_ip, port),
            None => event.dst_ip.clone(),
        };
        let marker = match event.status {
            TrafficStatus::Attack => "!!",
            TrafficStatus::Suspicious => "? ",
            _ => "  ",
        };
        let _ = writeln!(
            out,
            "{:<13} {:<16} {:<22} {:<6} {}{:<9} {:>5.1}%  {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.src_ip,
            destination,
            event.protocol,
            marker,
            event.status,
            event.confidence * 100.0,
            event.prediction
        );
    }

    let _ = writeln!(out, "\nAlertes actives: {}", view.alerts.len());
    for alert in view.alerts.iter().take(ALERTS_SHOWN) {
        let _ = writeln!(out, "  [{}] {}", alert.severity, alert.message);
    }
    if view.alerts.len() > ALERTS_SHOWN {
        let _ = writeln!(out, "  ... et {} autre(s)", view.alerts.len() - ALERTS_SHOWN);
    }

    out
}

/// Dernières tranches horaires transmises par le serveur, avec une barre proportionnelle
fn render_hourly(out: &mut String, buckets: &[HourlyBucket]) {
    if buckets.is_empty() {
        return;
    }

    let shown = &buckets[buckets.len().saturating_sub(HOURS_SHOWN)..];
    let max = shown.iter().map(|b| b.total).max().unwrap_or(0).max(1);

    let _ = writeln!(out, "\nTrafic par heure:");
    for bucket in shown {
        let width = (bucket.total * HOURLY_BAR_WIDTH as u64 / max) as usize;
        let _ = writeln!(
            out,
            "  {:<6} {:<20} {:>8} (attaques: {}, suspects: {})",
            bucket.hour,
            "█".repeat(width),
            bucket.total.to_formatted_string(&Locale::fr),
            bucket.attacks,
            bucket.suspicious
        );
    }
}

/// Efface le terminal puis affiche l'écran, suivi de l'aide des commandes
pub fn print_dashboard(view: &EngineView, view_state: &ViewState, page: &Page, notice: Option<&str>) {
    // Effacer l'écran (compatible avec la plupart des terminaux)
    print!("\x1B[2J\x1B[1;1H");
    println!("{}", render(view, view_state, page));
    if let Some(notice) = notice {
        println!("» {}", notice);
    }
    println!("{}", DashboardAction::HELP);
}
