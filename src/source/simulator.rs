//! Source de trafic simulé, utilisable sans serveur
//!
//! Reproduit côté client le générateur de test du serveur de détection : 20 % d'attaques,
//! 10 % de trafic suspect, le reste normal. Le même simulateur sert de source pull et de
//! flux push, ce qui garde les compteurs cohérents entre les deux canaux.

use super::{FeedItem, PullResult, PushFeed, SnapshotSource};
use crate::error::{EngineError, EngineResult};
use crate::models::{AlertEvent, HourlyBucket, Protocol, Severity, StatsSnapshot, TrafficEvent, TrafficStatus};
use async_trait::async_trait;
use chrono::{Local, Timelike};
use log::debug;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ATTACK_TYPES: &[&str] = &[
    "Bot",
    "DDOS attack-HOIC",
    "DDoS attacks-LOIC-HTTP",
    "DoS attacks-SlowHTTPTest",
    "DoS attacks-Hulk",
    "DoS attacks-GoldenEye",
    "FTP-BruteForce",
    "SSH-Bruteforce",
    "SQL Injection",
];
const EXTERNAL_IPS: &[&str] = &["8.8.8.8", "1.1.1.1", "142.250.185.78", "104.16.249.249"];
const MALICIOUS_IPS: &[&str] = &["45.155.205.233", "185.220.100.242", "5.188.86.172"];

/// Historique conservé par le simulateur (équivalent de la base du serveur)
const HISTORY_LIMIT: usize = 1000;
const ALERT_LIMIT: usize = 100;
const HOURS_KEPT: usize = 24;

struct SimState {
    history: VecDeque<TrafficEvent>,
    stats: StatsSnapshot,
    alerts: Vec<AlertEvent>,
    next_id: u64,
    announced: bool,
}

#[derive(Clone)]
pub struct Simulator {
    state: Arc<Mutex<SimState>>,
    local_ip: String,
    interval: Duration,
    traffic_limit: usize,
    /// Alertes en attente d'émission sur le flux push
    pending: VecDeque<AlertEvent>,
}

impl Simulator {
    pub fn new(interval: Duration, traffic_limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                history: VecDeque::with_capacity(HISTORY_LIMIT),
                stats: StatsSnapshot::default(),
                alerts: Vec::new(),
                next_id: 1,
                announced: false,
            })),
            local_ip: "192.168.1.10".to_string(),
            interval,
            traffic_limit,
            pending: VecDeque::new(),
        }
    }

    /// Génère un événement, le compte et le mémorise
    pub fn generate(&self) -> EngineResult<(TrafficEvent, Option<AlertEvent>)> {
        let mut rng = rand::rng();
        let roll: f64 = rng.random();

        let (status, src_ip, dst_ip, prediction, confidence, protocol, port) = if roll < 0.20 {
            (
                TrafficStatus::Attack,
                pick(&mut rng, MALICIOUS_IPS),
                self.local_ip.clone(),
                pick(&mut rng, ATTACK_TYPES),
                rng.random_range(0.85..0.99),
                Protocol::Tcp,
                *[80u16, 443, 22, 21].choose(&mut rng).unwrap_or(&80),
            )
        } else if roll < 0.30 {
            (
                TrafficStatus::Suspicious,
                pick(&mut rng, EXTERNAL_IPS),
                self.local_ip.clone(),
                "Normal".to_string(),
                rng.random_range(0.60..0.80),
                Protocol::Udp,
                rng.random_range(1024..9999),
            )
        } else {
            (
                TrafficStatus::Normal,
                self.local_ip.clone(),
                pick(&mut rng, EXTERNAL_IPS),
                "Normal".to_string(),
                rng.random_range(0.90..0.99),
                Protocol::Tcp,
                443,
            )
        };

        let now = Local::now().naive_local();
        // Précision à la milliseconde, comme l'API
        let timestamp = now
            .with_nanosecond(now.nanosecond() / 1_000_000 * 1_000_000)
            .unwrap_or(now);

        let mut state = self.lock()?;

        let event = TrafficEvent {
            id: Some(state.next_id),
            timestamp,
            src_ip,
            dst_ip,
            src_port: Some(rng.random_range(1024..65535)),
            dst_port: Some(port),
            protocol,
            status,
            attack_type: (status == TrafficStatus::Attack).then(|| prediction.clone()),
            prediction,
            confidence,
            length: rng.random_range(60..1500),
            involves_local: true,
        };
        state.next_id += 1;

        state.stats.record(status);
        let hour = timestamp.format("%H:00").to_string();
        match state.stats.hourly_stats.iter_mut().find(|bucket| bucket.hour == hour) {
            Some(bucket) => bucket.record(status),
            None => {
                let mut bucket = HourlyBucket::new(hour);
                bucket.record(status);
                state.stats.hourly_stats.push(bucket);
                if state.stats.hourly_stats.len() > HOURS_KEPT {
                    state.stats.hourly_stats.remove(0);
                }
            }
        }
        state.history.push_front(event.clone());
        state.history.truncate(HISTORY_LIMIT);

        let alert = if status == TrafficStatus::Attack {
            let alert = AlertEvent {
                id: Some(state.next_id),
                timestamp: Some(timestamp),
                alert_type: event.attack_type.clone(),
                severity: if event.confidence > 0.95 { Severity::Critical } else { Severity::High },
                message: format!(
                    "{} détecté depuis {}",
                    event.prediction, event.src_ip
                ),
                source_ip: Some(event.src_ip.clone()),
            };
            state.next_id += 1;
            state.alerts.insert(0, alert.clone());
            state.alerts.truncate(ALERT_LIMIT);
            Some(alert)
        } else {
            None
        };

        Ok((event, alert))
    }

    fn lock(&self) -> EngineResult<std::sync::MutexGuard<'_, SimState>> {
        self.state
            .lock()
            .map_err(|e| EngineError::Transport(format!("simulateur indisponible: {}", e)))
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, values: &[&str]) -> String {
    values.choose(rng).copied().unwrap_or_default().to_string()
}

#[async_trait]
impl SnapshotSource for Simulator {
    async fn pull(&self) -> EngineResult<PullResult> {
        let state = self.lock()?;
        Ok(PullResult {
            events: state.history.iter().take(self.traffic_limit).cloned().collect(),
            stats: state.stats.clone(),
            alerts: Some(state.alerts.clone()),
        })
    }

    async fn clear_alerts(&self) -> EngineResult<()> {
        self.lock()?.alerts.clear();
        Ok(())
    }

    async fn download_report(&self) -> EngineResult<Vec<u8>> {
        let state = self.lock()?;
        let mut report = String::from("Timestamp,Source IP,Destination IP,Protocol,Status,Prediction,Confidence,Length,Dst Port\n");
        for event in &state.history {
            report.push_str(&format!(
                "{},{},{},{},{},{},{:.2}%,{},{}\n",
                event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                event.src_ip,
                event.dst_ip,
                event.protocol,
                event.status,
                event.prediction,
                event.confidence * 100.0,
                event.length,
                event.dst_port.map(|p| p.to_string()).unwrap_or_default(),
            ));
        }
        Ok(report.into_bytes())
    }
}

#[async_trait]
impl PushFeed for Simulator {
    async fn next(&mut self) -> Option<FeedItem> {
        {
            let mut state = self.state.lock().ok()?;
            if !state.announced {
                state.announced = true;
                return Some(FeedItem::Connected);
            }
        }

        if let Some(alert) = self.pending.pop_front() {
            return Some(FeedItem::Alert(alert));
        }

        tokio::time::sleep(self.interval).await;

        match self.generate() {
            Ok((event, alert)) => {
                debug!("Événement simulé: {} -> {} ({})", event.src_ip, event.dst_ip, event.status);
                self.pending.extend(alert);
                Some(FeedItem::Event(event))
            }
            Err(_) => None,
        }
    }
}
