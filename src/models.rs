use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocole réseau d'un événement classifié
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Other,
    /// Valeur absente ou non reconnue dans la charge utile
    Unknown,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Icmp => "ICMP",
            Protocol::Other => "OTHER",
            Protocol::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for Protocol {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(Protocol::Unknown)
    }
}

impl From<Protocol> for String {
    fn from(value: Protocol) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            "ICMP" => Ok(Protocol::Icmp),
            "OTHER" => Ok(Protocol::Other),
            "UNKNOWN" => Ok(Protocol::Unknown),
            other => Err(format!("protocole inconnu: {}", other)),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict du pipeline de classification, consommé tel quel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrafficStatus {
    Normal,
    Suspicious,
    Attack,
    Unknown,
}

impl TrafficStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficStatus::Normal => "Normal",
            TrafficStatus::Suspicious => "Suspicious",
            TrafficStatus::Attack => "Attack",
            TrafficStatus::Unknown => "Unknown",
        }
    }
}

impl From<String> for TrafficStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(TrafficStatus::Unknown)
    }
}

impl From<TrafficStatus> for String {
    fn from(value: TrafficStatus) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for TrafficStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(TrafficStatus::Normal),
            "suspicious" => Ok(TrafficStatus::Suspicious),
            "attack" => Ok(TrafficStatus::Attack),
            "unknown" => Ok(TrafficStatus::Unknown),
            other => Err(format!("statut inconnu: {}", other)),
        }
    }
}

impl fmt::Display for TrafficStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Événement réseau classifié, tel que livré par le pull ou le flux push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(with = "crate::wire::timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(alias = "source_ip")]
    pub src_ip: String,
    #[serde(alias = "destination_ip")]
    pub dst_ip: String,
    #[serde(default)]
    pub src_port: Option<u16>,
    /// Le port 0 est valide et distinct de l'absence de port
    #[serde(default)]
    pub dst_port: Option<u16>,
    #[serde(default = "unknown_protocol")]
    pub protocol: Protocol,
    #[serde(default = "unknown_status")]
    pub status: TrafficStatus,
    #[serde(default)]
    pub prediction: String,
    pub confidence: f64,
    #[serde(default)]
    pub length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_type: Option<String>,
    #[serde(default, alias = "is_local", alias = "involves_local_pc")]
    pub involves_local: bool,
}

fn unknown_protocol() -> Protocol {
    Protocol::Unknown
}

fn unknown_status() -> TrafficStatus {
    TrafficStatus::Unknown
}

impl TrafficEvent {
    /// Calcule la clé de déduplication de l'événement.
    ///
    /// L'horodatage est tronqué à `granularity_ms` : le flux push n'émet que des secondes
    /// alors que le pull fournit des millisecondes pour le même événement.
    pub fn dedup_key(&self, granularity_ms: u64) -> DedupKey {
        let granularity = granularity_ms.max(1) as i64;
        let millis = self.timestamp.and_utc().timestamp_millis();
        DedupKey {
            time_bucket: millis.div_euclid(granularity),
            src_ip: self.src_ip.clone(),
            dst_ip: self.dst_ip.clone(),
            dst_port: self.dst_port,
            protocol: self.protocol,
        }
    }
}

/// Identité d'un événement à travers les canaux pull et push
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub time_bucket: i64,
    pub src_ip: String,
    pub dst_ip: String,
    pub dst_port: Option<u16>,
    pub protocol: Protocol,
}

/// Canal par lequel un événement est arrivé.
/// L'ordre des variantes sert au départage : à horodatage égal, le pull passe devant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    Pull,
    Push,
}

/// Gravité d'une alerte
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        // Le serveur retombe sur MEDIUM quand la gravité n'est pas fournie
        match value.trim().to_uppercase().as_str() {
            "LOW" => Severity::Low,
            "HIGH" => Severity::High,
            "CRITICAL" => Severity::Critical,
            _ => Severity::Medium,
        }
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alerte système active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, with = "crate::wire::optional_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
}

impl AlertEvent {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: None,
            alert_type: None,
            severity,
            message: message.into(),
            source_ip: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }
}

/// Compteurs d'une tranche horaire, transmis tels quels par le serveur
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub attacks: u64,
    #[serde(default)]
    pub suspicious: u64,
}

impl HourlyBucket {
    pub fn new(hour: impl Into<String>) -> Self {
        Self {
            hour: hour.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, status: TrafficStatus) {
        self.total += 1;
        match status {
            TrafficStatus::Attack => self.attacks += 1,
            TrafficStatus::Suspicious => self.suspicious += 1,
            _ => {}
        }
    }
}

/// Compteurs agrégés du trafic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(rename = "total_traffic", alias = "total")]
    pub total: u64,
    pub attacks: u64,
    pub suspicious: u64,
    pub normal: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hourly_stats: Vec<HourlyBucket>,
}

impl StatsSnapshot {
    pub fn new(total: u64, attacks: u64, suspicious: u64, normal: u64) -> Self {
        Self {
            total,
            attacks,
            suspicious,
            normal,
            hourly_stats: Vec::new(),
        }
    }

    /// Somme des compteurs par statut
    pub fn classified(&self) -> u64 {
        self.attacks + self.suspicious + self.normal
    }

    pub fn is_consistent(&self) -> bool {
        self.total >= self.classified()
    }

    /// Compte un événement reçu par le flux push
    pub fn record(&mut self, status: TrafficStatus) {
        self.total += 1;
        match status {
            TrafficStatus::Attack => self.attacks += 1,
            TrafficStatus::Suspicious => self.suspicious += 1,
            TrafficStatus::Normal => self.normal += 1,
            TrafficStatus::Unknown => {}
        }
    }
}

/// État de la connexion au flux push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "Connexion...",
            ConnectionState::Connected => "Connecté",
            ConnectionState::Disconnected => "Déconnecté",
        };
        f.write_str(label)
    }
}
