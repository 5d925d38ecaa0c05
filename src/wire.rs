//! Décodage des charges utiles JSON (pull HTTP et messages push)
//!
//! Toute charge utile qui ne passe pas la validation est rejetée en bloc avec
//! `EngineError::DataShape` : l'état du moteur n'est jamais modifié partiellement.

use crate::error::{EngineError, EngineResult};
use crate::models::{AlertEvent, StatsSnapshot, TrafficEvent};
use crate::source::FeedItem;
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

/// Format d'horodatage émis par l'API (millisecondes)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// (Dé)sérialisation serde d'un horodatage obligatoire
pub mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// (Dé)sérialisation serde d'un horodatage facultatif
pub mod optional_timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_some(&ts.format(TIMESTAMP_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => super::parse_timestamp(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Interprète un horodatage dans l'un des formats rencontrés sur les deux canaux.
///
/// Le flux push n'envoie que `HH:MM:SS` : la date locale courante est alors utilisée,
/// en reculant d'un jour si le résultat tombe loin dans le futur (passage de minuit).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Local).naive_local());
    }

    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M:%S%.f") {
        let now = Local::now().naive_local();
        let candidate = now.date().and_time(time);
        if candidate - now > ChronoDuration::hours(12) {
            return Ok(candidate - ChronoDuration::days(1));
        }
        return Ok(candidate);
    }

    Err(format!("horodatage illisible: {:?}", raw))
}

/// Vérifie les invariants d'un événement
pub fn validate_event(event: &TrafficEvent) -> EngineResult<()> {
    if !event.confidence.is_finite() || !(0.0..=1.0).contains(&event.confidence) {
        return Err(EngineError::DataShape(format!(
            "confiance hors de [0,1] pour {} -> {}: {}",
            event.src_ip, event.dst_ip, event.confidence
        )));
    }
    Ok(())
}

/// Vérifie que les compteurs par statut ne dépassent pas le total
pub fn validate_stats(stats: &StatsSnapshot) -> EngineResult<()> {
    if !stats.is_consistent() {
        return Err(EngineError::DataShape(format!(
            "compteurs incohérents: total {} < {} classés",
            stats.total,
            stats.classified()
        )));
    }
    Ok(())
}

/// Décode la réponse de `GET /api/traffic/`
pub fn decode_events(body: &str) -> EngineResult<Vec<TrafficEvent>> {
    let events: Vec<TrafficEvent> = serde_json::from_str(body)?;
    for event in &events {
        validate_event(event)?;
    }
    Ok(events)
}

/// Décode la réponse de `GET /api/stats/`
pub fn decode_stats(body: &str) -> EngineResult<StatsSnapshot> {
    let stats: StatsSnapshot = serde_json::from_str(body)?;
    validate_stats(&stats)?;
    Ok(stats)
}

/// Décode la réponse de `GET /api/alerts/`
pub fn decode_alerts(body: &str) -> EngineResult<Vec<AlertEvent>> {
    Ok(serde_json::from_str(body)?)
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Décode un message du flux push.
///
/// Renvoie `Ok(None)` pour les types de message que le client ne traite pas.
pub fn decode_push_message(text: &str) -> EngineResult<Option<FeedItem>> {
    let envelope: Envelope = serde_json::from_str(text)?;

    match envelope.kind.as_str() {
        "update" | "packet" => {
            let event: TrafficEvent = serde_json::from_value(envelope.data)?;
            validate_event(&event)?;
            Ok(Some(FeedItem::Event(event)))
        }
        "alert" => {
            let alert: AlertEvent = serde_json::from_value(envelope.data)?;
            Ok(Some(FeedItem::Alert(alert)))
        }
        other => {
            debug!("Message push de type {:?} ignoré", other);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Protocol, Severity, TrafficStatus};
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_parse_api_timestamp_with_millis() {
        let ts = parse_timestamp("2025-03-14 12:00:01.734").unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_milli_opt(12, 0, 1, 734)
            .unwrap();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_parse_time_only_push_timestamp() {
        let ts = parse_timestamp("00:00:00").unwrap();
        assert_eq!(ts.hour(), 0);
        assert_eq!(ts.second(), 0);
        assert!(parse_timestamp("hier midi").is_err());
    }

    #[test]
    fn test_decode_update_message() {
        let text = r#"{"type":"update","data":{"timestamp":"2025-03-14 12:00:01.734","src_ip":"45.155.205.233","dst_ip":"192.168.1.10","dst_port":22,"protocol":"TCP","status":"Attack","prediction":"SSH-Bruteforce","confidence":0.97,"length":74}}"#;
        match decode_push_message(text).unwrap() {
            Some(FeedItem::Event(event)) => {
                assert_eq!(event.status, TrafficStatus::Attack);
                assert_eq!(event.protocol, Protocol::Tcp);
                assert_eq!(event.dst_port, Some(22));
                assert_eq!(event.prediction, "SSH-Bruteforce");
            }
            other => panic!("message inattendu: {:?}", other),
        }
    }

    #[test]
    fn test_decode_packet_message_with_legacy_field_names() {
        let text = r#"{"type":"packet","data":{"id":7,"timestamp":"12:00:01","source_ip":"10.0.0.5","destination_ip":"1.1.1.1","protocol":"udp","status":"Suspicious","prediction":"Normal","confidence":0.7,"length":120,"involves_local_pc":true}}"#;
        match decode_push_message(text).unwrap() {
            Some(FeedItem::Event(event)) => {
                assert_eq!(event.id, Some(7));
                assert_eq!(event.src_ip, "10.0.0.5");
                assert_eq!(event.dst_ip, "1.1.1.1");
                assert_eq!(event.protocol, Protocol::Udp);
                assert_eq!(event.dst_port, None);
                assert!(event.involves_local);
            }
            other => panic!("message inattendu: {:?}", other),
        }
    }

    #[test]
    fn test_decode_alert_and_unknown_messages() {
        let alert = r#"{"type":"alert","data":{"severity":"High","message":"SYN flood","alert_type":"DDoS"}}"#;
        match decode_push_message(alert).unwrap() {
            Some(FeedItem::Alert(a)) => {
                assert_eq!(a.severity, Severity::High);
                assert_eq!(a.alert_type.as_deref(), Some("DDoS"));
            }
            other => panic!("message inattendu: {:?}", other),
        }

        assert!(decode_push_message(r#"{"type":"heartbeat"}"#).unwrap().is_none());
        assert!(decode_push_message("pas du json").is_err());
    }

    #[test]
    fn test_out_of_range_confidence_is_data_shape_error() {
        let body = r#"[{"timestamp":"2025-03-14 12:00:01","src_ip":"a","dst_ip":"b","protocol":"TCP","status":"Normal","prediction":"Normal","confidence":1.5,"length":1}]"#;
        assert!(matches!(decode_events(body), Err(EngineError::DataShape(_))));
    }

    #[test]
    fn test_decode_stats_from_api_shape() {
        let body = r#"{"total_traffic":100,"attacks":3,"suspicious":7,"normal":90,"attack_percentage":3.0,"hourly_stats":[{"hour":"11:00","total":40,"attacks":1,"suspicious":2}]}"#;
        let stats = decode_stats(body).unwrap();
        assert_eq!(stats.total, 100);
        assert_eq!(stats.hourly_stats.len(), 1);

        let inconsistent = r#"{"total_traffic":5,"attacks":3,"suspicious":3,"normal":0}"#;
        assert!(matches!(decode_stats(inconsistent), Err(EngineError::DataShape(_))));
    }

    #[test]
    fn test_decode_alerts_from_rest_framework_timestamps() {
        let body = r#"[{"id":1,"timestamp":"2025-03-14T12:00:01.123456Z","alert_type":"Attack","severity":"Critical","message":"Bot détecté","source_ip":"5.188.86.172","resolved":false}]"#;
        let alerts = decode_alerts(body).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert!(alerts[0].timestamp.is_some());
    }
}
