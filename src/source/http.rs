use super::{PullResult, SnapshotSource};
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::models::TrafficStatus;
use crate::wire;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

/// Source pull sur l'API REST du serveur de détection
pub struct HttpSnapshotSource {
    http_client: Client,
    api_base: String,
    traffic_limit: usize,
    status_filter: Option<TrafficStatus>,
}

impl HttpSnapshotSource {
    pub fn new(config: &Config) -> Self {
        // Client HTTP avec un timeout raisonnable
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("cybershield/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http_client: client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            traffic_limit: config.traffic_limit,
            status_filter: None,
        }
    }

    /// Restreint le pull du trafic à un statut (`&status=` côté serveur)
    pub fn with_status_filter(mut self, status: Option<TrafficStatus>) -> Self {
        self.status_filter = status;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn traffic_path(&self) -> String {
        match self.status_filter {
            Some(status) => format!("traffic/?limit={}&status={}", self.traffic_limit, status),
            None => format!("traffic/?limit={}", self.traffic_limit),
        }
    }

    async fn get_text(&self, path: &str) -> EngineResult<String> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.http_client.get(&url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn pull(&self) -> EngineResult<PullResult> {
        let traffic_path = self.traffic_path();
        let (stats_body, traffic_body, alerts_body) = tokio::try_join!(
            self.get_text("stats/"),
            self.get_text(&traffic_path),
            self.get_text("alerts/"),
        )?;

        // Décodage complet avant toute application
        Ok(PullResult {
            events: wire::decode_events(&traffic_body)?,
            stats: wire::decode_stats(&stats_body)?,
            alerts: Some(wire::decode_alerts(&alerts_body)?),
        })
    }

    async fn clear_alerts(&self) -> EngineResult<()> {
        let url = self.url("clear-alerts/");
        debug!("POST {}", url);
        self.http_client.post(&url).send().await?.error_for_status()?;
        Ok(())
    }

    async fn download_report(&self) -> EngineResult<Vec<u8>> {
        let url = self.url("report/");
        let response = self.http_client.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(EngineError::DataShape("rapport vide".to_string()));
        }
        Ok(bytes.to_vec())
    }
}
