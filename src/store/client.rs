use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::store::{AggregationSpec, DocumentStore};

/// Authenticated `_search` client for one index.
pub struct ElasticClient {
    http: reqwest::Client,
    search_url: String,
    user: String,
    pass: String,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
}

impl ElasticClient {
    pub fn new(cfg: &Config, health: Arc<HealthState>, latency: Arc<LatencyStats>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.store_timeout_secs))
            .pool_max_idle_per_host(cfg.store_max_idle_per_host)
            .build()?;

        Ok(Self {
            http,
            search_url: format!("{}/{}/_search", cfg.store_url, cfg.store_index),
            user: cfg.store_user.clone(),
            pass: cfg.store_pass.clone(),
            health,
            latency,
        })
    }

    async fn send(&self, spec: &AggregationSpec) -> Result<Value> {
        let resp = self
            .http
            .post(&self.search_url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&spec.to_body())
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::Auth { status: status.as_u16() });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl DocumentStore for ElasticClient {
    async fn execute(&self, spec: &AggregationSpec) -> Result<Value> {
        let started = Instant::now();
        let result = self.send(spec).await;
        let elapsed = started.elapsed();
        self.latency.record(&spec.name, elapsed);

        match &result {
            Ok(_) => self.health.record_success(now_ns()),
            Err(_) => self.health.record_failure(),
        }
        debug!(
            aggregation = %spec.name,
            ok = result.is_ok(),
            elapsed_ms = elapsed.as_millis() as u64,
            "store query"
        );
        result
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
