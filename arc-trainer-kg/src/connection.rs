//! Neo4j connection management and health checks
//!
//! One [`GraphClient`] is opened per process and shared by every store
//! operation; the driver keeps its own connection pool.

use crate::error::{GraphError, Result};
use chrono::{DateTime, Utc};
use neo4rs::{query, ConfigBuilder, Graph};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How [`GraphClient::health_check_with_retry`] probes the database
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    pub method: HealthCheckMethod,
    /// Extra attempts after the first; 0 means a single probe
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Retry a failed `db.ping()` once with `RETURN 1`
    pub enable_fallback: bool,
    /// Slower answers than this count as degraded
    pub degraded_threshold_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            method: HealthCheckMethod::Ping,
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            enable_fallback: true,
            degraded_threshold_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckMethod {
    /// `RETURN 1`
    Simple,
    /// `CALL db.ping()` (Neo4j 4.1+)
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    /// Answered, but above the degraded threshold
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Healthy or degraded: the trainer can still use the store
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    fn from_elapsed(elapsed: Duration, degraded_threshold_ms: u64) -> Self {
        if elapsed.as_millis() as u64 > degraded_threshold_ms {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Outcome of [`GraphClient::health_check_with_retry`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    pub check_method: HealthCheckMethod,
    pub retry_count: u32,
    pub used_fallback: bool,
}

impl HealthCheckResult {
    fn new(
        status: HealthStatus,
        elapsed: Duration,
        error: Option<String>,
        check_method: HealthCheckMethod,
    ) -> Self {
        Self {
            status,
            response_time_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
            error,
            check_method,
            retry_count: 0,
            used_fallback: false,
        }
    }
}

/// Neo4j client holding the pooled driver
pub struct GraphClient {
    graph: Graph,
    health_config: HealthCheckConfig,
}

impl GraphClient {
    pub async fn new(uri: &str, user: &str, password: &str, database: &str) -> Result<Self> {
        Self::with_config(uri, user, password, database, HealthCheckConfig::default()).await
    }

    /// Connect with explicit health check settings
    pub async fn with_config(
        uri: &str,
        user: &str,
        password: &str,
        database: &str,
        health_config: HealthCheckConfig,
    ) -> Result<Self> {
        info!("Opening knowledge graph {} on {}", database, uri);

        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .db(database)
            .fetch_size(500)
            .max_connections(8)
            .build()
            .map_err(|e| GraphError::ConfigError(e.to_string()))?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| GraphError::ConnectionError(e.to_string()))?;

        info!("Knowledge graph connection ready");

        Ok(Self {
            graph,
            health_config,
        })
    }

    /// `RETURN 1`; any answer counts as healthy
    pub async fn health_check(&self) -> Result<bool> {
        debug!("Probing knowledge graph with RETURN 1");

        self.graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| GraphError::ConnectionError(e.to_string()))?;

        Ok(true)
    }

    /// `CALL db.ping()`, which needs Neo4j 4.1 or later
    pub async fn health_check_ping(&self) -> Result<HealthStatus> {
        debug!("Probing knowledge graph with db.ping()");

        let mut result = self
            .graph
            .execute(query("CALL db.ping()"))
            .await
            .map_err(|e| GraphError::query("db.ping() failed", e))?;

        match result
            .next()
            .await
            .map_err(|e| GraphError::query("Failed to read db.ping() result", e))?
        {
            Some(row) => {
                let success: bool = row.get("success").unwrap_or(false);
                if success {
                    Ok(HealthStatus::Healthy)
                } else {
                    warn!("db.ping() returned success=false");
                    Ok(HealthStatus::Unhealthy)
                }
            }
            None => {
                error!("db.ping() returned no rows");
                Err(GraphError::QueryError(
                    "No result returned from db.ping()".to_string(),
                ))
            }
        }
    }

    async fn check_once(&self, used_fallback: &mut bool) -> HealthCheckResult {
        let threshold = self.health_config.degraded_threshold_ms;
        let start = Instant::now();

        let simple = |outcome: Result<bool>, elapsed: Duration| match outcome {
            Ok(_) => HealthCheckResult::new(
                HealthStatus::from_elapsed(elapsed, threshold),
                elapsed,
                None,
                HealthCheckMethod::Simple,
            ),
            Err(e) => HealthCheckResult::new(
                HealthStatus::Unhealthy,
                elapsed,
                Some(e.to_string()),
                HealthCheckMethod::Simple,
            ),
        };

        match self.health_config.method {
            HealthCheckMethod::Simple => {
                let outcome = self.health_check().await;
                simple(outcome, start.elapsed())
            }
            HealthCheckMethod::Ping => match self.health_check_ping().await {
                Ok(HealthStatus::Unhealthy) => HealthCheckResult::new(
                    HealthStatus::Unhealthy,
                    start.elapsed(),
                    Some("db.ping() reported failure".to_string()),
                    HealthCheckMethod::Ping,
                ),
                Ok(_) => HealthCheckResult::new(
                    HealthStatus::from_elapsed(start.elapsed(), threshold),
                    start.elapsed(),
                    None,
                    HealthCheckMethod::Ping,
                ),
                Err(e) if self.health_config.enable_fallback && !*used_fallback => {
                    warn!("db.ping() failed, falling back to RETURN 1: {}", e);
                    *used_fallback = true;
                    let outcome = self.health_check().await;
                    simple(outcome, start.elapsed())
                }
                Err(e) => HealthCheckResult::new(
                    HealthStatus::Unhealthy,
                    start.elapsed(),
                    Some(e.to_string()),
                    HealthCheckMethod::Ping,
                ),
            },
        }
    }

    /// Run the configured check, retrying and falling back as configured.
    ///
    /// Never fails: an unreachable database yields an `Unhealthy` result.
    pub async fn health_check_with_retry(&self) -> HealthCheckResult {
        let mut retry_count = 0;
        let mut used_fallback = false;

        loop {
            let mut result = self.check_once(&mut used_fallback).await;

            if result.status.is_operational() || retry_count >= self.health_config.max_retries {
                result.retry_count = retry_count;
                result.used_fallback = used_fallback;
                return result;
            }

            retry_count += 1;
            warn!(
                "Health check failed (attempt {}/{}), retrying after {:?}",
                retry_count,
                self.health_config.max_retries + 1,
                self.health_config.retry_delay
            );
            tokio::time::sleep(self.health_config.retry_delay).await;
        }
    }

    /// Underlying `neo4rs` graph, for the schema functions
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn health_config(&self) -> &HealthCheckConfig {
        &self.health_config
    }
}
