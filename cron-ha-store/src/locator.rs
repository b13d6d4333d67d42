//! Locating the active store endpoint

use crate::{Result, StoreError};
use async_trait::async_trait;
use cron_ha_common::Endpoint;
use std::time::Duration;
use tracing::{debug, trace};

/// Time allowed for each sentinel to answer
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_millis(200);

/// Resolves the endpoint the store client should connect to
#[async_trait]
pub trait EndpointLocator: Send + Sync {
    async fn locate(&self) -> Result<Endpoint>;
}

/// Always returns the configured endpoint
#[derive(Debug, Clone)]
pub struct StaticLocator {
    endpoint: Endpoint,
}

impl StaticLocator {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl EndpointLocator for StaticLocator {
    async fn locate(&self) -> Result<Endpoint> {
        Ok(self.endpoint.clone())
    }
}

/// Asks Redis Sentinel for the current master of a named group
///
/// Sentinels are tried in order and the first one that names a master wins.
/// Each attempt, connection included, is bounded by the discovery timeout.
#[derive(Debug, Clone)]
pub struct SentinelLocator {
    sentinels: Vec<Endpoint>,
    master_name: String,
    timeout: Duration,
}

impl SentinelLocator {
    pub fn new(sentinels: Vec<Endpoint>, master_name: impl Into<String>) -> Self {
        Self {
            sentinels,
            master_name: master_name.into(),
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }

    /// Override the per-sentinel timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn ask(&self, sentinel: &Endpoint) -> Result<Option<Endpoint>> {
        let client = redis::Client::open(connection_info(sentinel, 0)).map_err(|source| {
            StoreError::Connect {
                endpoint: sentinel.clone(),
                source,
            }
        })?;

        let query = async {
            let mut conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|source| StoreError::Connect {
                    endpoint: sentinel.clone(),
                    source,
                })?;

            let master: Option<(String, u16)> = redis::cmd("SENTINEL")
                .arg("get-master-addr-by-name")
                .arg(&self.master_name)
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::command("SENTINEL", &self.master_name, e))?;

            Ok(master.map(|(host, port)| Endpoint::new(host, port)))
        };

        tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| StoreError::Timeout {
                endpoint: sentinel.clone(),
                timeout: self.timeout,
            })?
    }
}

#[async_trait]
impl EndpointLocator for SentinelLocator {
    async fn locate(&self) -> Result<Endpoint> {
        let mut failures = Vec::with_capacity(self.sentinels.len());

        for sentinel in &self.sentinels {
            trace!("Asking sentinel {} for master '{}'", sentinel, self.master_name);
            match self.ask(sentinel).await {
                Ok(Some(master)) => {
                    debug!(%sentinel, %master, "Sentinel named master");
                    return Ok(master);
                }
                Ok(None) => {
                    failures.push(format!("{sentinel}: unknown master"));
                }
                Err(e) => {
                    debug!(%sentinel, error = %e, "Sentinel query failed");
                    failures.push(e.to_string());
                }
            }
        }

        let reason = if failures.is_empty() {
            "no sentinels configured".to_string()
        } else {
            failures.join("; ")
        };

        Err(StoreError::Discovery {
            master_name: self.master_name.clone(),
            reason,
        })
    }
}

/// Connection parameters for `endpoint` and logical database `db`
pub(crate) fn connection_info(endpoint: &Endpoint, db: i64) -> redis::ConnectionInfo {
    redis::ConnectionInfo {
        addr: redis::ConnectionAddr::Tcp(endpoint.host.clone(), endpoint.port),
        redis: redis::RedisConnectionInfo {
            db,
            ..Default::default()
        },
    }
}
