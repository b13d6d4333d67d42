//! Redis implementation of the lease store

use crate::locator::connection_info;
use crate::{ttl_seconds, EndpointLocator, LeaseStore, Result, SetOutcome, StoreConnector, StoreError};
use async_trait::async_trait;
use cron_ha_common::Endpoint;
use redis::aio::MultiplexedConnection;
use std::sync::Arc;
use std::time::Duration;
use std::future::Future;
use tracing::{debug, trace};

/// Time allowed for opening a store connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Time allowed for the reply to a single store command
///
/// Keeps a tick bounded when the store accepts connections but stops
/// answering, e.g. during a failover pause.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Opens Redis connections to whatever endpoint the locator names
pub struct RedisConnector {
    locator: Arc<dyn EndpointLocator>,
    db: i64,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisConnector {
    pub fn new(locator: Arc<dyn EndpointLocator>, db: i64) -> Self {
        Self {
            locator,
            db,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    async fn connect(&self) -> Result<Box<dyn LeaseStore>> {
        let endpoint = self.locator.locate().await?;
        debug!(%endpoint, db = self.db, "Connecting to store");

        let client = redis::Client::open(connection_info(&endpoint, self.db)).map_err(|source| {
            StoreError::Connect {
                endpoint: endpoint.clone(),
                source,
            }
        })?;

        let conn = tokio::time::timeout(
            self.connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| StoreError::Timeout {
            endpoint: endpoint.clone(),
            timeout: self.connect_timeout,
        })?
        .map_err(|source| StoreError::Connect {
            endpoint: endpoint.clone(),
            source,
        })?;

        Ok(Box::new(RedisLeaseStore {
            conn,
            endpoint,
            command_timeout: self.command_timeout,
        }))
    }
}

/// An open Redis connection
///
/// Every command is bounded by the connector's command timeout.
pub struct RedisLeaseStore {
    conn: MultiplexedConnection,
    endpoint: Endpoint,
    command_timeout: Duration,
}

/// Await a command reply for at most `limit`
async fn bounded<T>(
    limit: Duration,
    endpoint: &Endpoint,
    command: &'static str,
    key: &str,
    reply: impl Future<Output = redis::RedisResult<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, reply)
        .await
        .map_err(|_| StoreError::Timeout {
            endpoint: endpoint.clone(),
            timeout: limit,
        })?
        .map_err(|e| StoreError::command(command, key, e))
}

#[async_trait]
impl LeaseStore for RedisLeaseStore {
    async fn set_if_absent(
        &mut self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<SetOutcome> {
        trace!(key, value, "SET NX EX");
        let reply: Option<String> = bounded(
            self.command_timeout,
            &self.endpoint,
            "SET",
            key,
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("EX")
                .arg(ttl_seconds(ttl))
                .query_async(&mut self.conn),
        )
        .await?;

        let current = self.get(key).await?;
        Ok(SetOutcome {
            written: reply.is_some(),
            current,
        })
    }

    async fn force_set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        trace!(key, value, "SET EX");
        bounded(
            self.command_timeout,
            &self.endpoint,
            "SET",
            key,
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_seconds(ttl))
                .query_async::<()>(&mut self.conn),
        )
        .await
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        bounded(
            self.command_timeout,
            &self.endpoint,
            "GET",
            key,
            redis::cmd("GET").arg(key).query_async(&mut self.conn),
        )
        .await
    }

    async fn refresh_ttl(&mut self, key: &str, ttl: Duration) -> Result<bool> {
        trace!(key, "EXPIRE");
        let updated: i64 = bounded(
            self.command_timeout,
            &self.endpoint,
            "EXPIRE",
            key,
            redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl_seconds(ttl))
                .query_async(&mut self.conn),
        )
        .await?;
        Ok(updated == 1)
    }

    fn close(self: Box<Self>) {
        trace!(endpoint = %self.endpoint, "Closing store connection");
    }
}
