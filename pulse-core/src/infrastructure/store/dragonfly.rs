//! Dragonfly/Redis admission store

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Cmd, FromRedisValue};
use std::time::Duration;
use tracing::{debug, warn};

use super::{AdmissionStore, StoreError};

/// Dragonfly/Redis storage backend.
///
/// The `ConnectionManager` multiplexes one connection and reconnects on its
/// own; each call works on a cheap clone of it.
pub struct DragonflyAdmissionStore {
    connection_manager: ConnectionManager,
    command_timeout: Duration,
}

impl DragonflyAdmissionStore {
    /// Connect and verify the server answers `PING`.
    ///
    /// # Arguments
    /// * `url` - Connection URL (e.g., "redis://127.0.0.1:6379")
    /// * `command_timeout` - Bound applied to the connect and to every command
    pub async fn connect(url: &str, command_timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| {
            warn!("Failed to create Redis client for admission store: {}", e);
            StoreError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager =
            match tokio::time::timeout(command_timeout, ConnectionManager::new(client)).await {
                Ok(Ok(manager)) => manager,
                Ok(Err(e)) => {
                    warn!("Failed to create connection manager for admission store: {}", e);
                    return Err(StoreError::Connection(format!(
                        "Failed to create connection manager: {}",
                        e
                    )));
                }
                Err(_) => {
                    return Err(StoreError::Timeout {
                        command: "CONNECT",
                        after_ms: command_timeout.as_millis() as u64,
                    });
                }
            };

        let store = Self {
            connection_manager,
            command_timeout,
        };
        store.ping().await?;

        debug!("Successfully connected to Dragonfly for admission control");

        Ok(store)
    }

    async fn run<T: FromRedisValue>(&self, command: &'static str, cmd: Cmd) -> Result<T, StoreError> {
        let mut conn = self.connection_manager.clone();

        match tokio::time::timeout(self.command_timeout, cmd.query_async::<T>(&mut conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Command {
                command,
                message: e.to_string(),
            }),
            Err(_) => Err(StoreError::Timeout {
                command,
                after_ms: self.command_timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl AdmissionStore for DragonflyAdmissionStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg("1").arg("NX").arg("EX").arg(ttl.as_secs().max(1));

        // Nil reply means the key already existed
        let reply: Option<String> = self.run("SET", cmd).await?;
        Ok(reply.is_some())
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let mut incr = redis::cmd("INCR");
        incr.arg(key);
        let count: u64 = self.run("INCR", incr).await?;

        if count == 1 {
            let mut expire = redis::cmd("EXPIRE");
            expire.arg(key).arg(window.as_secs().max(1));
            self.run::<i64>("EXPIRE", expire).await?;
        }

        Ok(count)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.run::<i64>("DEL", cmd).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.run::<String>("PING", redis::cmd("PING")).await?;
        Ok(())
    }

    async fn cleanup(&self) {
        // Redis handles TTL-based cleanup automatically
    }
}
