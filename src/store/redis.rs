//! Redis-backed store.
//!
//! Maps the store surface onto plain Redis list and string commands:
//! RPUSH, RPOPLPUSH / BRPOPLPUSH, EXISTS, PSETEX, GET, PTTL, LLEN, LRANGE,
//! LREM and DEL.

use crate::error::{Error, Result};
use crate::model::Wait;
use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

const MAX_BLOCKING_TIMEOUT: Duration = Duration::from_secs(u32::MAX as u64);

/// Connection handle to a Redis server.
///
/// Ordinary commands share one multiplexed connection. Each blocking move
/// opens its own connection for the duration of the BRPOPLPUSH, since a
/// blocked command holds up everything queued behind it on a connection.
/// Clones may therefore lease concurrently, each bounded by its own timeout.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to `host:port`, selecting `db` and authenticating if a password is given.
    pub async fn connect(
        host: &str,
        port: u16,
        db: i64,
        password: Option<&SecretString>,
    ) -> Result<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_string(), port),
            redis: RedisConnectionInfo {
                db,
                password: password.map(|p| p.expose_secret().to_string()),
                ..Default::default()
            },
        };
        let client = Client::open(info)?;
        let conn = client.get_multiplexed_async_connection().await?;
        debug!(host, port, db, "connected to redis");
        Ok(Self { client, conn })
    }

    /// Round-trip a PING.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl crate::store::Store for RedisStore {
    async fn push(&self, list: &str, value: &[u8]) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn.rpush(list, value).await?;
        Ok(len)
    }

    async fn move_item(&self, src: &str, dst: &str, wait: Wait) -> Result<Option<Vec<u8>>> {
        let item: Option<Vec<u8>> = match wait {
            Wait::NonBlocking => {
                let mut conn = self.conn.clone();
                conn.rpoplpush(src, dst).await?
            }
            // BRPOPLPUSH treats a zero timeout as "wait forever"; so do
            // timeouts too long for the server to represent.
            Wait::Blocking(_) => {
                let timeout = wait
                    .timeout()
                    .filter(|d| *d <= MAX_BLOCKING_TIMEOUT)
                    .map_or(0.0, |d| d.as_secs_f64());
                let mut conn = self.client.get_multiplexed_async_connection().await?;
                conn.brpoplpush(src, dst, timeout).await?
            }
        };
        Ok(item)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(key).await?)
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let millis = u64::try_from(ttl.as_millis())
            .ok()
            .filter(|ms| i64::try_from(*ms).is_ok())
            .ok_or(Error::InvalidLeaseDuration(ttl))?;
        let _: () = conn.pset_ex(key, value, millis).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        // -2: no such key, -1: no expiry.
        let millis: i64 = conn.pttl(key).await?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    async fn length(&self, list: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(list).await?)
    }

    async fn range(&self, list: &str) -> Result<Vec<Vec<u8>>> {
        let mut conn = self.conn.clone();
        Ok(conn.lrange(list, 0, -1).await?)
    }

    async fn remove_all(&self, list: &str, value: &[u8]) -> Result<usize> {
        let mut conn = self.conn.clone();
        // LREM with count 0 removes every occurrence.
        Ok(conn.lrem(list, 0, value).await?)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(key).await?;
        Ok(removed > 0)
    }
}
