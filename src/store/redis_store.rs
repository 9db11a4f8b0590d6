use crate::store::{StateStore, StoreOp};
use anyhow::{anyhow, Result};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Connections reserved for blocking commands. A caller checks one out for a
/// single call and hands it back; at most `capacity` stay idle.
pub struct IdleConnections<C> {
    idle: Mutex<Vec<C>>,
    capacity: usize,
}

impl<C> IdleConnections<C> {
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub async fn checkout(&self) -> Option<C> {
        self.idle.lock().await.pop()
    }

    pub async fn checkin(&self, conn: C) {
        let mut idle = self.idle.lock().await;
        if idle.len() < self.capacity {
            idle.push(conn);
        }
    }

    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }
}

#[derive(Clone)]
pub struct RedisStore {
    pub client: redis::Client,
    conn: MultiplexedConnection,
    blocking: Arc<IdleConnections<MultiplexedConnection>>,
}

impl RedisStore {
    /// `blocking_connections` should match the number of router workers.
    pub async fn connect(redis_url: &str, blocking_connections: usize) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = Self::open(&client).await?;
        Ok(Self {
            client,
            conn,
            blocking: Arc::new(IdleConnections::new(blocking_connections)),
        })
    }

    async fn open(client: &redis::Client) -> Result<MultiplexedConnection> {
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| anyhow!("timed out connecting to redis after {:?}", CONNECT_TIMEOUT))??;
        Ok(conn)
    }

    fn score_arg(bound: Option<f64>, open: &str) -> String {
        match bound {
            Some(v) => format!("{}", v),
            None => open.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl StateStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(key).await?;
        Ok(payload)
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.get(key);
        }
        let values: Vec<Option<String>> = pipe.query_async(&mut conn).await?;
        Ok(values)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: usize = conn.del(key).await?;
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: usize = conn.lpush(key, value).await?;
        Ok(())
    }

    async fn brpop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        // BRPOP parks the connection, so it must not share the multiplexed one.
        let mut conn = match self.blocking.checkout().await {
            Some(conn) => conn,
            None => Self::open(&self.client).await?,
        };
        let reply: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(key)
            .arg(timeout.as_secs_f64().max(0.01))
            .query_async(&mut conn)
            .await?;
        // A connection that errored is dropped above instead of being reused.
        self.blocking.checkin(conn).await;
        Ok(reply.map(|(_, value)| value))
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(key).await?;
        Ok(len)
    }

    async fn zrange_by_score(&self, key: &str, min: Option<f64>, max: Option<f64>) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn
            .zrangebyscore(key, Self::score_arg(min, "-inf"), Self::score_arg(max, "+inf"))
            .await?;
        Ok(members)
    }

    async fn atomic(&self, ops: Vec<StoreOp>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in ops {
            match op {
                StoreOp::IncrBy { key, by } => {
                    pipe.cmd("INCRBY").arg(key).arg(by).ignore();
                }
                StoreOp::ZAdd { key, score, member } => {
                    pipe.cmd("ZADD").arg(key).arg(score).arg(member).ignore();
                }
            }
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
