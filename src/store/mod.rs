use crate::domain::health::ProcessorHealth;
use crate::domain::payment::QueuedPayment;
use crate::domain::processor::Processor;
use anyhow::Result;
use std::time::Duration;

pub mod keys;
pub mod memory_store;
pub mod redis_store;

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    IncrBy { key: String, by: i64 },
    ZAdd { key: String, score: f64, member: String },
}

/// The shared key-value/list/sorted-set store every task talks through.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Sets `key` only when absent. Returns whether this call created it.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    async fn del(&self, key: &str) -> Result<()>;

    async fn lpush(&self, key: &str, value: &str) -> Result<()>;

    /// Pops from the tail, waiting up to `timeout`. `None` means the wait expired.
    async fn brpop(&self, key: &str, timeout: Duration) -> Result<Option<String>>;

    async fn llen(&self, key: &str) -> Result<u64>;

    /// Members with `min <= score <= max`, ascending. `None` bounds are infinite.
    async fn zrange_by_score(&self, key: &str, min: Option<f64>, max: Option<f64>) -> Result<Vec<String>>;

    /// Applies every op or none of them.
    async fn atomic(&self, ops: Vec<StoreOp>) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

pub async fn read_health(store: &dyn StateStore, processor: Processor) -> Result<Option<ProcessorHealth>> {
    let payload = store.get(&keys::health(processor)).await?;
    match payload {
        Some(p) => Ok(Some(serde_json::from_str(&p)?)),
        None => Ok(None),
    }
}

pub async fn write_health(store: &dyn StateStore, processor: Processor, health: &ProcessorHealth) -> Result<()> {
    let payload = serde_json::to_string(health)?;
    store.set(&keys::health(processor), &payload).await
}

pub async fn enqueue_payment(store: &dyn StateStore, payment: &QueuedPayment) -> Result<()> {
    let payload = serde_json::to_string(payment)?;
    store.lpush(keys::PAYMENT_QUEUE, &payload).await
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEntry {
    Payment(QueuedPayment),
    /// Popped but unparseable. It is already off the queue.
    Malformed { raw: String, reason: String },
}

/// Blocking pop of the oldest queued payment. `Err` is reserved for store failures.
pub async fn dequeue_payment(store: &dyn StateStore, wait: Duration) -> Result<Option<QueueEntry>> {
    let Some(raw) = store.brpop(keys::PAYMENT_QUEUE, wait).await? else {
        return Ok(None);
    };
    let entry = match serde_json::from_str::<QueuedPayment>(&raw) {
        Ok(payment) => QueueEntry::Payment(payment),
        Err(e) => QueueEntry::Malformed {
            raw,
            reason: e.to_string(),
        },
    };
    Ok(Some(entry))
}

pub async fn queue_len(store: &dyn StateStore) -> Result<u64> {
    store.llen(keys::PAYMENT_QUEUE).await
}
