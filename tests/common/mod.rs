#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use payments_relay::domain::health::{HealthReport, ProcessorHealth};
use payments_relay::domain::payment::ProcessorPaymentRequest;
use payments_relay::domain::processor::Processor;
use payments_relay::ledger::SummaryLedger;
use payments_relay::processor::{ProcessorClient, SubmitOutcome};
use payments_relay::router::worker::{PaymentRouter, RouterSettings};
use payments_relay::store::memory_store::InMemoryStore;
use payments_relay::store::{write_health, StateStore, StoreOp};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted processors. A submit status of 0 simulates a transport error.
#[derive(Default)]
pub struct MockProcessorClient {
    pub health: Mutex<HashMap<Processor, Option<HealthReport>>>,
    pub submit_status: Mutex<HashMap<Processor, u16>>,
    pub submit_delay: Mutex<Option<Duration>>,
    pub submissions: Mutex<Vec<(Processor, ProcessorPaymentRequest)>>,
    pub health_calls: Mutex<Vec<Processor>>,
}

impl MockProcessorClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_health(&self, processor: Processor, report: Option<HealthReport>) {
        self.health.lock().unwrap().insert(processor, report);
    }

    pub fn set_status(&self, processor: Processor, status: u16) {
        self.submit_status.lock().unwrap().insert(processor, status);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = Some(delay);
    }

    pub fn submissions(&self) -> Vec<(Processor, ProcessorPaymentRequest)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn health_calls_for(&self, processor: Processor) -> usize {
        self.health_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|p| **p == processor)
            .count()
    }
}

#[async_trait::async_trait]
impl ProcessorClient for MockProcessorClient {
    async fn health(&self, processor: Processor) -> Result<HealthReport> {
        self.health_calls.lock().unwrap().push(processor);
        let report = self.health.lock().unwrap().get(&processor).cloned().flatten();
        report.ok_or_else(|| anyhow!("connection refused"))
    }

    async fn submit(&self, processor: Processor, request: &ProcessorPaymentRequest) -> Result<SubmitOutcome> {
        let delay = *self.submit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.submissions.lock().unwrap().push((processor, request.clone()));
        let status = self
            .submit_status
            .lock()
            .unwrap()
            .get(&processor)
            .copied()
            .unwrap_or(200);
        match status {
            0 => bail!("connection reset"),
            s if s >= 400 => Ok(SubmitOutcome::Rejected {
                status: s,
                body: "error".to_string(),
            }),
            _ => Ok(SubmitOutcome::Accepted {
                message: "payment processed successfully".to_string(),
            }),
        }
    }
}

/// Delegates to an in-memory store but fails every atomic batch.
#[derive(Default)]
pub struct BrokenLedgerStore {
    pub inner: InMemoryStore,
}

#[async_trait::async_trait]
impl StateStore for BrokenLedgerStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.inner.get_many(keys).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.inner.set_nx_ex(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.inner.del(key).await
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        self.inner.lpush(key, value).await
    }

    async fn brpop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        self.inner.brpop(key, timeout).await
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        self.inner.llen(key).await
    }

    async fn zrange_by_score(&self, key: &str, min: Option<f64>, max: Option<f64>) -> Result<Vec<String>> {
        self.inner.zrange_by_score(key, min, max).await
    }

    async fn atomic(&self, _ops: Vec<StoreOp>) -> Result<()> {
        bail!("EXECABORT transaction discarded")
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

pub fn report(failing: bool, min_response_time: u64) -> HealthReport {
    HealthReport {
        failing,
        min_response_time,
    }
}

pub async fn seed_health(store: &dyn StateStore, processor: Processor, failing: bool, min_response_time: u64) {
    let health = ProcessorHealth::observed(&report(failing, min_response_time), chrono::Utc::now());
    write_health(store, processor, &health).await.unwrap();
}

pub fn router_with(store: Arc<dyn StateStore>, client: Arc<MockProcessorClient>) -> PaymentRouter {
    PaymentRouter {
        ledger: SummaryLedger::new(store.clone()),
        store,
        client,
        settings: RouterSettings::default(),
    }
}
