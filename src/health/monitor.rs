use crate::domain::health::ProcessorHealth;
use crate::domain::processor::Processor;
use crate::processor::ProcessorClient;
use crate::store::{write_health, StateStore};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// Keeps `health:<processor>` fresh for both processors.
#[derive(Clone)]
pub struct HealthMonitor {
    pub store: Arc<dyn StateStore>,
    pub client: Arc<dyn ProcessorClient>,
    pub interval: Duration,
    pub tick: Duration,
}

impl HealthMonitor {
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_checked: Option<Instant> = None;

        loop {
            ticker.tick().await;
            let now = Instant::now();
            if !is_due(last_checked, now, self.interval) {
                continue;
            }
            tracing::debug!("probing processor health");
            self.probe_all().await;
            last_checked = Some(now);
        }
    }

    /// Probes both processors concurrently; one failing never holds up the other.
    pub async fn probe_all(&self) {
        let (default, fallback) = tokio::join!(
            self.probe(Processor::Default),
            self.probe(Processor::Fallback)
        );
        for (processor, res) in [(Processor::Default, default), (Processor::Fallback, fallback)] {
            if let Err(e) = res {
                tracing::error!("failed to store health for {} processor: {}", processor, e);
            }
        }
    }

    pub async fn probe(&self, processor: Processor) -> Result<ProcessorHealth> {
        let health = match self.client.health(processor).await {
            Ok(report) => {
                tracing::debug!(
                    processor = %processor,
                    failing = report.failing,
                    min_response_time = report.min_response_time,
                    "health probe ok"
                );
                ProcessorHealth::observed(&report, chrono::Utc::now())
            }
            Err(e) => {
                tracing::warn!("health probe for {} processor failed: {}", processor, e);
                ProcessorHealth::failing(chrono::Utc::now())
            }
        };

        write_health(self.store.as_ref(), processor, &health).await?;
        Ok(health)
    }
}

pub fn is_due(last_checked: Option<Instant>, now: Instant, interval: Duration) -> bool {
    match last_checked {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= interval,
    }
}
