use crate::config::AppConfig;
use crate::domain::error::RouteError;
use crate::domain::health::ProcessorHealth;
use crate::domain::payment::{ProcessorPaymentRequest, QueuedPayment};
use crate::domain::processor::Processor;
use crate::ledger::SummaryLedger;
use crate::processor::{ProcessorClient, SubmitOutcome};
use crate::router::policy::{select_processor, RouteDecision};
use crate::router::retry::{next_directive, RetryDirective};
use crate::store::{dequeue_payment, enqueue_payment, keys, read_health, QueueEntry, StateStore};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

const DEQUEUE_ERROR_PAUSE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub processor_threshold_ms: u64,
    pub max_retries: u32,
    pub dequeue_timeout: Duration,
    pub idempotency_ttl: Duration,
}

impl RouterSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            processor_threshold_ms: cfg.processor_threshold_ms,
            max_retries: cfg.max_retries,
            dequeue_timeout: cfg.dequeue_timeout,
            idempotency_ttl: cfg.idempotency_ttl,
        }
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            processor_threshold_ms: 300,
            max_retries: 3,
            dequeue_timeout: Duration::from_secs(5),
            idempotency_ttl: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The processor accepted the payment. `ledger_recorded` is false when the
    /// local ledger could not be updated afterwards.
    Delivered { processor: Processor, ledger_recorded: bool },
    /// Another attempt already holds the idempotency marker.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Delivered(Processor),
    Duplicate,
    Rescheduled { retry_count: u32, delay: Duration },
    Abandoned { attempts: u32 },
}

/// Drains `payment_queue`, routes each payment and decides retry or give-up.
#[derive(Clone)]
pub struct PaymentRouter {
    pub store: Arc<dyn StateStore>,
    pub client: Arc<dyn ProcessorClient>,
    pub ledger: SummaryLedger,
    pub settings: RouterSettings,
}

impl PaymentRouter {
    pub async fn run(self, worker_id: usize) {
        tracing::info!("payment router worker {} started", worker_id);
        loop {
            match dequeue_payment(self.store.as_ref(), self.settings.dequeue_timeout).await {
                Ok(Some(QueueEntry::Payment(payment))) => {
                    self.handle(payment).await;
                }
                Ok(Some(QueueEntry::Malformed { raw, reason })) => {
                    tracing::warn!("worker {} dropped malformed queue entry {:?}: {}", worker_id, raw, reason);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("worker {} failed to dequeue payment: {}", worker_id, e);
                    tokio::time::sleep(DEQUEUE_ERROR_PAUSE).await;
                }
            }
        }
    }

    /// Runs one attempt and turns any failure into a retry or an abandonment.
    pub async fn handle(&self, payment: QueuedPayment) -> PaymentOutcome {
        match self.try_process(&payment).await {
            Ok(Delivery::Delivered { processor, .. }) => PaymentOutcome::Delivered(processor),
            Ok(Delivery::Duplicate) => PaymentOutcome::Duplicate,
            Err(e) => {
                tracing::warn!(
                    correlation_id = %payment.correlation_id,
                    retry_count = payment.retry_count,
                    "payment attempt failed: {:#}",
                    e
                );
                self.reschedule_or_abandon(payment)
            }
        }
    }

    pub async fn try_process(&self, payment: &QueuedPayment) -> Result<Delivery> {
        let default = self.current_health(Processor::Default).await?;
        let fallback = self.current_health(Processor::Fallback).await?;

        match select_processor(&default, &fallback, self.settings.processor_threshold_ms) {
            RouteDecision::Use(processor) => self.process_payment(processor, payment).await,
            RouteDecision::ProcessorsDown => Err(RouteError::ProcessorsDown.into()),
        }
    }

    pub async fn process_payment(&self, processor: Processor, payment: &QueuedPayment) -> Result<Delivery> {
        let marker = keys::idempotency(&payment.correlation_id);
        let claimed = self
            .store
            .set_nx_ex(&marker, processor.as_str(), self.settings.idempotency_ttl)
            .await?;
        if !claimed {
            tracing::info!(
                correlation_id = %payment.correlation_id,
                "payment already in flight or recently delivered, skipping"
            );
            return Ok(Delivery::Duplicate);
        }

        let request = ProcessorPaymentRequest {
            correlation_id: payment.correlation_id.clone(),
            amount: payment.amount,
            requested_at: chrono::Utc::now(),
        };

        let failure: anyhow::Error = match self.client.submit(processor, &request).await {
            Ok(SubmitOutcome::Accepted { .. }) => return Ok(self.settle(processor, payment).await),
            Ok(SubmitOutcome::Rejected { status, body }) => {
                tracing::debug!("{} processor rejected payment: {}", processor, body);
                RouteError::Rejected { processor, status }.into()
            }
            Err(e) => e.context(format!("{} processor call failed", processor)),
        };

        // The marker TTL still bounds the block if this release is lost.
        if let Err(e) = self.store.del(&marker).await {
            tracing::warn!(
                correlation_id = %payment.correlation_id,
                "failed to release idempotency marker: {}",
                e
            );
        }
        Err(failure)
    }

    async fn settle(&self, processor: Processor, payment: &QueuedPayment) -> Delivery {
        match self
            .ledger
            .record_success(processor, &payment.correlation_id, payment.amount, chrono::Utc::now())
            .await
        {
            Ok(_) => {
                tracing::info!(
                    correlation_id = %payment.correlation_id,
                    amount = payment.amount,
                    "payment delivered via {} processor",
                    processor
                );
                Delivery::Delivered {
                    processor,
                    ledger_recorded: true,
                }
            }
            Err(e) => {
                tracing::error!(
                    target: "payments_relay::ledger::critical",
                    critical = true,
                    correlation_id = %payment.correlation_id,
                    processor = %processor,
                    amount = payment.amount,
                    "processor accepted payment but ledger update failed: {:#}",
                    e
                );
                Delivery::Delivered {
                    processor,
                    ledger_recorded: false,
                }
            }
        }
    }

    async fn current_health(&self, processor: Processor) -> Result<ProcessorHealth> {
        read_health(self.store.as_ref(), processor)
            .await?
            .ok_or_else(|| RouteError::HealthUnavailable(processor).into())
    }

    fn reschedule_or_abandon(&self, payment: QueuedPayment) -> PaymentOutcome {
        let next = payment.next_attempt();
        match next_directive(next.retry_count, self.settings.max_retries) {
            RetryDirective::Reschedule { retry_count, delay } => {
                tracing::warn!(
                    correlation_id = %next.correlation_id,
                    "retry {} scheduled in {:?}",
                    retry_count,
                    delay
                );
                let store = self.store.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Err(e) = enqueue_payment(store.as_ref(), &next).await {
                        tracing::error!(
                            correlation_id = %next.correlation_id,
                            "failed to re-enqueue payment for retry: {}",
                            e
                        );
                    }
                });
                PaymentOutcome::Rescheduled { retry_count, delay }
            }
            RetryDirective::Abandon { attempts } => {
                tracing::error!(
                    correlation_id = %next.correlation_id,
                    amount = next.amount,
                    "payment abandoned after {} attempts",
                    attempts
                );
                PaymentOutcome::Abandoned { attempts }
            }
        }
    }
}
