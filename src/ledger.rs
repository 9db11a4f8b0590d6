use crate::domain::payment::{from_minor, to_minor};
use crate::domain::processor::Processor;
use crate::domain::summary::{LedgerRecord, PaymentSummary, ProcessorSummary, SummaryRange};
use crate::store::{keys, StateStore, StoreOp};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Per-processor running totals plus an append-only, time-scored index of deliveries.
///
/// The two query paths are not reconciled: unbounded queries read the running
/// totals, bounded ones recompute from the index.
#[derive(Clone)]
pub struct SummaryLedger {
    pub store: Arc<dyn StateStore>,
}

impl SummaryLedger {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Adds one delivery to the processor's totals and index in a single atomic batch.
    pub async fn record_success(
        &self,
        processor: Processor,
        correlation_id: &str,
        amount: f64,
        at: DateTime<Utc>,
    ) -> Result<LedgerRecord> {
        let amount_minor =
            to_minor(amount).ok_or_else(|| anyhow!("amount {} is not a whole number of cents", amount))?;
        let record = LedgerRecord {
            correlation_id: correlation_id.to_string(),
            amount_minor,
            timestamp_ms: at.timestamp_millis(),
        };
        let member = serde_json::to_string(&record)?;

        self.store
            .atomic(vec![
                StoreOp::IncrBy {
                    key: keys::total_amount(processor),
                    by: record.amount_minor,
                },
                StoreOp::IncrBy {
                    key: keys::total_count(processor),
                    by: 1,
                },
                StoreOp::ZAdd {
                    key: keys::records(processor),
                    score: record.timestamp_ms as f64,
                    member,
                },
            ])
            .await?;

        Ok(record)
    }

    pub async fn get_summary(&self, range: SummaryRange) -> Result<PaymentSummary> {
        if !range.is_valid() {
            bail!("summary range starts after it ends");
        }

        let default = self
            .processor_summary(Processor::Default, range)
            .await
            .context("failed to read default processor summary")?;
        let fallback = self
            .processor_summary(Processor::Fallback, range)
            .await
            .context("failed to read fallback processor summary")?;

        Ok(PaymentSummary { default, fallback })
    }

    pub async fn processor_summary(&self, processor: Processor, range: SummaryRange) -> Result<ProcessorSummary> {
        if range.is_unbounded() {
            self.running_totals(processor).await
        } else {
            self.scan_range(processor, range).await
        }
    }

    pub async fn running_totals(&self, processor: Processor) -> Result<ProcessorSummary> {
        let values = self
            .store
            .get_many(&[keys::total_amount(processor), keys::total_count(processor)])
            .await?;

        let amount_minor = parse_counter(values.first().cloned().flatten(), "total_amount")?;
        let count = parse_counter(values.get(1).cloned().flatten(), "total_count")?;

        Ok(ProcessorSummary {
            total_requests: count.max(0) as u64,
            total_amount: from_minor(amount_minor),
        })
    }

    pub async fn scan_range(&self, processor: Processor, range: SummaryRange) -> Result<ProcessorSummary> {
        let min = range.from.map(|t| t.timestamp_millis() as f64);
        let max = range.to.map(|t| t.timestamp_millis() as f64);
        let members = self
            .store
            .zrange_by_score(&keys::records(processor), min, max)
            .await?;

        let mut total_requests = 0_u64;
        let mut amount_minor = 0_i64;
        for member in members {
            match serde_json::from_str::<LedgerRecord>(&member) {
                Ok(record) => {
                    total_requests += 1;
                    amount_minor += record.amount_minor;
                }
                Err(e) => {
                    tracing::warn!("skipping malformed ledger record for {}: {}", processor, e);
                }
            }
        }

        Ok(ProcessorSummary {
            total_requests,
            total_amount: from_minor(amount_minor),
        })
    }
}

fn parse_counter(raw: Option<String>, name: &str) -> Result<i64> {
    match raw {
        Some(v) => v
            .parse::<i64>()
            .with_context(|| format!("{} counter holds non-integer value {:?}", name, v)),
        None => Ok(0),
    }
}
