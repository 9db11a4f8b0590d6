use crate::domain::health::HealthReport;
use crate::domain::payment::ProcessorPaymentRequest;
use crate::domain::processor::Processor;
use anyhow::Result;

pub mod http;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted { message: String },
    Rejected { status: u16, body: String },
}

/// Outbound calls to the two downstream processors.
///
/// Transport failures and timeouts come back as `Err`; an HTTP answer of 400 or
/// above is a `Rejected` outcome.
#[async_trait::async_trait]
pub trait ProcessorClient: Send + Sync {
    async fn health(&self, processor: Processor) -> Result<HealthReport>;

    async fn submit(&self, processor: Processor, request: &ProcessorPaymentRequest) -> Result<SubmitOutcome>;
}
