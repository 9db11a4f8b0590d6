use crate::config::AppConfig;
use crate::domain::health::HealthReport;
use crate::domain::payment::{ProcessorPaymentRequest, ProcessorPaymentResponse};
use crate::domain::processor::{Processor, ProcessorEndpoints};
use crate::processor::{ProcessorClient, SubmitOutcome};
use anyhow::{bail, Result};
use std::time::Duration;

pub struct HttpProcessorClient {
    pub default_endpoints: ProcessorEndpoints,
    pub fallback_endpoints: ProcessorEndpoints,
    pub timeout: Duration,
    pub client: reqwest::Client,
}

impl HttpProcessorClient {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            default_endpoints: cfg.default_processor.clone(),
            fallback_endpoints: cfg.fallback_processor.clone(),
            timeout: cfg.request_timeout,
            client: reqwest::Client::new(),
        }
    }

    fn endpoints(&self, processor: Processor) -> &ProcessorEndpoints {
        match processor {
            Processor::Default => &self.default_endpoints,
            Processor::Fallback => &self.fallback_endpoints,
        }
    }
}

#[async_trait::async_trait]
impl ProcessorClient for HttpProcessorClient {
    async fn health(&self, processor: Processor) -> Result<HealthReport> {
        let resp = self
            .client
            .get(&self.endpoints(processor).health_url)
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("health endpoint of {} answered {}", processor, resp.status().as_u16());
        }
        let report = resp.json::<HealthReport>().await?;
        Ok(report)
    }

    async fn submit(&self, processor: Processor, request: &ProcessorPaymentRequest) -> Result<SubmitOutcome> {
        let resp = self
            .client
            .post(&self.endpoints(processor).payment_url)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            let body = resp.text().await.unwrap_or_default();
            return Ok(SubmitOutcome::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: ProcessorPaymentResponse = resp.json().await.unwrap_or_default();
        Ok(SubmitOutcome::Accepted {
            message: parsed.message,
        })
    }
}
