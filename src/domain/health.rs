use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest observed health of one processor. Overwritten wholesale by every probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorHealth {
    pub failing: bool,
    pub min_response_time: Option<u64>,
    pub last_checked: DateTime<Utc>,
}

impl ProcessorHealth {
    pub fn failing(now: DateTime<Utc>) -> Self {
        Self {
            failing: true,
            min_response_time: None,
            last_checked: now,
        }
    }

    pub fn observed(report: &HealthReport, now: DateTime<Utc>) -> Self {
        Self {
            failing: report.failing,
            min_response_time: Some(report.min_response_time),
            last_checked: now,
        }
    }

    pub fn latency_ms(&self) -> u64 {
        self.min_response_time.unwrap_or(0)
    }
}

/// Body of `GET /payments/service-health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub failing: bool,
    pub min_response_time: u64,
}
