use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub correlation_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentResponse {
    pub message: String,
}

/// A payment waiting in `payment_queue`. The correlation id survives retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedPayment {
    pub correlation_id: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
}

impl QueuedPayment {
    pub fn new(correlation_id: String, amount: f64, now: DateTime<Utc>) -> Self {
        Self {
            correlation_id,
            amount,
            created_at: now,
            retry_count: 0,
        }
    }

    pub fn next_attempt(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

/// Outbound body of `POST /payments` on a processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorPaymentRequest {
    pub correlation_id: String,
    pub amount: f64,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessorPaymentResponse {
    #[serde(default)]
    pub message: String,
}

const MINOR_UNIT_TOLERANCE: f64 = 1e-6;

/// Converts a decimal amount to hundredths. `None` when the amount has
/// sub-cent precision or is out of range, so nothing is silently rounded away.
pub fn to_minor(amount: f64) -> Option<i64> {
    let scaled = amount * 100.0;
    let cents = scaled.round();
    if !scaled.is_finite() || cents.abs() >= i64::MAX as f64 {
        return None;
    }
    if (scaled - cents).abs() > MINOR_UNIT_TOLERANCE {
        return None;
    }
    Some(cents as i64)
}

pub fn from_minor(amount_minor: i64) -> f64 {
    amount_minor as f64 / 100.0
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

pub fn err(code: &str, message: &str) -> ErrorEnvelope {
    ErrorEnvelope {
        error: ErrorPayload {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_absorb_float_noise() {
        assert_eq!(to_minor(25.50), Some(2550));
        assert_eq!(to_minor(19.9), Some(1990));
        assert_eq!(to_minor(0.1), Some(10));
        assert_eq!(to_minor(42.10), Some(4210));
        assert_eq!(from_minor(2550), 25.5);
    }

    #[test]
    fn sub_cent_amounts_have_no_minor_form() {
        assert_eq!(to_minor(0.004), None);
        assert_eq!(to_minor(1.005), None);
        assert_eq!(to_minor(f64::INFINITY), None);
        assert_eq!(to_minor(1e300), None);
    }

    #[test]
    fn queued_payment_uses_camel_case_and_defaults_retry_count() {
        let raw = r#"{"correlationId":"c-1","amount":10.0,"createdAt":"2025-07-01T12:00:00Z"}"#;
        let p: QueuedPayment = serde_json::from_str(raw).unwrap();
        assert_eq!(p.correlation_id, "c-1");
        assert_eq!(p.retry_count, 0);
        assert_eq!(p.next_attempt().retry_count, 1);
        assert_eq!(p.next_attempt().correlation_id, "c-1");
    }
}
