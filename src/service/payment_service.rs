use crate::domain::payment::{err, to_minor, CreatePaymentRequest, ErrorEnvelope, QueuedPayment};
use crate::domain::summary::{PaymentSummary, SummaryRange};
use crate::ledger::SummaryLedger;
use crate::store::{enqueue_payment, StateStore};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Ingress operations: validated enqueue and summary reads.
#[derive(Clone)]
pub struct PaymentService {
    pub store: Arc<dyn StateStore>,
    pub ledger: SummaryLedger,
}

impl PaymentService {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            ledger: SummaryLedger::new(store.clone()),
            store,
        }
    }

    pub async fn enqueue(&self, req: CreatePaymentRequest) -> Result<QueuedPayment, (StatusCode, ErrorEnvelope)> {
        validate_request(&req)?;

        let payment = QueuedPayment::new(req.correlation_id, req.amount, Utc::now());
        enqueue_payment(self.store.as_ref(), &payment).await.map_err(|e| {
            tracing::error!("failed to enqueue payment {}: {}", payment.correlation_id, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                err("STORE_UNAVAILABLE", "payment could not be queued"),
            )
        })?;
        Ok(payment)
    }

    pub async fn summary(&self, query: SummaryQuery) -> Result<PaymentSummary, (StatusCode, ErrorEnvelope)> {
        let range = parse_range(&query)?;
        self.ledger.get_summary(range).await.map_err(|e| {
            tracing::error!("failed to read payment summary: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                err("INTERNAL_ERROR", "failed to read payment summary"),
            )
        })
    }
}

pub fn validate_request(req: &CreatePaymentRequest) -> Result<(), (StatusCode, ErrorEnvelope)> {
    if req.correlation_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            err("INVALID_CORRELATION_ID", "correlationId must not be empty"),
        ));
    }
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            err("INVALID_AMOUNT", "amount must be > 0"),
        ));
    }
    if to_minor(req.amount).is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            err("INVALID_AMOUNT", "amount must have at most two decimal places"),
        ));
    }
    Ok(())
}

pub fn parse_range(query: &SummaryQuery) -> Result<SummaryRange, (StatusCode, ErrorEnvelope)> {
    let range = SummaryRange {
        from: parse_timestamp(query.from.as_deref(), "from")?,
        to: parse_timestamp(query.to.as_deref(), "to")?,
    };
    if !range.is_valid() {
        return Err((
            StatusCode::BAD_REQUEST,
            err("INVALID_RANGE", "'from' timestamp cannot be after 'to' timestamp"),
        ));
    }
    Ok(range)
}

fn parse_timestamp(raw: Option<&str>, name: &str) -> Result<Option<DateTime<Utc>>, (StatusCode, ErrorEnvelope)> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        // A literal '+' offset arrives as a space after query decoding.
        Some(s) => DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_rfc3339(&s.replace(' ', "+")))
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| {
                (
                    StatusCode::BAD_REQUEST,
                    err(
                        "INVALID_TIMESTAMP",
                        &format!("invalid '{}' timestamp, use ISO 8601", name),
                    ),
                )
            }),
    }
}
