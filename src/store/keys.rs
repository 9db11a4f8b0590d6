use crate::domain::processor::Processor;

pub const PAYMENT_QUEUE: &str = "payment_queue";

pub fn health(processor: Processor) -> String {
    format!("health:{}", processor.as_str())
}

pub fn idempotency(correlation_id: &str) -> String {
    format!("processed:{}", correlation_id)
}

pub fn total_amount(processor: Processor) -> String {
    format!("summary:total_amount:{}", processor.as_str())
}

pub fn total_count(processor: Processor) -> String {
    format!("summary:total_count:{}", processor.as_str())
}

pub fn records(processor: Processor) -> String {
    format!("payments:{}:records", processor.as_str())
}
