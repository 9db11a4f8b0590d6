use crate::domain::processor::Processor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("all processors are down")]
    ProcessorsDown,
    #[error("health of {0} processor is unavailable")]
    HealthUnavailable(Processor),
    #[error("{processor} processor rejected payment with status {status}")]
    Rejected { processor: Processor, status: u16 },
}
