use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDirective {
    Reschedule { retry_count: u32, delay: Duration },
    Abandon { attempts: u32 },
}

/// Quadratic backoff: 1s, 4s, 9s, ...
pub fn backoff_delay(retry_count: u32) -> Duration {
    Duration::from_secs(u64::from(retry_count).pow(2))
}

/// `retry_count` is the already-incremented count of the failed payment.
pub fn next_directive(retry_count: u32, max_retries: u32) -> RetryDirective {
    if retry_count <= max_retries {
        RetryDirective::Reschedule {
            retry_count,
            delay: backoff_delay(retry_count),
        }
    } else {
        RetryDirective::Abandon { attempts: retry_count }
    }
}
