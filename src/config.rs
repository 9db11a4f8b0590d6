use crate::domain::processor::ProcessorEndpoints;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: String,
    pub store_backend: StoreBackend,
    pub default_processor: ProcessorEndpoints,
    pub fallback_processor: ProcessorEndpoints,
    pub health_check_interval: Duration,
    pub health_tick: Duration,
    pub request_timeout: Duration,
    pub processor_threshold_ms: u64,
    pub max_retries: u32,
    pub dequeue_timeout: Duration,
    pub idempotency_ttl: Duration,
    pub worker_count: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string()),
            store_backend: match std::env::var("STORE_BACKEND").as_deref() {
                Ok("memory") => StoreBackend::Memory,
                _ => StoreBackend::Redis,
            },
            default_processor: ProcessorEndpoints::from_base(
                &std::env::var("DEFAULT_PROCESSOR_URL")
                    .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            ),
            fallback_processor: ProcessorEndpoints::from_base(
                &std::env::var("FALLBACK_PROCESSOR_URL")
                    .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            ),
            health_check_interval: Duration::from_millis(env_parse("HEALTH_CHECK_INTERVAL_MS", 5000)),
            health_tick: Duration::from_millis(env_parse("HEALTH_TICK_MS", 1000)),
            request_timeout: Duration::from_millis(env_parse("REQUEST_TIMEOUT_MS", 2000)),
            processor_threshold_ms: env_parse("PROCESSOR_THRESHOLD_MS", 300),
            max_retries: env_parse("MAX_RETRIES", 3u32),
            dequeue_timeout: Duration::from_millis(env_parse("DEQUEUE_TIMEOUT_MS", 5000)),
            idempotency_ttl: Duration::from_millis(env_parse("IDEMPOTENCY_TTL_MS", 5000)),
            worker_count: env_parse("WORKER_COUNT", 1usize).max(1),
        }
    }
}

/// Reads `key` as `T`. Missing, malformed or out-of-range values fall back to `default`.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    parse_or(std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|s| s.trim().parse::<T>().ok()).unwrap_or(default)
}
