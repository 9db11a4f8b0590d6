use crate::domain::health::ProcessorHealth;
use crate::domain::processor::Processor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Use(Processor),
    ProcessorsDown,
}

/// Default wins unless it is failing or slower than fallback by more than `threshold_ms`.
/// A failing fallback's latency is ignored.
pub fn select_processor(default: &ProcessorHealth, fallback: &ProcessorHealth, threshold_ms: u64) -> RouteDecision {
    let default_fast_enough =
        fallback.failing || default.latency_ms() <= fallback.latency_ms().saturating_add(threshold_ms);

    if !default.failing && default_fast_enough {
        RouteDecision::Use(Processor::Default)
    } else if !fallback.failing {
        RouteDecision::Use(Processor::Fallback)
    } else {
        RouteDecision::ProcessorsDown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health(failing: bool, min_response_time: u64) -> ProcessorHealth {
        ProcessorHealth {
            failing,
            min_response_time: Some(min_response_time),
            last_checked: chrono::Utc::now(),
        }
    }

    #[test]
    fn prefers_default_within_threshold() {
        let out = select_processor(&health(false, 100), &health(false, 200), 300);
        assert_eq!(out, RouteDecision::Use(Processor::Default));

        let out = select_processor(&health(false, 500), &health(false, 200), 300);
        assert_eq!(out, RouteDecision::Use(Processor::Default));
    }

    #[test]
    fn slow_default_goes_to_fallback() {
        let out = select_processor(&health(false, 501), &health(false, 200), 300);
        assert_eq!(out, RouteDecision::Use(Processor::Fallback));
    }

    #[test]
    fn failing_default_goes_to_fallback_regardless_of_latency() {
        let out = select_processor(&health(true, 0), &health(false, 5_000), 300);
        assert_eq!(out, RouteDecision::Use(Processor::Fallback));
    }

    #[test]
    fn slow_default_still_used_when_fallback_is_down() {
        let fallback = ProcessorHealth::failing(chrono::Utc::now());
        let out = select_processor(&health(false, 2_000), &fallback, 300);
        assert_eq!(out, RouteDecision::Use(Processor::Default));
    }

    #[test]
    fn both_failing_is_processors_down() {
        let now = chrono::Utc::now();
        let out = select_processor(&ProcessorHealth::failing(now), &ProcessorHealth::failing(now), 300);
        assert_eq!(out, RouteDecision::ProcessorsDown);
    }
}
