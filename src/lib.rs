pub mod config;
pub mod domain {
    pub mod error;
    pub mod health;
    pub mod payment;
    pub mod processor;
    pub mod summary;
}
pub mod health {
    pub mod monitor;
}
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod payments;
    }
}
pub mod ledger;
pub mod processor;
pub mod router {
    pub mod policy;
    pub mod retry;
    pub mod worker;
}
pub mod service {
    pub mod payment_service;
}
pub mod store;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
    pub store: Arc<dyn store::StateStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn store::StateStore>) -> Self {
        Self {
            payment_service: service::payment_service::PaymentService::new(store.clone()),
            store,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::payments::health))
        .route("/payments", post(http::handlers::payments::create_payment))
        .route("/payments-summary", get(http::handlers::payments::payments_summary))
        .route("/ops/readiness", get(http::handlers::ops::readiness))
        .route("/ops/liveness", get(http::handlers::ops::liveness))
        .with_state(state)
}
