use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use payments_relay::domain::health::HealthReport;
use payments_relay::domain::payment::{CreatePaymentRequest, ProcessorPaymentRequest};
use payments_relay::domain::processor::{Processor, ProcessorEndpoints};
use payments_relay::domain::summary::SummaryRange;
use payments_relay::health::monitor::HealthMonitor;
use payments_relay::ledger::SummaryLedger;
use payments_relay::processor::http::HttpProcessorClient;
use payments_relay::router::worker::{PaymentOutcome, PaymentRouter, RouterSettings};
use payments_relay::service::payment_service::PaymentService;
use payments_relay::store::memory_store::InMemoryStore;
use payments_relay::store::{dequeue_payment, queue_len, read_health, QueueEntry, StateStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
struct MockProcessor {
    health: Arc<Mutex<HealthReport>>,
    payment_status: Arc<Mutex<StatusCode>>,
    payments: Arc<Mutex<Vec<ProcessorPaymentRequest>>>,
}

async fn service_health(State(s): State<MockProcessor>) -> Json<HealthReport> {
    let report = s.health.lock().unwrap().clone();
    Json(report)
}

async fn accept_payment(
    State(s): State<MockProcessor>,
    Json(req): Json<ProcessorPaymentRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let status = *s.payment_status.lock().unwrap();
    if status.is_success() {
        s.payments.lock().unwrap().push(req);
        return (status, Json(serde_json::json!({"message": "payment processed successfully"})));
    }
    (status, Json(serde_json::json!({"error": "unavailable"})))
}

async fn spawn_processor(failing: bool, min_response_time: u64) -> (MockProcessor, ProcessorEndpoints) {
    let mock = MockProcessor {
        health: Arc::new(Mutex::new(HealthReport {
            failing,
            min_response_time,
        })),
        payment_status: Arc::new(Mutex::new(StatusCode::OK)),
        payments: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/payments/service-health", get(service_health))
        .route("/payments", post(accept_payment))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (mock, ProcessorEndpoints::from_base(&format!("http://{}", addr)))
}

struct Harness {
    store: Arc<dyn StateStore>,
    monitor: HealthMonitor,
    router: PaymentRouter,
    service: PaymentService,
}

fn harness(default: ProcessorEndpoints, fallback: ProcessorEndpoints) -> Harness {
    let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
    let client = Arc::new(HttpProcessorClient {
        default_endpoints: default,
        fallback_endpoints: fallback,
        timeout: Duration::from_secs(2),
        client: reqwest::Client::new(),
    });
    Harness {
        monitor: HealthMonitor {
            store: store.clone(),
            client: client.clone(),
            interval: Duration::from_secs(5),
            tick: Duration::from_secs(1),
        },
        router: PaymentRouter {
            store: store.clone(),
            client,
            ledger: SummaryLedger::new(store.clone()),
            settings: RouterSettings::default(),
        },
        service: PaymentService::new(store.clone()),
        store,
    }
}

#[tokio::test]
async fn submitted_payment_is_delivered_to_faster_default() {
    let (default, default_endpoints) = spawn_processor(false, 100).await;
    let (fallback, fallback_endpoints) = spawn_processor(false, 200).await;
    let h = harness(default_endpoints, fallback_endpoints);

    h.monitor.probe_all().await;
    h.service
        .enqueue(CreatePaymentRequest {
            correlation_id: "test-0001".to_string(),
            amount: 25.50,
        })
        .await
        .unwrap();

    let Some(QueueEntry::Payment(queued)) = dequeue_payment(h.store.as_ref(), Duration::from_secs(1))
        .await
        .unwrap()
    else {
        panic!("expected a queued payment");
    };
    assert_eq!(h.router.handle(queued).await, PaymentOutcome::Delivered(Processor::Default));

    let received = default.payments.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].correlation_id, "test-0001");
    assert_eq!(received[0].amount, 25.50);
    assert!(fallback.payments.lock().unwrap().is_empty());

    let summary = h.router.ledger.get_summary(SummaryRange::unbounded()).await.unwrap();
    assert_eq!(summary.default.total_requests, 1);
    assert_eq!(summary.default.total_amount, 25.50);
    assert_eq!(summary.fallback.total_requests, 0);
    assert_eq!(queue_len(h.store.as_ref()).await.unwrap(), 0);
}

#[tokio::test]
async fn unreachable_processor_is_probed_as_failing() {
    let (_default, default_endpoints) = spawn_processor(false, 100).await;
    let dead = ProcessorEndpoints::from_base("http://127.0.0.1:9");
    let h = harness(default_endpoints, dead);

    h.monitor.probe_all().await;

    let fallback = read_health(h.store.as_ref(), Processor::Fallback).await.unwrap().unwrap();
    assert!(fallback.failing);
    let default = read_health(h.store.as_ref(), Processor::Default).await.unwrap().unwrap();
    assert!(!default.failing);
    assert_eq!(default.min_response_time, Some(100));
}

#[tokio::test]
async fn server_error_from_processor_triggers_retry() {
    let (default, default_endpoints) = spawn_processor(false, 100).await;
    let (_fallback, fallback_endpoints) = spawn_processor(false, 200).await;
    *default.payment_status.lock().unwrap() = StatusCode::INTERNAL_SERVER_ERROR;
    let h = harness(default_endpoints, fallback_endpoints);

    h.monitor.probe_all().await;
    let payment = h
        .service
        .enqueue(CreatePaymentRequest {
            correlation_id: "test-0002".to_string(),
            amount: 3.0,
        })
        .await
        .unwrap();

    let out = h.router.handle(payment).await;
    assert!(matches!(out, PaymentOutcome::Rescheduled { retry_count: 1, .. }));

    let summary = h.router.ledger.get_summary(SummaryRange::unbounded()).await.unwrap();
    assert_eq!(summary.default.total_requests, 0);
}

#[tokio::test]
async fn worker_loop_drains_queue_end_to_end() {
    let (default, default_endpoints) = spawn_processor(true, 0).await;
    let (fallback, fallback_endpoints) = spawn_processor(false, 50).await;
    let h = harness(default_endpoints, fallback_endpoints);

    h.monitor.probe_all().await;
    for _ in 0..5 {
        h.service
            .enqueue(CreatePaymentRequest {
                correlation_id: uuid::Uuid::new_v4().to_string(),
                amount: 2.0,
            })
            .await
            .unwrap();
    }

    let worker = tokio::spawn(h.router.clone().run(0));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while fallback.payments.lock().unwrap().len() < 5 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    worker.abort();

    assert_eq!(fallback.payments.lock().unwrap().len(), 5);
    assert!(default.payments.lock().unwrap().is_empty());
    let summary = h.service.ledger.get_summary(SummaryRange::unbounded()).await.unwrap();
    assert_eq!(summary.fallback.total_requests, 5);
    assert_eq!(summary.fallback.total_amount, 10.0);
}
