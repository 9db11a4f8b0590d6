use crate::domain::payment::{err, CreatePaymentRequest, CreatePaymentResponse};
use crate::service::payment_service::SummaryQuery;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let mut body = err("INVALID_PAYLOAD", "request body must be {correlationId, amount} JSON");
            body.error.details = Some(rejection.body_text());
            return (axum::http::StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };
    match state.payment_service.enqueue(req).await {
        Ok(_) => (
            axum::http::StatusCode::ACCEPTED,
            Json(CreatePaymentResponse {
                message: "payment queued".to_string(),
            }),
        )
            .into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn payments_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> impl IntoResponse {
    match state.payment_service.summary(query).await {
        Ok(summary) => (axum::http::StatusCode::OK, Json(summary)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}
