use crate::domain::context::build_context;
use crate::domain::payment::{
    CreatePaymentRequest, ErrorEnvelope, ErrorPayload, Payment, PaymentMetadata, PaymentResponse,
};
use crate::service::payment_processor::ProcessError;
use crate::store::PaymentStore;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Create a PENDING payment from the request, then run it through the
/// pipeline. A fraud rejection still returns the (FAILED) payment; gateway
/// failures surface as 502 with the failure recorded on the payment.
pub async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePaymentRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&req) {
        return resp.into_response();
    }

    let ctx = build_context(&headers);
    let metadata = PaymentMetadata {
        user_agent: Some(ctx.user_agent.clone()).filter(|s| !s.is_empty()),
        ip_address: Some(ctx.ip.clone()).filter(|s| !s.is_empty()),
        ..PaymentMetadata::default()
    }
    .with_extra(req.metadata.clone());

    let payment = Payment::new(&req.merchant_id, req.amount, &req.currency, metadata);
    if let Err(e) = state.payment_processor.payments.insert(&payment).await {
        return internal(e).into_response();
    }

    match state.payment_processor.process(payment.payment_id, &ctx).await {
        Ok(processed) => {
            (StatusCode::OK, Json(PaymentResponse::from(processed))).into_response()
        }
        Err(ProcessError::Gateway(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(err("GATEWAY_ERROR", &e.to_string())),
        )
            .into_response(),
        Err(ProcessError::NotClaimable { .. }) => (
            StatusCode::CONFLICT,
            Json(err("ALREADY_PROCESSING", "payment has already been claimed")),
        )
            .into_response(),
        Err(ProcessError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, Json(err("NOT_FOUND", "payment not found"))).into_response()
        }
        Err(ProcessError::Store(e)) => internal(e).into_response(),
    }
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.payment_processor.payments.get(payment_id).await {
        Ok(Some(payment)) => {
            (StatusCode::OK, Json(PaymentResponse::from(payment))).into_response()
        }
        Ok(None) => {
            (StatusCode::NOT_FOUND, Json(err("NOT_FOUND", "payment not found"))).into_response()
        }
        Err(e) => internal(e).into_response(),
    }
}

fn validate_request(req: &CreatePaymentRequest) -> Result<(), (StatusCode, Json<ErrorEnvelope>)> {
    if req.amount <= 0.0 || !req.amount.is_finite() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(err("INVALID_AMOUNT", "amount must be a positive number")),
        ));
    }
    if req.currency.len() != 3 || !req.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(err("INVALID_CURRENCY", "currency must be a 3-letter code")),
        ));
    }
    if req.merchant_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(err("INVALID_MERCHANT", "merchant_id is required")),
        ));
    }
    Ok(())
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

pub fn internal(e: anyhow::Error) -> (StatusCode, Json<ErrorEnvelope>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(err("INTERNAL_ERROR", &e.to_string())),
    )
}
