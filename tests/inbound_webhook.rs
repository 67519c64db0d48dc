mod common;

use common::{harness, pending_payment, INBOUND_SECRET};
use merchant_gateway::domain::payment::PaymentStatus;
use merchant_gateway::service::webhook_dispatcher::WebhookError;
use merchant_gateway::signature;
use merchant_gateway::store::PaymentStore;
use serde_json::json;
use uuid::Uuid;

fn signed(body: &serde_json::Value) -> (Vec<u8>, String) {
    let bytes = body.to_string().into_bytes();
    let sig = signature::sign(INBOUND_SECRET.as_bytes(), &bytes);
    (bytes, sig)
}

async fn processing_payment(h: &common::Harness) -> Uuid {
    let mut payment = pending_payment("m1", 100.0);
    payment.status = PaymentStatus::Processing;
    h.payments.insert(&payment).await.unwrap();
    payment.payment_id
}

#[tokio::test]
async fn valid_signature_applies_the_status() {
    let h = harness("ALWAYS_SUCCESS", Vec::new());
    let payment_id = processing_payment(&h).await;

    let (body, sig) = signed(&json!({
        "event": "payment.completed",
        "resource_id": payment_id,
        "status": "completed",
    }));
    h.dispatcher.handle_inbound(Some(&sig), &body).await.unwrap();

    let payment = h.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn mismatched_signature_mutates_nothing() {
    let h = harness("ALWAYS_SUCCESS", Vec::new());
    let payment_id = processing_payment(&h).await;

    let body = json!({
        "event": "payment.completed",
        "resource_id": payment_id,
        "status": "completed",
    })
    .to_string()
    .into_bytes();
    let forged = signature::sign(b"some-other-secret", &body);

    let result = h.dispatcher.handle_inbound(Some(&forged), &body).await;
    assert!(matches!(result, Err(WebhookError::InvalidSignature)));

    let payment = h.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Processing);
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let h = harness("ALWAYS_SUCCESS", Vec::new());
    let result = h.dispatcher.handle_inbound(None, b"{}").await;
    assert!(matches!(result, Err(WebhookError::MissingSignature)));
}

#[tokio::test]
async fn unknown_status_never_regresses_terminal_state() {
    let h = harness("ALWAYS_SUCCESS", Vec::new());
    let mut payment = pending_payment("m1", 100.0);
    payment.status = PaymentStatus::Completed;
    h.payments.insert(&payment).await.unwrap();

    // Unrecognized status maps to PENDING; COMPLETED -> PENDING is illegal
    // and must be skipped, not applied.
    let (body, sig) = signed(&json!({
        "event": "payment.updated",
        "resource_id": payment.payment_id,
        "status": "something_new",
    }));
    h.dispatcher.handle_inbound(Some(&sig), &body).await.unwrap();

    let stored = h.payments.get(payment.payment_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn refund_completion_drives_the_parent_payment() {
    let h = harness("ALWAYS_SUCCESS", Vec::new());
    let mut payment = pending_payment("m1", 100.0);
    payment.status = PaymentStatus::Completed;
    h.payments.insert(&payment).await.unwrap();

    let (body, sig) = signed(&json!({
        "event": "refund.completed",
        "resource_id": Uuid::new_v4(),
        "status": "completed",
        "data": { "payment_id": payment.payment_id },
    }));
    h.dispatcher.handle_inbound(Some(&sig), &body).await.unwrap();

    let stored = h.payments.get(payment.payment_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn dispute_marks_the_payment_disputed() {
    let h = harness("ALWAYS_SUCCESS", Vec::new());
    let payment_id = processing_payment(&h).await;

    let (body, sig) = signed(&json!({
        "event": "dispute.created",
        "resource_id": Uuid::new_v4(),
        "status": "open",
        "data": { "payment_id": payment_id },
    }));
    h.dispatcher.handle_inbound(Some(&sig), &body).await.unwrap();

    let payment = h.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Disputed);
}

#[tokio::test]
async fn unknown_payment_is_an_error() {
    let h = harness("ALWAYS_SUCCESS", Vec::new());
    let missing = Uuid::new_v4();
    let (body, sig) = signed(&json!({
        "event": "payment.completed",
        "resource_id": missing,
        "status": "completed",
    }));

    let result = h.dispatcher.handle_inbound(Some(&sig), &body).await;
    assert!(matches!(result, Err(WebhookError::UnknownResource(id)) if id == missing));
}
