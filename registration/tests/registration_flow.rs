//! End-to-end registration scenarios through the `Store`.
//!
//! Each test wires a fresh store to in-memory backend services and drives it
//! with user actions the way the embedding page would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::{Arc, Mutex};
use std::time::Duration;
use ticketr_client::{
    ApiError, CreatedTicket, Money, NewPayment, NewTicket, PaymentId, PaymentReceipt,
    PaymentService, ServiceFuture, Ticket, TicketId, TicketService, UserId,
};
use ticketr_registration::{
    registration_store, PaymentField, QrError, QrImage, QrOptions, QrPayload, QrPayloadEncoder,
    QrRenderer, RegistrationAction, RegistrationEnvironment, RegistrationStep, RegistrationStore,
    Requester, TicketCard, TicketCardRenderer,
};
use ticketr_testing::{fixtures, test_clock, InMemoryTicketService, ScriptedPaymentService};

// ============================================================================
// Test Fixtures
// ============================================================================

fn requester() -> Requester {
    Requester {
        user_id: UserId::new(42),
        name: "Ada Lovelace".to_string(),
        email: Some("ada@campus.edu".to_string()),
        is_vip: false,
    }
}

fn environment(
    tickets: Arc<dyn TicketService>,
    payments: Arc<dyn PaymentService>,
    qr: QrPayloadEncoder,
) -> RegistrationEnvironment {
    RegistrationEnvironment::new(Arc::new(test_clock()), tickets, payments, qr)
}

fn qrcode() -> QrPayloadEncoder {
    QrPayloadEncoder::qrcode(QrOptions::registration())
}

struct BrokenRenderer;

impl QrRenderer for BrokenRenderer {
    fn render(&self, _data: &str, _options: &QrOptions) -> Result<QrImage, QrError> {
        Err(QrError::Encode("renderer offline".to_string()))
    }
}

fn server_error(message: &str) -> ApiError {
    ApiError::Api {
        status: 500,
        message: message.to_string(),
    }
}

async fn fill_payment_form(store: &RegistrationStore) {
    for (field, value) in [
        (PaymentField::CardNumber, "4242424242424242"),
        (PaymentField::CardName, "Ada Lovelace"),
        (PaymentField::Expiry, "1228"),
        (PaymentField::Cvv, "123"),
        (PaymentField::Zip, "02139"),
    ] {
        store
            .send(RegistrationAction::EditPayment {
                field,
                value: value.to_string(),
            })
            .await
            .unwrap();
    }
}

/// Records the order in which backend calls arrive.
#[derive(Clone, Default)]
struct CallLog {
    calls: Arc<Mutex<Vec<&'static str>>>,
    tickets: InMemoryTicketService,
    payments: ScriptedPaymentService,
}

impl CallLog {
    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl TicketService for CallLog {
    fn create_ticket(&self, ticket: NewTicket) -> ServiceFuture<'_, CreatedTicket> {
        self.calls.lock().unwrap().push("create_ticket");
        self.tickets.create_ticket(ticket)
    }

    fn user_tickets(&self, user_id: UserId) -> ServiceFuture<'_, Vec<Ticket>> {
        self.tickets.user_tickets(user_id)
    }
}

impl PaymentService for CallLog {
    fn process_payment(&self, payment: NewPayment) -> ServiceFuture<'_, PaymentReceipt> {
        self.calls.lock().unwrap().push("process_payment");
        self.payments.process_payment(payment)
    }
}

// ============================================================================
// Free events
// ============================================================================

#[tokio::test]
async fn test_free_event_issues_ticket_with_qr() {
    let tickets = InMemoryTicketService::new();
    let payments = ScriptedPaymentService::succeeding();
    let store = registration_store(
        fixtures::free_event(),
        requester(),
        environment(Arc::new(tickets.clone()), Arc::new(payments.clone()), qrcode()),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();

    let issued = store
        .state(|s| s.step.issued().cloned())
        .await
        .expect("registration should succeed");
    assert_eq!(issued.ticket_id, TicketId::new(1001));
    assert_eq!(issued.amount_paid, None);
    assert!(issued.qr.as_ref().is_some_and(|qr| qr.width == 300));

    assert!(payments.calls().is_empty(), "free events never touch payments");
    let created = tickets.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].event_id, fixtures::free_event().id);
    assert_eq!(created[0].user_id, UserId::new(42));
    assert_eq!(created[0].payment_id, None);
}

#[tokio::test]
async fn test_success_ticket_id_matches_backend() {
    // Pre-existing tickets push the next id forward
    let tickets = InMemoryTicketService::new();
    for _ in 0..3 {
        tickets
            .create_ticket(NewTicket::web(
                fixtures::paid_event(Money::from_dollars(5)).id,
                UserId::new(7),
                fixtures::now(),
                None,
            ))
            .await
            .unwrap();
    }
    let store = registration_store(
        fixtures::free_event(),
        requester(),
        environment(
            Arc::new(tickets.clone()),
            Arc::new(ScriptedPaymentService::succeeding()),
            qrcode(),
        ),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();

    let issued = store.state(|s| s.step.issued().cloned()).await.unwrap();
    assert_eq!(issued.ticket_id, TicketId::new(1004));
}

#[tokio::test]
async fn test_completion_is_broadcast() {
    let store = registration_store(
        fixtures::free_event(),
        requester(),
        environment(
            Arc::new(InMemoryTicketService::new()),
            Arc::new(ScriptedPaymentService::succeeding()),
            qrcode(),
        ),
    );

    let completed = store
        .send_and_wait_for(RegistrationAction::Confirm, |action| {
            matches!(action, RegistrationAction::RegistrationCompleted { .. })
        })
        .await
        .unwrap();

    let RegistrationAction::RegistrationCompleted { ticket } = completed else {
        panic!("expected completion, got {completed:?}");
    };
    assert_eq!(ticket.ticket_id, TicketId::new(1001));
    assert_eq!(ticket.requester, requester());
}

#[tokio::test]
async fn test_feedback_actions_arrive_in_workflow_order() {
    let store = registration_store(
        fixtures::free_event(),
        requester(),
        environment(
            Arc::new(InMemoryTicketService::new()),
            Arc::new(ScriptedPaymentService::succeeding()),
            qrcode(),
        ),
    );
    let mut rx = store.subscribe_actions();

    store.send(RegistrationAction::Confirm).await.unwrap();

    let mut names = Vec::new();
    while let Ok(action) = rx.try_recv() {
        names.push(action.name());
    }
    assert_eq!(names, vec!["ticket_created", "qr_encoded", "registration_completed"]);
}

// ============================================================================
// Paid events
// ============================================================================

#[tokio::test]
async fn test_paid_event_charges_price_and_fee_then_issues() {
    let log = CallLog::default();
    let store = registration_store(
        fixtures::paid_event(Money::from_dollars(25)),
        requester(),
        environment(Arc::new(log.clone()), Arc::new(log.clone()), qrcode()),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();
    assert!(log.calls().is_empty(), "nothing is called before payment is submitted");
    assert_eq!(store.state(|s| s.step.name()).await, "payment");

    fill_payment_form(&store).await;
    store.send(RegistrationAction::SubmitPayment).await.unwrap();

    assert_eq!(log.calls(), vec!["process_payment", "create_ticket"]);

    let payment = &log.payments.calls()[0];
    assert_eq!(payment.amount, Money::from_cents(2500));
    assert_eq!(payment.platform_fee, Money::from_cents(125));
    assert_eq!(payment.total(), Money::from_cents(2625));

    let created = log.tickets.created();
    assert_eq!(created[0].payment_id, Some(PaymentId::new(1)));

    let issued = store.state(|s| s.step.issued().cloned()).await.unwrap();
    assert_eq!(issued.amount_paid, Some(Money::from_cents(2625)));
    assert_eq!(issued.payment_id, Some(PaymentId::new(1)));
}

#[tokio::test]
async fn test_payment_failure_stays_on_form_without_ticket() {
    let tickets = InMemoryTicketService::new();
    let store = registration_store(
        fixtures::paid_event(Money::from_dollars(25)),
        requester(),
        environment(
            Arc::new(tickets.clone()),
            Arc::new(ScriptedPaymentService::failing(server_error("Card declined"))),
            qrcode(),
        ),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();
    fill_payment_form(&store).await;
    store.send(RegistrationAction::SubmitPayment).await.unwrap();

    let step = store.state(|s| s.step.clone()).await;
    let RegistrationStep::Payment {
        submitting, form, ..
    } = &step
    else {
        panic!("expected Payment, got {step:?}");
    };
    assert!(!submitting);
    assert_eq!(form.card_number, "4242 4242 4242 4242", "form keeps its input");
    assert_eq!(step.error_message().as_deref(), Some("Card declined"));
    assert_eq!(tickets.create_attempts(), 0);
}

#[tokio::test]
async fn test_invalid_form_never_reaches_backend() {
    let payments = ScriptedPaymentService::succeeding();
    let store = registration_store(
        fixtures::paid_event(Money::from_dollars(25)),
        requester(),
        environment(
            Arc::new(InMemoryTicketService::new()),
            Arc::new(payments.clone()),
            qrcode(),
        ),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();
    store.send(RegistrationAction::SubmitPayment).await.unwrap();

    let message = store.state(|s| s.step.error_message()).await;
    assert_eq!(message.as_deref(), Some("Please fill in all payment details"));
    assert!(payments.calls().is_empty());
}

#[tokio::test]
async fn test_ticket_failure_after_payment_is_terminal_without_reversal() {
    let log = CallLog {
        tickets: InMemoryTicketService::new()
            .failing_creation(server_error("Event is sold out")),
        ..CallLog::default()
    };
    let store = registration_store(
        fixtures::paid_event(Money::from_dollars(25)),
        requester(),
        environment(Arc::new(log.clone()), Arc::new(log.clone()), qrcode()),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();
    fill_payment_form(&store).await;
    store.send(RegistrationAction::SubmitPayment).await.unwrap();

    let step = store.state(|s| s.step.clone()).await;
    let RegistrationStep::Failed {
        error,
        unlinked_payment,
    } = step
    else {
        panic!("expected Failed, got {step:?}");
    };
    assert_eq!(error, "Event is sold out");
    assert_eq!(
        unlinked_payment.map(|p| p.payment_id),
        Some(PaymentId::new(1))
    );
    // exactly one payment, no refund or retry
    assert_eq!(log.calls(), vec!["process_payment", "create_ticket"]);
}

#[tokio::test]
async fn test_restart_after_failure_begins_new_attempt() {
    let store = registration_store(
        fixtures::free_event(),
        requester(),
        environment(
            Arc::new(InMemoryTicketService::new().failing_creation(server_error("Database error"))),
            Arc::new(ScriptedPaymentService::succeeding()),
            qrcode(),
        ),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();
    let first = store.state(|s| s.attempt).await;
    assert_eq!(store.state(|s| s.step.name()).await, "failed");

    store.send(RegistrationAction::Restart).await.unwrap();

    assert_eq!(store.state(|s| s.step.clone()).await, RegistrationStep::Confirm);
    assert_ne!(store.state(|s| s.attempt).await, first);
}

#[tokio::test]
async fn test_duplicate_submit_while_in_flight_is_ignored() {
    let payments = ScriptedPaymentService::succeeding().with_delay(Duration::from_millis(100));
    let tickets = InMemoryTicketService::new();
    let store = registration_store(
        fixtures::paid_event(Money::from_dollars(25)),
        requester(),
        environment(Arc::new(tickets.clone()), Arc::new(payments.clone()), qrcode()),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();
    fill_payment_form(&store).await;

    let (first, second) = tokio::join!(store.send(RegistrationAction::SubmitPayment), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.send(RegistrationAction::SubmitPayment).await
    });
    first.unwrap();
    second.unwrap();

    assert_eq!(payments.calls().len(), 1);
    assert_eq!(tickets.create_attempts(), 1);
    assert_eq!(store.state(|s| s.step.name()).await, "success");
}

// ============================================================================
// QR rendering
// ============================================================================

#[tokio::test]
async fn test_qr_failure_still_succeeds_and_download_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let store = registration_store(
        fixtures::free_event(),
        requester(),
        environment(
            Arc::new(InMemoryTicketService::new()),
            Arc::new(ScriptedPaymentService::succeeding()),
            QrPayloadEncoder::new(Arc::new(BrokenRenderer), QrOptions::registration()),
        ),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();

    let issued = store.state(|s| s.step.issued().cloned()).await.unwrap();
    assert_eq!(issued.ticket_id, TicketId::new(1001));
    assert!(issued.qr.is_none());

    let renderer = TicketCardRenderer::new("Ticketr", dir.path());
    let saved = renderer.download(&TicketCard::from_issued(&issued)).await.unwrap();
    assert!(saved.is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_issued_ticket_card_download() {
    let dir = tempfile::tempdir().unwrap();
    let store = registration_store(
        fixtures::free_event(),
        requester(),
        environment(
            Arc::new(InMemoryTicketService::new()),
            Arc::new(ScriptedPaymentService::succeeding()),
            qrcode(),
        ),
    );

    store.send(RegistrationAction::Confirm).await.unwrap();
    let issued = store.state(|s| s.step.issued().cloned()).await.unwrap();

    let renderer = TicketCardRenderer::new("Ticketr", dir.path());
    let path = renderer
        .download(&TicketCard::from_issued(&issued))
        .await
        .unwrap()
        .expect("card written");

    assert_eq!(path.file_name().unwrap(), "ticket_1001.png");
}

#[test]
fn test_qr_payload_round_trips_with_iso_timestamp() {
    let payload = QrPayload {
        ticket_id: TicketId::new(1001),
        event_id: fixtures::free_event().id,
        event_name: "Spring Open Mic".to_string(),
        user_id: UserId::new(42),
        user_name: "Ada Lovelace".to_string(),
        timestamp: fixtures::now(),
    };

    let json = payload.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let timestamp = value["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    assert_eq!(QrPayload::from_json(&json).unwrap(), payload);
}
