//! Unit tests for `RegistrationReducer`.
//!
//! These tests exercise one transition at a time:
//! - Confirm on free and paid events
//! - Payment form validation and duplicate-submit guard
//! - Payment and ticket creation outcomes
//! - QR completion and the success notification
//! - Restart after failure

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use super::*;
use crate::qr::{QrOptions, QrPayloadEncoder};
use std::sync::Arc;
use ticketr_client::{ApiError, Money, PaymentId, PaymentReceipt, TicketId, UserId};
use ticketr_core::reducer::Reducer;
use ticketr_testing::{
    assertions, drain_effects, fixtures, test_clock, InMemoryTicketService, ReducerTest,
    ScriptedPaymentService,
};

fn requester() -> Requester {
    Requester {
        user_id: UserId::new(42),
        name: "Ada Lovelace".to_string(),
        email: Some("ada@campus.edu".to_string()),
        is_vip: false,
    }
}

fn env_with(tickets: InMemoryTicketService, payments: ScriptedPaymentService) -> RegistrationEnvironment {
    RegistrationEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(tickets),
        Arc::new(payments),
        QrPayloadEncoder::qrcode(QrOptions::registration()),
    )
}

fn test_env() -> RegistrationEnvironment {
    env_with(InMemoryTicketService::new(), ScriptedPaymentService::succeeding())
}

fn free_state() -> RegistrationState {
    RegistrationState::new(fixtures::free_event(), requester())
}

fn paid_state(step: RegistrationStep) -> RegistrationState {
    let mut state = RegistrationState::new(fixtures::paid_event(Money::from_dollars(25)), requester());
    state.step = step;
    state
}

fn filled_form() -> PaymentForm {
    PaymentForm::default()
        .with(PaymentField::CardNumber, "4242 4242 4242 4242")
        .with(PaymentField::CardName, "Ada Lovelace")
        .with(PaymentField::Expiry, "12/28")
        .with(PaymentField::Cvv, "123")
}

fn payment_step(submitting: bool) -> RegistrationStep {
    RegistrationStep::Payment {
        form: filled_form(),
        error: None,
        submitting,
    }
}

fn receipt(id: i64) -> PaymentReceipt {
    PaymentReceipt {
        payment_id: PaymentId::new(id),
        message: None,
    }
}

fn backend_error(message: &str) -> ApiError {
    ApiError::Api {
        status: 500,
        message: message.to_string(),
    }
}

// ============================================================================
// Confirm
// ============================================================================

#[test]
fn test_confirm_free_event_goes_straight_to_issuing() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(free_state())
        .when_action(RegistrationAction::Confirm)
        .then_state(|state| {
            assert!(matches!(
                state.step,
                RegistrationStep::Issuing {
                    payment: None,
                    ticket_id: None,
                    ..
                }
            ));
        })
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 1);
            assertions::assert_has_future_effect(effects);
        })
        .run();
}

#[test]
fn test_confirm_paid_event_opens_payment_form() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(paid_state(RegistrationStep::Confirm))
        .when_action(RegistrationAction::Confirm)
        .then_state(|state| {
            assert_eq!(
                state.step,
                RegistrationStep::Payment {
                    form: PaymentForm::default(),
                    error: None,
                    submitting: false,
                }
            );
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[tokio::test]
async fn test_free_issue_request_carries_web_metadata() {
    let tickets = InMemoryTicketService::new();
    let env = env_with(tickets.clone(), ScriptedPaymentService::succeeding());
    let mut state = free_state();

    let effects = RegistrationReducer::new().reduce(&mut state, RegistrationAction::Confirm, &env);
    let produced = drain_effects(effects.into_vec()).await;

    assert_eq!(
        produced,
        vec![RegistrationAction::TicketCreated {
            ticket_id: TicketId::new(1001)
        }]
    );
    let created = tickets.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].purchase_date, fixtures::now());
    assert_eq!(created[0].check_in_time, None);
    assert_eq!(created[0].qr_code, "pending");
    assert_eq!(created[0].payment_id, None);
}

// ============================================================================
// Payment
// ============================================================================

#[test]
fn test_edit_payment_applies_formatting() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(paid_state(RegistrationStep::Payment {
            form: PaymentForm::default(),
            error: None,
            submitting: false,
        }))
        .when_actions([
            RegistrationAction::EditPayment {
                field: PaymentField::CardNumber,
                value: "4242424242424242".to_string(),
            },
            RegistrationAction::EditPayment {
                field: PaymentField::Expiry,
                value: "0327".to_string(),
            },
        ])
        .then_state(|state| {
            let RegistrationStep::Payment { form, .. } = &state.step else {
                panic!("expected payment step, got {}", state.step.name());
            };
            assert_eq!(form.card_number, "4242 4242 4242 4242");
            assert_eq!(form.expiry, "03/27");
        })
        .run();
}

#[test]
fn test_invalid_form_is_rejected_without_network_call() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(paid_state(RegistrationStep::Payment {
            form: filled_form().with(PaymentField::Cvv, ""),
            error: None,
            submitting: false,
        }))
        .when_action(RegistrationAction::SubmitPayment)
        .then_state(|state| {
            assert_eq!(
                state.step.error_message().as_deref(),
                Some("Please fill in all payment details")
            );
            assert!(!state.step.is_busy());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[tokio::test]
async fn test_submit_payment_sends_amount_and_fee() {
    let payments = ScriptedPaymentService::succeeding();
    let env = env_with(InMemoryTicketService::new(), payments.clone());
    let mut state = paid_state(payment_step(false));

    let effects =
        RegistrationReducer::new().reduce(&mut state, RegistrationAction::SubmitPayment, &env);
    assert!(state.step.is_busy());

    let produced = drain_effects(effects.into_vec()).await;
    assert_eq!(
        produced,
        vec![RegistrationAction::PaymentSucceeded {
            receipt: PaymentReceipt {
                payment_id: PaymentId::new(1),
                message: Some("Payment created successfully".to_string()),
            }
        }]
    );

    let calls = payments.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].user_id, UserId::new(42));
    assert_eq!(calls[0].amount, Money::from_cents(2500));
    assert_eq!(calls[0].platform_fee, Money::from_cents(125));
}

#[tokio::test]
async fn test_past_expiry_is_submitted_to_backend() {
    let payments = ScriptedPaymentService::succeeding();
    let env = env_with(InMemoryTicketService::new(), payments.clone());
    let mut state = paid_state(RegistrationStep::Payment {
        form: filled_form().with(PaymentField::Expiry, "0120"),
        error: None,
        submitting: false,
    });

    let effects =
        RegistrationReducer::new().reduce(&mut state, RegistrationAction::SubmitPayment, &env);
    assert_eq!(state.step.error_message(), None);
    assert!(state.step.is_busy());

    drain_effects(effects.into_vec()).await;
    assert_eq!(payments.calls().len(), 1);
}

#[test]
fn test_duplicate_submit_is_ignored() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(paid_state(payment_step(true)))
        .when_action(RegistrationAction::SubmitPayment)
        .then_state(|state| assert_eq!(state.step, payment_step(true)))
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_payment_failure_keeps_form_with_error() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(paid_state(payment_step(true)))
        .when_action(RegistrationAction::PaymentFailed {
            error: backend_error("Card declined"),
        })
        .then_state(|state| {
            assert_eq!(state.step.name(), "payment");
            assert!(!state.step.is_busy());
            assert_eq!(state.step.error_message().as_deref(), Some("Card declined"));
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_back_returns_to_confirm_unless_submitting() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(paid_state(payment_step(false)))
        .when_action(RegistrationAction::Back)
        .then_state(|state| assert_eq!(state.step, RegistrationStep::Confirm))
        .run();

    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(paid_state(payment_step(true)))
        .when_action(RegistrationAction::Back)
        .then_state(|state| assert_eq!(state.step, payment_step(true)))
        .run();
}

#[tokio::test]
async fn test_payment_success_issues_ticket_linked_to_payment() {
    let tickets = InMemoryTicketService::new();
    let env = env_with(tickets.clone(), ScriptedPaymentService::succeeding());
    let mut state = paid_state(payment_step(true));

    let effects = RegistrationReducer::new().reduce(
        &mut state,
        RegistrationAction::PaymentSucceeded { receipt: receipt(9) },
        &env,
    );

    assert!(matches!(
        &state.step,
        RegistrationStep::Issuing { payment: Some(p), ticket_id: None, .. } if p.payment_id == PaymentId::new(9)
    ));

    drain_effects(effects.into_vec()).await;
    assert_eq!(tickets.created()[0].payment_id, Some(PaymentId::new(9)));
}

#[test]
fn test_payment_result_outside_payment_step_is_ignored() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(free_state())
        .when_action(RegistrationAction::PaymentSucceeded { receipt: receipt(1) })
        .then_state(|state| assert_eq!(state.step, RegistrationStep::Confirm))
        .then_effects(assertions::assert_no_effects)
        .run();
}

// ============================================================================
// Issuing
// ============================================================================

fn issuing(payment: Option<PaymentReceipt>, ticket_id: Option<TicketId>) -> RegistrationStep {
    RegistrationStep::Issuing {
        payment,
        ticket_id,
        issued_at: fixtures::now(),
    }
}

#[test]
fn test_ticket_failure_after_payment_records_unlinked_payment() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(paid_state(issuing(Some(receipt(9)), None)))
        .when_action(RegistrationAction::TicketCreationFailed {
            error: backend_error("Duplicate entry '42-8' for key 'user_event'"),
        })
        .then_state(|state| {
            assert_eq!(
                state.step,
                RegistrationStep::Failed {
                    error: "Duplicate entry '42-8' for key 'user_event'".to_string(),
                    unlinked_payment: Some(receipt(9)),
                }
            );
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[tokio::test]
async fn test_ticket_created_renders_qr_for_that_ticket() {
    let env = test_env();
    let mut state = free_state();
    state.step = issuing(None, None);

    let effects = RegistrationReducer::new().reduce(
        &mut state,
        RegistrationAction::TicketCreated {
            ticket_id: TicketId::new(1001),
        },
        &env,
    );
    assert_eq!(state.step, issuing(None, Some(TicketId::new(1001))));

    let produced = drain_effects(effects.into_vec()).await;
    let [RegistrationAction::QrEncoded { ticket_id, image }] = produced.as_slice() else {
        panic!("expected a single QrEncoded, got {produced:?}");
    };
    assert_eq!(*ticket_id, TicketId::new(1001));
    assert_eq!(image.as_ref().map(|i| i.width), Some(300));
}

#[test]
fn test_qr_for_another_ticket_is_ignored() {
    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(paid_state(issuing(None, Some(TicketId::new(1001)))))
        .when_action(RegistrationAction::QrEncoded {
            ticket_id: TicketId::new(5),
            image: None,
        })
        .then_state(|state| assert_eq!(state.step.name(), "issuing"))
        .run();
}

#[tokio::test]
async fn test_qr_encoded_completes_and_notifies() {
    let env = test_env();
    let mut state = paid_state(issuing(Some(receipt(9)), Some(TicketId::new(1001))));

    let effects = RegistrationReducer::new().reduce(
        &mut state,
        RegistrationAction::QrEncoded {
            ticket_id: TicketId::new(1001),
            image: None,
        },
        &env,
    );

    let issued = state.step.issued().expect("success").clone();
    assert_eq!(issued.ticket_id, TicketId::new(1001));
    assert_eq!(issued.amount_paid, Some(Money::from_cents(2625)));
    assert_eq!(issued.payment_id, Some(PaymentId::new(9)));
    assert_eq!(issued.qr, None);

    let produced = drain_effects(effects.into_vec()).await;
    assert_eq!(
        produced,
        vec![RegistrationAction::RegistrationCompleted {
            ticket: Box::new(issued)
        }]
    );
}

// ============================================================================
// Terminal steps
// ============================================================================

#[test]
fn test_restart_after_failure_starts_new_attempt() {
    let failed = paid_state(RegistrationStep::Failed {
        error: "boom".to_string(),
        unlinked_payment: None,
    });
    let previous_attempt = failed.attempt;

    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(failed)
        .when_action(RegistrationAction::Restart)
        .then_state(move |state| {
            assert_eq!(state.step, RegistrationStep::Confirm);
            assert_ne!(state.attempt, previous_attempt);
        })
        .run();
}

#[test]
fn test_restart_outside_failed_is_ignored() {
    let state = free_state();
    let attempt = state.attempt;

    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(state)
        .when_action(RegistrationAction::Restart)
        .then_state(move |state| assert_eq!(state.attempt, attempt))
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_confirm_after_success_is_ignored() {
    let mut state = free_state();
    state.step = RegistrationStep::Success(Box::new(IssuedTicket {
        ticket_id: TicketId::new(1001),
        event: fixtures::free_event(),
        requester: requester(),
        qr: None,
        amount_paid: None,
        payment_id: None,
        issued_at: fixtures::now(),
    }));
    let before = state.clone();

    ReducerTest::new(RegistrationReducer::new())
        .with_env(test_env())
        .given_state(state)
        .when_action(RegistrationAction::Confirm)
        .then_state(move |state| assert_eq!(*state, before))
        .then_effects(assertions::assert_no_effects)
        .run();
}
