//! Reducer for the registration workflow.

use crate::qr::QrPayload;
use crate::workflow::{
    AttemptId, IssuedTicket, PaymentField, PaymentForm, RegistrationAction,
    RegistrationEnvironment, RegistrationState, RegistrationStep,
};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;
use ticketr_client::{NewPayment, NewTicket, PaymentReceipt, TicketId};
use ticketr_core::{effect::Effect, reducer::Reducer};

type Effects = SmallVec<[Effect<RegistrationAction>; 4]>;

/// Drives one registration attempt from confirmation to an issued ticket.
///
/// Payment (paid events only) strictly precedes ticket creation, and ticket
/// creation strictly precedes QR rendering: each call is only started by the
/// action reporting the previous one's success. Actions that make no sense in
/// the current step are ignored.
pub struct RegistrationReducer;

impl RegistrationReducer {
    /// Create a new registration reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn ignore(state: &RegistrationState, action: &'static str) -> Effects {
        tracing::debug!(
            attempt = %state.attempt,
            action,
            step = state.step.name(),
            "Ignoring action not valid in current step"
        );
        smallvec![Effect::None]
    }

    fn confirm(state: &mut RegistrationState, env: &RegistrationEnvironment) -> Effects {
        if state.event.is_free() {
            tracing::info!(attempt = %state.attempt, event_id = %state.event.id, "Free event confirmed");
            Self::issue(state, env, None)
        } else {
            tracing::info!(
                attempt = %state.attempt,
                event_id = %state.event.id,
                price = %state.event.ticket_price,
                "Paid event confirmed; collecting payment"
            );
            state.step = RegistrationStep::Payment {
                form: PaymentForm::default(),
                error: None,
                submitting: false,
            };
            smallvec![Effect::None]
        }
    }

    fn edit_payment(state: &mut RegistrationState, field: PaymentField, value: &str) -> Effects {
        match &mut state.step {
            RegistrationStep::Payment {
                form,
                submitting: false,
                ..
            } => {
                form.set(field, value);
                smallvec![Effect::None]
            },
            _ => Self::ignore(state, "edit_payment"),
        }
    }

    fn submit_payment(state: &mut RegistrationState, env: &RegistrationEnvironment) -> Effects {
        let RegistrationStep::Payment {
            form,
            error,
            submitting,
        } = &mut state.step
        else {
            return Self::ignore(state, "submit_payment");
        };

        if *submitting {
            tracing::debug!(attempt = %state.attempt, "Payment already in flight; ignoring duplicate submit");
            return smallvec![Effect::None];
        }

        if let Err(invalid) = form.validate() {
            tracing::debug!(attempt = %state.attempt, error = %invalid, "Payment form rejected");
            *error = Some(invalid.into());
            return smallvec![Effect::None];
        }

        *error = None;
        *submitting = true;

        let payment = NewPayment::for_ticket(state.requester.user_id, state.event.ticket_price);
        tracing::info!(
            attempt = %state.attempt,
            amount = %payment.amount,
            platform_fee = %payment.platform_fee,
            "Submitting payment"
        );

        let payments = Arc::clone(&env.payments);
        smallvec![Effect::future(async move {
            match payments.process_payment(payment).await {
                Ok(receipt) => Some(RegistrationAction::PaymentSucceeded { receipt }),
                Err(error) => Some(RegistrationAction::PaymentFailed { error }),
            }
        })]
    }

    fn payment_succeeded(
        state: &mut RegistrationState,
        receipt: PaymentReceipt,
        env: &RegistrationEnvironment,
    ) -> Effects {
        if !matches!(
            state.step,
            RegistrationStep::Payment {
                submitting: true,
                ..
            }
        ) {
            return Self::ignore(state, "payment_succeeded");
        }
        tracing::info!(attempt = %state.attempt, payment_id = %receipt.payment_id, "Payment recorded");
        Self::issue(state, env, Some(receipt))
    }

    fn payment_failed(state: &mut RegistrationState, failure: ticketr_client::ApiError) -> Effects {
        match &mut state.step {
            RegistrationStep::Payment {
                error, submitting, ..
            } if *submitting => {
                tracing::info!(attempt = %state.attempt, error = %failure, "Payment failed");
                *submitting = false;
                *error = Some(failure.into());
                smallvec![Effect::None]
            },
            _ => Self::ignore(state, "payment_failed"),
        }
    }

    /// Enter `Issuing` and request the ticket.
    fn issue(
        state: &mut RegistrationState,
        env: &RegistrationEnvironment,
        payment: Option<PaymentReceipt>,
    ) -> Effects {
        let issued_at = env.clock.now();
        let ticket = NewTicket::web(
            state.event.id,
            state.requester.user_id,
            issued_at,
            payment.as_ref().map(|p| p.payment_id),
        );
        state.step = RegistrationStep::Issuing {
            payment,
            ticket_id: None,
            issued_at,
        };

        let tickets = Arc::clone(&env.tickets);
        smallvec![Effect::future(async move {
            match tickets.create_ticket(ticket).await {
                Ok(created) => Some(RegistrationAction::TicketCreated {
                    ticket_id: created.ticket_id,
                }),
                Err(error) => Some(RegistrationAction::TicketCreationFailed { error }),
            }
        })]
    }

    fn ticket_created(
        state: &mut RegistrationState,
        created: TicketId,
        env: &RegistrationEnvironment,
    ) -> Effects {
        let RegistrationStep::Issuing { ticket_id, .. } = &mut state.step else {
            return Self::ignore(state, "ticket_created");
        };
        if ticket_id.is_some() {
            return Self::ignore(state, "ticket_created");
        }
        *ticket_id = Some(created);

        tracing::info!(
            attempt = %state.attempt,
            ticket_id = %created,
            event_id = %state.event.id,
            user_id = %state.requester.user_id,
            "Ticket issued"
        );

        let payload = QrPayload {
            ticket_id: created,
            event_id: state.event.id,
            event_name: state.event.name.clone(),
            user_id: state.requester.user_id,
            user_name: state.requester.name.clone(),
            timestamp: env.clock.now(),
        };
        let encoder = env.qr.clone();

        smallvec![Effect::future(async move {
            let image = tokio::task::spawn_blocking(move || encoder.encode(&payload))
                .await
                .unwrap_or_else(|err| {
                    tracing::warn!(ticket_id = %created, error = %err, "QR rendering task failed");
                    None
                });
            Some(RegistrationAction::QrEncoded {
                ticket_id: created,
                image,
            })
        })]
    }

    fn ticket_creation_failed(
        state: &mut RegistrationState,
        failure: &ticketr_client::ApiError,
    ) -> Effects {
        let RegistrationStep::Issuing {
            payment,
            ticket_id: None,
            ..
        } = &mut state.step
        else {
            return Self::ignore(state, "ticket_creation_failed");
        };
        let unlinked_payment = payment.take();

        if let Some(receipt) = &unlinked_payment {
            tracing::warn!(
                attempt = %state.attempt,
                payment_id = %receipt.payment_id,
                error = %failure,
                "Ticket creation failed after payment was recorded; payment is not linked to any ticket"
            );
        } else {
            tracing::info!(attempt = %state.attempt, error = %failure, "Ticket creation failed");
        }

        state.step = RegistrationStep::Failed {
            error: failure.to_string(),
            unlinked_payment,
        };
        smallvec![Effect::None]
    }

    fn qr_encoded(
        state: &mut RegistrationState,
        encoded_for: TicketId,
        image: Option<crate::qr::QrImage>,
    ) -> Effects {
        let RegistrationStep::Issuing {
            payment,
            ticket_id: Some(ticket_id),
            issued_at,
        } = &state.step
        else {
            return Self::ignore(state, "qr_encoded");
        };
        if *ticket_id != encoded_for {
            return Self::ignore(state, "qr_encoded");
        }

        let issued = IssuedTicket {
            ticket_id: *ticket_id,
            event: state.event.clone(),
            requester: state.requester.clone(),
            amount_paid: payment
                .as_ref()
                .map(|_| state.event.ticket_price.with_platform_fee()),
            payment_id: payment.as_ref().map(|p| p.payment_id),
            issued_at: *issued_at,
            qr: image,
        };

        tracing::info!(
            attempt = %state.attempt,
            ticket_id = %issued.ticket_id,
            has_qr = issued.qr.is_some(),
            "Registration complete"
        );

        state.step = RegistrationStep::Success(Box::new(issued.clone()));
        smallvec![Effect::send(RegistrationAction::RegistrationCompleted {
            ticket: Box::new(issued),
        })]
    }
}

impl Default for RegistrationReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for RegistrationReducer {
    type State = RegistrationState;
    type Action = RegistrationAction;
    type Environment = RegistrationEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            RegistrationAction::Confirm => match state.step {
                RegistrationStep::Confirm => Self::confirm(state, env),
                _ => Self::ignore(state, "confirm"),
            },

            RegistrationAction::EditPayment { field, value } => {
                Self::edit_payment(state, field, &value)
            },

            RegistrationAction::SubmitPayment => Self::submit_payment(state, env),

            RegistrationAction::Back => match state.step {
                RegistrationStep::Payment {
                    submitting: false, ..
                } => {
                    state.step = RegistrationStep::Confirm;
                    smallvec![Effect::None]
                },
                _ => Self::ignore(state, "back"),
            },

            RegistrationAction::PaymentSucceeded { receipt } => {
                Self::payment_succeeded(state, receipt, env)
            },

            RegistrationAction::PaymentFailed { error } => Self::payment_failed(state, error),

            RegistrationAction::TicketCreated { ticket_id } => {
                Self::ticket_created(state, ticket_id, env)
            },

            RegistrationAction::TicketCreationFailed { error } => {
                Self::ticket_creation_failed(state, &error)
            },

            RegistrationAction::QrEncoded { ticket_id, image } => {
                Self::qr_encoded(state, ticket_id, image)
            },

            // Notification only.
            RegistrationAction::RegistrationCompleted { .. } => smallvec![Effect::None],

            RegistrationAction::Restart => match state.step {
                RegistrationStep::Failed { .. } => {
                    state.attempt = AttemptId::new();
                    state.step = RegistrationStep::Confirm;
                    tracing::info!(attempt = %state.attempt, "Registration restarted");
                    smallvec![Effect::None]
                },
                _ => Self::ignore(state, "restart"),
            },
        }
    }
}
