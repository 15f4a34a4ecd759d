//! Ticket registration workflow.
//!
//! A linear state machine driven by [`RegistrationReducer`]:
//!
//! ```text
//! Confirm ──(free)──────────────────────────┐
//!    │                                      ▼
//!    └─(paid)→ Payment ──PaymentSucceeded→ Issuing ──TicketCreated→ (QR) ──QrEncoded→ Success
//!               ▲   │                        │
//!               └───┘ PaymentFailed          └─TicketCreationFailed→ Failed ──Restart→ Confirm
//! ```
//!
//! The event snapshot and the requester are inputs to [`RegistrationState::new`];
//! nothing is read from ambient storage. Each backend call is a single attempt.
//! A payment failure keeps the form open with the error; a ticket creation
//! failure is terminal for the attempt.
//!
//! On success the reducer emits [`RegistrationAction::RegistrationCompleted`],
//! which the embedding page observes through
//! [`Store::subscribe_actions`](ticketr_runtime::Store::subscribe_actions).

pub mod actions;
pub mod environment;
pub mod reducer;
pub mod store;
#[cfg(test)]
mod tests;
pub mod types;

pub use actions::RegistrationAction;
pub use environment::RegistrationEnvironment;
pub use reducer::RegistrationReducer;
pub use store::{registration_store, RegistrationStore};
pub use types::{
    format_card_number, format_cvv, format_expiry, AttemptId, IssuedTicket, PaymentField,
    PaymentForm, PaymentFormError, PaymentStepError, RegistrationState, RegistrationStep,
    Requester,
};
