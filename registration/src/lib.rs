//! # Ticketr Registration
//!
//! Registers a user for an event and issues a scannable ticket.
//!
//! - [`workflow`]: the registration state machine (confirm, optional payment,
//!   ticket issuance, QR rendering) as a reducer run by a `Store`
//! - [`qr`]: QR payload encoding and PNG rendering
//! - [`card`]: downloadable 600×800 ticket cards
//! - [`tickets`]: a user's ticket list and the registration pre-check
//! - [`config`]: environment-driven configuration
//!
//! ## Example
//!
//! ```no_run
//! use ticketr_client::{ApiClient, EventId, UserId};
//! use ticketr_registration::{
//!     registration_store, QrOptions, RegistrationAction, RegistrationEnvironment, Requester,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::from_env();
//!     let event = client.event(EventId::new(7)).await?;
//!     let user = client.user(UserId::new(42)).await?;
//!
//!     let env = RegistrationEnvironment::production(&client, QrOptions::registration());
//!     let store = registration_store(event, Requester::from(&user), env);
//!
//!     // Free event: confirming issues the ticket
//!     store.send(RegistrationAction::Confirm).await?;
//!
//!     if let Some(ticket) = store.state(|s| s.step.issued().cloned()).await {
//!         println!("Ticket {} issued", ticket.ticket_id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod card;
pub mod config;
pub mod qr;
pub mod tickets;
pub mod workflow;

pub use card::{CardError, TicketCard, TicketCardRenderer};
pub use config::{Config, ConfigError};
pub use qr::{QrCodeRenderer, QrError, QrImage, QrOptions, QrPayload, QrPayloadEncoder, QrRenderer};
pub use tickets::{
    check_registration, load_my_tickets, ticket_qr, MyTickets, RegistrationCheck, TicketWithEvent,
};
pub use workflow::{
    registration_store, IssuedTicket, PaymentField, PaymentForm, RegistrationAction,
    RegistrationEnvironment, RegistrationReducer, RegistrationState, RegistrationStep,
    RegistrationStore, Requester,
};
