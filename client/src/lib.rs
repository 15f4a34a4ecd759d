//! # Ticketr API Client
//!
//! Typed client for the Ticketr REST backend plus the wire types it speaks.
//!
//! ## Example
//!
//! ```no_run
//! use ticketr_client::{ApiClient, EventId, NewTicket, UserId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // TICKETR_API_URL / TICKETR_API_TOKEN
//!     let client = ApiClient::from_env();
//!
//!     let event = client.event(EventId::new(7)).await?;
//!     let ticket = NewTicket::web(event.id, UserId::new(42), chrono::Utc::now(), None);
//!     let created = client.create_ticket(&ticket).await?;
//!
//!     println!("Issued ticket {}", created.ticket_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - Tickets, payments, events, organizations and users endpoints
//! - Backend `{"error": ...}` bodies surfaced as [`ApiError::Api`]
//! - Money held as integer cents, accepting numeric or string prices
//! - Lenient timestamp parsing for the formats the backend emits
//! - [`TicketService`], [`PaymentService`] and [`EventService`] seams for the workflow

pub mod client;
pub mod error;
pub mod services;
pub mod types;

// Re-export main types for convenience
pub use client::{ApiClient, DEFAULT_API_URL};
pub use error::ApiError;
pub use services::{EventService, PaymentService, ServiceFuture, TicketService};
pub use types::{
    Created, CreatedEvent, CreatedTicket, Event, EventCategory, EventDraft, EventId, EventStatus,
    Money, NewOrganization, NewPayment, NewTicket, NewUser, Organization, OrganizationId,
    PaymentId, PaymentMethod, PaymentReceipt, PaymentRecord, PurchaseSource, Ticket, TicketId,
    TicketStatus, User, UserId, parse_timestamp,
};
