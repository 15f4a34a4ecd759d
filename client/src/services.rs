//! Collaborator traits used by the registration workflow.
//!
//! The workflow never talks to [`ApiClient`] directly; it holds these traits as
//! `Arc<dyn ...>` in its environment so tests can swap in in-memory versions.

use crate::{
    client::ApiClient,
    error::ApiError,
    types::{CreatedTicket, Event, EventId, NewPayment, NewTicket, PaymentReceipt, Ticket, UserId},
};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by service methods
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Ticket issuance
pub trait TicketService: Send + Sync {
    /// Create a ticket record; the backend assigns the id
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure
    fn create_ticket(&self, ticket: NewTicket) -> ServiceFuture<'_, CreatedTicket>;

    /// All tickets held by a user
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure
    fn user_tickets(&self, user_id: UserId) -> ServiceFuture<'_, Vec<Ticket>>;
}

/// Payment recording
pub trait PaymentService: Send + Sync {
    /// Record a payment for a paid registration
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure
    fn process_payment(&self, payment: NewPayment) -> ServiceFuture<'_, PaymentReceipt>;
}

/// Event lookup
pub trait EventService: Send + Sync {
    /// Fetch one event
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure
    fn event(&self, event_id: EventId) -> ServiceFuture<'_, Event>;
}

impl TicketService for ApiClient {
    fn create_ticket(&self, ticket: NewTicket) -> ServiceFuture<'_, CreatedTicket> {
        Box::pin(async move { ApiClient::create_ticket(self, &ticket).await })
    }

    fn user_tickets(&self, user_id: UserId) -> ServiceFuture<'_, Vec<Ticket>> {
        Box::pin(ApiClient::user_tickets(self, user_id))
    }
}

impl PaymentService for ApiClient {
    fn process_payment(&self, payment: NewPayment) -> ServiceFuture<'_, PaymentReceipt> {
        Box::pin(async move { self.create_payment(&payment).await })
    }
}

impl EventService for ApiClient {
    fn event(&self, event_id: EventId) -> ServiceFuture<'_, Event> {
        Box::pin(ApiClient::event(self, event_id))
    }
}
