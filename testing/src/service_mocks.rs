//! In-memory backend services
//!
//! Provides fast, deterministic stand-ins for the REST backend:
//! - [`InMemoryTicketService`]: assigns sequential ticket ids, records every creation
//! - [`ScriptedPaymentService`]: succeeds or fails on demand, optionally after a delay
//! - [`InMemoryEventService`]: serves a fixed set of events

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use ticketr_client::{
    ApiError, CreatedTicket, Event, EventId, EventService, NewPayment, NewTicket, PaymentId,
    PaymentReceipt, PaymentService, ServiceFuture, Ticket, TicketId, TicketService, UserId,
};

/// First id handed out by [`InMemoryTicketService`].
pub const FIRST_TICKET_ID: i64 = 1001;

#[derive(Debug)]
struct TicketLedger {
    next_id: i64,
    tickets: Vec<Ticket>,
    created: Vec<NewTicket>,
    create_error: Option<ApiError>,
    list_error: Option<ApiError>,
}

/// In-memory ticket backend.
///
/// # Example
///
/// ```
/// use ticketr_client::{EventId, NewTicket, TicketService, UserId};
/// use ticketr_testing::{test_clock, InMemoryTicketService};
/// use ticketr_core::environment::Clock;
///
/// # tokio_test::block_on(async {
/// let tickets = InMemoryTicketService::new();
/// let new = NewTicket::web(EventId::new(7), UserId::new(42), test_clock().now(), None);
///
/// let created = tickets.create_ticket(new).await.unwrap();
/// assert_eq!(created.ticket_id.get(), 1001);
/// assert_eq!(tickets.created().len(), 1);
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryTicketService {
    ledger: Arc<RwLock<TicketLedger>>,
}

impl InMemoryTicketService {
    /// Create an empty ticket backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(RwLock::new(TicketLedger {
                next_id: FIRST_TICKET_ID,
                tickets: Vec::new(),
                created: Vec::new(),
                create_error: None,
                list_error: None,
            })),
        }
    }

    /// Seed existing tickets (for pre-check and my-tickets tests)
    #[must_use]
    pub fn with_tickets(self, tickets: impl IntoIterator<Item = Ticket>) -> Self {
        self.ledger.write().unwrap().tickets.extend(tickets);
        self
    }

    /// Make every `create_ticket` call fail with `error`
    #[must_use]
    pub fn failing_creation(self, error: ApiError) -> Self {
        self.ledger.write().unwrap().create_error = Some(error);
        self
    }

    /// Make every `user_tickets` call fail with `error`
    #[must_use]
    pub fn failing_listing(self, error: ApiError) -> Self {
        self.ledger.write().unwrap().list_error = Some(error);
        self
    }

    /// Every successful creation request, in order
    #[must_use]
    pub fn created(&self) -> Vec<NewTicket> {
        self.ledger.read().unwrap().created.clone()
    }

    /// Number of creation attempts, failed ones included
    #[must_use]
    pub fn create_attempts(&self) -> usize {
        let ledger = self.ledger.read().unwrap();
        usize::try_from(ledger.next_id - FIRST_TICKET_ID).unwrap_or(0)
    }
}

impl Default for InMemoryTicketService {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketService for InMemoryTicketService {
    fn create_ticket(&self, ticket: NewTicket) -> ServiceFuture<'_, CreatedTicket> {
        Box::pin(async move {
            let mut ledger = self.ledger.write().unwrap();
            let id = TicketId::new(ledger.next_id);
            ledger.next_id += 1;

            if let Some(err) = ledger.create_error.clone() {
                return Err(err);
            }

            ledger.tickets.push(Ticket {
                id,
                event_id: ticket.event_id,
                user_id: ticket.user_id,
                status: ticket.ticket_status,
                qr_code: Some(ticket.qr_code.clone()),
                purchase_date: Some(ticket.purchase_date),
                check_in_time: ticket.check_in_time,
                purchase_source: ticket.purchase_source.clone(),
            });
            ledger.created.push(ticket);

            Ok(CreatedTicket {
                ticket_id: id,
                message: Some("Ticket created successfully".to_string()),
            })
        })
    }

    fn user_tickets(&self, user_id: UserId) -> ServiceFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let ledger = self.ledger.read().unwrap();
            if let Some(err) = ledger.list_error.clone() {
                return Err(err);
            }
            Ok(ledger
                .tickets
                .iter()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect())
        })
    }
}

#[derive(Debug, Default)]
struct PaymentScript {
    calls: Vec<NewPayment>,
    error: Option<ApiError>,
    delay: Option<Duration>,
}

/// Payment backend whose outcome is set by the test.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPaymentService {
    script: Arc<RwLock<PaymentScript>>,
}

impl ScriptedPaymentService {
    /// Payments succeed with ids 1, 2, 3, ...
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Payments fail with `error`
    #[must_use]
    pub fn failing(error: ApiError) -> Self {
        let service = Self::default();
        service.script.write().unwrap().error = Some(error);
        service
    }

    /// Wait `delay` before answering (for in-flight tests)
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.script.write().unwrap().delay = Some(delay);
        self
    }

    /// Every payment request received, in order
    #[must_use]
    pub fn calls(&self) -> Vec<NewPayment> {
        self.script.read().unwrap().calls.clone()
    }
}

impl PaymentService for ScriptedPaymentService {
    fn process_payment(&self, payment: NewPayment) -> ServiceFuture<'_, PaymentReceipt> {
        Box::pin(async move {
            let (delay, outcome) = {
                let mut script = self.script.write().unwrap();
                script.calls.push(payment);
                let id = i64::try_from(script.calls.len()).unwrap_or(i64::MAX);
                let outcome = script.error.clone().map_or(
                    Ok(PaymentReceipt {
                        payment_id: PaymentId::new(id),
                        message: Some("Payment created successfully".to_string()),
                    }),
                    Err,
                );
                (script.delay, outcome)
            };

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }
}

/// Event backend serving a fixed set of events.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventService {
    events: Arc<RwLock<HashMap<EventId, Event>>>,
}

impl InMemoryEventService {
    /// Serve `events`; unknown ids answer 404
    #[must_use]
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: Arc::new(RwLock::new(events.into_iter().map(|e| (e.id, e)).collect())),
        }
    }
}

impl EventService for InMemoryEventService {
    fn event(&self, event_id: EventId) -> ServiceFuture<'_, Event> {
        Box::pin(async move {
            self.events
                .read()
                .unwrap()
                .get(&event_id)
                .cloned()
                .ok_or_else(|| ApiError::Api {
                    status: 404,
                    message: "Event not found".to_string(),
                })
        })
    }
}
