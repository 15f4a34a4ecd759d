//! A user's tickets: listing, viewing QR codes and the registration pre-check.

use crate::qr::{QrImage, QrPayload, QrPayloadEncoder};
use crate::workflow::Requester;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use ticketr_client::{Event, EventId, EventService, Ticket, TicketId, TicketService, TicketStatus, UserId};

/// A ticket joined with its event.
///
/// `event` is `None` when the event lookup failed; the ticket is still listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketWithEvent {
    /// Stored ticket
    pub ticket: Ticket,
    /// Event the ticket is for, if it could be loaded
    pub event: Option<Event>,
}

impl TicketWithEvent {
    /// Event still ahead and ticket still usable
    #[must_use]
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.event
            .as_ref()
            .is_some_and(|event| event.date > now && self.ticket.status == TicketStatus::Active)
    }

    /// Event over, or ticket already scanned
    #[must_use]
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.ticket.status == TicketStatus::Used
            || self.event.as_ref().is_some_and(|event| event.date <= now)
    }

    /// Status as the holder should see it
    #[must_use]
    pub fn display_status(&self, now: DateTime<Utc>) -> TicketStatus {
        match &self.event {
            Some(event) => self.ticket.effective_status(event.date, now),
            None => self.ticket.status,
        }
    }
}

/// A user's tickets split for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MyTickets {
    /// Upcoming, soonest first
    pub upcoming: Vec<TicketWithEvent>,
    /// Past, most recent first
    pub past: Vec<TicketWithEvent>,
}

impl MyTickets {
    /// Split `entries` into upcoming and past as of `now`.
    ///
    /// Entries that are neither (an active ticket whose event could not be
    /// loaded) are dropped from both lists.
    #[must_use]
    pub fn partition(entries: Vec<TicketWithEvent>, now: DateTime<Utc>) -> Self {
        let (mut upcoming, rest): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|entry| entry.is_upcoming(now));
        let mut past: Vec<_> = rest.into_iter().filter(|entry| entry.is_past(now)).collect();

        upcoming.sort_by_key(|entry| entry.event.as_ref().map(|e| e.date));
        past.sort_by_key(|entry| std::cmp::Reverse(entry.event.as_ref().map(|e| e.date)));

        Self { upcoming, past }
    }

    /// No tickets at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty() && self.past.is_empty()
    }

    /// Find a listed ticket by id
    #[must_use]
    pub fn find(&self, ticket_id: TicketId) -> Option<&TicketWithEvent> {
        self.upcoming
            .iter()
            .chain(&self.past)
            .find(|entry| entry.ticket.id == ticket_id)
    }
}

/// Load a user's tickets with their events.
///
/// Event lookups run concurrently. A failed lookup is logged and leaves that
/// entry's event empty.
///
/// # Errors
///
/// Fails only if the ticket list itself cannot be loaded.
#[tracing::instrument(skip(tickets, events))]
pub async fn load_my_tickets(
    tickets: &dyn TicketService,
    events: &dyn EventService,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<MyTickets, ticketr_client::ApiError> {
    let held = tickets.user_tickets(user_id).await?;
    tracing::debug!(count = held.len(), "Loaded tickets");

    let lookups = held.iter().map(|ticket| lookup_event(events, ticket.event_id));
    let joined = join_all(lookups)
        .await
        .into_iter()
        .zip(held)
        .map(|(event, ticket)| TicketWithEvent { ticket, event })
        .collect();

    Ok(MyTickets::partition(joined, now))
}

async fn lookup_event(events: &dyn EventService, event_id: EventId) -> Option<Event> {
    match events.event(event_id).await {
        Ok(event) => Some(event),
        Err(error) => {
            tracing::warn!(%event_id, %error, "Event lookup failed; listing ticket without event");
            None
        },
    }
}

/// Regenerate a stored ticket's QR code for viewing.
///
/// `None` when the event is unknown or rendering failed.
#[must_use]
pub fn ticket_qr(
    encoder: &QrPayloadEncoder,
    entry: &TicketWithEvent,
    holder: &Requester,
    now: DateTime<Utc>,
) -> Option<QrImage> {
    let event = entry.event.as_ref()?;
    let payload = QrPayload {
        ticket_id: entry.ticket.id,
        event_id: event.id,
        event_name: event.name.clone(),
        user_id: holder.user_id,
        user_name: holder.name.clone(),
        timestamp: now,
    };
    encoder.encode(&payload)
}

/// Outcome of the registration pre-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationCheck {
    /// User already holds a ticket for the event
    Registered(TicketId),
    /// No ticket found
    NotRegistered,
    /// Lookup failed; carries the error message
    Unknown(String),
}

impl RegistrationCheck {
    /// Only a known existing ticket blocks a new registration; the backend
    /// stays the authority when the lookup fails.
    #[must_use]
    pub const fn blocks_registration(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}

/// Whether `user_id` already holds a usable ticket for `event_id`.
///
/// Expired tickets do not count.
#[tracing::instrument(skip(tickets))]
pub async fn check_registration(
    tickets: &dyn TicketService,
    user_id: UserId,
    event_id: EventId,
) -> RegistrationCheck {
    match tickets.user_tickets(user_id).await {
        Ok(held) => held
            .iter()
            .find(|t| t.event_id == event_id && t.status != TicketStatus::Expired)
            .map_or(RegistrationCheck::NotRegistered, |t| RegistrationCheck::Registered(t.id)),
        Err(error) => {
            tracing::warn!(%error, "Could not check existing registration");
            RegistrationCheck::Unknown(error.to_string())
        },
    }
}
