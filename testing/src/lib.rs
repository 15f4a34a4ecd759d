//! # Ticketr Testing
//!
//! Testing utilities for the Ticketr workspace.
//!
//! This crate provides:
//! - A fixed [`Clock`] so purchase and QR timestamps are reproducible
//! - [`ReducerTest`], a Given-When-Then harness for reducers, and [`drain_effects`]
//! - In-memory ticket, payment and event services
//! - Fixtures and proptest strategies for domain types
//!
//! ## Example
//!
//! ```ignore
//! use ticketr_testing::{test_clock, InMemoryTicketService, ScriptedPaymentService};
//! use ticketr_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_free_registration() {
//!     let tickets = InMemoryTicketService::new();
//!     let env = environment(tickets.clone(), ScriptedPaymentService::succeeding());
//!     let store = Store::new(RegistrationState::new(free_event(), requester()), RegistrationReducer::new(), env);
//!
//!     store.send(RegistrationAction::Confirm).await?;
//!
//!     assert_eq!(tickets.created().len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use ticketr_core::environment::Clock;

mod service_mocks;

pub use reducer_test::{assertions, drain_effects, ReducerTest};
pub use service_mocks::{
    InMemoryEventService, InMemoryTicketService, ScriptedPaymentService, FIRST_TICKET_ID,
};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketr_testing::mocks::FixedClock;
    /// use ticketr_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(crate::fixtures::now())
    }
}

/// Domain fixtures shared by test suites
pub mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use ticketr_client::{
        Event, EventCategory, EventId, EventStatus, Money, OrganizationId, PurchaseSource,
        Ticket, TicketId, TicketStatus, UserId,
    };

    /// The instant [`crate::test_clock`] is fixed at: 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// A UTC instant; out-of-range components fall back to [`now`]
    #[must_use]
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .unwrap_or_else(now)
    }

    /// A free event two months after [`now`]
    #[must_use]
    pub fn free_event() -> Event {
        Event {
            id: EventId::new(7),
            org_id: Some(OrganizationId::new(1)),
            name: "Spring Open Mic".to_string(),
            date: at(2025, 3, 15, 19, 0),
            location: "Student Union Hall".to_string(),
            category: EventCategory::Music,
            ticket_price: Money::ZERO,
            capacity: Some(200),
            status: EventStatus::Upcoming,
            is_sponsored: false,
            sponsor_name: None,
            vip_access_time: None,
            general_access_time: None,
        }
    }

    /// A paid event costing `price`
    #[must_use]
    pub fn paid_event(price: Money) -> Event {
        Event {
            id: EventId::new(8),
            name: "Campus Tech Summit".to_string(),
            category: EventCategory::Tech,
            ticket_price: price,
            ..free_event()
        }
    }

    /// A stored ticket for `event` held by `user`
    #[must_use]
    pub fn ticket(id: i64, event: EventId, user: UserId, status: TicketStatus) -> Ticket {
        Ticket {
            id: TicketId::new(id),
            event_id: event,
            user_id: user,
            status,
            qr_code: Some("pending".to_string()),
            purchase_date: Some(now()),
            check_in_time: None,
            purchase_source: PurchaseSource::Web,
        }
    }
}

/// Property-based testing strategies
pub mod properties {
    use proptest::prelude::*;
    use ticketr_client::Money;

    /// Ticket prices from free up to $10,000
    pub fn money() -> impl Strategy<Value = Money> {
        (0u64..=1_000_000).prop_map(Money::from_cents)
    }

    /// Up to 24 characters of card-number input: mostly digits, some spaces and dashes
    pub fn card_input() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![8 => proptest::char::range('0', '9'), 1 => Just(' '), 1 => Just('-')],
            0..=24,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock};
