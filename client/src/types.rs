//! Domain and wire types shared by the client and the registration workflow.
//!
//! Field names follow the backend's JSON (`event_name`, `ticket_status`, ...);
//! Rust-side names are the natural ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a backend-assigned identifier
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// The raw identifier
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

backend_id!(
    /// Identifier of an event, assigned by the backend
    EventId
);
backend_id!(
    /// Identifier of a ticket, assigned by the backend on `POST /tickets`
    TicketId
);
backend_id!(
    /// Identifier of a user
    UserId
);
backend_id!(
    /// Identifier of an organization
    OrganizationId
);
backend_id!(
    /// Identifier of a payment record, assigned by the backend on `POST /payments`
    PaymentId
);

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// An amount of money in cents.
///
/// On the wire it is a decimal number of dollars; the backend sometimes sends
/// it as a string (`"25.00"`), which is accepted too.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Platform fee rate in basis points (5%).
    pub const PLATFORM_FEE_BPS: u64 = 500;

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars, saturating on overflow
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Parses a decimal dollar amount, rounding to the nearest cent.
    ///
    /// Returns `None` for negative, non-finite or absurdly large values.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked above the cast
    pub fn from_decimal(dollars: f64) -> Option<Self> {
        let cents = (dollars * 100.0).round();
        if !cents.is_finite() || cents < 0.0 || cents > 9.0e15 {
            return None;
        }
        Some(Self(cents as u64))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount as decimal dollars
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // amounts stay far below 2^52 cents
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, saturating on overflow
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// The 5% platform fee on this ticket price, rounded half-up to the cent.
    ///
    /// ```
    /// use ticketr_client::Money;
    ///
    /// assert_eq!(Money::from_dollars(25).platform_fee(), Money::from_cents(125));
    /// assert_eq!(Money::from_cents(1999).platform_fee(), Money::from_cents(100));
    /// ```
    #[must_use]
    pub const fn platform_fee(&self) -> Self {
        Self((self.0.saturating_mul(Self::PLATFORM_FEE_BPS) + 5_000) / 10_000)
    }

    /// Ticket price plus platform fee
    #[must_use]
    pub const fn with_platform_fee(&self) -> Self {
        self.saturating_add(self.platform_fee())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        let dollars = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s
                .trim()
                .trim_start_matches('$')
                .parse::<f64>()
                .map_err(serde::de::Error::custom)?,
        };
        Self::from_decimal(dollars)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {dollars}")))
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parse a backend timestamp.
///
/// Accepts RFC 3339, RFC 2822 (what Flask emits for `DATETIME` columns) and
/// naive `YYYY-MM-DD[T ]HH:MM[:SS[.fff]]`, the last taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
    .map(|naive| naive.and_utc())
}

/// Serde adapter for backend timestamps; always writes RFC 3339 with millisecond precision.
pub mod timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as RFC 3339 (`2025-01-01T00:00:00.000Z`)
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Deserialize any format accepted by [`parse_timestamp`]
    ///
    /// # Errors
    ///
    /// Fails on strings no format accepts.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    /// Nullable variant; empty strings read as `None`.
    pub mod option {
        use super::parse_timestamp;
        use chrono::{DateTime, SecondsFormat, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize `None` as `null`
        ///
        /// # Errors
        ///
        /// Propagates serializer errors.
        #[allow(clippy::ref_option)] // serde `with` signature
        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize `null`, `""` or a timestamp
        ///
        /// # Errors
        ///
        /// Fails on non-empty strings no format accepts.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => parse_timestamp(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
            }
        }
    }
}

/// MySQL booleans arrive as `0`/`1`.
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Bool(b)) => b,
        Some(Raw::Int(i)) => i != 0,
        None => false,
    })
}

// ============================================================================
// Events
// ============================================================================

/// Event category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Concerts, open mics
    Music,
    /// Technology
    Tech,
    /// Sports
    Sports,
    /// Food & dining
    Food,
    /// Art
    Art,
    /// Culture
    Culture,
    /// Business
    Business,
    /// Education
    Education,
    /// Health
    Health,
    /// Anything else, including categories this client does not know
    #[default]
    #[serde(other)]
    Other,
}

/// Lifecycle status of an event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Not started yet
    #[default]
    Upcoming,
    /// In progress
    Ongoing,
    /// Finished
    Completed,
    /// Called off
    Cancelled,
}

/// An event as the backend stores it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    #[serde(rename = "event_id")]
    pub id: EventId,
    /// Owning organization
    #[serde(default)]
    pub org_id: Option<OrganizationId>,
    /// Event name
    #[serde(rename = "event_name")]
    pub name: String,
    /// When the event takes place
    #[serde(rename = "event_date", with = "timestamp")]
    pub date: DateTime<Utc>,
    /// Venue
    #[serde(default)]
    pub location: String,
    /// Category
    #[serde(rename = "event_category", default)]
    pub category: EventCategory,
    /// Ticket price; zero means free
    #[serde(default)]
    pub ticket_price: Money,
    /// Maximum attendees; `None` means unlimited
    #[serde(rename = "max_attendees", default)]
    pub capacity: Option<u32>,
    /// Status
    #[serde(rename = "event_status", default)]
    pub status: EventStatus,
    /// Whether a sponsor backs the event
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_sponsored: bool,
    /// Sponsor name
    #[serde(default)]
    pub sponsor_name: Option<String>,
    /// When VIP members may start registering
    #[serde(default, with = "timestamp::option")]
    pub vip_access_time: Option<DateTime<Utc>>,
    /// When everyone else may start registering
    #[serde(default, with = "timestamp::option")]
    pub general_access_time: Option<DateTime<Utc>>,
}

impl Event {
    /// Free events skip the payment step.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.ticket_price.is_zero()
    }

    /// Seats left given `registered` tickets; `None` when capacity is unlimited.
    #[must_use]
    pub fn seats_remaining(&self, registered: u32) -> Option<u32> {
        self.capacity.map(|cap| cap.saturating_sub(registered))
    }

    /// Occupancy percentage rounded to one decimal; `None` when capacity is unlimited or zero.
    #[must_use]
    pub fn occupancy_rate(&self, registered: u32) -> Option<f64> {
        self.capacity
            .filter(|cap| *cap > 0)
            .map(|cap| (f64::from(registered) / f64::from(cap) * 1000.0).round() / 10.0)
    }

    /// Whether registration is open at `now` for a VIP or general member.
    ///
    /// Cancelled and completed events are closed. VIPs fall back to the
    /// general access time when no VIP time is set.
    #[must_use]
    pub fn registration_open(&self, now: DateTime<Utc>, is_vip: bool) -> bool {
        if matches!(self.status, EventStatus::Cancelled | EventStatus::Completed) {
            return false;
        }
        let opens_at = if is_vip {
            self.vip_access_time.or(self.general_access_time)
        } else {
            self.general_access_time
        };
        opens_at.is_none_or(|opens| now >= opens)
    }
}

/// Body for creating or updating an event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventDraft {
    /// Owning organization
    pub org_id: OrganizationId,
    /// Event name
    pub event_name: String,
    /// When the event takes place
    #[serde(with = "timestamp")]
    pub event_date: DateTime<Utc>,
    /// Venue
    pub location: String,
    /// Maximum attendees
    pub max_attendees: Option<u32>,
    /// Ticket price
    pub ticket_price: Money,
    /// Category
    pub event_category: EventCategory,
    /// Status
    pub event_status: EventStatus,
    /// Sponsored flag
    pub is_sponsored: bool,
    /// Sponsor name
    pub sponsor_name: Option<String>,
    /// VIP access time
    #[serde(with = "timestamp::option")]
    pub vip_access_time: Option<DateTime<Utc>>,
    /// General access time
    #[serde(with = "timestamp::option")]
    pub general_access_time: Option<DateTime<Utc>>,
}

/// Backend acknowledgement of `POST /events`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreatedEvent {
    /// Assigned ID
    pub event_id: EventId,
}

// ============================================================================
// Organizations & Users
// ============================================================================

/// An organization that hosts events
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization ID
    #[serde(rename = "org_id")]
    pub id: OrganizationId,
    /// Name
    #[serde(rename = "org_name")]
    pub name: String,
    /// Street address
    #[serde(default)]
    pub address: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
    /// Premium tier
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_premium: bool,
}

/// Body for `POST /organizations`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewOrganization {
    /// Name
    pub org_name: String,
    /// Street address
    pub address: String,
    /// Contact email
    pub email: String,
    /// Premium tier
    pub is_premium: bool,
}

/// A user who registers for events
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    #[serde(rename = "user_id")]
    pub id: UserId,
    /// Display name
    #[serde(rename = "user_name", alias = "name")]
    pub name: String,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
    /// VIP members get early access
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_vip: bool,
}

/// Body for `POST /users`
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    /// Display name
    pub user_name: String,
    /// Email
    pub email: String,
    /// Plain password; hashed by the backend
    pub password: String,
    /// VIP sign-up
    pub is_vip: bool,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("user_name", &self.user_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("is_vip", &self.is_vip)
            .finish()
    }
}

/// Backend acknowledgement carrying only a new ID
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Created<Id> {
    /// Assigned ID
    #[serde(alias = "user_id", alias = "org_id")]
    pub id: Id,
}

// ============================================================================
// Tickets
// ============================================================================

/// Ticket status as stored by the backend.
///
/// `Expired` is never written by this client; see [`Ticket::effective_status`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Valid for entry
    #[default]
    Active,
    /// Checked in
    Used,
    /// Event has passed
    Expired,
}

/// Where a ticket was bought
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PurchaseSource {
    /// Registered through the web workflow
    #[default]
    Web,
    /// Created directly against the backend (its default)
    Direct,
    /// Anything else, preserved verbatim
    Other(String),
}

impl From<String> for PurchaseSource {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "web" => Self::Web,
            "direct" => Self::Direct,
            _ => Self::Other(raw),
        }
    }
}

impl From<PurchaseSource> for String {
    fn from(source: PurchaseSource) -> Self {
        match source {
            PurchaseSource::Web => "web".to_string(),
            PurchaseSource::Direct => "direct".to_string(),
            PurchaseSource::Other(raw) => raw,
        }
    }
}

/// A ticket record as returned by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket ID
    #[serde(rename = "ticket_id")]
    pub id: TicketId,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Holder
    pub user_id: UserId,
    /// Stored status
    #[serde(rename = "ticket_status", default)]
    pub status: TicketStatus,
    /// Stored QR payload placeholder
    #[serde(default)]
    pub qr_code: Option<String>,
    /// When it was bought
    #[serde(default, with = "timestamp::option")]
    pub purchase_date: Option<DateTime<Utc>>,
    /// When it was scanned at the door
    #[serde(default, with = "timestamp::option")]
    pub check_in_time: Option<DateTime<Utc>>,
    /// Purchase channel
    #[serde(default)]
    pub purchase_source: PurchaseSource,
}

impl Ticket {
    /// Status as the holder should see it at `now`.
    ///
    /// An active ticket for an event whose date has passed reads as expired.
    #[must_use]
    pub fn effective_status(&self, event_date: DateTime<Utc>, now: DateTime<Utc>) -> TicketStatus {
        match self.status {
            TicketStatus::Active if event_date <= now => TicketStatus::Expired,
            status => status,
        }
    }
}

/// Body for `POST /tickets`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewTicket {
    /// Event
    pub event_id: EventId,
    /// Holder
    pub user_id: UserId,
    /// Always `active` for new tickets
    pub ticket_status: TicketStatus,
    /// Placeholder; the QR image is derived client-side
    pub qr_code: String,
    /// Purchase time
    #[serde(with = "timestamp")]
    pub purchase_date: DateTime<Utc>,
    /// Always `null` for new tickets
    #[serde(with = "timestamp::option")]
    pub check_in_time: Option<DateTime<Utc>>,
    /// Purchase channel
    pub purchase_source: PurchaseSource,
    /// Payment that paid for this ticket, for paid events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
}

impl NewTicket {
    /// Placeholder stored in `qr_code` until a scanner-side format exists.
    pub const QR_PLACEHOLDER: &'static str = "pending";

    /// A fresh web registration: active, not checked in.
    #[must_use]
    pub fn web(
        event_id: EventId,
        user_id: UserId,
        purchase_date: DateTime<Utc>,
        payment_id: Option<PaymentId>,
    ) -> Self {
        Self {
            event_id,
            user_id,
            ticket_status: TicketStatus::Active,
            qr_code: Self::QR_PLACEHOLDER.to_string(),
            purchase_date,
            check_in_time: None,
            purchase_source: PurchaseSource::Web,
            payment_id,
        }
    }
}

/// Backend acknowledgement of `POST /tickets`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTicket {
    /// Assigned ID
    pub ticket_id: TicketId,
    /// Backend message
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Payments
// ============================================================================

/// How a payment was made
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card entered in the payment form
    #[default]
    CreditCard,
}

/// Body for `POST /payments`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewPayment {
    /// Payer
    pub user_id: UserId,
    /// Ticket price
    pub amount: Money,
    /// 5% platform fee
    pub platform_fee: Money,
    /// Method
    pub payment_method: PaymentMethod,
}

impl NewPayment {
    /// Card payment for a ticket of `price`, fee derived from the price.
    #[must_use]
    pub const fn for_ticket(user_id: UserId, price: Money) -> Self {
        Self {
            user_id,
            amount: price,
            platform_fee: price.platform_fee(),
            payment_method: PaymentMethod::CreditCard,
        }
    }

    /// Amount plus fee
    #[must_use]
    pub const fn total(&self) -> Money {
        self.amount.saturating_add(self.platform_fee)
    }
}

/// Backend acknowledgement of `POST /payments`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Assigned ID
    pub payment_id: PaymentId,
    /// Backend message
    #[serde(default)]
    pub message: Option<String>,
}

/// A stored payment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Payment ID
    pub payment_id: PaymentId,
    /// Payer
    pub user_id: UserId,
    /// Ticket price
    pub amount: Money,
    /// Platform fee
    pub platform_fee: Money,
    /// Method as stored
    pub payment_method: String,
}
