//! State types for the registration workflow.

use crate::qr::QrImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ticketr_client::{ApiError, Event, Money, PaymentId, PaymentReceipt, TicketId, User, UserId};
use uuid::Uuid;

/// Identifies one pass through the workflow.
///
/// A restart after failure gets a fresh id so log lines from different
/// attempts can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// Generate a new attempt ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user registering. Always passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// User ID
    pub user_id: UserId,
    /// Display name, printed into the QR payload
    pub name: String,
    /// Email, shown on the confirm step
    pub email: Option<String>,
    /// VIP members may register before general access opens
    pub is_vip: bool,
}

impl From<&User> for Requester {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_vip: user.is_vip,
        }
    }
}

// ============================================================================
// Payment form
// ============================================================================

/// Why a payment form was rejected before any network call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaymentFormError {
    /// Card number, holder name, expiry or CVV is empty
    #[error("Please fill in all payment details")]
    MissingFields,

    /// Fewer than 13 digits
    #[error("Card number must be 13 to 16 digits")]
    InvalidCardNumber,

    /// Not two digits, a slash, two digits
    #[error("Expiry date must be in MM/YY format")]
    InvalidExpiry,

    /// Not 3 or 4 digits
    #[error("CVV must be 3 or 4 digits")]
    InvalidCvv,
}

/// Payment form fields, kept in their display format.
///
/// Setters apply the same formatting as the input fields: card number grouped
/// in fours (at most 16 digits), expiry as `MM/YY`, CVV digits only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PaymentForm {
    /// `1234 5678 9012 3456`
    pub card_number: String,
    /// Name on card
    pub card_name: String,
    /// `MM/YY`
    pub expiry: String,
    /// 3 or 4 digits
    pub cvv: String,
    /// Postal code, optional
    pub zip: String,
}

/// Which payment form field an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentField {
    /// Card number
    CardNumber,
    /// Name on card
    CardName,
    /// Expiry
    Expiry,
    /// CVV
    Cvv,
    /// Postal code
    Zip,
}

/// Keep digits only, at most `max`.
fn digits(raw: &str, max: usize) -> String {
    raw.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// Group card digits in fours: `"4242424242424242"` → `"4242 4242 4242 4242"`
#[must_use]
pub fn format_card_number(raw: &str) -> String {
    let digits = digits(raw, 16);
    let mut formatted = String::with_capacity(19);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            formatted.push(' ');
        }
        formatted.push(c);
    }
    formatted
}

/// `"1228"` → `"12/28"`; a slash follows once two digits are typed
#[must_use]
pub fn format_expiry(raw: &str) -> String {
    let digits = digits(raw, 4);
    if digits.len() < 2 {
        return digits;
    }
    let (month, year) = digits.split_at(2);
    format!("{month}/{year}")
}

/// Digits only, at most four
#[must_use]
pub fn format_cvv(raw: &str) -> String {
    digits(raw, 4)
}

impl PaymentForm {
    /// Apply a keystroke-level edit with field formatting
    pub fn set(&mut self, field: PaymentField, value: &str) {
        match field {
            PaymentField::CardNumber => self.card_number = format_card_number(value),
            PaymentField::CardName => self.card_name = value.to_string(),
            PaymentField::Expiry => self.expiry = format_expiry(value),
            PaymentField::Cvv => self.cvv = format_cvv(value),
            PaymentField::Zip => self.zip = value.trim().to_string(),
        }
    }

    /// Builder-style [`PaymentForm::set`]
    #[must_use]
    pub fn with(mut self, field: PaymentField, value: &str) -> Self {
        self.set(field, value);
        self
    }

    /// Check required fields and field lengths.
    ///
    /// Card validity (dates, checksums) is left to the payment backend.
    ///
    /// # Errors
    ///
    /// The first problem found, in field order.
    pub fn validate(&self) -> Result<(), PaymentFormError> {
        if [&self.card_number, &self.card_name, &self.expiry, &self.cvv]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(PaymentFormError::MissingFields);
        }

        let card_digits = digits(&self.card_number, usize::MAX);
        if !(13..=16).contains(&card_digits.len()) {
            return Err(PaymentFormError::InvalidCardNumber);
        }

        if !is_expiry_shaped(&self.expiry) {
            return Err(PaymentFormError::InvalidExpiry);
        }

        let cvv = digits(&self.cvv, usize::MAX);
        if !(3..=4).contains(&cvv.len()) || cvv.len() != self.cvv.len() {
            return Err(PaymentFormError::InvalidCvv);
        }

        Ok(())
    }

    /// Last four card digits, for display
    #[must_use]
    pub fn last_four(&self) -> String {
        let digits = digits(&self.card_number, 16);
        digits[digits.len().saturating_sub(4)..].to_string()
    }
}

/// Two digits, `/`, two digits
fn is_expiry_shaped(expiry: &str) -> bool {
    expiry.split_once('/').is_some_and(|(month, year)| {
        [month, year]
            .iter()
            .all(|part| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit()))
    })
}

impl std::fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentForm")
            .field("card_number", &format_args!("**** {}", self.last_four()))
            .field("card_name", &self.card_name)
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .field("zip", &self.zip)
            .finish()
    }
}

/// Inline error shown on the payment step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentStepError {
    /// Rejected locally
    #[error(transparent)]
    Invalid(#[from] PaymentFormError),

    /// Rejected by the backend or unreachable
    #[error(transparent)]
    Declined(#[from] ApiError),
}

// ============================================================================
// Steps
// ============================================================================

/// A ticket that made it through issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTicket {
    /// Id assigned by the backend
    pub ticket_id: TicketId,
    /// Event snapshot taken when the workflow started
    pub event: Event,
    /// Holder
    pub requester: Requester,
    /// Rendered QR code; `None` when rendering failed
    pub qr: Option<QrImage>,
    /// Ticket price plus fee for paid events
    pub amount_paid: Option<Money>,
    /// Linked payment for paid events
    pub payment_id: Option<PaymentId>,
    /// Purchase timestamp sent to the backend
    pub issued_at: DateTime<Utc>,
}

/// Where the workflow is.
///
/// `Confirm → Payment (paid events only) → Issuing → Success | Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStep {
    /// Showing event summary and requester; waiting for confirmation
    Confirm,

    /// Collecting card details
    Payment {
        /// Form contents
        form: PaymentForm,
        /// Last validation or payment error
        error: Option<PaymentStepError>,
        /// A payment request is in flight
        submitting: bool,
    },

    /// Creating the ticket, then rendering its QR code
    Issuing {
        /// Receipt of the payment made for this ticket, if paid
        payment: Option<PaymentReceipt>,
        /// Set once the backend has acknowledged the ticket
        ticket_id: Option<TicketId>,
        /// Purchase timestamp sent with the creation request
        issued_at: DateTime<Utc>,
    },

    /// Ticket issued
    Success(Box<IssuedTicket>),

    /// Ticket creation failed; terminal for this attempt
    Failed {
        /// Backend message, verbatim
        error: String,
        /// Payment taken before the failure, not attached to any ticket
        unlinked_payment: Option<PaymentReceipt>,
    },
}

impl RegistrationStep {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Payment { .. } => "payment",
            Self::Issuing { .. } => "issuing",
            Self::Success(_) => "success",
            Self::Failed { .. } => "failed",
        }
    }

    /// The issued ticket, once in `Success`
    #[must_use]
    pub fn issued(&self) -> Option<&IssuedTicket> {
        match self {
            Self::Success(ticket) => Some(ticket),
            _ => None,
        }
    }

    /// Error to show inline, if any
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Payment { error, .. } => error.as_ref().map(ToString::to_string),
            Self::Failed { error, .. } => Some(error.clone()),
            _ => None,
        }
    }

    /// Whether a request is in flight
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Payment {
                submitting: true,
                ..
            } | Self::Issuing { .. }
        )
    }
}

/// Registration workflow state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationState {
    /// Current attempt
    pub attempt: AttemptId,
    /// Event snapshot; later price or date changes do not affect this attempt
    pub event: Event,
    /// Who is registering
    pub requester: Requester,
    /// Current step
    pub step: RegistrationStep,
}

impl RegistrationState {
    /// Start at `Confirm`
    #[must_use]
    pub fn new(event: Event, requester: Requester) -> Self {
        Self {
            attempt: AttemptId::new(),
            event,
            requester,
            step: RegistrationStep::Confirm,
        }
    }

    /// Price plus platform fee; `None` for free events
    #[must_use]
    pub const fn amount_due(&self) -> Option<Money> {
        if self.event.is_free() {
            None
        } else {
            Some(self.event.ticket_price.with_platform_fee())
        }
    }
}
