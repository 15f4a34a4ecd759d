//! Actions for the registration workflow.

use crate::qr::QrImage;
use crate::workflow::types::{IssuedTicket, PaymentField};
use ticketr_client::{ApiError, PaymentReceipt, TicketId};

/// Everything the registration workflow reacts to.
///
/// User intents come from the embedding page; the `*Succeeded`/`*Failed`
/// actions are produced by effects after the backend answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationAction {
    /// User confirmed the event summary.
    ///
    /// Free events go straight to issuing; paid events open the payment form.
    Confirm,

    /// User edited a payment field.
    EditPayment {
        /// Which field
        field: PaymentField,
        /// Raw input; formatting is applied by the reducer
        value: String,
    },

    /// User submitted the payment form.
    ///
    /// Ignored while a submission is already in flight.
    SubmitPayment,

    /// User left the payment form for the summary.
    Back,

    /// Backend recorded the payment.
    PaymentSucceeded {
        /// Receipt carrying the new payment id
        receipt: PaymentReceipt,
    },

    /// Payment was rejected or the backend was unreachable.
    PaymentFailed {
        /// Error to show on the form
        error: ApiError,
    },

    /// Backend created the ticket.
    TicketCreated {
        /// Id assigned by the backend
        ticket_id: TicketId,
    },

    /// Ticket creation failed.
    TicketCreationFailed {
        /// Error to show, verbatim
        error: ApiError,
    },

    /// QR rendering finished.
    QrEncoded {
        /// Ticket the image belongs to
        ticket_id: TicketId,
        /// `None` when rendering failed
        image: Option<QrImage>,
    },

    /// Notification for the embedding page: a ticket was issued.
    ///
    /// Observed through the store's action broadcast; the reducer does not
    /// change state on it.
    RegistrationCompleted {
        /// The issued ticket
        ticket: Box<IssuedTicket>,
    },

    /// Start over after a failure.
    Restart,
}

impl RegistrationAction {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::EditPayment { .. } => "edit_payment",
            Self::SubmitPayment => "submit_payment",
            Self::Back => "back",
            Self::PaymentSucceeded { .. } => "payment_succeeded",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::TicketCreated { .. } => "ticket_created",
            Self::TicketCreationFailed { .. } => "ticket_creation_failed",
            Self::QrEncoded { .. } => "qr_encoded",
            Self::RegistrationCompleted { .. } => "registration_completed",
            Self::Restart => "restart",
        }
    }
}
