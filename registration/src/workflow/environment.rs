//! Environment for the registration reducer.

use crate::qr::{QrOptions, QrPayloadEncoder};
use std::sync::Arc;
use ticketr_client::{ApiClient, PaymentService, TicketService};
use ticketr_core::environment::{Clock, SystemClock};

/// Collaborators the registration workflow needs.
///
/// Production wires these to [`ApiClient`] and the `qrcode` renderer; tests use
/// a `FixedClock` and in-memory services.
#[derive(Clone)]
pub struct RegistrationEnvironment {
    /// Clock for purchase and QR timestamps
    pub clock: Arc<dyn Clock>,
    /// Ticket issuance
    pub tickets: Arc<dyn TicketService>,
    /// Payment recording
    pub payments: Arc<dyn PaymentService>,
    /// QR payload encoder
    pub qr: QrPayloadEncoder,
}

impl RegistrationEnvironment {
    /// Creates a new `RegistrationEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        tickets: Arc<dyn TicketService>,
        payments: Arc<dyn PaymentService>,
        qr: QrPayloadEncoder,
    ) -> Self {
        Self {
            clock,
            tickets,
            payments,
            qr,
        }
    }

    /// Backend-backed environment with the system clock
    #[must_use]
    pub fn production(client: &ApiClient, qr_options: QrOptions) -> Self {
        let client = Arc::new(client.clone());
        Self::new(
            Arc::new(SystemClock),
            Arc::clone(&client) as Arc<dyn TicketService>,
            client,
            QrPayloadEncoder::qrcode(qr_options),
        )
    }
}

impl std::fmt::Debug for RegistrationEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationEnvironment")
            .field("qr", &self.qr)
            .finish_non_exhaustive()
    }
}
