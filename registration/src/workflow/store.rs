//! Store for a single registration attempt.

use crate::workflow::{
    RegistrationAction, RegistrationEnvironment, RegistrationReducer, RegistrationState, Requester,
};
use ticketr_client::Event;
use ticketr_runtime::Store;

/// Runtime for one registration workflow instance.
///
/// Each attempt owns its own store; nothing is shared between attempts.
pub type RegistrationStore =
    Store<RegistrationState, RegistrationAction, RegistrationEnvironment, RegistrationReducer>;

/// Create a store positioned at `Confirm` for `requester` registering to `event`.
#[must_use]
pub fn registration_store(
    event: Event,
    requester: Requester,
    environment: RegistrationEnvironment,
) -> RegistrationStore {
    Store::new(
        RegistrationState::new(event, requester),
        RegistrationReducer::new(),
        environment,
    )
}
