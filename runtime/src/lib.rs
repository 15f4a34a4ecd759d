//! # Ticketr Runtime
//!
//! The [`Store`] owns a workflow's state, runs its reducer and executes the
//! effects the reducer describes.
//!
//! ## Execution model
//!
//! - `send` takes the write lock, runs the reducer, and releases the lock
//!   before any effect runs. Actions arriving while effects are in flight are
//!   therefore reduced against the in-flight state (this is how duplicate
//!   submissions get rejected).
//! - Effects are awaited in place. Actions they produce are broadcast to
//!   observers and fed back through `send`, so `send` resolves only once the
//!   whole chain it started has settled.
//! - Nothing is cancelled once dispatched.
//!
//! ## Example
//!
//! ```ignore
//! use ticketr_runtime::Store;
//!
//! let store = Store::new(initial_state, RegistrationReducer::new(), environment);
//! let mut observer = store.subscribe_actions();
//!
//! store.send(RegistrationAction::Confirm).await?;
//!
//! let step = store.state(|s| s.step.name()).await;
//! ```

#![forbid(unsafe_code)]

use futures::future::{join_all, BoxFuture};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use ticketr_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{broadcast, RwLock};

pub use error::StoreError;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Action broadcast channel closed before the awaited action arrived
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

/// Default capacity of the action broadcast channel.
const BROADCAST_CAPACITY: usize = 32;

struct Inner<S, E, R, A> {
    state: RwLock<S>,
    reducer: R,
    environment: E,
    shutdown: AtomicBool,
    action_broadcast: broadcast::Sender<A>,
}

/// The runtime for one reducer instance.
///
/// Cheap to clone; clones share state, reducer and environment.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    inner: Arc<Inner<S, E, R, A>>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + std::fmt::Debug + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        let (action_broadcast, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(initial_state),
                reducer,
                environment,
                shutdown: AtomicBool::new(false),
                action_broadcast,
            }),
        }
    }

    /// Send an action and wait until every effect it triggered has finished.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if [`Store::shutdown`] was called.
    #[tracing::instrument(skip(self), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        self.dispatch(action).await
    }

    fn dispatch(&self, action: A) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            if self.inner.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.actions.total").increment(1);

            let effects = {
                let mut state = self.inner.state.write().await;
                let effects = self
                    .inner
                    .reducer
                    .reduce(&mut state, action, &self.inner.environment);
                tracing::trace!("Reducer returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute(effect).await?;
            }
            Ok(())
        })
    }

    fn execute(&self, effect: Effect<A>) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    if let Some(action) = fut.await {
                        tracing::debug!(?action, "Effect produced action");
                        // No receivers is fine: observing is optional.
                        let _ = self.inner.action_broadcast.send(action.clone());
                        self.dispatch(action).await?;
                    }
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    for effect in effects {
                        self.execute(effect).await?;
                    }
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    let results = join_all(effects.into_iter().map(|e| self.execute(e))).await;
                    results.into_iter().collect::<Result<Vec<()>, _>>()?;
                },
            }
            Ok(())
        })
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let ticket_id = store.state(|s| s.step.ticket_id()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.inner.state.read().await;
        f(&state)
    }

    /// Subscribe to every action produced by effects.
    ///
    /// Actions sent directly through [`Store::send`] are not broadcast; only
    /// the feedback produced by effects is.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.inner.action_broadcast.subscribe()
    }

    /// Send an action and wait for the first effect-produced action matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] if the chain settles without a
    /// matching action, or any error from [`Store::send`].
    pub async fn send_and_wait_for<F>(&self, action: A, predicate: F) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.subscribe_actions();
        self.send(action).await?;

        loop {
            match rx.try_recv() {
                Ok(candidate) if predicate(&candidate) => return Ok(candidate),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {},
                Err(_) => return Err(StoreError::ChannelClosed),
            }
        }
    }

    /// Stop accepting new actions. Effects already running are left to finish.
    pub fn shutdown(&self) {
        tracing::info!("Store shutdown requested");
        self.inner.shutdown.store(true, Ordering::Release);
    }

    /// Whether [`Store::shutdown`] has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }
}
