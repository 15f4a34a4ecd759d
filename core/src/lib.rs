//! # Ticketr Core
//!
//! The small set of abstractions the registration workflow is built on.
//!
//! - **State**: everything a workflow instance knows (current step, event snapshot, requester)
//! - **Action**: every input the workflow reacts to, whether a user intent or a collaborator result
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`, with no I/O of its own
//! - **Effect**: a description of work for the runtime to perform, usually a future yielding the next action
//! - **Environment**: collaborators injected as trait objects (clock, backend services, QR renderer)
//!
//! Keeping the state machine pure means every transition can be exercised without a
//! network, a UI framework or a real clock.
//!
//! ## Example
//!
//! ```
//! use ticketr_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Counter {
//!     submissions: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Submit,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = Counter;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut Counter,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         match action {
//!             CounterAction::Submit => state.submissions += 1,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = Counter::default();
//! let effects = CounterReducer.reduce(&mut state, CounterAction::Submit, &());
//! assert_eq!(state.submissions, 1);
//! assert_eq!(effects.len(), 1);
//! ```

#![forbid(unsafe_code)]

pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer trait: the single place where state transitions happen.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Business logic for one feature.
    ///
    /// A reducer validates the action against the current state, mutates the
    /// state in place and returns descriptions of the side effects that should
    /// follow. It never performs I/O itself.
    ///
    /// Most transitions produce at most a handful of effects, hence the inline
    /// capacity of four.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect descriptions returned by reducers and executed by the runtime.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future produced by [`Effect::Future`].
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// A side effect to be executed by the store.
    ///
    /// Effects are values. Returning one from a reducer does nothing until the
    /// runtime executes it; this is what keeps reducers testable.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after another, each finishing before the next starts
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// If it resolves to `Some(action)`, that action is fed back into the reducer.
        Future(EffectFuture<Action>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async block as an effect.
        ///
        /// ```
        /// use ticketr_core::effect::Effect;
        ///
        /// let effect: Effect<u8> = Effect::future(async { Some(7) });
        /// assert!(effect.is_future());
        /// ```
        #[must_use]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// An effect that immediately dispatches `action`.
        #[must_use]
        pub fn send(action: Action) -> Self
        where
            Action: Send + 'static,
        {
            Effect::future(async move { Some(action) })
        }

        /// Combine effects to run concurrently
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run in order
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// `true` for [`Effect::Future`]
        #[must_use]
        pub const fn is_future(&self) -> bool {
            matches!(self, Effect::Future(_))
        }
    }
}

/// Environment traits shared by every reducer.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of "now". Purchase timestamps and QR payload timestamps come from here.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
