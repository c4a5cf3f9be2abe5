//! Observable decorator providing synchronous notification cascades.
//!
//! An [`Observable`] owns a piece of state and an ordered list of listeners.
//! Every mutation goes through [`Observable::mutate`], which applies the
//! mutation first and then notifies every listener in registration order,
//! unconditionally (no equality diffing - a listener fires even when the new
//! value equals the old one).
//!
//! Cascades are depth-first: when a listener's side effect is itself a
//! mutation on another observable, that nested cascade runs to completion
//! before the outer loop advances to its next listener.
//!
//! # Fault isolation
//!
//! A listener that fails reports a [`ListenerFault`]; the fault is logged and
//! recorded in the [`CascadeReport`] and the remaining listeners still fire.
//! A cascade never aborts because one receiver went bad.
//!
//! # Cycle handling
//!
//! A re-entrancy guard detects a cascade looping back into an observable
//! that is already mid-notification (A observes B observes A). The nested
//! mutation still applies, but the nested notification round is refused and
//! surfaced as [`ListenerFault::Cycle`], so infinite recursion is impossible
//! regardless of wiring discipline. See [`crate::wiring::ModelGraph`] for
//! catching such loops at construction time instead.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Callback signature stored per listener.
///
/// The original "method name plus argument provider" flexibility is kept by
/// composing closures at registration time; see
/// [`Observable::add_observer_with_args`].
pub type ObserverFn = dyn Fn() -> Result<(), ListenerFault>;

/// A failure local to one listener during a notification cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerFault {
    /// The listener's receiver ran but reported a failure.
    Failed {
        /// Label the listener was registered under.
        listener: String,
        /// Receiver-provided description of what went wrong.
        reason: String,
    },
    /// The cascade re-entered an observable already mid-notification.
    Cycle {
        /// Name of the observable whose notification round was refused.
        observable: String,
    },
    /// A derived-model listener found its source measurement unset.
    SourceUnset {
        /// Label of the derived-model listener.
        listener: String,
    },
}

impl fmt::Display for ListenerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { listener, reason } => {
                write!(f, "listener '{listener}' failed: {reason}")
            }
            Self::Cycle { observable } => {
                write!(f, "notification cycle refused on '{observable}'")
            }
            Self::SourceUnset { listener } => {
                write!(f, "listener '{listener}' skipped: source measurement unset")
            }
        }
    }
}

/// Outcome of one notification cascade.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    /// Listeners that ran and returned `Ok`.
    pub delivered: usize,
    /// Faults collected along the way, in delivery order.
    pub faults: Vec<ListenerFault>,
}

impl CascadeReport {
    /// True when every listener was delivered without a fault.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

struct ListenerEntry {
    label: String,
    callback: Rc<ObserverFn>,
}

/// State container whose designated mutations notify registered listeners.
///
/// Single-threaded by design: handles share an `Observable` through `Rc`,
/// and interior mutability keeps the whole cascade synchronous on the
/// calling thread. There is no listener removal - the list grows
/// monotonically for the lifetime of the observable, matching the
/// wire-once-at-startup usage of the apparatus.
pub struct Observable<S> {
    name: String,
    state: RefCell<S>,
    listeners: RefCell<Vec<ListenerEntry>>,
    notifying: Cell<bool>,
}

impl<S> Observable<S> {
    /// Create an observable owning `state`. The name only feeds logs and
    /// cycle faults.
    pub fn new(name: impl Into<String>, state: S) -> Self {
        Observable {
            name: name.into(),
            state: RefCell::new(state),
            listeners: RefCell::new(Vec::new()),
            notifying: Cell::new(false),
        }
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a listener. No validation happens here; a bad receiver
    /// surfaces as a [`ListenerFault`] at notification time, never earlier.
    pub fn add_observer(
        &self,
        label: impl Into<String>,
        callback: impl Fn() -> Result<(), ListenerFault> + 'static,
    ) {
        self.listeners.borrow_mut().push(ListenerEntry {
            label: label.into(),
            callback: Rc::new(callback),
        });
    }

    /// Register a listener split into an argument provider and a receiver.
    ///
    /// The provider runs at notification time and its output is handed to
    /// the receiver, preserving the "choose what to call and what to pass"
    /// flexibility without stringly-typed dispatch.
    pub fn add_observer_with_args<T>(
        &self,
        label: impl Into<String>,
        provider: impl Fn() -> T + 'static,
        receiver: impl Fn(T) -> Result<(), ListenerFault> + 'static,
    ) {
        self.add_observer(label, move || receiver(provider()));
    }

    /// Number of registered listeners.
    pub fn observer_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Read access to the state. Never notifies.
    pub fn peek<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Apply a mutation, then notify every listener in registration order.
    ///
    /// The mutation effect always completes before the first listener runs,
    /// and the state borrow is released first, so listeners are free to read
    /// (or mutate) this observable again.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut S) -> R) -> (R, CascadeReport) {
        let out = {
            let mut state = self.state.borrow_mut();
            f(&mut state)
        };
        (out, self.notify_all())
    }

    /// Apply a mutation without notifying anyone, for state that must stay
    /// invisible to listeners (seeding a value before wiring completes).
    pub fn mutate_silent<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    fn notify_all(&self) -> CascadeReport {
        let mut report = CascadeReport::default();

        if self.notifying.get() {
            // An outer cascade on this observable is still running; letting
            // this round proceed would recurse forever on cyclic wiring.
            warn!(observable = %self.name, "notification cycle refused");
            report.faults.push(ListenerFault::Cycle {
                observable: self.name.clone(),
            });
            return report;
        }
        self.notifying.set(true);

        // Index walk instead of an iterator: listeners may register further
        // observers mid-cascade, and the callback must run outside the
        // borrow of the listener list.
        let mut i = 0;
        loop {
            let (label, callback) = {
                let list = self.listeners.borrow();
                let Some(e) = list.get(i) else { break };
                (e.label.clone(), Rc::clone(&e.callback))
            };
            match callback() {
                Ok(()) => report.delivered += 1,
                Err(fault) => {
                    warn!(observable = %self.name, listener = %label, %fault, "listener fault");
                    report.faults.push(fault);
                }
            }
            i += 1;
        }

        self.notifying.set(false);
        debug!(
            observable = %self.name,
            delivered = report.delivered,
            faults = report.faults.len(),
            "cascade complete"
        );
        report
    }
}
