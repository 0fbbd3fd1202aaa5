//! Per-instance event registry and synchronous dispatcher
//!
//! Every [`Instance`] carries its own listener store: a map from event name
//! to an ordered sequence of callbacks. Registration appends; dispatch walks
//! the sequence in **reverse registration order** over the live sequence, so
//! listeners registered or removed mid-pass observe and affect the in-flight
//! iteration. That reverse order is a defining characteristic of this
//! dispatcher, not an implementation accident.
//!
//! Lifecycle events:
//!
//! - `newListener` fires synchronously after every registration, with the
//!   registered callback as its payload. A listener registered for
//!   `newListener` therefore observes its own registration.
//! - `removeListener` fires after a successful removal, with a one-element
//!   list containing the removed callback as its payload.
//!
//! Exceeding the per-instance `max_listeners` threshold (default 10, 0 to
//! disable) produces a non-fatal `tracing` warning and never interrupts
//! registration.
//!
//! A listener error propagates synchronously to the caller of [`emit`] and
//! aborts the remainder of that dispatch pass; nothing is caught internally.
//!
//! [`emit`]: Instance::emit

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{RuntimeError, RuntimeResult};
use crate::event::Event;
use crate::instance::Instance;
use crate::value::Value;

/// Default maximum number of listeners per event before the diagnostic
/// warning fires.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Event emitted after every listener registration.
pub const NEW_LISTENER: &str = "newListener";

/// Event emitted after every successful listener removal.
pub const REMOVE_LISTENER: &str = "removeListener";

type ListenerFn = dyn Fn(&Event, &[Value]) -> RuntimeResult<()> + Send + Sync;

/// A registered event callback
///
/// Listeners are compared by pointer identity: clones of the same listener
/// compare equal, two separately constructed listeners never do. Removal
/// operations rely on this, so keep a clone of the handle you registered if
/// you intend to remove it later.
#[derive(Clone)]
pub struct Listener(Arc<ListenerFn>);

impl Listener {
    /// Wrap a callback
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event, &[Value]) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Invoke the callback with a dispatch record and its extra arguments
    pub fn invoke(&self, event: &Event, args: &[Value]) -> RuntimeResult<()> {
        (self.0)(event, args)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").finish()
    }
}

/// Per-instance listener storage
pub(crate) struct Registry {
    events: Mutex<FxHashMap<String, Vec<Listener>>>,
    max_listeners: AtomicUsize,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            events: Mutex::new(FxHashMap::default()),
            max_listeners: AtomicUsize::new(DEFAULT_MAX_LISTENERS),
        }
    }
}

impl Instance {
    /// Append a listener to the sequence for `event`, creating the sequence
    /// if absent.
    ///
    /// Emits [`NEW_LISTENER`] synchronously with the registered callback as
    /// payload, then checks the live sequence length against the
    /// `max_listeners` threshold and logs a warning if it is exceeded.
    /// Errors raised by `newListener` listeners propagate.
    pub fn add_listener(&self, event: &str, listener: Listener) -> RuntimeResult<&Self> {
        let max = self.max_listeners();
        {
            let mut events = self.registry().events.lock();
            events.entry(event.to_string()).or_default().push(listener.clone());
        }
        self.emit(NEW_LISTENER, &[Value::Listener(listener)])?;
        if max > 0 {
            let count = self.listener_count(event);
            if count > max {
                tracing::warn!(
                    event,
                    count,
                    max,
                    "listener count exceeds max_listeners; raise it with set_max_listeners"
                );
            }
        }
        Ok(self)
    }

    /// Alias for [`add_listener`](Instance::add_listener)
    pub fn on(&self, event: &str, listener: Listener) -> RuntimeResult<&Self> {
        self.add_listener(event, listener)
    }

    /// Register a listener that fires at most once.
    ///
    /// The callback is wrapped; the wrapper invokes it and then removes
    /// itself from `event`, synchronously inside the same dispatch pass, so
    /// it never fires twice even under reentrant emission. Removal uses the
    /// wrapper's own identity: [`remove_listener`](Instance::remove_listener)
    /// with the original callback will not find it. If the callback fails,
    /// the error propagates before self-removal and the wrapper stays
    /// registered.
    pub fn once(&self, event: &str, listener: Listener) -> RuntimeResult<&Self> {
        let event_name: Arc<str> = Arc::from(event);
        let slot: Arc<OnceLock<Listener>> = Arc::new(OnceLock::new());
        let registered = Arc::clone(&slot);
        let wrapper = Listener::new(move |fired: &Event, args: &[Value]| {
            listener.invoke(fired, args)?;
            if let Some(me) = registered.get() {
                fired.target().remove_listener(&event_name, me)?;
            }
            Ok(())
        });
        let _ = slot.set(wrapper.clone());
        self.add_listener(event, wrapper)
    }

    /// Remove the last-registered occurrence of `listener` from `event`.
    ///
    /// Matching is by identity. On success, emits [`REMOVE_LISTENER`] with a
    /// one-element list containing the removed callback; if no occurrence is
    /// found this is a no-op.
    ///
    /// Caution: removal shifts sequence indices behind an in-flight dispatch
    /// pass.
    pub fn remove_listener(&self, event: &str, listener: &Listener) -> RuntimeResult<&Self> {
        let removed = {
            let mut events = self.registry().events.lock();
            events.get_mut(event).and_then(|sequence| {
                sequence
                    .iter()
                    .rposition(|registered| registered.ptr_eq(listener))
                    .map(|index| sequence.remove(index))
            })
        };
        if let Some(removed) = removed {
            self.emit(REMOVE_LISTENER, &[Value::List(vec![Value::Listener(removed)])])?;
        }
        Ok(self)
    }

    /// Alias for [`remove_listener`](Instance::remove_listener)
    pub fn off(&self, event: &str, listener: &Listener) -> RuntimeResult<&Self> {
        self.remove_listener(event, listener)
    }

    /// Drop listeners without emitting removal events.
    ///
    /// With `None`, the entire store is replaced with an empty map. With
    /// `Some(event)`, that event's stored sequence is cleared in place.
    pub fn remove_all_listeners(&self, event: Option<&str>) -> &Self {
        let mut events = self.registry().events.lock();
        match event {
            Some(event) => {
                if let Some(sequence) = events.get_mut(event) {
                    sequence.clear();
                }
            }
            None => *events = FxHashMap::default(),
        }
        self
    }

    /// Set the diagnostic listener-count threshold; 0 disables the check.
    pub fn set_max_listeners(&self, n: usize) -> &Self {
        self.registry().max_listeners.store(n, Ordering::Relaxed);
        self
    }

    /// Current diagnostic listener-count threshold
    pub fn max_listeners(&self) -> usize {
        self.registry().max_listeners.load(Ordering::Relaxed)
    }

    /// Live view of the listener sequence for `event`, created if absent.
    ///
    /// An empty event name is an `InvalidArgument` error. The guard borrows
    /// internal storage directly: mutations through it mutate registry
    /// state. Release it before registering, removing, or emitting on this
    /// instance, or those calls will deadlock.
    pub fn listeners(&self, event: &str) -> RuntimeResult<MappedMutexGuard<'_, Vec<Listener>>> {
        if event.is_empty() {
            return Err(RuntimeError::invalid_argument("an event name must be provided"));
        }
        let guard = self.registry().events.lock();
        Ok(MutexGuard::map(guard, |events| {
            events.entry(event.to_string()).or_default()
        }))
    }

    /// Number of listeners currently registered for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.registry()
            .events
            .lock()
            .get(event)
            .map_or(0, |sequence| sequence.len())
    }

    /// Names of all events with at least one registered listener
    pub fn event_names(&self) -> Vec<String> {
        self.registry()
            .events
            .lock()
            .iter()
            .filter(|(_, sequence)| !sequence.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Dispatch `event` to its registered listeners.
    ///
    /// Builds a fresh [`Event`] record, snapshots the sequence length, then
    /// walks indices from last to first, re-reading the live sequence at
    /// each step; entries vacated mid-pass are silently skipped. Each
    /// listener receives the record and `args`. A listener error propagates
    /// immediately, aborting the remainder of the pass.
    ///
    /// Returns `true` if the sequence was non-empty when the pass began.
    pub fn emit(&self, event: &str, args: &[Value]) -> RuntimeResult<bool> {
        let record = Event::new(event, self.clone());
        let count = self.listener_count(event);
        tracing::trace!(event, count, "dispatching");
        for index in (0..count).rev() {
            let listener = self
                .registry()
                .events
                .lock()
                .get(event)
                .and_then(|sequence| sequence.get(index))
                .cloned();
            if let Some(listener) = listener {
                listener.invoke(&record, args)?;
            }
        }
        Ok(count > 0)
    }

    /// Alias for [`emit`](Instance::emit)
    pub fn trigger(&self, event: &str, args: &[Value]) -> RuntimeResult<bool> {
        self.emit(event, args)
    }
}
