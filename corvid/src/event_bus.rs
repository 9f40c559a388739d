//! The in-process event bus (spec.md §4.6 "EventBus").
//!
//! Grounded outside the teacher: twilight's own shard is a `Stream` of
//! events, not a listener registry, so this is built on
//! `tower-resilience-core/src/events.rs`'s `EventListeners<E>` shape
//! (snapshot cloned under a short-held lock, panics caught per-listener and
//! isolated, panic noted via `tracing::warn!`), extended with named
//! registration (`on(kind, listener) -> ListenerId`), `once`, `off(id)`, and
//! a `max_listeners` soft cap that emits `MaxListenersExceeded` instead of
//! erroring.

use corvid_gateway::event::DispatchEvent;
use std::{
    any::Any,
    collections::HashMap,
    fmt::{self, Display, Formatter},
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};
use tracing::warn;

/// The identity of a registered listener, returned by [`EventBus::on`] and
/// [`EventBus::once`] so it can later be passed to [`EventBus::off`].
pub type ListenerId = u64;

/// The event kinds the bus dispatches, mirroring
/// [`DispatchEvent`]'s variants one-for-one, plus the two bus-internal
/// meta-events neither protocol engine raises on its own.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    Ready,
    Resumed,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    PresenceUpdate,
    VoiceStateUpdate,
    Unknown,
    /// Emitted when a listener panics and `capture_rejections` is set;
    /// emitting this with no listeners registered is fatal (spec.md §4.6).
    Error,
    /// Emitted instead of erroring when a kind's listener count passes
    /// `max_listeners`.
    MaxListenersExceeded,
}

impl EventKind {
    #[must_use]
    pub fn of(event: &DispatchEvent) -> Self {
        match event {
            DispatchEvent::Ready(_) => Self::Ready,
            DispatchEvent::Resumed => Self::Resumed,
            DispatchEvent::GuildCreate(_) => Self::GuildCreate,
            DispatchEvent::GuildUpdate(_) => Self::GuildUpdate,
            DispatchEvent::GuildDelete(_) => Self::GuildDelete,
            DispatchEvent::ChannelCreate(_) => Self::ChannelCreate,
            DispatchEvent::ChannelUpdate(_) => Self::ChannelUpdate,
            DispatchEvent::ChannelDelete(_) => Self::ChannelDelete,
            DispatchEvent::MessageCreate(_) => Self::MessageCreate,
            DispatchEvent::MessageUpdate(_) => Self::MessageUpdate,
            DispatchEvent::MessageDelete { .. } => Self::MessageDelete,
            DispatchEvent::PresenceUpdate(_) => Self::PresenceUpdate,
            DispatchEvent::VoiceStateUpdate(_) => Self::VoiceStateUpdate,
            DispatchEvent::Unknown { .. } => Self::Unknown,
        }
    }
}

/// What a listener is actually handed. An enum rather than Node's variadic
/// `...args` so every listener sees a typed payload regardless of which
/// `EventKind` it registered for.
pub enum Event<'a> {
    Dispatch(&'a DispatchEvent),
    Error(&'a (dyn std::error::Error + Send + Sync + 'static)),
    MaxListenersExceeded { kind: EventKind, limit: usize },
}

/// Raised as an [`Event::Error`] payload when `capture_rejections` is set
/// and a listener panics.
#[derive(Debug)]
pub struct ListenerPanic {
    pub kind: EventKind,
    pub message: String,
}

impl Display for ListenerPanic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "listener for {:?} panicked: {}", self.kind, self.message)
    }
}

impl std::error::Error for ListenerPanic {}

/// Tunables for an [`EventBus`].
#[derive(Clone, Copy, Debug)]
pub struct EventBusConfig {
    /// Soft cap per `EventKind`; exceeding it emits `MaxListenersExceeded`
    /// rather than rejecting the registration. Node's default is 10.
    pub max_listeners: usize,
    /// When true, a panicking listener is re-routed to an `error` emit
    /// instead of only being logged.
    pub capture_rejections: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_listeners: 10,
            capture_rejections: false,
        }
    }
}

#[derive(Clone)]
struct Registration {
    id: ListenerId,
    once: bool,
    listener: Arc<dyn Fn(&Event<'_>) + Send + Sync>,
}

/// In-process multi-listener dispatch with error isolation (spec.md §4.6).
///
/// The bus owns its listener lists; listeners hold no back-pointer to it.
pub struct EventBus {
    config: EventBusConfig,
    next_id: AtomicU64,
    listeners: Mutex<HashMap<EventKind, Vec<Registration>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    #[must_use]
    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a listener for `kind`, called on every emit until removed.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event<'_>) + Send + Sync + 'static,
    {
        self.register(kind, listener, false)
    }

    /// Registers a listener for `kind` that removes itself after firing once.
    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event<'_>) + Send + Sync + 'static,
    {
        self.register(kind, listener, true)
    }

    fn register<F>(&self, kind: EventKind, listener: F, once: bool) -> ListenerId
    where
        F: Fn(&Event<'_>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let exceeded = {
            let mut guard = self.listeners.lock().expect("event bus listeners poisoned");
            let bucket = guard.entry(kind).or_default();
            bucket.push(Registration {
                id,
                once,
                listener: Arc::new(listener),
            });
            bucket.len() > self.config.max_listeners
        };

        if exceeded {
            self.emit(
                EventKind::MaxListenersExceeded,
                &Event::MaxListenersExceeded {
                    kind,
                    limit: self.config.max_listeners,
                },
            );
        }

        id
    }

    /// Removes a previously registered listener by id, from whichever kind
    /// it was registered under. A no-op if `id` is unknown (already fired
    /// via `once`, or already removed).
    pub fn off(&self, id: ListenerId) {
        let mut guard = self.listeners.lock().expect("event bus listeners poisoned");
        for bucket in guard.values_mut() {
            bucket.retain(|registration| registration.id != id);
        }
    }

    /// Demultiplexes a gateway dispatch to `EventKind::of(event)` listeners.
    pub fn emit_dispatch(&self, event: &DispatchEvent) {
        self.emit(EventKind::of(event), &Event::Dispatch(event));
    }

    /// Calls every listener registered for `kind`, in insertion order, on a
    /// snapshot taken before the first call (mutations mid-emit — an `off`
    /// from inside a listener, say — never affect the current dispatch).
    ///
    /// Emitting `Error` with no listeners registered is fatal: it panics,
    /// since there is no process to exit in a library.
    pub fn emit(&self, kind: EventKind, event: &Event<'_>) {
        let snapshot = {
            let guard = self.listeners.lock().expect("event bus listeners poisoned");
            guard.get(&kind).cloned().unwrap_or_default()
        };

        if snapshot.is_empty() {
            if matches!(kind, EventKind::Error) {
                panic!("corvid: 'error' event emitted with no listeners registered");
            }
            return;
        }

        let mut fired_once = Vec::new();
        for registration in &snapshot {
            let listener = Arc::clone(&registration.listener);
            if let Err(panic_payload) = catch_unwind(AssertUnwindSafe(|| listener(event))) {
                self.handle_listener_panic(kind, registration.id, panic_payload.as_ref());
            }
            if registration.once {
                fired_once.push(registration.id);
            }
        }

        if !fired_once.is_empty() {
            let mut guard = self.listeners.lock().expect("event bus listeners poisoned");
            if let Some(bucket) = guard.get_mut(&kind) {
                bucket.retain(|registration| !fired_once.contains(&registration.id));
            }
        }
    }

    fn handle_listener_panic(&self, kind: EventKind, listener_id: ListenerId, payload: &(dyn Any + Send)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        if self.config.capture_rejections {
            let error = ListenerPanic { kind, message };
            self.emit(EventKind::Error, &Event::Error(&error));
        } else {
            warn!(?kind, listener_id, panic_message = %message, "event bus listener panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn ready_event() -> DispatchEvent {
        DispatchEvent::Resumed
    }

    #[test]
    fn listeners_fire_in_insertion_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let a = Arc::clone(&order);
        bus.on(EventKind::Resumed, move |_| a.lock().unwrap().push(1));
        let b = Arc::clone(&order);
        bus.on(EventKind::Resumed, move |_| b.lock().unwrap().push(2));

        bus.emit_dispatch(&ready_event());

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        bus.once(EventKind::Resumed, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit_dispatch(&ready_event());
        bus.emit_dispatch(&ready_event());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_removes_a_listener_by_id() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let id = bus.on(EventKind::Resumed, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.off(id);
        bus.emit_dispatch(&ready_event());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exceeding_max_listeners_emits_a_meta_event_not_an_error() {
        let bus = EventBus::with_config(EventBusConfig {
            max_listeners: 1,
            capture_rejections: false,
        });
        let exceeded = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&exceeded);
        bus.on(EventKind::MaxListenersExceeded, move |event| {
            if matches!(event, Event::MaxListenersExceeded { .. }) {
                e.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.on(EventKind::Resumed, |_| {});
        bus.on(EventKind::Resumed, |_| {});

        assert_eq!(exceeded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn a_panicking_listener_does_not_stop_the_rest() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        bus.on(EventKind::Resumed, |_| panic!("boom"));
        let c = Arc::clone(&calls);
        bus.on(EventKind::Resumed, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit_dispatch(&ready_event());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn capture_rejections_reroutes_panics_to_the_error_kind() {
        let bus = EventBus::with_config(EventBusConfig {
            max_listeners: 10,
            capture_rejections: true,
        });
        let errors = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&errors);
        bus.on(EventKind::Error, move |event| {
            if matches!(event, Event::Error(_)) {
                e.fetch_add(1, Ordering::SeqCst);
            }
        });
        bus.on(EventKind::Resumed, |_| panic!("boom"));

        bus.emit_dispatch(&ready_event());

        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "'error' event emitted with no listeners")]
    fn error_with_no_listeners_is_fatal() {
        let bus = EventBus::new();
        let error = ListenerPanic {
            kind: EventKind::Resumed,
            message: "boom".to_owned(),
        };
        bus.emit(EventKind::Error, &Event::Error(&error));
    }

    #[test]
    fn bus_is_send_and_sync() {
        static_assertions::assert_impl_all!(EventBus: Send, Sync);
    }
}
