//! The Corvid client core (spec.md §1 "Purpose & Scope"): wires
//! [`corvid_http`]'s REST dispatch engine, [`corvid_gateway`]'s Gateway
//! session engine, and [`corvid_cache_inmemory`]'s cache behind a single
//! [`EventBus`].

mod client;
mod event_bus;

pub use client::Corvid;
pub use event_bus::{Event, EventBus, EventBusConfig, EventKind, ListenerId, ListenerPanic};

pub use corvid_cache_inmemory as cache;
pub use corvid_gateway as gateway;
pub use corvid_http as http;
pub use corvid_model as model;
