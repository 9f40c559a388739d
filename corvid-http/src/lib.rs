//! The REST dispatch engine (spec.md §4.3 "RestEngine"): route-key
//! derivation, rate-limit bucket gating, a per-host circuit breaker, a
//! health-tracked connection pool, and response classification/retry.
//!
//! Grounded in the teacher's `twilight-http`, generalized the way
//! SPEC_FULL.md §4.3/§4.4 describe: compression decode, per-request
//! middleware, and an explicit inspectable [`pool::ConnectionPool`] in
//! front of what the teacher leaves to `hyper-util` internals.

pub mod client;
pub mod compression;
pub mod error;
pub mod middleware;
pub mod pool;
pub mod request;
pub mod response;

pub use client::{Auth, Client};
pub use error::{Error, ErrorContext, ErrorKind};
pub use middleware::{Middleware, MiddlewareStack};
pub use pool::{ConnectionPool, Lease, LoadBalancing, PoolConfig};
pub use request::{Request, RetryPolicy, Timeouts};
pub use response::Response;
