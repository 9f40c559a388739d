//! Per-request middleware overlay (spec.md §4.3 step 6: "Apply per-request
//! middleware in priority order").
//!
//! Grounded in the builder-pattern default-header application twilight-http
//! does in its client builder, generalized so individual requests can layer
//! extra behavior without changing the client's defaults.

use crate::request::Request;
use std::cmp::Ordering;

/// A single middleware entry: lower `order` runs earlier.
pub trait Middleware: Send + Sync {
    /// Mutate the outgoing request (e.g. add a header) before it is sent.
    fn apply(&self, request: &mut Request);

    /// Ascending sort key; lowest numeric value applied first, per
    /// spec.md §4.3 step 6.
    fn order(&self) -> i32 {
        0
    }
}

/// An ordered stack of [`Middleware`], applied earliest-first.
#[derive(Default)]
pub struct MiddlewareStack {
    entries: Vec<Box<dyn Middleware>>,
}

impl MiddlewareStack {
    pub fn push(&mut self, middleware: impl Middleware + 'static) {
        self.entries.push(Box::new(middleware));
        self.entries.sort_by(|a, b| {
            a.order().partial_cmp(&b.order()).unwrap_or(Ordering::Equal)
        });
    }

    pub fn apply_all(&self, request: &mut Request) {
        for middleware in &self.entries {
            middleware.apply(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderName, HeaderValue, Method};

    struct AddHeader(&'static str, &'static str, i32);

    impl Middleware for AddHeader {
        fn apply(&self, request: &mut Request) {
            request.headers.insert(
                HeaderName::from_static(self.0),
                HeaderValue::from_static(self.1),
            );
        }

        fn order(&self) -> i32 {
            self.2
        }
    }

    #[test]
    fn middleware_applies_in_ascending_order() {
        let mut stack = MiddlewareStack::default();
        stack.push(AddHeader("x-second", "2", 2));
        stack.push(AddHeader("x-first", "1", 1));

        let mut request = Request::new(Method::GET, "/users/@me");
        stack.apply_all(&mut request);

        assert_eq!(request.headers.get("x-first").unwrap(), "1");
        assert_eq!(request.headers.get("x-second").unwrap(), "2");
    }
}
