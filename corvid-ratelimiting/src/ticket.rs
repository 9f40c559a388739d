//! Ticket handshake between a [`super::Ratelimiter`] and its caller.
//!
//! 1. The caller asks for a ticket and receives a [`TicketReceiver`].
//! 2. The ratelimiter holds a [`TicketNotifier`] until the request may be
//!    sent, then calls [`TicketNotifier::available`].
//! 3. The caller performs the HTTP request and sends the response's
//!    [`RatelimitHeaders`] (or `None`, on transport failure) back along the
//!    returned [`TicketSender`], completing the cycle described in
//!    spec.md §4.1 "Response-driven update".

use crate::headers::RatelimitHeaders;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot::{self, error::RecvError, Receiver, Sender};

/// Resolves once the ticket holder has sent back the response's headers.
#[derive(Debug)]
pub struct TicketHeaders(Receiver<Option<RatelimitHeaders>>);

impl Future for TicketHeaders {
    type Output = Result<Option<RatelimitHeaders>, RecvError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

/// Held by the ratelimiter; signals the caller that their ticket is ready.
#[derive(Debug)]
pub struct TicketNotifier(Sender<Sender<Option<RatelimitHeaders>>>);

impl TicketNotifier {
    /// Grant the ticket. Returns `None` if the caller already dropped their
    /// [`TicketReceiver`] (the request was cancelled) — a cancelled ticket
    /// does not consume a bucket token, per spec.md §5.
    #[must_use]
    pub fn available(self) -> Option<TicketHeaders> {
        let (tx, rx) = oneshot::channel();
        self.0.send(tx).ok()?;

        Some(TicketHeaders(rx))
    }
}

/// Held by the caller while waiting for a ticket to become available.
#[derive(Debug)]
pub struct TicketReceiver(Receiver<Sender<Option<RatelimitHeaders>>>);

impl Future for TicketReceiver {
    type Output = Result<TicketSender, RecvError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map_ok(TicketSender)
    }
}

/// Held by the caller after their ticket is granted; used to report back
/// the response's rate-limit headers.
#[derive(Debug)]
pub struct TicketSender(Sender<Option<RatelimitHeaders>>);

impl TicketSender {
    /// Send the headers observed from the response (or `None` if the
    /// request failed before any headers were read).
    ///
    /// # Errors
    ///
    /// Returns the headers back if the ratelimiter already dropped its
    /// receiving half.
    pub fn headers(
        self,
        headers: Option<RatelimitHeaders>,
    ) -> Result<(), Option<RatelimitHeaders>> {
        self.0.send(headers)
    }
}

/// Create a new ticket channel: the notifier half for the ratelimiter, the
/// receiver half for the caller.
#[must_use]
pub fn channel() -> (TicketNotifier, TicketReceiver) {
    let (tx, rx) = oneshot::channel();

    (TicketNotifier(tx), TicketReceiver(rx))
}
