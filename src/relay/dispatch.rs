//! Callback invocation and delivery accounting
//!
//! The relay never calls a subscriber's callback directly. It goes through an
//! [`Invoker`], which lets an embedding environment decide how a payload reaches
//! the subscriber (e.g. marshalling into another runtime).

use std::panic::{self, AssertUnwindSafe};

use crate::buffer::Payload;
use crate::channel::Dispatch;
use crate::error::RelayError;
use crate::subscriber::SubscriberDescriptor;

/// Capability to hand a payload to a subscriber
///
/// Called from blocking-pool threads, possibly for several subscribers at once.
/// Implementations must not hold on to the payload reference past the call;
/// clone the payload to keep it.
pub trait Invoker: Send + Sync + 'static {
    /// Deliver `payload` to `subscriber`
    fn invoke(&self, subscriber: &SubscriberDescriptor, payload: &Payload);
}

/// Invoker that calls each subscriber's own callback
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackInvoker;

impl Invoker for CallbackInvoker {
    fn invoke(&self, subscriber: &SubscriberDescriptor, payload: &Payload) {
        subscriber.invoke(payload);
    }
}

/// Result of delivering to a single subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Delivered,
    /// Callback panicked
    Failed,
    /// Payload was gone before delivery
    Evicted,
}

/// Summary of one notify pass over a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers registered when the notify started
    pub subscribers: usize,
    /// Callbacks that ran to completion
    pub delivered: usize,
    /// Callbacks that panicked
    pub failed: usize,
    /// Deliveries skipped because the payload had been overwritten
    pub evicted: usize,
    /// True when delivery was handed to a background task and the counts
    /// above (other than `subscribers`) are not yet known
    pub detached: bool,
}

impl DeliveryReport {
    pub(crate) fn pending(subscribers: usize) -> Self {
        Self {
            subscribers,
            detached: true,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Delivered => self.delivered += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Evicted => self.evicted += 1,
        }
    }

    /// Check if every subscriber received the payload
    pub fn is_complete(&self) -> bool {
        !self.detached && self.delivered == self.subscribers
    }
}

/// Deliver to one subscriber, containing any panic from the callback
pub(crate) fn deliver_one<I: Invoker + ?Sized>(
    invoker: &I,
    channel: &str,
    subscriber: &SubscriberDescriptor,
    payload: Result<&Payload, &RelayError>,
) -> Outcome {
    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(
                channel = %channel,
                id = %subscriber.id(),
                error = %e,
                "Payload evicted before delivery"
            );
            return Outcome::Evicted;
        }
    };

    match panic::catch_unwind(AssertUnwindSafe(|| invoker.invoke(subscriber, payload))) {
        Ok(()) => Outcome::Delivered,
        Err(_) => {
            tracing::warn!(
                channel = %channel,
                id = %subscriber.id(),
                "Subscriber callback panicked"
            );
            Outcome::Failed
        }
    }
}

/// Deliver to every subscriber of a prepared dispatch, in order
pub(crate) fn deliver_all<I: Invoker + ?Sized>(
    invoker: &I,
    channel: &str,
    dispatch: &Dispatch,
) -> DeliveryReport {
    let mut report = DeliveryReport {
        subscribers: dispatch.len(),
        ..DeliveryReport::default()
    };

    dispatch.run(|subscriber, payload| {
        report.record(deliver_one(invoker, channel, subscriber, payload));
    });

    report
}
