//! Relay implementation
//!
//! Ties the channel registry to a dispatch policy and an [`Invoker`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::buffer::{Handle, Payload};
use crate::channel::{Channel, ChannelRegistry, ChannelStats, Dispatch};
use crate::error::{RelayError, Result};
use crate::subscriber::{Callback, SubscriberDescriptor, SubscriberId};

use super::config::{DispatchPolicy, RelayConfig};
use super::dispatch::{deliver_all, deliver_one, CallbackInvoker, DeliveryReport, Invoker, Outcome};

/// In-process publish/subscribe relay
///
/// Channels are created on first use by either [`publish`](Self::publish) or
/// [`subscribe`](Self::subscribe). All methods take `&self`; share the relay
/// across tasks with an `Arc`.
///
/// # Example
/// ```no_run
/// use msg_relay::{Payload, Relay};
///
/// # async fn example() {
/// let relay = Relay::new();
///
/// let id = relay
///     .subscribe("wind", |payload: &Payload| {
///         println!("wind: {} bytes", payload.size());
///     })
///     .await;
///
/// relay.publish("wind", Payload::from_static(b"270,12.5")).await;
/// relay.unsubscribe("wind", &id).await;
/// # }
/// ```
pub struct Relay<I: Invoker = CallbackInvoker> {
    config: RelayConfig,
    registry: ChannelRegistry,
    invoker: Arc<I>,
    next_subscriber_id: AtomicU64,
    callback_limit: Option<Arc<Semaphore>>,
}

impl Relay<CallbackInvoker> {
    /// Create a relay with default configuration
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a relay with custom configuration
    pub fn with_config(config: RelayConfig) -> Self {
        Self::with_invoker(config, CallbackInvoker)
    }
}

impl Default for Relay<CallbackInvoker> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Invoker> Relay<I> {
    /// Create a relay that delivers through a custom invoker
    pub fn with_invoker(config: RelayConfig, invoker: I) -> Self {
        let callback_limit = if config.max_concurrent_callbacks > 0 {
            Some(Arc::new(Semaphore::new(config.max_concurrent_callbacks)))
        } else {
            None
        };

        Self {
            registry: ChannelRegistry::build(config.buffer_capacity),
            config,
            invoker: Arc::new(invoker),
            next_subscriber_id: AtomicU64::new(1),
            callback_limit,
        }
    }

    /// Get the relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the channel registry
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Look up a channel without creating it
    pub async fn channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.registry.get(name).await
    }

    /// Get total number of channels
    pub async fn channel_count(&self) -> usize {
        self.registry.len().await
    }

    /// Names of all channels, in sorted order
    pub async fn channel_names(&self) -> Vec<String> {
        self.registry.names().await
    }

    /// Get channel statistics
    pub async fn stats(&self, name: &str) -> Option<ChannelStats> {
        match self.registry.get(name).await {
            Some(channel) => Some(channel.stats().await),
            None => None,
        }
    }

    /// Subscribe a closure to a channel
    ///
    /// Creates the channel if needed and returns the new subscriber's id, of the
    /// form `"{channel}_{n}"`.
    pub async fn subscribe<F>(&self, channel_name: &str, callback: F) -> SubscriberId
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.subscribe_callback(channel_name, Arc::new(callback)).await
    }

    /// Subscribe an already shared callback to a channel
    ///
    /// If the channel is removed from the registry while the subscriber is being
    /// added, the subscriber moves to the channel that replaces it.
    pub async fn subscribe_callback(&self, channel_name: &str, callback: Callback) -> SubscriberId {
        loop {
            let channel = self.registry.get_or_create(channel_name).await;
            let id = self.add_subscriber(&channel, channel_name, &callback).await;

            let current = self.registry.get(channel_name).await;
            if current.is_some_and(|current| Arc::ptr_eq(&current, &channel)) {
                tracing::debug!(
                    channel = %channel_name,
                    id = %id,
                    subscribers = channel.subscriber_count(),
                    "Subscriber added"
                );
                return id;
            }

            channel.unsubscribe(&id).await;
            tracing::debug!(channel = %channel_name, id = %id, "Channel replaced, resubscribing");
        }
    }

    /// Register `callback` on `channel` under the next free generated id
    async fn add_subscriber(
        &self,
        channel: &Channel,
        channel_name: &str,
        callback: &Callback,
    ) -> SubscriberId {
        loop {
            let n = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
            let id = SubscriberId::new(format!("{}_{}", channel_name, n));
            let descriptor = SubscriberDescriptor::with_callback(id.clone(), Arc::clone(callback));

            // Only an id registered directly on the channel can collide; skip past it
            if channel.try_subscribe(descriptor).await.is_ok() {
                return id;
            }
        }
    }

    /// Remove a subscriber from a channel
    ///
    /// Returns `None` if the channel or the subscriber does not exist.
    pub async fn unsubscribe(
        &self,
        channel_name: &str,
        id: &SubscriberId,
    ) -> Option<SubscriberDescriptor> {
        let channel = self.registry.get(channel_name).await?;
        let removed = channel.unsubscribe(id).await;

        if removed.is_some() {
            tracing::debug!(
                channel = %channel_name,
                id = %id,
                subscribers = channel.subscriber_count(),
                "Subscriber removed"
            );
        }

        removed
    }

    /// Store a payload and notify the channel's subscribers
    ///
    /// Creates the channel if needed. The payload is stored before any callback
    /// runs; whether this waits for the callbacks depends on the dispatch policy.
    pub async fn publish(&self, channel_name: &str, payload: impl Into<Payload>) -> Handle {
        self.publish_with_report(channel_name, payload).await.0
    }

    /// Like [`publish`](Self::publish), also returning the delivery report
    pub async fn publish_with_report(
        &self,
        channel_name: &str,
        payload: impl Into<Payload>,
    ) -> (Handle, DeliveryReport) {
        let channel = self.registry.get_or_create(channel_name).await;
        let payload = payload.into();
        let size = payload.size();

        let handle = channel.publish(payload).await;

        tracing::debug!(
            channel = %channel_name,
            handle = %handle,
            size = size,
            "Payload stored"
        );

        let report = self.notify_channel(&channel, handle).await;
        (handle, report)
    }

    /// Deliver the payload behind `handle` to every subscriber of a channel
    ///
    /// A payload that was overwritten before delivery is skipped (and counted
    /// as evicted) rather than treated as an error. Unknown channels yield an
    /// empty report.
    pub async fn notify(&self, channel_name: &str, handle: Handle) -> DeliveryReport {
        match self.registry.get(channel_name).await {
            Some(channel) => self.notify_channel(&channel, handle).await,
            None => DeliveryReport::default(),
        }
    }

    /// Retrieve a payload still retained by a channel
    ///
    /// A handle into a channel that no longer exists is reported as evicted.
    pub async fn fetch(&self, channel_name: &str, handle: Handle) -> Result<Payload> {
        match self.registry.get(channel_name).await {
            Some(channel) => channel.fetch(handle).await,
            None => Err(RelayError::Evicted {
                slot: handle.slot_index(),
                generation: handle.generation(),
            }),
        }
    }

    /// Tear down every channel
    ///
    /// Subscribers are dropped, buffers are emptied (so all outstanding handles
    /// become stale), and the registry is left empty. Returns the number of
    /// channels removed.
    pub async fn shutdown(&self) -> usize {
        let channels = self.registry.drain().await;

        for channel in &channels {
            channel.clear().await;
        }

        tracing::info!(channels = channels.len(), "Relay shut down");

        channels.len()
    }

    async fn notify_channel(&self, channel: &Arc<Channel>, handle: Handle) -> DeliveryReport {
        let dispatch = channel.prepare_dispatch(handle).await;

        if dispatch.is_empty() {
            return DeliveryReport::default();
        }

        let name = channel.name().to_owned();

        let report = match self.config.dispatch_policy {
            DispatchPolicy::Synchronous => self.run_sequential(name.clone(), dispatch).await,
            DispatchPolicy::Parallel => self.run_parallel(&name, &dispatch).await,
            DispatchPolicy::FireAndForget => {
                let pending = DeliveryReport::pending(dispatch.len());
                self.run_detached(name.clone(), dispatch);
                pending
            }
        };

        tracing::debug!(
            channel = %name,
            handle = %handle,
            subscribers = report.subscribers,
            delivered = report.delivered,
            failed = report.failed,
            evicted = report.evicted,
            detached = report.detached,
            "Dispatch finished"
        );

        report
    }

    /// All callbacks on one blocking thread, in order, joined before return
    async fn run_sequential(&self, name: String, dispatch: Dispatch) -> DeliveryReport {
        let subscribers = dispatch.len();
        let invoker = Arc::clone(&self.invoker);

        match tokio::task::spawn_blocking(move || deliver_all(&*invoker, &name, &dispatch)).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Dispatch task failed");
                DeliveryReport {
                    subscribers,
                    failed: subscribers,
                    ..DeliveryReport::default()
                }
            }
        }
    }

    /// One blocking task per subscriber, all joined before return
    async fn run_parallel(&self, name: &str, dispatch: &Dispatch) -> DeliveryReport {
        let mut report = DeliveryReport {
            subscribers: dispatch.len(),
            ..DeliveryReport::default()
        };

        let payload: Result<Payload> = dispatch.payload().cloned().map_err(Clone::clone);
        let mut tasks = JoinSet::new();

        for subscriber in dispatch.subscribers() {
            // Permits are taken in subscription order, so start order follows it
            // whenever the limit is reached
            let permit = match &self.callback_limit {
                Some(limit) => Arc::clone(limit).acquire_owned().await.ok(),
                None => None,
            };

            let invoker = Arc::clone(&self.invoker);
            let subscriber = subscriber.clone();
            let payload = payload.clone();
            let name = name.to_owned();

            tasks.spawn_blocking(move || {
                let _permit = permit;
                deliver_one(&*invoker, &name, &subscriber, payload.as_ref())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    tracing::warn!(channel = %name, error = %e, "Callback task failed");
                    report.record(Outcome::Failed);
                }
            }
        }

        report
    }

    /// Deliver in order on a detached blocking thread
    fn run_detached(&self, name: String, dispatch: Dispatch) {
        let invoker = Arc::clone(&self.invoker);

        tokio::task::spawn_blocking(move || {
            let report = deliver_all(&*invoker, &name, &dispatch);

            tracing::debug!(
                channel = %name,
                delivered = report.delivered,
                failed = report.failed,
                evicted = report.evicted,
                "Background dispatch finished"
            );
        });
    }
}

impl<I: Invoker> std::fmt::Debug for Relay<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
