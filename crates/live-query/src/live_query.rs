//! The live query handle and its delivery loops.

use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use futures_util::{Stream, StreamExt};
use indexmap::IndexMap;
use serde_json::Value;
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    throttle::{Offer, Throttle},
    transport::{TransportClient, TransportError, TransportResult},
    LiveQueryConfig,
};

/// Terminal failure of a live query, forwarded as the last stream item.
#[derive(Debug, thiserror::Error)]
pub enum LiveQueryError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Where a live query is in its lifecycle.
///
/// `Completed`, `Errored` and `Cancelled` are terminal: once reached, the
/// state never changes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveQueryState {
    Idle,
    Active,
    Completed,
    Errored,
    Cancelled,
}

impl LiveQueryState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LiveQueryState::Completed | LiveQueryState::Errored | LiveQueryState::Cancelled
        )
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => LiveQueryState::Idle,
            1 => LiveQueryState::Active,
            2 => LiveQueryState::Completed,
            3 => LiveQueryState::Errored,
            _ => LiveQueryState::Cancelled,
        }
    }
}

/// A compiled subscription document plus the names used to unwrap its
/// payloads.
#[derive(Clone, Debug)]
pub struct SubscriptionQuery {
    pub query: String,
    pub variables: IndexMap<String, Value>,
    pub field_name: String,
    pub collection: String,
}

impl SubscriptionQuery {
    pub fn new(
        compiled: &graphql_query_builder::CompiledQuery,
        collection: impl Into<String>,
    ) -> Self {
        SubscriptionQuery {
            query: compiled.query.clone(),
            variables: compiled.variables.clone(),
            field_name: compiled.field_name.clone(),
            collection: collection.into(),
        }
    }

    fn variables_value(&self) -> Value {
        Value::Object(self.variables.clone().into_iter().collect())
    }
}

struct Shared {
    state: AtomicU8,
    cancellation: CancellationToken,
}

impl Shared {
    fn new() -> Self {
        Shared {
            state: AtomicU8::new(LiveQueryState::Idle as u8),
            cancellation: CancellationToken::new(),
        }
    }

    fn state(&self) -> LiveQueryState {
        LiveQueryState::from_raw(self.state.load(Ordering::SeqCst))
    }

    /// Moves to `next` unless a terminal state was reached first.
    fn transition(&self, next: LiveQueryState) -> bool {
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            if LiveQueryState::from_raw(current).is_terminal() {
                return false;
            }
            match self.state.compare_exchange(
                current,
                next as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// A running live query.
///
/// Consume it as a [`Stream`] of results. The delivery task runs until the
/// upstream ends, a transport error is forwarded, or the handle is
/// cancelled; dropping the handle cancels it too.
pub struct LiveQuery {
    receiver: mpsc::UnboundedReceiver<Result<Value, LiveQueryError>>,
    shared: Arc<Shared>,
}

impl LiveQuery {
    /// Spawns the delivery task for `query` and returns the consumer
    /// handle. Must be called from within a tokio runtime.
    pub fn start(
        transport: TransportClient,
        query: SubscriptionQuery,
        config: LiveQueryConfig,
    ) -> LiveQuery {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new());

        let worker = Worker {
            transport,
            query,
            config,
            sender,
            shared: shared.clone(),
        };
        tokio::spawn(worker.run());

        LiveQuery { receiver, shared }
    }

    pub fn state(&self) -> LiveQueryState {
        self.shared.state()
    }

    /// Stops delivery. Idempotent and final: no item is yielded after this
    /// returns, whatever the delivery task was doing.
    pub fn cancel(&self) {
        if self.shared.transition(LiveQueryState::Cancelled) {
            tracing::debug!("live query cancelled");
        }
        self.shared.cancellation.cancel();
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Stream for LiveQuery {
    type Item = Result<Value, LiveQueryError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.shared.state() == LiveQueryState::Cancelled {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}

enum Outcome {
    Completed,
    Errored,
    /// The consumer dropped the receiving side; nothing left to record.
    Detached,
}

/// One step of the push loop: either the throttle deadline fired or the
/// upstream produced something.
enum Step {
    Flush(Instant),
    Event(Option<TransportResult<Value>>),
}

struct Worker {
    transport: TransportClient,
    query: SubscriptionQuery,
    config: LiveQueryConfig,
    sender: mpsc::UnboundedSender<Result<Value, LiveQueryError>>,
    shared: Arc<Shared>,
}

impl Worker {
    async fn run(self) {
        if !self.shared.transition(LiveQueryState::Active) {
            return;
        }
        let push = self.config.push_enabled && self.transport.supports_push();
        tracing::debug!(field_name = %self.query.field_name, push, "live query started");

        let cancellation = self.shared.cancellation.clone();
        let outcome = tokio::select! {
            outcome = self.deliver(push) => outcome,
            () = cancellation.cancelled() => return,
        };
        let state = match outcome {
            Outcome::Completed => LiveQueryState::Completed,
            Outcome::Errored => LiveQueryState::Errored,
            Outcome::Detached => return,
        };
        self.shared.transition(state);
    }

    async fn deliver(&self, push: bool) -> Outcome {
        if push {
            self.push_loop().await
        } else {
            self.poll_loop().await
        }
    }

    /// Subscribes to the transport's live stream and throttles deliveries
    /// to one per window, trailing edge included.
    async fn push_loop(&self) -> Outcome {
        let mut stream = match self
            .transport
            .open(&self.query.query, self.query.variables_value())
            .await
        {
            Ok(stream) => stream,
            Err(error) => {
                self.forward(Err(error.into()));
                return Outcome::Errored;
            }
        };

        let mut throttle = Throttle::new(self.config.min_delivery_interval);
        loop {
            let step = match throttle.deadline() {
                Some(deadline) => tokio::select! {
                    () = tokio::time::sleep_until(deadline) => Step::Flush(deadline),
                    event = stream.next() => Step::Event(event),
                },
                None => Step::Event(stream.next().await),
            };

            match step {
                Step::Flush(deadline) => {
                    if let Some(value) = throttle.flush(deadline) {
                        if !self.forward(Ok(value)) {
                            return Outcome::Detached;
                        }
                    }
                }
                Step::Event(Some(Ok(payload))) => {
                    let value = extract_payload(
                        payload,
                        &self.query.field_name,
                        &self.query.collection,
                    );
                    if let Offer::Deliver(value) = throttle.offer(value, Instant::now()) {
                        if !self.forward(Ok(value)) {
                            return Outcome::Detached;
                        }
                    }
                }
                Step::Event(Some(Err(error))) => {
                    self.forward(Err(error.into()));
                    return Outcome::Errored;
                }
                Step::Event(None) => {
                    // The upstream ended; whatever is still pending goes
                    // out ahead of its deadline rather than getting lost.
                    if let Some(value) = throttle.take_pending() {
                        if !self.forward(Ok(value)) {
                            return Outcome::Detached;
                        }
                    }
                    return Outcome::Completed;
                }
            }
        }
    }

    /// Re-runs the document on a fixed cadence, delivering only results
    /// that differ from the last delivered one.
    async fn poll_loop(&self) -> Outcome {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_delivered: Option<Value> = None;

        loop {
            interval.tick().await;
            match self
                .transport
                .execute(&self.query.query, self.query.variables_value())
                .await
            {
                Ok(payload) => {
                    let value = extract_payload(
                        payload,
                        &self.query.field_name,
                        &self.query.collection,
                    );
                    if last_delivered.as_ref() == Some(&value) {
                        continue;
                    }
                    if !self.forward(Ok(value.clone())) {
                        return Outcome::Detached;
                    }
                    last_delivered = Some(value);
                }
                Err(error) => {
                    self.forward(Err(error.into()));
                    return Outcome::Errored;
                }
            }
        }
    }

    /// Sends one item to the consumer; a dead receiver stops the loops.
    fn forward(&self, item: Result<Value, LiveQueryError>) -> bool {
        self.sender.send(item).is_ok()
    }
}

/// Unwraps a transport payload to the value consumers care about.
///
/// A `data` envelope is peeled first. Aggregate payloads then pass through
/// whole; anything else is unwrapped by the resolved field name, falling
/// back to the bare collection name, and by-pk shapes coerce a list
/// payload to its first element.
fn extract_payload(mut payload: Value, field_name: &str, collection: &str) -> Value {
    if let Some(data) = payload.get_mut("data") {
        payload = data.take();
    }
    if field_name.ends_with("_aggregate") {
        return payload;
    }
    let value = match payload.get_mut(field_name) {
        Some(value) => value.take(),
        None => match payload.get_mut(collection) {
            Some(value) => value.take(),
            None => payload,
        },
    };
    match value {
        Value::Array(mut items) if field_name.ends_with("_by_pk") => {
            if items.is_empty() {
                Value::Null
            } else {
                items.swap_remove(0)
            }
        }
        value => value,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unwraps_by_field_name_through_the_data_envelope() {
        let payload = json!({ "data": { "widgets": [{ "id": 1 }] } });
        assert_eq!(
            extract_payload(payload, "widgets", "widgets"),
            json!([{ "id": 1 }])
        );
    }

    #[test]
    fn aggregate_payloads_pass_through_whole() {
        let payload = json!({ "widgets_aggregate": { "aggregate": { "count": 3 } } });
        assert_eq!(
            extract_payload(payload.clone(), "widgets_aggregate", "widgets"),
            payload
        );
    }

    #[test]
    fn falls_back_to_the_collection_name() {
        let payload = json!({ "widgets": [{ "id": 1 }] });
        assert_eq!(
            extract_payload(payload, "widgets_special", "widgets"),
            json!([{ "id": 1 }])
        );
    }

    #[test]
    fn by_pk_payloads_coerce_a_list_to_its_first_element() {
        let payload = json!({ "widgets_by_pk": [{ "id": 1 }, { "id": 2 }] });
        assert_eq!(
            extract_payload(payload, "widgets_by_pk", "widgets"),
            json!({ "id": 1 })
        );
        let empty = json!({ "widgets_by_pk": [] });
        assert_eq!(extract_payload(empty, "widgets_by_pk", "widgets"), json!(null));
    }

    #[test]
    fn unmatched_payloads_pass_through_whole() {
        let payload = json!({ "something_else": 1 });
        assert_eq!(
            extract_payload(payload.clone(), "widgets", "gadgets"),
            payload
        );
    }

    #[test]
    fn a_subscription_query_copies_the_compiled_parts() {
        let compiled = graphql_query_builder::CompiledQuery {
            query: "subscription SubscriptionWidgets {\n  widgets {\n    id\n  }\n}\n".to_string(),
            variables: IndexMap::new(),
            field_name: "widgets".to_string(),
            next_var_counter: 0,
            diagnostics: Vec::new(),
        };
        let query = SubscriptionQuery::new(&compiled, "widgets");
        assert_eq!(query.field_name, "widgets");
        assert_eq!(query.collection, "widgets");
        assert_eq!(query.variables_value(), json!({}));
    }
}
