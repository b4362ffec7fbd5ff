//! Appliance event subscription.
//!
//! One subscription per client. The reader connects to the event feed with
//! the session token current at connect time, splits the body on the record
//! separator and pushes decoded events into a bounded queue. A full queue
//! drops the newest event; the reader never blocks on the consumer.
//!
//! Disconnects are retried with jittered exponential backoff capped at the
//! configured ceiling. Only cancellation, or dropping the subscription,
//! ends the loop.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::ACCEPT;
use secrecy::ExposeSecret;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::backoff::{next_backoff, sleep_or_cancel};
use crate::client::{ClientInner, SafeguardClient};
use crate::endpoints::send_checked;
use crate::error::{ClientError, Result};
use crate::models::{Event, FRAME_CLOSE, FRAME_INVOCATION, FRAME_PING, Frame};

/// Separator between records on the feed.
pub(crate) const RECORD_SEPARATOR: u8 = 0x1E;

/// Largest record accepted before the connection is dropped.
const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Receiving end of an event subscription.
///
/// Dropping it stops the reader task.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: mpsc::Receiver<Event>,
    handle: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl EventSubscription {
    /// Next event, or `None` once the reader has stopped and the queue is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Stop the reader. Queued events can still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the reader and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Clears the "subscription active" flag when the reader exits.
struct ActiveGuard(Arc<ClientInner>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.events_active.store(false, Ordering::SeqCst);
    }
}

/// Why one connection ended.
enum StreamEnd {
    /// Connected, then the appliance closed or the stream failed.
    Disconnected,
    /// The subscription was dropped.
    ConsumerGone,
}

impl SafeguardClient {
    /// Start the event subscription.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SubscriptionActive`] when a subscription is
    /// already running on this client.
    pub fn subscribe_events(&self, cancel: &CancellationToken) -> Result<EventSubscription> {
        if self.inner.events_active.swap(true, Ordering::SeqCst) {
            return Err(ClientError::SubscriptionActive);
        }
        let guard = ActiveGuard(Arc::clone(&self.inner));

        let (sender, receiver) = mpsc::channel(self.inner.settings.event_queue_capacity);
        let cancel = cancel.child_token();
        let client = self.clone();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            client.run_event_stream(sender, task_cancel).await;
        });

        Ok(EventSubscription {
            receiver,
            handle: Some(handle),
            cancel,
        })
    }

    #[instrument(skip_all, name = "event_stream")]
    async fn run_event_stream(&self, sender: mpsc::Sender<Event>, cancel: CancellationToken) {
        let initial = self.inner.settings.event_backoff_initial;
        let max = self.inner.settings.event_backoff_max;
        let mut backoff = initial;

        loop {
            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.read_event_stream(&sender) => outcome,
            };

            let delay = match outcome {
                Ok(StreamEnd::ConsumerGone) => {
                    debug!("Event consumer dropped");
                    break;
                }
                Ok(StreamEnd::Disconnected) => {
                    backoff = initial;
                    initial
                }
                Err(e) => {
                    let delay = backoff;
                    backoff = next_backoff(backoff, max);
                    warn!(error = %e, retry_in_ms = delay_ms(delay), "Event stream connection failed");
                    delay
                }
            };

            if let Some(metrics) = self.metrics() {
                metrics.record_event_reconnect();
            }
            if sleep_or_cancel(&cancel, delay).await {
                break;
            }
        }
        debug!("Event stream stopped");
    }

    /// One connection: connect, then read frames until the stream ends.
    async fn read_event_stream(&self, sender: &mpsc::Sender<Event>) -> Result<StreamEnd> {
        let appliance = self.appliance_url()?;
        let token = self
            .inner
            .session
            .session_token()
            .ok_or(ClientError::SessionExpired)?;
        let url = format!("{appliance}/service/event/signalr");

        let http = self.inner.http_settings.build_streaming()?;
        let builder = http
            .get(&url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, "application/json");
        let response = send_checked(builder).await?;
        info!(%url, "Event stream connected");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let codec = AnyDelimiterCodec::new_with_max_length(
            vec![RECORD_SEPARATOR],
            vec![RECORD_SEPARATOR],
            MAX_FRAME_LEN,
        );
        let mut frames = pin!(FramedRead::new(StreamReader::new(body), codec));

        while let Some(record) = frames.next().await {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Event stream read failed");
                    return Ok(StreamEnd::Disconnected);
                }
            };
            if record.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let frame: Frame = match serde_json::from_slice(&record) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, len = record.len(), "Ignoring malformed event frame");
                    continue;
                }
            };

            match frame.kind {
                FRAME_PING => {}
                FRAME_CLOSE => {
                    info!("Event stream closed by appliance");
                    return Ok(StreamEnd::Disconnected);
                }
                FRAME_INVOCATION => {
                    for argument in frame.arguments {
                        let event = match serde_json::from_value::<Event>(argument) {
                            Ok(event) => event,
                            Err(e) => {
                                warn!(error = %e, target = ?frame.target, "Ignoring undecodable event");
                                continue;
                            }
                        };
                        if !self.deliver(sender, event) {
                            return Ok(StreamEnd::ConsumerGone);
                        }
                    }
                }
                other => debug!(kind = other, "Ignoring event frame"),
            }
        }

        info!("Event stream ended");
        Ok(StreamEnd::Disconnected)
    }

    /// Queue one event. Returns false once the consumer is gone.
    fn deliver(&self, sender: &mpsc::Sender<Event>, event: Event) -> bool {
        match sender.try_send(event) {
            Ok(()) => {
                if let Some(metrics) = self.metrics() {
                    metrics.record_event_received();
                }
                true
            }
            Err(TrySendError::Full(event)) => {
                warn!(event = %event.name, "Event queue full; dropping newest event");
                if let Some(metrics) = self.metrics() {
                    metrics.record_event_dropped();
                }
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn delay_ms(delay: Duration) -> u64 {
    delay.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SafeguardClient {
        SafeguardClient::builder()
            .appliance_url("https://sg.example.com")
            .event_queue_capacity(1)
            .build()
            .unwrap()
    }

    fn event(name: &str) -> Event {
        Event {
            name: name.to_string(),
            time: None,
            payload: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_newest() {
        let client = client();
        let (sender, mut receiver) = mpsc::channel(1);

        assert!(client.deliver(&sender, event("first")));
        assert!(client.deliver(&sender, event("second")));

        assert_eq!(receiver.recv().await.unwrap().name, "first");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_queue_stops_delivery() {
        let client = client();
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        assert!(!client.deliver(&sender, event("late")));
    }

    #[tokio::test]
    async fn test_single_subscription() {
        let client = client();
        let cancel = CancellationToken::new();

        let first = client.subscribe_events(&cancel).unwrap();
        assert!(matches!(
            client.subscribe_events(&cancel),
            Err(ClientError::SubscriptionActive)
        ));

        first.shutdown().await;
        let second = client.subscribe_events(&cancel).unwrap();
        second.shutdown().await;
    }
}
