//! Event bus between sessions and the consumer
//!
//! Four one-directional queues, one per event kind. Sessions hold a cloned
//! [`BusSender`]; a single consumer owns the [`BusReceiver`].
//!
//! The message queue is bounded: when the consumer falls behind, sessions
//! block on send, which in turn stops them reading their sockets. The
//! other three queues carry a handful of events per connection and are
//! unbounded.
//!
//! Every event is stamped from one counter shared by all senders, so
//! [`BusReceiver::next_event`] can hand out the four queues merged in
//! send order: a label that disconnects and reconnects is seen as
//! Subscribe, Unsubscribe, Subscribe, never with the second Subscribe
//! overtaking the Unsubscribe.

use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::error::MuxError;

/// One line read from a beam
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub label: Arc<str>,
    /// Line content without the trailing newline
    pub data: Bytes,
}

/// Any bus event, for consumers that prefer a single stream
#[derive(Debug)]
pub enum Event {
    Message(MessageEvent),
    Error(MuxError),
    /// A beam completed its handshake under this label
    Subscribe(String),
    /// The beam with this label reached end of stream
    Unsubscribe(String),
}

/// Queue item carrying its place in the global send order
#[derive(Debug)]
struct Stamped<T> {
    seq: u64,
    item: T,
}

/// Constructor for a connected sender/receiver pair
pub struct EventBus;

impl EventBus {
    /// Create the bus with a message queue of `message_capacity` (minimum 1)
    pub fn new(message_capacity: usize) -> (BusSender, BusReceiver) {
        let (messages_tx, messages_rx) = mpsc::channel(message_capacity.max(1));
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let (subscribes_tx, subscribes_rx) = mpsc::unbounded_channel();
        let (unsubscribes_tx, unsubscribes_rx) = mpsc::unbounded_channel();

        let sender = BusSender {
            seq: Arc::new(AtomicU64::new(0)),
            messages: messages_tx,
            errors: errors_tx,
            subscribes: subscribes_tx,
            unsubscribes: unsubscribes_tx,
        };
        let receiver = BusReceiver {
            messages: messages_rx,
            errors: errors_rx,
            subscribes: subscribes_rx,
            unsubscribes: unsubscribes_rx,
            pending_message: None,
            pending_error: None,
            pending_subscribe: None,
            pending_unsubscribe: None,
        };
        (sender, receiver)
    }
}

/// Producer side, cloned into every session
#[derive(Debug, Clone)]
pub struct BusSender {
    seq: Arc<AtomicU64>,
    messages: mpsc::Sender<Stamped<MessageEvent>>,
    errors: mpsc::UnboundedSender<Stamped<MuxError>>,
    subscribes: mpsc::UnboundedSender<Stamped<String>>,
    unsubscribes: mpsc::UnboundedSender<Stamped<String>>,
}

impl BusSender {
    fn stamp<T>(&self, item: T) -> Stamped<T> {
        Stamped {
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            item,
        }
    }

    /// Send a message, waiting while the queue is full
    ///
    /// Returns false once the consumer is gone.
    pub async fn message(&self, label: Arc<str>, data: Bytes) -> bool {
        self.messages
            .send(self.stamp(MessageEvent { label, data }))
            .await
            .is_ok()
    }

    pub fn error(&self, error: MuxError) {
        if let Err(e) = self.errors.send(self.stamp(error)) {
            log::warn!("Error stream closed, dropping: {}", e.0.item);
        }
    }

    pub fn subscribe(&self, label: &str) {
        if self.subscribes.send(self.stamp(label.to_string())).is_err() {
            log::warn!("Subscribe stream closed, dropping '{}'", label);
        }
    }

    pub fn unsubscribe(&self, label: &str) {
        if self.unsubscribes.send(self.stamp(label.to_string())).is_err() {
            log::warn!("Unsubscribe stream closed, dropping '{}'", label);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Lane {
    Subscribe,
    Message,
    Error,
    Unsubscribe,
}

/// Consumer side
///
/// The four queues can be drained one kind at a time through the
/// `recv_*` methods, or together in send order through
/// [`BusReceiver::next_event`].
#[derive(Debug)]
pub struct BusReceiver {
    messages: mpsc::Receiver<Stamped<MessageEvent>>,
    errors: mpsc::UnboundedReceiver<Stamped<MuxError>>,
    subscribes: mpsc::UnboundedReceiver<Stamped<String>>,
    unsubscribes: mpsc::UnboundedReceiver<Stamped<String>>,
    // head of each queue, taken off while merging
    pending_message: Option<Stamped<MessageEvent>>,
    pending_error: Option<Stamped<MuxError>>,
    pending_subscribe: Option<Stamped<String>>,
    pending_unsubscribe: Option<Stamped<String>>,
}

impl BusReceiver {
    pub async fn recv_message(&mut self) -> Option<MessageEvent> {
        match self.pending_message.take() {
            Some(head) => Some(head.item),
            None => self.messages.recv().await.map(|m| m.item),
        }
    }

    pub async fn recv_error(&mut self) -> Option<MuxError> {
        match self.pending_error.take() {
            Some(head) => Some(head.item),
            None => self.errors.recv().await.map(|e| e.item),
        }
    }

    pub async fn recv_subscribe(&mut self) -> Option<String> {
        match self.pending_subscribe.take() {
            Some(head) => Some(head.item),
            None => self.subscribes.recv().await.map(|s| s.item),
        }
    }

    pub async fn recv_unsubscribe(&mut self) -> Option<String> {
        match self.pending_unsubscribe.take() {
            Some(head) => Some(head.item),
            None => self.unsubscribes.recv().await.map(|u| u.item),
        }
    }

    /// Next event from any queue, oldest first; `None` once every sender
    /// is gone and the queues are drained
    ///
    /// Only queue heads are compared. A message stuck behind a full queue
    /// has not reached its head yet, but then it was sent by a session
    /// that has not emitted anything after it either.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            self.fill_heads();
            if let Some(event) = self.take_oldest() {
                return Some(event);
            }

            tokio::select! {
                Some(s) = self.subscribes.recv() => self.pending_subscribe = Some(s),
                Some(m) = self.messages.recv() => self.pending_message = Some(m),
                Some(e) = self.errors.recv() => self.pending_error = Some(e),
                Some(u) = self.unsubscribes.recv() => self.pending_unsubscribe = Some(u),
                else => return None,
            }
        }
    }

    fn fill_heads(&mut self) {
        if self.pending_subscribe.is_none() {
            self.pending_subscribe = self.subscribes.try_recv().ok();
        }
        if self.pending_message.is_none() {
            self.pending_message = self.messages.try_recv().ok();
        }
        if self.pending_error.is_none() {
            self.pending_error = self.errors.try_recv().ok();
        }
        if self.pending_unsubscribe.is_none() {
            self.pending_unsubscribe = self.unsubscribes.try_recv().ok();
        }
    }

    fn take_oldest(&mut self) -> Option<Event> {
        let heads = [
            (Lane::Subscribe, self.pending_subscribe.as_ref().map(|h| h.seq)),
            (Lane::Message, self.pending_message.as_ref().map(|h| h.seq)),
            (Lane::Error, self.pending_error.as_ref().map(|h| h.seq)),
            (Lane::Unsubscribe, self.pending_unsubscribe.as_ref().map(|h| h.seq)),
        ];
        let (lane, _) = heads
            .into_iter()
            .filter_map(|(lane, seq)| seq.map(|seq| (lane, seq)))
            .min_by_key(|(_, seq)| *seq)?;

        match lane {
            Lane::Subscribe => self.pending_subscribe.take().map(|h| Event::Subscribe(h.item)),
            Lane::Message => self.pending_message.take().map(|h| Event::Message(h.item)),
            Lane::Error => self.pending_error.take().map(|h| Event::Error(h.item)),
            Lane::Unsubscribe => self.pending_unsubscribe.take().map(|h| Event::Unsubscribe(h.item)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandshakeError;

    #[tokio::test]
    async fn test_message_order_within_kind() {
        let (sender, mut receiver) = EventBus::new(8);
        let label: Arc<str> = Arc::from("svc");
        for i in 0..5 {
            assert!(sender.message(Arc::clone(&label), Bytes::from(format!("line {}", i))).await);
        }
        for i in 0..5 {
            let event = receiver.recv_message().await.unwrap();
            assert_eq!(event.data, Bytes::from(format!("line {}", i)));
        }
    }

    #[tokio::test]
    async fn test_next_event_lifecycle_order() {
        let (sender, mut receiver) = EventBus::new(8);
        sender.subscribe("svc");
        assert!(sender.message(Arc::from("svc"), Bytes::from_static(b"hello")).await);
        sender.unsubscribe("svc");
        sender.error(MuxError::Handshake {
            peer: "p".to_string(),
            source: HandshakeError::MissingLabel,
        });
        drop(sender);

        assert!(matches!(receiver.next_event().await, Some(Event::Subscribe(l)) if l == "svc"));
        assert!(matches!(receiver.next_event().await, Some(Event::Message(m)) if m.data == "hello"));
        assert!(matches!(receiver.next_event().await, Some(Event::Unsubscribe(l)) if l == "svc"));
        assert!(matches!(receiver.next_event().await, Some(Event::Error(_))));
        assert!(receiver.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_next_event_reconnect_keeps_order() {
        let (sender, mut receiver) = EventBus::new(8);
        sender.subscribe("svc");
        assert!(sender.message(Arc::from("svc"), Bytes::from_static(b"one")).await);
        sender.unsubscribe("svc");
        sender.subscribe("svc");
        drop(sender);

        let mut kinds = Vec::new();
        while let Some(event) = receiver.next_event().await {
            kinds.push(match event {
                Event::Subscribe(_) => "subscribe",
                Event::Message(_) => "message",
                Event::Error(_) => "error",
                Event::Unsubscribe(_) => "unsubscribe",
            });
        }
        assert_eq!(kinds, vec!["subscribe", "message", "unsubscribe", "subscribe"]);
    }

    #[tokio::test]
    async fn test_error_not_held_back_by_messages() {
        let (sender, mut receiver) = EventBus::new(32);
        sender.error(MuxError::Handshake {
            peer: "p".to_string(),
            source: HandshakeError::Closed,
        });
        for i in 0..10 {
            assert!(sender.message(Arc::from("svc"), Bytes::from(format!("m{}", i))).await);
        }

        assert!(matches!(receiver.next_event().await, Some(Event::Error(_))));
        assert!(matches!(receiver.next_event().await, Some(Event::Message(m)) if m.data == "m0"));
    }

    #[tokio::test]
    async fn test_next_event_waits_for_late_sender() {
        let (sender, mut receiver) = EventBus::new(4);
        let late = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            sender.unsubscribe("svc");
        });

        assert!(matches!(receiver.next_event().await, Some(Event::Unsubscribe(l)) if l == "svc"));
        late.await.unwrap();
        assert!(receiver.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_kind_receivers_after_merge() {
        let (sender, mut receiver) = EventBus::new(4);
        sender.subscribe("a");
        sender.unsubscribe("a");
        assert!(sender.message(Arc::from("a"), Bytes::from_static(b"x")).await);

        // heads pulled in by next_event are not lost to the kind receivers
        assert!(matches!(receiver.next_event().await, Some(Event::Subscribe(_))));
        assert_eq!(receiver.recv_message().await.unwrap().data, "x");
        assert_eq!(receiver.recv_unsubscribe().await.unwrap(), "a");
    }

    #[tokio::test]
    async fn test_message_fails_without_consumer() {
        let (sender, receiver) = EventBus::new(1);
        drop(receiver);
        assert!(!sender.message(Arc::from("svc"), Bytes::new()).await);
        // low-volume streams only log
        sender.subscribe("svc");
    }

    #[tokio::test]
    async fn test_full_queue_blocks_sender() {
        let (sender, mut receiver) = EventBus::new(1);
        assert!(sender.message(Arc::from("svc"), Bytes::from_static(b"1")).await);

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            sender.message(Arc::from("svc"), Bytes::from_static(b"2")),
        )
        .await;
        assert!(blocked.is_err());

        assert_eq!(receiver.recv_message().await.unwrap().data, "1");
        assert!(sender.message(Arc::from("svc"), Bytes::from_static(b"3")).await);
    }
}
