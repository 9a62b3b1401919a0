//! The one-shot channel interface and an in-process implementation.
//!
//! A [`Channel`] delivers a [`Message`] to the peer and hands back the
//! [`Replies`] for it. The peer side receives a [`ReplySender`] alongside
//! every message.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::message::Message;

/// One item on a reply stream.
pub type ReplyItem = Result<Value, TransportError>;

/// Page-side end of a request's reply stream.
#[derive(Debug)]
pub struct Replies {
    rx: mpsc::UnboundedReceiver<ReplyItem>,
}

impl Replies {
    /// Wait for the next reply. `None` once the peer has dropped its sender.
    pub async fn next(&mut self) -> Option<ReplyItem> {
        self.rx.recv().await
    }

    /// Wait for the single reply of an ordinary request.
    pub async fn first(mut self) -> Result<Value, TransportError> {
        match self.next().await {
            Some(item) => item,
            None => Err(TransportError::NoReply),
        }
    }
}

/// Peer-side end of a request's reply stream.
///
/// Cloning is allowed so a peer can keep answering callback invocations
/// after the original handler has returned.
#[derive(Debug, Clone)]
pub struct ReplySender {
    tx: mpsc::UnboundedSender<ReplyItem>,
}

impl ReplySender {
    /// Deliver a reply. Returns `false` if the page side has gone away.
    pub fn send(&self, reply: Value) -> bool {
        self.tx.send(Ok(reply)).is_ok()
    }

    /// Report a transport failure on this request.
    pub fn fail(&self, error: TransportError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// Check whether the page side stopped listening.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a connected reply sender/stream pair.
pub fn reply_pair() -> (ReplySender, Replies) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReplySender { tx }, Replies { rx })
}

/// A send-request/receive-reply transport to the peer.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn Channel>`.
pub trait Channel: Send + Sync {
    /// Send a request and return the stream its replies arrive on.
    fn send(&self, message: Message) -> Result<Replies, TransportError>;

    /// Send a message without waiting for any reply.
    fn post(&self, message: Message) -> Result<(), TransportError>;
}

impl<T: Channel + ?Sized> Channel for Arc<T> {
    fn send(&self, message: Message) -> Result<Replies, TransportError> {
        self.as_ref().send(message)
    }

    fn post(&self, message: Message) -> Result<(), TransportError> {
        self.as_ref().post(message)
    }
}

/// The privileged side of the channel.
#[async_trait]
pub trait Peer: Send + Sync + 'static {
    /// Handle one message. Replies go through `reply`; dropping every clone
    /// of it without replying closes the request.
    async fn handle(&self, message: Message, reply: ReplySender);
}

/// A [`Channel`] that delivers messages to a [`Peer`] in the same process.
///
/// Each message is handled on its own tokio task, so replies always arrive
/// asynchronously.
pub struct LoopbackChannel {
    peer: Arc<dyn Peer>,
    connected: AtomicBool,
}

impl LoopbackChannel {
    pub fn new(peer: Arc<dyn Peer>) -> Self {
        Self {
            peer,
            connected: AtomicBool::new(true),
        }
    }

    /// Make every later send fail with [`TransportError::Disconnected`].
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn deliver(&self, message: Message, reply: ReplySender) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let peer = Arc::clone(&self.peer);
        tracing::trace!(action = message.action(), "delivering message to peer");
        runtime.spawn(async move {
            peer.handle(message, reply).await;
        });
        Ok(())
    }
}

impl Channel for LoopbackChannel {
    fn send(&self, message: Message) -> Result<Replies, TransportError> {
        let (reply, replies) = reply_pair();
        self.deliver(message, reply)?;
        Ok(replies)
    }

    fn post(&self, message: Message) -> Result<(), TransportError> {
        let (reply, _replies) = reply_pair();
        self.deliver(message, reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoPeer;

    #[async_trait]
    impl Peer for EchoPeer {
        async fn handle(&self, message: Message, reply: ReplySender) {
            if let Message::Log { value } = message {
                reply.send(json!({ "result": value }));
            }
        }
    }

    #[tokio::test]
    async fn loopback_round_trip() {
        let channel = LoopbackChannel::new(Arc::new(EchoPeer));
        let replies = channel
            .send(Message::Log {
                value: json!("ping"),
            })
            .unwrap();
        assert_eq!(replies.first().await.unwrap(), json!({"result": "ping"}));
    }

    #[tokio::test]
    async fn dropped_reply_is_no_reply() {
        let channel = LoopbackChannel::new(Arc::new(EchoPeer));
        let replies = channel.send(Message::GetProperties).unwrap();
        assert_eq!(replies.first().await, Err(TransportError::NoReply));
    }

    #[tokio::test]
    async fn disconnected_channel_rejects_sends() {
        let channel = LoopbackChannel::new(Arc::new(EchoPeer));
        channel.disconnect();
        assert_eq!(
            channel.send(Message::GetProperties).unwrap_err(),
            TransportError::Disconnected
        );
        assert!(channel
            .post(Message::Log {
                value: Value::Null
            })
            .is_err());
    }

    #[test]
    fn send_without_runtime_fails() {
        let channel = LoopbackChannel::new(Arc::new(EchoPeer));
        assert_eq!(
            channel.send(Message::GetProperties).unwrap_err(),
            TransportError::NoRuntime
        );
    }

    #[tokio::test]
    async fn reply_sender_streams_many_replies() {
        let (sender, mut replies) = reply_pair();
        assert!(sender.send(json!(1)));
        assert!(sender.fail(TransportError::Disconnected));
        drop(sender);

        assert_eq!(replies.next().await, Some(Ok(json!(1))));
        assert_eq!(replies.next().await, Some(Err(TransportError::Disconnected)));
        assert_eq!(replies.next().await, None);
    }
}
