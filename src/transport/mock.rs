//! In-memory socket for adapter tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{sleep, timeout};

use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::{EventKind, Incoming, Listener, MessageEvent, Socket, SocketEvent};

/// Subscription mechanism a listener was attached with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Style {
    Emitter,
    EventTarget,
}

/// A socket driven entirely by the test.
#[derive(Default)]
pub(crate) struct MockSocket {
    url: Option<String>,
    listeners: Mutex<Vec<(EventKind, Style, Listener)>>,
    sent: Mutex<Vec<String>>,
    fail_sends: bool,
    closed: AtomicBool,
}

impl MockSocket {
    /// A client socket with a peer URL.
    pub(crate) fn client() -> Arc<Self> {
        Arc::new(Self {
            url: Some("ws://mock.test/".to_string()),
            ..Default::default()
        })
    }

    /// A listening socket without a peer URL.
    pub(crate) fn server() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A client socket whose sends always fail.
    pub(crate) fn broken() -> Arc<Self> {
        Arc::new(Self {
            url: Some("ws://mock.test/".to_string()),
            fail_sends: true,
            ..Default::default()
        })
    }

    /// Fires an event at every listener of its kind.
    pub(crate) fn fire(&self, event: SocketEvent) {
        let kind = event.kind();
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&event);
        }
    }

    pub(crate) fn open(&self) {
        self.fire(SocketEvent::Open);
    }

    /// Delivers a frame as a raw payload.
    pub(crate) fn receive(&self, frame: &str) {
        self.fire(SocketEvent::Message(Incoming::Payload(frame.to_string())));
    }

    /// Delivers a frame wrapped in a message event.
    pub(crate) fn receive_event(&self, frame: &str) {
        self.fire(SocketEvent::Message(Incoming::Event(MessageEvent {
            data: frame.to_string(),
        })));
    }

    /// Announces an accepted peer.
    pub(crate) fn accept(&self, peer: Arc<MockSocket>) {
        self.fire(SocketEvent::Connection(peer));
    }

    /// Marks the socket closed.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Returns the styles used for subscriptions of `kind`.
    pub(crate) fn styles(&self, kind: EventKind) -> Vec<Style> {
        self.listeners
            .lock()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, style, _)| *style)
            .collect()
    }
}

impl Socket for MockSocket {
    fn url(&self) -> Option<String> {
        self.url.clone()
    }

    fn send(&self, frame: &str) -> Result<()> {
        if self.fail_sends {
            return Err(Error::ConnectionClosed);
        }
        self.sent.lock().push(frame.to_string());
        Ok(())
    }

    fn on(&self, kind: EventKind, listener: Listener) {
        self.listeners.lock().push((kind, Style::Emitter, listener));
    }

    fn add_event_listener(&self, kind: EventKind, listener: Listener) {
        self.listeners
            .lock()
            .push((kind, Style::EventTarget, listener));
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Polls until `socket` reports closed, failing after five seconds.
pub(crate) async fn wait_until_closed(socket: &dyn Socket) {
    timeout(Duration::from_secs(5), async {
        while !socket.is_closed() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("socket should close");
}
