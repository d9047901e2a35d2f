//! Ordered, single-subscriber publish point
//!
//! Hook changes travel on their own unbounded channel so they can never sit
//! behind a backlog of dialed numbers, and publishing never blocks the
//! sampler thread.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::PhoneEvent;

/// Create a dispatcher and its single subscription
pub fn channel(dial_capacity: usize) -> (Dispatcher, Subscription) {
    let (hook_tx, hook_rx) = mpsc::unbounded_channel();
    let (dial_tx, dial_rx) = mpsc::channel(dial_capacity);
    (
        Dispatcher { hook_tx, dial_tx },
        Subscription { hook_rx, dial_rx },
    )
}

/// Sending half, owned by the sampler thread
pub struct Dispatcher {
    hook_tx: mpsc::UnboundedSender<bool>,
    dial_tx: mpsc::Sender<u32>,
}

impl Dispatcher {
    /// Publish an event without blocking
    pub fn publish(&self, event: PhoneEvent) {
        debug!(%event, "publishing event");
        match event {
            PhoneEvent::HookChanged { lifted } => {
                if self.hook_tx.send(lifted).is_err() {
                    debug!("hook subscriber gone");
                }
            }
            PhoneEvent::NumberDialed { number } => match self.dial_tx.try_send(number) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(number)) => {
                    warn!(number, "dial queue full, number dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("dial subscriber gone");
                }
            },
        }
    }

    /// True once the subscriber has been dropped
    pub fn is_closed(&self) -> bool {
        self.hook_tx.is_closed()
    }
}

/// Receiving half, owned by the session controller
pub struct Subscription {
    hook_rx: mpsc::UnboundedReceiver<bool>,
    dial_rx: mpsc::Receiver<u32>,
}

impl Subscription {
    /// Next event, hook changes first
    pub async fn recv(&mut self) -> Option<PhoneEvent> {
        tokio::select! {
            biased;
            Some(lifted) = self.hook_rx.recv() => Some(PhoneEvent::HookChanged { lifted }),
            Some(number) = self.dial_rx.recv() => Some(PhoneEvent::NumberDialed { number }),
            else => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_fifo_within_kind() {
        let (tx, mut rx) = channel(8);
        tx.publish(PhoneEvent::NumberDialed { number: 9 });
        tx.publish(PhoneEvent::NumberDialed { number: 666 });
        drop(tx);

        assert_eq!(rx.recv().await, Some(PhoneEvent::NumberDialed { number: 9 }));
        assert_eq!(rx.recv().await, Some(PhoneEvent::NumberDialed { number: 666 }));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_hook_changes_jump_the_dial_backlog() {
        let (tx, mut rx) = channel(8);
        tx.publish(PhoneEvent::NumberDialed { number: 1966 });
        tx.publish(PhoneEvent::HookChanged { lifted: false });

        assert_eq!(rx.recv().await, Some(PhoneEvent::HookChanged { lifted: false }));
        assert_eq!(rx.recv().await, Some(PhoneEvent::NumberDialed { number: 1966 }));
    }

    #[test]
    fn test_full_queue_never_blocks() {
        let (tx, mut rx) = channel(1);
        tx.publish(PhoneEvent::NumberDialed { number: 1 });
        tx.publish(PhoneEvent::NumberDialed { number: 2 });
        // Hook path is unbounded
        for _ in 0..100 {
            tx.publish(PhoneEvent::HookChanged { lifted: true });
        }
        assert_eq!(assert_ok!(rx.dial_rx.try_recv()), 1);
        assert!(rx.dial_rx.try_recv().is_err());
        assert_ok!(rx.hook_rx.try_recv());
    }

    #[test]
    fn test_closed_after_subscriber_drop() {
        let (tx, rx) = channel(1);
        assert!(!tx.is_closed());
        drop(rx);
        assert!(tx.is_closed());
        // Publishing into a closed channel is silent
        tx.publish(PhoneEvent::NumberDialed { number: 3 });
    }
}
