//! Single ordered message channel between producers and the run loop.
//!
//! Input polling, timers and user threads hold a [`Bus`] and block in
//! [`Bus::send`] while the queue is at capacity. The run loop owns the only
//! [`Mailbox`]. Code running on the run loop itself (hooks, structural
//! handlers) must use [`Bus::post`], which never blocks: the loop is the
//! consumer, so waiting for space there would never end. Both append to the
//! same queue, so delivery order is enqueue order.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::error::{Error, Result};
use crate::message::Message;

/// Default queue depth.
pub const BUS_CAPACITY: usize = 10;

/// Backpressure for blocking senders. The flag is set once the mailbox is
/// closed or dropped.
#[derive(Default)]
struct Gate {
    closed: Mutex<bool>,
    space: Condvar,
}

#[derive(Clone)]
pub struct Bus {
    queue: Sender<Message>,
    capacity: usize,
    gate: Arc<Gate>,
}

pub struct Mailbox {
    queue: Receiver<Message>,
    gate: Arc<Gate>,
}

/// Bus with the default depth.
pub fn channel() -> (Bus, Mailbox) {
    bounded(BUS_CAPACITY)
}

pub fn bounded(capacity: usize) -> (Bus, Mailbox) {
    let (tx, rx) = channel::unbounded();
    let gate = Arc::new(Gate::default());
    (
        Bus {
            queue: tx,
            capacity: capacity.max(1),
            gate: gate.clone(),
        },
        Mailbox { queue: rx, gate },
    )
}

impl Bus {
    /// Enqueues `msg`, blocking while the queue holds `capacity` messages.
    pub fn send(&self, msg: Message) -> Result<()> {
        let mut closed = self.gate.closed.lock();
        while !*closed && self.queue.len() >= self.capacity {
            self.gate.space.wait(&mut closed);
        }
        if *closed {
            return Err(Error::BusClosed);
        }
        self.queue.send(msg).map_err(|_| Error::BusClosed)
    }

    /// Enqueues `msg` without blocking. For use on the run loop thread only.
    ///
    /// The message goes to the tail of the same queue as [`Bus::send`], and
    /// may take it past capacity.
    pub fn post(&self, msg: Message) {
        if self.queue.len() >= self.capacity {
            trace!(target = %msg.target, kind = ?msg.kind, "bus full, posting past capacity");
        }
        if let Err(err) = self.queue.send(msg) {
            trace!(target = %err.0.target, kind = ?err.0.kind, "post after mailbox dropped");
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Mailbox {
    /// Blocks until a message is available. `None` once every [`Bus`] is gone.
    pub fn receive(&self) -> Option<Message> {
        self.taken(self.queue.recv().ok())
    }

    pub fn try_receive(&self) -> Option<Message> {
        self.taken(self.queue.try_recv().ok())
    }

    pub fn receive_timeout(&self, timeout: Duration) -> Option<Message> {
        match self.queue.recv_timeout(timeout) {
            Ok(msg) => self.taken(Some(msg)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Fails every blocked and future [`Bus::send`].
    pub fn close(&self) {
        *self.gate.closed.lock() = true;
        self.gate.space.notify_all();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn taken(&self, msg: Option<Message>) -> Option<Message> {
        if msg.is_some() {
            let _closed = self.gate.closed.lock();
            self.gate.space.notify_all();
        }
        msg
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Handle, MessageKind};
    use std::thread;

    fn kinds(mailbox: &Mailbox) -> Vec<MessageKind> {
        std::iter::from_fn(|| mailbox.try_receive())
            .map(|msg| msg.kind)
            .collect()
    }

    #[test]
    fn messages_arrive_in_send_order() {
        let (bus, mailbox) = channel();
        let target = Handle::new();
        bus.send(Message::draw(target)).unwrap();
        bus.send(Message::quit()).unwrap();
        bus.send(Message::empty()).unwrap();

        assert_eq!(
            kinds(&mailbox),
            vec![MessageKind::Draw, MessageKind::Quit, MessageKind::Null]
        );
    }

    #[test]
    fn send_blocks_until_space_is_available() {
        let (bus, mailbox) = bounded(2);
        bus.send(Message::empty()).unwrap();
        bus.send(Message::empty()).unwrap();

        let producer = {
            let bus = bus.clone();
            thread::spawn(move || bus.send(Message::quit()))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());
        assert_eq!(mailbox.len(), 2);

        assert_eq!(mailbox.receive().map(|m| m.kind), Some(MessageKind::Null));
        producer.join().unwrap().unwrap();
        assert_eq!(mailbox.receive().map(|m| m.kind), Some(MessageKind::Null));
        assert_eq!(mailbox.receive().map(|m| m.kind), Some(MessageKind::Quit));
    }

    #[test]
    fn post_never_blocks_and_keeps_global_order() {
        let (bus, mailbox) = bounded(2);
        bus.send(Message::empty()).unwrap();
        bus.send(Message::quit()).unwrap();
        bus.post(Message::draw(Handle::APPLICATION));
        bus.post(Message::empty());
        assert_eq!(mailbox.len(), 4);

        assert_eq!(
            kinds(&mailbox),
            vec![
                MessageKind::Null,
                MessageKind::Quit,
                MessageKind::Draw,
                MessageKind::Null
            ]
        );
    }

    #[test]
    fn send_waits_for_posts_over_capacity_to_drain() {
        let (bus, mailbox) = bounded(1);
        bus.post(Message::empty());
        bus.post(Message::empty());

        let producer = {
            let bus = bus.clone();
            thread::spawn(move || bus.send(Message::quit()))
        };
        assert!(mailbox.receive().is_some());
        thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());

        assert!(mailbox.receive().is_some());
        producer.join().unwrap().unwrap();
        assert_eq!(mailbox.receive().map(|m| m.kind), Some(MessageKind::Quit));
    }

    #[test]
    fn send_fails_once_mailbox_is_dropped() {
        let (bus, mailbox) = channel();
        drop(mailbox);
        assert!(matches!(bus.send(Message::empty()), Err(Error::BusClosed)));
    }

    #[test]
    fn closing_releases_blocked_senders() {
        let (bus, mailbox) = bounded(1);
        bus.send(Message::empty()).unwrap();
        let producer = {
            let bus = bus.clone();
            thread::spawn(move || bus.send(Message::quit()))
        };
        thread::sleep(Duration::from_millis(20));
        mailbox.close();
        assert!(matches!(producer.join().unwrap(), Err(Error::BusClosed)));
    }

    #[test]
    fn receive_timeout_returns_none_when_idle() {
        let (_bus, mailbox) = channel();
        assert!(mailbox.receive_timeout(Duration::from_millis(10)).is_none());
    }
}
