//! Interval timer component.
//!
//! A running timer is a task on smol's global executor that races the interval
//! against a cancellation token. Callbacks and bus sends run on smol's blocking
//! pool, so they execute concurrently with the run loop and must talk to the
//! tree through the [`Bus`].

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use smol::Task;
use smol::channel::{self, Sender};
use tracing::{debug, trace};

use crate::bus::Bus;
use crate::message::{Handle, Message};

/// Called on every tick. Returning `ControlFlow::Break` stops the timer.
pub type TimerCallback = Box<dyn FnMut(&Tick) -> ControlFlow<()> + Send>;

/// What a tick knows about its timer.
#[derive(Clone)]
pub struct Tick {
    pub timer: Handle,
    /// Parent captured when the timer started.
    pub parent: Option<Handle>,
    pub bus: Bus,
}

struct Running {
    cancel: Sender<()>,
    task: Task<()>,
}

pub struct Timer {
    interval: Duration,
    callback: Option<Arc<Mutex<TimerCallback>>>,
    running: Option<Running>,
}

impl Timer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            callback: None,
            running: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub(crate) fn set_callback(
        &mut self,
        callback: impl FnMut(&Tick) -> ControlFlow<()> + Send + 'static,
    ) {
        let callback: TimerCallback = Box::new(callback);
        self.callback = Some(Arc::new(Mutex::new(callback)));
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Whether the wait loop is alive. A callback that breaks ends it.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    pub(crate) fn start(&mut self, tick: Tick) {
        self.stop();
        debug!(timer = %tick.timer, interval = ?self.interval, "timer start");

        let (cancel, cancelled) = channel::bounded::<()>(1);
        let interval = self.interval;
        let callback = self.callback.clone();

        let task = smol::spawn(async move {
            loop {
                let fired = smol::future::or(
                    async {
                        smol::Timer::after(interval).await;
                        true
                    },
                    async {
                        // A closed token cancels as well.
                        let _ = cancelled.recv().await;
                        false
                    },
                )
                .await;
                if !fired {
                    break;
                }

                let flow = fire(&tick, callback.clone()).await;
                if flow.is_break() {
                    trace!(timer = %tick.timer, "timer stopped itself");
                    let bus = tick.bus.clone();
                    let disable = Message::enable(tick.timer, false);
                    if let Err(err) = smol::unblock(move || bus.send(disable)).await {
                        trace!(timer = %tick.timer, %err, "could not disable finished timer");
                    }
                    break;
                }
            }
        });

        self.running = Some(Running { cancel, task });
    }

    pub(crate) fn stop(&mut self) {
        if let Some(Running { cancel, task }) = self.running.take() {
            let _ = cancel.try_send(());
            task.detach();
            trace!("timer cancelled");
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn fire(tick: &Tick, callback: Option<Arc<Mutex<TimerCallback>>>) -> ControlFlow<()> {
    match callback {
        Some(callback) => {
            let tick = tick.clone();
            smol::unblock(move || {
                let mut callback = callback.lock();
                (*callback)(&tick)
            })
            .await
        }
        None => {
            let Some(parent) = tick.parent else {
                return ControlFlow::Continue(());
            };
            let bus = tick.bus.clone();
            match smol::unblock(move || bus.send(Message::timer(parent))).await {
                Ok(()) => ControlFlow::Continue(()),
                // Nobody is listening any more.
                Err(_) => ControlFlow::Break(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus;
    use crate::message::MessageKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PATIENCE: Duration = Duration::from_secs(5);

    #[test]
    fn ticks_post_timer_to_parent_without_callback() {
        let (bus, mailbox) = bus::channel();
        let parent = Handle::new();
        let mut timer = Timer::new(Duration::from_millis(5));
        timer.start(Tick {
            timer: Handle::new(),
            parent: Some(parent),
            bus,
        });

        let msg = mailbox.receive_timeout(PATIENCE).unwrap();
        assert_eq!(msg.kind, MessageKind::Timer);
        assert_eq!(msg.target, parent);
        assert!(timer.is_running());
        timer.stop();
        assert!(!timer.is_running());
    }

    #[test]
    fn breaking_callback_stops_and_disables() {
        let (bus, mailbox) = bus::channel();
        let handle = Handle::new();
        let count = Arc::new(AtomicUsize::new(0));
        let mut timer = Timer::new(Duration::from_millis(5));
        {
            let count = count.clone();
            timer.set_callback(move |_tick: &Tick| {
                if count.fetch_add(1, Ordering::SeqCst) == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });
        }
        timer.start(Tick {
            timer: handle,
            parent: None,
            bus,
        });

        let msg = mailbox.receive_timeout(PATIENCE).unwrap();
        assert_eq!(msg.kind, MessageKind::Enable);
        assert_eq!(msg.target, handle);
        assert_eq!(count.load(Ordering::SeqCst), 3);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!timer.is_running());
    }

    #[test]
    fn stopped_timer_never_fires() {
        let (bus, mailbox) = bus::channel();
        let mut timer = Timer::new(Duration::from_millis(30));
        timer.start(Tick {
            timer: Handle::new(),
            parent: Some(Handle::new()),
            bus,
        });
        timer.stop();
        assert!(mailbox.receive_timeout(Duration::from_millis(120)).is_none());
    }
}
