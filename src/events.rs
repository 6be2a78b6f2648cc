//! Timer-driven event queue.
//!
//! The esp_timer callback is the only producer; the main loop is the
//! only consumer.
//!
//! ```text
//!   esp_timer task ──Control/Telemetry/Watchdog──▶ EventQueue ──▶ drain_events (main loop)
//! ```
//!
//! Slots and indices are atomics, so the queue needs no `unsafe` and no
//! lock.

use core::sync::atomic::{AtomicU8, Ordering};

/// Slots in the firmware queue.  One slot always stays free.
pub const EVENT_QUEUE_CAP: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Control period elapsed: measure, charge, track.
    ControlTick = 1,
    /// Telemetry interval elapsed.
    TelemetryTick = 2,
    /// Feed the task watchdog.
    WatchdogTick = 3,
}

impl Event {
    fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::ControlTick),
            2 => Some(Self::TelemetryTick),
            3 => Some(Self::WatchdogTick),
            _ => None,
        }
    }
}

/// Single-producer / single-consumer ring of [`Event`]s.
pub struct EventQueue<const N: usize> {
    slots: [AtomicU8; N],
    head: AtomicU8,
    tail: AtomicU8,
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventQueue<N> {
    pub const fn new() -> Self {
        assert!(N >= 2 && N <= u8::MAX as usize);
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            head: AtomicU8::new(0),
            tail: AtomicU8::new(0),
        }
    }

    fn wrap(index: u8) -> u8 {
        ((usize::from(index) + 1) % N) as u8
    }

    /// Returns `false` and drops the event when full.
    pub fn push(&self, event: Event) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = Self::wrap(head);
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }
        self.slots[usize::from(head)].store(event as u8, Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        true
    }

    pub fn pop(&self) -> Option<Event> {
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            if tail == self.head.load(Ordering::Acquire) {
                return None;
            }
            let raw = self.slots[usize::from(tail)].load(Ordering::Relaxed);
            self.tail.store(Self::wrap(tail), Ordering::Release);
            if let Some(event) = Event::from_u8(raw) {
                return Some(event);
            }
            log::warn!("events: dropped unknown event {raw}");
        }
    }

    pub fn len(&self) -> usize {
        let head = usize::from(self.head.load(Ordering::Relaxed));
        let tail = usize::from(self.tail.load(Ordering::Relaxed));
        (head + N - tail) % N
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The firmware's event queue.
static EVENTS: EventQueue<EVENT_QUEUE_CAP> = EventQueue::new();

/// Queue an event.  Returns `false` if it was dropped.
pub fn push_event(event: Event) -> bool {
    EVENTS.push(event)
}

pub fn pop_event() -> Option<Event> {
    EVENTS.pop()
}

/// Hand every pending event to `handler` in FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = EVENTS.pop() {
        handler(event);
    }
}

pub fn queue_len() -> usize {
    EVENTS.len()
}
