//! Bounded event queue.
//!
//! [`EventQueue`] is a cheap-to-clone handle over one FIFO. Producers push until
//! the queue reaches capacity, after which [`EventQueue::push`] fails with
//! [`Error::QueueFull`]; nothing already queued is overwritten. The application
//! drains it in batches with [`EventQueue::pop`].
//!
//! [`EventQueue::sink`] gives an [`EventCallback`] that pushes into the queue, for
//! hosts that prefer pulling events over receiving callbacks.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::eventbus::EventCallback;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct EventQueue {
    inner: Rc<RefCell<VecDeque<Event>>>,
    capacity: usize,
}

impl EventQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn push(&self, event: Event) -> Result<()> {
        let mut q = self.inner.borrow_mut();
        if q.len() >= self.capacity {
            return Err(Error::QueueFull);
        }
        q.try_reserve(1)?;
        q.push_back(event);
        Ok(())
    }

    /// Removes up to `max` events in arrival order.
    pub fn pop(&self, max: usize) -> Vec<Event> {
        let mut q = self.inner.borrow_mut();
        let n = max.min(q.len());
        q.drain(..n).collect()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    pub fn sink(&self) -> QueueSink {
        QueueSink(self.clone())
    }
}

/// Callback that stores every delivered event in an [`EventQueue`].
#[derive(Clone, Debug)]
pub struct QueueSink(EventQueue);

impl EventCallback for QueueSink {
    fn on_event(&mut self, event: &Event) -> Result<()> {
        self.0.push(*event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use proptest::prelude::*;

    fn axis(device: usize, value: i16) -> Event {
        Event::new(device, EventKind::JoystickAxis { axis: 0, value })
    }

    #[test]
    fn push_past_capacity_fails() {
        let q = EventQueue::with_capacity(4);
        for i in 0..4 {
            q.push(axis(i, 0)).unwrap();
        }
        assert!(matches!(q.push(axis(9, 0)), Err(Error::QueueFull)));

        let out = q.pop(4);
        let devices: Vec<usize> = out.iter().map(|e| e.device).collect();
        assert_eq!(devices, vec![0, 1, 2, 3]);
        assert!(q.is_empty());
    }

    #[test]
    fn pop_returns_fewer_when_short() {
        let q = EventQueue::with_capacity(8);
        q.push(axis(0, 1)).unwrap();
        assert_eq!(q.pop(5).len(), 1);
        assert!(q.pop(5).is_empty());
    }

    #[test]
    fn sink_shares_storage() {
        let q = EventQueue::with_capacity(1);
        let mut sink = q.sink();
        sink.on_event(&axis(2, 5)).unwrap();
        assert!(matches!(sink.on_event(&axis(3, 5)), Err(Error::QueueFull)));
        assert_eq!(q.pop(1)[0].device, 2);
    }

    #[test]
    fn failed_reservation_is_out_of_memory() {
        let mut v: VecDeque<Event> = VecDeque::new();
        let err: Error = v.try_reserve(usize::MAX).unwrap_err().into();
        assert!(matches!(err, Error::OutOfMemory));
    }

    proptest! {
        #[test]
        fn bounded_fifo(capacity in 1usize..64, extra in 0usize..8) {
            let q = EventQueue::with_capacity(capacity);
            let mut accepted = 0;
            for i in 0..capacity + extra {
                if q.push(axis(i, i as i16)).is_ok() {
                    accepted += 1;
                }
            }
            prop_assert_eq!(accepted, capacity);
            let out = q.pop(capacity);
            for (i, ev) in out.iter().enumerate() {
                prop_assert_eq!(ev.device, i);
            }
            prop_assert!(q.is_empty());
        }
    }
}
