use crate::error::Result;
use crate::event::Event;
use tracing::debug;

/// Application callback receiving every normalized event.
///
/// Invoked synchronously from `periodic_task` / completion handling, any number
/// of times per call. An `Err` is reported back to the host but does not stop the
/// rest of the batch from being delivered.
pub trait EventCallback {
    fn on_event(&mut self, event: &Event) -> Result<()>;
}

impl<F> EventCallback for F
where
    F: FnMut(&Event) -> Result<()>,
{
    fn on_event(&mut self, event: &Event) -> Result<()> {
        self(event)
    }
}

/// Delivers a batch of events in order, returning the first failure (if any)
/// after the whole batch has been offered.
pub fn deliver_all(callback: &mut dyn EventCallback, events: &[Event]) -> Result<()> {
    let mut first_err = None;
    for event in events {
        if let Err(e) = callback.on_event(event) {
            debug!(?event, error = %e, "event callback rejected event");
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::event::{keysym, EventKind};

    #[test]
    fn failures_do_not_stop_the_batch() {
        let mut seen = Vec::new();
        let mut cb = |ev: &Event| -> Result<()> {
            seen.push(ev.device);
            if ev.device == 1 {
                Err(Error::Callback(7))
            } else {
                Ok(())
            }
        };
        let batch: Vec<Event> = (0..3)
            .map(|d| Event::new(d, EventKind::KeyDown { keysym: keysym::Q }))
            .collect();

        let res = deliver_all(&mut cb, &batch);
        assert!(matches!(res, Err(Error::Callback(7))));
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
