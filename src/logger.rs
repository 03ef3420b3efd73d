//! Tracing callback.
use crate::error::Result;
use crate::event::Event;
use crate::eventbus::EventCallback;
use tracing::info;

/// Logs every event at `info`, then hands it to the wrapped callback, if any.
#[derive(Default)]
pub struct LogCallback {
    inner: Option<Box<dyn EventCallback>>,
}

impl LogCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrapping(inner: Box<dyn EventCallback>) -> Self {
        Self { inner: Some(inner) }
    }
}

impl EventCallback for LogCallback {
    fn on_event(&mut self, event: &Event) -> Result<()> {
        info!(device = event.device, class = ?event.class(), kind = ?event.kind, "input");
        match self.inner.as_mut() {
            Some(inner) => inner.on_event(event),
            None => Ok(()),
        }
    }
}
