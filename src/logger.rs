use crate::signal::{ChannelId, ListenerId, SignalBus, SignalListener};
use std::rc::Rc;
use tracing::info;

/// Listener that logs every edge it sees.
pub struct SignalLogger {
    label: String,
}

impl SignalLogger {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Watch each of `channels`. Returns the registrations so the caller can
    /// remove them later.
    pub fn watch(
        self,
        bus: &mut SignalBus,
        channels: impl IntoIterator<Item = ChannelId>,
    ) -> Vec<(ChannelId, ListenerId)> {
        let logger = Rc::new(self);
        channels
            .into_iter()
            .filter_map(|c| bus.add_listener(c, logger.clone()).map(|id| (c, id)))
            .collect()
    }
}

impl SignalListener for SignalLogger {
    fn on_signal(&self, bus: &mut SignalBus, channel: ChannelId) {
        info!(
            label = %self.label,
            channel,
            value = bus.value(channel),
            on = bus.get(channel),
            "signal edge"
        );
    }
}
