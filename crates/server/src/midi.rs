use tokio::sync::watch;
use tracing::info;

const CONTROL_CHANGE: u8 = 0xB0;

pub fn control_change(channel: u8, cc: u8, value: u8) -> [u8; 3] {
    [CONTROL_CHANGE | (channel & 0x0F), cc, value]
}

pub trait MidiOutput: Send + Sync {
    fn send(&self, message: &[u8]) -> anyhow::Result<()>;

    fn readiness(&self) -> watch::Receiver<bool>;
}

pub struct LoggingMidiOutput {
    node: String,
    ready: watch::Sender<bool>,
}

impl LoggingMidiOutput {
    pub fn new(node: impl Into<String>) -> Self {
        let (ready, _) = watch::channel(true);
        Self {
            node: node.into(),
            ready,
        }
    }
}

impl MidiOutput for LoggingMidiOutput {
    fn send(&self, message: &[u8]) -> anyhow::Result<()> {
        info!(node = %self.node, ?message, "midi out");
        Ok(())
    }

    fn readiness(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }
}
