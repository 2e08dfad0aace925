use std::{collections::HashMap, fs, path::Path, sync::Arc};

use anyhow::Context;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::midi::{control_change, MidiOutput};

pub struct DeviceState {
    values: RwLock<HashMap<(u8, u8), u8>>,
    midi: Arc<dyn MidiOutput>,
}

impl DeviceState {
    pub fn new(midi: Arc<dyn MidiOutput>) -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            midi,
        }
    }

    pub async fn seed(&self, initial: HashMap<(u8, u8), u8>) -> usize {
        let count = initial.len();
        self.values.write().await.extend(initial);
        count
    }

    // Missing keys read as 0.
    pub async fn get(&self, channel: u8, cc: u8) -> u8 {
        self.values
            .read()
            .await
            .get(&(channel, cc))
            .copied()
            .unwrap_or_default()
    }

    pub async fn set(&self, channel: u8, cc: u8, value: u8) {
        self.values.write().await.insert((channel, cc), value);
        self.send(channel, cc, value);
    }

    pub async fn replay_cached(&self) -> usize {
        let values = self.values.read().await;
        let mut keys: Vec<_> = values.keys().copied().collect();
        keys.sort_unstable();
        for (channel, cc) in &keys {
            self.send(*channel, *cc, values[&(*channel, *cc)]);
        }
        keys.len()
    }

    fn send(&self, channel: u8, cc: u8, value: u8) {
        match self.midi.send(&control_change(channel, cc, value)) {
            Ok(()) => debug!(channel, cc, value, "cc sent"),
            Err(error) => warn!(channel, cc, value, error = %format!("{error:#}"), "cc not sent"),
        }
    }
}

pub fn parse_key(key: &str) -> Option<(u8, u8)> {
    let (channel, cc) = key.split_once(':')?;
    Some((channel.parse().ok()?, cc.parse().ok()?))
}

pub fn load_initial_values(path: &Path) -> anyhow::Result<HashMap<(u8, u8), u8>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read initial values '{}'", path.display()))?;
    let entries: HashMap<String, u8> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid initial values '{}'", path.display()))?;

    let mut values = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        match parse_key(&key) {
            Some(address) => {
                values.insert(address, value);
            }
            None => warn!(%key, "invalid key in initial values, skipping"),
        }
    }
    info!(count = values.len(), file = %path.display(), "initial values loaded");
    Ok(values)
}

pub async fn replay_on_ready(state: Arc<DeviceState>, mut ready: watch::Receiver<bool>) {
    loop {
        let is_ready = *ready.borrow_and_update();
        if is_ready {
            let sent = state.replay_cached().await;
            info!(sent, "midi output ready, cached values replayed");
        }
        if ready.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct RecordingMidi {
        sent: Mutex<Vec<Vec<u8>>>,
        ready: watch::Receiver<bool>,
    }

    impl RecordingMidi {
        fn new(ready: watch::Receiver<bool>) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                ready,
            })
        }

        fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().expect("midi lock").clone()
        }
    }

    impl MidiOutput for RecordingMidi {
        fn send(&self, message: &[u8]) -> anyhow::Result<()> {
            self.sent.lock().expect("midi lock").push(message.to_vec());
            Ok(())
        }

        fn readiness(&self) -> watch::Receiver<bool> {
            self.ready.clone()
        }
    }

    #[test]
    fn parses_channel_cc_keys() {
        assert_eq!(parse_key("1:7"), Some((1, 7)));
        assert_eq!(parse_key("0:127"), Some((0, 127)));
        assert_eq!(parse_key("1"), None);
        assert_eq!(parse_key("1:2:3"), None);
        assert_eq!(parse_key("a:7"), None);
        assert_eq!(parse_key("300:7"), None);
    }

    #[test]
    fn initial_values_skip_invalid_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("init.json");
        fs::write(&file, r#"{"1:7": 64, "2:74": 127, "bogus": 5, "3": 1}"#).expect("write");

        let values = load_initial_values(&file).expect("load");
        assert_eq!(values.len(), 2);
        assert_eq!(values[&(1, 7)], 64);
        assert_eq!(values[&(2, 74)], 127);
    }

    #[test]
    fn initial_values_reject_out_of_range_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("init.json");
        fs::write(&file, r#"{"1:7": 300}"#).expect("write");
        assert!(load_initial_values(&file).is_err());
        assert!(load_initial_values(&dir.path().join("missing.json")).is_err());
    }

    #[tokio::test]
    async fn set_stores_and_sends_control_change() {
        let (_ready_tx, ready) = watch::channel(false);
        let midi = RecordingMidi::new(ready);
        let state = DeviceState::new(midi.clone());

        assert_eq!(state.get(1, 7).await, 0);
        state.set(1, 7, 64).await;
        assert_eq!(state.get(1, 7).await, 64);
        assert_eq!(midi.sent(), vec![vec![0xB1, 7, 64]]);
    }

    #[tokio::test]
    async fn replay_sends_every_cached_value_in_order() {
        let (_ready_tx, ready) = watch::channel(false);
        let midi = RecordingMidi::new(ready);
        let state = DeviceState::new(midi.clone());
        state
            .seed(HashMap::from([((2, 1), 10), ((1, 9), 20), ((1, 3), 30)]))
            .await;

        assert_eq!(state.replay_cached().await, 3);
        assert_eq!(
            midi.sent(),
            vec![vec![0xB1, 3, 30], vec![0xB1, 9, 20], vec![0xB2, 1, 10]]
        );
    }

    #[tokio::test]
    async fn readiness_triggers_a_replay() {
        let (ready_tx, ready) = watch::channel(false);
        let midi = RecordingMidi::new(ready.clone());
        let state = Arc::new(DeviceState::new(midi.clone()));
        state.seed(HashMap::from([((0, 7), 100)])).await;

        let task = tokio::spawn(replay_on_ready(Arc::clone(&state), ready));
        ready_tx.send(true).expect("receiver alive");
        drop(ready_tx);
        task.await.expect("join");

        assert_eq!(midi.sent(), vec![vec![0xB0, 7, 100]]);
    }
}
