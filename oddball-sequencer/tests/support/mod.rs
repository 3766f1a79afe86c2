#![allow(dead_code)]

use crossbeam_channel::{Receiver, Sender};
use oddball_audio::{AudioError, AudioOutput, Clip};
use oddball_sequencer::{ObserverError, StimulusObserver, StimulusOnset};
use oddball_timing::Timer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Virtual clock: `sleep` advances time instantly and is recorded.
#[derive(Clone, Default)]
pub struct FakeTimer {
    clock: Arc<AtomicU64>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl FakeTimer {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Timer for FakeTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    fn sleep(&self, d: Duration) {
        self.sleeps.lock().unwrap().push(d);
        self.clock.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }
}

/// Fake timer whose first reading blocks until the gate is opened.
#[derive(Clone)]
pub struct GatedTimer {
    pub inner: FakeTimer,
    gate: Arc<Mutex<Option<Receiver<()>>>>,
}

impl GatedTimer {
    pub fn new() -> (Self, Sender<()>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let timer = Self {
            inner: FakeTimer::default(),
            gate: Arc::new(Mutex::new(Some(rx))),
        };
        (timer, tx)
    }
}

impl Timer for GatedTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        let gate = self.gate.lock().unwrap().take();
        if let Some(rx) = gate {
            let _ = rx.recv();
        }
        self.inner.now()
    }

    fn elapsed(&self, ts: u64) -> Duration {
        self.inner.elapsed(ts)
    }

    fn sleep(&self, d: Duration) {
        self.inner.sleep(d)
    }
}

/// Counts plays; optionally fails on the n-th one.
#[derive(Clone, Default)]
pub struct RecordingOutput {
    pub played: Arc<Mutex<Vec<usize>>>,
    pub fail_at: Option<usize>,
}

impl RecordingOutput {
    pub fn count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

impl AudioOutput for RecordingOutput {
    fn play(&self, clip: &Clip) -> Result<(), AudioError> {
        let mut played = self.played.lock().unwrap();
        if self.fail_at == Some(played.len()) {
            return Err(AudioError::Playback("device lost".into()));
        }
        played.push(clip.frames());
        Ok(())
    }
}

#[derive(Debug)]
pub struct Refused;

impl std::fmt::Display for Refused {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("marker outlet refused the sample")
    }
}

impl std::error::Error for Refused {}

/// Records every onset, forwards it on an optional channel, optionally fails.
/// With a hold, the very first notification blocks until released.
#[derive(Clone, Default)]
pub struct Recorder {
    pub onsets: Arc<Mutex<Vec<StimulusOnset>>>,
    pub notify: Option<Sender<usize>>,
    pub fail_at: Option<usize>,
    pub hold: Arc<Mutex<Option<Receiver<()>>>>,
}

impl Recorder {
    pub fn with_channel() -> (Self, Receiver<usize>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let recorder = Self {
            notify: Some(tx),
            ..Self::default()
        };
        (recorder, rx)
    }

    pub fn held_on_first() -> (Self, Receiver<usize>, Sender<()>) {
        let (recorder, notified) = Self::with_channel();
        let (release, hold) = crossbeam_channel::bounded(1);
        *recorder.hold.lock().unwrap() = Some(hold);
        (recorder, notified, release)
    }

    pub fn onsets(&self) -> Vec<StimulusOnset> {
        self.onsets.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.onsets.lock().unwrap().len()
    }
}

impl StimulusObserver for Recorder {
    fn on_stimulus(&self, onset: &StimulusOnset) -> Result<(), ObserverError> {
        if self.fail_at == Some(onset.index) {
            return Err(Box::new(Refused));
        }
        self.onsets.lock().unwrap().push(*onset);
        if let Some(tx) = &self.notify {
            let _ = tx.send(onset.index);
        }
        let hold = self.hold.lock().unwrap().take();
        if let Some(rx) = hold {
            let _ = rx.recv();
        }
        Ok(())
    }
}
