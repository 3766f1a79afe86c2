use oddball_audio::{AudioError, AudioOutput, Clip};
use oddball_marker::{MarkerWorker, MemorySink};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counts plays and remembers the length of every clip.
#[derive(Default)]
pub struct CountingOutput {
    plays: AtomicUsize,
    durations: Mutex<Vec<Duration>>,
}

impl CountingOutput {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.durations.lock().unwrap().clone()
    }
}

impl AudioOutput for CountingOutput {
    fn play(&self, clip: &Clip) -> Result<(), AudioError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.durations.lock().unwrap().push(clip.duration());
        Ok(())
    }
}

pub fn memory_worker() -> (MarkerWorker, MemorySink) {
    let sink = MemorySink::default();
    let worker = MarkerWorker::start(vec![Box::new(sink.clone())]).unwrap();
    (worker, sink)
}

/// Polls `done` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    done()
}
