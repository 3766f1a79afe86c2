use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use oddball_audio::{AudioOutput, Clip};
use oddball_marker::MarkerSender;
use rand::Rng;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const AUTO_BEEP_MARKER: &str = "AUTO_BEEP";

/// Plays the beep cue at random intervals on its own thread, marking each one.
///
/// Dropping the stop sender wakes the thread immediately, so `stop` never
/// waits out a pending delay.
pub struct AutoBeeper {
    min: Duration,
    max: Duration,
    running: Option<(Sender<()>, JoinHandle<()>)>,
}

impl AutoBeeper {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            running: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    pub fn start(
        &mut self,
        output: Arc<dyn AudioOutput>,
        clip: Clip,
        markers: MarkerSender,
    ) -> std::io::Result<()> {
        if self.is_active() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let (min, max) = (self.min, self.max);
        let handle = thread::Builder::new()
            .name("auto-beep".into())
            .spawn(move || {
                let mut rng = rand::rng();
                loop {
                    match stop_rx.recv_timeout(random_delay(&mut rng, min, max)) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    if let Err(e) = output.play(&clip) {
                        log::warn!("Auto beep playback failed: {e}");
                    }
                    if let Err(e) = markers.send(AUTO_BEEP_MARKER) {
                        log::warn!("Auto beep marker not queued: {e}");
                    }
                }
                log::debug!("Auto beep thread exiting");
            })?;

        self.running = Some((stop_tx, handle));
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.running.take() {
            drop(stop_tx);
            if handle.join().is_err() {
                log::error!("Auto beep thread panicked");
            }
        }
    }
}

impl Drop for AutoBeeper {
    fn drop(&mut self) {
        self.stop();
    }
}

fn random_delay<R: Rng + ?Sized>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    let low = min.as_millis() as u64;
    let high = max.as_millis() as u64;
    Duration::from_millis(rng.random_range(low..=high))
}
