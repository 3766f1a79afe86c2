use crate::config::SequenceConfig;
use crate::error::{Result, SequencerError};
use crate::observer::{StimulusObserver, StimulusOnset};
use crate::run_state::RunState;
use crate::sequence;
use oddball_audio::{AudioOutput, Clip, Waveshape, synthesize};
use oddball_core::{Stimulus, Tone};
use oddball_timing::{DwellStats, Timer};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A stimulus kind with its waveform rendered ahead of time.
#[derive(Debug, Clone)]
pub struct PreparedStimulus {
    pub tone: Tone,
    pub clip: Clip,
}

/// Outcome of one pass through the sequence.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub presented: usize,
    pub total: usize,
    /// True when the sequence was exhausted rather than stopped.
    pub completed: bool,
    /// Onset-to-onset intervals as measured by the sequencer's timer.
    pub dwell: DwellStats,
    pub elapsed: Duration,
}

/// Auditory oddball sequencer.
///
/// Waveforms and the presentation order are fixed at construction. `start`
/// blocks for the whole run (up to `total * (duration + interval)`), so it is
/// meant to be called from a worker thread; `spawn` does exactly that.
///
/// Cancellation is cooperative: the running flag is checked once at the top of
/// every stimulus, so after `stop` at most one more stimulus can begin, and an
/// in-progress `start` returns once the current tone and interval have elapsed.
pub struct Sequencer<T, A>
where
    T: Timer<Timestamp = u64>,
    A: AudioOutput,
{
    config: SequenceConfig,
    stimuli: Vec<PreparedStimulus>,
    sequence: Vec<usize>,
    state: RunState,
    cursor: AtomicUsize,
    timer: T,
    output: A,
    observer: Box<dyn StimulusObserver>,
}

impl<T, A> Sequencer<T, A>
where
    T: Timer<Timestamp = u64>,
    A: AudioOutput,
{
    pub fn new(
        config: SequenceConfig,
        output: A,
        timer: T,
        observer: impl StimulusObserver + 'static,
    ) -> Result<Self> {
        Self::with_rng(config, output, timer, observer, &mut rand::rng())
    }

    /// Like [`Sequencer::new`] but shuffles with the given generator.
    pub fn with_rng<R: Rng + ?Sized>(
        config: SequenceConfig,
        output: A,
        timer: T,
        observer: impl StimulusObserver + 'static,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;

        let stimuli: Vec<PreparedStimulus> = config
            .tones()
            .into_iter()
            .map(|tone| PreparedStimulus {
                clip: synthesize(
                    tone.frequency_hz,
                    tone.duration(),
                    config.sample_rate,
                    Waveshape::Sine,
                    config.amplitude,
                ),
                tone,
            })
            .collect();

        let deviant = deviant_kind(&stimuli);
        let sequence = sequence::generate(&config.counts(), deviant, config.adjacency, rng);
        if let Some(d) = deviant {
            log::debug!("Deviant kind: {}", stimuli[d].tone);
        }

        log::info!(
            "Sequencer ready: {} stimuli over {} kinds, dwell {} ms",
            sequence.len(),
            stimuli.len(),
            config.dwell().as_millis()
        );

        Ok(Self {
            config,
            stimuli,
            sequence,
            state: RunState::default(),
            cursor: AtomicUsize::new(0),
            timer,
            output,
            observer: Box::new(observer),
        })
    }

    /// Plays the sequence from the beginning on the calling thread and blocks
    /// until it is exhausted or stopped.
    pub fn start(&self) -> Result<RunSummary> {
        let token = self.claim()?;
        self.run(token)
    }

    /// Claims the run on the calling thread, then plays it on a dedicated
    /// worker. A `stop` issued right after `spawn` returns always applies to
    /// this run.
    pub fn spawn(self: &Arc<Self>) -> Result<JoinHandle<Result<RunSummary>>>
    where
        T: 'static,
        A: 'static,
    {
        let token = self.claim()?;
        let this = Arc::clone(self);
        thread::Builder::new()
            .name("oddball-sequencer".into())
            .spawn(move || this.run(token))
            .map_err(|e| {
                self.state.release(token);
                SequencerError::Worker(e)
            })
    }

    /// Requests cancellation. Idempotent and non-blocking.
    pub fn stop(&self) {
        if self.state.is_running() {
            log::info!("Sequencer stop requested at stimulus {}", self.cursor());
        }
        self.state.stop();
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Index of the next stimulus to present in the current (or last) run.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Recomputes the presentation order.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        if self.state.is_running() {
            return Err(SequencerError::AlreadyRunning);
        }
        self.sequence = sequence::generate(
            &self.config.counts(),
            deviant_kind(&self.stimuli),
            self.config.adjacency,
            rng,
        );
        self.cursor.store(0, Ordering::Release);
        Ok(())
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn stimuli(&self) -> &[PreparedStimulus] {
        &self.stimuli
    }

    /// Kind indices into [`Sequencer::stimuli`], in presentation order.
    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    /// Tones in presentation order.
    pub fn tones(&self) -> impl Iterator<Item = &Tone> + '_ {
        self.sequence.iter().map(|&kind| &self.stimuli[kind].tone)
    }

    fn claim(&self) -> Result<u64> {
        let token = self.state.claim().ok_or(SequencerError::AlreadyRunning)?;
        self.cursor.store(0, Ordering::Release);
        Ok(token)
    }

    fn run(&self, token: u64) -> Result<RunSummary> {
        let result = self.play(token);
        self.state.release(token);
        match &result {
            Ok(summary) if summary.completed => log::info!(
                "Sequence complete: {} stimuli in {:.1} s, jitter {:.3} ms, worst drift {:.3} ms",
                summary.presented,
                summary.elapsed.as_secs_f64(),
                summary.dwell.jitter_ns / 1_000_000.0,
                summary.dwell.worst_drift_ns(self.config.dwell()) / 1_000_000.0
            ),
            Ok(summary) => log::info!(
                "Sequence stopped after {}/{} stimuli",
                summary.presented,
                summary.total
            ),
            Err(e) => log::error!("Sequence aborted: {e}"),
        }
        result
    }

    fn play(&self, token: u64) -> Result<RunSummary> {
        let run_start = self.timer.now();
        let interval = self.config.interval();
        let mut previous_onset: Option<u64> = None;
        let mut intervals = Vec::with_capacity(self.sequence.len());
        let mut presented = 0;

        for (index, &kind) in self.sequence.iter().enumerate() {
            if !self.state.is_current(token) {
                break;
            }
            let stimulus = &self.stimuli[kind];

            let now = self.timer.now();
            if let Some(prev) = previous_onset {
                intervals.push(Duration::from_nanos(now.saturating_sub(prev)));
            }
            previous_onset = Some(now);

            let onset = StimulusOnset {
                index,
                tone: stimulus.tone,
                timestamp_ns: now,
            };
            self.observer
                .on_stimulus(&onset)
                .map_err(|source| SequencerError::Observer { index, source })?;
            self.output
                .play(&stimulus.clip)
                .map_err(|source| SequencerError::Audio { index, source })?;

            presented = index + 1;
            // A stop followed by a quick restart can catch this loop between
            // its flag check and here; the newer run then owns the cursor.
            // Its first onset may still overlap this last one.
            if self.state.is_superseded(token) {
                break;
            }
            self.cursor.store(presented, Ordering::Release);
            log::trace!("stimulus {index}: {}", stimulus.tone);

            self.timer.sleep(stimulus.tone.duration());
            self.timer.sleep(interval);
        }

        Ok(RunSummary {
            presented,
            total: self.sequence.len(),
            completed: presented == self.sequence.len(),
            dwell: DwellStats::from_samples(&intervals),
            elapsed: self.timer.elapsed(run_start),
        })
    }
}

fn deviant_kind(stimuli: &[PreparedStimulus]) -> Option<usize> {
    stimuli.iter().position(|s| s.tone.is_deviant())
}
