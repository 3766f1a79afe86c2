//! Operator console state.
//!
//! Everything the panel shows and every button it offers lives here, free of
//! any windowing code, so the whole marker protocol can be driven from tests.

use crate::auto_beep::AutoBeeper;
use crate::config::ConsoleConfig;
use anyhow::{Context, Result};
use oddball_audio::{AudioOutput, Clip};
use oddball_core::Stimulus;
use oddball_marker::{MarkerSender, MarkerWorker, MetricsSnapshot};
use oddball_sequencer::{
    ObserverError, RunSummary, Sequencer, StimulusObserver, StimulusOnset,
};
use oddball_timing::HighPrecisionTimer;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub type SharedOutput = Arc<dyn AudioOutput>;

type P300Sequencer = Sequencer<HighPrecisionTimer, SharedOutput>;
type P300Run = JoinHandle<oddball_sequencer::Result<RunSummary>>;

pub const APP_START: &str = "APP START";
pub const APP_END: &str = "APP END";
pub const HEARTBEAT: &str = "H";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Trigger,
    Beep,
    AutoBeep,
    Recording,
    P300,
    Dribble,
    Shot,
    Release,
    Send,
}

/// Emits one marker per presented tone.
struct ToneMarkers(MarkerSender);

impl StimulusObserver for ToneMarkers {
    fn on_stimulus(&self, onset: &StimulusOnset) -> Result<(), ObserverError> {
        self.0
            .send(format!("P300 TONE {}", onset.tone.identifier()))?;
        Ok(())
    }
}

pub struct Console {
    worker: MarkerWorker,
    markers: MarkerSender,
    output: SharedOutput,
    beep: Clip,
    recording_cue: Clip,
    p300: Arc<P300Sequencer>,
    p300_runs: Vec<P300Run>,
    auto_beep: AutoBeeper,
    heartbeat: Duration,
    next_heartbeat: Instant,
    recording: bool,
    shot_count: u32,
    input: String,
    log: VecDeque<String>,
    log_capacity: usize,
    status: Option<String>,
}

impl Console {
    /// Prepares the paradigm and cue sounds, then marks `APP START`.
    pub fn new(config: &ConsoleConfig, worker: MarkerWorker, output: SharedOutput) -> Result<Self> {
        let markers = worker.sender();
        let p300 = Sequencer::new(
            config.p300.clone(),
            Arc::clone(&output),
            HighPrecisionTimer::new(),
            ToneMarkers(markers.clone()),
        )
        .context("preparing P300 paradigm")?;

        let sample_rate = config.p300.sample_rate;
        let (beep_min, beep_max) = config.auto_beep_range();
        let heartbeat = config.heartbeat();

        let mut console = Self {
            worker,
            markers,
            output,
            beep: config.beep.clip(sample_rate),
            recording_cue: config.recording_cue.clip(sample_rate),
            p300: Arc::new(p300),
            p300_runs: Vec::new(),
            auto_beep: AutoBeeper::new(beep_min, beep_max),
            heartbeat,
            next_heartbeat: Instant::now() + heartbeat,
            recording: false,
            shot_count: 0,
            input: String::new(),
            log: VecDeque::with_capacity(config.log_lines),
            log_capacity: config.log_lines.max(1),
            status: None,
        };
        console.mark(APP_START);
        Ok(console)
    }

    pub fn handle(&mut self, action: Action) {
        match action {
            Action::Trigger => self.mark("TRIGGER"),
            Action::Beep => {
                if self.require_audio("BEEP") {
                    self.play(&self.beep.clone());
                    self.mark("BEEP");
                }
            }
            Action::AutoBeep => self.toggle_auto_beep(),
            Action::Recording => {
                if self.require_audio("RECORDING") {
                    self.recording = !self.recording;
                    self.play(&self.recording_cue.clone());
                    self.mark(if self.recording { "START" } else { "STOP" });
                }
            }
            Action::P300 => self.toggle_p300(),
            Action::Dribble => self.mark("DRIBBLE"),
            Action::Shot => {
                self.shot_count += 1;
                self.mark(format!("SHOT COUNT: {}", self.shot_count));
            }
            Action::Release => self.mark("RELEASE"),
            Action::Send => {
                let message = std::mem::take(&mut self.input);
                if !message.trim().is_empty() {
                    self.mark(message);
                }
            }
        }
    }

    fn toggle_auto_beep(&mut self) {
        if self.auto_beep.is_active() {
            self.auto_beep.stop();
            self.mark("AUTO BEEP ENDS");
            return;
        }
        if !self.require_audio("AUTO BEEP") {
            return;
        }
        match self.auto_beep.start(
            Arc::clone(&self.output),
            self.beep.clone(),
            self.markers.clone(),
        ) {
            Ok(()) => self.mark("AUTO BEEP START"),
            Err(e) => self.report(format!("Auto beep could not start: {e}")),
        }
    }

    fn toggle_p300(&mut self) {
        if self.p300.is_running() {
            self.p300.stop();
            self.mark("P300 STOPPED");
            return;
        }
        if !self.require_audio("P300") {
            return;
        }
        self.mark("P300 STARTED");
        match self.p300.spawn() {
            Ok(run) => {
                self.p300_runs.push(run);
                self.status = None;
            }
            Err(e) => self.report(format!("P300 could not start: {e}")),
        }
    }

    /// Emits the heartbeat when due and collects finished P300 runs.
    pub fn tick(&mut self, now: Instant) {
        if now >= self.next_heartbeat {
            self.mark(HEARTBEAT);
            self.next_heartbeat = now + self.heartbeat;
        }
        self.reap_p300();
    }

    fn reap_p300(&mut self) {
        let (finished, pending): (Vec<_>, Vec<_>) =
            self.p300_runs.drain(..).partition(|run| run.is_finished());
        self.p300_runs = pending;

        for run in finished {
            match run.join() {
                Ok(Ok(summary)) if summary.completed => {
                    let drift = summary.dwell.worst_drift_ns(self.p300.config().dwell());
                    self.status = Some(format!(
                        "P300 complete: {} stimuli, jitter {:.3} ms, worst drift {:.3} ms",
                        summary.presented,
                        summary.dwell.jitter_ns / 1e6,
                        drift / 1e6
                    ));
                }
                Ok(Ok(summary)) => {
                    log::debug!("P300 run stopped after {} stimuli", summary.presented);
                }
                Ok(Err(e)) => self.report(format!("P300 aborted: {e}")),
                Err(_) => self.report("P300 worker panicked".to_string()),
            }
        }
    }

    /// Moves markers the worker has published into the visible log.
    /// Returns whether anything new arrived.
    pub fn pump(&mut self) -> bool {
        let fresh = self.worker.drain_feed();
        let changed = !fresh.is_empty();
        for marker in fresh {
            if self.log.len() == self.log_capacity {
                self.log.pop_front();
            }
            self.log.push_back(marker.to_string());
        }
        changed
    }

    pub fn type_char(&mut self, c: char) {
        if !c.is_control() {
            self.input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn log_lines(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.log.iter().map(String::as_str)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn shot_count(&self) -> u32 {
        self.shot_count
    }

    pub fn next_heartbeat(&self) -> Instant {
        self.next_heartbeat
    }

    /// Whether the toggle behind `action` is currently on.
    pub fn is_engaged(&self, action: Action) -> bool {
        match action {
            Action::AutoBeep => self.auto_beep.is_active(),
            Action::Recording => self.recording,
            Action::P300 => self.p300.is_running(),
            _ => false,
        }
    }

    /// Button caption; toggles name the step they will take next.
    pub fn label(&self, action: Action) -> &'static str {
        match action {
            Action::Trigger => "TRIGGER",
            Action::Beep => "BEEP",
            Action::AutoBeep if self.auto_beep.is_active() => "AUTO BEEP OFF",
            Action::AutoBeep => "AUTO BEEP ON",
            Action::Recording if self.recording => "STOP",
            Action::Recording => "START",
            Action::P300 if self.p300.is_running() => "STOP P300",
            Action::P300 => "START P300",
            Action::Dribble => "DRIBBLE",
            Action::Shot => "SHOT",
            Action::Release => "RELEASE",
            Action::Send => "SEND",
        }
    }

    /// Stops background activity, marks `APP END` and drains the marker queue.
    pub fn shutdown(mut self) -> MetricsSnapshot {
        self.auto_beep.stop();
        self.p300.stop();
        for run in self.p300_runs.drain(..) {
            if run.join().is_err() {
                log::error!("P300 worker panicked");
            }
        }
        self.mark(APP_END);
        let metrics = self.worker.shutdown();
        log::info!(
            "Marker worker finished: {} published, {} dropped, {} sink failures",
            metrics.published,
            metrics.dropped,
            metrics.sink_failures
        );
        metrics
    }

    fn mark(&mut self, message: impl Into<String>) {
        let message = message.into();
        if let Err(e) = self.markers.send(message.as_str()) {
            self.report(format!("Marker {message:?} not sent: {e}"));
        }
    }

    fn play(&mut self, clip: &Clip) {
        if let Err(e) = self.output.play(clip) {
            self.report(format!("Audio: {e}"));
        }
    }

    /// Refuses actions whose markers would claim a sound nobody heard.
    fn require_audio(&mut self, action: &str) -> bool {
        if self.output.is_audible() {
            return true;
        }
        self.report(format!(
            "{action} needs an audio device (built without rodio or started with --no-audio)"
        ));
        false
    }

    fn report(&mut self, message: String) {
        log::error!("{message}");
        self.status = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_worker, wait_for, CountingOutput};
    use crossbeam_channel::{bounded, Receiver, Sender};
    use oddball_audio::NullOutput;
    use oddball_core::Marker;
    use oddball_marker::{MarkerSink, MemorySink};
    use oddball_sequencer::SequenceConfig;

    /// Holds the worker inside `publish` until the release side is dropped.
    struct StalledSink {
        entered: Sender<String>,
        release: Receiver<()>,
        inner: MemorySink,
    }

    impl MarkerSink for StalledSink {
        fn name(&self) -> &str {
            "stalled"
        }

        fn publish(&mut self, marker: &Marker) -> oddball_marker::Result<()> {
            let _ = self.entered.send(marker.message.clone());
            let _ = self.release.recv();
            self.inner.publish(marker)
        }
    }

    fn quick_config(total_stimuli: usize) -> ConsoleConfig {
        ConsoleConfig {
            p300: SequenceConfig {
                total_stimuli,
                tone_duration_ms: 1,
                interval_ms: 1,
                sample_rate: 8_000,
                ..SequenceConfig::default()
            },
            ..ConsoleConfig::default()
        }
    }

    fn console(config: &ConsoleConfig) -> (Console, MemorySink, Arc<CountingOutput>) {
        let (worker, sink) = memory_worker();
        let output = Arc::new(CountingOutput::default());
        let console = Console::new(config, worker, output.clone()).unwrap();
        (console, sink, output)
    }

    fn messages(console: &Console, sink: &MemorySink) -> Vec<String> {
        console.worker.flush().unwrap();
        sink.messages()
    }

    #[test]
    fn marks_app_start_on_creation() {
        let (console, sink, _) = console(&quick_config(10));
        assert_eq!(messages(&console, &sink), vec![APP_START]);
    }

    #[test]
    fn plain_buttons_emit_their_marker() {
        let (mut console, sink, output) = console(&quick_config(10));
        for action in [Action::Trigger, Action::Dribble, Action::Release, Action::Beep] {
            console.handle(action);
        }
        assert_eq!(
            messages(&console, &sink)[1..],
            ["TRIGGER", "DRIBBLE", "RELEASE", "BEEP"]
        );
        assert_eq!(output.durations(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn shot_counter_is_part_of_the_marker() {
        let (mut console, sink, _) = console(&quick_config(10));
        console.handle(Action::Shot);
        console.handle(Action::Shot);
        assert_eq!(console.shot_count(), 2);
        assert_eq!(
            messages(&console, &sink)[1..],
            ["SHOT COUNT: 1", "SHOT COUNT: 2"]
        );
    }

    #[test]
    fn recording_alternates_and_plays_cue() {
        let (mut console, sink, output) = console(&quick_config(10));
        assert_eq!(console.label(Action::Recording), "START");
        console.handle(Action::Recording);
        assert!(console.is_engaged(Action::Recording));
        assert_eq!(console.label(Action::Recording), "STOP");
        console.handle(Action::Recording);
        assert!(!console.is_engaged(Action::Recording));

        assert_eq!(messages(&console, &sink)[1..], ["START", "STOP"]);
        assert_eq!(output.durations(), vec![Duration::from_secs(5); 2]);
    }

    #[test]
    fn send_uses_typed_text_and_clears_it() {
        let (mut console, sink, _) = console(&quick_config(10));
        for c in "ball out\n".chars() {
            console.type_char(c);
        }
        console.type_char('x');
        console.backspace();
        assert_eq!(console.input(), "ball out");

        console.handle(Action::Send);
        assert_eq!(console.input(), "");
        console.handle(Action::Send);

        assert_eq!(messages(&console, &sink)[1..], ["ball out"]);
    }

    #[test]
    fn heartbeat_fires_once_per_period() {
        let (mut console, sink, _) = console(&quick_config(10));
        let due = console.next_heartbeat();

        console.tick(due - Duration::from_millis(1));
        console.tick(due);
        console.tick(due + Duration::from_secs(1));
        assert_eq!(console.next_heartbeat(), due + Duration::from_secs(5));

        assert_eq!(messages(&console, &sink)[1..], [HEARTBEAT]);
    }

    #[test]
    fn p300_run_marks_every_tone() {
        let (mut console, sink, output) = console(&quick_config(10));
        console.handle(Action::P300);
        assert!(wait_for(Duration::from_secs(5), || !console.is_engaged(Action::P300)));
        assert!(wait_for(Duration::from_secs(5), || {
            console.tick(Instant::now());
            console.p300_runs.is_empty()
        }));

        let messages = messages(&console, &sink);
        assert_eq!(messages[1], "P300 STARTED");
        let tones: Vec<&str> = messages[2..]
            .iter()
            .map(String::as_str)
            .filter(|m| m.starts_with("P300 TONE"))
            .collect();
        assert_eq!(tones.len(), 10);
        assert_eq!(tones.iter().filter(|&&m| m == "P300 TONE 1200Hz").count(), 2);
        assert_eq!(tones.iter().filter(|&&m| m == "P300 TONE 1000Hz").count(), 8);
        assert_eq!(output.plays(), 10);
        let status = console.status().unwrap();
        assert!(status.starts_with("P300 complete: 10 stimuli"));
        assert!(status.contains("worst drift"));
    }

    #[test]
    fn full_marker_queue_aborts_p300() {
        let (entered_tx, entered) = bounded(16);
        let (release, release_rx) = bounded::<()>(0);
        let sink = MemorySink::default();
        let stalled = StalledSink {
            entered: entered_tx,
            release: release_rx,
            inner: sink.clone(),
        };
        let worker = MarkerWorker::with_capacity(vec![Box::new(stalled)], 1).unwrap();
        let mut console = Console::new(
            &quick_config(10),
            worker,
            Arc::new(CountingOutput::default()),
        )
        .unwrap();

        // APP START is held in the sink, so the queue has room for one more
        assert_eq!(
            entered.recv_timeout(Duration::from_secs(5)).unwrap(),
            APP_START
        );
        console.handle(Action::P300);
        assert!(wait_for(Duration::from_secs(5), || {
            console.tick(Instant::now());
            console.p300_runs.is_empty()
        }));

        let status = console.status().unwrap();
        assert!(status.starts_with("P300 aborted"), "{status}");
        assert!(status.contains("observer failed at stimulus 0"), "{status}");
        assert!(!console.is_engaged(Action::P300));
        assert_eq!(console.label(Action::P300), "START P300");

        drop(release);
        console.shutdown();
        let messages = sink.messages();
        assert_eq!(messages[..2], [APP_START, "P300 STARTED"]);
        assert!(!messages.iter().any(|m| m.starts_with("P300 TONE")));
    }

    #[test]
    fn silent_output_refuses_audio_actions() {
        let (worker, sink) = memory_worker();
        let mut console = Console::new(&quick_config(10), worker, Arc::new(NullOutput)).unwrap();

        for action in [Action::Beep, Action::Recording, Action::AutoBeep, Action::P300] {
            console.handle(action);
            assert!(!console.is_engaged(action));
            let status = console.status().unwrap();
            assert!(status.contains("needs an audio device"), "{status}");
        }
        console.handle(Action::Trigger);

        assert_eq!(messages(&console, &sink), [APP_START, "TRIGGER"]);
        assert!(console.p300_runs.is_empty());
    }

    #[test]
    fn p300_can_be_stopped_and_restarted() {
        let mut config = quick_config(1000);
        config.p300.interval_ms = 20;
        let (mut console, sink, _) = console(&config);

        console.handle(Action::P300);
        assert!(console.is_engaged(Action::P300));
        assert_eq!(console.label(Action::P300), "STOP P300");
        console.handle(Action::P300);
        assert!(!console.is_engaged(Action::P300));
        console.handle(Action::P300);
        assert!(console.is_engaged(Action::P300));

        let metrics = console.shutdown();
        assert_eq!(metrics.dropped, 0);

        let messages = sink.messages();
        let controls: Vec<_> = messages
            .iter()
            .filter(|m| !m.starts_with("P300 TONE"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            controls,
            [APP_START, "P300 STARTED", "P300 STOPPED", "P300 STARTED", APP_END]
        );
        assert!(messages.len() < 1000);
    }

    #[test]
    fn auto_beep_toggle_marks_both_edges() {
        let mut config = quick_config(10);
        config.auto_beep_secs = [60, 60];
        let (mut console, sink, _) = console(&config);

        assert_eq!(console.label(Action::AutoBeep), "AUTO BEEP ON");
        console.handle(Action::AutoBeep);
        assert!(console.is_engaged(Action::AutoBeep));
        assert_eq!(console.label(Action::AutoBeep), "AUTO BEEP OFF");
        console.handle(Action::AutoBeep);
        assert!(!console.is_engaged(Action::AutoBeep));

        assert_eq!(
            messages(&console, &sink)[1..],
            ["AUTO BEEP START", "AUTO BEEP ENDS"]
        );
    }

    #[test]
    fn pump_keeps_bounded_log() {
        let mut config = quick_config(10);
        config.log_lines = 3;
        let (mut console, _sink, _) = console(&config);
        for _ in 0..4 {
            console.handle(Action::Trigger);
        }
        console.worker.flush().unwrap();

        assert!(console.pump());
        assert!(!console.pump());
        let lines: Vec<_> = console.log_lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.ends_with("'TRIGGER']")));
    }

    #[test]
    fn shutdown_marks_app_end_last() {
        let (mut console, sink, _) = console(&quick_config(10));
        console.handle(Action::Trigger);
        console.shutdown();
        assert_eq!(sink.messages(), [APP_START, "TRIGGER", APP_END]);
    }
}
