//! Cycle scheduler and activation edge detector.
//!
//! A single free-running millisecond clock drives two alternating half-cycle
//! events: a heartbeat, then a probe carrying the sampled meatbag signal.
//! Independently, the activation switch toggles whether the operator is
//! currently transcribing. Probes are only reported while transcribing.
//!
//! [`Transcriber::poll`] is pure with respect to hardware: the caller samples
//! the pins and the clock, the transcriber decides what to emit.

use heapless::Vec;

use crate::config::EVENT_TIMESPAN;
use crate::event::{Event, Level};

/// At most one scheduler event and one activation event per poll.
pub const MAX_EVENTS_PER_POLL: usize = 2;

pub type Emission = Vec<Event, MAX_EVENTS_PER_POLL>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Last event was a probe (or nothing yet), a heartbeat is due next.
    ProbePending,
    /// Last event was a heartbeat, a probe is due next.
    HeartbeatFired,
}

/// What to do when the probe slot comes up while nobody is transcribing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SkippedProbePolicy {
    /// Fill the slot with a heartbeat, one heartbeat per half-cycle.
    #[default]
    Heartbeat,
    /// Let the slot pass without output, one heartbeat per cycle.
    Skip,
    /// Keep waiting for the probe, no heartbeat fires until transcription resumes.
    Hold,
}

/// Pin levels sampled at the start of a poll.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Inputs {
    pub activation: Level,
    pub signal: Level,
}

impl Inputs {
    pub fn new(activation: Level, signal: Level) -> Self {
        Self { activation, signal }
    }
}

enum Step {
    Heartbeat,
    Probe,
    FillProbe,
    SkipProbe,
    Idle,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transcriber {
    phase: Phase,
    last_transition: u32,
    transcribing: bool,
    policy: SkippedProbePolicy,
}

impl Default for Transcriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcriber {
    pub fn new() -> Self {
        Self::with_policy(SkippedProbePolicy::default())
    }

    pub fn with_policy(policy: SkippedProbePolicy) -> Self {
        Transcriber {
            phase: Phase::ProbePending,
            last_transition: 0,
            transcribing: false,
            policy,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_transcribing(&self) -> bool {
        self.transcribing
    }

    pub fn last_transition(&self) -> u32 {
        self.last_transition
    }

    pub fn policy(&self) -> SkippedProbePolicy {
        self.policy
    }

    /// Advances the state machine by one poll and returns the events to send,
    /// scheduler event first.
    pub fn poll(&mut self, now_ms: u32, inputs: Inputs) -> Emission {
        let mut emission = Emission::new();

        if let Some(event) = self.schedule(now_ms, inputs.signal) {
            let _ = emission.push(event);
        }
        if let Some(event) = self.detect_activation(inputs.activation) {
            let _ = emission.push(event);
        }

        emission
    }

    fn schedule(&mut self, now_ms: u32, signal: Level) -> Option<Event> {
        // the clock wraps, unsigned difference still yields the elapsed time
        let elapsed = now_ms.wrapping_sub(self.last_transition);
        let due = elapsed > EVENT_TIMESPAN;

        let step = match (self.phase, self.transcribing, due) {
            (_, _, false) => Step::Idle,
            (Phase::ProbePending, _, true) => Step::Heartbeat,
            (Phase::HeartbeatFired, true, true) => Step::Probe,
            (Phase::HeartbeatFired, false, true) => match self.policy {
                SkippedProbePolicy::Heartbeat => Step::FillProbe,
                SkippedProbePolicy::Skip => Step::SkipProbe,
                SkippedProbePolicy::Hold => Step::Idle,
            },
        };

        match step {
            Step::Heartbeat => {
                self.transition(now_ms, Phase::HeartbeatFired);
                debug!("Cycle> heartbeat at {} ms (elapsed {} ms)", now_ms, elapsed);
                Some(Event::Heartbeat)
            }
            Step::Probe => {
                self.transition(now_ms, Phase::ProbePending);
                debug!("Cycle> probe {:?} at {} ms (elapsed {} ms)", signal, now_ms, elapsed);
                Some(Event::Probe(signal))
            }
            Step::FillProbe => {
                self.transition(now_ms, Phase::ProbePending);
                debug!("Cycle> heartbeat in probe slot at {} ms, not transcribing", now_ms);
                Some(Event::Heartbeat)
            }
            Step::SkipProbe => {
                self.transition(now_ms, Phase::ProbePending);
                trace!("Cycle> probe slot skipped at {} ms, not transcribing", now_ms);
                None
            }
            Step::Idle => None,
        }
    }

    fn transition(&mut self, now_ms: u32, phase: Phase) {
        self.last_transition = now_ms;
        self.phase = phase;
    }

    fn detect_activation(&mut self, activation: Level) -> Option<Event> {
        match (self.transcribing, activation) {
            (true, Level::Low) => {
                self.transcribing = false;
                info!("Meatbag> deactivated");
                Some(Event::Deactivate)
            }
            (false, Level::High) => {
                self.transcribing = true;
                info!("Meatbag> activated");
                Some(Event::Activate)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::vec::Vec;

    use super::*;

    const ACTIVE_HIGH: Inputs = Inputs {
        activation: Level::High,
        signal: Level::High,
    };
    const IDLE: Inputs = Inputs {
        activation: Level::Low,
        signal: Level::Low,
    };

    fn run(transcriber: &mut Transcriber, script: &[(u32, Inputs)]) -> Vec<(u32, Event)> {
        script
            .iter()
            .flat_map(|(now, inputs)| transcriber.poll(*now, *inputs).into_iter().map(move |event| (*now, event)))
            .collect()
    }

    fn every_ms(until: u32, inputs: Inputs) -> Vec<(u32, Inputs)> {
        (0..=until).map(|now| (now, inputs)).collect()
    }

    #[test]
    fn initial_state() {
        let transcriber = Transcriber::new();
        assert_eq!(transcriber.phase(), Phase::ProbePending);
        assert_eq!(transcriber.last_transition(), 0);
        assert!(!transcriber.is_transcribing());
        assert_eq!(transcriber.policy(), SkippedProbePolicy::Heartbeat);
    }

    #[test]
    fn activation_then_cycle() {
        let mut transcriber = Transcriber::new();
        let events = run(&mut transcriber, &[(0, ACTIVE_HIGH), (130, ACTIVE_HIGH), (260, ACTIVE_HIGH), (390, ACTIVE_HIGH)]);
        assert_eq!(
            events,
            [
                (0, Event::Activate),
                (130, Event::Heartbeat),
                (260, Event::Probe(Level::High)),
                (390, Event::Heartbeat),
            ]
        );
        assert_eq!(transcriber.phase(), Phase::HeartbeatFired);
        assert_eq!(transcriber.last_transition(), 390);
    }

    #[test]
    fn threshold_is_strict() {
        let mut transcriber = Transcriber::new();
        assert!(transcriber.poll(EVENT_TIMESPAN, IDLE).is_empty());
        assert_eq!(transcriber.poll(EVENT_TIMESPAN + 1, IDLE).as_slice(), [Event::Heartbeat]);
    }

    #[test]
    fn probe_carries_sampled_signal() {
        let mut transcriber = Transcriber::new();
        let low_signal = Inputs::new(Level::High, Level::Low);
        let events = run(&mut transcriber, &[(0, low_signal), (126, low_signal), (252, low_signal), (378, low_signal), (504, ACTIVE_HIGH)]);
        assert_eq!(
            events,
            [
                (0, Event::Activate),
                (126, Event::Heartbeat),
                (252, Event::Probe(Level::Low)),
                (378, Event::Heartbeat),
                (504, Event::Probe(Level::High)),
            ]
        );
    }

    #[test]
    fn events_alternate_and_respect_timespan() {
        let mut transcriber = Transcriber::new();
        let events = run(&mut transcriber, &every_ms(5_000, ACTIVE_HIGH));
        let cycle: Vec<_> = events.iter().filter(|(_, event)| !matches!(event, Event::Activate | Event::Deactivate)).collect();
        assert!(cycle.len() > 10);
        for pair in cycle.windows(2) {
            let (t0, e0) = pair[0];
            let (t1, e1) = pair[1];
            assert!(t1 - t0 > EVENT_TIMESPAN);
            match (e0, e1) {
                (Event::Heartbeat, Event::Probe(_)) | (Event::Probe(_), Event::Heartbeat) => {}
                other => panic!("events out of phase: {:?}", other),
            }
        }
    }

    #[test]
    fn no_probes_while_inactive() {
        let mut transcriber = Transcriber::new();
        let events = run(&mut transcriber, &every_ms(5_000, Inputs::new(Level::Low, Level::High)));
        assert!(!events.is_empty());
        assert!(events.iter().all(|(_, event)| *event == Event::Heartbeat));
    }

    #[test]
    fn heartbeats_every_half_cycle_while_inactive() {
        let mut transcriber = Transcriber::new();
        let events = run(&mut transcriber, &[(0, IDLE), (130, IDLE), (260, IDLE), (390, IDLE), (520, IDLE)]);
        assert_eq!(
            events,
            [(130, Event::Heartbeat), (260, Event::Heartbeat), (390, Event::Heartbeat), (520, Event::Heartbeat)]
        );
        // the phase marker still alternates underneath
        assert_eq!(transcriber.phase(), Phase::ProbePending);
        assert_eq!(transcriber.last_transition(), 520);

        let events = run(&mut transcriber, &every_ms(3_000, IDLE).into_iter().map(|(t, i)| (t + 521, i)).collect::<Vec<_>>());
        assert!(events.len() > 20);
        for pair in events.windows(2) {
            let interval = pair[1].0 - pair[0].0;
            // polled every millisecond
            assert!(interval > EVENT_TIMESPAN && interval <= EVENT_TIMESPAN + 1);
        }
    }

    #[test]
    fn skip_policy_keeps_heartbeats_once_per_cycle() {
        let mut transcriber = Transcriber::with_policy(SkippedProbePolicy::Skip);
        let events = run(&mut transcriber, &[(0, IDLE), (130, IDLE), (260, IDLE), (390, IDLE), (520, IDLE)]);
        assert_eq!(events, [(130, Event::Heartbeat), (390, Event::Heartbeat)]);
        assert_eq!(transcriber.phase(), Phase::ProbePending);
        assert_eq!(transcriber.last_transition(), 520);

        let events = run(&mut transcriber, &every_ms(3_000, IDLE).into_iter().map(|(t, i)| (t + 521, i)).collect::<Vec<_>>());
        for pair in events.windows(2) {
            assert!(pair[1].0 - pair[0].0 > 2 * EVENT_TIMESPAN);
        }
    }

    #[test]
    fn hold_policy_waits_for_transcription() {
        let mut transcriber = Transcriber::with_policy(SkippedProbePolicy::Hold);
        let events = run(&mut transcriber, &[(0, IDLE), (130, IDLE), (260, IDLE), (390, IDLE), (1_000, IDLE)]);
        assert_eq!(events, [(130, Event::Heartbeat)]);
        assert_eq!(transcriber.phase(), Phase::HeartbeatFired);
        assert_eq!(transcriber.last_transition(), 130);

        // activating releases the held probe on the next poll
        let events = run(&mut transcriber, &[(1_001, ACTIVE_HIGH), (1_002, ACTIVE_HIGH), (1_128, ACTIVE_HIGH)]);
        assert_eq!(
            events,
            [(1_001, Event::Activate), (1_002, Event::Probe(Level::High)), (1_128, Event::Heartbeat)]
        );
    }

    #[test]
    fn activation_edges_fire_once() {
        let mut transcriber = Transcriber::new();
        let high = Inputs::new(Level::High, Level::Low);
        let low = IDLE;
        let events = run(&mut transcriber, &[(0, high), (1, high), (2, high), (3, low), (4, low), (5, high), (6, low)]);
        assert_eq!(
            events,
            [
                (0, Event::Activate),
                (3, Event::Deactivate),
                (5, Event::Activate),
                (6, Event::Deactivate),
            ]
        );
        assert!(!transcriber.is_transcribing());
    }

    #[test]
    fn deactivation_stops_probes_not_heartbeats() {
        let mut transcriber = Transcriber::new();
        let mut script = Vec::new();
        script.extend(every_ms(1_000, ACTIVE_HIGH));
        script.extend(every_ms(2_000, IDLE).into_iter().map(|(t, i)| (t + 1_001, i)));
        let events = run(&mut transcriber, &script);

        let deactivations: Vec<_> = events.iter().filter(|(_, event)| *event == Event::Deactivate).collect();
        assert_eq!(deactivations, [&(1_001, Event::Deactivate)]);

        let after: Vec<_> = events.iter().filter(|(t, _)| *t > 1_001).collect();
        assert!(after.iter().any(|(_, event)| *event == Event::Heartbeat));
        assert!(after.iter().all(|(_, event)| !matches!(event, Event::Probe(_))));
        let before = events.iter().filter(|(t, event)| *t <= 1_001 && matches!(event, Event::Probe(_))).count();
        assert!(before > 0);
    }

    #[test]
    fn scheduler_and_activation_in_same_poll() {
        let mut transcriber = Transcriber::new();
        transcriber.poll(0, IDLE);
        let emission = transcriber.poll(200, ACTIVE_HIGH);
        assert_eq!(emission.as_slice(), [Event::Heartbeat, Event::Activate]);
    }

    #[test]
    fn probe_uses_flag_from_before_deactivation() {
        let mut transcriber = Transcriber::new();
        transcriber.poll(0, ACTIVE_HIGH);
        transcriber.poll(130, ACTIVE_HIGH);
        let emission = transcriber.poll(260, Inputs::new(Level::Low, Level::High));
        assert_eq!(emission.as_slice(), [Event::Probe(Level::High), Event::Deactivate]);
    }

    #[test]
    fn elapsed_survives_clock_wraparound() {
        let mut transcriber = Transcriber::new();
        transcriber.poll(u32::MAX - 200, IDLE);
        assert_eq!(transcriber.last_transition(), u32::MAX - 200);
        assert!(transcriber.poll(u32::MAX - 100, IDLE).is_empty());
        // 5 ms past the wrap is 205 ms after the heartbeat
        let emission = transcriber.poll(4, IDLE);
        assert_eq!(emission.as_slice(), [Event::Heartbeat]);
        assert_eq!(transcriber.phase(), Phase::ProbePending);
        assert_eq!(transcriber.last_transition(), 4);
    }
}
