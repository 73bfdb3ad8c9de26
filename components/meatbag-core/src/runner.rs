use embassy_futures::yield_now;
use embassy_time::Instant;
use embedded_hal::digital::InputPin;
use embedded_io_async::{Error, Write};

use crate::event::Level;
use crate::transcriber::{Emission, Inputs, SkippedProbePolicy, Transcriber};

/// Free-running millisecond counter, wraps like any 32-bit tick count.
pub trait Clock {
    fn now_ms(&mut self) -> u32;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&mut self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

pub struct Runner<Sink: Write, Activation: InputPin, Signal: InputPin, Clk: Clock> {
    sink: Sink,
    activation_pin: Activation,
    signal_pin: Signal,
    clock: Clk,
    transcriber: Transcriber,
}

pub fn new<Sink: Write, Activation: InputPin, Signal: InputPin, Clk: Clock>(
    sink: Sink,
    activation_pin: Activation,
    signal_pin: Signal,
    clock: Clk,
) -> Runner<Sink, Activation, Signal, Clk> {
    Runner {
        sink,
        activation_pin,
        signal_pin,
        clock,
        transcriber: Transcriber::new(),
    }
}

impl<Sink: Write, Activation: InputPin, Signal: InputPin, Clk: Clock> Runner<Sink, Activation, Signal, Clk> {
    pub fn with_policy(mut self, policy: SkippedProbePolicy) -> Self {
        self.transcriber = Transcriber::with_policy(policy);
        self
    }

    pub fn transcriber(&self) -> &Transcriber {
        &self.transcriber
    }

    pub async fn run(mut self) -> ! {
        info!("Transcriber> running, policy {:?}", self.transcriber.policy());
        loop {
            self.run_once().await;
            yield_now().await;
        }
    }

    /// One poll: sample, advance the state machine, write whatever it emitted.
    pub async fn run_once(&mut self) -> Emission {
        let inputs = Inputs {
            activation: sample(&mut self.activation_pin, "activation"),
            signal: sample(&mut self.signal_pin, "signal"),
        };
        let now = self.clock.now_ms();
        let emission = self.transcriber.poll(now, inputs);

        for event in emission.iter() {
            trace!("Serial> {:?}", event);
            // best effort, a lost event is never re-sent
            if let Err(e) = self.sink.write_all(&event.encode()).await {
                warn!("Serial> write of {:?} failed: {:?}", event, e.kind());
            }
        }

        emission
    }
}

fn sample<P: InputPin>(pin: &mut P, name: &'static str) -> Level {
    match pin.is_high() {
        Ok(high) => Level::from(high),
        Err(_) => {
            warn!("Pin> {} read failed, assuming low", name);
            Level::Low
        }
    }
}
