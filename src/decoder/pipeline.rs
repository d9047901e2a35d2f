//! Hook tracker, pulse decoder and digit buffer composed into one tick
//!
//! Pure with respect to time: the caller supplies `now`, so the whole
//! pipeline runs identically on the sampler thread and in tests.

use std::time::Instant;

use tracing::{debug, info};

use super::buffer::DigitBuffer;
use super::hook::{HookState, HookTracker, SharedHook};
use super::pulse::PulseDecoder;
use crate::config::{HardwareConfig, TimingConfig};
use crate::events::PhoneEvent;
use crate::hardware::RawSample;

pub struct DialPipeline {
    hook: HookTracker,
    pulses: PulseDecoder,
    digits: DigitBuffer,
}

impl DialPipeline {
    /// Build the pipeline around the first raw sample
    pub fn new(
        shared: SharedHook,
        first: RawSample,
        now: Instant,
        hardware: &HardwareConfig,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            hook: HookTracker::new(
                shared,
                first.hook,
                now,
                hardware.hook_lifted_level,
                timing.hook_stable(),
                timing.ghost_lockout(),
            ),
            pulses: PulseDecoder::new(first.dial, timing.pulse_debounce(), timing.digit_gap()),
            digits: DigitBuffer::new(timing.max_digits, timing.number_idle()),
        }
    }

    pub fn hook_state(&self) -> HookState {
        self.hook.state()
    }

    /// Process one sample and return the events it produced, in order
    pub fn tick(&mut self, now: Instant, sample: RawSample) -> Vec<PhoneEvent> {
        let mut events = Vec::new();

        match self.hook.update(now, sample.hook) {
            Some(HookState::Lifted) => {
                info!("handset lifted");
                self.pulses.reset();
                events.push(PhoneEvent::HookChanged { lifted: true });
            }
            Some(HookState::Replaced) => {
                info!("handset replaced");
                // Submit a partially dialed number rather than lose it
                if let Some(number) = self.digits.flush() {
                    info!(number, "flushing partial number on hangup");
                    events.push(PhoneEvent::NumberDialed { number });
                }
                self.digits.clear();
                if self.pulses.count() > 0 {
                    debug!(pulses = self.pulses.count(), "partial digit discarded on hangup");
                }
                self.pulses.reset();
                events.push(PhoneEvent::HookChanged { lifted: false });
            }
            None => {}
        }

        if !self.hook.state().is_lifted() || self.hook.in_lockout(now) {
            self.pulses.hold(sample.dial);
        } else if let Some(digit) = self.pulses.update(now, sample.dial) {
            debug!(digit, buffered = ?self.digits.digits(), "digit buffered");
            if let Some(number) = self.digits.push(digit, now) {
                events.push(PhoneEvent::NumberDialed { number });
            }
        }

        if let Some(number) = self.digits.poll(now) {
            events.push(PhoneEvent::NumberDialed { number });
        }

        events
    }
}
