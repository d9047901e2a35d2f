//! Rotary pulse counting
//!
//! Counts debounced rising edges on the dial contact. A digit ends when the
//! line has been quiet for the return gap.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

pub struct PulseDecoder {
    count: u8,
    last_level: bool,
    last_edge: Option<Instant>,
    min_spacing: Duration,
    digit_gap: Duration,
}

impl PulseDecoder {
    pub fn new(initial_level: bool, min_spacing: Duration, digit_gap: Duration) -> Self {
        Self {
            count: 0,
            last_level: initial_level,
            last_edge: None,
            min_spacing,
            digit_gap,
        }
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    /// Drop any partial digit
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Track the line level without counting (on-hook or lockout)
    pub fn hold(&mut self, level: bool) {
        self.count = 0;
        self.last_level = level;
    }

    /// Feed one sample; returns a digit once the dial has returned
    pub fn update(&mut self, now: Instant, level: bool) -> Option<u8> {
        let rising = level && !self.last_level;
        self.last_level = level;

        if rising {
            // An edge exactly `min_spacing` after the last one still counts
            let spaced = self
                .last_edge
                .map_or(true, |at| now.saturating_duration_since(at) >= self.min_spacing);
            if spaced {
                self.count = self.count.saturating_add(1);
                self.last_edge = Some(now);
            }
        }

        let last_edge = self.last_edge?;
        if self.count == 0 || now.saturating_duration_since(last_edge) < self.digit_gap {
            return None;
        }

        let digit = digit_for(self.count);
        debug!(pulses = self.count, digit, "digit decoded");
        self.count = 0;
        Some(digit)
    }
}

/// Ten pulses is zero; anything above ten is a decoder defect
pub fn digit_for(count: u8) -> u8 {
    match count {
        1..=9 => count,
        10 => 0,
        _ => {
            warn!(count, "impossible pulse count, clamping to 0");
            0
        }
    }
}
