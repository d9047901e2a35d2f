//! Accumulates decoded digits into a dialed number

use std::time::{Duration, Instant};

/// Ordered digits awaiting a flush. Never holds more than `max_len` digits.
pub struct DigitBuffer {
    digits: Vec<u8>,
    last_append: Option<Instant>,
    max_len: usize,
    idle_flush: Duration,
}

impl DigitBuffer {
    pub fn new(max_len: usize, idle_flush: Duration) -> Self {
        Self {
            digits: Vec::with_capacity(max_len),
            last_append: None,
            max_len,
            idle_flush,
        }
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Append a digit; flushes immediately when the buffer becomes full
    pub fn push(&mut self, digit: u8, now: Instant) -> Option<u32> {
        self.digits.push(digit);
        self.last_append = Some(now);
        if self.digits.len() >= self.max_len {
            self.flush()
        } else {
            None
        }
    }

    /// Flush if the user has stopped dialing
    pub fn poll(&mut self, now: Instant) -> Option<u32> {
        let last = self.last_append?;
        if !self.is_empty() && now.saturating_duration_since(last) >= self.idle_flush {
            self.flush()
        } else {
            None
        }
    }

    /// Emit whatever has been dialed. Empty buffer is a no-op.
    pub fn flush(&mut self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        let number = number_from(&self.digits);
        self.clear();
        Some(number)
    }

    pub fn clear(&mut self) {
        self.digits.clear();
        self.last_append = None;
    }
}

/// Digits in dial order, first digit most significant
pub fn number_from(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0u32, |value, &digit| value * 10 + u32::from(digit))
}
