//! Hardware module for the phone's digital lines
//!
//! Polls the hook switch and rotary pulse contact on a dedicated thread
//! and drives the mechanical bell.

mod bell;
mod lines;
mod sampler;

pub use bell::{Bell, GpioBell, SilentBell};
pub use lines::{RawSample, SysfsLines};
#[cfg(test)]
pub use lines::LineError;
pub use sampler::Sampler;
