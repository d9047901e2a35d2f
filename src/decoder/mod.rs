//! Signal decoding module
//!
//! Turns raw hook and dial samples into clean semantic events:
//! - Hook tracker: 200ms debounce plus ghost-pulse lockout after a lift
//! - Pulse decoder: debounced rising edges, digit on dial return
//! - Digit buffer: flush on the 4th digit, after idle, or on hangup

mod buffer;
mod hook;
mod pipeline;
mod pulse;

pub use hook::{HookState, SharedHook};
pub use pipeline::DialPipeline;
