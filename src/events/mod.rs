//! Events module for the decoding pipeline
//!
//! Provides the two semantic event kinds produced from the phone's lines
//! and the dispatcher that carries them to the session controller.

mod dispatcher;

use serde::{Deserialize, Serialize};

pub use dispatcher::{channel, Dispatcher, Subscription};

/// Events emitted by the decoding pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PhoneEvent {
    /// Debounced hook switch transition
    HookChanged {
        /// True when the handset was lifted
        lifted: bool,
    },

    /// A complete number was flushed from the digit buffer
    NumberDialed {
        /// Digits concatenated in dial order
        number: u32,
    },
}

impl std::fmt::Display for PhoneEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhoneEvent::HookChanged { lifted: true } => write!(f, "HOOK_LIFTED"),
            PhoneEvent::HookChanged { lifted: false } => write!(f, "HOOK_REPLACED"),
            PhoneEvent::NumberDialed { number } => write!(f, "NUMBER_DIALED ({})", number),
        }
    }
}
