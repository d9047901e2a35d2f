//! Session state and dial classification

use std::time::Duration;

/// Conversation language, toggled by dialing 9
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    En,
    Cz,
}

impl Language {
    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Cz,
            Language::Cz => Language::En,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::En => write!(f, "EN"),
            Language::Cz => write!(f, "CZ"),
        }
    }
}

/// Lives for the whole process; only the controller writes it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub language: Language,
    pub selected_year: Option<u16>,
}

/// What a dialed number asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Idle,
    LanguageToggle,
    TimerSetup,
    OperatorCall,
    EraVisit {
        year: u16,
        /// Decade shortcut: skip narration, straight to music
        direct: bool,
    },
}

pub const LANGUAGE_NUMBER: u32 = 9;
pub const TIMER_NUMBER: u32 = 666;
pub const OPERATOR_NUMBER: u32 = 0;
pub const FIRST_YEAR: u32 = 1900;
pub const LAST_YEAR: u32 = 2030;

impl InteractionMode {
    pub fn classify(number: u32) -> Self {
        match number {
            LANGUAGE_NUMBER => InteractionMode::LanguageToggle,
            TIMER_NUMBER => InteractionMode::TimerSetup,
            OPERATOR_NUMBER => InteractionMode::OperatorCall,
            1..=8 => InteractionMode::EraVisit {
                year: 1900 + number as u16 * 10,
                direct: true,
            },
            FIRST_YEAR..=LAST_YEAR => InteractionMode::EraVisit {
                year: number as u16,
                direct: false,
            },
            _ => InteractionMode::Idle,
        }
    }
}

impl std::fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionMode::Idle => write!(f, "Idle"),
            InteractionMode::LanguageToggle => write!(f, "LanguageToggle"),
            InteractionMode::TimerSetup => write!(f, "TimerSetup"),
            InteractionMode::OperatorCall => write!(f, "OperatorCall"),
            InteractionMode::EraVisit { year, direct } => {
                write!(f, "EraVisit({}, direct={})", year, direct)
            }
        }
    }
}

/// How a mode finished when it was not cancelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeOutcome {
    LanguageSet(Language),
    TimerScheduled(Duration),
    TimerNotSet,
    /// Operator hung up on silence
    Disconnected,
    Playing(Playback),
}

/// What ended up on the music player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    /// A specific search started playing
    Requested { query: String },
    /// The decade's default playlist
    EraPlaylist { decade: u16 },
    /// No playlist configured for the decade
    Nothing,
}
