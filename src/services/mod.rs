//! Collaborator seams for speech, dialogue and music
//!
//! The session controller only talks to these traits. Every call is a
//! potential suspension point and every failure is swallowed by the caller.

mod offline;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::VoiceProfile;
use crate::hardware::Bell;
use crate::session::Language;

pub use offline::{ConsoleSpeech, LogMusic, OfflineBrain};

/// Failure of an external collaborator
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("{service} unavailable: {reason}")]
    Unavailable { service: &'static str, reason: String },

    #[error("{service} failed: {reason}")]
    Failed { service: &'static str, reason: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Pre-recorded handset sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    DialTone,
    Click,
    StaticLong,
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tone::DialTone => write!(f, "dial_tone"),
            Tone::Click => write!(f, "click"),
            Tone::StaticLong => write!(f, "static_long"),
        }
    }
}

/// How an utterance should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Music,
    Chat,
}

/// What to search the music catalogue for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Track,
    Album,
    Artist,
    Playlist,
}

impl SearchKind {
    /// Kinds to try in order when searching for this kind
    pub fn attempts(self) -> [SearchKind; 2] {
        match self {
            SearchKind::Track => [SearchKind::Track, SearchKind::Playlist],
            SearchKind::Album => [SearchKind::Album, SearchKind::Playlist],
            SearchKind::Artist => [SearchKind::Artist, SearchKind::Playlist],
            SearchKind::Playlist => [SearchKind::Playlist, SearchKind::Track],
        }
    }
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchKind::Track => write!(f, "track"),
            SearchKind::Album => write!(f, "album"),
            SearchKind::Artist => write!(f, "artist"),
            SearchKind::Playlist => write!(f, "playlist"),
        }
    }
}

/// Result of turning an utterance into a catalogue search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicRequest {
    Search { query: String, kind: SearchKind },
    /// Generic "play something"; use the era default
    Default,
}

/// Handset audio: tones, synthesis, capture
#[async_trait]
pub trait Speech: Send + Sync {
    /// Play a stored tone, optionally waiting for it to finish
    async fn play_tone(&self, tone: Tone, blocking: bool) -> ServiceResult<()>;

    /// Synthesize and play `text`; returns when playback finishes
    async fn speak(&self, text: &str, voice: &VoiceProfile) -> ServiceResult<()>;

    /// Capture and transcribe; empty string means nothing was heard
    async fn listen(&self, max: Duration) -> ServiceResult<String>;

    /// Stop whatever the handset is playing
    async fn stop_playback(&self) -> ServiceResult<()>;
}

/// Dialogue and intent services
#[async_trait]
pub trait Brain: Send + Sync {
    async fn classify_intent(&self, text: &str) -> ServiceResult<Intent>;

    async fn era_intro(&self, year: u16, language: Language) -> ServiceResult<String>;

    async fn chat_turn(&self, text: &str, year: u16, language: Language) -> ServiceResult<String>;

    /// Reply in the operator persona
    async fn operator_reply(&self, text: &str, language: Language) -> ServiceResult<String>;

    async fn music_search_query(
        &self,
        text: &str,
        year: u16,
        language: Language,
    ) -> ServiceResult<MusicRequest>;

    async fn play_confirmation(
        &self,
        year: u16,
        query: &str,
        language: Language,
    ) -> ServiceResult<String>;

    /// Seconds requested in `text`, `None` if no positive duration was found
    async fn parse_timer_duration(&self, text: &str) -> ServiceResult<Option<u64>>;
}

/// Music playback
#[async_trait]
pub trait Music: Send + Sync {
    /// Search and start the first hit; false if nothing matched
    async fn search_and_play(&self, query: &str, kind: SearchKind) -> ServiceResult<bool>;

    async fn play_playlist(&self, uri: &str) -> ServiceResult<()>;

    async fn pause(&self) -> ServiceResult<()>;
}

/// Everything the session controller calls out to
#[derive(Clone)]
pub struct Services {
    pub speech: Arc<dyn Speech>,
    pub brain: Arc<dyn Brain>,
    pub music: Arc<dyn Music>,
    pub bell: Arc<dyn Bell>,
}
