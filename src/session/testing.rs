//! Recording collaborators for session tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::VoiceProfile;
use crate::decoder::{HookState, SharedHook};
use crate::hardware::{Bell, LineError};
use crate::services::{Brain, Intent, Music, MusicRequest, SearchKind, ServiceError, ServiceResult, Speech, Tone};
use crate::session::Language;

/// Every collaborator call, in order
#[derive(Debug, Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    /// Calls without the background static loop
    pub fn calls(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c != "tone:static_long")
            .cloned()
            .collect()
    }

    /// Occurrences of one exact call, background calls included
    pub fn count(&self, call: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }
}

pub struct MockSpeech {
    log: Arc<CallLog>,
    heard: Mutex<VecDeque<String>>,
    /// Listening puts the handset down
    hangup: Option<SharedHook>,
    /// Listening never returns
    stall: bool,
}

impl MockSpeech {
    pub fn new(log: Arc<CallLog>, heard: &[&str]) -> Self {
        Self {
            log,
            heard: Mutex::new(heard.iter().map(|s| s.to_string()).collect()),
            hangup: None,
            stall: false,
        }
    }

    pub fn hangs_up_while_listening(mut self, hook: SharedHook) -> Self {
        self.hangup = Some(hook);
        self
    }

    pub fn stalls_while_listening(mut self) -> Self {
        self.stall = true;
        self
    }
}

#[async_trait]
impl Speech for MockSpeech {
    async fn play_tone(&self, tone: Tone, _blocking: bool) -> ServiceResult<()> {
        self.log.push(format!("tone:{tone}"));
        Ok(())
    }

    async fn speak(&self, text: &str, voice: &VoiceProfile) -> ServiceResult<()> {
        self.log.push(format!("speak:{}:{text}", voice.voice_id));
        Ok(())
    }

    async fn listen(&self, _max: Duration) -> ServiceResult<String> {
        self.log.push("listen");
        if let Some(hook) = &self.hangup {
            hook.set(HookState::Replaced);
        }
        if self.stall {
            std::future::pending::<()>().await;
        }
        Ok(self.heard.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn stop_playback(&self) -> ServiceResult<()> {
        self.log.push("stop_playback");
        Ok(())
    }
}

pub struct MockBrain {
    log: Arc<CallLog>,
    intents: Mutex<VecDeque<Intent>>,
    request: MusicRequest,
    /// Every dialogue call fails
    offline: bool,
}

impl MockBrain {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            intents: Mutex::new(VecDeque::new()),
            request: MusicRequest::Default,
            offline: false,
        }
    }

    pub fn with_intents(self, intents: &[Intent]) -> Self {
        *self.intents.lock().unwrap() = intents.iter().copied().collect();
        self
    }

    pub fn with_request(mut self, request: MusicRequest) -> Self {
        self.request = request;
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    fn reply(&self, text: &str) -> ServiceResult<String> {
        if self.offline {
            return Err(ServiceError::Unavailable {
                service: "brain",
                reason: "offline".to_string(),
            });
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl Brain for MockBrain {
    async fn classify_intent(&self, text: &str) -> ServiceResult<Intent> {
        self.log.push(format!("intent:{text}"));
        Ok(self.intents.lock().unwrap().pop_front().unwrap_or(Intent::Chat))
    }

    async fn era_intro(&self, year: u16, _language: Language) -> ServiceResult<String> {
        self.log.push(format!("intro:{year}"));
        self.reply("Live from the ballroom!")
    }

    async fn chat_turn(&self, text: &str, year: u16, _language: Language) -> ServiceResult<String> {
        self.log.push(format!("chat:{year}:{text}"));
        self.reply("Everyone is talking about it.")
    }

    async fn operator_reply(&self, text: &str, _language: Language) -> ServiceResult<String> {
        self.log.push(format!("operator:{text}"));
        self.reply("One moment, caller.")
    }

    async fn music_search_query(
        &self,
        text: &str,
        year: u16,
        _language: Language,
    ) -> ServiceResult<MusicRequest> {
        self.log.push(format!("query:{year}:{text}"));
        Ok(self.request.clone())
    }

    async fn play_confirmation(
        &self,
        _year: u16,
        _query: &str,
        _language: Language,
    ) -> ServiceResult<String> {
        self.log.push("confirm");
        self.reply("Spinning it now!")
    }

    async fn parse_timer_duration(&self, text: &str) -> ServiceResult<Option<u64>> {
        self.log.push(format!("timer:{text}"));
        Ok(None)
    }
}

pub struct MockMusic {
    log: Arc<CallLog>,
    finds: bool,
}

impl MockMusic {
    pub fn new(log: Arc<CallLog>, finds: bool) -> Self {
        Self { log, finds }
    }
}

#[async_trait]
impl Music for MockMusic {
    async fn search_and_play(&self, query: &str, kind: SearchKind) -> ServiceResult<bool> {
        self.log.push(format!("search:{kind}:{query}"));
        Ok(self.finds)
    }

    async fn play_playlist(&self, uri: &str) -> ServiceResult<()> {
        self.log.push(format!("playlist:{uri}"));
        Ok(())
    }

    async fn pause(&self) -> ServiceResult<()> {
        self.log.push("pause");
        Ok(())
    }
}

#[derive(Default)]
pub struct MockBell {
    pub rings: Mutex<Vec<Duration>>,
}

impl Bell for MockBell {
    fn ring(&self, duration: Duration) -> Result<(), LineError> {
        self.rings.lock().unwrap().push(duration);
        Ok(())
    }
}
