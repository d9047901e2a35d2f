//! Interaction mode handlers
//!
//! Each handler runs to completion or returns [`Aborted`] the moment a
//! checkpoint sees the handset down. Collaborator failures never escape:
//! they become a spoken fallback, a default value, or nothing at all.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cancel::{Aborted, Checkpoint};
use super::phrases::{era_welcome, phrase, timer_set, Phrase};
use super::state::{InteractionMode, Language, ModeOutcome, Playback, SessionState};
use crate::config::{decade_of, Config, VoiceProfile};
use crate::hardware::Bell;
use crate::services::{Intent, MusicRequest, SearchKind, ServiceResult, Services, Speech, Tone};

/// Era the operator searches in when asked for music
const OPERATOR_ERA: u16 = 1950;

/// Requests shorter than this are treated as "just play something"
const SPECIFIC_REQUEST_MIN_CHARS: usize = 10;

const OPERATOR_CONNECT_PAUSE: Duration = Duration::from_secs(1);
const INTRO_GAP: Duration = Duration::from_millis(500);

/// Shortest period between static replays when a tone returns early
const STATIC_MIN_PERIOD: Duration = Duration::from_millis(250);

/// Everything a running mode may touch
pub(crate) struct Interaction<'a> {
    pub session: &'a mut SessionState,
    pub services: &'a Services,
    pub config: &'a Config,
    pub checkpoint: Checkpoint,
}

/// Run `mode` until it finishes or the handset goes down
pub(crate) async fn run(
    mode: InteractionMode,
    mut ix: Interaction<'_>,
) -> Result<ModeOutcome, Aborted> {
    match mode {
        InteractionMode::Idle => Err(Aborted),
        InteractionMode::LanguageToggle => toggle_language(&mut ix).await,
        InteractionMode::TimerSetup => timer_setup(&mut ix).await,
        InteractionMode::OperatorCall => operator_call(&mut ix).await,
        InteractionMode::EraVisit { year, direct } => era_visit(&mut ix, year, direct).await,
    }
}

async fn toggle_language(ix: &mut Interaction<'_>) -> Result<ModeOutcome, Aborted> {
    let language = ix.session.language.toggled();
    ix.session.language = language;
    info!(%language, "language set");

    let config = ix.config;
    ix.speak(phrase(language, Phrase::LanguageSwitched), &config.voices.operator)
        .await?;
    Ok(ModeOutcome::LanguageSet(language))
}

async fn timer_setup(ix: &mut Interaction<'_>) -> Result<ModeOutcome, Aborted> {
    let config = ix.config;
    let voice = &config.voices.operator;
    let language = ix.language();

    ix.speak(phrase(language, Phrase::TimerPrompt), voice).await?;
    let heard = ix.listen(config.timing.timer_listen()).await?;
    if heard.is_empty() {
        ix.speak(phrase(language, Phrase::TimerNoDuration), voice).await?;
        return Ok(ModeOutcome::TimerNotSet);
    }

    let brain = Arc::clone(&ix.services.brain);
    let seconds = ix
        .call("timer parse", brain.parse_timer_duration(&heard))
        .await?
        .flatten()
        .filter(|&s| s > 0);

    let Some(seconds) = seconds else {
        info!(%heard, "no duration understood");
        ix.speak(phrase(language, Phrase::TimerUnparsed), voice).await?;
        return Ok(ModeOutcome::TimerNotSet);
    };

    // Scheduled before confirming so a hangup mid-sentence keeps the timer
    let after = Duration::from_secs(seconds);
    schedule_bell(Arc::clone(&ix.services.bell), after, config.timing.timer_ring());
    info!(seconds, "timer scheduled");

    ix.speak(&timer_set(language, seconds), voice).await?;
    Ok(ModeOutcome::TimerScheduled(after))
}

/// Ring the bell once `after` has elapsed. Detached from any mode.
pub(crate) fn schedule_bell(bell: Arc<dyn Bell>, after: Duration, ring_for: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        info!(after_secs = after.as_secs(), "timer expired");
        match tokio::task::spawn_blocking(move || bell.ring(ring_for)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "bell failed"),
            Err(e) => warn!(error = %e, "bell task failed"),
        }
    })
}

async fn operator_call(ix: &mut Interaction<'_>) -> Result<ModeOutcome, Aborted> {
    let config = ix.config;
    let voice = &config.voices.operator;
    let language = ix.language();

    let music = Arc::clone(&ix.services.music);
    ix.call("music pause", music.pause()).await?;
    ix.tone(Tone::DialTone, true).await?;
    ix.sleep(OPERATOR_CONNECT_PAUSE).await?;
    ix.tone(Tone::Click, true).await?;
    ix.speak(phrase(language, Phrase::OperatorGreeting), voice).await?;

    loop {
        let heard = ix.listen(config.timing.chat_listen()).await?;
        if heard.is_empty() {
            ix.speak(phrase(language, Phrase::OperatorNoSpeech), voice).await?;
            return Ok(ModeOutcome::Disconnected);
        }
        info!(%heard, "caller asked the operator");

        if ix.classify(&heard).await? == Intent::Music {
            ix.speak(phrase(language, Phrase::OperatorConnecting), voice).await?;
            let playback = match ix.music_request(&heard, OPERATOR_ERA).await? {
                Some(MusicRequest::Search { query, kind }) => {
                    if ix.search_and_play(&query, kind).await? {
                        Playback::Requested { query }
                    } else {
                        ix.era_playlist(OPERATOR_ERA).await?
                    }
                }
                Some(MusicRequest::Default) | None => ix.era_playlist(OPERATOR_ERA).await?,
            };
            return Ok(ModeOutcome::Playing(playback));
        }

        let brain = Arc::clone(&ix.services.brain);
        let reply = ix
            .call("operator reply", brain.operator_reply(&heard, language))
            .await?
            .unwrap_or_else(|| phrase(language, Phrase::OperatorUnavailable).to_string());
        ix.speak(&reply, voice).await?;
    }
}

async fn era_visit(ix: &mut Interaction<'_>, year: u16, direct: bool) -> Result<ModeOutcome, Aborted> {
    ix.session.selected_year = Some(year);
    let language = ix.language();
    info!(year, direct, %language, "travelling");

    if direct {
        let playback = ix.era_playlist(year).await?;
        return Ok(ModeOutcome::Playing(playback));
    }

    let music = Arc::clone(&ix.services.music);
    spawn_detached("music pause", async move { music.pause().await });

    let config = ix.config;
    let voice = config.voices.for_year(year);

    // Static covers the wait for the intro; the guard stops it on every exit path
    let static_stop = ix.checkpoint.token().child_token();
    spawn_static_loop(Arc::clone(&ix.services.speech), static_stop.clone());
    let static_guard = static_stop.drop_guard();

    let brain = Arc::clone(&ix.services.brain);
    let intro = ix.call("era intro", brain.era_intro(year, language)).await?;
    drop(static_guard);

    let intro = intro.unwrap_or_else(|| era_welcome(language, year));
    ix.stop_playback().await?;
    ix.sleep(INTRO_GAP).await?;
    ix.speak(&intro, voice).await?;

    let request = loop {
        let heard = ix.listen(config.timing.chat_listen()).await?;
        if heard.is_empty() {
            info!("silence, starting music");
            break None;
        }
        info!(%heard, "caller said");

        if ix.classify(&heard).await? == Intent::Music {
            info!("music requested, leaving chat");
            break Some(heard);
        }

        let reply = ix
            .call("host chat", brain.chat_turn(&heard, year, language))
            .await?
            .unwrap_or_else(|| phrase(language, Phrase::SignalLost).to_string());
        ix.speak(&reply, voice).await?;
    };

    let playback = ix.start_music(year, request, voice).await?;
    Ok(ModeOutcome::Playing(playback))
}

/// Fire-and-forget work whose failure only gets logged
pub(crate) fn spawn_detached<F>(what: &'static str, fut: F)
where
    F: Future<Output = ServiceResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            debug!(what, error = %e, "background task failed");
        }
    });
}

fn spawn_static_loop(speech: Arc<dyn Speech>, stop: CancellationToken) {
    tokio::spawn(async move {
        while !stop.is_cancelled() {
            let started = tokio::time::Instant::now();
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                result = speech.play_tone(Tone::StaticLong, true) => {
                    if let Err(e) = result {
                        debug!(error = %e, "static loop stopped");
                        break;
                    }
                }
            }

            let rest = STATIC_MIN_PERIOD.saturating_sub(started.elapsed());
            if !rest.is_zero() {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(rest) => {}
                }
            }
        }
    });
}

impl Interaction<'_> {
    fn language(&self) -> Language {
        self.session.language
    }

    /// One guarded collaborator call; failures become `None`
    async fn call<T, F>(&self, what: &'static str, fut: F) -> Result<Option<T>, Aborted>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        match self.checkpoint.guard(fut).await? {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(what, error = %e, "collaborator failed");
                Ok(None)
            }
        }
    }

    async fn speak(&self, text: &str, voice: &VoiceProfile) -> Result<(), Aborted> {
        info!(%text, "speaking");
        self.call("speak", self.services.speech.speak(text, voice)).await?;
        Ok(())
    }

    /// Transcript of the next utterance; failures count as silence
    async fn listen(&self, max: Duration) -> Result<String, Aborted> {
        let heard = self.call("listen", self.services.speech.listen(max)).await?;
        Ok(heard.unwrap_or_default().trim().to_string())
    }

    async fn tone(&self, tone: Tone, blocking: bool) -> Result<(), Aborted> {
        self.call("tone", self.services.speech.play_tone(tone, blocking))
            .await?;
        Ok(())
    }

    async fn stop_playback(&self) -> Result<(), Aborted> {
        self.call("stop playback", self.services.speech.stop_playback())
            .await?;
        Ok(())
    }

    async fn sleep(&self, duration: Duration) -> Result<(), Aborted> {
        self.checkpoint.guard(tokio::time::sleep(duration)).await
    }

    /// Unclassifiable utterances are chat
    async fn classify(&self, text: &str) -> Result<Intent, Aborted> {
        let intent = self
            .call("intent", self.services.brain.classify_intent(text))
            .await?
            .unwrap_or(Intent::Chat);
        debug!(?intent, "intent classified");
        Ok(intent)
    }

    async fn music_request(&self, text: &str, year: u16) -> Result<Option<MusicRequest>, Aborted> {
        let request = self
            .call(
                "music query",
                self.services.brain.music_search_query(text, year, self.language()),
            )
            .await?;
        debug!(?request, "music request");
        Ok(request)
    }

    /// Try the requested kind, then its fallback kind
    async fn search_and_play(&self, query: &str, kind: SearchKind) -> Result<bool, Aborted> {
        for attempt in kind.attempts() {
            info!(%query, kind = %attempt, "searching");
            let found = self
                .call("music search", self.services.music.search_and_play(query, attempt))
                .await?;
            if found == Some(true) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Honour a spoken request if there is one, else the decade default
    async fn start_music(
        &self,
        year: u16,
        request: Option<String>,
        voice: &VoiceProfile,
    ) -> Result<Playback, Aborted> {
        let language = self.language();
        let specific = request.filter(|text| text.chars().count() > SPECIFIC_REQUEST_MIN_CHARS);

        if let Some(text) = specific {
            let confirmation = self
                .call(
                    "play confirmation",
                    self.services.brain.play_confirmation(year, &text, language),
                )
                .await?
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| phrase(language, Phrase::ComingRightUp).to_string());
            self.speak(&confirmation, voice).await?;

            match self.music_request(&text, year).await? {
                Some(MusicRequest::Search { query, kind }) => {
                    if self.search_and_play(&query, kind).await? {
                        return Ok(Playback::Requested { query });
                    }
                    info!(%query, "specific search failed");
                    self.speak(phrase(language, Phrase::RequestNotFound), voice).await?;
                }
                Some(MusicRequest::Default) => {
                    self.speak(phrase(language, Phrase::ComingRightUp), voice).await?;
                }
                None => {}
            }
        }

        self.era_playlist(year).await
    }

    /// The decade's default playlist in the session language
    async fn era_playlist(&self, year: u16) -> Result<Playback, Aborted> {
        let decade = decade_of(year);
        let Some(uri) = self.config.playlist_for(year, self.language()) else {
            info!(decade, "no playlist for decade");
            return Ok(Playback::Nothing);
        };

        info!(decade, %uri, "playing era playlist");
        match uri.strip_prefix("search:") {
            Some(query) => {
                self.search_and_play(query.trim(), SearchKind::Playlist).await?;
            }
            None => {
                self.call("playlist", self.services.music.play_playlist(uri))
                    .await?;
            }
        }
        Ok(Playback::EraPlaylist { decade })
    }
}
