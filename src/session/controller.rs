//! Session controller
//!
//! Consumes phone events, runs at most one interaction mode at a time and
//! cancels it the moment the handset goes down.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cancel::{Aborted, Checkpoint};
use super::modes::{self, spawn_detached, Interaction};
use super::state::{InteractionMode, ModeOutcome, SessionState};
use crate::config::Config;
use crate::decoder::SharedHook;
use crate::events::{PhoneEvent, Subscription};
use crate::services::{Services, Tone};

/// How a dialed number was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeExit {
    /// Handset down or the number maps to nothing
    Ignored,
    /// Cancelled by a hangup
    Aborted,
    Finished(ModeOutcome),
}

pub struct Controller {
    session: SessionState,
    mode: InteractionMode,
    services: Services,
    config: Arc<Config>,
    hook: SharedHook,
    events: Subscription,
}

impl Controller {
    pub fn new(services: Services, config: Arc<Config>, hook: SharedHook, events: Subscription) -> Self {
        Self {
            session: SessionState::default(),
            mode: InteractionMode::Idle,
            services,
            config,
            hook,
            events,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[cfg(test)]
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Process events until every publisher is gone
    pub async fn run(&mut self) {
        info!("session controller started in Idle");

        while let Some(event) = self.events.recv().await {
            debug!(%event, mode = %self.mode, "event received");
            match event {
                PhoneEvent::HookChanged { lifted } => {
                    handset_changed(&self.services, &self.config, lifted).await;
                }
                PhoneEvent::NumberDialed { number } => {
                    self.dispatch_number(number).await;
                }
            }
        }

        info!("session controller stopped");
    }

    /// Run the mode `number` selects; returns once it finishes or is cancelled
    pub async fn dispatch_number(&mut self, number: u32) -> ModeExit {
        if !self.hook.is_lifted() {
            info!(number, hook = %self.hook.get(), "number dropped");
            return ModeExit::Ignored;
        }

        if let Err(e) = self.services.speech.stop_playback().await {
            debug!(error = %e, "could not stop dial tone");
        }

        let mode = InteractionMode::classify(number);
        if mode == InteractionMode::Idle {
            info!(number, "number not recognised");
            return ModeExit::Ignored;
        }

        info!(number, %mode, "entering mode");
        self.mode = mode;

        let Self {
            session,
            services,
            config,
            hook,
            events,
            ..
        } = self;
        let services: &Services = services;
        let config: &Config = config;

        let cancel = CancellationToken::new();
        let interaction = Interaction {
            session,
            services,
            config,
            checkpoint: Checkpoint::new(hook.clone(), cancel.clone()),
        };
        let handler = modes::run(mode, interaction);
        tokio::pin!(handler);

        let mut events_open = true;
        let result = loop {
            tokio::select! {
                biased;
                event = events.recv(), if events_open => match event {
                    Some(PhoneEvent::HookChanged { lifted }) => {
                        if !lifted {
                            info!(%mode, "hangup, cancelling mode");
                            cancel.cancel();
                        }
                        handset_changed(services, config, lifted).await;
                    }
                    Some(PhoneEvent::NumberDialed { number }) => {
                        info!(number, %mode, "mode busy, number dropped");
                    }
                    None => events_open = false,
                },
                result = &mut handler => break result,
            }
        };

        self.mode = InteractionMode::Idle;
        match result {
            Ok(outcome) => {
                info!(%mode, ?outcome, "mode finished");
                ModeExit::Finished(outcome)
            }
            Err(Aborted) => {
                info!(%mode, "mode aborted");
                ModeExit::Aborted
            }
        }
    }
}

/// Dial tone on lift, silence on replace. Music keeps playing on replace.
async fn handset_changed(services: &Services, config: &Config, lifted: bool) {
    if !lifted {
        info!("handset replaced");
        if let Err(e) = services.speech.stop_playback().await {
            debug!(error = %e, "could not stop handset audio");
        }
        return;
    }

    info!("handset lifted");
    let music = Arc::clone(&services.music);
    spawn_detached("music pause", async move { music.pause().await });
    if let Err(e) = services.speech.stop_playback().await {
        debug!(error = %e, "could not stop handset audio");
    }
    tokio::time::sleep(config.timing.dial_tone_settle()).await;
    if let Err(e) = services.speech.play_tone(Tone::DialTone, false).await {
        warn!(error = %e, "dial tone failed");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::decoder::HookState;
    use crate::events::{channel, Dispatcher};
    use crate::services::{Intent, MusicRequest, OfflineBrain, SearchKind};
    use crate::session::modes::schedule_bell;
    use crate::session::state::{Language, Playback};
    use crate::session::testing::{CallLog, MockBell, MockBrain, MockMusic, MockSpeech};

    struct Harness {
        controller: Controller,
        log: Arc<CallLog>,
        hook: SharedHook,
        dispatcher: Dispatcher,
    }

    fn harness_with(
        make_speech: impl FnOnce(Arc<CallLog>, SharedHook) -> MockSpeech,
        make_brain: impl FnOnce(Arc<CallLog>) -> Arc<dyn crate::services::Brain>,
        music_finds: bool,
    ) -> Harness {
        let log = Arc::new(CallLog::default());
        let hook = SharedHook::new(HookState::Lifted);
        let services = Services {
            speech: Arc::new(make_speech(log.clone(), hook.clone())),
            brain: make_brain(log.clone()),
            music: Arc::new(MockMusic::new(log.clone(), music_finds)),
            bell: Arc::new(MockBell::default()),
        };
        let (dispatcher, events) = channel(8);
        let controller = Controller::new(services, Arc::new(Config::default()), hook.clone(), events);
        Harness {
            controller,
            log,
            hook,
            dispatcher,
        }
    }

    fn harness(heard: &'static [&'static str], intents: &'static [Intent]) -> Harness {
        harness_with(
            move |log, _| MockSpeech::new(log, heard),
            move |log| Arc::new(MockBrain::new(log).with_intents(intents)),
            true,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_dialing_nine_twice_toggles_back() {
        let mut h = harness(&[], &[]);
        assert_eq!(h.controller.session().language, Language::En);

        let exit = h.controller.dispatch_number(9).await;
        assert_eq!(exit, ModeExit::Finished(ModeOutcome::LanguageSet(Language::Cz)));
        assert!(h.log.contains("speak:") && h.log.calls().iter().any(|c| c.contains("Czech")));

        h.controller.dispatch_number(9).await;
        assert_eq!(h.controller.session().language, Language::En);
        assert_eq!(h.controller.mode(), InteractionMode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_five_minutes() {
        let mut h = harness_with(
            |log, _| MockSpeech::new(log, &["five minutes"]),
            |_| Arc::new(OfflineBrain),
            true,
        );

        let exit = h.controller.dispatch_number(666).await;
        assert_eq!(
            exit,
            ModeExit::Finished(ModeOutcome::TimerScheduled(Duration::from_secs(300)))
        );
        assert!(h
            .log
            .calls()
            .iter()
            .any(|c| c.ends_with("Setting timer for 300 seconds.")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_silence_is_not_set() {
        let mut h = harness(&[], &[]);
        let exit = h.controller.dispatch_number(666).await;
        assert_eq!(exit, ModeExit::Finished(ModeOutcome::TimerNotSet));
        assert!(!h.log.contains("timer:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decade_shortcut_skips_narration() {
        let mut h = harness(&[], &[]);

        let exit = h.controller.dispatch_number(3).await;
        assert_eq!(
            exit,
            ModeExit::Finished(ModeOutcome::Playing(Playback::EraPlaylist { decade: 1930 }))
        );
        assert_eq!(h.controller.session().selected_year, Some(1930));
        assert!(!h.log.contains("intro:"));
        assert!(!h.log.contains("speak:"));
        assert!(h.log.contains("search:playlist:1930s Jazz"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_year_visit_plays_era_default_on_silence() {
        let mut h = harness(&[], &[]);

        let exit = h.controller.dispatch_number(1966).await;
        assert_eq!(
            exit,
            ModeExit::Finished(ModeOutcome::Playing(Playback::EraPlaylist { decade: 1960 }))
        );
        assert_eq!(h.controller.session().selected_year, Some(1966));

        let calls = h.log.calls();
        let intro = calls.iter().position(|c| c == "intro:1966").unwrap();
        let spoken = calls
            .iter()
            .position(|c| c.ends_with("Live from the ballroom!"))
            .unwrap();
        assert!(intro < spoken);
        assert!(h.log.contains("search:playlist:1960s Golden Oldies"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_year_visit_chats_then_plays_request() {
        let mut h = harness_with(
            |log, _| MockSpeech::new(log, &["what is new in town?", "play Heartbreak Hotel please"]),
            |log| {
                Arc::new(
                    MockBrain::new(log)
                        .with_intents(&[Intent::Chat, Intent::Music])
                        .with_request(MusicRequest::Search {
                            query: "Heartbreak Hotel".to_string(),
                            kind: SearchKind::Track,
                        }),
                )
            },
            true,
        );

        let exit = h.controller.dispatch_number(1956).await;
        assert_eq!(
            exit,
            ModeExit::Finished(ModeOutcome::Playing(Playback::Requested {
                query: "Heartbreak Hotel".to_string()
            }))
        );
        assert!(h.log.contains("chat:1956:what is new in town?"));
        assert!(h.log.contains("confirm"));
        assert!(h.log.contains("search:track:Heartbreak Hotel"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfound_request_falls_back_to_era_playlist() {
        let mut h = harness_with(
            |log, _| MockSpeech::new(log, &["play something obscure from the radio"]),
            |log| {
                Arc::new(
                    MockBrain::new(log)
                        .with_intents(&[Intent::Music])
                        .with_request(MusicRequest::Search {
                            query: "obscure".to_string(),
                            kind: SearchKind::Album,
                        }),
                )
            },
            false,
        );

        let exit = h.controller.dispatch_number(1985).await;
        assert_eq!(
            exit,
            ModeExit::Finished(ModeOutcome::Playing(Playback::EraPlaylist { decade: 1980 }))
        );
        assert!(h.log.contains("search:album:obscure"));
        assert!(h.log.contains("search:playlist:obscure"));
        assert!(h.log.calls().iter().any(|c| c.contains("couldn't find")));
        assert!(h.log.contains("playlist:spotify:playlist:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_brain_uses_spoken_fallbacks() {
        let mut h = harness_with(
            |log, _| MockSpeech::new(log, &["hello?"]),
            |log| Arc::new(MockBrain::new(log).offline()),
            true,
        );

        h.controller.dispatch_number(1920).await;
        let calls = h.log.calls();
        assert!(calls.iter().any(|c| c.ends_with("Welcome to 1920.")));
        assert!(calls.iter().any(|c| c.ends_with("Signal lost...")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operator_silence_disconnects() {
        let mut h = harness(&[], &[]);

        let exit = h.controller.dispatch_number(0).await;
        assert_eq!(exit, ModeExit::Finished(ModeOutcome::Disconnected));
        let calls = h.log.calls();
        assert_eq!(calls[0], "stop_playback");
        assert_eq!(calls[1], "pause");
        assert_eq!(calls[2], "tone:dial_tone");
        assert_eq!(calls[3], "tone:click");
        assert!(calls.last().unwrap().ends_with("Disconnecting."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operator_connects_music_request() {
        let mut h = harness_with(
            |log, _| MockSpeech::new(log, &["put on songs by Elvis"]),
            |log| {
                Arc::new(
                    MockBrain::new(log)
                        .with_intents(&[Intent::Music])
                        .with_request(MusicRequest::Search {
                            query: "Elvis".to_string(),
                            kind: SearchKind::Artist,
                        }),
                )
            },
            true,
        );

        let exit = h.controller.dispatch_number(0).await;
        assert_eq!(
            exit,
            ModeExit::Finished(ModeOutcome::Playing(Playback::Requested {
                query: "Elvis".to_string()
            }))
        );
        assert!(h.log.contains("query:1950:put on songs by Elvis"));
        assert!(h.log.contains("search:artist:Elvis"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hangup_during_listen_stops_all_calls() {
        let mut h = harness_with(
            |log, hook| MockSpeech::new(log, &["anything"]).hangs_up_while_listening(hook),
            |log| Arc::new(MockBrain::new(log)),
            true,
        );

        let exit = h.controller.dispatch_number(1966).await;
        assert_eq!(exit, ModeExit::Aborted);
        assert_eq!(h.log.calls().last().unwrap(), "listen");
        assert_eq!(h.controller.mode(), InteractionMode::Idle);
        // The year was chosen before the hangup
        assert_eq!(h.controller.session().selected_year, Some(1966));
    }

    #[tokio::test(start_paused = true)]
    async fn test_number_dropped_when_handset_down() {
        let mut h = harness(&[], &[]);
        h.hook.set(HookState::Replaced);

        assert_eq!(h.controller.dispatch_number(9).await, ModeExit::Ignored);
        assert_eq!(h.controller.session(), &SessionState::default());
        assert!(h.log.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_number_leaves_session_alone() {
        let mut h = harness(&[], &[]);
        assert_eq!(h.controller.dispatch_number(42).await, ModeExit::Ignored);
        assert_eq!(h.controller.session(), &SessionState::default());
        // The dial tone still stops
        assert_eq!(h.log.calls(), vec!["stop_playback".to_string()]);

        assert_eq!(h.controller.dispatch_number(1899).await, ModeExit::Ignored);
        assert_eq!(h.log.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_plays_dial_tone_and_dispatches() {
        let mut h = harness(&[], &[]);
        h.dispatcher.publish(PhoneEvent::HookChanged { lifted: true });
        h.dispatcher.publish(PhoneEvent::NumberDialed { number: 9 });
        drop(h.dispatcher);

        h.controller.run().await;
        assert_eq!(h.controller.session().language, Language::Cz);
        assert!(h.log.contains("tone:dial_tone"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cancels_mode_on_hangup_event() {
        let mut h = harness_with(
            |log, _| MockSpeech::new(log, &[]).stalls_while_listening(),
            |log| Arc::new(MockBrain::new(log)),
            true,
        );
        h.dispatcher.publish(PhoneEvent::NumberDialed { number: 1944 });

        let hook = h.hook.clone();
        let dispatcher = h.dispatcher;
        let hang_up = async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            hook.set(HookState::Replaced);
            dispatcher.publish(PhoneEvent::HookChanged { lifted: false });
            // Flushed by the hangup, must not start a mode
            dispatcher.publish(PhoneEvent::NumberDialed { number: 9 });
        };

        tokio::join!(h.controller.run(), hang_up);
        assert_eq!(h.controller.session().language, Language::En);
        assert_eq!(h.controller.session().selected_year, Some(1944));
        let calls = h.log.calls();
        let listen = calls.iter().rposition(|c| c == "listen").unwrap();
        assert!(calls[listen + 1..].iter().all(|c| c == "stop_playback"));
    }

    #[tokio::test]
    async fn test_scheduled_bell_rings() {
        let bell = Arc::new(MockBell::default());
        schedule_bell(bell.clone(), Duration::from_millis(10), Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(*bell.rings.lock().unwrap(), vec![Duration::from_millis(20)]);
    }
}
