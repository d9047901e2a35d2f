//! Collaborators that work without cloud services
//!
//! Speech goes to the log and transcripts come from stdin, the brain uses
//! keyword rules, music is logged. Enough to exercise the phone end to end
//! on the bench.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Brain, Intent, Music, MusicRequest, SearchKind, ServiceError, ServiceResult, Speech, Tone};
use crate::config::VoiceProfile;
use crate::session::Language;

/// Nominal length of the recorded tone files
fn tone_length(tone: Tone) -> Duration {
    match tone {
        Tone::DialTone => Duration::from_secs(3),
        Tone::Click => Duration::from_millis(200),
        Tone::StaticLong => Duration::from_secs(5),
    }
}

/// Speech on the terminal: spoken text is logged, typed lines are "heard"
pub struct ConsoleSpeech<R = BufReader<Stdin>> {
    input: Mutex<Lines<R>>,
}

impl ConsoleSpeech {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> ConsoleSpeech<R> {
    pub fn new(reader: R) -> Self {
        Self {
            input: Mutex::new(reader.lines()),
        }
    }
}

#[async_trait]
impl<R> Speech for ConsoleSpeech<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn play_tone(&self, tone: Tone, blocking: bool) -> ServiceResult<()> {
        debug!(%tone, blocking, "playing tone");
        if blocking {
            tokio::time::sleep(tone_length(tone)).await;
        }
        Ok(())
    }

    async fn speak(&self, text: &str, voice: &VoiceProfile) -> ServiceResult<()> {
        info!(voice = %voice.voice_id, model = %voice.model, "SAYS: {}", text);
        Ok(())
    }

    async fn listen(&self, max: Duration) -> ServiceResult<String> {
        info!(max_secs = max.as_secs(), "listening (type a reply)");
        let mut input = self.input.lock().await;
        match tokio::time::timeout(max, input.next_line()).await {
            Ok(Ok(Some(line))) => Ok(line.trim().to_string()),
            Ok(Ok(None)) | Err(_) => Ok(String::new()),
            Ok(Err(e)) => Err(ServiceError::Failed {
                service: "speech",
                reason: e.to_string(),
            }),
        }
    }

    async fn stop_playback(&self) -> ServiceResult<()> {
        debug!("handset audio stopped");
        Ok(())
    }
}

/// Keyword-driven stand-in for the dialogue service
#[derive(Debug, Default)]
pub struct OfflineBrain;

const MUSIC_CUES: &[&str] = &[
    "play",
    "put on",
    "i want to hear",
    "start the music",
    "start music",
    "spin",
    "pusť",
    "zahraj",
];

const GENERIC_REQUESTS: &[&str] = &[
    "",
    "music",
    "some music",
    "something",
    "the records",
    "it",
    "yes",
    "hudbu",
    "něco",
];

fn unavailable(what: &str) -> ServiceError {
    ServiceError::Unavailable {
        service: "brain",
        reason: format!("{what} needs the dialogue service"),
    }
}

#[async_trait]
impl Brain for OfflineBrain {
    async fn classify_intent(&self, text: &str) -> ServiceResult<Intent> {
        let lower = text.to_lowercase();
        let music = MUSIC_CUES.iter().any(|cue| lower.trim_start().starts_with(cue));
        Ok(if music { Intent::Music } else { Intent::Chat })
    }

    async fn era_intro(&self, _year: u16, _language: Language) -> ServiceResult<String> {
        Err(unavailable("era intro"))
    }

    async fn chat_turn(&self, _text: &str, _year: u16, _language: Language) -> ServiceResult<String> {
        Err(unavailable("host chat"))
    }

    async fn operator_reply(&self, _text: &str, _language: Language) -> ServiceResult<String> {
        Err(unavailable("operator chat"))
    }

    async fn music_search_query(
        &self,
        text: &str,
        _year: u16,
        _language: Language,
    ) -> ServiceResult<MusicRequest> {
        Ok(search_from_utterance(text))
    }

    async fn play_confirmation(
        &self,
        _year: u16,
        _query: &str,
        _language: Language,
    ) -> ServiceResult<String> {
        Err(unavailable("play confirmation"))
    }

    async fn parse_timer_duration(&self, text: &str) -> ServiceResult<Option<u64>> {
        Ok(parse_spoken_duration(text))
    }
}

/// Strip the request verb and guess what kind of thing is being asked for
fn search_from_utterance(text: &str) -> MusicRequest {
    let lower = text.trim().to_lowercase();
    let mut rest = lower.as_str();
    for cue in MUSIC_CUES {
        if let Some(stripped) = rest.strip_prefix(cue) {
            rest = stripped;
            break;
        }
    }
    let rest = rest
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim_start_matches("me ")
        .trim_start_matches("some ")
        .trim();

    if GENERIC_REQUESTS.contains(&rest) {
        return MusicRequest::Default;
    }

    let (query, kind) = if let Some(album) = rest.strip_prefix("the album ").or_else(|| rest.strip_prefix("album ")) {
        (album, SearchKind::Album)
    } else if let Some(artist) = rest
        .strip_prefix("songs by ")
        .or_else(|| rest.strip_prefix("music by "))
        .or_else(|| rest.strip_prefix("songs from "))
    {
        (artist, SearchKind::Artist)
    } else {
        (rest, SearchKind::Playlist)
    };

    MusicRequest::Search {
        query: query.trim().to_string(),
        kind,
    }
}

fn number_word(word: &str) -> Option<u64> {
    let n = match word {
        "a" | "an" | "one" | "jedna" | "jeden" | "jednu" => 1,
        "two" | "dva" | "dvě" => 2,
        "three" | "tři" => 3,
        "four" | "čtyři" => 4,
        "five" | "pět" => 5,
        "six" | "šest" => 6,
        "seven" | "sedm" => 7,
        "eight" | "osm" => 8,
        "nine" | "devět" => 9,
        "ten" | "deset" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" | "patnáct" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" | "dvacet" => 20,
        "thirty" | "třicet" => 30,
        "forty" | "čtyřicet" => 40,
        "fifty" | "padesát" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(n)
}

fn unit_seconds(word: &str) -> Option<u64> {
    if word.starts_with("sec") || word.starts_with("sek") {
        Some(1)
    } else if word.starts_with("min") {
        Some(60)
    } else if word.starts_with("hour") || word.starts_with("hod") || word == "hr" || word == "hrs" {
        Some(3600)
    } else {
        None
    }
}

/// Total seconds in phrases like "five minutes" or "an hour and 10 minutes"
pub fn parse_spoken_duration(text: &str) -> Option<u64> {
    let lower = text.to_lowercase();
    let mut total: u64 = 0;
    let mut pending: Option<u64> = None;

    for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        if let Ok(n) = word.parse::<u64>() {
            pending = Some(n);
        } else if let Some(n) = number_word(word) {
            pending = Some(match pending {
                // "twenty five"
                Some(tens) if tens >= 20 && tens % 10 == 0 && n < 10 => tens + n,
                _ => n,
            });
        } else if let Some(unit) = unit_seconds(word) {
            let count = pending.take().unwrap_or(1);
            total = total.saturating_add(count.saturating_mul(unit));
        }
    }

    (total > 0).then_some(total)
}

/// Music player that only logs what it would play
#[derive(Debug, Default)]
pub struct LogMusic;

#[async_trait]
impl Music for LogMusic {
    async fn search_and_play(&self, query: &str, kind: SearchKind) -> ServiceResult<bool> {
        info!(%query, %kind, "music: search and play");
        Ok(true)
    }

    async fn play_playlist(&self, uri: &str) -> ServiceResult<()> {
        info!(%uri, "music: playing playlist");
        Ok(())
    }

    async fn pause(&self) -> ServiceResult<()> {
        info!("music: paused");
        Ok(())
    }
}
