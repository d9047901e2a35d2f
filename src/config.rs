//! Configuration loading and management
//!
//! Everything has a working default; a TOML file only needs the keys it
//! wants to override.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::session::Language;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "ROTARY_RADIO_CONFIG";

/// Errors raised while reading or validating the config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hardware: HardwareConfig,
    pub timing: TimingConfig,
    pub voices: VoiceTable,
    pub playlists: Vec<DecadePlaylist>,
    /// Capacity of the number-dialed queue between sampler and controller
    pub dial_queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hardware: HardwareConfig::default(),
            timing: TimingConfig::default(),
            voices: VoiceTable::default(),
            playlists: default_playlists(),
            dial_queue: 8,
        }
    }
}

impl Config {
    /// Load configuration from `ROTARY_RADIO_CONFIG` or the user config dir
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => {
                let home = std::env::var("HOME")?;
                PathBuf::from(home)
                    .join(".config")
                    .join("rotary-radio")
                    .join("config.toml")
            }
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        Ok(Self::from_file(&path)?)
    }

    /// Parse and validate a specific config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the decoder cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if !(1..=4).contains(&t.max_digits) {
            return Err(ConfigError::Invalid(format!(
                "timing.max_digits must be 1..=4, got {}",
                t.max_digits
            )));
        }
        if t.sample_interval_ms == 0 || t.sample_interval_ms > t.pulse_debounce_ms {
            return Err(ConfigError::Invalid(
                "timing.sample_interval_ms must be non-zero and no longer than the pulse debounce"
                    .to_string(),
            ));
        }
        if t.digit_gap_ms >= t.number_idle_ms {
            return Err(ConfigError::Invalid(
                "timing.digit_gap_ms must be shorter than timing.number_idle_ms".to_string(),
            ));
        }
        if self.dial_queue == 0 {
            return Err(ConfigError::Invalid("dial_queue must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Default playlist URI for the decade containing `year`
    pub fn playlist_for(&self, year: u16, language: Language) -> Option<&str> {
        let decade = decade_of(year);
        self.playlists
            .iter()
            .find(|p| p.decade == decade)
            .map(|p| match language {
                Language::Cz => p.cz.as_deref().unwrap_or(&p.en),
                Language::En => &p.en,
            })
    }
}

/// Round a year down to its decade (1955 -> 1950)
pub fn decade_of(year: u16) -> u16 {
    year - year % 10
}

/// GPIO wiring
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Root of the sysfs GPIO tree
    pub gpio_root: PathBuf,
    pub hook_pin: u32,
    pub dial_pin: u32,
    /// H-bridge pins driving the bell hammer
    pub bell_pins: [u32; 2],
    pub bell_stroke_ms: u64,
    /// Raw level of the hook line while the handset is lifted
    pub hook_lifted_level: bool,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            hook_pin: 22,
            dial_pin: 27,
            bell_pins: [23, 24],
            bell_stroke_ms: 100,
            hook_lifted_level: false,
        }
    }
}

impl HardwareConfig {
    pub fn bell_stroke(&self) -> Duration {
        Duration::from_millis(self.bell_stroke_ms)
    }
}

/// Decoder and interaction timing, all in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub sample_interval_ms: u64,
    pub hook_stable_ms: u64,
    pub ghost_lockout_ms: u64,
    pub pulse_debounce_ms: u64,
    pub digit_gap_ms: u64,
    pub number_idle_ms: u64,
    pub max_digits: usize,
    pub dial_tone_settle_ms: u64,
    pub chat_listen_ms: u64,
    pub timer_listen_ms: u64,
    pub timer_ring_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1,
            hook_stable_ms: 200,
            ghost_lockout_ms: 800,
            pulse_debounce_ms: 25,
            digit_gap_ms: 700,
            number_idle_ms: 4_000,
            max_digits: 4,
            dial_tone_settle_ms: 200,
            chat_listen_ms: 8_000,
            timer_listen_ms: 5_000,
            timer_ring_ms: 2_000,
        }
    }
}

impl TimingConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn hook_stable(&self) -> Duration {
        Duration::from_millis(self.hook_stable_ms)
    }

    pub fn ghost_lockout(&self) -> Duration {
        Duration::from_millis(self.ghost_lockout_ms)
    }

    pub fn pulse_debounce(&self) -> Duration {
        Duration::from_millis(self.pulse_debounce_ms)
    }

    pub fn digit_gap(&self) -> Duration {
        Duration::from_millis(self.digit_gap_ms)
    }

    pub fn number_idle(&self) -> Duration {
        Duration::from_millis(self.number_idle_ms)
    }

    pub fn dial_tone_settle(&self) -> Duration {
        Duration::from_millis(self.dial_tone_settle_ms)
    }

    pub fn chat_listen(&self) -> Duration {
        Duration::from_millis(self.chat_listen_ms)
    }

    pub fn timer_listen(&self) -> Duration {
        Duration::from_millis(self.timer_listen_ms)
    }

    pub fn timer_ring(&self) -> Duration {
        Duration::from_millis(self.timer_ring_ms)
    }
}

/// Synthesis parameters for one persona
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub model: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
}

impl VoiceProfile {
    fn new(voice_id: &str, model: &str, stability: f32, similarity_boost: f32, style: f32) -> Self {
        Self {
            voice_id: voice_id.to_string(),
            model: model.to_string(),
            stability,
            similarity_boost,
            style,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecadeVoice {
    pub decade: u16,
    #[serde(flatten)]
    pub profile: VoiceProfile,
}

/// Operator voice plus per-decade host voices
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceTable {
    pub operator: VoiceProfile,
    pub decades: Vec<DecadeVoice>,
}

impl VoiceTable {
    /// Host voice for a year, falling back to the 1900s voice, then the operator
    pub fn for_year(&self, year: u16) -> &VoiceProfile {
        let decade = decade_of(year);
        self.decades
            .iter()
            .find(|v| v.decade == decade)
            .or_else(|| self.decades.iter().find(|v| v.decade == 1900))
            .map(|v| &v.profile)
            .unwrap_or(&self.operator)
    }
}

const GEORGE: &str = "JBFqnCBsd6RMkjVDRZzb";
const JOSH: &str = "TxGEqnHWrfWFTfGW9XjX";
const ANTONI: &str = "ErXwobaYiN019PkySvjV";
const RACHEL: &str = "21m00Tcm4TlvDq8ikWAM";
const ELLI: &str = "MF3mGyEYCl7XYWbV9V6O";
const TURBO: &str = "eleven_turbo_v2_5";

impl Default for VoiceTable {
    fn default() -> Self {
        let decade = |decade, id, model, stability, similarity, style| DecadeVoice {
            decade,
            profile: VoiceProfile::new(id, model, stability, similarity, style),
        };
        Self {
            operator: VoiceProfile::new(GEORGE, TURBO, 0.8, 0.75, 0.0),
            decades: vec![
                decade(1900, GEORGE, TURBO, 0.50, 0.80, 0.10),
                decade(1910, GEORGE, "eleven_multilingual_v2", 0.25, 0.95, 0.0),
                decade(1920, GEORGE, TURBO, 0.50, 0.80, 0.10),
                decade(1930, JOSH, TURBO, 0.65, 0.75, 0.45),
                decade(1940, GEORGE, TURBO, 0.80, 0.75, 0.30),
                decade(1950, ANTONI, TURBO, 0.40, 0.75, 0.70),
                decade(1960, ANTONI, TURBO, 0.25, 0.50, 0.90),
                decade(1970, JOSH, TURBO, 0.85, 0.75, 0.20),
                decade(1980, JOSH, TURBO, 0.95, 1.00, 0.0),
                decade(1990, RACHEL, TURBO, 0.50, 0.75, 0.60),
                decade(2000, RACHEL, TURBO, 0.70, 0.75, 0.40),
                decade(2010, ELLI, TURBO, 0.50, 0.75, 0.50),
                decade(2020, RACHEL, TURBO, 0.40, 0.40, 0.0),
            ],
        }
    }
}

/// Default playlist for a decade; `cz` falls back to `en` when absent
#[derive(Debug, Clone, Deserialize)]
pub struct DecadePlaylist {
    pub decade: u16,
    pub en: String,
    #[serde(default)]
    pub cz: Option<String>,
}

fn default_playlists() -> Vec<DecadePlaylist> {
    let entry = |decade, en: &str, cz: &str| DecadePlaylist {
        decade,
        en: en.to_string(),
        cz: Some(cz.to_string()),
    };
    vec![
        entry(1900, "search:Classical 1900s", "search:Klasická hudba"),
        entry(1910, "search:1910s Music", "search:Hudba 1910"),
        entry(1920, "search:1920s Jazz", "search:1920s Jazz"),
        entry(1930, "search:1930s Jazz", "search:1930s Jazz"),
        entry(1940, "search:1940s Big Band", "search:1940s Music"),
        entry(1950, "search:1950s Rock n Roll", "search:1950s Rock n Roll"),
        entry(1960, "search:1960s Golden Oldies", "search:1960s Music"),
        entry(1970, "search:1970s Classic Rock", "search:1970s Music"),
        entry(1980, "spotify:playlist:37i9dQZF1DX4UtSsGT1Sbe", "spotify:playlist:37i9dQZF1DX4UtSsGT1Sbe"),
        entry(1990, "spotify:playlist:37i9dQZF1DXbTxeAdrVG2l", "spotify:playlist:37i9dQZF1DXbTxeAdrVG2l"),
        entry(2000, "spotify:playlist:37i9dQZF1DX4o1oenSJRJd", "spotify:playlist:37i9dQZF1DX4o1oenSJRJd"),
        entry(2010, "spotify:playlist:37i9dQZF1DX5Ejj0EkURtP", "spotify:playlist:37i9dQZF1DX5Ejj0EkURtP"),
        entry(2020, "spotify:playlist:37i9dQZF1DX4JAvqIzK2nW", "spotify:playlist:37i9dQZF1DX4JAvqIzK2nW"),
    ]
}
