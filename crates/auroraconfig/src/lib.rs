use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR_STOPS: [&str; 3] = ["#FF6B9D", "#3d4c85ff", "#FF6B9D"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AuroraConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub effect: EffectConfig,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub watch: WatchSection,
}

impl Default for AuroraConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            effect: EffectConfig::default(),
            window: WindowSection::default(),
            render: RenderSection::default(),
            watch: WatchSection::default(),
        }
    }
}

/// Live effect parameters; hot-reloadable while the window runs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EffectConfig {
    pub color_stops: Vec<String>,
    pub amplitude: f64,
    pub blend: f64,
    pub speed: f64,
    pub opacity: f64,
    /// Fixed animation time; when absent the effect follows the clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            color_stops: DEFAULT_COLOR_STOPS.iter().map(|s| s.to_string()).collect(),
            amplitude: 0.5,
            blend: 1.2,
            speed: 0.3,
            opacity: 0.3,
            time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSection {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub start_active: bool,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "Aurora".to_string(),
            width: 1280,
            height: 720,
            start_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSection {
    #[serde(
        deserialize_with = "deserialize_antialias",
        serialize_with = "serialize_antialias"
    )]
    pub antialias: AntialiasSetting,
    pub power: PowerSetting,
    pub fade_curve: FadeCurveSetting,
    /// Custom fragment stage declaring the `AuroraParams` uniform block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchSection {
    pub enabled: bool,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub interval: Duration,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_watch_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AntialiasSetting {
    #[default]
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    /// Requested MSAA sample count; `None` means "pick the best available".
    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

impl fmt::Display for AntialiasSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.samples() {
            None => f.write_str("auto"),
            Some(1) => f.write_str("off"),
            Some(samples) => write!(f, "{samples}"),
        }
    }
}

impl std::str::FromStr for AntialiasSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_antialias(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FadeCurveSetting {
    Linear,
    Smoothstep,
    #[default]
    EaseInOut,
}

fn default_version() -> u32 {
    1
}

fn default_watch_interval() -> Duration {
    Duration::from_secs(1)
}

/// Longest accepted `watch.interval`.
pub const MAX_WATCH_INTERVAL: Duration = Duration::from_secs(60 * 60);

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_antialias<'de, D>(deserializer: D) -> Result<AntialiasSetting, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Str(raw) => parse_antialias(&raw).map_err(de::Error::custom),
        Helper::Num(value) if value < 0 => {
            Err(de::Error::custom("antialias value must be non-negative"))
        }
        Helper::Num(value) => parse_antialias(&value.to_string()).map_err(de::Error::custom),
    }
}

fn serialize_antialias<S>(value: &AntialiasSetting, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value.samples() {
        Some(samples) if samples > 1 => serializer.serialize_u32(samples),
        _ => serializer.serialize_str(&value.to_string()),
    }
}

fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

/// Accepts `#RGB`, `#RRGGBB` and `#RRGGBBAA`, with or without the `#`.
fn is_hex_color(raw: &str) -> bool {
    let digits = raw.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|ch| ch.is_ascii_hexdigit())
}

impl AuroraConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: AuroraConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }
        self.effect.validate()?;

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if let Some(fragment) = &self.render.fragment {
            if fragment.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "render.fragment may not be empty".into(),
                ));
            }
        }

        if self.watch.enabled && self.watch.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "watch.interval must be greater than zero".into(),
            ));
        }
        if self.watch.interval > MAX_WATCH_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "watch.interval must be at most {}",
                humantime::format_duration(MAX_WATCH_INTERVAL)
            )));
        }

        Ok(())
    }
}

impl EffectConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.color_stops.is_empty() {
            return Err(ConfigError::Invalid(
                "effect.color_stops must list at least one colour".into(),
            ));
        }
        for stop in &self.color_stops {
            if !is_hex_color(stop) {
                return Err(ConfigError::Invalid(format!(
                    "effect.color_stops entry '{stop}' is not a 3, 6 or 8 digit hex colour"
                )));
            }
        }

        for (name, value) in [
            ("amplitude", self.amplitude),
            ("blend", self.blend),
            ("speed", self.speed),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("effect.{name} must be finite")));
            }
        }
        if self.amplitude < 0.0 {
            return Err(ConfigError::Invalid("effect.amplitude must be >= 0".into()));
        }
        if self.blend <= 0.0 {
            return Err(ConfigError::Invalid("effect.blend must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ConfigError::Invalid(
                "effect.opacity must be between 0 and 1".into(),
            ));
        }
        if let Some(time) = self.time {
            if !time.is_finite() {
                return Err(ConfigError::Invalid("effect.time must be finite".into()));
            }
        }
        Ok(())
    }
}
