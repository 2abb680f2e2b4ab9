/*!
 # Parameter codec

 Validates raw request parameters and converts them into the typed,
 range-checked values the dispatcher and bridge driver work with. Every
 function here is pure: a rejected parameter never reaches the bridge.
*/

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::palette;

/// Lowest accepted brightness percentage
pub const BRIGHTNESS_MIN: u8 = 1;
/// Highest accepted brightness percentage
pub const BRIGHTNESS_MAX: u8 = 100;
/// Percent points per device brightness step
pub const BRIGHTNESS_RATIO: u8 = 4;
/// Lowest device brightness step
pub const BRIGHTNESS_OFFSET: u8 = 2;

/// Highest accepted RGB channel value
pub const CHANNEL_MAX: f64 = 255.0;

/// Rejected request parameter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Group selector is not a number or names no configured group
    #[error("invalid group id {0:?}: must be between 0 and {1}")]
    InvalidGroup(String, usize),

    /// RGB channel is missing or not a number
    #[error("failed to parse color channel {channel}: {value:?}")]
    ColorChannel { channel: char, value: String },

    /// RGB channel outside 0-255
    #[error("invalid color channel {channel}={value}: must be between 0 and 255")]
    ColorChannelOutOfRange { channel: char, value: f64 },

    /// Brightness is missing or not an 8-bit unsigned integer
    #[error("failed to parse brightness level {0:?}")]
    Brightness(String),

    /// Brightness outside 1-100
    #[error("invalid brightness level {0}: must be between 1 and 100")]
    BrightnessOutOfRange(u8),

    /// Color name not in the palette
    #[error("invalid color name {0:?}")]
    UnknownColor(String),

    /// Query string could not be decoded into parameters
    #[error("invalid query string: {0}")]
    Query(String),
}

/// Raw, unvalidated command parameters as received from a caller
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawParams {
    pub group: Option<String>,
    pub r: Option<String>,
    pub g: Option<String>,
    pub b: Option<String>,
    pub level: Option<String>,
    pub color: Option<String>,
    pub speed: Option<String>,
}

/// Which groups a command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSelector {
    /// One group, by 0-based registry index
    Single(usize),
    /// Every group, in registry order
    All,
}

/// RGB color with channels normalized to 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RgbColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Device brightness step (2-27)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessLevel(u8);

impl BrightnessLevel {
    /// Converts a percentage (1-100) to a device step
    pub fn from_percent(percent: u8) -> Result<Self, ValidationError> {
        if !(BRIGHTNESS_MIN..=BRIGHTNESS_MAX).contains(&percent) {
            return Err(ValidationError::BrightnessOutOfRange(percent));
        }
        Ok(Self(percent / BRIGHTNESS_RATIO + BRIGHTNESS_OFFSET))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Single-byte palette hue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HueByte(pub u8);

/// Disco speed adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoSpeed {
    Up,
    Down,
    /// No speed change, toggles disco mode
    #[default]
    Hold,
}

impl DiscoSpeed {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoSpeed::Up => "up",
            DiscoSpeed::Down => "down",
            DiscoSpeed::Hold => "hold",
        }
    }
}

/// Resolves a group selector against `group_count` configured groups.
///
/// Absent, empty and `0` address every group; `1..=group_count` address one
/// group by its 1-based id.
pub fn parse_target(
    raw: Option<&str>,
    group_count: usize,
) -> Result<TargetSelector, ValidationError> {
    let raw = match raw {
        None | Some("") => return Ok(TargetSelector::All),
        Some(raw) => raw,
    };
    let invalid = || ValidationError::InvalidGroup(raw.to_string(), group_count);

    let id: i64 = raw.parse().map_err(|_| invalid())?;
    match id {
        0 => Ok(TargetSelector::All),
        id if id >= 1 && id as u64 <= group_count as u64 => {
            Ok(TargetSelector::Single(id as usize - 1))
        }
        _ => Err(invalid()),
    }
}

/// Parses an RGB triple. Any missing, unparsable or out-of-range channel
/// rejects the whole color.
pub fn parse_rgb(
    r: Option<&str>,
    g: Option<&str>,
    b: Option<&str>,
) -> Result<RgbColor, ValidationError> {
    let color = RgbColor {
        r: parse_channel('r', r)? / CHANNEL_MAX,
        g: parse_channel('g', g)? / CHANNEL_MAX,
        b: parse_channel('b', b)? / CHANNEL_MAX,
    };
    trace!(?color, "Parsed RGB color");
    Ok(color)
}

fn parse_channel(channel: char, raw: Option<&str>) -> Result<f64, ValidationError> {
    let raw = raw.unwrap_or_default();
    let value: f64 = raw.parse().map_err(|_| ValidationError::ColorChannel {
        channel,
        value: raw.to_string(),
    })?;
    // NaN fails the range check too
    if !(0.0..=CHANNEL_MAX).contains(&value) {
        return Err(ValidationError::ColorChannelOutOfRange { channel, value });
    }
    Ok(value)
}

/// Parses a brightness percentage and scales it to a device step.
///
/// Only plain decimal digits are accepted, no sign.
pub fn parse_brightness(raw: Option<&str>) -> Result<BrightnessLevel, ValidationError> {
    let raw = raw.unwrap_or_default();
    let invalid = || ValidationError::Brightness(raw.to_string());
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let percent: u8 = raw.parse().map_err(|_| invalid())?;
    BrightnessLevel::from_percent(percent)
}

/// Looks a color name up in the palette
pub fn parse_named_color(raw: Option<&str>) -> Result<HueByte, ValidationError> {
    let name = raw.unwrap_or_default();
    palette::hue_for(name)
        .map(HueByte)
        .ok_or_else(|| ValidationError::UnknownColor(name.to_string()))
}

/// Parses a disco speed token; anything but `up` or `down` holds the speed
pub fn parse_disco_speed(raw: Option<&str>) -> DiscoSpeed {
    match raw {
        Some("up") => DiscoSpeed::Up,
        Some("down") => DiscoSpeed::Down,
        _ => DiscoSpeed::Hold,
    }
}
