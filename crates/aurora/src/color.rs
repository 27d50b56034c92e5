//! Hex colour decoding for the aurora colour ramp.
//!
//! Stops arrive from the host as textual hex codes (`#RGB`, `#RRGGBB` or
//! `#RRGGBBAA`, the `#` being optional). The shader consumes exactly
//! [`STOP_COUNT`] normalised RGB triples, so [`resolve_stops`] also owns the
//! padding rule for hosts that supply fewer.

use std::fmt;

/// Number of colour stops evaluated by the fragment stage.
pub const STOP_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("hex colour '{input}' has {digits} digits; expected 3, 6, or 8")]
    Length { input: String, digits: usize },
    #[error("hex colour '{input}' contains non-hex digit '{digit}'")]
    Digit { input: String, digit: char },
}

/// Normalised RGB triple, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0.0, 0.0, 0.0]);

    /// Re-encodes the colour as a lowercase `#rrggbb` string.
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.0.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8);
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Expands to the `vec4` slot layout used by the uniform block.
    pub fn to_vec4(&self) -> [f32; 4] {
        [self.0[0], self.0[1], self.0[2], 1.0]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Decodes a hex colour into normalised RGB.
///
/// Three-digit codes double every digit, eight-digit codes drop the trailing
/// alpha pair. Any other length is rejected rather than coerced.
pub fn decode_hex(input: &str) -> Result<Rgb, ColorError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

    if let Some(digit) = digits.chars().find(|ch| !ch.is_ascii_hexdigit()) {
        return Err(ColorError::Digit {
            input: input.to_string(),
            digit,
        });
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => digits.to_string(),
        8 => digits[..6].to_string(),
        other => {
            return Err(ColorError::Length {
                input: input.to_string(),
                digits: other,
            })
        }
    };

    // All digits were checked above, so the parse cannot fail.
    let value = u32::from_str_radix(&expanded, 16).map_err(|_| ColorError::Length {
        input: input.to_string(),
        digits: digits.len(),
    })?;

    Ok(Rgb([
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ]))
}

/// Outcome of decoding a host-supplied stop list.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStops {
    pub stops: [Rgb; STOP_COUNT],
    /// Stops that failed to decode, keyed by ramp slot. Those slots keep the
    /// fallback colour.
    pub errors: Vec<(usize, ColorError)>,
}

/// Decodes up to [`STOP_COUNT`] stops onto `fallback`.
///
/// Fewer than three stops are padded by repeating the last supplied stop;
/// extra stops are ignored; an empty list keeps `fallback` unchanged.
pub fn resolve_stops<S: AsRef<str>>(stops: &[S], fallback: &[Rgb; STOP_COUNT]) -> ResolvedStops {
    let mut resolved = *fallback;
    let mut errors = Vec::new();

    let Some(last) = stops.len().checked_sub(1) else {
        return ResolvedStops {
            stops: resolved,
            errors,
        };
    };

    for (slot, color) in resolved.iter_mut().enumerate() {
        let source = stops[slot.min(last)].as_ref();
        match decode_hex(source) {
            Ok(rgb) => *color = rgb,
            Err(err) => errors.push((slot, err)),
        }
    }

    ResolvedStops {
        stops: resolved,
        errors,
    }
}
