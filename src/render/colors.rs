use cairo::Context;
use serde::Deserialize;

/// Straight (non-premultiplied) RGBA, each channel in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub(crate) struct Color {
    pub(crate) r: f64,
    pub(crate) g: f64,
    pub(crate) b: f64,
    pub(crate) a: f64,
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_hex_color(value.trim()).ok_or_else(|| format!("invalid color '{value}'"))
    }
}

pub(crate) trait ContextExt {
    fn set_source_color(&self, color: Color);
}

impl ContextExt for Context {
    fn set_source_color(&self, color: Color) {
        self.set_source_rgba(color.r, color.g, color.b, color.a);
    }
}

/// Parses `#rrggbb` or `#rrggbbaa`.
pub(crate) fn parse_hex_color(color: &str) -> Option<Color> {
    let digits = color.strip_prefix('#')?.as_bytes();

    if digits.len() != 6 && digits.len() != 8 {
        return None;
    }

    #[inline]
    fn hex(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(10 + c - b'a'),
            b'A'..=b'F' => Some(10 + c - b'A'),
            _ => None,
        }
    }

    const INV_255: f64 = 1.0 / 255.0;

    let mut channels = [255u8; 4];

    for (channel, pair) in channels.iter_mut().zip(digits.chunks_exact(2)) {
        *channel = (hex(pair[0])? << 4) | hex(pair[1])?;
    }

    Some(Color {
        r: f64::from(channels[0]) * INV_255,
        g: f64::from(channels[1]) * INV_255,
        b: f64::from(channels[2]) * INV_255,
        a: f64::from(channels[3]) * INV_255,
    })
}
