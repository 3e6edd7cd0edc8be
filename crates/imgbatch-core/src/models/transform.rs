use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named target geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Keep the source's native dimensions
    #[default]
    Original,
    Square,
    Portrait,
    Widescreen,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Original,
        Preset::Square,
        Preset::Portrait,
        Preset::Widescreen,
    ];

    /// Target box of the preset, `None` for native size
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Preset::Original => None,
            Preset::Square => Some((1080, 1080)),
            Preset::Portrait => Some((1080, 1920)),
            Preset::Widescreen => Some((1200, 675)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Original => "original",
            Preset::Square => "square",
            Preset::Portrait => "portrait",
            Preset::Widescreen => "widescreen",
        }
    }

    /// Resolve a selector value. Accepts preset names and `WxH` selectors;
    /// anything unknown falls back to the original size.
    pub fn from_selector(selector: &str) -> Self {
        match selector.trim().to_lowercase().as_str() {
            "square" | "1080x1080" => Preset::Square,
            "portrait" | "1080x1920" => Preset::Portrait,
            "widescreen" | "1200x675" => Preset::Widescreen,
            _ => Preset::Original,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dimensions() {
            Some((w, h)) => write!(f, "{} ({}x{})", self.as_str(), w, h),
            None => write!(f, "{} (native size)", self.as_str()),
        }
    }
}

impl FromStr for Preset {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Preset::from_selector(s))
    }
}

/// Concrete geometry and quality for one run.
///
/// Both dimensions absent means "keep native size". `quality` is passed to the
/// encoder unchanged; keeping it inside [1, 100] is the caller's responsibility
/// (the encoder clamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    pub quality: u8,
}

impl TransformConfig {
    pub fn resolve(preset: Preset, quality: u8) -> Self {
        let (target_width, target_height) = match preset.dimensions() {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };

        Self {
            target_width,
            target_height,
            quality,
        }
    }

    pub fn keeps_native_size(&self) -> bool {
        self.target_width.is_none() && self.target_height.is_none()
    }
}
