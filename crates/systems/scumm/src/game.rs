//! Description of the game variant being rendered.
//!
//! Almost every decision in the compositor keys off the interpreter version,
//! the target platform and a handful of resource-layout feature flags. The
//! profile is plain data so it can be stored next to the game files.

use serde::{Deserialize, Serialize};

/// Titles that carry game-specific behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameId {
    Maniac,
    Zak,
    Indy3,
    Loom,
    /// Monkey Island 1, EGA and CD releases
    Monkey,
    /// Monkey Island 1, VGA floppy release
    MonkeyVga,
    Monkey2,
    Indy4,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    Dos,
    Amiga,
    AtariSt,
    Macintosh,
    FmTowns,
    C64,
    Apple2gs,
    Nes,
    PcEngine,
    ThreeDo,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    German,
    French,
    Italian,
    Spanish,
    Other,
}

/// Resource layout flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameFeatures {
    /// 16-colour EGA graphics, strips carry no codec byte
    pub sixteen_color: bool,
    /// Early 256-colour releases: raw strips are column-major
    pub old_256: bool,
    /// Resources without chunk headers, offsets counted from the bitmap start
    pub small_header: bool,
    /// Oldest bundle layout (v1/v2/v3 EGA)
    pub old_bundle: bool,
    /// 16-bit RGB555 screens
    pub high_color: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameProfile {
    pub id: GameId,
    pub version: u8,
    /// Humongous interpreter version (60, 70, 71, 72, 80, 90, 100...), 0 otherwise
    pub he_version: u16,
    pub platform: Platform,
    pub language: Language,
    pub features: GameFeatures,
    pub screen_width: usize,
    pub screen_height: usize,
}

impl Default for GameProfile {
    fn default() -> Self {
        Self {
            id: GameId::Other,
            version: 5,
            he_version: 0,
            platform: Platform::Dos,
            language: Language::English,
            features: GameFeatures::default(),
            screen_width: 320,
            screen_height: 200,
        }
    }
}

impl GameProfile {
    pub fn new(id: GameId, version: u8, platform: Platform) -> Self {
        Self {
            id,
            version,
            platform,
            ..Self::default()
        }
    }

    pub fn with_features(mut self, features: GameFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_he_version(mut self, he_version: u16) -> Self {
        self.he_version = he_version;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_screen(mut self, width: usize, height: usize) -> Self {
        self.screen_width = width;
        self.screen_height = height;
        self
    }

    pub fn is_nes(&self) -> bool {
        self.platform == Platform::Nes
    }

    pub fn is_pce(&self) -> bool {
        self.platform == Platform::PcEngine
    }

    pub fn is_amiga(&self) -> bool {
        self.platform == Platform::Amiga
    }

    pub fn is_he(&self) -> bool {
        self.he_version > 0
    }

    /// Bytes per pixel of every virtual screen.
    pub fn bytes_per_pixel(&self) -> usize {
        if self.features.high_color {
            2
        } else {
            1
        }
    }

    /// Number of 8-pixel strips across the screen. v7 and later keep one
    /// extra strip for smooth scrolling.
    pub fn num_strips(&self) -> usize {
        let strips = self.screen_width / 8;
        if self.version >= 7 {
            strips + 1
        } else {
            strips
        }
    }

    /// Every room is lit from v6 on.
    pub fn always_lit(&self) -> bool {
        self.version >= 6
    }

    /// Indy4 on the Amiga draws the verb area through the verb palette.
    pub fn is_indy4_amiga(&self) -> bool {
        self.id == GameId::Indy4 && self.platform == Platform::Amiga
    }

    /// Colour the NES hardware shows for a cleared screen.
    pub fn clear_color(&self) -> u8 {
        if self.is_nes() {
            0x1d
        } else {
            0
        }
    }
}
