//! Palette and pixel-format state shared by every strip decoder.

use crate::game::GameProfile;
use crate::surface::PixelView;
use gfx_core::palette::{ColorRemap, HighColorPalette};

/// Index the decoders treat as "leave the destination pixel alone".
pub const DEFAULT_TRANSPARENT_COLOR: u8 = 255;

/// Everything a codec needs besides its input bytes and destination.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub room_palette: ColorRemap,
    pub verb_palette: ColorRemap,
    /// Decode through the verb palette instead of the room palette
    pub use_verb_palette: bool,
    pub high_color: HighColorPalette,
    /// Added to every room colour before lookup (Amiga v4+)
    pub palette_mod: u8,
    pub transparent_color: u8,
    pub bytes_per_pixel: usize,
    /// Raw strips are column-major
    pub old_256: bool,
    /// Strips carry no codec byte and are EGA run-length data
    pub sixteen_color: bool,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            room_palette: ColorRemap::identity(),
            verb_palette: ColorRemap::identity(),
            use_verb_palette: false,
            high_color: HighColorPalette::default(),
            palette_mod: 0,
            transparent_color: DEFAULT_TRANSPARENT_COLOR,
            bytes_per_pixel: 1,
            old_256: false,
            sixteen_color: false,
        }
    }
}

impl RenderContext {
    pub fn for_game(profile: &GameProfile) -> Self {
        Self {
            palette_mod: if profile.is_amiga() && profile.version >= 4 {
                16
            } else {
                0
            },
            bytes_per_pixel: profile.bytes_per_pixel(),
            old_256: profile.features.old_256,
            sixteen_color: profile.features.sixteen_color,
            ..Self::default()
        }
    }

    /// Palette the next strip is decoded through.
    pub fn palette(&self) -> &ColorRemap {
        if self.use_verb_palette {
            &self.verb_palette
        } else {
            &self.room_palette
        }
    }

    pub fn palette_mut(&mut self) -> &mut ColorRemap {
        if self.use_verb_palette {
            &mut self.verb_palette
        } else {
            &mut self.room_palette
        }
    }

    /// Plain palette lookup with no colour offset.
    #[inline]
    pub fn lookup(&self, index: u8) -> u8 {
        self.palette().get(index)
    }

    /// Store room colour `color` at (x, y). 8-bit screens go through the
    /// active palette with the colour offset applied (wrapping at 256);
    /// 16-bit screens take the pre-expanded value.
    #[inline]
    pub fn write_room_color(&self, dst: &mut PixelView, x: isize, y: isize, color: u8) {
        if self.bytes_per_pixel == 2 {
            dst.put16(x, y, self.high_color.get(color as usize));
        } else {
            dst.put8(x, y, self.lookup(color.wrapping_add(self.palette_mod)));
        }
    }

    #[inline]
    pub fn is_transparent(&self, color: u8) -> bool {
        color == self.transparent_color
    }
}
