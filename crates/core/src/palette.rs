//! Palette tables consulted while writing decoded pixels.
//!
//! Decoders never see RGB values. They remap a logical index through a
//! [`ColorRemap`] (the per-context "room" or "verb" map) for 8-bit screens,
//! or through a [`HighColorPalette`] of pre-expanded RGB555 values for
//! 16-bit screens. [`RgbPalette`] holds the host's current RGB palette and is
//! only used for nearest-colour searches.

use serde::{Deserialize, Serialize};

/// Number of entries in every 8-bit palette.
pub const PALETTE_SIZE: usize = 256;

/// 256-entry byte-to-byte colour remap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRemap {
    table: [u8; PALETTE_SIZE],
}

impl Default for ColorRemap {
    fn default() -> Self {
        Self::identity()
    }
}

impl ColorRemap {
    /// Map every index onto itself.
    pub fn identity() -> Self {
        let mut table = [0u8; PALETTE_SIZE];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = i as u8;
        }
        Self { table }
    }

    /// Build a remap from up to 256 bytes; missing entries stay identity.
    pub fn from_slice(values: &[u8]) -> Self {
        let mut remap = Self::identity();
        for (dst, &src) in remap.table.iter_mut().zip(values) {
            *dst = src;
        }
        remap
    }

    #[inline]
    pub fn get(&self, index: u8) -> u8 {
        self.table[index as usize]
    }

    pub fn set(&mut self, index: u8, value: u8) {
        self.table[index as usize] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.table
    }
}

/// Pack 8-bit components into RGB555.
pub fn rgb_to_555(r: u8, g: u8, b: u8) -> u16 {
    (((r as u16) >> 3) << 10) | (((g as u16) >> 3) << 5) | ((b as u16) >> 3)
}

/// Pre-expanded 16-bit colour table.
///
/// Platforms with more than 256 on-screen colours address this table with
/// `palette_index * 16 + entry`, so it may hold more than 256 values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighColorPalette {
    colors: Vec<u16>,
}

impl HighColorPalette {
    /// Create a palette with `size` black entries.
    pub fn new(size: usize) -> Self {
        Self {
            colors: vec![0; size],
        }
    }

    pub fn from_colors(colors: Vec<u16>) -> Self {
        Self { colors }
    }

    /// Expand an RGB palette into RGB555.
    pub fn from_rgb(rgb: &[[u8; 3]]) -> Self {
        Self {
            colors: rgb.iter().map(|c| rgb_to_555(c[0], c[1], c[2])).collect(),
        }
    }

    /// Colour at `index`; out-of-range lookups read as black.
    #[inline]
    pub fn get(&self, index: usize) -> u16 {
        self.colors.get(index).copied().unwrap_or(0)
    }

    pub fn set(&mut self, index: usize, color: u16) {
        if index < self.colors.len() {
            self.colors[index] = color;
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for HighColorPalette {
    fn default() -> Self {
        Self::new(PALETTE_SIZE)
    }
}

/// The host's current RGB palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbPalette {
    entries: Vec<[u8; 3]>,
}

impl Default for RgbPalette {
    fn default() -> Self {
        Self {
            entries: vec![[0, 0, 0]; PALETTE_SIZE],
        }
    }
}

impl RgbPalette {
    pub fn from_entries(entries: Vec<[u8; 3]>) -> Self {
        Self { entries }
    }

    pub fn set(&mut self, index: usize, rgb: [u8; 3]) {
        if index < self.entries.len() {
            self.entries[index] = rgb;
        }
    }

    pub fn get(&self, index: usize) -> Option<[u8; 3]> {
        self.entries.get(index).copied()
    }

    /// Index of the entry closest to `(r, g, b)` by weighted squared
    /// distance. Ties resolve to the lowest index.
    pub fn closest(&self, r: u8, g: u8, b: u8) -> u8 {
        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (i, c) in self.entries.iter().enumerate().take(PALETTE_SIZE) {
            let dr = c[0] as i32 - r as i32;
            let dg = c[1] as i32 - g as i32;
            let db = c[2] as i32 - b as i32;
            let dist = (3 * dr * dr + 6 * dg * dg + 2 * db * db) as u32;
            if dist < best_dist {
                best_dist = dist;
                best = i;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_remap() {
        let remap = ColorRemap::identity();
        for i in 0..=255u8 {
            assert_eq!(remap.get(i), i);
        }
    }

    #[test]
    fn test_remap_from_short_slice() {
        let remap = ColorRemap::from_slice(&[9, 8, 7]);
        assert_eq!(remap.get(0), 9);
        assert_eq!(remap.get(2), 7);
        assert_eq!(remap.get(3), 3);
    }

    #[test]
    fn test_remap_set() {
        let mut remap = ColorRemap::default();
        remap.set(11, 86);
        assert_eq!(remap.get(11), 86);
        assert_eq!(remap.as_slice().len(), PALETTE_SIZE);
    }

    #[test]
    fn test_rgb_to_555() {
        assert_eq!(rgb_to_555(0, 0, 0), 0);
        assert_eq!(rgb_to_555(255, 255, 255), 0x7FFF);
        assert_eq!(rgb_to_555(255, 0, 0), 0x7C00);
        assert_eq!(rgb_to_555(0, 255, 0), 0x03E0);
        assert_eq!(rgb_to_555(0, 0, 255), 0x001F);
    }

    #[test]
    fn test_high_color_out_of_range() {
        let mut pal = HighColorPalette::new(4);
        pal.set(3, 0x1234);
        pal.set(10, 0x5678);
        assert_eq!(pal.get(3), 0x1234);
        assert_eq!(pal.get(10), 0);
        assert_eq!(pal.len(), 4);
    }

    #[test]
    fn test_closest_color() {
        let mut pal = RgbPalette::default();
        pal.set(1, [0xFC, 0xFC, 0xFC]);
        pal.set(2, [0x80, 0x00, 0x00]);
        assert_eq!(pal.closest(0, 0, 0), 0);
        assert_eq!(pal.closest(0xFF, 0xFF, 0xFF), 1);
        assert_eq!(pal.closest(0x90, 0x10, 0x00), 2);
    }
}
