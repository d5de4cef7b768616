//! The text overlay. Charset text for pre-v7 games is drawn into its own
//! 8-bit surface and composited over the game screens as strips are sent
//! to the display.

use crate::GfxError;
use gfx_core::palette::HighColorPalette;
use gfx_core::types::Rect;

/// Text surface value for "no text here".
pub const CHARSET_MASK_TRANSPARENCY: u8 = 0xFD;

#[derive(Debug, Clone)]
pub struct TextSurface {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl TextSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![CHARSET_MASK_TRANSPARENCY; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.width
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        if x >= self.width {
            return CHARSET_MASK_TRANSPARENCY;
        }
        self.pixels
            .get(y * self.width + x)
            .copied()
            .unwrap_or(CHARSET_MASK_TRANSPARENCY)
    }

    pub fn put(&mut self, x: usize, y: usize, color: u8) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Fill `rect`, clipped to the surface.
    pub fn fill_rect(&mut self, rect: Rect, color: u8) {
        let mut r = rect;
        r.clip(self.width as i32, self.height as i32);
        if r.is_empty() {
            return;
        }
        for y in r.top..r.bottom {
            let row = y as usize * self.width;
            self.pixels[row + r.left as usize..row + r.right as usize].fill(color);
        }
    }

    /// Remove all text.
    pub fn clear(&mut self) {
        self.pixels.fill(CHARSET_MASK_TRANSPARENCY);
    }

    /// Overlay the text at display position (x, y) on a `width` x `height`
    /// block of screen pixels and append the result to `out`.
    ///
    /// `src` starts at the block's first pixel, rows `src_pitch` bytes
    /// apart. 8-bit screens pass text colours through unchanged; on a
    /// 16-bit display they are expanded through `palette`, which HE games
    /// never do.
    #[allow(clippy::too_many_arguments)]
    pub fn composite(
        &self,
        src: &[u8],
        src_pitch: usize,
        bpp: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        palette: Option<&HighColorPalette>,
        out: &mut Vec<u8>,
    ) -> Result<(), GfxError> {
        out.clear();
        out.reserve(width * height * bpp);
        for row in 0..height {
            let line = row * src_pitch;
            for col in 0..width {
                let t = self.get(x + col, y + row);
                let at = line + col * bpp;
                if bpp == 2 {
                    let value = if t == CHARSET_MASK_TRANSPARENCY {
                        src.get(at..at + 2)
                            .map_or(0, |b| u16::from_le_bytes([b[0], b[1]]))
                    } else {
                        match palette {
                            Some(pal) => pal.get(t as usize),
                            None => {
                                return Err(GfxError::Unsupported(
                                    "16-bit colour with the old charset overlay".to_string(),
                                ))
                            }
                        }
                    };
                    out.extend_from_slice(&value.to_le_bytes());
                } else if t == CHARSET_MASK_TRANSPARENCY {
                    out.push(src.get(at).copied().unwrap_or(0));
                } else {
                    out.push(t);
                }
            }
        }
        Ok(())
    }
}
