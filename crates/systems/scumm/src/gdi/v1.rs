//! Character-cell graphics of the first generation (C64 and v1 PC ports).
//!
//! Rooms are grids of 8x8 character cells. Each cell picks a character
//! bitmap from the room's charset and a colour from the colour map; every
//! bitmap pixel is two screen pixels wide and selects one of four colours.

use crate::mask::MaskColumn;
use crate::resource::read_le16;
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::palette::ColorRemap;

/// Size of the decoded room charset.
const CHAR_MAP_SIZE: usize = 2048;

#[derive(Debug, Clone)]
pub struct V1State {
    colors: [u8; 4],
    char_map: Vec<u8>,
    pic_map: Vec<u8>,
    color_map: Vec<u8>,
    mask_map: Vec<u8>,
    mask_char: Vec<u8>,
    object_map: Vec<u8>,
    /// Final colour for each of the 16 palette entries under the current
    /// render mode
    render_colors: [u8; 16],
}

impl Default for V1State {
    fn default() -> Self {
        let mut render_colors = [0u8; 16];
        for (i, c) in render_colors.iter_mut().enumerate() {
            *c = i as u8;
        }
        Self {
            colors: [0; 4],
            char_map: Vec::new(),
            pic_map: Vec::new(),
            color_map: Vec::new(),
            mask_map: Vec::new(),
            mask_char: Vec::new(),
            object_map: Vec::new(),
            render_colors,
        }
    }
}

/// Expand a v1 run-length stream into `size` bytes.
///
/// The stream starts with four "common" colours. After that a control byte
/// either repeats a common colour (`1ccnnnnn`), repeats the next byte
/// (`01nnnnnn`) or copies `n + 1` literal bytes (`00nnnnnn`).
pub fn decode_v1_gfx(src: &[u8], size: usize) -> Result<Vec<u8>, GfxError> {
    let truncated = GfxError::Truncated { what: "v1 graphics" };
    let common: [u8; 4] = src
        .get(..4)
        .and_then(|c| c.try_into().ok())
        .ok_or(truncated.clone())?;
    let mut pos = 4;
    let mut next = || -> Result<u8, GfxError> {
        let b = *src.get(pos).ok_or(truncated.clone())?;
        pos += 1;
        Ok(b)
    };

    let mut out = Vec::with_capacity(size);
    while out.len() < size {
        let run = next()?;
        if run & 0x80 != 0 {
            let color = common[((run >> 5) & 3) as usize];
            for _ in 0..=(run & 0x1F) {
                out.push(color);
            }
        } else if run & 0x40 != 0 {
            let color = next()?;
            for _ in 0..=(run & 0x3F) {
                out.push(color);
            }
        } else {
            for _ in 0..=run {
                out.push(next()?);
            }
        }
    }
    out.truncate(size);
    Ok(out)
}

impl V1State {
    /// Decode the room's charset, picture, colour and mask maps.
    ///
    /// The room header holds the width and height in cells at 4 and 5, the
    /// three fixed cell colours at 6..9 and the map offsets from 10 on.
    pub fn room_changed(&mut self, room: &[u8]) -> Result<(), GfxError> {
        let header = room.get(..10).ok_or(GfxError::Truncated { what: "v1 room header" })?;
        self.colors.copy_from_slice(&header[6..10]);
        let cells = header[4] as usize * header[5] as usize;

        let at = |offset_at: usize| -> Result<&[u8], GfxError> {
            let off = read_le16(room, offset_at)? as usize;
            room.get(off..).ok_or(GfxError::Truncated { what: "v1 room map" })
        };

        self.char_map = decode_v1_gfx(at(10)?, CHAR_MAP_SIZE)?;
        self.pic_map = decode_v1_gfx(at(12)?, cells)?;
        self.color_map = decode_v1_gfx(at(14)?, cells)?;
        self.mask_map = decode_v1_gfx(at(16)?, cells)?;

        let mask = at(18)?;
        let mask_len = (read_le16(mask, 0)? as usize).saturating_sub(8);
        let mask_src = mask.get(2..).ok_or(GfxError::Truncated { what: "v1 mask charset" })?;
        self.mask_char = decode_v1_gfx(mask_src, mask_len)?;
        Ok(())
    }

    /// Decode an object's cell, colour and mask maps, stored back to back.
    pub fn prepare_object(&mut self, image: &[u8], width: usize, height: usize) -> Result<(), GfxError> {
        self.object_map = decode_v1_gfx(image, (width / 8) * (height / 8) * 3)?;
        Ok(())
    }

    pub fn set_render_colors(&mut self, map: [u8; 16]) {
        self.render_colors = map;
    }

    pub fn remap_color(&self, color: u8) -> u8 {
        self.render_colors[(color & 15) as usize]
    }

    fn draw_cell(&self, dst: &mut PixelView, char_idx: usize, top: isize) {
        for i in 0..8 {
            let c = self.char_map.get(char_idx + i).copied().unwrap_or(0);
            for pair in 0..4 {
                let sel = (c >> (6 - pair * 2)) & 3;
                let color = self.remap_color(self.colors[sel as usize]);
                dst.put8(pair as isize * 2, top + i as isize, color);
                dst.put8(pair as isize * 2 + 1, top + i as isize, color);
            }
        }
    }

    /// Room background strip. A room palette starting with 255 overrides
    /// cell colours 1 and 2.
    pub fn draw_background(
        &mut self,
        dst: &mut PixelView,
        strip: usize,
        height: usize,
        room_palette: &ColorRemap,
    ) {
        let rows = height / 8;
        for y in 0..rows {
            let cell = y + strip * rows;
            self.colors[3] = self.color_map.get(cell).copied().unwrap_or(0) & 7;
            if room_palette.get(0) == 255 {
                self.colors[2] = room_palette.get(2);
                self.colors[1] = room_palette.get(1);
            }
            let char_idx = self.pic_map.get(cell).copied().unwrap_or(0) as usize * 8;
            self.draw_cell(dst, char_idx, (y * 8) as isize);
        }
    }

    /// Object strip: cell indices first, then colours, `width / 8` cells
    /// per row.
    pub fn draw_object(&mut self, dst: &mut PixelView, strip: usize, width: usize, height: usize) {
        let rows = height / 8;
        let cols = width / 8;
        for y in 0..rows {
            self.colors[3] = self.object_cell((y + rows) * cols + strip) & 7;
            let char_idx = self.object_cell(y * cols + strip) as usize * 8;
            self.draw_cell(dst, char_idx, (y * 8) as isize);
        }
    }

    fn object_cell(&self, at: usize) -> u8 {
        self.object_map.get(at).copied().unwrap_or(0)
    }

    /// Mask strip. Stored masks are inverted relative to the mask store.
    pub fn draw_mask(
        &self,
        mask: &mut MaskColumn,
        strip: usize,
        width: usize,
        height: usize,
        object_mode: bool,
    ) {
        let rows = height / 8;
        let cols = width / 8;
        for y in 0..rows {
            let mask_idx = if object_mode {
                self.object_cell((y + 2 * rows) * cols + strip)
            } else {
                self.mask_map.get(y + strip * rows).copied().unwrap_or(0)
            } as usize
                * 8;
            for i in 0..8 {
                let c = self.mask_char.get(mask_idx + i).copied().unwrap_or(0);
                mask.put(y * 8 + i, c ^ 0xFF);
            }
        }
    }
}
