//! NES rooms: tile nametables, attribute palettes and a 1-bit tile mask.
//!
//! Graphics come from two pattern tables like on the console. The base
//! tiles shared by every room sit at the start of the background table and
//! each room's tile set is loaded after them. Rooms narrower than the
//! 32-tile screen are centred with [`NesState::start_strip`].

use crate::mask::MaskColumn;
use crate::resource::read_le16;
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::logging::{log, LogCategory, LogLevel};

/// Bytes of pattern data: 256 tiles of 16 bytes.
const PATTERN_TABLE_SIZE: usize = 256 * 16;
const NAMETABLE_ROWS: usize = 16;
const NAMETABLE_COLS: usize = 64;
const MASK_COLS: usize = 8;

/// Palette used for every tile while the room lights are off.
const DARK_PALETTE: [u8; 16] = [
    0x2d, 0x1d, 0x3d, 0x20, 0x2d, 0x1d, 0x3d, 0x20, 0x2d, 0x1d, 0x3d, 0x20, 0x2d, 0x1d, 0x3d, 0x20,
];

struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Result<u8, GfxError> {
        self.src
            .get(self.pos)
            .copied()
            .ok_or(GfxError::Truncated { what: "NES graphics" })
    }

    fn next(&mut self) -> Result<u8, GfxError> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    /// One run: `[0x80 | n] b1..bn` literals or `[n] b` repeated. Returns
    /// the values in order through `emit`.
    fn run(&mut self, mut emit: impl FnMut(u8)) -> Result<(), GfxError> {
        let control = self.next()?;
        let count = control & 0x7F;
        if control & 0x80 != 0 {
            for _ in 0..count {
                emit(self.next()?);
            }
        } else {
            if count > 0 {
                let value = self.peek()?;
                for _ in 0..count {
                    emit(value);
                }
            }
            self.pos += 1;
        }
        Ok(())
    }
}

/// Expand a tile resource into `dest`. The resource starts with its data
/// length and a tile count, which is not checked.
pub fn decode_nes_tile_data(src: &[u8], dest: &mut [u8]) -> Result<(), GfxError> {
    let len = read_le16(src, 0)? as usize;
    let end = 2 + len;
    let mut cur = Cursor::new(src);
    cur.pos = 3;
    let mut out = 0;
    while cur.pos < end {
        cur.run(|b| {
            if let Some(d) = dest.get_mut(out) {
                *d = b;
            }
            out += 1;
        })?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NesState {
    pattern_table: Vec<u8>,
    base_tiles: usize,
    palette: [u8; 16],
    /// Tile resources; index 0 holds the base tiles
    tile_sets: Vec<Vec<u8>>,
    nametable: [[u8; NAMETABLE_COLS]; NAMETABLE_ROWS],
    nametable_obj: [[u8; NAMETABLE_COLS]; NAMETABLE_ROWS],
    attributes: [u8; 64],
    attributes_obj: [u8; 64],
    masktable: [[u8; MASK_COLS]; NAMETABLE_ROWS],
    masktable_obj: [[u8; MASK_COLS]; NAMETABLE_ROWS],
    has_mask: bool,
    obj_x: i32,
    start_strip: usize,
}

impl Default for NesState {
    fn default() -> Self {
        Self {
            pattern_table: vec![0; PATTERN_TABLE_SIZE],
            base_tiles: 0,
            palette: [0; 16],
            tile_sets: Vec::new(),
            nametable: [[0; NAMETABLE_COLS]; NAMETABLE_ROWS],
            nametable_obj: [[0; NAMETABLE_COLS]; NAMETABLE_ROWS],
            attributes: [0; 64],
            attributes_obj: [0; 64],
            masktable: [[0; MASK_COLS]; NAMETABLE_ROWS],
            masktable_obj: [[0; MASK_COLS]; NAMETABLE_ROWS],
            has_mask: false,
            obj_x: 0,
            start_strip: 0,
        }
    }
}

impl NesState {
    /// Install the tile resources. The first one holds the base tiles and
    /// is decoded at once.
    pub fn load_tile_sets(&mut self, sets: Vec<Vec<u8>>) -> Result<(), GfxError> {
        let base = sets.first().ok_or(GfxError::MissingChunk {
            tag: "NES base tiles".to_string(),
        })?;
        self.base_tiles = *base.get(2).ok_or(GfxError::Truncated { what: "NES base tiles" })? as usize;
        decode_nes_tile_data(base, &mut self.pattern_table)?;
        self.tile_sets = sets;
        Ok(())
    }

    /// Strips the room is shifted right by to centre it on screen.
    pub fn start_strip(&self) -> usize {
        self.start_strip
    }

    pub fn palette(&self) -> &[u8; 16] {
        &self.palette
    }

    pub fn has_mask(&self) -> bool {
        self.has_mask
    }

    /// Decode a room's tile set, palette, nametable, attributes and mask.
    pub fn room_changed(&mut self, room: &[u8], current_room: u16) -> Result<(), GfxError> {
        let gdata_at = read_le16(room, 0x0A)? as usize;
        let width = read_le16(room, 0x04)? as usize;
        let mut g = Cursor::new(room);
        g.pos = gdata_at;
        let tileset = g.next()? as usize;

        self.start_strip = if width < 32 { (32 - width) >> 1 } else { 0 };

        let tiles = self.tile_sets.get(tileset).ok_or_else(|| GfxError::MissingChunk {
            tag: format!("NES tile set {}", tileset),
        })?;
        let dest = self
            .pattern_table
            .get_mut(self.base_tiles * 16..)
            .ok_or(GfxError::Truncated { what: "NES pattern table" })?;
        decode_nes_tile_data(tiles, dest)?;

        for c in self.palette.iter_mut() {
            *c = g.next()?;
        }

        for row in self.nametable.iter_mut() {
            row[0] = 0;
            row[1] = 0;
            let mut n = 0;
            while n < width {
                g.run(|b| {
                    if let Some(cell) = row.get_mut(2 + n) {
                        *cell = b;
                    }
                    n += 1;
                })?;
            }
            for col in [width + 2, width + 3] {
                if let Some(cell) = row.get_mut(col) {
                    *cell = 0;
                }
            }
        }
        self.nametable_obj = self.nametable;

        let mut a = Cursor::new(room);
        a.pos = read_le16(room, 0x0C)? as usize;
        let mut n = 0;
        while n < 64 {
            let attributes = &mut self.attributes;
            a.run(|b| {
                if let Some(cell) = attributes.get_mut(n) {
                    *cell = b;
                }
                n += 1;
            })?;
            if n & 7 == 0 && width == 0x1C {
                n += 8;
            }
        }
        self.attributes_obj = self.attributes;

        let mut m = Cursor::new(room);
        m.pos = read_le16(room, 0x0E)? as usize;
        let count = m.next()?;
        if count == 0 {
            self.has_mask = false;
            return Ok(());
        }
        self.has_mask = true;
        if count != 1 {
            log(LogCategory::Mask, LogLevel::Debug, || {
                format!("NES room {} has irregular mask count {}", current_room, count)
            });
        }
        let mwidth = m.next()? as usize;
        for row in self.masktable.iter_mut() {
            let mut n = 0;
            while n < mwidth {
                m.run(|b| {
                    if let Some(cell) = row.get_mut(n) {
                        *cell = b;
                    }
                    n += 1;
                })?;
            }
        }
        self.masktable_obj = self.masktable;
        Ok(())
    }

    /// Patch the object copies of the nametable, attributes and mask with
    /// an object's tiles. Positions are in pixels; `xpos` is in tiles.
    pub fn decode_object(
        &mut self,
        image: &[u8],
        xpos: i32,
        ypos: i32,
        width: i32,
        height: i32,
    ) -> Result<(), GfxError> {
        self.obj_x = xpos;
        let width = width / 8;
        let ypos = ypos / 8;
        let height = height / 8;
        let mut p = Cursor::new(image);

        for y in ypos..ypos + height {
            let mut x = xpos;
            while x < xpos + width {
                let table = &mut self.nametable_obj;
                p.run(|b| {
                    if let Some(cell) = usize::try_from(y)
                        .ok()
                        .and_then(|y| table.get_mut(y))
                        .and_then(|row| row.get_mut((2 + x).max(0) as usize))
                    {
                        *cell = b;
                    }
                    x += 1;
                })?;
            }
        }

        let mut ay = ypos;
        for _ in 0..height / 2 {
            let mut ax = xpos + 2;
            let mut adata = 0u8;
            for x in 0..(width >> 1) {
                if x & 3 == 0 {
                    adata = p.next()?;
                }
                let at = (((ay << 2) & 0x30) | ((ax >> 2) & 0xF)) as usize;
                let mut aand = 3u8;
                let mut aor = adata & 3;
                if ay & 2 != 0 {
                    aand <<= 4;
                    aor <<= 4;
                }
                if ax & 2 != 0 {
                    aand <<= 2;
                    aor <<= 2;
                }
                let dest = &mut self.attributes_obj[at];
                *dest = (!aand & *dest) | aor;
                adata >>= 2;
                ax += 2;
            }
            ay += 2;
        }

        if !self.has_mask {
            return Ok(());
        }
        let mx = p.next()? as usize;
        let mwidth = p.next()? as usize;
        let lmask = p.next()?;
        let rmask = p.next()?;
        for y in 0..height {
            let row_at = (y + ypos) as usize;
            for x in 0..mwidth.max(1) {
                let value = p.next()?;
                let Some(dest) = self
                    .masktable_obj
                    .get_mut(row_at)
                    .and_then(|row| row.get_mut(mx + x))
                else {
                    continue;
                };
                *dest = if x == 0 {
                    (*dest & lmask) | value
                } else if x + 1 == mwidth {
                    (*dest & rmask) | value
                } else {
                    value
                };
            }
        }
        Ok(())
    }

    /// Draw tile rows `top / 8 .. (top + height) / 8` of strip `stripnr`,
    /// writing each row's tile coverage to the mask column as it goes.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_strip(
        &self,
        dst: &mut PixelView,
        mask: &mut MaskColumn,
        stripnr: usize,
        top: usize,
        height: usize,
        object_mode: bool,
        lights_on: bool,
    ) {
        let top = top / 8;
        let height = height / 8;
        let palette = if lights_on { &self.palette } else { &DARK_PALETTE };
        let mut x = stripnr as i32 + 2;
        if object_mode {
            x += self.obj_x;
        }
        if !(0..NAMETABLE_COLS as i32).contains(&x) {
            log(LogCategory::Compositor, LogLevel::Debug, || {
                format!("NES tried to render invalid strip {}", stripnr)
            });
            return;
        }
        let x = x as usize;
        let (attributes, nametable) = if object_mode {
            (&self.attributes_obj, &self.nametable_obj)
        } else {
            (&self.attributes, &self.nametable)
        };

        for (row, y) in (top..top + height).enumerate() {
            let attr = attributes[((y << 2) & 0x30) | ((x >> 2) & 0xF)];
            let pal = (attr >> (((y & 2) << 1) | (x & 2))) & 3;
            let tile = nametable.get(y).map_or(0, |r| r[x]) as usize;

            for i in 0..8 {
                let c0 = self.pattern_table.get(tile * 16 + i).copied().unwrap_or(0);
                let c1 = self.pattern_table.get(tile * 16 + i + 8).copied().unwrap_or(0);
                let py = (row * 8 + i) as isize;
                for j in 0..8 {
                    let bits = ((c0 >> (7 - j)) & 1) | (((c1 >> (7 - j)) & 1) << 1);
                    dst.put8(j as isize, py, palette[(bits | (pal << 2)) as usize]);
                }
                mask.put(row * 8 + i, c0 | c1);
            }
        }
    }

    /// AND the room's 1-bit tile mask into the mask column. Mask strips are
    /// not shifted by the 2-tile screen border.
    pub fn draw_mask(
        &self,
        mask: &mut MaskColumn,
        stripnr: usize,
        top: usize,
        height: usize,
        object_mode: bool,
    ) {
        let top = top / 8;
        let height = height / 8;
        let mut x = stripnr as i32;
        if object_mode {
            x += self.obj_x;
        }
        if !(0..NAMETABLE_COLS as i32).contains(&x) {
            log(LogCategory::Mask, LogLevel::Debug, || {
                format!("NES tried to mask invalid strip {}", stripnr)
            });
            return;
        }
        let x = x as usize;
        let table = if object_mode {
            &self.masktable_obj
        } else {
            &self.masktable
        };

        for (row, y) in (top..top + height).enumerate() {
            let c = if self.has_mask {
                let bits = table.get(y).map_or(0, |r| r[x >> 3]);
                if (bits >> (x & 7)) & 1 != 0 {
                    0xFF
                } else {
                    0x00
                }
            } else {
                0
            };
            for i in 0..8 {
                let old = mask.get(row * 8 + i);
                mask.put(row * 8 + i, old & c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_data_runs() {
        // length 5, count byte, then 3 x 0xAA and literals 1 2
        let src = [5, 0, 9, 0x03, 0xAA, 0x82, 1, 2];
        let mut dest = [0u8; 8];
        decode_nes_tile_data(&src, &mut dest).unwrap();
        assert_eq!(&dest[..5], &[0xAA, 0xAA, 0xAA, 1, 2]);
    }

    #[test]
    fn test_zero_length_repeat_run() {
        // repeat control with count 0 at the very end of the data
        let src = [2, 0, 0, 0];
        let mut dest = [0x55u8; 4];
        decode_nes_tile_data(&src, &mut dest).unwrap();
        assert_eq!(dest, [0x55; 4]);
    }

    /// Base tiles: tile 0 blank, tile 1 solid colour 3 (both planes set).
    fn base_tiles() -> Vec<u8> {
        let mut data = vec![0u8, 0, 2];
        data.extend_from_slice(&[16, 0x00, 16, 0xFF]);
        let len = (data.len() - 2) as u16;
        data[..2].copy_from_slice(&len.to_le_bytes());
        data
    }

    /// A 2-tile-wide room using tile 1 everywhere, palette 0..16, no mask.
    fn room(width: u8) -> Vec<u8> {
        let mut room = vec![0u8; 0x10];
        room[0x04] = width;
        let mut gfx = vec![1u8];
        gfx.extend(0..16u8);
        for _ in 0..16 {
            gfx.extend_from_slice(&[width, 1]);
        }
        let g_at = room.len();
        room.extend(gfx);
        let a_at = room.len();
        room.extend_from_slice(&[64, 0]);
        let m_at = room.len();
        room.push(0);
        room[0x0A..0x0C].copy_from_slice(&(g_at as u16).to_le_bytes());
        room[0x0C..0x0E].copy_from_slice(&(a_at as u16).to_le_bytes());
        room[0x0E..0x10].copy_from_slice(&(m_at as u16).to_le_bytes());
        room
    }

    fn loaded(width: u8) -> NesState {
        let mut state = NesState::default();
        // Tile set 0 is the base set; the room's tiles load after it
        let empty = vec![2, 0, 0, 0];
        state.load_tile_sets(vec![base_tiles(), empty]).unwrap();
        state.room_changed(&room(width), 1).unwrap();
        state
    }

    #[test]
    fn test_narrow_room_is_centred() {
        assert_eq!(loaded(28).start_strip(), 2);
        assert_eq!(loaded(32).start_strip(), 0);
    }

    #[test]
    fn test_draw_strip_colours_and_mask() {
        let state = loaded(2);
        let mut buf = vec![0u8; 8 * 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        let mut mask_buf = vec![0u8; 8];
        let mut mask = MaskColumn::new(&mut mask_buf, 0, 1);
        state.draw_strip(&mut view, &mut mask, 0, 0, 8, false, true);
        // Both planes set, attribute palette 0: entry 3
        assert!(buf.iter().all(|&p| p == 3));
        assert!(mask_buf.iter().all(|&m| m == 0xFF));
    }

    #[test]
    fn test_dark_palette_when_lights_off() {
        let state = loaded(2);
        let mut buf = vec![0u8; 8 * 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        let mut mask_buf = vec![0u8; 8];
        let mut mask = MaskColumn::new(&mut mask_buf, 0, 1);
        state.draw_strip(&mut view, &mut mask, 0, 0, 8, false, false);
        assert!(buf.iter().all(|&p| p == 0x20));
    }

    #[test]
    fn test_no_mask_clears_column() {
        let state = loaded(2);
        let mut mask_buf = vec![0xFFu8; 8];
        let mut mask = MaskColumn::new(&mut mask_buf, 0, 1);
        state.draw_mask(&mut mask, 0, 0, 8, false);
        assert!(mask_buf.iter().all(|&m| m == 0));
    }

    #[test]
    fn test_invalid_strip_is_skipped() {
        let state = loaded(2);
        let mut buf = vec![7u8; 8 * 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        let mut mask_buf = vec![0u8; 8];
        let mut mask = MaskColumn::new(&mut mask_buf, 0, 1);
        state.draw_strip(&mut view, &mut mask, 62, 0, 8, false, true);
        assert!(buf.iter().all(|&p| p == 7));
    }
}
