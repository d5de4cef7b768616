//! PC Engine rooms: 4-bit planar tiles with one 16-colour sub-palette per
//! tile and an 8x8 mask pattern per tile.
//!
//! The room's `TILE` chunk carries the tile patterns, `ZP00` the mask
//! patterns and `IM00` one column of tile, palette and mask indices per
//! strip. Objects carry only the column data.

use crate::mask::MaskColumn;
use crate::resource::{find_chunk_data, read_le16, require_chunk};
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::palette::HighColorPalette;

/// Strips taller than this carry no mask indices.
const MAX_MASKED_ROWS: usize = 18;

struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at(src: &'a [u8], pos: usize) -> Self {
        Self { src, pos }
    }

    fn byte(&mut self) -> Result<u8, GfxError> {
        let b = *self
            .src
            .get(self.pos)
            .ok_or(GfxError::Truncated { what: "PC Engine graphics" })?;
        self.pos += 1;
        Ok(b)
    }

    fn word(&mut self) -> Result<u16, GfxError> {
        let w = read_le16(self.src, self.pos)?;
        self.pos += 2;
        Ok(w)
    }
}

/// Read a table of 16-bit offsets. The first entry also gives the table
/// size; every entry is made relative to the table start.
pub fn read_offset_table(ptr: &[u8]) -> Result<Vec<usize>, GfxError> {
    let count = read_le16(ptr, 0)? as usize / 2 + 1;
    (0..count)
        .map(|i| Ok(read_le16(ptr, i * 2)? as usize + i * 2 + 2))
        .collect()
}

fn store<T: Copy>(table: &mut [T], at: usize, value: T) {
    if let Some(slot) = table.get_mut(at) {
        *slot = value;
    }
}

/// Two palette indices per byte, high nibble first.
fn decode_tile_color(cmd: u8, colors: &mut [u8], row: &mut usize, num_rows: usize) {
    store(colors, *row, (cmd >> 4) & 0xF);
    *row += 1;
    if *row < num_rows {
        store(colors, *row, cmd & 0xF);
        *row += 1;
    }
}

/// Set one 8-pixel row of two bitplanes. Indices 0..8 fill planes 0 and 1,
/// 8..16 planes 2 and 3.
fn set_tile_data(tile: &mut [u8], index: usize, byte0: u8, byte1: u8) {
    let row = index % 8;
    let plane = (index / 8) * 2;
    for col in 0..8 {
        let b0 = (byte0 >> (7 - col)) & 1;
        let b1 = (byte1 >> (7 - col)) & 1;
        if let Some(px) = tile.get_mut(row * 8 + col) {
            *px |= (b0 << plane) | (b1 << (plane + 1));
        }
    }
}

/// Column tables for one image: tile index, palette and mask index per
/// 8-pixel cell, strip-major.
#[derive(Debug, Clone, Default)]
struct CellTables {
    tiles: Vec<u16>,
    colors: Vec<u8>,
    masks: Vec<u16>,
}

impl CellTables {
    fn reset(&mut self, cells: usize) {
        self.tiles = vec![0; cells];
        self.colors = vec![0; cells];
        self.masks.resize(cells, 0);
    }
}

#[derive(Debug, Clone, Default)]
pub struct PceState {
    room_tiles: Vec<u8>,
    staff_tiles: Vec<u8>,
    masks: Vec<u8>,
    num_masks: usize,
    mask_id_size: u8,
    room: CellTables,
    object: CellTables,
    /// Draw with the distaff tile set (Loom's musical staff)
    pub distaff: bool,
}

impl PceState {
    /// Decode one strip's tile, palette and mask indices into `out`
    /// starting at cell `at`.
    fn decode_strip(
        &self,
        src: &[u8],
        out: &mut CellTables,
        at: usize,
        num_rows: usize,
        is_object: bool,
    ) -> Result<(), GfxError> {
        if num_rows == 0 {
            return Ok(());
        }
        let mut p = Cursor::at(src, 0);
        let tiles = &mut out.tiles;

        let (mut row, rows_to_fill) = if is_object {
            (0, num_rows)
        } else {
            store(tiles, at, 0);
            store(tiles, at + num_rows - 1, 0);
            (1, num_rows - 1)
        };

        let mut last;
        loop {
            let cmd = p.word()?;
            if cmd & 0x8000 != 0 {
                if row > 0 {
                    store(tiles, at + row - 1, cmd & 0x0FFF);
                }
            } else if cmd & 0x4000 != 0 {
                store(tiles, at + num_rows - 1, cmd & 0x0FFF);
            } else {
                store(tiles, at + row, cmd);
                row += 1;
                last = cmd;
                break;
            }
        }

        while row < rows_to_fill {
            let cmd = p.byte()?;
            let cnt = (cmd & 0x1F) as usize;
            for _ in 0..cnt {
                if cmd & 0x80 == 0 {
                    last = if cmd & 0x40 != 0 {
                        last.wrapping_add(1)
                    } else {
                        p.word()?
                    };
                }
                store(tiles, at + row, last);
                row += 1;
            }
        }

        let start = at.min(out.colors.len());
        let colors = &mut out.colors[start..];
        let mut row = 0;
        let cmd = p.byte()?;
        if cmd == 0xFE {
            while row < num_rows {
                decode_tile_color(p.byte()?, colors, &mut row, num_rows);
            }
        } else {
            let mut last_cmd = cmd;
            decode_tile_color(cmd, colors, &mut row, num_rows);
            while row < num_rows {
                let cmd = p.byte()?;
                let cnt = cmd & 0x1F;
                if cmd & 0x80 != 0 {
                    for _ in 0..cnt {
                        decode_tile_color(last_cmd, colors, &mut row, num_rows);
                    }
                } else {
                    let mut c = cmd;
                    for _ in 0..cnt {
                        c = p.byte()?;
                        decode_tile_color(c, colors, &mut row, num_rows);
                    }
                    last_cmd = c;
                }
            }
        }

        if self.distaff || self.mask_id_size == 0 || num_rows > MAX_MASKED_ROWS {
            return Ok(());
        }

        let masks = &mut out.masks;
        let mut row = 0;
        while row < num_rows {
            let cmd = p.byte()?;
            let cnt = (cmd & 0x1F) as usize;
            if cmd & 0x80 != 0 {
                let value = if cmd & 0x60 != 0 {
                    if cmd & 0x40 != 0 {
                        0
                    } else {
                        0xFF
                    }
                } else {
                    self.read_mask_id(&mut p)?
                };
                for _ in 0..cnt {
                    store(masks, at + row, value);
                    row += 1;
                }
            } else {
                for _ in 0..cnt {
                    let value = self.read_mask_id(&mut p)?;
                    store(masks, at + row, value);
                    row += 1;
                }
            }
        }
        Ok(())
    }

    fn read_mask_id(&self, p: &mut Cursor) -> Result<u16, GfxError> {
        if self.mask_id_size == 1 {
            Ok(p.byte()? as u16)
        } else {
            p.word()
        }
    }

    fn decode_tile_data(&mut self, ptr: &[u8]) -> Result<(), GfxError> {
        let offsets = read_offset_table(ptr)?;
        let mut tiles = vec![0u8; offsets.len() * 64];

        for (i, &off) in offsets.iter().enumerate() {
            let tile = &mut tiles[i * 64..(i + 1) * 64];
            let mut p = Cursor::at(ptr, off);
            let mut index = 0;
            while index < 16 {
                let cmd = p.byte()?;
                let cnt = (cmd & 0x0F) as usize + 1;
                if cmd & 0x80 != 0 {
                    let byte0 = if cmd & 0x10 != 0 { 0 } else { p.byte()? };
                    let byte1 = if cmd & 0x40 != 0 { 0 } else { p.byte()? };
                    for _ in 0..cnt {
                        set_tile_data(tile, index, byte0, byte1);
                        index += 1;
                    }
                } else {
                    for _ in 0..cnt {
                        let byte0 = if cmd & 0x10 != 0 { 0 } else { p.byte()? };
                        let byte1 = if cmd & 0x40 != 0 { 0 } else { p.byte()? };
                        set_tile_data(tile, index, byte0, byte1);
                        index += 1;
                    }
                }
            }
        }

        if self.distaff {
            self.staff_tiles = tiles;
        } else {
            self.room_tiles = tiles;
        }
        Ok(())
    }

    fn decode_mask_data(&mut self, ptr: Option<&[u8]>) -> Result<(), GfxError> {
        let Some(ptr) = ptr else {
            self.num_masks = 0;
            return Ok(());
        };
        let offsets = read_offset_table(ptr)?;
        self.num_masks = offsets.len();
        self.masks = vec![0; offsets.len() * 8];

        for (i, &off) in offsets.iter().enumerate() {
            let mask = &mut self.masks[i * 8..(i + 1) * 8];
            let mut p = Cursor::at(ptr, off);
            let mut index = 0;
            while index < 8 {
                let cmd = p.byte()?;
                let cnt = cmd & 0x1F;
                if cmd & 0x80 != 0 {
                    let value = if cmd & 0x60 != 0 {
                        if cmd & 0x40 != 0 {
                            0x00
                        } else {
                            0xFF
                        }
                    } else {
                        p.byte()?
                    };
                    for _ in 0..cnt {
                        store(mask, index, !value);
                        index += 1;
                    }
                } else {
                    for _ in 0..cnt {
                        let value = p.byte()?;
                        store(mask, index, !value);
                        index += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Decode a room's tiles, mask patterns and strip columns.
    pub fn room_changed(&mut self, room: &[u8]) -> Result<(), GfxError> {
        let tile = require_chunk(room, b"TILE")?;
        self.decode_tile_data(&tile[8..])?;
        self.decode_mask_data(find_chunk_data(room, b"ZP00"))?;

        let im = require_chunk(room, b"IM00")?;
        let im = &im[8..];
        let header = im.get(..5).ok_or(GfxError::Truncated { what: "IM00 header" })?;
        let num_rows = header[2] as usize;
        self.mask_id_size = header[3];
        let smap = &im[5..];

        let offsets = read_offset_table(smap)?;
        let mut tables = std::mem::take(&mut self.room);
        tables.reset(offsets.len() * num_rows);
        for (i, &off) in offsets.iter().enumerate() {
            let src = smap.get(off..).ok_or(GfxError::Truncated { what: "IM00 strip" })?;
            self.decode_strip(src, &mut tables, i * num_rows, num_rows, false)?;
        }
        self.room = tables;
        Ok(())
    }

    /// Decode an object's strip columns.
    pub fn decode_object(&mut self, image: &[u8], height: usize) -> Result<(), GfxError> {
        let num_rows = height / 8;
        let offsets = read_offset_table(image)?;
        let mut tables = std::mem::take(&mut self.object);
        tables.reset(offsets.len() * num_rows);
        for (i, &off) in offsets.iter().enumerate() {
            let src = image.get(off..).ok_or(GfxError::Truncated { what: "object strip" })?;
            self.decode_strip(src, &mut tables, i * num_rows, num_rows, true)?;
        }
        self.object = tables;
        Ok(())
    }

    /// Load the distaff tile patterns from a `TILE` chunk payload.
    pub fn load_staff_tiles(&mut self, data: &[u8]) -> Result<(), GfxError> {
        let distaff = std::mem::replace(&mut self.distaff, true);
        let result = self.decode_tile_data(data);
        self.distaff = distaff;
        result
    }

    /// Draw strip `stripnr` as 16-bit pixels through `palette`.
    pub fn draw_strip(
        &self,
        dst: &mut PixelView,
        stripnr: usize,
        height: usize,
        object_mode: bool,
        palette: &HighColorPalette,
    ) {
        let rows = height / 8;
        let cells = if object_mode { &self.object } else { &self.room };
        let tiles = if self.distaff {
            &self.staff_tiles
        } else {
            &self.room_tiles
        };

        for y in 0..rows {
            let cell = stripnr * rows + y;
            let tile_idx = cells.tiles.get(cell).copied().unwrap_or(0) as usize;
            let pal_offset = cells.colors.get(cell).copied().unwrap_or(0) as usize * 16;
            let tile = tiles.get(tile_idx * 64..tile_idx * 64 + 64);
            for row in 0..8 {
                for col in 0..8 {
                    let entry = tile.map_or(0, |t| t[row * 8 + col]) as usize;
                    dst.put16(col as isize, (y * 8 + row) as isize, palette.get(pal_offset + entry));
                }
            }
        }
    }

    pub fn draw_mask(&self, mask: &mut MaskColumn, stripnr: usize, height: usize, object_mode: bool) {
        let rows = height / 8;
        let cells = if object_mode { &self.object } else { &self.room };
        for y in 0..rows {
            let mask_idx = cells.masks.get(stripnr * rows + y).copied().unwrap_or(0) as usize;
            for row in 0..8 {
                let value = if self.num_masks > 0 {
                    self.masks.get(mask_idx * 8 + row).copied().unwrap_or(0)
                } else {
                    0
                };
                mask.put(y * 8 + row, value);
            }
        }
    }
}
