//! Second-generation EGA rooms.
//!
//! A v2 room bitmap is one run-length stream running down each column from
//! the left edge to the right, followed by a second stream with the mask.
//! Neither stream can be entered in the middle, so when a room is loaded the
//! decoder state at the start of every strip is recorded in a [`StripTable`]
//! and later draws resume from there.

use crate::mask::MaskBuffer;
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::palette::ColorRemap;

/// Most strips a room can have.
pub const MAX_STRIPS: usize = 160;
/// Most mask strips a room can have.
pub const MAX_MASK_STRIPS: usize = 120;

/// Tallest image the dither column can hold.
const MAX_HEIGHT: usize = 128;

/// Decoder state at the first pixel of each strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripTable {
    pub offsets: Vec<usize>,
    pub run: Vec<u8>,
    pub color: Vec<u8>,
    pub zoffsets: Vec<usize>,
    pub zrun: Vec<u8>,
}

impl Default for StripTable {
    fn default() -> Self {
        Self {
            offsets: vec![0; MAX_STRIPS],
            run: vec![0; MAX_STRIPS],
            color: vec![0; MAX_STRIPS],
            zoffsets: vec![0; MAX_MASK_STRIPS],
            zrun: vec![0; MAX_MASK_STRIPS],
        }
    }
}

/// Byte cursor that fails with a truncation error at the end of input.
struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at(src: &'a [u8], pos: usize) -> Self {
        Self { src, pos }
    }

    fn next(&mut self) -> Result<u8, GfxError> {
        let b = *self
            .src
            .get(self.pos)
            .ok_or(GfxError::Truncated { what: "v2 bitmap" })?;
        self.pos += 1;
        Ok(b)
    }
}

/// Walk the whole bitmap once and record where every strip starts.
pub fn generate_strip_table(src: &[u8], width: usize, height: usize) -> Result<StripTable, GfxError> {
    let mut table = StripTable::default();
    let mut cur = Cursor::at(src, 0);
    let mut color = 0u8;
    let mut run = 1u8;

    for x in 0..width {
        if x % 8 == 0 {
            let strip = x / 8;
            if strip >= MAX_STRIPS {
                return Err(GfxError::Unsupported(format!("v2 room of {} pixels", width)));
            }
            table.run[strip] = run;
            table.color[strip] = color;
            table.offsets[strip] = cur.pos;
        }
        for _ in 0..height {
            run = run.wrapping_sub(1);
            if run == 0 {
                let data = cur.next()?;
                run = if data & 0x80 != 0 { data & 0x7F } else { data >> 4 };
                if run == 0 {
                    run = cur.next()?;
                }
                color = data & 0x0F;
            }
        }
    }

    let mut x = 0;
    let mut y = height;
    let mut strips_left = width / 8;
    if strips_left == 0 || height == 0 {
        return Ok(table);
    }

    loop {
        let mut length = cur.next()? as i32;
        let run_flag = (length & 0x80) as u8;
        if run_flag != 0 {
            length &= 0x7F;
            cur.next()?;
        }
        loop {
            if run_flag == 0 {
                cur.next()?;
            }
            if y == height {
                if x >= MAX_MASK_STRIPS {
                    return Err(GfxError::Unsupported(format!("v2 mask of {} strips", x + 1)));
                }
                table.zoffsets[x] = cur.pos - 1;
                table.zrun[x] = length as u8 | run_flag;
            }
            y -= 1;
            if y == 0 {
                strips_left -= 1;
                if strips_left == 0 {
                    return Ok(table);
                }
                x += 1;
                y = height;
            }
            length -= 1;
            if length == 0 {
                break;
            }
        }
    }
}

/// Which columns of the image to draw and where the mask goes.
#[derive(Debug, Clone, Copy)]
pub struct V2Draw {
    /// Strip of the mask store under the first drawn column
    pub mask_strip: usize,
    pub mask_row: usize,
    pub width: usize,
    pub height: usize,
    pub stripnr: usize,
    pub numstrip: usize,
}

#[derive(Debug, Clone, Default)]
pub struct V2State {
    room_strips: Option<StripTable>,
}

impl V2State {
    /// Index the room bitmap. `bitmap` starts at the image data, which is
    /// also what later draws of the room receive.
    pub fn room_changed(&mut self, bitmap: &[u8], width: usize, height: usize) -> Result<(), GfxError> {
        self.room_strips = Some(generate_strip_table(bitmap, width, height)?);
        Ok(())
    }

    pub fn strip_table(&self) -> Option<&StripTable> {
        self.room_strips.as_ref()
    }

    /// Decode the requested strips of `image` straight into `dst` and the
    /// mask store. Rooms resume from the strip table; objects always decode
    /// from their first column.
    pub fn draw(
        &self,
        image: &[u8],
        dst: &mut PixelView,
        mask: &mut MaskBuffer,
        req: V2Draw,
        object_mode: bool,
        room_palette: &ColorRemap,
    ) -> Result<(), GfxError> {
        let table = if object_mode { None } else { self.room_strips.as_ref() };
        let left = req.stripnr * 8;
        let right = left + req.numstrip * 8;
        let height = req.height;
        if height > MAX_HEIGHT {
            return Err(GfxError::Unsupported(format!("v2 image of {} rows", height)));
        }

        let (mut run, mut color, mut cur, mut the_x, max_x) = match table {
            Some(t) => {
                let strip = req.stripnr.min(MAX_STRIPS - 1);
                (
                    t.run[strip] as i32,
                    t.color[strip],
                    Cursor::at(image, t.offsets[strip]),
                    left,
                    right,
                )
            }
            None => (1, 0, Cursor::at(image, 0), 0, req.width),
        };

        let mut dither = false;
        let mut dither_table = [0u8; MAX_HEIGHT];
        while the_x < max_x {
            let visible = left <= the_x && the_x < right;
            let mut idx = 0;
            for the_y in 0..height {
                run -= 1;
                if run == 0 {
                    let data = cur.next()?;
                    if data & 0x80 != 0 {
                        run = (data & 0x7F) as i32;
                        dither = true;
                    } else {
                        run = (data >> 4) as i32;
                        dither = false;
                    }
                    color = room_palette.get(data & 0x0F);
                    if run == 0 {
                        run = cur.next()? as i32;
                    }
                }
                if !dither {
                    dither_table[idx] = color;
                }
                if visible {
                    dst.put8((the_x - left) as isize, the_y as isize, dither_table[idx]);
                    idx += 1;
                }
            }
            the_x += 1;
        }

        let (mut run, mut the_x) = match table {
            Some(t) => {
                let strip = req.stripnr.min(MAX_MASK_STRIPS - 1);
                cur = Cursor::at(image, t.zoffsets[strip]);
                (t.zrun[strip] as i32, left)
            }
            None => (cur.next()? as i32, 0),
        };

        let mut the_y = 0;
        let mut data = 0u8;
        let mut column = req.mask_strip;
        while the_x < right {
            let run_flag = run & 0x80 != 0;
            if run_flag {
                run &= 0x7F;
                data = cur.next()?;
            }
            loop {
                if !run_flag {
                    data = cur.next()?;
                }
                if left <= the_x {
                    mask.set(column, req.mask_row + the_y, 1, data);
                }
                the_y += 1;
                if the_y >= height {
                    if left <= the_x {
                        column += 1;
                    }
                    the_y = 0;
                    the_x += 8;
                    if the_x >= right {
                        break;
                    }
                }
                run -= 1;
                if run == 0 {
                    break;
                }
            }
            if the_x >= right {
                break;
            }
            run = cur.next()? as i32;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 16x4 room: colour 3 for the first strip, colour 5 for the second,
    /// then a mask of 0xAA for strip 0 and 0x55 for strip 1.
    fn room() -> Vec<u8> {
        vec![
            // 32 pixels of colour 3, 32 of colour 5 (run in the next byte)
            0x03, 32, 0x05, 32, //
            // mask: 4 x 0xAA, then 4 x 0x55
            0x84, 0xAA, 0x84, 0x55,
        ]
    }

    #[test]
    fn test_strip_table_offsets() {
        let table = generate_strip_table(&room(), 16, 4).unwrap();
        assert_eq!(table.offsets[0], 0);
        assert_eq!(table.offsets[1], 2);
        // The first strip's run is exhausted exactly at the strip edge
        assert_eq!(table.run[1], 1);
        assert_eq!(table.color[1], 3);
        assert_eq!(table.zoffsets[0], 5);
        assert_eq!(table.zrun[0], 0x84);
        assert_eq!(table.zoffsets[1], 7);
    }

    #[test]
    fn test_draw_second_strip_from_table() {
        let mut state = V2State::default();
        state.room_changed(&room(), 16, 4).unwrap();

        let mut buf = vec![0u8; 8 * 4];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        let mut mask = MaskBuffer::new();
        mask.init(2, 2, 4, 2).unwrap();
        let req = V2Draw {
            mask_strip: 1,
            mask_row: 0,
            width: 16,
            height: 4,
            stripnr: 1,
            numstrip: 1,
        };
        state
            .draw(&room(), &mut view, &mut mask, req, false, &ColorRemap::identity())
            .unwrap();
        assert!(buf.iter().all(|&p| p == 5));
        for y in 0..4 {
            assert_eq!(mask.get(1, y, 1), 0x55);
            assert_eq!(mask.get(0, y, 1), 0);
        }
    }

    #[test]
    fn test_dithered_run_repeats_previous_column() {
        // Column 0 plain colour 4, column 1 a dithered run, then colour 9,
        // followed by a two-row mask run of 0xF0.
        let src = [0x24, 0x82, 0x09, 12, 0x82, 0xF0];
        let mut buf = vec![0u8; 8 * 2];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        let mut mask = MaskBuffer::new();
        mask.init(2, 1, 2, 2).unwrap();
        let req = V2Draw {
            mask_strip: 0,
            mask_row: 0,
            width: 8,
            height: 2,
            stripnr: 0,
            numstrip: 1,
        };
        V2State::default()
            .draw(&src, &mut view, &mut mask, req, true, &ColorRemap::identity())
            .unwrap();
        assert_eq!(&buf[..3], &[4, 4, 9]);
        assert_eq!(&buf[8..11], &[4, 4, 9]);
        assert_eq!(mask.get(0, 0, 1), 0xF0);
        assert_eq!(mask.get(0, 1, 1), 0xF0);
    }

    #[test]
    fn test_truncated_bitmap() {
        assert!(matches!(
            generate_strip_table(&[0x03], 16, 4),
            Err(GfxError::Truncated { .. })
        ));
    }
}
