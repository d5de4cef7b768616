//! Majority/minority codecs.
//!
//! Both variants predict each pixel from the previous one. A `0` bit keeps
//! the colour, `10` loads a literal of `shift` bits, and `11` applies a
//! 3-bit delta. The classic codec turns a zero delta into a repeat run; the
//! HE codec has no zero delta and instead maps the 3 bits onto
//! `{-4,-3,-2,-1,1,2,3,4}`.

use crate::context::RenderContext;
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::bits::BitReader;

/// Colour deltas used by the HE variant.
pub const DELTA_COLOR: [i8; 8] = [-4, -3, -2, -1, 1, 2, 3, 4];

/// Stateful majority/minority line decoder.
///
/// Lines may be decoded in any lengths; state carries over between calls.
#[derive(Debug, Clone)]
pub struct MajMinCodec<'a> {
    reader: BitReader<'a>,
    shift: u32,
    color: u8,
    repeat_mode: bool,
    repeat_count: u8,
    /// A code must be consumed before the next pixel is emitted
    pending: bool,
}

impl<'a> MajMinCodec<'a> {
    /// `src` starts at the initial colour byte.
    pub fn new(shift: u32, src: &'a [u8]) -> Result<Self, GfxError> {
        let mut reader = BitReader::new(src);
        let color = reader.read_byte()?;
        Ok(Self {
            reader,
            shift,
            color,
            repeat_mode: false,
            repeat_count: 0,
            pending: false,
        })
    }

    pub fn color(&self) -> u8 {
        self.color
    }

    fn step(&mut self) -> Result<(), GfxError> {
        if self.repeat_mode {
            self.repeat_count = self.repeat_count.wrapping_sub(1);
            if self.repeat_count == 0 {
                self.repeat_mode = false;
            }
            return Ok(());
        }

        if self.reader.read_bit()? {
            if self.reader.read_bit()? {
                let diff = (self.reader.read_bits(3)? as u8).wrapping_sub(4);
                if diff != 0 {
                    self.color = self.color.wrapping_add(diff);
                } else {
                    self.repeat_mode = true;
                    self.repeat_count = (self.reader.read_bits(8)? as u8).wrapping_sub(1);
                }
            } else {
                self.color = self.reader.read_bits(self.shift)? as u8;
            }
        }
        Ok(())
    }

    fn next_pixel(&mut self) -> Result<u8, GfxError> {
        if self.pending {
            self.step()?;
        }
        self.pending = true;
        Ok(self.color)
    }

    /// Fill `buf` with the next `buf.len()` pixels.
    pub fn decode_line(&mut self, buf: &mut [u8]) -> Result<(), GfxError> {
        for px in buf.iter_mut() {
            *px = self.next_pixel()?;
        }
        Ok(())
    }

    /// Decode and discard `count` pixels.
    pub fn skip(&mut self, count: usize) -> Result<(), GfxError> {
        for _ in 0..count {
            self.next_pixel()?;
        }
        Ok(())
    }
}

/// Classic majority/minority strip, row-major.
pub fn draw_strip_complex(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
    shift: u32,
    transp_check: bool,
) -> Result<(), GfxError> {
    let mut codec = MajMinCodec::new(shift, src)?;
    let mut line = [0u8; 8];
    for y in 0..height as isize {
        codec.decode_line(&mut line)?;
        for (x, &color) in line.iter().enumerate() {
            if !transp_check || !ctx.is_transparent(color) {
                ctx.write_room_color(dst, x as isize, y, color);
            }
        }
    }
    Ok(())
}

/// HE majority/minority image of `width` x `height`, row-major.
///
/// Strips use a width of 8; full-screen HE backgrounds use the room width.
#[allow(clippy::too_many_arguments)]
pub fn draw_strip_he(
    dst: &mut PixelView,
    src: &[u8],
    width: usize,
    height: usize,
    ctx: &RenderContext,
    shift: u32,
    transp_check: bool,
) -> Result<(), GfxError> {
    let mut reader = BitReader::new(src);
    let mut color = reader.read_byte()?;

    for y in 0..height as isize {
        for x in 0..width as isize {
            if x > 0 || y > 0 {
                if reader.read_bit()? {
                    if reader.read_bit()? {
                        let delta = DELTA_COLOR[reader.read_bits(3)? as usize];
                        color = color.wrapping_add(delta as u8);
                    } else {
                        color = reader.read_bits(shift)? as u8;
                    }
                }
            }
            if !transp_check || !ctx.is_transparent(color) {
                ctx.write_room_color(dst, x, y, color);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(bits: &[(u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut acc = 0u32;
        let mut n = 0;
        for &(value, width) in bits {
            for i in 0..width {
                acc |= ((value >> i) & 1) << n;
                n += 1;
                if n == 8 {
                    out.push(acc as u8);
                    acc = 0;
                    n = 0;
                }
            }
        }
        if n > 0 {
            out.push(acc as u8);
        }
        out
    }

    #[test]
    fn test_majmin_delta_and_literal() {
        // colour 20; +3 (bits 11, delta 7 => 7-4 = 3); literal 4 (bits 10 + 5 bits); keep
        let mut src = vec![20u8];
        src.extend(pack(&[(0b11, 2), (7, 3), (0b01, 2), (4, 5), (0, 1)]));
        let mut codec = MajMinCodec::new(5, &src).unwrap();
        let mut line = [0u8; 4];
        codec.decode_line(&mut line).unwrap();
        assert_eq!(line, [20, 23, 4, 4]);
    }

    #[test]
    fn test_majmin_repeat_mode() {
        // colour 7; zero delta enters repeat with count 3 - 1 = 2, which
        // holds the colour for three pixels before a delta of -1.
        let mut src = vec![7u8];
        src.extend(pack(&[(0b11, 2), (4, 3), (3, 8), (0b11, 2), (3, 3)]));
        let mut codec = MajMinCodec::new(8, &src).unwrap();
        let mut line = [0u8; 5];
        codec.decode_line(&mut line).unwrap();
        assert_eq!(line, [7, 7, 7, 7, 6]);
    }

    #[test]
    fn test_majmin_state_carries_across_lines() {
        let mut src = vec![1u8];
        src.extend(pack(&[(0b11, 2), (5, 3), (0b11, 2), (5, 3)]));
        let mut codec = MajMinCodec::new(8, &src).unwrap();
        let mut a = [0u8; 2];
        let mut b = [0u8; 1];
        codec.decode_line(&mut a).unwrap();
        codec.decode_line(&mut b).unwrap();
        assert_eq!(a, [1, 2]);
        assert_eq!(b, [3]);
    }

    #[test]
    fn test_majmin_skip() {
        let mut src = vec![1u8];
        src.extend(pack(&[(0b11, 2), (5, 3), (0b11, 2), (5, 3)]));
        let mut codec = MajMinCodec::new(8, &src).unwrap();
        codec.skip(2).unwrap();
        let mut b = [0u8; 1];
        codec.decode_line(&mut b).unwrap();
        assert_eq!(b, [3]);
    }

    #[test]
    fn test_complex_strip_never_reads_past_last_pixel() {
        // 8x1 strip of constant colour needs exactly 7 zero bits after the colour byte
        let src = [42u8, 0x00];
        let mut buf = vec![0u8; 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_complex(&mut view, &src, 1, &RenderContext::default(), 8, false).unwrap();
        assert_eq!(buf, vec![42; 8]);
    }

    #[test]
    fn test_he_delta_table() {
        // colour 100; delta index 0 (-4), index 7 (+4), literal 9 (shift 4), keep...
        let mut codes = vec![(0b11, 2), (0, 3), (0b11, 2), (7, 3), (0b01, 2), (9, 4)];
        codes.extend(std::iter::repeat((0, 1)).take(4));
        let mut src = vec![100u8];
        src.extend(pack(&codes));
        let mut buf = vec![0u8; 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_he(&mut view, &src, 8, 1, &RenderContext::default(), 4, false).unwrap();
        assert_eq!(buf, vec![100, 96, 100, 9, 9, 9, 9, 9]);
    }

    #[test]
    fn test_he_wide_image() {
        let mut src = vec![5u8];
        src.extend(pack(&[(0, 31)]));
        let mut buf = vec![0u8; 32];
        let mut view = PixelView::new(&mut buf, 0, 16, 1);
        draw_strip_he(&mut view, &src, 16, 2, &RenderContext::default(), 8, false).unwrap();
        assert!(buf.iter().all(|&p| p == 5));
    }
}
