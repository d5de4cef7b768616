//! Zig-zag codecs.
//!
//! After the first pixel, every pixel is preceded by a unary code:
//!
//! | code  | effect                                              |
//! |-------|-----------------------------------------------------|
//! | `0`   | repeat the colour                                   |
//! | `10`  | literal colour of `shift` bits, increment back to -1 |
//! | `110` | add the increment                                   |
//! | `111` | negate the increment, then add it                   |

use crate::context::RenderContext;
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::bits::BitReader;

struct ZigZag<'a> {
    reader: BitReader<'a>,
    color: u8,
    inc: i8,
    shift: u32,
}

impl<'a> ZigZag<'a> {
    fn new(src: &'a [u8], shift: u32) -> Result<Self, GfxError> {
        let mut reader = BitReader::new(src);
        let color = reader.read_byte()?;
        Ok(Self {
            reader,
            color,
            inc: -1,
            shift,
        })
    }

    fn step(&mut self) -> Result<(), GfxError> {
        match self.reader.read_unary(3)? {
            0 => {}
            1 => {
                self.color = self.reader.read_bits(self.shift)? as u8;
                self.inc = -1;
            }
            2 => self.color = self.color.wrapping_add(self.inc as u8),
            _ => {
                self.inc = -self.inc;
                self.color = self.color.wrapping_add(self.inc as u8);
            }
        }
        Ok(())
    }
}

/// Row-major zig-zag strip.
pub fn draw_strip_basic_h(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
    shift: u32,
    transp_check: bool,
) -> Result<(), GfxError> {
    let mut zz = ZigZag::new(src, shift)?;
    for y in 0..height as isize {
        for x in 0..8isize {
            if x > 0 || y > 0 {
                zz.step()?;
            }
            if !transp_check || !ctx.is_transparent(zz.color) {
                ctx.write_room_color(dst, x, y, zz.color);
            }
        }
    }
    Ok(())
}

/// Column-major zig-zag strip.
pub fn draw_strip_basic_v(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
    shift: u32,
    transp_check: bool,
) -> Result<(), GfxError> {
    let mut zz = ZigZag::new(src, shift)?;
    for x in 0..8isize {
        for y in 0..height as isize {
            if x > 0 || y > 0 {
                zz.step()?;
            }
            if !transp_check || !ctx.is_transparent(zz.color) {
                ctx.write_room_color(dst, x, y, zz.color);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pack unary/literal codes LSB-first.
    fn pack(bits: &[(u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut acc = 0u32;
        let mut n = 0;
        for &(value, width) in bits {
            for i in 0..width {
                acc |= (value.checked_shr(i).unwrap_or(0) & 1) << n;
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
    fn test_constant_strip_h() {
        // 63 "keep" codes after the first pixel
        let mut src = vec![9u8];
        src.extend(pack(&[(0, 63)]));
        let mut buf = vec![0u8; 64];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_basic_h(&mut view, &src, 8, &RenderContext::default(), 4, false).unwrap();
        assert!(buf.iter().all(|&p| p == 9));
    }

    #[test]
    fn test_increment_codes_h() {
        // colour 10; then: step (-1) => 9, reverse (+1) => 10, step => 11,
        // literal 5 => 5, step (-1 again) => 4, keep => 4, keep, keep
        let mut codes = vec![
            (0b011, 3),
            (0b111, 3),
            (0b011, 3),
            (0b01, 2),
            (5, 4),
            (0b011, 3),
            (0, 1),
            (0, 1),
        ];
        codes.push((0, 1));
        let mut src = vec![10u8];
        src.extend(pack(&codes));
        let mut buf = vec![0u8; 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_basic_h(&mut view, &src, 1, &RenderContext::default(), 4, false).unwrap();
        assert_eq!(buf, vec![10, 9, 10, 11, 5, 4, 4, 4]);
    }

    #[test]
    fn test_vertical_is_column_major() {
        // height 2: first column 3,3; then literal 7 for the rest
        let mut codes = vec![(0, 1), (0b01, 2), (7, 4)];
        codes.extend(std::iter::repeat((0, 1)).take(13));
        let mut src = vec![3u8];
        src.extend(pack(&codes));
        let mut buf = vec![0u8; 16];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_basic_v(&mut view, &src, 2, &RenderContext::default(), 4, false).unwrap();
        assert_eq!(buf[0], 3);
        assert_eq!(buf[8], 3);
        assert_eq!(buf[1], 7);
        assert_eq!(buf[15], 7);
    }

    #[test]
    fn test_transparent_pixels_skipped() {
        let mut src = vec![255u8];
        src.extend(pack(&[(0, 7)]));
        let mut buf = vec![0x11u8; 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_basic_h(&mut view, &src, 1, &RenderContext::default(), 8, true).unwrap();
        assert_eq!(buf, vec![0x11; 8]);
    }

    #[test]
    fn test_truncated_codes_error() {
        let src = [1u8];
        let mut buf = vec![0u8; 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        let res = draw_strip_basic_h(&mut view, &src, 1, &RenderContext::default(), 4, false);
        assert!(matches!(res, Err(GfxError::Truncated { .. })));
    }
}
