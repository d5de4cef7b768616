use super::ColumnCursor;
use crate::context::RenderContext;
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::bits::BitReader;

/// Uncompressed 8-bit strip.
///
/// Early 256-colour releases store the strip column-major and bypass the
/// colour offset; everything else is row-major through `write_room_color`.
pub fn draw_strip_raw(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
    transp_check: bool,
) -> Result<(), GfxError> {
    let needed = 8 * height;
    if src.len() < needed {
        return Err(GfxError::Truncated { what: "raw strip" });
    }

    if ctx.old_256 {
        let mut cur = ColumnCursor::new(height);
        for &color in &src[..needed] {
            dst.put8(cur.x, cur.y, ctx.lookup(color));
            cur.advance();
        }
    } else {
        for (i, &color) in src[..needed].iter().enumerate() {
            if !transp_check || !ctx.is_transparent(color) {
                ctx.write_room_color(dst, (i % 8) as isize, (i / 8) as isize, color);
            }
        }
    }
    Ok(())
}

/// 3DO run-length strip, row-major.
///
/// Control byte `lllllllr`: `l + 1` pixels, either literals (`r == 0`) or
/// one repeated colour (`r == 1`).
pub fn draw_strip_3do(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
    transp_check: bool,
) -> Result<(), GfxError> {
    let mut reader = BitReader::new(src);
    let mut remaining = height * 8;
    let mut pos = 0usize;

    while remaining > 0 {
        let control = reader.read_byte()?;
        let len = (((control >> 1) as usize) + 1).min(remaining);
        remaining -= len;

        let run_color = if control & 1 != 0 {
            Some(reader.read_byte()?)
        } else {
            None
        };
        for _ in 0..len {
            let color = match run_color {
                Some(c) => c,
                None => reader.read_byte()?,
            };
            if !transp_check || !ctx.is_transparent(color) {
                dst.put8((pos % 8) as isize, (pos / 8) as isize, ctx.lookup(color));
            }
            pos += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_major() {
        let src: Vec<u8> = (0..16).collect();
        let mut buf = vec![0u8; 16];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_raw(&mut view, &src, 2, &RenderContext::default(), false).unwrap();
        assert_eq!(buf, src);
    }

    #[test]
    fn test_raw_old_256_column_major() {
        let ctx = RenderContext {
            old_256: true,
            ..RenderContext::default()
        };
        let src: Vec<u8> = (0..16).collect();
        let mut buf = vec![0u8; 16];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_raw(&mut view, &src, 2, &ctx, false).unwrap();
        // Column 0 holds src[0], src[1]
        assert_eq!(buf[0], 0);
        assert_eq!(buf[8], 1);
        assert_eq!(buf[1], 2);
        assert_eq!(buf[15], 15);
    }

    #[test]
    fn test_raw_short_input() {
        let mut buf = vec![0u8; 16];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        let res = draw_strip_raw(&mut view, &[0; 15], 2, &RenderContext::default(), false);
        assert!(matches!(res, Err(GfxError::Truncated { .. })));
    }

    #[test]
    fn test_raw_transparent() {
        let mut src = vec![255u8; 8];
        src[3] = 4;
        let mut buf = vec![0x10u8; 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_raw(&mut view, &src, 1, &RenderContext::default(), true).unwrap();
        assert_eq!(buf, vec![0x10, 0x10, 0x10, 4, 0x10, 0x10, 0x10, 0x10]);
    }

    #[test]
    fn test_3do_runs() {
        // run of 5 x colour 2, then 3 literals, then run of 8 x colour 1 cut to 8
        let src = [(4 << 1) | 1, 2, 2 << 1, 7, 8, 9, (9 << 1) | 1, 1];
        let mut buf = vec![0u8; 16];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_3do(&mut view, &src, 2, &RenderContext::default(), false).unwrap();
        assert_eq!(&buf[..8], &[2, 2, 2, 2, 2, 7, 8, 9]);
        assert_eq!(&buf[8..], &[1; 8]);
    }

    #[test]
    fn test_3do_transparent_run() {
        let src = [(7 << 1) | 1, 255];
        let mut buf = vec![0x33u8; 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_3do(&mut view, &src, 1, &RenderContext::default(), true).unwrap();
        assert_eq!(buf, vec![0x33; 8]);
    }
}
