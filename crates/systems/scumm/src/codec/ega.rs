use super::ColumnCursor;
use crate::context::RenderContext;
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::bits::BitReader;

/// EGA run-length strip, column-major.
///
/// Control byte layouts:
/// - `0rrrcccc`: `r` pixels of colour `c` (`r == 0`: count in next byte)
/// - `11rrrrrr ab`: `r` pixels alternating colours `a` and `b`
/// - `10rrrrrr`: `r` pixels copied from the column to the left
///
/// Runs that would spill past the eighth column are cut off there.
pub fn draw_strip_ega(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
) -> Result<(), GfxError> {
    let mut reader = BitReader::new(src);
    let mut cur = ColumnCursor::new(height);
    let pal = |index: u8| ctx.lookup(index.wrapping_add(ctx.palette_mod));

    while cur.x < 8 {
        let control = reader.read_byte()?;

        if control & 0x80 != 0 {
            let mut run = (control & 0x3F) as usize;
            if control & 0x40 != 0 {
                let colors = reader.read_byte()?;
                if run == 0 {
                    run = reader.read_byte()? as usize;
                }
                for z in 0..run {
                    let color = if z & 1 != 0 { colors & 0x0F } else { colors >> 4 };
                    dst.put8(cur.x, cur.y, pal(color));
                    if !cur.advance() {
                        break;
                    }
                }
            } else {
                if run == 0 {
                    run = reader.read_byte()? as usize;
                }
                for _ in 0..run {
                    let left = dst.get8(cur.x - 1, cur.y).unwrap_or(0);
                    dst.put8(cur.x, cur.y, left);
                    if !cur.advance() {
                        break;
                    }
                }
            }
        } else {
            let mut run = (control >> 4) as usize;
            if run == 0 {
                run = reader.read_byte()? as usize;
            }
            let color = pal(control & 0x0F);
            for _ in 0..run {
                dst.put8(cur.x, cur.y, color);
                if !cur.advance() {
                    break;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_color_runs() {
        // 8 runs of 4 rows each, colours 1..=8 (colour 8 via a full byte count)
        let src = [0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x08, 4];
        let mut buf = vec![0u8; 8 * 4];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_ega(&mut view, &src, 4, &RenderContext::default()).unwrap();
        for y in 0..4 {
            for x in 0..8 {
                assert_eq!(buf[y * 8 + x], (x + 1) as u8);
            }
        }
    }

    #[test]
    fn test_dither_run() {
        // 16 rows alternating 0xA / 0x3 in column 0 and 1 of a 8-high strip,
        // then fill the rest with colour 0.
        let src = [0xC0 | 16, 0xA3, 0x00, 48];
        let mut buf = vec![0xFFu8; 8 * 8];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_ega(&mut view, &src, 8, &RenderContext::default()).unwrap();
        assert_eq!(buf[0], 0xA);
        assert_eq!(buf[8], 0x3);
        assert_eq!(buf[16], 0xA);
        assert_eq!(buf[1], 0xA);
        assert_eq!(buf[2], 0);
    }

    #[test]
    fn test_copy_left_run() {
        // Column 0 gets colour 7, then 7 columns copied from the left
        let src = [0x27, 0x80 | 14];
        let mut buf = vec![0u8; 8 * 2];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        draw_strip_ega(&mut view, &src, 2, &RenderContext::default()).unwrap();
        assert!(buf.iter().all(|&p| p == 7));
    }

    #[test]
    fn test_truncated_input() {
        let mut buf = vec![0u8; 64];
        let mut view = PixelView::new(&mut buf, 0, 8, 1);
        let err = draw_strip_ega(&mut view, &[0x41], 8, &RenderContext::default());
        assert!(matches!(err, Err(GfxError::Truncated { .. })));
    }
}
