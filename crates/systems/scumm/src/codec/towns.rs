//! Column-major decoders of the FM-Towns 256-colour releases.
//!
//! All four walk the strip top to bottom, column by column, and look colours
//! up in the palette without the colour offset.

use super::ColumnCursor;
use crate::context::RenderContext;
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::bits::BitReader;

/// Byte pairs `(run - 1, colour)`.
pub fn unk_decode_8(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
) -> Result<(), GfxError> {
    let mut reader = BitReader::new(src);
    let mut cur = ColumnCursor::new(height);
    loop {
        let run = reader.read_byte()? as usize + 1;
        let color = ctx.lookup(reader.read_byte()?);
        for _ in 0..run {
            dst.put8(cur.x, cur.y, color);
            if !cur.advance() {
                return Ok(());
            }
        }
    }
}

/// 4-bit command nibbles: short runs, short literal groups, or a change of
/// the 16-colour bank.
pub fn unk_decode_9(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
) -> Result<(), GfxError> {
    let mut reader = BitReader::new(src);
    let mut cur = ColumnCursor::new(height);
    let mut bank = 0u8;

    loop {
        let cmd = reader.read_bits(4)? as u8;
        match cmd >> 2 {
            0 => {
                let color = reader.read_bits(4)? as u8;
                for _ in 0..(cmd & 3) + 2 {
                    dst.put8(cur.x, cur.y, ctx.lookup(bank * 16 + color));
                    if !cur.advance() {
                        return Ok(());
                    }
                }
            }
            1 => {
                for _ in 0..(cmd & 3) + 1 {
                    let color = reader.read_bits(4)? as u8;
                    dst.put8(cur.x, cur.y, ctx.lookup(bank * 16 + color));
                    if !cur.advance() {
                        return Ok(());
                    }
                }
            }
            2 => bank = reader.read_bits(4)? as u8,
            _ => {}
        }
    }
}

/// Local palette of `n` entries, then bytes below `n` are single pixels and
/// bytes from `n` up start a run of the following colour.
pub fn unk_decode_10(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
) -> Result<(), GfxError> {
    let mut reader = BitReader::new(src);
    let mut cur = ColumnCursor::new(height);

    let num_colors = reader.read_byte()?;
    let mut local = [0u8; 256];
    for entry in local.iter_mut().take(num_colors as usize) {
        *entry = reader.read_byte()?;
    }

    loop {
        let code = reader.read_byte()?;
        if code < num_colors {
            dst.put8(cur.x, cur.y, ctx.lookup(local[code as usize]));
            if !cur.advance() {
                return Ok(());
            }
        } else {
            let run = (code - num_colors) as usize + 1;
            let color = ctx.lookup(reader.read_byte()?);
            for _ in 0..run {
                dst.put8(cur.x, cur.y, color);
                if !cur.advance() {
                    return Ok(());
                }
            }
        }
    }
}

/// Unary-coded colour steps with a reversible byte increment.
pub fn unk_decode_11(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
) -> Result<(), GfxError> {
    let mut reader = BitReader::new(src);
    let mut color = reader.read_byte()?;
    let mut inc: u8 = 1;

    for x in 0..8isize {
        for y in 0..height as isize {
            if x > 0 || y > 0 {
                match reader.read_unary(3)? {
                    1 => {
                        inc = inc.wrapping_neg();
                        color = color.wrapping_sub(inc);
                    }
                    2 => color = color.wrapping_sub(inc),
                    3 => {
                        inc = 1;
                        color = reader.read_bits(8)? as u8;
                    }
                    _ => {}
                }
            }
            dst.put8(x, y, ctx.lookup(color));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(buf: &mut [u8]) -> PixelView<'_> {
        PixelView::new(buf, 0, 8, 1)
    }

    #[test]
    fn test_decode_8_runs() {
        // 3 pixels of 4, then 13 pixels of 6 (the last run overshoots)
        let src = [2, 4, 20, 6];
        let mut buf = vec![0u8; 16];
        unk_decode_8(&mut view(&mut buf), &src, 2, &RenderContext::default()).unwrap();
        assert_eq!(buf[0], 4);
        assert_eq!(buf[8], 4);
        assert_eq!(buf[1], 4);
        assert_eq!(buf[9], 6);
        assert!(buf[2..8].iter().all(|&p| p == 6));
    }

    #[test]
    fn test_decode_9_bank_switch() {
        // bank := 1 (cmd 0b1000, value 1), then run of 16 x colour 2 via
        // four "run of 4" commands (cmd 0b0010 + colour).
        let mut bits: Vec<(u32, u32)> = vec![(0b1000, 4), (1, 4)];
        for _ in 0..4 {
            bits.push((0b0010, 4));
            bits.push((2, 4));
        }
        let mut src = Vec::new();
        let mut acc = 0u32;
        let mut n = 0;
        for (v, w) in bits {
            for i in 0..w {
                acc |= ((v >> i) & 1) << n;
                n += 1;
                if n == 8 {
                    src.push(acc as u8);
                    acc = 0;
                    n = 0;
                }
            }
        }
        let mut buf = vec![0u8; 16];
        unk_decode_9(&mut view(&mut buf), &src, 2, &RenderContext::default()).unwrap();
        assert!(buf.iter().all(|&p| p == 18));
    }

    #[test]
    fn test_decode_10_local_palette() {
        // two local colours [30, 40]; singles 0,1 then a run of 14 x 50
        let src = [2, 30, 40, 0, 1, 2 + 13, 50];
        let mut buf = vec![0u8; 16];
        unk_decode_10(&mut view(&mut buf), &src, 2, &RenderContext::default()).unwrap();
        assert_eq!(buf[0], 30);
        assert_eq!(buf[8], 40);
        assert!(buf[1..8].iter().all(|&p| p == 50));
        assert!(buf[9..16].iter().all(|&p| p == 50));
    }

    #[test]
    fn test_decode_11_steps() {
        // colour 10; "10" negates inc (1 -> 255) then subtracts => 11;
        // "110" subtracts again => 12; rest keep.
        let src = [10, 0b0_011_01, 0, 0];
        let mut buf = vec![0u8; 16];
        unk_decode_11(&mut view(&mut buf), &src, 2, &RenderContext::default()).unwrap();
        assert_eq!(buf[0], 10);
        assert_eq!(buf[8], 11);
        assert_eq!(buf[1], 12);
        assert_eq!(buf[15], 12);
    }

    #[test]
    fn test_truncated_towns_stream() {
        let mut buf = vec![0u8; 16];
        let res = unk_decode_8(&mut view(&mut buf), &[0, 1], 2, &RenderContext::default());
        assert!(matches!(res, Err(GfxError::Truncated { .. })));
    }
}
