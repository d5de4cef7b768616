//! Bounds-checked views into screen and mask storage.
//!
//! Screen buffers are addressed linearly: pixel (x, y) of a view lives at
//! `origin + y * pitch + x * bpp`, and x may run past the visible width into
//! the following row, the same way a horizontally scrolled room wraps into
//! the slack rows at the end of its buffer. The origin is signed so a codec
//! may read one pixel to the left of the strip it is drawing.

/// Mutable window onto a pixel buffer.
#[derive(Debug)]
pub struct PixelView<'a> {
    buf: &'a mut [u8],
    origin: isize,
    pitch: usize,
    bpp: usize,
}

impl<'a> PixelView<'a> {
    pub fn new(buf: &'a mut [u8], origin: usize, pitch: usize, bpp: usize) -> Self {
        Self {
            buf,
            origin: origin as isize,
            pitch,
            bpp,
        }
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn bpp(&self) -> usize {
        self.bpp
    }

    /// Reborrow with the origin moved by (dx, dy) pixels.
    pub fn offset(&mut self, dx: isize, dy: isize) -> PixelView<'_> {
        PixelView {
            origin: self.origin + dy * self.pitch as isize + dx * self.bpp as isize,
            buf: &mut *self.buf,
            pitch: self.pitch,
            bpp: self.bpp,
        }
    }

    fn index(&self, x: isize, y: isize, len: usize) -> Option<usize> {
        let at = self.origin + y * self.pitch as isize + x * self.bpp as isize;
        if at < 0 {
            return None;
        }
        let at = at as usize;
        if at + len <= self.buf.len() {
            Some(at)
        } else {
            None
        }
    }

    /// Write one byte at pixel (x, y). Writes outside the buffer are dropped.
    #[inline]
    pub fn put8(&mut self, x: isize, y: isize, value: u8) {
        if let Some(at) = self.index(x, y, 1) {
            self.buf[at] = value;
        }
    }

    #[inline]
    pub fn put16(&mut self, x: isize, y: isize, value: u16) {
        if let Some(at) = self.index(x, y, 2) {
            self.buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
        }
    }

    #[inline]
    pub fn get8(&self, x: isize, y: isize) -> Option<u8> {
        self.index(x, y, 1).map(|at| self.buf[at])
    }

    pub fn get16(&self, x: isize, y: isize) -> Option<u16> {
        self.index(x, y, 2)
            .map(|at| u16::from_le_bytes([self.buf[at], self.buf[at + 1]]))
    }

    /// AND a byte into pixel (x, y).
    pub fn and8(&mut self, x: isize, y: isize, value: u8) {
        if let Some(at) = self.index(x, y, 1) {
            self.buf[at] &= value;
        }
    }
}

/// Copy `width` pixels by `height` rows between two linear buffers.
#[allow(clippy::too_many_arguments)]
pub fn blit(
    dst: &mut [u8],
    dst_off: usize,
    dst_pitch: usize,
    src: &[u8],
    src_off: usize,
    src_pitch: usize,
    width: usize,
    height: usize,
    bpp: usize,
) {
    let row_bytes = width * bpp;
    if row_bytes == 0 {
        return;
    }
    for row in 0..height {
        let d = dst_off + row * dst_pitch;
        let s = src_off + row * src_pitch;
        if d + row_bytes > dst.len() || s + row_bytes > src.len() {
            break;
        }
        dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
    }
}

/// Fill `width` pixels by `height` rows. 16-bit screens store `color`
/// little-endian.
pub fn fill(
    dst: &mut [u8],
    off: usize,
    pitch: usize,
    color: u16,
    width: usize,
    height: usize,
    bpp: usize,
) {
    let row_bytes = width * bpp;
    if row_bytes == 0 {
        return;
    }
    for row in 0..height {
        let d = off + row * pitch;
        if d + row_bytes > dst.len() {
            break;
        }
        let line = &mut dst[d..d + row_bytes];
        if bpp == 2 {
            let bytes = color.to_le_bytes();
            for px in line.chunks_exact_mut(2) {
                px.copy_from_slice(&bytes);
            }
        } else {
            line.fill(color as u8);
        }
    }
}

/// Copy one 8-pixel column from the back buffer to the front buffer.
pub fn copy_8_col(dst: &mut [u8], src: &[u8], off: usize, pitch: usize, height: usize, bpp: usize) {
    blit(dst, off, pitch, src, off, pitch, 8, height, bpp);
}

/// Clear one 8-pixel column to `color`.
pub fn clear_8_col(dst: &mut [u8], off: usize, pitch: usize, height: usize, bpp: usize, color: u8) {
    fill(dst, off, pitch, color as u16, 8, height, bpp);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_put_get() {
        let mut buf = vec![0u8; 16];
        let mut v = PixelView::new(&mut buf, 0, 4, 1);
        v.put8(1, 2, 7);
        assert_eq!(v.get8(1, 2), Some(7));
        assert_eq!(buf[9], 7);
    }

    #[test]
    fn test_view_drops_out_of_bounds() {
        let mut buf = vec![0u8; 4];
        let mut v = PixelView::new(&mut buf, 0, 2, 1);
        v.put8(0, 5, 1);
        v.put8(-1, 0, 1);
        assert_eq!(v.get8(-1, 0), None);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_view_offset_reads_left_neighbour() {
        let mut buf = vec![1u8, 2, 3, 4];
        let mut v = PixelView::new(&mut buf, 0, 4, 1);
        let w = v.offset(2, 0);
        assert_eq!(w.get8(-1, 0), Some(2));
        assert_eq!(w.get8(0, 0), Some(3));
    }

    #[test]
    fn test_view_16bit() {
        let mut buf = vec![0u8; 8];
        let mut v = PixelView::new(&mut buf, 0, 4, 2);
        v.put16(1, 1, 0xBEEF);
        assert_eq!(v.get16(1, 1), Some(0xBEEF));
        assert_eq!(&buf[6..8], &[0xEF, 0xBE]);
    }

    #[test]
    fn test_blit_rows() {
        let src: Vec<u8> = (0..16).collect();
        let mut dst = vec![0u8; 16];
        blit(&mut dst, 1, 4, &src, 0, 4, 2, 2, 1);
        assert_eq!(&dst[0..8], &[0, 0, 1, 0, 0, 4, 5, 0]);
    }

    #[test]
    fn test_fill_16bit() {
        let mut dst = vec![0u8; 8];
        fill(&mut dst, 0, 4, 0x1234, 2, 2, 2);
        assert_eq!(dst, vec![0x34, 0x12, 0x34, 0x12, 0x34, 0x12, 0x34, 0x12]);
    }

    #[test]
    fn test_copy_and_clear_column() {
        let src = vec![9u8; 32];
        let mut dst = vec![0u8; 32];
        copy_8_col(&mut dst, &src, 0, 16, 2, 1);
        assert_eq!(&dst[0..8], &[9; 8]);
        assert_eq!(&dst[8..16], &[0; 8]);
        assert_eq!(&dst[16..24], &[9; 8]);
        clear_8_col(&mut dst, 16, 16, 1, 1, 0x1d);
        assert_eq!(&dst[16..24], &[0x1d; 8]);
    }
}
