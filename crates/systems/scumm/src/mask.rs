//! Z-plane storage and mask codecs.
//!
//! All z-planes of the room share one byte buffer. Each byte covers one
//! 8-pixel strip of one row; vertically adjacent bytes of the same strip are
//! `num_strips` apart, so a strip's mask is a column with a stride of the
//! total strip count, not of the row width.
//!
//! Plane 0 is the charset mask (text drawn over the room). Planes 1.. are
//! the room's occlusion layers.

use crate::GfxError;
use gfx_core::bits::BitReader;

/// Number of plane slots addressable by the compositor.
pub const MAX_ZBUFFERS: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct MaskBuffer {
    data: Vec<u8>,
    num_strips: usize,
    num_zbuffer: usize,
    img_buf_offs: [usize; MAX_ZBUFFERS],
}

impl MaskBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `num_zbuffer` zeroed planes for a room of `room_height`
    /// rows. Each plane keeps 4 rows of slack (10 from v7 on) for strips
    /// past the right edge. Slots beyond `num_zbuffer` alias the last plane.
    pub fn init(
        &mut self,
        num_zbuffer: usize,
        num_strips: usize,
        room_height: usize,
        version: u8,
    ) -> Result<(), GfxError> {
        if !(1..=MAX_ZBUFFERS).contains(&num_zbuffer) {
            return Err(GfxError::InvalidZBufferCount { count: num_zbuffer });
        }

        let slack = if version >= 7 { 10 } else { 4 };
        let item_size = (room_height + slack) * num_strips;

        self.data = vec![0; item_size * num_zbuffer];
        self.num_strips = num_strips;
        self.num_zbuffer = num_zbuffer;
        for (i, off) in self.img_buf_offs.iter_mut().enumerate() {
            *off = i.min(num_zbuffer - 1) * item_size;
        }
        Ok(())
    }

    pub fn num_strips(&self) -> usize {
        self.num_strips
    }

    pub fn num_zbuffer(&self) -> usize {
        self.num_zbuffer
    }

    pub fn plane_offset(&self, z: usize) -> usize {
        self.img_buf_offs[z.min(MAX_ZBUFFERS - 1)]
    }

    pub fn index(&self, strip: usize, y: usize, z: usize) -> usize {
        self.plane_offset(z) + strip + y * self.num_strips
    }

    pub fn get(&self, strip: usize, y: usize, z: usize) -> u8 {
        self.data.get(self.index(strip, y, z)).copied().unwrap_or(0)
    }

    pub fn set(&mut self, strip: usize, y: usize, z: usize, value: u8) {
        let at = self.index(strip, y, z);
        if let Some(b) = self.data.get_mut(at) {
            *b = value;
        }
    }

    /// Column view of one strip of plane `z`, starting at row `y`.
    pub fn column(&mut self, strip: usize, y: usize, z: usize) -> MaskColumn<'_> {
        let at = self.index(strip, y, z);
        MaskColumn {
            stride: self.num_strips,
            buf: &mut self.data,
            at,
        }
    }

    /// Zero the charset plane.
    pub fn clear_charset_mask(&mut self) {
        let end = self.img_buf_offs[1].min(self.data.len());
        self.data[..end].fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// One strip's mask bytes, `stride` apart.
#[derive(Debug)]
pub struct MaskColumn<'a> {
    buf: &'a mut [u8],
    at: usize,
    stride: usize,
}

impl<'a> MaskColumn<'a> {
    /// Wrap a raw buffer, for callers that keep their own mask store.
    pub fn new(buf: &'a mut [u8], at: usize, stride: usize) -> Self {
        Self { buf, at, stride }
    }

    #[inline]
    fn slot(&mut self, row: usize) -> Option<&mut u8> {
        self.buf.get_mut(self.at + row * self.stride)
    }

    pub fn get(&self, row: usize) -> u8 {
        self.buf.get(self.at + row * self.stride).copied().unwrap_or(0)
    }

    #[inline]
    pub fn put(&mut self, row: usize, value: u8) {
        if let Some(b) = self.slot(row) {
            *b = value;
        }
    }

    #[inline]
    pub fn or(&mut self, row: usize, value: u8) {
        if let Some(b) = self.slot(row) {
            *b |= value;
        }
    }

    pub fn clear(&mut self, height: usize) {
        for row in 0..height {
            self.put(row, 0);
        }
    }
}

/// Run length of a mask control byte; a zero count means 256.
fn run_length(control: u8) -> usize {
    match control & 0x7F {
        0 => 256,
        n => n as usize,
    }
}

fn decompress_mask<'a>(
    dst: &mut MaskColumn<'a>,
    src: &[u8],
    height: usize,
    combine: fn(&mut MaskColumn<'a>, usize, u8),
) -> Result<(), GfxError> {
    let mut reader = BitReader::new(src);
    let mut row = 0;

    while row < height {
        let control = reader.read_byte()?;
        let run = run_length(control).min(height - row);
        if control & 0x80 != 0 {
            let value = reader.read_byte()?;
            for _ in 0..run {
                combine(dst, row, value);
                row += 1;
            }
        } else {
            for _ in 0..run {
                let value = reader.read_byte()?;
                combine(dst, row, value);
                row += 1;
            }
        }
    }
    Ok(())
}

/// Decode a run-length mask strip, overwriting the column.
///
/// `[0x80 | n] v` repeats `v` n times, `[n] v1..vn` copies n literal bytes.
pub fn decompress_mask_img(dst: &mut MaskColumn, src: &[u8], height: usize) -> Result<(), GfxError> {
    decompress_mask(dst, src, height, MaskColumn::put)
}

/// Same encoding as [`decompress_mask_img`], OR-ed into the column.
pub fn decompress_mask_img_or(dst: &mut MaskColumn, src: &[u8], height: usize) -> Result<(), GfxError> {
    decompress_mask(dst, src, height, MaskColumn::or)
}

/// One of the two parallel run-length streams of a transparency mask.
struct RunStream<'a> {
    reader: BitReader<'a>,
    count: u8,
    repeat: bool,
    bits: u8,
}

impl<'a> RunStream<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self {
            reader: BitReader::new(src),
            count: 0,
            repeat: false,
            bits: 0,
        }
    }

    fn next(&mut self) -> Result<u8, GfxError> {
        if self.count == 0 {
            self.count = self.reader.read_byte()?;
            self.repeat = self.count & 0x80 != 0;
            if self.repeat {
                self.count &= 0x7F;
                self.bits = self.reader.read_byte()?;
            }
        }
        if !self.repeat {
            self.bits = self.reader.read_byte()?;
        }
        self.count = self.count.wrapping_sub(1);
        Ok(self.bits)
    }
}

/// Merge a mask through a transparency mask: bits set in `tmsk` take the
/// value from `src`, the rest keep the destination.
pub fn decompress_tmsk(
    dst: &mut MaskColumn,
    tmsk: &[u8],
    src: &[u8],
    height: usize,
) -> Result<(), GfxError> {
    let mut src_stream = RunStream::new(src);
    let mut mask_stream = RunStream::new(tmsk);

    for row in 0..height {
        let src_bits = src_stream.next()?;
        let mask_bits = mask_stream.next()?;
        let old = dst.get(row);
        dst.put(row, (old & !mask_bits) | (src_bits & mask_bits));
    }
    Ok(())
}
