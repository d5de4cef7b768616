//! Strip codecs.
//!
//! Every room and object image is stored as a sequence of 8-pixel-wide
//! strips. Each strip starts with one codec byte that picks the decoder and
//! carries its parameters: the low decimal digit is the bit width of literal
//! colours, and the range the byte falls in selects the algorithm and
//! whether the strip has transparent pixels.
//!
//! | codes      | decoder                                   |
//! |------------|-------------------------------------------|
//! | 1, 149     | raw 8-bit (149 skips the transparent colour) |
//! | 2, 3, 4, 7 | FM-Towns column formats                   |
//! | 8, 9       | 3DO run-length                            |
//! | 10         | EGA run-length (Amiga)                    |
//! | 14..=48    | zig-zag, vertical or horizontal           |
//! | 64..=128   | majority/minority                         |
//! | 134..=148  | HE majority/minority                      |
//!
//! 16-colour games have no codec byte: the whole strip is EGA run-length
//! data.

mod ega;
mod majmin;
mod raw;
mod towns;
mod zigzag;

pub use ega::draw_strip_ega;
pub use majmin::{draw_strip_complex, draw_strip_he, MajMinCodec};
pub use raw::{draw_strip_3do, draw_strip_raw};
pub use towns::{unk_decode_10, unk_decode_11, unk_decode_8, unk_decode_9};
pub use zigzag::{draw_strip_basic_h, draw_strip_basic_v};

use crate::context::RenderContext;
use crate::surface::PixelView;
use crate::GfxError;
use gfx_core::logging::{log, LogCategory, LogLevel};

pub const BMCOMP_RAW256: u8 = 1;
pub const BMCOMP_TOWNS_2: u8 = 2;
pub const BMCOMP_TOWNS_3: u8 = 3;
pub const BMCOMP_TOWNS_4: u8 = 4;
pub const BMCOMP_TOWNS_7: u8 = 7;
pub const BMCOMP_TRLE8BIT: u8 = 8;
pub const BMCOMP_RLE8BIT: u8 = 9;
pub const BMCOMP_PIX32: u8 = 10;
pub const BMCOMP_CUSTOM_RU_TR: u8 = 143;
pub const BMCOMP_TPIX256: u8 = 149;
pub const BMCOMP_SOLID_COLOR_FILL: u8 = 150;

/// Decoder family selected by a codec byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Raw,
    Towns2,
    Towns3,
    Towns4,
    Towns7,
    Rle3do,
    Ega,
    ZigzagV,
    ZigzagH,
    MajMin,
    HeMajMin,
}

/// A parsed codec byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub code: u8,
    pub codec: Codec,
    /// Skip pixels equal to the transparent colour while decoding
    pub transparent_check: bool,
    /// Report the strip as transparent to the compositor
    pub transparent_strip: bool,
}

impl Descriptor {
    pub fn parse(code: u8) -> Result<Self, GfxError> {
        let (codec, transparent_check, transparent_strip) = match code {
            BMCOMP_RAW256 => (Codec::Raw, false, false),
            BMCOMP_TOWNS_2 => (Codec::Towns2, false, false),
            BMCOMP_TOWNS_3 => (Codec::Towns3, false, false),
            BMCOMP_TOWNS_4 => (Codec::Towns4, false, false),
            BMCOMP_TOWNS_7 => (Codec::Towns7, false, false),
            BMCOMP_TRLE8BIT => (Codec::Rle3do, true, true),
            BMCOMP_RLE8BIT => (Codec::Rle3do, false, false),
            BMCOMP_PIX32 => (Codec::Ega, false, false),
            14..=18 => (Codec::ZigzagV, false, false),
            24..=28 => (Codec::ZigzagH, false, false),
            34..=38 => (Codec::ZigzagV, true, true),
            44..=48 => (Codec::ZigzagH, true, true),
            64..=68 | 104..=108 => (Codec::MajMin, false, false),
            84..=88 | 124..=128 => (Codec::MajMin, true, true),
            134..=138 => (Codec::HeMajMin, false, false),
            BMCOMP_CUSTOM_RU_TR | 144..=148 => (Codec::HeMajMin, true, true),
            // Transparent pixels are skipped but the strip is not flagged
            BMCOMP_TPIX256 => (Codec::Raw, true, false),
            _ => return Err(GfxError::UnknownCodec { code }),
        };
        Ok(Self {
            code,
            codec,
            transparent_check,
            transparent_strip,
        })
    }

    /// Bit width of literal colours.
    pub fn shift(&self) -> u32 {
        (self.code % 10) as u32
    }

    pub fn mask(&self) -> u8 {
        0xFFu8.checked_shr(8 - self.shift()).unwrap_or(0)
    }
}

/// Decode one strip of `height` rows into `dst`.
///
/// `src` starts at the strip's codec byte. Returns whether the strip was
/// flagged transparent.
pub fn decompress_bitmap(
    dst: &mut PixelView,
    src: &[u8],
    height: usize,
    ctx: &RenderContext,
) -> Result<bool, GfxError> {
    if height == 0 {
        return Ok(false);
    }

    if ctx.sixteen_color {
        draw_strip_ega(dst, src, height, ctx)?;
        return Ok(false);
    }

    let code = *src.first().ok_or(GfxError::Truncated { what: "codec byte" })?;
    let desc = Descriptor::parse(code).map_err(|e| {
        log(LogCategory::Codec, LogLevel::Error, || {
            format!("decompress_bitmap: unknown codec {}", code)
        });
        e
    })?;
    let data = &src[1..];
    let transp = desc.transparent_check;

    match desc.codec {
        Codec::Raw => draw_strip_raw(dst, data, height, ctx, transp)?,
        Codec::Towns2 => unk_decode_8(dst, data, height, ctx)?,
        Codec::Towns3 => unk_decode_9(dst, data, height, ctx)?,
        Codec::Towns4 => unk_decode_10(dst, data, height, ctx)?,
        Codec::Towns7 => unk_decode_11(dst, data, height, ctx)?,
        Codec::Rle3do => draw_strip_3do(dst, data, height, ctx, transp)?,
        Codec::Ega => draw_strip_ega(dst, data, height, ctx)?,
        Codec::ZigzagV => draw_strip_basic_v(dst, data, height, ctx, desc.shift(), transp)?,
        Codec::ZigzagH => draw_strip_basic_h(dst, data, height, ctx, desc.shift(), transp)?,
        Codec::MajMin => draw_strip_complex(dst, data, height, ctx, desc.shift(), transp)?,
        Codec::HeMajMin => draw_strip_he(dst, data, 8, height, ctx, desc.shift(), transp)?,
    }

    Ok(desc.transparent_strip)
}

/// Walks a strip column by column, top to bottom.
pub(crate) struct ColumnCursor {
    pub x: isize,
    pub y: isize,
    height: isize,
}

impl ColumnCursor {
    pub fn new(height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            height: height as isize,
        }
    }

    /// Step to the next pixel. Returns `false` once all 8 columns are done.
    pub fn advance(&mut self) -> bool {
        self.y += 1;
        if self.y >= self.height {
            self.y = 0;
            self.x += 1;
        }
        self.x < 8
    }
}
