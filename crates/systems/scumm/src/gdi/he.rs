//! Humongous room backgrounds and transparency-masked z-planes.
//!
//! From HE 7.1 on a room background is one full-screen `BMAP` image instead
//! of a strip map. It is decoded straight into the back buffer and then
//! copied to the front buffer in one go.

use crate::codec::draw_strip_he;
use crate::codec::BMCOMP_SOLID_COLOR_FILL;
use crate::context::RenderContext;
use crate::game::GameProfile;
use crate::mask::{decompress_mask_img, decompress_mask_img_or, decompress_tmsk, MaskBuffer};
use crate::resource::{find_chunk_data, get_zplanes, read_le16, ZPlaneList, TAG_BMAP};
use crate::surface::{blit, fill};
use crate::virt_screen::VirtScreen;
use crate::GfxError;
use gfx_core::logging::{log, LogCategory, LogLevel};
use gfx_core::types::Rect;

/// Copy `rect` of the back buffer to the front buffer and mark it dirty.
///
/// The rectangle is clamped to the screen with inclusive right and bottom
/// edges. Returns the area marked, or `None` when nothing was copied.
pub fn background_to_foreground_blit(vs: &mut VirtScreen, rect: Rect) -> Option<Rect> {
    let (w, h) = (vs.w as i32, vs.h as i32);
    if rect.top > h || rect.bottom < 0 || rect.left > w || rect.right < 0 || w == 0 || h == 0 {
        return None;
    }
    let left = rect.left.clamp(0, w - 1);
    let right = rect.right.clamp(0, w - 1);
    let top = rect.top.clamp(0, h - 1);
    let bottom = rect.bottom.clamp(0, h - 1);
    let rw = right - left + 1;
    let rh = bottom - top + 1;
    if rw <= 0 || rh <= 0 {
        return None;
    }

    let off = vs.pixel_offset(left, top);
    let (pitch, bpp) = (vs.pitch, vs.bpp());
    if let (front, Some(back)) = vs.buffers_mut() {
        blit(front, off, pitch, back, off, pitch, rw as usize, rh as usize, bpp);
    }

    let marked = Rect::new(left, top, right, bottom + 1);
    vs.dirty.mark(marked.left, marked.right, marked.top, marked.bottom);
    Some(marked)
}

/// Decode a full-screen `BMAP` background into the back buffer, copy it to
/// the front and load the z-planes that go with it.
pub fn draw_bmap_bg(
    image: &[u8],
    vs: &mut VirtScreen,
    mask: &mut MaskBuffer,
    ctx: &RenderContext,
    profile: &GameProfile,
    num_zbuffer: usize,
    zbuffer_disabled: bool,
) -> Result<(), GfxError> {
    let bmap = find_chunk_data(image, &TAG_BMAP).ok_or(GfxError::MissingChunk {
        tag: "BMAP".to_string(),
    })?;
    let (&code, data) = bmap.split_first().ok_or(GfxError::Truncated { what: "BMAP" })?;
    let (w, h) = (vs.w, vs.h);

    match code {
        134..=138 | 144..=148 => {
            let shift = (if code >= 144 { code - 140 } else { code - 130 }) as u32;
            let mut dst = vs.back_view_at(0);
            draw_strip_he(&mut dst, data, w, h, ctx, shift, false)?;
        }
        BMCOMP_SOLID_COLOR_FILL => {
            let color = *data.first().ok_or(GfxError::Truncated { what: "BMAP fill" })?;
            let value = if ctx.bytes_per_pixel == 2 {
                ctx.high_color.get(color as usize)
            } else {
                color as u16
            };
            let (pitch, bpp) = (vs.pitch, vs.bpp());
            let target = match vs.buffers_mut() {
                (_, Some(back)) => back,
                (front, None) => front,
            };
            fill(target, 0, pitch, value, w, h, bpp);
        }
        _ => {
            log(LogCategory::Codec, LogLevel::Debug, || {
                format!("draw_bmap_bg: unsupported background codec {}", code)
            });
        }
    }

    background_to_foreground_blit(vs, Rect::with_size(w as i32, h as i32));

    let zplanes = get_zplanes(image, profile, num_zbuffer, zbuffer_disabled, true)?;
    if zplanes.count <= 1 {
        return Ok(());
    }
    for strip in 0..mask.num_strips() {
        for i in 1..zplanes.count {
            let Some(plane) = zplanes.get(i) else {
                continue;
            };
            let offs = read_le16(plane, strip * 2 + 8)? as usize;
            if offs == 0 {
                continue;
            }
            let src = plane.get(offs..).ok_or(GfxError::ZPlaneOutOfRange {
                plane: i,
                strip,
                offset: offs as i64,
                len: plane.len(),
            })?;
            decompress_mask_img(&mut mask.column(strip, 0, i), src, h)?;
        }
    }
    Ok(())
}

/// HE mask decode for one strip: every plane uses the chunked `+8` offset
/// table, and a `TMSK` transparency mask, when present, merges the plane
/// instead of overwriting it.
#[allow(clippy::too_many_arguments)]
pub fn decode_mask(
    mask: &mut MaskBuffer,
    zplanes: &ZPlaneList,
    tmsk: Option<&[u8]>,
    x: usize,
    y: usize,
    height: usize,
    stripnr: usize,
    allow_or: bool,
) -> Result<(), GfxError> {
    for i in 1..zplanes.count {
        let Some(plane) = zplanes.get(i) else {
            continue;
        };
        let offs = read_le16(plane, stripnr * 2 + 8)? as usize;
        let mut column = mask.column(x, y, i);
        if offs == 0 {
            if !allow_or {
                column.clear(height);
            }
            continue;
        }
        let src = plane.get(offs..).ok_or(GfxError::ZPlaneOutOfRange {
            plane: i,
            strip: stripnr,
            offset: offs as i64,
            len: plane.len(),
        })?;
        if let Some(tmsk) = tmsk {
            let t_off = read_le16(tmsk, stripnr * 2 + 8)? as usize;
            let t_src = tmsk.get(t_off..).ok_or(GfxError::Truncated { what: "TMSK" })?;
            decompress_tmsk(&mut column, t_src, src, height)?;
        } else if allow_or {
            decompress_mask_img_or(&mut column, src, height)?;
        } else {
            decompress_mask_img(&mut column, src, height)?;
        }
    }
    Ok(())
}
