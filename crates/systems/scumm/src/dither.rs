//! DOS render-mode filters applied to composited strips before they reach
//! the display: CGA 4-colour, CGA black-and-white and Hercules for the
//! EGA-era games, and the EGA ditherer for VGA games.

use crate::config::RenderMode;
use crate::virt_screen::VirtScreenNumber;

/// Hercules display size.
pub const HERC_WIDTH: usize = 720;
pub const HERC_HEIGHT: usize = 350;

const V2_VERB_COLORS: [u8; 16] = [
    0x0, 0x5, 0x5, 0x5, 0xA, 0xA, 0xA, 0xF, 0xF, 0x5, 0x5, 0x5, 0xA, 0xA, 0xF, 0xF,
];
const V2_TEXT_COLORS: [u8; 16] = [
    0x0, 0xF, 0xA, 0x5, 0xA, 0x5, 0x5, 0xF, 0xA, 0xA, 0xA, 0xA, 0xA, 0x5, 0x5, 0xF,
];
const MM_V1_VERB_COLORS: [u8; 16] = [
    0x0, 0x5, 0x5, 0x5, 0xA, 0xA, 0xA, 0xF, 0xA, 0x5, 0x5, 0x5, 0xA, 0xA, 0xA, 0xF,
];
const V2_MAIN_COLORS: [u8; 16] = [
    0x0, 0x4, 0x1, 0x5, 0x8, 0xA, 0x2, 0xF, 0xC, 0x7, 0xD, 0x5, 0xE, 0xB, 0xD, 0xF,
];

// Two rows of 16: even and odd lines.
const V3_MAIN_COLORS: [u8; 32] = [
    0x0, 0x4, 0x1, 0x5, 0x8, 0xA, 0x2, 0x3, 0xC, 0x7, 0xD, 0x5, 0xF, 0xB, 0x5, 0xF, //
    0x0, 0x1, 0x4, 0x5, 0x2, 0xA, 0x8, 0xC, 0x3, 0xD, 0x5, 0x5, 0xF, 0xE, 0x5, 0xF,
];

// Four rows of 16 for the 2x4 pattern.
const V4_MAIN_COLORS: [u8; 64] = [
    0x0, 0x4, 0x1, 0x5, 0x2, 0xA, 0x2, 0x3, 0x0, 0x5, 0x5, 0x7, 0xF, 0xE, 0x5, 0xF, //
    0x0, 0x1, 0x4, 0x5, 0x8, 0xA, 0x8, 0xC, 0x0, 0x7, 0x5, 0xD, 0xF, 0xB, 0x5, 0xF, //
    0x0, 0x4, 0x1, 0x5, 0x2, 0xA, 0x2, 0x3, 0x0, 0x5, 0x5, 0x7, 0xF, 0xE, 0x5, 0xF, //
    0x0, 0x1, 0x4, 0x5, 0x8, 0xA, 0x8, 0xC, 0x0, 0xD, 0x5, 0xD, 0xF, 0xB, 0x5, 0xF,
];

// v4 Hercules: 2 bits per pixel, two rows.
const HERC_V4: [u8; 32] = [
    0x00, 0x08, 0xAA, 0xBB, 0x55, 0x66, 0x99, 0x7F, 0x11, 0x55, 0x77, 0xEE, 0xAA, 0xEE, 0xFF, 0xFF, //
    0x00, 0x80, 0xAA, 0xDD, 0x00, 0x99, 0x66, 0xF7, 0x44, 0xAA, 0xDD, 0x77, 0xFF, 0xBB, 0xBB, 0xFF,
];

fn main_colors(version: u8) -> &'static [u8] {
    match version {
        0..=2 => &V2_MAIN_COLORS,
        3 => &V3_MAIN_COLORS,
        _ => &V4_MAIN_COLORS,
    }
}

#[inline]
fn lookup(table: &[u8], index: usize) -> u8 {
    table.get(index).copied().unwrap_or(0)
}

/// Where a filtered block lands on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitArea {
    pub pitch: usize,
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

/// Which buffer holds the result of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutput {
    /// The composite buffer, possibly rewritten in place
    Composite,
    /// The scale buffer, at double width
    Scaled,
}

/// What the DOS filter needs to know about the game and screen.
#[derive(Debug, Clone, Copy)]
pub struct DosFilter {
    pub version: u8,
    /// Zak McKracken uses the v2 colour maps in every version
    pub zak: bool,
    pub render_mode: RenderMode,
    pub screen: VirtScreenNumber,
    pub topline: i32,
    pub screen_width: usize,
    /// Compositor colour remap for indices 0..16
    pub remap: [u8; 16],
}

/// Filter one composited block for the DOS render modes.
///
/// `composite` holds `area.width * area.height` bytes at pitch
/// `area.width`. CGA colour output is rewritten in place; the monochrome
/// modes write a double-width image into `scale` and return its geometry.
pub fn post_process_dos_graphics(
    filter: &DosFilter,
    composite: &mut [u8],
    scale: &mut Vec<u8>,
    area: BlitArea,
) -> (FilterOutput, BlitArea) {
    let herc = filter.render_mode.is_hercules();
    let v1 = filter.version == 1;
    let v3 = filter.version > 2;
    let BlitArea {
        pitch: _,
        mut x,
        mut y,
        mut width,
        mut height,
    } = area;

    if !v1 && !herc && filter.render_mode != RenderMode::Cga {
        return (FilterOutput::Composite, area);
    }

    let mut text_colors = [0u8; 16];
    for (i, c) in text_colors.iter_mut().enumerate() {
        *c = lookup(&MM_V1_VERB_COLORS, filter.remap[i] as usize);
    }
    let verb = filter.screen == VirtScreenNumber::Verb;
    let colors: &[u8] = if filter.zak || filter.version == 2 {
        if verb || herc {
            &V2_VERB_COLORS
        } else {
            &V2_TEXT_COLORS
        }
    } else if verb {
        &MM_V1_VERB_COLORS
    } else {
        &text_colors
    };
    let main = main_colors(filter.version);

    let ln_mod: usize = if filter.version > 3 && !herc { 0x40 } else { 0x20 };
    let mut ln = if v3 {
        (y as usize & ((ln_mod >> 4) - 1)) << 4
    } else {
        0
    };

    match filter.render_mode {
        RenderMode::Cga | RenderMode::CgaComposite => {
            let n = (width * height).min(composite.len());
            let buf = &mut composite[..n];
            if v3 || filter.screen == VirtScreenNumber::Main {
                for row in buf.chunks_mut(width.max(1)) {
                    for pair in row.chunks_exact_mut(2) {
                        let c = if v1 {
                            pair[0]
                        } else {
                            (lookup(main, pair[0] as usize + ln) & 0x0C) | (lookup(main, pair[1] as usize + ln) & 0x03)
                        };
                        pair[0] = (c >> 2) & 3;
                        pair[1] = c & 3;
                    }
                    if v3 {
                        ln = (ln + 0x10) % ln_mod;
                    }
                }
            } else {
                for pair in buf.chunks_exact_mut(2) {
                    pair[0] = (lookup(colors, pair[0] as usize) >> 2) & 3;
                    pair[1] = lookup(colors, pair[1] as usize) & 3;
                }
            }
            (FilterOutput::Composite, BlitArea { pitch: width, ..area })
        }
        RenderMode::HerculesGreen | RenderMode::HerculesAmber | RenderMode::CgaBw => {
            let pitch = if herc { HERC_WIDTH } else { filter.screen_width * 2 };
            let needed = pitch * (height * 2 + 2);
            if scale.len() < needed {
                scale.resize(needed, 0);
            }
            let src = &composite[..(width * height).min(composite.len())];
            let px = |i: usize| src.get(i).copied().unwrap_or(0) as usize;

            if v3 {
                // MI1 EGA Hercules: 4 source rows become 7 display lines
                let blocks = height >> 2;
                height = blocks * 7;
                y = (y << 1) - (y >> 2);
                let mut s = 0usize;
                let mut d = 0usize;
                for _ in 0..blocks {
                    ln = 0;
                    for _ in 0..7 {
                        let line = d;
                        for _ in 0..width >> 2 {
                            let c = (lookup(&HERC_V4, px(s) + ln) & 0xC0)
                                | (lookup(&HERC_V4, px(s + 1) + ln) & 0x30)
                                | (lookup(&HERC_V4, px(s + 2) + ln) & 0x0C)
                                | (lookup(&HERC_V4, px(s + 3) + ln) & 0x03);
                            for i in (0..8).rev() {
                                scale[d] = (c >> i) & 1;
                                d += 1;
                            }
                            s += 4;
                        }
                        d = line + pitch;
                        ln ^= 0x10;
                        if ln != 0 {
                            s -= width;
                        }
                    }
                    s += width;
                }
            } else if filter.screen == VirtScreenNumber::Main {
                let mut rows = height;
                if herc {
                    y = (y - filter.topline) * 2 + filter.topline;
                    height = (height << 1).min(HERC_HEIGHT.saturating_sub(y.max(0) as usize));
                    rows = height >> 1;
                }
                for row in 0..rows {
                    let line = row * 2 * pitch;
                    for pair in 0..width >> 1 {
                        let s = row * width + pair * 2;
                        let c = if v1 {
                            px(s) as u8
                        } else {
                            (lookup(main, px(s)) & 0x0C) | (lookup(main, px(s + 1)) & 0x03)
                        };
                        let d = line + pair * 4;
                        for (k, shift) in [3u8, 2, 1, 0].into_iter().enumerate() {
                            let bit = (c >> shift) & 1;
                            scale[d + k] = bit;
                            scale[d + pitch + k] = if herc { 0 } else { bit };
                        }
                    }
                }
            } else {
                let mut line_stride = 2 * pitch;
                if herc {
                    line_stride = HERC_WIDTH;
                    y -= filter.topline;
                    if verb {
                        y += filter.topline * 2 - 16;
                        height = height.min(HERC_HEIGHT.saturating_sub(y.max(0) as usize));
                    }
                }
                for row in 0..height {
                    let line = row * line_stride;
                    for col in 0..width {
                        let c = lookup(colors, px(row * width + col));
                        let d = line + col * 2;
                        scale[d] = (c >> 1) & 1;
                        scale[d + 1] = c & 1;
                        if !herc {
                            scale[d + pitch] = scale[d];
                            scale[d + pitch + 1] = scale[d + 1];
                        }
                    }
                }
            }

            x <<= 1;
            width <<= 1;
            if herc {
                x += 40;
            } else {
                y <<= 1;
                height <<= 1;
            }
            (
                FilterOutput::Scaled,
                BlitArea {
                    pitch,
                    x,
                    y,
                    width,
                    height,
                },
            )
        }
        _ if v1 && filter.screen == VirtScreenNumber::Text => {
            // Zak v1 text colours are remapped even in EGA mode
            let n = (width * height).min(composite.len());
            for p in &mut composite[..n] {
                *p = filter.remap[(*p & 15) as usize];
            }
            (FilterOutput::Composite, BlitArea { pitch: width, ..area })
        }
        _ => (FilterOutput::Composite, BlitArea { pitch: width, ..area }),
    }
}

/// Double a composited 8-bit block, dithering each pixel into a
/// checkerboard of the two EGA colours `maps[0][c]` and `maps[1][c]`.
/// The phase follows the display row so neighbouring blocks line up.
pub fn dither_vga_to_ega(composite: &[u8], scale: &mut Vec<u8>, maps: &[[u8; 256]; 2], area: BlitArea) -> BlitArea {
    let BlitArea { x, y, width, height, .. } = area;
    let pitch = width * 2;
    let needed = pitch * height * 2;
    if scale.len() < needed {
        scale.resize(needed, 0);
    }

    let mut phase = 1 ^ (y as usize & 1);
    for row in 0..height {
        let d0 = row * 2 * pitch;
        let d1 = d0 + pitch;
        for col in 0..width {
            let c = composite.get(row * width + col).copied().unwrap_or(0) as usize;
            let a = maps[phase][c];
            let b = maps[phase ^ 1][c];
            scale[d0 + col * 2] = a;
            scale[d1 + col * 2] = a;
            scale[d0 + col * 2 + 1] = b;
            scale[d1 + col * 2 + 1] = b;
        }
        phase ^= 1;
    }

    BlitArea {
        pitch,
        x: x << 1,
        y: y << 1,
        width: width << 1,
        height: height << 1,
    }
}
