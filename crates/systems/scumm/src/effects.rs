//! Screen shake and the v1-v5 flashlight.

use crate::dirty::USAGEBIT_DIRTY;
use crate::engine::ScummGfx;
use crate::game::{GameId, Platform};
use crate::surface::{blit, fill};
use crate::virt_screen::VirtScreenNumber;
use gfx_core::display::Display;
use gfx_core::logging::{log, LogCategory, LogLevel};
use gfx_core::timer::FrameTimer;

/// Vertical offsets cycled through while the screen shakes.
pub const SHAKE_POSITIONS: [i32; 8] = [0, 1, 2, 1, 0, 2, 3, 1];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShakeState {
    pub enabled: bool,
    pub frame: usize,
    /// Millisecond timestamp of the next step, 0 when idle
    pub next_tick: u64,
    /// Sub-millisecond remainder in microseconds
    pub tick_counter: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flashlight {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub x_strips: i32,
    pub y_strips: i32,
    pub erase_flag: bool,
    /// Front-buffer offset of the lit window while it is drawn
    pub buffer: Option<usize>,
}

const TOWNS_CURVE: [u8; 8] = [0x01, 0x07, 0x0F, 0x1F, 0x3F, 0x7F, 0x7F, 0xFF];

#[rustfmt::skip]
const V1_FWD_CURVE: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0xFF,
    0x00, 0x00, 0xFF, 0xFF,
    0x00, 0x00, 0xFF, 0xFF,
    0x00, 0xFF, 0xFF, 0xFF,
    0x00, 0xFF, 0xFF, 0xFF,
    0x00, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF,
];

#[rustfmt::skip]
const V1_BKWD_CURVE: [u8; 32] = [
    0xFF, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0x00, 0x00,
    0xFF, 0xFF, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x00,
    0xFF, 0xFF, 0xFF, 0x00,
    0xFF, 0xFF, 0xFF, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF,
];

#[rustfmt::skip]
const V2_FWD_CURVE: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x0F, 0xFF,
    0x00, 0x00, 0xFF, 0xFF,
    0x00, 0x0F, 0xFF, 0xFF,
    0x00, 0xFF, 0xFF, 0xFF,
    0x0F, 0xFF, 0xFF, 0xFF,
    0x0F, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF,
];

#[rustfmt::skip]
const V2_BKWD_CURVE: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00,
    0xFF, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0x00, 0x00,
    0xFF, 0xFF, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x00,
    0xFF, 0xFF, 0xFF, 0x00,
    0xFF, 0xFF, 0xFF, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF,
];

#[rustfmt::skip]
const V4_FWD_CURVE: [u8; 64] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

#[rustfmt::skip]
const V4_BKWD_CURVE: [u8; 64] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

// Pixels blanked per row in the 16-bit corners.
const CORNER_16BPP: [usize; 8] = [8, 6, 4, 3, 2, 2, 1, 1];

#[inline]
fn and_at(buf: &mut [u8], idx: isize, mask: u8) {
    if idx < 0 {
        return;
    }
    if let Some(b) = buf.get_mut(idx as usize) {
        *b &= mask;
    }
}

#[inline]
fn nibble(value: u8, bits: u8) -> u8 {
    if value & bits != 0 {
        0xFF
    } else {
        0x00
    }
}

impl<D: Display, T: FrameTimer> ScummGfx<D, T> {
    pub fn shake(&self) -> &ShakeState {
        &self.shake
    }

    /// Turn the screen shake on or off. Toggling forces a full redraw.
    pub fn set_shake(&mut self, mode: i32) {
        let enabled = mode != 0;
        if self.shake.enabled != enabled {
            self.full_redraw = true;
        }
        self.shake.enabled = enabled;
        self.shake.frame = 0;
        self.display.set_shake_pos(0, 0);
    }

    /// Step the shake animation to the current time. Each step lasts 8
    /// ticks of the configured timer rate.
    pub fn update_screen_shake_effect(&mut self) {
        if !self.shake.enabled {
            if self.shake.frame != 0 {
                self.shake.frame = 0;
                self.display.set_shake_pos(0, 0);
            }
            self.shake.next_tick = 0;
            self.shake.tick_counter = 0;
            return;
        }

        let now = self.timer.millis();
        if self.shake.next_tick == 0 {
            self.shake.next_tick = now;
        }
        let step = (1_000_000 / u64::from(self.config.shake_timer_rate.max(1))) * 8;
        while now >= self.shake.next_tick {
            self.shake.frame = (self.shake.frame + 1) % SHAKE_POSITIONS.len();
            self.display.set_shake_pos(0, -SHAKE_POSITIONS[self.shake.frame]);
            self.shake.tick_counter += step;
            self.shake.next_tick += self.shake.tick_counter / 1000;
            self.shake.tick_counter %= 1000;
        }
    }

    pub fn flashlight(&self) -> &Flashlight {
        &self.flashlight
    }

    /// Size of the lit window in 8-pixel units. Zero switches it off.
    pub fn set_flashlight_size(&mut self, x_strips: i32, y_strips: i32) {
        self.flashlight.x_strips = x_strips.max(0);
        self.flashlight.y_strips = y_strips.max(0);
    }

    /// Forget the drawn window without erasing it; the next background
    /// redraw covers it.
    pub fn clear_flashlight(&mut self) {
        self.flashlight.erase_flag = false;
        self.flashlight.buffer = None;
    }

    /// Light the room around the cursor (Zak, Maniac) or the ego actor
    /// (everything else). `mouse` is in display coordinates, `ego` in room
    /// coordinates.
    pub fn draw_flashlight(&mut self, mouse: (i32, i32), ego: (i32, i32)) {
        let profile = &self.profile;
        let black: u8 = if profile.is_nes() { 0x1d } else { 0x00 };
        let vs = &mut self.screens[VirtScreenNumber::Main.index()];
        let (pitch, bpp) = (vs.pitch, vs.bpp());
        let fl = &mut self.flashlight;

        if fl.erase_flag {
            if let Some(off) = fl.buffer {
                fill(vs.pixels_mut(), off, pitch, black as u16, fl.w as usize, fl.h as usize, bpp);
            }
            let (x, y, w, h) = (fl.x, fl.y, fl.w, fl.h);
            fl.erase_flag = false;
            self.mark_rect_as_dirty(VirtScreenNumber::Main, x, x + w, y, y + h, Some(USAGEBIT_DIRTY));
        }

        let profile = &self.profile;
        let vs = &mut self.screens[VirtScreenNumber::Main.index()];
        let fl = &mut self.flashlight;
        if fl.x_strips == 0 || fl.y_strips == 0 {
            return;
        }

        let (mut x, mut y) = if matches!(profile.id, GameId::Zak | GameId::Maniac) {
            (mouse.0 + vs.xstart, mouse.1 - vs.topline)
        } else {
            ego
        };
        let towns = profile.platform == Platform::FmTowns;
        if !towns {
            x &= !7;
            y &= !1;
        }

        fl.w = fl.x_strips * 8;
        fl.h = fl.y_strips * 8;
        fl.x = x - fl.w / 2 - self.screen_start_strip * 8;
        fl.y = y - fl.h / 2;
        if profile.id == GameId::Loom && profile.version == 3 && !towns {
            fl.x += 4;
            fl.y -= 12;
        }

        let span = self.gdi.num_strips as i32 * 8;
        if fl.x < 0 {
            fl.x = 0;
        } else if fl.x + fl.w > span {
            fl.x = span - fl.w;
        }
        if fl.y < 0 {
            fl.y = 0;
        } else if fl.y + fl.h > vs.h as i32 {
            fl.y = vs.h as i32 - fl.h;
        }

        for i in fl.x / 8..(fl.x + fl.w) / 8 {
            self.usage
                .set((self.screen_start_strip + i).max(0) as usize, USAGEBIT_DIRTY);
            vs.dirty.set_strip(i.max(0) as usize, 0, vs.h as i32);
        }

        let off = vs.pixel_offset(fl.x, fl.y);
        fl.buffer = Some(off);
        let (w, h) = (fl.w.max(0) as usize, fl.h.max(0) as usize);
        if let (front, Some(back)) = vs.buffers_mut() {
            blit(front, off, pitch, back, off, pitch, w, h, bpp);
        }

        let rounded = !matches!(profile.platform, Platform::Apple2gs | Platform::C64 | Platform::Nes);
        if rounded && w >= 8 && h >= 8 {
            let buf = vs.pixels_mut().get_mut(off..).unwrap_or_default();
            if bpp == 1 {
                let indy3_vga = profile.id == GameId::Indy3 && profile.features.old_256;
                round_corners_8bpp(buf, pitch, w as isize, h as isize, profile.version, towns, indy3_vga);
            } else {
                round_corners_16bpp(buf, pitch, w, h);
            }
        }

        let (fx, fy, fw, fh) = (fl.x, fl.y, fl.w, fl.h);
        fl.erase_flag = true;
        self.mark_rect_as_dirty(VirtScreenNumber::Main, fx, fx + fw, fy, fy + fh, Some(USAGEBIT_DIRTY));
        log(LogCategory::Screen, LogLevel::Trace, || {
            format!("flashlight at ({}, {}) {}x{}", fx, fy, fw, fh)
        });
    }
}

fn round_corners_8bpp(buf: &mut [u8], pitch: usize, w: isize, h: isize, version: u8, towns: bool, indy3_vga: bool) {
    let pitch = pitch as isize;
    let mut height = h - 1;
    let mut row = 0isize;

    if towns {
        for curve in TOWNS_CURVE {
            let height_loc = pitch * height;
            let mut width = w - 1;
            let mut bit = 0x80u8;
            let mut idx = 0isize;
            while bit != 0 {
                let mask = if bit & curve != 0 { 0xFF } else { 0x00 };
                and_at(buf, row + idx, mask);
                and_at(buf, row + idx + height_loc, mask);
                and_at(buf, row + idx + width, mask);
                and_at(buf, row + idx + width + height_loc, mask);
                width -= 2;
                bit >>= 1;
                idx += 1;
            }
            row += pitch;
            height -= 2;
        }
        return;
    }

    let (fwd, bkwd): (&[u8], &[u8]) = match version {
        1 => (&V1_FWD_CURVE, &V1_BKWD_CURVE),
        2 => (&V2_FWD_CURVE, &V2_BKWD_CURVE),
        3 if indy3_vga => (&V4_FWD_CURVE, &V4_BKWD_CURVE),
        3 => (&V2_FWD_CURVE, &V2_BKWD_CURVE),
        _ => (&V4_FWD_CURVE, &V4_FWD_CURVE),
    };
    let width = w - 8;

    if version <= 3 && !indy3_vga {
        // Nibble masks: each entry covers two pixels
        for line in 0..8 {
            let height_loc = pitch * height;
            for pt in 0..4 {
                let j = pt as isize * 2;
                let f = fwd[line * 4 + pt];
                let b = bkwd[line * 4 + pt];
                for base in [row, row + height_loc] {
                    and_at(buf, base + j, nibble(f, 0xF0));
                    and_at(buf, base + j + 1, nibble(f, 0x0F));
                    and_at(buf, base + j + width, nibble(b, 0x0F));
                    and_at(buf, base + j + width + 1, nibble(b, 0xF0));
                }
            }
            height -= 2;
            row += pitch;
        }
    } else {
        for line in 0..8 {
            let height_loc = pitch * height;
            for idx in 0..8usize {
                let f = fwd[line * 8 + idx];
                let b = if indy3_vga {
                    bkwd[line * 8 + idx]
                } else {
                    bkwd[line * 8 + 7 - idx]
                };
                let i = idx as isize;
                and_at(buf, row + i, f);
                and_at(buf, row + i + height_loc, f);
                and_at(buf, row + i + width, b);
                and_at(buf, row + i + width + height_loc, b);
            }
            row += pitch;
            height -= 2;
        }
    }
}

fn round_corners_16bpp(buf: &mut [u8], pitch: usize, w: usize, h: usize) {
    let maxcol = (w - 1) * 2;
    let mut minrow = 0usize;
    let mut maxrow = (h - 1) * pitch;
    let mut zero = |at: usize| {
        if let Some(px) = buf.get_mut(at..at + 2) {
            px.fill(0);
        }
    };
    for d in CORNER_16BPP {
        for j in 0..d {
            zero(minrow + 2 * j);
            zero(minrow + maxcol - 2 * j);
            zero(maxrow + 2 * j);
            zero(maxrow + maxcol - 2 * j);
        }
        minrow += pitch;
        maxrow = maxrow.saturating_sub(pitch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GfxConfig;
    use crate::game::GameProfile;
    use gfx_core::display::FrameDisplay;
    use gfx_core::timer::ManualTimer;
    use gfx_core::types::PixelFormat;

    fn engine(profile: GameProfile) -> ScummGfx<FrameDisplay, ManualTimer> {
        let display = FrameDisplay::new(320, 200, PixelFormat::Clut8);
        let mut gfx = ScummGfx::new(profile, GfxConfig::default(), display, ManualTimer::new());
        gfx.init_screens(16, 144);
        gfx
    }

    #[test]
    fn test_shake_toggle_forces_redraw() {
        let mut gfx = engine(GameProfile::new(GameId::Monkey, 5, Platform::Dos));
        gfx.set_shake(1);
        assert!(gfx.full_redraw);
        assert!(gfx.shake().enabled);
        gfx.full_redraw = false;
        gfx.set_shake(2);
        assert!(!gfx.full_redraw);
        assert_eq!(gfx.display().shake_pos(), (0, 0));
    }

    #[test]
    fn test_shake_steps_and_stops() {
        let mut gfx = engine(GameProfile::new(GameId::Monkey, 5, Platform::Dos));
        gfx.set_shake(1);
        gfx.update_screen_shake_effect();
        assert_eq!(gfx.shake().frame, 1);
        assert_eq!(gfx.display().shake_pos(), (0, -1));

        // 8 ticks at 60 Hz last 133 ms
        gfx.timer_mut().wait_quarter_frames(40);
        gfx.update_screen_shake_effect();
        assert_eq!(gfx.shake().frame, 2);
        assert_eq!(gfx.display().shake_pos(), (0, -2));

        gfx.set_shake(0);
        gfx.update_screen_shake_effect();
        assert_eq!(gfx.shake().frame, 0);
        assert_eq!(gfx.shake().next_tick, 0);
        assert_eq!(gfx.display().shake_pos(), (0, 0));
    }

    #[test]
    fn test_flashlight_copies_back_buffer_and_rounds() {
        let mut gfx = engine(GameProfile::new(GameId::Zak, 5, Platform::Dos));
        let main = gfx.screen_mut(VirtScreenNumber::Main);
        main.pixels_mut().fill(0);
        if let Some(back) = main.back_buf_mut() {
            back.fill(7);
        }
        gfx.set_flashlight_size(6, 4);
        gfx.draw_flashlight((100, 80), (0, 0));

        let fl = *gfx.flashlight();
        assert_eq!((fl.w, fl.h), (48, 32));
        assert_eq!((fl.x, fl.y), (96 - 24, 64 - 16));
        assert!(fl.erase_flag);

        let main = gfx.screen(VirtScreenNumber::Main);
        let at = |x: i32, y: i32| main.pixels()[main.pixel_offset(x, y)];
        // Centre is lit, the very corner stays dark
        assert_eq!(at(fl.x + 24, fl.y + 16), 7);
        assert_eq!(at(fl.x, fl.y), 0);
        assert_eq!(at(fl.x + fl.w - 1, fl.y + fl.h - 1), 0);
        // Just outside is untouched
        assert_eq!(at(fl.x - 1, fl.y + 16), 0);

        assert!(gfx.usage().test((fl.x / 8) as usize, USAGEBIT_DIRTY));
        assert_eq!(
            gfx.screen(VirtScreenNumber::Main).dirty.range((fl.x / 8) as usize),
            Some((0, 128))
        );
    }

    #[test]
    fn test_flashlight_erase_blacks_out_previous_window() {
        let mut gfx = engine(GameProfile::new(GameId::Maniac, 2, Platform::Dos));
        if let Some(back) = gfx.screen_mut(VirtScreenNumber::Main).back_buf_mut() {
            back.fill(3);
        }
        gfx.set_flashlight_size(4, 4);
        gfx.draw_flashlight((40, 60), (0, 0));
        let first = *gfx.flashlight();

        gfx.set_flashlight_size(0, 0);
        gfx.draw_flashlight((200, 60), (0, 0));
        assert!(!gfx.flashlight().erase_flag);
        let main = gfx.screen(VirtScreenNumber::Main);
        let off = main.pixel_offset(first.x + 16, first.y + 16);
        assert_eq!(main.pixels()[off], 0);
    }

    #[test]
    fn test_flashlight_clamps_to_screen() {
        let mut gfx = engine(GameProfile::new(GameId::Indy3, 3, Platform::Dos));
        gfx.set_flashlight_size(8, 8);
        gfx.draw_flashlight((0, 0), (4, 2));
        assert_eq!((gfx.flashlight().x, gfx.flashlight().y), (0, 0));
        gfx.draw_flashlight((0, 0), (1000, 1000));
        assert_eq!(gfx.flashlight().x, 320 - 64);
        assert_eq!(gfx.flashlight().y, 128 - 64);
    }

    #[test]
    fn test_clear_flashlight_drops_window() {
        let mut gfx = engine(GameProfile::new(GameId::Zak, 5, Platform::Dos));
        gfx.set_flashlight_size(2, 2);
        gfx.draw_flashlight((50, 50), (0, 0));
        gfx.clear_flashlight();
        assert!(!gfx.flashlight().erase_flag);
        assert_eq!(gfx.flashlight().buffer, None);
    }
}
