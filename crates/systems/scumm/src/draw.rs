//! Direct drawing on the virtual screens: background restores, boxes,
//! lines and single pixels.

use crate::dirty::USAGEBIT_RESTORED;
use crate::engine::{ScummGfx, LIGHTMODE_FLASHLIGHT_ON};
use crate::surface::{blit, fill};
use crate::text::CHARSET_MASK_TRANSPARENCY;
use crate::virt_screen::VirtScreenNumber;
use crate::GfxError;
use gfx_core::display::Display;
use gfx_core::timer::FrameTimer;
use gfx_core::types::Rect;

/// What `draw_box` does with its colour argument in HE games.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeBoxOp {
    BackToFront,
    FrontToBack,
    FillBoth(u32),
    Fill(u32),
}

fn he_box_op(he_version: u16, color: i32) -> HeBoxOp {
    let flags = color as u32;
    let (to_back, fore_to_back, back_to_fore, value_mask) = if he_version > 99 {
        (0x100_0000, 0x200_0000, 0x400_0000, 0xFF_FFFF)
    } else {
        (0x8000, 0x4000, 0x2000, 0x7FFF)
    };
    let flags = if he_version < 72 { flags & 0xFFFF } else { flags };

    if flags & back_to_fore != 0 {
        HeBoxOp::BackToFront
    } else if flags & fore_to_back != 0 {
        HeBoxOp::FrontToBack
    } else if flags & to_back != 0 {
        HeBoxOp::FillBoth(flags & value_mask)
    } else {
        HeBoxOp::Fill(flags)
    }
}

impl<D: Display, T: FrameTimer> ScummGfx<D, T> {
    /// Put the room background back under `rect` (display coordinates), or
    /// fill it with `back_color` where there is nothing to restore.
    pub fn restore_background(&mut self, rect: Rect, back_color: u8) {
        let mut rect = rect;
        rect.top = rect.top.max(0);
        if rect.is_empty() {
            return;
        }
        let Some(number) = self.find_virt_screen(rect.top) else {
            return;
        };

        let mut back_color = back_color;
        if self.profile.is_indy4_amiga() {
            back_color = if number == VirtScreenNumber::Verb {
                self.ctx.verb_palette.get(back_color)
            } else {
                self.ctx.room_palette.get(back_color)
            };
        }
        if self.profile.is_nes() {
            back_color = 0x1d;
        }

        let lights_on = self.is_light_on();
        let vs = &self.screens[number.index()];
        if rect.left > vs.w as i32 {
            return;
        }
        rect.translate(0, -vs.topline);
        rect.clip(vs.w as i32, vs.h as i32);
        self.mark_rect_as_dirty(number, rect.left, rect.right, rect.top, rect.bottom, Some(USAGEBIT_RESTORED));

        let (width, height) = (rect.width().max(0) as usize, rect.height().max(0) as usize);
        if height == 0 {
            return;
        }

        let vs = &mut self.screens[number.index()];
        let off = vs.pixel_offset(rect.left, rect.top);
        let (pitch, bpp) = (vs.pitch, vs.bpp());
        match vs.buffers_mut() {
            (front, Some(back)) if self.current_room != 0 && lights_on => {
                blit(front, off, pitch, back, off, pitch, width, height, bpp);
                if number == VirtScreenNumber::Main && self.charset_has_mask {
                    let top = rect.top - self.screen_top;
                    let mask = Rect::new(rect.left, top, rect.left + width as i32, top + height as i32);
                    self.text.fill_rect(mask, CHARSET_MASK_TRANSPARENCY);
                }
            }
            (front, _) => {
                let color = if self.profile.features.high_color {
                    self.ctx.high_color.get(back_color as usize)
                } else {
                    back_color as u16
                };
                fill(front, off, pitch, color, width, height, bpp);
            }
        }
    }

    /// Remove the charset text from the screen it was printed on.
    pub fn restore_charset_bg(&mut self) {
        if !self.charset_has_mask {
            return;
        }
        self.charset_has_mask = false;

        let number = self.text_screen;
        let (w, h) = {
            let vs = &self.screens[number.index()];
            (vs.w as i32, vs.h as i32)
        };
        if h == 0 {
            return;
        }
        self.mark_rect_as_dirty(number, 0, w, 0, h, Some(USAGEBIT_RESTORED));

        let lights_on = self.is_light_on();
        let keep_dark = self.profile.version < 4
            && self.message_banner_active
            && self.lights & LIGHTMODE_FLASHLIGHT_ON != 0;
        let black = self.profile.clear_color();
        let vs = &mut self.screens[number.index()];
        let two_bufs = vs.has_two_buffers();
        let (pitch, bpp, vw, vh) = (vs.pitch, vs.bpp(), vs.w, vs.h);

        match vs.buffers_mut() {
            (front, Some(back)) if self.current_room != 0 && lights_on => {
                if number != VirtScreenNumber::Main {
                    blit(front, 0, pitch, back, 0, pitch, vw, vh, bpp);
                }
            }
            (front, _) => {
                if !keep_dark {
                    let len = (vh * pitch).min(front.len());
                    front[..len].fill(black);
                }
            }
        }

        if two_bufs {
            self.clear_text_surface();
        }
    }

    /// Zero the charset plane of the mask store.
    pub fn clear_charset_mask(&mut self) {
        self.mask.clear_charset_mask();
    }

    pub fn clear_text_surface(&mut self) {
        self.text.clear();
    }

    /// Restore rows `top..bottom` of a main-screen strip from the back
    /// buffer, or clear them in the dark.
    pub fn reset_background(&mut self, top: i32, bottom: i32, strip: usize) {
        let lights_on = self.is_light_on();
        let clear = self.profile.clear_color();
        let vs = &mut self.screens[VirtScreenNumber::Main.index()];
        self.gdi.reset_background(vs, top, bottom, strip, lights_on, clear);
    }

    /// Fill the box between (x, y) and (x2, y2) inclusive, display
    /// coordinates. Colour -1 restores the room background; HE games pass
    /// copy and fill flags in the colour.
    pub fn draw_box(&mut self, x: i32, y: i32, x2: i32, y2: i32, color: i32) -> Result<(), GfxError> {
        let Some(number) = self.find_virt_screen(y) else {
            return Ok(());
        };

        if self.profile.version == 8 {
            let width = self.profile.screen_width as i32 + 8;
            let (eff_x, eff_x2) = if width >= x2 { (x, x2) } else { (x.max(0), width) };
            let top = y + self.screen_top;
            let vs = &mut self.screens[number.index()];
            let off = vs.pixel_offset(eff_x, top);
            let (pitch, bpp) = (vs.pitch, vs.bpp());
            fill(vs.pixels_mut(), off, pitch, color as u16, eff_x2.max(0) as usize, y2.max(0) as usize, bpp);
            self.mark_rect_as_dirty(number, eff_x, eff_x + eff_x2, top, y + y2 + self.screen_top, None);
            return Ok(());
        }

        let mut color = color;
        if self.profile.is_indy4_amiga() {
            let index = color as u8;
            color = i32::from(if number == VirtScreenNumber::Verb {
                self.ctx.verb_palette.get(index)
            } else {
                self.ctx.room_palette.get(index)
            });
        }

        let (mut x, mut x2) = if x > x2 { (x2, x) } else { (x, x2) };
        let (mut y, mut y2) = if y > y2 { (y2, y) } else { (y, y2) };
        x2 += 1;
        y2 += 1;

        let (topline, vw, vh) = {
            let vs = &self.screens[number.index()];
            (vs.topline, vs.w as i32, vs.h as i32)
        };
        y -= topline;
        y2 -= topline;

        if x < 0 {
            x = 0;
        } else if x >= vw {
            return Ok(());
        }
        if x2 < 0 {
            return Ok(());
        } else if x2 > vw {
            x2 = vw;
        }
        if y < 0 {
            y = 0;
        } else if y > vh {
            return Ok(());
        }
        if y2 < 0 {
            return Ok(());
        } else if y2 > vh {
            y2 = vh;
        }

        let (width, height) = (x2 - x, y2 - y);
        if width <= 0 || height <= 0 {
            return Ok(());
        }
        self.mark_rect_as_dirty(number, x, x2, y, y2, None);

        let he_version = self.profile.he_version;
        let high_color = self.profile.features.high_color;
        let vs = &mut self.screens[number.index()];
        let off = vs.pixel_offset(x, y);
        let (pitch, bpp) = (vs.pitch, vs.bpp());
        let (w, h) = (width as usize, height as usize);
        let (front, back) = vs.buffers_mut();

        if color == -1 {
            if number != VirtScreenNumber::Main {
                return Err(GfxError::Unsupported(
                    "background copy outside the main screen".to_string(),
                ));
            }
            if let Some(back) = back {
                blit(front, off, pitch, back, off, pitch, w, h, bpp);
            }
            if self.charset_has_mask {
                let top = y - self.screen_top;
                self.text
                    .fill_rect(Rect::new(x, top, x + width, top + height), CHARSET_MASK_TRANSPARENCY);
            }
        } else if he_version >= 60 {
            match (he_box_op(he_version, color), back) {
                (HeBoxOp::BackToFront, Some(back)) => blit(front, off, pitch, back, off, pitch, w, h, bpp),
                (HeBoxOp::FrontToBack, Some(back)) => blit(back, off, pitch, front, off, pitch, w, h, bpp),
                (HeBoxOp::FillBoth(value), back) => {
                    fill(front, off, pitch, value as u16, w, h, bpp);
                    if let Some(back) = back {
                        fill(back, off, pitch, value as u16, w, h, bpp);
                    }
                }
                (HeBoxOp::Fill(value), _) => fill(front, off, pitch, value as u16, w, h, bpp),
                // Copies need both buffers
                (_, None) => {}
            }
        } else if high_color {
            let value = self.ctx.high_color.get((color as usize) & 0xFF);
            fill(front, off, pitch, value, w, h, bpp);
        } else {
            fill(front, off, pitch, color as u16, w, h, bpp);
        }
        Ok(())
    }

    /// Draw a line between two display points. Colour -1 draws a dotted
    /// line alternating between the palette's white and black.
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: i32) -> Result<(), GfxError> {
        use crate::game::Platform;

        let profile = &self.profile;
        if (profile.platform == Platform::FmTowns && profile.version == 5)
            || (profile.platform == Platform::Macintosh && profile.version > 3)
        {
            let top = self.screen_top;
            return self.draw_box(x1, top + y1, x2, top + y2, color);
        }

        let Some(number) = self.find_virt_screen(y1) else {
            return Ok(());
        };
        let black = self.palette.closest(0x00, 0x00, 0x00);
        let white = self.palette.closest(0xFC, 0xFC, 0xFC);

        let dotted = color == -1;
        let mut eff_color = if dotted { white } else { color as u8 };
        let (mut x, mut y) = (x1, y1);
        let width = (x2 - x1).abs();
        let original_height = (y2 - y1).abs();
        let height = original_height.max(width);
        let step_x = if x2 - x1 < 0 { -1 } else { 1 };
        let step_y = if y2 - y1 < 0 { -1 } else { 1 };
        let (mut acc_w, mut acc_h) = (0, 0);

        self.draw_pixel(number, x, y, eff_color);
        for _ in 0..=height {
            let mut moved = false;
            acc_w += width;
            acc_h += original_height;
            if acc_w > height {
                moved = true;
                acc_w -= height;
                x += step_x;
            }
            if acc_h > height {
                moved = true;
                acc_h -= height;
                y += step_y;
            }
            if moved {
                self.draw_pixel(number, x, y, eff_color);
                if dotted {
                    eff_color = if eff_color != white { white } else { black };
                }
            }
        }
        Ok(())
    }

    /// Set one pixel of screen `number`; `y` is a display row.
    pub fn draw_pixel(&mut self, number: VirtScreenNumber, x: i32, y: i32, color: u8) {
        let (sw, sh) = (self.profile.screen_width as i32, self.profile.screen_height as i32);
        if x < 0 || y < 0 || x >= sw + 8 || y >= sh {
            return;
        }
        let vs = &mut self.screens[number.index()];
        let row = y + self.screen_top - vs.topline;
        let off = vs.pixel_offset(x, row);
        if let Some(px) = vs.pixels_mut().get_mut(off) {
            *px = color;
        }
        self.mark_rect_as_dirty(number, x, x + 1, row, row + 1, None);
    }

    /// Shift the top `height` display rows by (dx, dy).
    pub fn move_screen(&mut self, dx: i32, dy: i32, height: i32) {
        if (dx == 0 && dy == 0) || height <= 0 {
            return;
        }
        self.display.move_screen(dx, dy, height as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GfxConfig;
    use crate::dirty::USAGEBIT_RESTORED;
    use crate::game::{GameId, GameProfile, Platform};
    use gfx_core::display::FrameDisplay;
    use gfx_core::palette::RgbPalette;
    use gfx_core::timer::ManualTimer;
    use gfx_core::types::PixelFormat;

    fn engine(profile: GameProfile) -> ScummGfx<FrameDisplay, ManualTimer> {
        let display = FrameDisplay::new(320, 200, PixelFormat::Clut8);
        let mut gfx = ScummGfx::new(profile, GfxConfig::default(), display, ManualTimer::new());
        gfx.init_screens(16, 144);
        for n in VirtScreenNumber::ALL {
            gfx.screen_mut(n).dirty.clean();
        }
        gfx.current_room = 1;
        gfx
    }

    fn v5() -> GameProfile {
        GameProfile::new(GameId::Monkey2, 5, Platform::Dos)
    }

    fn main_at(gfx: &ScummGfx<FrameDisplay, ManualTimer>, x: i32, y: i32) -> u8 {
        let vs = gfx.screen(VirtScreenNumber::Main);
        vs.pixels()[vs.pixel_offset(x, y)]
    }

    #[test]
    fn test_restore_background_copies_back_buffer() {
        let mut gfx = engine(v5());
        let main = gfx.screen_mut(VirtScreenNumber::Main);
        let pitch = main.pitch;
        if let Some(back) = main.back_buf_mut() {
            for (i, b) in back.iter_mut().enumerate() {
                *b = (i % pitch) as u8;
            }
        }
        gfx.charset_has_mask = true;
        gfx.text_surface_mut().put(20, 10, 3);

        gfx.restore_background(Rect::new(16, 26, 40, 50), 0);
        for y in 10..34 {
            for x in 16..40 {
                assert_eq!(main_at(&gfx, x, y), x as u8);
            }
        }
        assert_eq!(main_at(&gfx, 15, 10), 0);
        assert_eq!(gfx.text_surface().get(20, 10), CHARSET_MASK_TRANSPARENCY);
        assert!(gfx.usage().test(2, USAGEBIT_RESTORED));
        assert_eq!(gfx.screen(VirtScreenNumber::Main).dirty.range(2), Some((10, 34)));
    }

    #[test]
    fn test_restore_background_fills_in_the_dark() {
        let mut gfx = engine(v5());
        gfx.lights = 0;
        gfx.restore_background(Rect::new(0, 20, 8, 24), 9);
        assert_eq!(main_at(&gfx, 0, 4), 9);
        assert_eq!(main_at(&gfx, 0, 8), 0);
    }

    #[test]
    fn test_restore_background_ignores_empty_rect() {
        let mut gfx = engine(v5());
        gfx.restore_background(Rect::new(10, 30, 10, 40), 9);
        gfx.restore_background(Rect::new(400, 30, 410, 40), 9);
        assert!(gfx.screen(VirtScreenNumber::Main).dirty.is_clean());
    }

    #[test]
    fn test_restore_charset_bg_clears_text_screen() {
        let mut gfx = engine(v5());
        gfx.screen_mut(VirtScreenNumber::Text).pixels_mut().fill(4);
        gfx.charset_has_mask = true;
        gfx.restore_charset_bg();
        assert!(!gfx.charset_has_mask);
        assert!(gfx.screen(VirtScreenNumber::Text).pixels().iter().all(|&p| p == 0));
        assert!(gfx.screen(VirtScreenNumber::Text).dirty.is_strip_dirty(0));

        // Nothing to do the second time
        gfx.screen_mut(VirtScreenNumber::Text).dirty.clean();
        gfx.restore_charset_bg();
        assert!(gfx.screen(VirtScreenNumber::Text).dirty.is_clean());
    }

    #[test]
    fn test_restore_charset_bg_on_main_clears_text_surface() {
        let mut gfx = engine(v5());
        gfx.text_screen = VirtScreenNumber::Main;
        gfx.charset_has_mask = true;
        gfx.text_surface_mut().put(5, 20, 1);
        gfx.restore_charset_bg();
        assert_eq!(gfx.text_surface().get(5, 20), CHARSET_MASK_TRANSPARENCY);
    }

    #[test]
    fn test_draw_box_fills_and_clips() {
        let mut gfx = engine(v5());
        gfx.draw_box(300, 100, 340, 170, 6).unwrap();
        // Display rows 100..=170 are main rows 84..=154, clipped to 128
        assert_eq!(main_at(&gfx, 300, 84), 6);
        assert_eq!(main_at(&gfx, 319, 127), 6);
        assert_eq!(main_at(&gfx, 299, 84), 0);
        assert_eq!(main_at(&gfx, 300, 83), 0);
        assert_eq!(gfx.screen(VirtScreenNumber::Main).dirty.range(39), Some((84, 128)));
    }

    #[test]
    fn test_draw_box_restore_needs_main_screen() {
        let mut gfx = engine(v5());
        if let Some(back) = gfx.screen_mut(VirtScreenNumber::Main).back_buf_mut() {
            back.fill(2);
        }
        gfx.draw_box(0, 20, 7, 27, -1).unwrap();
        assert_eq!(main_at(&gfx, 3, 6), 2);
        assert!(matches!(gfx.draw_box(0, 160, 7, 170, -1), Err(GfxError::Unsupported(_))));
    }

    #[test]
    fn test_he_box_flags() {
        assert_eq!(he_box_op(72, 0x2000), HeBoxOp::BackToFront);
        assert_eq!(he_box_op(72, 0x4005), HeBoxOp::FrontToBack);
        assert_eq!(he_box_op(72, 0x8012), HeBoxOp::FillBoth(0x12));
        assert_eq!(he_box_op(72, 0x12), HeBoxOp::Fill(0x12));
        assert_eq!(he_box_op(100, 0x100_0034), HeBoxOp::FillBoth(0x34));
        assert_eq!(he_box_op(60, 0x1_2000), HeBoxOp::BackToFront);
    }

    #[test]
    fn test_he_box_copies_front_to_back() {
        let profile = GameProfile::new(GameId::Other, 6, Platform::Windows).with_he_version(80);
        let mut gfx = engine(profile);
        gfx.screen_mut(VirtScreenNumber::Main).pixels_mut().fill(8);
        gfx.draw_box(0, 16, 15, 31, 0x4000).unwrap();
        let back = gfx.screen(VirtScreenNumber::Main).back_buf().unwrap();
        assert_eq!(back[0], 8);
        assert_eq!(back[16], 0);
    }

    #[test]
    fn test_draw_line_diagonal() {
        let mut gfx = engine(v5());
        gfx.draw_line(10, 20, 14, 24, 7).unwrap();
        for i in 0..5 {
            assert_eq!(main_at(&gfx, 10 + i, 4 + i), 7);
        }
        assert_eq!(main_at(&gfx, 11, 4), 0);
    }

    #[test]
    fn test_dotted_line_alternates() {
        let mut gfx = engine(v5());
        let mut palette = RgbPalette::default();
        palette.set(15, [0xFC, 0xFC, 0xFC]);
        gfx.set_palette(palette);
        gfx.draw_line(0, 20, 4, 20, -1).unwrap();
        let row: Vec<u8> = (0..5).map(|x| main_at(&gfx, x, 4)).collect();
        assert_eq!(row, vec![15, 15, 0, 15, 0]);
    }

    #[test]
    fn test_draw_pixel_bounds() {
        let mut gfx = engine(v5());
        gfx.draw_pixel(VirtScreenNumber::Main, 5, 30, 9);
        assert_eq!(main_at(&gfx, 5, 14), 9);
        gfx.draw_pixel(VirtScreenNumber::Main, -1, 30, 9);
        gfx.draw_pixel(VirtScreenNumber::Main, 5, 200, 9);
        assert_eq!(gfx.screen(VirtScreenNumber::Main).dirty.range(0), Some((14, 15)));
    }

    #[test]
    fn test_move_screen_skips_no_op() {
        let mut gfx = engine(v5());
        gfx.display_mut().fill_screen(3);
        gfx.move_screen(0, 0, 200);
        gfx.move_screen(8, 0, 0);
        assert_eq!(gfx.display().pixel(0, 0), Some(3));
        gfx.move_screen(8, 0, 200);
        assert_eq!(gfx.display().pixel(0, 0), Some(0));
        assert_eq!(gfx.display().pixel(8, 0), Some(3));
    }
}
