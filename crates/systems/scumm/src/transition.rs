//! Full-screen transitions: iris and box wipes, dissolves and scrolls.
//!
//! Every effect runs to completion inside one call and paces itself through
//! the engine's [`FrameTimer`]. When the timer reports a quit request the
//! effect stops at the next step boundary and all pending dirty strips are
//! flushed, so no screen is left half dirty.

use crate::dither::{dither_vga_to_ega, BlitArea};
use crate::engine::ScummGfx;
use crate::game::{GameId, Platform};
use crate::virt_screen::VirtScreenNumber;
use crate::GfxError;
use gfx_core::display::Display;
use gfx_core::logging::{log, LogCategory, LogLevel};
use gfx_core::timer::FrameTimer;
use rand::Rng;

pub const NO_DELAY: u32 = 0;
/// Quarter frames between steps on most platforms.
pub const PICTURE_DELAY: u32 = 4;
pub const C64_DELAY: u32 = 6;

/// One wipe pattern: four rectangles, each described by its left, top,
/// right and bottom strip, moved by `deltas` after every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEffect {
    pub num_iterations: u8,
    pub deltas: [i8; 16],
    /// Starting strips. 24 stands for the last strip row of the screen.
    pub strips: [u8; 16],
}

#[rustfmt::skip]
pub const TRANSITION_EFFECTS: [TransitionEffect; 6] = [
    // Iris
    TransitionEffect {
        num_iterations: 13,
        deltas: [1, 1, -1, 1, -1, 1, -1, -1, 1, -1, -1, -1, 1, 1, 1, -1],
        strips: [0, 0, 39, 0, 39, 0, 39, 24, 0, 24, 39, 24, 0, 0, 0, 24],
    },
    // Box wipe from the upper left
    TransitionEffect {
        num_iterations: 25,
        deltas: [0, 1, 2, 1, 2, 0, 2, 1, 2, 0, 2, 1, 0, 0, 0, 0],
        strips: [0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 0, 255, 0, 0, 0],
    },
    // Box wipe from the lower right
    TransitionEffect {
        num_iterations: 25,
        deltas: [-2, -1, 0, -1, -2, -1, -2, 0, -2, -1, -2, 0, 0, 0, 0, 0],
        strips: [39, 24, 39, 24, 39, 24, 39, 24, 38, 24, 38, 24, 255, 0, 0, 0],
    },
    // Inverse box wipe
    TransitionEffect {
        num_iterations: 25,
        deltas: [0, -1, -2, -1, -2, 0, -2, -1, -2, 0, -2, -1, 0, 0, 0, 0],
        strips: [0, 24, 39, 24, 39, 0, 39, 24, 38, 0, 38, 24, 255, 0, 0, 0],
    },
    // Inverse iris, v1 and v2
    TransitionEffect {
        num_iterations: 9,
        deltas: [-1, -1, 1, -1, -1, 1, 1, 1, -1, -1, -1, 1, 1, -1, 1, 1],
        strips: [7, 7, 32, 7, 7, 8, 32, 8, 7, 8, 7, 8, 32, 7, 32, 8],
    },
    // Horizontal wipe, Maniac Mansion NES
    TransitionEffect {
        num_iterations: 16,
        deltas: [2, 0, 2, 0, 2, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        strips: [0, 0, 0, 15, 1, 0, 1, 15, 255, 0, 0, 0, 255, 0, 0, 0],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub fn from_index(dir: i32) -> Option<Self> {
        match dir {
            0 => Some(Self::Up),
            1 => Some(Self::Down),
            2 => Some(Self::Left),
            3 => Some(Self::Right),
            _ => None,
        }
    }
}

/// Shuffled block offsets for a dissolve over a `w` x `h` screen.
///
/// 1x1 blocks are numbered row-major; larger blocks are byte offsets
/// `y * pitch + x` of their top-left corner. Each block appears exactly
/// once.
pub fn dissolve_offsets<R: Rng>(rng: &mut R, w: usize, h: usize, pitch: usize, bw: usize, bh: usize) -> Vec<usize> {
    let (bw, bh) = (bw.max(1), bh.max(1));
    let n = w.div_ceil(bw) * h.div_ceil(bh);

    if bw == 1 && bh == 1 {
        let mut offsets: Vec<usize> = (0..n).collect();
        for i in 1..n {
            let j = rng.gen_range(0..i);
            offsets[i] = offsets[j];
            offsets[j] = i;
        }
        return offsets;
    }

    let mut offsets = Vec::with_capacity(n);
    for x in (0..w).step_by(bw) {
        for y in (0..h).step_by(bh) {
            offsets.push(y * pitch + x);
        }
    }
    let original = offsets.clone();
    for i in 1..offsets.len() {
        let j = rng.gen_range(0..i);
        offsets[i] = offsets[j];
        offsets[j] = original[i];
    }
    offsets
}

impl<D: Display, T: FrameTimer> ScummGfx<D, T> {
    /// Whether the last fade left the room visible.
    pub fn screen_effect_flag(&self) -> bool {
        self.screen_effect_flag
    }

    /// Reveal the freshly drawn main screen with `effect`.
    pub fn fade_in(&mut self, effect: i32) -> Result<(), GfxError> {
        if self.profile.id == GameId::Maniac && self.profile.is_amiga() {
            self.screen_effect_flag = true;
            return Ok(());
        }
        log(LogCategory::Transition, LogLevel::Debug, || format!("fade_in {}", effect));

        match effect {
            0 | 129 => {}
            1..=6 => {
                self.screen_mut(VirtScreenNumber::Main).set_dirty_range(0, 0);
                self.transition_effect((effect - 1) as usize)?;
            }
            128 => self.dissolve_effect_selector()?,
            130..=133 => self.scroll_effect(133 - effect)?,
            134 => self.dissolve_effect(1, 1)?,
            135 => {
                let h = self.screen(VirtScreenNumber::Main).h;
                self.dissolve_effect(1, h)?;
            }
            _ => return Err(GfxError::UnknownEffect { effect }),
        }
        self.screen_effect_flag = true;
        Ok(())
    }

    /// Blank the main screen with `effect`.
    pub fn fade_out(&mut self, effect: i32) -> Result<(), GfxError> {
        if self.profile.id == GameId::Maniac && self.profile.is_amiga() {
            self.screen_effect_flag = false;
            return Ok(());
        }
        log(LogCategory::Transition, LogLevel::Debug, || format!("fade_out {}", effect));

        self.screen_mut(VirtScreenNumber::Main).set_dirty_range(0, 0);
        if self.profile.version < 7 {
            self.camera.last_x = self.camera.cur_x;
        }
        if self.profile.version == 0 {
            self.update_dirty_screen(VirtScreenNumber::Text)?;
        }

        if (self.profile.version == 7 || self.screen_effect_flag) && effect != 0 {
            let black = self.profile.clear_color();
            let main = self.screen_mut(VirtScreenNumber::Main);
            let len = (main.pitch * main.h).min(main.pixels().len());
            main.pixels_mut()[..len].fill(black);

            match effect {
                1..=6 => self.transition_effect((effect - 1) as usize)?,
                128 => self.dissolve_effect_selector()?,
                129 => {
                    let main = self.screen_mut(VirtScreenNumber::Main);
                    let h = main.h as i32;
                    main.set_dirty_range(0, h);
                    self.update_dirty_screen(VirtScreenNumber::Main)?;
                }
                134 => self.dissolve_effect(1, 1)?,
                135 => {
                    let h = self.screen(VirtScreenNumber::Main).h;
                    self.dissolve_effect(1, h)?;
                }
                _ => return Err(GfxError::UnknownEffect { effect }),
            }
        }

        self.screen_effect_flag = false;
        Ok(())
    }

    /// Quarter frames to wait between transition steps.
    pub fn transition_delay(&self) -> u32 {
        let profile = &self.profile;
        let delay = self.config.fade_delay.unwrap_or(if profile.platform == Platform::C64 {
            C64_DELAY
        } else if profile.version >= 2 {
            PICTURE_DELAY
        } else {
            NO_DELAY
        });

        if profile.is_amiga() {
            if profile.id == GameId::Zak {
                PICTURE_DELAY
            } else {
                delay.div_ceil(4) * 10
            }
        } else {
            delay
        }
    }

    /// Wait between steps. Returns `false` after flushing every screen when
    /// the host asked to quit.
    fn effect_pause(&mut self, quarters: u32) -> Result<bool, GfxError> {
        if self.timer.wait_quarter_frames(quarters) {
            return Ok(true);
        }
        log(LogCategory::Transition, LogLevel::Info, || "effect aborted by quit".to_string());
        for number in VirtScreenNumber::ALL {
            self.update_dirty_screen(number)?;
        }
        Ok(false)
    }

    /// Run wipe pattern `index` of [`TRANSITION_EFFECTS`].
    pub fn transition_effect(&mut self, index: usize) -> Result<(), GfxError> {
        let effect = *TRANSITION_EFFECTS
            .get(index)
            .ok_or(GfxError::UnknownEffect { effect: index as i32 + 1 })?;
        let height = (self.screen(VirtScreenNumber::Main).h as i32).min(self.profile.screen_height as i32);
        let delay = self.transition_delay();
        let num_strips = self.gdi.num_strips as i32;
        let screen_top = self.screen_top;

        let iterations = if self.profile.version >= 3 || self.profile.is_nes() {
            effect.num_iterations as i32
        } else if index == 0 || index == 4 {
            (height + 15) / 16
        } else {
            height / 8
        };

        let mut tab = [0i32; 16];
        for (slot, &strip) in tab.iter_mut().zip(effect.strips.iter()) {
            *slot = if strip == 24 { height / 8 - 1 } else { strip as i32 };
        }
        let bottom = height / 8;

        for _ in 0..iterations {
            for quad in tab.chunks_exact(4) {
                let (l, t, r, b) = (quad[0], quad[1], quad[2], quad[3]);
                let dirty = &mut self.screens[VirtScreenNumber::Main.index()].dirty;
                if t == b {
                    for strip in l..=r {
                        if strip >= 0 && strip < num_strips && t < bottom {
                            dirty.set_strip(strip as usize, screen_top + t * 8, screen_top + ((b + 1) * 8).min(height));
                        }
                    }
                } else {
                    if l < 0 || l >= num_strips || b <= t {
                        continue;
                    }
                    let b = b.min(bottom);
                    let t = t.max(0);
                    dirty.set_strip(l as usize, screen_top + t * 8, screen_top + ((b + 1) * 8).min(height));
                }
                self.update_dirty_screen(VirtScreenNumber::Main)?;
            }

            for (slot, &delta) in tab.iter_mut().zip(effect.deltas.iter()) {
                *slot += delta as i32;
            }

            if !self.config.fast_mode && !self.effect_pause(delay)? {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Reveal the main screen in `width` x `height` blocks in random order.
    pub fn dissolve_effect(&mut self, width: usize, height: usize) -> Result<(), GfxError> {
        if self.profile.platform == Platform::Macintosh {
            return Ok(());
        }
        let (width, height) = (width.max(1), height.max(1));
        let (w, h, pitch) = {
            let vs = self.screen(VirtScreenNumber::Main);
            (vs.w, vs.h, vs.pitch)
        };
        let one_by_one = width == 1 && height == 1;
        let offsets = dissolve_offsets(&mut self.rng, w, h, pitch, width, height);

        let block_rows = h.div_ceil(height);
        let freeze = block_rows / 8;
        let blits_before_refresh = offsets.len() / if freeze == 0 { 18 } else { freeze };
        let halt = if self.profile.is_amiga() { 4 } else { 1 };
        let mut blits = 0;

        for &offset in &offsets {
            let (x, y) = ((offset % pitch.max(1)) as i32, (offset / pitch.max(1)) as i32);

            if width % 4 == 0 {
                self.draw_strip_to_screen(VirtScreenNumber::Main, x, width as i32, y, y + height as i32)?;
            } else {
                self.blit_dissolve_block(x, y, width, height);
            }

            let mut can_halt = false;
            if one_by_one {
                blits += 1;
                if blits >= blits_before_refresh {
                    blits = 0;
                    can_halt = true;
                }
            } else {
                can_halt = offset < h;
            }
            if can_halt && !self.effect_pause(halt)? {
                return Ok(());
            }
        }
        Ok(())
    }

    fn blit_dissolve_block(&mut self, x: i32, y: i32, width: usize, height: usize) {
        let vs = &self.screens[VirtScreenNumber::Main.index()];
        let start = vs.pixel_offset(x, y);
        let src = vs.pixels().get(start..).unwrap_or(&[]);
        let y = y + vs.topline;

        if self.config.ega_dithering {
            self.composite_buf.clear();
            for row in 0..height {
                let from = (row * vs.pitch).min(src.len());
                let to = (from + width).min(src.len());
                self.composite_buf.extend_from_slice(&src[from..to]);
                self.composite_buf.resize((row + 1) * width, 0);
            }
            let area = dither_vga_to_ega(
                &self.composite_buf,
                &mut self.scale_buf,
                &self.ega_maps,
                BlitArea {
                    pitch: width,
                    x,
                    y,
                    width,
                    height,
                },
            );
            self.display
                .copy_rect_to_screen(&self.scale_buf, area.pitch, area.x, area.y, area.width, area.height);
        } else {
            self.display.copy_rect_to_screen(src, vs.pitch, x, y, width, height);
        }
    }

    /// Scroll the new room in 8 pixels at a time. `dir` is 0 up, 1 down,
    /// 2 left, 3 right; anything else does nothing.
    pub fn scroll_effect(&mut self, dir: i32) -> Result<(), GfxError> {
        let Some(dir) = ScrollDirection::from_index(dir) else {
            return Ok(());
        };
        let mut delay = self.config.fade_delay.unwrap_or(PICTURE_DELAY);
        if self.profile.is_amiga() {
            delay = delay.div_ceil(4) * 10;
        }

        const STEP: i32 = 8;
        let (w, h) = {
            let vs = self.screen(VirtScreenNumber::Main);
            (vs.w as i32, vs.h as i32)
        };
        let limit = match dir {
            ScrollDirection::Up | ScrollDirection::Down => h,
            ScrollDirection::Left | ScrollDirection::Right => w,
        };

        let mut pos = 1 + STEP;
        while pos < limit {
            let (dx, dy, sx, sy, tx, ty, bw, bh) = match dir {
                ScrollDirection::Up => (0, -STEP, 0, pos - STEP, 0, h - STEP, w, STEP),
                ScrollDirection::Down => (0, STEP, 0, h - pos, 0, 0, w, STEP),
                ScrollDirection::Left => (-STEP, 0, pos - STEP, 0, w - STEP, 0, STEP, h),
                ScrollDirection::Right => (STEP, 0, w - pos, 0, 0, 0, STEP, h),
            };
            self.move_screen(dx, dy, h);

            let vs = &self.screens[VirtScreenNumber::Main.index()];
            let src = vs.pixels().get(vs.pixel_offset(sx, sy)..).unwrap_or(&[]);
            self.display
                .copy_rect_to_screen(src, vs.pitch, tx, ty, bw.max(0) as usize, bh.max(0) as usize);

            if !self.effect_pause(delay)? {
                return Ok(());
            }
            pos += STEP;
        }
        Ok(())
    }

    /// The dissolve a game uses for effect 128.
    pub fn dissolve_effect_selector(&mut self) -> Result<(), GfxError> {
        let profile = &self.profile;
        if profile.id == GameId::Loom && profile.version == 4 {
            self.dissolve_effect(1, 1)
        } else if profile.id == GameId::Loom && profile.is_pce() {
            self.dissolve_effect(8, 8)
        } else if profile.platform == Platform::Macintosh {
            if profile.version == 3 {
                self.transition_effect(0)
            } else {
                Ok(())
            }
        } else {
            self.dissolve_effect(8, 4)
        }
    }
}
