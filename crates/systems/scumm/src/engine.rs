//! The graphics engine.
//!
//! [`ScummGfx`] owns the four virtual screens, the shared mask store, the
//! text overlay and the active compositor variant. Each frame the room
//! background is redrawn where needed, the dirty strips of every screen are
//! composited with the text overlay, filtered for the DOS render modes and
//! handed to the host [`Display`].
//!
//! ```text
//! load_room -> redraw_bg_areas -> Gdi::draw_bitmap -> VirtScreen
//!                                                         |
//!           draw_dirty_screen_parts -> draw_strip_to_screen -> Display
//! ```

use crate::config::{GfxConfig, RenderMode};
use crate::context::RenderContext;
use crate::dirty::{UsageBits, USAGEBIT_DIRTY};
use crate::dither::{dither_vga_to_ega, post_process_dos_graphics, BlitArea, DosFilter, FilterOutput};
use crate::effects::{Flashlight, ShakeState};
use crate::game::{GameId, GameProfile, Platform};
use crate::gdi::{BitmapRequest, DrawEnv, Gdi};
use crate::mask::MaskBuffer;
use crate::resource::count_zbuffers;
use crate::text::TextSurface;
use crate::virt_screen::{ScreenLayout, VirtScreen, VirtScreenNumber};
use crate::GfxError;
use gfx_core::display::Display;
use gfx_core::logging::{log, LogCategory, LogLevel};
use gfx_core::palette::RgbPalette;
use gfx_core::timer::FrameTimer;
use gfx_core::types::PixelFormat;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Actors are drawn with the base palette.
pub const LIGHTMODE_ACTOR_USE_BASE_PALETTE: u8 = 1 << 0;
/// The room background is visible.
pub const LIGHTMODE_ROOM_LIGHTS_ON: u8 = 1 << 1;
/// Only the flashlight window is visible.
pub const LIGHTMODE_FLASHLIGHT_ON: u8 = 1 << 2;
pub const LIGHTMODE_ACTOR_USE_COLORS: u8 = 1 << 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Camera {
    pub cur_x: i32,
    pub cur_y: i32,
    pub last_x: i32,
    pub last_y: i32,
}

impl Camera {
    /// Whether the view moved since the last frame. Only v7+ cameras move
    /// vertically.
    pub fn moved(&self, version: u8) -> bool {
        self.cur_x != self.last_x || (version >= 7 && self.cur_y != self.last_y)
    }
}

/// A loaded room resource.
#[derive(Debug, Clone)]
pub struct Room {
    pub number: u16,
    /// Resource the room was loaded from
    pub resource: u16,
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
    /// Start of the background image inside `data`
    pub image_offset: usize,
}

impl Room {
    pub fn new(number: u16, width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            number,
            resource: number,
            width,
            height,
            data,
            image_offset: 0,
        }
    }

    pub fn with_image_offset(mut self, offset: usize) -> Self {
        self.image_offset = offset;
        self
    }

    pub fn with_resource(mut self, resource: u16) -> Self {
        self.resource = resource;
        self
    }

    pub fn image(&self) -> Result<&[u8], GfxError> {
        self.data
            .get(self.image_offset..)
            .ok_or(GfxError::Truncated { what: "room image" })
    }
}

pub struct ScummGfx<D: Display, T: FrameTimer> {
    pub(crate) profile: GameProfile,
    pub(crate) config: GfxConfig,
    pub(crate) screens: [VirtScreen; 4],
    pub(crate) gdi: Gdi,
    pub(crate) mask: MaskBuffer,
    pub(crate) ctx: RenderContext,
    pub(crate) text: TextSurface,
    pub(crate) usage: UsageBits,
    pub(crate) display: D,
    pub(crate) timer: T,
    pub(crate) rng: StdRng,
    pub(crate) composite_buf: Vec<u8>,
    pub(crate) scale_buf: Vec<u8>,
    pub(crate) ega_maps: Box<[[u8; 256]; 2]>,
    pub(crate) palette: RgbPalette,
    pub(crate) room: Option<Room>,
    pub(crate) screen_start_strip: i32,
    pub(crate) screen_top: i32,
    screen_b: i32,
    screen_h: i32,
    pub(crate) shake: ShakeState,
    pub(crate) flashlight: Flashlight,
    pub(crate) screen_effect_flag: bool,
    pub camera: Camera,
    /// `LIGHTMODE_*` bits
    pub lights: u8,
    pub current_room: u16,
    /// Charset text is on screen and must be restored
    pub charset_has_mask: bool,
    /// Screen the charset draws into
    pub text_screen: VirtScreenNumber,
    pub force_banner: bool,
    pub message_banner_active: bool,
    pub full_redraw: bool,
    pub bg_needs_redraw: bool,
}

impl<D: Display, T: FrameTimer> ScummGfx<D, T> {
    /// Set up the engine for `profile`. The screens stay empty until
    /// [`ScummGfx::init_screens`] lays them out.
    pub fn new(profile: GameProfile, config: GfxConfig, display: D, timer: T) -> Self {
        let mut ega_maps = Box::new([[0u8; 256]; 2]);
        for map in ega_maps.iter_mut() {
            for (i, c) in map.iter_mut().enumerate() {
                *c = (i & 0x0F) as u8;
            }
        }
        Self {
            screens: VirtScreenNumber::ALL.map(VirtScreen::empty),
            gdi: Gdi::for_game(&profile),
            mask: MaskBuffer::new(),
            ctx: RenderContext::for_game(&profile),
            text: TextSurface::new(profile.screen_width, profile.screen_height),
            usage: UsageBits::default(),
            display,
            timer,
            rng: StdRng::from_entropy(),
            composite_buf: Vec::new(),
            scale_buf: Vec::new(),
            ega_maps,
            palette: RgbPalette::default(),
            room: None,
            screen_start_strip: 0,
            screen_top: 0,
            screen_b: 0,
            screen_h: 0,
            shake: ShakeState::default(),
            flashlight: Flashlight::default(),
            screen_effect_flag: false,
            camera: Camera::default(),
            lights: LIGHTMODE_ROOM_LIGHTS_ON | LIGHTMODE_ACTOR_USE_COLORS,
            current_room: 0,
            charset_has_mask: false,
            text_screen: VirtScreenNumber::Text,
            force_banner: false,
            message_banner_active: false,
            full_redraw: false,
            bg_needs_redraw: false,
            config,
            profile,
        }
    }

    pub fn profile(&self) -> &GameProfile {
        &self.profile
    }

    pub fn config(&self) -> &GfxConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GfxConfig {
        &mut self.config
    }

    pub fn screen(&self, number: VirtScreenNumber) -> &VirtScreen {
        &self.screens[number.index()]
    }

    pub fn screen_mut(&mut self, number: VirtScreenNumber) -> &mut VirtScreen {
        &mut self.screens[number.index()]
    }

    pub fn gdi(&self) -> &Gdi {
        &self.gdi
    }

    pub fn gdi_mut(&mut self) -> &mut Gdi {
        &mut self.gdi
    }

    pub fn mask(&self) -> &MaskBuffer {
        &self.mask
    }

    pub fn render_context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn render_context_mut(&mut self) -> &mut RenderContext {
        &mut self.ctx
    }

    pub fn text_surface(&self) -> &TextSurface {
        &self.text
    }

    pub fn text_surface_mut(&mut self) -> &mut TextSurface {
        &mut self.text
    }

    pub fn usage(&self) -> &UsageBits {
        &self.usage
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    /// Host palette, used to find black and white for dotted lines.
    pub fn set_palette(&mut self, palette: RgbPalette) {
        self.palette = palette;
    }

    /// The two EGA colour maps the VGA-to-EGA ditherer alternates between.
    pub fn set_ega_color_maps(&mut self, maps: [[u8; 256]; 2]) {
        *self.ega_maps = maps;
    }

    /// Make dissolves repeatable.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn screen_start_strip(&self) -> i32 {
        self.screen_start_strip
    }

    pub fn screen_top(&self) -> i32 {
        self.screen_top
    }

    /// Rows of the text area and the first verb row, as last passed to
    /// [`ScummGfx::init_screens`].
    pub fn screen_split(&self) -> (i32, i32) {
        (self.screen_b, self.screen_h)
    }

    pub fn is_light_on(&self) -> bool {
        self.profile.always_lit() || self.lights & LIGHTMODE_ROOM_LIGHTS_ON != 0
    }

    /// Move the camera to room column `x`, scrolling the main screen so the
    /// camera sits in the middle.
    pub fn set_camera_x(&mut self, x: i32) {
        self.camera.cur_x = x;
        self.screen_start_strip = (x / 8 - self.gdi.num_strips as i32 / 2).max(0);
        self.screens[VirtScreenNumber::Main.index()].xstart = self.screen_start_strip * 8;
    }

    /// Lay out the screens: text rows `0..b`, the room `b..h` and the verbs
    /// below `h`.
    pub fn init_screens(&mut self, b: i32, h: i32) {
        let sw = self.profile.screen_width;
        let sh = self.profile.screen_height as i32;
        let mut adj = 0;

        if self.profile.version >= 7 {
            self.init_virt_screen(VirtScreenNumber::Banner, sh / 2 - 10, sw, 13, false, false);
        } else {
            self.init_virt_screen(VirtScreenNumber::Banner, 80, sw, 12, false, false);
        }

        // NES rooms sit 16 rows down the display
        if self.profile.is_nes() && h != sh {
            adj = 16;
            self.init_virt_screen(VirtScreenNumber::Banner, 0, sw, adj, false, false);
        }

        self.init_virt_screen(VirtScreenNumber::Main, b + adj, sw, h - b, true, true);
        self.init_virt_screen(VirtScreenNumber::Text, adj, sw, b, false, false);
        self.init_virt_screen(VirtScreenNumber::Verb, h + adj, sw, sh - h - adj, false, false);
        self.screen_b = b;
        self.screen_h = h;

        self.gdi.init(&self.profile);
        log(LogCategory::Screen, LogLevel::Debug, || {
            format!("init_screens: text 0..{}, main {}..{}, adj {}", b, b, h, adj)
        });
    }

    fn init_virt_screen(
        &mut self,
        number: VirtScreenNumber,
        top: i32,
        width: usize,
        height: i32,
        two_bufs: bool,
        scrollable: bool,
    ) {
        let mut height = height.max(0) as usize;
        if self.profile.version >= 7 && number == VirtScreenNumber::Main {
            if let Some(room) = self.room.as_ref().filter(|r| r.height != 0) {
                height = room.height;
            }
        }
        let format = if self.profile.features.high_color {
            PixelFormat::Rgb555
        } else {
            PixelFormat::Clut8
        };
        let layout = ScreenLayout {
            top,
            width,
            height,
            two_bufs,
            scrollable,
        };
        self.screens[number.index()] = VirtScreen::new(
            number,
            layout,
            format,
            self.profile.version,
            self.profile.num_strips(),
            self.profile.clear_color(),
        );
    }

    /// Screen covering display row `y`. The banner is only ever found when
    /// forced.
    pub fn find_virt_screen(&self, y: i32) -> Option<VirtScreenNumber> {
        if self.force_banner {
            return Some(VirtScreenNumber::Banner);
        }
        self.screens[..3].iter().find(|vs| vs.contains_row(y)).map(|vs| vs.number)
    }

    /// Mark a rectangle of `number` dirty. On the main screen `dirtybit`
    /// is also set on the room strips underneath.
    pub fn mark_rect_as_dirty(
        &mut self,
        number: VirtScreenNumber,
        left: i32,
        right: i32,
        top: i32,
        bottom: i32,
        dirtybit: Option<u32>,
    ) {
        let vs = &mut self.screens[number.index()];
        if left > right || top > bottom {
            return;
        }
        if top > vs.h as i32 || bottom < 0 {
            return;
        }

        if let (VirtScreenNumber::Main, Some(bit)) = (number, dirtybit) {
            let lp = (left / 8 + self.screen_start_strip).max(0);
            let cap = if self.profile.version >= 7 { 409 } else { 200 };
            let rp = ((right + vs.xstart) / 8).min(cap);
            for strip in lp..=rp {
                self.usage.set(strip as usize, bit);
            }
        }

        vs.dirty.mark(left, right, top, bottom);
    }

    /// Flush the dirty strips of one screen to the display.
    pub fn update_dirty_screen(&mut self, number: VirtScreenNumber) -> Result<(), GfxError> {
        let vs = &mut self.screens[number.index()];
        if vs.h == 0 {
            return Ok(());
        }
        for run in vs.dirty.take_runs() {
            self.draw_strip_to_screen(number, run.x as i32, run.width as i32, run.top, run.bottom)?;
        }
        Ok(())
    }

    /// Flush every screen. A moved camera sends the whole main screen.
    pub fn draw_dirty_screen_parts(&mut self) -> Result<(), GfxError> {
        self.update_dirty_screen(VirtScreenNumber::Verb)?;
        self.update_dirty_screen(VirtScreenNumber::Text)?;

        if self.camera.moved(self.profile.version) {
            let (w, h) = {
                let vs = &self.screens[VirtScreenNumber::Main.index()];
                (vs.w as i32, vs.h as i32)
            };
            self.draw_strip_to_screen(VirtScreenNumber::Main, 0, w, 0, h)?;
            self.screens[VirtScreenNumber::Main.index()].dirty.clean();
            Ok(())
        } else {
            self.update_dirty_screen(VirtScreenNumber::Main)
        }
    }

    /// Send columns `x..x + width`, rows `top..bottom` of a screen to the
    /// display. Rows are in screen coordinates, `x` in display pixels.
    pub fn draw_strip_to_screen(
        &mut self,
        number: VirtScreenNumber,
        x: i32,
        width: i32,
        top: i32,
        bottom: i32,
    ) -> Result<(), GfxError> {
        let profile = &self.profile;
        let vs = &self.screens[number.index()];
        if bottom <= top || top >= vs.h as i32 {
            return Ok(());
        }

        let mode = self.config.render_mode;
        let align = if profile.version > 2 && (mode == RenderMode::Cga || mode.is_hercules()) {
            4
        } else if self.config.ega_dithering {
            2
        } else {
            1
        };
        let mut top = top & !(align - 1);
        let mut bottom = bottom;
        if bottom & (align - 1) != 0 {
            bottom = (bottom + align) & !(align - 1);
        }

        let mut x = x;
        let mut width = width.min(vs.w as i32 - x);
        top = top.max(self.screen_top);
        bottom = bottom.min(self.screen_top + profile.screen_height as i32);
        bottom = bottom.min(vs.h as i32);

        let mut y = vs.topline + top - self.screen_top;
        let mut height = bottom - top;
        if width <= 0 || height <= 0 {
            return Ok(());
        }

        let bpp = vs.bpp();
        let src = vs.pixels().get(vs.pixel_offset(x, top)..).unwrap_or(&[]);

        if profile.is_nes() && width == 256 && height == 240 {
            self.display.fill_screen(0x1d);
            return Ok(());
        }

        if profile.version >= 7 {
            self.display
                .copy_rect_to_screen(src, vs.pitch, x, y, width as usize, height as usize);
            return Ok(());
        }

        let high_color = (!profile.is_he()).then_some(&self.ctx.high_color);
        self.text.composite(
            src,
            vs.pitch,
            bpp,
            x.max(0) as usize,
            y.max(0) as usize,
            width as usize,
            height as usize,
            high_color,
            &mut self.composite_buf,
        )?;

        let mut pitch = width as usize * bpp;
        let mut output = FilterOutput::Composite;
        if profile.is_nes() {
            // Narrow NES rooms are centred on the display
            if self.gdi.nes_start_strip() > 0 && number == VirtScreenNumber::Main {
                x += 16;
                while x + width >= profile.screen_width as i32 {
                    width -= 16;
                }
                if width <= 0 {
                    return Ok(());
                }
                if width == 224 && height == 240 && x == 16 {
                    let black = [0u8; 16 * 240];
                    self.display.copy_rect_to_screen(&black, 16, 0, 0, 16, 240);
                    width = 240;
                }
            }
        } else if self.config.ega_dithering {
            let area = dither_vga_to_ega(
                &self.composite_buf,
                &mut self.scale_buf,
                &self.ega_maps,
                BlitArea {
                    pitch,
                    x,
                    y,
                    width: width as usize,
                    height: height as usize,
                },
            );
            output = FilterOutput::Scaled;
            (pitch, x, y, width, height) = (area.pitch, area.x, area.y, area.width as i32, area.height as i32);
        } else if profile.platform == Platform::Dos && profile.version < 5 {
            let mut remap = [0u8; 16];
            for (i, c) in remap.iter_mut().enumerate() {
                *c = self.gdi.remap_color_to_render_mode(i as u8);
            }
            let filter = DosFilter {
                version: profile.version,
                zak: profile.id == GameId::Zak,
                render_mode: mode,
                screen: number,
                topline: vs.topline,
                screen_width: profile.screen_width,
                remap,
            };
            let area = BlitArea {
                pitch,
                x,
                y,
                width: width as usize,
                height: height as usize,
            };
            let (out, area) =
                post_process_dos_graphics(&filter, &mut self.composite_buf, &mut self.scale_buf, area);
            output = out;
            (pitch, x, y, width, height) = (area.pitch, area.x, area.y, area.width as i32, area.height as i32);
        }

        let buf = match output {
            FilterOutput::Composite => &self.composite_buf,
            FilterOutput::Scaled => &self.scale_buf,
        };
        self.display
            .copy_rect_to_screen(buf, pitch, x, y, width as usize, height.max(0) as usize);
        Ok(())
    }

    /// Make `room` current: size the mask store for it and let the
    /// compositor build its per-room tables. The next frame redraws the
    /// whole background.
    pub fn load_room(&mut self, room: Room) -> Result<(), GfxError> {
        self.current_room = room.number;
        let height = room.height;
        self.room = Some(room);
        self.init_bg_buffers(height)?;

        if let Some(room) = self.room.as_ref() {
            self.gdi
                .room_changed(&room.data, room.width, room.height, room.number)?;
        }
        self.usage.reset();
        self.full_redraw = true;
        log(LogCategory::Compositor, LogLevel::Debug, || {
            format!(
                "load_room: room {} with {} z-buffers",
                self.current_room, self.gdi.num_zbuffer
            )
        });
        Ok(())
    }

    /// Allocate the mask planes for a room of `height` rows. v7+ main
    /// screens grow to the room height.
    pub fn init_bg_buffers(&mut self, height: usize) -> Result<(), GfxError> {
        if self.profile.version >= 7 {
            let topline = self.screens[VirtScreenNumber::Main.index()].topline;
            let width = self.profile.screen_width;
            self.init_virt_screen(VirtScreenNumber::Main, topline, width, height as i32, true, true);
        }

        let Some(room) = self.room.as_ref() else {
            return Err(GfxError::MissingChunk {
                tag: "room".to_string(),
            });
        };
        let source = if self.profile.features.small_header {
            room.image()?
        } else {
            &room.data
        };
        let num_zbuffer = count_zbuffers(source, &self.profile)?;
        self.gdi.num_zbuffer = num_zbuffer;
        self.mask
            .init(num_zbuffer, self.gdi.num_strips, room.height, self.profile.version)
    }

    /// Bring the main screen's background up to date: dirty strips, the
    /// strips uncovered by scrolling, or everything after a room change.
    pub fn redraw_bg_areas(&mut self) -> Result<(), GfxError> {
        let num_strips = self.gdi.num_strips as i32;

        if self.profile.he_version >= 71 {
            if self.full_redraw {
                self.bg_needs_redraw = false;
                self.draw_bmap_background()?;
            }
            self.bg_needs_redraw = false;
            return Ok(());
        }

        if !self.full_redraw && self.bg_needs_redraw {
            for i in 0..num_strips {
                let strip = (self.screen_start_strip + i).max(0) as usize;
                if self.usage.test(strip, USAGEBIT_DIRTY) {
                    self.redraw_bg_strip(i, 1)?;
                }
            }
        }

        if self.profile.version >= 7 {
            let diff = self.camera.cur_x / 8 - self.camera.last_x / 8;
            if self.full_redraw || diff.abs() >= num_strips {
                self.bg_needs_redraw = false;
                self.redraw_bg_strip(0, num_strips)?;
            } else if diff > 0 {
                self.redraw_bg_strip(num_strips - diff, diff)?;
            } else if diff < 0 {
                self.redraw_bg_strip(0, -diff)?;
            }
        } else {
            let diff = self.camera.cur_x - self.camera.last_x;
            if !self.full_redraw && diff == 8 {
                self.redraw_bg_strip(num_strips - 1, 1)?;
            } else if !self.full_redraw && diff == -8 {
                self.redraw_bg_strip(0, 1)?;
            } else if self.full_redraw || diff != 0 {
                if self.profile.version <= 5 {
                    self.clear_flashlight();
                }
                self.bg_needs_redraw = false;
                self.redraw_bg_strip(0, num_strips)?;
            }
        }

        self.bg_needs_redraw = false;
        Ok(())
    }

    /// Redraw `num` screen strips from `start` out of the room image.
    pub fn redraw_bg_strip(&mut self, start: i32, num: i32) -> Result<(), GfxError> {
        let s = self.screen_start_strip + start;
        for i in 0..num {
            self.usage.set((s + i).max(0) as usize, USAGEBIT_DIRTY);
        }

        let lights_on = self.is_light_on();
        let Some(room) = self.room.as_ref() else {
            return Ok(());
        };
        let image = room.image()?;
        let vs = &mut self.screens[VirtScreenNumber::Main.index()];
        let env = DrawEnv {
            profile: &self.profile,
            config: &self.config,
            lights_on,
            room_width: room.width,
            current_room: self.current_room,
            room_resource: room.resource,
        };
        let req = BitmapRequest {
            x: s,
            y: 0,
            width: room.width as i32,
            height: vs.h as i32,
            stripnr: s,
            numstrip: num,
            flag: 0,
        };
        self.gdi
            .draw_bitmap(image, vs, &mut self.mask, &mut self.ctx, &env, req)
    }

    fn draw_bmap_background(&mut self) -> Result<(), GfxError> {
        let Some(room) = self.room.as_ref() else {
            return Ok(());
        };
        let image = room.image()?;
        let vs = &mut self.screens[VirtScreenNumber::Main.index()];
        self.gdi
            .draw_bmap_bg(image, vs, &mut self.mask, &self.ctx, &self.profile)
    }

    /// Draw strips of an object or room image into screen `number`.
    pub fn draw_bitmap(
        &mut self,
        image: &[u8],
        number: VirtScreenNumber,
        req: BitmapRequest,
    ) -> Result<(), GfxError> {
        let lights_on = self.is_light_on();
        let (room_width, room_resource) = self
            .room
            .as_ref()
            .map_or((self.profile.screen_width, 0), |r| (r.width, r.resource));
        let env = DrawEnv {
            profile: &self.profile,
            config: &self.config,
            lights_on,
            room_width,
            current_room: self.current_room,
            room_resource,
        };
        let vs = &mut self.screens[number.index()];
        self.gdi
            .draw_bitmap(image, vs, &mut self.mask, &mut self.ctx, &env, req)
    }

    /// One frame of screen output: redraw the background where needed,
    /// flush every dirty strip and advance the screen shake.
    pub fn render_frame(&mut self) -> Result<(), GfxError> {
        self.redraw_bg_areas()?;
        self.draw_dirty_screen_parts()?;
        self.camera.last_x = self.camera.cur_x;
        self.camera.last_y = self.camera.cur_y;
        self.full_redraw = false;
        self.update_screen_shake_effect();
        Ok(())
    }
}
