//! The room/object compositor.
//!
//! [`Gdi`] turns strips of a room or object image into pixels on a virtual
//! screen and bits in the mask store. Most games share one pipeline; the
//! early character-cell engines and the console ports bring their own
//! decoders, picked once per game as a [`GdiVariant`].

pub mod he;
pub mod nes;
pub mod pce;
pub mod v1;
pub mod v2;

use crate::codec::decompress_bitmap;
use crate::config::GfxConfig;
use crate::context::RenderContext;
use crate::game::{GameId, GameProfile, Language, Platform};
use crate::mask::{decompress_mask_img, decompress_mask_img_or, MaskBuffer};
use crate::resource::{
    chunked_plane_strip, find_chunk, get_zplanes, read_le16, zplane_strip_offset, StripMap, ZPlaneList, TAG_TMSK,
};
use crate::surface::{clear_8_col, copy_8_col};
use crate::virt_screen::{VirtScreen, VirtScreenNumber};
use crate::GfxError;
use gfx_core::logging::{log, LogCategory, LogLevel};

use nes::NesState;
use pce::PceState;
use v1::V1State;
use v2::{V2Draw, V2State};

/// OR transparent strips into the existing mask instead of replacing it.
pub const DB_ALLOW_MASK_OR: u8 = 1 << 0;
/// Decode mask plane 1 into every plane, the charset plane included.
pub const DB_DRAW_MASK_ON_ALL: u8 = 1 << 1;
/// The image is an object, not the room background.
pub const DB_OBJECT_MODE: u8 = 2 << 2;

/// Per-platform decoder state.
#[derive(Debug, Clone)]
pub enum GdiVariant {
    Default,
    He,
    V1(Box<V1State>),
    V2(V2State),
    Nes(Box<NesState>),
    PcEngine(Box<PceState>),
}

impl GdiVariant {
    pub fn for_game(profile: &GameProfile) -> Self {
        if profile.is_nes() {
            GdiVariant::Nes(Box::default())
        } else if profile.is_pce() {
            GdiVariant::PcEngine(Box::default())
        } else if profile.is_he() {
            GdiVariant::He
        } else if profile.version <= 1 {
            GdiVariant::V1(Box::default())
        } else if profile.version == 2 {
            GdiVariant::V2(V2State::default())
        } else {
            GdiVariant::Default
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GdiVariant::Default => "default",
            GdiVariant::He => "he",
            GdiVariant::V1(_) => "v1",
            GdiVariant::V2(_) => "v2",
            GdiVariant::Nes(_) => "nes",
            GdiVariant::PcEngine(_) => "pcengine",
        }
    }

    /// Whether strips come from a strip map with per-strip z-plane tables.
    fn uses_strip_map(&self) -> bool {
        matches!(self, GdiVariant::Default | GdiVariant::He)
    }
}

/// Strips of an image to draw and where they land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapRequest {
    /// Room strip of the first column drawn
    pub x: i32,
    /// Row inside the virtual screen
    pub y: i32,
    /// Image width in pixels
    pub width: i32,
    pub height: i32,
    /// First image strip to draw
    pub stripnr: i32,
    pub numstrip: i32,
    /// `DB_*` flags
    pub flag: u8,
}

/// Engine state a draw depends on beyond the image itself.
#[derive(Debug, Clone, Copy)]
pub struct DrawEnv<'a> {
    pub profile: &'a GameProfile,
    pub config: &'a GfxConfig,
    pub lights_on: bool,
    pub room_width: usize,
    pub current_room: u16,
    /// Resource number the room was loaded from
    pub room_resource: u16,
}

/// Strip-map view of one image, resolved once per draw.
struct ImageTables<'a> {
    smap: Option<StripMap<'a>>,
    zplanes: ZPlaneList<'a>,
    tmsk: Option<&'a [u8]>,
}

#[derive(Debug, Clone)]
pub struct Gdi {
    pub num_strips: usize,
    pub num_zbuffer: usize,
    pub zbuffer_disabled: bool,
    object_mode: bool,
    variant: GdiVariant,
}

impl Gdi {
    pub fn for_game(profile: &GameProfile) -> Self {
        Self {
            num_strips: profile.num_strips(),
            num_zbuffer: 0,
            zbuffer_disabled: false,
            object_mode: false,
            variant: GdiVariant::for_game(profile),
        }
    }

    /// Reset screen-dependent state after the screen layout changed.
    pub fn init(&mut self, profile: &GameProfile) {
        self.num_strips = profile.num_strips();
    }

    pub fn variant(&self) -> &GdiVariant {
        &self.variant
    }

    pub fn variant_mut(&mut self) -> &mut GdiVariant {
        &mut self.variant
    }

    pub fn object_mode(&self) -> bool {
        self.object_mode
    }

    /// First visible strip on the NES, whose screen is narrower than its
    /// nametable.
    pub fn nes_start_strip(&self) -> usize {
        match &self.variant {
            GdiVariant::Nes(nes) => nes.start_strip(),
            _ => 0,
        }
    }

    /// Rebuild the variant's per-room tables from the room resource.
    pub fn room_changed(
        &mut self,
        room: &[u8],
        room_width: usize,
        room_height: usize,
        current_room: u16,
    ) -> Result<(), GfxError> {
        match &mut self.variant {
            GdiVariant::V1(v1) => v1.room_changed(room),
            GdiVariant::V2(v2) => {
                let start = read_le16(room, 0x0A)? as usize;
                let bitmap = room.get(start..).ok_or(GfxError::Truncated { what: "v2 room bitmap" })?;
                v2.room_changed(bitmap, room_width, room_height)
            }
            GdiVariant::Nes(nes) => nes.room_changed(room, current_room),
            GdiVariant::PcEngine(pce) => pce.room_changed(room),
            GdiVariant::Default | GdiVariant::He => Ok(()),
        }
    }

    /// Map a 16-colour index to what the current render mode can show.
    pub fn remap_color_to_render_mode(&self, color: u8) -> u8 {
        match &self.variant {
            GdiVariant::V1(v1) => v1.remap_color(color),
            _ => color,
        }
    }

    /// Draw strips `stripnr..stripnr + numstrip` of `image` with the first
    /// one at room strip `x`.
    ///
    /// Strips left of the visible area are skipped, and drawing stops at
    /// the right edge of the room or of the screen, whichever is further.
    /// On two-buffer screens the strip lands in the back buffer and is then
    /// copied forward, or cleared in the dark.
    pub fn draw_bitmap(
        &mut self,
        image: &[u8],
        vs: &mut VirtScreen,
        mask: &mut MaskBuffer,
        ctx: &mut RenderContext,
        env: &DrawEnv,
        req: BitmapRequest,
    ) -> Result<(), GfxError> {
        let profile = env.profile;
        let BitmapRequest {
            mut x,
            y,
            width,
            height,
            mut stripnr,
            mut numstrip,
            flag,
        } = req;

        let tables = if self.variant.uses_strip_map() {
            let smap = if profile.is_he() && profile.he_version >= 71 && !self.object_mode_of(flag) {
                StripMap::locate(image, profile).ok()
            } else {
                Some(StripMap::locate(image, profile)?)
            };
            let tmsk = if profile.he_version >= 72 {
                find_chunk(image, &TAG_TMSK)
            } else {
                None
            };
            Some(ImageTables {
                smap,
                zplanes: get_zplanes(image, profile, self.num_zbuffer, self.zbuffer_disabled, false)?,
                tmsk,
            })
        } else {
            None
        };

        if y + height > vs.h as i32 {
            log(LogCategory::Compositor, LogLevel::Warn, || {
                format!(
                    "draw_bitmap: strip drawn to {} below window bottom {}",
                    y + height,
                    vs.h
                )
            });
        }

        self.object_mode = self.object_mode_of(flag);
        self.prepare(image, vs, mask, ctx, &req)?;

        let mut sx = x - vs.xstart / 8;
        if sx < 0 {
            numstrip += sx;
            x -= sx;
            stripnr -= sx;
            sx = 0;
        }

        let mut limit = (env.room_width.max(vs.w) / 8) as i32 - x;
        limit = limit.min(numstrip);
        limit = limit.min(self.num_strips as i32 - sx);

        let (pitch, bpp) = (vs.pitch, vs.bpp());
        for _ in 0..limit.max(0) {
            if y < vs.h as i32 {
                vs.dirty.extend(sx as usize, y, y + height);
            }

            let off = vs.base_offset(x * 8, y);
            let mut transp = self.draw_strip(
                tables.as_ref(),
                vs,
                mask,
                ctx,
                env,
                off,
                Strip::new(x, y, width, height, stripnr),
            )?;
            if profile.version == 8 || profile.he_version >= 60 {
                transp = true;
            }

            if let (front, Some(back)) = vs.buffers_mut() {
                if env.lights_on {
                    copy_8_col(front, back, off, pitch, height as usize, bpp);
                } else {
                    clear_8_col(front, off, pitch, height as usize, bpp, profile.clear_color());
                }
            }

            self.decode_mask(
                tables.as_ref(),
                mask,
                profile,
                Strip::new(x, y, width, height, stripnr),
                transp,
                flag,
            )?;

            x += 1;
            sx += 1;
            stripnr += 1;
        }
        Ok(())
    }

    fn object_mode_of(&self, flag: u8) -> bool {
        flag & DB_OBJECT_MODE == DB_OBJECT_MODE
    }

    /// Per-image setup before the strip loop. v2 images decode completely
    /// here.
    fn prepare(
        &mut self,
        image: &[u8],
        vs: &mut VirtScreen,
        mask: &mut MaskBuffer,
        ctx: &RenderContext,
        req: &BitmapRequest,
    ) -> Result<(), GfxError> {
        let object_mode = self.object_mode;
        match &mut self.variant {
            GdiVariant::V1(v1) if object_mode => {
                v1.prepare_object(image, req.width.max(0) as usize, req.height.max(0) as usize)
            }
            GdiVariant::Nes(nes) if object_mode => {
                nes.decode_object(image, req.x - req.stripnr, req.y, req.width, req.height)
            }
            GdiVariant::PcEngine(pce) if object_mode => pce.decode_object(image, req.height.max(0) as usize),
            GdiVariant::V2(v2) => {
                if req.numstrip <= 0 || req.height <= 0 {
                    return Ok(());
                }
                let x = req.x.max(0);
                let off = vs.base_offset(x * 8, req.y);
                let mut dst = vs.back_view_at(off);
                let draw = V2Draw {
                    mask_strip: x as usize,
                    mask_row: req.y.max(0) as usize,
                    width: req.width.max(0) as usize,
                    height: req.height as usize,
                    stripnr: req.stripnr.max(0) as usize,
                    numstrip: req.numstrip as usize,
                };
                v2.draw(image, &mut dst, mask, draw, object_mode, &ctx.room_palette)
            }
            _ => Ok(()),
        }
    }

    /// Decode one strip into the screen at byte offset `off`. Returns
    /// whether the strip was transparent.
    #[allow(clippy::too_many_arguments)]
    fn draw_strip(
        &mut self,
        tables: Option<&ImageTables>,
        vs: &mut VirtScreen,
        mask: &mut MaskBuffer,
        ctx: &mut RenderContext,
        env: &DrawEnv,
        off: usize,
        strip: Strip,
    ) -> Result<bool, GfxError> {
        let object_mode = self.object_mode;
        let number = vs.number;
        let mut dst = vs.back_view_at(off);
        match &mut self.variant {
            GdiVariant::Nes(nes) => {
                let mut column = mask.column(strip.x as usize, strip.y.max(0) as usize, 1);
                nes.draw_strip(
                    &mut dst,
                    &mut column,
                    strip.stripnr as usize,
                    strip.y.max(0) as usize,
                    strip.height as usize,
                    object_mode,
                    env.lights_on,
                );
                Ok(false)
            }
            GdiVariant::PcEngine(pce) => {
                pce.draw_strip(
                    &mut dst,
                    strip.stripnr as usize,
                    strip.height as usize,
                    object_mode,
                    &ctx.high_color,
                );
                Ok(false)
            }
            GdiVariant::V1(v1) => {
                if object_mode {
                    v1.draw_object(&mut dst, strip.stripnr as usize, strip.width as usize, strip.height as usize);
                } else {
                    v1.draw_background(&mut dst, strip.stripnr as usize, strip.height as usize, &ctx.room_palette);
                }
                Ok(false)
            }
            GdiVariant::V2(_) => Ok(false),
            GdiVariant::Default | GdiVariant::He => {
                let Some(smap) = tables.and_then(|t| t.smap.as_ref()) else {
                    return Ok(false);
                };
                let profile = env.profile;
                let data = smap.strip(strip.stripnr as usize)?;

                if profile.is_indy4_amiga() {
                    ctx.use_verb_palette = number == VirtScreenNumber::Verb;
                }

                if is_indy3_ega_room(profile, env, number, smap.len()) {
                    let pal = &mut ctx.room_palette;
                    if pal.get(11) == 11 && pal.get(86) == 86 {
                        pal.set(11, 86);
                    }
                    if pal.get(13) == 13 && pal.get(80) == 80 {
                        pal.set(13, 80);
                    }
                }

                if is_mi1_french_door(profile, env, number, &strip) {
                    ctx.room_palette.set(1, 15);
                    let result = decompress_bitmap(&mut dst, data, strip.height as usize, ctx);
                    ctx.room_palette.set(1, 1);
                    return result;
                }

                decompress_bitmap(&mut dst, data, strip.height as usize, ctx)
            }
        }
    }

    /// Load the mask planes of one strip into the mask store.
    fn decode_mask(
        &self,
        tables: Option<&ImageTables>,
        mask: &mut MaskBuffer,
        profile: &GameProfile,
        strip: Strip,
        transp: bool,
        flag: u8,
    ) -> Result<(), GfxError> {
        let x = strip.x.max(0) as usize;
        let y = strip.y.max(0) as usize;
        let height = strip.height.max(0) as usize;
        let stripnr = strip.stripnr as usize;
        let allow_or = transp && flag & DB_ALLOW_MASK_OR != 0;

        match &self.variant {
            GdiVariant::Nes(nes) => {
                nes.draw_mask(&mut mask.column(x, y, 1), stripnr, y, height, self.object_mode);
                Ok(())
            }
            GdiVariant::PcEngine(pce) => {
                pce.draw_mask(&mut mask.column(x, y, 1), stripnr, height, self.object_mode);
                Ok(())
            }
            GdiVariant::V1(v1) => {
                v1.draw_mask(
                    &mut mask.column(x, y, 1),
                    stripnr,
                    strip.width.max(0) as usize,
                    height,
                    self.object_mode,
                );
                Ok(())
            }
            GdiVariant::V2(_) => Ok(()),
            GdiVariant::He => {
                let Some(tables) = tables else { return Ok(()) };
                he::decode_mask(mask, &tables.zplanes, tables.tmsk, x, y, height, stripnr, allow_or)
            }
            GdiVariant::Default => {
                let Some(tables) = tables else { return Ok(()) };
                let zplanes = &tables.zplanes;

                if flag & DB_DRAW_MASK_ON_ALL != 0 {
                    // Plane 1 is copied to every plane, the charset plane too.
                    // A zero strip offset decodes from the start of the plane.
                    let Some(plane) = zplanes.get(1) else { return Ok(()) };
                    let src = chunked_plane_strip(plane, 1, stripnr, profile.version == 8)?.unwrap_or(plane);
                    for i in 0..zplanes.count {
                        let mut column = mask.column(x, y, i);
                        if allow_or {
                            decompress_mask_img_or(&mut column, src, height)?;
                        } else {
                            decompress_mask_img(&mut column, src, height)?;
                        }
                    }
                    return Ok(());
                }

                for i in 1..zplanes.count {
                    let Some(plane) = zplanes.get(i) else { continue };
                    let offs = zplane_strip_offset(plane, i, stripnr, profile)?;
                    let mut column = mask.column(x, y, i);
                    if offs != 0 {
                        if allow_or {
                            decompress_mask_img_or(&mut column, &plane[offs..], height)?;
                        } else {
                            decompress_mask_img(&mut column, &plane[offs..], height)?;
                        }
                    } else if !allow_or {
                        column.clear(height);
                    }
                }
                Ok(())
            }
        }
    }

    /// Restore rows `top..bottom` of screen strip `strip` from the back
    /// buffer, or clear them when the lights are off.
    pub fn reset_background(
        &self,
        vs: &mut VirtScreen,
        top: i32,
        bottom: i32,
        strip: usize,
        lights_on: bool,
        clear_color: u8,
    ) {
        let top = top.max(0);
        let bottom = bottom.min(vs.h as i32);
        if top >= bottom || strip >= self.num_strips {
            return;
        }

        vs.dirty.extend(strip, top, bottom);

        let off = vs.base_offset((strip as i32 + vs.xstart / 8) * 8, top);
        let (pitch, bpp) = (vs.pitch, vs.bpp());
        let height = (bottom - top) as usize;
        match vs.buffers_mut() {
            (front, Some(back)) if lights_on => copy_8_col(front, back, off, pitch, height, bpp),
            (front, _) => clear_8_col(front, off, pitch, height, bpp, clear_color),
        }
    }

    /// Draw an HE full-screen background and load its masks.
    pub fn draw_bmap_bg(
        &self,
        image: &[u8],
        vs: &mut VirtScreen,
        mask: &mut MaskBuffer,
        ctx: &RenderContext,
        profile: &GameProfile,
    ) -> Result<(), GfxError> {
        he::draw_bmap_bg(image, vs, mask, ctx, profile, self.num_zbuffer, self.zbuffer_disabled)
    }
}

/// Position of one strip during a draw.
#[derive(Debug, Clone, Copy)]
struct Strip {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    stripnr: i32,
}

impl Strip {
    fn new(x: i32, y: i32, width: i32, height: i32, stripnr: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            stripnr,
        }
    }
}

/// Indy3 256-colour room 46 (the fortress gate) draws two details with
/// colours the game never sets up. Remap them for good.
fn is_indy3_ega_room(profile: &GameProfile, env: &DrawEnv, number: VirtScreenNumber, smap_len: usize) -> bool {
    profile.id == GameId::Indy3
        && profile.features.old_256
        && profile.platform != Platform::FmTowns
        && env.room_resource == 46
        && number == VirtScreenNumber::Main
        && (smap_len == 43159 || (smap_len == 42953 && profile.language == Language::German))
        && env.config.enhancements.minor_bug_fixes
}

/// French MI1 VGA room 11: the door frame strips use the wrong colour 1.
fn is_mi1_french_door(profile: &GameProfile, env: &DrawEnv, number: VirtScreenNumber, strip: &Strip) -> bool {
    profile.id == GameId::MonkeyVga
        && profile.language == Language::French
        && profile.platform != Platform::Amiga
        && env.current_room == 11
        && number == VirtScreenNumber::Main
        && strip.y == 24
        && (28..=52).contains(&strip.x)
        && strip.height == 56
        && env.config.enhancements.visual_changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::build::{chunk, smap, zplane};
    use crate::virt_screen::ScreenLayout;
    use gfx_core::types::PixelFormat;

    fn screen(w: usize, h: usize, version: u8) -> VirtScreen {
        let layout = ScreenLayout {
            top: 0,
            width: w,
            height: h,
            two_bufs: true,
            scrollable: true,
        };
        let mut vs = VirtScreen::new(VirtScreenNumber::Main, layout, PixelFormat::Clut8, version, w / 8, 0);
        vs.dirty.clean();
        vs
    }

    fn raw_strip(color: u8, height: usize) -> Vec<u8> {
        let mut s = vec![1];
        s.extend(std::iter::repeat(color).take(8 * height));
        s
    }

    /// Two raw strips of colours 1 and 2; plane 1 masks strip 0 with 0xF0.
    fn object_image() -> Vec<u8> {
        let map = smap(&[raw_strip(1, 4), raw_strip(2, 4)]);
        let zp = zplane(b"ZP01", &[Some(vec![0x84, 0xF0]), None]);
        chunk(b"IM00", &[map, zp].concat())
    }

    struct Fixture {
        profile: GameProfile,
        config: GfxConfig,
        gdi: Gdi,
        vs: VirtScreen,
        mask: MaskBuffer,
        ctx: RenderContext,
    }

    impl Fixture {
        fn new(profile: GameProfile) -> Self {
            let mut gdi = Gdi::for_game(&profile);
            gdi.num_strips = 4;
            gdi.num_zbuffer = 2;
            let mut mask = MaskBuffer::new();
            mask.init(2, 4, 4, profile.version).unwrap();
            Self {
                ctx: RenderContext::for_game(&profile),
                config: GfxConfig::default(),
                gdi,
                vs: screen(32, 4, profile.version),
                mask,
                profile,
            }
        }

        fn draw(&mut self, image: &[u8], req: BitmapRequest, lights_on: bool) -> Result<(), GfxError> {
            let env = DrawEnv {
                profile: &self.profile,
                config: &self.config,
                lights_on,
                room_width: 32,
                current_room: 1,
                room_resource: 1,
            };
            self.gdi
                .draw_bitmap(image, &mut self.vs, &mut self.mask, &mut self.ctx, &env, req)
        }
    }

    fn request(x: i32, stripnr: i32, numstrip: i32, flag: u8) -> BitmapRequest {
        BitmapRequest {
            x,
            y: 0,
            width: 16,
            height: 4,
            stripnr,
            numstrip,
            flag,
        }
    }

    #[test]
    fn test_variant_selection() {
        let nes = GameProfile::new(GameId::Maniac, 1, Platform::Nes);
        assert_eq!(GdiVariant::for_game(&nes).name(), "nes");
        let c64 = GameProfile::new(GameId::Maniac, 1, Platform::C64);
        assert_eq!(GdiVariant::for_game(&c64).name(), "v1");
        let v2 = GameProfile::new(GameId::Zak, 2, Platform::Dos);
        assert_eq!(GdiVariant::for_game(&v2).name(), "v2");
        let he = GameProfile::new(GameId::Other, 6, Platform::Windows).with_he_version(80);
        assert_eq!(GdiVariant::for_game(&he).name(), "he");
        let pce = GameProfile::new(GameId::Loom, 4, Platform::PcEngine);
        assert_eq!(GdiVariant::for_game(&pce).name(), "pcengine");
        let v5 = GameProfile::new(GameId::Monkey2, 5, Platform::Dos);
        assert_eq!(GdiVariant::for_game(&v5).name(), "default");
    }

    #[test]
    fn test_draw_copies_strips_forward_and_marks_dirty() {
        let mut f = Fixture::new(GameProfile::new(GameId::Monkey2, 5, Platform::Dos));
        f.draw(&object_image(), request(1, 0, 2, 0), true).unwrap();

        let back = f.vs.back_buf().unwrap();
        assert!(back[8..16].iter().all(|&p| p == 1));
        assert!(back[16..24].iter().all(|&p| p == 2));
        assert_eq!(&f.vs.pixels()[..32], &back[..32]);
        assert!(f.vs.pixels()[..8].iter().all(|&p| p == 0));

        assert!(!f.vs.dirty.is_strip_dirty(0));
        assert_eq!(f.vs.dirty.range(1), Some((0, 4)));
        assert_eq!(f.vs.dirty.range(2), Some((0, 4)));

        for y in 0..4 {
            assert_eq!(f.mask.get(1, y, 1), 0xF0);
            assert_eq!(f.mask.get(2, y, 1), 0);
        }
    }

    #[test]
    fn test_dark_room_clears_front() {
        let mut f = Fixture::new(GameProfile::new(GameId::Monkey2, 5, Platform::Dos));
        f.vs.pixels_mut().fill(7);
        f.draw(&object_image(), request(0, 0, 1, 0), false).unwrap();
        assert!(f.vs.back_buf().unwrap()[..8].iter().all(|&p| p == 1));
        assert!(f.vs.pixels()[..8].iter().all(|&p| p == 0));
        assert!(f.vs.pixels()[8..16].iter().all(|&p| p == 7));
    }

    #[test]
    fn test_strips_left_of_view_are_skipped() {
        let mut f = Fixture::new(GameProfile::new(GameId::Monkey2, 5, Platform::Dos));
        f.vs.xstart = 8;
        f.draw(&object_image(), request(0, 0, 2, 0), true).unwrap();
        // Only image strip 1 is drawn, at room strip 1 which is screen strip 0
        assert_eq!(f.vs.dirty.range(0), Some((0, 4)));
        assert!(!f.vs.dirty.is_strip_dirty(1));
        assert!(f.vs.back_buf().unwrap()[8..16].iter().all(|&p| p == 2));
    }

    #[test]
    fn test_bad_strip_offset_is_fatal() {
        let mut f = Fixture::new(GameProfile::new(GameId::Monkey2, 5, Platform::Dos));
        let mut map = smap(&[raw_strip(1, 4)]);
        map[8..12].copy_from_slice(&0xFFFFu32.to_le_bytes());
        let image = chunk(b"IM00", &map);
        assert!(matches!(
            f.draw(&image, request(0, 0, 1, 0), true),
            Err(GfxError::StripOffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_mask_on_all_planes() {
        let mut f = Fixture::new(GameProfile::new(GameId::Monkey2, 5, Platform::Dos));
        f.draw(&object_image(), request(0, 0, 1, DB_DRAW_MASK_ON_ALL), true)
            .unwrap();
        for y in 0..4 {
            assert_eq!(f.mask.get(0, y, 0), 0xF0);
            assert_eq!(f.mask.get(0, y, 1), 0xF0);
        }
    }

    #[test]
    fn test_mask_on_all_zero_offset_reads_plane_start() {
        let mut f = Fixture::new(GameProfile::new(GameId::Monkey2, 5, Platform::Dos));
        let zp = zplane(b"ZP01", &[Some(vec![0x84, 0xF0]), None]);
        let image = chunk(b"IM00", &[smap(&[raw_strip(1, 4), raw_strip(2, 4)]), zp.clone()].concat());
        for y in 0..4 {
            f.mask.set(1, y, 0, 0xFF);
            f.mask.set(1, y, 1, 0xFF);
        }
        // 'Z' reads as a literal run over the rest of the chunk header
        f.draw(&image, request(1, 1, 1, DB_DRAW_MASK_ON_ALL), true).unwrap();
        for y in 0..4 {
            assert_eq!(f.mask.get(1, y, 0), zp[1 + y]);
            assert_eq!(f.mask.get(1, y, 1), zp[1 + y]);
        }
    }

    #[test]
    fn test_empty_mask_strip_clears_column() {
        let mut f = Fixture::new(GameProfile::new(GameId::Monkey2, 5, Platform::Dos));
        for y in 0..4 {
            f.mask.set(1, y, 1, 0xFF);
        }
        // Image strip 1 has no plane data
        f.draw(&object_image(), request(1, 1, 1, 0), true).unwrap();
        for y in 0..4 {
            assert_eq!(f.mask.get(1, y, 1), 0);
        }
    }

    #[test]
    fn test_mi1_french_palette_is_restored() {
        let profile = GameProfile::new(GameId::MonkeyVga, 5, Platform::Dos).with_language(Language::French);
        let mut f = Fixture::new(profile);
        f.vs = screen(256, 80, 5);
        f.mask.init(2, 32, 80, 5).unwrap();
        let image = chunk(b"IM00", &smap(&[raw_strip(1, 56)]));
        let env = DrawEnv {
            profile: &f.profile,
            config: &f.config,
            lights_on: true,
            room_width: 480,
            current_room: 11,
            room_resource: 11,
        };
        let req = BitmapRequest {
            x: 30,
            y: 24,
            width: 8,
            height: 56,
            stripnr: 0,
            numstrip: 1,
            flag: 0,
        };
        f.vs.xstart = 30 * 8 - 8;
        f.gdi
            .draw_bitmap(&image, &mut f.vs, &mut f.mask, &mut f.ctx, &env, req)
            .unwrap();
        assert_eq!(f.ctx.room_palette.get(1), 1);
        let off = f.vs.base_offset(30 * 8, 24);
        assert_eq!(f.vs.back_buf().unwrap()[off], 15);
    }

    #[test]
    fn test_reset_background() {
        let profile = GameProfile::new(GameId::Monkey2, 5, Platform::Dos);
        let gdi = {
            let mut g = Gdi::for_game(&profile);
            g.num_strips = 4;
            g
        };
        let mut vs = screen(32, 4, 5);
        vs.back_buf_mut().unwrap().fill(3);
        gdi.reset_background(&mut vs, -2, 10, 2, true, 0);
        assert_eq!(vs.dirty.range(2), Some((0, 4)));
        assert!(vs.pixels()[16..24].iter().all(|&p| p == 3));
        assert!(vs.pixels()[8..16].iter().all(|&p| p == 0));

        gdi.reset_background(&mut vs, 0, 4, 2, false, 9);
        assert!(vs.pixels()[16..24].iter().all(|&p| p == 9));

        gdi.reset_background(&mut vs, 3, 3, 1, true, 0);
        assert!(!vs.dirty.is_strip_dirty(1));
    }

    #[test]
    fn test_v2_room_changed_reads_bitmap_offset() {
        let profile = GameProfile::new(GameId::Zak, 2, Platform::Dos);
        let mut gdi = Gdi::for_game(&profile);
        let mut room = vec![0u8; 12];
        room[0x0A] = 12;
        room.extend_from_slice(&[0x03, 32, 0x05, 32, 0x84, 0xAA, 0x84, 0x55]);
        gdi.room_changed(&room, 16, 4, 1).unwrap();
        match gdi.variant() {
            GdiVariant::V2(v2) => assert_eq!(v2.strip_table().unwrap().offsets[1], 2),
            other => panic!("unexpected variant {}", other.name()),
        }
    }
}
