use gfx_core::display::{Display, FrameDisplay};
use gfx_core::palette::ColorRemap;
use gfx_core::timer::ManualTimer;
use gfx_core::types::{PixelFormat, Rect};
use scumm_gfx::codec::decompress_bitmap;
use scumm_gfx::engine::Room;
use scumm_gfx::resource::build::{chunk, smap};
use scumm_gfx::resource::StripMap;
use scumm_gfx::surface::PixelView;
use scumm_gfx::{GameId, GameProfile, GfxConfig, Platform, RenderContext, ScummGfx, VirtScreenNumber};

const ROOM_W: usize = 320;
const ROOM_H: usize = 128;

fn v5() -> GameProfile {
    GameProfile::new(GameId::Monkey2, 5, Platform::Dos)
}

/// Reversed palette so a missing lookup shows up as a wrong pixel.
fn reversed_palette() -> ColorRemap {
    let table: Vec<u8> = (0..=255u8).map(|i| 255 - i).collect();
    ColorRemap::from_slice(&table)
}

/// Room pixel before palette lookup.
fn room_color(x: usize, y: usize) -> u8 {
    ((x + 3 * y) % 240) as u8 + 1
}

fn raw_strip(strip: usize) -> Vec<u8> {
    let mut s = vec![1u8];
    for y in 0..ROOM_H {
        for x in 0..8 {
            s.push(room_color(strip * 8 + x, y));
        }
    }
    s
}

/// A v5 room of raw strips with one z-buffer. The image starts 26 bytes in,
/// after the ROOM and RMIM headers and the RMIH chunk.
fn build_room() -> Room {
    let strips: Vec<Vec<u8>> = (0..ROOM_W / 8).map(raw_strip).collect();
    let image = chunk(b"IM00", &smap(&strips));
    let rmih = chunk(b"RMIH", &[0, 0]);
    let rmim = chunk(b"RMIM", &[rmih, image].concat());
    let data = chunk(b"ROOM", &rmim);
    Room::new(1, ROOM_W, ROOM_H, data).with_image_offset(26)
}

fn engine() -> ScummGfx<FrameDisplay, ManualTimer> {
    let profile = v5();
    let display = FrameDisplay::new(320, 200, PixelFormat::Clut8).with_blit_log();
    let mut gfx = ScummGfx::new(profile, GfxConfig::default(), display, ManualTimer::new());
    gfx.init_screens(16, 144);
    gfx.render_context_mut().room_palette = reversed_palette();
    gfx
}

fn loaded_engine() -> ScummGfx<FrameDisplay, ManualTimer> {
    let mut gfx = engine();
    gfx.load_room(build_room()).unwrap();
    gfx.render_frame().unwrap();
    gfx.display_mut().take_blits();
    gfx
}

fn expected_pixel(x: usize, y: usize) -> u32 {
    (255 - room_color(x, y)) as u32
}

#[test]
fn test_raw_strip_decodes_through_room_palette() {
    let mut row = Vec::new();
    for _ in 0..8 {
        row.extend(1..=8u8);
    }
    let strips: Vec<Vec<u8>> = (0..16)
        .map(|_| {
            let mut s = vec![1u8];
            s.extend_from_slice(&row);
            s
        })
        .collect();
    let image = chunk(b"IM00", &smap(&strips));
    let map = StripMap::locate(&image, &v5()).unwrap();
    assert_eq!(map.len(), 16);

    let ctx = RenderContext {
        room_palette: reversed_palette(),
        ..RenderContext::default()
    };
    let mut dst = vec![0u8; 64];
    let mut view = PixelView::new(&mut dst, 0, 8, 1);
    let transparent = decompress_bitmap(&mut view, map.strip(0).unwrap(), 8, &ctx).unwrap();
    assert!(!transparent);

    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(dst[y * 8 + x], ctx.room_palette.get((x % 8 + 1) as u8));
        }
    }
}

#[test]
fn test_room_reaches_display() {
    let mut gfx = engine();
    gfx.load_room(build_room()).unwrap();
    assert_eq!(gfx.mask().num_zbuffer(), 1);
    gfx.render_frame().unwrap();

    let display = gfx.display();
    for &(x, y) in &[(0usize, 0usize), (7, 3), (8, 0), (159, 64), (319, 127)] {
        assert_eq!(
            display.pixel(x as u32, (y + 16) as u32),
            Some(expected_pixel(x, y)),
            "pixel ({}, {})",
            x,
            y
        );
    }
    // Text and verb areas were never drawn
    assert_eq!(display.pixel(0, 0), Some(0));
    assert_eq!(display.pixel(0, 150), Some(0));

    // Every screen starts dirty, so the first frame covers the display once
    assert!(display.blits().contains(&Rect::new(0, 16, 320, 144)));
    let covered: i64 = display.blits().iter().map(Rect::area).sum();
    assert_eq!(covered, 320 * 200);
    assert!(gfx.screen(VirtScreenNumber::Main).dirty.is_clean());
}

#[test]
fn test_flush_covers_exactly_the_marked_strips() {
    let mut gfx = loaded_engine();
    gfx.mark_rect_as_dirty(VirtScreenNumber::Main, 10, 30, 5, 20, None);
    gfx.mark_rect_as_dirty(VirtScreenNumber::Main, 100, 140, 40, 60, None);
    gfx.draw_dirty_screen_parts().unwrap();

    let blits = gfx.display_mut().take_blits();
    let expected = [Rect::new(8, 21, 32, 36), Rect::new(96, 56, 144, 76)];
    for b in &blits {
        assert!(
            expected.iter().any(|e| b.left >= e.left && b.right <= e.right && b.top >= e.top && b.bottom <= e.bottom),
            "blit {:?} outside the marked strips",
            b
        );
    }
    for (i, a) in blits.iter().enumerate() {
        for b in &blits[i + 1..] {
            let overlap = Rect::new(a.left.max(b.left), a.top.max(b.top), a.right.min(b.right), a.bottom.min(b.bottom));
            assert!(overlap.is_empty(), "{:?} overlaps {:?}", a, b);
        }
    }
    let covered: i64 = blits.iter().map(Rect::area).sum();
    assert_eq!(covered, expected.iter().map(Rect::area).sum::<i64>());
}

#[test]
fn test_second_flush_sends_nothing() {
    let mut gfx = loaded_engine();
    gfx.mark_rect_as_dirty(VirtScreenNumber::Main, 0, 319, 0, 128, None);
    gfx.draw_dirty_screen_parts().unwrap();
    assert!(!gfx.display_mut().take_blits().is_empty());

    gfx.draw_dirty_screen_parts().unwrap();
    assert!(gfx.display().blits().is_empty());
}

#[test]
fn test_restore_background_undoes_a_box() {
    let mut gfx = loaded_engine();
    gfx.draw_box(40, 50, 80, 90, 7).unwrap();
    gfx.draw_dirty_screen_parts().unwrap();
    assert_eq!(gfx.display().pixel(50, 60), Some(7));

    gfx.restore_background(Rect::new(32, 40, 96, 100), 0);
    gfx.draw_dirty_screen_parts().unwrap();

    let display = gfx.display();
    for y in 40..100usize {
        for x in 32..96usize {
            assert_eq!(display.pixel(x as u32, y as u32), Some(expected_pixel(x, y - 16)));
        }
    }
}

#[test]
fn test_lights_off_room_is_black() {
    let mut gfx = engine();
    gfx.lights = 0;
    gfx.load_room(build_room()).unwrap();
    gfx.render_frame().unwrap();
    assert_eq!(gfx.display().pixel(100, 50), Some(0));
    assert_eq!(gfx.display().width(), 320);
}
