//! Off-screen surfaces the room, text, verbs and banner are drawn into.

use crate::dirty::DirtyTracker;
use crate::surface::PixelView;
use gfx_core::types::PixelFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtScreenNumber {
    Main = 0,
    Text = 1,
    Verb = 2,
    Banner = 3,
}

impl VirtScreenNumber {
    pub const ALL: [VirtScreenNumber; 4] = [
        VirtScreenNumber::Main,
        VirtScreenNumber::Text,
        VirtScreenNumber::Verb,
        VirtScreenNumber::Banner,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Layout parameters for [`VirtScreen::new`].
#[derive(Debug, Clone, Copy)]
pub struct ScreenLayout {
    pub top: i32,
    pub width: usize,
    pub height: usize,
    pub two_bufs: bool,
    pub scrollable: bool,
}

/// An off-screen pixel buffer with an optional background copy.
///
/// Scrolling rooms are wider than the buffer's `w`; the room is scrolled by
/// moving `xstart` and letting rows run into the next one. The buffer keeps
/// a few spare rows past the end so the last row can overrun.
#[derive(Debug, Clone)]
pub struct VirtScreen {
    pub number: VirtScreenNumber,
    /// First display row covered by this screen
    pub topline: i32,
    pub w: usize,
    pub h: usize,
    /// Row length in bytes
    pub pitch: usize,
    pub format: PixelFormat,
    /// Horizontal scroll offset in pixels
    pub xstart: i32,
    pub dirty: DirtyTracker,
    pixels: Vec<u8>,
    back_buf: Option<Vec<u8>>,
}

impl VirtScreen {
    /// Allocate a screen cleared to `clear_color`.
    ///
    /// From v7 on the pitch grows by 8 bytes for the smooth-scroll strip and
    /// scrollable screens keep 8 spare rows instead of 4. Every screen but
    /// the banner starts fully dirty.
    pub fn new(
        number: VirtScreenNumber,
        layout: ScreenLayout,
        format: PixelFormat,
        version: u8,
        num_strips: usize,
        clear_color: u8,
    ) -> Self {
        let mut pitch = layout.width * format.bytes_per_pixel();
        if version >= 7 {
            pitch += 8;
        }

        let mut size = pitch * layout.height;
        if layout.scrollable {
            size += pitch * if version >= 7 { 8 } else { 4 };
        }

        let mut dirty = DirtyTracker::new(num_strips, layout.height as i32);
        if number != VirtScreenNumber::Banner {
            dirty.set_dirty_range(0, layout.height as i32);
        }

        Self {
            number,
            topline: layout.top,
            w: layout.width,
            h: layout.height,
            pitch,
            format,
            xstart: 0,
            dirty,
            pixels: vec![clear_color; size],
            back_buf: if layout.two_bufs {
                Some(vec![0; size])
            } else {
                None
            },
        }
    }

    /// Zero-sized placeholder for screens a layout does not use.
    pub fn empty(number: VirtScreenNumber) -> Self {
        Self {
            number,
            topline: 0,
            w: 0,
            h: 0,
            pitch: 0,
            format: PixelFormat::Clut8,
            xstart: 0,
            dirty: DirtyTracker::new(0, 0),
            pixels: Vec::new(),
            back_buf: None,
        }
    }

    pub fn bpp(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    pub fn has_two_buffers(&self) -> bool {
        self.back_buf.is_some()
    }

    /// Display rows `topline..topline + h`.
    pub fn contains_row(&self, y: i32) -> bool {
        y >= self.topline && y < self.topline + self.h as i32
    }

    /// Byte offset of (x, y) ignoring the scroll offset.
    pub fn base_offset(&self, x: i32, y: i32) -> usize {
        (y as isize * self.pitch as isize + x as isize * self.bpp() as isize).max(0) as usize
    }

    /// Byte offset of (x, y) in screen coordinates, after scrolling.
    pub fn pixel_offset(&self, x: i32, y: i32) -> usize {
        self.base_offset(x + self.xstart, y)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn back_buf(&self) -> Option<&[u8]> {
        self.back_buf.as_deref()
    }

    pub fn back_buf_mut(&mut self) -> Option<&mut [u8]> {
        self.back_buf.as_deref_mut()
    }

    /// Front and back buffers at once.
    pub fn buffers_mut(&mut self) -> (&mut [u8], Option<&mut [u8]>) {
        (&mut self.pixels, self.back_buf.as_deref_mut())
    }

    /// View of the front buffer anchored at byte `offset`.
    pub fn view_at(&mut self, offset: usize) -> PixelView<'_> {
        let (pitch, bpp) = (self.pitch, self.bpp());
        PixelView::new(&mut self.pixels, offset, pitch, bpp)
    }

    /// View of the back buffer anchored at byte `offset`, or of the front
    /// buffer when the screen has no back buffer.
    pub fn back_view_at(&mut self, offset: usize) -> PixelView<'_> {
        let (pitch, bpp) = (self.pitch, self.bpp());
        match self.back_buf.as_deref_mut() {
            Some(back) => PixelView::new(back, offset, pitch, bpp),
            None => PixelView::new(&mut self.pixels, offset, pitch, bpp),
        }
    }

    pub fn set_dirty_range(&mut self, top: i32, bottom: i32) {
        self.dirty.set_dirty_range(top, bottom);
    }

    /// Fill both buffers with `color`.
    pub fn clear(&mut self, color: u8) {
        self.pixels.fill(color);
        if let Some(back) = self.back_buf.as_deref_mut() {
            back.fill(color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(top: i32, w: usize, h: usize, two_bufs: bool, scrollable: bool) -> ScreenLayout {
        ScreenLayout {
            top,
            width: w,
            height: h,
            two_bufs,
            scrollable,
        }
    }

    #[test]
    fn test_main_screen_sizes() {
        let vs = VirtScreen::new(
            VirtScreenNumber::Main,
            layout(16, 320, 144, true, true),
            PixelFormat::Clut8,
            5,
            40,
            0,
        );
        assert_eq!(vs.pitch, 320);
        assert_eq!(vs.pixels().len(), 320 * 148);
        assert_eq!(vs.back_buf().map(|b| b.len()), Some(320 * 148));
        assert_eq!(vs.dirty.range(0), Some((0, 144)));
    }

    #[test]
    fn test_v7_pitch_and_slack() {
        let vs = VirtScreen::new(
            VirtScreenNumber::Main,
            layout(0, 640, 480, true, true),
            PixelFormat::Clut8,
            7,
            81,
            0,
        );
        assert_eq!(vs.pitch, 648);
        assert_eq!(vs.pixels().len(), 648 * 488);
    }

    #[test]
    fn test_banner_starts_clean_and_nes_fill() {
        let vs = VirtScreen::new(
            VirtScreenNumber::Banner,
            layout(80, 256, 12, false, false),
            PixelFormat::Clut8,
            1,
            32,
            0x1d,
        );
        assert!(vs.dirty.is_clean());
        assert!(vs.pixels().iter().all(|&p| p == 0x1d));
        assert!(!vs.has_two_buffers());
    }

    #[test]
    fn test_offsets_follow_scroll() {
        let mut vs = VirtScreen::new(
            VirtScreenNumber::Main,
            layout(0, 320, 10, false, true),
            PixelFormat::Rgb555,
            6,
            40,
            0,
        );
        assert_eq!(vs.pitch, 640);
        vs.xstart = 8;
        assert_eq!(vs.base_offset(1, 2), 2 * 640 + 2);
        assert_eq!(vs.pixel_offset(1, 2), 2 * 640 + 18);
    }

    #[test]
    fn test_contains_row() {
        let vs = VirtScreen::new(
            VirtScreenNumber::Text,
            layout(0, 320, 16, false, false),
            PixelFormat::Clut8,
            5,
            40,
            0,
        );
        assert!(vs.contains_row(0));
        assert!(vs.contains_row(15));
        assert!(!vs.contains_row(16));
    }
}
