//! Host display abstraction.
//!
//! The compositor never owns the physical screen. It pushes finished
//! rectangles through [`Display`], which is the only call into the host
//! windowing backend:
//!
//! ```text
//! virtual screens -> dirty strip flush -> Display::copy_rect_to_screen
//! ```
//!
//! [`FrameDisplay`] is an in-memory implementation backed by a [`Frame`]. It is
//! what headless runs and tests render into, and it can record every blit it
//! receives.

use crate::types::{Frame, PixelFormat, Rect};
use serde_json::{json, Value};

/// Host display backend.
pub trait Display {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Pixel format of the source rectangles this display accepts.
    fn format(&self) -> PixelFormat;

    /// Copy a `w` x `h` rectangle from `src` (rows `pitch` bytes apart) to
    /// screen position (x, y). Parts outside the screen are dropped.
    fn copy_rect_to_screen(&mut self, src: &[u8], pitch: usize, x: i32, y: i32, w: usize, h: usize);

    /// Fill the whole screen with one colour.
    fn fill_screen(&mut self, color: u32);

    /// Shift the top `height` rows of the screen by (dx, dy). Uncovered
    /// pixels become 0.
    fn move_screen(&mut self, dx: i32, dy: i32, height: usize);

    fn set_shake_pos(&mut self, x: i32, y: i32);
}

/// Framebuffer-backed display.
#[derive(Debug, Clone)]
pub struct FrameDisplay {
    frame: Frame,
    format: PixelFormat,
    shake: (i32, i32),
    record_blits: bool,
    blits: Vec<Rect>,
    fills: usize,
}

impl FrameDisplay {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            frame: Frame::new(width, height),
            format,
            shake: (0, 0),
            record_blits: false,
            blits: Vec::new(),
            fills: 0,
        }
    }

    /// Keep a log of every rectangle passed to `copy_rect_to_screen`.
    pub fn with_blit_log(mut self) -> Self {
        self.record_blits = true;
        self
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        self.frame.pixel(x, y)
    }

    /// Rectangles blitted since the log was last drained, in call order.
    pub fn blits(&self) -> &[Rect] {
        &self.blits
    }

    pub fn take_blits(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.blits)
    }

    pub fn fill_count(&self) -> usize {
        self.fills
    }

    pub fn shake_pos(&self) -> (i32, i32) {
        self.shake
    }

    /// JSON snapshot of the framebuffer, suitable for golden comparisons.
    pub fn snapshot(&self) -> Value {
        json!({
            "width": self.frame.width,
            "height": self.frame.height,
            "format": format!("{:?}", self.format),
            "pixels": self.frame.pixels,
        })
    }
}

impl Display for FrameDisplay {
    fn width(&self) -> usize {
        self.frame.width as usize
    }

    fn height(&self) -> usize {
        self.frame.height as usize
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn copy_rect_to_screen(&mut self, src: &[u8], pitch: usize, x: i32, y: i32, w: usize, h: usize) {
        if self.record_blits {
            self.blits
                .push(Rect::new(x, y, x + w as i32, y + h as i32));
        }

        let bpp = self.format.bytes_per_pixel();
        let fw = self.frame.width as i32;
        let fh = self.frame.height as i32;

        for row in 0..h {
            let sy = y + row as i32;
            if sy < 0 || sy >= fh {
                continue;
            }
            for col in 0..w {
                let sx = x + col as i32;
                if sx < 0 || sx >= fw {
                    continue;
                }
                let at = row * pitch + col * bpp;
                let value = match self.format {
                    PixelFormat::Clut8 => src.get(at).map(|&b| b as u32),
                    PixelFormat::Rgb555 => src
                        .get(at..at + 2)
                        .map(|b| u16::from_le_bytes([b[0], b[1]]) as u32),
                };
                if let Some(v) = value {
                    self.frame.pixels[(sy * fw + sx) as usize] = v;
                }
            }
        }
    }

    fn fill_screen(&mut self, color: u32) {
        self.fills += 1;
        self.frame.pixels.fill(color);
    }

    fn move_screen(&mut self, dx: i32, dy: i32, height: usize) {
        if (dx == 0 && dy == 0) || height == 0 {
            return;
        }
        let w = self.frame.width as i32;
        let h = (height as i32).min(self.frame.height as i32);
        let old = self.frame.pixels.clone();
        for y in 0..h {
            for x in 0..w {
                let sx = x - dx;
                let sy = y - dy;
                let value = if sx >= 0 && sx < w && sy >= 0 && sy < h {
                    old[(sy * w + sx) as usize]
                } else {
                    0
                };
                self.frame.pixels[(y * w + x) as usize] = value;
            }
        }
    }

    fn set_shake_pos(&mut self, x: i32, y: i32) {
        self.shake = (x, y);
    }
}
