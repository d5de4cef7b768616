//! Core graphics primitives shared by the room decoders.
//!
//! Nothing in here knows about a particular engine: bit streams, palettes,
//! the host display and frame timer traits, and the common logging facility.

pub mod bits;
pub mod display;
pub mod logging;
pub mod palette;
pub mod timer;

pub mod types {
    use serde::{Deserialize, Serialize};

    /// Host-side framebuffer. Each pixel holds either a palette index or a
    /// 16-bit colour value, depending on the display's [`PixelFormat`].
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }

        /// Pixel at (x, y), or `None` outside the frame.
        pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
            if x >= self.width || y >= self.height {
                return None;
            }
            self.pixels.get((y * self.width + x) as usize).copied()
        }
    }

    /// Storage format of a virtual screen or display.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum PixelFormat {
        /// 8-bit palette indices
        #[default]
        Clut8,
        /// 16-bit little-endian RGB555
        Rgb555,
    }

    impl PixelFormat {
        pub fn bytes_per_pixel(self) -> usize {
            match self {
                PixelFormat::Clut8 => 1,
                PixelFormat::Rgb555 => 2,
            }
        }
    }

    /// Half-open rectangle: `left..right` by `top..bottom`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Rect {
        pub left: i32,
        pub top: i32,
        pub right: i32,
        pub bottom: i32,
    }

    impl Rect {
        pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
            Self {
                left,
                top,
                right,
                bottom,
            }
        }

        /// Rectangle anchored at the origin.
        pub fn with_size(width: i32, height: i32) -> Self {
            Self::new(0, 0, width, height)
        }

        pub fn width(&self) -> i32 {
            self.right - self.left
        }

        pub fn height(&self) -> i32 {
            self.bottom - self.top
        }

        pub fn is_empty(&self) -> bool {
            self.left >= self.right || self.top >= self.bottom
        }

        pub fn contains(&self, x: i32, y: i32) -> bool {
            x >= self.left && x < self.right && y >= self.top && y < self.bottom
        }

        /// Clamp every edge into `0..=max_w` / `0..=max_h`.
        pub fn clip(&mut self, max_w: i32, max_h: i32) {
            self.left = self.left.clamp(0, max_w);
            self.right = self.right.clamp(0, max_w);
            self.top = self.top.clamp(0, max_h);
            self.bottom = self.bottom.clamp(0, max_h);
        }

        /// Total covered area; zero for empty rectangles.
        pub fn area(&self) -> i64 {
            if self.is_empty() {
                0
            } else {
                self.width() as i64 * self.height() as i64
            }
        }

        pub fn translate(&mut self, dx: i32, dy: i32) {
            self.left += dx;
            self.right += dx;
            self.top += dy;
            self.bottom += dy;
        }
    }
}
