//! Per-strip dirty tracking.
//!
//! Each 8-pixel strip of a virtual screen remembers the topmost and
//! bottommost rows touched since the last flush. A clean strip holds the
//! sentinel `(height, 0)`.

/// A horizontal run of strips sharing one dirty row range, ready to blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRun {
    /// Left edge in pixels
    pub x: usize,
    /// Width in pixels, a multiple of 8
    pub width: usize,
    pub top: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyTracker {
    tdirty: Vec<i32>,
    bdirty: Vec<i32>,
    height: i32,
}

impl DirtyTracker {
    /// A tracker of `num_strips` strips over `height` rows, all clean.
    pub fn new(num_strips: usize, height: i32) -> Self {
        Self {
            tdirty: vec![height; num_strips],
            bdirty: vec![0; num_strips],
            height,
        }
    }

    pub fn num_strips(&self) -> usize {
        self.tdirty.len()
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Set every strip to the same range. `(height, 0)` cleans everything.
    pub fn set_dirty_range(&mut self, top: i32, bottom: i32) {
        self.tdirty.fill(top);
        self.bdirty.fill(bottom);
    }

    pub fn clean(&mut self) {
        self.set_dirty_range(self.height, 0);
    }

    /// `(top, bottom)` of strip `i`.
    pub fn range(&self, strip: usize) -> Option<(i32, i32)> {
        Some((*self.tdirty.get(strip)?, *self.bdirty.get(strip)?))
    }

    pub fn is_strip_dirty(&self, strip: usize) -> bool {
        self.bdirty.get(strip).is_some_and(|&b| b != 0)
    }

    pub fn is_clean(&self) -> bool {
        self.bdirty.iter().all(|&b| b == 0)
    }

    /// Grow the dirty ranges of the strips under `left..=right` (pixels) to
    /// include rows `top..bottom`.
    ///
    /// Inverted rectangles and rectangles entirely above or below the
    /// screen are ignored. Rows are clamped to the screen, strips to
    /// `0..num_strips`.
    pub fn mark(&mut self, left: i32, right: i32, top: i32, bottom: i32) {
        if left > right || top > bottom {
            return;
        }
        if top > self.height || bottom < 0 {
            return;
        }
        let top = top.max(0);
        let bottom = bottom.min(self.height);

        let num_strips = self.num_strips() as i32;
        let lp = left / 8;
        let rp = right / 8;
        if lp >= num_strips || rp < 0 {
            return;
        }
        let lp = lp.max(0) as usize;
        let rp = rp.min(num_strips - 1) as usize;

        for strip in lp..=rp {
            if top < self.tdirty[strip] {
                self.tdirty[strip] = top;
            }
            if bottom > self.bdirty[strip] {
                self.bdirty[strip] = bottom;
            }
        }
    }

    /// Grow one strip's range without clipping. Out-of-range strips are
    /// ignored.
    pub fn extend(&mut self, strip: usize, top: i32, bottom: i32) {
        if let (Some(t), Some(b)) = (self.tdirty.get_mut(strip), self.bdirty.get_mut(strip)) {
            if top < *t {
                *t = top;
            }
            if bottom > *b {
                *b = bottom;
            }
        }
    }

    /// Overwrite one strip's range. Out-of-range strips are ignored.
    pub fn set_strip(&mut self, strip: usize, top: i32, bottom: i32) {
        if let (Some(t), Some(b)) = (self.tdirty.get_mut(strip), self.bdirty.get_mut(strip)) {
            *t = top;
            *b = bottom;
        }
    }

    /// Collect the dirty strips into blit runs and reset them to clean.
    ///
    /// Neighbouring strips with identical ranges are merged into one run.
    pub fn take_runs(&mut self) -> Vec<DirtyRun> {
        let mut runs = Vec::new();
        let n = self.num_strips();
        let mut width = 8;
        let mut start = 0;

        for i in 0..n {
            if self.bdirty[i] != 0 {
                let top = self.tdirty[i];
                let bottom = self.bdirty[i];
                self.tdirty[i] = self.height;
                self.bdirty[i] = 0;
                if i + 1 != n && self.bdirty[i + 1] == bottom && self.tdirty[i + 1] == top {
                    width += 8;
                    continue;
                }
                runs.push(DirtyRun {
                    x: start * 8,
                    width,
                    top,
                    bottom,
                });
                width = 8;
            }
            start = i + 1;
        }
        runs
    }
}

/// Bit set in a room strip's usage word when the strip needs a redraw.
pub const USAGEBIT_DIRTY: u32 = 96;
/// Bit set once the strip's background was restored this frame.
pub const USAGEBIT_RESTORED: u32 = 95;

/// Highest room strip that can carry usage bits.
pub const MAX_USAGE_STRIPS: usize = 410;

/// Per-room-strip flags: 96 bits per strip. Bits 1..=94 belong to objects,
/// 95 and 96 are the restore and dirty markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageBits {
    words: Vec<[u32; 3]>,
}

impl Default for UsageBits {
    fn default() -> Self {
        Self {
            words: vec![[0; 3]; MAX_USAGE_STRIPS],
        }
    }
}

impl UsageBits {
    fn locate(bit: u32) -> Option<(usize, u32)> {
        if !(1..=96).contains(&bit) {
            return None;
        }
        let bit = bit - 1;
        Some(((bit / 32) as usize, 1 << (bit % 32)))
    }

    pub fn set(&mut self, strip: usize, bit: u32) {
        if let (Some(w), Some((i, m))) = (self.words.get_mut(strip), Self::locate(bit)) {
            w[i] |= m;
        }
    }

    pub fn clear(&mut self, strip: usize, bit: u32) {
        if let (Some(w), Some((i, m))) = (self.words.get_mut(strip), Self::locate(bit)) {
            w[i] &= !m;
        }
    }

    pub fn test(&self, strip: usize, bit: u32) -> bool {
        match (self.words.get(strip), Self::locate(bit)) {
            (Some(w), Some((i, m))) => w[i] & m != 0,
            _ => false,
        }
    }

    /// Whether any object bit (1..=94) is set on the strip.
    pub fn has_object(&self, strip: usize) -> bool {
        self.words
            .get(strip)
            .is_some_and(|w| w[0] != 0 || w[1] != 0 || w[2] & 0x3FFF_FFFF != 0)
    }

    pub fn reset(&mut self) {
        for w in &mut self.words {
            *w = [0; 3];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_clean() {
        let t = DirtyTracker::new(40, 144);
        assert!(t.is_clean());
        assert_eq!(t.range(0), Some((144, 0)));
        assert_eq!(t.range(40), None);
    }

    #[test]
    fn test_mark_clamps_rows_and_strips() {
        let mut t = DirtyTracker::new(40, 144);
        t.mark(-20, 400, -5, 500);
        assert_eq!(t.range(0), Some((0, 144)));
        assert_eq!(t.range(39), Some((0, 144)));
    }

    #[test]
    fn test_mark_ignores_inverted_and_offscreen() {
        let mut t = DirtyTracker::new(40, 144);
        t.mark(10, 5, 0, 10);
        t.mark(0, 10, 20, 10);
        t.mark(0, 10, 145, 150);
        t.mark(0, 10, -10, -1);
        t.mark(320, 400, 0, 10);
        t.mark(-40, -9, 0, 10);
        assert!(t.is_clean());
    }

    #[test]
    fn test_mark_grows_range() {
        let mut t = DirtyTracker::new(4, 100);
        t.mark(0, 7, 10, 20);
        t.mark(0, 7, 5, 15);
        t.mark(0, 7, 12, 30);
        assert_eq!(t.range(0), Some((5, 30)));
        assert!(!t.is_strip_dirty(1));
    }

    #[test]
    fn test_take_runs_coalesces_equal_neighbours() {
        let mut t = DirtyTracker::new(6, 100);
        t.mark(0, 23, 10, 20);
        t.mark(40, 47, 0, 50);
        let runs = t.take_runs();
        assert_eq!(
            runs,
            vec![
                DirtyRun { x: 0, width: 24, top: 10, bottom: 20 },
                DirtyRun { x: 40, width: 8, top: 0, bottom: 50 },
            ]
        );
        assert!(t.is_clean());
    }

    #[test]
    fn test_take_runs_splits_different_ranges() {
        let mut t = DirtyTracker::new(3, 100);
        t.mark(0, 7, 0, 10);
        t.mark(8, 15, 0, 11);
        let runs = t.take_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].x, 8);
    }

    #[test]
    fn test_second_flush_is_empty() {
        let mut t = DirtyTracker::new(40, 144);
        t.set_dirty_range(0, 144);
        assert_eq!(t.take_runs().len(), 1);
        assert!(t.take_runs().is_empty());
    }

    #[test]
    fn test_usage_bits() {
        let mut u = UsageBits::default();
        u.set(3, USAGEBIT_DIRTY);
        u.set(3, 1);
        assert!(u.test(3, USAGEBIT_DIRTY));
        assert!(u.test(3, 1));
        assert!(u.has_object(3));
        u.clear(3, 1);
        assert!(!u.has_object(3));
        assert!(u.test(3, USAGEBIT_DIRTY));
        // Out of range bits and strips are ignored
        u.set(MAX_USAGE_STRIPS, 5);
        u.set(0, 97);
        assert!(!u.test(0, 97));
    }
}
