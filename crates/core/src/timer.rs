//! Frame pacing for blocking screen effects.
//!
//! Transitions and dissolves run to completion inside a single call, pausing
//! between steps. A [`FrameTimer`] performs those pauses and tells the caller
//! whether to keep going; returning `false` aborts the effect (host quit).

use std::time::{Duration, Instant};

/// Length of one quarter frame (1/240 s).
pub const QUARTER_FRAME: Duration = Duration::from_micros(1_000_000 / 240);

pub trait FrameTimer {
    /// Wait `n` quarter frames. Returns `false` when the host asked to quit.
    fn wait_quarter_frames(&mut self, n: u32) -> bool;

    /// Milliseconds elapsed since the timer was created.
    fn millis(&self) -> u64;
}

/// Real-time timer that sleeps the calling thread.
#[derive(Debug)]
pub struct SleepTimer {
    start: Instant,
}

impl SleepTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SleepTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer for SleepTimer {
    fn wait_quarter_frames(&mut self, n: u32) -> bool {
        if n > 0 {
            std::thread::sleep(QUARTER_FRAME * n);
        }
        true
    }

    fn millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Deterministic timer for headless runs.
///
/// Every wait is recorded instead of slept. An optional budget of waits
/// simulates the host quitting part way through an effect.
#[derive(Debug, Default, Clone)]
pub struct ManualTimer {
    waits: Vec<u32>,
    elapsed_quarters: u64,
    quit_after: Option<usize>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a quit request once `waits` waits have completed.
    pub fn quit_after(waits: usize) -> Self {
        Self {
            quit_after: Some(waits),
            ..Self::default()
        }
    }

    /// Every wait requested so far, in quarter frames.
    pub fn waits(&self) -> &[u32] {
        &self.waits
    }

    pub fn total_quarters(&self) -> u64 {
        self.elapsed_quarters
    }
}

impl FrameTimer for ManualTimer {
    fn wait_quarter_frames(&mut self, n: u32) -> bool {
        self.waits.push(n);
        self.elapsed_quarters += n as u64;
        match self.quit_after {
            Some(limit) => self.waits.len() < limit,
            None => true,
        }
    }

    fn millis(&self) -> u64 {
        self.elapsed_quarters * 1000 / 240
    }
}
