//! SCUMM room graphics: strip codecs, z-plane masks, virtual screens with
//! dirty-strip tracking, the per-platform compositor and screen transitions.
//!
//! The entry point is [`ScummGfx`], which owns the four virtual screens, the
//! shared mask store and the active [`gdi::Gdi`] variant, and pushes finished
//! strips to a host [`gfx_core::display::Display`].

pub mod codec;
pub mod config;
pub mod context;
pub mod dirty;
pub mod dither;
pub mod draw;
pub mod effects;
pub mod engine;
pub mod game;
pub mod gdi;
pub mod mask;
pub mod resource;
pub mod surface;
pub mod text;
pub mod transition;
pub mod virt_screen;

pub use config::{GfxConfig, RenderMode};
pub use context::RenderContext;
pub use engine::ScummGfx;
pub use game::{GameFeatures, GameId, GameProfile, Language, Platform};
pub use virt_screen::{VirtScreen, VirtScreenNumber};

use gfx_core::bits::BitReaderError;
use thiserror::Error;

/// Fatal graphics errors. None of these are retried; they end the session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GfxError {
    #[error("unknown bitmap codec {code}")]
    UnknownCodec { code: u8 },
    #[error("strip {strip} offset {offset} outside image of {len} bytes")]
    StripOffsetOutOfRange { strip: usize, offset: i64, len: usize },
    #[error("z-plane {plane} strip {strip} offset {offset} outside plane of {len} bytes")]
    ZPlaneOutOfRange {
        plane: usize,
        strip: usize,
        offset: i64,
        len: usize,
    },
    #[error("truncated {what}")]
    Truncated { what: &'static str },
    #[error("unknown screen effect {effect}")]
    UnknownEffect { effect: i32 },
    #[error("missing chunk {tag}")]
    MissingChunk { tag: String },
    #[error("buffer too small: need {needed} bytes, have {len}")]
    BufferTooSmall { needed: usize, len: usize },
    #[error("invalid z-buffer count {count}")]
    InvalidZBufferCount { count: usize },
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<BitReaderError> for GfxError {
    fn from(_: BitReaderError) -> Self {
        GfxError::Truncated { what: "strip data" }
    }
}
