//! Reading room and object images.
//!
//! Chunked resources are `[tag: 4][size: BE32][payload]` where `size`
//! includes the 8-byte header. A container's children follow its header
//! back to back. Strip and z-plane offsets inside an image are
//! little-endian and count from the start of the chunk that holds them.

use crate::game::{GameId, GameProfile};
use crate::GfxError;

pub type Tag = [u8; 4];

pub const TAG_SMAP: Tag = *b"SMAP";
pub const TAG_BMAP: Tag = *b"BMAP";
pub const TAG_TMSK: Tag = *b"TMSK";
pub const TAG_RMIM: Tag = *b"RMIM";
pub const TAG_RMIH: Tag = *b"RMIH";
pub const TAG_RMHD: Tag = *b"RMHD";
pub const ZPLANE_TAGS: [Tag; 5] = [*b"ZP00", *b"ZP01", *b"ZP02", *b"ZP03", *b"ZP04"];

fn bytes<const N: usize>(data: &[u8], at: usize) -> Result<[u8; N], GfxError> {
    data.get(at..at + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(GfxError::Truncated { what: "resource header" })
}

pub fn read_le16(data: &[u8], at: usize) -> Result<u16, GfxError> {
    Ok(u16::from_le_bytes(bytes(data, at)?))
}

pub fn read_le32(data: &[u8], at: usize) -> Result<u32, GfxError> {
    Ok(u32::from_le_bytes(bytes(data, at)?))
}

pub fn read_be32(data: &[u8], at: usize) -> Result<u32, GfxError> {
    Ok(u32::from_be_bytes(bytes(data, at)?))
}

fn tag_name(tag: &Tag) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

/// Find the child chunk `tag` of `container`. The returned slice starts at
/// the child's header and ends with the child.
pub fn find_chunk<'a>(container: &'a [u8], tag: &Tag) -> Option<&'a [u8]> {
    let total = (read_be32(container, 4).ok()? as usize).min(container.len());
    let mut pos = 8;
    while pos + 8 <= total {
        let size = read_be32(container, pos + 4).ok()? as usize;
        if &container[pos..pos + 4] == tag {
            let end = (pos + size.max(8)).min(container.len());
            return Some(&container[pos..end]);
        }
        if size < 8 {
            return None;
        }
        pos += size;
    }
    None
}

/// Like [`find_chunk`], without the 8-byte header.
pub fn find_chunk_data<'a>(container: &'a [u8], tag: &Tag) -> Option<&'a [u8]> {
    find_chunk(container, tag).map(|c| &c[8.min(c.len())..])
}

pub fn require_chunk<'a>(container: &'a [u8], tag: &Tag) -> Result<&'a [u8], GfxError> {
    find_chunk(container, tag).ok_or_else(|| GfxError::MissingChunk { tag: tag_name(tag) })
}

/// Strip table of an image, abstracting the per-version header layouts.
#[derive(Debug, Clone, Copy)]
pub struct StripMap<'a> {
    /// Start of the strip data the offsets count from
    base: &'a [u8],
    /// Declared length of the table plus data
    len: usize,
    offsets_at: usize,
    wide: bool,
}

impl<'a> StripMap<'a> {
    /// Locate the strip map of `image` (an object or room image chunk, or
    /// the raw map itself for small-header and v8 games).
    pub fn locate(image: &'a [u8], profile: &GameProfile) -> Result<Self, GfxError> {
        let f = &profile.features;
        if f.sixteen_color {
            return Ok(Self {
                base: image,
                len: read_le16(image, 0)? as usize,
                offsets_at: 2,
                wide: false,
            });
        }
        if f.small_header {
            return Ok(Self {
                base: image,
                len: read_le32(image, 0)? as usize,
                offsets_at: 4,
                wide: true,
            });
        }
        if profile.version == 8 {
            let len = read_be32(image, 4)? as usize;
            let base = image.get(24..).ok_or(GfxError::Truncated { what: "strip map" })?;
            return Ok(Self {
                base,
                len,
                offsets_at: 8,
                wide: true,
            });
        }
        let smap = require_chunk(image, &TAG_SMAP)?;
        Ok(Self {
            base: smap,
            len: read_be32(smap, 4)? as usize,
            offsets_at: 8,
            wide: true,
        })
    }

    /// Declared byte length of the map.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Compressed data of strip `strip`, starting at its codec byte.
    pub fn strip(&self, strip: usize) -> Result<&'a [u8], GfxError> {
        let width = if self.wide { 4 } else { 2 };
        let entry = strip * width + self.offsets_at;
        let offset: i64 = if entry < self.len {
            if self.wide {
                read_le32(self.base, entry)? as i64
            } else {
                read_le16(self.base, entry)? as i64
            }
        } else {
            -1
        };
        if offset < 0 || offset >= self.len as i64 || offset as usize >= self.base.len() {
            return Err(GfxError::StripOffsetOutOfRange {
                strip,
                offset,
                len: self.len,
            });
        }
        Ok(&self.base[offset as usize..])
    }
}

/// The z-plane tables of an image; slot 0 is the colour map itself.
#[derive(Debug, Clone, Default)]
pub struct ZPlaneList<'a> {
    pub planes: [Option<&'a [u8]>; 9],
    pub count: usize,
}

impl<'a> ZPlaneList<'a> {
    pub fn get(&self, z: usize) -> Option<&'a [u8]> {
        self.planes.get(z).copied().flatten()
    }
}

/// Collect the z-plane tables of `image`. `bmap` selects the HE full
/// background map instead of the strip map as plane 0.
pub fn get_zplanes<'a>(
    image: &'a [u8],
    profile: &GameProfile,
    num_zbuffer: usize,
    zbuffer_disabled: bool,
    bmap: bool,
) -> Result<ZPlaneList<'a>, GfxError> {
    let f = &profile.features;
    let mut list = ZPlaneList::default();

    list.planes[0] = if f.small_header || profile.version == 8 {
        Some(image)
    } else if bmap {
        find_chunk(image, &TAG_BMAP)
    } else {
        find_chunk(image, &TAG_SMAP)
    };

    if zbuffer_disabled {
        list.count = 0;
        return Ok(list);
    }
    list.count = num_zbuffer.min(9);
    if num_zbuffer <= 1 || profile.version <= 2 {
        return Ok(list);
    }

    if profile.id == GameId::Loom && profile.is_pce() {
        list.planes[1] = None;
    } else if f.small_header {
        let first = if f.sixteen_color {
            read_le16(image, 0)? as usize
        } else {
            read_le32(image, 0)? as usize
        };
        let mut plane = image.get(first..);
        if f.old_256 {
            if let Some(p) = plane {
                if read_le32(p, 0)? == 0 {
                    plane = None;
                }
            }
        }
        list.planes[1] = plane;
        let mut at = first;
        for i in 2..list.count {
            list.planes[i] = match list.planes[i - 1] {
                Some(prev) => {
                    at += read_le16(prev, 0)? as usize;
                    image.get(at..)
                }
                None => None,
            };
        }
    } else if profile.version == 8 {
        let offs_start = 24 + read_be32(image, 12)? as usize;
        for i in 1..list.count {
            let rel = read_le32(image, offs_start + 4 + i * 4)? as usize;
            list.planes[i] = image.get(offs_start + rel + 16..);
        }
    } else {
        for i in 1..list.count {
            list.planes[i] = ZPLANE_TAGS.get(i).and_then(|t| find_chunk(image, t));
        }
    }
    Ok(list)
}

/// Offset of strip `strip` inside plane table `plane`, per resource layout.
/// Zero means "strip has no mask data".
pub fn zplane_strip_offset(
    plane: &[u8],
    plane_index: usize,
    strip: usize,
    profile: &GameProfile,
) -> Result<usize, GfxError> {
    let f = &profile.features;
    let offs = if f.old_bundle {
        read_le16(plane, strip * 2)? as usize
    } else if f.old_256 {
        read_le16(plane, strip * 2 + 4)? as usize
    } else if f.small_header {
        read_le16(plane, strip * 2 + 2)? as usize
    } else if profile.version == 8 {
        read_le32(plane, strip * 4 + 8)? as usize
    } else {
        read_le16(plane, strip * 2 + 8)? as usize
    };
    if offs >= plane.len() && offs != 0 {
        return Err(GfxError::ZPlaneOutOfRange {
            plane: plane_index,
            strip,
            offset: offs as i64,
            len: plane.len(),
        });
    }
    Ok(offs)
}

/// Plane data for strip `strip` at chunk-layout offset `+8` (HE and the
/// "mask on all planes" path), or `None` when the strip has no mask.
pub fn chunked_plane_strip<'a>(
    plane: &'a [u8],
    plane_index: usize,
    strip: usize,
    wide: bool,
) -> Result<Option<&'a [u8]>, GfxError> {
    let offs = if wide {
        read_le32(plane, strip * 4 + 8)? as usize
    } else {
        read_le16(plane, strip * 2 + 8)? as usize
    };
    if offs == 0 {
        return Ok(None);
    }
    plane
        .get(offs..)
        .map(Some)
        .ok_or(GfxError::ZPlaneOutOfRange {
            plane: plane_index,
            strip,
            offset: offs as i64,
            len: plane.len(),
        })
}

/// Number of z-buffers a room uses, mask planes plus the charset plane.
///
/// Small-header rooms count the linked planes after the strip map (at most
/// 4); chunked rooms read the count from the room image header.
pub fn count_zbuffers(room: &[u8], profile: &GameProfile) -> Result<usize, GfxError> {
    let count = if profile.version <= 3 {
        2
    } else if profile.features.small_header {
        let smap = room;
        let mut off = if profile.features.sixteen_color {
            read_le16(smap, 0)? as usize
        } else {
            read_le32(smap, 0)? as usize
        };
        let mut at = 0;
        let mut n = 0;
        while off != 0 && n < 4 {
            n += 1;
            at += off;
            off = read_le16(smap, at)? as usize;
        }
        n
    } else if profile.version == 8 {
        let rmhd = require_chunk(room, &TAG_RMHD)?;
        read_le32(rmhd, 24)? as usize + 1
    } else if profile.he_version >= 70 {
        let rmih = require_chunk(room, &TAG_RMIH)?;
        read_le16(rmih, 8)? as usize + 1
    } else {
        let rmim = require_chunk(room, &TAG_RMIM)?;
        let rmih = require_chunk(rmim, &TAG_RMIH)?;
        read_le16(rmih, 8)? as usize + 1
    };
    if !(1..=8).contains(&count) {
        return Err(GfxError::InvalidZBufferCount { count });
    }
    Ok(count)
}

/// Helpers for assembling chunked resources in tests and tools.
pub mod build {
    use super::Tag;

    pub fn chunk(tag: &Tag, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 8);
        out.extend_from_slice(tag);
        out.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// An `SMAP` chunk from per-strip compressed data.
    pub fn smap(strips: &[Vec<u8>]) -> Vec<u8> {
        let table = 8 + strips.len() * 4;
        let mut offsets = Vec::new();
        let mut data = Vec::new();
        for s in strips {
            offsets.extend_from_slice(&((table + data.len()) as u32).to_le_bytes());
            data.extend_from_slice(s);
        }
        offsets.extend_from_slice(&data);
        chunk(b"SMAP", &offsets)
    }

    /// A `ZPnn` chunk; `None` strips have no mask.
    pub fn zplane(tag: &Tag, strips: &[Option<Vec<u8>>]) -> Vec<u8> {
        let table = 8 + strips.len() * 2;
        let mut offsets = Vec::new();
        let mut data = Vec::new();
        for s in strips {
            match s {
                Some(bytes) => {
                    offsets.extend_from_slice(&((table + data.len()) as u16).to_le_bytes());
                    data.extend_from_slice(bytes);
                }
                None => offsets.extend_from_slice(&0u16.to_le_bytes()),
            }
        }
        offsets.extend_from_slice(&data);
        chunk(tag, &offsets)
    }
}
